//! Errors raised while parsing per-process records.

/// A record buffer that does not match the expected positional grammar.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("process name delimiters '(' and ')' not found")]
    MissingName,

    #[error("record ends right after the process name")]
    NothingAfterName,

    #[error("record truncated at field '{field}'")]
    Truncated { field: &'static str },

    #[error("invalid value '{value}' for field '{field}'")]
    InvalidField { field: &'static str, value: String },
}
