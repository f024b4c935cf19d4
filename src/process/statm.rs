//! Parser for `/proc/<pid>/statm` records.
//!
//! Format: "size resident shared text lib data dt", all in pages. `lib` and
//! `dt` have been 0 since Linux 2.6 and are not kept.

use serde::Serialize;

use super::error::ParseError;

/// Memory layout of a process in raw pages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MemoryPages {
    /// Total program size (virtual).
    pub size: u64,
    pub resident: u64,
    /// Resident shared pages (file-backed).
    pub shared: u64,
    pub text: u64,
    /// Data plus stack.
    pub data: u64,
}

impl MemoryPages {
    /// Converts every counter to kilobytes using `page_size_kb`.
    pub fn to_kb(&self, page_size_kb: u64) -> MemoryPages {
        MemoryPages {
            size: self.size.saturating_mul(page_size_kb),
            resident: self.resident.saturating_mul(page_size_kb),
            shared: self.shared.saturating_mul(page_size_kb),
            text: self.text.saturating_mul(page_size_kb),
            data: self.data.saturating_mul(page_size_kb),
        }
    }
}

/// Parses a statm record. The trailing `dt` placeholder may be absent.
pub fn parse_statm(buf: &str) -> Result<MemoryPages, ParseError> {
    let mut tokens = buf.split_ascii_whitespace();
    let mut next = |field: &'static str| -> Result<u64, ParseError> {
        let tok = tokens.next().ok_or(ParseError::Truncated { field })?;
        tok.parse().map_err(|_| ParseError::InvalidField {
            field,
            value: tok.to_string(),
        })
    };

    let size = next("size")?;
    let resident = next("resident")?;
    let shared = next("shared")?;
    let text = next("text")?;
    let _lib = next("lib")?;
    let data = next("data")?;

    Ok(MemoryPages {
        size,
        resident,
        shared,
        text,
        data,
    })
}
