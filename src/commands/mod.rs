//! CLI command implementations for herakles-proc-sampler.
//!
//! This module provides implementations for all CLI subcommands:
//! - `watch`: Periodic sampling of a process table
//! - `sample`: Two samples of a single process
//! - `kill`: Process termination
//! - `check`: System validation

pub mod check;
pub mod kill;
pub mod sample;
pub mod watch;

// Re-export command functions
pub use check::command_check;
pub use kill::command_kill;
pub use sample::command_sample;
pub use watch::command_watch;
