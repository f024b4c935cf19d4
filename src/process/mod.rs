//! Per-process record reading and parsing.
//!
//! This module provides:
//! - `source`: Record sources (`/proc/<pid>/stat`, `/proc/<pid>/statm`)
//! - `stat`: Slot-table parser for the stat record
//! - `statm`: Memory page counters
//! - `cpu`: CPU utilization and start time derivation
//! - `scanner`: Process discovery and filtering

pub mod cpu;
pub mod error;
pub mod scanner;
pub mod source;
pub mod stat;
pub mod statm;

// Re-export commonly used types
pub use cpu::{cpu_percent, page_size_kb, start_time_ms, CLK_TCK, PAGE_SIZE};
pub use error::ParseError;
pub use scanner::{collect_pids, ProcessFilter};
pub use source::{record_path, ProcFs, ProcSource, RecordKind, DEFAULT_PROC_ROOT};
pub use stat::{parse_stat, parse_stat_into, StatRecord, PF_KTHREAD};
pub use statm::{parse_statm, MemoryPages};
