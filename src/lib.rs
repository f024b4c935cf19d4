//! Herakles Process Sampler Library
//!
//! This library samples individual Linux processes from `/proc/<pid>/stat` and
//! `/proc/<pid>/statm`, derives CPU utilization normalized against the
//! system-wide CPU baseline and can terminate a process by running the
//! external `kill` program.
//!
//! # Features
//!
//! - **Stat Parsing**: Table-driven parser tolerant of process names with spaces and parentheses
//! - **CPU Utilization**: Percent of one CPU, clamped to 100 per active CPU
//! - **Memory Counters**: Raw page counts from statm
//! - **Process Table**: Pid-keyed table updated once per cycle
//!
//! # Usage
//!
//! ```rust,no_run
//! use herakles_proc_sampler::{CpuTimesCollector, ProcFs, ProcessFilter, ProcessTable};
//! use herakles_proc_sampler::process::collect_pids;
//!
//! let source = ProcFs::default();
//! let mut cpu = CpuTimesCollector::new("/proc");
//! let mut table = ProcessTable::new(ProcessFilter::default());
//!
//! let baseline = cpu.refresh().expect("read /proc/stat");
//! let pids = collect_pids(source.root(), None);
//! table.sync(&pids, &source, &baseline);
//!
//! for process in table.processes() {
//!     println!("{} {}: {:.1}%", process.pid(), process.name(), process.cpu_percent());
//! }
//! ```

pub mod kill;
pub mod metrics;
pub mod process;
pub mod sampler;
pub mod system;
pub mod table;

// Re-export main types for convenience
pub use kill::{default_ladder, terminate, Escalation, KillCommand, TerminateError};
pub use metrics::ProcessMetrics;
pub use process::{ParseError, ProcFs, ProcSource, ProcessFilter, RecordKind, StatRecord};
pub use sampler::{Process, ProcessSnapshot, UpdateOutcome};
pub use system::{CpuTimes, CpuTimesCollector};
pub use table::{CycleStats, ProcessTable};
