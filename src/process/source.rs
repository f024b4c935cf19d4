//! Record sources for per-process accounting files.
//!
//! The sampler never touches the filesystem directly; it asks a `ProcSource`
//! for the whole content of a record and gets `None` when the record cannot
//! be read. `ProcFs` is the real implementation, rooted at `/proc` by default
//! so tests can point it at a fake tree.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default mount point of the proc filesystem.
pub const DEFAULT_PROC_ROOT: &str = "/proc";

/// The two record kinds read per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// `stat`: identity, scheduling and CPU accounting.
    Stat,
    /// `statm`: memory layout in pages.
    Statm,
}

impl RecordKind {
    pub fn file_name(self) -> &'static str {
        match self {
            RecordKind::Stat => "stat",
            RecordKind::Statm => "statm",
        }
    }
}

/// Renders the path of a record below `root`.
///
/// With a thread id the thread-specific variant `<pid>/task/<tid>/<kind>` is
/// used, otherwise `<pid>/<kind>`.
pub fn record_path(root: &Path, kind: RecordKind, pid: i32, tid: Option<i32>) -> PathBuf {
    let base = root.join(pid.to_string());
    match tid {
        Some(tid) => base
            .join("task")
            .join(tid.to_string())
            .join(kind.file_name()),
        None => base.join(kind.file_name()),
    }
}

/// Source of raw record buffers.
///
/// The returned buffer is owned by the caller and released when dropped.
pub trait ProcSource {
    fn fetch(&self, kind: RecordKind, pid: i32, tid: Option<i32>) -> Option<String>;
}

/// Filesystem-backed record source.
#[derive(Debug, Clone)]
pub struct ProcFs {
    root: PathBuf,
}

impl ProcFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Default for ProcFs {
    fn default() -> Self {
        Self::new(DEFAULT_PROC_ROOT)
    }
}

impl ProcSource for ProcFs {
    fn fetch(&self, kind: RecordKind, pid: i32, tid: Option<i32>) -> Option<String> {
        let path = record_path(&self.root, kind, pid, tid);
        match fs::read_to_string(&path) {
            Ok(content) => Some(content),
            Err(e) => {
                debug!("Failed to read {}: {}", path.display(), e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_record_path_process_and_thread() {
        let root = Path::new("/proc");
        assert_eq!(
            record_path(root, RecordKind::Stat, 42, None),
            PathBuf::from("/proc/42/stat")
        );
        assert_eq!(
            record_path(root, RecordKind::Statm, 42, Some(43)),
            PathBuf::from("/proc/42/task/43/statm")
        );
    }

    #[test]
    fn test_procfs_fetch_existing_record() {
        let dir = tempdir().expect("Failed to create temp dir");
        let pid_dir = dir.path().join("7");
        std::fs::create_dir_all(&pid_dir).expect("Failed to create pid dir");
        std::fs::write(pid_dir.join("statm"), "1 2 3 4 0 5 0\n").expect("Failed to write statm");

        let source = ProcFs::new(dir.path());
        assert_eq!(
            source.fetch(RecordKind::Statm, 7, None).as_deref(),
            Some("1 2 3 4 0 5 0\n")
        );
    }

    #[test]
    fn test_procfs_fetch_missing_record() {
        let dir = tempdir().expect("Failed to create temp dir");
        let source = ProcFs::new(dir.path());
        assert!(source.fetch(RecordKind::Stat, 99999, None).is_none());
    }
}
