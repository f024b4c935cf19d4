//! Pid-keyed collection of sampled processes.
//!
//! The table owns one `Process` per tracked pid, updates all of them once
//! per cycle against the same baseline and forgets a process as soon as its
//! stat record disappears.

use ahash::AHashMap as HashMap;
use tracing::debug;

use crate::process::{ProcSource, ProcessFilter};
use crate::sampler::{Process, UpdateOutcome};
use crate::system::CpuTimes;

/// Counters for one sampling cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    /// Processes started tracking this cycle.
    pub added: usize,
    /// Existing processes with a valid sample.
    pub updated: usize,
    /// Existing processes whose stat record was malformed.
    pub invalid: usize,
    /// Processes dropped because their record is gone.
    pub exited: usize,
}

#[derive(Debug, Default)]
pub struct ProcessTable {
    filter: ProcessFilter,
    processes: HashMap<i32, Process>,
}

impl ProcessTable {
    pub fn new(filter: ProcessFilter) -> Self {
        Self {
            filter,
            processes: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    pub fn get(&self, pid: i32) -> Option<&Process> {
        self.processes.get(&pid)
    }

    pub fn remove(&mut self, pid: i32) -> Option<Process> {
        self.processes.remove(&pid)
    }

    /// Tracked processes ordered by pid.
    pub fn processes(&self) -> Vec<&Process> {
        let mut out: Vec<&Process> = self.processes.values().collect();
        out.sort_by_key(|p| p.pid());
        out
    }

    fn is_full(&self) -> bool {
        self.filter
            .max_processes
            .is_some_and(|max| self.processes.len() >= max)
    }

    /// Starts tracking `pid` without applying the name filter.
    ///
    /// Returns false if the process could not be read.
    pub fn track<S: ProcSource + ?Sized>(
        &mut self,
        pid: i32,
        source: &S,
        baseline: &CpuTimes,
    ) -> bool {
        if self.processes.contains_key(&pid) {
            return true;
        }
        let process = Process::new(pid, source, baseline);
        if !process.is_valid() {
            debug!("pid {}: not tracked, no valid first sample", pid);
            return false;
        }
        self.processes.insert(pid, process);
        true
    }

    /// Updates every tracked process and drops the ones that exited.
    pub fn update_all<S: ProcSource + ?Sized>(
        &mut self,
        source: &S,
        baseline: &CpuTimes,
    ) -> CycleStats {
        let mut stats = CycleStats::default();
        let mut exited = Vec::new();

        for (pid, process) in self.processes.iter_mut() {
            match process.update(source, baseline) {
                UpdateOutcome::Updated => stats.updated += 1,
                UpdateOutcome::Invalid(_) => stats.invalid += 1,
                UpdateOutcome::Unavailable => exited.push(*pid),
            }
        }

        for pid in exited {
            debug!("pid {}: exited, no longer tracked", pid);
            self.processes.remove(&pid);
            stats.exited += 1;
        }

        stats
    }

    /// Updates tracked processes, then adds new ones from `pids` that pass
    /// the name filter, up to `max_processes`.
    pub fn sync<S: ProcSource + ?Sized>(
        &mut self,
        pids: &[i32],
        source: &S,
        baseline: &CpuTimes,
    ) -> CycleStats {
        let mut stats = self.update_all(source, baseline);

        for &pid in pids {
            if self.processes.contains_key(&pid) {
                continue;
            }
            if self.is_full() {
                break;
            }
            let process = Process::new(pid, source, baseline);
            if !process.is_valid() || !self.filter.should_include(process.name()) {
                continue;
            }
            self.processes.insert(pid, process);
            stats.added += 1;
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::RecordKind;
    use std::collections::HashMap as StdHashMap;

    #[derive(Default)]
    struct MapSource(StdHashMap<i32, String>);

    impl ProcSource for MapSource {
        fn fetch(&self, kind: RecordKind, pid: i32, _tid: Option<i32>) -> Option<String> {
            match kind {
                RecordKind::Stat => self.0.get(&pid).cloned(),
                RecordKind::Statm => None,
            }
        }
    }

    fn stat_line(pid: i32, name: &str, ticks: u64) -> String {
        format!(
            "{pid} ({name}) S 1 {pid} {pid} 0 -1 0 0 0 0 0 {ticks} 0 0 0 20 0 1 0 10 \
             0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 17 0 0 0\n"
        )
    }

    fn source(entries: &[(i32, &str, u64)]) -> MapSource {
        MapSource(
            entries
                .iter()
                .map(|&(pid, name, ticks)| (pid, stat_line(pid, name, ticks)))
                .collect(),
        )
    }

    #[test]
    fn test_sync_adds_filtered_processes() {
        let filter = ProcessFilter {
            exclude_names: Some(vec!["test".to_string()]),
            ..ProcessFilter::default()
        };
        let mut table = ProcessTable::new(filter);
        let src = source(&[(1, "init", 0), (2, "test_runner", 0), (3, "nginx", 0)]);

        let stats = table.sync(&[1, 2, 3], &src, &CpuTimes::default());
        assert_eq!(stats.added, 2);
        assert!(table.get(1).is_some());
        assert!(table.get(2).is_none());
        let pids: Vec<i32> = table.processes().iter().map(|p| p.pid()).collect();
        assert_eq!(pids, vec![1, 3]);
    }

    #[test]
    fn test_sync_respects_max_processes() {
        let filter = ProcessFilter {
            max_processes: Some(2),
            ..ProcessFilter::default()
        };
        let mut table = ProcessTable::new(filter);
        let src = source(&[(1, "a", 0), (2, "b", 0), (3, "c", 0)]);

        table.sync(&[1, 2, 3], &src, &CpuTimes::default());
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_update_all_drops_exited() {
        let mut table = ProcessTable::default();
        let mut src = source(&[(1, "init", 0), (2, "sh", 0)]);
        assert!(table.track(1, &src, &CpuTimes::default()));
        assert!(table.track(2, &src, &CpuTimes::default()));

        src.0.remove(&2);
        let stats = table.update_all(&src, &CpuTimes::default());
        assert_eq!(stats.updated, 1);
        assert_eq!(stats.exited, 1);
        assert!(table.get(2).is_none());
    }

    #[test]
    fn test_update_all_counts_invalid() {
        let mut table = ProcessTable::default();
        let mut src = source(&[(1, "init", 0)]);
        assert!(table.track(1, &src, &CpuTimes::default()));

        src.0.insert(1, "1 (init) S".to_string());
        let stats = table.update_all(&src, &CpuTimes::default());
        assert_eq!(stats.invalid, 1);
        assert!(!table.get(1).map(Process::is_valid).unwrap_or(true));
    }

    #[test]
    fn test_track_unreadable_process() {
        let mut table = ProcessTable::default();
        let src = MapSource::default();
        assert!(!table.track(42, &src, &CpuTimes::default()));
        assert!(table.is_empty());
    }
}
