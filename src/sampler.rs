//! The per-process sampler.
//!
//! A `Process` is bound to one pid (optionally one of its threads) and is
//! updated in place once per sampling cycle. Each update reads the stat and
//! statm records through a `ProcSource`, recomputes CPU utilization against
//! the cycle's `CpuTimes` and marks the snapshot valid or invalid.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, trace};

use crate::kill::{default_ladder, terminate, Escalation, KillCommand};
use crate::process::{
    cpu_percent, page_size_kb, parse_stat_into, parse_statm, start_time_ms, MemoryPages,
    ParseError, ProcSource, RecordKind, StatRecord,
};
use crate::system::CpuTimes;

/// Result of one `Process::update` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Stat record parsed and utilization recomputed.
    Updated,
    /// Stat record present but malformed; the snapshot is invalid.
    Invalid(ParseError),
    /// Stat record could not be read; nothing changed.
    Unavailable,
}

/// Everything known about a process after the last update.
///
/// Fields are only meaningful while `valid` is set.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessSnapshot {
    pub pid: i32,
    pub tid: Option<i32>,
    pub stat: StatRecord,
    /// Raw page counts, see `Process::page_size_kb`.
    pub memory: MemoryPages,
    pub start_time_ms: u64,
    /// user + system ticks of the last successful parse.
    pub last_ticks: u64,
    pub cpu_percent: f32,
    pub valid: bool,
}

impl ProcessSnapshot {
    fn new(pid: i32, tid: Option<i32>) -> Self {
        Self {
            pid,
            tid,
            stat: StatRecord::default(),
            memory: MemoryPages::default(),
            start_time_ms: 0,
            last_ticks: 0,
            cpu_percent: 0.0,
            valid: false,
        }
    }

    /// Absolute start time, if one was derived.
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        if self.start_time_ms == 0 {
            return None;
        }
        DateTime::<Utc>::from_timestamp_millis(self.start_time_ms as i64)
    }
}

/// A monitored process.
#[derive(Debug, Clone)]
pub struct Process {
    snapshot: ProcessSnapshot,
    page_size_kb: u64,
}

impl Process {
    /// Binds to `pid` and takes the first sample.
    pub fn new<S: ProcSource + ?Sized>(pid: i32, source: &S, baseline: &CpuTimes) -> Self {
        let mut process = Self::placeholder(pid);
        process.update(source, baseline);
        process
    }

    /// Binds to thread `tid` of `pid` and takes the first sample.
    pub fn for_thread<S: ProcSource + ?Sized>(
        pid: i32,
        tid: i32,
        source: &S,
        baseline: &CpuTimes,
    ) -> Self {
        let mut process = Self {
            snapshot: ProcessSnapshot::new(pid, Some(tid)),
            page_size_kb: page_size_kb(),
        };
        process.update(source, baseline);
        process
    }

    /// An inactive entity: invalid, no start time, nothing read yet.
    pub fn placeholder(pid: i32) -> Self {
        Self {
            snapshot: ProcessSnapshot::new(pid, None),
            page_size_kb: page_size_kb(),
        }
    }

    pub fn pid(&self) -> i32 {
        self.snapshot.pid
    }

    pub fn name(&self) -> &str {
        &self.snapshot.stat.name
    }

    pub fn is_valid(&self) -> bool {
        self.snapshot.valid
    }

    pub fn cpu_percent(&self) -> f32 {
        self.snapshot.cpu_percent
    }

    pub fn snapshot(&self) -> &ProcessSnapshot {
        &self.snapshot
    }

    /// Factor from statm pages to kilobytes. Not applied to `memory`.
    pub fn page_size_kb(&self) -> u64 {
        self.page_size_kb
    }

    /// Takes a new sample.
    ///
    /// When the stat record cannot be read the snapshot is left exactly as
    /// it was. A malformed record clears `valid` and keeps `last_ticks`, so
    /// the next good sample still yields a meaningful delta. The statm
    /// record only ever touches the memory counters.
    pub fn update<S: ProcSource + ?Sized>(
        &mut self,
        source: &S,
        baseline: &CpuTimes,
    ) -> UpdateOutcome {
        let snap = &mut self.snapshot;

        let Some(buf) = source.fetch(RecordKind::Stat, snap.pid, snap.tid) else {
            debug!("pid {}: stat record unavailable", snap.pid);
            return UpdateOutcome::Unavailable;
        };

        snap.valid = false;

        let mut record = StatRecord::default();
        let outcome = match parse_stat_into(&buf, &mut record) {
            Ok(()) => {
                debug!("buf: {}", buf.trim_end());
                let ticks = record.cpu_ticks();
                snap.cpu_percent = cpu_percent(ticks, snap.last_ticks, baseline);
                snap.last_ticks = ticks;
                snap.start_time_ms = start_time_ms(baseline.boot_time_ms, record.starttime);
                snap.valid = true;
                UpdateOutcome::Updated
            }
            Err(e) => {
                debug!("pid {}: malformed stat record ({}): {}", snap.pid, e, buf.trim_end());
                UpdateOutcome::Invalid(e)
            }
        };

        // The parsed thread count is not trusted; report a single thread.
        record.num_threads = 1;
        snap.stat = record;
        drop(buf);

        match source.fetch(RecordKind::Statm, snap.pid, snap.tid) {
            Some(buf) => match parse_statm(&buf) {
                Ok(memory) => snap.memory = memory,
                Err(e) => debug!("pid {}: malformed statm record ({}): {}", snap.pid, e, buf.trim_end()),
            },
            None => debug!("pid {}: statm record unavailable", snap.pid),
        }

        self.log();
        outcome
    }

    /// Ends the process: `kill <pid>`, then `sudo kill <pid>`.
    pub fn terminate(&self) -> bool {
        self.terminate_with(&default_ladder(true))
    }

    /// Ends the process with a custom strategy ladder.
    pub fn terminate_with(&self, ladder: &[Box<dyn Escalation>]) -> bool {
        terminate(&KillCommand::new(self.snapshot.pid), ladder)
    }

    /// Emits the snapshot at trace level.
    pub fn log(&self) {
        let s = &self.snapshot;
        let st = &s.stat;
        trace!("name: {}", st.name);
        trace!("state: {}", st.state);
        trace!(
            "ppid: {}, pgrp: {}, session: {}, tty: {}, tpgid: {}",
            st.ppid,
            st.pgrp,
            st.session,
            st.tty_nr,
            st.tpgid
        );
        trace!(
            "flags: 0x{:08X}, min_flt: {}, cmin_flt: {}, maj_flt: {}, cmaj_flt: {}",
            st.flags,
            st.min_flt,
            st.cmin_flt,
            st.maj_flt,
            st.cmaj_flt
        );
        trace!(
            "utime {}, stime {}, cutime {}, cstime {}",
            st.utime,
            st.stime,
            st.cutime,
            st.cstime
        );
        trace!("priority: {}, nice: {}", st.priority, st.nice);
        trace!("pageSizeKB: {}", self.page_size_kb);
        trace!("virt: {}, resident: {}", s.memory.size, s.memory.resident);
        if let Some(started) = s.started_at() {
            let age_ms = Utc::now().timestamp_millis() - s.start_time_ms as i64;
            trace!("start_time: {} (up {})", started.to_rfc3339(), format_age(age_ms));
        }
    }
}

/// Formats a millisecond duration as "[Nd ]HH:MM:SS".
pub fn format_age(ms: i64) -> String {
    let secs = ms.max(0) / 1000;
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;

    if days > 0 {
        format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    }
}
