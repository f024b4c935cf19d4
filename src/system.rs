//! System-wide CPU time baseline from the /proc filesystem.
//!
//! Process utilization is normalized against how many ticks every CPU went
//! through between two refreshes. `CpuTimesCollector` reads `/proc/stat`
//! once per sampling cycle and publishes the result as an immutable
//! `CpuTimes` that samplers borrow for the duration of an update.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::debug;

/// Read-only view of the system CPU baseline for one sampling cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CpuTimes {
    /// Wall-clock length of the last observation window in seconds.
    pub period: f64,
    /// Boot time in milliseconds since the epoch.
    pub boot_time_ms: u64,
    /// Ticks each CPU went through during the window, 0 before the second refresh.
    pub total_period: f64,
    /// CPUs listed in /proc/stat.
    pub active_cpus: u32,
}

/// CPU statistics from one `cpu` line of /proc/stat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuStat {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
}

impl CpuStat {
    /// Calculate total CPU time (all fields).
    pub fn total(&self) -> u64 {
        self.user
            .saturating_add(self.nice)
            .saturating_add(self.system)
            .saturating_add(self.idle)
            .saturating_add(self.iowait)
            .saturating_add(self.irq)
            .saturating_add(self.softirq)
            .saturating_add(self.steal)
    }
}

/// Counters parsed from one read of /proc/stat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemCpuSample {
    /// Aggregate `cpu` line.
    pub total: CpuStat,
    /// Number of `cpuN` lines.
    pub cpu_count: u32,
    /// `btime`, seconds since the epoch.
    pub boot_time_secs: u64,
}

fn parse_cpu_line(parts: &[&str]) -> CpuStat {
    let field = |i: usize| {
        parts
            .get(i)
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0)
    };

    CpuStat {
        user: field(1),
        nice: field(2),
        system: field(3),
        idle: field(4),
        iowait: field(5),
        irq: field(6),
        softirq: field(7),
        steal: field(8),
    }
}

/// Parses the content of /proc/stat.
///
/// Requires the aggregate `cpu` line and `btime`. A missing per-core list
/// counts as one CPU.
pub fn parse_proc_stat(content: &str) -> Result<SystemCpuSample, String> {
    let mut total: Option<CpuStat> = None;
    let mut cpu_count = 0u32;
    let mut boot_time: Option<u64> = None;

    for line in content.lines() {
        if line.starts_with("cpu") {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 8 {
                continue;
            }

            if parts[0] == "cpu" {
                total = Some(parse_cpu_line(&parts));
            } else {
                cpu_count += 1;
            }
        } else if let Some(value_str) = line.strip_prefix("btime ") {
            boot_time = value_str.trim().parse::<u64>().ok();
        }
    }

    match (total, boot_time) {
        (Some(total), Some(boot_time_secs)) => Ok(SystemCpuSample {
            total,
            cpu_count: cpu_count.max(1),
            boot_time_secs,
        }),
        (None, _) => Err("No aggregate cpu line found in /proc/stat".to_string()),
        (_, None) => Err("No btime found in /proc/stat".to_string()),
    }
}

/// Builds a fresh `CpuTimes` each sampling cycle from /proc/stat.
pub struct CpuTimesCollector {
    stat_path: PathBuf,
    previous: Option<(CpuStat, Instant)>,
    current: CpuTimes,
}

impl CpuTimesCollector {
    pub fn new(proc_root: impl AsRef<Path>) -> Self {
        Self {
            stat_path: proc_root.as_ref().join("stat"),
            previous: None,
            current: CpuTimes::default(),
        }
    }

    /// The baseline published by the last successful refresh.
    pub fn current(&self) -> CpuTimes {
        self.current
    }

    /// Reads /proc/stat and publishes the baseline for the window since the
    /// previous refresh.
    pub fn refresh(&mut self) -> Result<CpuTimes, String> {
        let content = fs::read_to_string(&self.stat_path)
            .map_err(|e| format!("Failed to read {}: {}", self.stat_path.display(), e))?;
        let sample = parse_proc_stat(&content)?;
        Ok(self.advance(sample, Instant::now()))
    }

    /// Publishes the baseline for `sample` taken at `now`.
    pub fn advance(&mut self, sample: SystemCpuSample, now: Instant) -> CpuTimes {
        let (period, total_period) = match self.previous {
            Some((previous, at)) => {
                let delta_total = sample.total.total().saturating_sub(previous.total());
                (
                    now.saturating_duration_since(at).as_secs_f64(),
                    delta_total as f64 / f64::from(sample.cpu_count),
                )
            }
            None => (0.0, 0.0),
        };

        self.previous = Some((sample.total, now));
        self.current = CpuTimes {
            period,
            boot_time_ms: sample.boot_time_secs * 1000,
            total_period,
            active_cpus: sample.cpu_count,
        };

        debug!(
            "cpu baseline: period={:.3}s total_period={:.2} active_cpus={}",
            period, total_period, sample.cpu_count
        );

        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    const PROC_STAT: &str = "cpu  100 0 100 700 100 0 0 0 0 0\n\
                             cpu0 50 0 50 350 50 0 0 0 0 0\n\
                             cpu1 50 0 50 350 50 0 0 0 0 0\n\
                             intr 12345 0 0\n\
                             ctxt 99999\n\
                             btime 1700000000\n\
                             processes 4242\n";

    fn sample(total_ticks: u64, cpu_count: u32) -> SystemCpuSample {
        SystemCpuSample {
            total: CpuStat {
                user: total_ticks,
                ..CpuStat::default()
            },
            cpu_count,
            boot_time_secs: 1_700_000_000,
        }
    }

    #[test]
    fn test_parse_proc_stat() {
        let sample = parse_proc_stat(PROC_STAT).expect("valid /proc/stat");
        assert_eq!(sample.total.total(), 1000);
        assert_eq!(sample.total.idle, 700);
        assert_eq!(sample.cpu_count, 2);
        assert_eq!(sample.boot_time_secs, 1_700_000_000);
    }

    #[test]
    fn test_parse_proc_stat_missing_fields() {
        assert!(parse_proc_stat("btime 1\n").is_err());
        assert!(parse_proc_stat("cpu  1 2 3 4 5 6 7 8\n").is_err());
    }

    #[test]
    fn test_cpu_total_saturates() {
        let sample = parse_proc_stat("cpu  18446744073709551615 1 1 1 0 0 0 0
btime 10
")
            .expect("valid");
        assert_eq!(sample.total.total(), u64::MAX);
    }

    #[test]
    fn test_parse_proc_stat_without_per_cpu_lines() {
        let sample = parse_proc_stat("cpu  1 2 3 4 5 6 7 8\nbtime 10\n").expect("valid");
        assert_eq!(sample.cpu_count, 1);
    }

    #[test]
    fn test_collector_first_refresh_has_no_window() {
        let mut collector = CpuTimesCollector::new("/proc");
        let ct = collector.advance(sample(1000, 4), Instant::now());
        assert_eq!(ct.total_period, 0.0);
        assert_eq!(ct.period, 0.0);
        assert_eq!(ct.active_cpus, 4);
        assert_eq!(ct.boot_time_ms, 1_700_000_000_000);
    }

    #[test]
    fn test_collector_window_is_per_cpu() {
        let mut collector = CpuTimesCollector::new("/proc");
        let start = Instant::now();
        collector.advance(sample(1000, 4), start);
        let ct = collector.advance(sample(1400, 4), start + Duration::from_secs(1));

        assert_eq!(ct.total_period, 100.0);
        assert!((ct.period - 1.0).abs() < 1e-9);
        assert_eq!(collector.current(), ct);
    }

    #[test]
    fn test_collector_refresh_from_file() {
        let dir = tempdir().expect("Failed to create temp dir");
        std::fs::write(dir.path().join("stat"), PROC_STAT).expect("Failed to write stat");

        let mut collector = CpuTimesCollector::new(dir.path());
        let ct = collector.refresh().expect("refresh succeeds");
        assert_eq!(ct.active_cpus, 2);
        assert_eq!(ct.total_period, 0.0);
    }

    #[test]
    fn test_collector_refresh_missing_file() {
        let dir = tempdir().expect("Failed to create temp dir");
        let mut collector = CpuTimesCollector::new(dir.path());
        assert!(collector.refresh().is_err());
    }
}
