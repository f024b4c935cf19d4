//! Integration tests for the process table and the CPU baseline collector.
//!
//! A fake proc tree with a system-wide `stat` file and a few pid directories
//! is sampled over several cycles.

use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use herakles_proc_sampler::process::{collect_pids, ProcFs, ProcessFilter};
use herakles_proc_sampler::system::parse_proc_stat;
use herakles_proc_sampler::{CpuTimesCollector, ProcessTable};
use tempfile::tempdir;

fn system_stat(total_user: u64, per_cpu_user: &[u64]) -> String {
    let mut out = format!("cpu  {} 0 0 0 0 0 0 0 0 0\n", total_user);
    for (i, user) in per_cpu_user.iter().enumerate() {
        out.push_str(&format!("cpu{} {} 0 0 0 0 0 0 0 0 0\n", i, user));
    }
    out.push_str("intr 0\nctxt 0\nbtime 1700000000\nprocesses 10\n");
    out
}

fn write_process(root: &Path, pid: i32, name: &str, ticks: u64) {
    let dir = root.join(pid.to_string());
    fs::create_dir_all(&dir).expect("Failed to create pid dir");
    fs::write(
        dir.join("stat"),
        format!(
            "{pid} ({name}) S 1 {pid} {pid} 0 -1 0 0 0 0 0 {ticks} 0 0 0 20 0 1 0 10 \
             0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 17 0 0 0\n"
        ),
    )
    .expect("Failed to write stat");
    fs::write(dir.join("statm"), "1000 200 50 10 0 100 0\n").expect("Failed to write statm");
}

#[test]
fn test_collector_first_refresh_has_no_window() {
    let dir = tempdir().expect("Failed to create temp dir");
    fs::write(dir.path().join("stat"), system_stat(1000, &[500, 500])).expect("write stat");

    let mut collector = CpuTimesCollector::new(dir.path());
    let times = collector.refresh().expect("refresh");
    assert_eq!(times.total_period, 0.0);
    assert_eq!(times.active_cpus, 2);
    assert_eq!(times.boot_time_ms, 1_700_000_000_000);
    assert_eq!(collector.current(), times);
}

#[test]
fn test_collector_window_per_cpu() {
    let mut collector = CpuTimesCollector::new("/nonexistent");
    let start = Instant::now();

    let first = parse_proc_stat(&system_stat(1000, &[250, 250, 250, 250])).expect("parse");
    collector.advance(first, start);

    let second = parse_proc_stat(&system_stat(1400, &[350, 350, 350, 350])).expect("parse");
    let times = collector.advance(second, start + Duration::from_secs(1));
    assert_eq!(times.total_period, 100.0);
    assert!((times.period - 1.0).abs() < 1e-9);
}

#[test]
fn test_collector_missing_stat() {
    let dir = tempdir().expect("Failed to create temp dir");
    let mut collector = CpuTimesCollector::new(dir.path());
    assert!(collector.refresh().is_err());
}

#[test]
fn test_table_cycles_over_fake_proc() {
    let dir = tempdir().expect("Failed to create temp dir");
    let root = dir.path();
    let source = ProcFs::new(root);
    let mut collector = CpuTimesCollector::new(root);
    let mut table = ProcessTable::new(ProcessFilter {
        exclude_names: Some(vec!["kworker".to_string()]),
        ..ProcessFilter::default()
    });

    write_process(root, 1, "init", 100);
    write_process(root, 20, "kworker/0:1", 0);
    write_process(root, 300, "postgres", 1000);

    // Cycle 1: discovery
    fs::write(root.join("stat"), system_stat(0, &[0, 0])).expect("write stat");
    let baseline = collector.refresh().expect("refresh");
    let stats = table.sync(&collect_pids(root, None), &source, &baseline);
    assert_eq!(stats.added, 2);
    assert_eq!(table.len(), 2);
    assert!(table.get(20).is_none());

    // Cycle 2: postgres burns 50 of 100 ticks per CPU, init exits
    fs::remove_dir_all(root.join("1")).expect("Failed to remove pid dir");
    write_process(root, 300, "postgres", 1050);
    fs::write(root.join("stat"), system_stat(200, &[100, 100])).expect("write stat");
    let baseline = collector.refresh().expect("refresh");
    assert_eq!(baseline.total_period, 100.0);

    let stats = table.sync(&collect_pids(root, None), &source, &baseline);
    assert_eq!(stats.exited, 1);
    assert_eq!(stats.updated, 1);
    assert_eq!(table.len(), 1);

    let postgres = table.get(300).expect("postgres tracked");
    assert!(postgres.is_valid());
    assert!((postgres.cpu_percent() - 50.0).abs() < 1e-4);
    assert_eq!(postgres.snapshot().memory.resident, 200);
}
