//! Sample command implementation.
//!
//! Takes two samples of one process, one interval apart, and prints the
//! second one.

use prometheus::Registry;
use serde::Serialize;

use herakles_proc_sampler::metrics::{encode_text, ProcessMetrics};
use herakles_proc_sampler::process::{MemoryPages, ProcFs};
use herakles_proc_sampler::sampler::{Process, UpdateOutcome};
use herakles_proc_sampler::system::{CpuTimes, CpuTimesCollector};

use crate::cli::OutputFormat;
use crate::config::Config;

/// Flat view of a sampled process for yaml/json/toml output.
#[derive(Debug, Serialize)]
struct SampleReport {
    pid: i32,
    tid: Option<i32>,
    name: String,
    state: String,
    ppid: i32,
    valid: bool,
    cpu_percent: f32,
    utime: u64,
    stime: u64,
    num_threads: i32,
    priority: i32,
    nice: i32,
    processor: i32,
    started_at: Option<String>,
    page_size_kb: u64,
    memory_pages: MemoryPages,
}

impl SampleReport {
    fn from_process(process: &Process) -> Self {
        let snap = process.snapshot();
        Self {
            pid: snap.pid,
            tid: snap.tid,
            name: snap.stat.name.clone(),
            state: snap.stat.state.to_string(),
            ppid: snap.stat.ppid,
            valid: snap.valid,
            cpu_percent: snap.cpu_percent,
            utime: snap.stat.utime,
            stime: snap.stat.stime,
            num_threads: snap.stat.num_threads,
            priority: snap.stat.priority,
            nice: snap.stat.nice,
            processor: snap.stat.processor,
            started_at: snap.started_at().map(|t| t.to_rfc3339()),
            page_size_kb: process.page_size_kb(),
            memory_pages: snap.memory,
        }
    }
}

fn render(
    process: &Process,
    baseline: &CpuTimes,
    format: OutputFormat,
) -> Result<String, Box<dyn std::error::Error>> {
    let report = SampleReport::from_process(process);
    let output = match format {
        OutputFormat::Yaml => serde_yaml::to_string(&report)?,
        OutputFormat::Json => serde_json::to_string_pretty(&report)?,
        OutputFormat::Toml => toml::to_string_pretty(&report)?,
        OutputFormat::Prometheus => {
            let registry = Registry::new();
            let metrics = ProcessMetrics::new(&registry)?;
            metrics.observe(process);
            metrics.observe_baseline(baseline);
            encode_text(&registry)?
        }
    };
    Ok(output)
}

/// Samples `pid` (or thread `tid` of it) twice and prints the result.
pub async fn command_sample(
    pid: i32,
    tid: Option<i32>,
    format: OutputFormat,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let proc_root = config.proc_root();
    let source = ProcFs::new(&proc_root);
    let mut collector = CpuTimesCollector::new(&proc_root);

    let baseline = collector.refresh()?;
    let mut process = match tid {
        Some(tid) => Process::for_thread(pid, tid, &source, &baseline),
        None => Process::new(pid, &source, &baseline),
    };
    if !process.is_valid() {
        return Err(format!("process {} could not be sampled", pid).into());
    }

    tokio::time::sleep(config.interval()).await;

    let baseline = collector.refresh()?;
    match process.update(&source, &baseline) {
        UpdateOutcome::Updated => {}
        UpdateOutcome::Invalid(e) => {
            return Err(format!("process {}: malformed stat record: {}", pid, e).into())
        }
        UpdateOutcome::Unavailable => {
            return Err(format!("process {} exited during sampling", pid).into())
        }
    }

    println!("{}", render(&process, &baseline, format)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use herakles_proc_sampler::process::{ProcSource, RecordKind};

    struct Fixed;

    impl ProcSource for Fixed {
        fn fetch(&self, kind: RecordKind, _pid: i32, _tid: Option<i32>) -> Option<String> {
            Some(match kind {
                RecordKind::Stat => "31 (my app) S 1 31 31 0 -1 0 0 0 0 0 7 3 0 0 20 0 2 0 100 \
                                     0 0 18446744073709551615 0 0 0 0 0 0 0 0 0 0 0 17 3 0 0\n"
                    .to_string(),
                RecordKind::Statm => "900 300 40 12 0 200 0\n".to_string(),
            })
        }
    }

    fn process() -> Process {
        Process::new(31, &Fixed, &CpuTimes::default())
    }

    fn baseline() -> CpuTimes {
        CpuTimes {
            active_cpus: 6,
            ..CpuTimes::default()
        }
    }

    #[test]
    fn test_render_yaml() {
        let out = render(&process(), &baseline(), OutputFormat::Yaml).expect("yaml");
        assert!(out.contains("name: my app"));
        assert!(out.contains("resident: 300"));
    }

    #[test]
    fn test_render_toml_skips_missing_tid() {
        let out = render(&process(), &baseline(), OutputFormat::Toml).expect("toml");
        assert!(out.contains("pid = 31"));
        assert!(!out.contains("tid"));
        assert!(out.contains("[memory_pages]"));
    }

    #[test]
    fn test_render_prometheus() {
        let out = render(&process(), &baseline(), OutputFormat::Prometheus).expect("prometheus");
        assert!(out.contains("herakles_proc_threads{name=\"my app\",pid=\"31\"} 1"));
        assert!(out.contains("herakles_proc_system_active_cpus 6"));
    }
}
