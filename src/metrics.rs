//! Prometheus metrics for sampled processes.
//!
//! One gauge family per snapshot field worth exporting, labeled by pid and
//! display name. Memory gauges carry raw statm page counts.

use prometheus::{Encoder, Gauge, GaugeVec, Opts, Registry, TextEncoder};

use crate::sampler::Process;
use crate::system::CpuTimes;

const LABELS: &[&str] = &["pid", "name"];

/// Collection of per-process gauges.
#[derive(Clone)]
pub struct ProcessMetrics {
    pub cpu_percent: GaugeVec,
    pub cpu_ticks_total: GaugeVec,
    pub memory_virtual_pages: GaugeVec,
    pub memory_resident_pages: GaugeVec,
    pub memory_shared_pages: GaugeVec,
    pub threads: GaugeVec,
    pub start_time_seconds: GaugeVec,
    pub sample_valid: GaugeVec,
    pub system_active_cpus: Gauge,
}

fn gauge_vec(name: &str, help: &str) -> Result<GaugeVec, prometheus::Error> {
    GaugeVec::new(Opts::new(name, help), LABELS)
}

impl ProcessMetrics {
    /// Creates and registers all metrics with the registry.
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let cpu_percent = gauge_vec(
            "herakles_proc_cpu_percent",
            "Process CPU utilization in percent (up to 100 per active CPU)",
        )?;
        let cpu_ticks_total = gauge_vec(
            "herakles_proc_cpu_ticks_total",
            "User plus system clock ticks consumed by the process",
        )?;
        let memory_virtual_pages = gauge_vec(
            "herakles_proc_memory_virtual_pages",
            "Total program size in pages",
        )?;
        let memory_resident_pages = gauge_vec(
            "herakles_proc_memory_resident_pages",
            "Resident set size in pages",
        )?;
        let memory_shared_pages = gauge_vec(
            "herakles_proc_memory_shared_pages",
            "Resident shared pages",
        )?;
        let threads = gauge_vec("herakles_proc_threads", "Number of threads")?;
        let start_time_seconds = gauge_vec(
            "herakles_proc_start_time_seconds",
            "Process start time in seconds since the epoch",
        )?;
        let sample_valid = gauge_vec(
            "herakles_proc_sample_valid",
            "1 if the last sample parsed completely, 0 otherwise",
        )?;
        let system_active_cpus = Gauge::new(
            "herakles_proc_system_active_cpus",
            "CPUs used to normalize process utilization",
        )?;

        registry.register(Box::new(cpu_percent.clone()))?;
        registry.register(Box::new(cpu_ticks_total.clone()))?;
        registry.register(Box::new(memory_virtual_pages.clone()))?;
        registry.register(Box::new(memory_resident_pages.clone()))?;
        registry.register(Box::new(memory_shared_pages.clone()))?;
        registry.register(Box::new(threads.clone()))?;
        registry.register(Box::new(start_time_seconds.clone()))?;
        registry.register(Box::new(sample_valid.clone()))?;
        registry.register(Box::new(system_active_cpus.clone()))?;

        Ok(Self {
            cpu_percent,
            cpu_ticks_total,
            memory_virtual_pages,
            memory_resident_pages,
            memory_shared_pages,
            threads,
            start_time_seconds,
            sample_valid,
            system_active_cpus,
        })
    }

    /// Records the current snapshot of `process`.
    pub fn observe(&self, process: &Process) {
        let snap = process.snapshot();
        let pid = snap.pid.to_string();
        let labels = [pid.as_str(), snap.stat.name.as_str()];

        self.sample_valid
            .with_label_values(&labels)
            .set(if snap.valid { 1.0 } else { 0.0 });
        if !snap.valid {
            return;
        }

        self.cpu_percent
            .with_label_values(&labels)
            .set(f64::from(snap.cpu_percent));
        self.cpu_ticks_total
            .with_label_values(&labels)
            .set(snap.last_ticks as f64);
        self.memory_virtual_pages
            .with_label_values(&labels)
            .set(snap.memory.size as f64);
        self.memory_resident_pages
            .with_label_values(&labels)
            .set(snap.memory.resident as f64);
        self.memory_shared_pages
            .with_label_values(&labels)
            .set(snap.memory.shared as f64);
        self.threads
            .with_label_values(&labels)
            .set(f64::from(snap.stat.num_threads));
        self.start_time_seconds
            .with_label_values(&labels)
            .set(snap.start_time_ms as f64 / 1000.0);
    }

    pub fn observe_baseline(&self, baseline: &CpuTimes) {
        self.system_active_cpus
            .set(f64::from(baseline.active_cpus));
    }
}

/// Renders every metric in `registry` in the text exposition format.
pub fn encode_text(registry: &Registry) -> Result<String, prometheus::Error> {
    let families = registry.gather();
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
