//! CPU utilization and timing helpers for process samples.
//!
//! Utilization is the tick delta of one process between two samples,
//! normalized by the per-CPU tick window of the system-wide baseline.

use once_cell::sync::Lazy;
use tracing::debug;

use crate::system::CpuTimes;

/// Baseline periods shorter than this are treated as no window at all.
pub const MIN_PERIOD_SECONDS: f64 = 1e-6;

/// Get system clock ticks per second (usually 100, but can vary).
fn get_clk_tck() -> f64 {
    #[cfg(unix)]
    {
        // SAFETY: sysconf is safe to call with _SC_CLK_TCK
        // Returns -1 on error, 0 if undefined - both are handled by the > 0 check
        unsafe {
            let tck = libc::sysconf(libc::_SC_CLK_TCK);
            if tck > 0 {
                return tck as f64;
            }
        }
    }
    100.0
}

/// Get the memory page size in bytes.
fn get_page_size() -> u64 {
    #[cfg(unix)]
    {
        // SAFETY: sysconf is safe to call with _SC_PAGESIZE
        unsafe {
            let size = libc::sysconf(libc::_SC_PAGESIZE);
            if size > 0 {
                return size as u64;
            }
        }
    }
    4096
}

/// System clock ticks per second (for CPU time calculation).
pub static CLK_TCK: Lazy<f64> = Lazy::new(get_clk_tck);

/// Memory page size in bytes.
pub static PAGE_SIZE: Lazy<u64> = Lazy::new(get_page_size);

/// Page size in kilobytes, the factor between statm pages and kB.
pub fn page_size_kb() -> u64 {
    *PAGE_SIZE / 1024
}

/// Computes CPU utilization in percent from two combined tick samples.
///
/// Returns 0 while the baseline has not observed a window yet or its period
/// is negligible. The result is clamped to `[0, active_cpus * 100]`.
pub fn cpu_percent(current_ticks: u64, last_ticks: u64, baseline: &CpuTimes) -> f32 {
    if baseline.total_period == 0.0 {
        return 0.0;
    }
    if baseline.period < MIN_PERIOD_SECONDS {
        return 0.0;
    }

    let delta = current_ticks as f64 - last_ticks as f64;
    let raw = delta / baseline.total_period * 100.0;
    let max = f64::from(baseline.active_cpus) * 100.0;
    let percent = raw.clamp(0.0, max);

    debug!(
        "cpu ticks: current={} last={} delta={} total_period={} raw={:.10}% clamped={:.10}%",
        current_ticks, last_ticks, delta, baseline.total_period, raw, percent
    );

    percent as f32
}

/// Absolute start time in milliseconds since the epoch.
pub fn start_time_ms(boot_time_ms: u64, starttime_ticks: u64) -> u64 {
    boot_time_ms + (starttime_ticks as f64 * 1000.0 / *CLK_TCK) as u64
}
