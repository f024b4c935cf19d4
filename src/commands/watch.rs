//! Watch command implementation.
//!
//! Refreshes the CPU baseline and updates a process table once per interval
//! until interrupted or the requested number of cycles has run.

use anyhow::{anyhow, Context};
use tokio::signal;
use tracing::{debug, error, info, warn};

use herakles_proc_sampler::process::{collect_pids, ProcFs};
use herakles_proc_sampler::system::CpuTimesCollector;
use herakles_proc_sampler::table::ProcessTable;

use crate::config::Config;

/// Resolves once SIGINT or SIGTERM arrives.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
    }
}

fn print_table(table: &ProcessTable) {
    println!(
        "{:>8} {:<20} {:>5} {:>7} {:>7} {:>12}",
        "PID", "NAME", "STATE", "CPU%", "THREADS", "RSS(kB)"
    );
    for process in table.processes() {
        let snap = process.snapshot();
        if !snap.valid {
            println!("{:>8} {:<20} {:>5}", snap.pid, snap.stat.name, "-");
            continue;
        }
        let rss_kb = snap.memory.to_kb(process.page_size_kb()).resident;
        println!(
            "{:>8} {:<20} {:>5} {:>7.1} {:>7} {:>12}",
            snap.pid, snap.stat.name, snap.stat.state, snap.cpu_percent, snap.stat.num_threads, rss_kb
        );
    }
}

/// Samples `pids` (or every process with `all`) each interval.
pub async fn command_watch(
    pids: &[i32],
    all: bool,
    iterations: Option<u64>,
    config: &Config,
) -> anyhow::Result<()> {
    if pids.is_empty() && !all {
        return Err(anyhow!("no pids given, pass pids or --all"));
    }

    let proc_root = config.proc_root();
    let source = ProcFs::new(&proc_root);
    let mut collector = CpuTimesCollector::new(&proc_root);
    let mut table = ProcessTable::new(config.filter());

    let baseline = collector
        .refresh()
        .map_err(|e| anyhow!(e))
        .context("initial CPU baseline")?;
    for &pid in pids {
        if !table.track(pid, &source, &baseline) {
            warn!("pid {} could not be sampled, skipping", pid);
        }
    }
    if !all && table.is_empty() {
        return Err(anyhow!("none of the given pids could be sampled"));
    }

    let limit = iterations.or(config.iterations).filter(|&n| n > 0);
    let mut ticker = tokio::time::interval(config.interval());
    // First tick fires immediately; the initial sample above covers it.
    ticker.tick().await;

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    info!(
        "Watching {} every {:?}",
        if all { "all processes".to_string() } else { format!("{} processes", table.len()) },
        config.interval()
    );

    let mut cycle: u64 = 0;
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut shutdown => break,
        }

        let baseline = match collector.refresh() {
            Ok(b) => b,
            Err(e) => {
                warn!("CPU baseline refresh failed: {}", e);
                continue;
            }
        };

        let stats = if all {
            let found = collect_pids(&proc_root, None);
            table.sync(&found, &source, &baseline)
        } else {
            table.update_all(&source, &baseline)
        };
        cycle += 1;
        debug!(
            "cycle {}: added={} updated={} invalid={} exited={}",
            cycle, stats.added, stats.updated, stats.invalid, stats.exited
        );

        print_table(&table);
        println!();

        if !all && table.is_empty() {
            info!("All watched processes exited");
            break;
        }
        if limit.is_some_and(|n| cycle >= n) {
            break;
        }
    }

    info!("Watch stopped after {} cycles", cycle);
    Ok(())
}
