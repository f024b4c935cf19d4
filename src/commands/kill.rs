//! Kill command implementation.

use herakles_proc_sampler::kill::default_ladder;
use herakles_proc_sampler::process::ProcFs;
use herakles_proc_sampler::sampler::Process;
use herakles_proc_sampler::system::CpuTimes;

use crate::config::Config;

/// Terminates `pid`, retrying through sudo unless disabled.
pub fn command_kill(pid: i32, no_sudo: bool, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let source = ProcFs::new(config.proc_root());
    let process = Process::new(pid, &source, &CpuTimes::default());
    if process.is_valid() {
        println!("🎯 Terminating {} (PID: {})", process.name(), pid);
    } else {
        println!("🎯 Terminating PID {} (no readable stat record)", pid);
    }

    let sudo_fallback = !no_sudo && config.enable_sudo_fallback.unwrap_or(true);
    if process.terminate_with(&default_ladder(sudo_fallback)) {
        println!("✅ Termination signal delivered");
        Ok(())
    } else {
        Err(format!("could not terminate process {}", pid).into())
    }
}
