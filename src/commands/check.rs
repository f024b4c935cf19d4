//! Check command implementation.
//!
//! Validates system requirements and configuration.

use herakles_proc_sampler::process::{collect_pids, parse_stat, ProcFs, ProcSource, RecordKind};
use herakles_proc_sampler::system::CpuTimesCollector;

use crate::config::{validate_effective_config, Config};
use crate::startup_checks;

/// Validates system requirements and configuration.
pub fn command_check(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Herakles Process Sampler - System Check");
    println!("===========================================");

    let mut all_ok = true;
    let proc_root = config.proc_root();

    println!("\n⚙️  Checking configuration...");
    match validate_effective_config(config) {
        Ok(_) => println!("   ✅ Configuration is valid"),
        Err(e) => {
            println!("   ❌ Configuration invalid: {}", e);
            all_ok = false;
        }
    }

    println!("\n🔐 Checking runtime requirements...");
    match startup_checks::validate_requirements(&proc_root) {
        Ok(_) => println!("   ✅ Runtime requirements met"),
        Err(e) => {
            println!("   ❌ {}", e);
            all_ok = false;
        }
    }

    println!("\n📁 Checking {} ...", proc_root.display());
    let pids = collect_pids(&proc_root, Some(5));
    if pids.is_empty() {
        println!("   ❌ Cannot read any process entries");
        all_ok = false;
    } else {
        println!("   ✅ Can read {} process entries", pids.len());
    }

    println!("\n🧮 Checking CPU baseline...");
    match CpuTimesCollector::new(&proc_root).refresh() {
        Ok(times) => println!(
            "   ✅ {} active CPUs, boot time {} ms",
            times.active_cpus, times.boot_time_ms
        ),
        Err(e) => {
            println!("   ❌ {}", e);
            all_ok = false;
        }
    }

    println!("\n📄 Checking stat parsing...");
    let source = ProcFs::new(&proc_root);
    let own_pid = std::process::id() as i32;
    match source.fetch(RecordKind::Stat, own_pid, None) {
        Some(buf) => match parse_stat(&buf) {
            Ok(record) => println!("   ✅ Parsed own stat record ({})", record.name),
            Err(e) => {
                println!("   ❌ Own stat record malformed: {}", e);
                all_ok = false;
            }
        },
        None => println!("   ⚠️  Own stat record not below {}", proc_root.display()),
    }

    println!("\n📋 Summary:");
    if all_ok {
        println!("   ✅ All checks passed - system is ready");
        Ok(())
    } else {
        println!("   ❌ Some checks failed - please review warnings");
        std::process::exit(1);
    }
}
