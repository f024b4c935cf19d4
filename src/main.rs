//! herakles-proc-sampler - version 0.1.0
//!
//! Per-process /proc sampler with tracing logging.
//! This is the main entry point that resolves configuration and dispatches subcommands.

mod cli;
mod commands;
mod config;
mod startup_checks;

use clap::Parser;
use tracing::{error, info, Level};

use cli::{Args, Commands, LogLevel};
use commands::{command_check, command_kill, command_sample, command_watch};
use config::{resolve_config, show_config, validate_effective_config, Config};

/// Initializes tracing logging subsystem with configured log level.
fn setup_logging(level: &LogLevel) -> Result<(), Box<dyn std::error::Error>> {
    let log_level = match level {
        LogLevel::Off => Level::ERROR,
        LogLevel::Error => Level::ERROR,
        LogLevel::Warn => Level::WARN,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Trace => Level::TRACE,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Logging initialized with level: {:?}", level);
    Ok(())
}

/// Helper function to load and validate configuration.
/// Exits the process with error code 1 if validation fails.
fn load_validated_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let config = resolve_config(args)?;
    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }
    Ok(config)
}

/// Logs requirement problems without aborting.
fn validate_startup(config: &Config) {
    if let Err(e) = startup_checks::validate_requirements(&config.proc_root()) {
        error!("❌ Startup validation failed: {}", e);
        error!("   Sampling will continue but may be incomplete!");
    }
}

/// Main application entry point.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Early config resolution for show/check modes
    if args.show_config || args.check_config {
        let config = resolve_config(&args)?;

        if args.check_config {
            if let Err(e) = validate_effective_config(&config) {
                eprintln!("❌ Configuration invalid: {}", e);
                std::process::exit(1);
            }
            println!("✅ Configuration is valid");
            return Ok(());
        }

        return show_config(&config, args.config_format);
    }

    let Some(command) = &args.command else {
        eprintln!("No subcommand given, see --help");
        std::process::exit(2);
    };

    // Check reports invalid configuration itself instead of exiting early
    let config = match command {
        Commands::Check => resolve_config(&args)?,
        _ => load_validated_config(&args)?,
    };

    let level = config.log_level();
    if !matches!(level, LogLevel::Off) {
        setup_logging(&level)?;
    }

    match command {
        Commands::Check => command_check(&config)?,
        Commands::Watch {
            pids,
            all,
            iterations,
        } => {
            info!("Starting herakles-proc-sampler");
            validate_startup(&config);
            command_watch(pids, *all, *iterations, &config).await?
        }
        Commands::Sample { pid, tid, format } => {
            validate_startup(&config);
            command_sample(*pid, *tid, *format, &config).await?
        }
        Commands::Kill { pid, no_sudo } => command_kill(*pid, *no_sudo, &config)?,
    }

    Ok(())
}
