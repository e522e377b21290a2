//! Kiai - Main entrypoint.
//!
//! Loads configuration, initializes logging and runs the requested command.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use kiai_lib::config::{self, ConfigLoader, KiaiConfig, LogConfig, ENV_PREFIX};
use kiai_lib::error::{
    report_error, set_error_reporter, ErrorContext, KiaiError, KiaiResult, TracingErrorReporter,
};
use kiai_lib::replay::{ReplayInputs, ReplayReport, ReplayRunner};
use kiai_lib::reputation::ReputationManager;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Command line arguments for Kiai.
#[derive(Parser, Debug)]
#[clap(name = "kiai", version, author, about)]
struct Args {
    /// Path to configuration file
    #[clap(short, long, value_parser, global = true)]
    config: Option<PathBuf>,

    /// Command to execute
    #[clap(subcommand)]
    command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Load blacklists and classify a traffic log
    Replay {
        /// Base blacklist, loaded in bulk
        #[clap(long, value_parser)]
        base: PathBuf,

        /// Incremental blacklist, loaded address by address
        #[clap(long, value_parser)]
        incremental: Option<PathBuf>,

        /// Traffic log to classify
        #[clap(long, value_parser)]
        traffic: PathBuf,

        /// Print the report as JSON
        #[clap(long)]
        json: bool,
    },

    /// Validate the configuration file
    Validate,

    /// Generate a default configuration file
    GenConfig {
        /// Path to output configuration file
        #[clap(short, long, value_parser)]
        output: PathBuf,
    },
}

/// Initialize the logging system.
///
/// `RUST_LOG` takes precedence over the configured level. Logs go to stderr
/// so reports on stdout stay machine readable.
fn init_logging(log: &LogConfig) -> KiaiResult<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_line_number(log.source_location)
        .with_file(log.source_location)
        .with_thread_names(true)
        .with_writer(std::io::stderr);

    let result = if log.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.pretty().finish())
    };
    result.map_err(|e| KiaiError::Custom(format!("Failed to set global tracing subscriber: {e}")))
}

/// Main entry point for the application.
fn main() -> KiaiResult<()> {
    let args = Args::parse();

    let loaded = ConfigLoader::new(args.config.as_deref(), ENV_PREFIX).load();
    let log_config = loaded
        .as_ref()
        .map(|config| config.log.clone())
        .unwrap_or_default();

    // Initialize logging early to capture any startup errors
    init_logging(&log_config)?;
    set_error_reporter(Arc::new(TracingErrorReporter));

    match args.command {
        Command::Replay {
            base,
            incremental,
            traffic,
            json,
        } => {
            let config = match loaded {
                Ok(config) => config,
                Err(e) => exit_with(ErrorContext::new(e.into(), "config")),
            };
            config::init_global_config(config.clone());

            let inputs = ReplayInputs {
                base,
                incremental,
                traffic,
            };
            match run_replay(config, &inputs) {
                Ok(report) => print_report(&report, json),
                Err(e) => exit_with(
                    ErrorContext::new(e, "replay").with_details(format!("{inputs:?}")),
                ),
            }
        }
        Command::Validate => {
            info!("Validating configuration");
            match loaded {
                Ok(_) => {
                    info!("Configuration validated successfully");
                    Ok(())
                }
                Err(e) => exit_with(ErrorContext::new(e.into(), "config")),
            }
        }
        Command::GenConfig { output } => {
            info!("Generating default configuration");

            // Create parent directories if they don't exist
            if let Some(parent) = output.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let toml = toml::to_string_pretty(&KiaiConfig::default())
                .map_err(|e| KiaiError::Custom(format!("Failed to serialize config: {e}")))?;
            std::fs::write(&output, toml)?;

            info!(path = %output.display(), "Default configuration written");
            Ok(())
        }
    }
}

fn run_replay(config: KiaiConfig, inputs: &ReplayInputs) -> KiaiResult<ReplayReport> {
    let manager = Arc::new(ReputationManager::new(config.reputation)?);
    let runner = ReplayRunner::new(manager, config.replay);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("kiai-worker")
        .enable_all()
        .build()?;

    runtime
        .block_on(runner.run(inputs))
        .map_err(|e| KiaiError::Custom(format!("{e:#}")))
}

fn print_report(report: &ReplayReport, json: bool) -> KiaiResult<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    let traffic = &report.traffic;
    println!("=== Replay summary ===");
    println!(
        "Blacklist: base={} incremental={} (refreshed={}, invalid={})",
        report.load.base_inserted,
        report.load.incremental_inserted,
        report.load.incremental_refreshed,
        report.load.base_invalid + report.load.incremental_invalid
    );
    println!("Requests: {} (invalid={})", traffic.requests, traffic.invalid);
    println!("Pre-filter negative: {}", traffic.clean);
    println!("Pre-filter positive: {}", traffic.malicious + traffic.false_positive);
    println!("  exact hit:        {}", traffic.malicious);
    println!("  false positive:   {}", traffic.false_positive);
    if let Some(fpr) = report.observed_fpr {
        println!("Observed FPR: {:.4}%", fpr * 100.0);
    }
    if let Some(recall) = report.recall {
        println!("Attack recall: {:.2}%", recall * 100.0);
    }
    println!(
        "Duration: {:.2}s (~{:.0} req/s), maintenance checks: {}",
        report.duration_secs, report.throughput, report.maintenance_ticks
    );
    println!(
        "Structures: entries={} capacity={} load_factor={:.3} m_bits={} k={} estimated_fpr={:.6}",
        report.metrics.entries,
        report.metrics.capacity,
        report.metrics.load_factor,
        report.metrics.m_bits,
        report.metrics.k,
        report.metrics.estimated_fpr
    );
    Ok(())
}

fn exit_with(context: ErrorContext) -> ! {
    report_error(context);
    process::exit(1);
}
