//! tlaviz - run TLC on a specification and export what it found.
//!
//! # Usage
//!
//! ```bash
//! # Check a spec with its model config
//! tlaviz check specs/Counter.tla --model-config specs/Counter.cfg
//!
//! # Use a configuration file and export the first counterexample
//! tlaviz --config tlaviz.toml check specs/Counter.tla --json trace.json --markdown trace.md
//!
//! # Keep a snapshot of the counts and timing, then show it later
//! tlaviz check specs/Counter.tla --save results.txt
//! tlaviz show results.txt
//! ```
//!
//! Ctrl+C while a check is running cancels the job and kills TLC.

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::AppConfig;
use std::path::PathBuf;
use std::process::ExitCode;
use tlaviz_checker::{store, TlcJob, TlcRunner};
use tlaviz_core::model::{JobStatus, RunResults};
use tlaviz_report::{
    reconstruct_trace, CircularLayout, JsonTraceExporter, MarkdownTraceExporter, StateGraph,
};
use tokio::signal;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// CLI arguments for tlaviz.
#[derive(Parser, Debug)]
#[command(
    name = "tlaviz",
    about = "Run the TLC model checker and export state graphs and counterexample traces",
    version
)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Path to tla2tools.jar.
    #[arg(long, value_name = "JAR")]
    tla2tools: Option<PathBuf>,

    /// Java home directory.
    #[arg(long, value_name = "DIR")]
    java_home: Option<PathBuf>,

    /// Number of TLC worker threads.
    #[arg(long, value_name = "N")]
    workers: Option<u32>,

    /// Wall-clock limit for a check, in seconds.
    #[arg(long, value_name = "SECS")]
    timeout_secs: Option<u64>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Enable JSON log output.
    #[arg(long)]
    json_logs: bool,

    /// Print the default configuration and exit.
    #[arg(long)]
    print_config: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Model-check a specification.
    Check {
        /// The TLA+ specification.
        spec: PathBuf,

        /// TLC model configuration (.cfg). Ignored if it does not exist.
        #[arg(long, value_name = "FILE")]
        model_config: Option<PathBuf>,

        /// Counterexample to export, by position.
        #[arg(long, default_value_t = 0)]
        trace_index: usize,

        /// Write the trace as JSON.
        #[arg(long, value_name = "FILE")]
        json: Option<PathBuf>,

        /// Write the trace as Markdown.
        #[arg(long, value_name = "FILE")]
        markdown: Option<PathBuf>,

        /// Save a result snapshot.
        #[arg(long, value_name = "FILE")]
        save: Option<PathBuf>,
    },

    /// Show a saved result snapshot.
    Show {
        /// Snapshot written by `check --save`.
        results: PathBuf,
    },
}

/// Initialize tracing/logging.
fn init_tracing(config: &config::LoggingConfig, json_logs: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .context("Failed to parse log filter")?;

    let format = if json_logs || config.format == "json" {
        "json"
    } else {
        &config.format
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;
        }
        "compact" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().pretty().with_writer(std::io::stderr))
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;
        }
    }

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

fn print_summary(results: &RunResults) {
    println!("Status:          {}", results.status);
    println!("States:          {}", results.states_generated);
    println!("Distinct states: {}", results.distinct_states);
    println!("Time:            {:.3}s", results.execution_time_seconds);

    for invariant in results.violated_invariants() {
        match invariant.error_state_id {
            Some(id) => println!("Violated:        {} (state {})", invariant.name, id),
            None => println!("Violated:        {}", invariant.name),
        }
    }

    if !results.counterexamples.is_empty() {
        println!("Counterexamples: {}", results.counterexamples.len());
    }

    for line in results.error_message.lines() {
        println!("  {}", line);
    }
}

async fn run_check(
    config: &AppConfig,
    spec: PathBuf,
    model_config: Option<PathBuf>,
    trace_index: usize,
    json: Option<PathBuf>,
    markdown: Option<PathBuf>,
    save: Option<PathBuf>,
) -> Result<ExitCode> {
    let job = TlcJob::new(TlcRunner::from_config(&config.runner));
    job.on_status(|status| debug!(%status, "Job status changed"));
    job.on_progress(|percent, message| debug!(percent, message, "Job progress"));

    if !job.start(&spec, model_config.as_deref()) {
        anyhow::bail!("A model check is already running");
    }

    let status = tokio::select! {
        status = job.wait() => status,
        _ = shutdown_signal() => {
            warn!("Interrupted, cancelling model check");
            job.shutdown().await;
            job.status()
        }
    };

    let results = job.results();
    print_summary(&results);

    let graph = StateGraph::from_results(&results, &CircularLayout::new(config.layout));
    info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "State graph ready"
    );

    if json.is_some() || markdown.is_some() {
        match results.counterexamples.get(trace_index) {
            Some(ce) => {
                let steps = reconstruct_trace(ce, &results);
                if let Some(ref path) = json {
                    JsonTraceExporter::new()
                        .export_to_file(&steps, path)
                        .with_context(|| format!("Failed to write JSON trace to {:?}", path))?;
                    info!(path = %path.display(), steps = steps.len(), "Wrote JSON trace");
                }
                if let Some(ref path) = markdown {
                    MarkdownTraceExporter::new()
                        .export_to_file(&steps, path)
                        .with_context(|| format!("Failed to write Markdown trace to {:?}", path))?;
                    info!(path = %path.display(), steps = steps.len(), "Wrote Markdown trace");
                }
            }
            None => warn!(
                trace_index,
                available = results.counterexamples.len(),
                "No counterexample to export"
            ),
        }
    }

    if let Some(ref path) = save {
        job.save_results(path)
            .with_context(|| format!("Failed to save results to {:?}", path))?;
        info!(path = %path.display(), "Saved result snapshot");
    }

    Ok(if status == JobStatus::Completed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments
    let args = CliArgs::parse();

    // Handle --print-config
    if args.print_config {
        let config = AppConfig::default();
        println!("{}", toml::to_string_pretty(&config)?);
        return Ok(ExitCode::SUCCESS);
    }

    // Load configuration
    let mut config = if let Some(ref config_path) = args.config {
        AppConfig::from_file(config_path)
            .with_context(|| format!("Failed to load config from {:?}", config_path))?
    } else {
        AppConfig::default()
    };

    config.merge_cli_args(&args);
    config.validate().context("Invalid configuration")?;

    init_tracing(&config.logging, args.json_logs)?;

    match args.command {
        Some(Command::Check {
            spec,
            model_config,
            trace_index,
            json,
            markdown,
            save,
        }) => {
            info!(
                version = env!("CARGO_PKG_VERSION"),
                spec = %spec.display(),
                "tlaviz starting"
            );
            run_check(&config, spec, model_config, trace_index, json, markdown, save).await
        }
        Some(Command::Show { results }) => {
            let loaded = store::load(&results)
                .with_context(|| format!("Failed to load results from {:?}", results))?;
            print_summary(&loaded);
            Ok(ExitCode::SUCCESS)
        }
        None => anyhow::bail!("No command given, try `tlaviz check <SPEC>`"),
    }
}
