//! gmos-ls-proc entry point.
//!
//! Runs the whole longslit calibration pipeline; exits non-zero on failure.

use anyhow::Context;
use clap::Parser;
use gmosrs::{CallLog, OperationRegistry, Pipeline, PipelineConfig, SqliteConfig, SqliteStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "gmos-ls-proc")]
#[command(about = "Reduce GMOS longslit observations from an observing-log database")]
#[command(version)]
struct Cli {
    /// YAML configuration; built-in defaults when omitted
    #[arg(short, long, env = "GMOS_PIPELINE_CONFIG")]
    config: Option<PathBuf>,

    /// Observing-log database, overriding the configured path
    #[arg(short, long, env = "GMOS_OBSLOG")]
    database: Option<PathBuf>,

    /// External task runner, overriding the configured program
    #[arg(long, env = "GMOS_TASK_RUNNER")]
    program: Option<PathBuf>,

    /// Log every task call instead of running it
    #[arg(long)]
    dry_run: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > --log-level CLI arg > default "info"
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| cli.log_level.clone());
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)))
        .init();

    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_yaml_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(database) = cli.database {
        config.database = database;
    }
    if let Some(program) = cli.program {
        config.executor.program = program;
    }

    let store = SqliteStore::open(SqliteConfig::with_path(&config.database))
        .context("opening observing log")?;

    let log = CallLog::new();
    let registry = if cli.dry_run {
        OperationRegistry::dry_run(&log)
    } else {
        OperationRegistry::with_commands(config.executor.clone())
    };

    let mut pipeline = Pipeline::new(config, Arc::new(store), Arc::new(registry));
    let report = pipeline.run().context("calibration pipeline failed")?;

    info!(
        state = %report.state,
        artifacts = report.artifacts.len(),
        skipped = report.skipped.len(),
        invocations = report.invocations,
        "=== Finished Calibration Processing ==="
    );
    if cli.dry_run {
        for call in log.calls() {
            println!("{} {} {}", call.kind, call.input_list(), call.output_list());
        }
    }
    Ok(())
}
