mod cli;
mod evaluate;

use std::fs;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use lae_core::config::load_dotenv;
use lae_core::Config;
use lae_engine::LinearAlgebraEngine;
use tracing::{error, info};

use crate::cli::CliArgs;
use crate::evaluate::{evaluate, OutputDocument};

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    // Before parsing so clap's env fallbacks see .env values.
    load_dotenv();
    let args = CliArgs::parse();

    let mut config = match args.profile.as_deref() {
        Some(profile) => Config::for_profile(profile),
        None => Config::from_env(),
    };
    if let Some(threads) = args.threads {
        config.pool.worker_threads = threads;
    }
    config.log_summary();

    let json = fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;

    let mut engine = LinearAlgebraEngine::from_config(&config).context("failed to start engine")?;
    let document = OutputDocument::from(evaluate(&mut engine, &json));
    if let OutputDocument::Error(ref message) = document {
        error!("Evaluation failed: {}", message);
    }

    let rendered = serde_json::to_string_pretty(&document)?;
    fs::write(&args.output, rendered)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    info!(output = %args.output.display(), "Result written");

    if args.report {
        print!("{}", engine.worker_report());
    }
    engine.shutdown();

    Ok(if document.is_error() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
