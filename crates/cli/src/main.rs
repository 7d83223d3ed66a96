//! arxiv-digest
//!
//! One run per invocation:
//! 1. Loads configuration (file, environment, flags)
//! 2. Reads the Zotero library and today's arXiv announcements
//! 3. Ranks the announcements against the library
//! 4. Mails the top papers
//!
//! Exit status: 0 on success (including "nothing new"), 2 configuration,
//! 3 source unavailable, 4 no reference data, 5 dispatch, 1 anything else.

mod cli;
mod pipeline;

use crate::cli::Cli;
use crate::pipeline::{Pipeline, RunOutcome};
use arxiv_digest_common::config::ObservabilityConfig;
use arxiv_digest_common::{AppError, VERSION};
use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Logs go to stderr; stdout carries the digest on dry runs
fn init_logging(observability: &ObservabilityConfig, debug: bool) {
    let level = if debug {
        "debug"
    } else {
        observability.log_level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if observability.json_logging {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

fn exit_code(err: &AppError) -> ExitCode {
    error!(
        error = %err,
        code = err.code().as_code(),
        "Digest run failed"
    );
    ExitCode::from(err.exit_code() as u8)
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            init_logging(&ObservabilityConfig::default(), cli.debug);
            return exit_code(&e);
        }
    };

    init_logging(&config.observability, cli.debug);
    info!(version = VERSION, debug = cli.debug, dry_run = cli.dry_run, "Starting arxiv-digest");

    let pipeline = match Pipeline::from_config(&config, cli.dry_run) {
        Ok(pipeline) => pipeline,
        Err(e) => return exit_code(&e),
    };

    match pipeline.run().await {
        Ok(RunOutcome::Sent { entries }) => {
            info!(entries, "Done");
            ExitCode::SUCCESS
        }
        Ok(RunOutcome::SentEmpty) => {
            info!("Done, empty digest sent");
            ExitCode::SUCCESS
        }
        Ok(RunOutcome::NothingNew) => ExitCode::SUCCESS,
        Err(e) => exit_code(&e),
    }
}
