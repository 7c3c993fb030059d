use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use bulksend::report::TracingReporter;
use bulksend::transport::BridgeTransport;
use bulksend::{config, dispatch, source};

/// Sends messages in bulk, one recipient per row of the input file.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// The CSV file to take the batch from.
    input_file: PathBuf,

    /// Seconds to wait after the transport session opens, while the
    /// client loads/syncs. Overrides the config value (default 5).
    #[arg(short = 'i', long, value_name = "SECONDS")]
    initial_delay: Option<u64>,

    /// Seconds to wait between each major action (finding a contact,
    /// sending a message, sending media). Overrides the config value
    /// (default 2).
    #[arg(short = 'd', long, value_name = "SECONDS")]
    task_delay: Option<u64>,

    /// Path to YAML config file; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let mut cfg = config::load(args.config.as_deref())?;
    if let Some(secs) = args.initial_delay {
        cfg.pacing.initial_delay_seconds = secs;
    }
    if let Some(secs) = args.task_delay {
        cfg.pacing.action_delay_seconds = secs;
    }

    let batch = source::load_batch(&args.input_file)?;
    info!(
        "loaded {} task(s) from {}",
        batch.len(),
        args.input_file.display()
    );

    let transport = BridgeTransport::from_config(&cfg.bridge)?;
    let reporter = TracingReporter;

    let summary = dispatch::run(&transport, &reporter, &cfg, &batch).await?;
    info!(
        run_id = %summary.run_id,
        delivered = summary.delivered(),
        not_found = summary.not_found(),
        failed = summary.failed(),
        "run finished"
    );

    Ok(())
}
