mod fetchers;
mod manifest;
mod report;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use meteo_core::{
    Dataset, ExtractionQueue, Fetcher, TracingWorkerReporter, WorkerConfig, WorkerPool,
};

use crate::fetchers::{CsvFetcher, SyntheticFetcher};
use crate::report::RunReport;

#[derive(Parser)]
#[command(name = "meteo", version, about = "Prioritized weather station extraction")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract observations for every station in a manifest
    Run {
        /// Station manifest CSV (station_id,station_name,start_date,end_date[,priority][,source])
        #[arg(short, long)]
        manifest: PathBuf,

        /// Directory holding <station_id>.csv files; synthetic data when omitted
        #[arg(short, long, env = "METEO_DATA_DIR")]
        data_dir: Option<PathBuf>,

        /// Make every K-th synthetic fetch fail with a retryable error
        #[arg(long, conflicts_with = "data_dir")]
        flaky_every: Option<usize>,

        /// Number of concurrent workers (defaults to METEO_WORKERS or 4)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Retry budget per station (defaults to METEO_MAX_RETRIES or 3)
        #[arg(long)]
        max_retries: Option<u32>,

        /// Idle poll interval in milliseconds (defaults to METEO_POLL_INTERVAL_MS or 500)
        #[arg(long)]
        poll_interval_ms: Option<u64>,

        /// Print the report as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Show the order in which a manifest's stations would be processed
    Plan {
        /// Station manifest CSV
        #[arg(short, long)]
        manifest: PathBuf,

        /// Print the plan as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("meteo=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            manifest,
            data_dir,
            flaky_every,
            workers,
            max_retries,
            poll_interval_ms,
            json,
        } => {
            let mut config = WorkerConfig::from_env()
                .context("Invalid worker configuration")?
                .with_worker_id("meteo")
                .with_stop_when_drained(true);
            if let Some(n) = workers {
                config = config.with_workers(n);
            }
            if let Some(n) = max_retries {
                config = config.with_max_retries(n);
            }
            if let Some(ms) = poll_interval_ms {
                config = config.with_poll_interval(Duration::from_millis(ms));
            }
            config.validate().context("Invalid worker configuration")?;

            let report = match data_dir {
                Some(dir) => cmd_run(&manifest, CsvFetcher::new(dir), config).await?,
                None => {
                    let fetcher = flaky_every
                        .map(|k| SyntheticFetcher::new().with_fail_every(k))
                        .unwrap_or_default();
                    cmd_run(&manifest, fetcher, config).await?
                }
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report.render_text());
            }
        }
        Commands::Plan { manifest, json } => {
            cmd_plan(&manifest, json)?;
        }
    }

    Ok(())
}

/// Load the manifest into a fresh queue.
fn seed_queue(manifest: &Path, max_retries: u32) -> Result<ExtractionQueue> {
    let tasks = manifest::load(manifest, max_retries)?;
    let queue = ExtractionQueue::new();
    let count = queue
        .add_tasks(tasks)
        .with_context(|| format!("Failed to queue stations from {}", manifest.display()))?;
    tracing::info!(count, "Queued extraction tasks");
    Ok(queue)
}

async fn cmd_run<F>(manifest: &Path, fetcher: F, config: WorkerConfig) -> Result<RunReport>
where
    F: Fetcher<Output = Dataset> + 'static,
{
    let queue = Arc::new(seed_queue(manifest, config.max_retries)?);

    let cancel_token = CancellationToken::new();
    let ctrl_c_token = cancel_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping workers after in-flight fetches");
            ctrl_c_token.cancel();
        }
    });

    let workers = config.workers;
    let processed = WorkerPool::new(Arc::clone(&queue), fetcher, config)
        .run(cancel_token, TracingWorkerReporter)
        .await
        .context("Worker pool failed")?;

    tracing::info!(processed, workers, stats = %queue.get_stats(), "Extraction finished");
    Ok(RunReport::from_queue(&queue))
}

fn cmd_plan(manifest: &Path, json: bool) -> Result<()> {
    let queue = seed_queue(manifest, meteo_core::task::DEFAULT_MAX_RETRIES)?;
    let plan = report::dispatch_plan(&queue);

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print!("{}", report::render_plan(&plan));
    }
    Ok(())
}
