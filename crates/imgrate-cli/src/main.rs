use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::Parser;
use tracing::{error, info};

use imgrate_core::models::ProcessOutcome;
use imgrate_core::Config;
use imgrate_db::{setup_database, QuestionRepository, QuestionStore};
use imgrate_services::{BatchRunner, HttpImageFetcher, ImageFetcher, QuestionProcessor};
use imgrate_storage::create_storage;

#[derive(Parser, Debug)]
#[command(name = "imgrate")]
#[command(about = "Migrate question images into managed object storage")]
struct Args {
    /// Chapter ID whose questions should be processed
    chapter_id: Option<String>,

    /// Reprocess questions even if already marked as migrated
    #[arg(long)]
    reprocess: bool,

    /// Process a single question by ID and report its images
    #[arg(long, value_name = "QUESTION_ID")]
    test: Option<String>,

    /// With --test: analyze only, without fetching, uploading or persisting
    #[arg(long, requires = "test")]
    dry_run: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    if let Err(e) = run(args).await {
        error!(error = %e, "fatal error");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let config = Config::from_env()?;
    config.validate()?;

    let pool = setup_database(&config).await?;
    let storage = create_storage(&config).await?;
    let store: Arc<dyn QuestionStore> = Arc::new(QuestionRepository::new(pool));
    let fetcher: Arc<dyn ImageFetcher> = Arc::new(HttpImageFetcher::new(Duration::from_secs(
        config.fetch_timeout_seconds,
    ))?);

    info!(
        backend = %config.storage_backend,
        bucket = %config.storage_bucket,
        "imgrate initialized"
    );

    let processor = QuestionProcessor::new(store.clone(), storage, fetcher);
    let runner = BatchRunner::new(store, processor);

    if let Some(question_id) = args.test {
        return match runner.inspect(&question_id, args.dry_run).await? {
            ProcessOutcome::Completed { .. } => Ok(()),
            ProcessOutcome::Failed { reason } => {
                Err(anyhow!("question processing failed: {reason}"))
            }
        };
    }

    let chapter_id = args
        .chapter_id
        .ok_or_else(|| anyhow!("CHAPTER_ID is required unless --test is used"))?;

    let summary = runner.run(&chapter_id, args.reprocess).await?;
    info!(
        succeeded = summary.succeeded,
        failed = summary.failed,
        total = summary.total,
        "migration run finished"
    );

    Ok(())
}
