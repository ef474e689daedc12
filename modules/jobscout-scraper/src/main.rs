use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use jobscout_common::Config;
use jobscout_scraper::fetch::HttpFetcher;
use jobscout_scraper::pacer::TokioClock;
use jobscout_scraper::report::{EventSink, NoopSink, WebhookSink};
use jobscout_scraper::scheduler::Scheduler;
use jobscout_scraper::store::PgJobStore;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[command(name = "jobscout", version, about = "LinkedIn job scraper")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Cap the number of keywords processed per run.
    #[arg(long)]
    max_keywords: Option<usize>,
}

#[derive(Subcommand)]
enum Command {
    /// Execute one scrape run and exit.
    Run,
    /// Keep running on a fixed interval until interrupted.
    Daemon,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("jobscout=info".parse()?))
        .init();

    let cli = Cli::parse();
    info!("JobScout starting...");

    // Load config
    let mut config = Config::from_env();
    if cli.max_keywords.is_some() {
        config.max_keywords = cli.max_keywords;
    }
    config.log_redacted();

    // Connect to Postgres and ensure the schema exists
    let store = PgJobStore::connect(&config.database_url)
        .await
        .context("connecting to Postgres")?;
    store.migrate().await.context("running schema migration")?;

    let sink: Arc<dyn EventSink> = match &config.webhook_url {
        Some(url) => Arc::new(WebhookSink::new(url)),
        None => Arc::new(NoopSink),
    };
    let fetcher = Arc::new(HttpFetcher::new(REQUEST_TIMEOUT));

    let scheduler = Arc::new(Scheduler::new(
        config,
        fetcher,
        Arc::new(store),
        sink,
        Arc::new(TokioClock),
    ));

    // Ctrl-C ends the run after the in-flight keyword finishes.
    {
        let scheduler = scheduler.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                scheduler.stop();
            }
        });
    }

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            let stats = scheduler.run_once().await?;
            info!(
                saved = stats.total_saved,
                skipped = stats.total_skipped,
                "Scrape run finished"
            );
        }
        Command::Daemon => scheduler.run_forever().await,
    }

    Ok(())
}
