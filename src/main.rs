//! CLI entry point for the ridership ticker backend.
//!
//! Provides subcommands for the periodic sync job (fetch + aggregate +
//! write) and for the two read-path operations, printing their JSON
//! response envelopes to stdout.

use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use chrono_tz::Tz;
use clap::{Parser, Subcommand};
use ridership_ticker::feed::{RidershipFeed, SocrataFeed, MTA_HOURLY_RIDERSHIP_URL};
use ridership_ticker::fetch::{AppToken, BasicClient};
use ridership_ticker::handlers::{self, respond, TopStationsQuery};
use ridership_ticker::store::{DynamoStore, StoreRecord};
use ridership_ticker::writer::{self, RetryPolicy};
use ridership_ticker::{aggregator, writer::DEFAULT_BATCH_SIZE};
use tracing::{info, warn};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

#[derive(Parser)]
#[command(name = "ridership_ticker")]
#[command(about = "Aggregates subway ridership and serves live extrapolated estimates", long_about = None)]
struct Cli {
    /// Reference timezone for "today" and day progress
    #[arg(long, global = true, default_value = "America/New_York")]
    timezone: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the trailing window of raw ridership, aggregate it into
    /// day-of-week x hour buckets, and write them to the store
    Sync {
        /// Trailing window of days to aggregate
        #[arg(long, default_value_t = aggregator::window::DEFAULT_WINDOW_DAYS)]
        window_days: i64,

        /// Feed page size per request
        #[arg(long, default_value_t = aggregator::window::DEFAULT_PAGE_SIZE)]
        page_size: usize,

        /// Records per store batch write
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,

        /// Attempts per batch before giving up
        #[arg(long, default_value_t = 3)]
        max_attempts: u32,

        /// Fixed delay between attempts, in milliseconds
        #[arg(long, default_value_t = 1000)]
        retry_delay_ms: u64,

        /// Hourly ridership feed endpoint
        #[arg(long, default_value = MTA_HOURLY_RIDERSHIP_URL)]
        feed_url: String,
    },
    /// Print today's estimated ridership so far
    Today,
    /// Print today's top stations by estimated ridership
    TopStations {
        /// Number of stations to return (1-10)
        #[arg(long)]
        top: Option<String>,

        /// Ranking key: "total" or "rate"
        #[arg(long)]
        sort_by: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    init_logging();

    let cli = Cli::parse();
    let tz: Tz = cli
        .timezone
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid --timezone {:?}: {e}", cli.timezone))?;

    match cli.command {
        Commands::Sync {
            window_days,
            page_size,
            batch_size,
            max_attempts,
            retry_delay_ms,
            feed_url,
        } => {
            let policy = RetryPolicy {
                max_attempts,
                delay: Duration::from_millis(retry_delay_ms),
            };
            sync(&feed_url, window_days, page_size, batch_size, policy).await?;
        }
        Commands::Today => {
            let store = DynamoStore::from_env().await;
            let response = respond(handlers::today(&store, tz).await);
            println!("{}", response.body);
            info!(status = response.status_code, "today complete");
        }
        Commands::TopStations { top, sort_by } => {
            let store = DynamoStore::from_env().await;
            let query = TopStationsQuery { top, sort_by };
            let response = respond(handlers::top_stations(&store, tz, &query).await);
            println!("{}", response.body);
            info!(status = response.status_code, "top-stations complete");
        }
    }

    Ok(())
}

/// One full sync run: aggregate the trailing window, then flush day and
/// station records to the store in batches.
async fn sync(
    feed_url: &str,
    window_days: i64,
    page_size: usize,
    batch_size: usize,
    policy: RetryPolicy,
) -> Result<()> {
    let feed = socrata_feed(feed_url);
    let output = aggregator::window::aggregate(feed.as_ref(), page_size, window_days).await?;

    let mut records: Vec<StoreRecord> = output.days.into_iter().map(StoreRecord::Day).collect();
    records.extend(output.stations.into_iter().map(StoreRecord::StationDay));
    info!(records = records.len(), "Aggregation done, writing to store");

    let store = DynamoStore::from_env().await;
    writer::write_records(&store, &records, batch_size, &policy).await?;
    Ok(())
}

/// Builds the feed client, attaching the Socrata app token when one is
/// configured (anonymous access is heavily throttled).
fn socrata_feed(feed_url: &str) -> Box<dyn RidershipFeed> {
    match std::env::var("SOCRATA_APP_TOKEN") {
        Ok(token) if !token.is_empty() => match AppToken::new(BasicClient::new(), &token) {
            Some(client) => Box::new(SocrataFeed::new(client, feed_url)),
            None => {
                warn!("SOCRATA_APP_TOKEN is not a valid header value, continuing without it");
                Box::new(SocrataFeed::new(BasicClient::new(), feed_url))
            }
        },
        _ => Box::new(SocrataFeed::new(BasicClient::new(), feed_url)),
    }
}

/// Logging setup: colored stderr + JSON rolling log file.
fn init_logging() {
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/ridership_ticker.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("ridership_ticker.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);
    // Keep the writer alive for the life of the process.
    std::mem::forget(file_guard);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();
}
