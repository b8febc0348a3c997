//! CLI entry point for the TLC trip-record aggregation tool.
//!
//! Provides subcommands for running a full year, processing a single
//! (year, month, ride-type) unit, and combining a year's outputs.

use anyhow::Result;
use chrono::Month;
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tlc_trip_aggregator::error::PipelineError;
use tlc_trip_aggregator::fetch::{BasicClient, RetryPolicy};
use tlc_trip_aggregator::links::TripLinks;
use tlc_trip_aggregator::output;
use tlc_trip_aggregator::pipeline::aggregate::process_unit;
use tlc_trip_aggregator::pipeline::combine::combine_year;
use tlc_trip_aggregator::pipeline::normalize::RideType;
use tlc_trip_aggregator::pipeline::{AggregateMode, UnitOfWork};
use tlc_trip_aggregator::{publish, state};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "tlc_trip_aggregator")]
#[command(about = "Aggregates TLC trip records into hourly zone-level facts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process every published ride type for a year, then combine the year
    Run {
        #[arg(value_name = "YEAR")]
        year: i32,

        /// Months to process (e.g. "March,April"); all published months if omitted
        #[arg(short, long, value_delimiter = ',')]
        months: Vec<String>,

        /// JSON link manifest (year -> month -> ride-type label -> URL)
        #[arg(short, long, default_value = "links.json")]
        links: PathBuf,

        /// Zone id -> borough lookup CSV
        #[arg(short, long, default_value = "data dictionary/taxi_zone_lookup.csv")]
        zone_lookup: PathBuf,

        /// Root directory for output files
        #[arg(short, long, default_value = "data")]
        output: PathBuf,

        /// Seconds to wait between units, to stay within the source's rate limits
        #[arg(long, default_value_t = 120)]
        cooldown: u64,

        /// Group by zones only, skipping boroughs and fare means
        #[arg(long, default_value_t = false)]
        lean: bool,

        /// Optional: S3 bucket to publish the combined file and state marker to
        #[arg(long)]
        s3_bucket: Option<String>,

        /// Optional: Glue crawler to refresh after publishing
        #[arg(long)]
        crawler: Option<String>,

        /// Process even if the source has published nothing new
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Process a single (year, month, ride type) unit of work
    Process {
        #[arg(value_name = "YEAR")]
        year: i32,

        /// Month name, e.g. "March"
        #[arg(value_name = "MONTH")]
        month: String,

        /// Ride-type label as published, e.g. "Yellow Taxi Trip Records"
        #[arg(value_name = "RIDE_TYPE")]
        ride_type: String,

        /// URL of the raw parquet dataset
        #[arg(value_name = "URL")]
        url: String,

        #[arg(short, long, default_value = "data dictionary/taxi_zone_lookup.csv")]
        zone_lookup: PathBuf,

        #[arg(short, long, default_value = "data")]
        output: PathBuf,

        #[arg(long, default_value_t = false)]
        lean: bool,
    },
    /// Combine a year's per-unit files into one parquet file
    Combine {
        #[arg(value_name = "YEAR")]
        year: i32,

        #[arg(short, long, default_value = "data")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/tlc_trip_aggregator.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("tlc_trip_aggregator.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

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

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            year,
            months,
            links,
            zone_lookup,
            output,
            cooldown,
            lean,
            s3_bucket,
            crawler,
            force,
        } => {
            run_year(
                year,
                &months,
                &links,
                &zone_lookup,
                &output,
                cooldown,
                mode(lean),
                s3_bucket,
                crawler,
                force,
            )
            .await?;
        }
        Commands::Process {
            year,
            month,
            ride_type,
            url,
            zone_lookup,
            output,
            lean,
        } => {
            let unit = UnitOfWork {
                year,
                month: parse_month(&month)?,
                ride_type: RideType::from_label(&ride_type)?,
                url,
            };

            let client = BasicClient::new();
            let path = process_unit(
                &client,
                &unit,
                &zone_lookup,
                &output,
                &RetryPolicy::default(),
                mode(lean),
            )
            .await?;

            info!(unit = %unit, path = %path.display(), "Unit of work done");
        }
        Commands::Combine { year, output } => {
            let path = combine_year(&output, year)?;
            info!(year, path = %path.display(), "Combined file written");
        }
    }

    Ok(())
}

fn mode(lean: bool) -> AggregateMode {
    if lean {
        AggregateMode::Lean
    } else {
        AggregateMode::Full
    }
}

fn parse_month(name: &str) -> Result<Month, PipelineError> {
    name.parse()
        .map_err(|_| PipelineError::InvalidMonth(name.to_string()))
}

/// Processes each published (month, ride-type) unit for the year in
/// sequence with a cooldown in between, combines the year, then
/// optionally publishes to S3 and refreshes the catalog crawler.
#[allow(clippy::too_many_arguments)]
async fn run_year(
    year: i32,
    target_months: &[String],
    links_path: &Path,
    zone_lookup: &Path,
    output_root: &Path,
    cooldown: u64,
    mode: AggregateMode,
    s3_bucket: Option<String>,
    crawler: Option<String>,
    force: bool,
) -> Result<()> {
    let links = TripLinks::load(links_path)?;

    // AWS clients only when publishing is requested
    let (s3, glue) = if s3_bucket.is_some() || crawler.is_some() {
        let config = aws_config::load_from_env().await;
        (
            Some(aws_sdk_s3::Client::new(&config)),
            Some(aws_sdk_glue::Client::new(&config)),
        )
    } else {
        (None, None)
    };

    if let (Some(bucket), Some(s3)) = (&s3_bucket, &s3) {
        if let Some((month, latest_year)) = links.latest() {
            let latest = state::marker(month, latest_year);
            let prev = state::read_marker(s3, bucket).await?;
            if state::is_current(prev.as_deref(), &latest) && !force {
                info!(latest, "Source has published nothing new, skipping run");
                return Ok(());
            }
        }
    }

    let client = BasicClient::new();
    let retry = RetryPolicy::default();

    for (month, rides) in links.months_for(year)? {
        if !target_months.is_empty()
            && !target_months
                .iter()
                .any(|m| m.eq_ignore_ascii_case(month.name()))
        {
            continue;
        }

        info!(month = month.name(), year, "Processing month");

        for (label, url) in rides {
            let unit = UnitOfWork {
                year,
                month,
                ride_type: RideType::from_label(label)?,
                url: url.clone(),
            };

            info!(unit = %unit, url, "Aggregating unit");
            process_unit(&client, &unit, zone_lookup, output_root, &retry, mode).await?;

            info!(cooldown_secs = cooldown, "Waiting before the next ride type");
            tokio::time::sleep(Duration::from_secs(cooldown)).await;
        }
    }

    let combined = combine_year(output_root, year)?;

    if let (Some(bucket), Some(s3)) = (&s3_bucket, &s3) {
        let file_name = combined
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("combined.parquet.gz");
        let key = format!("{}/{}/{}", output::COMBINED_DIR, year, file_name);
        publish::upload_file(s3, bucket, &key, &combined).await?;

        if let Some((month, latest_year)) = links.latest() {
            state::write_marker(s3, bucket, &state::marker(month, latest_year)).await?;
        }
    }

    if let (Some(name), Some(glue)) = (&crawler, &glue) {
        publish::refresh_crawler(glue, name).await?;
    }

    info!(year, "Run complete");
    Ok(())
}
