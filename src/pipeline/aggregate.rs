//! Per-unit orchestration: fetch, normalize, enrich, bucket, aggregate,
//! persist.

use chrono::Month;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::PipelineError;
use crate::fetch::{self, HttpClient, RetryPolicy};
use crate::output;
use crate::zones::load_zone_lookup;

use super::normalize::{
    DO_LOCATION_ID, PICKUP_DATETIME, PU_LOCATION_ID, RIDE_TYPE, RideType, TOTAL_AMOUNT, normalize,
};
use super::{AggregateMode, UnitOfWork};

/// Runs one unit of work end to end and returns the persisted output path.
///
/// The fetch is the only retried step; a transform or write failure fails
/// the unit. Every error is wrapped with the unit's identity. The output
/// file appears only after the whole transform succeeds.
pub async fn process_unit<C: HttpClient>(
    client: &C,
    unit: &UnitOfWork,
    zone_lookup_path: &Path,
    output_root: &Path,
    retry: &RetryPolicy,
    mode: AggregateMode,
) -> Result<PathBuf, PipelineError> {
    let zones = load_zone_lookup(zone_lookup_path).map_err(|e| unit.wrap(e))?;

    fetch::check_url(client, &unit.url)
        .await
        .map_err(|e| unit.wrap(e))?;

    let projection = unit.ride_type.normalization().projection;
    let raw = fetch::fetch_trips(client, &unit.url, projection, retry)
        .await
        .map_err(|e| unit.wrap(e))?;

    info!(unit = %unit, rows = raw.height(), "Raw data fetched");

    let mut df = aggregate_trips(raw, &zones, unit.ride_type, unit.month, mode)
        .map_err(|e| unit.wrap(e.into()))?;

    let path = output::unit_output_path(output_root, unit);
    output::write_parquet(&mut df, &path).map_err(|e| unit.wrap(e))?;

    info!(unit = %unit, groups = df.height(), path = %path.display(), "Unit persisted");
    Ok(path)
}

/// The pure transform: canonical schema → borough enrichment → hour
/// bucketing → aggregation → month filter → fixed output schema.
pub fn aggregate_trips(
    raw: DataFrame,
    zones: &DataFrame,
    ride_type: RideType,
    month: Month,
    mode: AggregateMode,
) -> PolarsResult<DataFrame> {
    let lf = normalize(raw.lazy(), ride_type);

    // Hour bucket, calendar date, and hour of day, at ns precision.
    let lf = lf.with_columns([
        col(PICKUP_DATETIME)
            .dt()
            .truncate(lit("1h"))
            .alias("timestamp_hour"),
        col(PICKUP_DATETIME).dt().date().alias("txn_date"),
        col(PICKUP_DATETIME).dt().hour().alias("txn_hour"),
    ]);

    let lf = match mode {
        AggregateMode::Full => {
            // Left joins keep trips whose zone id is absent from the
            // lookup; those rows carry a null borough.
            let pickup = zones
                .clone()
                .lazy()
                .select([col("LocationID"), col("Borough").alias("PUBorough")]);
            let dropoff = zones
                .clone()
                .lazy()
                .select([col("LocationID"), col("Borough").alias("DOBorough")]);

            lf.join(
                pickup,
                [col(PU_LOCATION_ID)],
                [col("LocationID")],
                JoinArgs::new(JoinType::Left),
            )
            .join(
                dropoff,
                [col(DO_LOCATION_ID)],
                [col("LocationID")],
                JoinArgs::new(JoinType::Left),
            )
            .group_by([
                col("txn_date"),
                col("txn_hour"),
                col("timestamp_hour"),
                col(RIDE_TYPE),
                col("PUBorough"),
                col("DOBorough"),
                col(PU_LOCATION_ID),
                col(DO_LOCATION_ID),
            ])
            .agg([
                len().alias("num_txns"),
                col(TOTAL_AMOUNT).mean().alias(TOTAL_AMOUNT),
            ])
            .select([
                col("txn_date").cast(DataType::Date),
                col("txn_hour").cast(DataType::Int32),
                col("timestamp_hour").cast(DataType::Datetime(TimeUnit::Microseconds, None)),
                col(PU_LOCATION_ID).cast(DataType::Int32),
                col("PUBorough").cast(DataType::String),
                col(DO_LOCATION_ID).cast(DataType::Int32),
                col("DOBorough").cast(DataType::String),
                col(RIDE_TYPE).cast(DataType::String),
                col("num_txns").cast(DataType::Int32),
                col(TOTAL_AMOUNT).cast(DataType::Float64),
            ])
        }
        AggregateMode::Lean => lf
            .group_by([
                col("txn_date"),
                col("txn_hour"),
                col("timestamp_hour"),
                col(RIDE_TYPE),
                col(PU_LOCATION_ID),
                col(DO_LOCATION_ID),
            ])
            .agg([len().alias("num_txns")])
            .select([
                col("txn_date").cast(DataType::Date),
                col("txn_hour").cast(DataType::Int32),
                col("timestamp_hour").cast(DataType::Datetime(TimeUnit::Microseconds, None)),
                col(PU_LOCATION_ID).cast(DataType::Int32),
                col(DO_LOCATION_ID).cast(DataType::Int32),
                col(RIDE_TYPE).cast(DataType::String),
                col("num_txns").cast(DataType::Int32),
            ]),
    };

    // Source files occasionally bleed a few rows across month boundaries;
    // keep only the target month. Sort for deterministic output.
    lf.filter(
        col("txn_date")
            .dt()
            .month()
            .eq(lit(month.number_from_month() as i32)),
    )
    .sort(
        ["txn_date", "txn_hour", RIDE_TYPE, PU_LOCATION_ID, DO_LOCATION_ID],
        SortMultipleOptions::default(),
    )
    .collect()
}
