//! End-to-end pipeline tests against a stub HTTP client serving synthetic
//! parquet payloads.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{Month, NaiveDate};
use polars::df;
use polars::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tlc_trip_aggregator::fetch::{FetchError, HttpClient, RetryPolicy};
use tlc_trip_aggregator::output;
use tlc_trip_aggregator::pipeline::aggregate::process_unit;
use tlc_trip_aggregator::pipeline::combine::combine_year;
use tlc_trip_aggregator::pipeline::normalize::RideType;
use tlc_trip_aggregator::pipeline::{AggregateMode, UnitOfWork};

struct StubClient {
    body: Bytes,
}

#[async_trait]
impl HttpClient for StubClient {
    async fn head_status(&self, _url: &str) -> Result<u16, FetchError> {
        Ok(200)
    }

    async fn get_bytes(&self, _url: &str) -> Result<Bytes, FetchError> {
        Ok(self.body.clone())
    }
}

fn ns(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> i64 {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, s)
        .unwrap()
        .and_utc()
        .timestamp_nanos_opt()
        .unwrap()
}

fn to_parquet(mut df: DataFrame) -> Bytes {
    let mut buf = Vec::new();
    ParquetWriter::new(&mut buf).finish(&mut df).unwrap();
    Bytes::from(buf)
}

/// Three yellow trips: two valid in March 2020, one voided.
fn yellow_march() -> Bytes {
    to_parquet(
        df!(
            "tpep_pickup_datetime" => [
                ns(2020, 3, 5, 10, 15, 30),
                ns(2020, 3, 5, 11, 5, 0),
                ns(2020, 3, 5, 10, 20, 0),
            ],
            "PULocationID" => [1i64, 2, 1],
            "DOLocationID" => [2i64, 3, 2],
            "payment_type" => [1i64, 2, 6],
            "total_amount" => [10.0f64, 20.0, 99.0],
        )
        .unwrap(),
    )
}

fn yellow_april() -> Bytes {
    to_parquet(
        df!(
            "tpep_pickup_datetime" => [ns(2020, 4, 2, 7, 45, 0)],
            "PULocationID" => [3i64],
            "DOLocationID" => [1i64],
            "payment_type" => [1i64],
            "total_amount" => [15.0f64],
        )
        .unwrap(),
    )
}

/// Fresh scratch root with a zone lookup CSV inside.
fn setup(name: &str) -> (PathBuf, PathBuf) {
    let root = std::env::temp_dir().join(name);
    let _ = fs::remove_dir_all(&root);
    fs::create_dir_all(&root).unwrap();

    let lookup = root.join("taxi_zone_lookup.csv");
    fs::write(
        &lookup,
        "LocationID,Borough,Zone,service_zone\n\
         1,Manhattan,Alphabet City,Yellow Zone\n\
         2,Queens,Astoria,Boro Zone\n\
         3,Brooklyn,Bath Beach,Boro Zone\n",
    )
    .unwrap();

    (root, lookup)
}

fn unit(year: i32, month: Month) -> UnitOfWork {
    UnitOfWork {
        year,
        month,
        ride_type: RideType::Yellow,
        url: "http://example/yellow.parquet".to_string(),
    }
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 2,
        delay: Duration::from_millis(1),
    }
}

async fn run_unit(body: Bytes, u: &UnitOfWork, root: &Path, lookup: &Path) -> PathBuf {
    let client = StubClient { body };
    process_unit(&client, u, lookup, root, &fast_retry(), AggregateMode::Full)
        .await
        .unwrap()
}

#[tokio::test]
async fn full_unit_of_work_persists_the_aggregate() {
    let (root, lookup) = setup("tlc_e2e_unit");
    let march = unit(2020, Month::March);

    let path = run_unit(yellow_march(), &march, &root, &lookup).await;

    assert_eq!(path, output::unit_output_path(&root, &march));
    assert!(path.exists());

    let out = output::read_parquet(&path).unwrap();
    // The voided transaction is excluded; two hour buckets remain.
    assert_eq!(out.height(), 2);

    let labels: Vec<Option<&str>> = out
        .column("ride_type")
        .unwrap()
        .str()
        .unwrap()
        .iter()
        .collect();
    assert!(labels.iter().all(|l| *l == Some("Yellow Taxi Trip Records")));

    fs::remove_dir_all(&root).unwrap();
}

#[tokio::test]
async fn rerunning_a_unit_overwrites_its_output() {
    let (root, lookup) = setup("tlc_e2e_rerun");
    let march = unit(2020, Month::March);

    let first_path = run_unit(yellow_march(), &march, &root, &lookup).await;
    let first = output::read_parquet(&first_path).unwrap();

    let second_path = run_unit(yellow_march(), &march, &root, &lookup).await;
    let second = output::read_parquet(&second_path).unwrap();

    assert_eq!(first_path, second_path);
    assert!(first.equals_missing(&second));

    fs::remove_dir_all(&root).unwrap();
}

#[tokio::test]
async fn combining_a_year_unions_all_units() {
    let (root, lookup) = setup("tlc_e2e_combine");

    run_unit(yellow_march(), &unit(2020, Month::March), &root, &lookup).await;
    run_unit(yellow_april(), &unit(2020, Month::April), &root, &lookup).await;

    let combined_path = combine_year(&root, 2020).unwrap();
    assert_eq!(combined_path, output::combined_output_path(&root, 2020));

    let combined = output::read_parquet(&combined_path).unwrap();
    assert_eq!(combined.height(), 3);

    fs::remove_dir_all(&root).unwrap();
}

#[tokio::test]
async fn unit_failure_leaves_no_output_behind() {
    let (root, lookup) = setup("tlc_e2e_no_partial");
    let march = unit(2020, Month::March);

    // Payload that is not parquet: the fetch exhausts its retry budget.
    let client = StubClient {
        body: Bytes::from_static(b"not parquet"),
    };
    let err = process_unit(
        &client,
        &march,
        &lookup,
        &root,
        &fast_retry(),
        AggregateMode::Full,
    )
    .await
    .unwrap_err();

    // The error carries the unit identity, and nothing was written.
    assert!(err.to_string().contains("March 2020"));
    assert!(!output::unit_output_path(&root, &march).exists());

    fs::remove_dir_all(&root).unwrap();
}
