//! Remote dataset fetching with an existence check and bounded retry.

mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use polars::error::PolarsError;
use polars::prelude::{DataFrame, ParquetReader, SerReader};
use std::io::Cursor;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use crate::error::PipelineError;

/// A single fetch attempt's failure: either the transfer or the parse.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transfer failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed parquet payload: {0}")]
    Payload(#[from] PolarsError),
}

/// Retry budget for the parquet fetch. The source occasionally serves
/// transient errors, so the defaults are generous.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            delay: Duration::from_secs(30),
        }
    }
}

/// Verifies the URL answers a HEAD request with status 200 before any
/// transfer is attempted.
pub async fn check_url<C: HttpClient>(client: &C, url: &str) -> Result<(), PipelineError> {
    let status = client
        .head_status(url)
        .await
        .map_err(|source| PipelineError::Network {
            url: url.to_string(),
            source,
        })?;

    if status != 200 {
        return Err(PipelineError::Unreachable {
            url: url.to_string(),
            status,
        });
    }

    Ok(())
}

/// Fetches a remote parquet dataset, projected to `columns`, retrying any
/// transfer or parse failure up to the policy's attempt budget with a fixed
/// delay between attempts.
pub async fn fetch_trips<C: HttpClient>(
    client: &C,
    url: &str,
    columns: &[&str],
    retry: &RetryPolicy,
) -> Result<DataFrame, PipelineError> {
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        match read_remote_parquet(client, url, columns).await {
            Ok(df) => return Ok(df),
            Err(e) if attempt < retry.max_attempts => {
                warn!(
                    attempt,
                    delay_secs = retry.delay.as_secs(),
                    error = %e,
                    "Fetch attempt failed, retrying"
                );
                tokio::time::sleep(retry.delay).await;
            }
            Err(e) => {
                return Err(PipelineError::FetchExhausted {
                    url: url.to_string(),
                    attempts: attempt,
                    source: e,
                });
            }
        }
    }
}

async fn read_remote_parquet<C: HttpClient>(
    client: &C,
    url: &str,
    columns: &[&str],
) -> Result<DataFrame, FetchError> {
    let bytes = client.get_bytes(url).await?;
    let projection: Vec<String> = columns.iter().map(|c| c.to_string()).collect();

    let df = ParquetReader::new(Cursor::new(bytes))
        .with_columns(Some(projection))
        .finish()?;

    Ok(df)
}
