//! Error taxonomy for the aggregation pipeline.

use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

use crate::fetch::FetchError;

/// All the ways a unit of work (or the year combiner) can fail.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The zone lookup CSV is missing or malformed.
    #[error("error reading zone lookup {path}")]
    Config {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// The source URL answered the existence check with a non-200 status.
    #[error("URL not reachable: {url} (status code: {status})")]
    Unreachable { url: String, status: u16 },

    /// The existence check itself could not be performed.
    #[error("error checking URL {url}")]
    Network {
        url: String,
        #[source]
        source: FetchError,
    },

    /// Every fetch attempt failed; carries the last underlying cause.
    #[error("error fetching {url} after {attempts} attempts")]
    FetchExhausted {
        url: String,
        attempts: u32,
        #[source]
        source: FetchError,
    },

    /// A ride-type label outside the closed set.
    #[error("unrecognized ride type: {0}")]
    InvalidRideType(String),

    /// A month name that does not parse.
    #[error("invalid month name: {0}")]
    InvalidMonth(String),

    /// A per-unit file whose schema diverges from the rest of the year.
    #[error("schema mismatch in {path}: {detail}")]
    SchemaMismatch { path: PathBuf, detail: String },

    /// Persisting an output file failed.
    #[error("error writing {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },

    /// A dataframe transform failed.
    #[error("error processing data")]
    Processing(#[from] PolarsError),

    /// Any step's failure, wrapped with the unit-of-work identity.
    #[error("error processing {ride_type} for {month} {year}")]
    Unit {
        year: i32,
        month: String,
        ride_type: String,
        #[source]
        source: Box<PipelineError>,
    },
}
