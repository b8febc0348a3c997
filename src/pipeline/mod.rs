//! The per-unit normalization and aggregation pipeline.
//!
//! One unit of work is a (year, month, ride-type) task: fetch the raw
//! parquet, normalize its schema, enrich with boroughs, bucket to the
//! hour, aggregate, and persist one output file.

pub mod aggregate;
pub mod combine;
pub mod normalize;

use chrono::Month;
use std::fmt;

use crate::error::PipelineError;
use normalize::RideType;

/// Aggregation variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AggregateMode {
    /// Group by zones and boroughs; mean fare per group.
    #[default]
    Full,
    /// Group by zones only; transaction counts, no fare aggregation.
    Lean,
}

/// One (year, month, ride-type) processing task.
#[derive(Debug, Clone)]
pub struct UnitOfWork {
    pub year: i32,
    pub month: Month,
    pub ride_type: RideType,
    pub url: String,
}

impl UnitOfWork {
    /// Wraps a step failure with this unit's identity.
    pub fn wrap(&self, source: PipelineError) -> PipelineError {
        PipelineError::Unit {
            year: self.year,
            month: self.month.name().to_string(),
            ride_type: self.ride_type.published_label().to_string(),
            source: Box::new(source),
        }
    }
}

impl fmt::Display for UnitOfWork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.ride_type.published_label(),
            self.month.name(),
            self.year
        )
    }
}
