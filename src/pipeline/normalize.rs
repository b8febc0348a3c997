//! Per-ride-type schema normalization.
//!
//! The source publishes four record types with divergent column names and
//! fare semantics. Each type maps to a [`Normalization`] descriptor, and
//! [`normalize`] applies it so every type converges to the same canonical
//! frame: pickup timestamp, pickup/dropoff zone ids, fare total, ride-type
//! label.

use polars::prelude::*;

use crate::error::PipelineError;

/// Canonical column names all ride types converge to.
pub const PICKUP_DATETIME: &str = "pickup_datetime";
pub const PU_LOCATION_ID: &str = "PULocationID";
pub const DO_LOCATION_ID: &str = "DOLocationID";
pub const TOTAL_AMOUNT: &str = "total_amount";
pub const RIDE_TYPE: &str = "ride_type";

/// The seven additive fare components published for high-volume trips.
const FARE_COMPONENTS: [&str; 7] = [
    "base_passenger_fare",
    "tolls",
    "bcf",
    "sales_tax",
    "congestion_surcharge",
    "airport_fee",
    "tips",
];

/// Ride-hailing license codes and their brand labels. Unknown codes pass
/// through unchanged.
const HVFHS_BRANDS: [(&str, &str); 4] = [
    ("HV0002", "Juno"),
    ("HV0003", "Uber"),
    ("HV0004", "Via"),
    ("HV0005", "Lyft"),
];

/// The closed set of record types the source publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RideType {
    Yellow,
    Green,
    ForHire,
    HighVolume,
}

/// How the fare total is derived from the raw columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FareRule {
    /// The source publishes a direct `total_amount` column.
    TotalAmount,
    /// Sum of the seven fare component columns.
    ComponentSum,
    /// The record type carries no fare data; the column is null.
    Unavailable,
}

/// How the per-row ride-type label is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelRule {
    /// The type's fixed published label.
    Fixed,
    /// Brand name mapped from the carrier license code.
    LicenseBrand,
}

/// Everything needed to bring one record type to the canonical schema.
#[derive(Debug, Clone, Copy)]
pub struct Normalization {
    /// Name of the pickup-timestamp column in the raw schema.
    pub pickup_column: &'static str,
    /// Minimal column projection to request from the source.
    pub projection: &'static [&'static str],
    /// Raw pickup/dropoff zone id columns (the for-hire type publishes
    /// them with lowercase `location`).
    pub pickup_zone_column: &'static str,
    pub dropoff_zone_column: &'static str,
    pub fare: FareRule,
    pub label: LabelRule,
    /// Column whose value 6 marks a voided transaction, where published.
    pub voided_column: Option<&'static str>,
}

impl RideType {
    /// Parses a ride-type label as published by the source site.
    pub fn from_label(label: &str) -> Result<Self, PipelineError> {
        match label {
            "Yellow Taxi Trip Records" => Ok(Self::Yellow),
            "Green Taxi Trip Records" => Ok(Self::Green),
            "For-Hire Vehicle Trip Records" => Ok(Self::ForHire),
            "High Volume For-Hire Vehicle Trip Records" => Ok(Self::HighVolume),
            other => Err(PipelineError::InvalidRideType(other.to_string())),
        }
    }

    /// The label as published by the source site.
    pub fn published_label(&self) -> &'static str {
        match self {
            Self::Yellow => "Yellow Taxi Trip Records",
            Self::Green => "Green Taxi Trip Records",
            Self::ForHire => "For-Hire Vehicle Trip Records",
            Self::HighVolume => "High Volume For-Hire Vehicle Trip Records",
        }
    }

    /// The label without the " Trip Records" suffix, used in file names.
    pub fn short_label(&self) -> &'static str {
        match self {
            Self::Yellow => "Yellow Taxi",
            Self::Green => "Green Taxi",
            Self::ForHire => "For-Hire Vehicle",
            Self::HighVolume => "High Volume For-Hire Vehicle",
        }
    }

    /// The normalization descriptor for this record type.
    pub fn normalization(&self) -> Normalization {
        match self {
            Self::Yellow => Normalization {
                pickup_column: "tpep_pickup_datetime",
                projection: &[
                    "tpep_pickup_datetime",
                    "PULocationID",
                    "DOLocationID",
                    "payment_type",
                    "total_amount",
                ],
                pickup_zone_column: "PULocationID",
                dropoff_zone_column: "DOLocationID",
                fare: FareRule::TotalAmount,
                label: LabelRule::Fixed,
                voided_column: Some("payment_type"),
            },
            Self::Green => Normalization {
                pickup_column: "lpep_pickup_datetime",
                projection: &[
                    "lpep_pickup_datetime",
                    "PULocationID",
                    "DOLocationID",
                    "payment_type",
                    "total_amount",
                ],
                pickup_zone_column: "PULocationID",
                dropoff_zone_column: "DOLocationID",
                fare: FareRule::TotalAmount,
                label: LabelRule::Fixed,
                voided_column: Some("payment_type"),
            },
            Self::ForHire => Normalization {
                pickup_column: "pickup_datetime",
                projection: &["pickup_datetime", "PUlocationID", "DOlocationID"],
                pickup_zone_column: "PUlocationID",
                dropoff_zone_column: "DOlocationID",
                fare: FareRule::Unavailable,
                label: LabelRule::Fixed,
                voided_column: None,
            },
            Self::HighVolume => Normalization {
                pickup_column: "request_datetime",
                projection: &[
                    "hvfhs_license_num",
                    "request_datetime",
                    "PULocationID",
                    "DOLocationID",
                    "base_passenger_fare",
                    "tolls",
                    "bcf",
                    "sales_tax",
                    "congestion_surcharge",
                    "airport_fee",
                    "tips",
                ],
                pickup_zone_column: "PULocationID",
                dropoff_zone_column: "DOLocationID",
                fare: FareRule::ComponentSum,
                label: LabelRule::LicenseBrand,
                voided_column: None,
            },
        }
    }
}

/// Applies a ride type's normalization to a raw frame: voided-transaction
/// filter, fare derivation, label rule, renames, and dtype coercion.
pub fn normalize(lf: LazyFrame, ride_type: RideType) -> LazyFrame {
    let n = ride_type.normalization();

    let mut lf = lf;
    if let Some(voided) = n.voided_column {
        lf = lf.filter(col(voided).neq(lit(6)));
    }

    let fare = match n.fare {
        FareRule::TotalAmount => col(TOTAL_AMOUNT),
        FareRule::ComponentSum => FARE_COMPONENTS[1..]
            .iter()
            .fold(col(FARE_COMPONENTS[0]), |acc, c| acc + col(*c)),
        FareRule::Unavailable => lit(NULL),
    };

    let label = match n.label {
        LabelRule::Fixed => lit(ride_type.published_label()),
        LabelRule::LicenseBrand => brand_label(),
    };

    lf.select([
        col(n.pickup_column)
            .cast(DataType::Datetime(TimeUnit::Nanoseconds, None))
            .alias(PICKUP_DATETIME),
        col(n.pickup_zone_column)
            .cast(DataType::Int32)
            .alias(PU_LOCATION_ID),
        col(n.dropoff_zone_column)
            .cast(DataType::Int32)
            .alias(DO_LOCATION_ID),
        fare.cast(DataType::Float64).alias(TOTAL_AMOUNT),
        label.alias(RIDE_TYPE),
    ])
}

fn brand_label() -> Expr {
    HVFHS_BRANDS
        .iter()
        .fold(col("hvfhs_license_num"), |fallback, (code, brand)| {
            when(col("hvfhs_license_num").eq(lit(*code)))
                .then(lit(*brand))
                .otherwise(fallback)
        })
}
