//! Zone lookup loading.

use polars::prelude::DataFrame;
use serde::Deserialize;
use std::fs::File;
use std::path::Path;

use crate::error::PipelineError;

/// One row of the zone lookup CSV. Extra columns in the file are ignored.
#[derive(Debug, Deserialize)]
struct ZoneRow {
    #[serde(rename = "LocationID")]
    location_id: i32,
    #[serde(rename = "Borough")]
    borough: String,
}

/// Loads the zone id → borough mapping into a two-column frame
/// (`LocationID` Int32, `Borough` Utf8).
pub fn load_zone_lookup(path: &Path) -> Result<DataFrame, PipelineError> {
    let config_err = |source: csv::Error| PipelineError::Config {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(|e| config_err(csv::Error::from(e)))?;
    let mut rdr = csv::Reader::from_reader(file);

    let mut ids = Vec::new();
    let mut boroughs = Vec::new();

    for result in rdr.deserialize() {
        let row: ZoneRow = result.map_err(config_err)?;
        ids.push(row.location_id);
        boroughs.push(row.borough);
    }

    let df = polars::df!("LocationID" => ids, "Borough" => boroughs)?;
    Ok(df)
}
