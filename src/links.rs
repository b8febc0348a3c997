//! Download-link manifest.
//!
//! Link discovery is an external concern; the pipeline consumes its result
//! as an opaque JSON manifest on disk:
//!
//! ```json
//! {
//!   "2020": {
//!     "March": {
//!       "Yellow Taxi Trip Records": "https://.../yellow_tripdata_2020-03.parquet"
//!     }
//!   }
//! }
//! ```

use anyhow::{Context, Result};
use chrono::Month;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::PipelineError;

type RideLinks = BTreeMap<String, String>;

pub struct TripLinks {
    years: BTreeMap<i32, BTreeMap<String, RideLinks>>,
}

impl TripLinks {
    /// Loads the manifest from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading link manifest {}", path.display()))?;
        let raw: BTreeMap<String, BTreeMap<String, RideLinks>> = serde_json::from_str(&content)?;

        let mut years = BTreeMap::new();
        for (year, months) in raw {
            let year: i32 = year
                .parse()
                .with_context(|| format!("invalid year key in link manifest: {year}"))?;
            years.insert(year, months);
        }

        Ok(Self { years })
    }

    /// The months published for a year, in calendar order, each with its
    /// ride-type → URL links. Empty if the year is absent.
    pub fn months_for(&self, year: i32) -> Result<Vec<(Month, &RideLinks)>> {
        let Some(months) = self.years.get(&year) else {
            return Ok(Vec::new());
        };

        let mut out = Vec::with_capacity(months.len());
        for (name, rides) in months {
            let month: Month = name
                .parse()
                .map_err(|_| PipelineError::InvalidMonth(name.clone()))?;
            out.push((month, rides));
        }
        out.sort_by_key(|(month, _)| month.number_from_month());

        Ok(out)
    }

    /// The most recent (month, year) the source has published.
    pub fn latest(&self) -> Option<(Month, i32)> {
        let (&year, months) = self.years.last_key_value()?;
        let month = months
            .keys()
            .filter_map(|name| name.parse::<Month>().ok())
            .max_by_key(|month| month.number_from_month())?;
        Some((month, year))
    }
}
