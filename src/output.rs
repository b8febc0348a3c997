//! Output locations and parquet persistence.

use polars::prelude::*;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::PipelineError;
use crate::pipeline::UnitOfWork;

/// Directory holding one parquet file per processed unit of work.
pub const MONTHLY_DIR: &str = "monthly_aggregates";
/// Directory holding one combined parquet file per year.
pub const COMBINED_DIR: &str = "concatenated";

/// Deterministic per-unit output path. Re-running a unit overwrites the
/// same file.
pub fn unit_output_path(root: &Path, unit: &UnitOfWork) -> PathBuf {
    root.join(MONTHLY_DIR)
        .join(unit.year.to_string())
        .join(unit.month.name())
        .join(format!(
            "{} - {} {}.parquet.gz",
            unit.ride_type.short_label(),
            unit.month.name(),
            unit.year
        ))
}

/// Path of a year's combined output file.
pub fn combined_output_path(root: &Path, year: i32) -> PathBuf {
    root.join(COMBINED_DIR)
        .join(year.to_string())
        .join(format!("{year} Taxi and Ride Hailing Records.parquet.gz"))
}

/// Writes a frame as gzip-compressed parquet. The write goes to a
/// temporary sibling first and is renamed into place, so an interrupted
/// write never leaves a partial output file.
pub fn write_parquet(df: &mut DataFrame, path: &Path) -> Result<(), PipelineError> {
    let write_err = |source: PolarsError| PipelineError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| write_err(e.into()))?;
    }

    let tmp = path.with_extension("tmp");
    debug!(path = %path.display(), tmp = %tmp.display(), "Writing parquet output");

    let file = File::create(&tmp).map_err(|e| write_err(e.into()))?;
    ParquetWriter::new(file)
        .with_compression(ParquetCompression::Gzip(None))
        .finish(df)
        .map_err(write_err)?;

    fs::rename(&tmp, path).map_err(|e| write_err(e.into()))?;
    Ok(())
}

/// Reads one persisted output file back into a frame.
pub fn read_parquet(path: &Path) -> Result<DataFrame, PipelineError> {
    let file = File::open(path).map_err(|e| PipelineError::Processing(e.into()))?;
    let df = ParquetReader::new(file).finish()?;
    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::normalize::RideType;
    use chrono::Month;
    use polars::df;
    use std::env;

    fn temp_path(name: &str) -> PathBuf {
        env::temp_dir().join(name)
    }

    #[test]
    fn unit_path_encodes_year_month_and_ride_type() {
        let unit = UnitOfWork {
            year: 2020,
            month: Month::March,
            ride_type: RideType::Yellow,
            url: String::new(),
        };

        let path = unit_output_path(Path::new("data"), &unit);
        assert_eq!(
            path,
            Path::new("data/monthly_aggregates/2020/March/Yellow Taxi - March 2020.parquet.gz")
        );
    }

    #[test]
    fn combined_path_encodes_year() {
        let path = combined_output_path(Path::new("data"), 2020);
        assert_eq!(
            path,
            Path::new("data/concatenated/2020/2020 Taxi and Ride Hailing Records.parquet.gz")
        );
    }

    #[test]
    fn write_then_read_round_trips_and_leaves_no_temp_file() {
        let path = temp_path("tlc_output_roundtrip.parquet.gz");
        let _ = fs::remove_file(&path);

        let mut df = df!("a" => [1i32, 2], "b" => ["x", "y"]).unwrap();
        write_parquet(&mut df, &path).unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists());

        let back = read_parquet(&path).unwrap();
        assert_eq!(back.height(), 2);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn rewriting_overwrites_the_previous_output() {
        let path = temp_path("tlc_output_overwrite.parquet.gz");
        let _ = fs::remove_file(&path);

        let mut first = df!("a" => [1i32, 2, 3]).unwrap();
        write_parquet(&mut first, &path).unwrap();

        let mut second = df!("a" => [9i32]).unwrap();
        write_parquet(&mut second, &path).unwrap();

        let back = read_parquet(&path).unwrap();
        assert_eq!(back.height(), 1);

        fs::remove_file(&path).unwrap();
    }
}
