//! Year-level combining of per-unit output files.

use polars::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::PipelineError;
use crate::output;

/// Concatenates every per-unit file under a year's output tree into one
/// combined file and returns its path.
///
/// All inputs must share one schema; rows are unioned without dedup.
pub fn combine_year(output_root: &Path, year: i32) -> Result<PathBuf, PipelineError> {
    let year_dir = output_root.join(output::MONTHLY_DIR).join(year.to_string());
    let files = collect_unit_files(&year_dir)?;

    let mut paths = files.into_iter();
    let first_path = paths.next().ok_or_else(|| {
        PipelineError::Processing(PolarsError::NoData(
            format!("no unit files under {}", year_dir.display()).into(),
        ))
    })?;

    let mut combined = output::read_parquet(&first_path)?;
    let expected = schema_signature(&combined);

    for path in paths {
        let df = output::read_parquet(&path)?;
        let found = schema_signature(&df);
        if found != expected {
            return Err(PipelineError::SchemaMismatch {
                path,
                detail: format!("expected {expected:?}, found {found:?}"),
            });
        }
        combined.vstack_mut(&df)?;
    }

    let out_path = output::combined_output_path(output_root, year);
    output::write_parquet(&mut combined, &out_path)?;

    info!(year, rows = combined.height(), path = %out_path.display(), "Year combined");
    Ok(out_path)
}

fn schema_signature(df: &DataFrame) -> Vec<(String, DataType)> {
    df.get_column_names()
        .iter()
        .map(|s| s.to_string())
        .zip(df.dtypes())
        .collect()
}

fn collect_unit_files(year_dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let io_err = |e: std::io::Error| PipelineError::Processing(e.into());

    let mut files = Vec::new();
    for month_entry in fs::read_dir(year_dir).map_err(io_err)? {
        let month_entry = month_entry.map_err(io_err)?;
        if !month_entry.file_type().map_err(io_err)?.is_dir() {
            continue;
        }

        for file_entry in fs::read_dir(month_entry.path()).map_err(io_err)? {
            let path = file_entry.map_err(io_err)?.path();
            let is_unit_file = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(".parquet.gz"));
            if is_unit_file {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;
    use std::env;

    fn scratch_root(name: &str) -> PathBuf {
        let root = env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&root);
        root
    }

    fn write_unit(root: &Path, month: &str, file: &str, df: &mut DataFrame) {
        let path = root
            .join(output::MONTHLY_DIR)
            .join("2020")
            .join(month)
            .join(file);
        output::write_parquet(df, &path).unwrap();
    }

    #[test]
    fn combined_row_count_is_the_sum_of_inputs() {
        let root = scratch_root("tlc_combine_rows");

        let mut march = df!("zone" => [1i32, 2], "num_txns" => [5i32, 6]).unwrap();
        let mut april = df!("zone" => [3i32, 4, 5], "num_txns" => [1i32, 2, 3]).unwrap();
        write_unit(&root, "March", "Yellow Taxi - March 2020.parquet.gz", &mut march);
        write_unit(&root, "April", "Yellow Taxi - April 2020.parquet.gz", &mut april);

        let combined_path = combine_year(&root, 2020).unwrap();
        let combined = output::read_parquet(&combined_path).unwrap();

        assert_eq!(combined.height(), 5);

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn mismatched_schemas_are_rejected() {
        let root = scratch_root("tlc_combine_mismatch");

        let mut march = df!("zone" => [1i32], "num_txns" => [5i32]).unwrap();
        let mut april = df!("zone" => [2i32], "fare" => [1.5f64]).unwrap();
        write_unit(&root, "March", "Yellow Taxi - March 2020.parquet.gz", &mut march);
        write_unit(&root, "April", "Yellow Taxi - April 2020.parquet.gz", &mut april);

        let err = combine_year(&root, 2020).unwrap_err();
        assert!(matches!(err, PipelineError::SchemaMismatch { .. }));

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn missing_year_tree_is_an_error() {
        let root = scratch_root("tlc_combine_missing");
        assert!(combine_year(&root, 2020).is_err());
    }
}
