//! Processed-period tracking.
//!
//! A small marker object in S3 records the latest (month, year) the
//! pipeline has processed; comparing it against the latest published
//! period decides whether a run has anything to do.

use anyhow::Result;
use aws_sdk_s3::primitives::ByteStream;
use chrono::Month;
use tracing::info;

pub const STATE_KEY: &str = "state/prev_state.txt";

/// Marker text for a period, e.g. `"March 2020"`.
pub fn marker(month: Month, year: i32) -> String {
    format!("{} {}", month.name(), year)
}

/// Whether the recorded marker already matches the latest published one.
pub fn is_current(prev: Option<&str>, latest: &str) -> bool {
    prev.is_some_and(|p| p.trim() == latest)
}

/// Reads the recorded marker, or `None` if no marker object exists yet.
pub async fn read_marker(s3: &aws_sdk_s3::Client, bucket: &str) -> Result<Option<String>> {
    match s3.get_object().bucket(bucket).key(STATE_KEY).send().await {
        Ok(out) => {
            let bytes = out.body.collect().await?.into_bytes();
            Ok(Some(String::from_utf8(bytes.to_vec())?))
        }
        Err(err) if err.as_service_error().is_some_and(|e| e.is_no_such_key()) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Records `marker` as the latest processed period.
pub async fn write_marker(s3: &aws_sdk_s3::Client, bucket: &str, marker: &str) -> Result<()> {
    s3.put_object()
        .bucket(bucket)
        .key(STATE_KEY)
        .body(ByteStream::from(marker.as_bytes().to_vec()))
        .send()
        .await?;

    info!(marker, "State marker updated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_formats_month_and_year() {
        assert_eq!(marker(Month::March, 2020), "March 2020");
    }

    #[test]
    fn current_only_when_markers_match() {
        assert!(is_current(Some("March 2020"), "March 2020"));
        assert!(is_current(Some("March 2020\n"), "March 2020"));
        assert!(!is_current(Some("February 2020"), "March 2020"));
        assert!(!is_current(None, "March 2020"));
    }
}
