//! Remote publishing: S3 upload and metadata-catalog refresh.

use anyhow::Result;
use aws_sdk_s3::primitives::ByteStream;
use std::path::Path;
use tracing::{debug, info};

/// Copies a local output file to an S3 bucket under `key`.
pub async fn upload_file(
    client: &aws_sdk_s3::Client,
    bucket: &str,
    key: &str,
    path: &Path,
) -> Result<()> {
    let body = std::fs::read(path)?;

    client
        .put_object()
        .bucket(bucket)
        .key(key)
        .body(ByteStream::from(body))
        .send()
        .await?;

    info!(bucket, key, path = %path.display(), "Uploaded output file");
    Ok(())
}

/// Refreshes a Glue crawler: stops it if it happens to be running, then
/// starts it. A "crawler not running" response to the stop is a no-op.
pub async fn refresh_crawler(glue: &aws_sdk_glue::Client, name: &str) -> Result<()> {
    match glue.stop_crawler().name(name).send().await {
        Ok(_) => info!(crawler = name, "Stopped running crawler before refresh"),
        Err(err)
            if err
                .as_service_error()
                .is_some_and(|e| e.is_crawler_not_running_exception()) =>
        {
            debug!(crawler = name, "Crawler not running");
        }
        Err(err) => return Err(err.into()),
    }

    glue.start_crawler().name(name).send().await?;

    info!(crawler = name, "Crawler refresh started");
    Ok(())
}
