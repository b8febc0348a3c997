use async_trait::async_trait;
use bytes::Bytes;

use super::FetchError;

/// Minimal HTTP surface the pipeline needs, so tests can substitute fakes.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Performs a HEAD request and returns the response status code.
    async fn head_status(&self, url: &str) -> Result<u16, FetchError>;

    /// Performs a GET request and returns the full response body.
    async fn get_bytes(&self, url: &str) -> Result<Bytes, FetchError>;
}
