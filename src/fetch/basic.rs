use async_trait::async_trait;
use bytes::Bytes;

use super::FetchError;
use super::client::HttpClient;

pub struct BasicClient(reqwest::Client);

impl BasicClient {
    pub fn new() -> Self {
        Self(reqwest::Client::new())
    }
}

impl Default for BasicClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for BasicClient {
    async fn head_status(&self, url: &str) -> Result<u16, FetchError> {
        let resp = self.0.head(url).send().await?;
        Ok(resp.status().as_u16())
    }

    async fn get_bytes(&self, url: &str) -> Result<Bytes, FetchError> {
        let resp = self.0.get(url).send().await?;
        Ok(resp.error_for_status()?.bytes().await?)
    }
}
