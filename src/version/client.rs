//! HTTP access to remote release sources

use std::path::Path;
use std::time::Duration;

#[cfg(test)]
use mockall::automock;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::config::{CONNECT_TIMEOUT_MS, READ_TIMEOUT_MS, USER_AGENT};
use crate::version::error::UpdateError;

/// Trait for talking to a single remote endpoint
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait RemoteSourceClient: Send + Sync {
    /// Fetches the response body of `url` as text
    ///
    /// # Returns
    /// * `Err(UpdateError::Unauthorized)` - HTTP 403
    /// * `Err(UpdateError::Transport)` - any other non-2xx status or network failure
    async fn fetch_text(&self, url: &str) -> Result<String, UpdateError>;

    /// Streams the body of `url` into the existing file at `destination`
    ///
    /// Returns the number of bytes written.
    async fn download_to(&self, url: &str, destination: &Path) -> Result<u64, UpdateError>;
}

/// reqwest based client with bounded connect and read timeouts
pub struct HttpSourceClient {
    client: reqwest::Client,
}

impl HttpSourceClient {
    pub fn new() -> Result<Self, UpdateError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_millis(CONNECT_TIMEOUT_MS))
            .read_timeout(Duration::from_millis(READ_TIMEOUT_MS))
            .build()?;
        Ok(Self { client })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, UpdateError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::FORBIDDEN {
            warn!("{} returned 403, skipping this source for now", url);
            return Err(UpdateError::Unauthorized {
                url: url.to_string(),
            });
        }

        if !status.is_success() {
            warn!("{} returned status {}", url, status);
            return Err(UpdateError::Transport(format!(
                "Unexpected status {} from {}",
                status, url
            )));
        }

        Ok(response)
    }
}

#[async_trait::async_trait]
impl RemoteSourceClient for HttpSourceClient {
    async fn fetch_text(&self, url: &str) -> Result<String, UpdateError> {
        debug!("Fetching {}", url);
        let response = self.get(url).await?;
        Ok(response.text().await?)
    }

    async fn download_to(&self, url: &str, destination: &Path) -> Result<u64, UpdateError> {
        debug!("Downloading {} to {:?}", url, destination);
        let mut response = self.get(url).await?;

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(destination)
            .await
            .map_err(|e| {
                UpdateError::io(format!("Could not open '{}'", destination.display()), e)
            })?;

        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await.map_err(|e| {
                UpdateError::io(format!("Could not write '{}'", destination.display()), e)
            })?;
            written += chunk.len() as u64;
        }

        file.sync_all().await.map_err(|e| {
            UpdateError::io(format!("Could not flush '{}'", destination.display()), e)
        })?;

        Ok(written)
    }
}
