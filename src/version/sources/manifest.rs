//! Plain JSON release manifest source
//!
//! The endpoint returns either a single `{"version", "url"}` object or an
//! array of them.

use serde::Deserialize;
use tracing::warn;

use crate::version::client::RemoteSourceClient;
use crate::version::error::UpdateError;
use crate::version::semver::Version;
use crate::version::sources::{Release, UpdateSource};

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    version: String,
    url: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ManifestPayload {
    Many(Vec<ManifestEntry>),
    One(ManifestEntry),
}

pub struct ManifestSource {
    name: String,
    url: String,
}

impl ManifestSource {
    pub fn new(url: &str) -> Self {
        Self {
            name: format!("manifest {}", url),
            url: url.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl UpdateSource for ManifestSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_releases(
        &self,
        client: &dyn RemoteSourceClient,
    ) -> Result<Vec<Release>, UpdateError> {
        let body = client.fetch_text(&self.url).await?;

        let payload: ManifestPayload = serde_json::from_str(&body).map_err(|e| {
            warn!("Failed to parse release manifest {}: {}", self.url, e);
            UpdateError::InvalidPayload {
                url: self.url.clone(),
                reason: e.to_string(),
            }
        })?;

        let entries = match payload {
            ManifestPayload::Many(entries) => entries,
            ManifestPayload::One(entry) => vec![entry],
        };

        entries
            .into_iter()
            .map(|entry| {
                Ok(Release {
                    version: Version::parse(&entry.version)?,
                    download_url: entry.url,
                })
            })
            .collect()
    }
}
