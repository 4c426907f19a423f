//! GitHub Releases API source

use serde::Deserialize;
use tracing::{debug, warn};

use crate::version::client::RemoteSourceClient;
use crate::version::error::UpdateError;
use crate::version::semver::Version;
use crate::version::sources::{Release, UpdateSource};

/// Default base URL for GitHub API
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Response item from GitHub Releases API
#[derive(Debug, Deserialize)]
struct GitHubRelease {
    tag_name: String,
    #[serde(default)]
    assets: Vec<GitHubAsset>,
}

#[derive(Debug, Deserialize)]
struct GitHubAsset {
    name: String,
    browser_download_url: String,
}

/// Source reading `/repos/{repository}/releases`
pub struct GitHubReleaseSource {
    name: String,
    url: String,
    asset_suffix: String,
}

impl GitHubReleaseSource {
    pub fn new(api_base: &str, repository: &str, asset_suffix: &str) -> Self {
        Self {
            name: format!("github {}", repository),
            url: format!(
                "{}/repos/{}/releases",
                api_base.trim_end_matches('/'),
                repository
            ),
            asset_suffix: asset_suffix.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl UpdateSource for GitHubReleaseSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_releases(
        &self,
        client: &dyn RemoteSourceClient,
    ) -> Result<Vec<Release>, UpdateError> {
        let body = client.fetch_text(&self.url).await?;

        let releases: Vec<GitHubRelease> = serde_json::from_str(&body).map_err(|e| {
            warn!("Failed to parse GitHub releases response: {}", e);
            UpdateError::InvalidPayload {
                url: self.url.clone(),
                reason: e.to_string(),
            }
        })?;

        let mut result = Vec::with_capacity(releases.len());
        for release in releases {
            let Some(asset) = release
                .assets
                .into_iter()
                .find(|a| a.name.ends_with(&self.asset_suffix))
            else {
                debug!(
                    "Release {} has no asset ending with '{}', ignoring it",
                    release.tag_name, self.asset_suffix
                );
                continue;
            };

            // Repositories often carry tags outside the version scheme.
            let version = match Version::parse(&release.tag_name) {
                Ok(version) => version,
                Err(e) => {
                    warn!("Skipping release of {}: {}", self.name, e);
                    continue;
                }
            };

            result.push(Release {
                version,
                download_url: asset.browser_download_url,
            });
        }

        Ok(result)
    }
}
