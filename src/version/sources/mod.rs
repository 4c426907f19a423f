//! Release source implementations
//!
//! Each source knows how to turn one remote payload into a list of releases.
//! Network access goes through [`RemoteSourceClient`] so sources stay
//! independent of the transport.

pub mod github;
pub mod manifest;

use std::sync::Arc;

use crate::config::SourceConfig;
use crate::version::client::RemoteSourceClient;
use crate::version::error::UpdateError;
use crate::version::semver::Version;

pub use github::GitHubReleaseSource;
pub use manifest::ManifestSource;

/// A published version and where to download it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub version: Version,
    pub download_url: String,
}

/// Trait for a remote location that publishes releases
#[async_trait::async_trait]
pub trait UpdateSource: Send + Sync {
    /// Human readable name used in logs
    fn name(&self) -> &str;

    /// Fetches every release this source currently advertises
    async fn fetch_releases(
        &self,
        client: &dyn RemoteSourceClient,
    ) -> Result<Vec<Release>, UpdateError>;
}

/// Builds the sources declared in the configuration, keeping their order.
pub fn sources_from_config(configs: &[SourceConfig]) -> Vec<Arc<dyn UpdateSource>> {
    configs
        .iter()
        .map(|config| -> Arc<dyn UpdateSource> {
            match config {
                SourceConfig::Github {
                    repository,
                    api_base,
                    asset_suffix,
                } => Arc::new(GitHubReleaseSource::new(api_base, repository, asset_suffix)),
                SourceConfig::Manifest { url } => Arc::new(ManifestSource::new(url)),
            }
        })
        .collect()
}
