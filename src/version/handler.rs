//! Multi-source update search

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::config::UpdaterSettings;
use crate::version::client::RemoteSourceClient;
use crate::version::semver::Version;
use crate::version::sources::{Release, sources_from_config};

/// The best known release.
///
/// Without a download URL the version is the installed (or already
/// downloaded) one and no update is pending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCandidate {
    pub version: Version,
    pub download_url: Option<String>,
}

impl UpdateCandidate {
    pub fn installed(version: Version) -> Self {
        Self {
            version,
            download_url: None,
        }
    }

    pub fn available(version: Version, download_url: String) -> Self {
        Self {
            version,
            download_url: Some(download_url),
        }
    }

    pub fn has_update(&self) -> bool {
        self.download_url.is_some()
    }
}

/// Queries every configured source and picks the best candidate
pub struct UpdateSourceHandler {
    client: Arc<dyn RemoteSourceClient>,
}

impl UpdateSourceHandler {
    pub fn new(client: Arc<dyn RemoteSourceClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<dyn RemoteSourceClient> {
        &self.client
    }

    /// Search the sources of `settings` for a release newer than `current`.
    ///
    /// The source list is rebuilt from the snapshot on every call, so a
    /// reloaded configuration takes effect on the next search. Sources are
    /// queried in parallel. A failing source is logged and
    /// skipped. Among the qualifying releases the greatest version wins,
    /// ties go to the source declared first. When nothing qualifies the
    /// result is `current` without a download URL.
    pub async fn search_update(
        &self,
        settings: &UpdaterSettings,
        current: &Version,
    ) -> UpdateCandidate {
        let comparator = settings.comparator();
        let sources = sources_from_config(&settings.sources);

        let futures = sources.iter().map(|source| {
            let client = self.client.clone();
            async move { (source, source.fetch_releases(&*client).await) }
        });

        let mut best: Option<Release> = None;
        for (source, result) in join_all(futures).await {
            let releases = match result {
                Ok(releases) => releases,
                Err(e) => {
                    warn!("Skipping update source {}: {}", source.name(), e);
                    continue;
                }
            };

            let Some(release) = comparator.select_best(current, &releases, |r| &r.version) else {
                debug!("{} has no release newer than {}", source.name(), current);
                continue;
            };

            debug!("{} offers {}", source.name(), release.version);
            if best.as_ref().is_none_or(|b| release.version > b.version) {
                best = Some(release.clone());
            }
        }

        match best {
            Some(release) => {
                info!("Found update candidate {}", release.version);
                UpdateCandidate::available(release.version, release.download_url)
            }
            None => UpdateCandidate::installed(current.clone()),
        }
    }
}
