//! Updater test utilities

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tempfile::TempDir;
use tokio::runtime::Handle;

use plugin_updater::config::{
    ConfigSource, DEV_INDICATOR, PluginConfig, SourceConfig, UpdateSection, UpdaterConfig,
};
use plugin_updater::updater::runner::TokioRunner;
use plugin_updater::updater::throttle::Clock;
use plugin_updater::updater::{Recipient, StagingTarget, Updater};
use plugin_updater::version::client::RemoteSourceClient;
use plugin_updater::version::error::{ConfigError, UpdateError};
use plugin_updater::version::handler::UpdateSourceHandler;
use plugin_updater::version::semver::Version;

pub const MANIFEST_URL: &str = "https://example.com/releases.json";

/// Fake client serving a single manifest entry and a fixed artifact
pub struct FakeClient {
    version: Mutex<String>,
    artifact: Vec<u8>,
    download_delay: Duration,
    fetches: AtomicUsize,
    downloads: AtomicUsize,
}

impl FakeClient {
    pub fn new(version: &str) -> Self {
        Self {
            version: Mutex::new(version.to_string()),
            artifact: b"plugin artifact".to_vec(),
            download_delay: Duration::ZERO,
            fetches: AtomicUsize::new(0),
            downloads: AtomicUsize::new(0),
        }
    }

    pub fn with_download_delay(mut self, delay: Duration) -> Self {
        self.download_delay = delay;
        self
    }

    pub fn set_version(&self, version: &str) {
        *self.version.lock().unwrap() = version.to_string();
    }

    pub fn artifact(&self) -> &[u8] {
        &self.artifact
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteSourceClient for FakeClient {
    async fn fetch_text(&self, _url: &str) -> Result<String, UpdateError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let version = self.version.lock().unwrap().clone();
        Ok(format!(
            r#"{{"version": "{version}", "url": "https://dl/{version}.jar"}}"#
        ))
    }

    async fn download_to(&self, _url: &str, destination: &Path) -> Result<u64, UpdateError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.download_delay).await;
        tokio::fs::write(destination, &self.artifact)
            .await
            .map_err(|e| UpdateError::Io {
                message: "fake write failed".to_string(),
                source: e,
            })?;
        Ok(self.artifact.len() as u64)
    }
}

pub struct StaticConfig(pub UpdateSection);

impl ConfigSource for StaticConfig {
    fn load(&self) -> Result<PluginConfig, ConfigError> {
        Ok(PluginConfig {
            update: self.0.clone(),
        })
    }
}

pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

pub struct RecordingRecipient {
    id: String,
    messages: Mutex<Vec<String>>,
}

impl RecordingRecipient {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            messages: Mutex::new(Vec::new()),
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl Recipient for RecordingRecipient {
    fn id(&self) -> &str {
        &self.id
    }

    fn send_message(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

pub struct TestUpdater {
    pub updater: Updater,
    pub runner: Arc<TokioRunner>,
    pub staging: PathBuf,
    _dir: TempDir,
}

/// Build an updater at version 1.0.0 reading `sources` through `client`
pub fn create_test_updater(
    section: UpdateSection,
    client: Arc<dyn RemoteSourceClient>,
    sources: Vec<SourceConfig>,
) -> TestUpdater {
    let dir = TempDir::new().unwrap();
    let staging = dir.path().join("update");
    let runner = Arc::new(TokioRunner::new(Handle::current()));

    let updater = Updater::new(
        UpdaterConfig::new(
            Arc::new(StaticConfig(UpdateSection { sources, ..section })),
            Version::parse("1.0.0").unwrap(),
            DEV_INDICATOR,
        ),
        UpdateSourceHandler::new(client),
        runner.clone(),
        Arc::new(FixedClock(Utc::now())),
        StagingTarget {
            directory: staging.clone(),
            file_name: "plugin.jar".to_string(),
        },
    );

    TestUpdater {
        updater,
        runner,
        staging,
        _dir: dir,
    }
}

pub fn manifest_sources() -> Vec<SourceConfig> {
    vec![SourceConfig::Manifest {
        url: MANIFEST_URL.to_string(),
    }]
}
