use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

#[cfg(test)]
use mockall::automock;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::version::comparator::{Channel, UpdateScope, VersionComparator};
use crate::version::error::ConfigError;
use crate::version::semver::Version;
use crate::version::sources::github::DEFAULT_API_BASE;

// =============================================================================
// Time-related constants
// =============================================================================

/// Minimum delay between two update searches in seconds (10 minutes)
///
/// Keeps the number of API requests low when the host reloads often.
pub const SEARCH_COOLDOWN_SECS: i64 = 10 * 60;

/// Minimum delay between two notifications to the same recipient in seconds (20 hours)
pub const NOTIFICATION_COOLDOWN_SECS: i64 = 20 * 60 * 60;

/// Connect timeout for remote calls in milliseconds
pub const CONNECT_TIMEOUT_MS: u64 = 5_000;

/// Read timeout for remote calls in milliseconds
pub const READ_TIMEOUT_MS: u64 = 5_000;

// =============================================================================
// Update pipeline constants
// =============================================================================

/// Qualifier marking development builds, e.g. `2.0.0-DEV-142`
pub const DEV_INDICATOR: &str = "DEV";

/// Suffix of the in-progress download next to the final artifact
pub const TEMP_FILE_SUFFIX: &str = ".tmp";

pub const USER_AGENT: &str = "plugin-updater";

/// Persisted plugin configuration
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct PluginConfig {
    pub update: UpdateSection,
}

/// The `update` section of the configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct UpdateSection {
    pub enabled: bool,
    pub automatic: bool,
    pub ingame_notification: bool,
    pub strategy: Channel,
    pub scope: UpdateScope,
    pub sources: Vec<SourceConfig>,
}

impl Default for UpdateSection {
    fn default() -> Self {
        Self {
            enabled: true,
            automatic: false,
            ingame_notification: true,
            strategy: Channel::Stable,
            scope: UpdateScope::Major,
            sources: Vec::new(),
        }
    }
}

/// A configured release source
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceConfig {
    Github {
        repository: String,
        #[serde(default = "default_api_base")]
        api_base: String,
        #[serde(default = "default_asset_suffix")]
        asset_suffix: String,
    },
    Manifest {
        url: String,
    },
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_asset_suffix() -> String {
    ".jar".to_string()
}

/// Trait for reading the persisted configuration
#[cfg_attr(test, automock)]
pub trait ConfigSource: Send + Sync {
    fn load(&self) -> Result<PluginConfig, ConfigError>;
}

/// JSON configuration file. A missing file yields the defaults.
pub struct JsonFileConfig {
    path: PathBuf,
}

impl JsonFileConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConfigSource for JsonFileConfig {
    fn load(&self) -> Result<PluginConfig, ConfigError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Config file {:?} not found, using defaults", self.path);
                return Ok(PluginConfig::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        Ok(serde_json::from_str(&content)?)
    }
}

/// Policy values the updater works with, derived from one configuration read
#[derive(Debug, Clone, PartialEq)]
pub struct UpdaterSettings {
    pub enabled: bool,
    pub automatic: bool,
    pub ingame_notification: bool,
    pub channel: Channel,
    pub scope: UpdateScope,
    /// Sources queried on every search, in declaration order
    pub sources: Vec<SourceConfig>,
}

impl UpdaterSettings {
    fn derive(section: &UpdateSection, current_version: &Version, dev_indicator: &str) -> Self {
        // A development install keeps receiving development builds.
        let channel = if current_version.is_dev_build(dev_indicator) {
            Channel::Development
        } else {
            section.strategy
        };

        Self {
            enabled: section.enabled,
            automatic: section.automatic,
            ingame_notification: section.ingame_notification,
            channel,
            scope: section.scope,
            sources: section.sources.clone(),
        }
    }

    pub fn comparator(&self) -> VersionComparator {
        VersionComparator::new(self.channel, self.scope)
    }
}

/// Reloadable view over the persisted configuration
pub struct UpdaterConfig {
    source: Arc<dyn ConfigSource>,
    current_version: Version,
    dev_indicator: String,
    settings: RwLock<UpdaterSettings>,
}

impl UpdaterConfig {
    pub fn new(source: Arc<dyn ConfigSource>, current_version: Version, dev_indicator: &str) -> Self {
        let config = Self {
            source,
            settings: RwLock::new(UpdaterSettings::derive(
                &UpdateSection::default(),
                &current_version,
                dev_indicator,
            )),
            current_version,
            dev_indicator: dev_indicator.to_string(),
        };
        config.reload_from_config();
        config
    }

    /// Re-read every field from the configuration source.
    ///
    /// The new snapshot replaces the old one as a whole. If the source
    /// cannot be read, the previous snapshot stays in place.
    pub fn reload_from_config(&self) -> bool {
        let config = match self.source.load() {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to reload updater config, keeping previous values: {}", e);
                return false;
            }
        };

        let next = UpdaterSettings::derive(
            &config.update,
            &self.current_version,
            &self.dev_indicator,
        );

        if next.channel != config.update.strategy {
            debug!(
                "Installed version {} is a development build, 'update.strategy' is treated as development",
                self.current_version
            );
        }

        *self.settings.write().unwrap_or_else(PoisonError::into_inner) = next;
        true
    }

    /// Copy of the current snapshot
    pub fn snapshot(&self) -> UpdaterSettings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_enabled(&self) -> bool {
        self.snapshot().enabled
    }

    pub fn is_automatic(&self) -> bool {
        self.snapshot().automatic
    }

    pub fn is_ingame_notification(&self) -> bool {
        self.snapshot().ingame_notification
    }

    pub fn current_version(&self) -> &Version {
        &self.current_version
    }
}

/// Returns the path to the data directory for plugin-updater.
/// Uses $XDG_DATA_HOME/plugin-updater if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/plugin-updater,
/// or ./plugin-updater if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the default staging directory for downloaded artifacts.
pub fn staging_dir() -> PathBuf {
    data_dir().join("update")
}

/// Returns the default configuration file.
pub fn config_path() -> PathBuf {
    data_dir().join("config.json")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("plugin-updater")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;
    use tempfile::TempDir;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn plugin_config_from_partial_object_uses_defaults_for_missing_fields() {
        let result = serde_json::from_value::<PluginConfig>(json!({
            "update": {
                "automatic": true
            }
        }))
        .unwrap();

        assert!(result.update.enabled);
        assert!(result.update.automatic);
        assert!(result.update.ingame_notification);
        assert_eq!(result.update.strategy, Channel::Stable);
        assert!(result.update.sources.is_empty());
    }

    #[test]
    fn plugin_config_from_full_object_parses_all_fields() {
        let result = serde_json::from_value::<PluginConfig>(json!({
            "update": {
                "enabled": false,
                "automatic": true,
                "ingame_notification": false,
                "strategy": "development",
                "scope": "patch",
                "sources": [
                    { "kind": "github", "repository": "owner/plugin" },
                    { "kind": "manifest", "url": "https://example.com/releases.json" }
                ]
            }
        }))
        .unwrap();

        assert_eq!(
            result,
            PluginConfig {
                update: UpdateSection {
                    enabled: false,
                    automatic: true,
                    ingame_notification: false,
                    strategy: Channel::Development,
                    scope: UpdateScope::Patch,
                    sources: vec![
                        SourceConfig::Github {
                            repository: "owner/plugin".to_string(),
                            api_base: DEFAULT_API_BASE.to_string(),
                            asset_suffix: ".jar".to_string(),
                        },
                        SourceConfig::Manifest {
                            url: "https://example.com/releases.json".to_string(),
                        },
                    ],
                }
            }
        );
    }

    #[test]
    fn json_file_config_returns_defaults_for_missing_file() {
        let dir = TempDir::new().unwrap();
        let source = JsonFileConfig::new(dir.path().join("missing.json"));

        assert_eq!(source.load().unwrap(), PluginConfig::default());
    }

    #[test]
    fn json_file_config_reports_parse_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let result = JsonFileConfig::new(&path).load();

        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn reload_from_config_replaces_all_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"update": {"enabled": true, "automatic": false}}"#).unwrap();

        let config = UpdaterConfig::new(Arc::new(JsonFileConfig::new(&path)), v("1.0.0"), DEV_INDICATOR);
        assert!(config.is_enabled());
        assert!(!config.is_automatic());

        std::fs::write(
            &path,
            r#"{"update": {"enabled": false, "automatic": true, "ingame_notification": false}}"#,
        )
        .unwrap();
        assert!(config.reload_from_config());

        assert!(!config.is_enabled());
        assert!(config.is_automatic());
        assert!(!config.is_ingame_notification());
    }

    #[test]
    fn reload_from_config_picks_up_changed_sources() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"update": {"sources": []}}"#).unwrap();

        let config = UpdaterConfig::new(Arc::new(JsonFileConfig::new(&path)), v("1.0.0"), DEV_INDICATOR);
        assert!(config.snapshot().sources.is_empty());

        std::fs::write(
            &path,
            r#"{"update": {"sources": [{"kind": "manifest", "url": "https://example.com/releases.json"}]}}"#,
        )
        .unwrap();
        assert!(config.reload_from_config());

        assert_eq!(
            config.snapshot().sources,
            vec![SourceConfig::Manifest {
                url: "https://example.com/releases.json".to_string(),
            }]
        );
    }

    #[test]
    fn reload_from_config_keeps_previous_snapshot_on_error() {
        let mut source = MockConfigSource::new();
        let mut seq = mockall::Sequence::new();
        source
            .expect_load()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| {
                Ok(PluginConfig {
                    update: UpdateSection {
                        automatic: true,
                        ..UpdateSection::default()
                    },
                })
            });
        source
            .expect_load()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Err(serde_json::from_str::<PluginConfig>("{").unwrap_err().into()));

        let config = UpdaterConfig::new(Arc::new(source), v("1.0.0"), DEV_INDICATOR);
        let before = config.snapshot();

        assert!(!config.reload_from_config());
        assert_eq!(config.snapshot(), before);
        assert!(config.is_automatic());
    }

    #[test]
    fn dev_install_forces_development_channel() {
        let mut source = MockConfigSource::new();
        source.expect_load().returning(|| Ok(PluginConfig::default()));

        let config = UpdaterConfig::new(Arc::new(source), v("2.0.0-DEV-12"), DEV_INDICATOR);

        assert_eq!(config.snapshot().channel, Channel::Development);
        assert_eq!(config.current_version().as_str(), "2.0.0-DEV-12");
    }

    #[test]
    fn data_dir_with_env_uses_xdg_data_home_when_set() {
        let path = data_dir_with_env(
            Some("/tmp/test-data".to_string()),
            Some(PathBuf::from("/home/user")),
        );

        assert_eq!(path, PathBuf::from("/tmp/test-data/plugin-updater"));
    }

    #[test]
    fn data_dir_with_env_falls_back_to_home_local_share() {
        let path = data_dir_with_env(None, Some(PathBuf::from("/home/user")));

        assert_eq!(path, PathBuf::from("/home/user/.local/share/plugin-updater"));
    }

    #[test]
    fn data_dir_with_env_falls_back_to_current_dir_when_no_dirs_available() {
        let path = data_dir_with_env(None, None);
        assert_eq!(path, PathBuf::from("./plugin-updater"));
    }

    #[test]
    #[serial]
    fn staging_dir_follows_xdg_data_home() {
        let previous = std::env::var("XDG_DATA_HOME").ok();
        // SAFETY: serialized with every other test touching the environment.
        unsafe { std::env::set_var("XDG_DATA_HOME", "/tmp/xdg-test") };

        let staging = staging_dir();

        match previous {
            Some(value) => unsafe { std::env::set_var("XDG_DATA_HOME", value) },
            None => unsafe { std::env::remove_var("XDG_DATA_HOME") },
        }
        assert_eq!(staging, PathBuf::from("/tmp/xdg-test/plugin-updater/update"));
    }
}
