use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("Malformed version: {0}")]
    MalformedVersion(String),

    #[error("Access denied by {url} (HTTP 403), the source may be rate limiting")]
    Unauthorized { url: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid payload from {url}: {reason}")]
    InvalidPayload { url: String, reason: String },

    #[error(
        "The file '{}' already exists! Please wait for the currently running update to finish. If no update is running delete the file manually.",
        .0.display()
    )]
    AlreadyInProgress(PathBuf),

    #[error("{message}: {source}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "Download was interrupted! A broken file is left at '{}'. Delete this file or the updater will not work anymore, then try the update again.",
        .path.display()
    )]
    CleanupFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("The updater is disabled! Change config entry 'update.enabled' to 'true' to enable it.")]
    Disabled,

    #[error(
        "Update aborted! A newer version was found. New version '{0}'! You can run the update again to install it."
    )]
    RaceDetected(String),

    #[error(
        "The updater did not find an update! This can depend on your strategy, check config entry 'update.strategy'."
    )]
    NoUpdateFound,
}

impl UpdateError {
    pub(crate) fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }
}

impl From<reqwest::Error> for UpdateError {
    fn from(e: reqwest::Error) -> Self {
        UpdateError::Transport(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}
