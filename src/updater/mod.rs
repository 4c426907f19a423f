//! Update orchestration
//!
//! [`Updater`] owns the latest known candidate and the throttle records,
//! hands network work to the host [`TaskRunner`] and performs the atomic
//! download into the staging directory.
//!
//! # Modules
//!
//! - [`install`]: temp-file based atomic download
//! - [`runner`]: host task runner abstraction and the tokio implementation
//! - [`throttle`]: search and notification cool-down gates

pub mod install;
pub mod runner;
pub mod throttle;

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Duration;
use tracing::{debug, error, info, warn};

use crate::config::{NOTIFICATION_COOLDOWN_SECS, SEARCH_COOLDOWN_SECS, UpdaterConfig};
use crate::updater::install::download_atomically;
use crate::updater::runner::TaskRunner;
use crate::updater::throttle::{Clock, NotificationThrottle, SearchGate};
use crate::version::error::UpdateError;
use crate::version::handler::{UpdateCandidate, UpdateSourceHandler};
use crate::version::semver::Version;

/// Someone who can receive messages: a player, an operator, the console
pub trait Recipient: Send + Sync {
    /// Stable identity used for notification throttling
    fn id(&self) -> &str;

    fn send_message(&self, message: &str);
}

/// Result of a successful update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub version: Version,
    pub artifact: PathBuf,
}

/// Where downloaded artifacts go
#[derive(Debug, Clone)]
pub struct StagingTarget {
    pub directory: PathBuf,
    pub file_name: String,
}

/// Checks for new versions and downloads them when wanted.
///
/// Cloning is cheap, clones share all state.
#[derive(Clone)]
pub struct Updater {
    inner: Arc<Inner>,
}

struct Inner {
    config: UpdaterConfig,
    handler: UpdateSourceHandler,
    runner: Arc<dyn TaskRunner>,
    clock: Arc<dyn Clock>,
    staging: StagingTarget,
    /// Without a download URL this is the installed or already downloaded version.
    latest: Mutex<UpdateCandidate>,
    /// Message for recipients, only set when in-game notifications are on
    notification: Mutex<Option<String>>,
    search_gate: SearchGate,
    notifications: NotificationThrottle,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Updater {
    pub fn new(
        config: UpdaterConfig,
        handler: UpdateSourceHandler,
        runner: Arc<dyn TaskRunner>,
        clock: Arc<dyn Clock>,
        staging: StagingTarget,
    ) -> Self {
        let latest = UpdateCandidate::installed(config.current_version().clone());
        Self {
            inner: Arc::new(Inner {
                config,
                handler,
                runner,
                clock,
                staging,
                latest: Mutex::new(latest),
                notification: Mutex::new(None),
                search_gate: SearchGate::new(Duration::seconds(SEARCH_COOLDOWN_SECS)),
                notifications: NotificationThrottle::new(Duration::seconds(
                    NOTIFICATION_COOLDOWN_SECS,
                )),
            }),
        }
    }

    pub fn config(&self) -> &UpdaterConfig {
        &self.inner.config
    }

    /// Starts an asynchronous search for updates.
    ///
    /// Does nothing if the updater is disabled or the last search is less
    /// than the cool-down ago. The gate closes before the search runs, even
    /// if the search later fails.
    pub fn search(&self) {
        let inner = &self.inner;
        inner.config.reload_from_config();
        if !inner.config.is_enabled() {
            debug!("Updater is disabled, skipping search");
            return;
        }
        if !inner.search_gate.try_pass(inner.clock.now()) {
            debug!("Searched for updates recently, skipping search");
            return;
        }

        let updater = self.clone();
        inner.runner.spawn(Box::pin(async move {
            updater.run_search().await;
        }));
    }

    async fn run_search(&self) {
        if !self.search_update().await {
            return;
        }

        let automatic = self.inner.config.is_automatic();
        info!("{}", self.stage_notification(automatic));
        if automatic {
            self.update(None);
        }
    }

    /// Query the sources and record a strictly newer candidate.
    ///
    /// Returns true if the record was replaced.
    async fn search_update(&self) -> bool {
        let settings = self.inner.config.snapshot();
        let baseline = self.latest().version;
        let found = self.inner.handler.search_update(&settings, &baseline).await;
        if !found.has_update() {
            return false;
        }

        let mut latest = lock(&self.inner.latest);
        if found.version <= latest.version {
            debug!(
                "Candidate {} is not newer than the recorded {}, keeping it",
                found.version, latest.version
            );
            return false;
        }
        *latest = found;
        true
    }

    /// Stage the recipient message and return the log line.
    fn stage_notification(&self, automatic_download: bool) -> String {
        let version = format!("Found newer version '{}', ", self.latest().version);
        let automatic = " automatically installed on the next restart!";

        let staged = if automatic_download {
            format!("{}it was downloaded and will be{}", version, automatic)
        } else {
            format!("{}it will be installed, if you run the update command!", version)
        };
        *lock(&self.inner.notification) =
            self.inner.config.is_ingame_notification().then_some(staged);

        if automatic_download {
            format!("{}it will be downloaded and{}", version, automatic)
        } else {
            format!("{}it will be installed, if you run the update command!", version)
        }
    }

    fn latest(&self) -> UpdateCandidate {
        lock(&self.inner.latest).clone()
    }

    /// True if a newer version is known and not downloaded yet.
    pub fn is_update_available(&self) -> bool {
        lock(&self.inner.latest).has_update()
    }

    /// The pending version, or `None` if there is no newer version.
    pub fn get_update_version(&self) -> Option<String> {
        let latest = lock(&self.inner.latest);
        latest
            .has_update()
            .then(|| latest.version.as_str().to_string())
    }

    /// Send the staged notification to `recipient`, at most once per
    /// cool-down window per recipient.
    pub fn send_update_notification(&self, recipient: &dyn Recipient) {
        let Some(message) = lock(&self.inner.notification).clone() else {
            return;
        };

        if !self
            .inner
            .notifications
            .try_pass(recipient.id(), self.inner.clock.now())
        {
            debug!("{} was notified recently, skipping", recipient.id());
            return;
        }

        recipient.send_message(&message);
    }

    /// Download the newest version into the staging directory in the
    /// background. Progress and failures go to `requester` and the log.
    pub fn update(&self, requester: Option<Arc<dyn Recipient>>) {
        let updater = self.clone();
        self.inner.runner.spawn(Box::pin(async move {
            let _ = updater.perform_update(requester.as_deref()).await;
        }));
    }

    /// The body of [`Updater::update`], for hosts that need to wait on it.
    pub async fn perform_update(
        &self,
        requester: Option<&dyn Recipient>,
    ) -> Result<UpdateOutcome, UpdateError> {
        let result = self.try_update(requester).await;

        if let Err(e) = &result {
            match e {
                UpdateError::CleanupFailed { .. } => error!("Update failed: {}", e),
                _ => warn!("Update failed: {}", e),
            }
            if let Some(requester) = requester {
                requester.send_message(&e.to_string());
            }
        }

        result
    }

    async fn try_update(
        &self,
        requester: Option<&dyn Recipient>,
    ) -> Result<UpdateOutcome, UpdateError> {
        let inner = &self.inner;
        inner.config.reload_from_config();
        if !inner.config.is_enabled() {
            return Err(UpdateError::Disabled);
        }

        if self.search_update().await {
            self.stage_notification(inner.config.is_automatic());
            return Err(UpdateError::RaceDetected(self.latest().version.to_string()));
        }

        let latest = self.latest();
        let Some(url) = latest.download_url else {
            return Err(UpdateError::NoUpdateFound);
        };
        let version = latest.version;

        self.report(
            requester,
            &format!("Started update to version '{}'...", version),
        );

        let directory = &inner.staging.directory;
        tokio::fs::create_dir_all(directory).await.map_err(|e| {
            UpdateError::io(
                format!("The updater could not create the folder '{}'", directory.display()),
                e,
            )
        })?;

        let artifact = download_atomically(
            &**inner.handler.client(),
            &url,
            directory,
            &inner.staging.file_name,
        )
        .await?;

        let collapsed = {
            let mut latest = lock(&inner.latest);
            let collapsed = latest.version == version;
            if collapsed {
                latest.download_url = None;
            }
            collapsed
        };
        if collapsed {
            // Players should no longer be asked to run the update command.
            self.stage_notification(true);
        }

        self.report(
            requester,
            "...download finished. Restart the server to apply the update.",
        );
        Ok(UpdateOutcome { version, artifact })
    }

    fn report(&self, requester: Option<&dyn Recipient>, message: &str) {
        info!("{}", message);
        if let Some(requester) = requester {
            requester.send_message(message);
        }
    }
}
