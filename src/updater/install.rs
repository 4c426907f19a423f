//! Atomic download into the staging directory
//!
//! The artifact is streamed into `<file_name>.tmp` next to the destination
//! and renamed once complete, so the destination never holds a partial
//! file. The temp file doubles as the lock against concurrent updates.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::config::TEMP_FILE_SUFFIX;
use crate::version::client::RemoteSourceClient;
use crate::version::error::UpdateError;

/// Removes the temp file when dropped unless disarmed.
///
/// Covers the case where the download future is dropped half way, e.g.
/// when the runtime shuts down.
struct TempFileGuard {
    path: PathBuf,
    armed: bool,
}

impl TempFileGuard {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if self.armed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

pub fn temp_path(staging_dir: &Path, file_name: &str) -> PathBuf {
    staging_dir.join(format!("{}{}", file_name, TEMP_FILE_SUFFIX))
}

/// Download `url` to `staging_dir/file_name`.
///
/// # Errors
/// * `AlreadyInProgress` - the temp file exists, another update is running
///   or a previous one left it behind
/// * `Io` - the temp file could not be created or renamed; after a failed
///   rename the temp file is kept
/// * `CleanupFailed` - the download failed and the temp file could not be
///   removed
/// * any error of the download itself, after the temp file was removed
pub async fn download_atomically(
    client: &dyn RemoteSourceClient,
    url: &str,
    staging_dir: &Path,
    file_name: &str,
) -> Result<PathBuf, UpdateError> {
    let destination = staging_dir.join(file_name);
    let temp = temp_path(staging_dir, file_name);

    match tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp)
        .await
    {
        Ok(file) => drop(file),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            return Err(UpdateError::AlreadyInProgress(temp));
        }
        Err(e) => {
            return Err(UpdateError::io(
                format!("The updater could not create the file '{}'", temp.display()),
                e,
            ));
        }
    }
    let mut guard = TempFileGuard::new(temp.clone());

    match client.download_to(url, &temp).await {
        Ok(bytes) => info!("Downloaded {} bytes from {}", bytes, url),
        Err(e) => {
            guard.disarm();
            return Err(discard_partial(&temp, e).await);
        }
    }

    // The temp file stays for inspection if the rename fails.
    guard.disarm();
    tokio::fs::rename(&temp, &destination).await.map_err(|e| {
        warn!("Could not rename {:?} to {:?}: {}", temp, destination, e);
        UpdateError::io(
            "Could not rename the downloaded file. Try the update again, if it still does not work use a manual download",
            e,
        )
    })?;

    Ok(destination)
}

async fn discard_partial(temp: &Path, cause: UpdateError) -> UpdateError {
    match tokio::fs::remove_file(temp).await {
        Ok(()) => cause,
        Err(e) if e.kind() == ErrorKind::NotFound => cause,
        Err(e) => {
            error!(
                "Download failed ({}) and {:?} could not be removed: {}. Delete it manually, no update can run until then.",
                cause, temp, e
            );
            UpdateError::CleanupFailed {
                path: temp.to_path_buf(),
                source: e,
            }
        }
    }
}
