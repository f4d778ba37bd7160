//! Output directory resolution.
//!
//! Photos go to an app-scoped directory under the external media root when
//! one can be created and written, otherwise to the internal app directory.

use crate::capture::StorageConfig;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while resolving the output directory.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("no writable output directory (tried {tried:?})")]
    NoWritableDirectory { tried: Vec<PathBuf> },
}

/// Which candidate directory was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageLocation {
    /// `<external media root>/<app name>`.
    ExternalMedia,
    /// The internal app directory.
    Internal,
}

/// A directory that existed and accepted writes when it was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDirectory {
    path: PathBuf,
    location: StorageLocation,
}

impl OutputDirectory {
    /// Resolves the directory photos are written to.
    ///
    /// `external_media_root/app_name` is created if absent and used when it
    /// is a writable directory. Otherwise `internal` is created and used.
    pub fn resolve(
        external_media_root: Option<&Path>,
        app_name: &str,
        internal: &Path,
    ) -> Result<Self, StorageError> {
        let mut tried = Vec::new();

        if let Some(root) = external_media_root {
            let media_dir = root.join(app_name);
            if let Err(e) = fs::create_dir_all(&media_dir) {
                tracing::debug!(
                    path = %media_dir.display(),
                    error = %e,
                    "Could not create external media directory"
                );
            }
            if is_writable_dir(&media_dir) {
                tracing::info!(path = %media_dir.display(), "Using external media directory");
                return Ok(Self {
                    path: media_dir,
                    location: StorageLocation::ExternalMedia,
                });
            }
            tried.push(media_dir);
        }

        if let Err(e) = fs::create_dir_all(internal) {
            tracing::debug!(
                path = %internal.display(),
                error = %e,
                "Could not create internal directory"
            );
        }
        if is_writable_dir(internal) {
            tracing::info!(path = %internal.display(), "Using internal app directory");
            return Ok(Self {
                path: internal.to_path_buf(),
                location: StorageLocation::Internal,
            });
        }
        tried.push(internal.to_path_buf());

        Err(StorageError::NoWritableDirectory { tried })
    }

    /// Resolves the directory described by a storage configuration.
    pub fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        Self::resolve(
            config.external_media_root().as_deref(),
            &config.app_name,
            &config.internal_dir(),
        )
    }

    /// The resolved directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Which candidate was chosen.
    pub fn location(&self) -> StorageLocation {
        self.location
    }
}

fn is_writable_dir(dir: &Path) -> bool {
    if !dir.is_dir() {
        return false;
    }
    let probe = dir.join(format!(".snapcam-probe-{}", std::process::id()));
    match OpenOptions::new().write(true).create_new(true).open(&probe) {
        Ok(_) => {
            let _ = fs::remove_file(&probe);
            true
        }
        Err(_) => false,
    }
}
