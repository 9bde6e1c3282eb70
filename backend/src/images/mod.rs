//! Plate image cache and the sweep that keeps it in line with the ledger.

pub mod key;

pub use key::{image_key, plate_from_key};

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum ImageStoreError {
    #[error("Plate {0:?} cannot be used as an image key")]
    InvalidKey(String),

    #[error("Image I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of one sweep
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    /// Plates whose image was deleted
    pub removed: Vec<String>,
    /// Images kept because their plate is still on record or they are too young
    pub retained: usize,
    /// Orphans that could not be deleted
    pub failed: usize,
}

/// Directory of `<plate>.jpg` files, one per plate, written on first sighting
pub struct ImageStore {
    directory: PathBuf,
    grace: Duration,
}

impl ImageStore {
    /// Store with no grace period; `AppState` applies the configured one
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            grace: Duration::ZERO,
        }
    }

    /// Never sweep images younger than `grace`
    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Create the cache directory if needed
    pub async fn ensure_directory(&self) -> Result<(), ImageStoreError> {
        fs::create_dir_all(&self.directory).await?;
        Ok(())
    }

    pub fn path_for(&self, plate: &str) -> Result<PathBuf, ImageStoreError> {
        image_key(plate)
            .map(|key| self.directory.join(key))
            .ok_or_else(|| ImageStoreError::InvalidKey(plate.to_string()))
    }

    pub async fn contains(&self, plate: &str) -> Result<bool, ImageStoreError> {
        Ok(fs::try_exists(self.path_for(plate)?).await?)
    }

    /// Write `bytes` for `plate` unless an image already exists.
    ///
    /// Returns true when this call wrote the file.
    pub async fn store_if_absent(&self, plate: &str, bytes: &[u8]) -> Result<bool, ImageStoreError> {
        let path = self.path_for(plate)?;
        self.ensure_directory().await?;

        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!("Image for {} already cached", plate);
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };

        if let Err(e) = write_all(&mut file, bytes).await {
            // Leave no truncated image behind
            drop(file);
            if let Err(cleanup) = fs::remove_file(&path).await {
                warn!("Could not remove partial image {:?}: {}", path, cleanup);
            }
            return Err(e.into());
        }

        info!("Cached image for {} ({} bytes)", plate, bytes.len());
        Ok(true)
    }

    pub async fn read(&self, plate: &str) -> Result<Option<Vec<u8>>, ImageStoreError> {
        match fs::read(self.path_for(plate)?).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete every cached image whose plate is not in `known_plates`.
    ///
    /// Failures are logged and counted, never returned.
    pub async fn sweep(&self, known_plates: &HashSet<String>) -> SweepReport {
        let mut report = SweepReport::default();

        let mut entries = match fs::read_dir(&self.directory).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Image directory {:?} does not exist, nothing to sweep", self.directory);
                return report;
            }
            Err(e) => {
                warn!("Could not list image directory {:?}: {}", self.directory, e);
                return report;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!("Image sweep stopped early: {}", e);
                    break;
                }
            };

            let Some(plate) = entry.file_name().to_str().and_then(plate_from_key) else {
                continue;
            };

            if known_plates.contains(&plate) || self.is_young(&entry.path()).await {
                report.retained += 1;
                continue;
            }

            match fs::remove_file(entry.path()).await {
                Ok(()) => {
                    info!("Swept orphaned image for {}", plate);
                    report.removed.push(plate);
                }
                Err(e) => {
                    warn!("Could not delete orphaned image for {}: {}", plate, e);
                    report.failed += 1;
                }
            }
        }

        report
    }

    async fn is_young(&self, path: &Path) -> bool {
        if self.grace.is_zero() {
            return false;
        }
        match fs::metadata(path).await.and_then(|m| m.modified()) {
            Ok(modified) => SystemTime::now()
                .duration_since(modified)
                .map(|age| age < self.grace)
                .unwrap_or(true),
            // No timestamp: keep
            Err(_) => true,
        }
    }
}

async fn write_all(file: &mut fs::File, bytes: &[u8]) -> std::io::Result<()> {
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await
}
