//! Reads the detection snapshot synced from the vision pipeline.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::SnapshotError;

use super::types::Snapshot;

/// Reads the latest detection snapshot from a fixed path.
///
/// Nothing is cached: every call goes back to the file, since the pipeline
/// replaces it out of band.
#[derive(Debug, Clone)]
pub struct SnapshotReader {
    path: PathBuf,
}

impl SnapshotReader {
    /// Create a reader for the given snapshot path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path this reader loads from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load and parse the snapshot.
    pub async fn load(&self) -> Result<Snapshot, SnapshotError> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                SnapshotError::Missing {
                    path: self.path.clone(),
                }
            } else {
                SnapshotError::Io {
                    path: self.path.clone(),
                    source,
                }
            }
        })?;

        let snapshot: Snapshot =
            serde_json::from_slice(&bytes).map_err(|source| SnapshotError::Parse {
                path: self.path.clone(),
                source,
            })?;

        if snapshot.is_empty() {
            return Err(SnapshotError::Empty {
                path: self.path.clone(),
            });
        }

        debug!(
            path = %self.path.display(),
            records = snapshot.records.len(),
            "Loaded detection snapshot"
        );
        Ok(snapshot)
    }

    /// Load the snapshot, collapsing every failure into `None`.
    pub async fn read_latest(&self) -> Option<Snapshot> {
        self.load().await.map_err(|e| report_unavailable(&e)).ok()
    }
}

/// Log a snapshot failure at the level it deserves.
///
/// A missing file is expected between pipeline syncs and only shows up at
/// `debug`; every other failure is logged at `warn`.
pub fn report_unavailable(err: &SnapshotError) {
    if err.is_missing() {
        debug!("Predictions data not available: {}", err);
    } else {
        warn!("Error reading or parsing predictions file: {}", err);
    }
}
