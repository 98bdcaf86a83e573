//! Unified error types for the bridge monitor.

use std::path::PathBuf;

use thiserror::Error;

/// Unified error type for startup and CLI paths.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Ledger error.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Detection snapshot errors.
///
/// Every variant means "no usable snapshot" to the status endpoint; the
/// split only exists so logs can tell a missing file from a broken one.
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// Snapshot file does not exist.
    #[error("snapshot not found at {}", path.display())]
    Missing {
        /// Path that was probed.
        path: PathBuf,
    },

    /// Snapshot parsed but holds no records.
    #[error("snapshot at {} is empty", path.display())]
    Empty {
        /// Path of the empty snapshot.
        path: PathBuf,
    },

    /// Snapshot exists but could not be read.
    #[error("failed to read snapshot {}: {source}", path.display())]
    Io {
        /// Path of the unreadable snapshot.
        path: PathBuf,
        /// Underlying IO failure.
        #[source]
        source: std::io::Error,
    },

    /// Snapshot is not a valid detection array.
    #[error("failed to parse snapshot {}: {source}", path.display())]
    Parse {
        /// Path of the corrupt snapshot.
        path: PathBuf,
        /// Underlying JSON failure.
        #[source]
        source: serde_json::Error,
    },
}

impl SnapshotError {
    /// Whether the file simply is not there yet.
    ///
    /// The pipeline replaces the snapshot out of band, so a missing file is
    /// routine; everything else points at a broken sync.
    pub fn is_missing(&self) -> bool {
        matches!(self, SnapshotError::Missing { .. })
    }
}

/// Traffic ledger errors.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// The backing store could not be reached.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    /// A query or insert failed on an established connection.
    #[error("ledger query failed: {0}")]
    Query(String),
}

impl LedgerError {
    /// Whether this error means the store was never reached.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, LedgerError::Unavailable(_))
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => LedgerError::Unavailable(err.to_string()),
            other => LedgerError::Query(other.to_string()),
        }
    }
}

/// Status derivation errors.
#[derive(Error, Debug)]
pub enum StatusError {
    /// Ledger connection could not be acquired.
    #[error("ledger unavailable: {0}")]
    LedgerUnavailable(LedgerError),

    /// No usable detection snapshot.
    #[error("snapshot unavailable: {0}")]
    SnapshotUnavailable(#[from] SnapshotError),

    /// Any failure after the snapshot was obtained.
    #[error("{0}")]
    Internal(LedgerError),
}

/// History query errors.
#[derive(Error, Debug)]
pub enum HistoryError {
    /// Ledger connection could not be acquired.
    #[error("ledger unavailable: {0}")]
    LedgerUnavailable(LedgerError),

    /// Query failed on an established connection.
    #[error("{0}")]
    Internal(LedgerError),
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, ServiceError>;
