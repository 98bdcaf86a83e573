//! Traffic ledger: the append-only occupancy log.
//!
//! This module handles:
//! - Observation and aggregate types
//! - The ledger trait seam with scoped connection acquisition
//! - MySQL persistence
//! - An in-memory ledger for tests and local runs

pub mod memory;
pub mod mysql;
pub mod types;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use crate::error::LedgerError;

pub use memory::MemoryLedger;
pub use mysql::MySqlLedger;
pub use types::{DailyTotals, HistoryPoint, TrafficObservation};

/// A source of ledger sessions.
#[async_trait]
pub trait TrafficLedger: Send + Sync {
    /// Acquire a session. The underlying connection is released when the
    /// session is dropped, on every exit path.
    async fn connect(&self) -> Result<Box<dyn LedgerSession>, LedgerError>;

    /// Short backend name for logs.
    fn backend(&self) -> &'static str;
}

/// Operations available on an acquired ledger connection.
#[async_trait]
pub trait LedgerSession: Send {
    /// Most recent observation (time and occupancy), if any.
    ///
    /// Equal timestamps resolve to the latest insert.
    async fn last_observation(&mut self) -> Result<Option<HistoryPoint>, LedgerError>;

    /// Durably append one observation.
    async fn append(&mut self, observation: &TrafficObservation) -> Result<(), LedgerError>;

    /// Entrance/exit sums over every observation on `day` (server local time).
    async fn daily_totals(&mut self, day: NaiveDate) -> Result<DailyTotals, LedgerError>;

    /// Observations strictly after `cutoff`, oldest first.
    async fn history_since(
        &mut self,
        cutoff: NaiveDateTime,
    ) -> Result<Vec<HistoryPoint>, LedgerError>;
}
