//! One-hour occupancy history.

use std::sync::Arc;

use chrono::{Duration, Local, NaiveDateTime};
use serde::Serialize;
use tracing::{error, instrument};

use crate::error::HistoryError;
use crate::ledger::TrafficLedger;
use crate::metrics;

/// Look-back window of `/api/history`.
pub const HISTORY_WINDOW_MINUTES: i64 = 60;

/// One chart point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimedCount {
    /// Local time as `HH:MM`.
    pub time: String,
    /// Occupancy at that time.
    pub count: u32,
}

/// Response body of `/api/history`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HistoryReport {
    /// Points in ascending time order.
    pub data_points: Vec<TimedCount>,
}

/// Read-only history queries.
pub struct HistoryService {
    ledger: Arc<dyn TrafficLedger>,
}

impl HistoryService {
    /// Create a history service.
    pub fn new(ledger: Arc<dyn TrafficLedger>) -> Self {
        Self { ledger }
    }

    /// Observations from the last hour.
    pub async fn recent(&self) -> Result<HistoryReport, HistoryError> {
        self.recent_at(Local::now().naive_local()).await
    }

    /// Observations in the hour before `local_now`.
    #[instrument(skip(self))]
    pub async fn recent_at(&self, local_now: NaiveDateTime) -> Result<HistoryReport, HistoryError> {
        metrics::inc_history_requests();

        let mut session = self.ledger.connect().await.map_err(|e| {
            error!("Database connection failed: {}", e);
            metrics::inc_ledger_errors();
            HistoryError::LedgerUnavailable(e)
        })?;

        let cutoff = local_now - Duration::minutes(HISTORY_WINDOW_MINUTES);
        let points = session.history_since(cutoff).await.map_err(|e| {
            error!("History query failed: {}", e);
            metrics::inc_ledger_errors();
            HistoryError::Internal(e)
        })?;

        Ok(HistoryReport {
            data_points: points
                .into_iter()
                .map(|point| TimedCount {
                    time: point.timestamp.format("%H:%M").to_string(),
                    count: point.current_count_on_bridge,
                })
                .collect(),
        })
    }
}
