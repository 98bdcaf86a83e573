//! Status derivation: the one state transition in the service.
//!
//! ```text
//! previous occupancy (seed)
//!   + entrance delta - exit delta   (floored at 0)
//!   -> congestion tier
//!   -> appended observation
//!   -> daily totals + status report
//! ```

use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDateTime, SecondsFormat, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{error, info, instrument};

use crate::congestion::{CongestionClassifier, CongestionLevel};
use crate::error::{LedgerError, StatusError};
use crate::ledger::{TrafficLedger, TrafficObservation};
use crate::metrics;
use crate::snapshot::{report_unavailable, SnapshotReader};

/// Image the pipeline keeps overwriting for the entrance camera.
pub const LATEST_ENTRANCE_IMAGE_PATH: &str = "/static/results/latest_entrance.jpg";
/// Image the pipeline keeps overwriting for the exit camera.
pub const LATEST_EXIT_IMAGE_PATH: &str = "/static/results/latest_exit.jpg";

/// Current bridge status returned by `/api/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    /// Report build time, ISO-8601 UTC.
    pub timestamp: String,
    /// Estimated vehicles on the bridge.
    pub current_count_on_bridge: u32,
    /// Congestion tier.
    pub congestion_level: CongestionLevel,
    /// Display label of the tier.
    pub congestion_level_text: String,
    /// Entrance total for today.
    pub total_in_today: u64,
    /// Exit total for today.
    pub total_out_today: u64,
    /// Entrance delta of this observation.
    pub entrance_count: u32,
    /// Exit delta of this observation.
    pub exit_count: u32,
    /// Latest entrance camera frame.
    pub latest_entrance_image_path: String,
    /// Latest exit camera frame.
    pub latest_exit_image_path: String,
}

/// New occupancy from the previous one and this snapshot's deltas, floored at 0.
pub fn derive_occupancy(seed: u32, entrance: u32, exit: u32) -> u32 {
    let current = i64::from(seed) + i64::from(entrance) - i64::from(exit);
    u32::try_from(current.max(0)).unwrap_or(u32::MAX)
}

/// Orchestrates snapshot reading, classification and ledger writes.
pub struct StatusService {
    ledger: Arc<dyn TrafficLedger>,
    reader: SnapshotReader,
    classifier: CongestionClassifier,
    // Serialises connect through append so concurrent requests cannot lose updates.
    write_gate: Mutex<()>,
}

impl StatusService {
    /// Create a status service.
    pub fn new(
        ledger: Arc<dyn TrafficLedger>,
        reader: SnapshotReader,
        classifier: CongestionClassifier,
    ) -> Self {
        Self {
            ledger,
            reader,
            classifier,
            write_gate: Mutex::new(()),
        }
    }

    /// Derive, record and report the current status.
    pub async fn current_status(&self) -> Result<StatusReport, StatusError> {
        self.current_status_at(|| Local::now().naive_local(), Utc::now)
            .await
    }

    /// Same as [`Self::current_status`] with explicit clocks.
    ///
    /// The write gate is taken before a ledger connection is checked out, so
    /// status requests never hold more than one pooled connection.
    ///
    /// `local_clock` stamps the observation and picks the calendar day. It is
    /// read inside the gate, and a reading older than the latest row is
    /// raised to that row's time, so ledger order always follows gate order.
    /// `utc_clock` is read when the report is built.
    #[instrument(skip_all, fields(backend = self.ledger.backend()))]
    pub async fn current_status_at<L, U>(
        &self,
        local_clock: L,
        utc_clock: U,
    ) -> Result<StatusReport, StatusError>
    where
        L: Fn() -> NaiveDateTime + Send + Sync,
        U: Fn() -> DateTime<Utc> + Send + Sync,
    {
        metrics::inc_status_requests();

        // Queued requests wait here without holding a pooled connection.
        let (mut session, observation) = {
            let _gate = self.write_gate.lock().await;

            let mut session = self.ledger.connect().await.map_err(|e| {
                error!("Database connection failed: {}", e);
                metrics::inc_ledger_errors();
                StatusError::LedgerUnavailable(e)
            })?;

            let snapshot = self.reader.load().await.map_err(|e| {
                report_unavailable(&e);
                metrics::inc_snapshot_unavailable();
                StatusError::from(e)
            })?;
            let gates = snapshot.gate_counts();

            let last = session.last_observation().await.map_err(internal)?;
            let now = local_clock();
            let (seed, timestamp) = match last {
                Some(last) => (last.current_count_on_bridge, now.max(last.timestamp)),
                None => (0, now),
            };
            let current = derive_occupancy(seed, gates.entrance, gates.exit);
            let (level, _) = self.classifier.classify(current);

            let observation = TrafficObservation {
                timestamp,
                current_count_on_bridge: current,
                congestion_level: level,
                entrance_count: gates.entrance,
                exit_count: gates.exit,
            };
            session.append(&observation).await.map_err(internal)?;
            (session, observation)
        };

        info!(
            occupancy = observation.current_count_on_bridge,
            entrance = observation.entrance_count,
            exit = observation.exit_count,
            level = %observation.congestion_level,
            "Recorded traffic observation"
        );
        metrics::inc_observations_appended();
        metrics::set_bridge_occupancy(observation.current_count_on_bridge);

        let totals = session
            .daily_totals(observation.timestamp.date())
            .await
            .map_err(internal)?;

        Ok(StatusReport {
            timestamp: utc_clock().to_rfc3339_opts(SecondsFormat::Micros, true),
            current_count_on_bridge: observation.current_count_on_bridge,
            congestion_level: observation.congestion_level,
            congestion_level_text: observation.congestion_level.label().to_string(),
            total_in_today: totals.total_in,
            total_out_today: totals.total_out,
            entrance_count: observation.entrance_count,
            exit_count: observation.exit_count,
            latest_entrance_image_path: LATEST_ENTRANCE_IMAGE_PATH.to_string(),
            latest_exit_image_path: LATEST_EXIT_IMAGE_PATH.to_string(),
        })
    }
}

fn internal(e: LedgerError) -> StatusError {
    error!("Ledger operation failed: {}", e);
    metrics::inc_ledger_errors();
    StatusError::Internal(e)
}
