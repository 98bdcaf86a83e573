//! Ledger record types.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::congestion::CongestionLevel;

/// One row of the traffic log.
///
/// Timestamps are naive server-local datetimes, matching how the table is
/// queried by calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficObservation {
    /// When the observation was derived.
    pub timestamp: NaiveDateTime,
    /// Estimated vehicles on the bridge, never negative.
    pub current_count_on_bridge: u32,
    /// Tier of `current_count_on_bridge` at write time.
    pub congestion_level: CongestionLevel,
    /// Entrance delta from the snapshot.
    pub entrance_count: u32,
    /// Exit delta from the snapshot.
    pub exit_count: u32,
}

/// Entrance/exit sums for one calendar day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DailyTotals {
    /// Sum of entrance counts.
    pub total_in: u64,
    /// Sum of exit counts.
    pub total_out: u64,
}

/// Occupancy at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryPoint {
    /// Observation time.
    pub timestamp: NaiveDateTime,
    /// Occupancy recorded at that time.
    pub current_count_on_bridge: u32,
}

impl From<&TrafficObservation> for HistoryPoint {
    fn from(observation: &TrafficObservation) -> Self {
        Self {
            timestamp: observation.timestamp,
            current_count_on_bridge: observation.current_count_on_bridge,
        }
    }
}
