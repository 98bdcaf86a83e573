//! In-memory traffic ledger.
//!
//! Used by tests and by `LEDGER_BACKEND=memory` for running the service
//! without a database. Connection and write failures can be simulated.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use crate::error::LedgerError;

use super::types::{DailyTotals, HistoryPoint, TrafficObservation};
use super::{LedgerSession, TrafficLedger};

#[derive(Debug, Default)]
struct Shared {
    rows: Mutex<Vec<TrafficObservation>>,
    fail_connect: AtomicBool,
    fail_appends: AtomicBool,
    open_sessions: AtomicUsize,
}

/// Process-local ledger.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    shared: Arc<Shared>,
}

impl MemoryLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a ledger pre-populated with rows.
    pub fn with_rows(rows: Vec<TrafficObservation>) -> Self {
        let ledger = Self::new();
        *ledger.lock_rows() = rows;
        ledger
    }

    /// Make subsequent `connect` calls fail as unavailable.
    pub fn set_fail_connect(&self, fail: bool) {
        self.shared.fail_connect.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent appends fail.
    pub fn set_fail_appends(&self, fail: bool) {
        self.shared.fail_appends.store(fail, Ordering::SeqCst);
    }

    /// Copy of all rows in insertion order.
    pub fn rows(&self) -> Vec<TrafficObservation> {
        self.lock_rows().clone()
    }

    /// Number of stored rows.
    pub fn len(&self) -> usize {
        self.lock_rows().len()
    }

    /// Check if the ledger has no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sessions currently held open.
    pub fn open_sessions(&self) -> usize {
        self.shared.open_sessions.load(Ordering::SeqCst)
    }

    fn lock_rows(&self) -> MutexGuard<'_, Vec<TrafficObservation>> {
        // A poisoned lock only means a test panicked mid-write; the rows are still usable.
        self.shared
            .rows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl TrafficLedger for MemoryLedger {
    async fn connect(&self) -> Result<Box<dyn LedgerSession>, LedgerError> {
        if self.shared.fail_connect.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable(
                "memory ledger connection refused".to_string(),
            ));
        }
        self.shared.open_sessions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemorySession {
            ledger: self.clone(),
        }))
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

struct MemorySession {
    ledger: MemoryLedger,
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        self.ledger
            .shared
            .open_sessions
            .fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl LedgerSession for MemorySession {
    async fn last_observation(&mut self) -> Result<Option<HistoryPoint>, LedgerError> {
        // max_by_key keeps the last maximum, so equal timestamps resolve to the latest insert.
        Ok(self
            .ledger
            .lock_rows()
            .iter()
            .max_by_key(|row| row.timestamp)
            .map(HistoryPoint::from))
    }

    async fn append(&mut self, observation: &TrafficObservation) -> Result<(), LedgerError> {
        if self.ledger.shared.fail_appends.load(Ordering::SeqCst) {
            return Err(LedgerError::Query("memory ledger append rejected".to_string()));
        }
        self.ledger.lock_rows().push(observation.clone());
        Ok(())
    }

    async fn daily_totals(&mut self, day: NaiveDate) -> Result<DailyTotals, LedgerError> {
        Ok(self
            .ledger
            .lock_rows()
            .iter()
            .filter(|row| row.timestamp.date() == day)
            .fold(DailyTotals::default(), |mut totals, row| {
                totals.total_in += u64::from(row.entrance_count);
                totals.total_out += u64::from(row.exit_count);
                totals
            }))
    }

    async fn history_since(
        &mut self,
        cutoff: NaiveDateTime,
    ) -> Result<Vec<HistoryPoint>, LedgerError> {
        let mut points: Vec<HistoryPoint> = self
            .ledger
            .lock_rows()
            .iter()
            .filter(|row| row.timestamp > cutoff)
            .map(HistoryPoint::from)
            .collect();
        points.sort_by_key(|point| point.timestamp);
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::congestion::CongestionLevel;
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    fn at(date: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(date, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn observation(timestamp: NaiveDateTime, count: u32, entrance: u32, exit: u32) -> TrafficObservation {
        TrafficObservation {
            timestamp,
            current_count_on_bridge: count,
            congestion_level: CongestionLevel::Low,
            entrance_count: entrance,
            exit_count: exit,
        }
    }

    #[tokio::test]
    async fn empty_ledger_has_no_last_observation() {
        let ledger = MemoryLedger::new();
        let mut session = ledger.connect().await.unwrap();
        assert_eq!(session.last_observation().await.unwrap(), None);
    }

    #[tokio::test]
    async fn append_then_last_observation_round_trips() {
        let ledger = MemoryLedger::new();
        let mut session = ledger.connect().await.unwrap();

        session
            .append(&observation(at("2026-10-16 08:00:00"), 4, 4, 0))
            .await
            .unwrap();
        session
            .append(&observation(at("2026-10-16 08:05:00"), 13, 9, 0))
            .await
            .unwrap();

        assert_eq!(
            session.last_observation().await.unwrap(),
            Some(HistoryPoint {
                timestamp: at("2026-10-16 08:05:00"),
                current_count_on_bridge: 13,
            })
        );
        assert_eq!(ledger.len(), 2);
    }

    #[tokio::test]
    async fn last_observation_orders_by_timestamp_not_insertion() {
        let ledger = MemoryLedger::with_rows(vec![
            observation(at("2026-10-16 09:00:00"), 7, 0, 0),
            observation(at("2026-10-16 08:00:00"), 3, 0, 0),
        ]);
        let mut session = ledger.connect().await.unwrap();
        let last = session.last_observation().await.unwrap().unwrap();
        assert_eq!(last.current_count_on_bridge, 7);
    }

    #[tokio::test]
    async fn last_observation_tie_goes_to_latest_insert() {
        let ledger = MemoryLedger::with_rows(vec![
            observation(at("2026-10-16 09:00:00"), 1, 1, 0),
            observation(at("2026-10-16 09:00:00"), 2, 1, 0),
        ]);
        let mut session = ledger.connect().await.unwrap();
        let last = session.last_observation().await.unwrap().unwrap();
        assert_eq!(last.current_count_on_bridge, 2);
    }

    #[tokio::test]
    async fn daily_totals_only_count_the_given_day() {
        let ledger = MemoryLedger::with_rows(vec![
            observation(at("2026-10-15 23:59:59"), 0, 100, 100),
            observation(at("2026-10-16 00:00:00"), 5, 5, 0),
            observation(at("2026-10-16 12:00:00"), 3, 1, 3),
        ]);
        let mut session = ledger.connect().await.unwrap();

        let day = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        assert_eq!(
            session.daily_totals(day).await.unwrap(),
            DailyTotals {
                total_in: 6,
                total_out: 3
            }
        );

        let empty_day = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        assert_eq!(
            session.daily_totals(empty_day).await.unwrap(),
            DailyTotals::default()
        );
    }

    #[tokio::test]
    async fn history_is_strictly_after_cutoff_and_ascending() {
        let now = at("2026-10-16 12:00:00");
        let cutoff = now - Duration::hours(1);
        let ledger = MemoryLedger::with_rows(vec![
            observation(now - Duration::minutes(10), 8, 0, 0),
            observation(cutoff, 1, 0, 0),
            observation(now - Duration::minutes(30), 6, 0, 0),
            observation(now - Duration::minutes(90), 2, 0, 0),
        ]);
        let mut session = ledger.connect().await.unwrap();

        let points = session.history_since(cutoff).await.unwrap();
        let counts: Vec<u32> = points.iter().map(|p| p.current_count_on_bridge).collect();
        assert_eq!(counts, vec![6, 8]);
    }

    #[tokio::test]
    async fn sessions_release_on_drop() {
        let ledger = MemoryLedger::new();
        {
            let _session = ledger.connect().await.unwrap();
            assert_eq!(ledger.open_sessions(), 1);
        }
        assert_eq!(ledger.open_sessions(), 0);
    }

    #[tokio::test]
    async fn simulated_failures() {
        let ledger = MemoryLedger::new();

        ledger.set_fail_connect(true);
        let err = ledger.connect().await.err().unwrap();
        assert!(err.is_unavailable());

        ledger.set_fail_connect(false);
        ledger.set_fail_appends(true);
        let mut session = ledger.connect().await.unwrap();
        let err = session
            .append(&observation(at("2026-10-16 08:00:00"), 1, 1, 0))
            .await
            .unwrap_err();
        assert!(!err.is_unavailable());
        assert!(ledger.is_empty());
    }
}
