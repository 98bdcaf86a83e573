//! Request-scoped services behind the HTTP API.
//!
//! This module handles:
//! - Status derivation: snapshot -> occupancy -> tier -> ledger append -> report
//! - History queries over the last hour of observations

pub mod history;
pub mod status;

pub use history::{HistoryReport, HistoryService, TimedCount};
pub use status::{derive_occupancy, StatusReport, StatusService};
