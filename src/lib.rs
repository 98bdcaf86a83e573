//! Bicycle bridge occupancy monitoring backend.
//!
//! An external vision pipeline keeps overwriting a JSON snapshot with the
//! number of bicycles seen at the bridge entrance and exit. Every status
//! request turns that snapshot into a running occupancy estimate:
//!
//! ```text
//! last occupancy:   10
//! entrance count:   +5
//! exit count:       -2
//! ─────────────────────
//! occupancy:        13  -> medium congestion
//! ```
//!
//! Each derived value is appended to a MySQL traffic log, which also feeds
//! the daily totals and the one-hour history chart.
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`snapshot`]: Detection snapshot reading
//! - [`congestion`]: Occupancy to congestion tier mapping
//! - [`ledger`]: Traffic log persistence
//! - [`service`]: Status derivation and history queries
//! - [`api`]: HTTP API
//! - [`metrics`]: Prometheus metrics
//! - [`utils`]: Utility functions

pub mod api;
pub mod config;
pub mod congestion;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod service;
pub mod snapshot;
pub mod utils;

pub use config::Config;
pub use error::{Result, ServiceError};
