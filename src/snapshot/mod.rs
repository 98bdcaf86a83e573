//! Detection snapshot module.
//!
//! This module handles:
//! - Snapshot record types produced by the vision pipeline
//! - Reading the latest snapshot from disk
//! - Deriving entrance/exit counts from a snapshot

pub mod reader;
pub mod types;

pub use reader::{report_unavailable, SnapshotReader};
pub use types::{DetectionRecord, GateCounts, Snapshot, VideoType};
