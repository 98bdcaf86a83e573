//! Congestion classification for bridge occupancy.
//!
//! Occupancy maps onto three tiers using inclusive upper bounds:
//!
//! ```text
//! low:    0 ..= low_max        (default 0..=10)
//! medium: low_max+1 ..= medium_max (default 11..=25)
//! high:   medium_max+1 ..          (default 26..)
//! ```

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::config::Config;

/// Congestion tier of the bridge.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CongestionLevel {
    /// Free flowing.
    Low,
    /// Moderately crowded.
    Medium,
    /// Heavily crowded.
    High,
}

impl CongestionLevel {
    /// Display label shown on the dashboard.
    pub fn label(&self) -> &'static str {
        match self {
            CongestionLevel::Low => "畅通",
            CongestionLevel::Medium => "中度拥挤",
            CongestionLevel::High => "严重拥挤",
        }
    }

    /// Stored/serialized name.
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// Maps an occupancy count onto a [`CongestionLevel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CongestionClassifier {
    low_max: u32,
    medium_max: u32,
}

impl CongestionClassifier {
    /// Create a classifier from inclusive tier bounds.
    ///
    /// Returns `None` unless `low_max < medium_max`.
    pub fn new(low_max: u32, medium_max: u32) -> Option<Self> {
        (low_max < medium_max).then_some(Self {
            low_max,
            medium_max,
        })
    }

    /// Build a classifier from validated configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.low_max(), config.medium_max()).unwrap_or_default()
    }

    /// Classify an occupancy count.
    pub fn classify(&self, count: u32) -> (CongestionLevel, &'static str) {
        let level = if count <= self.low_max {
            CongestionLevel::Low
        } else if count <= self.medium_max {
            CongestionLevel::Medium
        } else {
            CongestionLevel::High
        };
        (level, level.label())
    }
}

impl Default for CongestionClassifier {
    fn default() -> Self {
        Self {
            low_max: 10,
            medium_max: 25,
        }
    }
}
