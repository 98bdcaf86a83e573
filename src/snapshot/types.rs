//! Detection snapshot types.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Camera a detection record came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum VideoType {
    /// Camera watching the bridge entrance.
    Entrance,
    /// Camera watching the bridge exit.
    Exit,
    /// Any camera this service does not count.
    #[serde(other)]
    Other,
}

/// One detection record from the vision pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionRecord {
    /// Source camera. Records without one are ignored.
    #[serde(default)]
    pub video_type: Option<VideoType>,
    /// Vehicles counted since the previous snapshot.
    #[serde(default)]
    pub count: u32,
}

impl DetectionRecord {
    /// Create a record for the given camera.
    pub fn new(video_type: VideoType, count: u32) -> Self {
        Self {
            video_type: Some(video_type),
            count,
        }
    }
}

/// Entrance/exit deltas derived from a snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GateCounts {
    /// Vehicles that entered the bridge.
    pub entrance: u32,
    /// Vehicles that left the bridge.
    pub exit: u32,
}

/// Latest detection output, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    /// Records as written by the pipeline.
    pub records: Vec<DetectionRecord>,
}

impl Snapshot {
    /// Create a snapshot from records.
    pub fn new(records: Vec<DetectionRecord>) -> Self {
        Self { records }
    }

    /// Check whether the snapshot holds any records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Derive gate counts. The last record of each camera wins; a camera
    /// with no record counts as 0.
    pub fn gate_counts(&self) -> GateCounts {
        self.records
            .iter()
            .fold(GateCounts::default(), |mut counts, record| {
                match record.video_type {
                    Some(VideoType::Entrance) => counts.entrance = record.count,
                    Some(VideoType::Exit) => counts.exit = record.count,
                    _ => {}
                }
                counts
            })
    }
}
