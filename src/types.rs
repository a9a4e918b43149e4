// src/types.rs

use serde::{Deserialize, Serialize};

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub court: CourtConfig,
    pub team: TeamConfig,
    pub video: VideoConfig,
    pub io: IoConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CourtConfig {
    /// Court length in feet (x axis, 94.0 for an NBA court).
    pub length: f64,
    /// Court width in feet (y axis).
    pub width: f64,
}

impl Default for CourtConfig {
    fn default() -> Self {
        Self {
            length: 94.0,
            width: 50.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamConfig {
    /// Court-space x value splitting home from away. None = half court.
    pub split_axis: Option<f64>,
    /// Majority-vote window per track id; 1 disables smoothing.
    pub smoothing_window: usize,
}

impl Default for TeamConfig {
    fn default() -> Self {
        Self {
            split_axis: None,
            smoothing_window: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameRateSource {
    /// Take fps from the detection stream header.
    Metadata,
    /// Force fps from `frame_rate_override`.
    Override,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub frame_rate_source: FrameRateSource,
    pub frame_rate_override: Option<f64>,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            frame_rate_source: FrameRateSource::Metadata,
            frame_rate_override: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IoConfig {
    pub input_dir: String,
    pub output_dir: String,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            input_dir: "detections".to_string(),
            output_dir: "output".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ============================================================================
// DETECTION INPUT
// ============================================================================

pub const CLASS_PLAYER: u32 = 0;
pub const CLASS_BALL: u32 = 1;

/// One tracked bounding box as produced by the external detector/tracker,
/// in pixel units. Ephemeral: consumed per frame, never persisted.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RawDetection {
    pub center_x: f64,
    pub center_y: f64,
    pub width: f64,
    pub height: f64,
    /// Persistent identity across frames. Absent means the detection cannot
    /// be tracked and is dropped.
    #[serde(default)]
    pub track_id: Option<u64>,
    /// 0 = player, 1 = ball, >= 2 reserved for future classes.
    pub class_id: u32,
}

impl RawDetection {
    /// A detection with a degenerate box or non-finite coordinates is a
    /// detector anomaly, recovered by dropping it.
    pub fn is_well_formed(&self) -> bool {
        self.center_x.is_finite()
            && self.center_y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
            && self.width >= 0.0
            && self.height >= 0.0
    }
}

// ============================================================================
// OUTPUT DOCUMENT (schema version 1.0 — field names and nesting are the
// compatibility contract for downstream renderers)
// ============================================================================

pub const SCHEMA_VERSION: &str = "1.0";

/// A point on the playing surface, in feet, origin at one corner.
/// Serialized as a 2-element array `[x, y]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct CourtPoint {
    pub x: f64,
    pub y: f64,
}

impl CourtPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<[f64; 2]> for CourtPoint {
    fn from(v: [f64; 2]) -> Self {
        Self { x: v[0], y: v[1] }
    }
}

impl From<CourtPoint> for [f64; 2] {
    fn from(p: CourtPoint) -> Self {
        [p.x, p.y]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Home,
    Away,
    Unknown,
}

impl Team {
    pub fn as_str(&self) -> &'static str {
        match self {
            Team::Home => "home",
            Team::Away => "away",
            Team::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerObservation {
    /// Stringified track id.
    pub id: String,
    pub position: CourtPoint,
    pub team: Team,
}

/// Normalized snapshot of one frame. Append-only: created exactly once per
/// processed frame, never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    /// Seconds from the start of the video, `frame_index / fps`.
    pub timestamp: f64,
    /// Ordered by first appearance within the frame's detection input.
    pub players: Vec<PlayerObservation>,
    /// `null` when no ball was detected in the frame.
    pub ball_position: Option<CourtPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingDocument {
    pub version: String,
    pub frames: Vec<FrameRecord>,
}

impl TrackingDocument {
    pub fn new(frames: Vec<FrameRecord>) -> Self {
        Self {
            version: SCHEMA_VERSION.to_string(),
            frames,
        }
    }
}
