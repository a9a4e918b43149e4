// src/aggregator.rs
//
// Collapses one frame's raw detections into a normalized FrameRecord:
// pixel boxes → court positions, class partitioning, team labels.

use crate::calibration::{self, CalibrationState};
use crate::team::TeamClassifier;
use crate::types::{
    CourtPoint, FrameRecord, PlayerObservation, RawDetection, CLASS_BALL, CLASS_PLAYER,
};
use std::collections::HashMap;
use tracing::{debug, warn};

/// One aggregated frame plus the anomalies recovered while building it.
#[derive(Debug)]
pub struct AggregatedFrame {
    pub record: FrameRecord,
    /// Detections dropped in this frame (missing track id, degenerate box).
    pub dropped: u32,
}

/// Builds the frame record for `frame_index`.
///
/// Duplicate policy, pinned by tests: if the same track id appears twice in
/// one frame the last detection wins, replacing in place so the player list
/// keeps first-appearance order. Multiple ball detections: the last one wins.
/// Class ids >= 2 are ignored for forward compatibility.
pub fn aggregate(
    detections: &[RawDetection],
    frame_index: u64,
    fps: f64,
    calibration: &CalibrationState,
    classifier: &mut dyn TeamClassifier,
) -> AggregatedFrame {
    let mut players: Vec<PlayerObservation> = Vec::new();
    let mut player_slots: HashMap<u64, usize> = HashMap::new();
    let mut ball_position: Option<CourtPoint> = None;
    let mut dropped: u32 = 0;

    for detection in detections {
        if !detection.is_well_formed() {
            warn!(
                "Frame {}: dropping malformed detection (box {}x{} at ({}, {}))",
                frame_index, detection.width, detection.height, detection.center_x,
                detection.center_y
            );
            dropped += 1;
            continue;
        }

        let Some(track_id) = detection.track_id else {
            warn!(
                "Frame {}: dropping detection without track id (class {})",
                frame_index, detection.class_id
            );
            dropped += 1;
            continue;
        };

        let position = calibration::to_court(detection.center_x, detection.center_y, calibration);
        if !calibration::in_bounds(&position, calibration) {
            debug!(
                "Frame {}: track {} mapped outside court at ({:.2}, {:.2})",
                frame_index, track_id, position.x, position.y
            );
        }

        match detection.class_id {
            CLASS_PLAYER => {
                let team = classifier.classify(track_id, position, frame_index);
                let observation = PlayerObservation {
                    id: track_id.to_string(),
                    position,
                    team,
                };

                match player_slots.get(&track_id) {
                    Some(&slot) => {
                        debug!(
                            "Frame {}: duplicate track {} — keeping last detection",
                            frame_index, track_id
                        );
                        players[slot] = observation;
                    }
                    None => {
                        player_slots.insert(track_id, players.len());
                        players.push(observation);
                    }
                }
            }
            CLASS_BALL => {
                ball_position = Some(position);
            }
            other => {
                debug!(
                    "Frame {}: ignoring reserved class id {} (track {})",
                    frame_index, other, track_id
                );
            }
        }
    }

    AggregatedFrame {
        record: FrameRecord {
            timestamp: frame_index as f64 / fps,
            players,
            ball_position,
        },
        dropped,
    }
}
