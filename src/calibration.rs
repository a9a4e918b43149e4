// src/calibration.rs
//
// Pixel-space to court-space calibration.
//
// The baseline transform is a pair of independent per-axis linear scales
// derived from a reference frame's dimensions. Real calibration from court
// markings would replace it with a full homography; the `Homography` variant
// exists so that swap changes no call sites — everything goes through
// `CourtTransform::apply`.

use crate::error::{PipelineError, Result};
use crate::types::{CourtConfig, CourtPoint};

/// The active pixel→court transform. Tagged variant so strategies can be
/// swapped without touching the aggregator or session.
#[derive(Debug, Clone, PartialEq)]
pub enum CourtTransform {
    /// Independent linear scale per axis. No shear, no rotation, no lens
    /// distortion correction.
    Scale { scale_x: f64, scale_y: f64 },
    /// 3x3 projective transform, row-major.
    Homography([[f64; 3]; 3]),
}

impl CourtTransform {
    fn apply(&self, px: f64, py: f64) -> (f64, f64) {
        match self {
            CourtTransform::Scale { scale_x, scale_y } => (px * scale_x, py * scale_y),
            CourtTransform::Homography(m) => {
                let x = m[0][0] * px + m[0][1] * py + m[0][2];
                let y = m[1][0] * px + m[1][1] * py + m[1][2];
                let w = m[2][0] * px + m[2][1] * py + m[2][2];
                // Degenerate projective depth maps to the plane at infinity;
                // clamp to keep the output finite.
                let w = if w.abs() < f64::EPSILON {
                    f64::EPSILON
                } else {
                    w
                };
                (x / w, y / w)
            }
        }
    }
}

/// Calibration state owned by one track session. Immutable once the session
/// starts running.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationState {
    pub court_length: f64,
    pub court_width: f64,
    pub transform: CourtTransform,
}

impl CalibrationState {
    /// The documented default for a never-calibrated session: identity scale.
    pub fn default_for(court: &CourtConfig) -> Self {
        Self {
            court_length: court.length,
            court_width: court.width,
            transform: CourtTransform::Scale {
                scale_x: 1.0,
                scale_y: 1.0,
            },
        }
    }
}

/// Derives scale factors from a representative frame's pixel dimensions:
/// `scale_x = court_length / frame_width`, `scale_y = court_width / frame_height`.
pub fn calibrate(
    frame_width: u32,
    frame_height: u32,
    court: &CourtConfig,
) -> Result<CalibrationState> {
    if frame_width == 0 || frame_height == 0 {
        return Err(PipelineError::Calibration(format!(
            "degenerate reference frame: {}x{}",
            frame_width, frame_height
        )));
    }

    Ok(CalibrationState {
        court_length: court.length,
        court_width: court.width,
        transform: CourtTransform::Scale {
            scale_x: court.length / frame_width as f64,
            scale_y: court.width / frame_height as f64,
        },
    })
}

/// Applies the current transform to a pixel point. Pure: same input and same
/// state always produce the same court point.
pub fn to_court(px: f64, py: f64, state: &CalibrationState) -> CourtPoint {
    let (x, y) = state.transform.apply(px, py);
    CourtPoint::new(x, y)
}

/// Points outside the court rectangle are valid (detector noise) but signal
/// low confidence.
pub fn in_bounds(point: &CourtPoint, state: &CalibrationState) -> bool {
    point.x >= 0.0
        && point.x <= state.court_length
        && point.y >= 0.0
        && point.y <= state.court_width
}
