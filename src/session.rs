// src/session.rs
//
// Per-video tracking session. Owns the calibration state, the classifier and
// the in-progress document; drives the aggregator across the detection
// stream. One session per video — sessions for different videos share no
// state and may run on separate threads, but frames within one video are
// processed strictly in sequence because classifier strategies may carry
// ordered per-track history.

use crate::aggregator;
use crate::calibration::{self, CalibrationState};
use crate::error::{PipelineError, Result};
use crate::source::DetectionSource;
use crate::team::TeamClassifier;
use crate::types::{CourtConfig, TrackingDocument};
use std::collections::HashSet;
use tracing::{info, warn};

/// UNINITIALIZED → CALIBRATING (optional, at most once) → RUNNING → FINALIZED
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Uninitialized,
    Calibrating,
    Running,
    Finalized,
}

#[derive(Debug, Default, Clone)]
pub struct SessionStats {
    pub frames: u64,
    pub player_observations: u64,
    pub ball_frames: u64,
    pub dropped_detections: u64,
    pub distinct_tracks: usize,
}

pub struct TrackSession {
    fps: f64,
    calibration: CalibrationState,
    classifier: Box<dyn TeamClassifier>,
    state: SessionState,
    stats: SessionStats,
    seen_tracks: HashSet<String>,
}

impl TrackSession {
    /// Fails fast on an unusable frame rate — before any frame is processed.
    pub fn new(fps: f64, court: &CourtConfig, mut classifier: Box<dyn TeamClassifier>) -> Result<Self> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(PipelineError::Configuration(format!(
                "frame rate must be positive, got {}",
                fps
            )));
        }

        classifier.reset();

        Ok(Self {
            fps,
            calibration: CalibrationState::default_for(court),
            classifier,
            state: SessionState::Uninitialized,
            stats: SessionStats::default(),
            seen_tracks: HashSet::new(),
        })
    }

    /// Derives the pixel→court transform from a representative frame's
    /// dimensions. Optional, at most once, and only before `run`; skipping it
    /// leaves the documented identity-scale default in place.
    pub fn calibrate_from_frame(&mut self, frame_width: u32, frame_height: u32) -> Result<()> {
        if self.state != SessionState::Uninitialized {
            return Err(PipelineError::Calibration(
                "session already calibrated or running; calibration happens at most once"
                    .to_string(),
            ));
        }

        let court = CourtConfig {
            length: self.calibration.court_length,
            width: self.calibration.court_width,
        };
        self.calibration = calibration::calibrate(frame_width, frame_height, &court)?;
        self.state = SessionState::Calibrating;
        info!(
            "✓ Calibrated from {}x{} reference frame",
            frame_width, frame_height
        );
        Ok(())
    }

    /// Consumes the detection stream and builds the tracking document.
    ///
    /// Every yielded frame maps to exactly one record, in input order — a
    /// frame with zero detections still emits an empty record, keeping the
    /// timeline dense for constant-frame-rate playback. Per-detection
    /// anomalies are dropped with a warning; a broken stream or an
    /// out-of-order frame index aborts with frame context and no document.
    pub fn run(&mut self, source: &mut dyn DetectionSource) -> Result<TrackingDocument> {
        match self.state {
            SessionState::Uninitialized | SessionState::Calibrating => {}
            _ => return Err(PipelineError::SessionReuse),
        }
        self.state = SessionState::Running;

        let mut frames = Vec::new();
        let mut last_index: Option<u64> = None;

        while let Some(batch) = source.next_frame()? {
            // Strictly increasing, so every record gets a distinct timestamp.
            if let Some(prev) = last_index {
                if batch.frame_index <= prev {
                    return Err(PipelineError::Source {
                        frame_index: batch.frame_index,
                        message: format!("frame index did not increase (previous {})", prev),
                    });
                }
            }
            last_index = Some(batch.frame_index);

            let aggregated = aggregator::aggregate(
                &batch.detections,
                batch.frame_index,
                self.fps,
                &self.calibration,
                self.classifier.as_mut(),
            );

            self.stats.frames += 1;
            self.stats.player_observations += aggregated.record.players.len() as u64;
            self.stats.dropped_detections += u64::from(aggregated.dropped);
            if aggregated.record.ball_position.is_some() {
                self.stats.ball_frames += 1;
            }
            for player in &aggregated.record.players {
                self.seen_tracks.insert(player.id.clone());
            }

            frames.push(aggregated.record);
        }

        self.stats.distinct_tracks = self.seen_tracks.len();
        self.state = SessionState::Finalized;

        if self.stats.dropped_detections > 0 {
            warn!(
                "⚠️  {} detection(s) dropped across {} frame(s)",
                self.stats.dropped_detections, self.stats.frames
            );
        }

        Ok(TrackingDocument::new(frames))
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{FrameDetections, JsonlDetectionSource};
    use crate::team::SpatialSplitClassifier;
    use crate::types::{RawDetection, CLASS_BALL, CLASS_PLAYER};
    use std::io::Cursor;

    fn classifier() -> Box<dyn TeamClassifier> {
        Box::new(SpatialSplitClassifier::new(47.0))
    }

    /// In-memory source for driving sessions in tests.
    struct VecSource {
        fps: f64,
        dims: Option<(u32, u32)>,
        frames: std::vec::IntoIter<FrameDetections>,
    }

    impl VecSource {
        fn new(frames: Vec<FrameDetections>) -> Self {
            Self {
                fps: 30.0,
                dims: Some((1920, 1080)),
                frames: frames.into_iter(),
            }
        }
    }

    impl DetectionSource for VecSource {
        fn fps(&self) -> f64 {
            self.fps
        }
        fn frame_dimensions(&self) -> Option<(u32, u32)> {
            self.dims
        }
        fn next_frame(&mut self) -> crate::error::Result<Option<FrameDetections>> {
            Ok(self.frames.next())
        }
    }

    fn player(track_id: u64, x: f64, y: f64) -> RawDetection {
        RawDetection {
            center_x: x,
            center_y: y,
            width: 40.0,
            height: 80.0,
            track_id: Some(track_id),
            class_id: CLASS_PLAYER,
        }
    }

    fn ball(x: f64, y: f64) -> RawDetection {
        RawDetection {
            center_x: x,
            center_y: y,
            width: 10.0,
            height: 10.0,
            track_id: Some(999),
            class_id: CLASS_BALL,
        }
    }

    fn batch(frame_index: u64, detections: Vec<RawDetection>) -> FrameDetections {
        FrameDetections {
            frame_index,
            detections,
        }
    }

    #[test]
    fn test_zero_fps_is_configuration_error_before_any_frame() {
        let err = TrackSession::new(0.0, &CourtConfig::default(), classifier())
            .err()
            .unwrap();
        assert!(matches!(err, PipelineError::Configuration(_)));

        let err = TrackSession::new(-30.0, &CourtConfig::default(), classifier())
            .err()
            .unwrap();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn test_n_frames_in_n_records_out_with_increasing_timestamps() {
        let mut session = TrackSession::new(30.0, &CourtConfig::default(), classifier()).unwrap();
        session.calibrate_from_frame(1920, 1080).unwrap();

        let mut source = VecSource::new(
            (0..5)
                .map(|i| batch(i, vec![player(1, 100.0, 100.0)]))
                .collect(),
        );

        let document = session.run(&mut source).unwrap();
        assert_eq!(document.version, "1.0");
        assert_eq!(document.frames.len(), 5);

        for (i, frame) in document.frames.iter().enumerate() {
            assert!((frame.timestamp - i as f64 / 30.0).abs() < 1e-9);
        }
        for pair in document.frames.windows(2) {
            assert!(pair[1].timestamp > pair[0].timestamp);
        }
        assert_eq!(session.stats().frames, 5);
        assert_eq!(session.stats().distinct_tracks, 1);
    }

    #[test]
    fn test_empty_frames_are_never_skipped() {
        let mut session = TrackSession::new(30.0, &CourtConfig::default(), classifier()).unwrap();
        let mut source = VecSource::new(vec![
            batch(0, vec![player(1, 100.0, 100.0), ball(200.0, 200.0)]),
            batch(1, vec![]),
            batch(2, vec![player(1, 110.0, 100.0)]),
        ]);

        let document = session.run(&mut source).unwrap();
        assert_eq!(document.frames.len(), 3);
        assert!(document.frames[1].players.is_empty());
        assert!(document.frames[1].ball_position.is_none());
        assert_eq!(session.stats().ball_frames, 1);
    }

    #[test]
    fn test_session_reuse_fails_fast() {
        let mut session = TrackSession::new(30.0, &CourtConfig::default(), classifier()).unwrap();
        let mut source = VecSource::new(vec![batch(0, vec![])]);
        session.run(&mut source).unwrap();

        let mut again = VecSource::new(vec![batch(0, vec![])]);
        let err = session.run(&mut again).unwrap_err();
        assert!(matches!(err, PipelineError::SessionReuse));
    }

    #[test]
    fn test_calibration_at_most_once_and_before_run() {
        let mut session = TrackSession::new(30.0, &CourtConfig::default(), classifier()).unwrap();
        session.calibrate_from_frame(1920, 1080).unwrap();

        let err = session.calibrate_from_frame(1280, 720).unwrap_err();
        assert!(matches!(err, PipelineError::Calibration(_)));

        let mut source = VecSource::new(vec![batch(0, vec![])]);
        session.run(&mut source).unwrap();
        let err = session.calibrate_from_frame(1280, 720).unwrap_err();
        assert!(matches!(err, PipelineError::Calibration(_)));
    }

    #[test]
    fn test_uncalibrated_session_uses_identity_default() {
        let mut session = TrackSession::new(30.0, &CourtConfig::default(), classifier()).unwrap();
        let mut source = VecSource::new(vec![batch(0, vec![player(1, 12.0, 34.0)])]);

        let document = session.run(&mut source).unwrap();
        let pos = document.frames[0].players[0].position;
        assert_eq!((pos.x, pos.y), (12.0, 34.0));
    }

    #[test]
    fn test_backwards_frame_index_aborts_with_context() {
        let mut session = TrackSession::new(30.0, &CourtConfig::default(), classifier()).unwrap();
        let mut source = VecSource::new(vec![batch(5, vec![]), batch(3, vec![])]);

        let err = session.run(&mut source).unwrap_err();
        match err {
            PipelineError::Source { frame_index, .. } => assert_eq!(frame_index, 3),
            other => panic!("expected Source error, got {:?}", other),
        }
    }

    #[test]
    fn test_repeated_frame_index_aborts() {
        // An equal index would duplicate a timestamp; rejected like a
        // backwards one.
        let mut session = TrackSession::new(30.0, &CourtConfig::default(), classifier()).unwrap();
        let mut source = VecSource::new(vec![batch(2, vec![]), batch(2, vec![])]);

        let err = session.run(&mut source).unwrap_err();
        match err {
            PipelineError::Source { frame_index, .. } => assert_eq!(frame_index, 2),
            other => panic!("expected Source error, got {:?}", other),
        }
    }

    #[test]
    fn test_anomalies_do_not_abort_session() {
        let mut session = TrackSession::new(30.0, &CourtConfig::default(), classifier()).unwrap();
        let mut bad = player(0, 100.0, 100.0);
        bad.track_id = None;
        let mut source = VecSource::new(vec![batch(0, vec![bad, player(2, 100.0, 100.0)])]);

        let document = session.run(&mut source).unwrap();
        assert_eq!(document.frames.len(), 1);
        assert_eq!(document.frames[0].players.len(), 1);
        assert_eq!(session.stats().dropped_detections, 1);
    }

    #[test]
    fn test_runs_from_jsonl_source_end_to_end() {
        let body = concat!(
            "{\"fps\": 30.0, \"frame_width\": 1920, \"frame_height\": 1080}\n",
            "{\"frame_index\": 0, \"detections\": [",
            "{\"center_x\": 100.0, \"center_y\": 100.0, \"width\": 40.0, ",
            "\"height\": 80.0, \"track_id\": 5, \"class_id\": 0},",
            "{\"center_x\": 200.0, \"center_y\": 200.0, \"width\": 10.0, ",
            "\"height\": 10.0, \"track_id\": 9, \"class_id\": 1}]}\n",
            "{\"frame_index\": 1, \"detections\": []}\n",
        );
        let mut source =
            JsonlDetectionSource::from_reader(Cursor::new(body.as_bytes().to_vec())).unwrap();

        let mut session =
            TrackSession::new(source.fps(), &CourtConfig::default(), classifier()).unwrap();
        let (w, h) = source.frame_dimensions().unwrap();
        session.calibrate_from_frame(w, h).unwrap();

        let document = session.run(&mut source).unwrap();
        assert_eq!(document.frames.len(), 2);
        assert_eq!(document.frames[0].players[0].id, "5");
        assert_eq!(document.frames[0].players[0].team.as_str(), "home");
        assert!(document.frames[0].ball_position.is_some());
        assert!(document.frames[1].ball_position.is_none());
    }
}
