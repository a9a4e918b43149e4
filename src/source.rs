// src/source.rs
//
// The detector/tracker is an external collaborator. Its whole contract with
// this crate is `DetectionSource`: a lazy, finite, non-restartable sequence
// of per-frame detection batches in strictly ascending frame-index order.
//
// The concrete source reads a detector dump in JSON Lines form:
//   line 1:  {"fps": 30.0, "frame_width": 1920, "frame_height": 1080}
//   line 2+: {"frame_index": 0, "detections": [{"center_x": ..,
//             "center_y": .., "width": .., "height": .., "track_id": 5,
//             "class_id": 0}, ..]}

use crate::error::{PipelineError, Result};
use crate::types::RawDetection;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;

/// One frame's worth of raw detections.
#[derive(Debug, Deserialize)]
pub struct FrameDetections {
    pub frame_index: u64,
    #[serde(default)]
    pub detections: Vec<RawDetection>,
}

/// Capability the session pulls frames from. Implementations own their
/// underlying stream and release it on drop, on every exit path.
pub trait DetectionSource {
    /// Frame rate reported by the stream's metadata.
    fn fps(&self) -> f64;

    /// Pixel dimensions of the reference frame, when the stream knows them.
    fn frame_dimensions(&self) -> Option<(u32, u32)>;

    /// Next frame batch, or `None` at end of stream.
    fn next_frame(&mut self) -> Result<Option<FrameDetections>>;
}

#[derive(Debug, Deserialize)]
struct StreamHeader {
    fps: f64,
    #[serde(default)]
    frame_width: Option<u32>,
    #[serde(default)]
    frame_height: Option<u32>,
}

/// File-backed detection stream (one JSON object per line, header first).
pub struct JsonlDetectionSource<R: BufRead> {
    reader: R,
    header: StreamHeader,
    /// Index of the last successfully parsed frame, for error context.
    last_frame_index: Option<u64>,
}

impl JsonlDetectionSource<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| PipelineError::Source {
            frame_index: 0,
            message: format!("cannot open {}: {}", path.display(), e),
        })?;
        Self::from_reader(BufReader::new(file))
    }
}

impl<R: BufRead> JsonlDetectionSource<R> {
    pub fn from_reader(mut reader: R) -> Result<Self> {
        let mut line = String::new();
        let read = reader.read_line(&mut line).map_err(|e| PipelineError::Source {
            frame_index: 0,
            message: format!("cannot read stream header: {}", e),
        })?;
        if read == 0 {
            return Err(PipelineError::Source {
                frame_index: 0,
                message: "empty detection stream (missing header line)".to_string(),
            });
        }

        let header: StreamHeader =
            serde_json::from_str(line.trim()).map_err(|e| PipelineError::Source {
                frame_index: 0,
                message: format!("malformed stream header: {}", e),
            })?;

        debug!(
            "Detection stream header: {:.2} fps, reference frame {:?}x{:?}",
            header.fps, header.frame_width, header.frame_height
        );

        Ok(Self {
            reader,
            header,
            last_frame_index: None,
        })
    }
}

impl<R: BufRead> DetectionSource for JsonlDetectionSource<R> {
    fn fps(&self) -> f64 {
        self.header.fps
    }

    fn frame_dimensions(&self) -> Option<(u32, u32)> {
        match (self.header.frame_width, self.header.frame_height) {
            (Some(w), Some(h)) => Some((w, h)),
            _ => None,
        }
    }

    fn next_frame(&mut self) -> Result<Option<FrameDetections>> {
        // Best estimate of where the stream broke: one past the last frame
        // that parsed, whatever index the stream started at.
        let next_index = self.last_frame_index.map_or(0, |i| i + 1);
        loop {
            let mut line = String::new();
            let read = self
                .reader
                .read_line(&mut line)
                .map_err(|e| PipelineError::Source {
                    frame_index: next_index,
                    message: format!("unreadable stream: {}", e),
                })?;
            if read == 0 {
                return Ok(None);
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let frame: FrameDetections =
                serde_json::from_str(trimmed).map_err(|e| PipelineError::Source {
                    frame_index: next_index,
                    message: format!("malformed frame batch: {}", e),
                })?;

            self.last_frame_index = Some(frame.frame_index);
            return Ok(Some(frame));
        }
    }
}
