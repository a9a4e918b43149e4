// src/error.rs

use thiserror::Error;

/// Errors that abort a session or the pipeline. Per-detection anomalies are
/// not represented here: a malformed single detection is dropped with a
/// warning and processing continues.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Invalid configuration (bad fps, bad court dimensions). Fatal, raised
    /// before any frame is processed.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Degenerate reference frame or calibration misuse. Fatal.
    #[error("calibration failed: {0}")]
    Calibration(String),

    /// The detection stream could not be read. Fatal, carries the frame
    /// index where the stream broke.
    #[error("detection source failed at frame {frame_index}: {message}")]
    Source { frame_index: u64, message: String },

    /// Writing the tracking document failed. No partial file is left behind.
    #[error("failed to serialize tracking document at {path}: {message}")]
    Serialization { path: String, message: String },

    /// A finalized session was run again. Programmer error, fail fast.
    #[error("track session already finalized; create a new session per video")]
    SessionReuse,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
