// src/main.rs

mod aggregator;
mod calibration;
mod config;
mod error;
mod serializer;
mod session;
mod source;
mod team;
mod types;

use anyhow::Result;
use session::{SessionStats, TrackSession};
use source::{DetectionSource, JsonlDetectionSource};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info, warn};
use types::{Config, FrameRateSource};
use walkdir::WalkDir;

fn main() -> Result<()> {
    // A missing config file means defaults; a present-but-broken one is fatal.
    let config = if Path::new("config.yaml").exists() {
        types::Config::load("config.yaml")?
    } else {
        eprintln!("No config.yaml found, using defaults");
        Config::default()
    };

    tracing_subscriber::fmt()
        .with_env_filter(format!("tabletop_tracking={}", config.logging.level))
        .init();

    info!("🏀 Tabletop Tracking Pipeline Starting");
    config.validate()?;
    info!("✓ Configuration loaded");
    info!(
        "Court: {:.0}x{:.0} ft | team split at x={:.1} | smoothing window {}",
        config.court.length,
        config.court.width,
        config.team_split_axis(),
        config.team.smoothing_window
    );

    let detection_files = find_detection_files(&config)?;
    if detection_files.is_empty() {
        error!("No detection streams found in {}", config.io.input_dir);
        return Ok(());
    }
    info!("Found {} detection stream(s) to process", detection_files.len());

    for (idx, path) in detection_files.iter().enumerate() {
        info!(
            "Processing stream {}/{}: {}",
            idx + 1,
            detection_files.len(),
            path.display()
        );

        match process_stream(path, &config) {
            Ok(report) => {
                info!("✓ Stream processed successfully!");
                info!("  Frames: {}", report.stats.frames);
                info!(
                    "  Player observations: {} ({} distinct track(s))",
                    report.stats.player_observations, report.stats.distinct_tracks
                );
                info!(
                    "  Ball visible: {}/{} frames",
                    report.stats.ball_frames, report.stats.frames
                );
                if report.stats.dropped_detections > 0 {
                    warn!(
                        "  ⚠️  Dropped detections: {}",
                        report.stats.dropped_detections
                    );
                }
                info!("  Processing speed: {:.1} frames/s", report.frames_per_sec);
                info!("  💾 Output: {}", report.output_path.display());
            }
            Err(e) => error!("Failed to process {}: {}", path.display(), e),
        }
    }

    Ok(())
}

struct StreamReport {
    stats: SessionStats,
    output_path: PathBuf,
    frames_per_sec: f64,
}

/// Detection dumps are JSON Lines files under the configured input dir.
fn find_detection_files(config: &Config) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(&config.io.input_dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if let Some(ext) = path.extension() {
            if ext.eq_ignore_ascii_case("jsonl") {
                files.push(path.to_path_buf());
            }
        }
    }

    files.sort();
    info!("Found {} detection file(s)", files.len());
    Ok(files)
}

fn process_stream(path: &Path, config: &Config) -> Result<StreamReport> {
    let start_time = Instant::now();

    let mut source = JsonlDetectionSource::open(path)?;

    let fps = match config.video.frame_rate_source {
        FrameRateSource::Metadata => source.fps(),
        // validate() guarantees the override is present and positive.
        FrameRateSource::Override => config.video.frame_rate_override.unwrap_or_default(),
    };

    let classifier = team::build_classifier(&config.team, &config.court);
    let mut session = TrackSession::new(fps, &config.court, classifier)?;

    match source.frame_dimensions() {
        Some((width, height)) => session.calibrate_from_frame(width, height)?,
        None => warn!("Stream has no reference frame dimensions; using identity calibration"),
    }

    let document = session.run(&mut source)?;

    let stream_name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("stream");
    let output_path =
        Path::new(&config.io.output_dir).join(format!("{}_tracking.json", stream_name));
    serializer::write_document(&document, &output_path)?;

    let stats = session.stats().clone();
    let elapsed = start_time.elapsed().as_secs_f64();
    let frames_per_sec = if elapsed > 0.0 {
        stats.frames as f64 / elapsed
    } else {
        0.0
    };

    Ok(StreamReport {
        stats,
        output_path,
        frames_per_sec,
    })
}
