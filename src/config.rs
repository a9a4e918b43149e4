// src/config.rs

use crate::error::{PipelineError, Result as PipelineResult};
use crate::types::{Config, FrameRateSource};
use anyhow::Result;
use std::fs;
use std::path::Path;

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Court-space x value that separates home from away. Defaults to the
    /// half-court line when not configured.
    pub fn team_split_axis(&self) -> f64 {
        self.team.split_axis.unwrap_or(self.court.length / 2.0)
    }

    /// Rejects configurations that would poison the whole run. Called once,
    /// before any detection stream is opened.
    pub fn validate(&self) -> PipelineResult<()> {
        if !(self.court.length > 0.0) || !self.court.length.is_finite() {
            return Err(PipelineError::Configuration(format!(
                "court length must be positive, got {}",
                self.court.length
            )));
        }
        if !(self.court.width > 0.0) || !self.court.width.is_finite() {
            return Err(PipelineError::Configuration(format!(
                "court width must be positive, got {}",
                self.court.width
            )));
        }

        let split = self.team_split_axis();
        if !split.is_finite() || split < 0.0 || split > self.court.length {
            return Err(PipelineError::Configuration(format!(
                "team split axis {} outside court [0, {}]",
                split, self.court.length
            )));
        }

        if self.video.frame_rate_source == FrameRateSource::Override {
            match self.video.frame_rate_override {
                Some(fps) if fps > 0.0 && fps.is_finite() => {}
                other => {
                    return Err(PipelineError::Configuration(format!(
                        "frame_rate_source is \"override\" but frame_rate_override is {:?}",
                        other
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.court.length, 94.0);
        assert_eq!(config.court.width, 50.0);
        assert_eq!(config.team_split_axis(), 47.0);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: Config = serde_yaml::from_str("court:\n  length: 100.0\n").unwrap();
        assert_eq!(config.court.length, 100.0);
        assert_eq!(config.court.width, 50.0);
        assert_eq!(config.team_split_axis(), 50.0);
        assert_eq!(config.io.output_dir, "output");
    }

    #[test]
    fn test_malformed_config_file_is_an_error() {
        let dir = std::env::temp_dir()
            .join(format!("tabletop-tracking-config-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.yaml");
        fs::write(&path, "court: [not, a, map]\n").unwrap();

        assert!(Config::load(&path).is_err());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_override_without_value_rejected() {
        let config: Config =
            serde_yaml::from_str("video:\n  frame_rate_source: override\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn test_negative_court_rejected() {
        let config: Config = serde_yaml::from_str("court:\n  length: -1.0\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_split_axis_outside_court_rejected() {
        let config: Config = serde_yaml::from_str("team:\n  split_axis: 200.0\n").unwrap();
        assert!(config.validate().is_err());
    }
}
