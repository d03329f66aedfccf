// src/config.rs
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AnalyzerError, Result};
use crate::landmarks::LandmarkMap;
use crate::pipeline::GapPolicy;
use crate::stress::StressConfig;
use crate::tracking::TrackerConfig;

/// Every tunable of the analyzer. Missing JSON keys fall back to defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub landmark_map: LandmarkMap,
    pub tracker: TrackerConfig,
    pub stress: StressConfig,
    pub gap_policy: GapPolicy,
    /// Detections reported below this confidence count as no face.
    pub min_detection_confidence: f64,
    pub output_directory: Option<PathBuf>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            landmark_map: LandmarkMap::default(),
            tracker: TrackerConfig::default(),
            stress: StressConfig::default(),
            gap_policy: GapPolicy::default(),
            min_detection_confidence: 0.5,
            output_directory: None,
        }
    }
}

impl AnalyzerConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        self.landmark_map.validate()?;
        self.tracker.validate()?;
        self.stress.validate()?;
        if !(0.0..=1.0).contains(&self.min_detection_confidence) {
            return Err(AnalyzerError::InvalidConfig(format!(
                "min detection confidence must be within [0, 1], got {}",
                self.min_detection_confidence
            )));
        }
        Ok(())
    }

    pub fn output_directory(&self) -> PathBuf {
        self.output_directory.clone().unwrap_or_else(|| {
            directories::UserDirs::new()
                .and_then(|dirs| dirs.document_dir().map(|p| p.join("StressTracker")))
                .unwrap_or_else(|| PathBuf::from("./output"))
        })
    }
}
