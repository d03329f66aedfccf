// src/pipeline.rs - one frame in, at most one score record out
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AnalyzerConfig;
use crate::error::Result;
use crate::features::FeatureExtractor;
use crate::landmarks::{Detection, LandmarkFrame};
use crate::stress::{StressEstimator, StressLevel};
use crate::tracking::{ResolvedFeatures, TemporalTracker};

/// What to emit for a frame without a detected face.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapPolicy {
    /// Emit nothing.
    #[default]
    Suppress,
    /// Re-emit the last record unchanged.
    RepeatLast,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreRecord {
    pub timestamp: f64,
    pub features: ResolvedFeatures,
    pub stress_score: f64,
    pub level: StressLevel,
}

impl ScoreRecord {
    pub fn formatted(&self) -> String {
        format!(
            "{} {} ({:.2})",
            self.level.icon(),
            self.level.label(),
            self.stress_score
        )
    }
}

pub struct StressAnalyzer {
    extractor: FeatureExtractor,
    tracker: TemporalTracker,
    estimator: StressEstimator,
    gap_policy: GapPolicy,
    last_record: Option<ScoreRecord>,
}

impl StressAnalyzer {
    pub fn new(config: &AnalyzerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            extractor: FeatureExtractor::new(config.landmark_map.clone())?,
            tracker: TemporalTracker::new(&config.tracker)?,
            estimator: StressEstimator::new(config.stress.clone())?,
            gap_policy: config.gap_policy,
            last_record: None,
        })
    }

    pub fn process(&mut self, frame: &LandmarkFrame) -> Result<Option<ScoreRecord>> {
        let landmarks = match &frame.detection {
            Detection::Face(landmarks) => landmarks,
            Detection::NoFace => {
                self.tracker.mark_gap(frame.timestamp)?;
                debug!("No face at {:.3}s", frame.timestamp);
                return Ok(match self.gap_policy {
                    GapPolicy::Suppress => None,
                    GapPolicy::RepeatLast => self.last_record,
                });
            }
        };

        let features = self.extractor.extract(landmarks)?;
        let resolved = self.tracker.resolve(&features, frame.timestamp)?;
        let stress = self.estimator.predict(&resolved);

        let record = ScoreRecord {
            timestamp: frame.timestamp,
            features: resolved,
            stress_score: stress.score,
            level: stress.level,
        };
        debug!(
            "t={:.3}s brow={:.4} lip={:.2} nod={:.4} sym={:.4} blink={:.1}/min closed={:.2} -> {}",
            record.timestamp,
            resolved.eyebrow_raise,
            resolved.lip_tension,
            resolved.head_nod_intensity,
            resolved.symmetry_delta,
            resolved.blink_rate,
            self.tracker.blinks().closed_fraction(),
            record.formatted()
        );

        self.last_record = Some(record);
        Ok(Some(record))
    }

    pub fn last_record(&self) -> Option<&ScoreRecord> {
        self.last_record.as_ref()
    }
}
