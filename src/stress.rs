// src/stress.rs - weighted fusion of resolved features into a stress score
use serde::{Deserialize, Serialize};

use crate::error::{AnalyzerError, Result};
use crate::geometry::unit_interval;
use crate::tracking::ResolvedFeatures;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// Plausible raw span of one feature; `min` maps to 0 and `max` to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureRange {
    pub min: f64,
    pub max: f64,
}

impl FeatureRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn normalize(&self, value: f64) -> f64 {
        unit_interval(value, self.min, self.max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureRanges {
    pub eyebrow_raise: FeatureRange,
    pub lip_tension: FeatureRange,
    pub head_nod_intensity: FeatureRange,
    pub symmetry_delta: FeatureRange,
    /// Blinks per minute.
    pub blink_rate: FeatureRange,
}

impl Default for FeatureRanges {
    fn default() -> Self {
        Self {
            eyebrow_raise: FeatureRange::new(0.0, 0.08),
            // relaxed open mouth sits near 5, pressed lips near 60
            lip_tension: FeatureRange::new(5.0, 60.0),
            head_nod_intensity: FeatureRange::new(0.0, 1.5),
            symmetry_delta: FeatureRange::new(0.0, 0.05),
            blink_rate: FeatureRange::new(0.0, 30.0),
        }
    }
}

impl FeatureRanges {
    fn named(&self) -> [(&'static str, FeatureRange); 5] {
        [
            ("eyebrow_raise", self.eyebrow_raise),
            ("lip_tension", self.lip_tension),
            ("head_nod_intensity", self.head_nod_intensity),
            ("symmetry_delta", self.symmetry_delta),
            ("blink_rate", self.blink_rate),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionWeights {
    pub eyebrow_raise: f64,
    pub lip_tension: f64,
    pub head_nod_intensity: f64,
    pub symmetry_delta: f64,
    pub blink_rate: f64,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            eyebrow_raise: 0.30,
            lip_tension: 0.25,
            head_nod_intensity: 0.20,
            symmetry_delta: 0.15,
            blink_rate: 0.10,
        }
    }
}

impl FusionWeights {
    pub fn as_array(&self) -> [f64; 5] {
        [
            self.eyebrow_raise,
            self.lip_tension,
            self.head_nod_intensity,
            self.symmetry_delta,
            self.blink_rate,
        ]
    }

    pub fn total(&self) -> f64 {
        self.as_array().iter().sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelBoundaries {
    /// Lowest score classified as slight stress.
    pub slight_stress: f64,
    /// Lowest score classified as high stress.
    pub high_stress: f64,
}

impl Default for LevelBoundaries {
    fn default() -> Self {
        Self {
            slight_stress: 0.35,
            high_stress: 0.65,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StressConfig {
    pub ranges: FeatureRanges,
    pub weights: FusionWeights,
    pub levels: LevelBoundaries,
}

impl StressConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, range) in self.ranges.named() {
            if !(range.min.is_finite() && range.max.is_finite() && range.max > range.min) {
                return Err(AnalyzerError::InvalidConfig(format!(
                    "{} range must satisfy min < max, got [{}, {}]",
                    name, range.min, range.max
                )));
            }
        }

        let weights = self.weights.as_array();
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(AnalyzerError::InvalidConfig(
                "fusion weights must be finite and non-negative".to_string(),
            ));
        }
        let total = self.weights.total();
        if (total - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(AnalyzerError::InvalidConfig(format!(
                "fusion weights must sum to 1.0, got {}",
                total
            )));
        }

        let levels = &self.levels;
        if !(levels.slight_stress > 0.0
            && levels.slight_stress <= levels.high_stress
            && levels.high_stress <= 1.0)
        {
            return Err(AnalyzerError::InvalidConfig(format!(
                "level boundaries must satisfy 0 < slight <= high <= 1, got {} / {}",
                levels.slight_stress, levels.high_stress
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StressLevel {
    Calm,
    SlightStress,
    HighStress,
}

impl StressLevel {
    pub const ALL: [StressLevel; 3] = [
        StressLevel::Calm,
        StressLevel::SlightStress,
        StressLevel::HighStress,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            StressLevel::Calm => "Calm",
            StressLevel::SlightStress => "Slight Stress",
            StressLevel::HighStress => "High Stress / Possible Deception Indicators",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            StressLevel::Calm => "🟢",
            StressLevel::SlightStress => "🟡",
            StressLevel::HighStress => "🔴",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StressScore {
    pub score: f64,
    pub level: StressLevel,
}

#[derive(Debug, Clone, Default)]
pub struct StressEstimator {
    config: StressConfig,
}

impl StressEstimator {
    pub fn new(config: StressConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &StressConfig {
        &self.config
    }

    /// Per-feature contributions in `[0, 1]`, in fusion weight order.
    pub fn contributions(&self, features: &ResolvedFeatures) -> [f64; 5] {
        let ranges = &self.config.ranges;
        [
            ranges.eyebrow_raise.normalize(features.eyebrow_raise),
            ranges.lip_tension.normalize(features.lip_tension),
            ranges.head_nod_intensity.normalize(features.head_nod_intensity),
            ranges.symmetry_delta.normalize(features.symmetry_delta),
            ranges.blink_rate.normalize(features.blink_rate),
        ]
    }

    pub fn predict(&self, features: &ResolvedFeatures) -> StressScore {
        let weights = self.config.weights.as_array();
        let weighted: f64 = weights
            .iter()
            .zip(self.contributions(features))
            .map(|(w, c)| w * c)
            .sum();
        // Dividing by the accumulated weight keeps the all-ones case at exactly 1.0.
        let total: f64 = weights.iter().sum();
        let score = if total > 0.0 {
            (weighted / total).clamp(0.0, 1.0)
        } else {
            0.0
        };

        StressScore {
            score,
            level: self.classify(score),
        }
    }

    pub fn classify(&self, score: f64) -> StressLevel {
        let levels = &self.config.levels;
        if score < levels.slight_stress {
            StressLevel::Calm
        } else if score < levels.high_stress {
            StressLevel::SlightStress
        } else {
            StressLevel::HighStress
        }
    }
}
