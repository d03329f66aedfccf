// src/tracking.rs - temporal resolution of per-frame geometry
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::error::{AnalyzerError, Result};
use crate::features::FrameFeatures;
use crate::geometry::{guarded_ratio, mean};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Eye openness below this closes the eye.
    pub blink_low_threshold: f64,
    /// Eye openness above this reopens a closed eye.
    pub blink_high_threshold: f64,
    pub blink_window_seconds: f64,
    /// Moving-average length for eyebrow, lip, nod and symmetry. 1 disables smoothing.
    pub smoothing_window: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            blink_low_threshold: 0.15,
            blink_high_threshold: 0.25,
            blink_window_seconds: 60.0,
            smoothing_window: 1,
        }
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<()> {
        check_blink_parameters(
            self.blink_low_threshold,
            self.blink_high_threshold,
            self.blink_window_seconds,
        )?;
        if self.smoothing_window == 0 {
            return Err(AnalyzerError::InvalidConfig(
                "smoothing window must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn check_blink_parameters(low: f64, high: f64, window_seconds: f64) -> Result<()> {
    if !(low.is_finite() && high.is_finite() && low < high) {
        return Err(AnalyzerError::InvalidConfig(format!(
            "blink thresholds must satisfy low < high, got {} / {}",
            low, high
        )));
    }
    if !(window_seconds.is_finite() && window_seconds > 0.0) {
        return Err(AnalyzerError::InvalidConfig(format!(
            "blink window must be positive, got {}",
            window_seconds
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EyeState {
    Open,
    Closed,
}

impl EyeState {
    /// Hysteresis step. Returns the next state and whether a blink completed.
    pub fn transition(self, openness: f64, low: f64, high: f64) -> (EyeState, bool) {
        match self {
            EyeState::Open if openness < low => (EyeState::Closed, false),
            EyeState::Closed if openness > high => (EyeState::Open, true),
            state => (state, false),
        }
    }
}

/// Counts completed blinks inside a sliding time window.
#[derive(Debug, Clone)]
pub struct BlinkCounter {
    low_threshold: f64,
    high_threshold: f64,
    window_seconds: f64,
    state: EyeState,
    samples: VecDeque<(f64, f64)>,
    events: VecDeque<f64>,
}

impl BlinkCounter {
    pub fn new(low_threshold: f64, high_threshold: f64, window_seconds: f64) -> Result<Self> {
        check_blink_parameters(low_threshold, high_threshold, window_seconds)?;
        Ok(Self::unchecked(low_threshold, high_threshold, window_seconds))
    }

    fn unchecked(low_threshold: f64, high_threshold: f64, window_seconds: f64) -> Self {
        Self {
            low_threshold,
            high_threshold,
            window_seconds,
            state: EyeState::Open,
            samples: VecDeque::new(),
            events: VecDeque::new(),
        }
    }

    /// Feeds one eye openness sample. Returns true when it completes a blink.
    pub fn update(&mut self, openness: f64, timestamp: f64) -> bool {
        let (next, blinked) = self
            .state
            .transition(openness, self.low_threshold, self.high_threshold);
        self.state = next;

        self.samples.push_back((timestamp, openness));
        if blinked {
            self.events.push_back(timestamp);
        }
        self.prune(timestamp);
        blinked
    }

    /// Drops samples and events older than the window, relative to `now`.
    pub fn prune(&mut self, now: f64) {
        let window = self.window_seconds;
        while self.samples.front().is_some_and(|(t, _)| now - t > window) {
            self.samples.pop_front();
        }
        while self.events.front().is_some_and(|t| now - t > window) {
            self.events.pop_front();
        }
    }

    pub fn state(&self) -> EyeState {
        self.state
    }

    pub fn count(&self) -> usize {
        self.events.len()
    }

    /// Blinks per minute extrapolated from the window count.
    pub fn rate(&self) -> f64 {
        self.events.len() as f64 * (60.0 / self.window_seconds)
    }

    /// Share of buffered samples with the eye below the closing threshold.
    pub fn closed_fraction(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let closed = self
            .samples
            .iter()
            .filter(|(_, openness)| *openness < self.low_threshold)
            .count();
        closed as f64 / self.samples.len() as f64
    }
}

#[derive(Debug, Clone)]
struct MovingAverage {
    window: usize,
    values: VecDeque<f64>,
}

impl MovingAverage {
    fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            values: VecDeque::with_capacity(window.max(1)),
        }
    }

    fn push(&mut self, value: f64) -> f64 {
        self.values.push_back(value);
        if self.values.len() > self.window {
            self.values.pop_front();
        }
        mean(self.values.iter().copied())
    }
}

/// Feature values after temporal processing, as handed to the stress estimator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ResolvedFeatures {
    pub eyebrow_raise: f64,
    pub lip_tension: f64,
    pub head_nod_intensity: f64,
    pub symmetry_delta: f64,
    pub blink_rate: f64,
}

/// Session-long history for one subject. Feed it exactly one call per frame
/// with strictly increasing timestamps.
#[derive(Debug, Clone)]
pub struct TemporalTracker {
    previous_nose: Option<Vector2<f64>>,
    last_timestamp: Option<f64>,
    blinks: BlinkCounter,
    eyebrow_history: MovingAverage,
    lip_history: MovingAverage,
    nod_history: MovingAverage,
    symmetry_history: MovingAverage,
}

impl Default for TemporalTracker {
    fn default() -> Self {
        Self::unchecked(&TrackerConfig::default())
    }
}

impl TemporalTracker {
    pub fn new(config: &TrackerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::unchecked(config))
    }

    fn unchecked(config: &TrackerConfig) -> Self {
        let window = config.smoothing_window;
        Self {
            previous_nose: None,
            last_timestamp: None,
            blinks: BlinkCounter::unchecked(
                config.blink_low_threshold,
                config.blink_high_threshold,
                config.blink_window_seconds,
            ),
            eyebrow_history: MovingAverage::new(window),
            lip_history: MovingAverage::new(window),
            nod_history: MovingAverage::new(window),
            symmetry_history: MovingAverage::new(window),
        }
    }

    fn advance_clock(&mut self, timestamp: f64) -> Result<()> {
        let previous = self.last_timestamp.unwrap_or(f64::NEG_INFINITY);
        if !timestamp.is_finite() || timestamp <= previous {
            return Err(AnalyzerError::OrderingViolation {
                previous,
                current: timestamp,
            });
        }
        self.last_timestamp = Some(timestamp);
        Ok(())
    }

    pub fn resolve(
        &mut self,
        features: &FrameFeatures,
        timestamp: f64,
    ) -> Result<ResolvedFeatures> {
        self.advance_clock(timestamp)?;

        let head_nod_intensity = match self.previous_nose {
            Some(previous) => {
                let dy = (features.nose_tip.y - previous.y).abs();
                self.nod_history
                    .push(guarded_ratio(dy, features.head_length))
            }
            None => 0.0,
        };
        self.previous_nose = Some(features.nose_tip);

        self.blinks.update(features.eye_openness, timestamp);

        Ok(ResolvedFeatures {
            eyebrow_raise: self.eyebrow_history.push(features.eyebrow_raise),
            lip_tension: self.lip_history.push(features.lip_tension),
            head_nod_intensity,
            symmetry_delta: self.symmetry_history.push(features.cheek_symmetry.abs()),
            blink_rate: self.blinks.rate(),
        })
    }

    /// Records a frame with no detected face. The nose baseline is dropped so
    /// no motion is measured across the gap; blink state is kept.
    pub fn mark_gap(&mut self, timestamp: f64) -> Result<()> {
        self.advance_clock(timestamp)?;
        self.previous_nose = None;
        self.blinks.prune(timestamp);
        Ok(())
    }

    pub fn blinks(&self) -> &BlinkCounter {
        &self.blinks
    }
}
