//! Facial micro-expression stress scoring.
//!
//! Face mesh landmarks flow through [`features::FeatureExtractor`] (per-frame
//! geometry), [`tracking::TemporalTracker`] (nod deltas and blink rate) and
//! [`stress::StressEstimator`] (weighted fusion), orchestrated per frame by
//! [`pipeline::StressAnalyzer`].

pub mod config;
pub mod data;
pub mod error;
pub mod features;
pub mod geometry;
pub mod landmarks;
pub mod mediapipe_bridge;
pub mod pipeline;
pub mod stress;
pub mod tracking;

pub use config::AnalyzerConfig;
pub use error::{AnalyzerError, Result};
pub use pipeline::{GapPolicy, ScoreRecord, StressAnalyzer};
pub use stress::StressLevel;
