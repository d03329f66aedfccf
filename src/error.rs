// src/error.rs
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnalyzerError>;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// A frame arrived with a timestamp not strictly after the previous one.
    #[error("frame timestamp {current:.3}s is not after previous timestamp {previous:.3}s")]
    OrderingViolation { previous: f64, current: f64 },

    #[error("expected {expected} landmarks, found {found}")]
    LandmarkCount { expected: usize, found: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid landmark map: {0}")]
    InvalidLandmarkMap(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
