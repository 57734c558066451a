//! Derived metrics: status classification, fleet aggregates, health scoring

pub mod aggregation;
pub mod classifier;
pub mod health_scoring;

pub use aggregation::{average, clamp_health_score, summarize};
pub use classifier::{classify, classify_with};
pub use health_scoring::score_fleet;

use thiserror::Error;

/// Errors in fleet aggregation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AggregationError {
    #[error("Cannot aggregate over an empty fleet")]
    EmptyFleet,

    #[error("Health score must be finite, got {0}")]
    NonFiniteScore(f64),
}
