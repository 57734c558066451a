//! Health Scoring Module
//!
//! Deterministic, rule-based fleet health score. The engine never derives the
//! score on its own; it stores whatever the scoring collaborator hands it
//! (clamped). This module is that collaborator for the bundled binary.
//!
//! # Scoring Algorithm
//!
//! Start at 100 and subtract a fixed penalty per unit:
//! - 6 points per `Warning`
//! - 15 points per `Critical`
//! - 5 extra points per unit whose telemetry link is offline
//!
//! `Optimal` and `Analyzing` units cost nothing. The result is clamped to
//! [0, 100].

use crate::types::{AiStatus, Unit};

pub const WARNING_PENALTY: f64 = 6.0;
pub const CRITICAL_PENALTY: f64 = 15.0;
pub const OFFLINE_PENALTY: f64 = 5.0;

/// Score a fleet from its current classifications.
pub fn score_fleet(units: &[Unit]) -> f64 {
    let penalty: f64 = units
        .iter()
        .map(|unit| {
            let status_penalty = match unit.ai_status {
                AiStatus::Optimal | AiStatus::Analyzing => 0.0,
                AiStatus::Warning { .. } => WARNING_PENALTY,
                AiStatus::Critical { .. } => CRITICAL_PENALTY,
            };
            let link_penalty = if unit.is_online() { 0.0 } else { OFFLINE_PENALTY };
            status_penalty + link_penalty
        })
        .sum();

    let score = (100.0 - penalty).clamp(0.0, 100.0);
    tracing::debug!(units = units.len(), penalty, score, "Fleet health scored");
    score
}
