//! Status Classifier
//!
//! Deterministic, rule-based mapping from a unit's instantaneous readings to
//! an [`AiStatus`]. Rules are evaluated in priority order and the first match
//! wins:
//!
//! 1. Offline link: `Critical("Offline")`. Connectivity dominates, since
//!    readings from a disconnected unit cannot be trusted.
//! 2. Ammonia above the critical limit: `Critical("Ammonia")`
//! 3. Dissolved oxygen below the warning limit: `Warning("Low Oxygen")`
//! 4. Temperature or pH outside the optimal band: `Warning("Out of range")`
//! 5. Otherwise `Optimal`
//!
//! `Analyzing` is never produced here.

use crate::config::ClassifierThresholds;
use crate::types::{AiStatus, ConnectionStatus, UnitReadings};

pub const REASON_OFFLINE: &str = "Offline";
pub const REASON_AMMONIA: &str = "Ammonia";
pub const REASON_LOW_OXYGEN: &str = "Low Oxygen";
pub const REASON_OUT_OF_RANGE: &str = "Out of range";

/// Classify with the default thresholds.
pub fn classify(readings: &UnitReadings) -> AiStatus {
    classify_with(readings, &ClassifierThresholds::default())
}

/// Classify against explicit thresholds.
pub fn classify_with(readings: &UnitReadings, t: &ClassifierThresholds) -> AiStatus {
    if readings.connection_status == ConnectionStatus::Offline {
        return AiStatus::critical(REASON_OFFLINE);
    }

    if readings.ammonia > t.ammonia_critical_mg_l {
        return AiStatus::critical(REASON_AMMONIA);
    }

    if readings.dissolved_oxygen < t.oxygen_warning_mg_l {
        return AiStatus::warning(REASON_LOW_OXYGEN);
    }

    let temperature_ok = (t.temperature_min_c..=t.temperature_max_c).contains(&readings.temperature);
    let ph_ok = (t.ph_min..=t.ph_max).contains(&readings.ph);
    if !temperature_ok || !ph_ok {
        return AiStatus::warning(REASON_OUT_OF_RANGE);
    }

    AiStatus::Optimal
}
