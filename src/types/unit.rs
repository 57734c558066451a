//! Unit types: UnitId, ConnectionStatus, AiStatus, Metric, Unit

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::history::RingBuffer;

// ============================================================================
// Identity
// ============================================================================

/// Stable identity of a monitored unit. Never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub u32);

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unit-{:02}", self.0)
    }
}

// ============================================================================
// Connection & Classification
// ============================================================================

/// State of the telemetry link to a unit
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Online,
    Offline,
    Syncing,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(match self {
            ConnectionStatus::Online => "online",
            ConnectionStatus::Offline => "offline",
            ConnectionStatus::Syncing => "syncing",
        })
    }
}

/// Health classification of a unit.
///
/// Derived from readings by the classifier, forced to `Optimal` by the demo
/// overlay, or set to `Analyzing` while an advisory request about the unit is
/// in flight.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AiStatus {
    #[default]
    Optimal,
    Warning { reason: String },
    Critical { reason: String },
    Analyzing,
}

impl AiStatus {
    pub fn warning(reason: impl Into<String>) -> Self {
        AiStatus::Warning { reason: reason.into() }
    }

    pub fn critical(reason: impl Into<String>) -> Self {
        AiStatus::Critical { reason: reason.into() }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            AiStatus::Warning { reason } | AiStatus::Critical { reason } => Some(reason),
            AiStatus::Optimal | AiStatus::Analyzing => None,
        }
    }

    /// Ordering used when picking the most urgent unit (higher = worse).
    pub fn severity_rank(&self) -> u8 {
        match self {
            AiStatus::Optimal => 0,
            AiStatus::Analyzing => 1,
            AiStatus::Warning { .. } => 2,
            AiStatus::Critical { .. } => 3,
        }
    }

    pub fn is_optimal(&self) -> bool {
        matches!(self, AiStatus::Optimal)
    }
}

impl std::fmt::Display for AiStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AiStatus::Optimal => write!(f, "OPTIMAL"),
            AiStatus::Warning { reason } => write!(f, "WARNING: {}", reason),
            AiStatus::Critical { reason } => write!(f, "CRITICAL: {}", reason),
            AiStatus::Analyzing => write!(f, "ANALYZING"),
        }
    }
}

// ============================================================================
// Metrics
// ============================================================================

/// Per-unit water-quality metric
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Temperature,
    Ph,
    DissolvedOxygen,
    Ammonia,
    Salinity,
}

impl Metric {
    pub fn unit_label(&self) -> &'static str {
        match self {
            Metric::Temperature => "°C",
            Metric::Ph => "",
            Metric::DissolvedOxygen | Metric::Ammonia => "mg/L",
            Metric::Salinity => "ppt",
        }
    }

    /// Metrics with a rolling history buffer.
    pub fn has_history(&self) -> bool {
        matches!(self, Metric::Temperature | Metric::Ph | Metric::DissolvedOxygen)
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Metric::Temperature => write!(f, "temperature"),
            Metric::Ph => write!(f, "pH"),
            Metric::DissolvedOxygen => write!(f, "dissolved oxygen"),
            Metric::Ammonia => write!(f, "ammonia"),
            Metric::Salinity => write!(f, "salinity"),
        }
    }
}

/// Farm-wide utility metric
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FleetMetric {
    /// Solar array output (kW)
    SolarPower,
    /// Battery bank charge (%)
    BatteryLevel,
    /// Main borehole pump flow (L/min)
    BoreholeFlow,
}

impl std::fmt::Display for FleetMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FleetMetric::SolarPower => write!(f, "solar power"),
            FleetMetric::BatteryLevel => write!(f, "battery level"),
            FleetMetric::BoreholeFlow => write!(f, "borehole flow"),
        }
    }
}

// ============================================================================
// Unit
// ============================================================================

/// Classifier input: the instantaneous readings of one unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitReadings {
    pub temperature: f64,
    pub ph: f64,
    pub dissolved_oxygen: f64,
    pub ammonia: f64,
    pub salinity: f64,
    pub connection_status: ConnectionStatus,
}

impl UnitReadings {
    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Temperature => self.temperature,
            Metric::Ph => self.ph,
            Metric::DissolvedOxygen => self.dissolved_oxygen,
            Metric::Ammonia => self.ammonia,
            Metric::Salinity => self.salinity,
        }
    }

    pub fn set(&mut self, metric: Metric, value: f64) {
        match metric {
            Metric::Temperature => self.temperature = value,
            Metric::Ph => self.ph = value,
            Metric::DissolvedOxygen => self.dissolved_oxygen = value,
            Metric::Ammonia => self.ammonia = value,
            Metric::Salinity => self.salinity = value,
        }
    }
}

/// Descriptive equipment attached to a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    pub sensor_count: u32,
    pub pump_count: u32,
    pub feeder_status: String,
}

impl Default for Inventory {
    fn default() -> Self {
        Self {
            sensor_count: 3,
            pump_count: 1,
            feeder_status: "Auto".to_string(),
        }
    }
}

/// Rolling histories kept per unit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitHistories {
    pub temperature: RingBuffer,
    pub ph: RingBuffer,
    pub dissolved_oxygen: RingBuffer,
}

impl UnitHistories {
    pub fn get(&self, metric: Metric) -> Option<&RingBuffer> {
        match metric {
            Metric::Temperature => Some(&self.temperature),
            Metric::Ph => Some(&self.ph),
            Metric::DissolvedOxygen => Some(&self.dissolved_oxygen),
            Metric::Ammonia | Metric::Salinity => None,
        }
    }

    pub fn get_mut(&mut self, metric: Metric) -> Option<&mut RingBuffer> {
        match metric {
            Metric::Temperature => Some(&mut self.temperature),
            Metric::Ph => Some(&mut self.ph),
            Metric::DissolvedOxygen => Some(&mut self.dissolved_oxygen),
            Metric::Ammonia | Metric::Salinity => None,
        }
    }
}

/// One monitored enclosure (pond, raceway, nursery tank).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Unit {
    pub id: UnitId,
    pub name: String,
    pub species: String,
    pub readings: UnitReadings,
    pub last_update: DateTime<Utc>,
    pub ai_status: AiStatus,
    pub histories: UnitHistories,
    pub inventory: Inventory,
}

impl Unit {
    pub fn temperature(&self) -> f64 {
        self.readings.temperature
    }

    pub fn ph(&self) -> f64 {
        self.readings.ph
    }

    pub fn dissolved_oxygen(&self) -> f64 {
        self.readings.dissolved_oxygen
    }

    pub fn ammonia(&self) -> f64 {
        self.readings.ammonia
    }

    pub fn salinity(&self) -> f64 {
        self.readings.salinity
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.readings.connection_status
    }

    pub fn is_online(&self) -> bool {
        self.readings.connection_status != ConnectionStatus::Offline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ai_status_display() {
        assert_eq!(AiStatus::Optimal.to_string(), "OPTIMAL");
        assert_eq!(AiStatus::warning("Low Oxygen").to_string(), "WARNING: Low Oxygen");
        assert_eq!(AiStatus::critical("Offline").to_string(), "CRITICAL: Offline");
        assert_eq!(AiStatus::Analyzing.to_string(), "ANALYZING");
    }

    #[test]
    fn test_ai_status_reason() {
        assert_eq!(AiStatus::critical("Ammonia").reason(), Some("Ammonia"));
        assert_eq!(AiStatus::Optimal.reason(), None);
    }

    #[test]
    fn test_severity_rank_orders_critical_highest() {
        assert!(AiStatus::critical("x").severity_rank() > AiStatus::warning("x").severity_rank());
        assert!(AiStatus::warning("x").severity_rank() > AiStatus::Analyzing.severity_rank());
        assert!(AiStatus::Analyzing.severity_rank() > AiStatus::Optimal.severity_rank());
    }

    #[test]
    fn test_ai_status_serializes_tagged() {
        let json = serde_json::to_string(&AiStatus::warning("Low Oxygen")).unwrap();
        assert_eq!(json, r#"{"state":"warning","reason":"Low Oxygen"}"#);
    }

    #[test]
    fn test_readings_get_set() {
        let mut r = UnitReadings {
            temperature: 28.0,
            ph: 7.0,
            dissolved_oxygen: 6.0,
            ammonia: 0.1,
            salinity: 0.5,
            connection_status: ConnectionStatus::Online,
        };
        for metric in [
            Metric::Temperature,
            Metric::Ph,
            Metric::DissolvedOxygen,
            Metric::Ammonia,
            Metric::Salinity,
        ] {
            r.set(metric, 1.5);
            assert_eq!(r.get(metric), 1.5);
        }
    }

    #[test]
    fn test_unit_id_display() {
        assert_eq!(UnitId(3).to_string(), "unit-03");
    }
}
