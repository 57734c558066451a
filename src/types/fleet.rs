//! Fleet types: FleetScalars, FleetState, FleetSummary, FleetSnapshot

use serde::Serialize;

use super::{AdvisoryMessage, Unit, UnitId};
use crate::history::RingBuffer;

/// Farm-wide scalar fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FleetScalars {
    /// Fleet health score, always within [0, 100]
    pub health_score: f64,
    /// Solar array output (kW)
    pub solar_power: f64,
    /// Battery bank charge (%)
    pub battery_level: f64,
    /// Borehole pump flow (L/min)
    pub borehole_flow: f64,
    pub monthly_revenue: f64,
    pub monthly_cost: f64,
    /// Whether the advisory engine manages all units automatically
    pub auto_manage_all: bool,
}

/// Aggregate root: every unit plus the farm-wide scalars and their histories.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FleetState {
    /// Presentation order, not semantic
    pub units: Vec<Unit>,
    pub scalars: FleetScalars,
    pub solar_history: RingBuffer,
    pub borehole_history: RingBuffer,
    pub demo_active: bool,
}

impl FleetState {
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.iter().find(|u| u.id == id)
    }

    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.iter_mut().find(|u| u.id == id)
    }

    /// Case-insensitive lookup by display name.
    pub fn unit_by_name(&self, name: &str) -> Option<&Unit> {
        self.units.iter().find(|u| u.name.eq_ignore_ascii_case(name))
    }
}

/// Number of units per status category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub optimal: usize,
    pub warning: usize,
    pub critical: usize,
    pub analyzing: usize,
}

/// Derived read model consumed by the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FleetSummary {
    /// `None` when the fleet is empty
    pub avg_temperature: Option<f64>,
    pub avg_ph: Option<f64>,
    pub avg_dissolved_oxygen: Option<f64>,
    pub health_score: f64,
    pub solar_power: f64,
    pub battery_level: f64,
    pub borehole_flow: f64,
    pub net_profit: f64,
    pub units_online: usize,
    pub units_total: usize,
    pub status_counts: StatusCounts,
    pub demo_active: bool,
    pub thinking: bool,
    pub auto_manage_all: bool,
    /// One-line "share status" text
    pub status_line: String,
}

/// Immutable view published after every engine mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FleetSnapshot {
    /// Monotonic publication counter
    pub version: u64,
    pub state: FleetState,
    pub summary: FleetSummary,
    pub thinking: bool,
    pub messages: Vec<AdvisoryMessage>,
}
