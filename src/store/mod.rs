//! Entity Store
//!
//! Single source of truth for live readings. Owns the [`FleetState`] and
//! validates every write against the configured instrument ranges before
//! touching it, so a rejected write leaves the fleet exactly as it was.
//!
//! The store is a plain synchronous struct; the engine actor owns the only
//! instance and is the only writer.

pub mod fixture;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{ClassifierThresholds, InstrumentRanges, Range};
use crate::history::SampleError;
use crate::processing::{classify_with, clamp_health_score, AggregationError};
use crate::types::{
    AiStatus, ConnectionStatus, FleetMetric, FleetState, Metric, Unit, UnitId,
};

/// Errors at the store boundary
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Unit not found: {0}")]
    NotFound(UnitId),

    #[error("Invalid {metric} reading {value}: outside instrument range [{}, {}]", .range.min, .range.max)]
    InvalidReading {
        metric: String,
        value: f64,
        range: Range,
    },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: f64 },

    #[error(transparent)]
    Sample(#[from] SampleError),

    #[error(transparent)]
    Aggregation(#[from] AggregationError),
}

/// One mutation of the fleet, as accepted by [`EntityStore::apply`].
///
/// The same value is journaled while the demo overlay is active and replayed
/// on exit, so it carries everything needed to re-apply it later.
#[derive(Debug, Clone, PartialEq)]
pub enum FleetWrite {
    Reading {
        unit_id: UnitId,
        metric: Metric,
        value: f64,
        at: DateTime<Utc>,
    },
    ConnectionStatus {
        unit_id: UnitId,
        status: ConnectionStatus,
        at: DateTime<Utc>,
    },
    FleetReading {
        metric: FleetMetric,
        value: f64,
    },
    HealthScore(f64),
    Financials {
        revenue: f64,
        cost: f64,
    },
    AutoManageAll(bool),
    /// Recompute a unit's status after an advisory request about it finished
    Reclassify(UnitId),
}

impl FleetWrite {
    /// Whether the write touches a field pinned by the demo overlay.
    pub fn touches_overlay(&self) -> bool {
        match self {
            FleetWrite::ConnectionStatus { .. }
            | FleetWrite::HealthScore(_)
            | FleetWrite::Financials { .. }
            | FleetWrite::Reclassify(_) => true,
            FleetWrite::FleetReading { metric, .. } => *metric == FleetMetric::SolarPower,
            FleetWrite::Reading { .. } | FleetWrite::AutoManageAll(_) => false,
        }
    }
}

/// Classification change caused by a write.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub unit_id: UnitId,
    pub previous: AiStatus,
    pub current: AiStatus,
}

pub struct EntityStore {
    state: FleetState,
    ranges: InstrumentRanges,
    thresholds: ClassifierThresholds,
    /// Set while the demo overlay is active
    classification_suppressed: bool,
}

impl EntityStore {
    /// Store using the active configuration's ranges and thresholds.
    pub fn new(state: FleetState) -> Self {
        Self::with_ranges(state, crate::config::current().instrument_ranges.clone())
    }

    /// Store with explicit instrument ranges; thresholds come from the
    /// active configuration until replaced with [`with_thresholds`](Self::with_thresholds).
    pub fn with_ranges(state: FleetState, ranges: InstrumentRanges) -> Self {
        Self {
            state,
            ranges,
            thresholds: crate::config::current().thresholds.clone(),
            classification_suppressed: false,
        }
    }

    pub fn with_thresholds(mut self, thresholds: ClassifierThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn thresholds(&self) -> &ClassifierThresholds {
        &self.thresholds
    }

    pub fn state(&self) -> &FleetState {
        &self.state
    }

    /// Swap in a whole new state, returning the old one.
    ///
    /// Used by the mode controller for all-or-nothing transitions.
    pub(crate) fn replace_state(&mut self, state: FleetState) -> FleetState {
        std::mem::replace(&mut self.state, state)
    }

    pub(crate) fn set_classification_suppressed(&mut self, suppressed: bool) {
        self.classification_suppressed = suppressed;
    }

    pub fn classification_suppressed(&self) -> bool {
        self.classification_suppressed
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Copy of every unit, in presentation order.
    pub fn list_units(&self) -> Vec<Unit> {
        self.state.units.clone()
    }

    pub fn get_unit(&self, id: UnitId) -> Result<Unit, StoreError> {
        self.state.unit(id).cloned().ok_or(StoreError::NotFound(id))
    }

    // ========================================================================
    // Validation
    // ========================================================================

    /// Check a write without applying it.
    pub fn check(&self, write: &FleetWrite) -> Result<(), StoreError> {
        match *write {
            FleetWrite::Reading {
                unit_id,
                metric,
                value,
                ..
            } => {
                self.check_reading(metric, value)?;
                self.require_unit(unit_id)
            }
            FleetWrite::ConnectionStatus { unit_id, .. } | FleetWrite::Reclassify(unit_id) => {
                self.require_unit(unit_id)
            }
            FleetWrite::FleetReading { metric, value } => self.check_fleet_reading(metric, value),
            FleetWrite::HealthScore(value) => clamp_health_score(value).map(|_| ()).map_err(Into::into),
            FleetWrite::Financials { revenue, cost } => check_financials(revenue, cost),
            FleetWrite::AutoManageAll(_) => Ok(()),
        }
    }

    fn require_unit(&self, id: UnitId) -> Result<(), StoreError> {
        match self.state.unit(id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(id)),
        }
    }

    fn check_reading(&self, metric: Metric, value: f64) -> Result<(), StoreError> {
        let range = self.range_for(metric);
        if range.contains(value) {
            return Ok(());
        }
        Err(StoreError::InvalidReading {
            metric: metric.to_string(),
            value,
            range,
        })
    }

    fn check_fleet_reading(&self, metric: FleetMetric, value: f64) -> Result<(), StoreError> {
        let range = match metric {
            FleetMetric::SolarPower => self.ranges.solar_power,
            FleetMetric::BatteryLevel => self.ranges.battery_level,
            FleetMetric::BoreholeFlow => self.ranges.borehole_flow,
        };
        if range.contains(value) {
            return Ok(());
        }
        Err(StoreError::InvalidReading {
            metric: metric.to_string(),
            value,
            range,
        })
    }

    /// Validate and apply any write.
    pub fn apply(&mut self, write: &FleetWrite) -> Result<Option<StatusChange>, StoreError> {
        match *write {
            FleetWrite::Reading {
                unit_id,
                metric,
                value,
                at,
            } => self.apply_reading(unit_id, metric, value, at),
            FleetWrite::ConnectionStatus { unit_id, status, at } => {
                self.set_connection_status(unit_id, status, at)
            }
            FleetWrite::FleetReading { metric, value } => {
                self.apply_fleet_reading(metric, value).map(|_| None)
            }
            FleetWrite::HealthScore(value) => self.set_health_score(value).map(|_| None),
            FleetWrite::Financials { revenue, cost } => self.set_financials(revenue, cost).map(|_| None),
            FleetWrite::AutoManageAll(enabled) => {
                self.set_auto_manage_all(enabled);
                Ok(None)
            }
            FleetWrite::Reclassify(unit_id) => self.reclassify(unit_id),
        }
    }

    // ========================================================================
    // Unit Writes
    // ========================================================================

    fn range_for(&self, metric: Metric) -> Range {
        match metric {
            Metric::Temperature => self.ranges.temperature,
            Metric::Ph => self.ranges.ph,
            Metric::DissolvedOxygen => self.ranges.dissolved_oxygen,
            Metric::Ammonia => self.ranges.ammonia,
            Metric::Salinity => self.ranges.salinity,
        }
    }

    /// Validate and record one reading.
    ///
    /// Updates the scalar field, pushes to the metric's history (if it has
    /// one) and stamps `last_update`. Returns the classification change, if
    /// any; none is computed while classification is suppressed.
    pub fn apply_reading(
        &mut self,
        id: UnitId,
        metric: Metric,
        value: f64,
        at: DateTime<Utc>,
    ) -> Result<Option<StatusChange>, StoreError> {
        if let Err(e) = self.check_reading(metric, value) {
            warn!(unit = %id, %metric, value, "Reading rejected: outside instrument range");
            return Err(e);
        }

        let unit = self.state.unit_mut(id).ok_or(StoreError::NotFound(id))?;
        if let Some(history) = unit.histories.get_mut(metric) {
            history.push(value)?;
        }
        unit.readings.set(metric, value);
        unit.last_update = at;

        debug!(unit = %id, %metric, value, "Reading applied");
        Ok(self.classify_unit(id))
    }

    /// Record a telemetry link change.
    pub fn set_connection_status(
        &mut self,
        id: UnitId,
        status: ConnectionStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<StatusChange>, StoreError> {
        let unit = self.state.unit_mut(id).ok_or(StoreError::NotFound(id))?;
        unit.readings.connection_status = status;
        unit.last_update = at;
        debug!(unit = %id, %status, "Connection status updated");
        Ok(self.classify_unit(id))
    }

    /// Recompute a unit's status from its readings, unless suppressed.
    ///
    /// A unit under analysis keeps `Analyzing` until the request about it
    /// completes and calls [`reclassify`](Self::reclassify). Losing the link
    /// is the exception: an offline unit always shows `Critical("Offline")`.
    fn classify_unit(&mut self, id: UnitId) -> Option<StatusChange> {
        if self.classification_suppressed {
            return None;
        }
        let held = self.state.unit(id).is_some_and(|u| {
            u.ai_status == AiStatus::Analyzing && u.connection_status() != ConnectionStatus::Offline
        });
        if held {
            return None;
        }
        self.reclassify(id).ok().flatten()
    }

    /// Recompute every unit's status, returning the changes.
    pub fn reclassify_all(&mut self) -> Vec<StatusChange> {
        let ids: Vec<UnitId> = self.state.units.iter().map(|u| u.id).collect();
        ids.into_iter()
            .filter_map(|id| self.reclassify(id).ok().flatten())
            .collect()
    }

    /// Recompute a unit's status from its readings regardless of suppression.
    pub fn reclassify(&mut self, id: UnitId) -> Result<Option<StatusChange>, StoreError> {
        let unit = self.state.unit_mut(id).ok_or(StoreError::NotFound(id))?;
        let current = classify_with(&unit.readings, &self.thresholds);
        if current == unit.ai_status {
            return Ok(None);
        }
        let previous = std::mem::replace(&mut unit.ai_status, current.clone());
        debug!(unit = %id, from = %previous, to = %current, "Unit reclassified");
        Ok(Some(StatusChange {
            unit_id: id,
            previous,
            current,
        }))
    }

    /// Flag a unit as under advisory analysis. Offline units keep
    /// `Critical("Offline")`.
    pub fn mark_analyzing(&mut self, id: UnitId) -> Result<Option<StatusChange>, StoreError> {
        let unit = self.state.unit_mut(id).ok_or(StoreError::NotFound(id))?;
        if unit.ai_status == AiStatus::Analyzing || !unit.is_online() {
            return Ok(None);
        }
        let previous = std::mem::replace(&mut unit.ai_status, AiStatus::Analyzing);
        Ok(Some(StatusChange {
            unit_id: id,
            previous,
            current: AiStatus::Analyzing,
        }))
    }

    // ========================================================================
    // Fleet Writes
    // ========================================================================

    /// Validate and record a farm-wide utility reading.
    pub fn apply_fleet_reading(&mut self, metric: FleetMetric, value: f64) -> Result<(), StoreError> {
        if let Err(e) = self.check_fleet_reading(metric, value) {
            warn!(%metric, value, "Fleet reading rejected: outside instrument range");
            return Err(e);
        }

        let state = &mut self.state;
        match metric {
            FleetMetric::SolarPower => {
                state.solar_history.push(value)?;
                state.scalars.solar_power = value;
            }
            FleetMetric::BatteryLevel => state.scalars.battery_level = value,
            FleetMetric::BoreholeFlow => {
                state.borehole_history.push(value)?;
                state.scalars.borehole_flow = value;
            }
        }
        debug!(%metric, value, "Fleet reading applied");
        Ok(())
    }

    /// Store a health score, clamped to [0, 100]. Returns the stored value.
    pub fn set_health_score(&mut self, value: f64) -> Result<f64, StoreError> {
        let clamped = clamp_health_score(value)?;
        if clamped != value {
            debug!(requested = value, stored = clamped, "Health score clamped");
        }
        self.state.scalars.health_score = clamped;
        Ok(clamped)
    }

    pub fn set_financials(&mut self, revenue: f64, cost: f64) -> Result<(), StoreError> {
        check_financials(revenue, cost)?;
        self.state.scalars.monthly_revenue = revenue;
        self.state.scalars.monthly_cost = cost;
        Ok(())
    }

    pub fn set_auto_manage_all(&mut self, enabled: bool) {
        self.state.scalars.auto_manage_all = enabled;
    }
}

fn check_financials(revenue: f64, cost: f64) -> Result<(), StoreError> {
    for (field, value) in [("monthly_revenue", revenue), ("monthly_cost", cost)] {
        if !value.is_finite() || value < 0.0 {
            return Err(StoreError::InvalidValue { field, value });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> EntityStore {
        EntityStore::with_ranges(fixture::default_fleet(42).unwrap(), InstrumentRanges::default())
    }

    #[test]
    fn test_list_units_is_a_copy() {
        let store = store();
        let mut units = store.list_units();
        units[0].name = "Renamed".to_string();
        units[0].readings.temperature = 99.0;
        assert_eq!(store.state().units[0].name, "Pond 01");
        assert_eq!(store.state().units[0].temperature(), 28.5);
    }

    #[test]
    fn test_get_unit_not_found() {
        let store = store();
        assert_eq!(store.get_unit(UnitId(99)), Err(StoreError::NotFound(UnitId(99))));
        assert_eq!(store.get_unit(UnitId(2)).unwrap().name, "Pond 02");
    }

    #[test]
    fn test_apply_reading_updates_field_history_and_timestamp() {
        let mut store = store();
        let at = Utc::now();
        store.apply_reading(UnitId(1), Metric::Temperature, 27.3, at).unwrap();

        let unit = store.get_unit(UnitId(1)).unwrap();
        assert_eq!(unit.temperature(), 27.3);
        assert_eq!(unit.histories.temperature.latest(), Some(27.3));
        assert_eq!(unit.histories.temperature.len(), 24);
        assert_eq!(unit.last_update, at);
    }

    #[test]
    fn test_apply_reading_without_history_keeps_buffers() {
        let mut store = store();
        let before = store.get_unit(UnitId(1)).unwrap().histories;
        store.apply_reading(UnitId(1), Metric::Ammonia, 0.3, Utc::now()).unwrap();
        let unit = store.get_unit(UnitId(1)).unwrap();
        assert_eq!(unit.ammonia(), 0.3);
        assert_eq!(unit.histories, before);
    }

    #[test]
    fn test_apply_reading_reclassifies() {
        let mut store = store();
        let change = store
            .apply_reading(UnitId(2), Metric::DissolvedOxygen, 6.2, Utc::now())
            .unwrap()
            .unwrap();
        assert_eq!(change.previous, AiStatus::warning("Low Oxygen"));
        assert_eq!(change.current, AiStatus::Optimal);
    }

    #[test]
    fn test_unchanged_status_reports_no_change() {
        let mut store = store();
        let change = store.apply_reading(UnitId(1), Metric::Temperature, 28.0, Utc::now()).unwrap();
        assert_eq!(change, None);
    }

    #[test]
    fn test_out_of_range_reading_leaves_state_untouched() {
        let mut store = store();
        let before = store.state().clone();

        let err = store.apply_reading(UnitId(1), Metric::Ph, 15.0, Utc::now()).unwrap_err();
        assert!(matches!(err, StoreError::InvalidReading { .. }));
        let err = store.apply_reading(UnitId(1), Metric::Temperature, f64::NAN, Utc::now()).unwrap_err();
        assert!(matches!(err, StoreError::InvalidReading { .. }));
        assert_eq!(store.state(), &before);
    }

    #[test]
    fn test_reading_for_unknown_unit() {
        let mut store = store();
        let err = store.apply_reading(UnitId(77), Metric::Ph, 7.0, Utc::now()).unwrap_err();
        assert_eq!(err, StoreError::NotFound(UnitId(77)));
    }

    #[test]
    fn test_suppressed_classification_still_records_reading() {
        let mut store = store();
        store.set_classification_suppressed(true);
        let change = store
            .apply_reading(UnitId(2), Metric::DissolvedOxygen, 6.2, Utc::now())
            .unwrap();
        assert_eq!(change, None);
        let unit = store.get_unit(UnitId(2)).unwrap();
        assert_eq!(unit.dissolved_oxygen(), 6.2);
        assert_eq!(unit.ai_status, AiStatus::warning("Low Oxygen"));
    }

    #[test]
    fn test_connection_restored_reclassifies_nursery() {
        let mut store = store();
        let change = store
            .set_connection_status(UnitId(4), ConnectionStatus::Online, Utc::now())
            .unwrap()
            .unwrap();
        assert_eq!(change.previous, AiStatus::critical("Offline"));
        assert_eq!(change.current, AiStatus::critical("Ammonia"));
    }

    #[test]
    fn test_mark_analyzing_then_reclassify() {
        let mut store = store();
        store.mark_analyzing(UnitId(2)).unwrap();
        assert_eq!(store.get_unit(UnitId(2)).unwrap().ai_status, AiStatus::Analyzing);
        let change = store.reclassify(UnitId(2)).unwrap().unwrap();
        assert_eq!(change.current, AiStatus::warning("Low Oxygen"));
    }

    #[test]
    fn test_analyzing_unit_holds_status_on_reading() {
        let mut store = store();
        store.mark_analyzing(UnitId(2)).unwrap();
        let change = store
            .apply_reading(UnitId(2), Metric::DissolvedOxygen, 6.2, Utc::now())
            .unwrap();
        assert_eq!(change, None);
        assert_eq!(store.get_unit(UnitId(2)).unwrap().ai_status, AiStatus::Analyzing);
        let change = store.reclassify(UnitId(2)).unwrap().unwrap();
        assert_eq!(change.current, AiStatus::Optimal);
    }

    #[test]
    fn test_going_offline_overrides_analyzing() {
        let mut store = store();
        store.mark_analyzing(UnitId(2)).unwrap();
        let change = store
            .set_connection_status(UnitId(2), ConnectionStatus::Offline, Utc::now())
            .unwrap()
            .unwrap();
        assert_eq!(change.previous, AiStatus::Analyzing);
        assert_eq!(change.current, AiStatus::critical("Offline"));
    }

    #[test]
    fn test_offline_unit_is_not_marked_analyzing() {
        let mut store = store();
        assert_eq!(store.mark_analyzing(UnitId(4)).unwrap(), None);
        assert_eq!(store.get_unit(UnitId(4)).unwrap().ai_status, AiStatus::critical("Offline"));
    }

    #[test]
    fn test_store_classifies_with_its_own_thresholds() {
        let thresholds = ClassifierThresholds {
            ammonia_critical_mg_l: 0.3,
            ..Default::default()
        };
        let mut store = store().with_thresholds(thresholds);
        let change = store
            .apply_reading(UnitId(1), Metric::Ammonia, 0.5, Utc::now())
            .unwrap()
            .unwrap();
        assert_eq!(change.current, AiStatus::critical("Ammonia"));

        let changes = store.reclassify_all();
        // Pond 02 (0.5 mg/L) was classified with the default limit
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].unit_id, UnitId(2));
        assert_eq!(changes[0].current, AiStatus::critical("Ammonia"));
    }

    #[test]
    fn test_fleet_reading_pushes_history() {
        let mut store = store();
        store.apply_fleet_reading(FleetMetric::SolarPower, 9.5).unwrap();
        store.apply_fleet_reading(FleetMetric::BatteryLevel, 70.0).unwrap();
        assert_eq!(store.state().scalars.solar_power, 9.5);
        assert_eq!(store.state().solar_history.latest(), Some(9.5));
        assert_eq!(store.state().solar_history.len(), 24);
        assert_eq!(store.state().scalars.battery_level, 70.0);
        assert!(store.apply_fleet_reading(FleetMetric::BatteryLevel, 101.0).is_err());
    }

    #[test]
    fn test_health_score_clamped_on_write() {
        let mut store = store();
        assert_eq!(store.set_health_score(140.0).unwrap(), 100.0);
        assert_eq!(store.state().scalars.health_score, 100.0);
        assert_eq!(store.set_health_score(-1.0).unwrap(), 0.0);
        assert!(store.set_health_score(f64::INFINITY).is_err());
        assert_eq!(store.state().scalars.health_score, 0.0);
    }

    #[test]
    fn test_check_does_not_mutate() {
        let store = store();
        let before = store.state().clone();
        let write = FleetWrite::Reading {
            unit_id: UnitId(1),
            metric: Metric::Temperature,
            value: 27.0,
            at: Utc::now(),
        };
        assert!(store.check(&write).is_ok());
        assert!(store.check(&FleetWrite::HealthScore(f64::NAN)).is_err());
        assert!(store.check(&FleetWrite::Reclassify(UnitId(12))).is_err());
        assert!(store
            .check(&FleetWrite::Financials { revenue: 1.0, cost: -2.0 })
            .is_err());
        assert_eq!(store.state(), &before);
    }

    #[test]
    fn test_apply_dispatches_writes() {
        let mut store = store();
        store.apply(&FleetWrite::AutoManageAll(false)).unwrap();
        store
            .apply(&FleetWrite::FleetReading {
                metric: FleetMetric::BoreholeFlow,
                value: 410.0,
            })
            .unwrap();
        assert!(!store.state().scalars.auto_manage_all);
        assert_eq!(store.state().scalars.borehole_flow, 410.0);
        assert_eq!(store.state().borehole_history.latest(), Some(410.0));
    }

    #[test]
    fn test_overlay_pinned_writes() {
        assert!(FleetWrite::HealthScore(50.0).touches_overlay());
        assert!(FleetWrite::FleetReading {
            metric: FleetMetric::SolarPower,
            value: 3.0
        }
        .touches_overlay());
        assert!(!FleetWrite::FleetReading {
            metric: FleetMetric::BatteryLevel,
            value: 3.0
        }
        .touches_overlay());
        assert!(!FleetWrite::AutoManageAll(true).touches_overlay());
    }

    #[test]
    fn test_financials_reject_negative() {
        let mut store = store();
        assert!(store.set_financials(-1.0, 10.0).is_err());
        assert_eq!(store.state().scalars.monthly_revenue, 15_400.0);
        store.set_financials(20_000.0, 5_000.0).unwrap();
        assert_eq!(store.state().scalars.monthly_cost, 5_000.0);
    }
}
