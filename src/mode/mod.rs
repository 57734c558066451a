//! Mode Controller
//!
//! Switches the fleet between `Live` and `Demo`. Entering demo saves a deep
//! copy of the live state and swaps in an idealized overlay; leaving demo
//! restores that copy verbatim and replays, through the live path, every write
//! received in between.
//!
//! While the overlay is active:
//! - Writes that touch overlay-pinned fields (link state, health score,
//!   financials, solar output, status) are journaled only, so the overlay
//!   stays intact.
//! - Every other write is applied to the overlay state with classification
//!   suppressed, and journaled.
//!
//! The journal is compacted as it grows: a reading into a history buffer
//! keeps its last `HISTORY_CAPACITY` entries per unit and metric, and every
//! other write keeps only its latest value per target. Replaying the compacted
//! journal yields the same state as replaying every write.
//!
//! Both transitions build the new state off to the side and swap it in as a
//! whole. A failed transition leaves the mode and the store untouched.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::DemoOverlayConfig;
use crate::history::HISTORY_CAPACITY;
use crate::store::{EntityStore, FleetWrite, StatusChange, StoreError};
use crate::types::{AiStatus, ConnectionStatus, FleetMetric, FleetState, Metric, UnitId};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModeError {
    #[error("Invalid demo overlay: {0}")]
    InvalidOverlay(String),
}

/// Operating mode of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Live,
    Demo,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Live => write!(f, "LIVE"),
            Mode::Demo => write!(f, "DEMO"),
        }
    }
}

/// Result of a completed transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub mode: Mode,
    /// Status changes produced by replaying the journal (exit only)
    pub replayed: Vec<StatusChange>,
}

/// Result of routing one write through the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    /// Applied to the live state
    Applied(Option<StatusChange>),
    /// Applied to the overlay state (unclassified) and journaled
    Recorded,
    /// Journaled only; the overlay pins the field
    Deferred,
}

pub struct ModeController {
    mode: Mode,
    overlay: DemoOverlayConfig,
    saved_live_snapshot: Option<FleetState>,
    journal: Vec<FleetWrite>,
}

impl ModeController {
    pub fn new(overlay: DemoOverlayConfig) -> Self {
        Self {
            mode: Mode::Live,
            overlay,
            saved_live_snapshot: None,
            journal: Vec::new(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_demo(&self) -> bool {
        self.mode == Mode::Demo
    }

    /// Number of writes waiting to be replayed on exit.
    pub fn journal_len(&self) -> usize {
        self.journal.len()
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Flip the mode.
    pub fn toggle(&mut self, store: &mut EntityStore) -> Result<Transition, ModeError> {
        match self.mode {
            Mode::Live => self.enter_demo(store),
            Mode::Demo => Ok(self.exit_demo(store)),
        }
    }

    /// Live → Demo. A no-op when already in demo.
    pub fn enter_demo(&mut self, store: &mut EntityStore) -> Result<Transition, ModeError> {
        if self.is_demo() {
            return Ok(Transition {
                mode: Mode::Demo,
                replayed: Vec::new(),
            });
        }

        let overlay_state = build_overlay(store.state(), &self.overlay)?;
        let live = store.replace_state(overlay_state);
        store.set_classification_suppressed(true);

        self.saved_live_snapshot = Some(live);
        self.journal.clear();
        self.mode = Mode::Demo;

        info!(
            health_score = self.overlay.health_score,
            solar_power_kw = self.overlay.solar_power_kw,
            "Demo overlay applied"
        );
        Ok(Transition {
            mode: Mode::Demo,
            replayed: Vec::new(),
        })
    }

    /// Demo → Live. Restores the saved state then replays the journal.
    ///
    /// A no-op when already live.
    pub fn exit_demo(&mut self, store: &mut EntityStore) -> Transition {
        let Some(saved) = self.saved_live_snapshot.take() else {
            return Transition {
                mode: Mode::Live,
                replayed: Vec::new(),
            };
        };

        store.replace_state(saved);
        store.set_classification_suppressed(false);
        self.mode = Mode::Live;

        let journal = std::mem::take(&mut self.journal);
        let entries = journal.len();
        let mut replayed = Vec::new();
        for write in &journal {
            match store.apply(write) {
                Ok(Some(change)) => replayed.push(change),
                Ok(None) => {}
                // Writes are validated before they are journaled; a unit
                // removed in the meantime is the only way to land here.
                Err(e) => warn!(error = %e, ?write, "Journaled write dropped on replay"),
            }
        }

        info!(entries, status_changes = replayed.len(), "Live state restored");
        Transition {
            mode: Mode::Live,
            replayed,
        }
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Route a write according to the current mode.
    pub fn write(
        &mut self,
        store: &mut EntityStore,
        write: FleetWrite,
    ) -> Result<WriteOutcome, StoreError> {
        if !self.is_demo() {
            return store.apply(&write).map(WriteOutcome::Applied);
        }

        let outcome = if write.touches_overlay() {
            store.check(&write)?;
            WriteOutcome::Deferred
        } else {
            store.apply(&write)?;
            WriteOutcome::Recorded
        };
        self.record(write);
        Ok(outcome)
    }

    /// Append to the journal, dropping the oldest entry for the same target
    /// once it holds more than that target keeps.
    fn record(&mut self, write: FleetWrite) {
        let (slot, keep) = journal_slot(&write);
        debug!(?write, journal_len = self.journal.len() + 1, "Write journaled");
        self.journal.push(write);

        let mut same_slot = self
            .journal
            .iter()
            .enumerate()
            .filter(|(_, w)| journal_slot(w).0 == slot)
            .map(|(i, _)| i);
        let oldest = same_slot.next();
        if same_slot.count() >= keep {
            if let Some(i) = oldest {
                self.journal.remove(i);
            }
        }
    }
}

/// Replay target of a journaled write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JournalSlot {
    Reading(UnitId, Metric),
    Connection(UnitId),
    Fleet(FleetMetric),
    HealthScore,
    Financials,
    AutoManageAll,
    Reclassify(UnitId),
}

/// The slot a write replays into and how many entries of it matter.
fn journal_slot(write: &FleetWrite) -> (JournalSlot, usize) {
    match *write {
        FleetWrite::Reading { unit_id, metric, .. } => {
            let keep = if metric.has_history() { HISTORY_CAPACITY } else { 1 };
            (JournalSlot::Reading(unit_id, metric), keep)
        }
        FleetWrite::ConnectionStatus { unit_id, .. } => (JournalSlot::Connection(unit_id), 1),
        FleetWrite::FleetReading { metric, .. } => {
            let keep = match metric {
                FleetMetric::SolarPower | FleetMetric::BoreholeFlow => HISTORY_CAPACITY,
                FleetMetric::BatteryLevel => 1,
            };
            (JournalSlot::Fleet(metric), keep)
        }
        FleetWrite::HealthScore(_) => (JournalSlot::HealthScore, 1),
        FleetWrite::Financials { .. } => (JournalSlot::Financials, 1),
        FleetWrite::AutoManageAll(_) => (JournalSlot::AutoManageAll, 1),
        FleetWrite::Reclassify(unit_id) => (JournalSlot::Reclassify(unit_id), 1),
    }
}

/// Copy `live` with the demo overlay applied. Raw readings are kept.
fn build_overlay(live: &FleetState, overlay: &DemoOverlayConfig) -> Result<FleetState, ModeError> {
    let score_ok = overlay.health_score.is_finite() && (0.0..=100.0).contains(&overlay.health_score);
    if !score_ok {
        return Err(ModeError::InvalidOverlay(format!(
            "health_score {} outside [0, 100]",
            overlay.health_score
        )));
    }
    for (field, value) in [
        ("monthly_revenue", overlay.monthly_revenue),
        ("monthly_cost", overlay.monthly_cost),
        ("solar_power_kw", overlay.solar_power_kw),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(ModeError::InvalidOverlay(format!("{} must be non-negative, got {}", field, value)));
        }
    }

    let mut state = live.clone();
    state.scalars.health_score = overlay.health_score;
    state.scalars.monthly_revenue = overlay.monthly_revenue;
    state.scalars.monthly_cost = overlay.monthly_cost;
    state.scalars.solar_power = overlay.solar_power_kw;
    for unit in &mut state.units {
        unit.ai_status = AiStatus::Optimal;
        unit.readings.connection_status = ConnectionStatus::Online;
    }
    state.demo_active = true;
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InstrumentRanges;
    use crate::store::fixture;
    use crate::types::{Metric, UnitId};
    use chrono::Utc;

    fn setup() -> (ModeController, EntityStore) {
        (
            ModeController::new(DemoOverlayConfig::default()),
            EntityStore::with_ranges(fixture::default_fleet(42).unwrap(), InstrumentRanges::default()),
        )
    }

    #[test]
    fn test_enter_demo_applies_overlay() {
        let (mut mode, mut store) = setup();
        let before = store.state().clone();
        mode.toggle(&mut store).unwrap();

        let state = store.state();
        assert!(mode.is_demo());
        assert!(state.demo_active);
        assert_eq!(state.scalars.health_score, 99.0);
        assert_eq!(state.scalars.monthly_revenue, 25_000.0);
        assert_eq!(state.scalars.monthly_cost, 3_000.0);
        assert_eq!(state.scalars.solar_power, 18.2);
        assert!(state.units.iter().all(|u| u.ai_status == AiStatus::Optimal));
        assert!(state.units.iter().all(|u| u.connection_status() == ConnectionStatus::Online));
        // raw readings untouched
        for (a, b) in state.units.iter().zip(&before.units) {
            assert_eq!(a.temperature(), b.temperature());
            assert_eq!(a.ammonia(), b.ammonia());
            assert_eq!(a.histories, b.histories);
        }
    }

    #[test]
    fn test_round_trip_restores_exact_state() {
        let (mut mode, mut store) = setup();
        let before = store.state().clone();
        mode.toggle(&mut store).unwrap();
        let transition = mode.toggle(&mut store).unwrap();
        assert_eq!(transition.mode, Mode::Live);
        assert!(transition.replayed.is_empty());
        assert_eq!(store.state(), &before);
        assert!(!store.classification_suppressed());
    }

    #[test]
    fn test_invalid_overlay_leaves_live_state() {
        let overlay = DemoOverlayConfig {
            health_score: 140.0,
            ..Default::default()
        };
        let mut mode = ModeController::new(overlay);
        let mut store = EntityStore::with_ranges(fixture::default_fleet(42).unwrap(), InstrumentRanges::default());
        let before = store.state().clone();

        let err = mode.toggle(&mut store).unwrap_err();
        assert!(matches!(err, ModeError::InvalidOverlay(_)));
        assert_eq!(mode.mode(), Mode::Live);
        assert_eq!(store.state(), &before);
    }

    #[test]
    fn test_reading_during_demo_is_recorded_unclassified() {
        let (mut mode, mut store) = setup();
        mode.enter_demo(&mut store).unwrap();

        let outcome = mode
            .write(
                &mut store,
                FleetWrite::Reading {
                    unit_id: UnitId(1),
                    metric: Metric::Ammonia,
                    value: 2.0,
                    at: Utc::now(),
                },
            )
            .unwrap();
        assert_eq!(outcome, WriteOutcome::Recorded);
        let unit = store.get_unit(UnitId(1)).unwrap();
        assert_eq!(unit.ammonia(), 2.0);
        assert_eq!(unit.ai_status, AiStatus::Optimal);
        assert_eq!(mode.journal_len(), 1);
    }

    #[test]
    fn test_pinned_write_during_demo_is_deferred() {
        let (mut mode, mut store) = setup();
        mode.enter_demo(&mut store).unwrap();

        let outcome = mode.write(&mut store, FleetWrite::HealthScore(40.0)).unwrap();
        assert_eq!(outcome, WriteOutcome::Deferred);
        assert_eq!(store.state().scalars.health_score, 99.0);

        let err = mode.write(&mut store, FleetWrite::HealthScore(f64::NAN));
        assert!(err.is_err());
        assert_eq!(mode.journal_len(), 1);
    }

    #[test]
    fn test_exit_replays_journal_in_order() {
        let (mut mode, mut store) = setup();
        mode.enter_demo(&mut store).unwrap();

        let at = Utc::now();
        for write in [
            FleetWrite::Reading {
                unit_id: UnitId(2),
                metric: Metric::DissolvedOxygen,
                value: 6.1,
                at,
            },
            FleetWrite::HealthScore(40.0),
            FleetWrite::HealthScore(55.0),
            FleetWrite::ConnectionStatus {
                unit_id: UnitId(4),
                status: ConnectionStatus::Online,
                at,
            },
        ] {
            mode.write(&mut store, write).unwrap();
        }

        let transition = mode.exit_demo(&mut store);
        let state = store.state();
        assert!(!state.demo_active);
        assert_eq!(state.scalars.health_score, 55.0);
        assert_eq!(state.scalars.monthly_revenue, 15_400.0);

        let pond2 = state.unit(UnitId(2)).unwrap();
        assert_eq!(pond2.dissolved_oxygen(), 6.1);
        assert_eq!(pond2.ai_status, AiStatus::Optimal);
        let nursery = state.unit(UnitId(4)).unwrap();
        assert_eq!(nursery.ai_status, AiStatus::critical("Ammonia"));

        assert_eq!(transition.replayed.len(), 2);
        assert_eq!(mode.journal_len(), 0);
    }

    #[test]
    fn test_long_demo_journal_stays_bounded() {
        let (mut mode, mut store) = setup();
        mode.enter_demo(&mut store).unwrap();

        let at = Utc::now();
        for i in 0..200 {
            let value = 26.0 + f64::from(i % 40) * 0.1;
            mode.write(
                &mut store,
                FleetWrite::Reading {
                    unit_id: UnitId(1),
                    metric: Metric::Temperature,
                    value,
                    at,
                },
            )
            .unwrap();
            mode.write(
                &mut store,
                FleetWrite::Reading {
                    unit_id: UnitId(1),
                    metric: Metric::Ammonia,
                    value: f64::from(i) * 0.01,
                    at,
                },
            )
            .unwrap();
            mode.write(&mut store, FleetWrite::HealthScore(f64::from(i % 50))).unwrap();
        }
        assert_eq!(mode.journal_len(), HISTORY_CAPACITY + 1 + 1);

        let demo_history = store.get_unit(UnitId(1)).unwrap().histories.temperature;
        mode.exit_demo(&mut store);

        let unit = store.get_unit(UnitId(1)).unwrap();
        assert_eq!(unit.histories.temperature, demo_history);
        assert_eq!(unit.temperature(), 26.0 + 39.0 * 0.1);
        assert_eq!(unit.ammonia(), 199.0 * 0.01);
        assert_eq!(store.state().scalars.health_score, 49.0);
    }

    #[test]
    fn test_compaction_keeps_latest_per_target() {
        let (mut mode, mut store) = setup();
        mode.enter_demo(&mut store).unwrap();
        let at = Utc::now();
        for status in [ConnectionStatus::Syncing, ConnectionStatus::Offline, ConnectionStatus::Online] {
            mode.write(
                &mut store,
                FleetWrite::ConnectionStatus {
                    unit_id: UnitId(4),
                    status,
                    at,
                },
            )
            .unwrap();
        }
        mode.write(&mut store, FleetWrite::AutoManageAll(false)).unwrap();
        assert_eq!(mode.journal_len(), 2);

        mode.exit_demo(&mut store);
        let nursery = store.get_unit(UnitId(4)).unwrap();
        assert_eq!(nursery.connection_status(), ConnectionStatus::Online);
        assert!(!store.state().scalars.auto_manage_all);
    }

    #[test]
    fn test_live_write_applies_directly() {
        let (mut mode, mut store) = setup();
        let outcome = mode.write(&mut store, FleetWrite::HealthScore(120.0)).unwrap();
        assert_eq!(outcome, WriteOutcome::Applied(None));
        assert_eq!(store.state().scalars.health_score, 100.0);
        assert_eq!(mode.journal_len(), 0);
    }
}
