//! Seeded startup fleet
//!
//! The four-unit farm every process starts with. Histories are drawn from a
//! `StdRng` seeded by the caller so runs and tests reproduce exactly.

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{defaults, ClassifierThresholds};
use crate::history::{RingBuffer, SampleError, HISTORY_CAPACITY};
use crate::processing::classify_with;
use crate::types::{
    AiStatus, ConnectionStatus, FleetScalars, FleetState, Inventory, Unit, UnitHistories, UnitId,
    UnitReadings,
};

struct UnitSeed {
    name: &'static str,
    species: &'static str,
    temperature: f64,
    ph: f64,
    dissolved_oxygen: f64,
    ammonia: f64,
    salinity: f64,
    connection_status: ConnectionStatus,
}

const UNITS: [UnitSeed; 4] = [
    UnitSeed {
        name: "Pond 01",
        species: "Tilapia",
        temperature: 28.5,
        ph: 7.2,
        dissolved_oxygen: 6.5,
        ammonia: 0.02,
        salinity: 0.5,
        connection_status: ConnectionStatus::Online,
    },
    UnitSeed {
        name: "Pond 02",
        species: "Tilapia",
        temperature: 29.8,
        ph: 6.8,
        dissolved_oxygen: 4.2,
        ammonia: 0.5,
        salinity: 0.5,
        connection_status: ConnectionStatus::Online,
    },
    UnitSeed {
        name: "Raceway B",
        species: "Vannamei",
        temperature: 26.0,
        ph: 8.1,
        dissolved_oxygen: 7.0,
        ammonia: 0.0,
        salinity: 15.0,
        connection_status: ConnectionStatus::Online,
    },
    UnitSeed {
        name: "Nursery",
        species: "Catfish",
        temperature: 31.5,
        ph: 6.5,
        dissolved_oxygen: 5.8,
        ammonia: 1.2,
        salinity: 0.2,
        connection_status: ConnectionStatus::Offline,
    },
];

/// Uniform samples in `[lo, hi]`, always exactly `HISTORY_CAPACITY` long.
fn uniform_history(rng: &mut StdRng, lo: f64, hi: f64) -> Result<RingBuffer, SampleError> {
    RingBuffer::filled(
        HISTORY_CAPACITY,
        (0..HISTORY_CAPACITY).map(|_| rng.gen_range(lo..=hi)),
    )
}

/// Daylight curve: zero at night, peaking at 15 kW around midday.
fn solar_curve() -> Result<RingBuffer, SampleError> {
    RingBuffer::filled(
        HISTORY_CAPACITY,
        (0..HISTORY_CAPACITY).map(|hour| {
            let phase = (hour as f64 - 6.0) * std::f64::consts::PI / 12.0;
            (15.0 * phase.sin()).max(0.0)
        }),
    )
}

/// Build a unit from explicit readings, classified on creation.
pub fn build_unit(
    id: UnitId,
    name: impl Into<String>,
    species: impl Into<String>,
    readings: UnitReadings,
    thresholds: &ClassifierThresholds,
    rng: &mut StdRng,
) -> Result<Unit, SampleError> {
    let histories = UnitHistories {
        temperature: uniform_history(rng, 27.0, 29.0)?,
        ph: uniform_history(rng, 6.8, 7.4)?,
        dissolved_oxygen: uniform_history(rng, 5.5, 7.0)?,
    };
    Ok(Unit {
        id,
        name: name.into(),
        species: species.into(),
        readings,
        last_update: Utc::now(),
        ai_status: classify_with(&readings, thresholds),
        histories,
        inventory: Inventory::default(),
    })
}

/// The default four-unit farm, classified with the active configuration.
pub fn default_fleet(seed: u64) -> Result<FleetState, SampleError> {
    default_fleet_with(seed, &crate::config::current().thresholds)
}

/// The default four-unit farm with seeded histories.
pub fn default_fleet_with(seed: u64, thresholds: &ClassifierThresholds) -> Result<FleetState, SampleError> {
    let mut rng = StdRng::seed_from_u64(seed);

    let units = UNITS
        .iter()
        .zip(1u32..)
        .map(|(s, id)| {
            let readings = UnitReadings {
                temperature: s.temperature,
                ph: s.ph,
                dissolved_oxygen: s.dissolved_oxygen,
                ammonia: s.ammonia,
                salinity: s.salinity,
                connection_status: s.connection_status,
            };
            build_unit(UnitId(id), s.name, s.species, readings, thresholds, &mut rng)
        })
        .collect::<Result<Vec<Unit>, SampleError>>()?;

    let borehole_history = uniform_history(&mut rng, 400.0, 480.0)?;

    tracing::debug!(
        seed,
        units = units.len(),
        flagged = units.iter().filter(|u| u.ai_status != AiStatus::Optimal).count(),
        "Fleet fixture built"
    );

    Ok(FleetState {
        units,
        scalars: FleetScalars {
            health_score: defaults::INITIAL_HEALTH_SCORE,
            solar_power: defaults::INITIAL_SOLAR_POWER_KW,
            battery_level: defaults::INITIAL_BATTERY_LEVEL_PCT,
            borehole_flow: defaults::INITIAL_BOREHOLE_FLOW_L_MIN,
            monthly_revenue: defaults::INITIAL_MONTHLY_REVENUE,
            monthly_cost: defaults::INITIAL_MONTHLY_COST,
            auto_manage_all: true,
        },
        solar_history: solar_curve()?,
        borehole_history,
        demo_active: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_histories() {
        let a = default_fleet(42).unwrap();
        let b = default_fleet(42).unwrap();
        for (ua, ub) in a.units.iter().zip(&b.units) {
            assert_eq!(ua.histories, ub.histories);
        }
        assert_eq!(a.borehole_history, b.borehole_history);
    }

    #[test]
    fn test_different_seed_different_histories() {
        let a = default_fleet(1).unwrap();
        let b = default_fleet(2).unwrap();
        assert_ne!(a.units[0].histories.temperature, b.units[0].histories.temperature);
    }

    #[test]
    fn test_histories_are_full_and_in_range() {
        let state = default_fleet(9).unwrap();
        for unit in &state.units {
            let t = &unit.histories.temperature;
            assert_eq!(t.len(), HISTORY_CAPACITY);
            assert!(t.iter().all(|v| (27.0..=29.0).contains(&v)));
            assert_eq!(unit.histories.ph.len(), HISTORY_CAPACITY);
            assert_eq!(unit.histories.dissolved_oxygen.len(), HISTORY_CAPACITY);
        }
        assert_eq!(state.solar_history.len(), HISTORY_CAPACITY);
        assert!(state.solar_history.iter().all(|v| v >= 0.0));
        assert!(state.borehole_history.iter().all(|v| (400.0..=480.0).contains(&v)));
    }

    #[test]
    fn test_fixture_classification() {
        let state = default_fleet(42).unwrap();
        let statuses: Vec<AiStatus> = state.units.iter().map(|u| u.ai_status.clone()).collect();
        assert_eq!(
            statuses,
            vec![
                AiStatus::Optimal,
                AiStatus::warning("Low Oxygen"),
                AiStatus::warning("Out of range"),
                AiStatus::critical("Offline"),
            ]
        );
    }

    #[test]
    fn test_fixture_uses_given_thresholds() {
        let thresholds = ClassifierThresholds {
            ammonia_critical_mg_l: 0.3,
            ..Default::default()
        };
        let state = default_fleet_with(42, &thresholds).unwrap();
        // Pond 02 carries 0.5 mg/L ammonia
        assert_eq!(state.units[1].ai_status, AiStatus::critical("Ammonia"));
        assert_eq!(state.units[0].ai_status, AiStatus::Optimal);
    }

    #[test]
    fn test_unit_ids_unique() {
        let state = default_fleet(42).unwrap();
        let mut ids: Vec<UnitId> = state.units.iter().map(|u| u.id).collect();
        ids.dedup();
        assert_eq!(ids.len(), 4);
    }
}
