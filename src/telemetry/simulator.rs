//! Telemetry Simulator - random-walk readings for units and utilities

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::config::{InstrumentRanges, Range};
use crate::types::{FleetMetric, FleetScalars, Metric, Unit, UnitId};

/// Per-tick standard deviation of each unit metric's random walk.
const UNIT_STEP_SIGMA: [(Metric, f64); 4] = [
    (Metric::Temperature, 0.15),
    (Metric::Ph, 0.03),
    (Metric::DissolvedOxygen, 0.12),
    (Metric::Ammonia, 0.01),
];

const BATTERY_STEP_SIGMA: f64 = 0.8;
const BOREHOLE_MEAN_L_MIN: f64 = 440.0;
const BOREHOLE_SIGMA: f64 = 8.0;
const SOLAR_PEAK_KW: f64 = 15.0;
const SOLAR_SIGMA: f64 = 0.4;

/// One generated reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimulatedReading {
    Unit {
        unit_id: UnitId,
        metric: Metric,
        value: f64,
    },
    Fleet {
        metric: FleetMetric,
        value: f64,
    },
}

pub struct TelemetrySimulator {
    rng: StdRng,
    ranges: InstrumentRanges,
    tick: u64,
}

impl TelemetrySimulator {
    pub fn new(seed: u64, ranges: InstrumentRanges) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            ranges,
            tick: 0,
        }
    }

    pub fn ticks(&self) -> u64 {
        self.tick
    }

    fn gaussian(&mut self, sigma: f64) -> f64 {
        let z: f64 = self.rng.sample(StandardNormal);
        z * sigma
    }

    /// Readings for one tick, walking from the current fleet values.
    ///
    /// Offline units report nothing. Every value lies inside its instrument
    /// range.
    pub fn next_tick(&mut self, units: &[Unit], scalars: &FleetScalars) -> Vec<SimulatedReading> {
        self.tick += 1;
        let mut readings = Vec::with_capacity(units.len() * UNIT_STEP_SIGMA.len() + 3);

        for unit in units.iter().filter(|u| u.is_online()) {
            for (metric, sigma) in UNIT_STEP_SIGMA {
                let range = unit_range(&self.ranges, metric);
                let value = unit.readings.get(metric) + self.gaussian(sigma);
                readings.push(SimulatedReading::Unit {
                    unit_id: unit.id,
                    metric,
                    value: bounded(value, range, 2),
                });
            }
        }

        // one tick is one simulated hour of daylight
        let hour = (self.tick % 24) as f64;
        let daylight = ((hour - 6.0) * std::f64::consts::PI / 12.0).sin().max(0.0);
        let solar = SOLAR_PEAK_KW * daylight + self.gaussian(SOLAR_SIGMA);
        let battery = scalars.battery_level + self.gaussian(BATTERY_STEP_SIGMA);
        let borehole = BOREHOLE_MEAN_L_MIN + self.gaussian(BOREHOLE_SIGMA);

        readings.push(SimulatedReading::Fleet {
            metric: FleetMetric::SolarPower,
            value: bounded(solar, self.ranges.solar_power, 1),
        });
        readings.push(SimulatedReading::Fleet {
            metric: FleetMetric::BatteryLevel,
            value: bounded(battery, self.ranges.battery_level, 1),
        });
        readings.push(SimulatedReading::Fleet {
            metric: FleetMetric::BoreholeFlow,
            value: bounded(borehole, self.ranges.borehole_flow, 0),
        });

        readings
    }
}

fn unit_range(ranges: &InstrumentRanges, metric: Metric) -> Range {
    match metric {
        Metric::Temperature => ranges.temperature,
        Metric::Ph => ranges.ph,
        Metric::DissolvedOxygen => ranges.dissolved_oxygen,
        Metric::Ammonia => ranges.ammonia,
        Metric::Salinity => ranges.salinity,
    }
}

/// Round to `decimals` places, then clamp into `range`.
fn bounded(value: f64, range: Range, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    ((value * scale).round() / scale).clamp(range.min, range.max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fixture;

    #[test]
    fn test_same_seed_same_readings() {
        let state = fixture::default_fleet(42).unwrap();
        let mut a = TelemetrySimulator::new(7, InstrumentRanges::default());
        let mut b = TelemetrySimulator::new(7, InstrumentRanges::default());
        for _ in 0..5 {
            assert_eq!(
                a.next_tick(&state.units, &state.scalars),
                b.next_tick(&state.units, &state.scalars)
            );
        }
        assert_eq!(a.ticks(), 5);
    }

    #[test]
    fn test_offline_units_are_silent() {
        let state = fixture::default_fleet(42).unwrap();
        let mut sim = TelemetrySimulator::new(1, InstrumentRanges::default());
        let readings = sim.next_tick(&state.units, &state.scalars);
        let nursery = state.unit_by_name("Nursery").unwrap().id;
        assert!(!readings.iter().any(|r| matches!(
            r,
            SimulatedReading::Unit { unit_id, .. } if *unit_id == nursery
        )));
        // three online units with four metrics each, plus three utilities
        assert_eq!(readings.len(), 3 * 4 + 3);
    }

    #[test]
    fn test_readings_stay_in_range() {
        let ranges = InstrumentRanges::default();
        let mut state = fixture::default_fleet(42).unwrap();
        state.units[2].readings.ammonia = 0.0;
        let mut sim = TelemetrySimulator::new(3, ranges.clone());
        for _ in 0..200 {
            for reading in sim.next_tick(&state.units, &state.scalars) {
                match reading {
                    SimulatedReading::Unit { metric, value, .. } => {
                        assert!(unit_range(&ranges, metric).contains(value))
                    }
                    SimulatedReading::Fleet { value, .. } => assert!(value.is_finite() && value >= 0.0),
                }
            }
        }
    }

    #[test]
    fn test_bounded_rounds_and_clamps() {
        let range = Range::new(0.0, 10.0);
        assert_eq!(bounded(4.56789, range, 2), 4.57);
        assert_eq!(bounded(-0.4, range, 1), 0.0);
        assert_eq!(bounded(12.0, range, 0), 10.0);
    }
}
