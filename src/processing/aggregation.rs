//! Fleet-wide aggregates
//!
//! Averages never divide by zero: an empty fleet is an explicit
//! [`AggregationError::EmptyFleet`], not NaN.

use super::AggregationError;
use crate::types::{AiStatus, FleetScalars, FleetState, FleetSummary, StatusCounts, Unit};

/// Exact arithmetic mean (sum / count) of `selector` over `units`.
pub fn average<F>(units: &[Unit], selector: F) -> Result<f64, AggregationError>
where
    F: Fn(&Unit) -> f64,
{
    if units.is_empty() {
        return Err(AggregationError::EmptyFleet);
    }
    let sum: f64 = units.iter().map(selector).sum();
    Ok(sum / units.len() as f64)
}

pub fn avg_temperature(units: &[Unit]) -> Result<f64, AggregationError> {
    average(units, Unit::temperature)
}

pub fn avg_ph(units: &[Unit]) -> Result<f64, AggregationError> {
    average(units, Unit::ph)
}

pub fn avg_dissolved_oxygen(units: &[Unit]) -> Result<f64, AggregationError> {
    average(units, Unit::dissolved_oxygen)
}

/// Bound a health score to [0, 100]. Applied on every write.
pub fn clamp_health_score(value: f64) -> Result<f64, AggregationError> {
    if !value.is_finite() {
        return Err(AggregationError::NonFiniteScore(value));
    }
    Ok(value.clamp(0.0, 100.0))
}

pub fn net_profit(scalars: &FleetScalars) -> f64 {
    scalars.monthly_revenue - scalars.monthly_cost
}

pub fn count_by_status(units: &[Unit]) -> StatusCounts {
    units.iter().fold(StatusCounts::default(), |mut counts, unit| {
        match unit.ai_status {
            AiStatus::Optimal => counts.optimal += 1,
            AiStatus::Warning { .. } => counts.warning += 1,
            AiStatus::Critical { .. } => counts.critical += 1,
            AiStatus::Analyzing => counts.analyzing += 1,
        }
        counts
    })
}

/// Text of the "share status" action.
pub fn status_line(scalars: &FleetScalars) -> String {
    format!("Sharing status: {:.0}% Health", scalars.health_score)
}

/// Build the presentation read model for `state`.
pub fn summarize(state: &FleetState, thinking: bool) -> FleetSummary {
    let units = &state.units;
    FleetSummary {
        avg_temperature: avg_temperature(units).ok(),
        avg_ph: avg_ph(units).ok(),
        avg_dissolved_oxygen: avg_dissolved_oxygen(units).ok(),
        health_score: state.scalars.health_score,
        solar_power: state.scalars.solar_power,
        battery_level: state.scalars.battery_level,
        borehole_flow: state.scalars.borehole_flow,
        net_profit: net_profit(&state.scalars),
        units_online: units.iter().filter(|u| u.is_online()).count(),
        units_total: units.len(),
        status_counts: count_by_status(units),
        demo_active: state.demo_active,
        thinking,
        auto_manage_all: state.scalars.auto_manage_all,
        status_line: status_line(&state.scalars),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fixture;

    #[test]
    fn test_average_temperature_exact() {
        let state = fixture::default_fleet(7).unwrap();
        let temps: Vec<f64> = state.units.iter().map(Unit::temperature).collect();
        assert_eq!(temps, vec![28.5, 29.8, 26.0, 31.5]);
        assert_eq!(avg_temperature(&state.units).unwrap(), 28.95);
    }

    #[test]
    fn test_average_of_empty_fleet_fails() {
        assert_eq!(avg_temperature(&[]), Err(AggregationError::EmptyFleet));
        assert_eq!(average(&[], Unit::ph), Err(AggregationError::EmptyFleet));
    }

    #[test]
    fn test_average_single_unit() {
        let state = fixture::default_fleet(7).unwrap();
        let one = &state.units[..1];
        assert_eq!(avg_ph(one).unwrap(), 7.2);
    }

    #[test]
    fn test_clamp_health_score() {
        assert_eq!(clamp_health_score(150.0).unwrap(), 100.0);
        assert_eq!(clamp_health_score(-3.0).unwrap(), 0.0);
        assert_eq!(clamp_health_score(42.5).unwrap(), 42.5);
        assert!(clamp_health_score(f64::NAN).is_err());
    }

    #[test]
    fn test_summary_of_fixture() {
        let state = fixture::default_fleet(7).unwrap();
        let summary = summarize(&state, false);
        assert_eq!(summary.units_total, 4);
        assert_eq!(summary.units_online, 3);
        assert_eq!(summary.net_profit, 11_200.0);
        assert_eq!(summary.status_line, "Sharing status: 92% Health");
        assert_eq!(summary.status_counts.critical, 1);
        assert_eq!(summary.status_counts.warning, 2);
        assert_eq!(summary.status_counts.optimal, 1);
    }

    #[test]
    fn test_summary_of_empty_fleet_has_no_averages() {
        let mut state = fixture::default_fleet(7).unwrap();
        state.units.clear();
        let summary = summarize(&state, true);
        assert_eq!(summary.avg_temperature, None);
        assert_eq!(summary.units_total, 0);
        assert!(summary.thinking);
    }
}
