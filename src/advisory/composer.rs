//! Advisory composers
//!
//! A composer turns a question plus the fleet snapshot taken at completion
//! time into an answer and its reasoning trace. [`TemplateComposer`] is the
//! bundled deterministic implementation; a model-backed composer plugs in
//! through the same trait.

use async_trait::async_trait;

use super::AdvisoryError;
use crate::config::ClassifierThresholds;
use crate::processing::classifier::{REASON_AMMONIA, REASON_LOW_OXYGEN, REASON_OFFLINE};
use crate::processing::classify_with;
use crate::types::{AiStatus, FleetSnapshot, Unit};

/// Composed answer for one advisory request.
#[derive(Debug, Clone, PartialEq)]
pub struct AdvisoryReply {
    pub text: String,
    pub reasoning: String,
}

#[async_trait]
pub trait AdvisoryComposer: Send + Sync {
    /// Answer `request` against `snapshot`.
    async fn compose(
        &self,
        request: &str,
        snapshot: &FleetSnapshot,
    ) -> Result<AdvisoryReply, AdvisoryError>;

    /// Name for logging
    fn composer_name(&self) -> &'static str;
}

// ============================================================================
// Template Composer
// ============================================================================

/// Rule-based composer. Same question and snapshot, same answer.
///
/// Picks a focus unit (the one named in the question, else the most urgent
/// one) and explains its condition from its readings. In live mode the
/// condition comes from the readings themselves, since a unit being asked
/// about shows `Analyzing`; under the demo overlay the displayed status is
/// used.
#[derive(Debug, Clone, Default)]
pub struct TemplateComposer {
    thresholds: ClassifierThresholds,
}

impl TemplateComposer {
    pub fn new(thresholds: ClassifierThresholds) -> Self {
        Self { thresholds }
    }

    fn condition(&self, unit: &Unit, demo_active: bool) -> AiStatus {
        if demo_active {
            unit.ai_status.clone()
        } else {
            classify_with(&unit.readings, &self.thresholds)
        }
    }

    fn focus_unit<'a>(&self, request: &str, snapshot: &'a FleetSnapshot) -> Option<&'a Unit> {
        let lowered = request.to_lowercase();
        let units = &snapshot.state.units;
        units
            .iter()
            .find(|u| lowered.contains(&u.name.to_lowercase()))
            .or_else(|| {
                // first unit wins ties
                units.iter().fold(None, |best: Option<&Unit>, unit| {
                    let rank = self.condition(unit, snapshot.state.demo_active).severity_rank();
                    match best {
                        Some(b) if self.condition(b, snapshot.state.demo_active).severity_rank() >= rank => Some(b),
                        _ => Some(unit),
                    }
                })
            })
    }

    fn recommendation(&self, unit: &Unit, condition: &AiStatus, snapshot: &FleetSnapshot) -> String {
        let scalars = &snapshot.state.scalars;
        let t = &self.thresholds;
        match condition.reason() {
            Some(REASON_OFFLINE) => format!(
                "{} telemetry link is offline, so its readings cannot be trusted. \
                 Dispatch a technician to check the gateway and sensor power supply.",
                unit.name
            ),
            Some(REASON_AMMONIA) => format!(
                "{} ammonia is at {:.2} mg/L, above the {:.1} mg/L critical limit. \
                 Reduce feeding immediately and schedule a partial water exchange.",
                unit.name,
                unit.ammonia(),
                t.ammonia_critical_mg_l
            ),
            Some(REASON_LOW_OXYGEN) => format!(
                "Based on the telemetry, {} dissolved oxygen is down to {:.1} mg/L. \
                 Borehole flow is {:.0} L/min and the battery bank is at {:.0}%. \
                 I recommend inspecting the aerator and the backup solar battery circuit.",
                unit.name,
                unit.dissolved_oxygen(),
                scalars.borehole_flow,
                scalars.battery_level
            ),
            Some(_) => format!(
                "{} is outside its optimal band: {:.1} °C (target {:.0}-{:.0}) and pH {:.1} \
                 (target {:.1}-{:.1}). Adjust shading or water exchange and recheck within the hour.",
                unit.name,
                unit.temperature(),
                t.temperature_min_c,
                t.temperature_max_c,
                unit.ph(),
                t.ph_min,
                t.ph_max
            ),
            None => format!(
                "{} is within optimal parameters. Fleet health is {:.0}% with {} of {} units online.",
                unit.name, snapshot.summary.health_score, snapshot.summary.units_online, snapshot.summary.units_total
            ),
        }
    }
}

#[async_trait]
impl AdvisoryComposer for TemplateComposer {
    async fn compose(
        &self,
        request: &str,
        snapshot: &FleetSnapshot,
    ) -> Result<AdvisoryReply, AdvisoryError> {
        let Some(unit) = self.focus_unit(request, snapshot) else {
            return Ok(AdvisoryReply {
                text: "No units are registered on this farm yet.".to_string(),
                reasoning: format!("Analyzing semantic intent: '{}'. Fleet is empty.", request),
            });
        };

        let condition = self.condition(unit, snapshot.state.demo_active);
        let reasoning = format!(
            "Analyzing semantic intent: '{}'. Correlating with real-time sensor stream from {} ({}).",
            request, unit.name, condition
        );
        Ok(AdvisoryReply {
            text: self.recommendation(unit, &condition, snapshot),
            reasoning,
        })
    }

    fn composer_name(&self) -> &'static str {
        "template"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::summarize;
    use crate::store::fixture;

    fn snapshot() -> FleetSnapshot {
        let state = fixture::default_fleet(42).unwrap();
        let summary = summarize(&state, false);
        FleetSnapshot {
            version: 1,
            state,
            summary,
            thinking: false,
            messages: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_named_unit_is_focus() {
        let composer = TemplateComposer::default();
        let reply = composer.compose("Why is pond 02 low?", &snapshot()).await.unwrap();
        assert!(reply.text.contains("Pond 02"));
        assert!(reply.text.contains("4.2 mg/L"));
        assert!(reply.reasoning.contains("Why is pond 02 low?"));
    }

    #[tokio::test]
    async fn test_most_urgent_unit_without_name() {
        let composer = TemplateComposer::default();
        let reply = composer.compose("Anything to worry about?", &snapshot()).await.unwrap();
        // Nursery is the only critical unit
        assert!(reply.text.starts_with("Nursery telemetry link is offline"));
    }

    #[tokio::test]
    async fn test_reply_is_deterministic() {
        let composer = TemplateComposer::default();
        let snap = snapshot();
        let a = composer.compose("status of raceway b", &snap).await.unwrap();
        let b = composer.compose("status of raceway b", &snap).await.unwrap();
        assert_eq!(a, b);
        assert!(a.text.contains("outside its optimal band"));
    }

    #[tokio::test]
    async fn test_analyzing_unit_judged_by_readings() {
        let composer = TemplateComposer::default();
        let mut snap = snapshot();
        snap.state.units[1].ai_status = AiStatus::Analyzing;
        let reply = composer.compose("pond 02?", &snap).await.unwrap();
        assert!(reply.reasoning.contains("WARNING: Low Oxygen"));
    }

    #[tokio::test]
    async fn test_empty_fleet() {
        let composer = TemplateComposer::default();
        let mut snap = snapshot();
        snap.state.units.clear();
        let reply = composer.compose("hello", &snap).await.unwrap();
        assert!(reply.text.contains("No units"));
    }
}
