//! AquaFleet: Aquaculture Fleet State Engine
//!
//! Live telemetry aggregation, health classification and advisory pipeline
//! for a farm of ponds, raceways and tanks.
//!
//! ## Architecture
//!
//! - **Entity Store**: current units, readings and rolling histories
//! - **Status Classifier**: rule-based `AiStatus` per unit
//! - **Aggregation Engine**: fleet averages, health score bounds, summary
//! - **Mode Controller**: live/demo overlay with exact snapshot restore
//! - **Advisory Pipeline**: serialized question/answer jobs with reasoning
//! - **Fleet Engine**: single-writer actor tying the above together

pub mod advisory;
pub mod config;
pub mod engine;
pub mod history;
pub mod mode;
pub mod processing;
pub mod store;
pub mod telemetry;
pub mod types;

// Re-export farm configuration
pub use config::FarmConfig;

// Re-export the engine surface
pub use engine::{EngineError, EngineHandle, EngineSettings, FleetEngine, FleetEvent, SubscriptionId};

// Re-export commonly used types
pub use types::{
    AdvisoryMessage, AiStatus, ConnectionStatus, FleetMetric, FleetSnapshot, FleetState,
    FleetSummary, Metric, RequestId, Unit, UnitId,
};

// Re-export advisory components
pub use advisory::{AdvisoryComposer, AdvisoryError, AdvisoryReply, TemplateComposer};

pub use history::{RingBuffer, SampleError};
pub use mode::{Mode, ModeError};
pub use store::{EntityStore, FleetWrite, StatusChange, StoreError};
