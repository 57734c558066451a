//! Shared data structures for the fleet state engine
//!
//! - `unit`: UnitId, readings, AiStatus, per-unit histories
//! - `fleet`: FleetState aggregate root and the published read models
//! - `advisory`: the append-only advisory message log entries

mod unit;
mod fleet;
mod advisory;

pub use unit::*;
pub use fleet::*;
pub use advisory::*;
