//! Simulated telemetry
//!
//! Seeded random-walk generator standing in for the farm's sensor gateway.
//! The same seed and the same fleet always produce the same readings.

mod simulator;

pub use simulator::{SimulatedReading, TelemetrySimulator};
