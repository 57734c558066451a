//! System-wide default constants.
//!
//! Centralises the numbers the farm config falls back to when a key is
//! absent. Grouped by subsystem for easy discovery.

// ============================================================================
// History
// ============================================================================

/// Samples kept per rolling history buffer.
///
/// 24 samples = one day at hourly resolution.
pub const HISTORY_CAPACITY: usize = 24;

// ============================================================================
// Classifier Thresholds
// ============================================================================

/// Ammonia above this (mg/L) is critical.
pub const AMMONIA_CRITICAL_MG_L: f64 = 1.0;

/// Dissolved oxygen below this (mg/L) is a warning.
pub const OXYGEN_WARNING_MG_L: f64 = 5.0;

/// Optimal water temperature band (°C).
pub const TEMPERATURE_MIN_C: f64 = 26.0;
pub const TEMPERATURE_MAX_C: f64 = 30.0;

/// Optimal pH band.
pub const PH_MIN: f64 = 6.5;
pub const PH_MAX: f64 = 7.5;

// ============================================================================
// Demo Overlay
// ============================================================================

pub const DEMO_HEALTH_SCORE: f64 = 99.0;
pub const DEMO_MONTHLY_REVENUE: f64 = 25_000.0;
pub const DEMO_MONTHLY_COST: f64 = 3_000.0;
pub const DEMO_SOLAR_POWER_KW: f64 = 18.2;

// ============================================================================
// Advisory Pipeline
// ============================================================================

/// Simulated composition latency per advisory request (milliseconds).
pub const ADVISORY_LATENCY_MS: u64 = 2_000;

/// Capacity of the advisory job queue.
pub const ADVISORY_QUEUE_CAPACITY: usize = 64;

/// Capacity of the engine command mailbox.
pub const ENGINE_MAILBOX_CAPACITY: usize = 256;

/// First entry of every advisory log.
pub const ADVISORY_GREETING: &str = "Edge AI Module (SiMa.ai) connected.";

/// Delivered in place of a response when the composer fails.
pub const ADVISORY_UNAVAILABLE: &str =
    "Advisory engine unavailable. The request could not be analyzed; please retry shortly.";

// ============================================================================
// Fleet Fixture
// ============================================================================

/// Initial fleet health score.
pub const INITIAL_HEALTH_SCORE: f64 = 92.0;

pub const INITIAL_SOLAR_POWER_KW: f64 = 12.5;
pub const INITIAL_BATTERY_LEVEL_PCT: f64 = 85.0;
pub const INITIAL_BOREHOLE_FLOW_L_MIN: f64 = 450.0;
pub const INITIAL_MONTHLY_REVENUE: f64 = 15_400.0;
pub const INITIAL_MONTHLY_COST: f64 = 4_200.0;

/// Seed used when none is configured.
pub const DEFAULT_SEED: u64 = 42;

// ============================================================================
// Simulation
// ============================================================================

/// Interval between simulated telemetry ticks at speed 1 (milliseconds).
pub const SIMULATION_TICK_MS: u64 = 1_000;
