//! Farm Configuration Module
//!
//! Per-farm configuration loaded from TOML, replacing hardcoded classifier
//! thresholds, instrument ranges and demo constants with operator-tunable
//! values.
//!
//! ## Loading Order
//!
//! 1. `AQUAFLEET_CONFIG` environment variable (path to TOML file)
//! 2. `farm_config.toml` in the current working directory
//! 3. Built-in defaults
//!
//! ## Usage
//!
//! Call `config::init()` once at startup, then `config::get()` anywhere:
//!
//! ```ignore
//! config::init(FarmConfig::load());
//! let limit = config::get().thresholds.ammonia_critical_mg_l;
//! ```
//!
//! Library code that may run without `init()` (tests, embedders) reads
//! through [`current`], which falls back to the defaults.

mod farm_config;
pub mod defaults;
pub mod validation;

pub use farm_config::*;

use std::sync::OnceLock;

static FARM_CONFIG: OnceLock<FarmConfig> = OnceLock::new();

static DEFAULT_CONFIG: OnceLock<FarmConfig> = OnceLock::new();

/// Initialize the global farm configuration.
///
/// Later calls are ignored with a warning.
pub fn init(config: FarmConfig) {
    if FARM_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once, ignoring");
    }
}

/// The global farm configuration.
///
/// Panics if `init()` has not been called; a missing config is a startup bug.
pub fn get() -> &'static FarmConfig {
    #[allow(clippy::expect_used)]
    FARM_CONFIG
        .get()
        .expect("config::get() called before config::init(), this is a startup bug")
}

/// The global configuration if initialized, otherwise the built-in defaults.
pub fn current() -> &'static FarmConfig {
    FARM_CONFIG
        .get()
        .unwrap_or_else(|| DEFAULT_CONFIG.get_or_init(FarmConfig::default))
}
