//! Farm Configuration - classifier thresholds, instrument ranges and overlay
//! constants as operator-tunable TOML values
//!
//! Each struct implements `Default` with the values in [`super::defaults`],
//! so a missing config file changes nothing.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use super::defaults;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "AQUAFLEET_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "farm_config.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for a farm deployment.
///
/// Load with `FarmConfig::load()` which searches:
/// 1. `$AQUAFLEET_CONFIG` env var
/// 2. `./farm_config.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FarmConfig {
    /// Farm identification
    #[serde(default)]
    pub farm: FarmInfo,

    /// Status classifier thresholds
    #[serde(default)]
    pub thresholds: ClassifierThresholds,

    /// Plausible instrument ranges; readings outside are rejected
    #[serde(default)]
    pub instrument_ranges: InstrumentRanges,

    /// Demo overlay constants
    #[serde(default)]
    pub demo: DemoOverlayConfig,

    /// Advisory pipeline timing
    #[serde(default)]
    pub advisory: AdvisoryConfig,

    /// Telemetry simulator
    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl FarmConfig {
    /// Load configuration using the standard search order:
    /// 1. `$AQUAFLEET_CONFIG` environment variable
    /// 2. `./farm_config.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), farm = %config.farm.name, "Loaded farm config from {CONFIG_ENV_VAR}");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {CONFIG_ENV_VAR}, falling back");
                    }
                }
            } else {
                warn!(path = %path, "{CONFIG_ENV_VAR} points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!(farm = %config.farm.name, "Loaded farm config from ./{LOCAL_CONFIG_FILE}");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{LOCAL_CONFIG_FILE}, using defaults");
                }
            }
        }

        info!("No {LOCAL_CONFIG_FILE} found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate a TOML document. Unknown keys only warn.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate every section, collecting all violations at once.
    ///
    /// Rules:
    /// - Every value must be finite
    /// - Band minimums must be below their maximums
    /// - Classifier bands must sit inside the instrument ranges
    /// - The demo health score must lie in [0, 100]
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();
        let t = &self.thresholds;

        Self::check_band(t.temperature_min_c, t.temperature_max_c, "thresholds.temperature", &mut errors);
        Self::check_band(t.ph_min, t.ph_max, "thresholds.ph", &mut errors);
        Self::check_finite(t.ammonia_critical_mg_l, "thresholds.ammonia_critical_mg_l", &mut errors);
        Self::check_finite(t.oxygen_warning_mg_l, "thresholds.oxygen_warning_mg_l", &mut errors);

        let r = &self.instrument_ranges;
        for (name, range) in r.named() {
            Self::check_band(range.min, range.max, &format!("instrument_ranges.{name}"), &mut errors);
        }

        let d = &self.demo;
        if !d.health_score.is_finite() || !(0.0..=100.0).contains(&d.health_score) {
            errors.push(format!(
                "demo.health_score ({}) must lie in [0, 100]",
                d.health_score
            ));
        }
        for (name, value) in [
            ("demo.monthly_revenue", d.monthly_revenue),
            ("demo.monthly_cost", d.monthly_cost),
            ("demo.solar_power_kw", d.solar_power_kw),
        ] {
            if !value.is_finite() || value < 0.0 {
                errors.push(format!("{name} ({value}) must be a finite, non-negative number"));
            }
        }

        if self.advisory.queue_capacity == 0 {
            errors.push("advisory.queue_capacity must be > 0".to_string());
        }

        let (range_errors, range_warnings) = super::validation::validate_physical_ranges(self);
        errors.extend(range_errors);
        for w in &range_warnings {
            warn!("{}", w);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn check_finite(value: f64, name: &str, errors: &mut Vec<String>) {
        if !value.is_finite() {
            errors.push(format!("{name}: value must be finite (got {value})"));
        }
    }

    fn check_band(min: f64, max: f64, name: &str, errors: &mut Vec<String>) {
        // NaN comparisons silently pass, so catch them first
        if !min.is_finite() || !max.is_finite() {
            errors.push(format!("{name}: values must be finite (got min={min}, max={max})"));
            return;
        }
        if min >= max {
            errors.push(format!("{name}: min ({min:.3}) must be < max ({max:.3})"));
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {1}", .0.display())]
    Io(PathBuf, std::io::Error),

    #[error("Config parse error ({}): {1}", .0.display())]
    Parse(PathBuf, toml::de::Error),

    #[error("Config serialization error: {0}")]
    Serialize(toml::ser::Error),

    #[error("Config validation failed:\n  - {}", .0.join("\n  - "))]
    Validation(Vec<String>),
}

// ============================================================================
// Farm Info
// ============================================================================

/// Identification metadata, used in logs and the status line only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmInfo {
    #[serde(default = "default_farm_name")]
    pub name: String,

    #[serde(default)]
    pub site: String,
}

fn default_farm_name() -> String {
    "DEFAULT".to_string()
}

impl Default for FarmInfo {
    fn default() -> Self {
        Self {
            name: default_farm_name(),
            site: String::new(),
        }
    }
}

// ============================================================================
// Classifier Thresholds
// ============================================================================

/// Water-quality thresholds used by the status classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierThresholds {
    pub ammonia_critical_mg_l: f64,
    pub oxygen_warning_mg_l: f64,
    pub temperature_min_c: f64,
    pub temperature_max_c: f64,
    pub ph_min: f64,
    pub ph_max: f64,
}

impl Default for ClassifierThresholds {
    fn default() -> Self {
        Self {
            ammonia_critical_mg_l: defaults::AMMONIA_CRITICAL_MG_L,
            oxygen_warning_mg_l: defaults::OXYGEN_WARNING_MG_L,
            temperature_min_c: defaults::TEMPERATURE_MIN_C,
            temperature_max_c: defaults::TEMPERATURE_MAX_C,
            ph_min: defaults::PH_MIN,
            ph_max: defaults::PH_MAX,
        }
    }
}

// ============================================================================
// Instrument Ranges
// ============================================================================

/// Inclusive plausible range of an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// `false` for NaN and infinities as well as out-of-range values.
    pub fn contains(&self, value: f64) -> bool {
        value.is_finite() && value >= self.min && value <= self.max
    }
}

/// Plausible domain of every metric the store accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentRanges {
    pub temperature: Range,
    pub ph: Range,
    pub dissolved_oxygen: Range,
    pub ammonia: Range,
    pub salinity: Range,
    pub solar_power: Range,
    pub battery_level: Range,
    pub borehole_flow: Range,
}

impl InstrumentRanges {
    /// Every range with its config key name.
    pub fn named(&self) -> [(&'static str, Range); 8] {
        [
            ("temperature", self.temperature),
            ("ph", self.ph),
            ("dissolved_oxygen", self.dissolved_oxygen),
            ("ammonia", self.ammonia),
            ("salinity", self.salinity),
            ("solar_power", self.solar_power),
            ("battery_level", self.battery_level),
            ("borehole_flow", self.borehole_flow),
        ]
    }
}

impl Default for InstrumentRanges {
    fn default() -> Self {
        Self {
            temperature: Range::new(0.0, 45.0),
            ph: Range::new(0.0, 14.0),
            dissolved_oxygen: Range::new(0.0, 20.0),
            ammonia: Range::new(0.0, 10.0),
            salinity: Range::new(0.0, 45.0),
            solar_power: Range::new(0.0, 100.0),
            battery_level: Range::new(0.0, 100.0),
            borehole_flow: Range::new(0.0, 2_000.0),
        }
    }
}

// ============================================================================
// Demo Overlay
// ============================================================================

/// Idealized values shown while demo mode is active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoOverlayConfig {
    pub health_score: f64,
    pub monthly_revenue: f64,
    pub monthly_cost: f64,
    pub solar_power_kw: f64,
}

impl Default for DemoOverlayConfig {
    fn default() -> Self {
        Self {
            health_score: defaults::DEMO_HEALTH_SCORE,
            monthly_revenue: defaults::DEMO_MONTHLY_REVENUE,
            monthly_cost: defaults::DEMO_MONTHLY_COST,
            solar_power_kw: defaults::DEMO_SOLAR_POWER_KW,
        }
    }
}

// ============================================================================
// Advisory
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisoryConfig {
    /// Simulated composition latency per request
    pub latency_ms: u64,
    /// Maximum queued requests; further submissions are rejected
    pub queue_capacity: usize,
}

impl Default for AdvisoryConfig {
    fn default() -> Self {
        Self {
            latency_ms: defaults::ADVISORY_LATENCY_MS,
            queue_capacity: defaults::ADVISORY_QUEUE_CAPACITY,
        }
    }
}

// ============================================================================
// Simulation
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seed for fixture histories and simulated telemetry
    pub seed: u64,
    /// Interval between simulated ticks at speed 1
    pub tick_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: defaults::DEFAULT_SEED,
            tick_ms: defaults::SIMULATION_TICK_MS,
        }
    }
}
