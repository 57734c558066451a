//! Config validation: unknown-key detection with Levenshtein suggestions
//! and plausibility checks.
//!
//! Two-pass parse: the raw TOML is first walked as a `toml::Value` tree and
//! compared against the known key set, emitting "did you mean?" warnings.
//! Normal serde deserialization follows. Warnings never break a config.

use std::collections::BTreeSet;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Every valid dotted key path of `FarmConfig`.
///
/// Kept by hand in step with farm_config.rs.
pub fn known_config_keys() -> BTreeSet<&'static str> {
    let mut keys: BTreeSet<&'static str> = [
        // [farm]
        "farm",
        "farm.name",
        "farm.site",
        // [thresholds]
        "thresholds",
        "thresholds.ammonia_critical_mg_l",
        "thresholds.oxygen_warning_mg_l",
        "thresholds.temperature_min_c",
        "thresholds.temperature_max_c",
        "thresholds.ph_min",
        "thresholds.ph_max",
        // [instrument_ranges]
        "instrument_ranges",
        // [demo]
        "demo",
        "demo.health_score",
        "demo.monthly_revenue",
        "demo.monthly_cost",
        "demo.solar_power_kw",
        // [advisory]
        "advisory",
        "advisory.latency_ms",
        "advisory.queue_capacity",
        // [simulation]
        "simulation",
        "simulation.seed",
        "simulation.tick_ms",
    ]
    .into_iter()
    .collect();

    for metric in RANGE_KEYS {
        keys.extend(metric);
    }
    keys
}

/// `[instrument_ranges.<metric>]` tables and their min/max keys.
const RANGE_KEYS: [[&str; 3]; 8] = [
    ["instrument_ranges.temperature", "instrument_ranges.temperature.min", "instrument_ranges.temperature.max"],
    ["instrument_ranges.ph", "instrument_ranges.ph.min", "instrument_ranges.ph.max"],
    ["instrument_ranges.dissolved_oxygen", "instrument_ranges.dissolved_oxygen.min", "instrument_ranges.dissolved_oxygen.max"],
    ["instrument_ranges.ammonia", "instrument_ranges.ammonia.min", "instrument_ranges.ammonia.max"],
    ["instrument_ranges.salinity", "instrument_ranges.salinity.min", "instrument_ranges.salinity.max"],
    ["instrument_ranges.solar_power", "instrument_ranges.solar_power.min", "instrument_ranges.solar_power.max"],
    ["instrument_ranges.battery_level", "instrument_ranges.battery_level.min", "instrument_ranges.battery_level.max"],
    ["instrument_ranges.borehole_flow", "instrument_ranges.borehole_flow.min", "instrument_ranges.borehole_flow.max"],
];

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// A table `{ a = { b = 1, c = 2 } }` yields `["a", "a.b", "a.c"]`.
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Closest known key within edit distance 3; ties go to the first in key order.
pub fn suggest_correction(unknown: &str, known: &BTreeSet<&str>) -> Option<String> {
    let mut best: Option<(&str, usize)> = None;
    for &k in known {
        let dist = levenshtein(unknown, k);
        if dist <= 3 && best.map_or(true, |(_, best_dist)| dist < best_dist) {
            best = Some((k, dist));
        }
    }
    best.map(|(k, _)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Warnings for every unknown key in a raw TOML document.
///
/// Parse errors are left for serde to report.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let Ok(value) = raw_toml.parse::<toml::Value>() else {
        return Vec::new();
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Plausibility Checks
// ============================================================================

/// Cross-section checks on a parsed `FarmConfig`.
///
/// Returns (errors, warnings). Errors are contradictions that make the
/// classifier meaningless; warnings are unusual but workable values.
pub fn validate_physical_ranges(
    config: &super::FarmConfig,
) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let t = &config.thresholds;
    let r = &config.instrument_ranges;

    // The optimal band must be reachable by the instrument
    if t.temperature_min_c < r.temperature.min || t.temperature_max_c > r.temperature.max {
        errors.push(format!(
            "thresholds.temperature band [{:.1}, {:.1}] lies outside instrument range [{:.1}, {:.1}]",
            t.temperature_min_c, t.temperature_max_c, r.temperature.min, r.temperature.max
        ));
    }
    if t.ph_min < r.ph.min || t.ph_max > r.ph.max {
        errors.push(format!(
            "thresholds.ph band [{:.2}, {:.2}] lies outside instrument range [{:.2}, {:.2}]",
            t.ph_min, t.ph_max, r.ph.min, r.ph.max
        ));
    }

    // pH is a logarithmic scale bounded by chemistry
    if r.ph.min < 0.0 || r.ph.max > 14.0 {
        errors.push(format!(
            "instrument_ranges.ph [{:.1}, {:.1}] exceeds the pH scale (0-14)",
            r.ph.min, r.ph.max
        ));
    }

    if r.battery_level.min < 0.0 || r.battery_level.max > 100.0 {
        errors.push(format!(
            "instrument_ranges.battery_level [{:.1}, {:.1}] must stay within 0-100 %",
            r.battery_level.min, r.battery_level.max
        ));
    }

    // Concentrations cannot be negative
    for (name, range) in [
        ("dissolved_oxygen", r.dissolved_oxygen),
        ("ammonia", r.ammonia),
        ("salinity", r.salinity),
    ] {
        if range.min < 0.0 {
            errors.push(format!(
                "instrument_ranges.{name}.min = {:.2} cannot be negative",
                range.min
            ));
        }
    }

    // Most farmed species need more than 3 mg/L
    if t.oxygen_warning_mg_l < 3.0 || t.oxygen_warning_mg_l > 10.0 {
        warnings.push(ValidationWarning {
            field: "thresholds.oxygen_warning_mg_l".to_string(),
            message: format!(
                "oxygen_warning_mg_l = {:.1} is outside the typical range (3-10 mg/L)",
                t.oxygen_warning_mg_l
            ),
            suggestion: None,
        });
    }

    if t.ammonia_critical_mg_l > 5.0 {
        warnings.push(ValidationWarning {
            field: "thresholds.ammonia_critical_mg_l".to_string(),
            message: format!(
                "ammonia_critical_mg_l = {:.2} is above the lethal range for most species (5 mg/L)",
                t.ammonia_critical_mg_l
            ),
            suggestion: None,
        });
    }

    (errors, warnings)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FarmConfig;

    #[test]
    fn test_levenshtein_identical() {
        assert_eq!(levenshtein("hello", "hello"), 0);
    }

    #[test]
    fn test_levenshtein_one_edit() {
        assert_eq!(levenshtein("salinty", "salinity"), 1);
    }

    #[test]
    fn test_levenshtein_empty() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
    }

    #[test]
    fn test_walk_toml_keys_nested() {
        let toml: toml::Value = r#"
            [instrument_ranges.ph]
            min = 0.0
        "#
        .parse()
        .unwrap();
        let keys = walk_toml_keys(&toml, "");
        assert!(keys.contains(&"instrument_ranges".to_string()));
        assert!(keys.contains(&"instrument_ranges.ph".to_string()));
        assert!(keys.contains(&"instrument_ranges.ph.min".to_string()));
    }

    #[test]
    fn test_typo_key_produces_warning_with_suggestion() {
        let toml_str = r#"
[thresholds]
ammonia_critcal_mg_l = 0.9
"#;
        let warnings = validate_unknown_keys(toml_str);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "thresholds.ammonia_critcal_mg_l");
        assert_eq!(
            warnings[0].suggestion.as_deref(),
            Some("thresholds.ammonia_critical_mg_l")
        );
    }

    #[test]
    fn test_all_valid_keys_produce_zero_warnings() {
        let toml_str = r#"
[farm]
name = "Lakeside"

[instrument_ranges.salinity]
min = 0.0
max = 40.0

[demo]
health_score = 97.0

[advisory]
latency_ms = 500
"#;
        assert!(validate_unknown_keys(toml_str).is_empty());
    }

    #[test]
    fn test_band_outside_instrument_range_is_error() {
        let mut config = FarmConfig::default();
        config.instrument_ranges.temperature.max = 28.0;
        let (errors, _) = validate_physical_ranges(&config);
        assert!(errors.iter().any(|e| e.contains("thresholds.temperature")));
    }

    #[test]
    fn test_low_oxygen_threshold_warns() {
        let mut config = FarmConfig::default();
        config.thresholds.oxygen_warning_mg_l = 2.0;
        let (errors, warnings) = validate_physical_ranges(&config);
        assert!(errors.is_empty());
        assert_eq!(warnings.len(), 1);
    }
}
