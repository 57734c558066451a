//! AquaFleet - Aquaculture Fleet State Engine
//!
//! Runs the fleet engine against simulated telemetry for a number of ticks,
//! optionally asks the advisory pipeline questions and switches to demo
//! mode, then prints the fleet summary.
//!
//! # Usage
//!
//! ```bash
//! # Twelve ticks as fast as possible, text summary
//! aquafleet --ticks 12 --speed 0
//!
//! # Ask questions and print the full snapshot as JSON
//! aquafleet --ask "Why is Pond 02 low on oxygen?" --ask "Fleet status?" --json
//! ```
//!
//! # Environment Variables
//!
//! - `AQUAFLEET_CONFIG`: Path to farm_config.toml
//! - `AQUAFLEET_SEED`: Simulation seed (overrides the config file)
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use aquafleet::config::{self, FarmConfig};
use aquafleet::processing::score_fleet;
use aquafleet::store::fixture;
use aquafleet::telemetry::{SimulatedReading, TelemetrySimulator};
use aquafleet::{EngineHandle, FleetEngine, FleetEvent, FleetSnapshot, Metric, TemplateComposer, Unit};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "aquafleet")]
#[command(about = "AquaFleet aquaculture fleet state engine")]
#[command(version)]
struct CliArgs {
    /// Path to a farm_config.toml (otherwise $AQUAFLEET_CONFIG, then ./farm_config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Seed for fixture histories and simulated telemetry
    #[arg(long, env = "AQUAFLEET_SEED")]
    seed: Option<u64>,

    /// Number of simulated telemetry ticks to run
    #[arg(long, default_value = "12")]
    ticks: u64,

    /// Speed multiplier for simulation (1 = one tick per tick_ms, 0 = no delay)
    #[arg(long, default_value = "1")]
    speed: u64,

    /// Switch to demo mode before printing the summary
    #[arg(long)]
    demo: bool,

    /// Question for the advisory pipeline (repeatable)
    #[arg(long, value_name = "TEXT")]
    ask: Vec<String>,

    /// Print the full snapshot as JSON instead of a text summary
    #[arg(long)]
    json: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

// ============================================================================
// Simulation
// ============================================================================

/// Feed simulated readings into the engine, rescoring fleet health each tick.
///
/// Returns the number of ticks completed.
async fn run_simulation(
    engine: &EngineHandle,
    simulator: &mut TelemetrySimulator,
    ticks: u64,
    delay: Duration,
    cancel_token: &CancellationToken,
) -> Result<u64> {
    for tick in 1..=ticks {
        if cancel_token.is_cancelled() {
            info!(tick, "Simulation cancelled");
            break;
        }

        let snapshot = engine.snapshot();
        let readings = simulator.next_tick(&snapshot.state.units, &snapshot.state.scalars);
        let now = chrono::Utc::now();
        for reading in readings {
            match reading {
                SimulatedReading::Unit {
                    unit_id,
                    metric,
                    value,
                } => engine
                    .apply_reading(unit_id, metric, value, now)
                    .await
                    .with_context(|| format!("Applying {} reading for {}", metric, unit_id))?,
                SimulatedReading::Fleet { metric, value } => engine
                    .apply_fleet_reading(metric, value)
                    .await
                    .with_context(|| format!("Applying {} reading", metric))?,
            }
        }

        let score = score_fleet(&engine.list_units());
        engine
            .set_health_score(score)
            .await
            .context("Storing fleet health score")?;

        if !delay.is_zero() {
            tokio::select! {
                _ = cancel_token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
    Ok(simulator.ticks())
}

/// Wait until every submitted advisory has been answered.
async fn wait_for_advisories(engine: &EngineHandle, cancel_token: &CancellationToken) {
    while engine.is_thinking() {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                warn!("Cancelled with advisories still pending");
                return;
            }
            _ = tokio::time::sleep(Duration::from_millis(100)) => {}
        }
    }
}

// ============================================================================
// Output
// ============================================================================

/// One reading with its unit label, e.g. `28.5 °C` or `pH 7.20`.
fn fmt_reading(unit: &Unit, metric: Metric, decimals: usize) -> String {
    let value = unit.readings.get(metric);
    match metric.unit_label() {
        "" => format!("{} {:.*}", metric, decimals, value),
        label => format!("{:.*} {}", decimals, value, label),
    }
}

fn print_summary(snapshot: &FleetSnapshot) {
    let summary = &snapshot.summary;
    let fmt_avg = |v: Option<f64>, decimals: usize| match v {
        Some(v) => format!("{:.*}", decimals, v),
        None => "n/a".to_string(),
    };

    println!("{}", summary.status_line);
    println!(
        "Mode: {}   Units online: {}/{}   Auto-manage: {}",
        if summary.demo_active { "DEMO" } else { "LIVE" },
        summary.units_online,
        summary.units_total,
        if summary.auto_manage_all { "on" } else { "off" }
    );
    println!(
        "Avg temperature: {} {}   Avg pH: {}   Avg DO: {} {}",
        fmt_avg(summary.avg_temperature, 2),
        Metric::Temperature.unit_label(),
        fmt_avg(summary.avg_ph, 2),
        fmt_avg(summary.avg_dissolved_oxygen, 2),
        Metric::DissolvedOxygen.unit_label()
    );
    println!(
        "Solar: {:.1} kW   Battery: {:.0}%   Borehole: {:.0} L/min   Net profit: ${:.0}",
        summary.solar_power, summary.battery_level, summary.borehole_flow, summary.net_profit
    );
    println!();

    for unit in &snapshot.state.units {
        println!(
            "  {:<10} {:<9} {:>8}  {:>7}  DO {:>9}  NH3 {:>9}  {:<8} {}",
            unit.name,
            unit.species,
            fmt_reading(unit, Metric::Temperature, 1),
            fmt_reading(unit, Metric::Ph, 2),
            fmt_reading(unit, Metric::DissolvedOxygen, 1),
            fmt_reading(unit, Metric::Ammonia, 2),
            unit.connection_status(),
            unit.ai_status
        );
    }

    println!();
    for message in &snapshot.messages {
        let who = if message.is_system_event {
            "system"
        } else if message.is_user {
            "you"
        } else {
            "advisor"
        };
        println!("[{}] {}: {}", message.timestamp.format("%H:%M:%S"), who, message.text);
        if let Some(reasoning) = &message.reasoning {
            println!("           reasoning: {}", reasoning);
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if args.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }

    // Load farm configuration
    let farm_config = match &args.config {
        Some(path) => FarmConfig::load_from_file(path)
            .with_context(|| format!("Loading farm config from {}", path.display()))?,
        None => FarmConfig::load(),
    };
    info!(
        farm = %farm_config.farm.name,
        site = if farm_config.farm.site.is_empty() { "unset" } else { farm_config.farm.site.as_str() },
        "Farm configuration loaded"
    );
    config::init(farm_config);
    let farm_config = config::get();

    let seed = args.seed.unwrap_or(farm_config.simulation.seed);
    let delay = if args.speed == 0 {
        Duration::ZERO
    } else {
        Duration::from_millis(farm_config.simulation.tick_ms / args.speed)
    };
    info!(seed, ticks = args.ticks, delay_ms = delay.as_millis() as u64, "Starting fleet engine");

    let composer = Arc::new(TemplateComposer::new(farm_config.thresholds.clone()));
    let fleet = fixture::default_fleet_with(seed, &farm_config.thresholds).context("Building fleet fixture")?;
    let engine = FleetEngine::spawn(fleet, composer);

    engine.subscribe(|event| match event {
        FleetEvent::StatusChanged(change) => info!(
            unit = %change.unit_id,
            from = %change.previous,
            to = %change.current,
            "Unit status changed"
        ),
        FleetEvent::ModeChanged { mode } => info!(%mode, "Mode changed"),
        FleetEvent::AdvisoryMessage(message) if !message.is_user => {
            info!(system = message.is_system_event, "Advisory: {}", message.text)
        }
        _ => {}
    });

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    let mut simulator = TelemetrySimulator::new(seed, farm_config.instrument_ranges.clone());
    let completed = run_simulation(&engine, &mut simulator, args.ticks, delay, &cancel_token).await?;
    info!(ticks = completed, "Simulation finished");

    for question in &args.ask {
        let request_id = engine
            .submit_advisory(question.as_str())
            .await
            .with_context(|| format!("Submitting advisory request {:?}", question))?;
        info!(request = %request_id, "Advisory request queued");
    }

    if args.demo {
        let demo_active = engine.toggle_demo_mode().await.context("Entering demo mode")?;
        info!(demo_active, "Demo mode toggled");
    }

    wait_for_advisories(&engine, &cancel_token).await;

    let snapshot = engine.snapshot();
    if args.json {
        let json = serde_json::to_string_pretty(snapshot.as_ref()).context("Serializing fleet snapshot")?;
        println!("{}", json);
    } else {
        print_summary(&snapshot);
    }

    engine.shutdown().await.ok();
    info!("AquaFleet shutdown complete");
    Ok(())
}
