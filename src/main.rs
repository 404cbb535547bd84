//! Ambuclear - emergency vehicle proximity alerts and clearance ranking
//!
//! Module structure:
//! - `domain/` - Core types, geometry, errors
//! - `io/` - External interfaces (snapshot input, JSONL egress, chat client)
//! - `services/` - Business logic (alert engine, prioritizer, messages)
//! - `infra/` - Infrastructure (Config, Metrics)

use ambuclear::domain::types::{AlertDecision, Severity, VoiceProfile};
use ambuclear::infra::{Config, FormatterMode, Metrics};
use ambuclear::io::{ChatFormatter, Egress, Snapshot};
use ambuclear::services::{
    enrich, nearby_vehicles, rank_clearance, AlertEngine, ApproachScenario, MessageFormatter,
};
use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use time::format_description::well_known::Rfc3339;
use tracing::{info, warn};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Ambuclear - tells drivers which way to move for an approaching ambulance
#[derive(Parser, Debug)]
#[command(name = "ambuclear", version, about)]
struct Args {
    /// Path to TOML configuration file (falls back to CONFIG_FILE, then config/dev.toml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate a bystander against a vehicle snapshot and print the decision
    Alert {
        #[arg(long)]
        snapshot: PathBuf,
        /// One decision per qualifying vehicle instead of the nearest only
        #[arg(long)]
        all: bool,
        /// Severities counted in the nearby summary, comma separated (all when omitted)
        #[arg(long, value_delimiter = ',')]
        nearby_severity: Vec<Severity>,
    },
    /// Rank RED vehicles for route clearance and print the report
    Rank {
        #[arg(long)]
        snapshot: PathBuf,
    },
    /// Drive a synthetic ambulance toward a bystander at the base location
    Simulate {
        #[arg(long, default_value_t = 800.0)]
        start_distance_m: f64,
        #[arg(long, default_value_t = 15.0)]
        speed_mps: f64,
        #[arg(long, default_value_t = 2.0)]
        tick_secs: f64,
        #[arg(long, default_value_t = 60)]
        ticks: u32,
        /// Shared direction of travel in degrees
        #[arg(long, default_value_t = 90.0)]
        heading: f64,
        /// Ambulance lane offset, positive to the right of the bystander
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        lateral_offset_m: f64,
        /// Sleep `tick_secs` between ticks
        #[arg(long)]
        realtime: bool,
    },
}

/// Printed form of a decision, with the speech parameters for its urgency
#[derive(Serialize)]
struct AlertOutput {
    #[serde(flatten)]
    decision: AlertDecision,
    voice: VoiceProfile,
}

impl From<AlertDecision> for AlertOutput {
    fn from(decision: AlertDecision) -> Self {
        let voice = decision.urgency.voice_profile();
        Self { decision, voice }
    }
}

/// Shared pieces every subcommand needs
struct App {
    config: Config,
    engine: AlertEngine,
    metrics: Arc<Metrics>,
    formatter: Option<Box<dyn MessageFormatter>>,
    egress: Option<Egress>,
}

impl App {
    fn new(config: Config) -> anyhow::Result<Self> {
        let engine = AlertEngine::new(*config.alert(), config.vehicle_label())
            .context("Invalid alert configuration")?;

        let formatter: Option<Box<dyn MessageFormatter>> = match config.formatter_mode() {
            FormatterMode::Template => None,
            FormatterMode::Chat => match ChatFormatter::from_config(&config) {
                Ok(chat) => Some(Box::new(chat)),
                Err(e) => {
                    warn!(error = %e, "chat_formatter_unavailable");
                    None
                }
            },
        };

        let egress = config.egress_enabled().then(|| Egress::new(config.egress_file(), config.site_id()));

        Ok(Self { config, engine, metrics: Arc::new(Metrics::new()), formatter, egress })
    }

    /// Record, optionally reword, and egress one decision
    async fn finish(&self, decision: AlertDecision, latency_us: u64) -> AlertDecision {
        self.metrics.record_evaluation(latency_us, &decision);

        let decision = match &self.formatter {
            Some(formatter) => {
                let timeout = Duration::from_millis(self.config.formatter_timeout_ms());
                enrich(decision, formatter.as_ref(), timeout, Some(self.metrics.as_ref())).await
            }
            None => decision,
        };

        if let Some(egress) = &self.egress {
            egress.write_alert(&decision);
        }
        decision
    }
}

fn init_tracing(json: bool) {
    // Default: INFO, use RUST_LOG=debug for gate-level visibility
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::new(Rfc3339))
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.json_logs);

    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load(&[])?,
    };

    let alert = config.alert();
    info!(
        config_file = %config.config_file(),
        site_id = %config.site_id(),
        radius_m = %alert.radius_meters,
        heading_threshold_deg = %alert.heading_threshold_degrees,
        ahead_cone_deg = %alert.ahead_cone_degrees,
        formatter = ?config.formatter_mode(),
        egress_enabled = %config.egress_enabled(),
        "config_loaded"
    );

    let app = App::new(config)?;

    match args.command {
        Command::Alert { snapshot, all, nearby_severity } => {
            run_alert(&app, &snapshot, all, &nearby_severity).await
        }
        Command::Rank { snapshot } => run_rank(&app, &snapshot),
        Command::Simulate {
            start_distance_m,
            speed_mps,
            tick_secs,
            ticks,
            heading,
            lateral_offset_m,
            realtime,
        } => {
            let scenario = ApproachScenario::at_base(
                heading,
                start_distance_m,
                speed_mps,
                tick_secs,
                ticks,
                lateral_offset_m,
            )
            .context("Invalid simulation parameters")?;
            run_simulation(&app, &scenario, realtime).await
        }
    }
}

async fn run_alert(app: &App, path: &Path, all: bool, severities: &[Severity]) -> anyhow::Result<()> {
    let snapshot = Snapshot::from_file(path)?;

    let nearby = nearby_vehicles(
        snapshot.bystander.position,
        &snapshot.vehicles,
        app.engine.config().radius_meters,
        severities,
    );
    info!(
        bystander = %snapshot.bystander.position,
        vehicles = %snapshot.vehicles.len(),
        nearby = %nearby.len(),
        nearest_m = ?nearby.first().map(|n| n.distance_meters.round()),
        nearest_severity = ?nearby.first().map(|n| n.vehicle.severity.to_string()),
        "snapshot_loaded"
    );

    let start = Instant::now();
    let decisions = if all {
        app.engine.evaluate_all(&snapshot.bystander, &snapshot.vehicles)
    } else {
        vec![app.engine.evaluate(&snapshot.bystander, &snapshot.vehicles)]
    };
    let latency_us = start.elapsed().as_micros() as u64;

    let mut outputs = Vec::with_capacity(decisions.len());
    for decision in decisions {
        outputs.push(AlertOutput::from(app.finish(decision, latency_us).await));
    }

    if all {
        print_json(&outputs)?;
    } else if let Some(output) = outputs.first() {
        print_json(output)?;
    }

    app.metrics.report().log();
    Ok(())
}

fn run_rank(app: &App, path: &Path) -> anyhow::Result<()> {
    let snapshot = Snapshot::from_file(path)?;

    let report = rank_clearance(&snapshot.vehicles, &snapshot.sos);
    app.metrics.record_ranking(&report);

    for rec in &report.recommendations {
        info!(
            priority = %rec.priority,
            vehicle = %rec.subject_label,
            spoken = %rec.spoken_text(),
            "clearance_announcement"
        );
    }
    if let Some(egress) = &app.egress {
        egress.write_clearance(&report);
    }

    print_json(&report)
}

async fn run_simulation(app: &App, scenario: &ApproachScenario, realtime: bool) -> anyhow::Result<()> {
    let fixes = scenario.fixes();
    info!(
        ticks = %fixes.len(),
        start_distance_m = %scenario.start_distance_m,
        speed_mps = %scenario.speed_mps,
        heading = %scenario.heading.degrees(),
        bystander = %scenario.bystander.position,
        "simulation_started"
    );

    // Periodic metrics while running in wall-clock time
    let reporter = realtime.then(|| {
        let metrics = app.metrics.clone();
        let every = Duration::from_secs(app.config.metrics_interval_secs().max(1));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.tick().await;
            loop {
                interval.tick().await;
                metrics.report().log();
            }
        })
    });

    let mut ticker = tokio::time::interval(Duration::from_secs_f64(scenario.tick_secs));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    for tick in 0..fixes.len() {
        if realtime {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = &mut shutdown => {
                    info!("shutdown_signal_received");
                    break;
                }
            }
        }

        let Some(vehicle) = scenario.vehicle_at(&fixes, tick) else {
            break;
        };

        let start = Instant::now();
        let decision = app.engine.evaluate(&scenario.bystander, std::slice::from_ref(&vehicle));
        let latency_us = start.elapsed().as_micros() as u64;
        let decision = app.finish(decision, latency_us).await;

        info!(
            tick = %tick,
            vehicle = %vehicle.position,
            vehicle_heading = ?vehicle.heading.map(|h| h.degrees()),
            fired = %decision.fired,
            direction = %decision.direction,
            urgency = %decision.urgency,
            distance_m = format!("{:.0}", decision.distance_meters),
            message = %decision.message,
            "simulation_tick"
        );
    }

    if let Some(handle) = reporter {
        handle.abort();
    }

    info!(
        evaluations = %app.metrics.evaluations_total(),
        alerts_fired = %app.metrics.alerts_fired_total(),
        "simulation_complete"
    );
    app.metrics.report().log();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearby_severity_parsed() {
        let args = Args::try_parse_from([
            "ambuclear",
            "alert",
            "--snapshot",
            "data/sample_snapshot.json",
            "--nearby-severity",
            "red,Yellow",
        ])
        .unwrap();
        let Command::Alert { nearby_severity, all, .. } = args.command else {
            panic!("expected alert subcommand");
        };
        assert!(!all);
        assert_eq!(nearby_severity, vec![Severity::Red, Severity::Yellow]);
    }

    #[test]
    fn test_unknown_nearby_severity_rejected() {
        let parsed = Args::try_parse_from([
            "ambuclear",
            "alert",
            "--snapshot",
            "data/sample_snapshot.json",
            "--nearby-severity",
            "blue",
        ]);
        assert!(parsed.is_err());
    }
}
