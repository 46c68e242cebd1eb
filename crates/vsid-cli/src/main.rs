//! Operator tooling for vSID configuration.
//!
//! Usage:
//!   vsid check airports/LFPG.json --expect-version 1.0.0
//!   vsid replay --config-dir ./vsid-config --traffic snapshot.json

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vsid_core::{geofence, AirportConfig, FlightSnapshot};
use vsid_plugin::{
    AirportConfiguration, ConfigSource, Host, Notifier, PluginConfig, SourceError, TagField,
    TagSink, TagValue, TrafficProvider, VsidPlugin,
};

#[derive(Parser, Debug)]
#[command(name = "vsid", version, about = "Check vSID configuration and replay traffic")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate one airport document and list what it defines
    Check {
        file: PathBuf,

        /// Expected document version
        #[arg(long, default_value = "1.0.0")]
        expect_version: String,

        /// ICAO code, defaults to the file name
        #[arg(long)]
        icao: Option<String>,
    },
    /// Run the engine for every flight in a traffic snapshot
    Replay {
        #[arg(long, env = "VSID_CONFIG_DIR")]
        config_dir: PathBuf,

        /// JSON file with `airports` and `flights`
        #[arg(long)]
        traffic: PathBuf,

        /// Use only documents already in the config directory
        #[arg(long)]
        offline: bool,

        /// Print assignments as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("vsid=info".parse()?))
        .init();

    let args = Args::parse();
    match args.command {
        Command::Check {
            file,
            expect_version,
            icao,
        } => check(&file, &expect_version, icao),
        Command::Replay {
            config_dir,
            traffic,
            offline,
            json,
        } => replay(config_dir, &traffic, offline, json),
    }
}

fn check(file: &Path, expect_version: &str, icao: Option<String>) -> Result<()> {
    let icao = match icao {
        Some(icao) => icao,
        None => file
            .file_stem()
            .and_then(|s| s.to_str())
            .map(str::to_string)
            .context("cannot derive ICAO from file name, pass --icao")?,
    };
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let config = AirportConfig::parse(&icao, &raw, expect_version)
        .with_context(|| format!("{} is not a valid airport document", file.display()))?;

    println!("{} version {} transAlt {}", config.icao, config.version, config.trans_alt);
    for (waypoint, family) in config.sids.iter() {
        for (letter, variants) in family.iter() {
            for (number, variant) in variants.iter() {
                let mut constraints = vec![format!("rwy {}", variant.rwy)];
                if let Some(rules) = &variant.custom_rule {
                    constraints.push(format!("rules {}", rules.iter().collect::<Vec<_>>().join("+")));
                }
                if let Some(areas) = &variant.area {
                    constraints.push(format!("areas {}", areas.iter().collect::<Vec<_>>().join("+")));
                }
                if variant.requires_rnav() {
                    constraints.push("RNAV".to_string());
                }
                if let Some(engine) = &variant.engine_type {
                    constraints.push(format!("engine {}", engine));
                }
                println!(
                    "  {}{} #{}: {} -> {}",
                    waypoint,
                    letter,
                    number,
                    constraints.join(", "),
                    variant.initial
                );
            }
        }
    }
    for (name, active) in config.custom_rules.iter() {
        println!("  rule {} ({})", name, if *active { "on" } else { "off" });
    }

    let mut unusable = 0;
    for area in &config.areas {
        let usable = geofence::is_usable(&area.polygon);
        if !usable {
            unusable += 1;
        }
        println!(
            "  area {} ({}) {} vertices{}",
            area.name,
            if area.active { "on" } else { "off" },
            area.polygon.len(),
            if usable { "" } else { ", unusable" }
        );
    }
    if unusable > 0 {
        bail!("{} area(s) have fewer than {} vertices", unusable, geofence::MIN_VERTICES);
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct TrafficSnapshot {
    airports: Vec<AirportConfiguration>,
    flights: Vec<FlightSnapshot>,
}

impl TrafficProvider for TrafficSnapshot {
    fn flight(&self, callsign: &str) -> Option<FlightSnapshot> {
        self.flights
            .iter()
            .find(|f| f.callsign.eq_ignore_ascii_case(callsign))
            .cloned()
    }

    fn flights(&self) -> Vec<FlightSnapshot> {
        self.flights.clone()
    }

    fn airport_configurations(&self) -> Vec<AirportConfiguration> {
        self.airports.clone()
    }
}

struct Console;

impl Notifier for Console {
    fn send(&self, sender: &str, message: &str) {
        eprintln!("[{}] {}", sender, message);
    }
}

impl TagSink for Console {
    fn update_tag(&self, callsign: &str, field: TagField, value: &TagValue) {
        tracing::trace!("{} {:?} = {}", callsign, field, value.text);
    }
}

struct Offline;

impl ConfigSource for Offline {
    fn fetch_airport(&self, icao: &str) -> Result<String, SourceError> {
        Err(SourceError::NotFound(format!("{} (offline)", icao)))
    }
}

fn replay(config_dir: PathBuf, traffic: &Path, offline: bool, json: bool) -> Result<()> {
    let raw = std::fs::read_to_string(traffic)
        .with_context(|| format!("failed to read {}", traffic.display()))?;
    let snapshot: TrafficSnapshot =
        serde_json::from_str(&raw).with_context(|| format!("invalid traffic snapshot {}", traffic.display()))?;
    let callsigns: Vec<String> = snapshot.flights.iter().map(|f| f.callsign.clone()).collect();

    let config = PluginConfig {
        config_dir,
        ..PluginConfig::from_env()
    };
    let console = Arc::new(Console);
    let host = Host {
        traffic: Arc::new(snapshot),
        notifier: console.clone(),
        tags: console,
    };
    let plugin = if offline {
        VsidPlugin::new(config, host, Arc::new(Offline))
    } else {
        VsidPlugin::connect(config, host)?
    };

    let mut assigned = Vec::new();
    for callsign in &callsigns {
        match plugin.get_or_compute(callsign) {
            Ok(pilot) => {
                if !json {
                    println!("{:<10} {:<4} {:<5} {:<8} {}", pilot.callsign, pilot.origin, pilot.runway, pilot.sid, pilot.cfl);
                }
                assigned.push(pilot);
            }
            Err(reason) => {
                if !json {
                    println!("{:<10} skipped: {}", callsign, reason);
                }
            }
        }
    }
    if json {
        println!("{}", serde_json::to_string_pretty(&assigned)?);
    }
    tracing::info!("{} of {} flights assigned", assigned.len(), callsigns.len());
    Ok(())
}
