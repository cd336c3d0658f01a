//! careline-geo: distance checks, address lookup and proximity replay.

mod output;

use anyhow::{Context, Result};
use careline_core::config::Config;
use careline_core::error::{exit_codes, Error as CoreError};
use careline_geo::{
    format_distance, haversine_distance_meters, is_within_proximity, rank_by_distance,
    within_radius, Coordinate, PostalCode, WorkerLocation,
};
use careline_geocode::{CoordinateResolver, GeocodeResult, GeocoderConfig, Resolution};
use careline_proximity::{
    drive_feed_with, ArrivalBanner, BannerConfig, MonitorConfig, ProximityMonitor,
    ProximitySnapshot, WorkerSample,
};
use careline_telemetry::TelemetryConfig;
use clap::{ArgAction, Parser, Subcommand};
use output::{format_duration, Status};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "careline-geo")]
#[command(about = "Caregiver proximity tools: distances, address lookup, session replay")]
#[command(version)]
struct Cli {
    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase output verbosity
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Great-circle distance between two points
    Distance {
        /// First latitude
        #[arg(allow_negative_numbers = true)]
        lat1: f64,
        /// First longitude
        #[arg(allow_negative_numbers = true)]
        lon1: f64,
        /// Second latitude
        #[arg(allow_negative_numbers = true)]
        lat2: f64,
        /// Second longitude
        #[arg(allow_negative_numbers = true)]
        lon2: f64,
        /// Also report whether the points are within this many meters
        #[arg(long)]
        threshold: Option<f64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Render a distance the way the arrival banner does
    Format {
        /// Distance in meters
        #[arg(allow_negative_numbers = true)]
        meters: f64,
    },

    /// Validate a Canadian postal code
    Postal {
        /// Postal code, with or without the space
        code: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Look up an address or postal code
    Resolve {
        /// Address text
        address: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Replay recorded worker samples through a proximity session
    Simulate {
        /// Client address to watch
        #[arg(long)]
        target: String,
        /// JSON array of {latitude, longitude, timestamp?} samples
        #[arg(long)]
        samples: PathBuf,
        /// Alert radius in meters (defaults to the configured threshold)
        #[arg(long)]
        threshold: Option<f64>,
        /// Known coordinate for the target as LAT,LON; skips the lookup
        #[arg(long, allow_hyphen_values = true)]
        target_coord: Option<Coordinate>,
        /// Output snapshots as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rank workers by distance from a point
    Rank {
        /// Origin as LAT,LON
        #[arg(long, allow_hyphen_values = true)]
        origin: Coordinate,
        /// JSON array of {id, coordinate: {latitude, longitude}}
        #[arg(long)]
        workers: PathBuf,
        /// Keep only the closest N
        #[arg(long)]
        limit: Option<usize>,
        /// Keep only workers within this many meters
        #[arg(long)]
        radius: Option<f64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        owo_colors::set_override(false);
    }

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            Status::error(&e.to_string());
            std::process::exit(exit_codes::CONFIG_ERROR);
        }
    };

    let telemetry = TelemetryConfig {
        log_level: config.schema.telemetry.log_level.clone(),
        json: config.schema.telemetry.json,
        ..TelemetryConfig::default()
    }
    .verbose(cli.verbose > 0);
    careline_telemetry::init_with_config(&telemetry)?;

    let exit_code = match cli.command {
        Commands::Distance {
            lat1,
            lon1,
            lat2,
            lon2,
            threshold,
            json,
        } => run_distance((lat1, lon1), (lat2, lon2), threshold, json)?,
        Commands::Format { meters } => {
            println!("{}", format_distance(meters));
            exit_codes::SUCCESS
        }
        Commands::Postal { code, json } => run_postal(&code, json),
        Commands::Resolve { address, json } => run_resolve(&config, &address, json).await?,
        Commands::Simulate {
            target,
            samples,
            threshold,
            target_coord,
            json,
        } => run_simulate(&config, &target, &samples, threshold, target_coord, json).await?,
        Commands::Rank {
            origin,
            workers,
            limit,
            radius,
            json,
        } => run_rank(origin, &workers, limit, radius, json)?,
    };

    std::process::exit(exit_code);
}

fn distance_report(a: &Coordinate, b: &Coordinate, threshold: Option<f64>) -> serde_json::Value {
    let meters = haversine_distance_meters(a, b);
    serde_json::json!({
        "from": a,
        "to": b,
        "distanceMeters": meters,
        "distanceFormatted": format_distance(meters),
        "thresholdMeters": threshold,
        "isWithinThreshold": threshold.map(|t| is_within_proximity(a, b, t)),
    })
}

fn run_distance(a: (f64, f64), b: (f64, f64), threshold: Option<f64>, json: bool) -> Result<i32> {
    let (a, b) = match (Coordinate::try_new(a.0, a.1), Coordinate::try_new(b.0, b.1)) {
        (Ok(a), Ok(b)) => (a, b),
        (Err(_), _) => return Ok(invalid_coordinate(a.0, a.1, json)),
        (_, Err(_)) => return Ok(invalid_coordinate(b.0, b.1, json)),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&distance_report(&a, &b, threshold))?);
    } else {
        let meters = haversine_distance_meters(&a, &b);
        let within = threshold.map(|t| is_within_proximity(&a, &b, t));
        println!("{} ({meters:.1} m)", format_distance(meters));
        match (threshold, within) {
            (Some(t), Some(true)) => Status::success(&format!("Within {}", format_distance(t))),
            (Some(t), Some(false)) => Status::info(&format!("Outside {}", format_distance(t))),
            _ => {}
        }
    }
    Ok(exit_codes::SUCCESS)
}

fn run_postal(code: &str, json: bool) -> i32 {
    let Ok(postal) = PostalCode::parse(code) else {
        Status::report(&CoreError::invalid_postal_code(code.trim()), json);
        return exit_codes::VALIDATION_ERROR;
    };

    if json {
        let report = serde_json::json!({ "postalCode": postal.to_string(), "fsa": postal.fsa() });
        println!("{report}");
    } else {
        println!("{postal}");
        println!("FSA: {}", postal.fsa());
    }
    exit_codes::SUCCESS
}

fn invalid_coordinate(latitude: f64, longitude: f64, json: bool) -> i32 {
    Status::report(&CoreError::invalid_coordinate(latitude, longitude), json);
    exit_codes::VALIDATION_ERROR
}

fn build_resolver(config: &Config) -> careline_core::Result<CoordinateResolver> {
    let geocoder = GeocoderConfig::from_section(&config.schema.geocoder);
    CoordinateResolver::from_config(geocoder).map_err(CoreError::from)
}

async fn run_resolve(config: &Config, address: &str, json: bool) -> Result<i32> {
    let resolver = match build_resolver(config) {
        Ok(resolver) => resolver,
        Err(e) => {
            Status::report(&e, json);
            return Ok(exit_codes::CONFIG_ERROR);
        }
    };
    let started = Instant::now();
    let resolution = resolver.resolve(address).await;
    let elapsed = started.elapsed();
    debug!(
        address,
        found = resolution.is_found(),
        elapsed_ms = elapsed.as_millis() as u64,
        "Resolve finished"
    );

    match resolution {
        Resolution::Found(place) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&place)?);
            } else {
                Status::success(&place.display_name);
                println!("{}", place.coordinate);
                Status::info(&format!("Resolved in {}", format_duration(elapsed)));
            }
            Ok(exit_codes::SUCCESS)
        }
        Resolution::NotFound => {
            if json {
                println!("null");
            } else {
                Status::warning(&format!("No coordinate found for {address:?}"));
            }
            Ok(exit_codes::NOT_FOUND)
        }
    }
}

fn read_samples(path: &Path) -> Result<Vec<WorkerSample>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read samples from {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid samples file {}", path.display()))
}

fn read_workers(path: &Path) -> Result<Vec<WorkerLocation>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read workers from {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid workers file {}", path.display()))
}

async fn run_simulate(
    config: &Config,
    target: &str,
    samples_path: &Path,
    threshold: Option<f64>,
    target_coord: Option<Coordinate>,
    json: bool,
) -> Result<i32> {
    let samples = read_samples(samples_path)?;
    let resolver = match build_resolver(config) {
        Ok(resolver) => resolver,
        Err(e) => {
            Status::report(&e, json);
            return Ok(exit_codes::CONFIG_ERROR);
        }
    };

    if let Some(coordinate) = target_coord {
        debug!(address = %target, %coordinate, "Seeding resolver cache with known target");
        resolver.cache().seed(
            target,
            GeocodeResult {
                coordinate,
                display_name: target.to_string(),
            },
        );
    }

    let proximity = &config.schema.proximity;
    let monitor =
        ProximityMonitor::with_config(Arc::new(resolver), MonitorConfig::from_section(proximity));
    let threshold = threshold.unwrap_or(proximity.threshold_meters);

    let started = monitor.start(target, threshold).await;
    if started.target_coordinate.is_none() {
        Status::warning(&format!(
            "Could not resolve {target:?}; proximity alerts are off for this session"
        ));
    }

    let (tx, rx) = mpsc::channel(samples.len().max(1));
    for sample in samples {
        tx.send(sample).await?;
    }
    drop(tx);

    let mut snapshots: Vec<ProximitySnapshot> = Vec::new();
    let last = drive_feed_with(&monitor, rx, |snapshot| snapshots.push(snapshot.clone())).await;
    info!(
        address = %target,
        samples = snapshots.len(),
        phase = %last.phase,
        alerted = last.has_alerted,
        "Replay finished"
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshots)?);
        return Ok(exit_codes::SUCCESS);
    }

    Status::header(&format!("Proximity replay: {target}"));
    let mut banner = ArrivalBanner::new(BannerConfig::from_section(proximity));
    let mut announced = false;
    for (index, snapshot) in snapshots.iter().enumerate() {
        Status::snapshot(index + 1, snapshot);
        let view = banner.observe(snapshot, Instant::now());
        if view.visible && !announced {
            if let Some(message) = &view.message {
                Status::success(message);
            }
            announced = true;
        }
    }

    if !last.has_alerted {
        Status::info("Caregiver never came within range");
    }
    Ok(exit_codes::SUCCESS)
}

fn run_rank(
    origin: Coordinate,
    workers_path: &Path,
    limit: Option<usize>,
    radius: Option<f64>,
    json: bool,
) -> Result<i32> {
    if !origin.is_valid() {
        return Ok(invalid_coordinate(origin.latitude, origin.longitude, json));
    }

    let workers = read_workers(workers_path)?;
    let mut ranked = match radius {
        Some(radius) => within_radius(&origin, &workers, radius),
        None => rank_by_distance(&origin, &workers, None),
    };
    if let Some(limit) = limit {
        ranked.truncate(limit);
    }
    debug!(workers = workers.len(), ranked = ranked.len(), ?radius, "Ranked workers");

    if json {
        println!("{}", serde_json::to_string_pretty(&ranked)?);
        return Ok(exit_codes::SUCCESS);
    }

    if ranked.is_empty() {
        Status::info("No workers in range");
        return Ok(exit_codes::SUCCESS);
    }

    Status::header(&format!("{} closest to {origin}", ranked.len()));
    for (rank, result) in ranked.iter().enumerate() {
        println!("{:>3}. {:<20} {}", rank + 1, result.id, format_distance(result.distance_meters));
    }
    Ok(exit_codes::SUCCESS)
}
