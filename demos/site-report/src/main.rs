//! site-report — query the site accessibility engine from the command line.
//!
//! Every subcommand prints one JSON document on stdout; logs go to stderr
//! and are filtered with `RUST_LOG` (default `info`).
//!
//! ```text
//! site-report --data-root /srv/sitex rings --lat 27.7172 --lon 85.3240 --radii 0.5,1,2
//! site-report nearby --lat 27.7172 --lon 85.3240 --category banks --limit 5
//! site-report features --lat 27.7172 --lon 85.3240 --with-roads
//! ```

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sa_analysis::{AnalysisConfig, AnalysisQuery, DistanceMode, SiteAnalysis};
use sa_core::GeoPoint;

// ── Command line ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "site-report")]
#[command(about = "Road-network and POI accessibility reports for a location")]
struct Cli {
    /// JSON configuration file; unset keys keep their defaults
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Base directory holding `Data/`
    #[arg(long, global = true)]
    data_root: Option<PathBuf>,

    /// Road GeoJSON (default `<data-root>/Data/Roadway.geojson`)
    #[arg(long, global = true)]
    road_geojson: Option<PathBuf>,

    /// Do not read or write on-disk network caches
    #[arg(long, global = true)]
    no_cache: bool,

    /// Pretty-print the JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct Location {
    #[arg(long, allow_hyphen_values = true)]
    lat: f64,

    #[arg(long, allow_hyphen_values = true)]
    lon: f64,
}

#[derive(Args, Debug)]
struct QueryArgs {
    #[command(flatten)]
    at: Location,

    /// Decay scale in km (non-positive disables decay)
    #[arg(long, allow_hyphen_values = true)]
    decay: Option<f64>,

    /// auto, haversine or network
    #[arg(long)]
    mode: Option<DistanceMode>,

    /// Ignore the road network entirely
    #[arg(long)]
    haversine_only: bool,

    /// Restrict to these categories (repeatable)
    #[arg(long = "category")]
    categories: Vec<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Counts, decayed weights and shares per ring
    Rings {
        #[command(flatten)]
        query: QueryArgs,

        /// Comma-separated radii in km
        #[arg(long, value_delimiter = ',')]
        radii: Vec<f64>,
    },

    /// Nearest POIs per category
    Nearby {
        #[command(flatten)]
        query: QueryArgs,

        #[arg(long, default_value_t = 1.0)]
        radius: f64,

        #[arg(long)]
        limit: Option<usize>,
    },

    /// Own-category competition index
    Competition {
        #[command(flatten)]
        query: QueryArgs,

        /// Radius in km (default: configured primary radius)
        #[arg(long)]
        radius: Option<f64>,
    },

    /// Composite index and flat feature map
    Features {
        #[command(flatten)]
        query: QueryArgs,

        /// Radius in km (default: configured primary radius)
        #[arg(long)]
        radius: Option<f64>,

        /// Include road accessibility
        #[arg(long)]
        with_roads: bool,

        /// Print only the flat feature map
        #[arg(long)]
        flat: bool,
    },

    /// Reachable road types and accessibility score
    Roads {
        #[command(flatten)]
        at: Location,

        /// Radius in km (default: configured primary radius)
        #[arg(long)]
        radius: Option<f64>,

        #[arg(long, allow_hyphen_values = true)]
        decay: Option<f64>,
    },

    /// Road-following polyline from the location to a point
    Path {
        #[command(flatten)]
        at: Location,

        #[arg(long, allow_hyphen_values = true)]
        to_lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        to_lon: f64,
    },
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn load_config(cli: &Cli) -> Result<AnalysisConfig> {
    let mut config = match &cli.config {
        Some(path) => AnalysisConfig::from_path(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => AnalysisConfig::default(),
    };
    if let Some(root) = &cli.data_root {
        config.data_root = root.clone();
    }
    if let Some(roads) = &cli.road_geojson {
        config.road_geojson = Some(roads.clone());
    }
    if cli.no_cache {
        config.network_cache = false;
    }
    config.validate()?;
    Ok(config)
}

fn location(at: &Location) -> Result<GeoPoint> {
    let p = GeoPoint::new(at.lat, at.lon);
    if !p.is_valid() {
        bail!("invalid coordinate: lat={} lon={}", at.lat, at.lon);
    }
    Ok(p)
}

fn build_query(config: &AnalysisConfig, args: &QueryArgs) -> Result<AnalysisQuery> {
    let mut q = config.query(location(&args.at)?);
    if let Some(decay) = args.decay {
        q = q.decay_scale_km(decay);
    }
    if let Some(mode) = args.mode {
        q = q.mode(mode);
    }
    if args.haversine_only {
        q = q.include_network(false);
    }
    if !args.categories.is_empty() {
        q = q.categories(args.categories.iter().cloned());
    }
    Ok(q)
}

fn emit<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let text = if pretty { serde_json::to_string_pretty(value)? } else { serde_json::to_string(value)? };
    println!("{text}");
    Ok(())
}

// ── Main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let svc = SiteAnalysis::new(config).context("initialising site analysis")?;
    let started = Instant::now();

    match &cli.command {
        Command::Rings { query, radii } => {
            let mut q = build_query(svc.config(), query)?;
            if !radii.is_empty() {
                q = q.radii(radii.clone());
            }
            emit(&svc.ring_summary(&q)?, cli.pretty)?;
        }
        Command::Nearby { query, radius, limit } => {
            let mut q = build_query(svc.config(), query)?.radius(*radius);
            if let Some(limit) = limit {
                q = q.limit(*limit);
            }
            emit(&svc.nearby(&q)?, cli.pretty)?;
        }
        Command::Competition { query, radius } => {
            let q = build_query(svc.config(), query)?;
            let index = match radius {
                Some(r) => svc.competition_index(&q, *r)?,
                None => svc.primary_competition_index(&q)?,
            };
            emit(&index, cli.pretty)?;
        }
        Command::Features { query, radius, with_roads, flat } => {
            let q = build_query(svc.config(), query)?;
            let payload = match radius {
                Some(r) => svc.composite_index(&q, *r, *with_roads)?,
                None => svc.primary_features(&q, *with_roads)?,
            };
            if *flat {
                emit(&payload.flat_features(), cli.pretty)?;
            } else {
                emit(&payload, cli.pretty)?;
            }
        }
        Command::Roads { at, radius, decay } => {
            let decay = decay.unwrap_or(svc.config().decay_scale_km);
            let radius = radius.unwrap_or(svc.config().primary_radius_km);
            let report = svc.road_accessibility(location(at)?, radius, decay)?;
            emit(&report, cli.pretty)?;
        }
        Command::Path { at, to_lat, to_lon } => {
            let to = GeoPoint::new(*to_lat, *to_lon);
            let path = svc.path_between(location(at)?, to);
            emit(&path, cli.pretty)?;
        }
    }

    info!(elapsed_ms = started.elapsed().as_millis() as u64, "done");
    Ok(())
}
