//! Process entry point: a `clap`-derived CLI with a `serve` subcommand that
//! starts the REST server, and a `pipeline` subcommand group that invokes
//! C6/C7/C8/C10/C11 out-of-band against local JSON fixture files, for
//! operator-driven local testing the way the teacher exposes pipeline steps
//! both over the wire and as standalone commands (`commands::handle_run`/
//! `handle_ingest`). The teacher's own `main.rs` was a stale, unrelated
//! `sqlx::PgPool` stub never wired into its command dispatch and was not
//! used as grounding for this file; tracing/Sentry/allocator wiring follow
//! the crates this repo's Cargo.toml already depends on, in the idiom
//! `hut8-soar`'s `web.rs`/`metrics.rs` use them elsewhere.

mod actions;
mod audit;
mod config;
mod densify;
mod error;
mod flight_store;
mod geo;
mod ingest;
mod log_format;
mod metrics;
mod model;
mod packets;
mod prediction_ingest;
mod prediction_store;
mod punctuality;
mod qualify;
mod sources;
mod timestamp;
mod trajectory_accuracy;
mod web;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use audit::ProcessingHistoryStore;
use config::Config;
use flight_store::FlightStore;
use model::PredictedFlight;
use packets::ReplayPath;
use prediction_store::PredictionStore;
use sources::{MapHistoricSource, NullSimulator, VecReplaySource};
use web::AppState;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser)]
#[command(name = "flightfusion", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Starts the REST server (§6).
    Serve,
    /// Runs one pipeline step against local JSON fixtures, without starting
    /// the REST server.
    #[command(subcommand)]
    Pipeline(PipelineStep),
}

#[derive(Subcommand)]
enum PipelineStep {
    /// Step 1 (§4.6): replays a JSON array of `ReplayPath` packets into a
    /// fresh flight store.
    ProcessRealData {
        #[arg(long)]
        packets_file: PathBuf,
    },
    /// Step 2 (§4.7): extracts predictions for every `planId` found in
    /// `flights_file` from a `historic_file` fixture acting as the
    /// `HistoricSource`.
    SyncPredictedData {
        #[arg(long)]
        flights_file: PathBuf,
        #[arg(long)]
        historic_file: PathBuf,
    },
    /// Step 3 (§4.8): densifies every prediction in `predictions_file`
    /// against the matching flight in `flights_file`.
    Densify {
        #[arg(long)]
        flights_file: PathBuf,
        #[arg(long)]
        predictions_file: PathBuf,
    },
    /// Runs §4.10 over the qualified pairs found across both fixtures.
    PunctualityKpis {
        #[arg(long)]
        flights_file: PathBuf,
        #[arg(long)]
        predictions_file: PathBuf,
    },
    /// Runs §4.11 over the qualified pairs found across both fixtures.
    TrajectoryAccuracy {
        #[arg(long)]
        flights_file: PathBuf,
        #[arg(long)]
        predictions_file: PathBuf,
    },
    /// Legacy-dedup cleanup maintenance operation (§4.4) for one `planId`.
    DedupCleanup {
        #[arg(long)]
        flights_file: PathBuf,
        #[arg(long)]
        plan_id: i64,
    },
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .event_format(log_format::TargetFirstFormat)
                .with_ansi(true),
        )
        .with(sentry_tracing::layer())
        .init();
}

fn load_json<T: serde::de::DeserializeOwned>(path: &PathBuf) -> Result<T> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parsing {} as JSON", path.display()))
}

fn load_flight_store(path: &PathBuf) -> Result<FlightStore> {
    let flights: Vec<model::Flight> = load_json(path)?;
    let store = FlightStore::new();
    for flight in flights {
        store.upsert(flight);
    }
    Ok(store)
}

fn load_prediction_store(path: &PathBuf) -> Result<PredictionStore> {
    let predictions: Vec<PredictedFlight> = load_json(path)?;
    let store = PredictionStore::new();
    for prediction in predictions {
        store.save(prediction);
    }
    Ok(store)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    let _sentry_guard = config.sentry_dsn.as_ref().map(|dsn| {
        sentry::init((
            dsn.as_str(),
            sentry::ClientOptions {
                release: sentry::release_name!(),
                traces_sample_rate: 0.1,
                ..Default::default()
            },
        ))
    });

    init_tracing();

    match cli.command {
        Command::Serve => run_serve(config).await,
        Command::Pipeline(step) => run_pipeline(step).await,
    }
}

async fn run_serve(config: Config) -> Result<()> {
    metrics::init_metrics();
    tokio::spawn(metrics::process_metrics_task());

    let state = AppState {
        flight_store: FlightStore::new(),
        prediction_store: PredictionStore::new(),
        audit: ProcessingHistoryStore::new(),
        config: Arc::new(config.clone()),
        replay_source: Arc::new(Mutex::new(Box::new(VecReplaySource::new(Vec::new())))),
        historic_source: Arc::new(MapHistoricSource::default()),
        simulator: Arc::new(NullSimulator),
    };
    web::serve(state, config.bind_address, config.bind_port).await
}

async fn run_pipeline(step: PipelineStep) -> Result<()> {
    match step {
        PipelineStep::ProcessRealData { packets_file } => {
            let packets: Vec<ReplayPath> = load_json(&packets_file)?;
            let store = FlightStore::new();
            for packet in &packets {
                let result = ingest::process_packet(&store, packet).await;
                println!("{result:#?}");
            }
        }
        PipelineStep::SyncPredictedData {
            flights_file,
            historic_file,
        } => {
            let flight_store = load_flight_store(&flights_file)?;
            let fixtures: Vec<PredictedFlight> = load_json(&historic_file)?;
            let source = MapHistoricSource::new(fixtures);
            let prediction_store = PredictionStore::new();
            let plan_ids: Vec<i64> = flight_store.find_all(0, usize::MAX).into_iter().map(|f| f.plan_id).collect();
            let result = prediction_ingest::extract_predictions(&source, &prediction_store, &plan_ids).await;
            println!("{result:#?}");
        }
        PipelineStep::Densify {
            flights_file,
            predictions_file,
        } => {
            let flight_store = load_flight_store(&flights_file)?;
            let prediction_store = load_prediction_store(&predictions_file)?;
            let simulator = NullSimulator;
            let plan_ids: Vec<i64> = prediction_store
                .find_all(0, usize::MAX)
                .into_iter()
                .map(|p| p.instance_id)
                .collect();
            for plan_id in plan_ids {
                let outcome = densify::densify(plan_id, &flight_store, &prediction_store, &simulator);
                println!("{plan_id}: {outcome:#?}");
            }
        }
        PipelineStep::PunctualityKpis {
            flights_file,
            predictions_file,
        } => {
            let flight_store = load_flight_store(&flights_file)?;
            let prediction_store = load_prediction_store(&predictions_file)?;
            let pairs = qualify::collect_pairs(&flight_store, &prediction_store);
            let report = punctuality::compute(&pairs);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        PipelineStep::TrajectoryAccuracy {
            flights_file,
            predictions_file,
        } => {
            let flight_store = load_flight_store(&flights_file)?;
            let prediction_store = load_prediction_store(&predictions_file)?;
            let pairs = qualify::collect_pairs(&flight_store, &prediction_store);
            let report = trajectory_accuracy::compute(&pairs);
            println!("{report:#?}");
        }
        PipelineStep::DedupCleanup { flights_file, plan_id } => {
            let flight_store = load_flight_store(&flights_file)?;
            let result = flight_store
                .dedup_cleanup(plan_id)
                .with_context(|| format!("no Flight for planId {plan_id}"))?;
            println!("{result:#?}");
        }
    }
    Ok(())
}
