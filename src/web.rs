//! Axum application wiring: shared state, middleware, and the route table
//! for the REST surface in §6.
//!
//! Grounded on `web.rs`'s `AppState`/`start_web_server` shape (request
//! logging + Sentry error-capture middleware, permissive CORS, a single
//! `Router` built once at startup); the static-asset fallback and
//! authentication routes are dropped since the dashboard is an out-of-scope
//! external consumer of this surface (§1) and there is no user-account
//! domain in this system.

use anyhow::Result;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post},
};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use uuid::Uuid;

use crate::actions;
use crate::audit::ProcessingHistoryStore;
use crate::config::Config;
use crate::flight_store::FlightStore;
use crate::prediction_store::PredictionStore;
use crate::sources::{HistoricSource, ReplaySource, TrajectorySimulator};

/// Prometheus scrape endpoint (ambient stack), rendering whatever
/// `metrics::init_metrics` installed at startup.
async fn metrics_handler() -> Response {
    match crate::metrics::render() {
        Some(body) => Response::builder()
            .status(StatusCode::OK)
            .header("content-type", "text/plain; version=0.0.4")
            .body(Body::from(body))
            .unwrap(),
        None => Response::builder()
            .status(StatusCode::SERVICE_UNAVAILABLE)
            .body(Body::empty())
            .unwrap(),
    }
}

/// Shared application state, injected once at startup (§9 "request-scoped
/// singletons"). The replay source is consumed by a single in-flight
/// `/api/oracle/process` call at a time — it is an exclusively-owned
/// pull-based stream, not a fan-out broadcast (§5).
#[derive(Clone)]
pub struct AppState {
    pub flight_store: FlightStore,
    pub prediction_store: PredictionStore,
    pub audit: ProcessingHistoryStore,
    pub config: Arc<Config>,
    pub replay_source: Arc<Mutex<Box<dyn ReplaySource>>>,
    pub historic_source: Arc<dyn HistoricSource>,
    pub simulator: Arc<dyn TrajectorySimulator>,
}

async fn request_logging_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = Uuid::new_v4().to_string()[..8].to_string();
    let start = Instant::now();

    info!("started {} {} [{}]", method, path, request_id);
    let response = next.run(request).await;
    let status = response.status();
    info!(
        "completed {} {} [{}] {} in {:.2}ms",
        method,
        path,
        request_id,
        status.as_u16(),
        start.elapsed().as_secs_f64() * 1000.0
    );
    response
}

async fn sentry_error_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let response = next.run(request).await;

    if response.status().is_server_error() {
        let status = response.status();
        error!("HTTP {} error on {} {}", status.as_u16(), method, uri);
        sentry::configure_scope(|scope| {
            scope.set_tag("http.method", method.as_str());
            scope.set_tag("http.url", uri.to_string());
            scope.set_tag("http.status_code", status.as_u16().to_string());
        });
        sentry::capture_message(
            &format!("HTTP {} error on {} {}", status.as_u16(), method, uri),
            sentry::Level::Error,
        );
    }
    response
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/api/oracle/process", post(actions::pipeline::process_step1))
        .route(
            "/api/predicted-flights/auto-sync",
            post(actions::pipeline::predicted_flights_auto_sync),
        )
        .route(
            "/api/trajectory-densification/auto-sync",
            post(actions::pipeline::densification_auto_sync),
        )
        .route("/api/punctuality/kpis", post(actions::analytics::punctuality_kpis))
        .route(
            "/api/trajectory-accuracy/run",
            post(actions::analytics::trajectory_accuracy_run),
        )
        .route(
            "/api/flight-search/by-plan-id",
            get(actions::search::search_by_plan_id),
        )
        .route(
            "/api/flight-search/by-indicative",
            get(actions::search::search_by_indicative),
        )
        .route(
            "/api/flight-search/by-origin",
            get(actions::search::search_by_origin),
        )
        .route(
            "/api/flight-search/by-destination",
            get(actions::search::search_by_destination),
        )
        .route(
            "/api/flight-search/details/{plan_id}",
            get(actions::search::search_details),
        )
        .route(
            "/api/flight-search/real/{plan_id}",
            delete(actions::search::delete_real_flight),
        )
        .route(
            "/api/flight-search/predicted/{instance_id}",
            delete(actions::search::delete_predicted_flight),
        )
        .route("/api/flight-search/bulk-delete", post(actions::search::bulk_delete))
        .route("/api/flight-search/stats", get(actions::search::stats))
        .route("/api/processing-history", get(actions::history::processing_history))
        .route(
            "/api/maintenance/flights/{plan_id}/dedup-cleanup",
            post(actions::history::dedup_cleanup),
        )
        .route(
            "/api/maintenance/processing-history/cleanup",
            post(actions::history::processing_history_cleanup),
        )
        .route("/api/health", get(actions::history::health))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(middleware::from_fn(sentry_error_middleware))
        .layer(cors)
}

pub async fn serve(state: AppState, bind_address: std::net::IpAddr, bind_port: u16) -> Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind((bind_address, bind_port)).await?;
    info!("listening on http://{}:{}", bind_address, bind_port);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Maps a non-2xx status into the `{"status": "DOWN"}` / `{"status": "UP"}`
/// health payload shape used by `/api/health` (§6).
pub fn health_status(is_up: bool) -> StatusCode {
    if is_up { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE }
}
