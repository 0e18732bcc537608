//! Analytics handlers: §6's punctuality-KPI and trajectory-accuracy
//! endpoints, both run over the same qualified-pair set C9 assembles.
//!
//! The trajectory-accuracy DTOs here exist only because automatic
//! `camelCase` rename would turn `horizontalRmseMeters`/`verticalRmse` out of
//! [`crate::trajectory_accuracy`]'s internal field names instead of the
//! acronym-preserving `horizontalRMSEMeters`/`verticalRMSE` §6 requires —
//! every field needs an explicit `#[serde(rename = "...")]`.

use std::time::Instant;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::error::AppError;
use crate::punctuality::{self, PunctualityReport};
use crate::qualify::collect_pairs;
use crate::trajectory_accuracy::{self, AggregateMetrics, FlightAccuracyResult};
use crate::web::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PunctualityKpisResponse {
    #[serde(flatten)]
    pub report: PunctualityReport,
    pub processing_time_ms: i64,
}

/// Runs §4.10 over every currently qualified, matched, geographically valid
/// pair. Not an audited pipeline operation — §3 names exactly three
/// `Operation` variants (ProcessRealData/SyncPredictedData/
/// DensifyPredictedData) and this read-only analytics run is not one of
/// them, so no `ProcessingHistory` record is opened for it.
pub async fn punctuality_kpis(
    State(state): State<AppState>,
) -> Result<Json<PunctualityKpisResponse>, AppError> {
    let start = Instant::now();
    let pairs = collect_pairs(&state.flight_store, &state.prediction_store);
    let report = punctuality::compute(&pairs);
    Ok(Json(PunctualityKpisResponse {
        report,
        processing_time_ms: start.elapsed().as_millis() as i64,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightAccuracyResultDto {
    pub plan_id: i64,
    pub predicted_indicative: String,
    pub point_count: usize,
    #[serde(rename = "horizontalRMSEMeters")]
    pub horizontal_rmse_meters: f64,
    #[serde(rename = "verticalRMSE")]
    pub vertical_rmse: f64,
    pub average_horizontal_error_meters: f64,
    pub average_vertical_error: f64,
    pub max_horizontal_error_meters: f64,
    pub max_vertical_error: f64,
}

impl From<&FlightAccuracyResult> for FlightAccuracyResultDto {
    fn from(r: &FlightAccuracyResult) -> Self {
        FlightAccuracyResultDto {
            plan_id: r.plan_id,
            predicted_indicative: r.predicted_indicative.clone(),
            point_count: r.point_count,
            horizontal_rmse_meters: r.horizontal_rmse_meters,
            vertical_rmse: r.vertical_rmse,
            average_horizontal_error_meters: r.average_horizontal_error_meters,
            average_vertical_error: r.average_vertical_error,
            max_horizontal_error_meters: r.max_horizontal_error_meters,
            max_vertical_error: r.max_vertical_error,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateMetricsDto {
    #[serde(rename = "horizontalRMSEMeters")]
    pub horizontal_rmse_meters: f64,
    #[serde(rename = "verticalRMSE")]
    pub vertical_rmse: f64,
    #[serde(rename = "minHorizontalRMSEMeters")]
    pub min_horizontal_rmse_meters: f64,
    #[serde(rename = "maxHorizontalRMSEMeters")]
    pub max_horizontal_rmse_meters: f64,
    #[serde(rename = "minVerticalRMSE")]
    pub min_vertical_rmse: f64,
    #[serde(rename = "maxVerticalRMSE")]
    pub max_vertical_rmse: f64,
    pub total_points_analyzed: usize,
}

impl From<&AggregateMetrics> for AggregateMetricsDto {
    fn from(m: &AggregateMetrics) -> Self {
        AggregateMetricsDto {
            horizontal_rmse_meters: m.horizontal_rmse_meters,
            vertical_rmse: m.vertical_rmse,
            min_horizontal_rmse_meters: m.min_horizontal_rmse_meters,
            max_horizontal_rmse_meters: m.max_horizontal_rmse_meters,
            min_vertical_rmse: m.min_vertical_rmse,
            max_vertical_rmse: m.max_vertical_rmse,
            total_points_analyzed: m.total_points_analyzed,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrajectoryAccuracyResponse {
    pub total_analyzed_flights: usize,
    pub total_qualified_flights: usize,
    pub aggregate_metrics: AggregateMetricsDto,
    pub flight_results: Vec<FlightAccuracyResultDto>,
    pub processing_time_ms: i64,
}

/// Runs §4.11 over every currently qualified, matched, geographically valid
/// pair. Same audit-exemption reasoning as [`punctuality_kpis`].
pub async fn trajectory_accuracy_run(
    State(state): State<AppState>,
) -> Result<Json<TrajectoryAccuracyResponse>, AppError> {
    let start = Instant::now();
    let pairs = collect_pairs(&state.flight_store, &state.prediction_store);
    let report = trajectory_accuracy::compute(&pairs);

    Ok(Json(TrajectoryAccuracyResponse {
        total_analyzed_flights: report.total_analyzed_flights,
        total_qualified_flights: report.total_qualified_flights,
        aggregate_metrics: AggregateMetricsDto::from(&report.aggregate_metrics),
        flight_results: report.flight_results.iter().map(FlightAccuracyResultDto::from).collect(),
        processing_time_ms: start.elapsed().as_millis() as i64,
    }))
}
