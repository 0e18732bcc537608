//! Pipeline step handlers: §6's Oracle-process / predicted-flights-sync /
//! trajectory-densification endpoints (steps 1-3 of the data-flow in §2).
//!
//! Grounded on `hut8-soar/src/actions/flights.rs`'s handler shape (`State`
//! extractor, a single response struct serialized whole) and on
//! `commands/ingest.rs`'s open-audit-record-then-complete-it wrapping around
//! the actual ingestion loop.

use std::time::Instant;

use axum::extract::{Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::actions::status_label;
use crate::densify::{self, DensifyOutcome};
use crate::error::AppError;
use crate::ingest::process_packet;
use crate::model::{Operation, ProcessingStatus};
use crate::packets::deserialize_packet;
use crate::prediction_ingest::extract_predictions;
use crate::web::AppState;

#[derive(Debug, Deserialize)]
pub struct ProcessStep1Params {
    pub date: Option<NaiveDate>,
    #[serde(rename = "startTime")]
    pub start_time: Option<String>,
    #[serde(rename = "endTime")]
    pub end_time: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessStep1Response {
    pub status: &'static str,
    pub total_flights_extracted: usize,
    pub total_flights_processed: usize,
    pub total_tracking_points: usize,
    pub processing_time_ms: i64,
    pub message: String,
}

/// Step 1 (§4.3/§4.6/§6): drains the configured `ReplaySource` once,
/// deserializing and ingesting every packet it yields. `date`/`startTime`/
/// `endTime` select which replay window the source should be primed with —
/// this crate's `ReplaySource` is pre-seeded per run (§5: "pull-based... a
/// single call per operation"), so these parameters only gate request
/// validation here and are carried into the audit record for the caller's
/// own record-keeping.
pub async fn process_step1(
    State(state): State<AppState>,
    Query(params): Query<ProcessStep1Params>,
) -> Result<Json<ProcessStep1Response>, AppError> {
    if params.start_time.is_some() != params.end_time.is_some() {
        return Err(AppError::InputValidation(
            "startTime and endTime must both be present or both absent".to_string(),
        ));
    }
    let date = params.date.unwrap_or(state.config.default_processing_date);

    let request_parameters = Some(format!(
        "date={date}&startTime={}&endTime={}",
        params.start_time.as_deref().unwrap_or(""),
        params.end_time.as_deref().unwrap_or("")
    ));
    let handle = state
        .audit
        .start(Operation::ProcessRealData, "/api/oracle/process", request_parameters);

    let start = Instant::now();
    let mut total_flights_extracted = 0usize;
    let mut total_flights_processed = 0usize;
    let mut total_tracking_points = 0usize;
    let mut total_errors = 0usize;

    loop {
        let next = {
            let mut source = state.replay_source.lock().await;
            source.next_packet().await
        };
        let (stored_timestamp, bytes) = match next {
            Ok(Some(packet)) => packet,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "replay source read failed");
                total_errors += 1;
                break;
            }
        };
        total_flights_extracted += 1;

        let Some(packet) = deserialize_packet(stored_timestamp, &bytes) else {
            total_errors += 1;
            continue;
        };

        let result = process_packet(&state.flight_store, &packet).await;
        total_flights_processed += result.new_flights + result.updated_flights;
        total_tracking_points += result.total_tracking_points_appended;
        total_errors += result.discarded_groups;
    }

    let processing_time_ms = start.elapsed().as_millis() as i64;
    let status = if total_errors == 0 {
        ProcessingStatus::Success
    } else {
        ProcessingStatus::PartialSuccess
    };
    let message = format!(
        "extracted={total_flights_extracted} processed={total_flights_processed} points={total_tracking_points} errors={total_errors}"
    );

    metrics::counter!("pipeline.step.records_processed", "step" => "process_real_data")
        .increment(total_flights_processed as u64);
    metrics::counter!("pipeline.step.records_skipped", "step" => "process_real_data").increment(0);
    metrics::counter!("pipeline.step.records_errored", "step" => "process_real_data")
        .increment(total_errors as u64);
    metrics::histogram!("pipeline.step.duration_seconds", "step" => "process_real_data")
        .record(start.elapsed().as_secs_f64());

    state.audit.complete(
        &handle,
        status,
        total_flights_processed as i64,
        total_errors as i64,
        Some(message.clone()),
        None,
    );

    Ok(Json(ProcessStep1Response {
        status: status_label(status),
        total_flights_extracted,
        total_flights_processed,
        total_tracking_points,
        processing_time_ms,
        message,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictedFlightsAutoSyncResponse {
    pub total_requested: usize,
    pub total_processed: usize,
    pub total_not_found: usize,
    pub total_errors: usize,
    pub processing_time_ms: i64,
    pub summary: String,
}

/// Step 2 (§4.7/§6): fetches predictions for every `planId` currently held
/// by the flight store from the configured `HistoricSource`.
pub async fn predicted_flights_auto_sync(
    State(state): State<AppState>,
) -> Result<Json<PredictedFlightsAutoSyncResponse>, AppError> {
    let handle = state.audit.start(
        Operation::SyncPredictedData,
        "/api/predicted-flights/auto-sync",
        None,
    );
    let start = Instant::now();

    let plan_ids: Vec<i64> = state
        .flight_store
        .find_all(0, usize::MAX)
        .into_iter()
        .map(|f| f.plan_id)
        .collect();

    let result = extract_predictions(state.historic_source.as_ref(), &state.prediction_store, &plan_ids).await;
    let processing_time_ms = start.elapsed().as_millis() as i64;

    let status = if result.total_errors == 0 {
        ProcessingStatus::Success
    } else {
        ProcessingStatus::PartialSuccess
    };
    let summary = format!(
        "requested={} extracted={} notFound={} errors={}",
        result.total_requested, result.total_extracted, result.total_not_found, result.total_errors
    );

    metrics::counter!("pipeline.step.records_processed", "step" => "sync_predicted_data")
        .increment(result.total_extracted as u64);
    metrics::counter!("pipeline.step.records_skipped", "step" => "sync_predicted_data")
        .increment(result.total_not_found as u64);
    metrics::counter!("pipeline.step.records_errored", "step" => "sync_predicted_data")
        .increment(result.total_errors as u64);
    metrics::histogram!("pipeline.step.duration_seconds", "step" => "sync_predicted_data")
        .record(start.elapsed().as_secs_f64());

    state.audit.complete(
        &handle,
        status,
        result.total_extracted as i64,
        result.total_errors as i64,
        Some(summary.clone()),
        None,
    );

    Ok(Json(PredictedFlightsAutoSyncResponse {
        total_requested: result.total_requested,
        total_processed: result.total_extracted,
        total_not_found: result.total_not_found,
        total_errors: result.total_errors,
        processing_time_ms,
        summary,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DensificationSummary {
    pub total_densified_elements: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DensificationAutoSyncResponse {
    pub total_requested: usize,
    pub total_processed: usize,
    pub summary: DensificationSummary,
    pub processing_time_ms: i64,
}

/// Step 3 (§4.8/§6): densifies every `PredictedFlight` whose matching
/// `Flight` carries more tracking points than it has route elements.
pub async fn densification_auto_sync(
    State(state): State<AppState>,
) -> Result<Json<DensificationAutoSyncResponse>, AppError> {
    let handle = state.audit.start(
        Operation::DensifyPredictedData,
        "/api/trajectory-densification/auto-sync",
        None,
    );
    let start = Instant::now();

    let plan_ids: Vec<i64> = state
        .prediction_store
        .find_all(0, usize::MAX)
        .into_iter()
        .map(|p| p.instance_id)
        .collect();

    let mut total_processed = 0usize;
    let mut total_densified_elements = 0usize;
    let mut total_skipped = 0usize;
    let mut total_errors = 0usize;

    for plan_id in &plan_ids {
        match densify::densify(
            *plan_id,
            &state.flight_store,
            &state.prediction_store,
            state.simulator.as_ref(),
        ) {
            DensifyOutcome::Success { point_count, .. } => {
                total_processed += 1;
                total_densified_elements += point_count;
            }
            DensifyOutcome::NoActionNeeded | DensifyOutcome::NotFound => {
                total_skipped += 1;
            }
            DensifyOutcome::Error { reason } => {
                tracing::warn!(plan_id, reason, "densification failed for plan");
                total_errors += 1;
            }
        }
    }

    metrics::counter!("pipeline.step.records_processed", "step" => "densify_predicted_data")
        .increment(total_processed as u64);
    metrics::counter!("pipeline.step.records_skipped", "step" => "densify_predicted_data")
        .increment(total_skipped as u64);
    metrics::counter!("pipeline.step.records_errored", "step" => "densify_predicted_data")
        .increment(total_errors as u64);
    metrics::histogram!("pipeline.step.duration_seconds", "step" => "densify_predicted_data")
        .record(start.elapsed().as_secs_f64());

    let processing_time_ms = start.elapsed().as_millis() as i64;
    let status = if total_errors == 0 {
        ProcessingStatus::Success
    } else {
        ProcessingStatus::PartialSuccess
    };

    state.audit.complete(
        &handle,
        status,
        total_processed as i64,
        total_errors as i64,
        Some(format!(
            "processed={total_processed} densifiedElements={total_densified_elements} errors={total_errors}"
        )),
        None,
    );

    Ok(Json(DensificationAutoSyncResponse {
        total_requested: plan_ids.len(),
        total_processed,
        summary: DensificationSummary {
            total_densified_elements,
        },
        processing_time_ms,
    }))
}
