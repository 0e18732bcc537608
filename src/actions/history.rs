//! Processing-history, maintenance, and health handlers (§6).
//!
//! Grounded on `actions/flights.rs`'s handler shape; the health check mirrors
//! `web.rs`'s own liveness-only contract (no dependency ping — there is no
//! external document store this crate itself manages the connection to).

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::model::ProcessingHistory;
use crate::web::AppState;

const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

/// Most recent `ProcessingHistory` records, newest first (§4.12).
pub async fn processing_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryQuery>,
) -> Json<Vec<ProcessingHistory>> {
    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    Json(state.audit.recent(limit))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DedupCleanupResponse {
    pub plan_id: i64,
    pub points_before: usize,
    pub points_after: usize,
    pub removed: usize,
}

/// Legacy-dedup cleanup maintenance operation (§4.4).
pub async fn dedup_cleanup(
    State(state): State<AppState>,
    Path(plan_id): Path<i64>,
) -> Result<Json<DedupCleanupResponse>, AppError> {
    let result = state
        .flight_store
        .dedup_cleanup(plan_id)
        .ok_or_else(|| AppError::NotFound(format!("no Flight for planId {plan_id}")))?;

    Ok(Json(DedupCleanupResponse {
        plan_id,
        points_before: result.points_before,
        points_after: result.points_after,
        removed: result.points_before - result.points_after,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ProcessingHistoryCleanupQuery {
    #[serde(rename = "olderThanDays")]
    pub older_than_days: i64,
}

#[derive(Debug, Serialize)]
pub struct ProcessingHistoryCleanupResponse {
    pub removed: usize,
}

/// Audit-log retention cleanup (§4.12): removes records older than
/// `olderThanDays` days.
pub async fn processing_history_cleanup(
    State(state): State<AppState>,
    Query(params): Query<ProcessingHistoryCleanupQuery>,
) -> Result<Json<ProcessingHistoryCleanupResponse>, AppError> {
    if params.older_than_days < 0 {
        return Err(AppError::InputValidation("olderThanDays must not be negative".to_string()));
    }
    let cutoff = chrono::Utc::now() - chrono::Duration::days(params.older_than_days);
    let removed = state.audit.cleanup_older_than(cutoff);
    Ok(Json(ProcessingHistoryCleanupResponse { removed }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Liveness check (§6). This process owns no external connection whose
/// reachability would make `"DOWN"` meaningful at request time — the
/// document store and the replay/historic/simulator collaborators are
/// either in-process or pull-based per call — so readiness here always
/// reports `"UP"` once routing has dispatched the request, mirroring
/// `ProcessingHistoryStore`'s own always-available in-memory backing.
pub async fn health() -> (StatusCode, Json<HealthResponse>) {
    (StatusCode::OK, Json(HealthResponse { status: "UP" }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn health_reports_up() {
        let (status, Json(body)) = health().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "UP");
    }
}
