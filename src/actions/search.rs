//! Flight-search handlers: §6's `/api/flight-search/*` surface.
//!
//! Grounded on `actions/flights.rs`'s query-then-respond handler shape; the
//! partial-match semantics ("regex partial match, case-insensitive, quoted")
//! are implemented with the `regex` crate the teacher already depends on,
//! escaping the caller's query so it is matched as a literal substring rather
//! than interpreted as a pattern.

use axum::Json;
use axum::extract::{Path, Query, State};
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::model::{Flight, PredictedFlight};
use crate::web::AppState;

const SEARCH_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub real_flights: Vec<Flight>,
    pub predicted_flights: Vec<PredictedFlight>,
    pub total_real: usize,
    pub total_predicted: usize,
    pub search_type: &'static str,
    pub query: String,
}

fn partial_matcher(query: &str) -> Result<regex::Regex, AppError> {
    RegexBuilder::new(&regex::escape(query))
        .case_insensitive(true)
        .build()
        .map_err(|e| AppError::InputValidation(format!("invalid search query: {e}")))
}

/// Searches real `Flight`s by partial, case-insensitive match against
/// `planId` rendered as a string.
pub async fn search_by_plan_id(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, AppError> {
    let matcher = partial_matcher(&params.q)?;
    let real_flights: Vec<Flight> = state
        .flight_store
        .find_all(0, usize::MAX)
        .into_iter()
        .filter(|f| matcher.is_match(&f.plan_id.to_string()))
        .take(SEARCH_LIMIT)
        .collect();
    let predicted_flights: Vec<PredictedFlight> = state
        .prediction_store
        .find_all(0, usize::MAX)
        .into_iter()
        .filter(|p| matcher.is_match(&p.instance_id.to_string()))
        .take(SEARCH_LIMIT)
        .collect();

    Ok(Json(SearchResponse {
        total_real: real_flights.len(),
        total_predicted: predicted_flights.len(),
        real_flights,
        predicted_flights,
        search_type: "planId",
        query: params.q,
    }))
}

/// Searches by partial, case-insensitive match against `indicative`.
pub async fn search_by_indicative(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, AppError> {
    let matcher = partial_matcher(&params.q)?;
    let real_flights: Vec<Flight> = state
        .flight_store
        .find_all(0, usize::MAX)
        .into_iter()
        .filter(|f| matcher.is_match(&f.indicative))
        .take(SEARCH_LIMIT)
        .collect();
    let predicted_flights: Vec<PredictedFlight> = state
        .prediction_store
        .find_all(0, usize::MAX)
        .into_iter()
        .filter(|p| matcher.is_match(&p.indicative))
        .take(SEARCH_LIMIT)
        .collect();

    Ok(Json(SearchResponse {
        total_real: real_flights.len(),
        total_predicted: predicted_flights.len(),
        real_flights,
        predicted_flights,
        search_type: "indicative",
        query: params.q,
    }))
}

/// Searches by partial, case-insensitive match against `startPointIndicative`.
pub async fn search_by_origin(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, AppError> {
    let matcher = partial_matcher(&params.q)?;
    let real_flights: Vec<Flight> = state
        .flight_store
        .find_all(0, usize::MAX)
        .into_iter()
        .filter(|f| f.start_point_indicative.as_deref().is_some_and(|v| matcher.is_match(v)))
        .take(SEARCH_LIMIT)
        .collect();
    let predicted_flights: Vec<PredictedFlight> = state
        .prediction_store
        .find_all(0, usize::MAX)
        .into_iter()
        .filter(|p| p.start_point_indicative.as_deref().is_some_and(|v| matcher.is_match(v)))
        .take(SEARCH_LIMIT)
        .collect();

    Ok(Json(SearchResponse {
        total_real: real_flights.len(),
        total_predicted: predicted_flights.len(),
        real_flights,
        predicted_flights,
        search_type: "origin",
        query: params.q,
    }))
}

/// Searches by partial, case-insensitive match against `endPointIndicative`.
pub async fn search_by_destination(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, AppError> {
    let matcher = partial_matcher(&params.q)?;
    let real_flights: Vec<Flight> = state
        .flight_store
        .find_all(0, usize::MAX)
        .into_iter()
        .filter(|f| f.end_point_indicative.as_deref().is_some_and(|v| matcher.is_match(v)))
        .take(SEARCH_LIMIT)
        .collect();
    let predicted_flights: Vec<PredictedFlight> = state
        .prediction_store
        .find_all(0, usize::MAX)
        .into_iter()
        .filter(|p| p.end_point_indicative.as_deref().is_some_and(|v| matcher.is_match(v)))
        .take(SEARCH_LIMIT)
        .collect();

    Ok(Json(SearchResponse {
        total_real: real_flights.len(),
        total_predicted: predicted_flights.len(),
        real_flights,
        predicted_flights,
        search_type: "destination",
        query: params.q,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchDetailsResponse {
    pub real_flight: Option<Flight>,
    pub predicted_flight: Option<PredictedFlight>,
}

/// `planId` and `instanceId` share the same numeric identity (§4.9 match
/// rule), so one path parameter looks both documents up.
pub async fn search_details(
    State(state): State<AppState>,
    Path(plan_id): Path<i64>,
) -> Json<SearchDetailsResponse> {
    Json(SearchDetailsResponse {
        real_flight: state.flight_store.find_by_plan_id(plan_id),
        predicted_flight: state.prediction_store.find_by_instance_id(plan_id),
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub deleted: bool,
}

pub async fn delete_real_flight(State(state): State<AppState>, Path(plan_id): Path<i64>) -> Json<DeleteResponse> {
    Json(DeleteResponse {
        deleted: state.flight_store.delete_by_plan_id(plan_id),
    })
}

pub async fn delete_predicted_flight(
    State(state): State<AppState>,
    Path(instance_id): Path<i64>,
) -> Json<DeleteResponse> {
    Json(DeleteResponse {
        deleted: state.prediction_store.delete(instance_id),
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteRequest {
    #[serde(default)]
    pub real_flight_ids: Vec<i64>,
    #[serde(default)]
    pub predicted_flight_ids: Vec<i64>,
    #[serde(default)]
    pub delete_matching: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteResponse {
    pub deleted_real: usize,
    pub deleted_predicted: usize,
}

/// Bulk delete (§6). When `deleteMatching` is set, deleting a real flight
/// also deletes the prediction sharing its `planId`/`instanceId`, and vice
/// versa.
pub async fn bulk_delete(
    State(state): State<AppState>,
    Json(request): Json<BulkDeleteRequest>,
) -> Json<BulkDeleteResponse> {
    let mut deleted_real = 0usize;
    let mut deleted_predicted = 0usize;

    for id in &request.real_flight_ids {
        if state.flight_store.delete_by_plan_id(*id) {
            deleted_real += 1;
            if request.delete_matching && state.prediction_store.delete(*id) {
                deleted_predicted += 1;
            }
        }
    }
    for id in &request.predicted_flight_ids {
        if state.prediction_store.delete(*id) {
            deleted_predicted += 1;
            if request.delete_matching && state.flight_store.delete_by_plan_id(*id) {
                deleted_real += 1;
            }
        }
    }

    Json(BulkDeleteResponse {
        deleted_real,
        deleted_predicted,
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_real_flights: usize,
    pub total_predicted_flights: usize,
    pub unique_real_indicatives: usize,
    pub unique_predicted_indicatives: usize,
    pub matching_rate: f64,
}

/// `matchingRate` (not otherwise specified by the spec; see DESIGN.md's Open
/// Question resolutions): the fraction of real flights that have a
/// prediction sharing their `planId`/`instanceId`, `0.0` with no real
/// flights.
pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let total_real_flights = state.flight_store.count();
    let total_predicted_flights = state.prediction_store.count();
    let matched = state
        .flight_store
        .find_all(0, usize::MAX)
        .into_iter()
        .filter(|f| state.prediction_store.exists_by_instance_id(f.plan_id))
        .count();
    let matching_rate = if total_real_flights == 0 {
        0.0
    } else {
        matched as f64 / total_real_flights as f64
    };

    Json(StatsResponse {
        total_real_flights,
        total_predicted_flights,
        unique_real_indicatives: state.flight_store.unique_indicative_count(),
        unique_predicted_indicatives: state.prediction_store.unique_indicative_count(),
        matching_rate,
    })
}
