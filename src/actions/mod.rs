//! REST handlers for the surface in §6.
//!
//! Grounded on `hut8-soar/src/actions/mod.rs`'s module-per-resource layout
//! (`pub mod` per handler group, `json_error` kept as a shared helper for
//! one-off error responses). Each submodule here owns one group of §6
//! endpoints and mirrors `actions/flights.rs`'s handler shape: `State`/
//! `Query`/`Path` extractors, a typed response struct serialized as the
//! whole response body.

pub mod analytics;
pub mod history;
pub mod pipeline;
pub mod search;

use crate::model::ProcessingStatus;

/// Renders a `ProcessingStatus` the way §3's `ProcessingHistory.status`
/// wire shape does (`SCREAMING_SNAKE_CASE`), for embedding directly in a
/// pipeline-step response's `status` field (§6).
pub(crate) fn status_label(status: ProcessingStatus) -> &'static str {
    match status {
        ProcessingStatus::InProgress => "IN_PROGRESS",
        ProcessingStatus::Success => "SUCCESS",
        ProcessingStatus::PartialSuccess => "PARTIAL_SUCCESS",
        ProcessingStatus::Failure => "FAILURE",
    }
}
