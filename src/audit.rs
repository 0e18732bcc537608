//! Operation audit log (C12): one record per externally triggered
//! operation, opened at `IN_PROGRESS` and mutated exactly once to a
//! terminal status.
//!
//! Grounded on `analytics_repo.rs`'s query-method surface (date-ranged,
//! paged, aggregate-stats queries over a flat record set) translated from
//! diesel `sql_query` rows to an in-memory `DashMap`, since the document
//! store is an opaque persistence capability here (§1).

use crate::model::{Operation, ProcessingHistory, ProcessingStatus};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Instant;

/// A handle returned by [`ProcessingHistoryStore::start`]; the caller holds
/// this for the duration of the operation and passes it to `complete`.
pub struct AuditHandle {
    pub id: i64,
    started_at: Instant,
}

#[derive(Debug, Clone, Default)]
pub struct OperationStats {
    pub success: i64,
    pub partial_success: i64,
    pub failure: i64,
    pub in_progress: i64,
}

impl OperationStats {
    /// `(success + partialSuccess) / (success + partialSuccess + failure)`,
    /// `0.0` when the denominator is zero (§4.12).
    pub fn success_rate(&self) -> f64 {
        let denom = self.success + self.partial_success + self.failure;
        if denom == 0 {
            0.0
        } else {
            (self.success + self.partial_success) as f64 / denom as f64
        }
    }
}

#[derive(Clone)]
pub struct ProcessingHistoryStore {
    records: Arc<DashMap<i64, ProcessingHistory>>,
    next_id: Arc<AtomicI64>,
}

impl Default for ProcessingHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessingHistoryStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(DashMap::new()),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }

    /// Opens a new record at `IN_PROGRESS` and returns a handle the caller
    /// uses to report the terminal outcome.
    pub fn start(
        &self,
        operation: Operation,
        endpoint: &str,
        request_parameters: Option<String>,
    ) -> AuditHandle {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let record = ProcessingHistory {
            id,
            timestamp: Utc::now().timestamp_millis(),
            operation,
            endpoint: endpoint.to_string(),
            status: ProcessingStatus::InProgress,
            duration_ms: None,
            records_processed: 0,
            records_with_errors: 0,
            details: None,
            error_message: None,
            request_parameters,
        };
        self.records.insert(id, record);
        AuditHandle {
            id,
            started_at: Instant::now(),
        }
    }

    /// Terminal update. `status` should be `Success` or `PartialSuccess`
    /// (never recomputed here — callers decide based on whether
    /// `records_with_errors > 0`, per §4.12) when the operation completed,
    /// or `Failure` with `error_message` set when it did not.
    #[allow(clippy::too_many_arguments)]
    pub fn complete(
        &self,
        handle: &AuditHandle,
        status: ProcessingStatus,
        records_processed: i64,
        records_with_errors: i64,
        details: Option<String>,
        error_message: Option<String>,
    ) {
        if let Some(mut record) = self.records.get_mut(&handle.id) {
            record.status = status;
            record.records_processed = records_processed;
            record.records_with_errors = records_with_errors;
            record.details = details;
            record.error_message = error_message;
            record.duration_ms = Some(handle.started_at.elapsed().as_millis() as i64);
        }
    }

    /// Most recent records first, paged.
    pub fn recent(&self, limit: usize) -> Vec<ProcessingHistory> {
        let mut all: Vec<ProcessingHistory> =
            self.records.iter().map(|r| r.value().clone()).collect();
        all.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        all.into_iter().take(limit).collect()
    }

    pub fn filter_by_operation(&self, operation: Operation) -> Vec<ProcessingHistory> {
        let mut matches: Vec<ProcessingHistory> = self
            .records
            .iter()
            .filter(|r| r.operation == operation)
            .map(|r| r.value().clone())
            .collect();
        matches.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        matches
    }

    pub fn filter_by_status(&self, status: ProcessingStatus) -> Vec<ProcessingHistory> {
        let mut matches: Vec<ProcessingHistory> = self
            .records
            .iter()
            .filter(|r| r.status == status)
            .map(|r| r.value().clone())
            .collect();
        matches.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        matches
    }

    pub fn today(&self, now: DateTime<Utc>) -> Vec<ProcessingHistory> {
        let today = now.date_naive();
        let mut matches: Vec<ProcessingHistory> = self
            .records
            .iter()
            .filter(|r| {
                DateTime::from_timestamp_millis(r.timestamp)
                    .map(|ts| ts.date_naive() == today)
                    .unwrap_or(false)
            })
            .map(|r| r.value().clone())
            .collect();
        matches.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        matches
    }

    /// Counts per status and per operation across every record.
    pub fn statistics(&self) -> OperationStats {
        let mut stats = OperationStats::default();
        for r in self.records.iter() {
            match r.status {
                ProcessingStatus::Success => stats.success += 1,
                ProcessingStatus::PartialSuccess => stats.partial_success += 1,
                ProcessingStatus::Failure => stats.failure += 1,
                ProcessingStatus::InProgress => stats.in_progress += 1,
            }
        }
        stats
    }

    /// Explicit retention cleanup: removes entries older than `cutoff`.
    /// Returns the number of records removed.
    pub fn cleanup_older_than(&self, cutoff: DateTime<Utc>) -> usize {
        let cutoff_millis = cutoff.timestamp_millis();
        let stale: Vec<i64> = self
            .records
            .iter()
            .filter(|r| r.timestamp < cutoff_millis)
            .map(|r| r.id)
            .collect();
        for id in &stale {
            self.records.remove(id);
        }
        stale.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_then_complete_sets_terminal_status() {
        let store = ProcessingHistoryStore::new();
        let handle = store.start(Operation::ProcessRealData, "/api/oracle/process", None);
        store.complete(&handle, ProcessingStatus::Success, 10, 0, None, None);

        let record = store.recent(1).into_iter().next().unwrap();
        assert_eq!(record.status, ProcessingStatus::Success);
        assert_eq!(record.records_processed, 10);
        assert!(record.duration_ms.is_some());
    }

    #[test]
    fn statistics_counts_success_rate() {
        let store = ProcessingHistoryStore::new();
        let h1 = store.start(Operation::ProcessRealData, "/a", None);
        store.complete(&h1, ProcessingStatus::Success, 1, 0, None, None);
        let h2 = store.start(Operation::ProcessRealData, "/a", None);
        store.complete(&h2, ProcessingStatus::Failure, 0, 1, None, Some("boom".into()));

        let stats = store.statistics();
        assert_eq!(stats.success, 1);
        assert_eq!(stats.failure, 1);
        assert!((stats.success_rate() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn cleanup_removes_entries_older_than_cutoff() {
        let store = ProcessingHistoryStore::new();
        let handle = store.start(Operation::SyncPredictedData, "/b", None);
        store.complete(&handle, ProcessingStatus::Success, 1, 0, None, None);

        // Cutoff far in the future should sweep everything.
        let removed = store.cleanup_older_than(Utc::now() + chrono::Duration::days(1));
        assert_eq!(removed, 1);
        assert!(store.recent(10).is_empty());
    }
}
