//! Prediction store (C5): upsert of predicted-flight documents keyed by
//! `instanceId`.
//!
//! Same grounding and concurrency idiom as [`crate::flight_store`]: an
//! `Arc<DashMap<…>>` in place of the teacher's `AircraftStatesMap`, with the
//! repository method surface (`findByInstanceId`, `existsByInstanceId`,
//! `saveAll`…) modeled on `analytics_repo.rs`'s query shape.

use crate::model::PredictedFlight;
use dashmap::DashMap;
use std::sync::Arc;

/// Outcome of a batch save (§4.5): individual retry on batch failure is
/// required, so the result separates what actually persisted from what
/// failed per-item.
#[derive(Debug, Clone, Default)]
pub struct BatchSaveResult {
    pub saved: usize,
    pub failed: Vec<i64>,
}

#[derive(Clone)]
pub struct PredictionStore {
    by_instance_id: Arc<DashMap<i64, PredictedFlight>>,
}

impl Default for PredictionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PredictionStore {
    pub fn new() -> Self {
        Self {
            by_instance_id: Arc::new(DashMap::new()),
        }
    }

    pub fn find_by_instance_id(&self, instance_id: i64) -> Option<PredictedFlight> {
        self.by_instance_id.get(&instance_id).map(|r| r.clone())
    }

    pub fn exists_by_instance_id(&self, instance_id: i64) -> bool {
        self.by_instance_id.contains_key(&instance_id)
    }

    pub fn count(&self) -> usize {
        self.by_instance_id.len()
    }

    /// Number of distinct `indicative` values across every stored prediction
    /// (flight-search stats, §6). Predictions have no secondary index by
    /// indicative — this store is read-heavy for lookups by id, not by
    /// callsign — so this walks the full collection.
    pub fn unique_indicative_count(&self) -> usize {
        use std::collections::HashSet;
        self.by_instance_id
            .iter()
            .map(|r| r.value().indicative.clone())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Single upsert, used by C8's densification rewrite.
    pub fn save(&self, prediction: PredictedFlight) {
        self.by_instance_id.insert(prediction.instance_id, prediction);
    }

    /// Batch upsert (C7). A prediction with `instanceId == 0` violates the
    /// mandatory-field invariant (§7 DataIntegrity) and is recorded as
    /// failed rather than aborting the whole batch — the per-item retry
    /// fallback the spec requires.
    pub fn save_all(&self, predictions: Vec<PredictedFlight>) -> BatchSaveResult {
        let mut result = BatchSaveResult::default();
        for prediction in predictions {
            if prediction.instance_id == 0 {
                result.failed.push(prediction.instance_id);
                continue;
            }
            self.save(prediction);
            result.saved += 1;
        }
        result
    }

    pub fn delete(&self, instance_id: i64) -> bool {
        self.by_instance_id.remove(&instance_id).is_some()
    }

    pub fn find_all(&self, page: usize, page_size: usize) -> Vec<PredictedFlight> {
        let mut all: Vec<PredictedFlight> =
            self.by_instance_id.iter().map(|r| r.value().clone()).collect();
        all.sort_by_key(|p| p.instance_id);
        all.into_iter().skip(page * page_size).take(page_size).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RouteElementType;

    fn prediction(instance_id: i64) -> PredictedFlight {
        PredictedFlight {
            instance_id,
            route_id: None,
            indicative: "TST1".into(),
            aircraft_type: None,
            airline: None,
            start_point_indicative: None,
            end_point_indicative: None,
            cruise_level: None,
            cruise_speed: None,
            time: "[a,b]".into(),
            flight_plan_date: None,
            current_date_time_of_arrival: None,
            route_elements: vec![
                crate::model::RouteElement {
                    indicative: "SBSP".into(),
                    element_type: RouteElementType::Aerodrome,
                    latitude: 0.0,
                    longitude: 0.0,
                    level_meters: None,
                    altitude: None,
                    speed_meter_per_second: None,
                    eet_minutes: 0.0,
                    sequence_number: 0,
                    interpolated: false,
                    coordinate_text: None,
                },
                crate::model::RouteElement {
                    indicative: "SBRJ".into(),
                    element_type: RouteElementType::Aerodrome,
                    latitude: 1.0,
                    longitude: 1.0,
                    level_meters: None,
                    altitude: None,
                    speed_meter_per_second: None,
                    eet_minutes: 60.0,
                    sequence_number: 1,
                    interpolated: false,
                    coordinate_text: None,
                },
            ],
            route_segments: vec![],
            total_route_elements: 2,
        }
    }

    #[test]
    fn save_then_find() {
        let store = PredictionStore::new();
        store.save(prediction(10));
        assert!(store.exists_by_instance_id(10));
        assert_eq!(store.find_by_instance_id(10).unwrap().instance_id, 10);
    }

    #[test]
    fn save_all_rejects_zero_instance_id_as_failed() {
        let store = PredictionStore::new();
        let mut bad = prediction(0);
        bad.instance_id = 0;
        let result = store.save_all(vec![prediction(1), bad, prediction(2)]);
        assert_eq!(result.saved, 2);
        assert_eq!(result.failed, vec![0]);
        assert_eq!(store.count(), 2);
    }

    #[test]
    fn unique_indicative_count_counts_distinct_callsigns() {
        let store = PredictionStore::new();
        let mut p2 = prediction(2);
        p2.indicative = "GLO200".into();
        store.save(prediction(1));
        store.save(p2);
        let mut p3 = prediction(3);
        p3.indicative = "TST1".into();
        store.save(p3);
        assert_eq!(store.unique_indicative_count(), 2);
    }

    #[test]
    fn delete_removes_entry() {
        let store = PredictionStore::new();
        store.save(prediction(5));
        assert!(store.delete(5));
        assert!(!store.exists_by_instance_id(5));
    }
}
