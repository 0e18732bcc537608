//! Flight store (C4): append-only per-flight documents keyed by `planId`,
//! with a secondary index by `indicative` and per-flight dedup on append.
//!
//! Grounded on `flight_tracker/mod.rs`'s `AircraftStatesMap`/`AircraftLocksMap`
//! (a `DashMap` keyed by identity plus a parallel per-key lock map so callers
//! can serialize a read-modify-persist sequence) and on `flights_repo.rs`'s
//! lookup-method surface (`get_flight_by_id`, `get_flights_for_device`, …).
//! Persistence here is the in-memory document capability described in §1;
//! there is no SQL layer underneath.

use crate::geo::{coord_key, timestamp_coord_key};
use crate::model::{Flight, TrackingPoint};
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Outcome of appending a batch of real-path points to one flight (§4.6 step 5).
#[derive(Debug, Clone, Default)]
pub struct AppendResult {
    pub points_appended: usize,
    pub points_deduped: usize,
}

/// Outcome of the legacy-dedup cleanup maintenance operation (§4.4).
#[derive(Debug, Clone, Default)]
pub struct CleanupResult {
    pub points_before: usize,
    pub points_after: usize,
}

/// `Arc<DashMap<planId, Flight>>` plus a secondary indicative index and a
/// per-`planId` lock map, mirroring the teacher's `AircraftStatesMap` /
/// `AircraftLocksMap` pair.
#[derive(Clone)]
pub struct FlightStore {
    by_plan_id: Arc<DashMap<i64, Flight>>,
    by_indicative: Arc<DashMap<String, Vec<i64>>>,
    locks: Arc<DashMap<i64, Arc<Mutex<()>>>>,
}

impl Default for FlightStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FlightStore {
    pub fn new() -> Self {
        Self {
            by_plan_id: Arc::new(DashMap::new()),
            by_indicative: Arc::new(DashMap::new()),
            locks: Arc::new(DashMap::new()),
        }
    }

    /// Per-`planId` lock, created on first use. Callers that need to read,
    /// mutate, then persist a `Flight` as one atomic unit (as C6 does for its
    /// intention-create-then-append sequence) should hold this for the whole
    /// sequence, matching the teacher's `device_locks` idiom in
    /// `flight_tracker/mod.rs::process_and_insert_fix`.
    pub fn lock_for(&self, plan_id: i64) -> Arc<Mutex<()>> {
        self.locks
            .entry(plan_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    pub fn find_by_plan_id(&self, plan_id: i64) -> Option<Flight> {
        self.by_plan_id.get(&plan_id).map(|r| r.clone())
    }

    /// First match by indicative, in whatever order the index happens to
    /// hold them (insertion order of the secondary index).
    pub fn find_by_indicative(&self, indicative: &str) -> Option<Flight> {
        self.find_all_by_indicative(indicative).into_iter().next()
    }

    /// Every Flight sharing this indicative — mandatory for C6 disambiguation.
    pub fn find_all_by_indicative(&self, indicative: &str) -> Vec<Flight> {
        self.by_indicative
            .get(indicative)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.by_plan_id.get(id).map(|r| r.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn count(&self) -> usize {
        self.by_plan_id.len()
    }

    /// Number of distinct `indicative` values carried by at least one Flight
    /// (flight-search stats, §6).
    pub fn unique_indicative_count(&self) -> usize {
        self.by_indicative.iter().filter(|e| !e.value().is_empty()).count()
    }

    /// Paged listing, ordered by `planId`. `page` is zero-based.
    pub fn find_all(&self, page: usize, page_size: usize) -> Vec<Flight> {
        let mut all: Vec<Flight> = self.by_plan_id.iter().map(|r| r.value().clone()).collect();
        all.sort_by_key(|f| f.plan_id);
        all.into_iter().skip(page * page_size).take(page_size).collect()
    }

    /// Whole-document upsert keyed by `planId`. Maintains the indicative
    /// index, including removing a stale entry if the indicative changed.
    pub fn upsert(&self, flight: Flight) {
        let plan_id = flight.plan_id;
        let new_indicative = flight.indicative.clone();

        if let Some(prev) = self.by_plan_id.get(&plan_id)
            && prev.indicative != new_indicative
        {
            self.remove_from_indicative_index(&prev.indicative, plan_id);
        }

        {
            let mut ids = self.by_indicative.entry(new_indicative).or_default();
            if !ids.contains(&plan_id) {
                ids.push(plan_id);
            }
        }

        self.by_plan_id.insert(plan_id, flight);
    }

    pub fn delete_by_plan_id(&self, plan_id: i64) -> bool {
        if let Some((_, flight)) = self.by_plan_id.remove(&plan_id) {
            self.remove_from_indicative_index(&flight.indicative, plan_id);
            self.locks.remove(&plan_id);
            true
        } else {
            false
        }
    }

    fn remove_from_indicative_index(&self, indicative: &str, plan_id: i64) {
        if let Some(mut ids) = self.by_indicative.get_mut(indicative) {
            ids.retain(|&id| id != plan_id);
        }
    }

    /// Appends only points whose enhanced dedup key
    /// `(timestamp, round6(lat), round6(lon), indicativeSafe)` is not already
    /// present on the flight, then updates `totalTrackingPoints`,
    /// `hasTrackingData`, and `lastPacketTimestamp` (§4.6 append algorithm).
    ///
    /// Returns `None` if no flight exists for `plan_id`.
    pub fn append_tracking_points(
        &self,
        plan_id: i64,
        new_points: Vec<TrackingPoint>,
        packet_timestamp: i64,
    ) -> Option<AppendResult> {
        let mut entry = self.by_plan_id.get_mut(&plan_id)?;
        let flight = entry.value_mut();

        let existing_keys: HashSet<String> = flight
            .tracking_points
            .iter()
            .map(|p| {
                timestamp_coord_key(
                    p.timestamp,
                    p.latitude,
                    p.longitude,
                    Some(p.indicative_safe.as_str()),
                )
            })
            .collect();

        let mut result = AppendResult::default();
        for point in new_points {
            let key = timestamp_coord_key(
                point.timestamp,
                point.latitude,
                point.longitude,
                Some(point.indicative_safe.as_str()),
            );
            if existing_keys.contains(&key) {
                result.points_deduped += 1;
                continue;
            }
            flight.tracking_points.push(point);
            result.points_appended += 1;
        }

        flight.total_tracking_points = flight.tracking_points.len() as i64;
        if result.points_appended > 0 {
            flight.has_tracking_data = true;
        }
        flight.last_packet_timestamp = packet_timestamp;

        Some(result)
    }

    /// Legacy-dedup cleanup maintenance operation (§4.4): reduces
    /// `trackingPoints` to unique `(round6(lat), round6(lon),
    /// indicativeSafe)` tuples, keeping the first occurrence by insertion
    /// order.
    pub fn dedup_cleanup(&self, plan_id: i64) -> Option<CleanupResult> {
        let mut entry = self.by_plan_id.get_mut(&plan_id)?;
        let flight = entry.value_mut();
        let before = flight.tracking_points.len();

        let mut seen: HashSet<String> = HashSet::new();
        flight.tracking_points.retain(|p| {
            let key = coord_key(p.latitude, p.longitude, Some(p.indicative_safe.as_str()));
            seen.insert(key)
        });

        flight.total_tracking_points = flight.tracking_points.len() as i64;
        Some(CleanupResult {
            points_before: before,
            points_after: flight.tracking_points.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tp(ts: i64, lat: f64, lon: f64, ind: &str) -> TrackingPoint {
        TrackingPoint {
            timestamp: ts,
            latitude: lat,
            longitude: lon,
            flight_level: 10.0,
            speed: 100.0,
            indicative_safe: ind.to_string(),
            detector_source: None,
        }
    }

    fn flight(plan_id: i64, indicative: &str) -> Flight {
        Flight {
            plan_id,
            indicative: indicative.to_string(),
            track_id: None,
            aircraft_type: None,
            airline: None,
            start_point_indicative: None,
            end_point_indicative: None,
            cruise_level: None,
            cruise_speed: None,
            eobt: None,
            eta: None,
            flight_plan_date: None,
            current_date_time_of_arrival: None,
            finished: false,
            flight_rules: None,
            ssr_code: None,
            tracking_points: Vec::new(),
            has_tracking_data: false,
            total_tracking_points: 0,
            last_packet_timestamp: 0,
        }
    }

    #[test]
    fn upsert_then_find_by_plan_id_and_indicative() {
        let store = FlightStore::new();
        store.upsert(flight(1, "TAM100"));
        assert!(store.find_by_plan_id(1).is_some());
        assert_eq!(store.find_all_by_indicative("TAM100").len(), 1);
    }

    #[test]
    fn find_all_by_indicative_returns_every_candidate() {
        let store = FlightStore::new();
        store.upsert(flight(1, "TAM3886"));
        store.upsert(flight(2, "TAM3886"));
        assert_eq!(store.find_all_by_indicative("TAM3886").len(), 2);
    }

    #[test]
    fn append_dedups_on_enhanced_key() {
        let store = FlightStore::new();
        store.upsert(flight(1, "TAM100"));
        let points = vec![tp(1000, 0.1, 0.2, "TAM100")];
        let r1 = store.append_tracking_points(1, points.clone(), 1000).unwrap();
        assert_eq!(r1.points_appended, 1);

        // Re-ingest of the identical packet: S1 idempotence.
        let r2 = store.append_tracking_points(1, points, 1000).unwrap();
        assert_eq!(r2.points_appended, 0);
        assert_eq!(r2.points_deduped, 1);

        let stored = store.find_by_plan_id(1).unwrap();
        assert_eq!(stored.total_tracking_points, 1);
    }

    #[test]
    fn dedup_cleanup_collapses_to_legacy_key() {
        let store = FlightStore::new();
        store.upsert(flight(1, "TAM100"));
        // Two distinct timestamps but same coordinate+indicative: enhanced
        // dedup would keep both, legacy cleanup collapses to one.
        store.append_tracking_points(
            1,
            vec![tp(1000, 0.1, 0.2, "TAM100"), tp(2000, 0.1, 0.2, "TAM100")],
            2000,
        );
        assert_eq!(store.find_by_plan_id(1).unwrap().total_tracking_points, 2);

        let result = store.dedup_cleanup(1).unwrap();
        assert_eq!(result.points_before, 2);
        assert_eq!(result.points_after, 1);
        assert_eq!(store.find_by_plan_id(1).unwrap().total_tracking_points, 1);
    }

    #[test]
    fn unique_indicative_count_counts_distinct_callsigns() {
        let store = FlightStore::new();
        store.upsert(flight(1, "TAM100"));
        store.upsert(flight(2, "TAM100"));
        store.upsert(flight(3, "GLO200"));
        assert_eq!(store.unique_indicative_count(), 2);
    }

    #[test]
    fn delete_removes_from_indicative_index() {
        let store = FlightStore::new();
        store.upsert(flight(1, "TAM100"));
        assert!(store.delete_by_plan_id(1));
        assert!(store.find_by_plan_id(1).is_none());
        assert!(store.find_all_by_indicative("TAM100").is_empty());
    }
}
