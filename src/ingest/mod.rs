//! Streaming ingester (C6) — the central state machine.
//!
//! Grounded on `flight_tracker/mod.rs::process_and_insert_fix`'s per-device
//! lock-then-read-modify-persist idiom, generalized from a single-key lookup
//! to the disambiguation search this spec requires when several Flights
//! share an `indicative`.

use crate::config::DISAMBIGUATION_TOLERANCE_MINUTES;
use crate::flight_store::FlightStore;
use crate::model::{Flight, RealPathPoint, TrackingPoint};
use crate::packets::ReplayPath;
use crate::timestamp::parse_instant;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Per-packet outcome, aggregated by the caller across a stream (§4.6).
#[derive(Debug, Clone, Default)]
pub struct ProcessingResult {
    pub new_flights: usize,
    pub updated_flights: usize,
    pub total_tracking_points_appended: usize,
    pub discarded_groups: usize,
    pub message: String,
}

/// Processes one `ReplayPath` packet against `store`, applying the ordering
/// guarantee in §5: every intention is applied before any real-path group is
/// considered, and each group is appended atomically under a single
/// per-`planId` lock.
pub async fn process_packet(store: &FlightStore, packet: &ReplayPath) -> ProcessingResult {
    let mut result = ProcessingResult::default();

    for intention in &packet.list_flight_intention {
        if intention.plan_id == 0 {
            debug!("dropping FlightIntention with planId=0");
            continue;
        }

        let lock = store.lock_for(intention.plan_id);
        let _guard = lock.lock().await;

        match store.find_by_plan_id(intention.plan_id) {
            None => {
                let flight = Flight::from_intention(intention, packet.packet_stored_timestamp);
                store.upsert(flight);
                result.new_flights += 1;
            }
            Some(mut existing) => {
                existing.last_packet_timestamp = packet.packet_stored_timestamp;
                store.upsert(existing);
                result.updated_flights += 1;
            }
        }
    }

    let groups = group_by_indicative(&packet.list_real_path);
    for (indicative, points) in groups {
        let candidates = store.find_all_by_indicative(&indicative);
        let target = match candidates.len() {
            0 => {
                warn!(indicative = %indicative, "no Flight for indicative; discarding group");
                result.discarded_groups += 1;
                continue;
            }
            1 => Some(candidates.into_iter().next().unwrap()),
            _ => disambiguate(&candidates, packet.packet_stored_timestamp),
        };

        let Some(target) = target else {
            result.discarded_groups += 1;
            continue;
        };

        let lock = store.lock_for(target.plan_id);
        let _guard = lock.lock().await;

        let tracking_points: Vec<TrackingPoint> = points
            .into_iter()
            .map(|p| to_tracking_point(&p, packet.packet_stored_timestamp))
            .collect();

        if let Some(append) = store.append_tracking_points(
            target.plan_id,
            tracking_points,
            packet.packet_stored_timestamp,
        ) {
            result.total_tracking_points_appended += append.points_appended;
        }
    }

    result.message = format!(
        "new={} updated={} appended={} discarded={}",
        result.new_flights, result.updated_flights, result.total_tracking_points_appended, result.discarded_groups
    );
    result
}

/// Groups real-path points by trimmed, non-empty `indicativeSafe`. Points
/// whose `indicativeSafe` is blank after trimming carry no usable identity
/// and are dropped rather than grouped under an empty key.
fn group_by_indicative(points: &[RealPathPoint]) -> Vec<(String, Vec<RealPathPoint>)> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<RealPathPoint>> = HashMap::new();

    for point in points {
        let key = point.indicative_safe.trim().to_string();
        if key.is_empty() {
            continue;
        }
        if !groups.contains_key(&key) {
            order.push(key.clone());
        }
        groups.entry(key).or_default().push(point.clone());
    }

    order
        .into_iter()
        .map(|key| {
            let points = groups.remove(&key).unwrap_or_default();
            (key, points)
        })
        .collect()
}

fn to_tracking_point(point: &RealPathPoint, packet_timestamp: i64) -> TrackingPoint {
    TrackingPoint {
        timestamp: packet_timestamp,
        latitude: point.latitude,
        longitude: point.longitude,
        flight_level: point.flight_level,
        speed: point.track_speed,
        indicative_safe: point.indicative_safe.trim().to_string(),
        detector_source: point.detector_source.clone(),
    }
}

/// Disambiguates among Flights sharing an indicative (§4.6). Returns `None`
/// when the group must be discarded — disambiguation never assigns by
/// default. `packet_stored_timestamp` is already epoch milliseconds; the
/// "parse, or discard if unparseable" step in the spec applies to sources
/// that hand the ingester a string timestamp, which `ReplayPath` has already
/// normalized to `i64` by the time it reaches this function.
fn disambiguate(candidates: &[Flight], packet_stored_timestamp: i64) -> Option<Flight> {
    let packet_ts = packet_stored_timestamp;

    let windows: Vec<(usize, Option<(i64, i64)>)> = candidates
        .iter()
        .enumerate()
        .map(|(i, f)| (i, parse_window(f)))
        .collect();

    for &(i, window) in &windows {
        if let Some((start, end)) = window
            && start <= packet_ts
            && packet_ts <= end
        {
            return Some(candidates[i].clone());
        }
    }

    let tolerance_ms = DISAMBIGUATION_TOLERANCE_MINUTES as i64 * 60 * 1000;
    let mut best: Option<(usize, i64)> = None;
    for &(i, window) in &windows {
        let Some((start, end)) = window else { continue };
        let signed_distance = if packet_ts < start {
            start - packet_ts
        } else if packet_ts > end {
            packet_ts - end
        } else {
            0
        };
        if signed_distance > tolerance_ms {
            continue;
        }
        match best {
            None => best = Some((i, signed_distance)),
            Some((_, best_distance)) if signed_distance < best_distance => {
                best = Some((i, signed_distance))
            }
            _ => {}
        }
    }

    best.map(|(i, _)| candidates[i].clone())
}

/// Parses `(flightPlanDate, currentDateTimeOfArrival)` into an instant
/// window in epoch milliseconds. Either side missing or unparseable yields
/// `None`, excluding the candidate from both the containing and
/// nearest-window passes.
fn parse_window(flight: &Flight) -> Option<(i64, i64)> {
    let start = flight
        .flight_plan_date
        .as_deref()
        .and_then(|s| parse_instant(s).ok())?
        .timestamp_millis();
    let end = flight
        .current_date_time_of_arrival
        .as_deref()
        .and_then(|s| parse_instant(s).ok())?
        .timestamp_millis();
    Some((start, end))
}
