//! Trajectory densifier (C8): rewrites a `PredictedFlight`'s `routeElements`
//! so the point count matches the observed `Flight`'s tracking points, so
//! downstream index-aligned error metrics (C11) can compare like with like.
//!
//! Segment preparation and point sampling are grounded on
//! `geometry/spline.rs`'s `GeoPoint`/`lerp_point`/segment-walk shape (this
//! module's fallback path is exactly that crate's linear interpolation,
//! generalized from a spline control-point walk to a time-indexed one); the
//! physics-simulator primary path is the capability seam described in
//! `sources.rs`.

use crate::model::{PredictedFlight, RouteElement, RouteElementType};
use crate::sources::{SimPoint, SimSegmentEndpoint, TrajectorySimulator};
use crate::flight_store::FlightStore;
use crate::prediction_store::PredictionStore;

/// Default speed assumed for a route element with no recorded speed.
const DEFAULT_SPEED_KNOTS: f64 = 450.0;
/// Default level assumed for a route element with no recorded altitude:
/// FL350, in feet.
const DEFAULT_ALTITUDE_FEET: f64 = 35_000.0;
/// Minimum forward step (seconds) enforced between consecutive endpoints'
/// accumulated elapsed time, to guarantee strict monotonicity (§4.8.3).
const MIN_AET_STEP_SECONDS: f64 = 5.0 * 60.0;

const METERS_PER_FOOT: f64 = 0.3048;
const FEET_PER_METER: f64 = 3.28084;
const MPS_PER_KNOT: f64 = 0.514444;
const KNOTS_PER_MPS: f64 = 1.94384;

#[derive(Debug, Clone)]
pub enum DensifyOutcome {
    /// Either the flight or the prediction does not exist; no write.
    NotFound,
    /// `targetPointCount <= len(routeElements)`; no write.
    NoActionNeeded,
    /// `routeElements` replaced in place.
    Success {
        point_count: usize,
        simulator_points: usize,
        linear_points: usize,
        skipped_points: usize,
    },
    /// Densification produced fewer points than the original (or none);
    /// the prior `routeElements` are preserved untouched.
    Error { reason: String },
}

/// One route-element endpoint enriched with the fields the densifier needs:
/// coordinates (degrees), altitude (feet), speed (knots), and a rescaled
/// accumulated-elapsed-time in seconds since route start.
#[derive(Debug, Clone, Copy)]
struct Endpoint {
    latitude: f64,
    longitude: f64,
    altitude_feet: f64,
    speed_knots: f64,
    aet_seconds: f64,
}

impl Endpoint {
    fn as_sim_endpoint(&self) -> SimSegmentEndpoint {
        SimSegmentEndpoint {
            latitude: self.latitude,
            longitude: self.longitude,
            altitude_feet: self.altitude_feet,
            speed_knots: self.speed_knots,
            aet_seconds: self.aet_seconds,
        }
    }
}

/// Densifies the `PredictedFlight` matching `plan_id`, writing the result
/// back to `prediction_store` on success and leaving both stores untouched
/// otherwise.
pub fn densify(
    plan_id: i64,
    flight_store: &FlightStore,
    prediction_store: &PredictionStore,
    simulator: &dyn TrajectorySimulator,
) -> DensifyOutcome {
    let Some(flight) = flight_store.find_by_plan_id(plan_id) else {
        return DensifyOutcome::NotFound;
    };
    let Some(prediction) = prediction_store.find_by_instance_id(plan_id) else {
        return DensifyOutcome::NotFound;
    };

    let target_point_count = flight.tracking_points.len();
    let original_len = prediction.route_elements.len();

    if target_point_count <= original_len {
        return DensifyOutcome::NoActionNeeded;
    }
    if flight.tracking_points.is_empty() || original_len < 2 {
        return DensifyOutcome::Error {
            reason: "insufficient tracking points or route elements".to_string(),
        };
    }

    let start_ms = flight.tracking_points.first().unwrap().timestamp;
    let end_ms = flight.tracking_points.last().unwrap().timestamp;
    let actual_duration_seconds = (end_ms - start_ms) as f64 / 1000.0;
    if actual_duration_seconds <= 0.0 {
        return DensifyOutcome::Error {
            reason: "non-positive actual flight duration".to_string(),
        };
    }

    let valid_endpoints = match prepare_segments(&prediction, actual_duration_seconds) {
        Ok(endpoints) => endpoints,
        Err(reason) => return DensifyOutcome::Error { reason },
    };
    if valid_endpoints.len() < 2 {
        return DensifyOutcome::Error {
            reason: "fewer than two usable segment endpoints after sentinel rejection".to_string(),
        };
    }

    let sim_endpoints: Vec<SimSegmentEndpoint> =
        valid_endpoints.iter().map(Endpoint::as_sim_endpoint).collect();

    let mut produced = Vec::with_capacity(target_point_count);
    let mut simulator_points = 0usize;
    let mut linear_points = 0usize;
    let mut skipped_points = 0usize;

    for i in 0..target_point_count {
        let t = i as f64 * (actual_duration_seconds / (target_point_count - 1) as f64);

        if let Some(point) = simulator.simulate(&sim_endpoints, t) {
            produced.push(route_element_from_sim(point, t, produced.len() as i64));
            simulator_points += 1;
            continue;
        }

        match linear_interpolate(&valid_endpoints, t) {
            Some(point) => {
                produced.push(route_element_from_linear(point, t, produced.len() as i64));
                linear_points += 1;
            }
            None => skipped_points += 1,
        }
    }

    if produced.len() < original_len || produced.is_empty() {
        return DensifyOutcome::Error {
            reason: format!(
                "densified {} points, fewer than the original {original_len}",
                produced.len()
            ),
        };
    }

    let point_count = produced.len();
    let mut updated = prediction;
    updated.route_elements = produced;
    updated.total_route_elements = point_count as i64;
    prediction_store.save(updated);

    DensifyOutcome::Success {
        point_count,
        simulator_points,
        linear_points,
        skipped_points,
    }
}

/// Builds enriched endpoints for every `routeElement`, rejects (0,0)
/// sentinel pairs, rescales `eetMinutes` so the route's total spans
/// `actual_duration_seconds`, and enforces strictly increasing `aet`.
fn prepare_segments(
    prediction: &PredictedFlight,
    actual_duration_seconds: f64,
) -> Result<Vec<Endpoint>, String> {
    let max_original_eet = prediction
        .route_elements
        .iter()
        .map(|e| e.eet_minutes)
        .fold(0.0_f64, f64::max);
    if max_original_eet <= 0.0 {
        return Err("route has no positive eetMinutes span to rescale against".to_string());
    }

    let actual_minutes = actual_duration_seconds / 60.0;
    let factor = actual_minutes / max_original_eet;

    let mut aet_seconds: Vec<f64> = prediction
        .route_elements
        .iter()
        .map(|e| (e.eet_minutes * factor * 60.0).round())
        .collect();
    for i in 1..aet_seconds.len() {
        if aet_seconds[i] <= aet_seconds[i - 1] {
            aet_seconds[i] = aet_seconds[i - 1] + MIN_AET_STEP_SECONDS;
        }
    }

    let endpoints: Vec<Option<Endpoint>> = prediction
        .route_elements
        .iter()
        .zip(aet_seconds.iter())
        .map(|(e, &aet)| {
            if e.latitude == 0.0 && e.longitude == 0.0 {
                None
            } else {
                Some(Endpoint {
                    latitude: e.latitude,
                    longitude: e.longitude,
                    altitude_feet: e
                        .level_meters
                        .map(|m| m * FEET_PER_METER)
                        .unwrap_or(DEFAULT_ALTITUDE_FEET),
                    speed_knots: e
                        .speed_meter_per_second
                        .map(|v| v * KNOTS_PER_MPS)
                        .unwrap_or(DEFAULT_SPEED_KNOTS),
                    aet_seconds: aet,
                })
            }
        })
        .collect();

    Ok(endpoints.into_iter().flatten().collect())
}

/// Finds the adjacent pair of prepared endpoints whose `[aet1, aet2]` window
/// contains `t`, and linearly interpolates latitude, longitude, and
/// altitude within it.
fn linear_interpolate(endpoints: &[Endpoint], t: f64) -> Option<SimPoint> {
    for pair in endpoints.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if t < a.aet_seconds || t > b.aet_seconds {
            continue;
        }
        let span = b.aet_seconds - a.aet_seconds;
        let ratio = if span <= 0.0 { 0.0 } else { (t - a.aet_seconds) / span };
        return Some(SimPoint {
            latitude: a.latitude + ratio * (b.latitude - a.latitude),
            longitude: a.longitude + ratio * (b.longitude - a.longitude),
            altitude_feet: a.altitude_feet + ratio * (b.altitude_feet - a.altitude_feet),
        });
    }
    None
}

fn route_element_from_sim(point: SimPoint, t_seconds: f64, sequence_number: i64) -> RouteElement {
    RouteElement {
        indicative: String::new(),
        element_type: RouteElementType::Interpolated,
        latitude: point.latitude,
        longitude: point.longitude,
        level_meters: Some(point.altitude_feet * METERS_PER_FOOT),
        altitude: Some(point.altitude_feet / 100.0),
        speed_meter_per_second: None,
        eet_minutes: t_seconds / 60.0,
        sequence_number,
        interpolated: true,
        coordinate_text: None,
    }
}

fn route_element_from_linear(point: SimPoint, t_seconds: f64, sequence_number: i64) -> RouteElement {
    RouteElement {
        indicative: String::new(),
        element_type: RouteElementType::InterpolatedLinear,
        latitude: point.latitude,
        longitude: point.longitude,
        level_meters: Some(point.altitude_feet * METERS_PER_FOOT),
        altitude: None,
        speed_meter_per_second: None,
        eet_minutes: t_seconds / 60.0,
        sequence_number,
        interpolated: true,
        coordinate_text: None,
    }
}
