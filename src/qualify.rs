//! Qualification & matching (C9).
//!
//! `PredictedFlight::qualifies` already lives on the model type
//! ([`crate::model::PredictedFlight::qualifies`]); this module adds the
//! match test and the geographic gate, grounded on `geo.rs`'s Haversine
//! helper (C1) the same way `fetch_receivers.rs` layers a distance filter
//! over raw coordinate pairs.

use crate::config::{MATCH_GATE_MAX_FLIGHT_LEVEL, MATCH_GATE_NAUTICAL_MILES};
use crate::flight_store::FlightStore;
use crate::geo::{distance_km, nm_to_km};
use crate::model::{Flight, PredictedFlight};
use crate::prediction_store::PredictionStore;

/// A Flight/PredictedFlight pair that has passed qualification, matching,
/// and the geographic gate (§4.9) and is therefore eligible for C10/C11.
#[derive(Debug, Clone)]
pub struct QualifiedPair {
    pub flight: Flight,
    pub prediction: PredictedFlight,
}

/// A prediction qualifies, matches the flight, and its tracking-point
/// endpoints fall within the geographic gate.
pub fn qualify_and_match(flight: &Flight, prediction: &PredictedFlight) -> Option<QualifiedPair> {
    if !prediction.qualifies() {
        return None;
    }
    if prediction.instance_id != flight.plan_id {
        return None;
    }
    if !passes_geographic_gate(flight, prediction) {
        return None;
    }
    Some(QualifiedPair {
        flight: flight.clone(),
        prediction: prediction.clone(),
    })
}

/// Every `QualifiedPair` across both stores (C13's orchestration of C9 ahead
/// of C10/C11): each `PredictedFlight` is matched against the `Flight`
/// sharing its `instanceId`/`planId`, and only pairs passing qualification,
/// matching, and the geographic gate survive.
pub fn collect_pairs(flight_store: &FlightStore, prediction_store: &PredictionStore) -> Vec<QualifiedPair> {
    prediction_store
        .find_all(0, usize::MAX)
        .into_iter()
        .filter_map(|prediction| {
            let flight = flight_store.find_by_plan_id(prediction.instance_id)?;
            qualify_and_match(&flight, &prediction)
        })
        .collect()
}

/// §4.9 geographic gate: both endpoints within 2 NM and at or below FL4.
fn passes_geographic_gate(flight: &Flight, prediction: &PredictedFlight) -> bool {
    let (Some(first), Some(last)) = (
        flight.tracking_points.first(),
        flight.tracking_points.last(),
    ) else {
        return false;
    };
    if prediction.route_elements.len() < 2 {
        return false;
    }
    let first_route = &prediction.route_elements[0];
    let last_route = prediction.route_elements.last().expect("len >= 2");

    let gate_km = nm_to_km(MATCH_GATE_NAUTICAL_MILES);

    let first_distance = distance_km(
        first.latitude.to_degrees(),
        first.longitude.to_degrees(),
        first_route.latitude,
        first_route.longitude,
    );
    let last_distance = distance_km(
        last.latitude.to_degrees(),
        last.longitude.to_degrees(),
        last_route.latitude,
        last_route.longitude,
    );

    first_distance <= gate_km
        && last_distance <= gate_km
        && first.flight_level <= MATCH_GATE_MAX_FLIGHT_LEVEL
        && last.flight_level <= MATCH_GATE_MAX_FLIGHT_LEVEL
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RouteElement, RouteElementType, TrackingPoint};

    fn tracking_point(lat_deg: f64, lon_deg: f64, fl: f64) -> TrackingPoint {
        TrackingPoint {
            timestamp: 0,
            latitude: lat_deg.to_radians(),
            longitude: lon_deg.to_radians(),
            flight_level: fl,
            speed: 140.0,
            indicative_safe: "TAM3886".into(),
            detector_source: None,
        }
    }

    fn route_element(indicative: &str, lat: f64, lon: f64, element_type: RouteElementType) -> RouteElement {
        RouteElement {
            indicative: indicative.to_string(),
            element_type,
            latitude: lat,
            longitude: lon,
            level_meters: None,
            altitude: None,
            speed_meter_per_second: None,
            eet_minutes: 0.0,
            sequence_number: 0,
            interpolated: false,
            coordinate_text: None,
        }
    }

    fn flight(plan_id: i64, points: Vec<TrackingPoint>) -> Flight {
        Flight {
            plan_id,
            indicative: "TAM3886".into(),
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
            tracking_points: points,
            has_tracking_data: true,
            total_tracking_points: 0,
            last_packet_timestamp: 0,
        }
    }

    fn prediction(instance_id: i64, elements: Vec<RouteElement>) -> PredictedFlight {
        PredictedFlight {
            instance_id,
            route_id: None,
            indicative: "TAM3886".into(),
            aircraft_type: None,
            airline: None,
            start_point_indicative: None,
            end_point_indicative: None,
            cruise_level: None,
            cruise_speed: None,
            time: "[a,b]".into(),
            flight_plan_date: None,
            current_date_time_of_arrival: None,
            route_elements: elements,
            route_segments: vec![],
            total_route_elements: 0,
        }
    }

    #[test]
    fn matches_and_passes_gate_when_endpoints_are_close_and_low() {
        let flight = flight(
            1,
            vec![
                tracking_point(-23.6261, -46.6564, 2.0),
                tracking_point(-22.9105, -43.1634, 2.0),
            ],
        );
        let prediction = prediction(
            1,
            vec![
                route_element("SBSP", -23.6261, -46.6564, RouteElementType::Aerodrome),
                route_element("SBRJ", -22.9105, -43.1634, RouteElementType::Aerodrome),
            ],
        );
        assert!(qualify_and_match(&flight, &prediction).is_some());
    }

    #[test]
    fn fails_gate_when_flight_level_too_high() {
        let flight = flight(
            1,
            vec![
                tracking_point(-23.6261, -46.6564, 50.0),
                tracking_point(-22.9105, -43.1634, 2.0),
            ],
        );
        let prediction = prediction(
            1,
            vec![
                route_element("SBSP", -23.6261, -46.6564, RouteElementType::Aerodrome),
                route_element("SBRJ", -22.9105, -43.1634, RouteElementType::Aerodrome),
            ],
        );
        assert!(qualify_and_match(&flight, &prediction).is_none());
    }

    #[test]
    fn fails_match_when_instance_id_differs_from_plan_id() {
        let flight = flight(
            1,
            vec![
                tracking_point(-23.6261, -46.6564, 2.0),
                tracking_point(-22.9105, -43.1634, 2.0),
            ],
        );
        let prediction = prediction(
            2,
            vec![
                route_element("SBSP", -23.6261, -46.6564, RouteElementType::Aerodrome),
                route_element("SBRJ", -22.9105, -43.1634, RouteElementType::Aerodrome),
            ],
        );
        assert!(qualify_and_match(&flight, &prediction).is_none());
    }

    #[test]
    fn fails_qualification_when_not_sbsp_sbrj_pair() {
        let flight = flight(1, vec![tracking_point(0.0, 0.0, 2.0), tracking_point(0.0, 0.0, 2.0)]);
        let prediction = prediction(
            1,
            vec![
                route_element("SBSP", 0.0, 0.0, RouteElementType::Aerodrome),
                route_element("SBGR", 0.0, 0.0, RouteElementType::Aerodrome),
            ],
        );
        assert!(qualify_and_match(&flight, &prediction).is_none());
    }

    #[test]
    fn collect_pairs_reads_both_stores_by_matching_id() {
        let fs = FlightStore::new();
        let ps = PredictionStore::new();
        fs.upsert(flight(
            1,
            vec![
                tracking_point(-23.6261, -46.6564, 2.0),
                tracking_point(-22.9105, -43.1634, 2.0),
            ],
        ));
        ps.save(prediction(
            1,
            vec![
                route_element("SBSP", -23.6261, -46.6564, RouteElementType::Aerodrome),
                route_element("SBRJ", -22.9105, -43.1634, RouteElementType::Aerodrome),
            ],
        ));
        // Unmatched prediction: no corresponding Flight.
        ps.save(prediction(
            2,
            vec![
                route_element("SBSP", -23.6261, -46.6564, RouteElementType::Aerodrome),
                route_element("SBRJ", -22.9105, -43.1634, RouteElementType::Aerodrome),
            ],
        ));
        let pairs = collect_pairs(&fs, &ps);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].flight.plan_id, 1);
    }
}
