//! Trajectory accuracy engine (C11).
//!
//! Grounded on `analytics_repo.rs`'s per-flight-then-aggregate report shape,
//! same as [`crate::punctuality`]. The horizontal accumulator stays in
//! radians² throughout (an explicit open-question resolution, DESIGN.md) and
//! is converted to metres only when building the reported RMSE fields, via
//! [`crate::geo::radians_to_meters`].

use crate::geo::radians_to_meters;
use crate::qualify::QualifiedPair;

const METERS_PER_FLIGHT_LEVEL_HUNDRED_FEET: f64 = 30.48;

#[derive(Debug, Clone)]
pub struct FlightAccuracyResult {
    pub plan_id: i64,
    pub predicted_indicative: String,
    pub point_count: usize,
    pub horizontal_mse_radians_sq: f64,
    pub horizontal_rmse_meters: f64,
    pub vertical_mse: f64,
    pub vertical_rmse: f64,
    pub average_horizontal_error_meters: f64,
    pub average_vertical_error: f64,
    pub max_horizontal_error_meters: f64,
    pub max_vertical_error: f64,
}

#[derive(Debug, Clone, Default)]
pub struct AggregateMetrics {
    pub horizontal_rmse_meters: f64,
    pub vertical_rmse: f64,
    pub min_horizontal_rmse_meters: f64,
    pub max_horizontal_rmse_meters: f64,
    pub min_vertical_rmse: f64,
    pub max_vertical_rmse: f64,
    pub average_points_per_flight: f64,
    pub total_points_analyzed: usize,
}

#[derive(Debug, Clone, Default)]
pub struct TrajectoryAccuracyReport {
    pub total_analyzed_flights: usize,
    pub total_qualified_flights: usize,
    pub total_skipped_flights: usize,
    pub aggregate_metrics: AggregateMetrics,
    pub flight_results: Vec<FlightAccuracyResult>,
}

/// Runs §4.11 over every qualified, matched, geographically valid pair.
/// Pairs whose point counts still differ after densification are counted in
/// `totalSkippedFlights` and produce no per-flight result.
pub fn compute(pairs: &[QualifiedPair]) -> TrajectoryAccuracyReport {
    let mut flight_results = Vec::new();
    let mut skipped = 0usize;

    for pair in pairs {
        let points = &pair.flight.tracking_points;
        let elements = &pair.prediction.route_elements;
        if points.len() != elements.len() || points.is_empty() {
            skipped += 1;
            continue;
        }

        let n = points.len();
        let mut horizontal_sq_sum = 0.0_f64;
        let mut vertical_sq_sum = 0.0_f64;
        let mut horizontal_abs_sum = 0.0_f64;
        let mut vertical_abs_sum = 0.0_f64;
        let mut max_horizontal = 0.0_f64;
        let mut max_vertical = 0.0_f64;

        for i in 0..n {
            let tracking = &points[i];
            let route = &elements[i];

            let predicted_lat_rad = route.latitude.to_radians();
            let predicted_lon_rad = route.longitude.to_radians();
            let delta_lat = tracking.latitude - predicted_lat_rad;
            let delta_lon = tracking.longitude - predicted_lon_rad;
            let horizontal_err_sq = delta_lat * delta_lat + delta_lon * delta_lon;

            let predicted_altitude_meters = route.level_meters.unwrap_or(0.0);
            let real_altitude_meters = tracking.flight_level * METERS_PER_FLIGHT_LEVEL_HUNDRED_FEET;
            let vertical_err = real_altitude_meters - predicted_altitude_meters;

            horizontal_sq_sum += horizontal_err_sq;
            vertical_sq_sum += vertical_err * vertical_err;
            horizontal_abs_sum += radians_to_meters(horizontal_err_sq.sqrt());
            vertical_abs_sum += vertical_err.abs();
            max_horizontal = max_horizontal.max(radians_to_meters(horizontal_err_sq.sqrt()));
            max_vertical = max_vertical.max(vertical_err.abs());
        }

        let horizontal_mse = horizontal_sq_sum / n as f64;
        let vertical_mse = vertical_sq_sum / n as f64;

        flight_results.push(FlightAccuracyResult {
            plan_id: pair.flight.plan_id,
            predicted_indicative: pair.prediction.indicative.clone(),
            point_count: n,
            horizontal_mse_radians_sq: horizontal_mse,
            horizontal_rmse_meters: radians_to_meters(horizontal_mse.sqrt()),
            vertical_mse,
            vertical_rmse: vertical_mse.sqrt(),
            average_horizontal_error_meters: horizontal_abs_sum / n as f64,
            average_vertical_error: vertical_abs_sum / n as f64,
            max_horizontal_error_meters: max_horizontal,
            max_vertical_error: max_vertical,
        });
    }

    let total_qualified_flights = pairs.len();
    let total_analyzed_flights = flight_results.len();
    let total_points_analyzed: usize = flight_results.iter().map(|r| r.point_count).sum();

    let aggregate_metrics = if flight_results.is_empty() {
        AggregateMetrics::default()
    } else {
        let weighted_horizontal_mse: f64 = flight_results
            .iter()
            .map(|r| r.horizontal_mse_radians_sq * r.point_count as f64)
            .sum::<f64>()
            / total_points_analyzed as f64;
        let weighted_vertical_mse: f64 = flight_results
            .iter()
            .map(|r| r.vertical_mse * r.point_count as f64)
            .sum::<f64>()
            / total_points_analyzed as f64;

        AggregateMetrics {
            horizontal_rmse_meters: radians_to_meters(weighted_horizontal_mse.sqrt()),
            vertical_rmse: weighted_vertical_mse.sqrt(),
            min_horizontal_rmse_meters: flight_results
                .iter()
                .map(|r| r.horizontal_rmse_meters)
                .fold(f64::INFINITY, f64::min),
            max_horizontal_rmse_meters: flight_results
                .iter()
                .map(|r| r.horizontal_rmse_meters)
                .fold(f64::NEG_INFINITY, f64::max),
            min_vertical_rmse: flight_results
                .iter()
                .map(|r| r.vertical_rmse)
                .fold(f64::INFINITY, f64::min),
            max_vertical_rmse: flight_results
                .iter()
                .map(|r| r.vertical_rmse)
                .fold(f64::NEG_INFINITY, f64::max),
            average_points_per_flight: total_points_analyzed as f64 / total_analyzed_flights as f64,
            total_points_analyzed,
        }
    };

    TrajectoryAccuracyReport {
        total_analyzed_flights,
        total_qualified_flights,
        total_skipped_flights: skipped,
        aggregate_metrics,
        flight_results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Flight, PredictedFlight, RouteElement, RouteElementType, TrackingPoint};

    fn tracking_point(lat_rad: f64, lon_rad: f64, fl: f64) -> TrackingPoint {
        TrackingPoint {
            timestamp: 0,
            latitude: lat_rad,
            longitude: lon_rad,
            flight_level: fl,
            speed: 140.0,
            indicative_safe: "TAM3886".into(),
            detector_source: None,
        }
    }

    fn route_element(lat_deg: f64, lon_deg: f64, level_meters: f64) -> RouteElement {
        RouteElement {
            indicative: String::new(),
            element_type: RouteElementType::Interpolated,
            latitude: lat_deg,
            longitude: lon_deg,
            level_meters: Some(level_meters),
            altitude: None,
            speed_meter_per_second: None,
            eet_minutes: 0.0,
            sequence_number: 0,
            interpolated: true,
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
        let n = elements.len() as i64;
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
            total_route_elements: n,
        }
    }

    #[test]
    fn exact_match_yields_zero_error() {
        let points = vec![
            tracking_point(0.1, 0.2, 10.0),
            tracking_point(0.1, 0.2, 10.0),
        ];
        let elements = vec![
            route_element(0.1_f64.to_degrees(), 0.2_f64.to_degrees(), 10.0 * 30.48),
            route_element(0.1_f64.to_degrees(), 0.2_f64.to_degrees(), 10.0 * 30.48),
        ];
        let pairs = vec![QualifiedPair {
            flight: flight(1, points),
            prediction: prediction(1, elements),
        }];

        let report = compute(&pairs);
        assert_eq!(report.total_analyzed_flights, 1);
        assert_eq!(report.total_skipped_flights, 0);
        let r = &report.flight_results[0];
        assert!(r.horizontal_rmse_meters < 1e-6);
        assert!(r.vertical_rmse < 1e-6);
    }

    #[test]
    fn s6_unequal_point_counts_are_skipped_not_errored() {
        let points: Vec<TrackingPoint> = (0..60).map(|_| tracking_point(0.1, 0.2, 10.0)).collect();
        let elements: Vec<RouteElement> = (0..20)
            .map(|_| route_element(0.1_f64.to_degrees(), 0.2_f64.to_degrees(), 300.0))
            .collect();
        let pairs = vec![QualifiedPair {
            flight: flight(1, points),
            prediction: prediction(1, elements),
        }];

        let report = compute(&pairs);
        assert_eq!(report.total_analyzed_flights, 0);
        assert_eq!(report.total_skipped_flights, 1);
        assert!(report.flight_results.is_empty());
    }
}
