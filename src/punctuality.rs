//! Punctuality KPI engine (C10).
//!
//! Grounded on `analytics_repo.rs`'s aggregate-then-detail report shape
//! (counts/percentages alongside a bounded detail list); the duration math
//! itself reuses [`crate::timestamp::parse_range_duration_ms`] (C2).

use crate::config::PUNCTUALITY_WINDOWS_MINUTES;
use crate::qualify::QualifiedPair;
use crate::timestamp::parse_range_duration_ms;
use serde::Serialize;

const SAMPLE_SIZE: usize = 10;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PunctualityDetail {
    pub plan_id: i64,
    pub flight_indicative: String,
    pub actual_duration_ms: i64,
    pub predicted_duration_ms: i64,
    pub time_difference_ms: i64,
    pub time_difference_minutes: f64,
    pub within_3_min: bool,
    pub within_5_min: bool,
    pub within_15_min: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PunctualityReport {
    pub total_analyzed: usize,
    pub total_errors: usize,
    pub within_3_min_count: usize,
    pub within_3_min_percentage: String,
    pub within_5_min_count: usize,
    pub within_5_min_percentage: String,
    pub within_15_min_count: usize,
    pub within_15_min_percentage: String,
    pub detailed_results: Vec<PunctualityDetail>,
    pub sample_detailed_results: Vec<PunctualityDetail>,
}

/// Runs §4.10 over every geographically valid pair. Pairs whose
/// `prediction.time` range cannot be parsed are counted as errors, not as
/// "outside every window".
pub fn compute(pairs: &[QualifiedPair]) -> PunctualityReport {
    let mut details = Vec::with_capacity(pairs.len());
    let mut total_errors = 0usize;

    for pair in pairs {
        let Some((first, last)) = pair
            .flight
            .tracking_points
            .first()
            .zip(pair.flight.tracking_points.last())
        else {
            total_errors += 1;
            continue;
        };

        let predicted_duration_ms = match parse_range_duration_ms(&pair.prediction.time) {
            Ok(ms) => ms,
            Err(_) => {
                total_errors += 1;
                continue;
            }
        };

        let actual_duration_ms = last.timestamp - first.timestamp;
        let delta = (actual_duration_ms - predicted_duration_ms).abs();

        let [w3, w5, w15] = PUNCTUALITY_WINDOWS_MINUTES.map(|minutes| minutes * 60 * 1000);

        details.push(PunctualityDetail {
            plan_id: pair.flight.plan_id,
            flight_indicative: pair.flight.indicative.clone(),
            actual_duration_ms,
            predicted_duration_ms,
            time_difference_ms: delta,
            time_difference_minutes: delta as f64 / 60_000.0,
            within_3_min: delta <= w3,
            within_5_min: delta <= w5,
            within_15_min: delta <= w15,
        });
    }

    let total_analyzed = details.len();
    let within_3_min_count = details.iter().filter(|d| d.within_3_min).count();
    let within_5_min_count = details.iter().filter(|d| d.within_5_min).count();
    let within_15_min_count = details.iter().filter(|d| d.within_15_min).count();

    let sample_detailed_results = details.iter().take(SAMPLE_SIZE).cloned().collect();

    PunctualityReport {
        total_analyzed,
        total_errors,
        within_3_min_count,
        within_3_min_percentage: format_percentage(within_3_min_count, total_analyzed),
        within_5_min_count,
        within_5_min_percentage: format_percentage(within_5_min_count, total_analyzed),
        within_15_min_count,
        within_15_min_percentage: format_percentage(within_15_min_count, total_analyzed),
        detailed_results: details,
        sample_detailed_results,
    }
}

fn format_percentage(count: usize, total: usize) -> String {
    if total == 0 {
        return "0.0%".to_string();
    }
    format!("{:.1}%", (count as f64 / total as f64) * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Flight, PredictedFlight, RouteElement, RouteElementType, TrackingPoint};

    fn tracking_point(ts: i64) -> TrackingPoint {
        TrackingPoint {
            timestamp: ts,
            latitude: 0.0,
            longitude: 0.0,
            flight_level: 2.0,
            speed: 140.0,
            indicative_safe: "TAM3886".into(),
            detector_source: None,
        }
    }

    fn pair(plan_id: i64, actual_duration_ms: i64, predicted_duration_minutes: i64) -> QualifiedPair {
        let flight = Flight {
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
            tracking_points: vec![tracking_point(0), tracking_point(actual_duration_ms)],
            has_tracking_data: true,
            total_tracking_points: 2,
            last_packet_timestamp: actual_duration_ms,
        };
        let arrival_minutes = predicted_duration_minutes;
        let prediction = PredictedFlight {
            instance_id: plan_id,
            route_id: None,
            indicative: "TAM3886".into(),
            aircraft_type: None,
            airline: None,
            start_point_indicative: None,
            end_point_indicative: None,
            cruise_level: None,
            cruise_speed: None,
            time: format!(
                "[Thu Jul 10 00:00:00 UTC 2025,Thu Jul 10 {:02}:{:02}:00 UTC 2025]",
                arrival_minutes / 60,
                arrival_minutes % 60
            ),
            flight_plan_date: None,
            current_date_time_of_arrival: None,
            route_elements: vec![
                RouteElement {
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
                RouteElement {
                    indicative: "SBRJ".into(),
                    element_type: RouteElementType::Aerodrome,
                    latitude: 1.0,
                    longitude: 1.0,
                    level_meters: None,
                    altitude: None,
                    speed_meter_per_second: None,
                    eet_minutes: arrival_minutes as f64,
                    sequence_number: 1,
                    interpolated: false,
                    coordinate_text: None,
                },
            ],
            route_segments: vec![],
            total_route_elements: 2,
        };
        QualifiedPair { flight, prediction }
    }

    #[test]
    fn s5_punctuality_bucket_counts_nest() {
        // predicted = 60 minutes; actual durations offset by 120s/240s/400s.
        let pairs = vec![
            pair(1, 60 * 60_000 + 120_000, 60),
            pair(2, 60 * 60_000 + 240_000, 60),
            pair(3, 60 * 60_000 + 400_000, 60),
        ];
        let report = compute(&pairs);
        assert_eq!(report.total_analyzed, 3);
        assert_eq!(report.within_3_min_count, 2);
        assert_eq!(report.within_5_min_count, 3);
        assert_eq!(report.within_15_min_count, 3);
        // Nesting invariant (#7): within3 subset of within5 subset of within15.
        assert!(report.within_3_min_count <= report.within_5_min_count);
        assert!(report.within_5_min_count <= report.within_15_min_count);
    }

    #[test]
    fn unparseable_predicted_range_counts_as_error_not_outside_window() {
        let mut bad = pair(1, 1000, 60);
        bad.prediction.time = "garbage".to_string();
        let report = compute(&[bad]);
        assert_eq!(report.total_analyzed, 0);
        assert_eq!(report.total_errors, 1);
    }

    #[test]
    fn percentage_formats_with_one_decimal() {
        assert_eq!(format_percentage(2, 3), "66.7%");
        assert_eq!(format_percentage(0, 0), "0.0%");
    }
}
