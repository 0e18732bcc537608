//! Data model entities (§3).
//!
//! Struct shape and `serde` conventions follow the teacher's entity structs
//! in `flights.rs` (camelCase wire format, `Clone`/`Debug` derives); these
//! are plain value types, not diesel `Queryable`s, since persistence here is
//! an in-memory capability rather than a relational mapping.

use serde::{Deserialize, Serialize};

/// A flight-plan element embedded in a replay packet (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightIntention {
    pub plan_id: i64,
    pub indicative: String,
    pub aircraft_type: Option<String>,
    pub airline: Option<String>,
    pub start_point_indicative: Option<String>,
    pub end_point_indicative: Option<String>,
    pub cruise_level: Option<f64>,
    pub cruise_speed: Option<f64>,
    pub eobt: Option<String>,
    pub eta: Option<String>,
    pub flight_plan_date: Option<String>,
    pub current_date_time_of_arrival: Option<String>,
    pub finished: bool,
    pub flight_rules: Option<String>,
    pub ssr_code: Option<String>,
}

/// A single observed radar/ADS-B point embedded in a replay packet (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealPathPoint {
    /// May be 0 when the source could not associate the point to a plan.
    pub plan_id: i64,
    /// The broadcast call sign; may be blank.
    pub indicative_safe: String,
    /// Radians.
    pub latitude: f64,
    /// Radians.
    pub longitude: f64,
    /// Hundreds of feet.
    pub flight_level: f64,
    /// Knots.
    pub track_speed: f64,
    pub seq_num: i64,
    pub detector_source: Option<String>,
    pub simulating: bool,
}

/// A tracking point appended to a `Flight`'s ordered history (§3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrackingPoint {
    /// Milliseconds since epoch, UTC.
    pub timestamp: i64,
    /// Radians.
    pub latitude: f64,
    /// Radians.
    pub longitude: f64,
    /// Hundreds of feet.
    pub flight_level: f64,
    /// Knots.
    pub speed: f64,
    pub indicative_safe: String,
    pub detector_source: Option<String>,
}

/// A flight document, one per `planId` (C4).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flight {
    pub plan_id: i64,
    pub indicative: String,
    pub track_id: Option<String>,

    pub aircraft_type: Option<String>,
    pub airline: Option<String>,
    pub start_point_indicative: Option<String>,
    pub end_point_indicative: Option<String>,
    pub cruise_level: Option<f64>,
    pub cruise_speed: Option<f64>,
    pub eobt: Option<String>,
    pub eta: Option<String>,
    pub flight_plan_date: Option<String>,
    pub current_date_time_of_arrival: Option<String>,
    pub finished: bool,
    pub flight_rules: Option<String>,
    pub ssr_code: Option<String>,

    pub tracking_points: Vec<TrackingPoint>,
    pub has_tracking_data: bool,
    pub total_tracking_points: i64,
    pub last_packet_timestamp: i64,
}

impl Flight {
    pub fn from_intention(intention: &FlightIntention, packet_timestamp: i64) -> Self {
        Flight {
            plan_id: intention.plan_id,
            indicative: intention.indicative.clone(),
            track_id: None,
            aircraft_type: intention.aircraft_type.clone(),
            airline: intention.airline.clone(),
            start_point_indicative: intention.start_point_indicative.clone(),
            end_point_indicative: intention.end_point_indicative.clone(),
            cruise_level: intention.cruise_level,
            cruise_speed: intention.cruise_speed,
            eobt: intention.eobt.clone(),
            eta: intention.eta.clone(),
            flight_plan_date: intention.flight_plan_date.clone(),
            current_date_time_of_arrival: intention.current_date_time_of_arrival.clone(),
            finished: intention.finished,
            flight_rules: intention.flight_rules.clone(),
            ssr_code: intention.ssr_code.clone(),
            tracking_points: Vec::new(),
            has_tracking_data: false,
            total_tracking_points: 0,
            last_packet_timestamp: packet_timestamp,
        }
    }
}

/// A node in a predicted route (§3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RouteElementType {
    Aerodrome,
    Waypoint,
    Navaid,
    Interpolated,
    InterpolatedLinear,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteElement {
    pub indicative: String,
    pub element_type: RouteElementType,
    /// Degrees.
    pub latitude: f64,
    /// Degrees.
    pub longitude: f64,
    pub level_meters: Option<f64>,
    pub altitude: Option<f64>,
    pub speed_meter_per_second: Option<f64>,
    /// Minutes since route start.
    pub eet_minutes: f64,
    pub sequence_number: i64,
    pub interpolated: bool,
    pub coordinate_text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSegment {
    pub id: i64,
    pub distance: f64,
    pub element_a_id: i64,
    pub element_b_id: i64,
}

/// A predicted-flight document, one per `instanceId` (C5).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictedFlight {
    pub instance_id: i64,
    pub route_id: Option<i64>,
    pub indicative: String,
    pub aircraft_type: Option<String>,
    pub airline: Option<String>,
    pub start_point_indicative: Option<String>,
    pub end_point_indicative: Option<String>,
    pub cruise_level: Option<f64>,
    pub cruise_speed: Option<f64>,
    /// Bracketed ISO range literal `[<depart>,<arrive>]`.
    pub time: String,
    pub flight_plan_date: Option<String>,
    pub current_date_time_of_arrival: Option<String>,
    pub route_elements: Vec<RouteElement>,
    pub route_segments: Vec<RouteSegment>,
    pub total_route_elements: i64,
}

impl PredictedFlight {
    pub fn qualifies(&self) -> bool {
        if self.route_elements.len() < 2 {
            return false;
        }
        let first = &self.route_elements[0];
        let last = self.route_elements.last().expect("len >= 2");
        if first.element_type != RouteElementType::Aerodrome
            || last.element_type != RouteElementType::Aerodrome
        {
            return false;
        }
        let pair = (first.indicative.as_str(), last.indicative.as_str());
        matches!(pair, ("SBSP", "SBRJ") | ("SBRJ", "SBSP"))
    }
}

/// Which pipeline step produced a `ProcessingHistory` record (C12).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    ProcessRealData,
    SyncPredictedData,
    DensifyPredictedData,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingStatus {
    InProgress,
    Success,
    PartialSuccess,
    Failure,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingHistory {
    pub id: i64,
    /// Milliseconds since epoch, UTC.
    pub timestamp: i64,
    pub operation: Operation,
    pub endpoint: String,
    pub status: ProcessingStatus,
    pub duration_ms: Option<i64>,
    pub records_processed: i64,
    pub records_with_errors: i64,
    pub details: Option<String>,
    pub error_message: Option<String>,
    pub request_parameters: Option<String>,
}
