//! Packet deserializer adapter (C3).
//!
//! The replay source hands the ingester opaque byte sequences plus a
//! stored-at timestamp; this module converts those into the typed
//! `ReplayPath` value the rest of the pipeline consumes. A failed
//! deserialization is non-fatal: the caller counts it and moves on (§4.3).

use crate::model::{FlightIntention, RealPathPoint};
use serde::{Deserialize, Serialize};

/// One packet emitted by the replay source: a batch of flight intentions
/// and observed points, stamped with the time the source stored it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayPath {
    /// Milliseconds since epoch, UTC.
    pub packet_stored_timestamp: i64,
    pub list_flight_intention: Vec<FlightIntention>,
    pub list_real_path: Vec<RealPathPoint>,
}

/// Converts an opaque byte sequence into a `ReplayPath`, returning `None`
/// when the bytes cannot be deserialized (skip, don't fail the stream).
///
/// The wire format of the opaque source packet is not specified by this
/// system (§1); this is the seam a real deployment plugs a source-specific
/// decoder into. The default decoder here treats the bytes as the replay
/// path's own JSON encoding, which is sufficient for the in-memory
/// `ReplaySource` test doubles in `sources.rs` and for integration tests.
pub fn deserialize_packet(stored_timestamp: i64, bytes: &[u8]) -> Option<ReplayPath> {
    match serde_json::from_slice::<ReplayPath>(bytes) {
        Ok(mut path) => {
            path.packet_stored_timestamp = stored_timestamp;
            Some(path)
        }
        Err(e) => {
            tracing::debug!("packet skipped, could not deserialize: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FlightIntention, RealPathPoint};

    fn sample_path() -> ReplayPath {
        ReplayPath {
            packet_stored_timestamp: 0,
            list_flight_intention: vec![FlightIntention {
                plan_id: 42,
                indicative: "TAM100".into(),
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
            }],
            list_real_path: vec![RealPathPoint {
                plan_id: 42,
                indicative_safe: "TAM100".into(),
                latitude: 0.1,
                longitude: 0.2,
                flight_level: 350.0,
                track_speed: 420.0,
                seq_num: 1,
                detector_source: None,
                simulating: false,
            }],
        }
    }

    #[test]
    fn round_trips_through_deserialize() {
        let path = sample_path();
        let bytes = serde_json::to_vec(&path).unwrap();
        let decoded = deserialize_packet(1_700_000_000_000, &bytes).expect("should decode");
        assert_eq!(decoded.packet_stored_timestamp, 1_700_000_000_000);
        assert_eq!(decoded.list_flight_intention.len(), 1);
    }

    #[test]
    fn garbage_bytes_skip_without_panic() {
        assert!(deserialize_packet(0, b"not json").is_none());
    }
}
