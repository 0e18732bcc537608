//! Prediction ingester (C7).
//!
//! Walks a set of `planId`s against a [`HistoricSource`], pacing requests to
//! avoid exhausting the source's connection pool. Grounded on
//! `openaip_client.rs`'s paced-fetch-loop shape, generalized from a single
//! paginated endpoint to a per-id fan-out with the same sleep-every-N-items
//! backpressure.

use crate::config::{PREDICTION_PACING_BATCH_SIZE, PREDICTION_PACING_DELAY_MS};
use crate::prediction_store::PredictionStore;
use crate::sources::HistoricSource;
use std::time::Duration;
use tracing::warn;

/// Result counts for one extraction run (§4.7).
#[derive(Debug, Clone, Default)]
pub struct ExtractionResult {
    pub total_requested: usize,
    pub total_extracted: usize,
    pub total_not_found: usize,
    pub total_errors: usize,
}

/// Extracts predictions for `plan_ids` from `source` and persists each one
/// via `store`. Pauses `PREDICTION_PACING_DELAY_MS` every
/// `PREDICTION_PACING_BATCH_SIZE` items.
pub async fn extract_predictions(
    source: &dyn HistoricSource,
    store: &PredictionStore,
    plan_ids: &[i64],
) -> ExtractionResult {
    let mut result = ExtractionResult {
        total_requested: plan_ids.len(),
        ..Default::default()
    };

    for (i, &plan_id) in plan_ids.iter().enumerate() {
        match source.fetch_prediction(plan_id).await {
            Ok(Some(prediction)) => {
                store.save(prediction);
                result.total_extracted += 1;
            }
            Ok(None) => {
                result.total_not_found += 1;
            }
            Err(e) => {
                warn!(plan_id, error = %e, "historic store fetch failed");
                result.total_errors += 1;
            }
        }

        if (i + 1) % PREDICTION_PACING_BATCH_SIZE == 0 && i + 1 != plan_ids.len() {
            tokio::time::sleep(Duration::from_millis(PREDICTION_PACING_DELAY_MS)).await;
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PredictedFlight, RouteElement, RouteElementType};
    use crate::sources::MapHistoricSource;

    fn prediction(instance_id: i64) -> PredictedFlight {
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

    #[tokio::test]
    async fn extracts_found_predictions_and_counts_not_found() {
        let source = MapHistoricSource::new(vec![prediction(1), prediction(2)]);
        let store = PredictionStore::new();

        let result = extract_predictions(&source, &store, &[1, 2, 3]).await;

        assert_eq!(result.total_requested, 3);
        assert_eq!(result.total_extracted, 2);
        assert_eq!(result.total_not_found, 1);
        assert_eq!(result.total_errors, 0);
        assert!(store.exists_by_instance_id(1));
        assert!(store.exists_by_instance_id(2));
        assert!(!store.exists_by_instance_id(3));
    }

    #[tokio::test]
    async fn empty_input_yields_zeroed_result() {
        let source = MapHistoricSource::default();
        let store = PredictionStore::new();
        let result = extract_predictions(&source, &store, &[]).await;
        assert_eq!(result.total_requested, 0);
        assert_eq!(result.total_extracted, 0);
    }
}
