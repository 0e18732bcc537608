//! External collaborator capabilities (§1 OUT OF SCOPE, §9 design notes).
//!
//! The replay store, the historic store, and the trajectory simulator are
//! all external systems this crate only consumes through a narrow trait —
//! grounded on `beast/mod.rs`'s `BeastPublisher` trait (an `async_trait`
//! seam a client is generic over) and `openaip_client.rs`'s external-client
//! shape (a struct wrapping a transport handle). Real network/DB-backed
//! implementations are out of scope (§1); only the trait and in-memory test
//! doubles live here.

use crate::model::PredictedFlight;
use anyhow::Result;
use async_trait::async_trait;

/// Pull-based source of opaque replay packets (§5: "pull-based... closing
/// the stream releases the source connection"). `next_packet` returns
/// `(storedTimestamp, bytes)`, or `None` once exhausted.
#[async_trait]
pub trait ReplaySource: Send + Sync {
    async fn next_packet(&mut self) -> Result<Option<(i64, Vec<u8>)>>;
}

/// A `Vec`-backed `ReplaySource` for tests and local pipeline runs: yields
/// its packets in order, then signals exhaustion.
pub struct VecReplaySource {
    packets: std::collections::VecDeque<(i64, Vec<u8>)>,
}

impl VecReplaySource {
    pub fn new(packets: Vec<(i64, Vec<u8>)>) -> Self {
        Self {
            packets: packets.into(),
        }
    }
}

#[async_trait]
impl ReplaySource for VecReplaySource {
    async fn next_packet(&mut self) -> Result<Option<(i64, Vec<u8>)>> {
        Ok(self.packets.pop_front())
    }
}

/// The historic store's object-graph traversal (C7), abstracted to a single
/// per-`planId` fetch. Serialization faults while lazily loading the graph
/// are folded into `Ok(None)` by implementations, per §4.7 ("treated as not
/// found"); only genuine I/O failures should surface as `Err`.
#[async_trait]
pub trait HistoricSource: Send + Sync {
    async fn fetch_prediction(&self, plan_id: i64) -> Result<Option<PredictedFlight>>;
}

/// A `HashMap`-backed `HistoricSource` for tests and local pipeline runs.
#[derive(Clone, Default)]
pub struct MapHistoricSource {
    predictions: std::collections::HashMap<i64, PredictedFlight>,
}

impl MapHistoricSource {
    pub fn new(predictions: Vec<PredictedFlight>) -> Self {
        Self {
            predictions: predictions.into_iter().map(|p| (p.instance_id, p)).collect(),
        }
    }
}

#[async_trait]
impl HistoricSource for MapHistoricSource {
    async fn fetch_prediction(&self, plan_id: i64) -> Result<Option<PredictedFlight>> {
        Ok(self.predictions.get(&plan_id).cloned())
    }
}

/// One endpoint of a prepared flight-plan segment, as the densifier (C8)
/// hands it to the simulator: coordinates in degrees, altitude in feet,
/// speed in knots, and accumulated elapsed time in seconds since route
/// start.
#[derive(Debug, Clone, Copy)]
pub struct SimSegmentEndpoint {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_feet: f64,
    pub speed_knots: f64,
    pub aet_seconds: f64,
}

/// A point the simulator (or the linear-interpolation fallback) produced at
/// a requested time.
#[derive(Debug, Clone, Copy)]
pub struct SimPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_feet: f64,
}

/// The densifier's primary interpolation path (§4.8, §9 "Simulator as
/// capability"): physics-based position at time `t_seconds` given a prepared
/// segment timeline. `None` means the simulator could not produce a point at
/// this time (outside its model, or no physics capability configured) and
/// the caller must fall back to linear interpolation — the fallback is
/// mandatory and must be exercised by tests even when no simulator is wired
/// up.
pub trait TrajectorySimulator: Send + Sync {
    fn simulate(&self, segments: &[SimSegmentEndpoint], t_seconds: f64) -> Option<SimPoint>;
}

/// A simulator that never produces a point, forcing every densification
/// through the linear-interpolation fallback. This is the default when no
/// physics simulator is configured — matching production, where the Sigma
/// simulator is an external system this crate treats as opaque.
#[derive(Default)]
pub struct NullSimulator;

impl TrajectorySimulator for NullSimulator {
    fn simulate(&self, _segments: &[SimSegmentEndpoint], _t_seconds: f64) -> Option<SimPoint> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn vec_replay_source_yields_in_order_then_exhausts() {
        let mut source = VecReplaySource::new(vec![(1, vec![1]), (2, vec![2])]);
        assert_eq!(source.next_packet().await.unwrap(), Some((1, vec![1])));
        assert_eq!(source.next_packet().await.unwrap(), Some((2, vec![2])));
        assert_eq!(source.next_packet().await.unwrap(), None);
    }

    #[test]
    fn null_simulator_always_defers_to_fallback() {
        let sim = NullSimulator;
        assert!(sim.simulate(&[], 0.0).is_none());
    }
}
