//! Prometheus metrics (ambient stack, SPEC_FULL.md's Metrics section).
//!
//! Grounded on `hut8-soar/src/metrics.rs`: same `PrometheusBuilder`
//! histogram-bucket setup and `process_metrics_task` uptime/RSS gauge loop.
//! The profiling endpoints (`pprof`) and the standalone metrics server are
//! dropped — this crate renders `/metrics` off the same router `web.rs`
//! already builds rather than a second listener, and `pprof` has no
//! counterpart in this system (DESIGN.md).

use std::sync::OnceLock;
use std::time::{Duration, Instant};

use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Installs the Prometheus recorder and stores the handle for `/metrics` to
/// render. Call once at startup.
pub fn init_metrics() -> PrometheusHandle {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("pipeline.step.duration_seconds".to_string()),
            &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
        )
        .expect("failed to set buckets for pipeline.step.duration_seconds")
        .install_recorder()
        .expect("failed to install Prometheus recorder");
    METRICS_HANDLE.set(handle.clone()).ok();
    handle
}

/// Renders the current Prometheus text exposition, for the `/metrics` route.
pub fn render() -> Option<String> {
    METRICS_HANDLE.get().map(|h| h.render())
}

/// Background task updating uptime/RSS gauges every 5 seconds, matching the
/// teacher's `process_metrics_task` loop.
pub async fn process_metrics_task() {
    let start_time = Instant::now();
    loop {
        metrics::gauge!("process.uptime.seconds").set(start_time.elapsed().as_secs() as f64);
        metrics::gauge!("process.is_up").set(1.0);

        #[cfg(target_os = "linux")]
        {
            if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
                for line in status.lines() {
                    if line.starts_with("VmRSS:") {
                        if let Some(kb_str) = line.split_whitespace().nth(1)
                            && let Ok(kb) = kb_str.parse::<f64>()
                        {
                            metrics::gauge!("process.memory.bytes").set(kb * 1024.0);
                        }
                        break;
                    }
                }
            }
        }

        tokio::time::sleep(Duration::from_secs(5)).await;
    }
}
