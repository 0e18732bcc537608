//! Process configuration, resolved once from the environment.
//!
//! The original codebase read `std::env::var(...)` at scattered call sites
//! (see `ingest_config.rs`, `commands/ingest.rs`); here it is consolidated
//! into a single typed struct built once at startup.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::env;
use std::net::IpAddr;

/// Tolerance applied when disambiguating a real-path group against several
/// candidate flights sharing an indicative (§4.6).
pub const DISAMBIGUATION_TOLERANCE_MINUTES: i64 = 30;

/// Geographic gate applied when matching a qualified prediction to a flight
/// (§4.9): both endpoints must land within this many nautical miles.
pub const MATCH_GATE_NAUTICAL_MILES: f64 = 2.0;

/// Flight level ceiling (hundreds of feet) a matched endpoint must be at or
/// below to pass the geographic gate (§4.9).
pub const MATCH_GATE_MAX_FLIGHT_LEVEL: f64 = 4.0;

/// Pacing delay applied every `PREDICTION_PACING_BATCH_SIZE` items while
/// extracting predictions from the historic store (§4.7).
pub const PREDICTION_PACING_DELAY_MS: u64 = 50;
pub const PREDICTION_PACING_BATCH_SIZE: usize = 10;

/// Punctuality tolerance windows, in minutes (§4.10).
pub const PUNCTUALITY_WINDOWS_MINUTES: [i64; 3] = [3, 5, 15];

#[derive(Debug, Clone)]
pub struct Config {
    /// Interface the REST server binds to.
    pub bind_address: IpAddr,
    /// Port the REST server binds to.
    pub bind_port: u16,
    /// Default processing date used by `/api/oracle/process` when the
    /// caller omits `date`.
    pub default_processing_date: NaiveDate,
    /// Sentry DSN, if error reporting is enabled.
    pub sentry_dsn: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Mirrors the teacher's `dotenvy::dotenv().ok()` call in `lib.rs` /
        // `main.rs` - missing .env is fine, explicit env vars still work.
        dotenvy::dotenv().ok();

        let bind_address = env::var("BIND_ADDRESS")
            .unwrap_or_else(|_| "0.0.0.0".to_string())
            .parse()
            .context("BIND_ADDRESS must be a valid IP address")?;

        let bind_port: u16 = env::var("BIND_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .context("BIND_PORT must be a valid port number")?;

        let default_processing_date = match env::var("DEFAULT_PROCESSING_DATE") {
            Ok(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .context("DEFAULT_PROCESSING_DATE must be YYYY-MM-DD")?,
            Err(_) => chrono::Utc::now().date_naive(),
        };

        let sentry_dsn = env::var("SENTRY_DSN").ok();

        Ok(Config {
            bind_address,
            bind_port,
            default_processing_date,
            sentry_dsn,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn defaults_apply_when_env_unset() {
        unsafe {
            env::remove_var("BIND_ADDRESS");
            env::remove_var("BIND_PORT");
            env::remove_var("DEFAULT_PROCESSING_DATE");
            env::remove_var("SENTRY_DSN");
        }
        let cfg = Config::from_env().expect("defaults should be sufficient");
        assert_eq!(cfg.bind_port, 8080);
        assert!(cfg.sentry_dsn.is_none());
    }

    #[test]
    #[serial]
    fn rejects_bad_port() {
        unsafe {
            env::set_var("BIND_PORT", "not-a-port");
        }
        let result = Config::from_env();
        unsafe {
            env::remove_var("BIND_PORT");
        }
        assert!(result.is_err());
    }
}
