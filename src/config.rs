use std::time::Duration;

use ::config::{Config, Environment};
use serde::{Deserialize, Serialize};

use crate::collaborators::PaymentTrigger;
use crate::domain::tracking::ProgressBreakpoints;

// ============================================================================
// Configuration
// ============================================================================
//
// Defaults cover a local run. `from_env` layers KITCHEN_FLOW_* variables over
// them; nested sections use a double underscore, e.g.
// KITCHEN_FLOW_PROGRESS__READY=80. A value that is set but cannot be
// deserialized is an error, not a fallback.
//
// ============================================================================

const ENV_PREFIX: &str = "KITCHEN_FLOW";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("{field} has an invalid value {value}: {reason}")]
    Invalid {
        field: &'static str,
        value: String,
        reason: &'static str,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FulfillmentConfig {
    /// Zero means fail fast with `Busy` instead of waiting
    pub lock_timeout_ms: u64,
    pub average_speed_kmh: f64,
    pub location_history_capacity: usize,
    pub payment_trigger: PaymentTrigger,
    pub progress: ProgressBreakpoints,
    pub default_pickup_eta_minutes: i64,
    pub metrics_port: u16,
}

impl Default for FulfillmentConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: 2_000,
            average_speed_kmh: 30.0,
            location_history_capacity: 50,
            payment_trigger: PaymentTrigger::Never,
            progress: ProgressBreakpoints::default(),
            default_pickup_eta_minutes: 10,
            metrics_port: 9090,
        }
    }
}

impl FulfillmentConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Defaults, then the environment (or `vars` in its place), then validation
    fn load(vars: Option<::config::Map<String, String>>) -> Result<Self, ConfigError> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(&Self::default())?)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(vars),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.average_speed_kmh.is_finite() && self.average_speed_kmh > 0.0) {
            return Err(invalid("average_speed_kmh", self.average_speed_kmh, "must be positive"));
        }
        if self.location_history_capacity == 0 {
            return Err(invalid("location_history_capacity", 0, "must be at least 1"));
        }
        if self.default_pickup_eta_minutes < 0 {
            return Err(invalid(
                "default_pickup_eta_minutes",
                self.default_pickup_eta_minutes,
                "must not be negative",
            ));
        }
        if !self.progress.is_monotonic() {
            return Err(invalid("progress", format!("{:?}", self.progress), "breakpoints must not decrease"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, value: impl std::fmt::Display, reason: &'static str) -> ConfigError {
    ConfigError::Invalid {
        field,
        value: value.to_string(),
        reason,
    }
}
