//! Host configuration.
//!
//! A host is configured with the fork it meters storage for, optionally
//! overriding individual schedule parameters:
//!
//! ```json
//! {
//!   "fork": "constantinople",
//!   "overrides": { "sstore_refund_nonzero_gas": 4800 }
//! }
//! ```

use crate::errors::ConfigError;
use crate::types::{Fork, HostSchedule};
use serde::{Deserialize, Serialize};
use std::{path::Path, str::FromStr};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleOverrides {
    pub eip1283_mode: Option<bool>,
    pub sstore_refund_gas: Option<i64>,
    pub sstore_refund_nonzero_gas: Option<i64>,
    pub max_refund_quotient: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostConfig {
    pub fork: String,
    #[serde(default)]
    pub overrides: ScheduleOverrides,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            fork: Fork::default().to_string(),
            overrides: ScheduleOverrides::default(),
        }
    }
}

impl HostConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: HostConfig = serde_json::from_str(json)?;
        // Surface bad fork names at load time rather than on first use.
        config.fork()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading host config");
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn fork(&self) -> Result<Fork, ConfigError> {
        Fork::from_str(&self.fork).map_err(|_| ConfigError::UnknownFork(self.fork.clone()))
    }

    /// Resolves the fork preset and applies the overrides on top of it.
    pub fn schedule(&self) -> Result<HostSchedule, ConfigError> {
        let mut schedule = *HostSchedule::for_fork(self.fork()?);
        let overrides = &self.overrides;
        if let Some(mode) = overrides.eip1283_mode {
            schedule.eip1283_mode = mode;
        }
        if let Some(refund) = overrides.sstore_refund_gas {
            schedule.sstore_refund_gas = refund;
        }
        if let Some(refund) = overrides.sstore_refund_nonzero_gas {
            schedule.sstore_refund_nonzero_gas = refund;
        }
        if let Some(quotient) = overrides.max_refund_quotient {
            if quotient == 0 {
                return Err(ConfigError::Custom(
                    "max_refund_quotient must be greater than zero".to_string(),
                ));
            }
            schedule.max_refund_quotient = quotient;
        }
        Ok(schedule)
    }
}
