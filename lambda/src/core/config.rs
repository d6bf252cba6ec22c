use std::collections::HashMap;
use std::env;

use tracing::{error, warn};

use crate::errors::ConfigError;
use crate::mparticle::batch::BatchEnvironment;

pub const SQS_URL_KEY: &str = "SQS_URL";
pub const BASE_TIMEOUT_KEY: &str = "BASE_TIMEOUT";
pub const TIMEOUT_FACTOR_KEY: &str = "TIMEOUT_FACTOR";
pub const MPARTICLE_DISABLED_KEY: &str = "MPARTICLE_DISABLED";
pub const MPARTICLE_ENVIRONMENT_KEY: &str = "MPARTICLE_ENVIRONMENT";

pub const DEFAULT_BASE_TIMEOUT: u32 = 180;
pub const DEFAULT_TIMEOUT_FACTOR: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub queue_url: String,
    /// Seconds; the first redelivery lands between `base_timeout` and
    /// `base_timeout * timeout_factor`.
    pub base_timeout: u32,
    pub timeout_factor: u32,
    pub mparticle_disabled: bool,
    pub environment: BatchEnvironment,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let queue_url = match vars.get(SQS_URL_KEY) {
            Some(url) if !url.is_empty() => url.clone(),
            _ => {
                error!("QUEUE URL is not set");
                return Err(ConfigError::MissingQueueUrl);
            }
        };

        let base_timeout = int_var(vars, BASE_TIMEOUT_KEY, DEFAULT_BASE_TIMEOUT);
        let mut timeout_factor = int_var(vars, TIMEOUT_FACTOR_KEY, DEFAULT_TIMEOUT_FACTOR);
        if timeout_factor < DEFAULT_TIMEOUT_FACTOR {
            warn!(
                "TIMEOUT_FACTOR {} is below the minimum, adjusting to default value {}",
                timeout_factor, DEFAULT_TIMEOUT_FACTOR
            );
            timeout_factor = DEFAULT_TIMEOUT_FACTOR;
        }

        let mparticle_disabled = int_var(vars, MPARTICLE_DISABLED_KEY, 0) != 0;
        if mparticle_disabled {
            warn!("MPARTICLE_DISABLED is set, NO MESSAGES WILL BE SENT TO mPARTICLE!");
        }

        let environment = match vars.get(MPARTICLE_ENVIRONMENT_KEY) {
            None => BatchEnvironment::default(),
            Some(value) => value.parse().map_err(|value| ConfigError::InvalidValue {
                name: MPARTICLE_ENVIRONMENT_KEY,
                value,
            })?,
        };

        Ok(Self {
            queue_url,
            base_timeout,
            timeout_factor,
            mparticle_disabled,
            environment,
        })
    }
}

fn int_var(vars: &HashMap<String, String>, name: &str, default: u32) -> u32 {
    let Some(value) = vars.get(name) else {
        return default;
    };
    value.trim().parse().unwrap_or_else(|_| {
        warn!(
            "Invalid environment variable for {}: {}. Using default value: {}",
            name, value, default
        );
        default
    })
}
