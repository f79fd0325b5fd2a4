//! Provider configuration
//!
//! Read from the `provider` block of a configuration as an attribute map,
//! the same way state backends read their settings.

use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use stratus_core::arn::partition_for_region;
use stratus_core::resource::Value;
use thiserror::Error;

static REGION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]{2}(-[a-z]+)+-\d+$").expect("valid region pattern"));

static ACCOUNT_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{12}$").expect("valid account id pattern"));

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Missing required attribute: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {attribute}: {message}")]
    Invalid {
        attribute: &'static str,
        message: String,
    },
}

/// Backoff settings for retried API calls
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Give up once this much time has passed since the first attempt
    pub timeout: Duration,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15 * 60),
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Delay before retry number `attempt` (0-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt.min(32) as i32);
        let delay = self.initial_delay.as_secs_f64() * factor;
        Duration::from_secs_f64(delay.min(self.max_delay.as_secs_f64()))
    }
}

/// Settings of the AWS provider
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    pub region: String,
    /// Named profile from the shared config files
    pub profile: Option<String>,
    /// Resolved through STS when not set
    pub account_id: Option<String>,
    pub partition: String,
    pub retry: RetryConfig,
}

impl ProviderConfig {
    pub fn new(region: impl Into<String>) -> Self {
        let region = region.into();
        Self {
            partition: partition_for_region(&region).to_string(),
            region,
            profile: None,
            account_id: None,
            retry: RetryConfig::default(),
        }
    }

    /// Build from provider attributes
    ///
    /// Recognized keys: `region` (required), `profile`, `account_id`,
    /// `partition`, `retry_timeout_secs`, `retry_max_delay_secs`.
    pub fn from_attributes(attributes: &HashMap<String, Value>) -> Result<Self, ConfigError> {
        let region = get_string(attributes, "region").ok_or(ConfigError::Missing("region"))?;
        if !REGION_PATTERN.is_match(region) {
            return Err(ConfigError::Invalid {
                attribute: "region",
                message: format!("'{}' is not a region name", region),
            });
        }

        let mut config = Self::new(region);
        config.profile = get_string(attributes, "profile").map(str::to_string);

        if let Some(account_id) = get_string(attributes, "account_id") {
            if !ACCOUNT_ID_PATTERN.is_match(account_id) {
                return Err(ConfigError::Invalid {
                    attribute: "account_id",
                    message: format!("'{}' is not a 12-digit account ID", account_id),
                });
            }
            config.account_id = Some(account_id.to_string());
        }

        if let Some(partition) = get_string(attributes, "partition") {
            config.partition = partition.to_string();
        }

        if let Some(secs) = get_seconds(attributes, "retry_timeout_secs")? {
            config.retry.timeout = secs;
        }
        if let Some(secs) = get_seconds(attributes, "retry_max_delay_secs")? {
            config.retry.max_delay = secs;
        }

        Ok(config)
    }
}

fn get_string<'a>(attributes: &'a HashMap<String, Value>, key: &str) -> Option<&'a str> {
    attributes.get(key).and_then(Value::as_str)
}

fn get_seconds(
    attributes: &HashMap<String, Value>,
    key: &'static str,
) -> Result<Option<Duration>, ConfigError> {
    match attributes.get(key) {
        None => Ok(None),
        Some(Value::Int(n)) if *n >= 0 => Ok(Some(Duration::from_secs(*n as u64))),
        Some(other) => Err(ConfigError::Invalid {
            attribute: key,
            message: format!("expected a non-negative number of seconds, got {:?}", other),
        }),
    }
}
