//! Retry policy and backoff calculation for transient probe failures

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::defaults::*;
use crate::config::duration_serde::duration;

/// Configuration for probe retry behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry
    #[serde(default = "default_initial_delay", with = "duration")]
    pub initial_delay: Duration,
    /// Upper bound for the exponential delay
    #[serde(default = "default_max_delay", with = "duration")]
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    /// Whether to add up to 25% jitter to each delay
    #[serde(default = "default_jitter")]
    pub jitter: bool,
}

fn default_max_attempts() -> u32 {
    DEFAULT_RETRY_MAX_ATTEMPTS
}

fn default_initial_delay() -> Duration {
    DEFAULT_RETRY_INITIAL_DELAY
}

fn default_max_delay() -> Duration {
    DEFAULT_RETRY_MAX_DELAY
}

fn default_backoff_multiplier() -> f64 {
    DEFAULT_RETRY_BACKOFF_MULTIPLIER
}

fn default_jitter() -> bool {
    true
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: default_jitter(),
        }
    }
}

impl RetryConfig {
    /// A policy that never retries
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }
}

/// Delay to wait after the given (1-based) failed attempt
pub fn calculate_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let exponential_delay = config.initial_delay.as_millis() as f64
        * config
            .backoff_multiplier
            .powi(attempt.saturating_sub(1) as i32);

    let delay_ms = exponential_delay.min(config.max_delay.as_millis() as f64) as u64;

    let final_delay = if config.jitter {
        delay_ms + fastrand::u64(0..=delay_ms / 4)
    } else {
        delay_ms
    };

    Duration::from_millis(final_delay)
}
