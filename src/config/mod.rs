use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod defaults;
pub mod duration_serde;

use crate::errors::{AppError, AppResult};
use crate::utils::retry::RetryConfig;
use defaults::*;
use duration_serde::{duration, option_duration};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub verifier: VerifierConfig,
    #[serde(default)]
    pub prober: ProberConfig,
}

/// Orchestration limits for a verification run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifierConfig {
    /// Maximum number of probes in flight at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Deadline for a single probe
    #[serde(default = "default_probe_timeout", with = "duration")]
    pub probe_timeout: Duration,
    /// Optional deadline for the whole run; entries still pending when it
    /// expires are reported as timed out
    #[serde(
        default,
        with = "option_duration",
        skip_serializing_if = "Option::is_none"
    )]
    pub run_deadline: Option<Duration>,
}

/// Settings for the HTTP prober
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProberConfig {
    #[serde(default = "default_connect_timeout", with = "duration")]
    pub connect_timeout: Duration,
    /// User agent sent when an entry carries no override
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Number of bytes requested from the start of the stream
    #[serde(default = "default_range_bytes")]
    pub range_bytes: u64,
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// Retry transient failures; absent means a single attempt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryConfig>,
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_probe_timeout() -> Duration {
    DEFAULT_PROBE_TIMEOUT
}

fn default_connect_timeout() -> Duration {
    DEFAULT_CONNECT_TIMEOUT
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_range_bytes() -> u64 {
    DEFAULT_RANGE_BYTES
}

fn default_max_redirects() -> usize {
    DEFAULT_MAX_REDIRECTS
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            probe_timeout: default_probe_timeout(),
            run_deadline: None,
        }
    }
}

impl Default for ProberConfig {
    fn default() -> Self {
        Self {
            connect_timeout: default_connect_timeout(),
            user_agent: default_user_agent(),
            range_bytes: default_range_bytes(),
            max_redirects: default_max_redirects(),
            retry: None,
        }
    }
}

impl Config {
    pub fn load_from_file(config_file: &str) -> AppResult<Self> {
        if Path::new(config_file).exists() {
            let contents = std::fs::read_to_string(config_file)?;
            Self::from_toml(&contents)
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)
                .map_err(|e| AppError::configuration(format!("Failed to render config: {e}")))?;
            std::fs::write(config_file, contents)?;
            info!("Created default config file: {}", config_file);
            Ok(default_config)
        }
    }

    pub fn from_toml(contents: &str) -> AppResult<Self> {
        Ok(toml::from_str(contents)?)
    }
}
