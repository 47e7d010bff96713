//! Configuration default values
//!
//! All default values for configuration options live here so they can be
//! changed in one place.

use std::time::Duration;

// Verifier defaults
pub const DEFAULT_CONCURRENCY: usize = 10;
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

// Prober defaults
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_USER_AGENT: &str = concat!("m3u-checker/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_RANGE_BYTES: u64 = 4096;
pub const DEFAULT_MAX_REDIRECTS: usize = 5;

// Retry defaults
pub const DEFAULT_RETRY_MAX_ATTEMPTS: u32 = 2;
pub const DEFAULT_RETRY_INITIAL_DELAY: Duration = Duration::from_millis(250);
pub const DEFAULT_RETRY_MAX_DELAY: Duration = Duration::from_secs(2);
pub const DEFAULT_RETRY_BACKOFF_MULTIPLIER: f64 = 2.0;

// Stream entry defaults
pub const DEFAULT_GROUP_TITLE: &str = "Undefined";
pub const INTERNATIONAL_AREA_CODE: &str = "r/INT";
