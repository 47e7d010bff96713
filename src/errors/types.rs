//! Error type definitions for the M3U checker
//!
//! This module defines the error types used throughout the crate. Per-entry
//! probe failures are never surfaced through these as run failures; they are
//! folded into verification outcomes by the verifier.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Stream entry errors
    #[error("Entry error: {0}")]
    Entry(#[from] EntryError),

    /// Verifier configuration errors
    #[error("Verifier error: {0}")]
    Verifier(#[from] VerifierError),

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Filesystem errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parse errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Errors raised by a single stream entry
#[derive(Error, Debug)]
pub enum EntryError {
    /// The stored URL cannot be parsed
    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// Errors raised while constructing a verifier
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifierError {
    /// Rejected configuration value
    #[error("Invalid configuration: {field} - {message}")]
    InvalidConfig { field: String, message: String },
}

/// Classification of a failed probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeErrorKind {
    /// DNS, TCP or TLS connection could not be established
    ConnectFailed,
    /// The prober gave up waiting on the remote end
    Timeout,
    /// Connected, but the response was unusable
    ProtocolError,
}

impl ProbeErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeErrorKind::ConnectFailed => "connect_failed",
            ProbeErrorKind::Timeout => "timeout",
            ProbeErrorKind::ProtocolError => "protocol_error",
        }
    }
}

impl fmt::Display for ProbeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure reported by a prober
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct ProbeError {
    pub kind: ProbeErrorKind,
    pub message: String,
}

/// Convenience methods for creating common error types
impl AppError {
    /// Create a validation error with a custom message
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

impl EntryError {
    /// Create an invalid URL error
    pub fn invalid_url<U: Into<String>>(url: U, source: url::ParseError) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            source,
        }
    }
}

impl VerifierError {
    /// Create an invalid config error
    pub fn invalid_config<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl ProbeError {
    pub fn new<M: Into<String>>(kind: ProbeErrorKind, message: M) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Create a connection failure
    pub fn connect_failed<M: Into<String>>(message: M) -> Self {
        Self::new(ProbeErrorKind::ConnectFailed, message)
    }

    /// Create a timeout failure
    pub fn timeout<M: Into<String>>(message: M) -> Self {
        Self::new(ProbeErrorKind::Timeout, message)
    }

    /// Create a protocol failure
    pub fn protocol<M: Into<String>>(message: M) -> Self {
        Self::new(ProbeErrorKind::ProtocolError, message)
    }

    /// Whether a second attempt could plausibly succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind,
            ProbeErrorKind::ConnectFailed | ProbeErrorKind::Timeout
        )
    }
}
