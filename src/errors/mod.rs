//! Centralized error handling for the M3U checker
//!
//! Errors are split by layer so that each component only exposes the failures
//! it can actually produce:
//!
//! - **Entry Errors**: a stream entry whose URL cannot be parsed
//! - **Probe Errors**: transport/protocol failures reported by a prober
//! - **Verifier Errors**: configuration rejected before a run starts
//! - **App Errors**: everything the binary surfaces (config, IO, HTTP client)
//!
//! # Usage
//!
//! ```rust
//! use m3u_checker::errors::{AppError, AppResult};
//!
//! fn example_function() -> AppResult<String> {
//!     Err(AppError::validation("no entries supplied"))
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for stream entry Results
pub type EntryResult<T> = Result<T, EntryError>;

/// Convenience type alias for prober Results
pub type ProbeOutcome<T> = Result<T, ProbeError>;

/// Convenience type alias for verifier construction Results
pub type VerifierResult<T> = Result<T, VerifierError>;
