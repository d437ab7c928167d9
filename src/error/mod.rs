//! Error handling module for ddlogs.
//!
//! Errors fall into three families that matter to the user:
//! - Remote request failures (any failed page request aborts the run)
//! - Sink write failures (I/O on the output destination)
//! - Configuration errors, surfaced before the pipeline starts
//!
//! Cancellation is reported as its own kind so callers can tell a user
//! interrupt apart from a failure.

pub mod kinds;

// Re-export commonly used types
pub use kinds::{ConfigError, DdlogsError, RemoteError, Result};
