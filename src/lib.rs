//! Datadog Logs Exporter Library
//!
//! Core of the `ddlogs` tool: runs a log search against the Datadog API,
//! follows pagination cursors to the end of the result set and streams every
//! record to CSV or JSON while the next pages are being fetched.
//!
//! # Modules
//!
//! - `cli`: Command-line interface and argument parsing
//! - `config`: Configuration management
//! - `error`: Error types and handling
//! - `export`: Fetch/write pipeline, progress reporting and format writers
//! - `query`: Query text and time window
//! - `source`: Remote log source abstraction and the Datadog client
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use ddlogs::config::Config;
//! use ddlogs::export::{ExportCoordinator, OutputWriter, open_sink};
//! use ddlogs::query::Query;
//! use ddlogs::source::DatadogSource;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.apply_env();
//!
//!     let source = Arc::new(DatadogSource::from_config(&config)?);
//!     let query = Query::new("service:api", "1h", "now", 1000)?;
//!     let sink = open_sink(Some("errors.csv".as_ref())).await?;
//!     let writer = OutputWriter::new(config.output.format, sink, config.output.buffer_size);
//!
//!     let summary = ExportCoordinator::new(source, query, writer).execute().await?;
//!     println!("Exported {} logs", summary.records);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod query;
pub mod source;

// Re-export commonly used types
pub use config::Config;
pub use error::{DdlogsError, Result};
pub use export::{ExportCoordinator, PipelineSummary};
pub use query::{Query, TimeBound};
pub use source::{DatadogSource, LogRecord, LogSource};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version string
///
/// # Returns
/// * `&str` - Version string
pub fn version() -> &'static str {
    VERSION
}
