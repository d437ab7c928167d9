//! Export module for streaming log export operations
//!
//! The pipeline has two halves joined by a bounded pipe:
//!
//! 1. **PageFetcher**: walks the cursor chain of a [`LogSource`](crate::source::LogSource)
//!    on a background task
//! 2. **LogWriter**: renders records to CSV or JSON on the calling task
//!
//! The **ExportCoordinator** wires them together, owns cancellation and the
//! exit policy, and reports progress through a **ProgressReporter**.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use ddlogs::config::{Config, OutputFormat};
//! use ddlogs::export::{ExportCoordinator, OutputWriter, ProgressReporter, open_sink};
//! use ddlogs::query::Query;
//! use ddlogs::source::DatadogSource;
//!
//! # async fn run() -> ddlogs::error::Result<()> {
//! let config = Config::load_from_file(None)?;
//! let source = Arc::new(DatadogSource::from_config(&config)?);
//! let query = Query::new("service:api status:error", "1h", "now", 1000)?;
//! let sink = open_sink(None).await?;
//! let writer = OutputWriter::new(OutputFormat::Json, sink, 256 * 1024);
//!
//! let mut coordinator = ExportCoordinator::new(source, query, writer)
//!     .with_reporter(ProgressReporter::new(true));
//! let summary = coordinator.execute().await?;
//! println!("{} records", summary.records);
//! # Ok(())
//! # }
//! ```

pub mod coordinator;
pub mod fetcher;
pub mod progress;
pub mod writers;

pub use coordinator::{DEFAULT_CHANNEL_CAPACITY, ExportCoordinator, PipelineSummary};
pub use fetcher::{PageFetcher, PageResult, continuation};
pub use progress::{PipelineState, ProgressReporter, ProgressSnapshot};
pub use writers::{
    CsvLogWriter, JsonLogWriter, LogWriter, OutputWriter, Sink, open_sink,
};
