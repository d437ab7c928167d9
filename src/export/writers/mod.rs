//! Format writers for export operations
//!
//! Every writer follows the same four-step contract driven by the
//! coordinator: `start`, `write_record` for each record in arrival order,
//! `first_page_complete` once after the first page, and `finalize` at the
//! end of a successful run. `flush` pushes buffered bytes to the sink and
//! `close` flushes and shuts the sink down; the coordinator calls `close`
//! on every exit path.

use std::io;
use std::path::Path;

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::AsyncWrite;
use tracing::debug;

use crate::config::OutputFormat;
use crate::error::Result;
use crate::source::LogRecord;

pub mod csv;
pub mod json;

pub use self::csv::{ColumnSchema, CsvLogWriter, FIXED_COLUMNS, flatten_value};
pub use self::json::JsonLogWriter;

/// Byte destination for the export
pub type Sink = Box<dyn AsyncWrite + Send + Unpin>;

/// Trait for streaming log records to an output format
#[async_trait]
pub trait LogWriter: Send {
    /// Emit any leading framing (e.g. an opening bracket)
    async fn start(&mut self) -> Result<()>;

    /// Accept one record; it may be written immediately or held
    ///
    /// # Arguments
    /// * `record` - Record to write, ownership moves into the writer
    async fn write_record(&mut self, record: LogRecord) -> Result<()>;

    /// Signal that every record of the first page has been passed in
    async fn first_page_complete(&mut self) -> Result<()>;

    /// Emit trailing framing and release any held records
    async fn finalize(&mut self) -> Result<()>;

    /// Push buffered bytes to the sink
    async fn flush(&mut self) -> Result<()>;

    /// Flush and shut the sink down
    async fn close(&mut self) -> Result<()>;

    /// Number of records rendered to the output so far
    fn records_written(&self) -> u64;
}

/// Writer for one of the supported output formats
pub enum OutputWriter<W> {
    Csv(CsvLogWriter<W>),
    Json(JsonLogWriter<W>),
}

impl<W: AsyncWrite + Unpin + Send> OutputWriter<W> {
    /// Create a writer for `format` over `sink`
    ///
    /// # Arguments
    /// * `format` - Output format
    /// * `sink` - Destination
    /// * `buffer_size` - Capacity of the in-memory output buffer
    pub fn new(format: OutputFormat, sink: W, buffer_size: usize) -> Self {
        match format {
            OutputFormat::Csv => OutputWriter::Csv(CsvLogWriter::new(sink, buffer_size)),
            OutputFormat::Json => OutputWriter::Json(JsonLogWriter::new(sink, buffer_size)),
        }
    }

    /// Recover the underlying sink
    pub fn into_inner(self) -> W {
        match self {
            OutputWriter::Csv(w) => w.into_inner(),
            OutputWriter::Json(w) => w.into_inner(),
        }
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> LogWriter for OutputWriter<W> {
    async fn start(&mut self) -> Result<()> {
        match self {
            OutputWriter::Csv(w) => w.start().await,
            OutputWriter::Json(w) => w.start().await,
        }
    }

    async fn write_record(&mut self, record: LogRecord) -> Result<()> {
        match self {
            OutputWriter::Csv(w) => w.write_record(record).await,
            OutputWriter::Json(w) => w.write_record(record).await,
        }
    }

    async fn first_page_complete(&mut self) -> Result<()> {
        match self {
            OutputWriter::Csv(w) => w.first_page_complete().await,
            OutputWriter::Json(w) => w.first_page_complete().await,
        }
    }

    async fn finalize(&mut self) -> Result<()> {
        match self {
            OutputWriter::Csv(w) => w.finalize().await,
            OutputWriter::Json(w) => w.finalize().await,
        }
    }

    async fn flush(&mut self) -> Result<()> {
        match self {
            OutputWriter::Csv(w) => w.flush().await,
            OutputWriter::Json(w) => w.flush().await,
        }
    }

    async fn close(&mut self) -> Result<()> {
        match self {
            OutputWriter::Csv(w) => w.close().await,
            OutputWriter::Json(w) => w.close().await,
        }
    }

    fn records_written(&self) -> u64 {
        match self {
            OutputWriter::Csv(w) => w.records_written(),
            OutputWriter::Json(w) => w.records_written(),
        }
    }
}

/// Open the output destination
///
/// # Arguments
/// * `path` - File to create, or `None` for standard output
///
/// # Returns
/// * `Result<Sink>` - Unbuffered sink; writers add their own buffer
pub async fn open_sink(path: Option<&Path>) -> Result<Sink> {
    match path {
        Some(path) => {
            validate_path(path)?;
            let file = File::create(path).await.map_err(|e| {
                io::Error::new(
                    e.kind(),
                    format!("Failed to create {}: {}", path.display(), e),
                )
            })?;
            debug!("Writing output to {}", path.display());
            Ok(Box::new(file))
        }
        None => Ok(Box::new(tokio::io::stdout())),
    }
}

/// Helper function to validate file path and directory
///
/// # Arguments
/// * `path` - File path to validate
///
/// # Returns
/// * `Result<()>` - Success or error
pub(crate) fn validate_path(path: &Path) -> Result<()> {
    // Check if parent directory exists
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("Directory does not exist: {}", parent.display()),
            )
            .into());
        }
    }

    Ok(())
}
