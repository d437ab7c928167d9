//! Export coordinator for orchestrating export operations
//!
//! Runs the page fetcher as a background task and drains its pipe into the
//! writer on the calling task. The coordinator owns the exit policy:
//! - clean exhaustion finalizes the output
//! - cancellation finalizes what was written so far and reports `Cancelled`
//! - a fetch or sink error leaves the output as flushed so far (not
//!   finalized) and surfaces the error
//!
//! The writer is closed on every path.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{DdlogsError, Result};
use crate::query::Query;
use crate::source::LogSource;

use super::fetcher::{PageFetcher, PageResult};
use super::progress::{PipelineState, ProgressReporter};
use super::writers::LogWriter;

/// Pages the fetcher may run ahead of the writer
pub const DEFAULT_CHANNEL_CAPACITY: usize = 2;

/// Result of a completed export
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineSummary {
    /// Records retrieved
    pub records: u64,
    /// Pages retrieved
    pub pages: u64,
    /// Wall time of the run
    pub elapsed: Duration,
}

/// How the writer side stopped draining the pipe
enum Drain {
    /// The fetcher closed the pipe
    Exhausted,
    /// The cancellation token fired
    Cancelled,
}

/// Coordinator for export operations
pub struct ExportCoordinator<W> {
    /// Remote source shared with the fetch task
    source: Arc<dyn LogSource>,
    /// Query shared with the fetch task
    query: Arc<Query>,
    /// Output writer, driven on the calling task
    writer: W,
    /// Status line
    reporter: ProgressReporter,
    /// Pipe capacity in pages
    channel_capacity: usize,
    /// Cancellation token for aborting the export
    cancel_token: CancellationToken,
}

impl<W: LogWriter> ExportCoordinator<W> {
    /// Create a new export coordinator
    ///
    /// # Arguments
    /// * `source` - Remote log source
    /// * `query` - Query to export
    /// * `writer` - Destination format writer
    pub fn new(source: Arc<dyn LogSource>, query: Query, writer: W) -> Self {
        Self {
            source,
            query: Arc::new(query),
            writer,
            reporter: ProgressReporter::hidden(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Set the progress reporter
    pub fn with_reporter(mut self, reporter: ProgressReporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Set the pipe capacity (at least one page)
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    /// Set cancellation token for this export operation
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    /// Recover the writer
    pub fn into_writer(self) -> W {
        self.writer
    }

    /// Execute the export operation
    ///
    /// # Returns
    /// * `Result<PipelineSummary>` - Export statistics or the first error
    pub async fn execute(&mut self) -> Result<PipelineSummary> {
        info!(
            "Starting export: query={:?} from={} to={} page_size={}",
            self.query.text, self.query.from, self.query.to, self.query.page_size
        );

        let state = Arc::new(PipelineState::new());
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let fetch_token = self.cancel_token.child_token();

        let fetcher = PageFetcher::new(
            self.source.clone(),
            self.query.clone(),
            state.clone(),
            self.reporter.clone(),
            fetch_token.clone(),
        );
        let handle = tokio::spawn(fetcher.run(tx));

        let drained = self.drain(rx).await;
        if drained.is_err() {
            // Stop fetching pages nobody will write
            fetch_token.cancel();
        }
        let joined = handle.await;

        let outcome = self.complete(drained, joined, &state).await;
        let closed = self.writer.close().await;

        match outcome {
            Ok(()) => {
                closed?;
                let snapshot = state.snapshot();
                self.reporter.finish(&snapshot);
                info!(
                    "Export completed: {} records, {} pages, {} ms",
                    snapshot.total_records,
                    snapshot.page,
                    snapshot.elapsed.as_millis()
                );
                Ok(PipelineSummary {
                    records: snapshot.total_records,
                    pages: snapshot.page,
                    elapsed: snapshot.elapsed,
                })
            }
            Err(e) => {
                if let Err(close_err) = closed {
                    warn!("Failed to close output after error: {}", close_err);
                }
                self.reporter.abandon();
                Err(e)
            }
        }
    }

    /// Write every page from the pipe, in arrival order
    async fn drain(&mut self, mut rx: mpsc::Receiver<PageResult>) -> Result<Drain> {
        let cancel = self.cancel_token.clone();
        let mut first_page = true;

        self.writer.start().await?;
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(Drain::Cancelled),
                next = rx.recv() => next,
            };
            let Some(PageResult { page, records }) = next else {
                return Ok(Drain::Exhausted);
            };

            let count = records.len();
            for record in records {
                self.writer.write_record(record).await?;
            }
            if first_page {
                self.writer.first_page_complete().await?;
                first_page = false;
            }
            self.writer.flush().await?;
            debug!("Wrote page {} ({} records)", page, count);
        }
    }

    /// Apply the exit policy once both sides have stopped
    async fn complete(
        &mut self,
        drained: Result<Drain>,
        joined: std::result::Result<(), JoinError>,
        state: &PipelineState,
    ) -> Result<()> {
        match drained? {
            Drain::Cancelled => {
                info!("Export operation cancelled by user");
                self.writer.finalize().await?;
                Err(DdlogsError::Cancelled)
            }
            Drain::Exhausted => {
                if let Err(e) = joined {
                    return Err(DdlogsError::Generic(format!("Fetch task failed: {}", e)));
                }
                if self.cancel_token.is_cancelled() {
                    info!("Export operation cancelled by user");
                    self.writer.finalize().await?;
                    return Err(DdlogsError::Cancelled);
                }
                if let Some(e) = state.take_error() {
                    warn!("Export stopped by fetch error: {}", e);
                    return Err(e);
                }
                self.writer.finalize().await
            }
        }
    }
}
