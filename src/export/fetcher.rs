//! Page fetcher for export operations
//!
//! Walks the remote cursor chain page by page and pushes each page into the
//! pipe towards the writer. The fetcher reserves a pipe slot before it
//! issues a request, so with capacity `n` it never requests more than `n`
//! pages the writer has not consumed yet.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{DdlogsError, Result};
use crate::query::Query;
use crate::source::{LogRecord, LogSource, Page, PageRequest};

use super::progress::{PipelineState, ProgressReporter};

/// One fetched page on its way to the writer
#[derive(Debug)]
pub struct PageResult {
    /// 1-based page number in fetch order
    pub page: u64,
    /// Records in result order
    pub records: Vec<LogRecord>,
}

/// Decide whether another page should be requested
///
/// Fetching stops when the cursor is absent, when it is empty, or when the
/// page came back shorter than requested.
///
/// # Returns
/// * `Option<String>` - Cursor for the next request, or `None` when done
pub fn continuation(next_cursor: Option<String>, returned: usize, limit: u32) -> Option<String> {
    let cursor = next_cursor.filter(|c| !c.is_empty())?;
    if returned < limit as usize {
        return None;
    }
    Some(cursor)
}

/// Sequential fetcher driving one query to exhaustion
pub struct PageFetcher {
    source: Arc<dyn LogSource>,
    query: Arc<Query>,
    state: Arc<PipelineState>,
    reporter: ProgressReporter,
    cancel_token: CancellationToken,
}

impl PageFetcher {
    /// Create a new page fetcher
    ///
    /// # Arguments
    /// * `source` - Remote log source
    /// * `query` - Query to run
    /// * `state` - Shared progress counters and error slot
    /// * `reporter` - Status line renderer
    /// * `cancel_token` - Aborts the in-flight request when cancelled
    pub fn new(
        source: Arc<dyn LogSource>,
        query: Arc<Query>,
        state: Arc<PipelineState>,
        reporter: ProgressReporter,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            source,
            query,
            state,
            reporter,
            cancel_token,
        }
    }

    /// Fetch every page into `tx`
    ///
    /// A failure is parked in the shared error slot. The pipe closes when
    /// `tx` is dropped on return, after the error (if any) is visible.
    pub async fn run(self, tx: mpsc::Sender<PageResult>) {
        if let Err(e) = self.fetch_all(&tx).await {
            self.state.set_error(e);
        }
    }

    async fn fetch_all(&self, tx: &mpsc::Sender<PageResult>) -> Result<()> {
        let limit = self.query.page_size;
        let mut cursor: Option<String> = None;
        let mut page: u64 = 1;

        loop {
            let permit = tokio::select! {
                biased;
                _ = self.cancel_token.cancelled() => return Err(DdlogsError::Cancelled),
                permit = tx.reserve() => match permit {
                    Ok(permit) => permit,
                    Err(_) => {
                        debug!("Writer stopped consuming; ending fetch before page {}", page);
                        return Ok(());
                    }
                },
            };

            let request = PageRequest {
                query: &self.query,
                cursor: cursor.as_deref(),
                limit,
            };
            debug!("Requesting page {}", page);

            let fetched = tokio::select! {
                biased;
                _ = self.cancel_token.cancelled() => {
                    info!("Fetch cancelled while requesting page {}", page);
                    return Err(DdlogsError::Cancelled);
                }
                result = self.source.list_page(&request) => result,
            };
            let Page {
                records,
                next_cursor,
            } = fetched.inspect_err(|e| warn!("Page {} request failed: {}", page, e))?;

            let returned = records.len();
            permit.send(PageResult { page, records });

            let snapshot = self.state.record_page(page, returned);
            self.reporter.page_fetched(&snapshot);
            debug!(
                "Fetched page {} ({} records, {} total)",
                page, returned, snapshot.total_records
            );

            match continuation(next_cursor, returned, limit) {
                Some(next) => cursor = Some(next),
                None => {
                    debug!("Result set exhausted after {} page(s)", page);
                    return Ok(());
                }
            }
            page += 1;
        }
    }
}
