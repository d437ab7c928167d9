//! Remote log source abstraction
//!
//! The export pipeline only needs one capability from the remote side:
//! "give me the page after this cursor". [`LogSource`] captures that, and
//! [`DatadogSource`] implements it against the logs search API.

use async_trait::async_trait;

use crate::error::Result;
use crate::query::Query;

pub mod datadog;
pub mod record;

#[cfg(test)]
pub(crate) mod testing;

pub use datadog::DatadogSource;
pub use record::{LogAttributes, LogRecord};

/// Parameters of a single page request
#[derive(Debug, Clone, Copy)]
pub struct PageRequest<'a> {
    /// Query text and time window
    pub query: &'a Query,
    /// Continuation cursor from the previous page, `None` for the first page
    pub cursor: Option<&'a str>,
    /// Maximum number of records to return
    pub limit: u32,
}

/// One page of results as returned by the remote source
#[derive(Debug, Clone, Default)]
pub struct Page {
    /// Records in result order
    pub records: Vec<LogRecord>,
    /// Cursor for the next page; absent or empty when exhausted
    pub next_cursor: Option<String>,
}

/// Trait for paginated log retrieval
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Fetch one page of results
    ///
    /// # Arguments
    /// * `request` - Query, cursor and page size
    ///
    /// # Returns
    /// * `Result<Page>` - Records plus an optional continuation cursor
    async fn list_page(&self, request: &PageRequest<'_>) -> Result<Page>;
}
