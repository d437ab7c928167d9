//! In-memory log sources for pipeline tests

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use crate::error::{DdlogsError, RemoteError, Result};

use super::{LogAttributes, LogRecord, LogSource, Page, PageRequest};

/// Source replaying a fixed script of page responses
///
/// Once the script is exhausted every further call fails, so a test that
/// over-fetches notices.
pub struct ScriptedSource {
    responses: Mutex<VecDeque<Result<Page>>>,
    cursors: Mutex<Vec<Option<String>>>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(responses: Vec<Result<Page>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            cursors: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Pages of the given sizes, chained with cursors `c1`, `c2`, ...
    ///
    /// The last page carries no cursor. Record messages are numbered
    /// globally (`log-0`, `log-1`, ...).
    pub fn paged(sizes: &[usize]) -> Self {
        let mut next = 0;
        let responses = sizes
            .iter()
            .enumerate()
            .map(|(i, &size)| {
                let records = (next..next + size).map(|n| record(&format!("log-{n}"))).collect();
                next += size;
                let next_cursor = (i + 1 < sizes.len()).then(|| format!("c{}", i + 1));
                Ok(Page {
                    records,
                    next_cursor,
                })
            })
            .collect();
        Self::new(responses)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Cursor passed to each call, in call order
    pub fn cursors(&self) -> Vec<Option<String>> {
        self.cursors.lock().unwrap().clone()
    }
}

#[async_trait]
impl LogSource for ScriptedSource {
    async fn list_page(&self, request: &PageRequest<'_>) -> Result<Page> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.cursors
            .lock()
            .unwrap()
            .push(request.cursor.map(str::to_string));

        let next = self.responses.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(DdlogsError::Generic("script exhausted".to_string())))
    }
}

/// Source that returns full pages with a cursor forever
pub struct EndlessSource {
    calls: AtomicUsize,
}

impl EndlessSource {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LogSource for EndlessSource {
    async fn list_page(&self, request: &PageRequest<'_>) -> Result<Page> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Page {
            records: (0..request.limit).map(|i| record(&format!("p{n}-{i}"))).collect(),
            next_cursor: Some(format!("c{}", n + 1)),
        })
    }
}

/// Source whose requests never complete
pub struct HangingSource;

#[async_trait]
impl LogSource for HangingSource {
    async fn list_page(&self, _request: &PageRequest<'_>) -> Result<Page> {
        std::future::pending().await
    }
}

/// Source that serves one page and then never completes another request
pub struct StallingSource {
    first: Mutex<Option<Page>>,
    calls: AtomicUsize,
}

impl StallingSource {
    pub fn new(first: Page) -> Self {
        Self {
            first: Mutex::new(Some(first)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LogSource for StallingSource {
    async fn list_page(&self, _request: &PageRequest<'_>) -> Result<Page> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let first = self.first.lock().unwrap().take();
        match first {
            Some(page) => Ok(page),
            None => std::future::pending().await,
        }
    }
}

/// Failure as produced by a rejected request
pub fn remote_failure() -> DdlogsError {
    RemoteError::Status {
        status: 500,
        body: "internal error".to_string(),
    }
    .into()
}

/// Record with only a message
pub fn record(message: &str) -> LogRecord {
    LogRecord {
        attributes: LogAttributes {
            message: Some(message.to_string()),
            ..Default::default()
        },
        id: None,
        kind: None,
    }
}

/// Record with a message and the given custom attributes (a JSON object)
pub fn record_with(message: &str, custom: Value) -> LogRecord {
    let mut rec = record(message);
    rec.attributes.attributes = match custom {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    rec
}

/// Fully populated record
pub fn sample_record() -> LogRecord {
    serde_json::from_value(json!({
        "id": "AAAB",
        "type": "log",
        "attributes": {
            "timestamp": "2024-05-01T08:30:00Z",
            "host": "web-1",
            "service": "api",
            "status": "error",
            "message": "request failed, retrying",
            "tags": ["env:prod", "team:core"],
            "attributes": {
                "customer_id": "abc123",
                "duration": 12.5,
                "http": { "method": "GET", "status_code": 500 }
            }
        }
    }))
    .unwrap()
}
