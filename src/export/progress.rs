//! Progress tracking for export operations
//!
//! [`PipelineState`] is the only mutable state shared between the fetch
//! task and the writer: progress counters plus the slot where the fetcher
//! parks its terminal error. One mutex guards both; callers copy a
//! [`ProgressSnapshot`] out and format it after the lock is released.
//!
//! [`ProgressReporter`] renders the live status line on stderr.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

use crate::error::DdlogsError;

/// Point-in-time copy of the fetch progress
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSnapshot {
    /// Last completed page number (0 before the first page)
    pub page: u64,
    /// Records fetched so far
    pub total_records: u64,
    /// Time since the pipeline started
    pub elapsed: Duration,
}

impl ProgressSnapshot {
    /// Records per second over the whole run
    pub fn rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.total_records as f64 / secs
        } else {
            0.0
        }
    }
}

struct Inner {
    total_records: u64,
    last_page: u64,
    started: Instant,
    fetch_error: Option<DdlogsError>,
}

/// Counters and error slot shared by the fetch task and the writer
pub struct PipelineState {
    inner: Mutex<Inner>,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineState {
    /// Start the clock with zeroed counters
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                total_records: 0,
                last_page: 0,
                started: Instant::now(),
                fetch_error: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Counters stay meaningful even if a holder panicked
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Account for one completed page and return the updated progress
    pub fn record_page(&self, page: u64, records: usize) -> ProgressSnapshot {
        let mut inner = self.lock();
        inner.total_records += records as u64;
        inner.last_page = page;
        ProgressSnapshot {
            page: inner.last_page,
            total_records: inner.total_records,
            elapsed: inner.started.elapsed(),
        }
    }

    /// Current progress
    pub fn snapshot(&self) -> ProgressSnapshot {
        let inner = self.lock();
        ProgressSnapshot {
            page: inner.last_page,
            total_records: inner.total_records,
            elapsed: inner.started.elapsed(),
        }
    }

    /// Park the fetcher's terminal error; the first one wins
    pub fn set_error(&self, err: DdlogsError) {
        let mut inner = self.lock();
        if inner.fetch_error.is_none() {
            inner.fetch_error = Some(err);
        }
    }

    /// Take the parked error, if any
    pub fn take_error(&self) -> Option<DdlogsError> {
        self.lock().fetch_error.take()
    }
}

/// Format the live status line
pub fn format_status(snapshot: &ProgressSnapshot) -> String {
    format!(
        "Fetching... page {} | {} logs | {:.1}s | {:.0} logs/sec",
        snapshot.page,
        snapshot.total_records,
        snapshot.elapsed.as_secs_f64(),
        snapshot.rate()
    )
}

/// Format the terminal summary line
pub fn format_summary(snapshot: &ProgressSnapshot) -> String {
    format!(
        "Done: {} logs retrieved in {:.1}s across {} page(s)",
        snapshot.total_records,
        snapshot.elapsed.as_secs_f64(),
        snapshot.page
    )
}

/// Progress reporter for export operations
///
/// Cheap to clone; clones drive the same status line.
#[derive(Clone)]
pub struct ProgressReporter {
    /// Spinner on stderr, hidden when disabled
    bar: ProgressBar,
    /// Whether anything is printed at all
    enabled: bool,
    /// Output file, mentioned in the summary
    output_path: Option<PathBuf>,
}

impl ProgressReporter {
    /// Create a new progress reporter
    ///
    /// # Arguments
    /// * `enabled` - Whether to display the status line and summary
    pub fn new(enabled: bool) -> Self {
        let bar = if enabled {
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            bar.enable_steady_tick(Duration::from_millis(120));
            bar.set_message("Fetching... page 0 | 0 logs");
            bar
        } else {
            ProgressBar::hidden()
        };

        Self {
            bar,
            enabled,
            output_path: None,
        }
    }

    /// Reporter that prints nothing
    pub fn hidden() -> Self {
        Self::new(false)
    }

    /// Mention `path` in the terminal summary
    pub fn with_output_path(mut self, path: Option<&Path>) -> Self {
        self.output_path = path.map(Path::to_path_buf);
        self
    }

    /// Update the status line after a page was fetched
    pub fn page_fetched(&self, snapshot: &ProgressSnapshot) {
        self.bar.set_message(format_status(snapshot));
    }

    /// Clear the status line and print the summary
    pub fn finish(&self, snapshot: &ProgressSnapshot) {
        self.bar.finish_and_clear();
        if self.enabled {
            eprintln!("{}", format_summary(snapshot));
            if let Some(ref path) = self.output_path {
                eprintln!("Output written to {}", path.display());
            }
        }
    }

    /// Clear the status line without a summary
    pub fn abandon(&self) {
        self.bar.finish_and_clear();
    }
}
