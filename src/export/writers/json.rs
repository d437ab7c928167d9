//! JSON writer for export operations
//!
//! Produces one top-level array, written incrementally. Each record is a
//! pretty-printed element (two-space indentation) so the output stays
//! readable while every nested attribute is preserved.

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::debug;

use crate::error::{DdlogsError, Result};
use crate::source::LogRecord;

use super::LogWriter;

/// Writer for JSON array format
pub struct JsonLogWriter<W> {
    /// Buffered sink
    writer: BufWriter<W>,
    /// Opening bracket written
    started: bool,
    /// Closing bracket written
    finished: bool,
    /// Number of elements written
    written: u64,
}

impl<W: AsyncWrite + Unpin + Send> JsonLogWriter<W> {
    /// Create a new JSON writer
    ///
    /// # Arguments
    /// * `sink` - Output destination
    /// * `buffer_size` - Capacity of the output buffer
    pub fn new(sink: W, buffer_size: usize) -> Self {
        Self {
            writer: BufWriter::with_capacity(buffer_size, sink),
            started: false,
            finished: false,
            written: 0,
        }
    }

    /// Recover the underlying sink
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

/// Pretty-print a record as an array element, indented one level
fn render_element(record: &LogRecord) -> Result<String> {
    let pretty = serde_json::to_string_pretty(record)?;
    let mut element = String::with_capacity(pretty.len() + 64);
    element.push_str("  ");
    // Literal newlines only occur between tokens; string contents are escaped
    element.push_str(&pretty.replace('\n', "\n  "));
    Ok(element)
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> LogWriter for JsonLogWriter<W> {
    async fn start(&mut self) -> Result<()> {
        if !self.started {
            self.writer.write_all(b"[\n").await?;
            self.started = true;
        }
        Ok(())
    }

    async fn write_record(&mut self, record: LogRecord) -> Result<()> {
        if self.finished {
            return Err(DdlogsError::Generic(
                "JSON writer already finalized".to_string(),
            ));
        }
        self.start().await?;

        let element = render_element(&record)?;
        if self.written > 0 {
            self.writer.write_all(b",\n").await?;
        }
        self.writer.write_all(element.as_bytes()).await?;
        self.written += 1;
        Ok(())
    }

    async fn first_page_complete(&mut self) -> Result<()> {
        Ok(())
    }

    async fn finalize(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.start().await?;

        if self.written > 0 {
            self.writer.write_all(b"\n").await?;
        }
        self.writer.write_all(b"]\n").await?;
        self.finished = true;
        self.writer.flush().await?;

        debug!("Finalized JSON output ({} records)", self.written);
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        self.writer.flush().await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.writer.shutdown().await?;
        Ok(())
    }

    fn records_written(&self) -> u64 {
        self.written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::testing::{record, record_with, sample_record};
    use serde_json::{Value, json};

    async fn render(records: Vec<LogRecord>) -> String {
        let mut writer = JsonLogWriter::new(Vec::new(), 64);
        writer.start().await.unwrap();
        for record in records {
            writer.write_record(record).await.unwrap();
        }
        writer.finalize().await.unwrap();
        writer.close().await.unwrap();
        String::from_utf8(writer.into_inner()).unwrap()
    }

    #[tokio::test]
    async fn test_empty_array() {
        let out = render(vec![]).await;
        assert_eq!(out, "[\n]\n");
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed, json!([]));
    }

    #[tokio::test]
    async fn test_single_record_layout() {
        let out = render(vec![record("hi")]).await;
        assert_eq!(
            out,
            "[\n  {\n    \"attributes\": {\n      \"message\": \"hi\"\n    }\n  }\n]\n"
        );
    }

    #[tokio::test]
    async fn test_multiple_records_are_valid_array_in_order() {
        let out = render(vec![record("a"), record("b"), record("c")]).await;
        assert!(!out.contains(",\n]"));

        let parsed: Vec<LogRecord> = serde_json::from_str(&out).unwrap();
        let messages: Vec<&str> = parsed.iter().map(|r| r.message()).collect();
        assert_eq!(messages, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_nested_attributes_preserved() {
        let nested = json!({ "http": { "headers": { "x-id": ["1", "2"] } }, "ok": true });
        let out = render(vec![record_with("n", nested.clone()), sample_record()]).await;

        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed[0]["attributes"]["attributes"], nested);
        assert_eq!(parsed[1]["id"], "AAAB");
        assert_eq!(parsed[1]["type"], "log");
        assert_eq!(parsed[1]["attributes"]["tags"], json!(["env:prod", "team:core"]));
    }

    #[tokio::test]
    async fn test_message_with_newline_stays_escaped() {
        let out = render(vec![record("line1\nline2")]).await;
        assert!(out.contains(r#""message": "line1\nline2""#));
        let parsed: Vec<LogRecord> = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed[0].message(), "line1\nline2");
    }

    #[tokio::test]
    async fn test_streams_before_finalize() {
        let mut writer = JsonLogWriter::new(Vec::new(), 64);
        writer.start().await.unwrap();
        writer.write_record(record("first")).await.unwrap();
        writer.flush().await.unwrap();

        let partial = String::from_utf8(writer.writer.get_ref().clone()).unwrap();
        assert!(partial.starts_with("[\n  {"));
        assert!(partial.contains("first"));
        assert!(!partial.contains(']'));
    }

    #[tokio::test]
    async fn test_finalize_is_idempotent() {
        let mut writer = JsonLogWriter::new(Vec::new(), 64);
        writer.finalize().await.unwrap();
        writer.finalize().await.unwrap();
        assert!(writer.write_record(record("late")).await.is_err());
        assert_eq!(String::from_utf8(writer.into_inner()).unwrap(), "[\n]\n");
    }
}
