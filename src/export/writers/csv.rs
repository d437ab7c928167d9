//! CSV writer for export operations
//!
//! Columns are the fixed log fields followed by the custom attributes seen
//! on the first page, sorted by name. Until the first page is complete the
//! writer holds records in memory to learn those attribute names; after
//! that the schema is frozen and every record is written as it arrives.
//! Attributes that first show up on a later page have no column and are
//! dropped from their row.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::SecondsFormat;
use serde_json::Value;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::error::{DdlogsError, Result};
use crate::source::LogRecord;

use super::LogWriter;

/// Columns present in every CSV export, in output order
pub const FIXED_COLUMNS: [&str; 6] = ["timestamp", "host", "service", "status", "message", "tags"];

/// Internal buffer of the row encoder
const ROW_BUFFER: usize = 512;

/// Frozen column layout of a CSV export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
    attribute_columns: Vec<String>,
}

impl ColumnSchema {
    /// Build the schema from the custom attribute names observed
    pub fn from_keys(keys: BTreeSet<String>) -> Self {
        Self {
            attribute_columns: keys.into_iter().collect(),
        }
    }

    /// Custom attribute columns, after the fixed ones
    pub fn attribute_columns(&self) -> &[String] {
        &self.attribute_columns
    }

    /// Header row
    pub fn header(&self) -> Vec<&str> {
        FIXED_COLUMNS
            .iter()
            .copied()
            .chain(self.attribute_columns.iter().map(String::as_str))
            .collect()
    }

    /// Render one record against the schema
    ///
    /// Cells are filled by position, so an attribute sharing its name with
    /// a fixed column still lands in its own column.
    pub fn row(&self, record: &LogRecord) -> Vec<String> {
        let mut row = Vec::with_capacity(FIXED_COLUMNS.len() + self.attribute_columns.len());
        row.push(
            record
                .timestamp()
                .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
                .unwrap_or_default(),
        );
        row.push(record.host().to_string());
        row.push(record.service().to_string());
        row.push(record.status().to_string());
        row.push(record.message().to_string());
        row.push(record.tags().join(";"));

        let custom = record.custom_attributes();
        row.extend(
            self.attribute_columns
                .iter()
                .map(|key| custom.get(key).map(flatten_value).unwrap_or_default()),
        );
        row
    }
}

/// Render a custom attribute value as a single CSV cell
///
/// Scalars are written as-is; arrays and objects become compact JSON.
pub fn flatten_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        structured => structured.to_string(),
    }
}

/// Row encoder over an in-memory buffer
fn row_encoder(buf: Vec<u8>) -> ::csv::Writer<Vec<u8>> {
    ::csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(::csv::Terminator::Any(b'\n'))
        .buffer_capacity(ROW_BUFFER)
        .from_writer(buf)
}

/// Lifecycle of the CSV writer
enum CsvState {
    /// Schema not yet known; records are held until the first page completes
    Buffering {
        held: Vec<LogRecord>,
        keys: BTreeSet<String>,
    },
    /// Schema frozen; records are written immediately
    Streaming(ColumnSchema),
    /// Finalized; no further records are accepted
    Closed,
}

/// Writer for CSV format
///
/// Rows are encoded into one reused in-memory buffer, which is handed to
/// the sink on `flush` or once it grows past `buffer_size`.
pub struct CsvLogWriter<W> {
    /// Output destination
    sink: W,
    /// Encoder owning the pending output bytes
    encoder: ::csv::Writer<Vec<u8>>,
    /// Pending bytes that trigger a write to the sink
    buffer_size: usize,
    /// Buffering / streaming / closed
    state: CsvState,
    /// Number of data rows written
    written: u64,
}

impl<W: AsyncWrite + Unpin + Send> CsvLogWriter<W> {
    /// Create a new CSV writer
    ///
    /// # Arguments
    /// * `sink` - Output destination
    /// * `buffer_size` - Capacity of the output buffer
    pub fn new(sink: W, buffer_size: usize) -> Self {
        let buffer_size = buffer_size.max(1);
        Self {
            sink,
            encoder: row_encoder(Vec::with_capacity(buffer_size)),
            buffer_size,
            state: CsvState::Buffering {
                held: Vec::new(),
                keys: BTreeSet::new(),
            },
            written: 0,
        }
    }

    /// Frozen schema, once the first page is complete
    pub fn schema(&self) -> Option<&ColumnSchema> {
        match &self.state {
            CsvState::Streaming(schema) => Some(schema),
            _ => None,
        }
    }

    /// Recover the underlying sink
    ///
    /// Bytes not yet pushed by `flush` or `close` are discarded.
    pub fn into_inner(self) -> W {
        self.sink
    }

    async fn write_fields<T: AsRef<[u8]>>(&mut self, fields: &[T]) -> Result<()> {
        self.encoder.write_record(fields)?;
        self.encoder.flush()?;
        if self.encoder.get_ref().len() >= self.buffer_size {
            self.drain_encoded().await?;
        }
        Ok(())
    }

    /// Move every encoded byte to the sink, keeping the buffer allocation
    async fn drain_encoded(&mut self) -> Result<()> {
        // Rows are flushed into the Vec as they are encoded
        if self.encoder.get_ref().is_empty() {
            return Ok(());
        }
        let encoder = std::mem::replace(&mut self.encoder, row_encoder(Vec::new()));
        let mut bytes = encoder
            .into_inner()
            .map_err(|e| DdlogsError::Sink(e.into_error()))?;
        let result = self.sink.write_all(&bytes).await;
        bytes.clear();
        self.encoder = row_encoder(bytes);
        result?;
        Ok(())
    }

    /// Freeze the schema, write the header and replay held records
    ///
    /// Does nothing unless the writer is still buffering.
    async fn freeze_and_replay(&mut self) -> Result<()> {
        let (held, keys) = match std::mem::replace(&mut self.state, CsvState::Closed) {
            CsvState::Buffering { held, keys } => (held, keys),
            other => {
                self.state = other;
                return Ok(());
            }
        };

        let schema = ColumnSchema::from_keys(keys);
        debug!(
            "CSV schema frozen: {} attribute columns, replaying {} records",
            schema.attribute_columns().len(),
            held.len()
        );

        self.write_fields(&schema.header()).await?;
        for record in &held {
            self.write_fields(&schema.row(record)).await?;
        }
        self.written += held.len() as u64;

        self.state = CsvState::Streaming(schema);
        Ok(())
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> LogWriter for CsvLogWriter<W> {
    async fn start(&mut self) -> Result<()> {
        // The header waits for the schema
        Ok(())
    }

    async fn write_record(&mut self, record: LogRecord) -> Result<()> {
        let row = match &mut self.state {
            CsvState::Buffering { held, keys } => {
                keys.extend(record.custom_attributes().keys().cloned());
                held.push(record);
                return Ok(());
            }
            CsvState::Streaming(schema) => schema.row(&record),
            CsvState::Closed => {
                return Err(DdlogsError::Generic(
                    "CSV writer already finalized".to_string(),
                ));
            }
        };

        self.write_fields(&row).await?;
        self.written += 1;
        Ok(())
    }

    async fn first_page_complete(&mut self) -> Result<()> {
        self.freeze_and_replay().await
    }

    async fn finalize(&mut self) -> Result<()> {
        self.freeze_and_replay().await?;
        self.state = CsvState::Closed;
        self.flush().await?;
        debug!("Finalized CSV output ({} rows)", self.written);
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        self.drain_encoded().await?;
        self.sink.flush().await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.drain_encoded().await?;
        self.sink.shutdown().await?;
        Ok(())
    }

    fn records_written(&self) -> u64 {
        self.written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::testing::{record_with, sample_record};
    use serde_json::json;

    async fn render(pages: Vec<Vec<LogRecord>>) -> String {
        let mut writer = CsvLogWriter::new(Vec::new(), 64);
        writer.start().await.unwrap();
        for (i, page) in pages.into_iter().enumerate() {
            for record in page {
                writer.write_record(record).await.unwrap();
            }
            if i == 0 {
                writer.first_page_complete().await.unwrap();
            }
        }
        writer.finalize().await.unwrap();
        writer.close().await.unwrap();
        String::from_utf8(writer.into_inner()).unwrap()
    }

    #[test]
    fn test_flatten_scalars() {
        assert_eq!(flatten_value(&json!("abc")), "abc");
        assert_eq!(flatten_value(&json!(true)), "true");
        assert_eq!(flatten_value(&json!(false)), "false");
        assert_eq!(flatten_value(&json!(42)), "42");
        assert_eq!(flatten_value(&json!(3.5)), "3.5");
        assert_eq!(flatten_value(&Value::Null), "");
    }

    #[test]
    fn test_flatten_structured_round_trips() {
        let nested = json!({ "b": [1, 2, { "c": null }], "a": "x" });
        let flat = flatten_value(&nested);
        assert_eq!(flat, r#"{"a":"x","b":[1,2,{"c":null}]}"#);
        let parsed: Value = serde_json::from_str(&flat).unwrap();
        assert_eq!(parsed, nested);
    }

    #[test]
    fn test_row_for_full_record() {
        let record = sample_record();
        let mut keys = BTreeSet::new();
        keys.insert("customer_id".to_string());
        keys.insert("http".to_string());
        keys.insert("missing".to_string());
        let schema = ColumnSchema::from_keys(keys);

        assert_eq!(
            schema.row(&record),
            vec![
                "2024-05-01T08:30:00Z",
                "web-1",
                "api",
                "error",
                "request failed, retrying",
                "env:prod;team:core",
                "abc123",
                r#"{"method":"GET","status_code":500}"#,
                "",
            ]
        );
    }

    #[tokio::test]
    async fn test_schema_from_first_page_only() {
        let out = render(vec![
            vec![
                record_with("one", json!({ "C": 1 })),
                record_with("two", json!({ "A": "x" })),
            ],
            vec![record_with("three", json!({ "B": true, "A": "y" }))],
        ])
        .await;

        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines,
            vec![
                "timestamp,host,service,status,message,tags,A,C",
                ",,,,one,,,1",
                ",,,,two,,x,",
                ",,,,three,,y,",
            ]
        );
    }

    #[tokio::test]
    async fn test_zero_records_is_header_only() {
        let out = render(vec![]).await;
        assert_eq!(out, "timestamp,host,service,status,message,tags\n");
    }

    #[tokio::test]
    async fn test_empty_first_page_freezes_fixed_columns() {
        let out = render(vec![vec![], vec![record_with("late", json!({ "A": 1 }))]]).await;
        assert_eq!(
            out,
            "timestamp,host,service,status,message,tags\n,,,,late,\n"
        );
    }

    #[tokio::test]
    async fn test_finalize_without_signal_replays_held_records() {
        let mut writer = CsvLogWriter::new(Vec::new(), 64);
        writer.write_record(record_with("a", json!({ "k": "v" }))).await.unwrap();
        writer.write_record(record_with("b", json!({}))).await.unwrap();
        assert!(writer.schema().is_none());

        writer.finalize().await.unwrap();
        assert_eq!(writer.records_written(), 2);

        let out = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(
            out,
            "timestamp,host,service,status,message,tags,k\n,,,,a,,v\n,,,,b,,\n"
        );
    }

    #[tokio::test]
    async fn test_rows_held_until_first_page_complete() {
        let mut writer = CsvLogWriter::new(Vec::new(), 64);
        writer.write_record(record_with("a", json!({}))).await.unwrap();
        writer.flush().await.unwrap();
        assert!(writer.sink.is_empty());

        writer.first_page_complete().await.unwrap();
        writer.flush().await.unwrap();
        assert!(!writer.sink.is_empty());
        assert_eq!(writer.schema().unwrap().attribute_columns().len(), 0);
    }

    #[tokio::test]
    async fn test_encoded_rows_spill_to_sink_past_buffer_size() {
        let mut writer = CsvLogWriter::new(Vec::new(), 64);
        writer.first_page_complete().await.unwrap();
        assert!(writer.sink.is_empty());

        for i in 0..20 {
            writer.write_record(record_with(&format!("row-{}", i), json!({}))).await.unwrap();
        }
        assert!(!writer.sink.is_empty());
        assert!(writer.encoder.get_ref().len() < 64);

        writer.finalize().await.unwrap();
        let out = String::from_utf8(writer.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 21);
        assert_eq!(lines[0], "timestamp,host,service,status,message,tags");
        assert_eq!(lines[20], ",,,,row-19,");
    }

    #[tokio::test]
    async fn test_quoting_of_special_characters() {
        let out = render(vec![vec![record_with(
            "said \"hi\", then\nleft",
            json!({ "note": "a,b" }),
        )]])
        .await;

        assert!(out.contains("\"said \"\"hi\"\", then\nleft\""));
        assert!(out.contains("\"a,b\""));
    }

    #[tokio::test]
    async fn test_write_after_finalize_fails() {
        let mut writer = CsvLogWriter::new(Vec::new(), 64);
        writer.finalize().await.unwrap();
        assert!(writer.write_record(record_with("x", json!({}))).await.is_err());
        // Finalizing twice is harmless
        writer.finalize().await.unwrap();
    }
}
