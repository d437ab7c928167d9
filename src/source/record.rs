//! Log record model
//!
//! Mirrors the shape of a log event returned by the logs search API:
//! a handful of well-known fields plus an open-ended map of custom
//! attributes. Unknown attribute-level fields are kept in `extra` so that
//! JSON output loses nothing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// One retrieved log event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    #[serde(default)]
    pub attributes: LogAttributes,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// Well-known and custom fields of a log event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogAttributes {
    /// Custom attributes (the `@field` namespace), arbitrarily nested
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Map::is_empty"
    )]
    pub attributes: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,

    /// Any other attribute-level field returned by the API
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl LogRecord {
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.attributes.timestamp
    }

    pub fn host(&self) -> &str {
        self.attributes.host.as_deref().unwrap_or_default()
    }

    pub fn service(&self) -> &str {
        self.attributes.service.as_deref().unwrap_or_default()
    }

    pub fn status(&self) -> &str {
        self.attributes.status.as_deref().unwrap_or_default()
    }

    pub fn message(&self) -> &str {
        self.attributes.message.as_deref().unwrap_or_default()
    }

    pub fn tags(&self) -> &[String] {
        &self.attributes.tags
    }

    /// Custom attribute map
    pub fn custom_attributes(&self) -> &Map<String, Value> {
        &self.attributes.attributes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_api_event() {
        let record: LogRecord = serde_json::from_value(json!({
            "id": "AQAAAYx",
            "type": "log",
            "attributes": {
                "timestamp": "2024-05-01T08:30:00.250Z",
                "host": "web-1",
                "service": "api",
                "status": "error",
                "message": "boom",
                "tags": ["env:prod", "team:core"],
                "attributes": { "duration": 12.5, "http": { "status_code": 500 } }
            }
        }))
        .unwrap();

        assert_eq!(record.host(), "web-1");
        assert_eq!(record.tags().len(), 2);
        assert_eq!(record.custom_attributes()["http"]["status_code"], 500);
        assert_eq!(record.kind.as_deref(), Some("log"));
        assert!(record.timestamp().is_some());
    }

    #[test]
    fn test_null_collections_and_unknown_fields() {
        let record: LogRecord = serde_json::from_value(json!({
            "attributes": { "tags": null, "attributes": null, "trace_id": "abc" }
        }))
        .unwrap();

        assert!(record.tags().is_empty());
        assert!(record.custom_attributes().is_empty());
        assert_eq!(record.attributes.extra["trace_id"], "abc");
        assert_eq!(record.host(), "");
    }

    #[test]
    fn test_serialize_omits_absent_fields_and_keeps_extra() {
        let record: LogRecord = serde_json::from_value(json!({
            "id": "1",
            "attributes": { "message": "hi", "trace_id": "abc" }
        }))
        .unwrap();

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            json!({ "id": "1", "attributes": { "message": "hi", "trace_id": "abc" } })
        );
    }
}
