//! Search query parameters
//!
//! A [`Query`] is built once per invocation and is read-only afterwards.
//! Time bounds accept the forms the logs search API understands:
//! - `now`
//! - a duration relative to now (`15m`, `1h`, `1h30m`, `7d`), sent as `now-<duration>`
//! - an absolute RFC 3339 instant

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{ConfigError, Result};

/// Units accepted in relative durations, longest first so `ms` wins over `m`
const DURATION_UNITS: [&str; 6] = ["ms", "s", "m", "h", "d", "w"];

/// One end of the search time window
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeBound {
    /// The current time
    Now,
    /// A duration before now, kept in its textual form (e.g. `1h30m`)
    Ago(String),
    /// A fixed instant
    Absolute(DateTime<Utc>),
}

impl TimeBound {
    /// Parse a user-facing time bound
    ///
    /// # Arguments
    /// * `field` - Name used in error messages (`from` / `to`)
    /// * `value` - Raw value
    pub fn parse(field: &str, value: &str) -> Result<Self> {
        let value = value.trim();
        let invalid = || ConfigError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        };

        if value.eq_ignore_ascii_case("now") {
            return Ok(TimeBound::Now);
        }

        let relative = value.strip_prefix("now-").unwrap_or(value);
        if is_relative_duration(relative) {
            return Ok(TimeBound::Ago(relative.to_string()));
        }

        DateTime::parse_from_rfc3339(value)
            .map(|t| TimeBound::Absolute(t.with_timezone(&Utc)))
            .map_err(|_| invalid().into())
    }

    /// Render the bound in the form sent to the remote API
    pub fn to_api(&self) -> String {
        match self {
            TimeBound::Now => "now".to_string(),
            TimeBound::Ago(duration) => format!("now-{duration}"),
            TimeBound::Absolute(t) => t.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

impl fmt::Display for TimeBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_api())
    }
}

/// Check for one or more `<digits><unit>` segments
fn is_relative_duration(s: &str) -> bool {
    let mut rest = s;
    if rest.is_empty() {
        return false;
    }

    while !rest.is_empty() {
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 {
            return false;
        }
        rest = &rest[digits..];

        match DURATION_UNITS.iter().find(|unit| rest.starts_with(**unit)) {
            Some(unit) => rest = &rest[unit.len()..],
            None => return false,
        }
    }
    true
}

/// Immutable search request parameters
#[derive(Debug, Clone)]
pub struct Query {
    /// Free-text search expression (e.g. `service:web status:error`)
    pub text: String,
    /// Start of the window
    pub from: TimeBound,
    /// End of the window
    pub to: TimeBound,
    /// Records requested per page
    pub page_size: u32,
}

impl Query {
    /// Build a query from raw user input
    ///
    /// # Arguments
    /// * `text` - Search expression, must not be blank
    /// * `from` - Start bound (e.g. `15m`)
    /// * `to` - End bound (e.g. `now`)
    /// * `page_size` - Records per page
    pub fn new(text: &str, from: &str, to: &str, page_size: u32) -> Result<Self> {
        if text.trim().is_empty() {
            return Err(ConfigError::MissingField("query".to_string()).into());
        }
        if page_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "page_size".to_string(),
                value: "0".to_string(),
            }
            .into());
        }

        Ok(Self {
            text: text.to_string(),
            from: TimeBound::parse("from", from)?,
            to: TimeBound::parse("to", to)?,
            page_size,
        })
    }
}
