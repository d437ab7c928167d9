use std::{fmt, io};

/// Crate-wide `Result` type using [`DdlogsError`] as the error.
///
/// This alias is re-exported by the parent `error` module and is intended
/// to be used throughout the crate for fallible operations.
pub type Result<T> = std::result::Result<T, DdlogsError>;

/// Top-level error type for ddlogs operations.
///
/// This type wraps more specific error kinds and provides a single
/// error type that can be used throughout the crate.
#[derive(Debug)]
pub enum DdlogsError {
    /// A page request against the remote log source failed.
    Remote(RemoteError),

    /// Writing to the output destination failed.
    Sink(io::Error),

    /// Invalid configuration or query parameters.
    Config(ConfigError),

    /// A record could not be serialized.
    Serialization(serde_json::Error),

    /// The run was cancelled before completion.
    Cancelled,

    /// Generic error with a free-form message.
    Generic(String),
}

/// Remote request errors.
#[derive(Debug)]
pub enum RemoteError {
    /// The request could not be sent or the connection failed.
    RequestFailed(String),

    /// The remote source answered with a non-success status.
    Status { status: u16, body: String },

    /// The response body could not be decoded.
    InvalidResponse(String),
}

/// Configuration-specific errors.
#[derive(Debug)]
pub enum ConfigError {
    /// Config file not found.
    FileNotFound(String),

    /// Invalid config format.
    InvalidFormat(String),

    /// Missing required field.
    MissingField(String),

    /// Invalid field value.
    InvalidValue { field: String, value: String },
}

impl DdlogsError {
    /// Whether this error represents a user-requested cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DdlogsError::Cancelled)
    }
}

/* ========================= Display & Error impls ========================= */

impl fmt::Display for DdlogsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DdlogsError::Remote(e) => write!(f, "Remote request failed: {e}"),
            DdlogsError::Sink(e) => write!(f, "Output write failed: {e}"),
            DdlogsError::Config(e) => write!(f, "Configuration error: {e}"),
            DdlogsError::Serialization(e) => write!(f, "Serialization error: {e}"),
            DdlogsError::Cancelled => write!(f, "Operation cancelled"),
            DdlogsError::Generic(msg) => write!(f, "{msg}"),
        }
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteError::RequestFailed(msg) => write!(f, "{msg}"),
            RemoteError::Status { status, body } => {
                if body.is_empty() {
                    write!(f, "HTTP {status}")
                } else {
                    write!(f, "HTTP {status}: {body}")
                }
            }
            RemoteError::InvalidResponse(msg) => write!(f, "Invalid response: {msg}"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {path}"),
            ConfigError::InvalidFormat(msg) => write!(f, "Invalid config format: {msg}"),
            ConfigError::MissingField(field) => write!(f, "Missing required field: {field}"),
            ConfigError::InvalidValue { field, value } => {
                write!(f, "Invalid value '{value}' for field '{field}'")
            }
        }
    }
}

impl std::error::Error for DdlogsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DdlogsError::Sink(e) => Some(e),
            DdlogsError::Serialization(e) => Some(e),
            _ => None,
        }
    }
}
impl std::error::Error for RemoteError {}
impl std::error::Error for ConfigError {}

/* ========================= Conversions to DdlogsError ========================= */

impl From<io::Error> for DdlogsError {
    fn from(err: io::Error) -> Self {
        DdlogsError::Sink(err)
    }
}

impl From<serde_json::Error> for DdlogsError {
    fn from(err: serde_json::Error) -> Self {
        DdlogsError::Serialization(err)
    }
}

impl From<csv::Error> for DdlogsError {
    fn from(err: csv::Error) -> Self {
        DdlogsError::Sink(io::Error::other(err))
    }
}

impl From<reqwest::Error> for DdlogsError {
    fn from(err: reqwest::Error) -> Self {
        DdlogsError::Remote(RemoteError::RequestFailed(err.to_string()))
    }
}

impl From<RemoteError> for DdlogsError {
    fn from(err: RemoteError) -> Self {
        DdlogsError::Remote(err)
    }
}

impl From<ConfigError> for DdlogsError {
    fn from(err: ConfigError) -> Self {
        DdlogsError::Config(err)
    }
}
