//! Error types for rulebundle.

use thiserror::Error;

/// Error type for rulebundle operations.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON (manifest) error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Transport-level HTTP failure (connection refused, DNS, TLS...)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Request timed out
    #[error("request timed out")]
    Timeout,

    /// Server answered with a non-success status
    #[error("HTTP status {0}")]
    HttpStatus(u16),

    /// Downloaded body is not a usable rule list
    #[error("invalid content: {0}")]
    InvalidContent(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// A stage finished without producing any usable output
    #[error("{0}: no usable output produced")]
    NothingProduced(&'static str),
}

impl Error {
    /// Whether a failed request is worth retrying.
    ///
    /// Client errors (4xx) and content rejections are final; timeouts,
    /// transport failures and server errors (5xx) are transient.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Timeout | Error::Http(_) => true,
            Error::HttpStatus(code) => *code >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Timeout
        } else if let Some(status) = e.status() {
            Error::HttpStatus(status.as_u16())
        } else {
            Error::Http(e.to_string())
        }
    }
}

/// Result type alias for rulebundle operations.
pub type Result<T> = std::result::Result<T, Error>;
