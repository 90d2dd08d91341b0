/*!
# Error Types for flinkpilot

Centralized error handling for cluster calls, configuration and file access.
Components decide locally whether an error becomes a `false`/`None` result or
a failed phase; this type only carries the context.
*/

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main error type for cluster, gateway and configuration operations
#[derive(Debug, Error)]
pub enum PilotError {
    /// Transport failure (connection refused, DNS, request timeout)
    #[error("HTTP request to {url} failed: {message}")]
    Http { url: String, message: String },

    /// The cluster answered with a non-success status
    #[error("{url} returned HTTP {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    /// Response body did not match the expected shape
    #[error("Failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },

    /// I/O errors with the file involved
    #[error("I/O operation failed for {}", path.display())]
    Io {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Invalid or unreadable configuration
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// A bounded wait elapsed
    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: String,
        timeout: Duration,
    },

    /// Neither the SQL gateway nor the direct submission API is reachable
    #[error("No available job submission method: {message}")]
    NoSubmissionMethod { message: String },
}

impl PilotError {
    /// Helper to create transport errors from a reqwest failure
    pub fn http(url: impl Into<String>, err: &reqwest::Error) -> Self {
        Self::Http {
            url: url.into(),
            message: err.to_string(),
        }
    }

    /// Helper to create I/O errors with the offending path
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            source,
            path: path.into(),
        }
    }

    /// Helper to create configuration errors
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Helper to create timeout errors
    pub fn timeout(operation: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout,
        }
    }

    /// True for connection-level failures, as opposed to protocol errors
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Http { .. })
    }

    /// HTTP status code carried by protocol errors
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<serde_yaml::Error> for PilotError {
    fn from(err: serde_yaml::Error) -> Self {
        PilotError::Config {
            message: format!("invalid YAML: {}", err),
        }
    }
}

/// Result type alias for flinkpilot operations
pub type PilotResult<T> = Result<T, PilotError>;
