//! Error types for file transfers.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors raised while fetching or probing a remote file.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The URL being fetched.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// The request timed out before the server answered.
    #[error("timeout fetching {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// HTTP error response other than 416.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The server refused the requested byte range (HTTP 416).
    ///
    /// With a resume offset equal to the remote length this means the local
    /// copy is already complete.
    #[error("range not satisfiable for {url} from offset {offset}")]
    RangeNotSatisfiable {
        /// The URL being fetched.
        url: String,
        /// Offset that was requested.
        offset: u64,
    },

    /// No new bytes arrived within the stall timeout.
    #[error("transfer of {url} stalled: no data for {idle:?} after {bytes} bytes")]
    Stalled {
        /// The URL being fetched.
        url: String,
        /// How long the transfer sat idle.
        idle: Duration,
        /// Bytes on disk when the transfer was aborted.
        bytes: u64,
    },

    /// The run was interrupted while the transfer was in flight.
    #[error("transfer of {url} interrupted")]
    Interrupted {
        /// The URL being fetched.
        url: String,
    },

    /// File system error while writing the target.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The URL is malformed.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The HTTP client could not be built.
    #[error("could not build HTTP client: {source}")]
    Client {
        /// The underlying builder error.
        #[source]
        source: reqwest::Error,
    },
}

impl TransferError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a range-not-satisfiable error.
    pub fn range_not_satisfiable(url: impl Into<String>, offset: u64) -> Self {
        Self::RangeNotSatisfiable {
            url: url.into(),
            offset,
        }
    }

    /// Creates a stall error.
    pub fn stalled(url: impl Into<String>, idle: Duration, bytes: u64) -> Self {
        Self::Stalled {
            url: url.into(),
            idle,
            bytes,
        }
    }

    /// Creates an interruption error.
    pub fn interrupted(url: impl Into<String>) -> Self {
        Self::Interrupted { url: url.into() }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }
}
