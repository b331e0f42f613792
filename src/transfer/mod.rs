//! File transfer capability.
//!
//! The reconciler streams renditions to disk through the [`Transfer`] trait.
//! [`HttpTransfer`] is the production implementation; the [`watchdog`] module
//! wraps any implementation with stall detection and interruption.

mod error;
mod http;
mod retry;
pub mod watchdog;

pub use error::TransferError;
pub use http::HttpTransfer;
pub use retry::{DEFAULT_MAX_ATTEMPTS, FailureType, RetryDecision, RetryPolicy, classify_error};

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Progress callback receiving the number of bytes on disk so far.
pub type ProgressFn = Arc<dyn Fn(u64) + Send + Sync>;

/// Extra request headers forwarded with every transfer request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestHeaders(Vec<(String, String)>);

impl RequestHeaders {
    /// Creates an empty header set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    /// Iterates over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Returns true when no header is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Options for a single fetch.
#[derive(Clone, Default)]
pub struct FetchOptions {
    /// Headers forwarded with the request.
    pub headers: RequestHeaders,
    /// Byte offset to resume from; zero starts over.
    pub resume_from: u64,
    /// Called after each chunk with the total bytes on disk.
    pub on_progress: Option<ProgressFn>,
}

impl std::fmt::Debug for FetchOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchOptions")
            .field("headers", &self.headers)
            .field("resume_from", &self.resume_from)
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

/// Streams a remote file to a local path.
#[async_trait]
pub trait Transfer: Send + Sync {
    /// Returns the remote length, `None` when the server does not report it.
    async fn probe_size(
        &self,
        url: &str,
        headers: &RequestHeaders,
    ) -> Result<Option<u64>, TransferError>;

    /// Streams `url` into `target`.
    ///
    /// With a non-zero [`FetchOptions::resume_from`] the request asks for the
    /// remaining bytes only and appends them. A server ignoring the range
    /// causes the file to be rewritten from the start.
    async fn fetch(
        &self,
        url: &str,
        target: &Path,
        options: &FetchOptions,
    ) -> Result<(), TransferError>;
}
