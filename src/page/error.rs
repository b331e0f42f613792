//! Error types for the page provider.

use thiserror::Error;

/// Errors raised while driving a page session.
#[derive(Debug, Error)]
pub enum PageError {
    /// The session could not be created.
    #[error("could not start {browser} session at {server}: {reason}")]
    SessionStart {
        /// Browser that was requested.
        browser: String,
        /// WebDriver server URL.
        server: String,
        /// Why the session failed to start.
        reason: String,
    },

    /// Navigation to a page failed or timed out.
    #[error("page load failed for {url}: {reason}")]
    Navigation {
        /// Page being loaded.
        url: String,
        /// Why it failed.
        reason: String,
    },

    /// The remote end answered a command with an error.
    #[error("{command} failed: {error}: {message}")]
    Command {
        /// Command that failed (e.g. `find element`).
        command: &'static str,
        /// Protocol error code (e.g. `stale element reference`).
        error: String,
        /// Human-readable message from the remote end.
        message: String,
    },

    /// Transport failure talking to the remote end.
    #[error("transport error during {command}: {source}")]
    Transport {
        /// Command that was being sent.
        command: &'static str,
        /// Underlying HTTP error.
        #[source]
        source: reqwest::Error,
    },

    /// The remote end returned a body that does not follow the protocol.
    #[error("unexpected response to {command}: {detail}")]
    Protocol {
        /// Command whose response was malformed.
        command: &'static str,
        /// What was wrong with it.
        detail: String,
    },
}

impl PageError {
    /// Creates a navigation error.
    pub fn navigation(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Navigation {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates a protocol error.
    pub fn protocol(command: &'static str, detail: impl Into<String>) -> Self {
        Self::Protocol {
            command,
            detail: detail.into(),
        }
    }
}
