//! Error types for locator classification.

use thiserror::Error;

/// Maximum locator length to accept (standard browser limit).
pub const MAX_LOCATOR_LENGTH: usize = 2000;

/// Errors that can occur while classifying a locator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassificationError {
    /// The locator could not be parsed as a URL at all.
    #[error("invalid locator '{locator}': {reason}\n  Suggestion: {suggestion}")]
    InvalidLocator {
        /// The locator that failed classification
        locator: String,
        /// Why it was rejected
        reason: String,
        /// How to fix the issue
        suggestion: String,
    },

    /// The locator is a valid URL but points outside the site namespace.
    #[error("locator '{locator}' is outside {host}\n  Suggestion: pass a {host} URL or a numeric video id")]
    ForeignHost {
        /// The offending locator
        locator: String,
        /// The site host the classifier is bound to
        host: String,
    },

    /// Locator exceeds the maximum accepted length.
    #[error("locator too long ({length} chars, max {max}): {preview}...")]
    TooLong {
        /// Truncated locator for display
        preview: String,
        /// Actual length
        length: usize,
        /// Maximum allowed
        max: usize,
    },
}

impl ClassificationError {
    /// Creates an `InvalidLocator` error for an unparseable locator.
    #[must_use]
    pub fn malformed(locator: &str, parse_error: &str) -> Self {
        Self::InvalidLocator {
            locator: locator.to_string(),
            reason: parse_error.to_string(),
            suggestion: "Check the URL format and try again".to_string(),
        }
    }

    /// Creates an `InvalidLocator` error for a non-web scheme.
    #[must_use]
    pub fn unsupported_scheme(locator: &str, scheme: &str) -> Self {
        Self::InvalidLocator {
            locator: locator.to_string(),
            reason: format!("scheme '{scheme}' is not supported"),
            suggestion: "Use http:// or https:// URLs".to_string(),
        }
    }

    /// Creates a `ForeignHost` error.
    #[must_use]
    pub fn foreign_host(locator: &str, host: &str) -> Self {
        Self::ForeignHost {
            locator: locator.to_string(),
            host: host.to_string(),
        }
    }

    /// Creates a `TooLong` error.
    #[must_use]
    pub fn too_long(locator: &str) -> Self {
        Self::TooLong {
            preview: locator.chars().take(50).collect(),
            length: locator.len(),
            max: MAX_LOCATOR_LENGTH,
        }
    }
}
