//! Run configuration.
//!
//! [`RunConfig`] is the one statically declared structure holding every
//! option of a run. The binary fills it from the command line; tests build it
//! directly with struct update syntax over [`RunConfig::default`].

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::site::DEFAULT_RENDITION_PREFERENCES;
use crate::transfer::DEFAULT_MAX_ATTEMPTS;

/// Default stall timeout for transfers.
pub const DEFAULT_STALL_TIMEOUT: Duration = Duration::from_secs(60);

/// Default wait for page elements to appear.
pub const DEFAULT_PAGE_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors found while validating a configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Neither a starting locator nor credentials were given.
    #[error("nothing to crawl: give a starting locator or --login credentials")]
    NothingToCrawl,

    /// Credentials do not have the `email:password` form.
    #[error("malformed credentials '{value}': expected email:password")]
    MalformedCredentials {
        /// The rejected value with the password part masked.
        value: String,
    },

    /// The retry count must allow at least one attempt.
    #[error("retry count must be at least 1")]
    ZeroRetries,

    /// A zero stall timeout would abort every transfer immediately.
    #[error("stall timeout must be greater than zero")]
    ZeroStallTimeout,

    /// `--max-items 0` would crawl nothing.
    #[error("max items must be greater than zero")]
    ZeroMaxItems,

    /// No rendition preference was left after parsing.
    #[error("rendition preference list is empty")]
    EmptyPreferences,
}

/// Site login credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

impl FromStr for Credentials {
    type Err = ConfigError;

    /// Parses `email:password`; the separator is the first `:` after the `@`,
    /// so passwords may contain colons.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let malformed = || ConfigError::MalformedCredentials {
            value: mask_password(value),
        };
        let at = value.find('@').ok_or_else(malformed)?;
        let colon = value[at..].find(':').map(|i| at + i).ok_or_else(malformed)?;
        let (email, password) = (&value[..colon], &value[colon + 1..]);
        if email.len() < 3 || email.starts_with('@') || email.ends_with('@') || password.is_empty()
        {
            return Err(malformed());
        }
        Ok(Self {
            email: email.to_string(),
            password: password.to_string(),
        })
    }
}

fn mask_password(value: &str) -> String {
    match value.find('@').and_then(|at| value[at..].find(':').map(|i| at + i)) {
        Some(colon) => format!("{}:***", &value[..colon]),
        None => value.to_string(),
    }
}

/// Order in which discovered items are reconciled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ItemOrder {
    /// Traversal order.
    #[default]
    Discovery,
    /// Traversal order reversed.
    Reverse,
    /// Highest video id first, which tracks upload date on the site.
    NewestFirst,
}

/// How folder views refer to canonical files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LinkKind {
    /// Relative symbolic links (`../<file>`).
    #[default]
    Symbolic,
    /// Hard links to the canonical file.
    Hard,
}

/// Desired values of per-video settings. Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsTargets {
    pub language: Option<String>,
    pub embed_preset: Option<String>,
    pub quality_tier: Option<String>,
}

impl SettingsTargets {
    /// True when no setting is requested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.language.is_none() && self.embed_preset.is_none() && self.quality_tier.is_none()
    }
}

/// Every option of a mirror run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Starting locators, classified when the run starts.
    pub roots: Vec<String>,
    pub credentials: Option<Credentials>,
    /// Mirror directory.
    pub target_dir: PathBuf,
    /// Caps items taken from each listing.
    pub max_items: Option<usize>,
    /// Attempts per transfer and per page load.
    pub retry_count: u32,
    /// Abort a transfer after this long without new bytes.
    pub stall_timeout: Duration,
    /// Wait for page elements; zero probes immediately.
    pub page_timeout: Duration,
    pub create_folders: bool,
    pub probe_sizes: bool,
    pub link_kind: LinkKind,
    /// Verify freshly fetched files.
    pub verify: bool,
    /// Verify files that were already complete.
    pub verify_existing: bool,
    /// Report local files whose id was not discovered.
    pub detect_obsolete: bool,
    /// Resolve everything but transfer nothing.
    pub dry_run: bool,
    pub order: ItemOrder,
    /// Rendition labels, best first.
    pub rendition_preferences: Vec<String>,
    pub settings: SettingsTargets,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            credentials: None,
            target_dir: PathBuf::from("."),
            max_items: None,
            retry_count: DEFAULT_MAX_ATTEMPTS,
            stall_timeout: DEFAULT_STALL_TIMEOUT,
            page_timeout: DEFAULT_PAGE_TIMEOUT,
            create_folders: true,
            probe_sizes: true,
            link_kind: LinkKind::Symbolic,
            verify: false,
            verify_existing: false,
            detect_obsolete: false,
            dry_run: false,
            order: ItemOrder::Discovery,
            rendition_preferences: DEFAULT_RENDITION_PREFERENCES
                .iter()
                .map(|label| (*label).to_string())
                .collect(),
            settings: SettingsTargets::default(),
        }
    }
}

impl RunConfig {
    /// Checks cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.roots.is_empty() && self.credentials.is_none() {
            return Err(ConfigError::NothingToCrawl);
        }
        if self.retry_count == 0 {
            return Err(ConfigError::ZeroRetries);
        }
        if self.stall_timeout.is_zero() {
            return Err(ConfigError::ZeroStallTimeout);
        }
        if self.max_items == Some(0) {
            return Err(ConfigError::ZeroMaxItems);
        }
        if self.rendition_preferences.iter().all(|p| p.trim().is_empty()) {
            return Err(ConfigError::EmptyPreferences);
        }
        Ok(())
    }

    /// Whether any content verification is requested.
    #[must_use]
    pub fn wants_verifier(&self) -> bool {
        self.verify || self.verify_existing
    }
}
