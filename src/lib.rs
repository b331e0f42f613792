//! Vimeo Mirror Library
//!
//! Incrementally mirrors the videos reachable from a starting page (an
//! account, album, channel, group or single video) into a local directory:
//! one file per video plus linked folder views, with resumable transfers,
//! bounded retries and an audit of the result.
//!
//! # Architecture
//!
//! Leaf first:
//! - [`locator`] - classification of locators into typed identifiers
//! - [`page`] - the browser session capability and its WebDriver backend
//! - [`crawl`] - traversal building the item set and folder map
//! - [`transfer`] - resumable HTTP transfers, retry policy, stall watchdog
//! - [`verify`] - optional media verification
//! - [`reconcile`] - per-video rendition choice, size reconciliation, fetch
//! - [`mirror`] - naming, markers, folder links and the audit pass
//! - [`pipeline`] - one complete run tying the above together

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod config;
pub mod crawl;
pub mod locator;
pub mod mirror;
pub mod page;
pub mod pipeline;
pub mod reconcile;
pub mod report;
pub mod site;
pub mod transfer;
pub mod verify;

// Re-export commonly used types
pub use config::{ConfigError, Credentials, ItemOrder, LinkKind, RunConfig, SettingsTargets};
pub use crawl::{CrawlOutput, Crawler, DiscoveredItems, Folder};
pub use locator::{ClassificationError, Classifier, ResourceIdentifier, ResourceKind, classify};
pub use page::{Browser, PageError, PageProvider, WebDriverSession};
pub use pipeline::{Collaborators, PipelineError, RunSummary, run};
pub use reconcile::{DownloadOutcome, ProgressObserver, Reconciler};
pub use report::{Operation, RunReport};
pub use transfer::{HttpTransfer, RetryPolicy, Transfer, TransferError};
pub use verify::{ContentVerifier, FfprobeVerifier};
