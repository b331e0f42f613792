//! One complete mirror run.
//!
//! Classify the roots, log in, traverse, reconcile every discovered video,
//! refresh folder links and audit the mirror. Only an unusable root, a failed
//! login with nothing else to crawl, or an unusable target directory abort
//! the run; everything else is recorded in the [`RunReport`].

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::auth::{self, LoginError};
use crate::config::{ConfigError, RunConfig};
use crate::crawl::{CrawlOutput, CrawlSettings, Crawler};
use crate::locator::{ClassificationError, Classifier, ResourceIdentifier};
use crate::mirror::{self, AuditReport, LinkSummary};
use crate::page::PageProvider;
use crate::reconcile::{ItemResult, ProgressObserver, ReconcileSettings, Reconciler};
use crate::report::{Operation, RunReport};
use crate::transfer::Transfer;
use crate::verify::ContentVerifier;

/// Failures that make a run pointless.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The configuration is inconsistent.
    #[error("invalid configuration: {source}")]
    InvalidConfig {
        #[source]
        source: ConfigError,
    },

    /// An explicitly given starting locator is outside the site.
    #[error("cannot start from '{locator}': {source}")]
    InvalidRoot {
        locator: String,
        #[source]
        source: ClassificationError,
    },

    /// Login failed and there is no starting locator to fall back on.
    #[error("login failed and no starting locator was given: {source}")]
    AuthenticationFailed {
        #[source]
        source: LoginError,
    },

    /// The mirror directory cannot be created.
    #[error("cannot create target directory {path}: {source}")]
    TargetDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// External capabilities a run works through.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub page: &'a dyn PageProvider,
    pub transfer: &'a dyn Transfer,
    pub verifier: Option<&'a dyn ContentVerifier>,
}

/// Everything a run produced.
#[derive(Debug)]
pub struct RunSummary {
    pub report: RunReport,
    pub crawl: CrawlOutput,
    pub results: Vec<ItemResult>,
    pub links: LinkSummary,
    pub audit: AuditReport,
    /// The run was interrupted before every item was reconciled.
    pub interrupted: bool,
}

impl RunSummary {
    /// True when the run completed without errors.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        !self.interrupted && self.report.error_count() == 0
    }
}

/// Classifies the configured roots; any failure is fatal.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidRoot`] for the first unclassifiable root.
pub fn classify_roots(
    classifier: &Classifier,
    roots: &[String],
) -> Result<Vec<ResourceIdentifier>, PipelineError> {
    roots
        .iter()
        .map(|locator| {
            classifier
                .classify(locator)
                .map_err(|source| PipelineError::InvalidRoot {
                    locator: locator.clone(),
                    source,
                })
        })
        .collect()
}

/// Runs the whole mirror pass.
///
/// # Errors
///
/// Returns [`PipelineError`] only for failures that leave nothing to do.
#[instrument(skip_all, fields(target = %config.target_dir.display()))]
pub async fn run(
    config: &RunConfig,
    collaborators: Collaborators<'_>,
    observer: Option<Arc<dyn ProgressObserver>>,
    interrupted: Arc<AtomicBool>,
) -> Result<RunSummary, PipelineError> {
    config
        .validate()
        .map_err(|source| PipelineError::InvalidConfig { source })?;
    let classifier = Classifier::default();
    let mut roots = classify_roots(&classifier, &config.roots)?;
    tokio::fs::create_dir_all(&config.target_dir)
        .await
        .map_err(|source| PipelineError::TargetDir {
            path: config.target_dir.clone(),
            source,
        })?;

    let mut report = RunReport::new();
    let page = collaborators.page;

    let mut account = None;
    if let Some(credentials) = &config.credentials {
        match auth::login(page, &classifier, credentials, config.page_timeout).await {
            Ok(logged_in) => {
                if roots.is_empty() {
                    roots.push(logged_in.home.clone());
                }
                account = Some(logged_in.name);
            }
            Err(source) if roots.is_empty() => {
                return Err(PipelineError::AuthenticationFailed { source });
            }
            Err(error) => report.error(Operation::Login, &credentials.email, error.to_string()),
        }
    }

    if let Some(root) = roots.first()
        && let Err(error) = mirror::write_marker(&config.target_dir, root).await
    {
        report.error(
            Operation::Folder,
            config.target_dir.display().to_string(),
            format!("could not write marker: {error}"),
        );
    }

    let crawler = Crawler::new(page, &classifier, CrawlSettings::from_config(config))
        .with_interrupt(Arc::clone(&interrupted));
    let crawl = crawler.crawl(&roots, &mut report).await;

    let headers = auth::transfer_headers(page).await;
    let mut reconciler = Reconciler::new(
        page,
        &classifier,
        collaborators.transfer,
        ReconcileSettings::from_config(config),
    )
    .with_verifier(collaborators.verifier)
    .with_headers(headers)
    .with_account(account)
    .with_interrupt(Arc::clone(&interrupted));
    if let Some(observer) = observer {
        reconciler = reconciler.with_observer(observer);
    }

    let ordered = crawl.items.ordered(config.order);
    let total = ordered.len();
    info!(videos = total, "processing videos");
    let mut results = Vec::with_capacity(total);
    for (index, item) in ordered.into_iter().enumerate() {
        if interrupted.load(Ordering::SeqCst) {
            warn!(remaining = total - index, "interrupted, not starting further items");
            break;
        }
        results.push(
            reconciler
                .reconcile(item.video_id, index + 1, total, &mut report)
                .await,
        );
    }

    let artifacts: BTreeMap<u64, String> = results
        .iter()
        .filter(|result| result.outcome.has_artifact())
        .filter_map(|result| result.file_name.clone().map(|name| (result.video_id, name)))
        .collect();
    let links = mirror::materialize(
        &crawl.folders,
        &artifacts,
        &config.target_dir,
        config.link_kind,
        &mut report,
    )
    .await;

    let known_ids: HashSet<u64> = crawl.items.ids().into_iter().collect();
    let audit = mirror::audit(
        &config.target_dir,
        &known_ids,
        config.detect_obsolete,
        &mut report,
    )
    .await;

    let interrupted = interrupted.load(Ordering::SeqCst);
    info!("{}", report.summary_line());
    Ok(RunSummary {
        report,
        crawl,
        results,
        links,
        audit,
        interrupted,
    })
}
