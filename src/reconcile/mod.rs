//! Per-video download reconciliation.
//!
//! For each discovered video the [`Reconciler`] reads the video page, picks a
//! rendition, compares local and remote sizes and, when needed, drives a
//! retrying, stall-guarded transfer followed by validation. Every item ends
//! in exactly one [`DownloadOutcome`].

mod fetch;
mod rendition;
mod settings;
mod size;

pub use fetch::{FetchPolicy, FetchReport, FetchRequest, fetch_and_validate, local_size};
pub use rendition::{DownloadLink, RenditionChoice, VideoPage, read_video_page, select_rendition};
pub use settings::{SettingsError, SettingsOutcome, apply_settings, may_edit};
pub use size::{SizeDecision, SizeState, decide};

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{info, instrument, warn};

use crate::config::{RunConfig, SettingsTargets};
use crate::locator::{Classifier, ResourceIdentifier};
use crate::mirror::{NO_EXTENSION, video_file_name};
use crate::page::PageProvider;
use crate::report::{Operation, RunReport, human_size};
use crate::transfer::{ProgressFn, RequestHeaders, RetryPolicy, Transfer};
use crate::verify::ContentVerifier;

/// Final state of one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DownloadOutcome {
    /// The local file already matched the remote one.
    AlreadyComplete,
    /// The local file is larger than the remote one; left untouched.
    SkippedLocalLargerThanRemote,
    /// Policy (dry run) prevented the transfer.
    SkippedByPolicy,
    /// Transferred and validated.
    Fetched,
    /// Every attempt failed transiently.
    FailedRetriesExhausted,
    /// The transfer failed in a way retries cannot fix.
    FailedPermanent,
    /// Empty file or rejected by the content verifier.
    FailedCorrupt,
    /// Size on disk differs from the remote size.
    FailedSizeMismatch,
    /// The video page offers no matching download.
    FailedNoLink,
    /// The video page could not be read.
    FailedPageLoad,
    /// The run was interrupted during the transfer.
    Interrupted,
}

impl DownloadOutcome {
    /// Label used in the summary.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::AlreadyComplete => "already complete",
            Self::SkippedLocalLargerThanRemote => "local larger",
            Self::SkippedByPolicy => "skipped",
            Self::Fetched => "fetched",
            Self::FailedRetriesExhausted => "retries exhausted",
            Self::FailedPermanent => "failed",
            Self::FailedCorrupt => "corrupt",
            Self::FailedSizeMismatch => "size mismatch",
            Self::FailedNoLink => "no link",
            Self::FailedPageLoad => "page load failed",
            Self::Interrupted => "interrupted",
        }
    }

    /// Whether the item counts as an error.
    #[must_use]
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            Self::FailedRetriesExhausted
                | Self::FailedPermanent
                | Self::FailedCorrupt
                | Self::FailedSizeMismatch
                | Self::FailedNoLink
                | Self::FailedPageLoad
        )
    }

    /// Whether the canonical file is in place and may be linked.
    #[must_use]
    pub fn has_artifact(self) -> bool {
        matches!(
            self,
            Self::AlreadyComplete | Self::Fetched | Self::SkippedLocalLargerThanRemote
        )
    }
}

/// Receives transfer progress, e.g. to drive a progress bar.
pub trait ProgressObserver: Send + Sync {
    /// A transfer of `file_name` starts with `already` bytes on disk.
    fn started(&self, file_name: &str, total: Option<u64>, already: u64);
    /// Bytes on disk so far.
    fn advanced(&self, bytes: u64);
    /// The transfer ended, successfully or not.
    fn finished(&self);
}

/// Reconciliation options.
#[derive(Debug, Clone)]
pub struct ReconcileSettings {
    pub target_dir: PathBuf,
    pub probe_sizes: bool,
    pub dry_run: bool,
    pub verify: bool,
    pub verify_existing: bool,
    /// Transfer retry policy.
    pub retry: RetryPolicy,
    /// Attempts to read a video page.
    pub page_attempts: u32,
    pub stall_timeout: Duration,
    pub page_timeout: Duration,
    pub preferences: Vec<String>,
    pub settings: SettingsTargets,
}

impl ReconcileSettings {
    /// Extracts the reconciliation options of a run.
    #[must_use]
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            target_dir: config.target_dir.clone(),
            probe_sizes: config.probe_sizes,
            dry_run: config.dry_run,
            verify: config.verify,
            verify_existing: config.verify_existing,
            retry: RetryPolicy::with_max_attempts(config.retry_count),
            page_attempts: config.retry_count.max(1),
            stall_timeout: config.stall_timeout,
            page_timeout: config.page_timeout,
            preferences: config.rendition_preferences.clone(),
            settings: config.settings.clone(),
        }
    }
}

/// Result of reconciling one video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemResult {
    pub video_id: u64,
    pub title: String,
    /// Canonical file name, `None` when no rendition was found.
    pub file_name: Option<String>,
    pub choice: Option<RenditionChoice>,
    pub outcome: DownloadOutcome,
    /// Transfer attempts made.
    pub attempts: u32,
}

/// Reconciles videos one at a time against the mirror directory.
pub struct Reconciler<'a> {
    page: &'a dyn PageProvider,
    classifier: &'a Classifier,
    transfer: &'a dyn Transfer,
    verifier: Option<&'a dyn ContentVerifier>,
    observer: Option<Arc<dyn ProgressObserver>>,
    settings: ReconcileSettings,
    headers: RequestHeaders,
    account: Option<String>,
    interrupted: Arc<AtomicBool>,
    total_remote_bytes: u64,
}

impl<'a> Reconciler<'a> {
    #[must_use]
    pub fn new(
        page: &'a dyn PageProvider,
        classifier: &'a Classifier,
        transfer: &'a dyn Transfer,
        settings: ReconcileSettings,
    ) -> Self {
        Self {
            page,
            classifier,
            transfer,
            verifier: None,
            observer: None,
            settings,
            headers: RequestHeaders::new(),
            account: None,
            interrupted: Arc::new(AtomicBool::new(false)),
            total_remote_bytes: 0,
        }
    }

    /// Content verifier used by `verify` and `verify_existing`.
    #[must_use]
    pub fn with_verifier(mut self, verifier: Option<&'a dyn ContentVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    /// Headers forwarded with every transfer.
    #[must_use]
    pub fn with_headers(mut self, headers: RequestHeaders) -> Self {
        self.headers = headers;
        self
    }

    /// Account the session is logged into.
    #[must_use]
    pub fn with_account(mut self, account: Option<String>) -> Self {
        self.account = account;
        self
    }

    /// Shared interrupt flag.
    #[must_use]
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupted = flag;
        self
    }

    /// Observer of transfer progress.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Sum of the remote sizes seen so far.
    #[must_use]
    pub fn total_remote_bytes(&self) -> u64 {
        self.total_remote_bytes
    }

    /// Reconciles video `video_id`, the `position`-th of `total`.
    ///
    /// Problems are recorded in `report`; the outcome is tallied there too.
    #[instrument(skip(self, report))]
    pub async fn reconcile(
        &mut self,
        video_id: u64,
        position: usize,
        total: usize,
        report: &mut RunReport,
    ) -> ItemResult {
        let result = self.reconcile_inner(video_id, position, total, report).await;
        report.record_outcome(result.outcome);
        result
    }

    async fn reconcile_inner(
        &mut self,
        video_id: u64,
        position: usize,
        total: usize,
        report: &mut RunReport,
    ) -> ItemResult {
        let video = self.classifier.video(video_id);
        let mut result = ItemResult {
            video_id,
            title: String::new(),
            file_name: None,
            choice: None,
            outcome: DownloadOutcome::FailedPageLoad,
            attempts: 0,
        };

        let Some(video_page) = self.read_page(&video, report).await else {
            return result;
        };
        result.title.clone_from(&video_page.title);

        let choice = match select_rendition(&video_page.links, &self.settings.preferences) {
            Some((link, preference)) => {
                let extension = link.extension();
                let expected_size = self.probe(&link.url, video_id).await;
                Some(RenditionChoice {
                    preference,
                    link: link.clone(),
                    expected_size,
                    file_name: video_file_name(&video_page.title, video_id, &extension),
                })
            }
            None => None,
        };
        self.log_progress(&video_page.title, choice.as_ref(), position, total);

        if !self.settings.settings.is_empty() {
            self.mutate_settings(&video, video_page.author.as_deref(), report)
                .await;
        }

        let Some(choice) = choice else {
            let placeholder = video_file_name(&video_page.title, video_id, NO_EXTENSION);
            if self.settings.dry_run {
                result.outcome = DownloadOutcome::SkippedByPolicy;
            } else {
                report.error(
                    Operation::Inspect,
                    placeholder,
                    format!("no download link matching {:?}", self.settings.preferences),
                );
                result.outcome = DownloadOutcome::FailedNoLink;
            }
            return result;
        };

        let target = self.settings.target_dir.join(&choice.file_name);
        let local = local_size(&target).await;
        let decision = SizeState::settle(choice.expected_size, local);
        result.file_name = Some(choice.file_name.clone());

        result.outcome = match decision {
            SizeDecision::AlreadyComplete => {
                info!(file = %choice.file_name, "already complete");
                self.check_existing(&choice.file_name, report).await
            }
            SizeDecision::LocalLarger { local, remote } => {
                report.warning(
                    Operation::Transfer,
                    &choice.file_name,
                    format!("local file ({local} bytes) is larger than remote ({remote} bytes), left as is"),
                );
                DownloadOutcome::SkippedLocalLargerThanRemote
            }
            SizeDecision::Fetch { .. } if self.settings.dry_run => {
                info!(file = %choice.file_name, "dry run, not fetching");
                DownloadOutcome::SkippedByPolicy
            }
            SizeDecision::Fetch { .. } => {
                let fetched = self.fetch(&choice, report).await;
                result.attempts = fetched.attempts;
                fetched.outcome
            }
        };
        result.choice = Some(choice);
        result
    }

    /// Reads the video page, retrying until the title shows up.
    async fn read_page(
        &self,
        video: &ResourceIdentifier,
        report: &mut RunReport,
    ) -> Option<VideoPage> {
        let attempts = self.settings.page_attempts.max(1);
        let mut last_problem = String::from("title not found");
        for attempt in 1..=attempts {
            match read_video_page(self.page, self.classifier, video, self.settings.page_timeout)
                .await
            {
                Ok(Some(page)) => return Some(page),
                Ok(None) => warn!(url = %video, attempt, "video title not found"),
                Err(error) => {
                    warn!(url = %video, attempt, %error, "video page load failed");
                    last_problem = error.to_string();
                }
            }
        }
        report.error(
            Operation::Inspect,
            video.canonical(),
            format!("page load failed after {attempts} attempts: {last_problem}"),
        );
        None
    }

    async fn probe(&mut self, url: &str, video_id: u64) -> Option<u64> {
        if !self.settings.probe_sizes {
            return None;
        }
        match self.transfer.probe_size(url, &self.headers).await {
            Ok(Some(size)) => {
                self.total_remote_bytes = self.total_remote_bytes.saturating_add(size);
                Some(size)
            }
            Ok(None) => None,
            Err(error) => {
                warn!(video_id, %error, "could not probe remote size");
                None
            }
        }
    }

    fn log_progress(
        &self,
        title: &str,
        choice: Option<&RenditionChoice>,
        position: usize,
        total: usize,
    ) {
        let description = match choice {
            Some(choice) => match choice.expected_size {
                Some(size) => format!("{}, {}", choice.description(), human_size(size)),
                None => choice.description(),
            },
            None => NO_EXTENSION.to_uppercase(),
        };
        let percent = if total == 0 { 100 } else { position * 100 / total };
        let mut line = format!("{title} ({description}) {position}/{total} {percent}%");
        if self.total_remote_bytes > 0 {
            line.push(' ');
            line.push_str(&human_size(self.total_remote_bytes));
        }
        info!("{line}");
    }

    async fn mutate_settings(
        &self,
        video: &ResourceIdentifier,
        author: Option<&str>,
        report: &mut RunReport,
    ) {
        if !may_edit(self.account.as_deref(), author) {
            info!(
                url = %video,
                author = author.unwrap_or("unknown"),
                "not the owner, leaving settings alone"
            );
            return;
        }
        let outcome = apply_settings(
            self.page,
            video,
            &self.settings.settings,
            self.settings.page_timeout,
        )
        .await;
        for error in outcome.errors {
            report.error(Operation::Settings, video.canonical(), error.to_string());
        }
    }

    /// Runs the verifier over an already complete file when asked to.
    async fn check_existing(&self, file_name: &str, report: &mut RunReport) -> DownloadOutcome {
        if !self.settings.verify_existing {
            return DownloadOutcome::AlreadyComplete;
        }
        let Some(verifier) = self.verifier else {
            return DownloadOutcome::AlreadyComplete;
        };
        match verifier.verify(&self.settings.target_dir.join(file_name)).await {
            Ok(()) => DownloadOutcome::AlreadyComplete,
            Err(lines) => {
                report.error(Operation::Verify, file_name, lines.join("; "));
                DownloadOutcome::FailedCorrupt
            }
        }
    }

    async fn fetch(&self, choice: &RenditionChoice, report: &mut RunReport) -> FetchReport {
        let target = self.settings.target_dir.join(&choice.file_name);
        let progress: Option<ProgressFn> = self.observer.as_ref().map(|observer| {
            let observer = Arc::clone(observer);
            Arc::new(move |bytes: u64| observer.advanced(bytes)) as ProgressFn
        });
        if let Some(observer) = &self.observer {
            let already = local_size(&target).await.unwrap_or(0);
            observer.started(&choice.file_name, choice.expected_size, already);
        }

        let policy = FetchPolicy {
            retry: self.settings.retry.clone(),
            stall_timeout: self.settings.stall_timeout,
        };
        let verifier = if self.settings.verify { self.verifier } else { None };
        let fetched = fetch_and_validate(
            self.transfer,
            verifier,
            FetchRequest {
                url: &choice.link.url,
                target: &target,
                headers: &self.headers,
                expected_size: choice.expected_size,
            },
            &policy,
            &self.interrupted,
            progress,
        )
        .await;

        if let Some(observer) = &self.observer {
            observer.finished();
        }

        let detail = fetched.detail.clone().unwrap_or_default();
        match fetched.outcome {
            DownloadOutcome::Fetched => info!(file = %choice.file_name, attempts = fetched.attempts, "fetched"),
            DownloadOutcome::AlreadyComplete => {
                return FetchReport {
                    outcome: self.check_existing(&choice.file_name, report).await,
                    ..fetched
                };
            }
            DownloadOutcome::Interrupted => {
                warn!(file = %choice.file_name, "transfer interrupted");
            }
            DownloadOutcome::FailedCorrupt if self.settings.verify && !detail.is_empty() => {
                report.error(Operation::Verify, &choice.file_name, detail);
            }
            outcome if outcome.is_failure() => {
                report.error(Operation::Transfer, &choice.file_name, detail);
            }
            _ => {}
        }
        fetched
    }

    /// Whether the shared interrupt flag is set.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }
}
