//! Retrying, stall-guarded fetch and post-transfer validation.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, info, warn};

use super::DownloadOutcome;
use crate::transfer::watchdog::fetch_guarded;
use crate::transfer::{
    FailureType, FetchOptions, ProgressFn, RequestHeaders, RetryDecision, RetryPolicy, Transfer,
    classify_error,
};
use crate::verify::ContentVerifier;

/// What to fetch and where.
#[derive(Debug, Clone, Copy)]
pub struct FetchRequest<'a> {
    pub url: &'a str,
    pub target: &'a Path,
    pub headers: &'a RequestHeaders,
    /// Remote length when known.
    pub expected_size: Option<u64>,
}

/// How hard to try.
#[derive(Debug, Clone)]
pub struct FetchPolicy {
    pub retry: RetryPolicy,
    pub stall_timeout: Duration,
}

/// Result of [`fetch_and_validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchReport {
    pub outcome: DownloadOutcome,
    /// Transfer attempts made.
    pub attempts: u32,
    /// Explanation for anything but success.
    pub detail: Option<String>,
}

impl FetchReport {
    fn new(outcome: DownloadOutcome, attempts: u32, detail: Option<String>) -> Self {
        Self {
            outcome,
            attempts,
            detail,
        }
    }
}

/// Size of the file at `path`, `None` when it does not exist.
pub async fn local_size(path: &Path) -> Option<u64> {
    tokio::fs::metadata(path)
        .await
        .ok()
        .filter(std::fs::Metadata::is_file)
        .map(|metadata| metadata.len())
}

/// Fetches `request.url` into `request.target` and validates the result.
///
/// Every attempt resumes from the bytes already on disk. Transient failures
/// are retried until the policy gives up; a 416 answer means the file is
/// already whole when no remote size is known.
pub async fn fetch_and_validate(
    transfer: &dyn Transfer,
    verifier: Option<&dyn ContentVerifier>,
    request: FetchRequest<'_>,
    policy: &FetchPolicy,
    interrupted: &AtomicBool,
    progress: Option<ProgressFn>,
) -> FetchReport {
    let mut attempt: u32 = 1;
    loop {
        let resume_from = local_size(request.target).await.unwrap_or(0);
        let options = FetchOptions {
            headers: request.headers.clone(),
            resume_from,
            on_progress: progress.clone(),
        };
        debug!(url = request.url, attempt, resume_from, "starting transfer");

        let error = match fetch_guarded(
            transfer,
            request.url,
            request.target,
            &options,
            policy.stall_timeout,
            interrupted,
        )
        .await
        {
            Ok(()) => {
                let (outcome, detail) =
                    validate(request.target, request.expected_size, verifier).await;
                return FetchReport::new(outcome, attempt, detail);
            }
            Err(error) => error,
        };

        if interrupted.load(Ordering::SeqCst) {
            return FetchReport::new(DownloadOutcome::Interrupted, attempt, Some(error.to_string()));
        }

        let failure = classify_error(&error);
        if failure == FailureType::RangeNotSatisfiable {
            return range_not_satisfiable(request, attempt, resume_from).await;
        }

        match policy.retry.should_retry(failure, attempt) {
            RetryDecision::Retry { delay, attempt: next } => {
                warn!(
                    url = request.url,
                    attempt,
                    delay_ms = delay.as_millis(),
                    %error,
                    "transfer failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt = next;
            }
            RetryDecision::DoNotRetry { reason } => {
                let outcome = if failure == FailureType::Permanent {
                    DownloadOutcome::FailedPermanent
                } else {
                    DownloadOutcome::FailedRetriesExhausted
                };
                return FetchReport::new(outcome, attempt, Some(format!("{error} ({reason})")));
            }
        }
    }
}

async fn range_not_satisfiable(
    request: FetchRequest<'_>,
    attempt: u32,
    resume_from: u64,
) -> FetchReport {
    match request.expected_size {
        None => {
            info!(
                url = request.url,
                bytes = resume_from,
                "server has nothing past the local copy, treating it as complete"
            );
            FetchReport::new(DownloadOutcome::AlreadyComplete, attempt, None)
        }
        Some(expected) if expected == resume_from => {
            FetchReport::new(DownloadOutcome::AlreadyComplete, attempt, None)
        }
        Some(expected) => FetchReport::new(
            DownloadOutcome::FailedSizeMismatch,
            attempt,
            Some(format!(
                "server refused range from {resume_from} but reported {expected} bytes"
            )),
        ),
    }
}

/// Checks a freshly transferred file.
async fn validate(
    target: &Path,
    expected: Option<u64>,
    verifier: Option<&dyn ContentVerifier>,
) -> (DownloadOutcome, Option<String>) {
    let size = local_size(target).await.unwrap_or(0);
    if size == 0 {
        return (
            DownloadOutcome::FailedCorrupt,
            Some("transferred file is empty".to_string()),
        );
    }
    if let Some(expected) = expected
        && size != expected
    {
        return (
            DownloadOutcome::FailedSizeMismatch,
            Some(format!("expected {expected} bytes, got {size}")),
        );
    }
    if let Some(verifier) = verifier
        && let Err(lines) = verifier.verify(target).await
    {
        return (DownloadOutcome::FailedCorrupt, Some(lines.join("; ")));
    }
    (DownloadOutcome::Fetched, None)
}
