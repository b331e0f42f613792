//! End-to-end runs of the mirror pipeline against a scripted site and
//! transfer provider.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use tempfile::TempDir;
use vimeo_mirror::mirror::MARKER_FILE_NAME;
use vimeo_mirror::{
    Collaborators, DownloadOutcome, PipelineError, RunConfig, RunSummary, run,
};

mod support;
use support::fake_site::{FakeSite, Page};
use support::fake_transfer::FakeTransfer;
use support::quick_config;

const ACCOUNT: &str = "https://vimeo.com/someone";
const ALBUM: &str = "https://vimeo.com/album/10";

fn cdn(id: u64) -> String {
    format!("https://cdn.test/{id}/hd.mp4")
}

fn mirrored_site() -> FakeSite {
    let mut site = FakeSite::new()
        .page(
            "https://vimeo.com/someone/videos",
            Page::listing(&["https://vimeo.com/1", "https://vimeo.com/2"]),
        )
        .page("https://vimeo.com/someone/albums", Page::listing(&[ALBUM]))
        .page(
            ALBUM,
            Page::folder("Holiday", &["https://vimeo.com/2", "https://vimeo.com/3"]),
        );
    for (id, title) in [(1, "First"), (2, "Second"), (3, "Third")] {
        site = site.page(
            &format!("https://vimeo.com/{id}"),
            Page::video(title, &[("HD .MP4 file", &cdn(id))]),
        );
    }
    site
}

fn transfer() -> FakeTransfer {
    FakeTransfer::new()
        .file(&cdn(1), vec![1u8; 100])
        .file(&cdn(2), vec![2u8; 200])
        .file(&cdn(3), vec![3u8; 300])
}

async fn run_with(
    config: &RunConfig,
    site: &FakeSite,
    transfer: &FakeTransfer,
    interrupted: bool,
) -> Result<RunSummary, PipelineError> {
    run(
        config,
        Collaborators {
            page: site,
            transfer,
            verifier: None,
        },
        None,
        Arc::new(AtomicBool::new(interrupted)),
    )
    .await
}

#[tokio::test]
async fn test_account_run_mirrors_every_video_once() {
    let dir = TempDir::new().unwrap();
    let site = mirrored_site();
    let transfer = transfer();
    let config = quick_config(dir.path(), &[ACCOUNT]);

    let summary = run_with(&config, &site, &transfer, false).await.unwrap();

    assert!(summary.succeeded());
    assert_eq!(summary.results.len(), 3);
    assert!(
        summary
            .results
            .iter()
            .all(|result| result.outcome == DownloadOutcome::Fetched)
    );
    assert_eq!(transfer.fetches().len(), 3);
    assert_eq!(std::fs::read(dir.path().join("First 1.mp4")).unwrap().len(), 100);
    assert_eq!(std::fs::read(dir.path().join("Third 3.mp4")).unwrap().len(), 300);

    let marker = std::fs::read_to_string(dir.path().join(MARKER_FILE_NAME)).unwrap();
    assert!(marker.contains(ACCOUNT));
    assert!(
        summary
            .report
            .summary_line()
            .starts_with("Processed 3 items, 0 errors")
    );
}

#[cfg(unix)]
#[tokio::test]
async fn test_folder_views_link_to_canonical_files() {
    let dir = TempDir::new().unwrap();
    let site = mirrored_site();
    let transfer = transfer();
    let config = quick_config(dir.path(), &[ACCOUNT]);

    let summary = run_with(&config, &site, &transfer, false).await.unwrap();

    assert_eq!(summary.links.created, 2);
    let folder = dir.path().join("Holiday");
    assert_eq!(
        std::fs::read_link(folder.join("Second 2.mp4")).unwrap(),
        std::path::PathBuf::from("../Second 2.mp4")
    );
    assert!(!folder.join("First 1.mp4").exists());
    assert!(summary.audit.findings.is_empty());
}

#[tokio::test]
async fn test_second_run_transfers_nothing() {
    let dir = TempDir::new().unwrap();
    let site = mirrored_site();
    let config = quick_config(dir.path(), &[ACCOUNT]);
    run_with(&config, &site, &transfer(), false).await.unwrap();

    let again = transfer();
    let summary = run_with(&config, &site, &again, false).await.unwrap();

    assert!(again.fetches().is_empty());
    assert!(
        summary
            .results
            .iter()
            .all(|result| result.outcome == DownloadOutcome::AlreadyComplete)
    );
}

#[tokio::test]
async fn test_login_without_roots_mirrors_the_account() {
    let dir = TempDir::new().unwrap();
    let site = mirrored_site().login_form("someone");
    let transfer = transfer();
    let config = RunConfig {
        credentials: Some("me@example.com:pw".parse().unwrap()),
        ..quick_config(dir.path(), &[])
    };

    let summary = run_with(&config, &site, &transfer, false).await.unwrap();

    assert_eq!(summary.crawl.items.ids(), vec![1, 2, 3]);
    assert!(summary.succeeded());
}

#[tokio::test]
async fn test_failed_login_without_roots_aborts() {
    let dir = TempDir::new().unwrap();
    let site = FakeSite::new();
    let config = RunConfig {
        credentials: Some("me@example.com:pw".parse().unwrap()),
        ..quick_config(dir.path(), &[])
    };

    let error = run_with(&config, &site, &transfer(), false)
        .await
        .unwrap_err();

    assert!(matches!(error, PipelineError::AuthenticationFailed { .. }));
}

#[tokio::test]
async fn test_failed_login_with_roots_is_only_reported() {
    let dir = TempDir::new().unwrap();
    let site = mirrored_site();
    let config = RunConfig {
        credentials: Some("me@example.com:pw".parse().unwrap()),
        ..quick_config(dir.path(), &[ACCOUNT])
    };

    let summary = run_with(&config, &site, &transfer(), false).await.unwrap();

    assert_eq!(summary.results.len(), 3);
    assert_eq!(summary.report.error_count(), 1);
    assert!(!summary.succeeded());
}

#[tokio::test]
async fn test_foreign_root_is_rejected_before_any_navigation() {
    let dir = TempDir::new().unwrap();
    let site = mirrored_site();
    let config = quick_config(dir.path(), &["https://example.com/someone"]);

    let error = run_with(&config, &site, &transfer(), false)
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        PipelineError::InvalidRoot { ref locator, .. } if locator == "https://example.com/someone"
    ));
    assert!(site.navigations().is_empty());
}

#[tokio::test]
async fn test_dry_run_transfers_nothing() {
    let dir = TempDir::new().unwrap();
    let site = mirrored_site();
    let transfer = transfer();
    let config = RunConfig {
        dry_run: true,
        ..quick_config(dir.path(), &[ACCOUNT])
    };

    let summary = run_with(&config, &site, &transfer, false).await.unwrap();

    assert!(transfer.fetches().is_empty());
    assert_eq!(
        summary.report.outcome_count(DownloadOutcome::SkippedByPolicy),
        3
    );
    assert!(!dir.path().join("First 1.mp4").exists());
    assert_eq!(summary.links.created, 0);
}

#[tokio::test]
async fn test_interrupted_run_starts_no_work() {
    let dir = TempDir::new().unwrap();
    let site = mirrored_site();
    let transfer = transfer();
    let config = quick_config(dir.path(), &[ACCOUNT]);

    let summary = run_with(&config, &site, &transfer, true).await.unwrap();

    assert!(summary.interrupted);
    assert!(!summary.succeeded());
    assert!(summary.results.is_empty());
    assert!(transfer.fetches().is_empty());
}
