//! Integration tests for site traversal against a scripted site.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use tempfile::TempDir;
use vimeo_mirror::crawl::CrawlSettings;
use vimeo_mirror::mirror::MARKER_FILE_NAME;
use vimeo_mirror::report::Operation;
use vimeo_mirror::{Classifier, CrawlOutput, Crawler, RunConfig, RunReport, classify};

mod support;
use support::fake_site::{FakeSite, Page};
use support::quick_config;

const ACCOUNT: &str = "https://vimeo.com/someone";
const VIDEOS: &str = "https://vimeo.com/someone/videos";
const ALBUMS: &str = "https://vimeo.com/someone/albums";
const ALBUM: &str = "https://vimeo.com/album/10";

fn account_site() -> FakeSite {
    FakeSite::new()
        .page(
            VIDEOS,
            Page::listing(&["https://vimeo.com/1", "https://vimeo.com/2"]),
        )
        .page(ALBUMS, Page::listing(&[ALBUM]))
        .page(
            ALBUM,
            Page::folder(
                "Holiday: 2019",
                &["https://vimeo.com/2", "https://vimeo.com/3"],
            ),
        )
}

async fn crawl(site: &FakeSite, config: &RunConfig, report: &mut RunReport) -> CrawlOutput {
    let classifier = Classifier::default();
    let roots: Vec<_> = config
        .roots
        .iter()
        .map(|root| classify(root).expect("root"))
        .collect();
    Crawler::new(site, &classifier, CrawlSettings::from_config(config))
        .crawl(&roots, report)
        .await
}

#[tokio::test]
async fn test_account_crawl_finds_each_video_once_with_folder_membership() {
    let dir = TempDir::new().unwrap();
    let site = account_site();
    let config = quick_config(dir.path(), &[ACCOUNT]);
    let mut report = RunReport::new();

    let output = crawl(&site, &config, &mut report).await;

    assert_eq!(output.items.ids(), vec![1, 2, 3]);
    assert_eq!(output.folders.len(), 1);
    let folder = &output.folders[0];
    assert_eq!(folder.dir_name, "Holiday_ 2019");
    assert_eq!(folder.members, vec![2, 3]);
    assert!(output.items.get(1).unwrap().folders.is_empty());
    assert_eq!(output.items.get(2).unwrap().folders, vec!["Holiday_ 2019"]);

    let marker = std::fs::read_to_string(folder.path.join(MARKER_FILE_NAME)).unwrap();
    assert!(marker.contains("URL=https://vimeo.com/album/10"));
    assert_eq!(report.error_count(), 0);
}

#[tokio::test]
async fn test_crawl_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let site = account_site();
    let config = quick_config(dir.path(), &[ACCOUNT]);

    let first = crawl(&site, &config, &mut RunReport::new()).await;
    let second = crawl(&site, &config, &mut RunReport::new()).await;

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_no_folders_keeps_videos_but_creates_no_directories() {
    let dir = TempDir::new().unwrap();
    let site = account_site();
    let config = RunConfig {
        create_folders: false,
        ..quick_config(dir.path(), &[ACCOUNT])
    };

    let output = crawl(&site, &config, &mut RunReport::new()).await;

    assert_eq!(output.items.len(), 3);
    assert!(output.folders.is_empty());
    assert!(!dir.path().join("Holiday_ 2019").exists());
}

#[tokio::test]
async fn test_pagination_follows_next_link_and_respects_cap() {
    let page_two = "https://vimeo.com/someone/videos/page:2";
    let site = FakeSite::new()
        .page(
            VIDEOS,
            Page::listing(&[
                "https://vimeo.com/11",
                "https://vimeo.com/12",
                "https://vimeo.com/13",
            ])
            .next_page(page_two),
        )
        .page(
            page_two,
            Page::listing(&[
                "https://vimeo.com/14",
                "https://vimeo.com/15",
                "https://vimeo.com/16",
            ]),
        );
    let dir = TempDir::new().unwrap();

    let uncapped = crawl(&site, &quick_config(dir.path(), &[VIDEOS]), &mut RunReport::new()).await;
    assert_eq!(uncapped.items.ids(), vec![11, 12, 13, 14, 15, 16]);

    let capped_config = RunConfig {
        max_items: Some(4),
        ..quick_config(dir.path(), &[VIDEOS])
    };
    let capped = crawl(&site, &capped_config, &mut RunReport::new()).await;
    assert_eq!(capped.items.ids(), vec![11, 12, 13, 14]);
}

#[tokio::test]
async fn test_pagination_stops_when_a_page_repeats() {
    let site = FakeSite::new().page(
        VIDEOS,
        Page::listing(&["https://vimeo.com/21", "https://vimeo.com/22"]).next_page(VIDEOS),
    );
    let dir = TempDir::new().unwrap();

    let output = crawl(&site, &quick_config(dir.path(), &[VIDEOS]), &mut RunReport::new()).await;

    assert_eq!(output.items.ids(), vec![21, 22]);
    assert_eq!(site.navigations().len(), 2);
}

#[tokio::test]
async fn test_settings_and_foreign_links_are_skipped() {
    let site = FakeSite::new().page(
        VIDEOS,
        Page::listing(&[
            "https://vimeo.com/31",
            "https://vimeo.com/31/settings",
            "https://example.com/32",
            "https://vimeo.com/33",
        ]),
    );
    let dir = TempDir::new().unwrap();
    let mut report = RunReport::new();

    let output = crawl(&site, &quick_config(dir.path(), &[VIDEOS]), &mut report).await;

    assert_eq!(output.items.ids(), vec![31, 33]);
    assert_eq!(report.error_count(), 0);
}

#[tokio::test]
async fn test_missing_folder_title_is_reported_and_page_still_read() {
    let site = FakeSite::new().page(
        ALBUM,
        Page::listing(&["https://vimeo.com/41", "https://vimeo.com/42"]),
    );
    let dir = TempDir::new().unwrap();
    let mut report = RunReport::new();

    let output = crawl(&site, &quick_config(dir.path(), &[ALBUM]), &mut report).await;

    assert_eq!(output.items.ids(), vec![41, 42]);
    assert!(output.folders.is_empty());
    assert_eq!(report.error_count(), 1);
    assert_eq!(report.incidents()[0].operation, Operation::Folder);
    // one navigation per attempt while waiting for the title
    assert_eq!(site.navigation_count(ALBUM), 3);
}

#[tokio::test]
async fn test_page_load_failures_are_retried() {
    let site = FakeSite::new()
        .page(VIDEOS, Page::listing(&["https://vimeo.com/51"]))
        .fail_navigation(VIDEOS, 2);
    let dir = TempDir::new().unwrap();
    let mut report = RunReport::new();

    let output = crawl(&site, &quick_config(dir.path(), &[VIDEOS]), &mut report).await;

    assert_eq!(output.items.ids(), vec![51]);
    assert_eq!(site.navigation_count(VIDEOS), 3);
    assert_eq!(report.error_count(), 0);
}

#[tokio::test]
async fn test_unloadable_subtree_is_skipped_with_an_error() {
    let site = account_site().fail_navigation(ALBUM, 10);
    let dir = TempDir::new().unwrap();
    let mut report = RunReport::new();

    let output = crawl(&site, &quick_config(dir.path(), &[ACCOUNT]), &mut report).await;

    assert_eq!(output.items.ids(), vec![1, 2]);
    assert!(output.folders.is_empty());
    assert_eq!(report.error_count(), 1);
    assert_eq!(report.incidents()[0].operation, Operation::Crawl);
    assert_eq!(site.navigation_count(ALBUM), 3);
}

#[tokio::test]
async fn test_interrupted_crawl_stops_before_visiting() {
    let site = account_site();
    let dir = TempDir::new().unwrap();
    let config = quick_config(dir.path(), &[ACCOUNT]);
    let classifier = Classifier::default();
    let roots = vec![classify(ACCOUNT).unwrap()];

    let output = Crawler::new(&site, &classifier, CrawlSettings::from_config(&config))
        .with_interrupt(Arc::new(AtomicBool::new(true)))
        .crawl(&roots, &mut RunReport::new())
        .await;

    assert!(output.items.is_empty());
    assert!(site.navigations().is_empty());
}

#[tokio::test]
async fn test_bare_video_root_is_registered_without_navigation() {
    let site = FakeSite::new();
    let dir = TempDir::new().unwrap();

    let output = crawl(&site, &quick_config(dir.path(), &["4242"]), &mut RunReport::new()).await;

    assert_eq!(output.items.ids(), vec![4242]);
    assert!(site.navigations().is_empty());
}
