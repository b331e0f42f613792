//! Integration tests for the mirror directory: folder links and the audit pass.

use std::collections::{BTreeMap, HashSet};

use tempfile::TempDir;
use vimeo_mirror::mirror::{FindingKind, audit, materialize};
use vimeo_mirror::{Folder, LinkKind, RunReport, classify};

#[tokio::test]
async fn test_duplicate_renditions_keep_the_larger_file() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("Demo Title 999.mp4"), vec![0u8; 2048]).unwrap();
    std::fs::write(dir.path().join("Demo Title 999.mov"), vec![0u8; 512]).unwrap();
    std::fs::write(dir.path().join("Other 1000.mp4"), vec![0u8; 16]).unwrap();
    let known: HashSet<u64> = [999, 1000].into_iter().collect();
    let mut report = RunReport::new();

    let result = audit(dir.path(), &known, true, &mut report).await;

    assert_eq!(result.scanned, 3);
    let duplicates: Vec<_> = result.duplicates().collect();
    assert_eq!(duplicates.len(), 1);
    assert_eq!(duplicates[0].video_id, 999);
    assert!(duplicates[0].path.ends_with("Demo Title 999.mov"));
    assert_eq!(
        duplicates[0].kind,
        FindingKind::Duplicate {
            kept: "Demo Title 999.mp4".to_string()
        }
    );
    assert_eq!(result.orphans().count(), 0);
    assert_eq!(report.warning_count(), 1);
    assert_eq!(report.error_count(), 0);
    // nothing is deleted
    assert!(dir.path().join("Demo Title 999.mov").exists());
}

#[tokio::test]
async fn test_orphans_are_reported_only_with_obsolete_detection() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("Gone 555.mp4"), b"old").unwrap();
    std::fs::write(dir.path().join("Kept 556.mp4"), b"new").unwrap();
    let known: HashSet<u64> = [556].into_iter().collect();

    let mut report = RunReport::new();
    let detected = audit(dir.path(), &known, true, &mut report).await;
    let orphans: Vec<_> = detected.orphans().collect();
    assert_eq!(orphans.len(), 1);
    assert_eq!(orphans[0].video_id, 555);
    assert_eq!(report.warning_count(), 1);

    let mut report = RunReport::new();
    let ignored = audit(dir.path(), &known, false, &mut report).await;
    assert!(ignored.findings.is_empty());
    assert_eq!(report.warning_count(), 0);
}

#[cfg(unix)]
#[tokio::test]
async fn test_folder_links_point_at_canonical_files() {
    let dir = TempDir::new().unwrap();
    let folder_path = dir.path().join("Holiday");
    std::fs::create_dir(&folder_path).unwrap();
    std::fs::write(dir.path().join("Beach 7.mp4"), b"beach").unwrap();
    let folder = Folder {
        dir_name: "Holiday".to_string(),
        path: folder_path.clone(),
        source: classify("https://vimeo.com/album/3").unwrap(),
        title: "Holiday".to_string(),
        members: vec![7, 8],
    };
    // 8 has no artifact, so no link is made for it
    let artifacts: BTreeMap<u64, String> = [(7, "Beach 7.mp4".to_string())].into_iter().collect();
    let mut report = RunReport::new();

    let summary = materialize(
        &[folder],
        &artifacts,
        dir.path(),
        LinkKind::Symbolic,
        &mut report,
    )
    .await;

    assert_eq!(summary.created, 1);
    assert_eq!(summary.failed, 0);
    let link = folder_path.join("Beach 7.mp4");
    assert_eq!(
        std::fs::read_link(&link).unwrap(),
        std::path::PathBuf::from("../Beach 7.mp4")
    );
    assert_eq!(std::fs::read(&link).unwrap(), b"beach");

    // the audit only looks at the top level, links are not duplicates
    let known: HashSet<u64> = [7].into_iter().collect();
    let result = audit(dir.path(), &known, true, &mut report).await;
    assert!(result.findings.is_empty());
}
