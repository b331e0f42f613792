//! Folder views: links from folder directories to canonical files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::config::LinkKind;
use crate::crawl::Folder;
use crate::report::{Operation, RunReport};

/// A link could not be created.
#[derive(Debug, Error)]
#[error("can't create link at {link}: {source}")]
pub struct LinkError {
    /// Path of the link.
    pub link: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Counts of a materialization pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkSummary {
    pub created: usize,
    pub failed: usize,
}

/// What a link in a folder directory points at.
///
/// Symbolic links are relative (`../<file>`) so the mirror can be moved as a
/// whole; hard links need the real path of the canonical file.
#[must_use]
pub fn link_target(kind: LinkKind, target_dir: &Path, file_name: &str) -> PathBuf {
    match kind {
        LinkKind::Symbolic => Path::new("..").join(file_name),
        LinkKind::Hard => target_dir.join(file_name),
    }
}

/// Creates one link per folder member that has a canonical file.
///
/// `artifacts` maps video ids to the file names present at the top of
/// `target_dir`. Existing entries at the link path are removed first; removal
/// errors are ignored and creation errors are reported, never propagated.
pub async fn materialize(
    folders: &[Folder],
    artifacts: &BTreeMap<u64, String>,
    target_dir: &Path,
    kind: LinkKind,
    report: &mut RunReport,
) -> LinkSummary {
    let mut summary = LinkSummary::default();
    for folder in folders {
        for id in &folder.members {
            let Some(file_name) = artifacts.get(id) else {
                debug!(video_id = id, folder = %folder.dir_name, "no artifact to link");
                continue;
            };
            let link = folder.path.join(file_name);
            match replace_link(&link, &link_target(kind, target_dir, file_name), kind).await {
                Ok(()) => summary.created += 1,
                Err(error) => {
                    summary.failed += 1;
                    report.error(Operation::Link, link.display().to_string(), error.to_string());
                }
            }
        }
    }
    if summary.created > 0 || summary.failed > 0 {
        info!(created = summary.created, failed = summary.failed, "folder links refreshed");
    }
    summary
}

async fn replace_link(link: &Path, target: &Path, kind: LinkKind) -> Result<(), LinkError> {
    if tokio::fs::symlink_metadata(link).await.is_ok()
        && let Err(error) = tokio::fs::remove_file(link).await
    {
        debug!(link = %link.display(), %error, "could not remove existing link");
    }
    create_link(target, link, kind)
        .await
        .map_err(|source| LinkError {
            link: link.to_path_buf(),
            source,
        })
}

async fn create_link(target: &Path, link: &Path, kind: LinkKind) -> std::io::Result<()> {
    match kind {
        LinkKind::Hard => tokio::fs::hard_link(target, link).await,
        LinkKind::Symbolic => symlink(target, link).await,
    }
}

#[cfg(unix)]
async fn symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    tokio::fs::symlink(target, link).await
}

#[cfg(windows)]
async fn symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    tokio::fs::symlink_file(target, link).await
}
