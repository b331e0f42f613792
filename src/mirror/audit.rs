//! Consistency audit of the mirror directory.
//!
//! Only reports. Nothing is ever deleted: duplicates and orphans are logged
//! and recorded as warnings so the user can decide.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{info, instrument, warn};

use super::filename::video_id_from_file_name;
use crate::report::{Operation, RunReport};

/// Why a file was flagged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FindingKind {
    /// Another file for the same id was kept.
    Duplicate {
        /// Name of the file kept for this id.
        kept: String,
    },
    /// The id was not discovered in this run.
    Orphan,
}

/// One flagged file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditFinding {
    pub path: PathBuf,
    pub video_id: u64,
    pub size: u64,
    pub kind: FindingKind,
}

/// Result of an audit pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditReport {
    /// Files scanned that carry a video id.
    pub scanned: usize,
    pub findings: Vec<AuditFinding>,
}

impl AuditReport {
    /// Flagged duplicates.
    pub fn duplicates(&self) -> impl Iterator<Item = &AuditFinding> {
        self.findings
            .iter()
            .filter(|f| matches!(f.kind, FindingKind::Duplicate { .. }))
    }

    /// Flagged orphans.
    pub fn orphans(&self) -> impl Iterator<Item = &AuditFinding> {
        self.findings
            .iter()
            .filter(|f| f.kind == FindingKind::Orphan)
    }
}

#[derive(Debug)]
struct Candidate {
    path: PathBuf,
    name: String,
    size: u64,
    modified: SystemTime,
}

/// Audits the top level of `target_dir` against the ids discovered this run.
///
/// Files are grouped by the id embedded in their name. Ids outside
/// `known_ids` are flagged as orphans when `detect_obsolete` is set. Groups
/// with several files keep the largest (then most recently modified) one and
/// flag the others as duplicates.
#[instrument(skip(known_ids, report), fields(known = known_ids.len()))]
pub async fn audit(
    target_dir: &Path,
    known_ids: &HashSet<u64>,
    detect_obsolete: bool,
    report: &mut RunReport,
) -> AuditReport {
    let groups = match scan(target_dir).await {
        Ok(groups) => groups,
        Err(error) => {
            report.error(
                Operation::Audit,
                target_dir.display().to_string(),
                format!("could not scan mirror directory: {error}"),
            );
            return AuditReport::default();
        }
    };

    let mut result = AuditReport {
        scanned: groups.values().map(Vec::len).sum(),
        findings: Vec::new(),
    };

    for (id, mut files) in groups {
        if detect_obsolete && !known_ids.contains(&id) {
            for file in &files {
                result.findings.push(AuditFinding {
                    path: file.path.clone(),
                    video_id: id,
                    size: file.size,
                    kind: FindingKind::Orphan,
                });
            }
        }
        if files.len() > 1 {
            files.sort_by(|a, b| (b.size, b.modified).cmp(&(a.size, a.modified)));
            let kept = files[0].name.clone();
            for file in &files[1..] {
                result.findings.push(AuditFinding {
                    path: file.path.clone(),
                    video_id: id,
                    size: file.size,
                    kind: FindingKind::Duplicate { kept: kept.clone() },
                });
            }
        }
    }

    for finding in &result.findings {
        let message = match &finding.kind {
            FindingKind::Orphan => format!("video {} is no longer listed remotely", finding.video_id),
            FindingKind::Duplicate { kept } => {
                format!("duplicate of {kept} for video {}", finding.video_id)
            }
        };
        report.warning(Operation::Audit, finding.path.display().to_string(), message);
    }
    info!(
        scanned = result.scanned,
        duplicates = result.duplicates().count(),
        orphans = result.orphans().count(),
        "audit complete"
    );
    result
}

async fn scan(target_dir: &Path) -> std::io::Result<BTreeMap<u64, Vec<Candidate>>> {
    let mut groups: BTreeMap<u64, Vec<Candidate>> = BTreeMap::new();
    let mut entries = tokio::fs::read_dir(target_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(id) = video_id_from_file_name(&name) else {
            continue;
        };
        // symlink_metadata so links are not mistaken for canonical files
        let metadata = match tokio::fs::symlink_metadata(entry.path()).await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => continue,
            Err(error) => {
                warn!(file = %name, %error, "skipping unreadable file");
                continue;
            }
        };
        groups.entry(id).or_default().push(Candidate {
            path: entry.path(),
            name,
            size: metadata.len(),
            modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
        });
    }
    Ok(groups)
}
