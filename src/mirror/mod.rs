//! Local mirror layout.
//!
//! ```text
//! <target>/
//!   source.url                 marker of the starting locator
//!   vimeo-mirror.log           run log
//!   <title> <id>.<ext>         one canonical file per video
//!   <folder title>/
//!     source.url               marker of the folder
//!     <title> <id>.<ext>       link to ../<title> <id>.<ext>
//! ```

mod audit;
mod filename;
mod links;

pub use audit::{AuditFinding, AuditReport, FindingKind, audit};
pub use filename::{
    NO_EXTENSION, clean_title, cleanup_file_name, extension_from_label, extension_from_url,
    folder_dir_name, video_file_name, video_id_from_file_name,
};
pub use links::{LinkError, LinkSummary, link_target, materialize};

use std::path::{Path, PathBuf};

use crate::locator::ResourceIdentifier;

/// Name of the run log written into the target directory.
pub const LOG_FILE_NAME: &str = "vimeo-mirror.log";

/// Name of the marker file recording where a directory came from.
pub const MARKER_FILE_NAME: &str = "source.url";

/// Contents of a marker file for `source`, in Internet Shortcut format.
#[must_use]
pub fn marker_contents(source: &ResourceIdentifier) -> String {
    format!("[InternetShortcut]\nURL={}\n", source.canonical())
}

/// Writes the marker file for `source` into `dir`, replacing any previous one.
///
/// # Errors
///
/// Returns the IO error if the file cannot be written.
pub async fn write_marker(dir: &Path, source: &ResourceIdentifier) -> std::io::Result<PathBuf> {
    let path = dir.join(MARKER_FILE_NAME);
    tokio::fs::write(&path, marker_contents(source)).await?;
    Ok(path)
}
