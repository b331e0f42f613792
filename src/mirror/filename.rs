//! File and directory naming in the mirror.
//!
//! Every video is stored once at the top of the mirror as
//! `<title> <id>.<ext>`. The id is recovered from that name by the auditor,
//! so the trailing ` <id>.<ext>` part must survive cleanup untouched.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Extension used in logs when a video offers no rendition at all.
pub const NO_EXTENSION: &str = "none";

/// A name exactly as [`video_file_name`] builds it: an optional trimmed title
/// and one space, then the id and a lowercase extension.
#[allow(clippy::expect_used)]
static VIDEO_FILE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?:[^\s.]|\S.*[^\s.]) )?([1-9]\d*)\.[a-z0-9]{1,8}$")
        .expect("video file regex is valid") // Static pattern, safe to panic
});

/// Replaces characters that are invalid in file names with `_`.
#[must_use]
pub fn cleanup_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            ':' | '/' | '\\' | '\'' | '"' | '?' | '*' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}

/// Normalizes a page title: surrounding whitespace and trailing dots go.
#[must_use]
pub fn clean_title(raw: &str) -> String {
    raw.trim_start()
        .trim_end_matches(|c: char| c == '.' || c.is_whitespace())
        .to_string()
}

/// Directory name of a folder with the given remote title.
#[must_use]
pub fn folder_dir_name(title: &str) -> String {
    cleanup_file_name(&clean_title(title))
}

/// Canonical file name of a video.
///
/// ```
/// use vimeo_mirror::mirror::video_file_name;
///
/// assert_eq!(video_file_name("Demo: Part 1", 999, "mp4"), "Demo_ Part 1 999.mp4");
/// assert_eq!(video_file_name("", 999, "mov"), "999.mov");
/// ```
#[must_use]
pub fn video_file_name(title: &str, id: u64, extension: &str) -> String {
    let title = clean_title(title);
    let extension = extension.to_lowercase();
    if title.is_empty() {
        cleanup_file_name(&format!("{id}.{extension}"))
    } else {
        cleanup_file_name(&format!("{title} {id}.{extension}"))
    }
}

/// Extension announced by a rendition label such as `"HD .MP4 file (250MB)"`.
#[must_use]
pub fn extension_from_label(label: &str) -> Option<String> {
    let token = label.split_whitespace().nth(1)?;
    let extension = token.trim_matches('.').to_lowercase();
    let valid = !extension.is_empty()
        && extension.len() <= 8
        && extension.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then_some(extension)
}

/// Extension of the last path segment of `url`, without the dot.
#[must_use]
pub fn extension_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let last_segment = parsed.path_segments()?.next_back()?;
    let (_, extension) = last_segment.rsplit_once('.')?;
    let valid = !extension.is_empty()
        && extension.len() <= 8
        && extension.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then(|| extension.to_lowercase())
}

/// Video id embedded in a mirrored file name.
///
/// ```
/// use vimeo_mirror::mirror::video_id_from_file_name;
///
/// assert_eq!(video_id_from_file_name("Demo Title 999.mp4"), Some(999));
/// assert_eq!(video_id_from_file_name("notes.txt"), None);
/// ```
#[must_use]
pub fn video_id_from_file_name(name: &str) -> Option<u64> {
    VIDEO_FILE_PATTERN
        .captures(name)
        .and_then(|captures| captures.get(1))
        .and_then(|id| id.as_str().parse().ok())
}
