//! Video page reading and rendition selection.

use tracing::{debug, instrument};

use crate::locator::{Classifier, ResourceIdentifier};
use crate::mirror::{clean_title, extension_from_label, extension_from_url};
use crate::page::{By, FindOptions, PageError, PageProvider};
use crate::site::{DOWNLOAD_BUTTON_TEXT, DOWNLOAD_LINKS, DOWNLOAD_PANEL, VIDEO_AUTHOR, VIDEO_TITLE};

/// One download affordance offered on a video page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadLink {
    /// Visible text, e.g. `"HD .MP4 file (250MB)"`.
    pub text: String,
    pub url: String,
}

impl DownloadLink {
    /// Quality label: the first word of the text.
    #[must_use]
    pub fn quality(&self) -> &str {
        self.text.split_whitespace().next().unwrap_or_default()
    }

    /// File extension announced by the text, or taken from the URL.
    #[must_use]
    pub fn extension(&self) -> String {
        extension_from_label(&self.text)
            .or_else(|| extension_from_url(&self.url))
            .unwrap_or_else(|| "mp4".to_string())
    }
}

/// What a video page offers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoPage {
    pub title: String,
    /// Account name of the uploader, when the page shows it.
    pub author: Option<String>,
    /// Download links, empty when downloads are not offered.
    pub links: Vec<DownloadLink>,
}

/// The rendition picked for a video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenditionChoice {
    /// Preference label that matched.
    pub preference: String,
    pub link: DownloadLink,
    /// Remote length, `None` when probing is disabled or failed.
    pub expected_size: Option<u64>,
    /// Canonical local file name.
    pub file_name: String,
}

impl RenditionChoice {
    /// Short description for logs, e.g. `HD/MP4`.
    #[must_use]
    pub fn description(&self) -> String {
        format!("{}/{}", self.link.quality(), self.link.extension().to_uppercase())
    }
}

/// Picks the download link for the first matching preference.
///
/// An exact match of a preference against a link's quality label is tried
/// for the whole preference list first; only then are preferences matched as
/// substrings of the link text. Matching ignores ASCII case.
#[must_use]
pub fn select_rendition<'a>(
    links: &'a [DownloadLink],
    preferences: &[String],
) -> Option<(&'a DownloadLink, String)> {
    let preferences: Vec<&str> = preferences
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect();

    for preference in &preferences {
        if let Some(link) = links
            .iter()
            .find(|link| link.quality().eq_ignore_ascii_case(preference))
        {
            return Some((link, (*preference).to_string()));
        }
    }
    for preference in &preferences {
        let needle = preference.to_lowercase();
        if let Some(link) = links
            .iter()
            .find(|link| link.text.to_lowercase().contains(&needle))
        {
            return Some((link, (*preference).to_string()));
        }
    }
    None
}

/// Reads a video page.
///
/// Returns `Ok(None)` when the title never appeared, which means the page did
/// not load properly and is worth another try.
#[instrument(skip(page, classifier, video), fields(url = %video))]
pub async fn read_video_page(
    page: &dyn PageProvider,
    classifier: &Classifier,
    video: &ResourceIdentifier,
    timeout: std::time::Duration,
) -> Result<Option<VideoPage>, PageError> {
    page.navigate(video.canonical()).await?;

    let Some(title_element) = page
        .find_one(&By::css(VIDEO_TITLE), FindOptions::waiting(timeout))
        .await?
    else {
        return Ok(None);
    };
    let title = clean_title(&title_element.text().await?);

    let author = match page
        .find_one(&By::css(VIDEO_AUTHOR), FindOptions::immediate())
        .await?
    {
        Some(element) => element
            .attribute("href")
            .await?
            .and_then(|href| classifier.classify(&href).ok())
            .and_then(|id| id.account().map(str::to_string)),
        None => None,
    };

    let mut links = Vec::new();
    if let Some(button) = page
        .find_one(&By::link_text(DOWNLOAD_BUTTON_TEXT), FindOptions::immediate())
        .await?
    {
        button.click().await?;
        if page
            .find_one(&By::css(DOWNLOAD_PANEL), FindOptions::waiting(timeout))
            .await?
            .is_some()
        {
            for element in page.find_all(&By::css(DOWNLOAD_LINKS)).await? {
                let Some(url) = element.attribute("href").await? else {
                    continue;
                };
                let text = element.text().await?.trim().to_string();
                links.push(DownloadLink { text, url });
            }
        }
    }
    debug!(title, ?author, links = links.len(), "read video page");

    Ok(Some(VideoPage {
        title,
        author,
        links,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn link(text: &str) -> DownloadLink {
        DownloadLink {
            text: text.to_string(),
            url: format!("https://cdn.test/{}", text.replace(' ', "_")),
        }
    }

    fn prefs(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|l| (*l).to_string()).collect()
    }

    #[test]
    fn test_first_preference_with_exact_label_wins() {
        let links = vec![link("SD .MP4 file"), link("HD .MP4 file"), link("Original .MOV file")];
        let (chosen, preference) =
            select_rendition(&links, &prefs(&["Original", "HD", "SD"])).unwrap();
        assert_eq!(chosen.text, "Original .MOV file");
        assert_eq!(preference, "Original");
    }

    #[test]
    fn test_exact_matches_beat_earlier_substring_matches() {
        let links = vec![link("Mobile 1080p .MP4"), link("HD .MP4 file")];
        let (chosen, preference) = select_rendition(&links, &prefs(&["1080p", "HD"])).unwrap();
        assert_eq!(chosen.text, "HD .MP4 file");
        assert_eq!(preference, "HD");
    }

    #[test]
    fn test_substring_fallback_follows_preference_order() {
        let links = vec![link("Source .MP4 (1080p)"), link("Source .MP4 (720p)")];
        let selected = select_rendition(&links, &prefs(&["720p", "1080p"]));
        assert_eq!(selected.map(|(l, _)| l.text.clone()).as_deref(), Some("Source .MP4 (720p)"));
    }

    #[test]
    fn test_no_match_yields_none() {
        let links = vec![link("HD .MP4 file")];
        assert!(select_rendition(&links, &prefs(&["Original"])).is_none());
        assert!(select_rendition(&[], &prefs(&["HD"])).is_none());
    }

    #[test]
    fn test_matching_ignores_case() {
        let links = vec![link("hd .mp4 file")];
        assert!(select_rendition(&links, &prefs(&["HD"])).is_some());
    }

    #[test]
    fn test_link_extension_and_description() {
        let choice = RenditionChoice {
            preference: "HD".to_string(),
            link: link("HD .MP4 file"),
            expected_size: None,
            file_name: "T 1.mp4".to_string(),
        };
        assert_eq!(choice.description(), "HD/MP4");

        let bare = DownloadLink {
            text: "Download".to_string(),
            url: "https://cdn.test/video.webm?sig=1".to_string(),
        };
        assert_eq!(bare.extension(), "webm");
    }
}
