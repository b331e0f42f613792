//! Site vocabulary: selectors and defaults tied to the remote site's markup.

use crate::page::By;

/// Login page of the site served at `host`.
#[must_use]
pub fn login_url(host: &str) -> String {
    format!("https://{host}/log_in")
}

/// Default rendition preference labels, best first.
pub const DEFAULT_RENDITION_PREFERENCES: &[&str] = &["Original", "HD", "SD", "Mobile", "file"];

/// Links in listing and generic pages.
pub const CONTENT_LINKS: &str = "#browse_content .browse a";

/// "Next page" affordance of paginated listings.
pub const NEXT_PAGE: &str = ".pagination a[rel=next]";

/// Video title on a video page.
pub const VIDEO_TITLE: &str = "h1[itemprop=name]";

/// Link text of the button revealing download links.
pub const DOWNLOAD_BUTTON_TEXT: &str = "Download";

/// Container of the download links once revealed.
pub const DOWNLOAD_PANEL: &str = "#download";

/// Download links inside the panel.
pub const DOWNLOAD_LINKS: &str = "#download a";

/// Author link on a video page.
pub const VIDEO_AUTHOR: &str = ".byline a[rel=author]";

/// Login form fields.
pub const LOGIN_EMAIL: &str = "#email";
pub const LOGIN_PASSWORD: &str = "#password";
pub const LOGIN_SUBMIT: &str = "#login_form input[type=submit]";

/// Account menu entry present only when logged in.
pub const ACCOUNT_MENU: &str = "#menu .me a";

/// Where a folder title may be read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleSource {
    /// Visible text of the element.
    Text(&'static str),
    /// An attribute of the element.
    Attribute(&'static str, &'static str),
}

impl TitleSource {
    /// Selector of the element holding the title.
    #[must_use]
    pub fn by(self) -> By {
        match self {
            Self::Text(selector) | Self::Attribute(selector, _) => By::css(selector),
        }
    }
}

/// Folder title locations, tried in order; the first non-empty one wins.
pub const FOLDER_TITLE_SOURCES: &[TitleSource] = &[
    TitleSource::Text("#page_header h1 a"),
    TitleSource::Text("#page_header h1"),
    TitleSource::Attribute("#group_header h1 a", "title"),
    TitleSource::Text("#group_header h1 a"),
];

/// Settings page of a video.
#[must_use]
pub fn video_settings_url(video_url: &str) -> String {
    format!("{video_url}/settings")
}

/// A single-choice setting on the video settings page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingControl {
    /// Name used in logs.
    pub name: &'static str,
    /// Options of the `<select>` holding the setting.
    pub options: &'static str,
    /// Button persisting the change.
    pub save: &'static str,
}

/// Spoken language of the video.
pub const LANGUAGE_SETTING: SettingControl = SettingControl {
    name: "language",
    options: "select[name=language] option",
    save: "#settings_form input[type=submit]",
};

/// Embed preset applied to the player.
pub const EMBED_PRESET_SETTING: SettingControl = SettingControl {
    name: "embed preset",
    options: "select[name=embed_preset] option",
    save: "#embed_form input[type=submit]",
};

/// Default playback quality tier.
pub const QUALITY_TIER_SETTING: SettingControl = SettingControl {
    name: "quality tier",
    options: "select[name=quality] option",
    save: "#settings_form input[type=submit]",
};
