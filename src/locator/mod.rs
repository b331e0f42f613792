//! Resource locator classification.
//!
//! Every page, account, album or video seen while crawling is identified by an
//! opaque locator string. [`Classifier::classify`] turns such a string into a
//! [`ResourceIdentifier`]: a canonical URL plus a [`ResourceKind`] tag and the
//! payload that kind carries (video id, account name, folder name, ...).
//!
//! Classification is a pure function of the canonical URL, so two identifiers
//! with the same canonical URL compare and hash equal.
//!
//! # Example
//!
//! ```
//! use vimeo_mirror::locator::{ResourceKind, classify};
//!
//! let id = classify("https://vimeo.com/album/42/videos").unwrap();
//! assert_eq!(id.kind(), ResourceKind::Folder);
//! assert_eq!(id.canonical(), "https://vimeo.com/album/42");
//! ```

mod error;

pub use error::{ClassificationError, MAX_LOCATOR_LENGTH};

use std::fmt;
use std::hash::{Hash, Hasher};

use tracing::trace;
use url::Url;

/// Host of the site the crawler is bound to.
pub const DEFAULT_SITE_HOST: &str = "vimeo.com";

/// First path segments that denote site pages rather than accounts.
const RESERVED_WORDS: &[&str] = &[
    "about",
    "blog",
    "categories",
    "channels",
    "cookie_policy",
    "couchmode",
    "creativecommons",
    "creatorservices",
    "dmca",
    "enhancer",
    "everywhere",
    "explore",
    "groups",
    "help",
    "jobs",
    "join",
    "log_in",
    "love",
    "musicstore",
    "ondemand",
    "plus",
    "privacy",
    "pro",
    "robots.txt",
    "search",
    "site_map",
    "staffpicks",
    "terms",
    "upload",
    "videoschool",
];

/// Second path segments of `<account>/<category>` listings.
const CATEGORY_WORDS: &[&str] = &["albums", "groups", "channels"];

/// Second path segment of `<account>/videos`.
const LISTING_WORD: &str = "videos";

/// Classification tag of a [`ResourceIdentifier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// A single video page (`/123456`).
    Video,
    /// An account main page (`/someone`).
    Account,
    /// A list of folders under an account (`/someone/albums`).
    Category,
    /// The plain video list of an account (`/someone/videos`).
    VideoListing,
    /// A concrete album, group or channel (`/album/42`, `/channels/staff`).
    Folder,
    /// A non-content site page (`/help`, the front page).
    System,
    /// Anything else on the site; still scraped for links.
    Unrecognized,
}

impl ResourceKind {
    /// Returns a lower-case label for logging.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Account => "account",
            Self::Category => "category",
            Self::VideoListing => "videos",
            Self::Folder => "folder",
            Self::System => "system",
            Self::Unrecognized => "unrecognized",
        }
    }
}

/// Kind of a remote folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FolderKind {
    /// `/album/<name>`
    Album,
    /// `/groups/<name>`
    Group,
    /// `/channels/<name>`
    Channel,
}

impl FolderKind {
    fn from_path_word(word: &str) -> Option<Self> {
        match word {
            "album" => Some(Self::Album),
            "groups" => Some(Self::Group),
            "channels" => Some(Self::Channel),
            _ => None,
        }
    }

    /// Singular name used in log lines.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Album => "album",
            Self::Group => "group",
            Self::Channel => "channel",
        }
    }

    /// Whether the folder's videos live under an explicit `/videos` sub-view.
    #[must_use]
    pub fn needs_videos_view(self) -> bool {
        !matches!(self, Self::Album)
    }
}

/// A concrete folder reference carried by [`ResourceKind::Folder`] identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderRef {
    /// Album, group or channel.
    pub kind: FolderKind,
    /// Path name of the folder (`42` in `/album/42`).
    pub name: String,
}

/// A classified, canonical resource locator.
///
/// Immutable once constructed. Equality and hashing only look at the canonical
/// URL, which fully determines every other attribute.
#[derive(Debug, Clone)]
pub struct ResourceIdentifier {
    canonical: String,
    kind: ResourceKind,
    video_id: Option<u64>,
    account: Option<String>,
    category: Option<String>,
    folder: Option<FolderRef>,
}

impl ResourceIdentifier {
    /// Canonical URL (no trailing slash, no `/videos` view suffix).
    #[must_use]
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// Classification tag.
    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Numeric id for [`ResourceKind::Video`].
    #[must_use]
    pub fn video_id(&self) -> Option<u64> {
        self.video_id
    }

    /// Account name for accounts, categories and video listings.
    #[must_use]
    pub fn account(&self) -> Option<&str> {
        self.account.as_deref()
    }

    /// Category word (`albums`, `channels`, `groups`, `videos`).
    #[must_use]
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    /// Folder kind and name for [`ResourceKind::Folder`].
    #[must_use]
    pub fn folder(&self) -> Option<&FolderRef> {
        self.folder.as_ref()
    }

    /// URL to navigate to when this resource is visited.
    ///
    /// Groups and channels list their videos on an explicit `/videos` view.
    #[must_use]
    pub fn fetch_url(&self) -> String {
        match &self.folder {
            Some(folder) if folder.kind.needs_videos_view() => {
                format!("{}/{LISTING_WORD}", self.canonical)
            }
            _ => self.canonical.clone(),
        }
    }

    /// The `<account>/videos` listing of an account identifier.
    #[must_use]
    pub fn account_videos(&self) -> Option<Self> {
        self.account_child(LISTING_WORD, ResourceKind::VideoListing)
    }

    /// The `<account>/<category>` listing of an account identifier.
    #[must_use]
    pub fn account_category(&self, category: &str) -> Option<Self> {
        if !CATEGORY_WORDS.contains(&category) {
            return None;
        }
        self.account_child(category, ResourceKind::Category)
    }

    fn account_child(&self, word: &str, kind: ResourceKind) -> Option<Self> {
        if self.kind != ResourceKind::Account {
            return None;
        }
        Some(Self {
            canonical: format!("{}/{word}", self.canonical),
            kind,
            video_id: None,
            account: self.account.clone(),
            category: Some(word.to_string()),
            folder: None,
        })
    }
}

impl PartialEq for ResourceIdentifier {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for ResourceIdentifier {}

impl Hash for ResourceIdentifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}

impl fmt::Display for ResourceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

/// Classifies locators against one site host.
#[derive(Debug, Clone)]
pub struct Classifier {
    host: String,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(DEFAULT_SITE_HOST)
    }
}

impl Classifier {
    /// Creates a classifier bound to `host` (e.g. `vimeo.com`).
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into().to_ascii_lowercase(),
        }
    }

    /// Site host this classifier accepts.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Builds the canonical identifier of a video id.
    #[must_use]
    pub fn video(&self, id: u64) -> ResourceIdentifier {
        ResourceIdentifier {
            canonical: format!("https://{}/{id}", self.host),
            kind: ResourceKind::Video,
            video_id: Some(id),
            account: None,
            category: None,
            folder: None,
        }
    }

    /// Classifies a locator.
    ///
    /// Accepts full URLs, scheme-less URLs (`vimeo.com/123`), site-relative
    /// paths (`/album/42`) and bare path words (`123`, `someone`), which are
    /// taken relative to the site root.
    ///
    /// # Errors
    ///
    /// Returns [`ClassificationError`] when the locator is not a web URL or
    /// does not belong to the site host.
    pub fn classify(&self, locator: &str) -> Result<ResourceIdentifier, ClassificationError> {
        let trimmed = locator.trim();
        if trimmed.len() > MAX_LOCATOR_LENGTH {
            return Err(ClassificationError::too_long(trimmed));
        }

        let absolute = if has_scheme(trimmed) {
            trimmed.to_string()
        } else if !trimmed.contains('/') {
            format!("https://{}/{trimmed}", self.host)
        } else if trimmed.starts_with("//") {
            format!("https:{trimmed}")
        } else if trimmed.starts_with('/') {
            format!("https://{}{trimmed}", self.host)
        } else {
            format!("https://{trimmed}")
        };

        let parsed = Url::parse(&absolute)
            .map_err(|e| ClassificationError::malformed(locator, &e.to_string()))?;
        match parsed.scheme() {
            "http" | "https" => {}
            scheme => return Err(ClassificationError::unsupported_scheme(locator, scheme)),
        }
        let host = parsed
            .host_str()
            .map(str::to_ascii_lowercase)
            .ok_or_else(|| ClassificationError::malformed(locator, "URL has no host"))?;
        if host != self.host && !host.ends_with(&format!(".{}", self.host)) {
            return Err(ClassificationError::foreign_host(locator, &self.host));
        }

        // Empty segments come from trailing or doubled slashes.
        let tokens: Vec<&str> = parsed.path().split('/').filter(|t| !t.is_empty()).collect();
        let identifier = self.classify_tokens(tokens);
        trace!(locator, canonical = %identifier.canonical, kind = identifier.kind.as_str(), "classified locator");
        Ok(identifier)
    }

    fn classify_tokens(&self, mut tokens: Vec<&str>) -> ResourceIdentifier {
        // Deep links with an embedded video id collapse to the video itself.
        if matches!(tokens.len(), 3 | 4)
            && let Some(id) = tokens.last().and_then(|t| parse_numeric(t))
        {
            return self.video(id);
        }
        if tokens.len() == 3
            && tokens
                .last()
                .is_some_and(|t| t.eq_ignore_ascii_case(LISTING_WORD))
        {
            tokens.pop();
        }

        let lowered: Vec<String> = tokens.iter().map(|t| t.to_ascii_lowercase()).collect();
        let canonical = if tokens.is_empty() {
            format!("https://{}", self.host)
        } else {
            format!("https://{}/{}", self.host, tokens.join("/"))
        };
        let mut identifier = ResourceIdentifier {
            canonical,
            kind: ResourceKind::Unrecognized,
            video_id: None,
            account: None,
            category: None,
            folder: None,
        };

        if tokens.len() == 1
            && let Some(id) = parse_numeric(tokens[0])
        {
            return self.video(id);
        }

        let first = lowered.first().map(String::as_str);
        let is_system = match first {
            None => true,
            Some(word) => {
                RESERVED_WORDS.contains(&word)
                    && (tokens.len() == 1 || FolderKind::from_path_word(word).is_none())
            }
        };

        identifier.kind = if is_system {
            ResourceKind::System
        } else if tokens.len() == 1 {
            identifier.account = Some(tokens[0].to_string());
            ResourceKind::Account
        } else if tokens.len() == 2 && lowered[1] == LISTING_WORD {
            identifier.account = Some(tokens[0].to_string());
            identifier.category = Some(lowered[1].clone());
            ResourceKind::VideoListing
        } else if tokens.len() == 2 && CATEGORY_WORDS.contains(&lowered[1].as_str()) {
            identifier.account = Some(tokens[0].to_string());
            identifier.category = Some(lowered[1].clone());
            ResourceKind::Category
        } else if tokens.len() == 2
            && let Some(kind) = FolderKind::from_path_word(&lowered[0])
        {
            identifier.folder = Some(FolderRef {
                kind,
                name: tokens[1].to_string(),
            });
            ResourceKind::Folder
        } else {
            ResourceKind::Unrecognized
        };
        identifier
    }
}

/// Classifies a locator against the default site host.
///
/// # Errors
///
/// See [`Classifier::classify`].
pub fn classify(locator: &str) -> Result<ResourceIdentifier, ClassificationError> {
    Classifier::default().classify(locator)
}

/// `mailto:x` and `https://...` have a scheme; `vimeo.com:443/1` does not.
fn has_scheme(locator: &str) -> bool {
    locator.split_once(':').is_some_and(|(scheme, _)| {
        scheme.starts_with(|c: char| c.is_ascii_alphabetic())
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-')
    })
}

fn parse_numeric(token: &str) -> Option<u64> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}
