//! Page provider capability.
//!
//! The crawler never renders pages itself. It drives one interactive browser
//! session through the [`PageProvider`] trait: navigate, look up elements,
//! read text and attributes, click. Element absence is a normal `Ok(None)`,
//! never an error.
//!
//! The only backend shipped is [`webdriver::WebDriverSession`], selected by the
//! closed [`Browser`] enum. Tests plug in scripted providers.

mod error;
pub mod webdriver;

pub use error::PageError;
pub use webdriver::{Browser, WebDriverSession};

use std::time::Duration;

use async_trait::async_trait;

/// How an element is located on the current page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum By {
    /// CSS selector.
    Css(String),
    /// Exact visible text of a link.
    LinkText(String),
    /// Substring of the visible text of a link.
    PartialLinkText(String),
}

impl By {
    /// Shorthand for [`By::Css`].
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Shorthand for [`By::LinkText`].
    pub fn link_text(text: impl Into<String>) -> Self {
        Self::LinkText(text.into())
    }
}

/// Lookup options for [`PageProvider::find_one`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FindOptions {
    /// Poll until the element appears or the timeout elapses.
    pub wait: bool,
    /// Upper bound on waiting.
    pub timeout: Duration,
}

impl FindOptions {
    /// Probe the current DOM once.
    #[must_use]
    pub fn immediate() -> Self {
        Self {
            wait: false,
            timeout: Duration::ZERO,
        }
    }

    /// Wait up to `timeout`; a zero timeout degrades to [`FindOptions::immediate`].
    #[must_use]
    pub fn waiting(timeout: Duration) -> Self {
        Self {
            wait: !timeout.is_zero(),
            timeout,
        }
    }
}

/// A session cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value.
    pub value: String,
}

/// An element on the current page.
#[async_trait]
pub trait Element: Send + Sync {
    /// Visible text.
    async fn text(&self) -> Result<String, PageError>;

    /// Attribute or property value, `None` when absent.
    async fn attribute(&self, name: &str) -> Result<Option<String>, PageError>;

    /// Clicks the element.
    async fn click(&self) -> Result<(), PageError>;

    /// Whether an option, checkbox or radio button is selected.
    async fn is_selected(&self) -> Result<bool, PageError>;

    /// Whether the element accepts interaction.
    async fn is_enabled(&self) -> Result<bool, PageError>;

    /// Types text into the element.
    async fn send_keys(&self, text: &str) -> Result<(), PageError>;
}

/// Boxed element handle returned by lookups.
pub type ElementHandle = Box<dyn Element>;

/// One stateful interactive browsing session.
///
/// Only one page is current at any time, so callers drive a provider strictly
/// sequentially.
#[async_trait]
pub trait PageProvider: Send + Sync {
    /// Loads `url` and waits for the page load to finish.
    async fn navigate(&self, url: &str) -> Result<(), PageError>;

    /// Finds the first element matching `by`.
    async fn find_one(&self, by: &By, options: FindOptions)
    -> Result<Option<ElementHandle>, PageError>;

    /// Finds all elements matching `by` (possibly none).
    async fn find_all(&self, by: &By) -> Result<Vec<ElementHandle>, PageError>;

    /// URL of the current page.
    async fn current_url(&self) -> Result<String, PageError>;

    /// Cookies of the session.
    async fn session_cookies(&self) -> Result<Vec<Cookie>, PageError>;

    /// User agent of the browser.
    async fn user_agent(&self) -> Result<String, PageError>;

    /// Ends the session. The default does nothing.
    async fn close(&self) -> Result<(), PageError> {
        Ok(())
    }
}

/// Builds a `Cookie` request header value from session cookies.
#[must_use]
pub fn cookie_header(cookies: &[Cookie]) -> Option<String> {
    if cookies.is_empty() {
        return None;
    }
    Some(
        cookies
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; "),
    )
}
