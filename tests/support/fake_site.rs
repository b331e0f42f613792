//! Scripted page provider.
//!
//! A site is a map from URL to [`Page`]; a page maps element locators to
//! [`Node`]s. Navigation only switches the current URL, clicks on nodes with a
//! destination navigate, and clicks on option nodes move the selection.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use vimeo_mirror::page::{
    By, Cookie, Element, ElementHandle, FindOptions, PageError, PageProvider,
};
use vimeo_mirror::site;

pub const SITE: &str = "https://vimeo.com";
pub const USER_AGENT: &str = "FakeBrowser/1.0";

/// One element of a scripted page.
#[derive(Debug, Clone, Default)]
pub struct Node {
    pub text: String,
    pub attributes: HashMap<String, String>,
    /// URL loaded when the node is clicked.
    pub destination: Option<String>,
    /// Clicking selects this node and deselects its siblings.
    pub selectable: bool,
    pub selected: bool,
    pub disabled: bool,
}

impl Node {
    pub fn text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Self::default()
        }
    }

    pub fn link(href: &str) -> Self {
        Self::default().attr("href", href)
    }

    pub fn option(text: &str, value: &str) -> Self {
        Self {
            text: text.to_string(),
            selectable: true,
            ..Self::default()
        }
        .attr("value", value)
    }

    #[must_use]
    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    #[must_use]
    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    #[must_use]
    pub fn navigates_to(mut self, url: &str) -> Self {
        self.destination = Some(url.to_string());
        self
    }

    #[must_use]
    pub fn selected(mut self) -> Self {
        self.selected = true;
        self
    }

    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }
}

/// A scripted page.
#[derive(Debug, Clone, Default)]
pub struct Page {
    nodes: HashMap<String, Vec<Node>>,
}

fn key(by: &By) -> String {
    match by {
        By::Css(selector) => selector.clone(),
        By::LinkText(text) => format!("link text:{text}"),
        By::PartialLinkText(text) => format!("partial link text:{text}"),
    }
}

impl Page {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, by: &By, node: Node) -> Self {
        self.nodes.entry(key(by)).or_default().push(node);
        self
    }

    #[must_use]
    pub fn with_css(self, selector: &str, node: Node) -> Self {
        self.with(&By::css(selector), node)
    }

    /// A listing page whose content links are `hrefs`.
    pub fn listing(hrefs: &[&str]) -> Self {
        hrefs.iter().fold(Self::new(), |page, href| {
            page.with_css(site::CONTENT_LINKS, Node::link(href))
        })
    }

    /// A folder page titled `title` listing `hrefs`.
    pub fn folder(title: &str, hrefs: &[&str]) -> Self {
        Self::listing(hrefs).with_css("#page_header h1", Node::text(title))
    }

    /// A video page offering `links` as `(label, url)` pairs.
    pub fn video(title: &str, links: &[(&str, &str)]) -> Self {
        let mut page = Self::new().with_css(site::VIDEO_TITLE, Node::text(title));
        if !links.is_empty() {
            page = page
                .with(
                    &By::link_text(site::DOWNLOAD_BUTTON_TEXT),
                    Node::text(site::DOWNLOAD_BUTTON_TEXT),
                )
                .with_css(site::DOWNLOAD_PANEL, Node::default());
            for (label, url) in links {
                page = page.with_css(site::DOWNLOAD_LINKS, Node::link(url).with_text(label));
            }
        }
        page
    }

    #[must_use]
    pub fn next_page(self, url: &str) -> Self {
        self.with_css(site::NEXT_PAGE, Node::text("Next").navigates_to(url))
    }

    #[must_use]
    pub fn author(self, account: &str) -> Self {
        self.with_css(site::VIDEO_AUTHOR, Node::link(&format!("{SITE}/{account}")))
    }
}

#[derive(Debug, Default)]
struct State {
    pages: HashMap<String, Page>,
    current: String,
    navigations: Vec<String>,
    failures: HashMap<String, u32>,
    typed: Vec<(String, String)>,
    clicks: Vec<String>,
    cookies: Vec<Cookie>,
}

impl State {
    fn go(&mut self, url: &str) -> Result<(), PageError> {
        self.navigations.push(url.to_string());
        if let Some(remaining) = self.failures.get_mut(url)
            && *remaining > 0
        {
            *remaining -= 1;
            return Err(PageError::navigation(url, "scripted failure"));
        }
        self.current = url.to_string();
        Ok(())
    }

    fn node_mut(&mut self, url: &str, key: &str, index: usize) -> Result<&mut Node, PageError> {
        self.pages
            .get_mut(url)
            .and_then(|page| page.nodes.get_mut(key))
            .and_then(|nodes| nodes.get_mut(index))
            .ok_or_else(|| PageError::protocol("element", "stale element reference"))
    }
}

/// Scripted browser session.
#[derive(Clone, Default)]
pub struct FakeSite {
    state: Arc<Mutex<State>>,
}

impl FakeSite {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("fake site state")
    }

    #[must_use]
    pub fn page(self, url: &str, page: Page) -> Self {
        self.lock().pages.insert(url.to_string(), page);
        self
    }

    /// Makes the next `times` navigations to `url` fail.
    #[must_use]
    pub fn fail_navigation(self, url: &str, times: u32) -> Self {
        self.lock().failures.insert(url.to_string(), times);
        self
    }

    #[must_use]
    pub fn cookie(self, name: &str, value: &str) -> Self {
        self.lock().cookies.push(Cookie {
            name: name.to_string(),
            value: value.to_string(),
        });
        self
    }

    /// Adds a login form that logs into `account`.
    #[must_use]
    pub fn login_form(self, account: &str) -> Self {
        let home = format!("{SITE}/home");
        let account_url = format!("{SITE}/{account}");
        self.page(
            &site::login_url("vimeo.com"),
            Page::new()
                .with_css(site::LOGIN_EMAIL, Node::default())
                .with_css(site::LOGIN_PASSWORD, Node::default())
                .with_css(site::LOGIN_SUBMIT, Node::text("Log in").navigates_to(&home)),
        )
        .page(
            &home,
            Page::new().with_css(
                site::ACCOUNT_MENU,
                Node::link(&account_url).navigates_to(&account_url),
            ),
        )
    }

    pub fn navigations(&self) -> Vec<String> {
        self.lock().navigations.clone()
    }

    pub fn navigation_count(&self, url: &str) -> usize {
        self.lock().navigations.iter().filter(|u| *u == url).count()
    }

    pub fn typed(&self) -> Vec<(String, String)> {
        self.lock().typed.clone()
    }

    pub fn clicks(&self) -> Vec<String> {
        self.lock().clicks.clone()
    }

    /// Whether the option labelled `text` under `selector` on `url` is selected.
    pub fn is_selected(&self, url: &str, selector: &str, text: &str) -> bool {
        self.lock()
            .pages
            .get(url)
            .and_then(|page| page.nodes.get(selector))
            .is_some_and(|nodes| nodes.iter().any(|n| n.text == text && n.selected))
    }

    fn element(&self, url: &str, key: String, index: usize) -> ElementHandle {
        Box::new(FakeElement {
            state: Arc::clone(&self.state),
            url: url.to_string(),
            key,
            index,
        })
    }
}

#[async_trait]
impl PageProvider for FakeSite {
    async fn navigate(&self, url: &str) -> Result<(), PageError> {
        self.lock().go(url)
    }

    async fn find_one(
        &self,
        by: &By,
        _options: FindOptions,
    ) -> Result<Option<ElementHandle>, PageError> {
        let key = key(by);
        let current = self.lock().current.clone();
        let present = self
            .lock()
            .pages
            .get(&current)
            .and_then(|page| page.nodes.get(&key))
            .is_some_and(|nodes| !nodes.is_empty());
        Ok(present.then(|| self.element(&current, key, 0)))
    }

    async fn find_all(&self, by: &By) -> Result<Vec<ElementHandle>, PageError> {
        let key = key(by);
        let current = self.lock().current.clone();
        let count = self
            .lock()
            .pages
            .get(&current)
            .and_then(|page| page.nodes.get(&key))
            .map_or(0, Vec::len);
        Ok((0..count)
            .map(|index| self.element(&current, key.clone(), index))
            .collect())
    }

    async fn current_url(&self) -> Result<String, PageError> {
        Ok(self.lock().current.clone())
    }

    async fn session_cookies(&self) -> Result<Vec<Cookie>, PageError> {
        Ok(self.lock().cookies.clone())
    }

    async fn user_agent(&self) -> Result<String, PageError> {
        Ok(USER_AGENT.to_string())
    }
}

struct FakeElement {
    state: Arc<Mutex<State>>,
    url: String,
    key: String,
    index: usize,
}

impl FakeElement {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("fake site state")
    }

    fn node(&self) -> Result<Node, PageError> {
        self.lock()
            .node_mut(&self.url, &self.key, self.index)
            .map(|node| node.clone())
    }
}

#[async_trait]
impl Element for FakeElement {
    async fn text(&self) -> Result<String, PageError> {
        Ok(self.node()?.text)
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>, PageError> {
        Ok(self.node()?.attributes.get(name).cloned())
    }

    async fn click(&self) -> Result<(), PageError> {
        let mut state = self.lock();
        let node = state.node_mut(&self.url, &self.key, self.index)?.clone();
        state.clicks.push(format!("{}:{}", self.key, node.text));
        if node.selectable {
            if let Some(siblings) = state
                .pages
                .get_mut(&self.url)
                .and_then(|page| page.nodes.get_mut(&self.key))
            {
                for (index, sibling) in siblings.iter_mut().enumerate() {
                    sibling.selected = index == self.index;
                }
            }
        }
        match node.destination {
            Some(url) => state.go(&url),
            None => Ok(()),
        }
    }

    async fn is_selected(&self) -> Result<bool, PageError> {
        Ok(self.node()?.selected)
    }

    async fn is_enabled(&self) -> Result<bool, PageError> {
        Ok(!self.node()?.disabled)
    }

    async fn send_keys(&self, text: &str) -> Result<(), PageError> {
        self.node()?;
        self.lock().typed.push((self.key.clone(), text.to_string()));
        Ok(())
    }
}
