//! W3C WebDriver backend for the page provider.
//!
//! Talks the WebDriver JSON protocol to a running driver server
//! (geckodriver, chromedriver, msedgedriver, safaridriver or a Selenium grid).
//! Every command is a plain HTTP request; the session id and the element ids
//! handed out by the remote end are the only state kept here.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::{Value, json};
use tokio::time::Instant;
use tracing::{debug, instrument};

use super::{By, Cookie, Element, ElementHandle, FindOptions, PageError, PageProvider};

/// Key under which the remote end returns element references.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Delay between element lookups while waiting.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// HTTP timeout for a single protocol command (page loads have their own).
const COMMAND_TIMEOUT: Duration = Duration::from_secs(120);

/// Protocol error code for a missing element.
const NO_SUCH_ELEMENT: &str = "no such element";

/// Supported browser backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Browser {
    /// Mozilla Firefox through geckodriver.
    #[default]
    Firefox,
    /// Google Chrome through chromedriver.
    Chrome,
    /// Microsoft Edge through msedgedriver.
    Edge,
    /// Apple Safari through safaridriver.
    Safari,
}

impl Browser {
    /// `browserName` capability value.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Firefox => "firefox",
            Self::Chrome => "chrome",
            Self::Edge => "MicrosoftEdge",
            Self::Safari => "safari",
        }
    }

    /// Capabilities requested when opening a session.
    #[must_use]
    pub fn capabilities(self, headless: bool) -> Value {
        let mut caps = json!({ "browserName": self.name() });
        if headless {
            match self {
                Self::Firefox => caps["moz:firefoxOptions"] = json!({ "args": ["-headless"] }),
                Self::Chrome => caps["goog:chromeOptions"] = json!({ "args": ["--headless=new"] }),
                Self::Edge => caps["ms:edgeOptions"] = json!({ "args": ["--headless=new"] }),
                // safaridriver has no headless mode
                Self::Safari => {}
            }
        }
        caps
    }
}

impl fmt::Display for Browser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Firefox => "firefox",
            Self::Chrome => "chrome",
            Self::Edge => "edge",
            Self::Safari => "safari",
        })
    }
}

impl FromStr for Browser {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "firefox" => Ok(Self::Firefox),
            "chrome" | "chromium" => Ok(Self::Chrome),
            "edge" | "msedge" => Ok(Self::Edge),
            "safari" => Ok(Self::Safari),
            other => Err(format!(
                "unknown browser {other}, valid values are: chrome/edge/firefox/safari"
            )),
        }
    }
}

#[derive(Debug)]
struct Remote {
    http: Client,
    session_url: String,
}

impl Remote {
    async fn send(
        &self,
        command: &'static str,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, PageError> {
        let url = format!("{}{path}", self.session_url);
        let mut request = self.http.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request
            .send()
            .await
            .map_err(|source| PageError::Transport { command, source })?;
        let status = response.status();
        let payload: Value = response
            .json()
            .await
            .map_err(|source| PageError::Transport { command, source })?;
        let value = payload.get("value").cloned().unwrap_or(Value::Null);
        if !status.is_success() {
            return Err(command_error(command, &value));
        }
        Ok(value)
    }
}

fn command_error(command: &'static str, value: &Value) -> PageError {
    let field = |name: &str| {
        value
            .get(name)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    let error = field("error");
    PageError::Command {
        command,
        error: if error.is_empty() {
            "unknown error".to_string()
        } else {
            error
        },
        message: field("message"),
    }
}

fn is_no_such_element(error: &PageError) -> bool {
    matches!(error, PageError::Command { error, .. } if error == NO_SUCH_ELEMENT)
}

fn locator_body(by: &By) -> Value {
    let (using, value) = match by {
        By::Css(selector) => ("css selector", selector),
        By::LinkText(text) => ("link text", text),
        By::PartialLinkText(text) => ("partial link text", text),
    };
    json!({ "using": using, "value": value })
}

fn element_id(command: &'static str, value: &Value) -> Result<String, PageError> {
    value
        .get(ELEMENT_KEY)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| PageError::protocol(command, format!("no element reference in {value}")))
}

/// A live WebDriver session.
#[derive(Debug, Clone)]
pub struct WebDriverSession {
    remote: Arc<Remote>,
    browser: Browser,
}

impl WebDriverSession {
    /// Opens a new session on the driver server at `server`.
    ///
    /// A non-zero `page_timeout` is installed as the session page-load timeout.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::SessionStart`] when the server is unreachable or
    /// refuses the requested capabilities.
    #[instrument(skip(page_timeout), fields(server = %server, browser = %browser))]
    pub async fn start(
        server: &str,
        browser: Browser,
        headless: bool,
        page_timeout: Duration,
    ) -> Result<Self, PageError> {
        let server = server.trim_end_matches('/');
        let start_error = |reason: String| PageError::SessionStart {
            browser: browser.to_string(),
            server: server.to_string(),
            reason,
        };
        let http = Client::builder()
            .timeout(COMMAND_TIMEOUT)
            .build()
            .map_err(|e| start_error(e.to_string()))?;

        let bootstrap = Remote {
            http: http.clone(),
            session_url: format!("{server}/session"),
        };
        let body = json!({ "capabilities": { "alwaysMatch": browser.capabilities(headless) } });
        let value = bootstrap
            .send("new session", Method::POST, "", Some(body))
            .await
            .map_err(|e| start_error(e.to_string()))?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| start_error(format!("no session id in {value}")))?;
        debug!(session_id, "webdriver session started");

        let session = Self {
            remote: Arc::new(Remote {
                http,
                session_url: format!("{server}/session/{session_id}"),
            }),
            browser,
        };
        if !page_timeout.is_zero() {
            let millis = u64::try_from(page_timeout.as_millis()).unwrap_or(u64::MAX);
            session
                .remote
                .send(
                    "set timeouts",
                    Method::POST,
                    "/timeouts",
                    Some(json!({ "pageLoad": millis })),
                )
                .await?;
        }
        Ok(session)
    }

    /// Browser this session drives.
    #[must_use]
    pub fn browser(&self) -> Browser {
        self.browser
    }

    fn element(&self, id: String) -> ElementHandle {
        Box::new(WebDriverElement {
            remote: Arc::clone(&self.remote),
            id,
        })
    }
}

#[async_trait]
impl PageProvider for WebDriverSession {
    async fn navigate(&self, url: &str) -> Result<(), PageError> {
        self.remote
            .send("navigate", Method::POST, "/url", Some(json!({ "url": url })))
            .await
            .map(|_| ())
            .map_err(|e| match e {
                PageError::Command { error, message, .. } => {
                    PageError::navigation(url, format!("{error}: {message}"))
                }
                other => other,
            })
    }

    async fn find_one(
        &self,
        by: &By,
        options: FindOptions,
    ) -> Result<Option<ElementHandle>, PageError> {
        let deadline = Instant::now() + options.timeout;
        loop {
            match self
                .remote
                .send("find element", Method::POST, "/element", Some(locator_body(by)))
                .await
            {
                Ok(value) => {
                    let id = element_id("find element", &value)?;
                    return Ok(Some(self.element(id)));
                }
                Err(e) if is_no_such_element(&e) => {
                    if !options.wait || Instant::now() >= deadline {
                        return Ok(None);
                    }
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn find_all(&self, by: &By) -> Result<Vec<ElementHandle>, PageError> {
        let value = self
            .remote
            .send("find elements", Method::POST, "/elements", Some(locator_body(by)))
            .await?;
        let Some(items) = value.as_array() else {
            return Err(PageError::protocol("find elements", "expected an array"));
        };
        items
            .iter()
            .map(|item| element_id("find elements", item).map(|id| self.element(id)))
            .collect()
    }

    async fn current_url(&self) -> Result<String, PageError> {
        let value = self.remote.send("get url", Method::GET, "/url", None).await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| PageError::protocol("get url", "expected a string"))
    }

    async fn session_cookies(&self) -> Result<Vec<Cookie>, PageError> {
        let value = self
            .remote
            .send("get cookies", Method::GET, "/cookie", None)
            .await?;
        let Some(items) = value.as_array() else {
            return Err(PageError::protocol("get cookies", "expected an array"));
        };
        Ok(items
            .iter()
            .filter_map(|item| {
                Some(Cookie {
                    name: item.get("name")?.as_str()?.to_string(),
                    value: item.get("value")?.as_str()?.to_string(),
                })
            })
            .collect())
    }

    async fn user_agent(&self) -> Result<String, PageError> {
        let body = json!({ "script": "return navigator.userAgent;", "args": [] });
        let value = self
            .remote
            .send("execute script", Method::POST, "/execute/sync", Some(body))
            .await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| PageError::protocol("execute script", "expected a string"))
    }

    async fn close(&self) -> Result<(), PageError> {
        self.remote
            .send("delete session", Method::DELETE, "", None)
            .await
            .map(|_| ())
    }
}

#[derive(Debug)]
struct WebDriverElement {
    remote: Arc<Remote>,
    id: String,
}

impl WebDriverElement {
    fn path(&self, leaf: &str) -> String {
        format!("/element/{}/{leaf}", self.id)
    }

    async fn get_bool(&self, command: &'static str, leaf: &str) -> Result<bool, PageError> {
        let value = self
            .remote
            .send(command, Method::GET, &self.path(leaf), None)
            .await?;
        value
            .as_bool()
            .ok_or_else(|| PageError::protocol(command, "expected a boolean"))
    }
}

#[async_trait]
impl Element for WebDriverElement {
    async fn text(&self) -> Result<String, PageError> {
        let value = self
            .remote
            .send("get element text", Method::GET, &self.path("text"), None)
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>, PageError> {
        // URL attributes are read as properties so they come back absolute
        let leaf = if matches!(name, "href" | "src") {
            format!("property/{name}")
        } else {
            format!("attribute/{name}")
        };
        let value = self
            .remote
            .send("get element attribute", Method::GET, &self.path(&leaf), None)
            .await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn click(&self) -> Result<(), PageError> {
        self.remote
            .send("element click", Method::POST, &self.path("click"), Some(json!({})))
            .await
            .map(|_| ())
    }

    async fn is_selected(&self) -> Result<bool, PageError> {
        self.get_bool("is element selected", "selected").await
    }

    async fn is_enabled(&self) -> Result<bool, PageError> {
        self.get_bool("is element enabled", "enabled").await
    }

    async fn send_keys(&self, text: &str) -> Result<(), PageError> {
        self.remote
            .send(
                "element send keys",
                Method::POST,
                &self.path("value"),
                Some(json!({ "text": text })),
            )
            .await
            .map(|_| ())
    }
}
