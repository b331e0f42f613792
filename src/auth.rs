//! Site login through the page provider.
//!
//! The site has no API login: the email and password are typed into the
//! login form of the browser session, and success is confirmed by the account
//! menu showing up. The session cookies obtained this way are later forwarded
//! to file transfers by [`transfer_headers`].

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::config::Credentials;
use crate::locator::{Classifier, ResourceIdentifier};
use crate::page::{By, FindOptions, PageError, PageProvider, cookie_header};
use crate::site::{ACCOUNT_MENU, LOGIN_EMAIL, LOGIN_PASSWORD, LOGIN_SUBMIT, login_url};
use crate::transfer::RequestHeaders;

/// Errors raised while logging in.
#[derive(Debug, Error)]
pub enum LoginError {
    /// A login form field is missing.
    #[error("login form element {selector} not found")]
    MissingFormElement {
        /// Selector that matched nothing.
        selector: &'static str,
    },

    /// The form was submitted but no account menu appeared.
    #[error("login as {email} was not confirmed by the site")]
    NotConfirmed {
        /// Account email used.
        email: String,
    },

    /// The account menu points somewhere that is not an account page.
    #[error("account menu links to {href}, which is not an account page")]
    UnexpectedAccountLink {
        /// Link found in the menu.
        href: String,
    },

    /// The page session failed.
    #[error("page session failed during login: {source}")]
    Page {
        #[source]
        source: PageError,
    },
}

impl LoginError {
    fn page(source: PageError) -> Self {
        Self::Page { source }
    }
}

/// The account the session is logged into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedAccount {
    /// Account name as used in URLs.
    pub name: String,
    /// The account page.
    pub home: ResourceIdentifier,
}

/// Logs in with `credentials` and leaves the session on the account page.
///
/// # Errors
///
/// Returns [`LoginError`] when the form cannot be filled or the login is not
/// confirmed.
#[instrument(skip(page, classifier, credentials), fields(email = %credentials.email))]
pub async fn login(
    page: &dyn PageProvider,
    classifier: &Classifier,
    credentials: &Credentials,
    timeout: std::time::Duration,
) -> Result<AuthenticatedAccount, LoginError> {
    let url = login_url(classifier.host());
    info!(url, "logging in");
    page.navigate(&url).await.map_err(LoginError::page)?;

    let email = find_field(page, LOGIN_EMAIL, FindOptions::waiting(timeout)).await?;
    email
        .send_keys(&credentials.email)
        .await
        .map_err(LoginError::page)?;
    let password = find_field(page, LOGIN_PASSWORD, FindOptions::immediate()).await?;
    password
        .send_keys(&credentials.password)
        .await
        .map_err(LoginError::page)?;
    find_field(page, LOGIN_SUBMIT, FindOptions::immediate())
        .await?
        .click()
        .await
        .map_err(LoginError::page)?;

    let menu = page
        .find_one(&By::css(ACCOUNT_MENU), FindOptions::waiting(timeout))
        .await
        .map_err(LoginError::page)?
        .ok_or_else(|| LoginError::NotConfirmed {
            email: credentials.email.clone(),
        })?;
    let href = menu
        .attribute("href")
        .await
        .map_err(LoginError::page)?
        .unwrap_or_default();
    let home = classifier
        .classify(&href)
        .ok()
        .filter(|id| id.account().is_some())
        .ok_or_else(|| LoginError::UnexpectedAccountLink { href: href.clone() })?;
    let name = home.account().unwrap_or_default().to_string();
    menu.click().await.map_err(LoginError::page)?;

    info!(account = %name, "logged in");
    Ok(AuthenticatedAccount { name, home })
}

async fn find_field(
    page: &dyn PageProvider,
    selector: &'static str,
    options: FindOptions,
) -> Result<crate::page::ElementHandle, LoginError> {
    page.find_one(&By::css(selector), options)
        .await
        .map_err(LoginError::page)?
        .ok_or(LoginError::MissingFormElement { selector })
}

/// Headers that let a plain HTTP client act as the browser session.
///
/// Failures to read cookies or the user agent are logged and leave the
/// corresponding header out.
pub async fn transfer_headers(page: &dyn PageProvider) -> RequestHeaders {
    let mut headers = RequestHeaders::new();
    match page.session_cookies().await {
        Ok(cookies) => {
            if let Some(value) = cookie_header(&cookies) {
                debug!(cookies = cookies.len(), "forwarding session cookies");
                headers.insert("Cookie", value);
            }
        }
        Err(error) => warn!(%error, "could not read session cookies"),
    }
    match page.user_agent().await {
        Ok(agent) if !agent.is_empty() => headers.insert("User-Agent", agent),
        Ok(_) => {}
        Err(error) => warn!(%error, "could not read browser user agent"),
    }
    headers
}
