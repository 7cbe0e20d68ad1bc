use crate::dom::{self, Query};
use crate::{Credentials, Scraper, SyncError};
use lazy_static::lazy_static;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Client, Url};
use scraper::{Html, Selector};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const SESSION_COOKIE: &str = "MoodleSession";
const LOGIN_PATH: &str = "login/index.php";

const E: &str = "Invalid selector";
lazy_static! {
    static ref INPUT: Selector = Selector::parse("input").expect(E);
}

/// Reads the one-time `logintoken` out of the login form.
#[derive(Debug)]
pub struct LoginPage;

impl Scraper for LoginPage {
    type Output = String;

    fn scrape(&self, doc: &Html) -> Result<String, SyncError> {
        Ok(doc
            .find_all(&INPUT)
            .into_iter()
            .filter(|input| dom::attribute(*input, "name") == Some("logintoken"))
            .filter_map(|input| dom::attribute(input, "value"))
            .last()
            .unwrap_or_default()
            .to_string())
    }
}

/// Authenticated portal session. Every request of a run goes through the
/// same client so the cookie jar is shared.
pub struct Session {
    client: Client,
    jar: Arc<Jar>,
    base_url: Url,
}

impl Session {
    pub fn new(base_url: Url) -> Result<Session, SyncError> {
        let jar = Arc::new(Jar::default());
        let client = Client::builder().cookie_provider(Arc::clone(&jar)).build()?;
        Ok(Session {
            client,
            jar,
            base_url,
        })
    }

    pub async fn login(base_url: &Url, credentials: &Credentials) -> Result<Session, SyncError> {
        let session = Session::new(base_url.clone())?;
        let login_url = session.url(LOGIN_PATH)?;
        info!("Logging in to {}", base_url);

        let token = {
            let html = session.get_html(&login_url).await?;
            let doc = Html::parse_document(&html);
            LoginPage.scrape(&doc)?
        };
        if token.is_empty() {
            warn!("No login token on {}, submitting without one", login_url);
        }

        session
            .client
            .post(login_url)
            .form(&[
                ("username", credentials.username.as_str()),
                ("password", credentials.password.as_str()),
                ("anchor", ""),
                ("logintoken", token.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let cookies = session.cookie_names();
        debug!("Cookies after login: {:?}", cookies);
        if cookies.is_empty() {
            return Err(SyncError::Auth("no cookies returned".to_string()));
        }
        if !cookies.iter().any(|name| name == SESSION_COOKIE) {
            return Err(SyncError::Auth(format!("{} cookie missing", SESSION_COOKIE)));
        }

        info!("Login successful");
        Ok(session)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Names of the cookies the jar would send to the portal.
    pub fn cookie_names(&self) -> Vec<String> {
        self.jar
            .cookies(&self.base_url)
            .and_then(|header| header.to_str().ok().map(ToString::to_string))
            .map(|header| {
                header
                    .split(';')
                    .filter_map(|pair| pair.split('=').next())
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn url(&self, path: &str) -> Result<Url, SyncError> {
        self.base_url
            .join(path)
            .map_err(|e| SyncError::parse(format!("Invalid path {}: {}", path, e)))
    }

    pub async fn get_html(&self, url: &Url) -> Result<String, SyncError> {
        debug!("Visit {}", url);
        Ok(self
            .client
            .get(url.clone())
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?)
    }
}
