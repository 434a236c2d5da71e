//! API Extraction Strategy.
//!
//! Pages through the private JSON API with the signed-in session's cookies.
//! The endpoint shape for saved items is undocumented and has moved around,
//! so every page tries a list of candidate endpoints, and every response is
//! searched for one of several envelope shapes.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::header::{ACCEPT, COOKIE, USER_AGENT};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::candidates::{first_match, first_non_empty, first_ok};
use crate::constants::{BROWSER_USER_AGENT, VOYAGER_API_BASE};
use crate::error::{ExtractError, Result};
use crate::models::SavedPost;
use crate::normalize::layout::INCLUDED_URN_MARKERS;
use crate::normalize::{normalize_api_item, IdMinter};
use crate::page::SessionState;

static PROFILE_SLUG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/in/([^/?#]+)").unwrap());

const STORED_PROFILE_URN_KEY: &str = "entityUrn";

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub page_size: usize,
    /// Ceiling shared by successful pages and failed attempts.
    pub max_attempts: usize,
    /// Courtesy delay between successful pages.
    pub page_delay: Duration,
    /// Backoff after a failed page.
    pub retry_delay: Duration,
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: VOYAGER_API_BASE.to_string(),
            page_size: 20,
            max_attempts: 10,
            page_delay: Duration::from_secs(1),
            retry_delay: Duration::from_secs(2),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Where the operating profile id was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentitySource {
    Explicit,
    MiniProfile,
    StoredProfile,
    ProfileLink,
}

/// Where the CSRF token was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsrfSource {
    SessionCookie,
    MetaTag,
    PageGlobal,
    LocalStorage,
}

/// Credentials and identity for one API extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiContext {
    pub profile_id: String,
    pub csrf_token: Option<String>,
    pub cookie_header: Option<String>,
}

impl ApiContext {
    /// Build the context from a session snapshot.
    ///
    /// A missing CSRF token is tolerated; a missing profile id is not.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::IdentityUnresolved`] when no lookup method yields a profile id.
    pub fn from_session(session: &SessionState, explicit_profile: Option<&str>) -> Result<Self> {
        let (profile_id, source) =
            resolve_profile_id(session, explicit_profile).ok_or(ExtractError::IdentityUnresolved)?;
        let csrf = resolve_csrf_token(session);
        info!(
            profile_id = %profile_id,
            identity_source = ?source,
            csrf_source = ?csrf.as_ref().map(|(_, s)| *s),
            "Resolved API identity"
        );
        Ok(Self {
            profile_id,
            csrf_token: csrf.map(|(token, _)| token),
            cookie_header: session.cookie_header(),
        })
    }
}

/// Last `:`-separated segment of a URN.
fn urn_tail(urn: &str) -> Option<String> {
    urn.rsplit(':')
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Resolve the profile id, trying each lookup method in priority order.
#[must_use]
pub fn resolve_profile_id(
    session: &SessionState,
    explicit: Option<&str>,
) -> Option<(String, IdentitySource)> {
    use IdentitySource::{Explicit, MiniProfile, ProfileLink, StoredProfile};

    first_match([Explicit, MiniProfile, StoredProfile, ProfileLink], |source| {
        let id = match source {
            Explicit => explicit.map(str::trim).filter(|s| !s.is_empty()).map(String::from),
            MiniProfile => session.mini_profile_urn.as_deref().and_then(urn_tail),
            StoredProfile => session
                .stored_profile
                .as_deref()
                .and_then(|raw| serde_json::from_str::<Value>(raw).ok())
                .and_then(|v| v.get(STORED_PROFILE_URN_KEY)?.as_str().and_then(urn_tail)),
            ProfileLink => first_match(&session.profile_links, |href| {
                PROFILE_SLUG.captures(href).map(|c| c[1].to_string())
            }),
        };
        id.map(|id| (id, source))
    })
}

/// Resolve the CSRF token, trying each source in priority order.
#[must_use]
pub fn resolve_csrf_token(session: &SessionState) -> Option<(String, CsrfSource)> {
    use CsrfSource::{LocalStorage, MetaTag, PageGlobal, SessionCookie};

    first_match([SessionCookie, MetaTag, PageGlobal, LocalStorage], |source| {
        let raw = match source {
            SessionCookie => session.cookie("JSESSIONID").map(|v| v.replace('"', "")),
            MetaTag => session.csrf_meta.clone(),
            PageGlobal => session.csrf_global.clone(),
            LocalStorage => session.csrf_storage.clone(),
        };
        first_non_empty(raw, Some).map(|token| (token, source))
    })
}

/// Candidate endpoint shapes, tried in this order for every page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    SavedItems,
    SearchSavedItems,
    MyItems,
    FeedSavedPosts,
}

impl Endpoint {
    pub const ALL: [Self; 4] = [
        Self::SavedItems,
        Self::SearchSavedItems,
        Self::MyItems,
        Self::FeedSavedPosts,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::SavedItems => "saved_items",
            Self::SearchSavedItems => "search_saved_items",
            Self::MyItems => "my_items",
            Self::FeedSavedPosts => "feed_saved_posts",
        }
    }

    #[must_use]
    pub fn url(self, base: &str, profile_id: &str, start: usize, count: usize) -> String {
        let base = base.trim_end_matches('/');
        match self {
            Self::SavedItems => format!(
                "{base}/identity/profiles/{profile_id}/savedItems?start={start}&count={count}"
            ),
            Self::SearchSavedItems => format!(
                "{base}/search/blended?decorationId=com.linkedin.voyager.dash.deco.search.SearchClusterCollection-165\
                 &start={start}&count={count}&q=all&query=(flagshipSearchIntent:SAVED_ITEMS)"
            ),
            Self::MyItems => format!(
                "{base}/identity/profiles/{profile_id}/myItems?itemType=SAVED_POST&start={start}&count={count}"
            ),
            Self::FeedSavedPosts => {
                format!("{base}/feed/savedPosts?start={start}&count={count}")
            }
        }
    }
}

/// Items of a response envelope, whichever of the known shapes it uses.
///
/// Shapes are checked in order: `elements`, `included` (only entities whose
/// URN marks them as post-like), a top-level `data` array, `paging.elements`.
#[must_use]
pub fn envelope_items(envelope: &Value) -> Vec<&Value> {
    if let Some(items) = envelope.get("elements").and_then(Value::as_array) {
        return items.iter().collect();
    }
    if let Some(items) = envelope.get("included").and_then(Value::as_array) {
        return items
            .iter()
            .filter(|item| {
                item.get("entityUrn")
                    .and_then(Value::as_str)
                    .is_some_and(|urn| INCLUDED_URN_MARKERS.iter().any(|m| urn.contains(m)))
            })
            .collect();
    }
    if let Some(items) = envelope.get("data").and_then(Value::as_array) {
        return items.iter().collect();
    }
    if let Some(items) = envelope
        .get("paging")
        .and_then(|p| p.get("elements"))
        .and_then(Value::as_array)
    {
        return items.iter().collect();
    }
    Vec::new()
}

/// Normalize every item of an envelope, dropping the ones that are not posts.
pub fn parse_envelope(envelope: &Value, ids: &mut IdMinter) -> Vec<SavedPost> {
    let items = envelope_items(envelope);
    let total = items.len();
    let posts: Vec<SavedPost> = items
        .into_iter()
        .filter_map(|item| normalize_api_item(item, ids))
        .collect();
    if posts.len() < total {
        debug!(skipped = total - posts.len(), "Skipped API items that are not posts");
    }
    posts
}

/// Thin client for the private JSON API.
pub struct VoyagerClient {
    client: reqwest::Client,
    base_url: String,
}

impl VoyagerClient {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    async fn get_json(&self, url: &str, ctx: &ApiContext) -> std::result::Result<Value, String> {
        let mut request = self
            .client
            .get(url)
            .header(ACCEPT, "application/vnd.linkedin.normalized+json+2.1")
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .header("x-restli-protocol-version", "2.0.0")
            .header("x-li-lang", "en_US")
            .header("x-li-track", client_tracking_header());
        if let Some(ref token) = ctx.csrf_token {
            request = request.header("csrf-token", token);
        }
        if let Some(ref cookies) = ctx.cookie_header {
            request = request.header(COOKIE, cookies);
        }

        let response = request.send().await.map_err(|e| e.to_string())?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("status {status}"));
        }
        response
            .json::<Value>()
            .await
            .map_err(|e| format!("invalid JSON: {e}"))
    }

    /// Fetch one page, trying each candidate endpoint until one responds.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::EndpointExhausted`] when every endpoint fails.
    pub async fn fetch_page(
        &self,
        ctx: &ApiContext,
        page: usize,
        start: usize,
        count: usize,
    ) -> Result<(Endpoint, Value)> {
        first_ok(Endpoint::ALL, |endpoint| {
            let endpoint = *endpoint;
            let url = endpoint.url(&self.base_url, &ctx.profile_id, start, count);
            async move {
                debug!(endpoint = endpoint.name(), url = %url, "Requesting saved items");
                self.get_json(&url, ctx).await.map_err(|e| {
                    debug!(endpoint = endpoint.name(), error = %e, "Endpoint failed");
                    format!("{}: {e}", endpoint.name())
                })
            }
        })
        .await
        .map_err(|failures| ExtractError::EndpointExhausted { page, failures })
    }
}

/// `x-li-track` client descriptor, timezone offset in JavaScript's convention.
fn client_tracking_header() -> String {
    let offset_minutes = -chrono::Local::now().offset().local_minus_utc() / 60;
    serde_json::json!({
        "clientVersion": "1.0.0",
        "osName": "web",
        "timezoneOffset": offset_minutes,
        "deviceFormFactor": "DESKTOP",
    })
    .to_string()
}

/// Paginates the private API into saved posts.
pub struct ApiStrategy {
    client: VoyagerClient,
    config: ApiConfig,
}

impl ApiStrategy {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ApiConfig) -> Result<Self> {
        Ok(Self {
            client: VoyagerClient::new(&config)?,
            config,
        })
    }

    /// Fetch every saved post reachable through the API.
    ///
    /// Pagination stops on an empty page, a short page, the attempt ceiling
    /// or cancellation. A failed page is retried after the backoff delay and
    /// counts against the same ceiling. If no page ever succeeded the last
    /// failure is returned; once any page succeeded, running out of attempts
    /// ends pagination gracefully with what was collected.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::EndpointExhausted`] when no page could be fetched.
    pub async fn extract(
        &self,
        ctx: &ApiContext,
        ids: &mut IdMinter,
        cancel: &CancellationToken,
    ) -> Result<Vec<SavedPost>> {
        let page_size = self.config.page_size;
        let mut posts = Vec::new();
        let mut start = 0;
        let mut attempts = 0;
        let mut pages_ok = 0;
        let mut last_error = None;

        while attempts < self.config.max_attempts && !cancel.is_cancelled() {
            let page = pages_ok + 1;
            match self.client.fetch_page(ctx, page, start, page_size).await {
                Ok((endpoint, envelope)) => {
                    attempts += 1;
                    pages_ok += 1;
                    let page_posts = parse_envelope(&envelope, ids);
                    let n = page_posts.len();
                    posts.extend(page_posts);
                    info!(
                        page,
                        endpoint = endpoint.name(),
                        items = n,
                        total = posts.len(),
                        "Fetched saved posts page"
                    );

                    if n == 0 || n < page_size {
                        debug!(page, "Last page reached");
                        break;
                    }
                    start += page_size;
                    self.pause(self.config.page_delay, attempts, cancel).await;
                }
                Err(e) => {
                    attempts += 1;
                    warn!(
                        page,
                        attempt = attempts,
                        max_attempts = self.config.max_attempts,
                        error = %e,
                        "Failed to fetch saved posts page"
                    );
                    last_error = Some(e);
                    self.pause(self.config.retry_delay, attempts, cancel).await;
                }
            }
        }

        if pages_ok == 0 {
            if let Some(e) = last_error {
                return Err(e);
            }
        }
        info!(count = posts.len(), pages = pages_ok, "API extraction complete");
        Ok(posts)
    }

    /// Sleep unless the ceiling is already reached; wakes early on cancellation.
    async fn pause(&self, delay: Duration, attempts: usize, cancel: &CancellationToken) {
        if attempts >= self.config.max_attempts || delay.is_zero() {
            return;
        }
        tokio::select! {
            () = cancel.cancelled() => {}
            () = tokio::time::sleep(delay) => {}
        }
    }
}
