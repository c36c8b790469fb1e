//! RedGifs v2 API client
//!
//! Every call carries a bearer token from `auth/temporary`. The token lives in
//! an [`ApiSession`] value that callers thread from one call to the next; a
//! rejected token is replaced by a fresh session, never patched in place.

use crate::extractor::http::HttpFetcher;
use crate::extractor::models::{Format, MediaItem};
use crate::utils::config::RetryPolicy;
use crate::utils::error::{ExtractError, Result};
use crate::utils::parse::int_or_none;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE, ORIGIN, REFERER,
};
use serde_json::Value;
use tokio::time::sleep;
use tracing::{debug, warn};

pub const API_BASE: &str = "https://api.redgifs.com/v2";
const SITE_REFERER: &str = "https://www.redgifs.com/";
const SITE_ORIGIN: &str = "https://www.redgifs.com";

/// Format name and height cap, worst first
const FORMATS: [(&str, Option<u32>); 3] = [("gif", Some(250)), ("sd", Some(480)), ("hd", None)];

/// Authenticated state of the API client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSession {
    token: String,
}

impl ApiSession {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Headers for a call about `item_id`
    pub fn headers(&self, item_id: &str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(REFERER, HeaderValue::from_static(SITE_REFERER));
        headers.insert(ORIGIN, HeaderValue::from_static(SITE_ORIGIN));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.token))
            .map_err(|_| ExtractError::Token)?;
        headers.insert(AUTHORIZATION, bearer);
        let custom = HeaderValue::from_str(&format!("https://www.redgifs.com/watch/{item_id}"))
            .map_err(|_| ExtractError::InvalidInput(format!("Invalid id: {item_id}")))?;
        headers.insert(HeaderName::from_static("x-customheader"), custom);
        Ok(headers)
    }
}

/// Shared client behind all RedGifs extractors
#[derive(Debug, Clone)]
pub struct RedGifsApi {
    http: HttpFetcher,
    base_url: String,
    retry: RetryPolicy,
}

impl RedGifsApi {
    pub fn new(http: HttpFetcher, retry: RetryPolicy) -> Self {
        Self::with_base_url(http, retry, API_BASE)
    }

    pub fn with_base_url(http: HttpFetcher, retry: RetryPolicy, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry,
        }
    }

    /// Fetch a temporary token and open a new session
    pub async fn authenticate(&self, item_id: &str) -> Result<ApiSession> {
        debug!("Fetching temporary token for {}", item_id);
        let url = format!("{}/auth/temporary", self.base_url);
        let auth = self
            .http
            .get_json(&url, HeaderMap::new(), &[], "Fetching temporary token")
            .await?;

        match auth.get("token").and_then(Value::as_str) {
            Some(token) if !token.is_empty() => Ok(ApiSession::new(token)),
            _ => Err(ExtractError::Token),
        }
    }

    /// Call endpoint `ep`, authenticating first when `session` is `None`.
    ///
    /// A 401 replaces the session once and repeats the request; a second 401
    /// fails. A 429, from the endpoint or from the token fetch, backs off and
    /// repeats the whole exchange until the retry budget is spent. A payload
    /// with an `error` field fails without retrying.
    pub async fn call(
        &self,
        session: Option<ApiSession>,
        ep: &str,
        item_id: &str,
        query: &[(String, String)],
        note: &str,
    ) -> Result<(ApiSession, Value)> {
        let url = format!("{}/{}", self.base_url, ep);
        let mut session = session;
        let mut attempt = 0;

        loop {
            match self.authorized_request(&mut session, &url, item_id, query, note).await {
                Ok((session, data)) => {
                    if let Some(error) = data.get("error") {
                        return Err(ExtractError::Api {
                            id: item_id.to_string(),
                            site: "RedGifs",
                            message: error_message(error),
                        });
                    }
                    return Ok((session, data));
                }
                Err(e) if e.status() == Some(429) && attempt < self.retry.max_retries => {
                    let wait = self.retry.backoff(attempt);
                    warn!(
                        "Rate limit reached. Retrying with exponential backoff in {:?} ({}/{})",
                        wait,
                        attempt + 1,
                        self.retry.max_retries
                    );
                    sleep(wait).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// One authenticated exchange. `session` always holds the token to try
    /// next, or `None` when a fresh one must be fetched.
    async fn authorized_request(
        &self,
        session: &mut Option<ApiSession>,
        url: &str,
        item_id: &str,
        query: &[(String, String)],
        note: &str,
    ) -> Result<(ApiSession, Value)> {
        let current = match session.take() {
            Some(current) => current,
            None => self.authenticate(item_id).await?,
        };
        *session = Some(current.clone());

        match self.request(&current, url, item_id, query, note).await {
            Ok(data) => Ok((current, data)),
            Err(e) if e.status() == Some(401) => {
                debug!("Token rejected for {}, refreshing", item_id);
                *session = None;
                let fresh = self.authenticate(item_id).await?;
                *session = Some(fresh.clone());
                let data = self.request(&fresh, url, item_id, query, note).await?;
                Ok((fresh, data))
            }
            Err(e) => Err(e),
        }
    }

    async fn request(
        &self,
        session: &ApiSession,
        url: &str,
        item_id: &str,
        query: &[(String, String)],
        note: &str,
    ) -> Result<Value> {
        let headers = session.headers(item_id)?;
        self.http.get_json(url, headers, query, note).await
    }
}

fn error_message(error: &Value) -> String {
    match error {
        Value::String(message) => message.clone(),
        Value::Object(map) => map
            .get("message")
            .or_else(|| map.get("description"))
            .and_then(Value::as_str)
            .map(String::from)
            .unwrap_or_else(|| error.to_string()),
        other => other.to_string(),
    }
}

/// Normalize one gif object of the API
pub fn parse_gif_data(gif: &Value) -> MediaItem {
    let id = gif
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let orig_height = gif.get("height").and_then(int_or_none).and_then(|h| u32::try_from(h).ok());
    let orig_width = gif.get("width").and_then(int_or_none).and_then(|w| u32::try_from(w).ok());

    let urls = gif.get("urls");
    let formats = FORMATS
        .iter()
        .enumerate()
        .filter_map(|(rank, (format_id, cap))| {
            let url = urls?.get(*format_id)?.as_str().filter(|u| !u.is_empty())?;
            let height = match (orig_height, cap) {
                (Some(h), Some(cap)) => Some(h.min(*cap)),
                (Some(h), None) => Some(h),
                (None, _) => None,
            };
            let width = match (height, orig_width, orig_height) {
                (Some(h), Some(w), Some(oh)) if oh > 0 => {
                    Some((u64::from(h) * u64::from(w) / u64::from(oh)) as u32)
                }
                _ => None,
            };
            Some(Format {
                url: url.to_string(),
                format_id: Some((*format_id).to_string()),
                width,
                height,
                quality: Some(rank as i32),
            })
        })
        .collect();

    let tags: Vec<String> = gif
        .get("tags")
        .and_then(Value::as_array)
        .map(|tags| tags.iter().filter_map(Value::as_str).map(String::from).collect())
        .unwrap_or_default();
    let title = if tags.is_empty() {
        "RedGifs".to_string()
    } else {
        tags.join(" ")
    };
    let count = |key: &str| {
        gif.get(key)
            .and_then(int_or_none)
            .and_then(|n| u64::try_from(n).ok())
    };

    MediaItem {
        webpage_url: Some(format!("https://redgifs.com/watch/{id}")),
        id,
        title,
        formats,
        uploader: gif.get("userName").and_then(Value::as_str).map(String::from),
        timestamp: gif.get("createDate").and_then(int_or_none),
        duration: count("duration"),
        view_count: count("views"),
        like_count: count("likes"),
        categories: tags.clone(),
        tags,
        age_limit: Some(18),
        extractor: Some("RedGifs".to_string()),
        ..Default::default()
    }
    .finalize()
}
