//! RedGifs: single gifs, tag search, user listings and niches

pub mod api;

pub use api::{parse_gif_data, ApiSession, RedGifsApi};

use crate::extractor::models::{Entries, Entry, Extraction, Playlist};
use crate::extractor::paging::{paged_entries, Page};
use crate::extractor::traits::Extractor;
use crate::utils::config::{ExtractorSettings, PagePolicy};
use crate::utils::error::{ExtractError, Result};
use crate::utils::parse::int_or_none;
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use tracing::info;

/// Items per page of search and user listings
const LISTING_PAGE_SIZE: usize = 80;
/// Items per page of niche listings
const NICHE_PAGE_SIZE: usize = 100;

static WATCH_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^https?://(?:(?:www\.)?redgifs\.com/(?:watch|ifr)/|thumbs2\.redgifs\.com/)",
        r"(?P<id>[^-/?#.]+)"
    ))
    .unwrap()
});
static SEARCH_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://(?:www\.)?redgifs\.com/browse\?(?P<query>[^#]+)").unwrap()
});
static USER_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^https?://(?:www\.)?redgifs\.com/users/(?P<username>[^/?#]+)",
        r"(?:\?(?P<query>[^#]+))?"
    ))
    .unwrap()
});
static NICHE_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^https?://(?:www\.)?redgifs\.com/niches/(?P<slug>[^/?#]+)",
        r"(?:\?(?P<query>[^#]+))?"
    ))
    .unwrap()
});

/// Gif id of a watch, embed or media URL (lower-cased)
pub fn match_gif(url: &str) -> Option<String> {
    WATCH_URL_RE
        .captures(url)
        .map(|c| c["id"].to_lowercase())
}

/// Query string of a search URL
pub fn match_search(url: &str) -> Option<String> {
    SEARCH_URL_RE.captures(url).map(|c| c["query"].to_string())
}

/// Username and optional query string of a user URL
pub fn match_user(url: &str) -> Option<(String, Option<String>)> {
    USER_URL_RE.captures(url).map(|c| {
        (
            c["username"].to_string(),
            c.name("query").map(|q| q.as_str().to_string()),
        )
    })
}

/// Slug and optional query string of a niche URL
pub fn match_niche(url: &str) -> Option<(String, Option<String>)> {
    NICHE_URL_RE.captures(url).map(|c| {
        (
            c["slug"].to_string(),
            c.name("query").map(|q| q.as_str().to_string()),
        )
    })
}

/// First non-empty value of every query parameter
pub fn parse_query(query: Option<&str>) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for (key, value) in url::form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
        if !value.is_empty() {
            params.entry(key.into_owned()).or_insert_with(|| value.into_owned());
        }
    }
    params
}

/// API query built from a table of accepted fields and their defaults.
/// Fields without a value and without a default are left out.
pub fn prepare_api_query(
    query: &HashMap<String, String>,
    fields: &[(&str, Option<&str>)],
) -> Vec<(String, String)> {
    fields
        .iter()
        .filter_map(|(name, default)| {
            let value = query.get(*name).map(String::as_str).or(*default)?;
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

fn requested_page(query: &HashMap<String, String>) -> Option<u32> {
    query
        .get("page")
        .and_then(|p| p.parse::<u32>().ok())
        .filter(|page| *page > 0)
}

fn playlist_id(name: &str, query: Option<&str>) -> String {
    match query {
        Some(query) => format!("{name}?{query}"),
        None => name.to_string(),
    }
}

fn gif_entries(data: &Value) -> Vec<Entry> {
    data.get("gifs")
        .and_then(Value::as_array)
        .map(|gifs| gifs.iter().map(|g| Entry::Video(parse_gif_data(g))).collect())
        .unwrap_or_default()
}

/// Listing endpoint to enumerate
struct Listing {
    api: RedGifsApi,
    session: Option<ApiSession>,
    ep: String,
    item_id: String,
    query: Vec<(String, String)>,
}

impl Listing {
    /// Every page, lazily, or only `page` when one was asked for explicitly
    fn entries(self, policy: PagePolicy, page: Option<u32>) -> Entries {
        let Listing {
            api,
            session,
            ep,
            item_id,
            query,
        } = self;

        if let Some(page) = page {
            let single = stream::once(async move {
                let mut query = query;
                query.push(("page".to_string(), page.to_string()));
                let note = format!("Downloading JSON metadata page {page}");
                let (_, data) = api.call(session, &ep, &item_id, &query, &note).await?;
                Ok::<_, ExtractError>(stream::iter(gif_entries(&data).into_iter().map(Ok)))
            })
            .try_flatten()
            .boxed();
            return Entries::from_stream(single);
        }

        let stream = paged_entries(session, policy, move |session, index| {
            let api = api.clone();
            let ep = ep.clone();
            let item_id = item_id.clone();
            let mut query = query.clone();
            async move {
                let page = index + 1;
                query.push(("page".to_string(), page.to_string()));
                let note = format!("Downloading JSON metadata page {page}");
                let (session, data) = api.call(session, &ep, &item_id, &query, &note).await?;
                let total_pages = data
                    .get("pages")
                    .and_then(int_or_none)
                    .and_then(|p| u32::try_from(p).ok());
                Ok::<_, ExtractError>((
                    Some(session),
                    Page {
                        items: gif_entries(&data),
                        total_pages,
                    },
                ))
            }
        });
        Entries::from_stream(stream)
    }
}

/// Single gif
pub struct RedGifsExtractor {
    api: RedGifsApi,
}

impl RedGifsExtractor {
    pub fn new(api: RedGifsApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Extractor for RedGifsExtractor {
    fn id(&self) -> &'static str {
        "RedGifs"
    }

    fn description(&self) -> &'static str {
        "RedGifs"
    }

    fn suitable(&self, url: &str) -> bool {
        match_gif(url).is_some()
    }

    async fn extract(&self, url: &str) -> Result<Extraction> {
        let video_id = match_gif(url).ok_or_else(|| ExtractError::Unsupported(url.to_string()))?;
        info!("Extracting RedGifs gif {}", video_id);

        let query = [("views".to_string(), "yes".to_string())];
        let (_, data) = self
            .api
            .call(None, &format!("gifs/{video_id}"), &video_id, &query, "Downloading video info")
            .await?;

        let gif = data
            .get("gif")
            .ok_or_else(|| ExtractError::no_media(&video_id, "No gif in API response"))?;
        let item = parse_gif_data(gif);
        if item.formats.is_empty() {
            return Err(ExtractError::no_media(&video_id, "No video URLs found"));
        }
        Ok(Extraction::Media(item))
    }
}

/// Tag search (`/browse?tags=...`)
pub struct RedGifsSearchExtractor {
    api: RedGifsApi,
    policy: PagePolicy,
}

impl RedGifsSearchExtractor {
    pub fn new(api: RedGifsApi, settings: &ExtractorSettings) -> Self {
        Self {
            api,
            policy: settings.page_policy().with_page_size(LISTING_PAGE_SIZE),
        }
    }
}

#[async_trait]
impl Extractor for RedGifsSearchExtractor {
    fn id(&self) -> &'static str {
        "RedGifsSearch"
    }

    fn description(&self) -> &'static str {
        "Redgifs search"
    }

    fn suitable(&self, url: &str) -> bool {
        match_search(url).is_some()
    }

    async fn extract(&self, url: &str) -> Result<Extraction> {
        let query_str =
            match_search(url).ok_or_else(|| ExtractError::Unsupported(url.to_string()))?;
        let mut query = parse_query(Some(&query_str));
        let tags = query
            .get("tags")
            .cloned()
            .ok_or_else(|| ExtractError::InvalidInput("Invalid query tags".to_string()))?;
        let order = query
            .get("order")
            .cloned()
            .unwrap_or_else(|| "trending".to_string());
        info!("Searching RedGifs for {}", tags);

        query.insert("search_text".to_string(), tags.clone());
        let listing = Listing {
            api: self.api.clone(),
            session: None,
            ep: "gifs/search".to_string(),
            item_id: query_str.clone(),
            query: prepare_api_query(
                &query,
                &[("search_text", None), ("order", Some("trending")), ("type", None)],
            ),
        };

        let mut playlist = Playlist::new(
            query_str,
            listing.entries(self.policy, requested_page(&query)),
        );
        playlist.description = Some(format!("RedGifs search for {tags}, ordered by {order}"));
        playlist.title = Some(tags);
        Ok(Extraction::Playlist(playlist))
    }
}

/// Gifs of one user (`/users/<name>`)
pub struct RedGifsUserExtractor {
    api: RedGifsApi,
    policy: PagePolicy,
}

impl RedGifsUserExtractor {
    pub fn new(api: RedGifsApi, settings: &ExtractorSettings) -> Self {
        Self {
            api,
            policy: settings.page_policy().with_page_size(LISTING_PAGE_SIZE),
        }
    }
}

#[async_trait]
impl Extractor for RedGifsUserExtractor {
    fn id(&self) -> &'static str {
        "RedGifsUser"
    }

    fn description(&self) -> &'static str {
        "Redgifs user"
    }

    fn suitable(&self, url: &str) -> bool {
        match_user(url).is_some()
    }

    async fn extract(&self, url: &str) -> Result<Extraction> {
        let (username, query_str) =
            match_user(url).ok_or_else(|| ExtractError::Unsupported(url.to_string()))?;
        let playlist_id = playlist_id(&username, query_str.as_deref());
        let query = parse_query(query_str.as_deref());
        let order = query
            .get("order")
            .cloned()
            .unwrap_or_else(|| "recent".to_string());
        info!("Listing RedGifs user {}", username);

        let listing = Listing {
            api: self.api.clone(),
            session: None,
            ep: format!("users/{username}/search"),
            item_id: playlist_id.clone(),
            query: prepare_api_query(&query, &[("order", Some("recent")), ("type", None)]),
        };

        let mut playlist = Playlist::new(
            playlist_id,
            listing.entries(self.policy, requested_page(&query)),
        );
        playlist.description = Some(format!("RedGifs user {username}, ordered by {order}"));
        playlist.title = Some(username);
        Ok(Extraction::Playlist(playlist))
    }
}

/// Gifs of one niche (`/niches/<slug>`)
pub struct RedGifsNicheExtractor {
    api: RedGifsApi,
    policy: PagePolicy,
}

impl RedGifsNicheExtractor {
    pub fn new(api: RedGifsApi, settings: &ExtractorSettings) -> Self {
        Self {
            api,
            policy: settings.page_policy().with_page_size(NICHE_PAGE_SIZE),
        }
    }
}

#[async_trait]
impl Extractor for RedGifsNicheExtractor {
    fn id(&self) -> &'static str {
        "RedGifsNiche"
    }

    fn description(&self) -> &'static str {
        "Redgifs niche"
    }

    fn suitable(&self, url: &str) -> bool {
        match_niche(url).is_some()
    }

    async fn extract(&self, url: &str) -> Result<Extraction> {
        let (slug, query_str) =
            match_niche(url).ok_or_else(|| ExtractError::Unsupported(url.to_string()))?;
        let playlist_id = playlist_id(&slug, query_str.as_deref());
        let query = parse_query(query_str.as_deref());
        let order = query
            .get("order")
            .cloned()
            .unwrap_or_else(|| "recent".to_string());
        info!("Listing RedGifs niche {}", slug);

        let (session, data) = self
            .api
            .call(None, &format!("niches/{slug}"), &slug, &[], "Downloading niche metadata")
            .await?;
        let niche = data.get("niche");
        let niche_text = |key: &str| {
            niche
                .and_then(|n| n.get(key))
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(String::from)
        };
        let title = niche_text("name").unwrap_or_else(|| slug.clone());
        let summary = format!("RedGifs niche {title}, ordered by {order}");
        let description = match niche_text("description") {
            Some(about) => format!("{summary}\n\n{about}"),
            None => summary,
        };

        let listing = Listing {
            api: self.api.clone(),
            session: Some(session),
            ep: format!("niches/{slug}/gifs"),
            item_id: playlist_id.clone(),
            query: prepare_api_query(
                &query,
                &[("order", Some("recent")), ("type", None), ("sexuality", None)],
            ),
        };

        let mut playlist = Playlist::new(
            playlist_id,
            listing.entries(self.policy, requested_page(&query)),
        );
        playlist.title = Some(title);
        playlist.description = Some(description);
        Ok(Extraction::Playlist(playlist))
    }
}
