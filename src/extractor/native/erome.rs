//! EroMe albums and user profiles

use crate::extractor::fallback::FieldChain;
use crate::extractor::http::HttpFetcher;
use crate::extractor::models::{Entries, Entry, Extraction, MediaItem, Playlist, UrlReference};
use crate::extractor::paging::{link_following, LinkPage};
use crate::extractor::traits::Extractor;
use crate::utils::config::{ExtractorSettings, PagePolicy};
use crate::utils::error::{ExtractError, Result};
use crate::utils::html::{
    clean_html, find_all, html_search_meta, html_search_regex, og_search, rta_search,
    search_json_ld, search_regex,
};
use crate::utils::parse::{ordered_set, unified_timestamp, url_or_none};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use std::time::Duration;
use tracing::{debug, info};

pub const BASE_URL: &str = "https://www.erome.com";
const REFERER: &str = "https://www.erome.com/";

const ALBUM_GONE_MARKERS: &[&str] = &[
    "This album no longer exists",
    "Album not found",
    "Album has been removed",
    "Page not found",
];

const PROFILE_GONE_MARKERS: &[&str] = &[
    "User not found",
    "Profile not found",
    "This user does not exist",
    "Page not found",
];

static ALBUM_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://(?:www\.)?erome\.com/a/(?P<id>[0-9A-Za-z]+)").unwrap());

static PROFILE_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://(?:www\.)?erome\.com/(?P<id>[a-zA-Z0-9_-]+)(?:\?page=\d+)?").unwrap()
});

static ALBUM_TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<h1[^>]*class="[^"]*title[^"]*"[^>]*>([^<]+)</h1>"#).unwrap());
static PROFILE_TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<h1[^>]*class="[^"]*username[^"]*"[^>]*>([^<]+)</h1>"#).unwrap());
static TITLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<title>([^<]+)</title>").unwrap());
static USERNAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<a[^>]+href="/[^"]+"[^>]*class="[^"]*username[^"]*"[^>]*>([^<]+)</a>"#).unwrap()
});
static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<span[^>]+class="[^"]*date[^"]*"[^>]*>([^<]+)</span>"#).unwrap());

static VIDEO_RES: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        Regex::new(r#"(?i)<source[^>]+src="([^"]+\.(?:mp4|webm|avi|mov|flv)(?:\?[^"]*)?)"[^>]*>"#)
            .unwrap(),
        Regex::new(r#"(?i)<video[^>]+src="([^"]+)""#).unwrap(),
        Regex::new(r#"(?i)"videoUrl":\s*"([^"]+)""#).unwrap(),
    ]
});

static ALBUM_LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"href="(?:https?://(?:www\.)?erome\.com)?(/a/[a-zA-Z0-9]+)""#).unwrap()
});

/// Album id of an album URL
pub fn match_album(url: &str) -> Option<String> {
    ALBUM_URL_RE.captures(url).map(|c| c["id"].to_string())
}

/// Profile name of a profile URL. Album URLs never match.
pub fn match_profile(url: &str) -> Option<String> {
    if match_album(url).is_some() {
        return None;
    }
    PROFILE_URL_RE.captures(url).map(|c| c["id"].to_string())
}

fn age_verified_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(COOKIE, HeaderValue::from_static("age_verified=1"));
    headers
}

fn clean_album_title(raw: Option<String>) -> String {
    let mut title = raw.map(|t| clean_html(&t)).unwrap_or_default();
    if title.contains("EroMe") {
        title = title
            .replace("EroMe - ", "")
            .replace(" - EroMe", "")
            .trim()
            .to_string();
    }
    if title.is_empty() {
        "Untitled".to_string()
    } else {
        title
    }
}

fn absolutize(url: &str, base_url: &str) -> Option<String> {
    let url = if url.starts_with("//") {
        format!("https:{url}")
    } else if url.starts_with('/') {
        format!("{base_url}{url}")
    } else {
        url.to_string()
    };
    url_or_none(&url)
}

fn is_thumbnail(url: &str) -> bool {
    ["thumb", "_s.", "_t.", "/t/"].iter().any(|m| url.contains(m))
}

/// Build the album playlist from its page
pub fn parse_album(webpage: &str, album_id: &str, base_url: &str) -> Result<Playlist> {
    let json_ld = search_json_ld(webpage);

    let title = clean_album_title(
        FieldChain::new(webpage)
            .or_value(json_ld.title.clone())
            .or(|doc| search_regex(&[&ALBUM_TITLE_RE, &TITLE_RE], doc))
            .get(),
    );

    let description = FieldChain::new(webpage)
        .or_value(json_ld.description.clone())
        .or(|doc| og_search("description", doc))
        .or(|doc| html_search_meta("description", doc))
        .get();

    let uploader = FieldChain::new(webpage)
        .or_value(json_ld.uploader.clone())
        .or(|doc| html_search_regex(&[&USERNAME_RE], doc))
        .get();

    let timestamp = FieldChain::new(webpage)
        .or_value(json_ld.timestamp)
        .or(|doc| html_search_regex(&[&DATE_RE], doc).and_then(|d| unified_timestamp(&d)))
        .get();

    let entry = |id: String, url: String, title: String| MediaItem {
        id,
        title,
        url: Some(url),
        uploader: uploader.clone(),
        description: description.clone(),
        extractor: Some("Erome".to_string()),
        ..Default::default()
    }
    .with_header("Referer", REFERER);

    let video_urls = ordered_set(VIDEO_RES.iter().flat_map(|re| find_all(re, webpage)));
    let video_urls: Vec<String> = video_urls
        .iter()
        .filter_map(|u| absolutize(u, base_url))
        .collect();

    let mut entries: Vec<Entry> = video_urls
        .into_iter()
        .enumerate()
        .map(|(i, url)| {
            Entry::Video(entry(
                format!("{album_id}_video_{}", i + 1),
                url,
                format!("{title} - Video {}", i + 1),
            ))
        })
        .collect();

    let image_re = Regex::new(&format!(
        concat!(
            r#"(?i)<img[^>]+src="(https?://s\d+\.erome\.com/\d+/{}/"#,
            r#"[^"]*\.(?:jpg|jpeg|png|gif)(?:\?[^"]*)?)"[^>]*>"#
        ),
        regex::escape(album_id)
    ))
    .map_err(|e| ExtractError::InvalidInput(e.to_string()))?;

    let image_urls = ordered_set(
        find_all(&image_re, webpage)
            .into_iter()
            .filter(|u| !is_thumbnail(u))
            .filter_map(|u| url_or_none(&u)),
    );
    entries.extend(image_urls.into_iter().enumerate().map(|(i, url)| {
        let mut item = entry(
            format!("{album_id}_img_{}", i + 1),
            url,
            format!("{title} - Image {}", i + 1),
        );
        item.ext = Some("jpg".to_string());
        Entry::Video(item)
    }));

    if entries.is_empty() {
        return Err(ExtractError::no_media(album_id, "No media found"));
    }
    debug!("Album {} has {} entries", album_id, entries.len());

    let mut playlist = Playlist::new(album_id, Entries::from_vec(entries));
    playlist.display_id = Some(album_id.to_string());
    playlist.title = Some(title);
    playlist.description = description;
    playlist.uploader = uploader;
    playlist.timestamp = timestamp;
    playlist.age_limit = Some(rta_search(webpage).unwrap_or(18));
    Ok(playlist)
}

/// Entries of one profile listing page
pub fn parse_profile_page(webpage: &str, profile_id: &str, page: u32) -> LinkPage<Entry> {
    if PROFILE_GONE_MARKERS.iter().any(|m| webpage.contains(m)) {
        return LinkPage::End;
    }

    let album_paths = ordered_set(find_all(&ALBUM_LINK_RE, webpage));
    if album_paths.is_empty() {
        return LinkPage::End;
    }

    let items = album_paths
        .iter()
        .map(|path| {
            let album_id = path.rsplit('/').next().unwrap_or_default().to_string();
            Entry::Url(UrlReference {
                url: format!("{BASE_URL}{path}"),
                ie_key: "Erome".to_string(),
                title: Some(format!("{profile_id} - Album {album_id}")),
                id: Some(album_id),
            })
        })
        .collect();

    let next = page + 1;
    let has_next =
        webpage.contains(&format!("/page/{next}")) || webpage.contains(&format!("page={next}"));
    LinkPage::Entries { items, has_next }
}

/// EroMe album extractor
pub struct EromeExtractor {
    http: HttpFetcher,
    base_url: String,
}

impl EromeExtractor {
    pub fn new(http: HttpFetcher) -> Self {
        Self::with_base_url(http, BASE_URL)
    }

    pub fn with_base_url(http: HttpFetcher, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Extractor for EromeExtractor {
    fn id(&self) -> &'static str {
        "Erome"
    }

    fn description(&self) -> &'static str {
        "EroMe"
    }

    fn suitable(&self, url: &str) -> bool {
        match_album(url).is_some()
    }

    async fn extract(&self, url: &str) -> Result<Extraction> {
        let album_id = match_album(url).ok_or_else(|| ExtractError::Unsupported(url.to_string()))?;
        info!("Extracting EroMe album {}", album_id);

        let page_url = format!("{}/a/{}", self.base_url, album_id);
        let webpage = self
            .http
            .get_text(&page_url, age_verified_headers(), &[], "Downloading webpage")
            .await?;

        if ALBUM_GONE_MARKERS.iter().any(|m| webpage.contains(m)) {
            return Err(ExtractError::not_found(album_id, "Album not found"));
        }

        parse_album(&webpage, &album_id, &self.base_url).map(Extraction::Playlist)
    }
}

/// EroMe profile extractor
pub struct EromeProfileExtractor {
    http: HttpFetcher,
    base_url: String,
    policy: PagePolicy,
}

impl EromeProfileExtractor {
    pub fn new(http: HttpFetcher, settings: &ExtractorSettings) -> Self {
        Self::with_base_url(http, settings, BASE_URL)
    }

    pub fn with_base_url(http: HttpFetcher, settings: &ExtractorSettings, base_url: &str) -> Self {
        // HTML listing pages are not throttled, only API pages are
        let policy = PagePolicy {
            delay: Duration::ZERO,
            ..settings.page_policy()
        };
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            policy,
        }
    }

    fn entries(&self, profile_id: &str) -> Entries {
        let http = self.http.clone();
        let base_url = self.base_url.clone();
        let profile_id = profile_id.to_string();

        Entries::from_stream(link_following(self.policy, move |page| {
            let http = http.clone();
            let profile_id = profile_id.clone();
            let page_url = if page == 1 {
                format!("{base_url}/{profile_id}")
            } else {
                format!("{base_url}/{profile_id}?page={page}")
            };
            async move {
                let webpage = http
                    .get_text(
                        &page_url,
                        age_verified_headers(),
                        &[],
                        &format!("Downloading page {page}"),
                    )
                    .await?;
                Ok::<_, ExtractError>(parse_profile_page(&webpage, &profile_id, page))
            }
        }))
    }
}

#[async_trait]
impl Extractor for EromeProfileExtractor {
    fn id(&self) -> &'static str {
        "EromeProfile"
    }

    fn description(&self) -> &'static str {
        "EroMe user profile"
    }

    fn suitable(&self, url: &str) -> bool {
        match_profile(url).is_some()
    }

    async fn extract(&self, url: &str) -> Result<Extraction> {
        let profile_id =
            match_profile(url).ok_or_else(|| ExtractError::Unsupported(url.to_string()))?;
        info!("Extracting EroMe profile {}", profile_id);

        let webpage = self
            .http
            .get_text(
                &format!("{}/{}", self.base_url, profile_id),
                age_verified_headers(),
                &[],
                "Downloading webpage",
            )
            .await?;

        if PROFILE_GONE_MARKERS.iter().any(|m| webpage.contains(m)) {
            return Err(ExtractError::not_found(profile_id, "Profile not found"));
        }

        let json_ld = search_json_ld(&webpage);
        let title = FieldChain::new(webpage.as_str())
            .or_value(json_ld.title.clone())
            .or(|doc| html_search_regex(&[&PROFILE_TITLE_RE, &TITLE_RE], doc))
            .get()
            .unwrap_or_else(|| format!("{profile_id} - EroMe Profile"));
        let description = FieldChain::new(webpage.as_str())
            .or_value(json_ld.description.clone())
            .or(|doc| og_search("description", doc))
            .or(|doc| html_search_meta("description", doc))
            .get();

        let mut playlist = Playlist::new(profile_id.as_str(), self.entries(&profile_id));
        playlist.title = Some(title);
        playlist.description = description;
        playlist.uploader = json_ld.uploader;
        playlist.timestamp = json_ld.timestamp;
        playlist.age_limit = Some(rta_search(&webpage).unwrap_or(18));
        Ok(Extraction::Playlist(playlist))
    }
}
