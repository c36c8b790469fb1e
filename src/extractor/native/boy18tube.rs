//! Boy18Tube video pages

use crate::extractor::fallback::{non_empty, FieldChain};
use crate::extractor::http::HttpFetcher;
use crate::extractor::models::{Extraction, Format, MediaItem};
use crate::extractor::traits::Extractor;
use crate::utils::error::{ExtractError, Result};
use crate::utils::html::{
    clean_html, find_all, html_search_meta, html_search_regex, og_search, rta_search,
    search_json_ld, search_regex, JsonLd,
};
use crate::utils::parse::{
    int_or_none, parse_duration, str_to_int, unified_strdate, unified_timestamp,
};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::HeaderMap;
use serde_json::Value;
use tracing::{debug, info};

pub const BASE_URL: &str = "https://boy18tube.com";
const REFERER: &str = "https://boy18tube.com/";

static VIDEO_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://(?:www\.)?boy18tube\.com/video/(?P<id>\d+)/(?P<display_id>[^/]+)\.php")
        .unwrap()
});

static TITLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<title>([^<]+)</title>").unwrap());
static TITLE_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*(?:-|at)\s*Boy\s*18\s*Tube\s*$").unwrap());
static UPDATE_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"data-v-update-url="([^"]+)""#).unwrap());

static SOURCE_RES: Lazy<[Regex; 5]> = Lazy::new(|| {
    [
        Regex::new(r#"<source[^>]+src="([^"]+\.mp4[^"]*)""#).unwrap(),
        Regex::new(r#"<video[^>]+src="([^"]+\.mp4[^"]*)""#).unwrap(),
        Regex::new(r#""file"\s*:\s*"([^"]+\.mp4[^"]*)""#).unwrap(),
        Regex::new(r#""url"\s*:\s*"([^"]+\.mp4[^"]*)""#).unwrap(),
        Regex::new(r#"(?:file|src|url)\s*:\s*["']([^"']+\.mp4[^"']*)["']"#).unwrap(),
    ]
});

static UPLOADER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r#"<i[^>]*class="icon-user-male"[^>]*></i>\s*Uploaded\s+by:\s*</span>"#,
        r#"\s*(?:<span>)?\s*([^<]+)"#
    ))
    .unwrap()
});
static ADDED_ON_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<i\s+class="icon-calendar"></i>Added\s+on:</span>\s*<span>([^<]+)</span>"#)
        .unwrap()
});
static VIEWS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<i\s+class="icon-star"></i>Views:</span>\s*([\d,]+)"#).unwrap());
static DURATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<i\s+class="icon-clock"></i>Duration:</span>\s*([^<]+)"#).unwrap());
static CATEGORIES_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<i\s+class="icon-list"></i>Categories:</span>(.*?)</div>"#).unwrap()
});
static TAGS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<i\s+class="icon-tags"></i>Tags:</span>(.*?)</div>"#).unwrap());
static LINK_TEXT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<a[^>]+>([^<]+)</a>").unwrap());
static LIKES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<i\s+class="icon-thumbs-up"></i>\s*([\d,]+)"#).unwrap());
static DISLIKES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<i\s+class="icon-thumbs-down"></i>\s*([\d,]+)"#).unwrap());

/// Video URL components
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoUrl {
    pub id: String,
    pub display_id: String,
}

pub fn match_video(url: &str) -> Option<VideoUrl> {
    VIDEO_URL_RE.captures(url).map(|c| VideoUrl {
        id: c["id"].to_string(),
        display_id: c["display_id"].to_string(),
    })
}

fn clean_title(title: &str) -> String {
    TITLE_SUFFIX_RE.replace(title, "").trim().to_string()
}

/// Sources announced by the player's update endpoint
pub fn formats_from_update(data: &Value) -> Vec<Format> {
    if let Some(sources) = data.get("sources").and_then(Value::as_array) {
        return sources
            .iter()
            .filter_map(|source| {
                let src = source.get("src")?.as_str()?;
                let label = source
                    .get("label")
                    .or_else(|| source.get("quality"))
                    .map(|v| match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .unwrap_or_else(|| "default".to_string());
                Some(Format {
                    url: src.to_string(),
                    format_id: Some(label),
                    height: source
                        .get("quality")
                        .and_then(int_or_none)
                        .and_then(|h| u32::try_from(h).ok()),
                    ..Default::default()
                })
            })
            .collect();
    }
    ["url", "file"]
        .iter()
        .find_map(|key| data.get(*key).and_then(Value::as_str))
        .map(|url| vec![Format::from_url(url)])
        .unwrap_or_default()
}

/// First media URL found directly in the markup
pub fn formats_from_markup(webpage: &str) -> Vec<Format> {
    let patterns: Vec<&Regex> = SOURCE_RES.iter().collect();
    search_regex(&patterns, webpage)
        .map(|url| vec![Format::from_url(url)])
        .unwrap_or_default()
}

fn link_texts(section: Option<String>) -> Vec<String> {
    section
        .map(|html| {
            find_all(&LINK_TEXT_RE, &html)
                .iter()
                .map(|t| clean_html(t))
                .filter(|t| !t.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Build the record from the page, given the sources already resolved
pub fn parse_video_page(
    webpage: &str,
    video: &VideoUrl,
    json_ld: &JsonLd,
    formats: Vec<Format>,
) -> Result<MediaItem> {
    if formats.is_empty() {
        return Err(ExtractError::no_media(&video.id, "Unable to extract video URL"));
    }

    // the site suffix only decorates markup titles
    let title = FieldChain::new(webpage)
        .or_value(json_ld.title.clone())
        .or(|doc| html_search_regex(&[&TITLE_RE], doc).map(|t| clean_title(&t)))
        .or(|doc| og_search("title", doc).map(|t| clean_title(&t)))
        .or(|doc| html_search_meta("twitter:title", doc).map(|t| clean_title(&t)))
        .get()
        .unwrap_or_default();

    let thumbnail = FieldChain::new(webpage)
        .or_value(json_ld.thumbnail.clone())
        .or(|doc| og_search("image", doc))
        .or(|doc| html_search_meta("twitter:image", doc))
        .get();

    let description = FieldChain::new(webpage)
        .or_value(json_ld.description.clone())
        .or(|doc| og_search("description", doc))
        .or(|doc| html_search_meta("description", doc))
        .get();

    let uploader = FieldChain::new(webpage)
        .or_value(json_ld.uploader.clone())
        .or(|doc| html_search_regex(&[&UPLOADER_RE], doc))
        .get();

    // The page date feeds both the timestamp and the calendar date
    let (timestamp, upload_date) = match json_ld.timestamp {
        Some(ts) => (Some(ts), None),
        None => match html_search_regex(&[&ADDED_ON_RE], webpage) {
            Some(date) => (unified_timestamp(&date), unified_strdate(&date)),
            None => (None, None),
        },
    };

    let view_count = FieldChain::new(webpage)
        .or_value(json_ld.view_count)
        .or(|doc| search_regex(&[&VIEWS_RE], doc).and_then(|v| str_to_int(&v)))
        .get();

    let duration = FieldChain::new(webpage)
        .or_value(json_ld.duration)
        .or(|doc| html_search_regex(&[&DURATION_RE], doc).and_then(|d| parse_duration(&d)))
        .or(|doc| html_search_meta("duration", doc).and_then(|d| d.trim().parse().ok()))
        .get();

    let categories = FieldChain::new(webpage)
        .or_value(non_empty(json_ld.categories.clone()))
        .or(|doc| non_empty(link_texts(search_regex(&[&CATEGORIES_RE], doc))))
        .get()
        .unwrap_or_default();

    let tags = FieldChain::new(webpage)
        .or_value(non_empty(json_ld.tags.clone()))
        .or(|doc| non_empty(link_texts(search_regex(&[&TAGS_RE], doc))))
        .get()
        .unwrap_or_default();

    let like_count = search_regex(&[&LIKES_RE], webpage).and_then(|v| str_to_int(&v));
    let dislike_count = search_regex(&[&DISLIKES_RE], webpage).and_then(|v| str_to_int(&v));

    Ok(MediaItem {
        id: video.id.clone(),
        display_id: Some(video.display_id.clone()),
        title,
        formats,
        thumbnail,
        description,
        uploader,
        timestamp,
        upload_date,
        duration,
        view_count,
        like_count,
        dislike_count,
        categories,
        tags,
        age_limit: Some(rta_search(webpage).unwrap_or(18)),
        extractor: Some("Boy18Tube".to_string()),
        ..Default::default()
    }
    .with_header("Referer", REFERER)
    .finalize())
}

/// Boy18Tube video extractor
pub struct Boy18TubeExtractor {
    http: HttpFetcher,
    base_url: String,
}

impl Boy18TubeExtractor {
    pub fn new(http: HttpFetcher) -> Self {
        Self::with_base_url(http, BASE_URL)
    }

    pub fn with_base_url(http: HttpFetcher, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Ask the player's update endpoint for sources; any failure just means
    /// falling back to the markup.
    async fn update_formats(&self, webpage: &str, video_id: &str) -> Vec<Format> {
        let Some(update_url) = search_regex(&[&UPDATE_URL_RE], webpage) else {
            return Vec::new();
        };
        let update_url = if update_url.ends_with('/') {
            format!("{update_url}{video_id}")
        } else {
            format!("{update_url}/{video_id}")
        };

        match self
            .http
            .get_json(&update_url, HeaderMap::new(), &[], "Downloading video info")
            .await
        {
            Ok(data) => formats_from_update(&data),
            Err(e) => {
                debug!("Video update endpoint unavailable for {}: {}", video_id, e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl Extractor for Boy18TubeExtractor {
    fn id(&self) -> &'static str {
        "Boy18Tube"
    }

    fn description(&self) -> &'static str {
        "Boy18Tube"
    }

    fn suitable(&self, url: &str) -> bool {
        match_video(url).is_some()
    }

    async fn extract(&self, url: &str) -> Result<Extraction> {
        let video = match_video(url).ok_or_else(|| ExtractError::Unsupported(url.to_string()))?;
        info!("Extracting Boy18Tube video {}", video.id);

        let page_url = format!("{}/video/{}/{}.php", self.base_url, video.id, video.display_id);
        let webpage = self
            .http
            .get_text(&page_url, HeaderMap::new(), &[], "Downloading webpage")
            .await?;

        let json_ld = search_json_ld(&webpage);
        let mut formats = self.update_formats(&webpage, &video.id).await;
        if formats.is_empty() {
            formats = formats_from_markup(&webpage);
        }
        if formats.is_empty() {
            formats.extend(json_ld.content_url.iter().map(Format::from_url));
        }

        parse_video_page(&webpage, &video, &json_ld, formats).map(Extraction::Media)
    }
}
