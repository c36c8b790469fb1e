//! Data structures for extracted media

use crate::utils::error::{ExtractError, Result};
use crate::utils::parse::strdate_from_timestamp;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Single playable item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_id: Option<String>,
    pub title: String,
    /// Direct media URL when the item has exactly one source
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webpage_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ext: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub formats: Vec<Format>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploader: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    /// `YYYYMMDD`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_date: Option<String>,
    /// Seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub like_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dislike_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_limit: Option<u8>,
    /// Headers the media URLs must be requested with
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub http_headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extractor: Option<String>,
}

impl MediaItem {
    /// Fill derived fields: the calendar date follows the timestamp when only
    /// the timestamp is known.
    pub fn finalize(mut self) -> Self {
        if self.upload_date.is_none() {
            self.upload_date = self.timestamp.and_then(strdate_from_timestamp);
        }
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.http_headers.insert(name.to_string(), value.to_string());
        self
    }
}

/// One candidate source of a media item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Format {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Site-specific rank, higher is better
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<i32>,
}

impl Format {
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

/// Reference to a page another extractor should resolve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlReference {
    pub url: String,
    /// Id of the extractor expected to handle `url`
    pub ie_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Element of a playlist
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "_type", rename_all = "snake_case")]
pub enum Entry {
    Video(MediaItem),
    Url(UrlReference),
}

impl Entry {
    pub fn as_media(&self) -> Option<&MediaItem> {
        match self {
            Entry::Video(item) => Some(item),
            Entry::Url(_) => None,
        }
    }

    pub fn as_url(&self) -> Option<&UrlReference> {
        match self {
            Entry::Url(reference) => Some(reference),
            Entry::Video(_) => None,
        }
    }
}

/// Forward-only, lazily produced sequence of playlist entries.
///
/// Pages are only fetched while the stream is polled; dropping it stops any
/// further requests.
pub struct Entries(BoxStream<'static, Result<Entry>>);

impl Entries {
    pub fn from_stream(stream: BoxStream<'static, Result<Entry>>) -> Self {
        Self(stream)
    }

    pub fn from_vec(entries: Vec<Entry>) -> Self {
        Self(stream::iter(entries.into_iter().map(Ok)).boxed())
    }

    pub fn into_stream(self) -> BoxStream<'static, Result<Entry>> {
        self.0
    }

    /// Drain the whole sequence
    pub async fn collect_all(self) -> Result<Vec<Entry>> {
        self.0.try_collect().await
    }

    /// Pull at most `limit` entries and drop the rest unfetched
    pub async fn take(self, limit: usize) -> Result<Vec<Entry>> {
        self.0.take(limit).try_collect().await
    }
}

impl fmt::Debug for Entries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Entries(..)")
    }
}

/// Collection of entries (album, profile, search results)
#[derive(Debug, Serialize)]
pub struct Playlist {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploader: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_limit: Option<u8>,
    #[serde(skip)]
    pub entries: Entries,
}

impl Playlist {
    pub fn new(id: impl Into<String>, entries: Entries) -> Self {
        Self {
            id: id.into(),
            display_id: None,
            title: None,
            description: None,
            uploader: None,
            timestamp: None,
            age_limit: None,
            entries,
        }
    }
}

/// Result of running an extractor on one URL
#[derive(Debug)]
pub enum Extraction {
    Media(MediaItem),
    Playlist(Playlist),
}

impl Extraction {
    pub fn into_media(self) -> Result<MediaItem> {
        match self {
            Extraction::Media(item) => Ok(item),
            Extraction::Playlist(p) => Err(ExtractError::InvalidInput(format!(
                "{} is a playlist, not a single item",
                p.id
            ))),
        }
    }

    pub fn into_playlist(self) -> Result<Playlist> {
        match self {
            Extraction::Playlist(p) => Ok(p),
            Extraction::Media(item) => Err(ExtractError::InvalidInput(format!(
                "{} is a single item, not a playlist",
                item.id
            ))),
        }
    }
}
