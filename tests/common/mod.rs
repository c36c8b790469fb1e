//! Shared setup for the mock-server tests

#![allow(dead_code)]

use serde_json::{json, Value};
use siteloader::{ExtractorRegistry, ExtractorSettings, SiteEndpoints};
use std::time::Duration;
use wiremock::MockServer;

/// Settings with no page throttle and millisecond backoff
pub fn fast_settings() -> ExtractorSettings {
    ExtractorSettings {
        sleep_interval_requests: Some(Duration::ZERO),
        retry_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(4),
        ..Default::default()
    }
}

/// Registry whose sites all live on `server`
pub fn registry_for(server: &MockServer, settings: &ExtractorSettings) -> ExtractorRegistry {
    let endpoints = SiteEndpoints {
        redgifs_api: server.uri(),
        erome: server.uri(),
        boy18tube: server.uri(),
    };
    ExtractorRegistry::with_endpoints(settings, &endpoints).expect("registry should build")
}

/// Minimal RedGifs gif object
pub fn gif(id: &str) -> Value {
    json!({
        "id": id,
        "createDate": 1636287915,
        "width": 1080,
        "height": 1920,
        "duration": 16,
        "views": 100,
        "likes": 5,
        "userName": "ignored52",
        "tags": ["Hotwife", "Legs", "Thick"],
        "urls": {
            "sd": format!("https://thumbs2.redgifs.com/{id}-mobile.mp4"),
            "hd": format!("https://thumbs2.redgifs.com/{id}.mp4")
        }
    })
}

/// Listing page of `count` gifs, ids prefixed with `prefix`
pub fn gif_page(prefix: &str, count: usize, pages: Option<u32>) -> Value {
    let gifs: Vec<Value> = (0..count).map(|i| gif(&format!("{prefix}{i}"))).collect();
    match pages {
        Some(pages) => json!({ "gifs": gifs, "pages": pages }),
        None => json!({ "gifs": gifs }),
    }
}
