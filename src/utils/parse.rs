//! Lenient parsers for scraped values
//!
//! Everything here returns `None` instead of failing: a field that cannot be
//! parsed is simply absent from the final record.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use std::hash::Hash;

static CLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:(?:(\d+):)?(\d{1,2}):)?(\d+)(?:\.(\d+))?$").unwrap());

static ISO_DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+(?:\.\d+)?)S)?)?$").unwrap()
});

static WORDS_DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)^
        (?:(\d+)\s*(?:h|hrs?|hours?)\.?)?\s*
        (?:(\d+)\s*(?:m|mins?|minutes?)\.?)?\s*
        (?:(\d+(?:\.\d+)?)\s*(?:s|secs?|seconds?)\.?)?$",
    )
    .unwrap()
});

static ORDINAL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d)(?:st|nd|rd|th)\b").unwrap());

static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:https?:)?//[^\s/]").unwrap());

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%d.%m.%Y %H:%M",
];

const ZONED_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%d %H:%M:%S%z",
    "%Y-%m-%d %H:%M:%S %z",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y%m%d",
    "%B %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
    "%d %B, %Y",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%d-%m-%Y",
];

/// Parse an integer that may carry thousands separators or markup noise
/// (`"1,234"`, `"1.234.567"`, `" 12 345 "`, `"+42"`, `"1&nbsp;000"`).
pub fn str_to_int(s: &str) -> Option<u64> {
    let cleaned: String = s
        .replace("&nbsp;", "")
        .chars()
        .filter(|c| {
            !matches!(c, ',' | '.' | '+' | '\u{a0}' | '\u{202f}' | '\'') && !c.is_whitespace()
        })
        .collect();
    if cleaned.is_empty() || !cleaned.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    cleaned.parse().ok()
}

/// Integer view of a JSON value (numbers are truncated, numeric strings parsed)
pub fn int_or_none(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Duration in whole seconds from clock (`1:02:03`), ISO-8601 (`PT1H2M3S`)
/// or word (`1h 2m 3s`, `5 min`) notation.
pub fn parse_duration(s: &str) -> Option<u64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let num = |m: Option<regex::Match>| -> f64 {
        m.and_then(|m| m.as_str().parse::<f64>().ok()).unwrap_or(0.0)
    };

    if let Some(caps) = CLOCK_RE.captures(s) {
        let secs = num(caps.get(1)) * 3600.0 + num(caps.get(2)) * 60.0 + num(caps.get(3));
        return Some(secs as u64);
    }

    if let Some(caps) = ISO_DURATION_RE.captures(s) {
        if (1..=4).any(|i| caps.get(i).is_some()) {
            let secs = num(caps.get(1)) * 86400.0
                + num(caps.get(2)) * 3600.0
                + num(caps.get(3)) * 60.0
                + num(caps.get(4));
            return Some(secs.round() as u64);
        }
        return None;
    }

    let caps = WORDS_DURATION_RE.captures(s)?;
    if (1..=3).all(|i| caps.get(i).is_none()) {
        return None;
    }
    let secs = num(caps.get(1)) * 3600.0 + num(caps.get(2)) * 60.0 + num(caps.get(3));
    Some(secs.round() as u64)
}

/// Unix timestamp from the date notations commonly found on video pages.
/// Values without an explicit zone are taken as UTC.
pub fn unified_timestamp(s: &str) -> Option<i64> {
    let s = s.trim().trim_end_matches('.');
    if s.is_empty() {
        return None;
    }
    let s = ORDINAL_RE.replace_all(s, "$1");
    let s = s.as_ref();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.timestamp());
    }
    for fmt in ZONED_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.timestamp());
        }
    }
    let naive = s.trim_end_matches('Z');
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, fmt) {
            return Some(dt.and_utc().timestamp());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp());
        }
    }
    None
}

/// Calendar date (`YYYYMMDD`) for the same notations as [`unified_timestamp`]
pub fn unified_strdate(s: &str) -> Option<String> {
    unified_timestamp(s).and_then(strdate_from_timestamp)
}

/// Calendar date (`YYYYMMDD`, UTC) of a Unix timestamp
pub fn strdate_from_timestamp(timestamp: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp(timestamp, 0).map(|dt| dt.format("%Y%m%d").to_string())
}

/// Order-preserving de-duplication
pub fn ordered_set<T, I>(items: I) -> Vec<T>
where
    T: Eq + Hash + Clone,
    I: IntoIterator<Item = T>,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

/// Accept only absolute or protocol-relative http(s) URLs
pub fn url_or_none(s: &str) -> Option<String> {
    let s = s.trim();
    URL_RE.is_match(s).then(|| s.to_string())
}
