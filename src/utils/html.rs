//! Searching HTML pages for metadata
//!
//! These helpers never fail: a selector that does not match yields `None`.

use crate::utils::parse::{int_or_none, parse_duration, str_to_int, unified_timestamp};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static META_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<meta\s[^>]*>").unwrap());

static ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .unwrap()
});

static JSON_LD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<script[^>]+type\s*=\s*["']?application/ld\+json["']?[^>]*>(.*?)</script>"#)
        .unwrap()
});

static RTA_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r#"(?i)<meta\s+name\s*=\s*["']?rating["']?\s+content\s*=\s*["']?"#,
        r"RTA-5042-1996-1400-1577-RTA"
    ))
    .unwrap()
});

static BR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*<\s*br\s*/?\s*>\s*").unwrap());
static PARAGRAPH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<\s*/\s*p\s*>\s*<\s*p[^>]*>").unwrap());
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<.*?>").unwrap());

/// First capture group (or whole match when the pattern has no group) of the
/// first pattern that matches `text`.
pub fn search_regex(patterns: &[&Regex], text: &str) -> Option<String> {
    patterns.iter().find_map(|re| {
        let caps = re.captures(text)?;
        caps.get(1)
            .or_else(|| caps.get(0))
            .map(|m| m.as_str().to_string())
    })
}

/// Like [`search_regex`] but the result is passed through [`clean_html`]
/// and empty results count as no match.
pub fn html_search_regex(patterns: &[&Regex], text: &str) -> Option<String> {
    patterns.iter().find_map(|re| {
        let caps = re.captures(text)?;
        let raw = caps.get(1).or_else(|| caps.get(0))?.as_str();
        let cleaned = clean_html(raw);
        (!cleaned.is_empty()).then_some(cleaned)
    })
}

/// Every capture group 1 of `re` in `text`, in document order
pub fn find_all(re: &Regex, text: &str) -> Vec<String> {
    re.captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Strip markup, decode entities and tidy whitespace
pub fn clean_html(html: &str) -> String {
    let text = html.replace('\n', " ");
    let text = BR_RE.replace_all(&text, "\n");
    let text = PARAGRAPH_RE.replace_all(&text, "\n");
    let text = TAG_RE.replace_all(&text, "");
    html_escape::decode_html_entities(text.trim()).trim().to_string()
}

/// Content of the first `<meta>` tag whose `name`, `property` or `itemprop`
/// equals `name` (case-insensitive).
pub fn html_search_meta(name: &str, html: &str) -> Option<String> {
    META_TAG_RE.find_iter(html).find_map(|tag| {
        let mut key_matches = false;
        let mut content = None;
        for caps in ATTR_RE.captures_iter(tag.as_str()) {
            let attr = caps[1].to_ascii_lowercase();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| m.as_str())
                .unwrap_or_default();
            match attr.as_str() {
                "name" | "property" | "itemprop" if value.eq_ignore_ascii_case(name) => {
                    key_matches = true
                }
                "content" => content = Some(value),
                _ => {}
            }
        }
        if !key_matches {
            return None;
        }
        let value = html_escape::decode_html_entities(content?.trim()).into_owned();
        (!value.is_empty()).then_some(value)
    })
}

/// OpenGraph property, e.g. `og_search("description", html)`
pub fn og_search(property: &str, html: &str) -> Option<String> {
    html_search_meta(&format!("og:{property}"), html)
}

/// Age limit declared through an RTA label
pub fn rta_search(html: &str) -> Option<u8> {
    RTA_RE.is_match(html).then_some(18)
}

/// Metadata taken from an embedded `application/ld+json` block
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonLd {
    pub title: Option<String>,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    pub uploader: Option<String>,
    pub timestamp: Option<i64>,
    pub duration: Option<u64>,
    pub view_count: Option<u64>,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub content_url: Option<String>,
}

/// Find the most relevant JSON-LD object on the page.
///
/// `VideoObject` entries win; otherwise the first object carrying a name is
/// used. Malformed blocks are skipped. Returns an empty record when nothing
/// usable is found.
pub fn search_json_ld(html: &str) -> JsonLd {
    let mut candidates = Vec::new();
    for caps in JSON_LD_RE.captures_iter(html) {
        let Ok(value) = serde_json::from_str::<Value>(caps[1].trim()) else {
            continue;
        };
        collect_objects(value, &mut candidates);
    }

    candidates
        .iter()
        .find(|obj| has_type(obj, "VideoObject"))
        .or_else(|| {
            candidates
                .iter()
                .find(|obj| obj.get("name").or_else(|| obj.get("headline")).is_some())
        })
        .map(json_ld_from_object)
        .unwrap_or_default()
}

fn collect_objects(value: Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => items.into_iter().for_each(|item| collect_objects(item, out)),
        Value::Object(mut map) => {
            if let Some(graph) = map.remove("@graph") {
                collect_objects(graph, out);
            }
            out.push(Value::Object(map));
        }
        _ => {}
    }
}

fn has_type(obj: &Value, wanted: &str) -> bool {
    match obj.get("@type") {
        Some(Value::String(t)) => t == wanted,
        Some(Value::Array(types)) => types.iter().any(|t| t.as_str() == Some(wanted)),
        _ => false,
    }
}

fn text_field(obj: &Value, key: &str) -> Option<String> {
    let text = obj.get(key)?.as_str()?;
    let text = clean_html(text);
    (!text.is_empty()).then_some(text)
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        _ => Vec::new(),
    }
}

fn url_field(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => items.iter().find_map(|item| url_field(Some(item))),
        Value::Object(_) => value?.get("url").and_then(|u| url_field(Some(u))),
        _ => None,
    }
}

fn person_name(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => items.iter().find_map(|item| person_name(Some(item))),
        obj @ Value::Object(_) => text_field(obj, "name"),
        _ => None,
    }
}

fn count_value(value: &Value) -> Option<u64> {
    match value {
        Value::String(s) => str_to_int(s),
        other => int_or_none(other).and_then(|n| u64::try_from(n).ok()),
    }
}

fn watch_count(obj: &Value) -> Option<u64> {
    let is_watch = |stat: &Value| {
        let kind = stat.get("interactionType");
        let kind = kind
            .and_then(|k| k.as_str())
            .or_else(|| kind.and_then(|k| k.get("@type")).and_then(Value::as_str))
            .unwrap_or_default();
        kind.contains("WatchAction")
    };

    let from_stats = match obj.get("interactionStatistic") {
        Some(stats @ Value::Object(_)) if is_watch(stats) => stats.get("userInteractionCount"),
        Some(Value::Array(stats)) => stats
            .iter()
            .find(|s| is_watch(s))
            .and_then(|s| s.get("userInteractionCount")),
        _ => None,
    };
    from_stats
        .or_else(|| obj.get("interactionCount"))
        .and_then(count_value)
}

/// ISO-8601 or clock text, or a bare number of seconds
fn duration_value(value: &Value) -> Option<u64> {
    match value {
        Value::String(s) => parse_duration(s),
        other => int_or_none(other).and_then(|n| u64::try_from(n).ok()),
    }
}

fn json_ld_from_object(obj: &Value) -> JsonLd {
    JsonLd {
        title: text_field(obj, "name").or_else(|| text_field(obj, "headline")),
        description: text_field(obj, "description"),
        thumbnail: url_field(obj.get("thumbnailUrl")).or_else(|| url_field(obj.get("image"))),
        uploader: person_name(obj.get("author")),
        timestamp: obj
            .get("uploadDate")
            .or_else(|| obj.get("datePublished"))
            .and_then(Value::as_str)
            .and_then(unified_timestamp),
        duration: obj.get("duration").and_then(duration_value),
        view_count: watch_count(obj),
        categories: string_list(obj.get("genre")),
        tags: string_list(obj.get("keywords")),
        content_url: url_field(obj.get("contentUrl")),
    }
}
