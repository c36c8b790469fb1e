//! RedGifs API behaviour against a mock server: token refresh, rate-limit
//! backoff, error payloads and listing pagination.

mod common;

use common::{fast_settings, gif, gif_page, registry_for};
use serde_json::json;
use siteloader::{ExtractError, ExtractorSettings};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const WATCH_URL: &str = "https://www.redgifs.com/watch/SqueakyHelplessWisent";

fn gif_response() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "gif": gif("squeakyhelplesswisent") }))
}

async fn mount_token_limited(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/auth/temporary"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_token(server: &MockServer, token: &str, times: u64) {
    Mock::given(method("GET"))
        .and(path("/auth/temporary"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": token })))
        .up_to_n_times(times)
        .expect(times)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_single_gif_sends_api_headers() {
    let server = MockServer::start().await;
    mount_token(&server, "t1", 1).await;

    Mock::given(method("GET"))
        .and(path("/gifs/squeakyhelplesswisent"))
        .and(query_param("views", "yes"))
        .and(header("authorization", "Bearer t1"))
        .and(header("referer", "https://www.redgifs.com/"))
        .and(header("origin", "https://www.redgifs.com"))
        .and(header("x-customheader", "https://www.redgifs.com/watch/squeakyhelplesswisent"))
        .respond_with(gif_response())
        .expect(1)
        .mount(&server)
        .await;

    let registry = registry_for(&server, &fast_settings());
    let item = registry.extract(WATCH_URL).await.unwrap().into_media().unwrap();

    assert_eq!(item.id, "squeakyhelplesswisent");
    assert_eq!(item.title, "Hotwife Legs Thick");
    assert_eq!(item.upload_date.as_deref(), Some("20211107"));
    assert_eq!(item.formats.len(), 2);
    assert_eq!(item.formats[0].format_id.as_deref(), Some("sd"));
    assert_eq!(item.formats[0].height, Some(480));
    assert_eq!(item.formats[1].height, Some(1920));
}

#[tokio::test]
async fn test_401_refreshes_token_once() {
    let server = MockServer::start().await;
    mount_token(&server, "stale", 1).await;
    mount_token(&server, "fresh", 1).await;

    Mock::given(method("GET"))
        .and(path("/gifs/squeakyhelplesswisent"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gifs/squeakyhelplesswisent"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(gif_response())
        .expect(1)
        .mount(&server)
        .await;

    let registry = registry_for(&server, &fast_settings());
    let item = registry.extract(WATCH_URL).await.unwrap().into_media().unwrap();
    assert_eq!(item.id, "squeakyhelplesswisent");
}

#[tokio::test]
async fn test_second_401_fails() {
    let server = MockServer::start().await;
    mount_token(&server, "t", 2).await;

    Mock::given(method("GET"))
        .and(path("/gifs/squeakyhelplesswisent"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    let registry = registry_for(&server, &fast_settings());
    let err = registry.extract(WATCH_URL).await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert!(!err.is_expected());
}

#[tokio::test]
async fn test_missing_token_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/temporary"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "addr": "1.2.3.4" })))
        .mount(&server)
        .await;

    let registry = registry_for(&server, &fast_settings());
    let err = registry.extract(WATCH_URL).await.unwrap_err();
    assert!(matches!(err, ExtractError::Token));
    assert_eq!(err.to_string(), "Unable to get temporary token");
}

#[tokio::test]
async fn test_429_backs_off_then_succeeds() {
    let server = MockServer::start().await;
    mount_token(&server, "t", 1).await;

    Mock::given(method("GET"))
        .and(path("/gifs/squeakyhelplesswisent"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gifs/squeakyhelplesswisent"))
        .respond_with(gif_response())
        .expect(1)
        .mount(&server)
        .await;

    let registry = registry_for(&server, &fast_settings());
    let item = registry.extract(WATCH_URL).await.unwrap().into_media().unwrap();
    assert_eq!(item.id, "squeakyhelplesswisent");
}

#[tokio::test]
async fn test_token_429_backs_off_then_succeeds() {
    let server = MockServer::start().await;
    mount_token_limited(&server).await;
    mount_token(&server, "t", 1).await;

    Mock::given(method("GET"))
        .and(path("/gifs/squeakyhelplesswisent"))
        .and(header("authorization", "Bearer t"))
        .respond_with(gif_response())
        .expect(1)
        .mount(&server)
        .await;

    let registry = registry_for(&server, &fast_settings());
    let item = registry.extract(WATCH_URL).await.unwrap().into_media().unwrap();
    assert_eq!(item.id, "squeakyhelplesswisent");
}

#[tokio::test]
async fn test_token_429_during_refresh_backs_off() {
    let server = MockServer::start().await;
    mount_token(&server, "stale", 1).await;
    mount_token_limited(&server).await;
    mount_token(&server, "fresh", 1).await;

    Mock::given(method("GET"))
        .and(path("/gifs/squeakyhelplesswisent"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gifs/squeakyhelplesswisent"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(gif_response())
        .expect(1)
        .mount(&server)
        .await;

    let registry = registry_for(&server, &fast_settings());
    let item = registry.extract(WATCH_URL).await.unwrap().into_media().unwrap();
    assert_eq!(item.id, "squeakyhelplesswisent");
}

#[tokio::test]
async fn test_token_429_retry_budget_is_bounded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/temporary"))
        .respond_with(ResponseTemplate::new(429))
        .expect(2)
        .mount(&server)
        .await;

    let settings = ExtractorSettings {
        extractor_retries: 1,
        ..fast_settings()
    };
    let registry = registry_for(&server, &settings);
    let err = registry.extract(WATCH_URL).await.unwrap_err();
    assert_eq!(err.status(), Some(429));
}

#[tokio::test]
async fn test_gif_without_sources_has_no_media() {
    let server = MockServer::start().await;
    mount_token(&server, "t", 1).await;

    let mut bare = gif("squeakyhelplesswisent");
    bare["urls"] = json!({});
    Mock::given(method("GET"))
        .and(path("/gifs/squeakyhelplesswisent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "gif": bare })))
        .expect(1)
        .mount(&server)
        .await;

    let registry = registry_for(&server, &fast_settings());
    let err = registry.extract(WATCH_URL).await.unwrap_err();
    assert!(err.is_expected());
    assert!(matches!(err, ExtractError::NoMedia { ref id, .. } if id == "squeakyhelplesswisent"));
}

#[tokio::test]
async fn test_429_retry_budget_is_bounded() {
    let server = MockServer::start().await;
    mount_token(&server, "t", 1).await;

    // one first attempt plus two retries
    Mock::given(method("GET"))
        .and(path("/gifs/squeakyhelplesswisent"))
        .respond_with(ResponseTemplate::new(429))
        .expect(3)
        .mount(&server)
        .await;

    let settings = ExtractorSettings {
        extractor_retries: 2,
        ..fast_settings()
    };
    let registry = registry_for(&server, &settings);
    let err = registry.extract(WATCH_URL).await.unwrap_err();
    assert_eq!(err.status(), Some(429));
}

#[tokio::test]
async fn test_error_payload_is_not_retried() {
    let server = MockServer::start().await;
    mount_token(&server, "t", 1).await;

    Mock::given(method("GET"))
        .and(path("/gifs/squeakyhelplesswisent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": { "code": "NotFound", "message": "gif not found" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let registry = registry_for(&server, &fast_settings());
    let err = registry.extract(WATCH_URL).await.unwrap_err();
    assert!(err.is_expected());
    assert_eq!(
        err.to_string(),
        "squeakyhelplesswisent: RedGifs said: gif not found"
    );
}

#[tokio::test]
async fn test_search_short_page_ends_listing() {
    let server = MockServer::start().await;
    mount_token(&server, "t", 1).await;

    Mock::given(method("GET"))
        .and(path("/gifs/search"))
        .and(query_param("search_text", "Lesbian"))
        .and(query_param("order", "latest"))
        .and(query_param("type", "g"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gif_page("s", 3, None)))
        .expect(1)
        .mount(&server)
        .await;

    let registry = registry_for(&server, &fast_settings());
    let playlist = registry
        .extract("https://www.redgifs.com/browse?type=g&order=latest&tags=Lesbian")
        .await
        .unwrap()
        .into_playlist()
        .unwrap();

    assert_eq!(playlist.id, "type=g&order=latest&tags=Lesbian");
    assert_eq!(playlist.title.as_deref(), Some("Lesbian"));
    assert_eq!(
        playlist.description.as_deref(),
        Some("RedGifs search for Lesbian, ordered by latest")
    );
    let entries = playlist.entries.collect_all().await.unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].as_media().unwrap().id, "s0");
}

#[tokio::test]
async fn test_search_without_tags_is_rejected() {
    let server = MockServer::start().await;
    let registry = registry_for(&server, &fast_settings());

    let err = registry
        .extract("https://www.redgifs.com/browse?type=g&order=latest")
        .await
        .unwrap_err();
    assert!(err.is_expected());
    assert_eq!(err.to_string(), "Invalid query tags");
}

#[tokio::test]
async fn test_user_listing_full_pages_continue() {
    let server = MockServer::start().await;
    mount_token(&server, "t", 1).await;

    for (page, count) in [("1", 80), ("2", 80), ("3", 0)] {
        Mock::given(method("GET"))
            .and(path("/users/lamsinka89/search"))
            .and(query_param("order", "recent"))
            .and(query_param("page", page))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(gif_page(&format!("p{page}-"), count, None)),
            )
            .expect(1)
            .mount(&server)
            .await;
    }

    let registry = registry_for(&server, &fast_settings());
    let playlist = registry
        .extract("https://www.redgifs.com/users/lamsinka89")
        .await
        .unwrap()
        .into_playlist()
        .unwrap();
    assert_eq!(playlist.id, "lamsinka89");
    assert_eq!(
        playlist.description.as_deref(),
        Some("RedGifs user lamsinka89, ordered by recent")
    );
    assert_eq!(playlist.entries.collect_all().await.unwrap().len(), 160);
}

#[tokio::test]
async fn test_user_listing_is_lazy() {
    let server = MockServer::start().await;
    mount_token(&server, "t", 1).await;

    Mock::given(method("GET"))
        .and(path("/users/lamsinka89/search"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gif_page("a", 80, None)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/lamsinka89/search"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gif_page("b", 80, None)))
        .expect(0)
        .mount(&server)
        .await;

    let registry = registry_for(&server, &fast_settings());
    let playlist = registry
        .extract("https://www.redgifs.com/users/lamsinka89")
        .await
        .unwrap()
        .into_playlist()
        .unwrap();
    let first = playlist.entries.take(10).await.unwrap();
    assert_eq!(first.len(), 10);
}

#[tokio::test]
async fn test_explicit_page_fetches_only_that_page() {
    let server = MockServer::start().await;
    mount_token(&server, "t", 1).await;

    Mock::given(method("GET"))
        .and(path("/users/lamsinka89/search"))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gif_page("c", 80, None)))
        .expect(1)
        .mount(&server)
        .await;

    let registry = registry_for(&server, &fast_settings());
    let playlist = registry
        .extract("https://www.redgifs.com/users/lamsinka89?page=3")
        .await
        .unwrap()
        .into_playlist()
        .unwrap();
    assert_eq!(playlist.id, "lamsinka89?page=3");
    assert_eq!(playlist.entries.collect_all().await.unwrap().len(), 80);
}

#[tokio::test]
async fn test_niche_honours_declared_page_total() {
    let server = MockServer::start().await;
    mount_token(&server, "t", 1).await;

    Mock::given(method("GET"))
        .and(path("/niches/hot-guys"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "niche": { "name": "Hot Guys", "description": "Guys who are hot" }
        })))
        .expect(1)
        .mount(&server)
        .await;
    for page in ["1", "2"] {
        Mock::given(method("GET"))
            .and(path("/niches/hot-guys/gifs"))
            .and(query_param("page", page))
            .respond_with(ResponseTemplate::new(200).set_body_json(gif_page(page, 100, Some(2))))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/niches/hot-guys/gifs"))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gif_page("3", 100, Some(2))))
        .expect(0)
        .mount(&server)
        .await;

    let registry = registry_for(&server, &fast_settings());
    let playlist = registry
        .extract("https://www.redgifs.com/niches/hot-guys")
        .await
        .unwrap()
        .into_playlist()
        .unwrap();
    assert_eq!(playlist.id, "hot-guys");
    assert_eq!(playlist.title.as_deref(), Some("Hot Guys"));
    assert!(playlist
        .description
        .as_deref()
        .unwrap()
        .starts_with("RedGifs niche Hot Guys, ordered by recent"));
    assert_eq!(playlist.entries.collect_all().await.unwrap().len(), 200);
}
