// tests/serper_http.rs
mod common;

use common::no_wait;
use gold_silver_intel::config::Secret;
use gold_silver_intel::ingest::providers::serper::SerperProvider;
use gold_silver_intel::ingest::run_once;
use gold_silver_intel::ingest::types::{Origin, SearchQuery, SourceProvider};
use gold_silver_intel::retry::TransientRule;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn query() -> SearchQuery {
    SearchQuery {
        query: "gold silver price".into(),
        result_count: 10,
        recency_window: "qdr:d".into(),
    }
}

const NEWS_BODY: &str = r#"{
  "news": [
    {"title": "Gold rallies as Fed holds", "link": "https://example.com/a", "snippet": "Spot gold rose 1%.", "source": "Reuters", "date": "2 hours ago"},
    {"title": "Silver tracks gold higher", "link": "https://example.com/b", "snippet": "Silver up 2%.", "source": "Kitco", "date": "3 hours ago"}
  ]
}"#;

#[tokio::test]
async fn news_request_carries_key_and_window() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/news"))
        .and(header("X-API-KEY", "serper-test-key"))
        .and(body_partial_json(serde_json::json!({
            "q": "gold silver price",
            "num": 10,
            "tbs": "qdr:d"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string(NEWS_BODY))
        .expect(1)
        .mount(&server)
        .await;

    let p = SerperProvider::news(Secret::new("serper-test-key")).with_base_url(server.uri());
    let items = p.fetch_latest(&query()).await.unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].title, "Gold rallies as Fed holds");
    assert_eq!(items[0].source, "Reuters");
    assert_eq!(items[0].published_at, "2 hours ago");
    assert_eq!(items[1].origin, Origin::News);
}

#[tokio::test]
async fn social_feed_uses_organic_search() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .and(body_partial_json(serde_json::json!({
            "q": "gold silver price (site:reddit.com)"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"organic":[{"title":"Stacking silver in 2026","link":"https://www.reddit.com/r/Silverbugs/x","snippet":"thoughts?"}]}"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let p = SerperProvider::social(Secret::new("k"), vec!["reddit.com".into()])
        .with_base_url(server.uri());
    let items = p.fetch_latest(&query()).await.unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].origin, Origin::Social);
    assert_eq!(items[0].source, "reddit.com");
}

#[tokio::test]
async fn unavailable_search_is_retried_then_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/news"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream busy"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/news"))
        .respond_with(ResponseTemplate::new(200).set_body_string(NEWS_BODY))
        .mount(&server)
        .await;

    let providers: Vec<Box<dyn SourceProvider>> = vec![Box::new(
        SerperProvider::news(Secret::new("k")).with_base_url(server.uri()),
    )];
    let out = run_once(&providers, &query(), &no_wait(3, TransientRule::statuses(&[429, 503]))).await;

    assert_eq!(out.items.len(), 2);
    assert!(out.failed_sources.is_empty());
    let received = server.received_requests().await.unwrap_or_default();
    assert_eq!(received.len(), 2);
}

#[tokio::test]
async fn bad_key_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/news"))
        .respond_with(ResponseTemplate::new(403).set_body_string(r#"{"message":"Unauthorized."}"#))
        .expect(1)
        .mount(&server)
        .await;

    let providers: Vec<Box<dyn SourceProvider>> = vec![Box::new(
        SerperProvider::news(Secret::new("wrong")).with_base_url(server.uri()),
    )];
    let out = run_once(&providers, &query(), &no_wait(3, TransientRule::statuses(&[429, 503]))).await;

    assert!(out.all_sources_failed());
    assert_eq!(out.failed_sources[0].1.status(), Some(403));
}
