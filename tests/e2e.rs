//! End-to-end tests for the relay
//!
//! Starts a real Axum server on a random port, backed by the Invidious
//! provider pointed at a wiremock server, and exercises the full HTTP
//! pipeline with reqwest.

use serde_json::{Value, json};
use std::net::SocketAddr;
use tuberelay::config::{Config, UpstreamType};
use tuberelay::server::{build_router, state::AppState};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Test server helpers ───────────────────────────────────────────────────────

/// Spin up the relay with the Invidious upstream at `upstream`.
async fn start_server(upstream: &MockServer, cache_ttl_secs: u64) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test server");
    let addr = listener.local_addr().unwrap();

    let config = Config {
        port: 0,
        allowed_origins: vec!["http://localhost:5500".to_string()],
        cache_ttl_secs,
        cache_max_entries: 100,
        cache_sweep_secs: 0,
        upstream: UpstreamType::Invidious,
        invidious_url: Some(upstream.uri()),
        ytdlp_path: "yt-dlp".to_string(),
        upstream_timeout_secs: Some(5),
        search_page_size: 20,
    };

    let state = AppState::new(config).expect("Invidious client should build");
    let app = build_router(state);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    addr
}

fn search_page() -> Value {
    json!([
        {
            "type": "video",
            "videoId": "abc123",
            "title": "Lofi beats",
            "author": "Chill Cat",
            "lengthSeconds": 215,
            "viewCount": 1200,
            "publishedText": "2 years ago",
            "videoThumbnails": [{ "quality": "high", "url": "https://img.example.com/abc123.jpg", "width": 480 }]
        },
        { "type": "video", "videoId": "def456", "title": "Rainy night" },
        { "type": "video", "videoId": "ghi789", "title": "Study", "author": "Owl", "lengthSeconds": 3725 }
    ])
}

async fn mount_search(upstream: &MockServer, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/api/v1/search"))
        .and(query_param("q", "lofi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_page()))
        .expect(expected_calls)
        .mount(upstream)
        .await;
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_check() {
    let upstream = MockServer::start().await;
    let addr = start_server(&upstream, 900).await;

    let resp = reqwest::get(format!("http://{}/api/health", addr))
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["cacheSize"], 0);
}

#[tokio::test]
async fn search_pipeline_normalizes_and_caches() {
    let upstream = MockServer::start().await;
    // Second request must be served from cache
    mount_search(&upstream, 1).await;
    let addr = start_server(&upstream, 900).await;
    let client = reqwest::Client::new();

    let url = format!("http://{}/api/search?q=lofi&limit=2", addr);
    let first: Value = client.get(&url).send().await.unwrap().json().await.unwrap();
    let second: Value = client.get(&url).send().await.unwrap().json().await.unwrap();

    assert_eq!(first, second);
    let videos = first.as_array().unwrap();
    assert_eq!(videos.len(), 2);
    assert_eq!(videos[0]["id"], "abc123");
    assert_eq!(videos[0]["duration"], "3:35");
    assert_eq!(videos[0]["artist"], "Chill Cat");
    assert_eq!(videos[0]["views"], 1200);
    assert_eq!(videos[0]["uploadDate"], "2 years ago");
    assert_eq!(videos[0]["thumbnail"], "https://img.example.com/abc123.jpg");
    assert_eq!(videos[1]["id"], "def456");
    assert_eq!(videos[1]["artist"], "Unknown");
    assert_eq!(videos[1]["duration"], "0:00");
    assert!(videos[1].get("thumbnail").is_none());
    assert!(videos[1].get("views").is_none());

    let health: Value = client
        .get(format!("http://{}/api/health", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["cacheSize"], 1);

    upstream.verify().await;
}

#[tokio::test]
async fn expired_entry_requeries_upstream() {
    let upstream = MockServer::start().await;
    mount_search(&upstream, 2).await;
    // Zero TTL: every entry is stale as soon as it is written
    let addr = start_server(&upstream, 0).await;
    let client = reqwest::Client::new();

    let url = format!("http://{}/api/search?q=lofi", addr);
    for _ in 0..2 {
        let resp = client.get(&url).send().await.unwrap();
        assert_eq!(resp.status(), 200);
    }

    let health: Value = client
        .get(format!("http://{}/api/health", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["cacheSize"], 1, "Stale entry is overwritten, not duplicated");

    upstream.verify().await;
}

#[tokio::test]
async fn search_upstream_error_is_500() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/search"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&upstream)
        .await;
    let addr = start_server(&upstream, 900).await;

    let resp = reqwest::get(format!("http://{}/api/search?q=lofi", addr))
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Search failed");
    assert!(body["details"].is_string());
}

#[tokio::test]
async fn video_pipeline_selects_audio_stream() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/videos/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "title": "Lofi beats",
            "author": "Chill Cat",
            "lengthSeconds": "215",
            "videoThumbnails": [
                { "url": "https://img.example.com/maxres.jpg", "width": 1280 },
                { "url": "https://img.example.com/default.jpg", "width": 120 },
                { "url": "https://img.example.com/medium.jpg", "width": 320 }
            ],
            "adaptiveFormats": [
                { "url": "https://media.example.com/140", "itag": "140", "type": "audio/mp4; codecs=\"mp4a.40.2\"", "bitrate": "130000", "audioSampleRate": "44100" },
                { "url": "https://media.example.com/251", "itag": "251", "type": "audio/webm; codecs=\"opus\"", "bitrate": "160000", "audioSampleRate": "48000" },
                { "url": "https://media.example.com/137", "itag": "137", "type": "video/mp4; codecs=\"avc1.640028\"", "bitrate": "4000000" }
            ]
        })))
        .expect(2)
        .mount(&upstream)
        .await;
    let addr = start_server(&upstream, 900).await;
    let client = reqwest::Client::new();

    let url = format!("http://{}/api/video/abc123", addr);
    let body: Value = client.get(&url).send().await.unwrap().json().await.unwrap();

    assert_eq!(body["id"], "abc123");
    assert_eq!(body["duration"], 215);
    assert_eq!(body["thumbnail"], "https://img.example.com/maxres.jpg");
    assert_eq!(body["streamUrl"], "https://media.example.com/251");
    assert_eq!(body["formats"].as_array().unwrap().len(), 2);

    // Stream info is never cached
    let resp = client.get(&url).send().await.unwrap();
    assert_eq!(resp.status(), 200);

    upstream.verify().await;
}

#[tokio::test]
async fn video_upstream_error_is_generic_500() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&upstream)
        .await;
    let addr = start_server(&upstream, 900).await;

    let resp = reqwest::get(format!("http://{}/api/video/missing", addr))
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Failed to get video info" }));
}

#[tokio::test]
async fn foreign_origin_is_rejected() {
    let upstream = MockServer::start().await;
    mount_search(&upstream, 0).await;
    let addr = start_server(&upstream, 900).await;

    let resp = reqwest::Client::new()
        .get(format!("http://{}/api/search?q=lofi", addr))
        .header("Origin", "https://evil.example.com")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    upstream.verify().await;
}
