//! Router-level tests: every route driven through `oneshot` against mocks.

mod common;

use axum::http::{Method, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

use common::{call, get, test_app, test_app_with, MockAccounts, MockExtractor};
use mediagate::extract::ytdlp_errors::{analyze_ytdlp_error, ExtractorErrorKind};
use mediagate::{AppError, Config};

const SESSION: &str = "49700912482%3AnSBO4UFLiJQa2U%3A12%3AAYjDOAYFYdvCo";

fn video_doc() -> serde_json::Value {
    json!({
        "id": "abc123",
        "title": "Clip",
        "uploader": "Author",
        "duration": 3725,
        "webpage_url": "https://www.tiktok.com/@user/video/1",
        "formats": [
            {"format_id": "low", "ext": "mp4", "height": 360, "url": "https://cdn/low.mp4",
             "vcodec": "h264", "acodec": "aac", "filesize": 1048576},
            {"format_id": "hd-a", "ext": "mp4", "height": 1080, "url": "https://cdn/a.mp4",
             "vcodec": "h264", "acodec": "aac"},
            {"format_id": "hd-b", "ext": "mp4", "height": 1080, "url": "https://cdn/b.mp4",
             "vcodec": "h264", "acodec": "aac", "filesize": 52428800},
            {"format_id": "hd-c", "ext": "mp4", "height": 1080, "url": "https://cdn/c.mp4",
             "vcodec": "h264", "acodec": "aac", "filesize": 125829120},
            {"format_id": "audio", "ext": "m4a", "url": "https://cdn/audio.m4a",
             "vcodec": "none", "acodec": "aac", "resolution": "audio only"},
            {"format_id": "nourl", "ext": "mp4", "height": 720}
        ]
    })
}

fn app_with(extractor: MockExtractor) -> (axum::Router, Arc<MockExtractor>) {
    let extractor = Arc::new(extractor);
    let (app, _) = test_app(Arc::clone(&extractor), Arc::new(MockAccounts::default()));
    (app, extractor)
}

#[tokio::test]
async fn test_download_normalizes_and_groups() {
    let (app, _) = app_with(MockExtractor::returning(video_doc()));
    let (status, body) = get(&app, "/download?url=https://www.tiktok.com/@user/video/1").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["cache"], false);

    let data = &body["data"];
    assert_eq!(data["type"], "video");
    assert_eq!(data["platform"], "TikTok");
    assert_eq!(data["duration"], "01:02:05");
    assert_eq!(data["format_count"], 5);

    let groups: Vec<&str> = data["formats"]
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["quality"].as_str().unwrap())
        .collect();
    assert_eq!(groups, vec!["1080p", "360p", "unknown"]);

    let best_1080 = data["best_per_quality"]
        .as_array()
        .unwrap()
        .iter()
        .find(|b| b["quality"] == "1080p")
        .unwrap();
    assert_eq!(best_1080["format_id"], "hd-c");
    assert_eq!(best_1080["size_mb"], 120.0);

    assert_eq!(data["selected"]["format_id"], "hd-c");
}

#[tokio::test]
async fn test_download_applies_selector() {
    let (app, _) = app_with(MockExtractor::returning(video_doc()));

    let (_, body) = get(&app, "/download?url=https://www.tiktok.com/@user/video/1&format=audio").await;
    assert_eq!(body["data"]["selected"]["format_id"], "audio");

    let (_, body) = get(&app, "/download?url=https://www.tiktok.com/@user/video/1&format=360p").await;
    assert_eq!(body["data"]["selected"]["format_id"], "low");

    let (_, body) = get(&app, "/download?url=https://www.tiktok.com/@user/video/1&format=nothing").await;
    assert!(body["data"]["selected"].is_null());
}

#[tokio::test]
async fn test_second_call_is_served_from_cache() {
    let (app, extractor) = app_with(MockExtractor::returning(video_doc()));
    let uri = "/download?url=https://youtu.be/dQw4w9WgXcQ";

    let (_, first) = get(&app, uri).await;
    let (_, second) = get(&app, uri).await;

    assert_eq!(first["cache"], false);
    assert_eq!(second["cache"], true);
    assert_eq!(first["data"], second["data"]);
    assert_eq!(extractor.calls(), 1);

    // A different selector is a different key.
    let (_, third) = get(&app, "/download?url=https://youtu.be/dQw4w9WgXcQ&format=720p").await;
    assert_eq!(third["cache"], false);
    assert_eq!(extractor.calls(), 2);
}

#[tokio::test]
async fn test_formats_and_info_share_the_default_entry() {
    let (app, extractor) = app_with(MockExtractor::returning(video_doc()));

    let (status, formats) = get(&app, "/formats?url=https://youtu.be/x").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(formats["cache"], false);
    assert_eq!(formats["data"]["total"], 5);
    assert_eq!(formats["data"]["returned"], 5);
    assert_eq!(formats["data"]["formats"][0]["quality"], "1080p");

    let (_, info) = get(&app, "/info?url=https://youtu.be/x").await;
    assert_eq!(info["cache"], true);
    assert_eq!(info["data"]["title"], "Clip");
    assert_eq!(info["data"]["platform"], "YouTube");
    assert!(info["data"].get("formats").is_none());
    assert_eq!(extractor.calls(), 1);
}

#[tokio::test]
async fn test_formats_listing_is_capped() {
    let mut config = Config::default();
    config.limits.max_formats = 2;
    let extractor = Arc::new(MockExtractor::returning(video_doc()));
    let (app, _) = test_app_with(config, extractor, Arc::new(MockAccounts::default()));

    let (_, body) = get(&app, "/formats?url=https://youtu.be/x").await;
    assert_eq!(body["data"]["total"], 5);
    assert_eq!(body["data"]["returned"], 2);
    assert_eq!(body["data"]["formats"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_missing_or_bad_url_is_rejected_without_extraction() {
    let (app, extractor) = app_with(MockExtractor::returning(video_doc()));

    let (status, body) = get(&app, "/download").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Missing 'url' parameter");
    assert!(body.get("data").is_none());

    let (status, _) = get(&app, "/download?url=ftp://example.com/a").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(&app, "/download?url=https://youtu.be/x&format=best%3Brm").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(extractor.calls(), 0);
}

#[tokio::test]
async fn test_no_metadata_is_not_found() {
    let (app, _) = app_with(MockExtractor::empty());
    let (status, body) = get(&app, "/download?url=https://example.org/nothing").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert!(body.get("data").is_none());
}

#[tokio::test]
async fn test_extraction_errors_map_to_statuses() {
    let (app, _) = app_with(MockExtractor::failing(|| AppError::Extraction {
        kind: ExtractorErrorKind::BotDetection,
        message: "Sign in to confirm you're not a bot".to_string(),
    }));
    let (status, body) = get(&app, "/download?url=https://youtu.be/x").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["hint"].is_string());

    let (app, _) = app_with(MockExtractor::failing(|| AppError::Timeout("yt-dlp timed out after 30s".into())));
    let (status, _) = get(&app, "/download?url=https://youtu.be/x").await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
}

fn unrecognized_extractor_failure() -> AppError {
    let stderr = "ERROR: [instagram] Cxyz: Unable to extract shared data; please report this issue";
    AppError::Extraction {
        kind: analyze_ytdlp_error(stderr),
        message: "Unable to extract shared data".to_string(),
    }
}

#[tokio::test]
async fn test_unrecognized_extraction_failure_is_not_found() {
    let (app, _) = app_with(MockExtractor::failing(unrecognized_extractor_failure));
    let (status, body) = get(&app, "/download?url=https://www.instagram.com/p/Cxyz/").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Unable to extract shared data");
    assert!(body["hint"].is_string());
    assert!(body.get("data").is_none());
}

fn exploding_extraction() -> AppError {
    panic!("extractor exploded")
}

#[tokio::test]
async fn test_handler_panic_becomes_error_envelope() {
    let (app, _) = app_with(MockExtractor::failing(exploding_extraction));
    let (status, body) = get(&app, "/download?url=https://youtu.be/x").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert!(body["timestamp"].is_string());
    assert!(!body["error"].as_str().unwrap().contains("exploded"));
}

#[tokio::test]
async fn test_error_text_is_truncated() {
    let (app, _) = app_with(MockExtractor::failing(|| AppError::Extraction {
        kind: ExtractorErrorKind::Unknown,
        message: "x".repeat(1000),
    }));
    let (status, body) = get(&app, "/download?url=https://youtu.be/x").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"].as_str().unwrap().chars().count(), 200);
}

#[tokio::test]
async fn test_failures_are_not_cached() {
    let (app, extractor) = app_with(MockExtractor::empty());
    get(&app, "/download?url=https://youtu.be/x").await;
    get(&app, "/download?url=https://youtu.be/x").await;
    assert_eq!(extractor.calls(), 2);
}

#[tokio::test]
async fn test_playlist_documents() {
    let doc = json!({
        "_type": "playlist",
        "id": "PL1",
        "title": "Mix",
        "entries": [
            {"id": "a", "title": "First", "duration": 61, "url": "https://youtu.be/a"},
            {"id": "b", "url": "https://youtu.be/b"}
        ]
    });
    let (app, _) = app_with(MockExtractor::returning(doc));
    let (status, body) = get(&app, "/download?url=https://www.youtube.com/playlist?list=PL1").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["type"], "playlist");
    assert_eq!(body["data"]["entry_count"], 2);
    assert_eq!(body["data"]["entries"][0]["duration"], "01:01");
    assert_eq!(body["data"]["entries"][1]["title"], "Untitled");
}

#[tokio::test]
async fn test_cache_status_and_clear() {
    let (app, extractor) = app_with(MockExtractor::returning(video_doc()));
    get(&app, "/download?url=https://youtu.be/x").await;
    get(&app, "/download?url=https://youtu.be/x").await;

    let (status, body) = get(&app, "/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["extractor"], "mock");
    assert_eq!(body["data"]["cache"]["size"], 1);
    assert_eq!(body["data"]["cache"]["hits"], 1);
    assert_eq!(body["data"]["cache"]["capacity"], 100);

    let (status, body) = call(&app, Method::DELETE, "/cache").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["removed"], 1);

    let (_, body) = get(&app, "/download?url=https://youtu.be/x").await;
    assert_eq!(body["cache"], false);
    assert_eq!(extractor.calls(), 2);
}

#[tokio::test]
async fn test_per_client_cache_keys() {
    let mut config = Config::default();
    config.cache.per_client = true;
    let extractor = Arc::new(MockExtractor::returning(video_doc()));
    let (app, _) = test_app_with(config, Arc::clone(&extractor), Arc::new(MockAccounts::default()));

    let request = |ip: &'static str| {
        axum::http::Request::builder()
            .uri("/download?url=https://youtu.be/x")
            .header("x-forwarded-for", ip)
            .body(axum::body::Body::empty())
            .unwrap()
    };

    use tower::ServiceExt;
    app.clone().oneshot(request("203.0.113.1")).await.unwrap();
    app.clone().oneshot(request("203.0.113.1")).await.unwrap();
    assert_eq!(extractor.calls(), 1);

    app.clone().oneshot(request("203.0.113.2")).await.unwrap();
    assert_eq!(extractor.calls(), 2);
}

#[tokio::test]
async fn test_service_routes() {
    let (app, _) = app_with(MockExtractor::empty());

    let (status, body) = get(&app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["service"], "mediagate");
    assert_eq!(body["data"]["limits"]["max_formats"], 50);

    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "healthy");
    assert!(body.get("cache").is_none());

    let (status, body) = get(&app, "/test").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["version"], "2024.01.01");

    let (status, body) = get(&app, "/no/such/route").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_public_profile_probe() {
    let (app, _) = app_with(MockExtractor::empty());

    let (status, body) = get(&app, "/test/existing_user").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["exists"], true);

    let (_, body) = get(&app, "/test/missing_user").await;
    assert_eq!(body["data"]["exists"], false);
    assert_eq!(body["data"]["message"], "Account not found or private");

    let (status, _) = get(&app, "/test/bad%20name").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_session_routes() {
    let (app, _) = app_with(MockExtractor::empty());

    let (status, body) = get(&app, &format!("/sessionid={}", SESSION)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["account"]["username"], "someone");
    assert!(body["data"]["session_id_preview"].as_str().unwrap().ends_with("..."));
    assert!(body["data"]["processing_time_seconds"].is_number());

    let (status, body) = get(&app, &format!("/session/{}", SESSION)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["account"]["user_id"], "42");

    let (status, body) = get(&app, "/sessionid=short").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid session ID format");

    let (status, _) = get(&app, "/unknownthing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rejected_session_is_unauthorized() {
    let accounts = MockAccounts {
        reject_sessions: true,
        ..Default::default()
    };
    let (app, _) = test_app(Arc::new(MockExtractor::empty()), Arc::new(accounts));

    let (status, body) = get(&app, &format!("/sessionid={}", SESSION)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Session invalid. Status: 401");
    assert!(body["hint"].as_str().unwrap().contains("session"));
}
