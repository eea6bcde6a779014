//! Route handlers.
//!
//! Each handler validates its input, calls one capability, shapes the result
//! and wraps it in an [`Envelope`]. Failures go through [`error_response`].

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use url::Url;

use super::client_ip::ClientIp;
use super::envelope::{error_response, Envelope};
use super::AppState;
use crate::core::error::{AppError, AppResult};
use crate::core::utils::format_duration;
use crate::instagram::{self, AccountSnapshot, SessionId};
use crate::normalize::{normalize, NormalizedResponse};
use crate::storage::cache_key;

/// Selector used when `format` is omitted, and by `/formats` and `/info`.
pub const DEFAULT_SELECTOR: &str = "best";

const MAX_SELECTOR_LEN: usize = 64;

/// Path prefix of the session route (`/sessionid={credential}`).
const SESSION_PREFIX: &str = "sessionid=";

const ENDPOINTS: &[(&str, &str)] = &[
    ("GET /", "Service metadata"),
    ("GET /download?url=<url>&format=<selector>", "Normalized media with grouped formats"),
    ("GET /formats?url=<url>", "Flat format listing"),
    ("GET /info?url=<url>", "Metadata only"),
    ("GET /test", "Extractor diagnostic"),
    ("GET /test/<username>", "Public profile probe"),
    ("GET /health", "Health check"),
    ("GET /status", "Uptime and cache statistics"),
    ("DELETE /cache", "Clear the result cache"),
    ("GET /sessionid=<session_id>", "Instagram account snapshot"),
];

#[derive(Debug, Default, Deserialize)]
pub struct MediaQuery {
    pub url: Option<String>,
    pub format: Option<String>,
}

fn reply(state: &AppState, result: AppResult<Response>) -> Response {
    match result {
        Ok(response) => response,
        Err(err) => error_response(&err, state.config.limits.max_error_chars),
    }
}

/// Requires a present, absolute `http`/`https` URL.
pub fn validate_url(raw: Option<&str>) -> AppResult<Url> {
    let raw = raw
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| AppError::InvalidInput("Missing 'url' parameter".to_string()))?;
    let url = Url::parse(raw).map_err(|e| AppError::InvalidInput(format!("Invalid URL: {}", e)))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        _ => Err(AppError::InvalidInput(
            "Only http and https URLs are supported".to_string(),
        )),
    }
}

/// Format selectors are passed through to lookups only, but are still kept
/// to a conservative yt-dlp-like alphabet.
pub fn validate_selector(raw: Option<&str>) -> AppResult<String> {
    let selector = raw.map(str::trim).filter(|s| !s.is_empty()).unwrap_or(DEFAULT_SELECTOR);
    let allowed = |c: char| c.is_ascii_alphanumeric() || "+/_-[]<>=.*".contains(c);
    if selector.chars().count() > MAX_SELECTOR_LEN || !selector.chars().all(allowed) {
        return Err(AppError::InvalidInput(format!("Invalid format selector: {}", selector)));
    }
    Ok(selector.to_string())
}

/// Cached normalized result for `(url, selector)`; the bool is true on a hit.
async fn resolve(
    state: &AppState,
    url: &Url,
    selector: &str,
    client: &ClientIp,
) -> AppResult<(Arc<NormalizedResponse>, bool)> {
    let client_part = if state.config.cache.per_client {
        client.as_key_part()
    } else {
        None
    };
    let key = cache_key(url.as_str(), selector, client_part.as_deref());

    if let Some(hit) = state.cache.get(&key) {
        tracing::debug!(%url, selector, "Cache hit");
        return Ok((hit, true));
    }

    let media = state
        .extractor
        .extract(url)
        .await?
        .ok_or_else(|| AppError::NotFound("No media information found for this URL".to_string()))?;

    let normalized = Arc::new(normalize(&media, url.as_str(), selector, &state.config.limits));
    tracing::info!(
        %url,
        platform = normalized.platform(),
        extractor = state.extractor.name(),
        "Extracted {:?}",
        media.title().unwrap_or_default()
    );
    state.cache.put(key, Arc::clone(&normalized));
    Ok((normalized, false))
}

/// GET /
pub async fn index(State(state): State<AppState>) -> Response {
    let endpoints: serde_json::Map<String, serde_json::Value> = ENDPOINTS
        .iter()
        .map(|(route, about)| (route.to_string(), json!(about)))
        .collect();

    Envelope::ok(json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "description": env!("CARGO_PKG_DESCRIPTION"),
        "extractor": state.extractor.name(),
        "endpoints": endpoints,
        "format_selectors": ["best", "audio", "<quality label, e.g. 720p>", "<format_id>"],
        "limits": state.config.limits,
        "cache_ttl_secs": state.config.cache.ttl_secs,
    }))
    .into_response()
}

async fn download_inner(state: &AppState, client: &ClientIp, query: &MediaQuery) -> AppResult<Response> {
    let url = validate_url(query.url.as_deref())?;
    let selector = validate_selector(query.format.as_deref())?;
    let (normalized, hit) = resolve(state, &url, &selector, client).await?;
    Ok(Envelope::ok(normalized.as_ref()).cached(hit).into_response())
}

/// GET /download
pub async fn download(State(state): State<AppState>, client: ClientIp, Query(query): Query<MediaQuery>) -> Response {
    let result = download_inner(&state, &client, &query).await;
    reply(&state, result)
}

async fn formats_inner(state: &AppState, client: &ClientIp, query: &MediaQuery) -> AppResult<Response> {
    let url = validate_url(query.url.as_deref())?;
    let (normalized, hit) = resolve(state, &url, DEFAULT_SELECTOR, client).await?;
    let listing = normalized.format_listing(state.config.limits.max_formats);
    Ok(Envelope::ok(listing).cached(hit).into_response())
}

/// GET /formats
pub async fn formats(State(state): State<AppState>, client: ClientIp, Query(query): Query<MediaQuery>) -> Response {
    let result = formats_inner(&state, &client, &query).await;
    reply(&state, result)
}

async fn info_inner(state: &AppState, client: &ClientIp, query: &MediaQuery) -> AppResult<Response> {
    let url = validate_url(query.url.as_deref())?;
    let (normalized, hit) = resolve(state, &url, DEFAULT_SELECTOR, client).await?;
    Ok(Envelope::ok(normalized.info()).cached(hit).into_response())
}

/// GET /info
pub async fn info(State(state): State<AppState>, client: ClientIp, Query(query): Query<MediaQuery>) -> Response {
    let result = info_inner(&state, &client, &query).await;
    reply(&state, result)
}

/// GET /test
pub async fn test_extractor(State(state): State<AppState>) -> Response {
    let result = state.extractor.version().await.map(|version| {
        Envelope::ok(json!({
            "extractor": state.extractor.name(),
            "version": version,
            "status": "ok",
        }))
        .into_response()
    });
    reply(&state, result)
}

async fn probe_inner(state: &AppState, username: &str) -> AppResult<Response> {
    let username = instagram::validate_username(username)?;
    let exists = state.accounts.probe_public(username).await?;
    let message = if exists {
        "Account exists"
    } else {
        "Account not found or private"
    };
    Ok(Envelope::ok(json!({
        "username": username,
        "exists": exists,
        "message": message,
    }))
    .into_response())
}

/// GET /test/{username}
pub async fn test_public_profile(State(state): State<AppState>, Path(username): Path<String>) -> Response {
    let result = probe_inner(&state, &username).await;
    reply(&state, result)
}

/// GET /health
pub async fn health() -> Response {
    let endpoints: Vec<&str> = ENDPOINTS.iter().map(|(route, _)| *route).collect();
    Envelope::ok(json!({
        "status": "healthy",
        "endpoints": endpoints,
    }))
    .into_response()
}

/// GET /status
pub async fn status(State(state): State<AppState>) -> Response {
    let uptime = state.started_at.elapsed();
    Envelope::ok(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": uptime.as_secs(),
        "uptime": format_duration(Some(uptime.as_secs_f64())),
        "extractor": state.extractor.name(),
        "cache": state.cache.stats(),
    }))
    .into_response()
}

/// DELETE /cache
pub async fn clear_cache(State(state): State<AppState>) -> Response {
    let removed = state.cache.clear();
    Envelope::ok(json!({ "removed": removed })).into_response()
}

#[derive(Debug, Serialize)]
struct SessionReport {
    #[serde(flatten)]
    snapshot: AccountSnapshot,
    processing_time_seconds: f64,
    session_id_preview: String,
}

async fn session_snapshot(state: &AppState, credential: &str) -> AppResult<Response> {
    let session = SessionId::parse(credential, state.config.instagram.min_session_len)?;
    let snapshot = state.accounts.fetch_snapshot(&session).await?;
    Ok(Envelope::ok(SessionReport {
        processing_time_seconds: snapshot.stats.processing_time,
        session_id_preview: session.preview(),
        snapshot,
    })
    .into_response())
}

/// GET /session/{credential}
pub async fn session(State(state): State<AppState>, Path(credential): Path<String>) -> Response {
    let result = session_snapshot(&state, &credential).await;
    reply(&state, result)
}

/// GET /{segment}: only `sessionid=<credential>` is served here.
pub async fn session_segment(State(state): State<AppState>, Path(segment): Path<String>) -> Response {
    let result = match segment.strip_prefix(SESSION_PREFIX) {
        Some(credential) => session_snapshot(&state, credential).await,
        None => Err(AppError::NotFound(format!("Unknown endpoint: /{}", segment))),
    };
    reply(&state, result)
}

/// Any other route.
pub async fn not_found() -> Response {
    AppError::NotFound("Unknown endpoint".to_string()).into_response()
}
