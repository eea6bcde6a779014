//! Common test utilities
//!
//! Mock capabilities and helpers shared by the integration tests.

#![allow(dead_code)]

pub mod mocks;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use mediagate::api::{self, AppState};
use mediagate::Config;

pub use mocks::{MockAccounts, MockExtractor};

/// Router over the given mocks with default configuration.
pub fn test_app(extractor: Arc<MockExtractor>, accounts: Arc<MockAccounts>) -> (Router, AppState) {
    test_app_with(Config::default(), extractor, accounts)
}

pub fn test_app_with(config: Config, extractor: Arc<MockExtractor>, accounts: Arc<MockAccounts>) -> (Router, AppState) {
    let state = AppState::new(config, extractor, accounts);
    (api::router(state.clone()), state)
}

/// Send one request and decode the JSON envelope.
pub async fn call(app: &Router, method: Method, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    call(app, Method::GET, uri).await
}
