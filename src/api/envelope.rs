//! JSON envelope shared by every route.

use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;

use crate::core::config::ResponseLimits;
use crate::core::error::AppError;
use crate::core::utils::truncate_chars;

/// `{ success, timestamp, data?, error?, hint?, cache? }`
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    /// RFC 3339, UTC.
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<&'static str>,
    /// Set only by cacheable routes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<bool>,
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            timestamp: now(),
            data: Some(data),
            error: None,
            hint: None,
            cache: None,
        }
    }

    pub fn cached(mut self, hit: bool) -> Self {
        self.cache = Some(hit);
        self
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Error envelope with the status picked by [`AppError::status`].
///
/// The message is cut to `max_chars` characters so upstream stderr never
/// floods the caller.
pub fn error_response(err: &AppError, max_chars: usize) -> Response {
    let status = err.status();
    if err.is_client_facing() {
        tracing::warn!(category = err.category(), status = status.as_u16(), "Request failed: {}", err);
    } else {
        tracing::error!(category = err.category(), status = status.as_u16(), "Request failed: {}", err);
    }

    let envelope: Envelope<()> = Envelope {
        success: false,
        timestamp: now(),
        data: None,
        error: Some(truncate_chars(&err.to_string(), max_chars)),
        hint: err.hint(),
        cache: None,
    };
    (status, Json(envelope)).into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error_response(&self, ResponseLimits::default().max_error_chars)
    }
}
