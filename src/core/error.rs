use axum::http::StatusCode;
use thiserror::Error;

use crate::extract::ytdlp_errors::ExtractorErrorKind;

/// Centralized error type for the gateway.
///
/// Every failure is converted to this enum before it reaches the transport
/// layer, where [`AppError::status`] picks the HTTP status and
/// [`AppError::hint`] an optional human-readable hint for the envelope.
///
/// # Example
///
/// ```
/// use mediagate::core::error::AppError;
///
/// let err = AppError::InvalidInput("Missing 'url' parameter".into());
/// assert_eq!(err.status().as_u16(), 400);
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or malformed request parameter; no upstream call was made
    #[error("{0}")]
    InvalidInput(String),

    /// The upstream rejected the credential
    #[error("{0}")]
    Unauthorized(String),

    /// The upstream has nothing for this input
    #[error("{0}")]
    NotFound(String),

    /// yt-dlp failed after the fallback attempt
    #[error("{message}")]
    Extraction { kind: ExtractorErrorKind, message: String },

    /// A capability call exceeded its timeout
    #[error("{0}")]
    Timeout(String),

    /// HTTP/Fetch errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream returned a body we could not decode
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO errors (process spawn, pipes)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Anything else raised while shaping the response
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// HTTP status matching the failure class.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Extraction { kind, .. } => match kind {
                ExtractorErrorKind::InvalidCookies | ExtractorErrorKind::BotDetection => StatusCode::UNAUTHORIZED,
                ExtractorErrorKind::VideoUnavailable
                | ExtractorErrorKind::NetworkError
                | ExtractorErrorKind::Unknown => StatusCode::NOT_FOUND,
            },
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Http(_) | AppError::Json(_) | AppError::Io(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Short label used in logs.
    pub fn category(&self) -> &'static str {
        match self {
            AppError::InvalidInput(_) => "invalid_input",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::NotFound(_) => "not_found",
            AppError::Extraction { .. } => "extraction",
            AppError::Timeout(_) => "timeout",
            AppError::Http(_) => "http",
            AppError::Json(_) => "json",
            AppError::Io(_) => "io",
            AppError::Internal(_) => "internal",
        }
    }

    /// Human-readable advice for the caller, when there is any.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            AppError::Unauthorized(_) => {
                Some("Make sure the session ID is not expired, or wait 5-10 minutes if rate limited")
            }
            AppError::Extraction { kind, .. } => Some(kind.hint()),
            AppError::Timeout(_) => Some("The upstream took too long to answer, try again later"),
            _ => None,
        }
    }

    /// Whether this failure is the caller's or upstream's fault rather than ours.
    pub fn is_client_facing(&self) -> bool {
        !self.status().is_server_error() || matches!(self, AppError::Extraction { .. } | AppError::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::InvalidInput("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Unauthorized("x".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Timeout("x".into()).status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            AppError::Internal("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_extraction_status_follows_kind() {
        let unavailable = AppError::Extraction {
            kind: ExtractorErrorKind::VideoUnavailable,
            message: "gone".into(),
        };
        assert_eq!(unavailable.status(), StatusCode::NOT_FOUND);
        assert!(unavailable.hint().is_some());

        let cookies = AppError::Extraction {
            kind: ExtractorErrorKind::InvalidCookies,
            message: "sign in".into(),
        };
        assert_eq!(cookies.status(), StatusCode::UNAUTHORIZED);

        let network = AppError::Extraction {
            kind: ExtractorErrorKind::NetworkError,
            message: "dns".into(),
        };
        assert_eq!(network.status(), StatusCode::NOT_FOUND);

        let unknown = AppError::Extraction {
            kind: ExtractorErrorKind::Unknown,
            message: "Unable to extract shared data".into(),
        };
        assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
        assert!(unknown.is_client_facing());
        assert_eq!(unknown.hint(), Some(ExtractorErrorKind::Unknown.hint()));
    }

    #[test]
    fn test_display_is_bare_message() {
        let err = AppError::NotFound("No metadata returned for this URL".into());
        assert_eq!(err.to_string(), "No metadata returned for this URL");
        assert_eq!(err.category(), "not_found");
    }

    #[test]
    fn test_client_facing() {
        assert!(AppError::InvalidInput("x".into()).is_client_facing());
        assert!(AppError::Timeout("x".into()).is_client_facing());
        assert!(!AppError::Internal("x".into()).is_client_facing());
    }
}
