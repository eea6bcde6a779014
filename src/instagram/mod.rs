//! Instagram account fetcher.
//!
//! A session cookie is turned into an [`AccountSnapshot`]: account and
//! profile details, posts, followers, following, stories, liked and saved
//! posts, and comments. Only the first call (the current account) is
//! mandatory; every later section tolerates upstream failures and keeps what
//! was gathered.

pub mod client;
pub mod types;

pub use client::InstagramClient;
pub use types::AccountSnapshot;

use crate::core::error::{AppError, AppResult};
use crate::core::utils;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

/// Characters of a session id shown in logs and responses.
pub const SESSION_PREVIEW_CHARS: usize = 30;

/// Longest username Instagram accepts.
const MAX_USERNAME_LEN: usize = 30;

/// Validated Instagram `sessionid` cookie value.
///
/// The raw value is only reachable through [`SessionId::expose`]; `Debug`
/// output stays redacted.
#[derive(Debug)]
pub struct SessionId(SecretString);

impl SessionId {
    /// Rejects values shorter than `min_len` characters or containing
    /// characters that cannot travel in a cookie header.
    pub fn parse(raw: &str, min_len: usize) -> AppResult<Self> {
        let trimmed = raw.trim();
        if trimmed.chars().count() < min_len {
            return Err(AppError::InvalidInput("Invalid session ID format".to_string()));
        }
        if !trimmed
            .chars()
            .all(|c| c.is_ascii_graphic() && c != ';' && c != ',' && c != '"' && c != '\\')
        {
            return Err(AppError::InvalidInput(
                "Session ID contains characters not allowed in a cookie".to_string(),
            ));
        }
        Ok(Self(SecretString::from(trimmed.to_string())))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// First [`SESSION_PREVIEW_CHARS`] characters followed by `...`.
    pub fn preview(&self) -> String {
        utils::preview(self.expose(), SESSION_PREVIEW_CHARS)
    }
}

/// Checks a public username before it is put into an upstream URL.
pub fn validate_username(username: &str) -> AppResult<&str> {
    let valid = !username.is_empty()
        && username.len() <= MAX_USERNAME_LEN
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_');
    if valid {
        Ok(username)
    } else {
        Err(AppError::InvalidInput(format!("Invalid username: {}", username)))
    }
}

/// Upstream account capability used by the HTTP layer.
#[async_trait]
pub trait AccountFetcher: Send + Sync {
    /// Gathers the full snapshot for the session.
    ///
    /// Fails with [`AppError::Unauthorized`] when the session is rejected.
    async fn fetch_snapshot(&self, session: &SessionId) -> AppResult<AccountSnapshot>;

    /// Whether a public profile answers for `username`.
    async fn probe_public(&self, username: &str) -> AppResult<bool>;
}
