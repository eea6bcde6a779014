//! In-memory stand-ins for the extractor and the account fetcher.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use url::Url;

use mediagate::extract::{ExtractedMedia, MediaExtractor};
use mediagate::instagram::types::AccountInfo;
use mediagate::instagram::{AccountFetcher, AccountSnapshot, SessionId};
use mediagate::{AppError, AppResult};

/// What the mock extractor answers with.
pub enum ExtractorReply {
    Document(Value),
    Nothing,
    Fail(fn() -> AppError),
}

pub struct MockExtractor {
    reply: ExtractorReply,
    calls: AtomicUsize,
}

impl MockExtractor {
    pub fn returning(document: Value) -> Self {
        Self::with_reply(ExtractorReply::Document(document))
    }

    pub fn empty() -> Self {
        Self::with_reply(ExtractorReply::Nothing)
    }

    pub fn failing(make: fn() -> AppError) -> Self {
        Self::with_reply(ExtractorReply::Fail(make))
    }

    fn with_reply(reply: ExtractorReply) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaExtractor for MockExtractor {
    fn name(&self) -> &str {
        "mock"
    }

    async fn extract(&self, _url: &Url) -> Result<Option<ExtractedMedia>, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            ExtractorReply::Document(doc) => Ok(ExtractedMedia::from_value(doc.clone())?),
            ExtractorReply::Nothing => Ok(None),
            ExtractorReply::Fail(make) => Err(make()),
        }
    }

    async fn version(&self) -> Result<String, AppError> {
        Ok("2024.01.01".to_string())
    }
}

/// Accepts any session unless told otherwise; knows a fixed list of public profiles.
pub struct MockAccounts {
    pub known_users: Vec<String>,
    pub reject_sessions: bool,
}

impl Default for MockAccounts {
    fn default() -> Self {
        Self {
            known_users: vec!["existing_user".to_string()],
            reject_sessions: false,
        }
    }
}

#[async_trait]
impl AccountFetcher for MockAccounts {
    async fn fetch_snapshot(&self, _session: &SessionId) -> AppResult<AccountSnapshot> {
        if self.reject_sessions {
            return Err(AppError::Unauthorized("Session invalid. Status: 401".to_string()));
        }
        Ok(AccountSnapshot {
            account: AccountInfo {
                user_id: "42".to_string(),
                username: "someone".to_string(),
                ..Default::default()
            },
            ..Default::default()
        })
    }

    async fn probe_public(&self, username: &str) -> AppResult<bool> {
        Ok(self.known_users.iter().any(|u| u == username))
    }
}
