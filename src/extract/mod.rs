//! Media extraction capability.
//!
//! The gateway never talks to video platforms itself. It asks a
//! [`MediaExtractor`] for the metadata of a URL and gets back an
//! [`ExtractedMedia`] that has already been validated at the boundary.
//!
//! Built-in backend:
//! - `YtDlpExtractor`: shells out to yt-dlp with a timeout and one fallback attempt

pub mod raw;
pub mod ytdlp;
pub mod ytdlp_errors;

use crate::core::error::AppError;
use async_trait::async_trait;
use url::Url;

pub use raw::{ExtractedMedia, RawEntry, RawFormat, RawPlaylist, RawVideo};
pub use ytdlp::YtDlpExtractor;

/// Trait for extraction backends.
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    /// Human-readable name of this backend (e.g. "yt-dlp")
    fn name(&self) -> &str;

    /// Fetch metadata and formats for `url`.
    ///
    /// `Ok(None)` means the backend ran fine but found nothing.
    async fn extract(&self, url: &Url) -> Result<Option<ExtractedMedia>, AppError>;

    /// Backend version string, used by the diagnostic endpoint.
    async fn version(&self) -> Result<String, AppError>;
}
