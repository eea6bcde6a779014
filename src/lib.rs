//! mediagate - JSON gateway over media extraction and Instagram account data
//!
//! The crate wraps two upstream capabilities behind a small HTTP API:
//!
//! - `extract`: yt-dlp invocation and typed parsing of its JSON output
//! - `normalize`: platform detection, quality labels, format grouping and selection
//! - `instagram`: session-cookie account snapshots
//! - `storage`: TTL result cache
//! - `api`: axum router, handlers and the JSON envelope
//! - `core`: configuration, errors, logging and small utilities

pub mod api;
pub mod cli;
pub mod core;
pub mod extract;
pub mod instagram;
pub mod normalize;
pub mod storage;

// Re-export commonly used types for convenience
pub use core::{config, AppError, AppResult, Config};
pub use extract::{MediaExtractor, YtDlpExtractor};
pub use instagram::{AccountFetcher, InstagramClient};
pub use normalize::{normalize, NormalizedResponse};
