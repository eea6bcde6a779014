//! In-memory storage for computed responses.

pub mod cache;

pub use cache::{cache_key, CacheStats, ResultCache};
