//! Runtime configuration.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `MEDIAGATE_`-prefixed environment variables (nested keys separated by
//! `__`, e.g. `MEDIAGATE_CACHE__TTL_SECS=60`).

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Config file read when no `--config` is given. Missing is fine.
pub const DEFAULT_CONFIG_FILE: &str = "mediagate.toml";

/// Environment prefix for overrides.
pub const ENV_PREFIX: &str = "MEDIAGATE_";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub extractor: ExtractorConfig,
    pub instagram: InstagramConfig,
    pub limits: ResponseLimits,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load defaults, then `path` (or [`DEFAULT_CONFIG_FILE`]), then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, figment::Error> {
        let file = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        Self::figment(file).extract()
    }

    fn figment(file: &Path) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub max_entries: usize,
    /// Mix the client IP into the cache key so callers never share entries.
    pub per_client: bool,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 300,
            max_entries: 100,
            per_client: false,
        }
    }
}

/// yt-dlp invocation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub binary: String,
    pub timeout_secs: u64,
    /// Extra arguments for the first attempt only; the fallback drops them.
    pub extra_args: Vec<String>,
    /// Netscape cookies file passed with `--cookies` on the first attempt.
    pub cookies_file: Option<String>,
    /// Retry once with reduced options when the first attempt fails.
    pub fallback: bool,
}

impl ExtractorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            binary: "yt-dlp".to_string(),
            timeout_secs: 30,
            extra_args: Vec::new(),
            cookies_file: None,
            fallback: true,
        }
    }
}

/// Account fetcher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstagramConfig {
    pub web_base: String,
    pub api_base: String,
    /// Public web app id, sent as `X-IG-App-ID`.
    pub app_id: String,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub comment_timeout_secs: u64,
    /// Delay between consecutive pages of posts, followers and following.
    pub page_delay_ms: u64,
    /// Delay between per-post comment requests.
    pub comment_delay_ms: u64,
    pub posts_pages: usize,
    pub posts_page_size: usize,
    pub follow_pages: usize,
    pub follow_page_size: usize,
    pub liked_limit: usize,
    pub saved_limit: usize,
    pub comment_posts: usize,
    pub comments_per_post: usize,
    pub min_session_len: usize,
}

impl InstagramConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn comment_timeout(&self) -> Duration {
        Duration::from_secs(self.comment_timeout_secs)
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn comment_delay(&self) -> Duration {
        Duration::from_millis(self.comment_delay_ms)
    }
}

impl Default for InstagramConfig {
    fn default() -> Self {
        Self {
            web_base: "https://www.instagram.com".to_string(),
            api_base: "https://i.instagram.com".to_string(),
            app_id: "936619743392459".to_string(),
            user_agent: concat!("mediagate/", env!("CARGO_PKG_VERSION")).to_string(),
            request_timeout_secs: 15,
            comment_timeout_secs: 10,
            page_delay_ms: 1000,
            comment_delay_ms: 500,
            posts_pages: 3,
            posts_page_size: 12,
            follow_pages: 2,
            follow_page_size: 24,
            liked_limit: 20,
            saved_limit: 15,
            comment_posts: 5,
            comments_per_post: 10,
            min_session_len: 30,
        }
    }
}

/// Response-shaping limits. Reported to callers on `GET /`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseLimits {
    /// Entries in the flat `/formats` listing.
    pub max_formats: usize,
    pub max_tags: usize,
    pub max_description_chars: usize,
    pub max_playlist_entries: usize,
    /// Error messages echoed to the caller are cut to this many chars.
    pub max_error_chars: usize,
}

impl Default for ResponseLimits {
    fn default() -> Self {
        Self {
            max_formats: 50,
            max_tags: 10,
            max_description_chars: 500,
            max_playlist_entries: 100,
            max_error_chars: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Also append logs to this file.
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}
