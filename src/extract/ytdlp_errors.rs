//! Classification of yt-dlp failures from its stderr.

use serde::Serialize;

/// What kind of failure yt-dlp reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display, strum::IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExtractorErrorKind {
    /// Cookies are invalid or the site wants a signed-in session
    InvalidCookies,
    /// The site refused the request as automated
    BotDetection,
    /// Private, removed, region-locked or nonexistent media
    VideoUnavailable,
    /// Timeouts, DNS, refused connections
    NetworkError,
    Unknown,
}

impl ExtractorErrorKind {
    /// Text for the envelope's `hint` field.
    pub fn hint(self) -> &'static str {
        match self {
            ExtractorErrorKind::InvalidCookies => "The site requires a signed-in session for this media",
            ExtractorErrorKind::BotDetection => "The site blocked the request, try again later",
            ExtractorErrorKind::VideoUnavailable => "The media may be private, removed or blocked in this region",
            ExtractorErrorKind::NetworkError => "Network problem reaching the site, try again in a minute",
            ExtractorErrorKind::Unknown => "Check that the link is correct and points to a media page",
        }
    }

    /// A retry with reduced options cannot help these.
    pub fn is_final(self) -> bool {
        matches!(self, ExtractorErrorKind::VideoUnavailable)
    }
}

/// Classify yt-dlp stderr.
pub fn analyze_ytdlp_error(stderr: &str) -> ExtractorErrorKind {
    let stderr_lower = stderr.to_lowercase();

    if stderr_lower.contains("cookies are no longer valid")
        || stderr_lower.contains("cookies have likely been rotated")
        || stderr_lower.contains("sign in to confirm you're not a bot")
        || stderr_lower.contains("please sign in")
        || stderr_lower.contains("login required")
        || stderr_lower.contains("use --cookies-from-browser")
        || stderr_lower.contains("use --cookies for the authentication")
    {
        return ExtractorErrorKind::InvalidCookies;
    }

    if stderr_lower.contains("bot detection")
        || stderr_lower.contains("http error 403")
        || stderr_lower.contains("http error 429")
        || stderr_lower.contains("signature extraction failed")
    {
        return ExtractorErrorKind::BotDetection;
    }

    if stderr_lower.contains("private video")
        || stderr_lower.contains("video unavailable")
        || stderr_lower.contains("this video is not available")
        || stderr_lower.contains("video is private")
        || stderr_lower.contains("video has been removed")
        || stderr_lower.contains("does not exist")
        || stderr_lower.contains("http error 404")
        || stderr_lower.contains("unsupported url")
    {
        return ExtractorErrorKind::VideoUnavailable;
    }

    if stderr_lower.contains("timed out")
        || stderr_lower.contains("timeout")
        || stderr_lower.contains("connection")
        || stderr_lower.contains("network")
        || stderr_lower.contains("socket")
        || stderr_lower.contains("dns")
        || stderr_lower.contains("name resolution")
    {
        return ExtractorErrorKind::NetworkError;
    }

    ExtractorErrorKind::Unknown
}

/// Last `ERROR:` line of stderr, or its last non-empty line.
pub fn error_line(stderr: &str) -> Option<&str> {
    let lines = || stderr.lines().map(str::trim).rev();
    lines()
        .find(|l| l.starts_with("ERROR:"))
        .or_else(|| lines().find(|l| !l.is_empty()))
}
