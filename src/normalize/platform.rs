//! Platform detection from a URL.

use url::Url;

/// Label used when no rule matches.
pub const OTHER_PLATFORM: &str = "Other";

/// Ordered `(domain, label)` rules; first match wins.
const PLATFORM_RULES: &[(&str, &str)] = &[
    ("youtube.com", "YouTube"),
    ("youtu.be", "YouTube"),
    ("tiktok.com", "TikTok"),
    ("instagram.com", "Instagram"),
    ("facebook.com", "Facebook"),
    ("fb.watch", "Facebook"),
    ("twitter.com", "Twitter"),
    ("x.com", "Twitter"),
    ("vimeo.com", "Vimeo"),
    ("dailymotion.com", "Dailymotion"),
    ("dai.ly", "Dailymotion"),
    ("reddit.com", "Reddit"),
    ("redd.it", "Reddit"),
    ("twitch.tv", "Twitch"),
    ("soundcloud.com", "SoundCloud"),
    ("pinterest.com", "Pinterest"),
    ("pin.it", "Pinterest"),
    ("linkedin.com", "LinkedIn"),
    ("snapchat.com", "Snapchat"),
    ("bilibili.com", "Bilibili"),
    ("streamable.com", "Streamable"),
];

fn host_matches(host: &str, domain: &str) -> bool {
    host == domain || host.strip_suffix(domain).is_some_and(|prefix| prefix.ends_with('.'))
}

/// Platform label for `url`.
///
/// The host is matched on domain boundaries, so `netflix.com` is not
/// mistaken for `x.com`. Input that does not parse as a URL falls back to a
/// plain substring search.
pub fn detect_platform(url: &str) -> &'static str {
    let lowered = url.trim().to_ascii_lowercase();
    let host = Url::parse(&lowered)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_end_matches('.').to_string()));

    PLATFORM_RULES
        .iter()
        .find(|(domain, _)| match &host {
            Some(host) => host_matches(host, domain),
            None => lowered.contains(domain),
        })
        .map(|(_, label)| *label)
        .unwrap_or(OTHER_PLATFORM)
}
