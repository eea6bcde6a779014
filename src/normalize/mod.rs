//! Response normalizer.
//!
//! Turns an [`ExtractedMedia`] into the stable response shape served by the
//! API: platform label, formatted duration, formats grouped by quality, the
//! best url per quality and the caller's selected format. Playlists get an
//! ordered list of entry summaries instead of formats.
//!
//! Everything here is pure; truncation follows [`ResponseLimits`].

pub mod formats;
pub mod platform;
pub mod quality;

use crate::core::config::ResponseLimits;
use crate::core::utils::{format_duration, truncate_chars};
use crate::extract::raw::{ExtractedMedia, RawPlaylist, RawVideo};
use serde::{Deserialize, Serialize};

pub use formats::{
    best_per_quality, flat_listing, group_formats, normalize_formats, select_format, BestFormat, NormalizedFormat,
    QualityGroup, SelectedFormat,
};
pub use platform::detect_platform;
pub use quality::{quality_for, QualityLabel};

/// Media metadata shared by `/download` and `/info`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub platform: String,
    pub id: Option<String>,
    pub title: String,
    pub uploader: Option<String>,
    pub duration: String,
    pub duration_seconds: u64,
    pub thumbnail: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub view_count: Option<u64>,
    pub like_count: Option<u64>,
    pub upload_date: Option<String>,
    pub webpage_url: String,
    pub extractor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoResponse {
    #[serde(flatten)]
    pub info: MediaInfo,
    pub format_count: usize,
    pub formats: Vec<QualityGroup>,
    pub best_per_quality: Vec<BestFormat>,
    pub selected: Option<SelectedFormat>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistEntry {
    /// 1-based position in the playlist
    pub index: usize,
    pub id: Option<String>,
    pub title: String,
    pub duration: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistResponse {
    pub platform: String,
    pub id: Option<String>,
    pub title: String,
    pub uploader: Option<String>,
    pub webpage_url: String,
    pub entry_count: usize,
    pub entries: Vec<PlaylistEntry>,
}

/// Normalized result, tagged by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NormalizedResponse {
    Video(VideoResponse),
    Playlist(PlaylistResponse),
}

/// Metadata-only view for `/info`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InfoView<'a> {
    Video(&'a MediaInfo),
    Playlist {
        platform: &'a str,
        id: Option<&'a str>,
        title: &'a str,
        uploader: Option<&'a str>,
        webpage_url: &'a str,
        entry_count: usize,
    },
}

/// Flat format listing for `/formats`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormatListing<'a> {
    pub platform: &'a str,
    pub title: &'a str,
    pub total: usize,
    pub returned: usize,
    pub formats: Vec<NormalizedFormat>,
}

const UNTITLED: &str = "Untitled";

/// Normalize extractor output for `url`, applying `selector` to pick a format.
pub fn normalize(media: &ExtractedMedia, url: &str, selector: &str, limits: &ResponseLimits) -> NormalizedResponse {
    match media {
        ExtractedMedia::Video(video) => NormalizedResponse::Video(normalize_video(video, url, selector, limits)),
        ExtractedMedia::Playlist(playlist) => NormalizedResponse::Playlist(normalize_playlist(playlist, url, limits)),
    }
}

fn media_info(video: &RawVideo, url: &str, limits: &ResponseLimits) -> MediaInfo {
    MediaInfo {
        platform: detect_platform(url).to_string(),
        id: video.id.clone(),
        title: video.title.clone().unwrap_or_else(|| UNTITLED.to_string()),
        uploader: video.author().map(str::to_string),
        duration: format_duration(video.duration),
        duration_seconds: video.duration.filter(|d| *d > 0.0).map(|d| d as u64).unwrap_or(0),
        thumbnail: video.thumbnail.clone(),
        description: video
            .description
            .as_deref()
            .map(|d| truncate_chars(d, limits.max_description_chars)),
        tags: video.tags.iter().take(limits.max_tags).cloned().collect(),
        view_count: video.view_count,
        like_count: video.like_count,
        upload_date: video.upload_date.clone(),
        webpage_url: video.webpage_url.clone().unwrap_or_else(|| url.to_string()),
        extractor: video.extractor_key.clone(),
    }
}

fn normalize_video(video: &RawVideo, url: &str, selector: &str, limits: &ResponseLimits) -> VideoResponse {
    let formats = normalize_formats(&video.formats);
    let format_count = formats.len();
    let groups = group_formats(formats);

    VideoResponse {
        info: media_info(video, url, limits),
        format_count,
        best_per_quality: best_per_quality(&groups),
        selected: select_format(&groups, selector),
        formats: groups,
    }
}

fn normalize_playlist(playlist: &RawPlaylist, url: &str, limits: &ResponseLimits) -> PlaylistResponse {
    let entries = playlist
        .entries
        .iter()
        .take(limits.max_playlist_entries)
        .enumerate()
        .map(|(i, entry)| PlaylistEntry {
            index: i + 1,
            id: entry.id.clone(),
            title: entry.title.clone().unwrap_or_else(|| UNTITLED.to_string()),
            duration: format_duration(entry.duration),
            url: entry.webpage_url.clone().or_else(|| entry.url.clone()),
        })
        .collect();

    PlaylistResponse {
        platform: detect_platform(url).to_string(),
        id: playlist.id.clone(),
        title: playlist.title.clone().unwrap_or_else(|| UNTITLED.to_string()),
        uploader: playlist.uploader.clone(),
        webpage_url: playlist.webpage_url.clone().unwrap_or_else(|| url.to_string()),
        entry_count: playlist.entries.len(),
        entries,
    }
}

impl NormalizedResponse {
    pub fn info(&self) -> InfoView<'_> {
        match self {
            NormalizedResponse::Video(video) => InfoView::Video(&video.info),
            NormalizedResponse::Playlist(p) => InfoView::Playlist {
                platform: &p.platform,
                id: p.id.as_deref(),
                title: &p.title,
                uploader: p.uploader.as_deref(),
                webpage_url: &p.webpage_url,
                entry_count: p.entry_count,
            },
        }
    }

    /// Flat listing capped at `limit`; playlists have no formats.
    pub fn format_listing(&self, limit: usize) -> FormatListing<'_> {
        match self {
            NormalizedResponse::Video(video) => {
                let formats = flat_listing(&video.formats, limit);
                FormatListing {
                    platform: &video.info.platform,
                    title: &video.info.title,
                    total: video.format_count,
                    returned: formats.len(),
                    formats,
                }
            }
            NormalizedResponse::Playlist(p) => FormatListing {
                platform: &p.platform,
                title: &p.title,
                total: 0,
                returned: 0,
                formats: Vec::new(),
            },
        }
    }

    pub fn platform(&self) -> &str {
        match self {
            NormalizedResponse::Video(video) => &video.info.platform,
            NormalizedResponse::Playlist(p) => &p.platform,
        }
    }
}
