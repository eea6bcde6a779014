//! Typed view of yt-dlp's `--dump-single-json` output.
//!
//! The document is validated once, here, into [`ExtractedMedia`]; nothing
//! downstream touches untyped JSON. Numeric fields are parsed leniently
//! because extractors disagree on ints vs floats vs numeric strings.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

fn number_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(number_as_f64).filter(|n| n.is_finite()))
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_f64(deserializer)?.filter(|n| *n >= 0.0).map(|n| n as u64))
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Vec<Value>>::deserialize(deserializer)?;
    Ok(value
        .unwrap_or_default()
        .into_iter()
        .filter_map(|v| match v {
            Value::String(s) if !s.trim().is_empty() => Some(s),
            _ => None,
        })
        .collect())
}

/// Keeps the well-formed items of a list, skipping nulls and junk.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = Option::<Vec<Value>>::deserialize(deserializer)?;
    Ok(value
        .unwrap_or_default()
        .into_iter()
        .filter(|v| v.is_object())
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect())
}

/// One entry of yt-dlp's `formats` array. Read-only.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawFormat {
    #[serde(default, deserialize_with = "lenient_string")]
    pub format_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub ext: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub resolution: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub width: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub height: Option<u64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub vcodec: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub acodec: Option<String>,
    /// Total bitrate in kbit/s
    #[serde(default, deserialize_with = "lenient_f64")]
    pub tbr: Option<f64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub filesize: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub filesize_approx: Option<u64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub protocol: Option<String>,
    /// Extractor-supplied quality hint, e.g. `1080p`, `720p60`, `4K`
    #[serde(default, deserialize_with = "lenient_string")]
    pub format_note: Option<String>,
}

impl RawFormat {
    /// `filesize`, falling back to yt-dlp's estimate.
    pub fn size_bytes(&self) -> Option<u64> {
        self.filesize.or(self.filesize_approx)
    }
}

/// A single media item.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawVideo {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub duration: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub uploader: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub channel: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub thumbnail: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub view_count: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub like_count: Option<u64>,
    /// `YYYYMMDD`
    #[serde(default, deserialize_with = "lenient_string")]
    pub upload_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub webpage_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub extractor_key: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub formats: Vec<RawFormat>,
    /// Single-format extractors describe the only format at the top level.
    #[serde(flatten)]
    pub(crate) direct: RawFormat,
}

impl RawVideo {
    /// `uploader`, falling back to `channel`.
    pub fn author(&self) -> Option<&str> {
        self.uploader.as_deref().or(self.channel.as_deref())
    }
}

/// One playlist entry, as returned with `--flat-playlist`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawEntry {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub duration: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub webpage_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawPlaylist {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub uploader: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub webpage_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub entries: Vec<RawEntry>,
}

/// What the extraction capability found for a URL.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractedMedia {
    Video(RawVideo),
    Playlist(RawPlaylist),
}

impl ExtractedMedia {
    /// Validate a yt-dlp JSON document.
    ///
    /// `null` means the extractor found nothing and yields `Ok(None)`.
    /// Documents with two or more entries are playlists. A lone entry that
    /// carries its own `formats` is unwrapped into a video; any other
    /// document with an `entries` list stays a playlist.
    pub fn from_value(value: Value) -> Result<Option<Self>, serde_json::Error> {
        if value.is_null() {
            return Ok(None);
        }

        if let Some(entries) = value.get("entries").and_then(Value::as_array) {
            let items: Vec<&Value> = entries.iter().filter(|e| e.is_object()).collect();
            if let [only] = items.as_slice() {
                if only.get("formats").is_some_and(Value::is_array) {
                    return Self::from_value((*only).clone());
                }
            }
            let playlist: RawPlaylist = serde_json::from_value(value)?;
            return Ok(Some(ExtractedMedia::Playlist(playlist)));
        }

        let mut video: RawVideo = serde_json::from_value(value)?;
        if video.formats.is_empty() && video.direct.url.is_some() {
            video.formats.push(video.direct.clone());
        }
        Ok(Some(ExtractedMedia::Video(video)))
    }

    /// Parse yt-dlp stdout. Empty output counts as no metadata.
    pub fn from_json_str(stdout: &str) -> Result<Option<Self>, serde_json::Error> {
        let trimmed = stdout.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        Self::from_value(serde_json::from_str(trimmed)?)
    }

    pub fn title(&self) -> Option<&str> {
        match self {
            ExtractedMedia::Video(v) => v.title.as_deref(),
            ExtractedMedia::Playlist(p) => p.title.as_deref(),
        }
    }
}
