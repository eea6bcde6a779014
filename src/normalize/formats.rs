//! Format normalization, grouping by quality, and selection.

use crate::core::utils::bytes_to_mb;
use crate::extract::raw::RawFormat;
use crate::normalize::quality::{quality_for, QualityLabel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A format as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedFormat {
    pub format_id: String,
    pub ext: String,
    pub quality: QualityLabel,
    pub resolution: String,
    pub size_mb: f64,
    pub url: String,
    pub has_audio: bool,
    pub has_video: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate_kbps: Option<f64>,
}

impl NormalizedFormat {
    /// `None` when the raw format has no usable url.
    pub fn from_raw(raw: &RawFormat) -> Option<Self> {
        let url = raw.url.as_deref().map(str::trim).filter(|u| !u.is_empty())?;
        let has_codec = |codec: &Option<String>| codec.as_deref().is_some_and(|c| c != "none");

        Some(Self {
            format_id: raw.format_id.clone().unwrap_or_else(|| "unknown".to_string()),
            ext: raw.ext.clone().unwrap_or_else(|| "unknown".to_string()),
            quality: quality_for(raw),
            resolution: resolution_of(raw),
            size_mb: bytes_to_mb(raw.size_bytes()),
            url: url.to_string(),
            has_audio: has_codec(&raw.acodec),
            has_video: has_codec(&raw.vcodec),
            protocol: raw.protocol.clone(),
            bitrate_kbps: raw.tbr.map(|tbr| (tbr * 10.0).round() / 10.0),
        })
    }

    fn is_audio_only(&self) -> bool {
        self.has_audio && !self.has_video
    }
}

fn resolution_of(raw: &RawFormat) -> String {
    match (raw.width, raw.height) {
        (Some(w), Some(h)) => format!("{}x{}", w, h),
        (None, Some(h)) => format!("{}p", h),
        _ => raw
            .resolution
            .clone()
            .unwrap_or_else(|| "unknown".to_string()),
    }
}

/// Formats sharing one quality label, in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityGroup {
    pub quality: QualityLabel,
    pub formats: Vec<NormalizedFormat>,
}

/// The largest format of a quality group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestFormat {
    pub quality: QualityLabel,
    pub format_id: String,
    pub size_mb: f64,
    pub url: String,
}

/// Outcome of applying the caller's `format` selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedFormat {
    pub selector: String,
    #[serde(flatten)]
    pub format: NormalizedFormat,
}

/// Normalize every raw format that has a url, in input order.
pub fn normalize_formats(raw: &[RawFormat]) -> Vec<NormalizedFormat> {
    raw.iter().filter_map(NormalizedFormat::from_raw).collect()
}

/// Group formats by quality, highest quality first.
///
/// Every input format lands in exactly one group.
pub fn group_formats(formats: Vec<NormalizedFormat>) -> Vec<QualityGroup> {
    let mut by_quality: BTreeMap<QualityLabel, Vec<NormalizedFormat>> = BTreeMap::new();
    for format in formats {
        by_quality.entry(format.quality).or_default().push(format);
    }
    by_quality
        .into_iter()
        .rev()
        .map(|(quality, formats)| QualityGroup { quality, formats })
        .collect()
}

/// Largest format of a slice; ties keep the first encountered.
fn largest<'a, I>(formats: I) -> Option<&'a NormalizedFormat>
where
    I: IntoIterator<Item = &'a NormalizedFormat>,
{
    formats.into_iter().fold(None, |best, candidate| match best {
        Some(current) if candidate.size_mb <= current.size_mb => Some(current),
        _ => Some(candidate),
    })
}

/// Best url per quality: the largest format of each group.
pub fn best_per_quality(groups: &[QualityGroup]) -> Vec<BestFormat> {
    groups
        .iter()
        .filter_map(|group| {
            largest(&group.formats).map(|f| BestFormat {
                quality: group.quality,
                format_id: f.format_id.clone(),
                size_mb: f.size_mb,
                url: f.url.clone(),
            })
        })
        .collect()
}

/// Apply a format selector.
///
/// - `best`: largest format of the highest group that carries video,
///   falling back to the highest group
/// - `audio` / `bestaudio`: largest audio-only format
/// - a quality label (`720p`, `4K`): largest format of that group
/// - anything else: exact `format_id` match
pub fn select_format(groups: &[QualityGroup], selector: &str) -> Option<SelectedFormat> {
    let selector = selector.trim();
    let all = || groups.iter().flat_map(|g| g.formats.iter());

    let chosen = match selector.to_ascii_lowercase().as_str() {
        "" | "best" => groups
            .iter()
            .find(|g| g.formats.iter().any(|f| f.has_video))
            .or_else(|| groups.first())
            .and_then(|g| largest(&g.formats)),
        "audio" | "bestaudio" => largest(all().filter(|f| f.is_audio_only())),
        other => match other.parse::<QualityLabel>() {
            Ok(label) => groups
                .iter()
                .find(|g| g.quality == label)
                .and_then(|g| largest(&g.formats)),
            Err(()) => all().find(|f| f.format_id == selector),
        },
    };

    chosen.map(|format| SelectedFormat {
        selector: selector.to_string(),
        format: format.clone(),
    })
}

/// Flat listing for `/formats`: highest quality first, then largest first.
pub fn flat_listing(groups: &[QualityGroup], limit: usize) -> Vec<NormalizedFormat> {
    let mut listing: Vec<NormalizedFormat> = groups.iter().flat_map(|g| g.formats.iter().cloned()).collect();
    listing.sort_by(|a, b| {
        b.quality
            .cmp(&a.quality)
            .then_with(|| b.size_mb.total_cmp(&a.size_mb))
    });
    listing.truncate(limit);
    listing
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MB: u64 = 1_048_576;

    fn raw(id: &str, height: Option<u64>, size: Option<u64>, url: Option<&str>) -> RawFormat {
        RawFormat {
            format_id: Some(id.to_string()),
            ext: Some("mp4".to_string()),
            height,
            width: height.map(|h| h * 16 / 9),
            vcodec: Some("avc1".to_string()),
            acodec: Some("mp4a".to_string()),
            filesize: size,
            url: url.map(str::to_string),
            ..Default::default()
        }
    }

    fn audio(id: &str, size: u64) -> RawFormat {
        RawFormat {
            format_id: Some(id.to_string()),
            ext: Some("m4a".to_string()),
            resolution: Some("audio only".to_string()),
            vcodec: Some("none".to_string()),
            acodec: Some("mp4a".to_string()),
            filesize: Some(size),
            url: Some(format!("https://cdn/{id}")),
            ..Default::default()
        }
    }

    #[test]
    fn test_from_raw_flags_and_size() {
        let f = NormalizedFormat::from_raw(&raw("22", Some(720), Some(MB * 3 / 2), Some("https://cdn/22"))).unwrap();
        assert_eq!(f.quality, QualityLabel::P720);
        assert_eq!(f.resolution, "1280x720");
        assert_eq!(f.size_mb, 1.5);
        assert!(f.has_audio && f.has_video);

        let a = NormalizedFormat::from_raw(&audio("140", MB)).unwrap();
        assert!(a.has_audio && !a.has_video);
        assert_eq!(a.resolution, "audio only");
        assert_eq!(a.quality, QualityLabel::Unknown);

        let missing_codecs = NormalizedFormat::from_raw(&RawFormat {
            url: Some("https://cdn/x".into()),
            ..Default::default()
        })
        .unwrap();
        assert!(!missing_codecs.has_audio && !missing_codecs.has_video);
        assert_eq!(missing_codecs.size_mb, 0.0);
    }

    #[test]
    fn test_formats_without_url_are_dropped() {
        assert!(NormalizedFormat::from_raw(&raw("1", Some(360), None, None)).is_none());
        assert!(NormalizedFormat::from_raw(&raw("1", Some(360), None, Some("  "))).is_none());
    }

    #[test]
    fn test_grouping_is_complete_and_ordered() {
        let input = vec![
            raw("a", Some(360), None, Some("https://cdn/a")),
            raw("b", Some(1080), None, Some("https://cdn/b")),
            raw("c", None, None, Some("https://cdn/c")),
            raw("d", Some(2160), None, Some("https://cdn/d")),
            raw("e", Some(1080), None, None),
            raw("f", Some(1080), None, Some("https://cdn/f")),
        ];
        let with_url = input.iter().filter(|f| f.url.is_some()).count();
        let groups = group_formats(normalize_formats(&input));

        let labels: Vec<QualityLabel> = groups.iter().map(|g| g.quality).collect();
        assert_eq!(
            labels,
            vec![QualityLabel::K4, QualityLabel::P1080, QualityLabel::P360, QualityLabel::Unknown]
        );

        let mut ids: Vec<&str> = groups
            .iter()
            .flat_map(|g| g.formats.iter().map(|f| f.format_id.as_str()))
            .collect();
        assert_eq!(ids.len(), with_url);
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), with_url);

        let p1080: Vec<&str> = groups[1].formats.iter().map(|f| f.format_id.as_str()).collect();
        assert_eq!(p1080, vec!["b", "f"]);
    }

    #[test]
    fn test_best_per_quality_picks_largest() {
        let input = vec![
            raw("none", Some(1080), None, Some("https://cdn/none")),
            raw("fifty", Some(1080), Some(50 * MB), Some("https://cdn/fifty")),
            raw("big", Some(1080), Some(120 * MB), Some("https://cdn/big")),
        ];
        let best = best_per_quality(&group_formats(normalize_formats(&input)));
        assert_eq!(best.len(), 1);
        assert_eq!(best[0].quality, QualityLabel::P1080);
        assert_eq!(best[0].url, "https://cdn/big");
        assert_eq!(best[0].size_mb, 120.0);
    }

    #[test]
    fn test_best_per_quality_tie_keeps_first() {
        let input = vec![
            raw("first", Some(720), Some(10 * MB), Some("https://cdn/first")),
            raw("second", Some(720), Some(10 * MB), Some("https://cdn/second")),
            raw("unsized-a", Some(480), None, Some("https://cdn/ua")),
            raw("unsized-b", Some(480), None, Some("https://cdn/ub")),
        ];
        let best = best_per_quality(&group_formats(normalize_formats(&input)));
        assert_eq!(best[0].format_id, "first");
        assert_eq!(best[1].format_id, "unsized-a");
    }

    #[test]
    fn test_select_format() {
        let input = vec![
            audio("140", 3 * MB),
            audio("251", 4 * MB),
            raw("18", Some(360), Some(5 * MB), Some("https://cdn/18")),
            raw("22", Some(720), Some(20 * MB), Some("https://cdn/22")),
            raw("137", Some(1080), Some(60 * MB), Some("https://cdn/137")),
        ];
        let groups = group_formats(normalize_formats(&input));

        assert_eq!(select_format(&groups, "best").unwrap().format.format_id, "137");
        assert_eq!(select_format(&groups, "").unwrap().format.format_id, "137");
        assert_eq!(select_format(&groups, "bestaudio").unwrap().format.format_id, "251");
        assert_eq!(select_format(&groups, "720p").unwrap().format.format_id, "22");
        assert_eq!(select_format(&groups, "18").unwrap().format.format_id, "18");
        assert_eq!(select_format(&groups, "18").unwrap().selector, "18");
        assert!(select_format(&groups, "4K").is_none());
        assert!(select_format(&groups, "999").is_none());
    }

    #[test]
    fn test_best_skips_audio_only_groups() {
        let input = vec![audio("140", 3 * MB)];
        let groups = group_formats(normalize_formats(&input));
        // Only an unknown-quality audio group exists, so best falls back to it.
        assert_eq!(select_format(&groups, "best").unwrap().format.format_id, "140");
    }

    #[test]
    fn test_flat_listing_orders_and_truncates() {
        let input = vec![
            raw("small", Some(720), Some(MB), Some("https://cdn/s")),
            raw("large", Some(720), Some(9 * MB), Some("https://cdn/l")),
            raw("hd", Some(1080), Some(2 * MB), Some("https://cdn/hd")),
        ];
        let groups = group_formats(normalize_formats(&input));
        let listing = flat_listing(&groups, 2);
        let ids: Vec<&str> = listing.iter().map(|f| f.format_id.as_str()).collect();
        assert_eq!(ids, vec!["hd", "large"]);
    }
}
