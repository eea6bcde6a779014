//! Coarse resolution tiers used to group and rank formats.

use crate::extract::raw::RawFormat;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Resolution tier. Declared lowest first so the derived `Ord` ranks 4K highest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, strum::Display, strum::EnumIter,
)]
pub enum QualityLabel {
    #[serde(rename = "unknown")]
    #[strum(serialize = "unknown")]
    Unknown,
    #[serde(rename = "144p")]
    #[strum(serialize = "144p")]
    P144,
    #[serde(rename = "240p")]
    #[strum(serialize = "240p")]
    P240,
    #[serde(rename = "360p")]
    #[strum(serialize = "360p")]
    P360,
    #[serde(rename = "480p")]
    #[strum(serialize = "480p")]
    P480,
    #[serde(rename = "720p")]
    #[strum(serialize = "720p")]
    P720,
    #[serde(rename = "1080p")]
    #[strum(serialize = "1080p")]
    P1080,
    #[serde(rename = "1440p")]
    #[strum(serialize = "1440p")]
    P1440,
    #[serde(rename = "4K")]
    #[strum(serialize = "4K")]
    K4,
}

/// Height thresholds, highest first.
const HEIGHT_TIERS: &[(u64, QualityLabel)] = &[
    (2160, QualityLabel::K4),
    (1440, QualityLabel::P1440),
    (1080, QualityLabel::P1080),
    (720, QualityLabel::P720),
    (480, QualityLabel::P480),
    (360, QualityLabel::P360),
    (240, QualityLabel::P240),
    (144, QualityLabel::P144),
];

impl QualityLabel {
    pub fn from_height(height: u64) -> Self {
        HEIGHT_TIERS
            .iter()
            .find(|(min, _)| height >= *min)
            .map(|(_, label)| *label)
            .unwrap_or(QualityLabel::Unknown)
    }

    /// Parse an extractor hint such as `1080p`, `720p60`, `2160p HDR`, `4K` or `UHD`.
    ///
    /// Returns `None` when the hint names no resolution (e.g. `medium`, `DASH audio`).
    pub fn from_hint(hint: &str) -> Option<Self> {
        let lowered = hint.trim().to_ascii_lowercase();
        if lowered.is_empty() {
            return None;
        }
        if lowered
            .split(|c: char| !c.is_ascii_alphanumeric())
            .any(|token| token == "4k" || token == "uhd")
        {
            return Some(QualityLabel::K4);
        }

        // Leading digits directly followed by 'p' ("720p60" -> 720).
        let digits: String = lowered.chars().take_while(char::is_ascii_digit).collect();
        if !digits.is_empty() && lowered[digits.len()..].starts_with('p') {
            return digits.parse().ok().map(Self::from_height);
        }
        None
    }
}

impl FromStr for QualityLabel {
    type Err = ();

    /// Exact label names, case-insensitive (`720p`, `4k`, `unknown`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use strum::IntoEnumIterator;
        QualityLabel::iter()
            .find(|label| label.to_string().eq_ignore_ascii_case(s.trim()))
            .ok_or(())
    }
}

/// Height parsed from a `WIDTHxHEIGHT` resolution string.
fn height_from_resolution(resolution: &str) -> Option<u64> {
    let (_, height) = resolution.split_once('x')?;
    let digits: String = height.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Quality of a raw format: explicit hint first, then height, then the
/// height inside the resolution string.
pub fn quality_for(format: &RawFormat) -> QualityLabel {
    if let Some(label) = format.format_note.as_deref().and_then(QualityLabel::from_hint) {
        return label;
    }
    if let Some(height) = format.height {
        return QualityLabel::from_height(height);
    }
    format
        .resolution
        .as_deref()
        .and_then(height_from_resolution)
        .map(QualityLabel::from_height)
        .unwrap_or(QualityLabel::Unknown)
}
