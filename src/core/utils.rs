//! Small formatting helpers shared by the normalizer and the API layer.

const BYTES_PER_MB: f64 = 1_048_576.0;

/// Format seconds as `MM:SS` below one hour, `HH:MM:SS` otherwise.
///
/// Missing, zero, negative and non-finite durations all format as `00:00`.
/// Fractional seconds are truncated.
///
/// # Example
///
/// ```
/// use mediagate::core::utils::format_duration;
///
/// assert_eq!(format_duration(Some(75.9)), "01:15");
/// assert_eq!(format_duration(Some(3725.0)), "01:02:05");
/// assert_eq!(format_duration(None), "00:00");
/// ```
pub fn format_duration(seconds: Option<f64>) -> String {
    let total = match seconds {
        Some(s) if s.is_finite() && s > 0.0 => s as u64,
        _ => 0,
    };
    let h = total / 3600;
    let m = (total % 3600) / 60;
    let s = total % 60;
    if h > 0 {
        format!("{:02}:{:02}:{:02}", h, m, s)
    } else {
        format!("{:02}:{:02}", m, s)
    }
}

/// Bytes to mebibytes rounded to 2 decimals; unknown size is 0.
pub fn bytes_to_mb(bytes: Option<u64>) -> f64 {
    match bytes {
        Some(b) => ((b as f64 / BYTES_PER_MB) * 100.0).round() / 100.0,
        None => 0.0,
    }
}

/// Cut `text` to at most `max_chars` characters (not bytes).
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// First `visible` chars of a secret followed by `...`.
pub fn preview(secret: &str, visible: usize) -> String {
    format!("{}...", truncate_chars(secret, visible))
}
