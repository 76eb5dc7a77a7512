/// Convert a backend `HH:mm:ss` time token to a compact 12-hour label.
///
/// `"09:00:00"` becomes `"9am"`, `"14:30:00"` becomes `"2pm"`. Minutes and
/// seconds are dropped. Midnight is shown as `"12am"`.
/// Returns `None` when the first two characters are not an hour in 0..=23.
pub fn to_am_pm(time: &str) -> Option<String> {
    let digits = time.get(0..2)?;
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hour: u32 = digits.parse().ok()?;

    let label = match hour {
        0 => "12am".to_string(),
        1..=11 => format!("{}am", hour),
        12 => "12pm".to_string(),
        13..=23 => format!("{}pm", hour - 12),
        _ => return None,
    };
    Some(label)
}

/// Case-insensitive substring check
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}
