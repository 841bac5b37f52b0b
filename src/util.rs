//! Shared utility functions

use unicode_width::UnicodeWidthChar;

/// Safely truncate a string to at most `max_bytes` while respecting UTF-8 boundaries.
///
/// If the string is already shorter than `max_bytes`, returns it unchanged.
/// Otherwise, finds the last valid UTF-8 character boundary at or before `max_bytes`
/// and returns a slice up to that point.
pub fn truncate_utf8_safe(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Truncate a string to fit within `max_cols` terminal columns, appending an
/// ellipsis when anything was cut.
///
/// Byte-based truncation is wrong for table cells: CJK characters and emoji
/// occupy two columns each. This walks characters and accumulates display
/// width instead.
pub fn fit_to_width(s: &str, max_cols: usize) -> String {
    let total: usize = s.chars().map(|ch| ch.width().unwrap_or(0)).sum();
    if total <= max_cols {
        return s.to_string();
    }

    // Reserve one column for the ellipsis only once truncation is certain
    let budget = max_cols.saturating_sub(1);
    let mut width = 0usize;
    let mut out = String::new();
    for ch in s.chars() {
        let w = ch.width().unwrap_or(0);
        if width + w > budget {
            break;
        }
        width += w;
        out.push(ch);
    }
    out.push('…');
    out
}

/// Format a timestamp as a short local-ish HH:MM:SS for transcript rows.
pub fn short_time(ts: &chrono::DateTime<chrono::Utc>) -> String {
    ts.format("%H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_shorter_than_max() {
        assert_eq!(truncate_utf8_safe("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_at_ascii_boundary() {
        assert_eq!(truncate_utf8_safe("hello world", 5), "hello");
    }

    #[test]
    fn test_truncate_at_utf8_boundary() {
        // Each character is 3 bytes; truncating at 4 keeps only the first
        let s = "日本語";
        assert_eq!(truncate_utf8_safe(s, 4), "日");
        assert_eq!(truncate_utf8_safe(s, 6), "日本");
    }

    #[test]
    fn test_fit_to_width_ascii() {
        assert_eq!(fit_to_width("hello", 10), "hello");
        assert_eq!(fit_to_width("hello world", 6), "hello…");
    }

    #[test]
    fn test_fit_to_width_exact_fit_is_unchanged() {
        assert_eq!(fit_to_width("hello", 5), "hello");
        // Two CJK characters occupy exactly four columns
        assert_eq!(fit_to_width("日本", 4), "日本");
        // One column short forces the ellipsis
        assert_eq!(fit_to_width("hello", 4), "hel…");
    }

    #[test]
    fn test_fit_to_width_wide_chars() {
        // CJK characters are two columns wide
        let fitted = fit_to_width("日本語テキスト", 5);
        assert!(fitted.ends_with('…'));
        assert!(fitted.chars().count() <= 3);
    }
}
