// src/util.rs — Shared utility functions

/// Truncate a string for display/logging (UTF-8 safe).
///
/// Returns a substring of at most `max_len` bytes, ensuring the cut
/// point falls on a valid UTF-8 character boundary.
pub fn truncate_str(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        s
    } else {
        let mut end = max_len;
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        &s[..end]
    }
}

/// Single-line preview of model output or an expression for log lines.
pub fn preview(s: &str, max_len: usize) -> String {
    let flat = s.split_whitespace().collect::<Vec<_>>().join(" ");
    let cut = truncate_str(&flat, max_len);
    if cut.len() < flat.len() {
        format!("{cut}...")
    } else {
        flat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short() {
        assert_eq!(truncate_str("rank(x)", 10), "rank(x)");
    }

    #[test]
    fn test_truncate_long() {
        assert_eq!(truncate_str("ts_mean(close, 20)", 7), "ts_mean");
    }

    #[test]
    fn test_truncate_multibyte() {
        // "建议" is 6 bytes, cutting at 4 must not split the second character
        assert_eq!(truncate_str("建议", 4), "建");
    }

    #[test]
    fn test_truncate_zero_max() {
        assert_eq!(truncate_str("rank(x)", 0), "");
    }

    #[test]
    fn test_preview_flattens_and_marks_cut() {
        assert_eq!(preview("a\n  b\tc", 20), "a b c");
        assert_eq!(preview("rank(close - open)", 4), "rank...");
    }
}
