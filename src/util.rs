//! Shared utility functions

/// Truncate a string to at most `max_len` bytes, appending "..." if truncated.
/// Cuts at a char boundary.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let suffix = "...";
    let mut end = max_len.saturating_sub(suffix.len());
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{}", &s[..end], suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_strings_are_untouched() {
        assert_eq!(truncate_str("Not Found", 200), "Not Found");
    }

    #[test]
    fn test_long_bodies_are_cut() {
        let body = "x".repeat(500);
        let cut = truncate_str(&body, 20);
        assert_eq!(cut.len(), 20);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn test_cuts_on_char_boundary() {
        // 'é' is two bytes; a cut at byte 3 would split the second one
        assert_eq!(truncate_str("éééé", 6), "é...");
    }
}
