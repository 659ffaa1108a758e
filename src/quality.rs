//! Text quality gate
//!
//! Heuristic accept/reject filter applied to extracted text before a document
//! is persisted. Rejects text that is too short or that carries a known
//! error-page signature. This is a blocklist, not a classifier; undetected
//! error pages are an accepted limitation.

/// Lowercase signatures of HTTP error pages and CDN/proxy banners
const ERROR_SIGNATURES: &[&str] = &[
    "403 forbidden",
    "404 not found",
    "access denied",
    "microsoft-azure-application-gateway",
    "cloudflare",
    "nginx",
    "bad gateway",
    "site can\u{2019}t be reached",
];

/// Minimum text length accepted when persisting fetched documents
pub const FETCH_MIN_CHARS: usize = 200;
/// Minimum text length accepted by the standalone conversion pass
pub const CONVERT_MIN_CHARS: usize = 50;

/// Whether extracted text looks like a real document body.
///
/// Accepts iff the trimmed text is at least `min_chars` long and contains no
/// known error signature (case-insensitive).
pub fn is_usable_text(text: &str, min_chars: usize) -> bool {
    // Character count, not byte length; opinion text is not pure ASCII
    if text.trim().chars().count() < min_chars {
        return false;
    }
    !is_error_page(text)
}

/// Whether the text matches a known error/blocking page signature
pub fn is_error_page(text: &str) -> bool {
    let lowered = text.to_lowercase();
    ERROR_SIGNATURES.iter().any(|sig| lowered.contains(sig))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_boundary() {
        let just_short = "a".repeat(FETCH_MIN_CHARS - 1);
        let exactly = "a".repeat(FETCH_MIN_CHARS);
        assert!(!is_usable_text(&just_short, FETCH_MIN_CHARS));
        assert!(is_usable_text(&exactly, FETCH_MIN_CHARS));
    }

    #[test]
    fn test_threshold_counts_characters_not_bytes() {
        // Two bytes per character in UTF-8; the gate must still see 199
        let just_short = "é".repeat(FETCH_MIN_CHARS - 1);
        let exactly = "é".repeat(FETCH_MIN_CHARS);
        assert!(!is_usable_text(&just_short, FETCH_MIN_CHARS));
        assert!(is_usable_text(&exactly, FETCH_MIN_CHARS));
    }

    #[test]
    fn test_whitespace_not_counted() {
        let padded = format!("  {}  \n", "a".repeat(FETCH_MIN_CHARS - 1));
        assert!(!is_usable_text(&padded, FETCH_MIN_CHARS));
    }

    #[test]
    fn test_error_signature_rejected() {
        let text = format!("{} 404 Not Found {}", "x".repeat(200), "y".repeat(200));
        assert!(!is_usable_text(&text, FETCH_MIN_CHARS));
    }

    #[test]
    fn test_signature_match_is_case_insensitive() {
        assert!(is_error_page("request blocked by CLOUDFLARE gateway"));
        assert!(is_error_page("502 Bad Gateway"));
    }

    #[test]
    fn test_clean_text_accepted() {
        let text = "The appellate court reviewed the record de novo. ".repeat(10);
        assert!(is_usable_text(&text, FETCH_MIN_CHARS));
        assert!(is_usable_text(&text, CONVERT_MIN_CHARS));
    }
}
