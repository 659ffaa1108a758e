//! Best-effort text extraction from raw document artifacts
//!
//! Content kind is sniffed from the bytes (and the upstream Content-Type when
//! available), never from the file name. Extraction failures never propagate
//! past this boundary; callers get an empty string and a log line.

use scraper::Html;

/// Detected content category of a raw artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Pdf,
    Html,
    Unknown,
}

/// Sniff the content kind from leading bytes, falling back to the
/// server-reported content type.
pub fn detect_content_kind(bytes: &[u8], content_type: Option<&str>) -> ContentKind {
    if bytes.starts_with(b"%PDF-") {
        return ContentKind::Pdf;
    }

    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(512)]).to_lowercase();
    if head.contains("<!doctype html") || head.contains("<html") {
        return ContentKind::Html;
    }

    match content_type {
        Some(ct) if ct.contains("pdf") => ContentKind::Pdf,
        Some(ct) if ct.contains("html") => ContentKind::Html,
        _ => ContentKind::Unknown,
    }
}

/// Best-effort plain-text extractor for raw document blobs
pub struct TextExtractor;

impl TextExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract plain text from a raw blob of the given kind.
    ///
    /// Returns an empty string when extraction fails or the kind is unknown.
    pub fn extract(&self, bytes: &[u8], kind: ContentKind) -> String {
        match kind {
            ContentKind::Pdf => self.extract_pdf(bytes),
            ContentKind::Html => self.extract_html(bytes),
            ContentKind::Unknown => {
                tracing::debug!("Unknown content kind, no text extracted");
                String::new()
            }
        }
    }

    fn extract_pdf(&self, bytes: &[u8]) -> String {
        match pdf_extract::extract_text_from_mem(bytes) {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                tracing::warn!("PDF extraction failed: {}", e);
                String::new()
            }
        }
    }

    fn extract_html(&self, bytes: &[u8]) -> String {
        let html = String::from_utf8_lossy(bytes);
        let document = Html::parse_document(&html);
        let mut lines = Vec::new();
        for text in document.root_element().text() {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                lines.push(trimmed.to_string());
            }
        }
        lines.join("\n")
    }
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_pdf_magic_bytes() {
        assert_eq!(detect_content_kind(b"%PDF-1.7 rest", None), ContentKind::Pdf);
    }

    #[test]
    fn test_detect_html_body() {
        assert_eq!(
            detect_content_kind(b"<!DOCTYPE html><html><body>x</body></html>", None),
            ContentKind::Html
        );
        assert_eq!(
            detect_content_kind(b"\n <HTML><head></head></HTML>", None),
            ContentKind::Html
        );
    }

    #[test]
    fn test_detect_falls_back_to_content_type() {
        assert_eq!(
            detect_content_kind(b"garbage", Some("application/pdf")),
            ContentKind::Pdf
        );
        assert_eq!(
            detect_content_kind(b"plain words", Some("text/html; charset=utf-8")),
            ContentKind::Html
        );
        assert_eq!(detect_content_kind(b"plain words", None), ContentKind::Unknown);
    }

    #[test]
    fn test_html_extraction() {
        let html = b"<html><body><h1>Opinion</h1><p>The judgment is affirmed.</p></body></html>";
        let text = TextExtractor::new().extract(html, ContentKind::Html);
        assert!(text.contains("Opinion"));
        assert!(text.contains("The judgment is affirmed."));
    }

    #[test]
    fn test_broken_pdf_yields_empty() {
        let text = TextExtractor::new().extract(b"%PDF-1.4 not actually a pdf", ContentKind::Pdf);
        assert!(text.is_empty());
    }

    #[test]
    fn test_unknown_kind_yields_empty() {
        let text = TextExtractor::new().extract(b"\x00\x01\x02", ContentKind::Unknown);
        assert!(text.is_empty());
    }
}
