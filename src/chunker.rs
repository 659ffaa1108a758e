//! Word-window chunking
//!
//! Splits a document's full text into the bounded-size segments that get
//! embedded individually. Windows are `max_words` words each with no overlap;
//! the final window may be shorter.

/// Split text on whitespace into chunks of at most `max_words` words.
///
/// Chunk order follows document order. Empty or all-whitespace input yields
/// an empty vec.
pub fn chunk_text(text: &str, max_words: usize) -> Vec<String> {
    assert!(max_words >= 1, "max_words must be at least 1");
    let words: Vec<&str> = text.split_whitespace().collect();
    words
        .chunks(max_words)
        .map(|window| window.join(" "))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert!(chunk_text("", 200).is_empty());
        assert!(chunk_text("   \n\t ", 200).is_empty());
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = chunk_text("one two three", 200);
        assert_eq!(chunks, vec!["one two three"]);
    }

    #[test]
    fn test_window_sizes() {
        let text = (0..450).map(|i| i.to_string()).collect::<Vec<_>>().join(" ");
        let chunks = chunk_text(&text, 200);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].split_whitespace().count(), 200);
        assert_eq!(chunks[1].split_whitespace().count(), 200);
        // Last window may be shorter
        assert_eq!(chunks[2].split_whitespace().count(), 50);
    }

    #[test]
    fn test_exact_multiple_has_no_empty_tail() {
        let text = (0..400).map(|i| i.to_string()).collect::<Vec<_>>().join(" ");
        let chunks = chunk_text(&text, 200);
        assert_eq!(chunks.len(), 2);
    }

    #[test]
    fn test_round_trip_preserves_word_sequence() {
        let text = "  The   quick\nbrown fox\t jumps over the lazy dog  ";
        for max_words in 1..=10 {
            let chunks = chunk_text(text, max_words);
            let rejoined = chunks.join(" ");
            let original: Vec<&str> = text.split_whitespace().collect();
            let recovered: Vec<&str> = rejoined.split_whitespace().collect();
            assert_eq!(original, recovered, "max_words={max_words}");
        }
    }

    #[test]
    fn test_max_words_one() {
        let chunks = chunk_text("a b c", 1);
        assert_eq!(chunks, vec!["a", "b", "c"]);
    }
}
