//! Whitespace-stripped views of text with a map back to original byte spans.
//!
//! Every non-newline whitespace character is dropped. `\n` and `\r` are kept,
//! so line structure still has to agree between a pattern and the buffer.

use std::ops::Range;

/// True for whitespace that normalization removes (everything except CR/LF).
pub fn is_strippable_whitespace(c: char) -> bool {
    c.is_whitespace() && c != '\n' && c != '\r'
}

/// A whitespace-stripped buffer plus the original byte span of each kept char.
///
/// `spans[i]` is the `[start, end)` byte range in the source text of the
/// `i`-th character of `chars`. Both vectors always have the same length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionMap {
    chars: Vec<char>,
    spans: Vec<Range<usize>>,
}

impl PositionMap {
    /// Build the stripped view of `text`.
    pub fn build(text: &str) -> Self {
        let mut chars = Vec::with_capacity(text.len());
        let mut spans = Vec::with_capacity(text.len());

        for (offset, c) in text.char_indices() {
            if !is_strippable_whitespace(c) {
                chars.push(c);
                spans.push(offset..offset + c.len_utf8());
            }
        }

        Self { chars, spans }
    }

    /// Kept characters, in order.
    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    /// Original byte span of the `index`-th kept character.
    pub fn span(&self, index: usize) -> Option<Range<usize>> {
        self.spans.get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// The stripped text as a `String`.
    pub fn normalized(&self) -> String {
        self.chars.iter().collect()
    }
}

/// Strip non-newline whitespace, discarding position information.
pub fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !is_strippable_whitespace(*c)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_keeps_newlines() {
        assert_eq!(strip_whitespace("a b\t\nc\r\n d"), "ab\nc\r\nd");
    }

    #[test]
    fn test_strip_unicode_spaces() {
        // NBSP, ideographic space, em space
        assert_eq!(strip_whitespace("x\u{00A0}y\u{3000}z\u{2003}w"), "xyzw");
    }

    #[test]
    fn test_map_tracks_multibyte_offsets() {
        let text = "é ü\n日本";
        let map = PositionMap::build(text);
        assert_eq!(map.normalized(), "éü\n日本");
        assert_eq!(map.len(), 5);
        assert_eq!(map.span(0), Some(0..2));
        assert_eq!(map.span(1), Some(3..5));
        assert_eq!(map.span(2), Some(5..6));
        assert_eq!(map.span(3), Some(6..9));
        assert_eq!(map.span(4), Some(9..12));
        assert_eq!(map.span(5), None);
    }

    #[test]
    fn test_map_of_whitespace_only_is_empty() {
        let map = PositionMap::build(" \t \u{00A0}");
        assert!(map.is_empty());
        assert_eq!(map.normalized(), "");
    }

    #[test]
    fn test_spans_slice_back_to_chars() {
        let text = "  fn  main ( ) {\n\tprintln!(\"ß\");\n}";
        let map = PositionMap::build(text);
        for (i, c) in map.chars().iter().enumerate() {
            let span = map.span(i).unwrap();
            assert_eq!(&text[span], c.to_string());
        }
    }
}
