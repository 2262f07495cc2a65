//! Property tests for whitespace normalization and unique matching.

use edit_patcher::{find_unique, strip_whitespace, MatchError, PositionMap};
use proptest::prelude::*;

/// Pattern text: a small alphabet with multi-byte letters and mixed spaces.
fn pattern_text() -> impl Strategy<Value = String> {
    "[a-cé日 \t\u{3000}]{1,16}".prop_filter("needs a non-whitespace char", |s| {
        !strip_whitespace(s).is_empty()
    })
}

/// Surrounding text that never shares a non-whitespace char with patterns.
fn filler_text() -> impl Strategy<Value = String> {
    "[x-zß\n \t]{0,16}"
}

proptest! {
    #[test]
    fn normalization_is_a_fixed_point(text in "\\PC{0,64}") {
        let once = strip_whitespace(&text);
        prop_assert_eq!(strip_whitespace(&once), once);
    }

    #[test]
    fn normalization_keeps_line_breaks(text in "[a-z \t\r\n\u{00A0}]{0,64}") {
        let stripped = strip_whitespace(&text);
        prop_assert_eq!(
            stripped.matches('\n').count(),
            text.matches('\n').count()
        );
        prop_assert_eq!(
            stripped.matches('\r').count(),
            text.matches('\r').count()
        );
    }

    #[test]
    fn position_map_spans_are_char_aligned(text in "\\PC{0,64}") {
        let map = PositionMap::build(&text);
        prop_assert_eq!(map.normalized(), strip_whitespace(&text));
        for (i, c) in map.chars().iter().enumerate() {
            let span = map.span(i).unwrap();
            prop_assert!(text.is_char_boundary(span.start));
            prop_assert!(text.is_char_boundary(span.end));
            prop_assert_eq!(&text[span], c.to_string());
        }
    }

    #[test]
    fn single_occurrence_is_found(
        prefix in filler_text(),
        pattern in pattern_text(),
        suffix in filler_text(),
    ) {
        let content = format!("{prefix}{pattern}{suffix}");
        let span = find_unique(&content, &pattern).unwrap();

        prop_assert!(span.start <= span.end);
        prop_assert!(content.is_char_boundary(span.start));
        prop_assert!(content.is_char_boundary(span.end));
        prop_assert_eq!(
            strip_whitespace(&content[span.range()]),
            strip_whitespace(&pattern)
        );
    }

    #[test]
    fn repeated_occurrence_is_ambiguous(
        pattern in pattern_text(),
        gap in filler_text(),
    ) {
        let content = format!("{pattern}{gap}x{pattern}");
        let result = find_unique(&content, &pattern);
        prop_assert!(
            matches!(result, Err(MatchError::Ambiguous { count }) if count >= 2),
            "expected ambiguity, got {:?}",
            result
        );
    }

    #[test]
    fn newline_only_difference_does_not_match(
        left in "[a-c]{1,8}",
        right in "[a-c]{1,8}",
    ) {
        let content = format!("{left} {right}");
        let pattern = format!("{left}\n{right}");
        prop_assert_eq!(find_unique(&content, &pattern), Err(MatchError::NotFound));
    }
}
