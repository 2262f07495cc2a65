//! Whitespace-insensitive unique match location.
//!
//! The pattern and the buffer are both reduced to their [`PositionMap`] view,
//! the pattern is searched for as a contiguous character run, and the single
//! hit is translated back to a byte span in the original buffer.

use crate::normalize::{strip_whitespace, PositionMap};
use std::ops::Range;
use thiserror::Error;
use tracing::debug;

/// Byte span of the unique occurrence of a pattern in the original text.
///
/// Both offsets are on char boundaries and `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchSpan {
    /// Starting byte offset (inclusive)
    pub start: usize,
    /// Ending byte offset (exclusive)
    pub end: usize,
}

impl MatchSpan {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchError {
    /// No occurrence, or the pattern normalized to nothing.
    #[error("pattern not found when ignoring whitespace")]
    NotFound,

    #[error("pattern found at {count} locations when ignoring whitespace, expected exactly 1")]
    Ambiguous { count: usize },
}

/// Locate the single whitespace-insensitive occurrence of `pattern` in `content`.
pub fn find_unique(content: &str, pattern: &str) -> Result<MatchSpan, MatchError> {
    let needle: Vec<char> = strip_whitespace(pattern).chars().collect();
    if needle.is_empty() {
        return Err(MatchError::NotFound);
    }

    let map = PositionMap::build(content);
    let haystack = map.chars();

    let first = find_chars(haystack, &needle).ok_or(MatchError::NotFound)?;
    let last = rfind_chars(haystack, &needle).ok_or(MatchError::NotFound)?;
    if first != last {
        let count = count_chars(haystack, &needle);
        debug!(count, "whitespace-insensitive pattern is ambiguous");
        return Err(MatchError::Ambiguous { count });
    }

    let start = map.span(first).ok_or(MatchError::NotFound)?.start;
    let end = map
        .span(first + needle.len() - 1)
        .ok_or(MatchError::NotFound)?
        .end;
    debug!(start, end, "located unique whitespace-insensitive match");

    Ok(MatchSpan { start, end })
}

fn find_chars(haystack: &[char], needle: &[char]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn rfind_chars(haystack: &[char], needle: &[char]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).rposition(|w| w == needle)
}

/// Number of (possibly overlapping) occurrences, only for error reporting.
fn count_chars(haystack: &[char], needle: &[char]) -> usize {
    if needle.is_empty() || needle.len() > haystack.len() {
        return 0;
    }
    haystack.windows(needle.len()).filter(|w| *w == needle).count()
}
