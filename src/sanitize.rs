//! Input cleanup for match and replacement text.
//!
//! Upstream formatting sometimes leaves escape or delimiter artifacts in front
//! of the text an agent meant to send. Those are stripped before matching.

/// Leading tokens that never belong at the start of a pattern.
const NOISE_PREFIXES: [char; 3] = ['\\', ':', ';'];

/// Trim surrounding whitespace, then strip leading noise tokens (re-trimming
/// after each) until none is left as a prefix.
pub fn sanitize(input: &str) -> String {
    let mut text = input.trim();
    while let Some(rest) = text.strip_prefix(NOISE_PREFIXES) {
        text = rest.trim();
    }
    text.to_string()
}
