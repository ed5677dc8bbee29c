//! Character offset helpers and line break boundaries.
//!
//! Break policy: a line may only open or close *immediately after* a
//! whitespace character. The single exception is a token wider than the
//! viewport, which is split at a grapheme cluster boundary so a cluster is
//! never torn apart.

use unicode_segmentation::UnicodeSegmentation;

/// Byte index of the `char_idx`-th character (clamped to `text.len()`).
pub fn char_to_byte(text: &str, char_idx: usize) -> usize {
    text.char_indices()
        .nth(char_idx)
        .map(|(b, _)| b)
        .unwrap_or(text.len())
}

pub fn char_count(text: &str) -> usize {
    text.chars().count()
}

/// Slice `text` by a character range. Bounds past the end are clamped.
pub fn slice_chars(text: &str, range: std::ops::Range<usize>) -> &str {
    let start = char_to_byte(text, range.start);
    let end = char_to_byte(text, range.end.max(range.start));
    &text[start..end]
}

#[inline]
pub fn is_break_char(ch: char) -> bool {
    ch.is_whitespace()
}

/// Line terminator check used to close a line block.
#[inline]
pub fn ends_with_line_terminator(text: &str) -> bool {
    text.ends_with('\n')
}

/// Walk `cut` backwards until the character before it is whitespace.
///
/// Returns 0 when no whitespace precedes `cut`.
pub fn snap_after_whitespace(text: &str, cut: usize) -> usize {
    let cut = cut.min(char_count(text));
    let byte = char_to_byte(text, cut);
    let mut pos = cut;
    for ch in text[..byte].chars().rev() {
        if is_break_char(ch) {
            break;
        }
        pos -= 1;
    }
    pos
}

/// Hard split point for an unsplittable token: the furthest grapheme boundary
/// at or before `cut`, but never less than one whole cluster.
pub fn hard_split_point(text: &str, cut: usize) -> usize {
    let mut chars = 0usize;
    let mut best = 0usize;
    for g in text.graphemes(true) {
        let n = g.chars().count();
        if chars + n > cut {
            if best == 0 {
                best = n;
            }
            break;
        }
        chars += n;
        best = chars;
    }
    best.min(char_count(text))
}
