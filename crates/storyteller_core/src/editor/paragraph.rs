//! Paragraph-boundary detection over the plain-text projection.
//!
//! Pure and cheap enough to evaluate on every keystroke.

use super::surface::EditableSurface;
use once_cell::sync::Lazy;
use regex::Regex;

static PARAGRAPH_SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n(?:\r*\n)+").expect("valid paragraph separator regex"));

/// Returns whether `offset` sits at the end of a finished paragraph.
///
/// The paragraph before the caret (back to the last blank line) must end
/// with a period once trailing whitespace is ignored, and the caret must be
/// followed by nothing but whitespace or sit in a whitespace run holding a
/// paragraph separator: two line breaks with only `\r` between them. A
/// separator may straddle the caret (`"Hello.\n|\nNext"`).
pub fn is_paragraph_end(text: &str, offset: usize) -> bool {
    let split = text
        .char_indices()
        .nth(offset)
        .map_or(text.len(), |(index, _)| index);
    let (before, after) = text.split_at(split);

    let paragraph = PARAGRAPH_SEPARATOR_RE
        .split(before)
        .last()
        .unwrap_or_default()
        .trim_end();
    if !paragraph.ends_with('.') {
        return false;
    }

    let rest = after.trim_start();
    if rest.is_empty() {
        return true;
    }

    let leading = &after[..after.len() - rest.len()];
    let trailing = &before[before.trim_end().len()..];
    PARAGRAPH_SEPARATOR_RE.is_match(&format!("{trailing}{leading}"))
}

/// Surface-level check: requires a collapsed caret at a paragraph end.
pub fn caret_at_paragraph_end<S: EditableSurface + ?Sized>(surface: &S) -> bool {
    match surface.caret_offset() {
        Some(offset) => is_paragraph_end(&surface.project_to_text(), offset),
        None => false,
    }
}
