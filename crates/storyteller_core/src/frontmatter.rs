//! Frontmatter envelope codec.
//!
//! # Responsibility
//! - Fold a document's intents and body into one exportable text blob.
//! - Parse such a blob back into body plus intents.
//!
//! # Invariants
//! - `encode` is the identity on `body` when both intents are blank.
//! - `decode(encode(b, s, c))` yields `b` exactly when an intent is present.
//! - A fence is only recognized at offset 0.
//! - Intent values are written on one line: `\\`, `\n` and `\r` escape
//!   backslashes and line breaks, so no value can end the metadata block.

use crate::model::document::Intents;

/// Line that opens and closes the metadata block.
pub const FENCE: &str = "---";

const STORY_INTENT_KEY: &str = "story_intent";
const CHAPTER_INTENT_KEY: &str = "chapter_intent";

/// Decoded form of an envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Envelope {
    pub body: String,
    pub intents: Intents,
}

/// Encodes body and intents into one text blob.
pub fn encode(body: &str, story_intent: &str, chapter_intent: &str) -> String {
    let story_intent = story_intent.trim();
    let chapter_intent = chapter_intent.trim();
    if story_intent.is_empty() && chapter_intent.is_empty() {
        return body.to_string();
    }
    let story_intent = escape_value(story_intent);
    let chapter_intent = escape_value(chapter_intent);
    format!(
        "{FENCE}\n{STORY_INTENT_KEY}: {story_intent}\n{CHAPTER_INTENT_KEY}: {chapter_intent}\n{FENCE}\n\n{body}"
    )
}

/// Decodes a text blob; text without a leading fence is all body.
pub fn decode(text: &str) -> Envelope {
    match split_envelope(text) {
        Some((metadata, body)) => {
            let mut intents = Intents::default();
            for line in metadata.lines() {
                let Some((key, value)) = line.split_once(':') else {
                    continue;
                };
                match key.trim() {
                    STORY_INTENT_KEY => intents.story_intent = unescape_value(value.trim()),
                    CHAPTER_INTENT_KEY => intents.chapter_intent = unescape_value(value.trim()),
                    _ => {}
                }
            }
            Envelope {
                body: body.to_string(),
                intents,
            }
        }
        None => Envelope {
            body: text.to_string(),
            intents: Intents::default(),
        },
    }
}

fn escape_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Inverse of `escape_value`; unknown escapes are kept verbatim.
fn unescape_value(value: &str) -> String {
    let mut unescaped = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            unescaped.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => unescaped.push('\\'),
            Some('n') => unescaped.push('\n'),
            Some('r') => unescaped.push('\r'),
            Some(other) => {
                unescaped.push('\\');
                unescaped.push(other);
            }
            None => unescaped.push('\\'),
        }
    }
    unescaped
}

/// Returns `(metadata, body)` when `text` starts with a complete fence block.
fn split_envelope(text: &str) -> Option<(&str, &str)> {
    let after_open = strip_fence_line(text)?;
    let mut consumed = 0;
    for line in after_open.split_inclusive('\n') {
        if line_content(line) == FENCE {
            let metadata = &after_open[..consumed];
            let rest = &after_open[consumed + line.len()..];
            return Some((metadata, strip_blank_line(rest)));
        }
        consumed += line.len();
    }
    None
}

fn strip_fence_line(text: &str) -> Option<&str> {
    let first = text.split_inclusive('\n').next()?;
    if line_content(first) == FENCE && first.ends_with('\n') {
        Some(&text[first.len()..])
    } else {
        None
    }
}

fn strip_blank_line(text: &str) -> &str {
    text.strip_prefix("\r\n")
        .or_else(|| text.strip_prefix('\n'))
        .unwrap_or(text)
}

fn line_content(line: &str) -> &str {
    line.trim_end_matches('\n').trim_end_matches('\r')
}
