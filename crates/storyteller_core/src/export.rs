//! Export projections consumed by file-download hosts.

use crate::frontmatter;
use crate::model::document::Document;
use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

const FALLBACK_FILE_STEM: &str = "story";

/// Supported export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Markdown,
    PlainText,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::PlainText => "txt",
        }
    }

    /// Renders `doc` in this format.
    pub fn render(self, doc: &Document) -> String {
        match self {
            Self::Markdown => to_markdown(doc),
            Self::PlainText => to_plain_text(doc),
        }
    }
}

/// Body wrapped in the intent frontmatter envelope.
pub fn to_markdown(doc: &Document) -> String {
    frontmatter::encode(&doc.body, &doc.story_intent, &doc.chapter_intent)
}

/// Body only.
pub fn to_plain_text(doc: &Document) -> String {
    doc.body.clone()
}

/// File name for an export: whitespace runs become `_`.
pub fn export_file_name(title: &str, format: ExportFormat) -> String {
    let trimmed = title.trim();
    let stem = if trimmed.is_empty() {
        FALLBACK_FILE_STEM.to_string()
    } else {
        WHITESPACE_RE.replace_all(trimmed, "_").into_owned()
    };
    format!("{stem}.{}", format.extension())
}

#[cfg(test)]
mod tests {
    use super::{export_file_name, to_markdown, to_plain_text, ExportFormat};
    use crate::model::document::Document;

    #[test]
    fn markdown_export_adds_frontmatter_only_with_intents() {
        let mut doc = Document::new("Draft", 0);
        doc.body = "Body.".to_string();
        assert_eq!(to_markdown(&doc), "Body.");

        doc.story_intent = "mystery".to_string();
        assert!(to_markdown(&doc).starts_with("---\nstory_intent: mystery\n"));
        assert_eq!(to_plain_text(&doc), "Body.");
    }

    #[test]
    fn file_name_replaces_whitespace_and_falls_back() {
        assert_eq!(
            export_file_name("The  Long\tNight", ExportFormat::Markdown),
            "The_Long_Night.md"
        );
        assert_eq!(export_file_name("  ", ExportFormat::PlainText), "story.txt");
    }
}
