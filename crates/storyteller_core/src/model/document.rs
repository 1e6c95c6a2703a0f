//! Document domain model.
//!
//! # Responsibility
//! - Define the story record shared by the editor, autosave and export paths.
//! - Own the title sentinel and the intent pair passed to providers.
//!
//! # Invariants
//! - `id` is stable and never reused for another document.
//! - `title` is never empty once normalized for storage.
//! - `last_modified` never moves backwards for a given `id`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for one story document.
pub type DocumentId = Uuid;

/// Title used whenever a document has no usable title.
pub const DEFAULT_TITLE: &str = "Untitled";

/// Narrative metadata attached to a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intents {
    /// What the whole story is about.
    pub story_intent: String,
    /// What the current chapter should achieve.
    pub chapter_intent: String,
}

impl Intents {
    pub fn new(story_intent: impl Into<String>, chapter_intent: impl Into<String>) -> Self {
        Self {
            story_intent: story_intent.into(),
            chapter_intent: chapter_intent.into(),
        }
    }

    /// Returns whether both intents are blank after trimming.
    pub fn is_blank(&self) -> bool {
        self.story_intent.trim().is_empty() && self.chapter_intent.trim().is_empty()
    }
}

/// Canonical story record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Stable id, immutable after creation.
    pub id: DocumentId,
    /// Display title, derived from the first `## ` heading on autosave.
    pub title: String,
    /// Plain-text body as projected from the editable surface.
    pub body: String,
    pub story_intent: String,
    pub chapter_intent: String,
    /// Unix epoch milliseconds of the last persisted write.
    pub last_modified: i64,
}

impl Document {
    /// Creates an empty document with a generated id.
    pub fn new(title: &str, now_ms: i64) -> Self {
        Self::with_id(Uuid::new_v4(), title, now_ms)
    }

    /// Creates an empty document with a caller-provided id.
    ///
    /// Used by import paths where identity already exists externally.
    pub fn with_id(id: DocumentId, title: &str, now_ms: i64) -> Self {
        Self {
            id,
            title: normalize_title(title),
            body: String::new(),
            story_intent: String::new(),
            chapter_intent: String::new(),
            last_modified: now_ms,
        }
    }

    /// Returns the intent pair of this document.
    pub fn intents(&self) -> Intents {
        Intents::new(self.story_intent.clone(), self.chapter_intent.clone())
    }

    /// Replaces both intents.
    pub fn set_intents(&mut self, intents: Intents) {
        self.story_intent = intents.story_intent;
        self.chapter_intent = intents.chapter_intent;
    }
}

/// Normalizes a title for storage; blank values become [`DEFAULT_TITLE`].
pub fn normalize_title(title: &str) -> String {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        DEFAULT_TITLE.to_string()
    } else {
        trimmed.to_string()
    }
}
