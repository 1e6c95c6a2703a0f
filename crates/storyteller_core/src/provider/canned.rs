//! Deterministic canned provider.
//!
//! Stand-in used when no real generator is wired up: continuations come
//! from a fixed list of bridge sentences, rewrites from keyword rules.

use crate::model::document::Intents;
use crate::provider::spi::{
    ContinuationProvider, ProviderResult, RewriteProvider, SuggestionProvider,
};
use once_cell::sync::Lazy;
use regex::Regex;

pub const CANNED_PROVIDER_ID: &str = "canned";

const MAX_SENTENCE_WORDS: usize = 30;
const SUBJECT_PLACEHOLDER: &str = "{subject}";

const BRIDGES: &[&str] = &[
    "and the silence answered in a voice only {subject} could hear.",
    "while the next breath carried a promise {subject} could no longer ignore.",
    "as if the room itself leaned closer to witness what came next.",
    "and even then, {subject} sensed the night was withholding its truest name.",
    "until the smallest sound made every certainty feel suddenly fragile.",
];

static FIRST_PERSON_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bI\b").expect("valid first person regex"));
static HE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bhe\b").expect("valid he regex"));
static SHE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bshe\b").expect("valid she regex"));
static TRAILING_PUNCT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?]+$").expect("valid trailing punctuation regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));
static PAST_TENSE_RULES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [(r"\bis\b", "was"), (r"\bare\b", "were"), (r"\bwalks\b", "walked")]
        .into_iter()
        .map(|(pattern, replacement)| {
            (
                Regex::new(pattern).expect("valid past tense regex"),
                replacement,
            )
        })
        .collect()
});

/// Canned continuation/rewrite provider.
#[derive(Debug, Clone, Default)]
pub struct CannedProvider {
    seed: usize,
}

impl CannedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shifts which bridge sentence is picked for a given context.
    pub fn with_seed(seed: usize) -> Self {
        Self { seed }
    }
}

impl ContinuationProvider for CannedProvider {
    fn generate(&self, context: &str, intents: &Intents) -> ProviderResult<String> {
        let full_context = format!(
            "{context}\n{}\n{}",
            intents.story_intent, intents.chapter_intent
        );
        let full_context = full_context.trim();
        let subject = detect_subject(full_context);
        let index = self.seed.wrapping_add(full_context.chars().count()) % BRIDGES.len();
        let line = BRIDGES[index].replace(SUBJECT_PLACEHOLDER, subject);

        let words = line
            .split_whitespace()
            .take(MAX_SENTENCE_WORDS)
            .collect::<Vec<_>>()
            .join(" ");
        Ok(ensure_period(&words))
    }
}

impl RewriteProvider for CannedProvider {
    fn rewrite(&self, selected: &str, instruction: &str) -> ProviderResult<String> {
        let lower = instruction.to_lowercase();
        let rewritten = if lower.contains("short") {
            let first = selected.split([',', '.']).next().unwrap_or_default().trim();
            if first.is_empty() {
                selected.to_string()
            } else {
                ensure_period(first)
            }
        } else if lower.contains("tense") && lower.contains("past") {
            PAST_TENSE_RULES
                .iter()
                .fold(selected.to_string(), |text, (pattern, replacement)| {
                    pattern.replace_all(&text, *replacement).into_owned()
                })
        } else if lower.contains("poetic") || lower.contains("lyrical") {
            format!(
                "{}, like ink dissolving into dusk.",
                TRAILING_PUNCT_RE.replace(selected, "")
            )
        } else if lower.contains("clear") || lower.contains("clar") {
            WHITESPACE_RE.replace_all(selected, " ").trim().to_string()
        } else {
            ensure_period(selected)
        };
        Ok(rewritten)
    }
}

impl SuggestionProvider for CannedProvider {
    fn provider_id(&self) -> &str {
        CANNED_PROVIDER_ID
    }
}

fn detect_subject(text: &str) -> &'static str {
    if FIRST_PERSON_RE.is_match(text) {
        "I"
    } else if HE_RE.is_match(text) {
        "he"
    } else if SHE_RE.is_match(text) {
        "she"
    } else {
        "they"
    }
}

fn ensure_period(text: &str) -> String {
    if text.ends_with('.') {
        text.to_string()
    } else {
        format!("{}.", TRAILING_PUNCT_RE.replace(text, ""))
    }
}
