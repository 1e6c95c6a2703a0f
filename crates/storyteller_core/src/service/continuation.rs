//! Continuation ("next sentence") affordance.
//!
//! # Responsibility
//! - Decide when a continuation is offered (caret at a finished paragraph).
//! - Append a provider sentence as a new paragraph and schedule autosave.
//! - Track first-run and one-time tip flags through injected preferences.

use crate::editor::paragraph::caret_at_paragraph_end;
use crate::editor::surface::EditableSurface;
use crate::model::document::Intents;
use crate::provider::spi::{ContinuationProvider, ProviderError};
use crate::repo::preferences_repo::PreferencesRepository;
use crate::repo::StoreError;
use crate::service::autosave::AutosaveController;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

const PARAGRAPH_BREAK_NEWLINES: usize = 2;

/// What a continuation inserted and what the host should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContinuationOutcome {
    /// Exact text inserted, separator included.
    pub inserted: String,
    /// The one-time tip should be displayed now.
    pub show_tip: bool,
}

#[derive(Debug)]
pub enum ContinuationError {
    Provider(ProviderError),
    Preferences(StoreError),
}

impl Display for ContinuationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Provider(err) => write!(f, "{err}"),
            Self::Preferences(err) => write!(f, "preferences unavailable: {err}"),
        }
    }
}

impl Error for ContinuationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Provider(err) => Some(err),
            Self::Preferences(err) => Some(err),
        }
    }
}

impl From<ProviderError> for ContinuationError {
    fn from(value: ProviderError) -> Self {
        Self::Provider(value)
    }
}

impl From<StoreError> for ContinuationError {
    fn from(value: StoreError) -> Self {
        Self::Preferences(value)
    }
}

/// Returns whether the continuation affordance should be visible.
pub fn is_continuation_available<S: EditableSurface + ?Sized>(surface: &S) -> bool {
    caret_at_paragraph_end(surface)
}

/// Appends one provider sentence as a new paragraph at the end.
///
/// Preferences are read before the provider runs, so an unavailable store
/// fails without touching the surface. Provider failures also leave the
/// surface untouched.
pub fn continue_story<S, P, R>(
    surface: &mut S,
    provider: &P,
    intents: &Intents,
    preferences: &R,
    autosave: &mut AutosaveController,
    now_ms: i64,
) -> Result<ContinuationOutcome, ContinuationError>
where
    S: EditableSurface + ?Sized,
    P: ContinuationProvider + ?Sized,
    R: PreferencesRepository + ?Sized,
{
    let mut flags = preferences.load()?;
    let context = surface.project_to_text();
    let sentence = provider.generate(&context, intents)?;

    let inserted = format!("{}{sentence}", paragraph_separator(&context));
    surface.place_caret_at(context.chars().count());
    surface.insert_at_caret(&inserted);
    autosave.record_mutation(now_ms);

    let show_tip = !flags.continuation_tip_seen;
    flags.continuation_tip_seen = true;
    flags.first_run_complete = true;
    preferences.save(&flags)?;

    info!(
        "event=continuation_insert module=continuation status=ok inserted_chars={} show_tip={}",
        inserted.chars().count(),
        show_tip
    );
    Ok(ContinuationOutcome { inserted, show_tip })
}

/// Newlines needed so the next text starts a new paragraph.
fn paragraph_separator(context: &str) -> String {
    if context.trim_end().is_empty() {
        return String::new();
    }
    let trailing = &context[context.trim_end().len()..];
    let present = trailing.chars().filter(|c| *c == '\n').count();
    "\n".repeat(PARAGRAPH_BREAK_NEWLINES.saturating_sub(present))
}
