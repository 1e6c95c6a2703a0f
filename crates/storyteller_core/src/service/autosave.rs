//! Debounced autosave controller.
//!
//! # Responsibility
//! - Collapse bursts of mutations into one trailing-edge save.
//! - Materialize the in-memory document (body, intents, title) at save time.
//! - Notify observers about save progress and listing changes.
//!
//! # Invariants
//! - One deadline per controller; a new mutation replaces it.
//! - At most one save in flight; mutations during `Saving` queue a new
//!   debounce cycle instead of interleaving.
//! - A save in flight cannot be cancelled; hosts wait for it to settle.
//! - Failures are reported once and never retried here.

use crate::editor::surface::EditableSurface;
use crate::model::document::{normalize_title, Document, DocumentId, Intents, DEFAULT_TITLE};
use crate::repo::document_repo::DocumentStore;
use crate::repo::{StoreError, StoreResult};
use log::{debug, error, info};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Body lines starting with this marker name the document.
pub const HEADING_MARKER: &str = "## ";

static HEADING_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^##\s+").expect("valid heading prefix regex"));

/// Controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutosaveState {
    Idle,
    /// Debounce running; save once `now >= deadline_ms`.
    PendingSave { deadline_ms: i64 },
    Saving,
}

/// Notifications emitted to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutosaveEvent {
    /// Debounce elapsed and a save started.
    Saving { id: DocumentId },
    Saved { id: DocumentId, last_modified: i64 },
    /// The document listing may have a new order or title.
    ListingChanged,
    SaveFailed { id: DocumentId, message: String },
}

/// Autosave failure surfaced to the host.
#[derive(Debug)]
pub enum AutosaveError {
    Store(StoreError),
}

impl Display for AutosaveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "autosave failed: {err}"),
        }
    }
}

impl Error for AutosaveError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
        }
    }
}

impl From<StoreError> for AutosaveError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Materialized document handed out by `begin_save`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveTicket {
    document: Document,
}

impl SaveTicket {
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Mutable access for the store, which stamps `last_modified`.
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }
}

type Observer = Box<dyn FnMut(&AutosaveEvent)>;

/// Per-document autosave state machine driven by host-supplied time.
pub struct AutosaveController {
    document: Document,
    intents: Intents,
    delay_ms: i64,
    state: AutosaveState,
    /// Time of the last mutation seen while `Saving`.
    queued_at_ms: Option<i64>,
    observers: Vec<Observer>,
}

impl AutosaveController {
    pub fn new(document: Document, delay_ms: u64) -> Self {
        Self {
            intents: document.intents(),
            document,
            delay_ms: i64::try_from(delay_ms).unwrap_or(i64::MAX),
            state: AutosaveState::Idle,
            queued_at_ms: None,
            observers: Vec::new(),
        }
    }

    /// Last persisted (or loaded) document.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Live intent fields, including unsaved edits.
    pub fn intents(&self) -> &Intents {
        &self.intents
    }

    pub fn state(&self) -> AutosaveState {
        self.state
    }

    pub fn delay_ms(&self) -> i64 {
        self.delay_ms
    }

    /// Returns whether any mutation has not been persisted yet.
    pub fn has_pending_changes(&self) -> bool {
        matches!(self.state, AutosaveState::PendingSave { .. }) || self.queued_at_ms.is_some()
    }

    pub fn subscribe(&mut self, observer: impl FnMut(&AutosaveEvent) + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Swaps in another document and drops any pending debounce.
    ///
    /// A save already in flight still completes, but its result is not
    /// adopted as the current document.
    pub fn replace_document(&mut self, document: Document) {
        self.intents = document.intents();
        self.document = document;
        self.queued_at_ms = None;
        if self.state != AutosaveState::Saving {
            self.state = AutosaveState::Idle;
        }
    }

    /// Records a surface edit and (re)starts the debounce.
    pub fn record_mutation(&mut self, now_ms: i64) {
        match self.state {
            AutosaveState::Saving => {
                self.queued_at_ms = Some(now_ms);
                debug!(
                    "event=autosave_queue module=autosave status=queued id={}",
                    self.document.id
                );
            }
            AutosaveState::Idle | AutosaveState::PendingSave { .. } => {
                self.state = AutosaveState::PendingSave {
                    deadline_ms: now_ms.saturating_add(self.delay_ms),
                };
            }
        }
    }

    pub fn set_story_intent(&mut self, value: impl Into<String>, now_ms: i64) {
        self.intents.story_intent = value.into();
        self.record_mutation(now_ms);
    }

    pub fn set_chapter_intent(&mut self, value: impl Into<String>, now_ms: i64) {
        self.intents.chapter_intent = value.into();
        self.record_mutation(now_ms);
    }

    /// Returns whether the debounce deadline has elapsed.
    pub fn is_due(&self, now_ms: i64) -> bool {
        matches!(self.state, AutosaveState::PendingSave { deadline_ms } if now_ms >= deadline_ms)
    }

    /// Starts a save when the deadline has elapsed.
    ///
    /// Returns `None` when nothing is due or a save is already in flight.
    pub fn begin_save<S: EditableSurface + ?Sized>(
        &mut self,
        now_ms: i64,
        surface: &S,
    ) -> Option<SaveTicket> {
        if !self.is_due(now_ms) {
            return None;
        }
        Some(self.start_saving(surface))
    }

    /// Settles the save started by `begin_save`.
    pub fn complete_save(
        &mut self,
        ticket: SaveTicket,
        result: StoreResult<()>,
    ) -> Result<Document, AutosaveError> {
        let id = ticket.document.id;
        self.state = match self.queued_at_ms.take() {
            Some(queued_at_ms) => AutosaveState::PendingSave {
                deadline_ms: queued_at_ms.saturating_add(self.delay_ms),
            },
            None => AutosaveState::Idle,
        };

        match result {
            Ok(()) => {
                let saved = ticket.document;
                info!(
                    "event=autosave module=autosave status=ok id={} last_modified={}",
                    id, saved.last_modified
                );
                if saved.id == self.document.id {
                    self.document = saved.clone();
                }
                self.emit(&AutosaveEvent::Saved {
                    id,
                    last_modified: saved.last_modified,
                });
                self.emit(&AutosaveEvent::ListingChanged);
                Ok(saved)
            }
            Err(err) => {
                error!(
                    "event=autosave module=autosave status=error id={} error={}",
                    id, err
                );
                self.emit(&AutosaveEvent::SaveFailed {
                    id,
                    message: err.to_string(),
                });
                Err(err.into())
            }
        }
    }

    /// Saves through `store` when the debounce has elapsed.
    pub fn poll<S, D>(
        &mut self,
        now_ms: i64,
        surface: &S,
        store: &D,
    ) -> Result<Option<Document>, AutosaveError>
    where
        S: EditableSurface + ?Sized,
        D: DocumentStore + ?Sized,
    {
        match self.begin_save(now_ms, surface) {
            Some(ticket) => self.persist(ticket, store).map(Some),
            None => Ok(None),
        }
    }

    /// Saves immediately when a debounce is pending, ignoring its deadline.
    pub fn flush<S, D>(&mut self, surface: &S, store: &D) -> Result<Option<Document>, AutosaveError>
    where
        S: EditableSurface + ?Sized,
        D: DocumentStore + ?Sized,
    {
        if !matches!(self.state, AutosaveState::PendingSave { .. }) {
            return Ok(None);
        }
        let ticket = self.start_saving(surface);
        self.persist(ticket, store).map(Some)
    }

    fn persist<D: DocumentStore + ?Sized>(
        &mut self,
        mut ticket: SaveTicket,
        store: &D,
    ) -> Result<Document, AutosaveError> {
        let result = store.save(ticket.document_mut());
        self.complete_save(ticket, result)
    }

    fn start_saving<S: EditableSurface + ?Sized>(&mut self, surface: &S) -> SaveTicket {
        self.state = AutosaveState::Saving;
        let id = self.document.id;
        self.emit(&AutosaveEvent::Saving { id });

        let body = surface.project_to_text();
        let mut document = self.document.clone();
        document.title = derive_title(&body, &self.document.title);
        document.body = body;
        document.set_intents(self.intents.clone());
        debug!(
            "event=autosave_begin module=autosave status=start id={} body_chars={}",
            id,
            document.body.chars().count()
        );
        SaveTicket { document }
    }

    fn emit(&mut self, event: &AutosaveEvent) {
        for observer in &mut self.observers {
            observer(event);
        }
    }
}

/// Title from the first `## ` heading, else the previous title.
///
/// A heading with no text yields [`DEFAULT_TITLE`].
pub fn derive_title(body: &str, previous: &str) -> String {
    match body.lines().find(|line| line.starts_with(HEADING_MARKER)) {
        Some(line) => {
            let title = HEADING_PREFIX_RE.replace(line, "");
            let title = title.trim();
            if title.is_empty() {
                DEFAULT_TITLE.to_string()
            } else {
                title.to_string()
            }
        }
        None => normalize_title(previous),
    }
}
