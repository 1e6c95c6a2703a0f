//! Editor session for the currently open story.
//!
//! # Responsibility
//! - Own the surface, autosave controller and rewrite session of one
//!   open document.
//! - Route host events (input, intent edits, selection, ticks) to them.
//! - Switch documents without losing pending edits.
//!
//! # Invariants
//! - The surface always shows the body of `autosave.document()` plus any
//!   unsaved edits.
//! - Switching documents flushes pending edits and closes the rewrite
//!   session first.

use crate::config::{ConfigError, CoreConfig};
use crate::editor::surface::EditableSurface;
use crate::export::{export_file_name, ExportFormat};
use crate::model::document::{Document, DocumentId, Intents, DEFAULT_TITLE};
use crate::provider::spi::{ContinuationProvider, RewriteProvider};
use crate::repo::document_repo::DocumentStore;
use crate::repo::preferences_repo::PreferencesRepository;
use crate::repo::StoreError;
use crate::service::autosave::{derive_title, AutosaveController, AutosaveError, AutosaveEvent};
use crate::service::continuation::{
    continue_story, is_continuation_available, ContinuationError, ContinuationOutcome,
};
use crate::service::rewrite::{
    Proposal, RewriteError, RewriteOutcome, RewriteSession, RewriteState,
};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Session-level failure.
#[derive(Debug)]
pub enum SessionError {
    Config(ConfigError),
    Store(StoreError),
    Autosave(AutosaveError),
    Rewrite(RewriteError),
    Continuation(ContinuationError),
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "invalid config: {err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Autosave(err) => write!(f, "{err}"),
            Self::Rewrite(err) => write!(f, "{err}"),
            Self::Continuation(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::Autosave(err) => Some(err),
            Self::Rewrite(err) => Some(err),
            Self::Continuation(err) => Some(err),
        }
    }
}

impl From<ConfigError> for SessionError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<StoreError> for SessionError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<AutosaveError> for SessionError {
    fn from(value: AutosaveError) -> Self {
        Self::Autosave(value)
    }
}

impl From<RewriteError> for SessionError {
    fn from(value: RewriteError) -> Self {
        Self::Rewrite(value)
    }
}

impl From<ContinuationError> for SessionError {
    fn from(value: ContinuationError) -> Self {
        Self::Continuation(value)
    }
}

pub type SessionResult<T> = Result<T, SessionError>;

/// One open document bound to a host surface.
pub struct EditorSession<S: EditableSurface> {
    surface: S,
    autosave: AutosaveController,
    rewrite: RewriteSession,
}

impl<S: EditableSurface> EditorSession<S> {
    /// Opens the most recently modified document, creating one if the
    /// store is empty.
    pub fn bootstrap<D: DocumentStore + ?Sized>(
        store: &D,
        surface: S,
        config: &CoreConfig,
    ) -> SessionResult<Self> {
        config.validate()?;
        let document = match store.list()?.into_iter().next() {
            Some(document) => document,
            None => store.create(DEFAULT_TITLE)?,
        };
        info!(
            "event=session_bootstrap module=session status=ok id={}",
            document.id
        );
        Self::with_document(document, surface, config)
    }

    /// Starts a session on an already loaded document.
    pub fn with_document(
        document: Document,
        surface: S,
        config: &CoreConfig,
    ) -> SessionResult<Self> {
        config.validate()?;
        let mut session = Self {
            surface,
            autosave: AutosaveController::new(document.clone(), config.autosave_delay_ms),
            rewrite: RewriteSession::new(),
        };
        session.surface.set_text(&document.body);
        Ok(session)
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Direct surface access for host-driven edits.
    ///
    /// Edits made here must be reported through [`Self::on_surface_input`].
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Last persisted state of the open document.
    pub fn document(&self) -> &Document {
        self.autosave.document()
    }

    pub fn autosave(&self) -> &AutosaveController {
        &self.autosave
    }

    pub fn intents(&self) -> &Intents {
        self.autosave.intents()
    }

    pub fn rewrite_state(&self) -> RewriteState {
        self.rewrite.state()
    }

    pub fn subscribe(&mut self, observer: impl FnMut(&AutosaveEvent) + 'static) {
        self.autosave.subscribe(observer);
    }

    /// Switches to `id`, creating a fresh document when it does not exist.
    pub fn open<D: DocumentStore + ?Sized>(
        &mut self,
        id: DocumentId,
        store: &D,
    ) -> SessionResult<&Document> {
        self.flush(store)?;
        let document = match store.get(id)? {
            Some(document) => document,
            None => {
                warn!(
                    "event=session_open module=session status=not_found id={} fallback=create",
                    id
                );
                store.create(DEFAULT_TITLE)?
            }
        };
        self.load(document);
        Ok(self.autosave.document())
    }

    /// Flushes pending edits, then creates and opens an empty document.
    pub fn new_document<D: DocumentStore + ?Sized>(
        &mut self,
        store: &D,
    ) -> SessionResult<&Document> {
        self.flush(store)?;
        let document = store.create(DEFAULT_TITLE)?;
        self.load(document);
        Ok(self.autosave.document())
    }

    /// Shows `document` without touching storage.
    ///
    /// Pending edits of the previous document are dropped; call
    /// [`Self::flush`] first to keep them.
    pub fn load(&mut self, document: Document) {
        self.rewrite.cancel();
        self.surface.set_text(&document.body);
        info!(
            "event=session_load module=session status=ok id={} body_chars={}",
            document.id,
            document.body.chars().count()
        );
        self.autosave.replace_document(document);
    }

    /// Reports an edit already applied to the surface.
    pub fn on_surface_input(&mut self, now_ms: i64) {
        self.autosave.record_mutation(now_ms);
        self.rewrite.on_selection_change(&self.surface);
    }

    pub fn set_story_intent(&mut self, value: impl Into<String>, now_ms: i64) {
        self.autosave.set_story_intent(value, now_ms);
    }

    pub fn set_chapter_intent(&mut self, value: impl Into<String>, now_ms: i64) {
        self.autosave.set_chapter_intent(value, now_ms);
    }

    pub fn on_selection_change(&mut self) -> RewriteState {
        self.rewrite.on_selection_change(&self.surface)
    }

    /// Drives the debounce; saves when the deadline has elapsed.
    pub fn tick<D: DocumentStore + ?Sized>(
        &mut self,
        now_ms: i64,
        store: &D,
    ) -> SessionResult<Option<Document>> {
        Ok(self.autosave.poll(now_ms, &self.surface, store)?)
    }

    /// Saves pending edits immediately.
    pub fn flush<D: DocumentStore + ?Sized>(
        &mut self,
        store: &D,
    ) -> SessionResult<Option<Document>> {
        Ok(self.autosave.flush(&self.surface, store)?)
    }

    pub fn propose_rewrite<P: RewriteProvider + ?Sized>(
        &mut self,
        instruction: &str,
        provider: &P,
    ) -> SessionResult<Proposal> {
        Ok(self.rewrite.propose(instruction, provider)?)
    }

    pub fn accept_rewrite(&mut self, now_ms: i64) -> SessionResult<RewriteOutcome> {
        Ok(self
            .rewrite
            .accept(&mut self.surface, &mut self.autosave, now_ms)?)
    }

    pub fn reject_rewrite(&mut self) -> bool {
        self.rewrite.reject()
    }

    pub fn cancel_rewrite(&mut self) {
        self.rewrite.cancel();
    }

    pub fn continuation_available(&self) -> bool {
        is_continuation_available(&self.surface)
    }

    pub fn continue_story<P, R>(
        &mut self,
        provider: &P,
        preferences: &R,
        now_ms: i64,
    ) -> SessionResult<ContinuationOutcome>
    where
        P: ContinuationProvider + ?Sized,
        R: PreferencesRepository + ?Sized,
    {
        let intents = self.autosave.intents().clone();
        Ok(continue_story(
            &mut self.surface,
            provider,
            &intents,
            preferences,
            &mut self.autosave,
            now_ms,
        )?)
    }

    /// Live view of the document, unsaved edits included.
    pub fn current_document(&self) -> Document {
        let persisted = self.autosave.document();
        let body = self.surface.project_to_text();
        let mut document = persisted.clone();
        document.title = derive_title(&body, &persisted.title);
        document.body = body;
        document.set_intents(self.autosave.intents().clone());
        document
    }

    pub fn export(&self, format: ExportFormat) -> String {
        format.render(&self.current_document())
    }

    pub fn export_markdown(&self) -> String {
        self.export(ExportFormat::Markdown)
    }

    pub fn export_plain_text(&self) -> String {
        self.export(ExportFormat::PlainText)
    }

    pub fn export_file_name(&self, format: ExportFormat) -> String {
        export_file_name(&self.current_document().title, format)
    }
}
