//! Core domain logic for Storyteller.
//! This crate is the single source of truth for editor, persistence and
//! suggestion invariants.

pub mod clock;
pub mod config;
pub mod db;
pub mod editor;
pub mod export;
pub mod frontmatter;
pub mod logging;
pub mod model;
pub mod provider;
pub mod repo;
pub mod service;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, CoreConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use editor::{
    caret_at_paragraph_end, is_paragraph_end, Anchor, EditableSurface, NodeId, NodeKind,
    RangeSnapshot, SurfaceError, SurfaceResult, TextRange, TreeSurface,
};
pub use export::{export_file_name, to_markdown, to_plain_text, ExportFormat};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::document::{Document, DocumentId, Intents, DEFAULT_TITLE};
pub use model::preferences::Preferences;
pub use provider::{
    CannedProvider, ContinuationProvider, ProviderError, ProviderRegistry, ProviderResult,
    RewriteProvider, SuggestionProvider,
};
pub use repo::document_repo::{DocumentStore, SqliteDocumentStore};
pub use repo::preferences_repo::{PreferencesRepository, SqlitePreferencesRepository};
pub use repo::{StoreError, StoreResult};
pub use service::autosave::{AutosaveController, AutosaveError, AutosaveEvent, AutosaveState};
pub use service::continuation::{ContinuationError, ContinuationOutcome};
pub use service::rewrite::{Proposal, RewriteError, RewriteOutcome, RewriteSession, RewriteState};
pub use service::session::{EditorSession, SessionError, SessionResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
