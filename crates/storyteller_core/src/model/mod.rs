//! Domain model for stories and user preferences.
//!
//! # Responsibility
//! - Define the canonical records persisted by the repository layer.
//! - Keep identity and title rules next to the data they constrain.
//!
//! # Invariants
//! - Every document is identified by a stable `DocumentId`.
//! - Documents are never deleted by core.

pub mod document;
pub mod preferences;
