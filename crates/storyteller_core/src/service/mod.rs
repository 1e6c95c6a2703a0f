//! Core use-case services.
//!
//! # Responsibility
//! - Drive the surface, store and providers through editing use cases.
//! - Keep hosts decoupled from storage and provider details.
//!
//! # Modules
//! - `autosave`: debounced persistence of the open document.
//! - `rewrite`: selection capture, proposal and apply/discard.
//! - `continuation`: next-paragraph suggestion at a paragraph end.
//! - `session`: one open document wired to all of the above.

pub mod autosave;
pub mod continuation;
pub mod rewrite;
pub mod session;
