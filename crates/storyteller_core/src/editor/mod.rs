//! Text/caret model for the editable surface.
//!
//! # Responsibility
//! - Define the capability contract every host surface implements.
//! - Provide an arena-backed tree implementation for hosts and tests.
//! - Answer caret questions (paragraph end) over the plain-text projection.
//!
//! # Invariants
//! - `offset_of(place_caret_at(o)) == min(o, len(projection))`.
//! - `replace_range` yields `prefix + text + suffix` for any range shape.

pub mod paragraph;
pub mod surface;
pub mod tree;

pub use paragraph::{caret_at_paragraph_end, is_paragraph_end};
pub use surface::{
    Anchor, EditableSurface, NodeId, RangeSnapshot, SurfaceError, SurfaceResult, TextRange,
};
pub use tree::{NodeKind, TreeSurface};
