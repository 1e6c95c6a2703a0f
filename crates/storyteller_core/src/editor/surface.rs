//! Editable surface capability contract.
//!
//! # Responsibility
//! - Decouple caret/offset logic from any concrete rendering toolkit.
//! - Provide the selection snapshot type used by rewrite sessions.
//!
//! # Invariants
//! - Offsets count Unicode scalar values of the plain-text projection.
//! - A `RangeSnapshot` is only applied after `is_live` confirms it.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SurfaceResult<T> = Result<T, SurfaceError>;

/// Identifier of one node inside a surface tree. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Concrete position inside the tree: a node plus a local offset.
///
/// For text nodes `offset` counts characters; for container nodes it is a
/// child index; for line breaks it is `0` (before) or `1` (after).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Anchor {
    pub node: NodeId,
    pub offset: usize,
}

impl Anchor {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// Contiguous selection between two anchors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextRange {
    pub start: Anchor,
    pub end: Anchor,
}

impl TextRange {
    pub fn new(start: Anchor, end: Anchor) -> Self {
        Self { start, end }
    }

    pub fn collapsed(at: Anchor) -> Self {
        Self { start: at, end: at }
    }
}

/// Errors raised by surface operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    /// Anchor node was removed or never belonged to this surface.
    DetachedAnchor(NodeId),
    /// Local offset exceeds the node's extent.
    OffsetOutOfBounds { node: NodeId, offset: usize, max: usize },
    /// Children can only be appended to container nodes.
    NotAContainer(NodeId),
    /// Operation only applies to text nodes.
    NotText(NodeId),
}

impl Display for SurfaceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DetachedAnchor(node) => write!(f, "anchor node {} is not attached", node.0),
            Self::OffsetOutOfBounds { node, offset, max } => write!(
                f,
                "offset {offset} is out of bounds for node {} (max {max})",
                node.0
            ),
            Self::NotAContainer(node) => write!(f, "node {} cannot hold children", node.0),
            Self::NotText(node) => write!(f, "node {} is not a text node", node.0),
        }
    }
}

impl Error for SurfaceError {}

/// Capability interface over a tree-shaped editable surface.
///
/// Any host widget exposing its text tree can implement this; the rest of
/// core only talks to surfaces through it.
pub trait EditableSurface {
    /// Flattens visible text in document order. Non-breaking spaces become
    /// ordinary spaces.
    fn project_to_text(&self) -> String;

    /// Number of projected characters preceding `anchor`.
    fn offset_of(&self, anchor: Anchor) -> SurfaceResult<usize>;

    /// Collapses the selection at `offset`, clamping past-the-end offsets to
    /// the end of the surface. Returns the placed anchor.
    fn place_caret_at(&mut self, offset: usize) -> Anchor;

    /// Inserts literal text at the selection and leaves the caret after it.
    fn insert_at_caret(&mut self, text: &str);

    /// Replaces the range contents with `text` as one unit.
    fn replace_range(&mut self, range: &TextRange, text: &str) -> SurfaceResult<()>;

    /// Replaces the entire content with `text`.
    fn set_text(&mut self, text: &str);

    /// Current selection, if any.
    fn selection(&self) -> Option<TextRange>;

    /// Sets the selection; anchors are reordered into document order.
    fn select(&mut self, start: Anchor, end: Anchor) -> SurfaceResult<()>;

    fn clear_selection(&mut self);

    /// Monotonic counter bumped by every mutation.
    fn revision(&self) -> u64;

    /// Projected characters covered by `range`.
    fn range_text(&self, range: &TextRange) -> SurfaceResult<String> {
        let (start, end) = self.range_offsets(range)?;
        Ok(self
            .project_to_text()
            .chars()
            .skip(start)
            .take(end - start)
            .collect())
    }

    /// Linear `(start, end)` offsets of `range`, ordered.
    fn range_offsets(&self, range: &TextRange) -> SurfaceResult<(usize, usize)> {
        let a = self.offset_of(range.start)?;
        let b = self.offset_of(range.end)?;
        Ok((a.min(b), a.max(b)))
    }

    /// Returns whether `range` covers no characters.
    fn is_collapsed(&self, range: &TextRange) -> SurfaceResult<bool> {
        let (start, end) = self.range_offsets(range)?;
        Ok(start == end)
    }

    /// Caret offset of a collapsed selection; `None` otherwise.
    fn caret_offset(&self) -> Option<usize> {
        let selection = self.selection()?;
        let (start, end) = self.range_offsets(&selection).ok()?;
        (start == end).then_some(start)
    }
}

/// Value snapshot of a selection taken at one surface revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeSnapshot {
    range: TextRange,
    text: String,
    revision: u64,
}

impl RangeSnapshot {
    /// Captures `range` together with its current text and the revision.
    pub fn capture<S: EditableSurface + ?Sized>(
        surface: &S,
        range: TextRange,
    ) -> SurfaceResult<Self> {
        let text = surface.range_text(&range)?;
        Ok(Self {
            range,
            text,
            revision: surface.revision(),
        })
    }

    pub fn range(&self) -> &TextRange {
        &self.range
    }

    /// Text covered by the range at capture time.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Returns whether the snapshot still describes the surface exactly.
    ///
    /// Any mutation since capture, a dead anchor or changed covered text
    /// makes the snapshot stale.
    pub fn is_live<S: EditableSurface + ?Sized>(&self, surface: &S) -> bool {
        if surface.revision() != self.revision {
            return false;
        }
        match surface.range_text(&self.range) {
            Ok(current) => current == self.text,
            Err(_) => false,
        }
    }
}
