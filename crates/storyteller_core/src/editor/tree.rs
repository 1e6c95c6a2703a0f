//! Arena-backed editable tree.
//!
//! # Responsibility
//! - Mirror a host widget's text tree (containers, text runs, line breaks).
//! - Implement caret placement and range replacement over that tree.
//!
//! # Invariants
//! - Node ids are never reused; a removed node stays dead forever.
//! - Every mutation bumps `revision`; selection changes do not.
//! - Text runs may be empty; line breaks always project exactly one `\n`.

use super::surface::{Anchor, EditableSurface, NodeId, SurfaceError, SurfaceResult, TextRange};

const NBSP: char = '\u{a0}';

/// Kind of one surface node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Container without own text (paragraph, span, root).
    Element,
    /// Run of literal text.
    Text(String),
    /// Hard line break, projected as `\n`.
    LineBreak,
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone, Copy)]
struct Leaf {
    id: NodeId,
    start: usize,
    len: usize,
    is_text: bool,
}

impl Leaf {
    fn end(&self) -> usize {
        self.start + self.len
    }
}

/// In-memory editable surface.
#[derive(Debug, Clone)]
pub struct TreeSurface {
    nodes: Vec<Option<Node>>,
    root: NodeId,
    selection: Option<TextRange>,
    revision: u64,
}

impl Default for TreeSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeSurface {
    /// Creates an empty surface holding only its root container.
    pub fn new() -> Self {
        Self {
            nodes: vec![Some(Node {
                kind: NodeKind::Element,
                parent: None,
                children: Vec::new(),
            })],
            root: NodeId(0),
            selection: None,
            revision: 0,
        }
    }

    /// Creates a surface whose root holds one text run.
    pub fn from_text(text: &str) -> Self {
        let mut surface = Self::new();
        surface.set_text(text);
        surface
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Kind of a live node.
    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.node(id).map(|node| &node.kind)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|node| node.parent)
    }

    /// Children of a live node; empty for dead ids and leaves.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map_or(&[], |node| node.children.as_slice())
    }

    /// Total projected length in characters.
    pub fn text_len(&self) -> usize {
        self.leaves().last().map_or(0, Leaf::end)
    }

    pub fn append_element(&mut self, parent: NodeId) -> SurfaceResult<NodeId> {
        self.push_child(parent, None, NodeKind::Element)
    }

    pub fn append_text(&mut self, parent: NodeId, text: &str) -> SurfaceResult<NodeId> {
        self.push_child(parent, None, NodeKind::Text(text.to_string()))
    }

    pub fn append_line_break(&mut self, parent: NodeId) -> SurfaceResult<NodeId> {
        self.push_child(parent, None, NodeKind::LineBreak)
    }

    /// Inserts a node at `index` among the children of `parent`.
    pub fn insert_child(
        &mut self,
        parent: NodeId,
        index: usize,
        kind: NodeKind,
    ) -> SurfaceResult<NodeId> {
        self.push_child(parent, Some(index), kind)
    }

    /// Removes a node and its subtree. Removing the root clears the surface.
    pub fn remove(&mut self, id: NodeId) -> SurfaceResult<()> {
        if !self.is_attached(id) {
            return Err(SurfaceError::DetachedAnchor(id));
        }
        if id == self.root {
            self.clear_root();
        } else {
            self.detach(id);
        }
        self.drop_dead_selection();
        self.revision += 1;
        Ok(())
    }

    /// Replaces the content of one text run.
    pub fn set_node_text(&mut self, id: NodeId, text: &str) -> SurfaceResult<()> {
        if !self.is_attached(id) {
            return Err(SurfaceError::DetachedAnchor(id));
        }
        match self.node_mut(id) {
            Some(Node {
                kind: NodeKind::Text(content),
                ..
            }) => {
                *content = text.to_string();
            }
            _ => return Err(SurfaceError::NotText(id)),
        }
        self.drop_dead_selection();
        self.revision += 1;
        Ok(())
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index()).and_then(Option::as_mut)
    }

    fn push_child(
        &mut self,
        parent: NodeId,
        index: Option<usize>,
        kind: NodeKind,
    ) -> SurfaceResult<NodeId> {
        if !self.is_attached(parent) {
            return Err(SurfaceError::DetachedAnchor(parent));
        }
        let sibling_count = self.children(parent).len();
        if !matches!(self.kind(parent), Some(NodeKind::Element)) {
            return Err(SurfaceError::NotAContainer(parent));
        }
        let index = index.unwrap_or(sibling_count);
        if index > sibling_count {
            return Err(SurfaceError::OffsetOutOfBounds {
                node: parent,
                offset: index,
                max: sibling_count,
            });
        }

        let id = self.alloc(kind, parent);
        if let Some(node) = self.node_mut(parent) {
            node.children.insert(index, id);
        }
        self.revision += 1;
        Ok(id)
    }

    fn alloc(&mut self, kind: NodeKind, parent: NodeId) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Some(Node {
            kind,
            parent: Some(parent),
            children: Vec::new(),
        }));
        id
    }

    fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            let Some(node) = self.node(current) else {
                return false;
            };
            match node.parent {
                Some(parent) => current = parent,
                None => return current == self.root,
            }
        }
    }

    /// Unlinks `id` from its parent and frees its subtree.
    fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.parent(id) {
            if let Some(node) = self.node_mut(parent) {
                node.children.retain(|child| *child != id);
            }
        }
        self.free_subtree(id);
    }

    fn free_subtree(&mut self, id: NodeId) {
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            if let Some(node) = self.nodes.get_mut(current.index()).and_then(Option::take) {
                pending.extend(node.children);
            }
        }
    }

    fn clear_root(&mut self) {
        let children = self
            .node_mut(self.root)
            .map(|root| std::mem::take(&mut root.children))
            .unwrap_or_default();
        for child in children {
            self.free_subtree(child);
        }
    }

    fn drop_dead_selection(&mut self) {
        if let Some(selection) = self.selection {
            let live = self.validate_anchor(selection.start).is_ok()
                && self.validate_anchor(selection.end).is_ok();
            if !live {
                self.selection = None;
            }
        }
    }

    /// Local extent of a node: characters, child count or 1 for breaks.
    fn extent(node: &Node) -> usize {
        match &node.kind {
            NodeKind::Element => node.children.len(),
            NodeKind::Text(text) => text.chars().count(),
            NodeKind::LineBreak => 1,
        }
    }

    fn validate_anchor(&self, anchor: Anchor) -> SurfaceResult<()> {
        if !self.is_attached(anchor.node) {
            return Err(SurfaceError::DetachedAnchor(anchor.node));
        }
        let max = self.node(anchor.node).map_or(0, Self::extent);
        if anchor.offset > max {
            return Err(SurfaceError::OffsetOutOfBounds {
                node: anchor.node,
                offset: anchor.offset,
                max,
            });
        }
        Ok(())
    }

    fn subtree_len(&self, id: NodeId) -> usize {
        let mut total = 0;
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            let Some(node) = self.node(current) else {
                continue;
            };
            match &node.kind {
                NodeKind::Element => pending.extend(node.children.iter().copied()),
                NodeKind::Text(text) => total += text.chars().count(),
                NodeKind::LineBreak => total += 1,
            }
        }
        total
    }

    /// Projected characters preceding the first position of `id`.
    fn start_of(&self, id: NodeId) -> usize {
        let mut total = 0;
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            total += self
                .children(parent)
                .iter()
                .take_while(|sibling| **sibling != current)
                .map(|sibling| self.subtree_len(*sibling))
                .sum::<usize>();
            current = parent;
        }
        total
    }

    /// Text-bearing nodes in document order with their cumulative windows.
    fn leaves(&self) -> Vec<Leaf> {
        let mut leaves = Vec::new();
        let mut position = 0;
        let mut pending = vec![self.root];
        while let Some(id) = pending.pop() {
            let Some(node) = self.node(id) else {
                continue;
            };
            let (len, is_text) = match &node.kind {
                NodeKind::Element => {
                    pending.extend(node.children.iter().rev().copied());
                    continue;
                }
                NodeKind::Text(text) => (text.chars().count(), true),
                NodeKind::LineBreak => (1, false),
            };
            leaves.push(Leaf {
                id,
                start: position,
                len,
                is_text,
            });
            position += len;
        }
        leaves
    }

    fn anchor_before(&self, id: NodeId) -> Anchor {
        match self.parent(id) {
            Some(parent) => {
                let index = self
                    .children(parent)
                    .iter()
                    .position(|child| *child == id)
                    .unwrap_or(0);
                Anchor::new(parent, index)
            }
            None => self.end_anchor(),
        }
    }

    fn end_anchor(&self) -> Anchor {
        Anchor::new(self.root, self.children(self.root).len())
    }

    /// Finds the anchor for a linear offset without touching the selection.
    fn locate(&self, offset: usize) -> Anchor {
        for leaf in self.leaves() {
            if leaf.is_text {
                if offset <= leaf.end() {
                    return Anchor::new(leaf.id, offset.saturating_sub(leaf.start));
                }
            } else if offset <= leaf.start {
                return self.anchor_before(leaf.id);
            }
        }
        self.end_anchor()
    }

    /// Deletes `[start, end)` and inserts `text` at `start`.
    ///
    /// Returns the offset just after the inserted text.
    fn splice(&mut self, start: usize, end: usize, text: &str) -> usize {
        let leaves = self.leaves();
        let target = leaves
            .iter()
            .find(|leaf| leaf.is_text && leaf.start <= start && start <= leaf.end())
            .map(|leaf| (leaf.id, start - leaf.start));

        for leaf in &leaves {
            if leaf.start >= end || leaf.end() <= start {
                continue;
            }
            if !leaf.is_text {
                self.detach(leaf.id);
                continue;
            }
            let from = start.max(leaf.start) - leaf.start;
            let to = end.min(leaf.end()) - leaf.start;
            let is_target = target.map(|(id, _)| id) == Some(leaf.id);
            if from == 0 && to == leaf.len && !is_target {
                self.detach(leaf.id);
            } else if let Some(Node {
                kind: NodeKind::Text(content),
                ..
            }) = self.node_mut(leaf.id)
            {
                let range = byte_index(content, from)..byte_index(content, to);
                content.replace_range(range, "");
            }
        }

        if !text.is_empty() {
            match target {
                Some((id, local)) => {
                    if let Some(Node {
                        kind: NodeKind::Text(content),
                        ..
                    }) = self.node_mut(id)
                    {
                        let at = byte_index(content, local);
                        content.insert_str(at, text);
                    }
                }
                None => {
                    // Only line breaks (or nothing) border `start` here.
                    let anchor = match self.leaves().into_iter().find(|leaf| leaf.start >= start) {
                        Some(next) => self.anchor_before(next.id),
                        None => self.end_anchor(),
                    };
                    let id = self.alloc(NodeKind::Text(text.to_string()), anchor.node);
                    if let Some(node) = self.node_mut(anchor.node) {
                        node.children.insert(anchor.offset, id);
                    }
                }
            }
        }

        self.revision += 1;
        start + text.chars().count()
    }
}

impl EditableSurface for TreeSurface {
    fn project_to_text(&self) -> String {
        let mut projected = String::new();
        let mut pending = vec![self.root];
        while let Some(id) = pending.pop() {
            let Some(node) = self.node(id) else {
                continue;
            };
            match &node.kind {
                NodeKind::Element => pending.extend(node.children.iter().rev().copied()),
                NodeKind::Text(text) => projected.extend(
                    text.chars()
                        .map(|c| if c == NBSP { ' ' } else { c }),
                ),
                NodeKind::LineBreak => projected.push('\n'),
            }
        }
        projected
    }

    fn offset_of(&self, anchor: Anchor) -> SurfaceResult<usize> {
        self.validate_anchor(anchor)?;
        let node = self
            .node(anchor.node)
            .ok_or(SurfaceError::DetachedAnchor(anchor.node))?;
        let local = match &node.kind {
            NodeKind::Element => node.children[..anchor.offset]
                .iter()
                .map(|child| self.subtree_len(*child))
                .sum(),
            NodeKind::Text(_) | NodeKind::LineBreak => anchor.offset,
        };
        Ok(self.start_of(anchor.node) + local)
    }

    fn place_caret_at(&mut self, offset: usize) -> Anchor {
        let anchor = self.locate(offset);
        self.selection = Some(TextRange::collapsed(anchor));
        anchor
    }

    fn insert_at_caret(&mut self, text: &str) {
        let (start, end) = match self
            .selection
            .and_then(|selection| self.range_offsets(&selection).ok())
        {
            Some(offsets) => offsets,
            None => {
                let len = self.text_len();
                (len, len)
            }
        };
        if text.is_empty() && start == end {
            self.place_caret_at(start);
            return;
        }
        let caret = self.splice(start, end, text);
        self.place_caret_at(caret);
    }

    fn replace_range(&mut self, range: &TextRange, text: &str) -> SurfaceResult<()> {
        let (start, end) = self.range_offsets(range)?;
        let caret = self.splice(start, end, text);
        self.place_caret_at(caret);
        Ok(())
    }

    fn set_text(&mut self, text: &str) {
        self.clear_root();
        if !text.is_empty() {
            let id = self.alloc(NodeKind::Text(text.to_string()), self.root);
            if let Some(root) = self.node_mut(self.root) {
                root.children.push(id);
            }
        }
        self.selection = None;
        self.revision += 1;
    }

    fn selection(&self) -> Option<TextRange> {
        self.selection
    }

    fn select(&mut self, start: Anchor, end: Anchor) -> SurfaceResult<()> {
        let start_offset = self.offset_of(start)?;
        let end_offset = self.offset_of(end)?;
        self.selection = Some(if end_offset < start_offset {
            TextRange::new(end, start)
        } else {
            TextRange::new(start, end)
        });
        Ok(())
    }

    fn clear_selection(&mut self) {
        self.selection = None;
    }

    fn revision(&self) -> u64 {
        self.revision
    }
}

fn byte_index(text: &str, char_index: usize) -> usize {
    text.char_indices()
        .nth(char_index)
        .map_or(text.len(), |(index, _)| index)
}
