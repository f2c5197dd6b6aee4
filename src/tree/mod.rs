//! Render node tree.
//!
//! Nodes live in an arena keyed by [`NodeId`]. A parent owns its children
//! through its ordered child list; a child only records its parent's id.
//!
//! # Ordering
//!
//! - **Paint order**: children sorted by `(z_index, seq)`, where `seq` is the
//!   insertion counter. Equal z-indices paint in insertion order, so a
//!   later-added sibling lands on top.
//! - **Document order**: pre-order walk of the child lists, ignoring
//!   z-index, filtered to visible selectable leaves. Selection uses it to
//!   decide which nodes lie between anchor and focus.
//!
//! # Dirtiness
//!
//! Every mutation marks the node dirty and propagates upward. A dirty node
//! always has dirty ancestors, so propagation stops at the first ancestor
//! that is already dirty.

pub mod capabilities;
pub mod node;
pub mod widgets;

use std::fmt;

use compact_str::CompactString;
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::types::{Insets, Rect};

pub use capabilities::{Focusable, PaintContext, Renderable, Selectable};
pub use node::{ListenerId, NodeEvent, NodeSpec, RenderNode};
pub use widgets::{Panel, TextBlock};

use node::Screen;

// =============================================================================
// NodeId
// =============================================================================

/// Unique node identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(CompactString);

impl NodeId {
    pub const ROOT: &'static str = "root";

    pub fn new(id: impl AsRef<str>) -> Self {
        Self(CompactString::new(id))
    }

    pub fn root() -> Self {
        Self::new(Self::ROOT)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == Self::ROOT
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(CompactString::from(id))
    }
}

impl From<&NodeId> for NodeId {
    fn from(id: &NodeId) -> Self {
        id.clone()
    }
}

// =============================================================================
// RenderTree
// =============================================================================

/// Arena of render nodes rooted at `"root"`.
pub struct RenderTree {
    nodes: FxHashMap<NodeId, RenderNode>,
    root: NodeId,
    next_seq: u64,
    next_listener: u64,
    /// Ids destroyed since the last `drain_removed`.
    removed: Vec<NodeId>,
}

impl RenderTree {
    /// Create a tree whose root covers a `width` x `height` screen.
    pub fn new(width: u16, height: u16) -> Self {
        let root = NodeId::root();
        let mut node = NodeSpec::new(root.clone(), Screen)
            .at(0, 0, width, height)
            .selectable(false)
            .into_node(root.clone(), 0);
        node.parent = None;

        let mut nodes = FxHashMap::default();
        nodes.insert(root.clone(), node);
        Self {
            nodes,
            root,
            next_seq: 1,
            next_listener: 0,
            removed: Vec::new(),
        }
    }

    #[inline]
    pub fn root(&self) -> &NodeId {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get(&self, id: &NodeId) -> Option<&RenderNode> {
        self.nodes.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &NodeId) -> Option<&mut RenderNode> {
        self.nodes.get_mut(id)
    }

    // =========================================================================
    // Structure
    // =========================================================================

    /// Append a child to `parent`.
    pub fn add_child(&mut self, parent: &NodeId, spec: NodeSpec) -> Result<NodeId> {
        self.insert_child(parent, usize::MAX, spec)
    }

    /// Insert a child at `index` in `parent`'s child list (clamped to the end).
    pub fn insert_child(&mut self, parent: &NodeId, index: usize, spec: NodeSpec) -> Result<NodeId> {
        if self.nodes.contains_key(spec.id()) {
            return Err(Error::DuplicateNode(spec.id().clone()));
        }
        let Some(parent_node) = self.nodes.get_mut(parent) else {
            return Err(Error::UnknownNode(parent.clone()));
        };

        let id = spec.id().clone();
        let index = index.min(parent_node.children.len());
        parent_node.children.insert(index, id.clone());

        let node = spec.into_node(parent.clone(), self.next_seq);
        self.next_seq += 1;
        self.nodes.insert(id.clone(), node);
        self.mark_dirty(parent);

        tracing::trace!(node = %id, parent = %parent, "node added");
        Ok(id)
    }

    /// Detach `child` from `parent` and destroy its subtree.
    ///
    /// Returns the removed ids (pre-order). Empty when `child` is not a
    /// child of `parent`.
    pub fn remove_child(&mut self, parent: &NodeId, child: &NodeId) -> Vec<NodeId> {
        match self.nodes.get(child) {
            Some(node) if node.parent.as_ref() == Some(parent) => self.destroy(child),
            _ => Vec::new(),
        }
    }

    /// Destroy a node and its subtree. The root cannot be destroyed.
    ///
    /// Listeners of every removed node are dropped.
    pub fn destroy(&mut self, id: &NodeId) -> Vec<NodeId> {
        if id == &self.root || !self.nodes.contains_key(id) {
            return Vec::new();
        }

        if let Some(parent) = self.nodes.get(id).and_then(|n| n.parent.clone()) {
            if let Some(parent_node) = self.nodes.get_mut(&parent) {
                parent_node.children.retain(|c| c != id);
            }
            self.mark_dirty(&parent);
        }

        let mut removed = Vec::new();
        let mut stack = vec![id.clone()];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.remove(&next) {
                // Reverse so the stack pops children in list order.
                stack.extend(node.children.iter().rev().cloned());
                removed.push(next);
            }
        }

        tracing::trace!(node = %id, count = removed.len(), "subtree destroyed");
        self.removed.extend(removed.iter().cloned());
        removed
    }

    /// Take the ids destroyed since the last call.
    pub fn drain_removed(&mut self) -> Vec<NodeId> {
        std::mem::take(&mut self.removed)
    }

    // =========================================================================
    // Properties
    // =========================================================================

    fn update<F: FnOnce(&mut RenderNode) -> bool>(&mut self, id: &NodeId, f: F) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            return false;
        };
        if f(node) {
            self.mark_dirty(id);
        }
        true
    }

    /// Set absolute bounds (called after layout). Returns false for unknown ids.
    pub fn set_bounds(&mut self, id: &NodeId, x: i32, y: i32, width: u16, height: u16) -> bool {
        let bounds = Rect::new(x, y, width, height);
        let Some(node) = self.nodes.get_mut(id) else {
            return false;
        };
        if node.bounds == bounds {
            return true;
        }
        node.bounds = bounds;
        // Propagation also dirties the parent, which owns the vacated area.
        self.mark_dirty(id);
        true
    }

    /// Move a node and its whole subtree so the node's origin is at (x, y).
    pub fn set_position(&mut self, id: &NodeId, x: i32, y: i32) -> bool {
        let Some(node) = self.nodes.get(id) else {
            return false;
        };
        let (dx, dy) = (x - node.bounds.x, y - node.bounds.y);
        if dx == 0 && dy == 0 {
            return true;
        }

        let mut stack = vec![id.clone()];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(&next) {
                node.bounds = node.bounds.translate(dx, dy);
                node.dirty = true;
                stack.extend(node.children.iter().cloned());
            }
        }
        // Ancestors above the moved node still need the flag.
        if let Some(parent) = self.nodes.get(id).and_then(|n| n.parent.clone()) {
            self.mark_dirty(&parent);
        }
        true
    }

    pub fn set_z_index(&mut self, id: &NodeId, z_index: i32) -> bool {
        self.update(id, |node| std::mem::replace(&mut node.z_index, z_index) != z_index)
    }

    pub fn set_visible(&mut self, id: &NodeId, visible: bool) -> bool {
        self.update(id, |node| std::mem::replace(&mut node.visible, visible) != visible)
    }

    pub fn set_insets(&mut self, id: &NodeId, insets: Insets) -> bool {
        self.update(id, |node| std::mem::replace(&mut node.insets, insets) != insets)
    }

    /// Toggle the private buffer. Turning it off releases the buffer.
    pub fn set_buffered(&mut self, id: &NodeId, buffered: bool) -> bool {
        self.update(id, |node| {
            if !buffered {
                node.surface = None;
            }
            std::mem::replace(&mut node.buffered, buffered) != buffered
        })
    }

    /// Opacity used when a buffered node is composited.
    pub fn set_opacity(&mut self, id: &NodeId, opacity: u8) -> bool {
        self.update(id, |node| std::mem::replace(&mut node.opacity, opacity) != opacity)
    }

    pub fn set_selectable(&mut self, id: &NodeId, selectable: bool) -> bool {
        self.update(id, |node| std::mem::replace(&mut node.selectable, selectable) != selectable)
    }

    pub fn set_focusable(&mut self, id: &NodeId, focusable: bool) -> bool {
        self.update(id, |node| {
            node.focusable = focusable;
            false
        })
    }

    /// Replace a node's content.
    pub fn set_content(&mut self, id: &NodeId, content: Box<dyn Renderable>) -> bool {
        self.update(id, |node| {
            node.content = content;
            true
        })
    }

    /// Resize the root to the screen size.
    pub fn resize(&mut self, width: u16, height: u16) {
        let root = self.root.clone();
        self.set_bounds(&root, 0, 0, width, height);
    }

    // =========================================================================
    // Content Access
    // =========================================================================

    pub fn content(&self, id: &NodeId) -> Option<&dyn Renderable> {
        self.nodes.get(id).map(|n| n.content.as_ref())
    }

    /// Mutate a node's content. Marks the node dirty.
    pub fn with_content_mut<R>(&mut self, id: &NodeId, f: impl FnOnce(&mut dyn Renderable) -> R) -> Option<R> {
        let node = self.nodes.get_mut(id)?;
        let result = f(node.content.as_mut());
        self.mark_dirty(id);
        Some(result)
    }

    /// Typed mutable access to a node's content. Marks the node dirty.
    pub fn content_mut<T: 'static>(&mut self, id: &NodeId) -> Option<&mut T> {
        if !self.nodes.contains_key(id) {
            return None;
        }
        self.mark_dirty(id);
        self.nodes
            .get_mut(id)?
            .content
            .as_any_mut()?
            .downcast_mut::<T>()
    }

    pub fn selectable(&self, id: &NodeId) -> Option<&dyn Selectable> {
        self.nodes.get(id)?.content.as_selectable()
    }

    pub(crate) fn focusable_mut(&mut self, id: &NodeId) -> Option<&mut dyn Focusable> {
        self.nodes.get_mut(id)?.content.as_focusable_mut()
    }

    // =========================================================================
    // Dirty Tracking
    // =========================================================================

    /// Mark a node and its ancestors dirty.
    pub fn mark_dirty(&mut self, id: &NodeId) {
        let mut current = Some(id.clone());
        while let Some(next) = current {
            let Some(node) = self.nodes.get_mut(&next) else {
                return;
            };
            if node.dirty && next != *id {
                return;
            }
            node.dirty = true;
            current = node.parent.clone();
        }
    }

    /// Whether anything in the tree needs repainting.
    pub fn is_dirty(&self) -> bool {
        self.nodes.get(&self.root).is_some_and(|n| n.dirty)
    }

    pub fn clear_dirty(&mut self) {
        for node in self.nodes.values_mut() {
            node.dirty = false;
        }
    }

    // =========================================================================
    // Traversal
    // =========================================================================

    /// Children of `id` in paint order: ascending `(z_index, seq)`.
    pub fn paint_order(&self, id: &NodeId) -> Vec<NodeId> {
        let Some(node) = self.nodes.get(id) else {
            return Vec::new();
        };
        let mut children: Vec<(i32, u64, &NodeId)> = node
            .children
            .iter()
            .filter_map(|c| self.nodes.get(c).map(|n| (n.z_index, n.seq, c)))
            .collect();
        children.sort_by_key(|&(z, seq, _)| (z, seq));
        children.into_iter().map(|(_, _, c)| c.clone()).collect()
    }

    /// Visible selectable leaves in pre-order. Hidden nodes hide their subtree.
    pub fn document_order(&self) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![self.root.clone()];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            if !node.visible {
                continue;
            }
            if node.is_selectable_leaf() {
                order.push(id);
            }
            stack.extend(node.children.iter().rev().cloned());
        }
        order
    }

    /// Ancestors of `id`, parent first, ending at the root.
    pub fn ancestors(&self, id: &NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = self.nodes.get(id).and_then(|n| n.parent.clone());
        while let Some(next) = current {
            current = self.nodes.get(&next).and_then(|n| n.parent.clone());
            chain.push(next);
        }
        chain
    }

    /// Visible area of a node: its bounds clipped by every ancestor's
    /// content box. `None` when nothing of it is visible.
    pub fn clip_of(&self, id: &NodeId) -> Option<Rect> {
        let mut clip = self.nodes.get(id)?.bounds;
        for ancestor in self.ancestors(id) {
            let node = self.nodes.get(&ancestor)?;
            clip = clip.intersect(&node.content_box())?;
        }
        Some(clip)
    }

    /// Whether the node and all its ancestors are visible.
    pub fn is_shown(&self, id: &NodeId) -> bool {
        self.nodes.get(id).is_some_and(|n| n.visible)
            && self.ancestors(id).iter().all(|a| self.nodes.get(a).is_some_and(|n| n.visible))
    }

    // =========================================================================
    // Hit Testing
    // =========================================================================

    /// Topmost visible node under (x, y).
    pub fn hit_test(&self, x: i32, y: i32) -> Option<NodeId> {
        self.hit_test_where(x, y, |_| true)
    }

    /// Topmost visible node under (x, y) that satisfies `pred`.
    ///
    /// Depth-first, children in reverse paint order, so the node drawn on top
    /// wins. Points outside a node's clip never reach its children.
    pub fn hit_test_where<P>(&self, x: i32, y: i32, pred: P) -> Option<NodeId>
    where
        P: Fn(&RenderNode) -> bool,
    {
        let root = self.nodes.get(&self.root)?;
        self.hit_node(&self.root, x, y, root.bounds, &pred)
    }

    fn hit_node<P>(&self, id: &NodeId, x: i32, y: i32, parent_clip: Rect, pred: &P) -> Option<NodeId>
    where
        P: Fn(&RenderNode) -> bool,
    {
        let node = self.nodes.get(id)?;
        if !node.visible {
            return None;
        }
        let clip = node.bounds.intersect(&parent_clip)?;
        if !clip.contains(x, y) {
            return None;
        }

        if let Some(child_clip) = node.content_box().intersect(&clip) {
            for child in self.paint_order(id).iter().rev() {
                if let Some(hit) = self.hit_node(child, x, y, child_clip, pred) {
                    return Some(hit);
                }
            }
        }

        pred(node).then(|| id.clone())
    }

    // =========================================================================
    // Listeners
    // =========================================================================

    /// Subscribe to a node's events. `None` for unknown ids.
    pub fn on<F>(&mut self, id: &NodeId, handler: F) -> Option<ListenerId>
    where
        F: FnMut(&NodeEvent) + 'static,
    {
        let node = self.nodes.get_mut(id)?;
        let listener = ListenerId(self.next_listener);
        self.next_listener += 1;
        node.listeners.push((listener, Box::new(handler)));
        Some(listener)
    }

    pub fn off(&mut self, id: &NodeId, listener: ListenerId) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            return false;
        };
        let before = node.listeners.len();
        node.listeners.retain(|(l, _)| *l != listener);
        node.listeners.len() != before
    }

    /// Deliver an event to a node's listeners.
    pub fn emit(&mut self, id: &NodeId, event: &NodeEvent) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.emit(event);
        }
    }
}

impl fmt::Debug for RenderTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderTree")
            .field("root", &self.root)
            .field("nodes", &self.nodes.len())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
