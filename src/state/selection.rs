//! Text selection across nodes.
//!
//! A selection is an anchor (where the drag started) and a focus (where the
//! pointer is now), each a `(node, line, col)` point. Which nodes lie between
//! the two is decided by the tree's document order, never by z-index or by
//! screen position.
//!
//! Ranges are half-open: the character at the end point is not selected.
//! `select(A, B)` and `select(B, A)` therefore cover the same text.
//!
//! Every mutator returns the ids of nodes whose highlighted range changed;
//! the engine marks those dirty and delivers `NodeEvent::SelectionChanged`.

use std::fmt;

use rustc_hash::FxHashMap;
use unicode_segmentation::UnicodeSegmentation;

use crate::tree::{NodeId, RenderTree, Selectable};

// =============================================================================
// Types
// =============================================================================

/// A position inside a selectable node (grapheme column).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SelectionPoint {
    pub node: NodeId,
    pub line: usize,
    pub col: usize,
}

impl SelectionPoint {
    pub fn new(node: impl Into<NodeId>, line: usize, col: usize) -> Self {
        Self {
            node: node.into(),
            line,
            col,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub anchor: SelectionPoint,
    pub focus: SelectionPoint,
    pub active: bool,
}

/// The part of one node covered by the selection, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocalRange {
    pub start_line: usize,
    pub start_col: usize,
    pub end_line: usize,
    pub end_col: usize,
}

impl LocalRange {
    pub fn new(start: (usize, usize), end: (usize, usize)) -> Self {
        Self {
            start_line: start.0,
            start_col: start.1,
            end_line: end.0,
            end_col: end.1,
        }
    }

    /// The whole of a node's text.
    pub fn whole(text: &dyn Selectable) -> Self {
        let last = text.line_count().saturating_sub(1);
        Self::new((0, 0), (last, text.line_length(last)))
    }

    pub fn is_empty(&self) -> bool {
        (self.start_line, self.start_col) >= (self.end_line, self.end_col)
    }

    /// Selected columns `[from, to)` on `line`, given that line's length.
    pub fn columns_on(&self, line: usize, len: usize) -> (usize, usize) {
        if line < self.start_line || line > self.end_line {
            return (0, 0);
        }
        let from = if line == self.start_line { self.start_col.min(len) } else { 0 };
        let to = if line == self.end_line { self.end_col.min(len) } else { len };
        (from, to.max(from))
    }

    /// The covered text; lines joined with `\n`.
    pub fn extract(&self, text: &dyn Selectable) -> String {
        let lines = text.line_count();
        if lines == 0 || self.is_empty() {
            return String::new();
        }
        let last = self.end_line.min(lines - 1);
        let mut out = String::new();
        for line in self.start_line..=last {
            if line > self.start_line {
                out.push('\n');
            }
            let content = text.line_text(line);
            let (from, to) = self.columns_on(line, content.graphemes(true).count());
            out.extend(content.graphemes(true).skip(from).take(to - from));
        }
        out
    }
}

type SelectionListener = Box<dyn FnMut(Option<&Selection>)>;

// =============================================================================
// SelectionCoordinator
// =============================================================================

/// Owns the one selection of an engine.
#[derive(Default)]
pub struct SelectionCoordinator {
    selection: Option<Selection>,
    /// Set by `end_selection`; `extend` is ignored until the next `begin`.
    frozen: bool,
    listeners: Vec<SelectionListener>,
}

impl SelectionCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.selection.as_ref().is_some_and(|s| s.active)
    }

    /// Called with the new selection (or `None` when cleared) on every change.
    pub fn on_selection_changed<F>(&mut self, handler: F)
    where
        F: FnMut(Option<&Selection>) + 'static,
    {
        self.listeners.push(Box::new(handler));
    }

    /// Start a selection at a screen position.
    ///
    /// Hits the topmost selectable node; a miss clears the selection.
    pub fn begin_selection(&mut self, tree: &RenderTree, x: i32, y: i32) -> Vec<NodeId> {
        let Some(point) = point_at(tree, x, y) else {
            return self.clear_selection(tree);
        };

        let before = self.ranges(tree);
        self.selection = Some(Selection {
            anchor: point.clone(),
            focus: point,
            active: true,
        });
        self.frozen = false;
        self.changed(tree, before)
    }

    /// Move the focus end to a screen position.
    ///
    /// Off every selectable node, the focus clamps into the nearest one.
    pub fn extend_selection(&mut self, tree: &RenderTree, x: i32, y: i32) -> Vec<NodeId> {
        if self.frozen || !self.is_active() {
            return Vec::new();
        }
        let Some(point) = point_at(tree, x, y).or_else(|| nearest_point(tree, x, y)) else {
            return Vec::new();
        };
        if self.selection.as_ref().is_some_and(|s| s.focus == point) {
            return Vec::new();
        }

        let before = self.ranges(tree);
        if let Some(selection) = self.selection.as_mut() {
            selection.focus = point;
        }
        self.changed(tree, before)
    }

    /// Stop following the pointer. The range stays selected.
    pub fn end_selection(&mut self) {
        if self.is_active() {
            self.frozen = true;
        }
    }

    /// Drop the selection. Idempotent: clearing nothing notifies nobody.
    pub fn clear_selection(&mut self, tree: &RenderTree) -> Vec<NodeId> {
        if self.selection.is_none() {
            return Vec::new();
        }
        let before = self.ranges(tree);
        self.selection = None;
        self.frozen = false;
        self.changed(tree, before)
    }

    /// Clear the selection if either endpoint is in `removed`.
    ///
    /// Ranges can't be recomputed once an endpoint is gone, so every
    /// remaining selectable node is reported as changed.
    pub fn forget(&mut self, tree: &RenderTree, removed: &[NodeId]) -> Vec<NodeId> {
        let hit = self
            .selection
            .as_ref()
            .is_some_and(|s| removed.contains(&s.anchor.node) || removed.contains(&s.focus.node));
        if !hit {
            return Vec::new();
        }
        let survivors = tree.document_order();
        self.selection = None;
        self.frozen = false;
        self.notify();
        survivors
    }

    /// The selected text in document order, one `\n` between nodes.
    ///
    /// Empty when nothing is selected.
    pub fn selected_text(&self, tree: &RenderTree) -> String {
        if !self.is_active() {
            return String::new();
        }
        let ranges = self.ordered_ranges(tree);
        let fragments: Vec<String> = ranges
            .iter()
            .filter_map(|(id, range)| tree.selectable(id).map(|text| range.extract(text)))
            .filter(|fragment| !fragment.is_empty())
            .collect();
        fragments.join("\n")
    }

    /// Whether `node` has a non-empty highlighted range.
    pub fn has_selection(&self, tree: &RenderTree, node: &NodeId) -> bool {
        self.local_range(tree, node).is_some_and(|r| !r.is_empty())
    }

    pub fn local_range(&self, tree: &RenderTree, node: &NodeId) -> Option<LocalRange> {
        self.ordered_ranges(tree)
            .into_iter()
            .find(|(id, _)| id == node)
            .map(|(_, range)| range)
    }

    /// Every node's range, keyed by id.
    pub fn ranges(&self, tree: &RenderTree) -> FxHashMap<NodeId, LocalRange> {
        self.ordered_ranges(tree).into_iter().collect()
    }

    fn ordered_ranges(&self, tree: &RenderTree) -> Vec<(NodeId, LocalRange)> {
        let Some(selection) = self.selection.as_ref().filter(|s| s.active) else {
            return Vec::new();
        };
        let order = tree.document_order();
        let index = |p: &SelectionPoint| order.iter().position(|id| *id == p.node);
        let (Some(ia), Some(ifo)) = (index(&selection.anchor), index(&selection.focus)) else {
            return Vec::new();
        };

        let key = |i: usize, p: &SelectionPoint| (i, p.line, p.col);
        let (start, si, end, ei) = if key(ia, &selection.anchor) <= key(ifo, &selection.focus) {
            (&selection.anchor, ia, &selection.focus, ifo)
        } else {
            (&selection.focus, ifo, &selection.anchor, ia)
        };

        if si == ei {
            let range = LocalRange::new((start.line, start.col), (end.line, end.col));
            return vec![(start.node.clone(), range)];
        }

        let mut ranges = Vec::with_capacity(ei - si + 1);
        for (offset, id) in order[si..=ei].iter().enumerate() {
            let Some(text) = tree.selectable(id) else {
                continue;
            };
            let whole = LocalRange::whole(text);
            let range = match offset {
                0 => LocalRange::new((start.line, start.col), (whole.end_line, whole.end_col)),
                n if n == ei - si => LocalRange::new((0, 0), (end.line, end.col)),
                _ => whole,
            };
            ranges.push((id.clone(), range));
        }
        ranges
    }

    /// Nodes whose range differs from `before`, plus listener notification.
    fn changed(&mut self, tree: &RenderTree, before: FxHashMap<NodeId, LocalRange>) -> Vec<NodeId> {
        let after = self.ranges(tree);
        let mut nodes: Vec<NodeId> = after
            .iter()
            .filter(|(id, range)| before.get(*id) != Some(*range))
            .map(|(id, _)| id.clone())
            .collect();
        nodes.extend(before.keys().filter(|id| !after.contains_key(*id)).cloned());

        self.notify();
        tracing::trace!(nodes = nodes.len(), "selection changed");
        nodes
    }

    fn notify(&mut self) {
        let selection = self.selection.as_ref();
        for listener in &mut self.listeners {
            listener(selection);
        }
    }
}

impl fmt::Debug for SelectionCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionCoordinator")
            .field("selection", &self.selection)
            .field("frozen", &self.frozen)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

// =============================================================================
// Hit Helpers
// =============================================================================

fn point_at(tree: &RenderTree, x: i32, y: i32) -> Option<SelectionPoint> {
    let id = tree.hit_test_where(x, y, |n| n.is_selectable_leaf())?;
    local_point(tree, id, x, y)
}

/// Nearest selectable node by distance to its bounds; document order
/// breaks ties.
fn nearest_point(tree: &RenderTree, x: i32, y: i32) -> Option<SelectionPoint> {
    let id = tree
        .document_order()
        .into_iter()
        .filter_map(|id| tree.get(&id).map(|n| (n.bounds().distance_to(x, y), id)))
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, id)| id)?;
    local_point(tree, id, x, y)
}

fn local_point(tree: &RenderTree, id: NodeId, x: i32, y: i32) -> Option<SelectionPoint> {
    let node = tree.get(&id)?;
    let text = node.content().as_selectable()?;
    let (line, col) = text.global_to_local(node.content_box(), x, y);
    Some(SelectionPoint { node: id, line, col })
}

// =============================================================================
// Tests
// =============================================================================
