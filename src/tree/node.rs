//! Render nodes.
//!
//! A node is a positioned box in the tree: absolute bounds after layout,
//! an inset content box for its children, ordering keys, flags, and the
//! widget content that paints it.

use std::fmt;

use crate::renderer::FrameBuffer;
use crate::state::focus::FocusLevel;
use crate::state::selection::LocalRange;
use crate::types::{Insets, Rect};

use super::capabilities::{PaintContext, Renderable};
use super::NodeId;

// =============================================================================
// Events
// =============================================================================

/// Events delivered to per-node listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeEvent {
    Focused(FocusLevel),
    Blurred(FocusLevel),
    /// The node's highlighted range changed (`None` when it left the selection).
    SelectionChanged(Option<LocalRange>),
}

/// Handle returned by `RenderTree::on`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

pub(crate) type Listener = Box<dyn FnMut(&NodeEvent)>;

// =============================================================================
// RenderNode
// =============================================================================

pub struct RenderNode {
    pub(crate) id: NodeId,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) bounds: Rect,
    pub(crate) insets: Insets,
    pub(crate) z_index: i32,
    pub(crate) seq: u64,
    pub(crate) visible: bool,
    pub(crate) buffered: bool,
    pub(crate) opacity: u8,
    pub(crate) selectable: bool,
    pub(crate) focusable: bool,
    pub(crate) dirty: bool,
    pub(crate) content: Box<dyn Renderable>,
    /// Private buffer of a buffered node, allocated on first paint.
    pub(crate) surface: Option<FrameBuffer>,
    pub(crate) listeners: Vec<(ListenerId, Listener)>,
}

impl RenderNode {
    #[inline]
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    #[inline]
    pub fn parent(&self) -> Option<&NodeId> {
        self.parent.as_ref()
    }

    #[inline]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    #[inline]
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    #[inline]
    pub fn insets(&self) -> Insets {
        self.insets
    }

    /// Bounds minus insets; children are clipped to this.
    #[inline]
    pub fn content_box(&self) -> Rect {
        self.bounds.inset(self.insets)
    }

    #[inline]
    pub fn z_index(&self) -> i32 {
        self.z_index
    }

    #[inline]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    #[inline]
    pub fn is_buffered(&self) -> bool {
        self.buffered
    }

    #[inline]
    pub fn opacity(&self) -> u8 {
        self.opacity
    }

    /// Selectable flag set and the content actually has text to select.
    #[inline]
    pub fn is_selectable(&self) -> bool {
        self.selectable && self.content.as_selectable().is_some()
    }

    /// Selectable with no children. Only leaves take part in selection.
    #[inline]
    pub fn is_selectable_leaf(&self) -> bool {
        self.children.is_empty() && self.is_selectable()
    }

    #[inline]
    pub fn is_focusable(&self) -> bool {
        self.focusable
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn content(&self) -> &dyn Renderable {
        self.content.as_ref()
    }

    pub(crate) fn emit(&mut self, event: &NodeEvent) {
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }
}

impl fmt::Debug for RenderNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderNode")
            .field("id", &self.id)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("bounds", &self.bounds)
            .field("z_index", &self.z_index)
            .field("visible", &self.visible)
            .field("buffered", &self.buffered)
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// NodeSpec
// =============================================================================

/// Description of a node to add.
///
/// ```ignore
/// let spec = NodeSpec::new("title", TextBlock::new("Hello"))
///     .at(2, 1, 20, 1)
///     .with_z_index(1);
/// tree.add_child(&NodeId::root(), spec)?;
/// ```
pub struct NodeSpec {
    pub(crate) id: NodeId,
    pub(crate) content: Box<dyn Renderable>,
    pub(crate) bounds: Rect,
    pub(crate) insets: Insets,
    pub(crate) z_index: i32,
    pub(crate) visible: bool,
    pub(crate) buffered: bool,
    pub(crate) opacity: u8,
    pub(crate) selectable: Option<bool>,
    pub(crate) focusable: bool,
}

impl NodeSpec {
    pub fn new(id: impl Into<NodeId>, content: impl Renderable + 'static) -> Self {
        Self::boxed(id, Box::new(content))
    }

    pub fn boxed(id: impl Into<NodeId>, content: Box<dyn Renderable>) -> Self {
        Self {
            id: id.into(),
            content,
            bounds: Rect::default(),
            insets: Insets::ZERO,
            z_index: 0,
            visible: true,
            buffered: false,
            opacity: 255,
            selectable: None,
            focusable: false,
        }
    }

    pub fn at(mut self, x: i32, y: i32, width: u16, height: u16) -> Self {
        self.bounds = Rect::new(x, y, width, height);
        self
    }

    pub fn with_bounds(mut self, bounds: Rect) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn with_insets(mut self, insets: Insets) -> Self {
        self.insets = insets;
        self
    }

    pub fn with_z_index(mut self, z_index: i32) -> Self {
        self.z_index = z_index;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Paint into a private buffer, composited with `opacity`.
    pub fn buffered(mut self, opacity: u8) -> Self {
        self.buffered = true;
        self.opacity = opacity;
        self
    }

    /// Override selectability. Defaults to whether the content is `Selectable`.
    pub fn selectable(mut self, selectable: bool) -> Self {
        self.selectable = Some(selectable);
        self
    }

    pub fn focusable(mut self) -> Self {
        self.focusable = true;
        self
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub(crate) fn into_node(self, parent: NodeId, seq: u64) -> RenderNode {
        let selectable = self
            .selectable
            .unwrap_or_else(|| self.content.as_selectable().is_some());
        RenderNode {
            id: self.id,
            parent: Some(parent),
            children: Vec::new(),
            bounds: self.bounds,
            insets: self.insets,
            z_index: self.z_index,
            seq,
            visible: self.visible,
            buffered: self.buffered,
            opacity: self.opacity,
            selectable,
            focusable: self.focusable,
            dirty: true,
            content: self.content,
            surface: None,
            listeners: Vec::new(),
        }
    }
}

// =============================================================================
// Root content
// =============================================================================

/// Content of the root node: paints nothing, the compositor already cleared
/// the frame to the background.
pub(crate) struct Screen;

impl Renderable for Screen {
    fn paint(&self, _ctx: &mut PaintContext<'_>) -> crate::error::Result<()> {
        Ok(())
    }
}
