//! Layout Module - Taffy flexbox bridge
//!
//! The render tree only stores absolute bounds; it never computes layout.
//! [`TaffyLayout`] keeps a [`taffy::Style`] per node, mirrors the styled
//! part of the tree into a `TaffyTree`, runs flexbox, and writes the
//! results back with `RenderTree::set_bounds`.
//!
//! Only nodes with a style take part. A node without one (and its subtree)
//! keeps whatever bounds it was given by hand. The root is always laid out
//! and sized to the screen.
//!
//! Leaves whose content is `Selectable` are measured by their text: the
//! widest line by display width, one row per line.
//!
//! # Example
//!
//! ```ignore
//! let mut layout = TaffyLayout::new();
//! layout.set_style(NodeId::root(), Style { flex_direction: FlexDirection::Column, ..Default::default() });
//! layout.set_style("header", Style { size: Size { width: percent(1.0), height: length(1.0) }, ..Default::default() });
//! layout.compute(&mut tree, 80, 24)?;
//! ```

use rustc_hash::FxHashMap;
use taffy::{AvailableSpace, Dimension, Display, NodeId as TaffyNode, Size, Style, TaffyError, TaffyTree};

use crate::error::{Error, Result};
use crate::renderer::string_width;
use crate::tree::{NodeId, RenderTree};

/// Intrinsic text size of a measured leaf: (columns, rows).
type Measure = (f32, f32);

fn layout_error(err: TaffyError) -> Error {
    Error::Layout(err.to_string())
}

// =============================================================================
// TaffyLayout
// =============================================================================

#[derive(Debug, Default)]
pub struct TaffyLayout {
    styles: FxHashMap<NodeId, Style>,
}

impl TaffyLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_style(&mut self, id: impl Into<NodeId>, style: Style) {
        self.styles.insert(id.into(), style);
    }

    pub fn style(&self, id: &NodeId) -> Option<&Style> {
        self.styles.get(id)
    }

    pub fn remove_style(&mut self, id: &NodeId) -> Option<Style> {
        self.styles.remove(id)
    }

    /// Drop styles of destroyed nodes.
    pub fn forget(&mut self, removed: &[NodeId]) {
        for id in removed {
            self.styles.remove(id);
        }
    }

    /// Lay out the tree for a `width` x `height` screen and apply the
    /// absolute bounds.
    pub fn compute(&self, tree: &mut RenderTree, width: u16, height: u16) -> Result<()> {
        let mut taffy: TaffyTree<Measure> = TaffyTree::new();
        let mut mapping: FxHashMap<NodeId, TaffyNode> = FxHashMap::default();

        let root_id = tree.root().clone();
        let mut root_style = self.styles.get(&root_id).cloned().unwrap_or_default();
        root_style.size = Size {
            width: Dimension::Length(width as f32),
            height: Dimension::Length(height as f32),
        };
        let root = self.build(tree, &mut taffy, &mut mapping, &root_id, root_style)?;

        let available = Size {
            width: AvailableSpace::Definite(width as f32),
            height: AvailableSpace::Definite(height as f32),
        };
        taffy
            .compute_layout_with_measure(root, available, |known, _available, _node, context, _style| {
                match context {
                    Some(&mut (w, h)) => Size {
                        width: known.width.unwrap_or(w),
                        height: known.height.unwrap_or(h),
                    },
                    None => Size::ZERO,
                }
            })
            .map_err(layout_error)?;

        apply(tree, &taffy, &mapping, &root_id, 0.0, 0.0)?;
        tracing::trace!(nodes = mapping.len(), width, height, "layout computed");
        Ok(())
    }

    fn build(
        &self,
        tree: &RenderTree,
        taffy: &mut TaffyTree<Measure>,
        mapping: &mut FxHashMap<NodeId, TaffyNode>,
        id: &NodeId,
        mut style: Style,
    ) -> Result<TaffyNode> {
        let Some(node) = tree.get(id) else {
            return Err(Error::UnknownNode(id.clone()));
        };
        if !node.is_visible() {
            style.display = Display::None;
        }

        let styled: Vec<(NodeId, Style)> = node
            .children()
            .iter()
            .filter_map(|child| Some((child.clone(), self.styles.get(child)?.clone())))
            .collect();

        let handle = match node.content().as_selectable() {
            Some(text) if styled.is_empty() && !id.is_root() => {
                let columns = (0..text.line_count())
                    .map(|line| string_width(text.line_text(line)))
                    .max()
                    .unwrap_or(0);
                let measure = (columns as f32, text.line_count() as f32);
                taffy.new_leaf_with_context(style, measure).map_err(layout_error)?
            }
            _ => taffy.new_leaf(style).map_err(layout_error)?,
        };
        mapping.insert(id.clone(), handle);

        for (child, child_style) in styled {
            let child_handle = self.build(tree, taffy, mapping, &child, child_style)?;
            taffy.add_child(handle, child_handle).map_err(layout_error)?;
        }
        Ok(handle)
    }
}

/// Write bounds top-down. Taffy locations are relative to the parent.
fn apply(
    tree: &mut RenderTree,
    taffy: &TaffyTree<Measure>,
    mapping: &FxHashMap<NodeId, TaffyNode>,
    id: &NodeId,
    parent_x: f32,
    parent_y: f32,
) -> Result<()> {
    let Some(&handle) = mapping.get(id) else {
        return Ok(());
    };
    let layout = taffy.layout(handle).map_err(layout_error)?;
    let x = parent_x + layout.location.x;
    let y = parent_y + layout.location.y;
    let width = layout.size.width.round().clamp(0.0, u16::MAX as f32) as u16;
    let height = layout.size.height.round().clamp(0.0, u16::MAX as f32) as u16;
    tree.set_bounds(id, x.round() as i32, y.round() as i32, width, height);

    let children: Vec<NodeId> = tree.get(id).map(|n| n.children().to_vec()).unwrap_or_default();
    for child in &children {
        apply(tree, taffy, mapping, child, x, y)?;
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
