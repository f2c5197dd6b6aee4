//! Compositor - tree to cell grid.
//!
//! One pass per frame:
//!
//! 1. Clear the target to the background
//! 2. Resolve the selection into per-node ranges
//! 3. Pre-order walk; each visible node with a non-empty clip paints, then
//!    its children paint in ascending `(z_index, seq)` order
//!
//! A buffered node paints itself and its subtree into a private surface
//! only when dirty (or resized), then the surface is blitted with the
//! node's opacity. A paint error aborts the whole pass.

use rustc_hash::FxHashMap;

use crate::error::Result;
use crate::renderer::FrameBuffer;
use crate::state::{LocalRange, SelectionCoordinator};
use crate::tree::{NodeId, PaintContext, RenderTree};
use crate::types::{Rect, Rgba};

/// Counters for one composition pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComposeStats {
    pub nodes_painted: u32,
    pub surfaces_repainted: u32,
    pub surfaces_reused: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Compositor {
    pub background: Rgba,
    pub selection_bg: Rgba,
    pub selection_fg: Rgba,
}

impl Default for Compositor {
    fn default() -> Self {
        Self {
            background: Rgba::TERMINAL_DEFAULT,
            selection_bg: Rgba::BLUE,
            selection_fg: Rgba::WHITE,
        }
    }
}

/// Walk state shared by every node of one pass.
struct Pass<'a> {
    compositor: &'a Compositor,
    ranges: FxHashMap<NodeId, LocalRange>,
    stats: ComposeStats,
}

impl Compositor {
    pub fn new(background: Rgba, selection_bg: Rgba, selection_fg: Rgba) -> Self {
        Self {
            background,
            selection_bg,
            selection_fg,
        }
    }

    /// Composite the whole tree into `target`.
    ///
    /// Only `target` and buffered surfaces are written; on error `target`
    /// holds a partial frame and must not be presented.
    pub fn compose(
        &self,
        tree: &mut RenderTree,
        selection: &SelectionCoordinator,
        target: &mut FrameBuffer,
    ) -> Result<ComposeStats> {
        target.clear(self.background);
        let mut pass = Pass {
            compositor: self,
            ranges: selection.ranges(tree),
            stats: ComposeStats::default(),
        };
        let screen = target.bounds();
        let root = tree.root().clone();
        pass.node(tree, &root, target, screen, (0, 0))?;
        Ok(pass.stats)
    }
}

impl Pass<'_> {
    /// Paint `id` and its subtree. `clip` and the painted rects are in
    /// `buffer` coordinates; `offset` maps absolute bounds into them.
    fn node(
        &mut self,
        tree: &mut RenderTree,
        id: &NodeId,
        buffer: &mut FrameBuffer,
        parent_clip: Rect,
        offset: (i32, i32),
    ) -> Result<()> {
        let Some(node) = tree.get(id) else {
            return Ok(());
        };
        if !node.is_visible() {
            return Ok(());
        }
        let bounds = node.bounds().translate(offset.0, offset.1);
        let Some(clip) = bounds.intersect(&parent_clip) else {
            return Ok(());
        };

        if node.is_buffered() && !id.is_root() {
            return self.buffered(tree, id, buffer, bounds, clip);
        }

        self.paint(tree, id, buffer, offset, clip)?;
        self.children(tree, id, buffer, clip, offset)
    }

    fn paint(
        &mut self,
        tree: &RenderTree,
        id: &NodeId,
        buffer: &mut FrameBuffer,
        offset: (i32, i32),
        clip: Rect,
    ) -> Result<()> {
        let Some(node) = tree.get(id) else {
            return Ok(());
        };
        let mut ctx = PaintContext {
            buffer,
            node: id,
            bounds: node.bounds().translate(offset.0, offset.1),
            content: node.content_box().translate(offset.0, offset.1),
            clip,
            selection: self.ranges.get(id).copied(),
            selection_bg: self.compositor.selection_bg,
            selection_fg: self.compositor.selection_fg,
        };
        node.content().paint(&mut ctx)?;
        self.stats.nodes_painted += 1;
        Ok(())
    }

    fn children(
        &mut self,
        tree: &mut RenderTree,
        id: &NodeId,
        buffer: &mut FrameBuffer,
        clip: Rect,
        offset: (i32, i32),
    ) -> Result<()> {
        let Some(content) = tree.get(id).map(|n| n.content_box().translate(offset.0, offset.1)) else {
            return Ok(());
        };
        let Some(child_clip) = content.intersect(&clip) else {
            return Ok(());
        };
        for child in tree.paint_order(id) {
            self.node(tree, &child, buffer, child_clip, offset)?;
        }
        Ok(())
    }

    fn buffered(
        &mut self,
        tree: &mut RenderTree,
        id: &NodeId,
        buffer: &mut FrameBuffer,
        bounds: Rect,
        clip: Rect,
    ) -> Result<()> {
        let Some(node) = tree.get_mut(id) else {
            return Ok(());
        };
        let opacity = node.opacity;
        let origin = node.bounds;
        let (mut surface, stale) = match node.surface.take() {
            Some(surface) if surface.width() == origin.width && surface.height() == origin.height => {
                let dirty = node.dirty;
                (surface, dirty)
            }
            _ => (
                FrameBuffer::with_background(origin.width, origin.height, Rgba::TRANSPARENT),
                true,
            ),
        };

        let painted = if stale {
            surface.clear(Rgba::TRANSPARENT);
            let local = (-origin.x, -origin.y);
            let full = surface.bounds();
            self.paint(tree, id, &mut surface, local, full)
                .and_then(|()| self.children(tree, id, &mut surface, full, local))
        } else {
            Ok(())
        };

        if painted.is_ok() {
            buffer.blit(&surface, bounds.x, bounds.y, Some(&clip), opacity);
            if stale {
                self.stats.surfaces_repainted += 1;
            } else {
                self.stats.surfaces_reused += 1;
            }
        }
        if let Some(node) = tree.get_mut(id) {
            node.surface = Some(surface);
        }
        painted
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::tree::{NodeSpec, Panel, Renderable, TextBlock};

    fn compose(tree: &mut RenderTree) -> FrameBuffer {
        let mut target = FrameBuffer::new(tree.get(tree.root()).unwrap().bounds().width, 4);
        Compositor::default()
            .compose(tree, &SelectionCoordinator::new(), &mut target)
            .unwrap();
        target
    }

    fn row_text(buffer: &FrameBuffer, y: u16) -> String {
        buffer.row(y).iter().map(|c| c.ch.as_str()).collect()
    }

    #[test]
    fn test_higher_z_wins_regardless_of_insertion() {
        for flip in [false, true] {
            let mut tree = RenderTree::new(6, 4);
            let root = NodeId::root();
            let low = NodeSpec::new("low", Panel::new(Rgba::RED)).at(0, 0, 4, 2).with_z_index(1);
            let high = NodeSpec::new("high", Panel::new(Rgba::BLUE)).at(2, 1, 4, 2).with_z_index(2);
            if flip {
                tree.add_child(&root, high).unwrap();
                tree.add_child(&root, low).unwrap();
            } else {
                tree.add_child(&root, low).unwrap();
                tree.add_child(&root, high).unwrap();
            }
            let frame = compose(&mut tree);
            assert_eq!(frame.get(2, 1).unwrap().bg, Rgba::BLUE);
            assert_eq!(frame.get(1, 1).unwrap().bg, Rgba::RED);
        }
    }

    #[test]
    fn test_equal_z_later_sibling_on_top() {
        let mut tree = RenderTree::new(4, 4);
        let root = NodeId::root();
        tree.add_child(&root, NodeSpec::new("a", Panel::new(Rgba::RED)).at(0, 0, 2, 1)).unwrap();
        tree.add_child(&root, NodeSpec::new("b", Panel::new(Rgba::GREEN)).at(0, 0, 2, 1)).unwrap();
        assert_eq!(compose(&mut tree).get(0, 0).unwrap().bg, Rgba::GREEN);
    }

    #[test]
    fn test_children_clipped_to_parent_content() {
        let mut tree = RenderTree::new(8, 4);
        let root = NodeId::root();
        let parent = tree
            .add_child(&root, NodeSpec::new("p", Panel::transparent()).at(0, 0, 4, 2))
            .unwrap();
        tree.add_child(&parent, NodeSpec::new("t", TextBlock::new("abcdefgh")).at(0, 0, 8, 1)).unwrap();
        assert_eq!(row_text(&compose(&mut tree), 0), "abcd    ");
    }

    #[test]
    fn test_hidden_subtree_skipped() {
        let mut tree = RenderTree::new(4, 4);
        let root = NodeId::root();
        let p = tree.add_child(&root, NodeSpec::new("p", Panel::new(Rgba::RED)).at(0, 0, 4, 4).hidden()).unwrap();
        tree.add_child(&p, NodeSpec::new("c", Panel::new(Rgba::BLUE)).at(0, 0, 1, 1)).unwrap();
        let frame = compose(&mut tree);
        assert_eq!(frame.get(0, 0).unwrap().bg, Rgba::TERMINAL_DEFAULT);
    }

    #[test]
    fn test_buffered_node_blits_with_opacity() {
        let mut tree = RenderTree::new(4, 4);
        let root = NodeId::root();
        tree.add_child(&root, NodeSpec::new("under", Panel::new(Rgba::BLACK)).at(0, 0, 4, 4)).unwrap();
        let overlay = tree
            .add_child(&root, NodeSpec::new("overlay", Panel::new(Rgba::WHITE)).at(1, 1, 2, 2).buffered(128))
            .unwrap();

        let frame = compose(&mut tree);
        assert_eq!(frame.get(0, 0).unwrap().bg, Rgba::BLACK);
        assert_eq!(frame.get(1, 1).unwrap().bg, Rgba::rgb(128, 128, 128));
        assert!(tree.get(&overlay).unwrap().surface.is_some());
    }

    #[test]
    fn test_buffered_surface_reused_when_clean() {
        let mut tree = RenderTree::new(4, 4);
        let root = NodeId::root();
        let b = tree
            .add_child(&root, NodeSpec::new("b", TextBlock::new("hi")).at(0, 0, 2, 1).buffered(255))
            .unwrap();
        let mut target = FrameBuffer::new(4, 4);
        let compositor = Compositor::default();
        let selection = SelectionCoordinator::new();

        let first = compositor.compose(&mut tree, &selection, &mut target).unwrap();
        assert_eq!(first.surfaces_repainted, 1);
        tree.clear_dirty();

        let second = compositor.compose(&mut tree, &selection, &mut target).unwrap();
        assert_eq!(second.surfaces_reused, 1);
        assert_eq!(row_text(&target, 0), "hi  ");

        tree.set_bounds(&b, 0, 0, 3, 1);
        let third = compositor.compose(&mut tree, &selection, &mut target).unwrap();
        assert_eq!(third.surfaces_repainted, 1);
    }

    #[test]
    fn test_buffered_children_move_with_surface() {
        let mut tree = RenderTree::new(6, 4);
        let root = NodeId::root();
        let b = tree
            .add_child(&root, NodeSpec::new("b", Panel::transparent()).at(2, 1, 3, 2).buffered(255))
            .unwrap();
        tree.add_child(&b, NodeSpec::new("t", TextBlock::new("xy")).at(3, 2, 2, 1)).unwrap();
        let frame = compose(&mut tree);
        assert_eq!(row_text(&frame, 2), "   xy ");
    }

    struct Broken;

    impl Renderable for Broken {
        fn paint(&self, ctx: &mut PaintContext<'_>) -> Result<()> {
            Err(Error::paint(ctx.node, "boom"))
        }
    }

    #[test]
    fn test_paint_error_aborts() {
        let mut tree = RenderTree::new(4, 4);
        tree.add_child(&NodeId::root(), NodeSpec::new("bad", Broken).at(0, 0, 1, 1)).unwrap();
        let mut target = FrameBuffer::new(4, 4);
        let result = Compositor::default().compose(&mut tree, &SelectionCoordinator::new(), &mut target);
        assert!(matches!(result, Err(Error::Paint { .. })));
    }
}
