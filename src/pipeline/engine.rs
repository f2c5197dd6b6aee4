//! Engine - owns the tree, coordinators, scheduler and renderer.
//!
//! # Frame Flow
//!
//! ```text
//! input → selection/focus → tree.mark_dirty → scheduler → compose → diff → write
//! ```
//!
//! Everything runs on one thread. `run` polls crossterm for input and ticks
//! the scheduler; embedders that own their loop call `handle_event` and
//! `tick` themselves.
//!
//! # Example
//!
//! ```ignore
//! let mut engine = Engine::start(EngineConfig::default())?;
//! engine.add_node(&NodeId::root(), NodeSpec::new("hello", TextBlock::new("Hello")).at(1, 1, 5, 1))?;
//! engine.run()?;
//! ```

use std::cell::Cell;
use std::io::{self, Stdout, Write};
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::input::{self, InputEvent, KeyEvent, PointerButton, PointerEvent, PointerKind};
use crate::layout::TaffyLayout;
use crate::renderer::{DiffRenderer, DiffStats};
use crate::state::{
    Direction, FocusChange, FocusCoordinator, FocusScope, FocusableOptions, LocalRange, ScopeId, Selection,
    SelectionCoordinator,
};
use crate::tree::{NodeEvent, NodeId, NodeSpec, RenderTree};

use super::compose::Compositor;
use super::scheduler::FrameScheduler;
use super::terminal::TerminalGuard;

/// Longest time `run` blocks on input when no frame is pending.
const IDLE_POLL: Duration = Duration::from_millis(250);

// =============================================================================
// RenderHandle
// =============================================================================

#[derive(Debug, Default)]
struct HandleState {
    requested: Cell<bool>,
    composing: Cell<bool>,
    retry: Cell<bool>,
}

/// Cheap clonable link back to one engine's scheduler.
///
/// Widgets keep a clone to ask for a frame without a reference to the
/// engine. A request made while a frame is being composed becomes a retry:
/// the tree is marked dirty again after the frame and another one follows.
#[derive(Debug, Clone, Default)]
pub struct RenderHandle {
    state: Rc<HandleState>,
}

impl RenderHandle {
    pub fn request_render(&self) {
        if self.state.composing.get() {
            self.state.retry.set(true);
        } else {
            self.state.requested.set(true);
        }
    }

    pub fn is_composing(&self) -> bool {
        self.state.composing.get()
    }

    fn take_request(&self) -> bool {
        self.state.requested.replace(false)
    }

    fn take_retry(&self) -> bool {
        self.state.retry.replace(false)
    }

    fn set_composing(&self, composing: bool) {
        self.state.composing.set(composing);
    }
}

// =============================================================================
// Stats
// =============================================================================

/// Running totals since the engine was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frames_rendered: u64,
    /// Frames composed that changed no cell.
    pub frames_skipped: u64,
    /// Frames dropped because a node failed to paint.
    pub frames_aborted: u64,
    pub bytes_written: u64,
    pub last_frame: Duration,
    pub last_diff: DiffStats,
}

/// What one `tick` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// No frame was due.
    Idle,
    Rendered(DiffStats),
    /// Composition failed; the front buffer was kept and a retry is queued.
    Aborted,
}

// =============================================================================
// Engine
// =============================================================================

pub struct Engine<W: Write> {
    tree: RenderTree,
    layout: Option<TaffyLayout>,
    renderer: DiffRenderer,
    compositor: Compositor,
    scheduler: FrameScheduler,
    selection: SelectionCoordinator,
    focus: FocusCoordinator,
    handle: RenderHandle,
    stats: FrameStats,
    config: EngineConfig,
    running: bool,
    guard: Option<TerminalGuard>,
    out: W,
}

impl Engine<Stdout> {
    /// Take over the terminal and create an engine sized to it.
    pub fn start(config: EngineConfig) -> Result<Self> {
        let (width, height) = crossterm::terminal::size()?;
        let guard = TerminalGuard::acquire(&config)?;
        let mut engine = Engine::new(io::stdout(), width, height, config);
        engine.guard = Some(guard);
        Ok(engine)
    }

    /// Poll input and render until stopped.
    ///
    /// Only terminal I/O errors end the loop early.
    pub fn run(&mut self) -> Result<()> {
        let result = self.run_loop();
        self.stop();
        result
    }

    fn run_loop(&mut self) -> Result<()> {
        self.tick(Instant::now())?;
        while self.running {
            let timeout = self
                .scheduler
                .time_until_next(Instant::now())
                .unwrap_or(IDLE_POLL)
                .min(IDLE_POLL);
            if let Some(event) = input::poll_event(timeout)? {
                self.handle_event(event);
            }
            if self.running {
                self.tick(Instant::now())?;
            }
        }
        Ok(())
    }
}

impl<W: Write> Engine<W> {
    /// An engine writing frames to `out`. The terminal is not touched.
    pub fn new(out: W, width: u16, height: u16, config: EngineConfig) -> Self {
        let mut renderer = DiffRenderer::new(width, height);
        renderer.set_synchronized(config.synchronized_output);
        Self {
            tree: RenderTree::new(width, height),
            layout: None,
            renderer,
            compositor: Compositor::new(config.background, config.selection_bg, config.selection_fg),
            scheduler: FrameScheduler::from_config(&config),
            selection: SelectionCoordinator::new(),
            focus: FocusCoordinator::new(),
            handle: RenderHandle::default(),
            stats: FrameStats::default(),
            config,
            running: true,
            guard: None,
            out,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn tree(&self) -> &RenderTree {
        &self.tree
    }

    /// Direct tree access. Removals made here are reconciled on the next tick.
    pub fn tree_mut(&mut self) -> &mut RenderTree {
        &mut self.tree
    }

    pub fn focus(&self) -> &FocusCoordinator {
        &self.focus
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    pub fn handle(&self) -> RenderHandle {
        self.handle.clone()
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn output_mut(&mut self) -> &mut W {
        &mut self.out
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn size(&self) -> (u16, u16) {
        (self.renderer.width(), self.renderer.height())
    }

    /// Run taffy before every composed frame.
    pub fn set_layout(&mut self, layout: TaffyLayout) {
        self.layout = Some(layout);
        self.tree.mark_dirty(&NodeId::root());
    }

    pub fn layout_mut(&mut self) -> Option<&mut TaffyLayout> {
        self.layout.as_mut()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Stop the loop, drop pending work and restore the terminal.
    pub fn stop(&mut self) {
        if self.running {
            tracing::debug!(frames = self.stats.frames_rendered, "engine stopping");
        }
        self.running = false;
        self.scheduler.cancel();
        self.tree.clear_dirty();
        if let Some(mut guard) = self.guard.take() {
            if let Err(error) = guard.release() {
                tracing::warn!(%error, "terminal restore failed");
            }
        }
    }

    /// Adopt a new terminal size. The next frame is written in full.
    pub fn resize(&mut self, width: u16, height: u16) {
        tracing::debug!(width, height, "resize");
        self.tree.resize(width, height);
        self.renderer.resize(width, height);
        self.scheduler.request();
    }

    /// Ask for a frame on the next due tick.
    pub fn request_render(&mut self) {
        self.scheduler.request();
    }

    /// Render now, ignoring the frame interval and pause state.
    ///
    /// A stopped engine writes nothing and reports `Idle`.
    pub fn force_render(&mut self) -> Result<FrameOutcome> {
        if !self.running {
            return Ok(FrameOutcome::Idle);
        }
        let now = Instant::now();
        self.scheduler.mark_rendered(now);
        self.frame()
    }

    pub fn pause(&mut self) {
        self.scheduler.pause();
    }

    pub fn resume(&mut self) {
        self.scheduler.resume();
        if self.tree.is_dirty() {
            self.scheduler.request();
        }
    }

    pub fn set_target_fps(&mut self, fps: u32) {
        self.scheduler.set_target_fps(fps);
        self.config.target_fps = self.scheduler.target_fps();
    }

    /// Render a frame if one is due at `now`.
    pub fn tick(&mut self, now: Instant) -> Result<FrameOutcome> {
        if !self.running {
            return Ok(FrameOutcome::Idle);
        }
        self.reconcile();
        if self.handle.take_request() || self.tree.is_dirty() {
            self.scheduler.request();
        }
        if !self.scheduler.take_due(now) {
            return Ok(FrameOutcome::Idle);
        }
        self.frame()
    }

    fn frame(&mut self) -> Result<FrameOutcome> {
        if self.handle.is_composing() {
            self.handle.request_render();
            return Ok(FrameOutcome::Idle);
        }
        let started = Instant::now();

        self.handle.set_composing(true);
        let composed = self.compose();
        self.handle.set_composing(false);

        if let Err(error) = composed {
            tracing::warn!(%error, "frame aborted");
            self.stats.frames_aborted += 1;
            let root = self.tree.root().clone();
            self.tree.mark_dirty(&root);
            self.scheduler.request();
            return Ok(FrameOutcome::Aborted);
        }

        let diff = self.renderer.render(&mut self.out)?;
        self.tree.clear_dirty();
        if self.handle.take_retry() {
            let root = self.tree.root().clone();
            self.tree.mark_dirty(&root);
            self.scheduler.request();
        }

        self.stats.frames_rendered += 1;
        if diff.bytes == 0 {
            self.stats.frames_skipped += 1;
        }
        self.stats.bytes_written += diff.bytes as u64;
        self.stats.last_frame = started.elapsed();
        self.stats.last_diff = diff;
        tracing::debug!(
            bytes = diff.bytes,
            rows = diff.rows_changed,
            cells = diff.cells_written,
            full = diff.full,
            elapsed_us = self.stats.last_frame.as_micros() as u64,
            "frame"
        );
        Ok(FrameOutcome::Rendered(diff))
    }

    fn compose(&mut self) -> Result<()> {
        if let Some(layout) = &self.layout {
            let (width, height) = self.size();
            layout.compute(&mut self.tree, width, height)?;
        }
        self.compositor
            .compose(&mut self.tree, &self.selection, self.renderer.back_mut())?;
        Ok(())
    }

    // =========================================================================
    // Tree
    // =========================================================================

    pub fn add_node(&mut self, parent: &NodeId, spec: NodeSpec) -> Result<NodeId> {
        self.tree.add_child(parent, spec)
    }

    pub fn insert_node(&mut self, parent: &NodeId, index: usize, spec: NodeSpec) -> Result<NodeId> {
        self.tree.insert_child(parent, index, spec)
    }

    /// Detach and destroy a child subtree, releasing any selection endpoint
    /// or focus record it held.
    pub fn remove_node(&mut self, parent: &NodeId, child: &NodeId) -> Vec<NodeId> {
        let removed = self.tree.remove_child(parent, child);
        self.reconcile();
        removed
    }

    pub fn destroy(&mut self, id: &NodeId) -> Vec<NodeId> {
        let removed = self.tree.destroy(id);
        self.reconcile();
        removed
    }

    /// Release coordinator state that points at destroyed nodes.
    fn reconcile(&mut self) {
        let removed = self.tree.drain_removed();
        if removed.is_empty() {
            return;
        }
        let changed = self.selection.forget(&self.tree, &removed);
        self.apply_selection(changed);
        for id in &removed {
            let changes = self.focus.unregister_focusable(id);
            self.apply_focus(changes);
        }
        if let Some(layout) = self.layout.as_mut() {
            layout.forget(&removed);
        }
    }

    // =========================================================================
    // Input
    // =========================================================================

    pub fn handle_event(&mut self, event: InputEvent) {
        match event {
            InputEvent::Key(key) => {
                self.handle_key(&key);
            }
            InputEvent::Pointer(pointer) => self.handle_pointer(&pointer),
            InputEvent::Resize(width, height) => self.resize(width, height),
            other => tracing::trace!(?other, "input ignored"),
        }
    }

    /// Route a key: Ctrl+C, then navigation bindings, then the focused
    /// component. Returns whether something consumed it.
    pub fn handle_key(&mut self, key: &KeyEvent) -> bool {
        tracing::trace!(chord = %key.chord(), "key");
        if key.is_interrupt() && self.config.exit_on_ctrl_c {
            self.stop();
            return true;
        }

        let routed = self.focus.handle_key(key);
        self.apply_focus(routed.changes);
        if routed.handled {
            return true;
        }

        let Some(node) = self.focus.focused_component().cloned() else {
            return false;
        };
        let consumed = self
            .tree
            .focusable_mut(&node)
            .is_some_and(|focusable| focusable.handle_key(key));
        if consumed {
            self.tree.mark_dirty(&node);
        }
        consumed
    }

    /// Left button drives selection; a press also focuses the focusable
    /// node under the pointer.
    pub fn handle_pointer(&mut self, event: &PointerEvent) {
        tracing::trace!(kind = ?event.kind, x = event.x, y = event.y, "pointer");
        let (x, y) = (event.x as i32, event.y as i32);
        match (event.kind, event.button) {
            (PointerKind::Down, PointerButton::Left) => {
                self.begin_selection(x, y);
                let target = self
                    .tree
                    .hit_test_where(x, y, |n| n.is_focusable())
                    .filter(|id| self.focus.is_registered(id));
                if let Some(id) = target {
                    if let Ok(changes) = self.focus.focus_node(&id) {
                        self.apply_focus(changes);
                    }
                }
            }
            (PointerKind::Drag, PointerButton::Left) => self.extend_selection(x, y),
            (PointerKind::Up, PointerButton::Left) => self.end_selection(),
            _ => {}
        }
    }

    // =========================================================================
    // Selection
    // =========================================================================

    pub fn begin_selection(&mut self, x: i32, y: i32) {
        let changed = self.selection.begin_selection(&self.tree, x, y);
        self.apply_selection(changed);
    }

    pub fn extend_selection(&mut self, x: i32, y: i32) {
        let changed = self.selection.extend_selection(&self.tree, x, y);
        self.apply_selection(changed);
    }

    pub fn end_selection(&mut self) {
        self.selection.end_selection();
    }

    pub fn clear_selection(&mut self) {
        let changed = self.selection.clear_selection(&self.tree);
        self.apply_selection(changed);
    }

    pub fn selected_text(&self) -> String {
        self.selection.selected_text(&self.tree)
    }

    pub fn has_selection(&self, node: &NodeId) -> bool {
        self.selection.has_selection(&self.tree, node)
    }

    pub fn local_range(&self, node: &NodeId) -> Option<LocalRange> {
        self.selection.local_range(&self.tree, node)
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.selection()
    }

    pub fn on_selection_changed<F>(&mut self, handler: F)
    where
        F: FnMut(Option<&Selection>) + 'static,
    {
        self.selection.on_selection_changed(handler);
    }

    fn apply_selection(&mut self, changed: Vec<NodeId>) {
        for id in changed {
            let range = self.selection.local_range(&self.tree, &id);
            self.tree.mark_dirty(&id);
            self.tree.emit(&id, &NodeEvent::SelectionChanged(range));
        }
    }

    // =========================================================================
    // Focus
    // =========================================================================

    pub fn register_scope(&mut self, scope: FocusScope) -> Result<()> {
        self.focus.register_scope(scope)
    }

    pub fn unregister_scope(&mut self, id: &ScopeId) {
        let changes = self.focus.unregister_scope(id);
        self.apply_focus(changes);
    }

    /// Register a node with the focus coordinator and flag it focusable in
    /// the tree.
    pub fn register_focusable(&mut self, node: &NodeId, options: FocusableOptions) -> Result<()> {
        if !self.tree.contains(node) {
            return Err(Error::UnknownNode(node.clone()));
        }
        let changes = self.focus.register_focusable(node.clone(), options)?;
        self.tree.set_focusable(node, true);
        self.apply_focus(changes);
        Ok(())
    }

    pub fn unregister_focusable(&mut self, node: &NodeId) {
        let changes = self.focus.unregister_focusable(node);
        self.tree.set_focusable(node, false);
        self.apply_focus(changes);
    }

    pub fn enter_scope(&mut self, id: &ScopeId) -> Result<()> {
        let changes = self.focus.enter_scope(id)?;
        self.apply_focus(changes);
        Ok(())
    }

    pub fn exit_scope(&mut self) {
        let changes = self.focus.exit_scope();
        self.apply_focus(changes);
    }

    pub fn navigate(&mut self, direction: Direction) {
        let changes = self.focus.navigate(direction);
        self.apply_focus(changes);
    }

    pub fn focus_node(&mut self, node: &NodeId) -> Result<()> {
        let changes = self.focus.focus_node(node)?;
        self.apply_focus(changes);
        Ok(())
    }

    fn apply_focus(&mut self, changes: Vec<FocusChange>) {
        for change in changes {
            let node = change.node().clone();
            let level = change.level();
            let event = if change.is_gained() {
                if let Some(focusable) = self.tree.focusable_mut(&node) {
                    focusable.on_focus(level);
                }
                NodeEvent::Focused(level)
            } else {
                if let Some(focusable) = self.tree.focusable_mut(&node) {
                    focusable.on_blur(level);
                }
                NodeEvent::Blurred(level)
            };
            self.tree.mark_dirty(&node);
            self.tree.emit(&node, &event);
        }
    }
}

impl<W: Write> Drop for Engine<W> {
    fn drop(&mut self) {
        if let Some(mut guard) = self.guard.take() {
            let _ = guard.release();
        }
    }
}

impl<W: Write> std::fmt::Debug for Engine<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("size", &self.size())
            .field("running", &self.running)
            .field("stats", &self.stats)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================
