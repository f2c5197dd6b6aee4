//! Hierarchical focus.
//!
//! Focus is tracked per scope and per level. A scope is a region of the UI
//! (a window, a form, a toolbar); inside it up to three nodes can hold focus
//! at once, one per [`FocusLevel`]: the CONTAINER (which pane is current),
//! the GROUP (which field set), and the COMPONENT (which input gets keys).
//!
//! Scopes nest. The *active chain* is the entered scope plus its ancestors;
//! only scopes on the chain keep focus records. Entering another scope drops
//! the records of every scope that leaves the chain.
//!
//! # API
//!
//! - `register_scope` / `unregister_scope` - Scope lifecycle
//! - `register_focusable` / `unregister_focusable` - Node lifecycle
//! - `enter_scope` / `exit_scope` - Move the active chain
//! - `navigate` / `navigate_level` - Cycle within the active scope
//! - `focus_node` - Focus a node directly (pointer clicks)
//! - `handle_key` - Navigation key bindings
//!
//! Every mutator returns the [`FocusChange`]s it caused so the engine can
//! run `Focusable` hooks and node listeners.

use std::fmt;

use compact_str::CompactString;
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::input::KeyEvent;
use crate::tree::NodeId;

// =============================================================================
// Types
// =============================================================================

/// Unique focus scope identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(CompactString);

impl ScopeId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(CompactString::new(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScopeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ScopeId {
    fn from(id: String) -> Self {
        Self(CompactString::from(id))
    }
}

/// Focus depth. Ordered shallow to deep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FocusLevel {
    Container,
    Group,
    Component,
}

impl FocusLevel {
    pub const ALL: [FocusLevel; 3] = [FocusLevel::Container, FocusLevel::Group, FocusLevel::Component];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

/// What a navigation key does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavAction {
    Next,
    Previous,
    /// Leave the active scope for its parent.
    Exit,
}

/// A focus scope definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusScope {
    pub id: ScopeId,
    /// Deepest level `enter_scope` fills; CONTAINER is always filled.
    pub level: FocusLevel,
    pub parent: Option<ScopeId>,
    /// When false, focusing a deeper level clears the shallower records.
    pub allow_simultaneous_focus: bool,
    /// Chord (`"shift+tab"`) to action. Layered over the default bindings.
    pub navigation_keys: FxHashMap<String, NavAction>,
}

impl FocusScope {
    pub fn new(id: impl Into<ScopeId>, level: FocusLevel) -> Self {
        Self {
            id: id.into(),
            level,
            parent: None,
            allow_simultaneous_focus: true,
            navigation_keys: FxHashMap::default(),
        }
    }

    pub fn with_parent(mut self, parent: impl Into<ScopeId>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_simultaneous_focus(mut self, allow: bool) -> Self {
        self.allow_simultaneous_focus = allow;
        self
    }

    pub fn with_key(mut self, chord: impl Into<String>, action: NavAction) -> Self {
        self.navigation_keys.insert(chord.into(), action);
        self
    }
}

/// How a node takes part in focus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusableOptions {
    pub scope: ScopeId,
    pub level: FocusLevel,
    /// Navigation order within the scope and level; ties keep registration order.
    pub order: i32,
    /// Keep shallower records when this node gains focus in an exclusive scope.
    pub maintain_parent_focus: bool,
}

impl FocusableOptions {
    pub fn new(scope: impl Into<ScopeId>, level: FocusLevel) -> Self {
        Self {
            scope: scope.into(),
            level,
            order: 0,
            maintain_parent_focus: false,
        }
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn maintain_parent_focus(mut self) -> Self {
        self.maintain_parent_focus = true;
        self
    }
}

/// One gained or lost focus record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusChange {
    Gained { node: NodeId, scope: ScopeId, level: FocusLevel },
    Lost { node: NodeId, scope: ScopeId, level: FocusLevel },
}

impl FocusChange {
    pub fn node(&self) -> &NodeId {
        match self {
            Self::Gained { node, .. } | Self::Lost { node, .. } => node,
        }
    }

    pub fn level(&self) -> FocusLevel {
        match self {
            Self::Gained { level, .. } | Self::Lost { level, .. } => *level,
        }
    }

    pub fn is_gained(&self) -> bool {
        matches!(self, Self::Gained { .. })
    }
}

/// Argument of `is_focused`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusTarget {
    Node(NodeId),
    Scope(ScopeId),
}

impl From<NodeId> for FocusTarget {
    fn from(id: NodeId) -> Self {
        Self::Node(id)
    }
}

impl From<ScopeId> for FocusTarget {
    fn from(id: ScopeId) -> Self {
        Self::Scope(id)
    }
}

/// Result of offering a key to the coordinator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyRouting {
    /// A navigation binding matched; the key should go no further.
    pub handled: bool,
    pub changes: Vec<FocusChange>,
}

type ErrorHandler = Box<dyn FnMut(&Error)>;

#[derive(Debug, Clone)]
struct Entry {
    node: NodeId,
    scope: ScopeId,
    level: FocusLevel,
    order: i32,
    seq: u64,
    maintain_parent_focus: bool,
}

impl Entry {
    fn sort_key(&self) -> (i32, u64) {
        (self.order, self.seq)
    }
}

// =============================================================================
// FocusCoordinator
// =============================================================================

#[derive(Default)]
pub struct FocusCoordinator {
    scopes: FxHashMap<ScopeId, FocusScope>,
    entries: Vec<Entry>,
    records: FxHashMap<(ScopeId, FocusLevel), NodeId>,
    active: Option<ScopeId>,
    next_seq: u64,
    error_handler: Option<ErrorHandler>,
}

impl FocusCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called with every rejected registration or activation, after it is
    /// logged.
    pub fn on_error<F>(&mut self, handler: F)
    where
        F: FnMut(&Error) + 'static,
    {
        self.error_handler = Some(Box::new(handler));
    }

    fn fail(&mut self, error: Error) -> Error {
        tracing::warn!(%error, "focus request rejected");
        if let Some(handler) = self.error_handler.as_mut() {
            handler(&error);
        }
        error
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn scope(&self, id: &ScopeId) -> Option<&FocusScope> {
        self.scopes.get(id)
    }

    /// The innermost active scope.
    pub fn active_scope(&self) -> Option<&ScopeId> {
        self.active.as_ref()
    }

    pub fn is_registered(&self, node: &NodeId) -> bool {
        self.entries.iter().any(|e| &e.node == node)
    }

    /// The record for one scope and level.
    pub fn focused(&self, scope: &ScopeId, level: FocusLevel) -> Option<&NodeId> {
        self.records.get(&(scope.clone(), level))
    }

    /// A node holds any record; a scope is on the active chain and it or a
    /// deeper scope on the chain holds focus.
    pub fn is_focused(&self, target: impl Into<FocusTarget>) -> bool {
        match target.into() {
            FocusTarget::Node(node) => self.records.values().any(|n| *n == node),
            FocusTarget::Scope(scope) => {
                let chain = self.active_chain();
                chain
                    .iter()
                    .position(|s| *s == scope)
                    .is_some_and(|pos| chain[..=pos].iter().any(|s| self.holds_focus(s)))
            }
        }
    }

    /// A scope holds focus through its CONTAINER record. In an exclusive
    /// scope the single deeper record stands in for it.
    fn holds_focus(&self, scope: &ScopeId) -> bool {
        let exclusive = self.scopes.get(scope).is_some_and(|s| !s.allow_simultaneous_focus);
        self.records
            .keys()
            .any(|(s, level)| s == scope && (*level == FocusLevel::Container || exclusive))
    }

    /// Whether entering `scope` can give it a CONTAINER record.
    fn has_container(&self, scope: &ScopeId) -> bool {
        self.records.contains_key(&(scope.clone(), FocusLevel::Container))
            || !self.candidates(scope, FocusLevel::Container).is_empty()
    }

    /// Every record on the active chain, outermost scope first, shallow
    /// levels first within a scope.
    pub fn all_focused(&self) -> Vec<(FocusLevel, NodeId)> {
        let mut focused = Vec::new();
        for scope in self.active_chain().iter().rev() {
            for level in FocusLevel::ALL {
                if let Some(node) = self.records.get(&(scope.clone(), level)) {
                    focused.push((level, node.clone()));
                }
            }
        }
        focused
    }

    /// The COMPONENT record of the innermost scope that has one; keys that
    /// navigation doesn't claim go here.
    pub fn focused_component(&self) -> Option<&NodeId> {
        self.active_chain()
            .into_iter()
            .find_map(|scope| self.records.get(&(scope, FocusLevel::Component)))
    }

    /// The active scope and its ancestors, innermost first.
    pub fn active_chain(&self) -> Vec<ScopeId> {
        match &self.active {
            Some(active) => self.chain_of(active),
            None => Vec::new(),
        }
    }

    fn chain_of(&self, id: &ScopeId) -> Vec<ScopeId> {
        let mut chain = Vec::new();
        let mut current = Some(id.clone());
        while let Some(scope) = current {
            // A parent cycle would loop forever.
            if chain.contains(&scope) || chain.len() > self.scopes.len() {
                break;
            }
            current = self.scopes.get(&scope).and_then(|s| s.parent.clone());
            chain.push(scope);
        }
        chain
    }

    /// Focusables of a scope at a level, in navigation order.
    fn candidates(&self, scope: &ScopeId, level: FocusLevel) -> Vec<&Entry> {
        let mut list: Vec<&Entry> = self
            .entries
            .iter()
            .filter(|e| &e.scope == scope && e.level == level)
            .collect();
        list.sort_by_key(|e| e.sort_key());
        list
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Add or replace a scope. A named parent must already exist.
    pub fn register_scope(&mut self, scope: FocusScope) -> Result<()> {
        if let Some(parent) = &scope.parent {
            if !self.scopes.contains_key(parent) {
                let error = Error::UnknownScope(parent.clone());
                return Err(self.fail(error));
            }
        }
        tracing::debug!(scope = %scope.id, "focus scope registered");
        self.scopes.insert(scope.id.clone(), scope);
        Ok(())
    }

    /// Remove a scope, its descendant scopes, and their focusables.
    pub fn unregister_scope(&mut self, id: &ScopeId) -> Vec<FocusChange> {
        if !self.scopes.contains_key(id) {
            return Vec::new();
        }
        let doomed: Vec<ScopeId> = self
            .scopes
            .keys()
            .filter(|s| self.chain_of(s).contains(id))
            .cloned()
            .collect();

        let mut changes = self.drop_records(|scope, _| doomed.contains(scope));
        if self.active_chain().contains(id) {
            self.active = self.scopes.get(id).and_then(|s| s.parent.clone());
        }
        self.entries.retain(|e| !doomed.contains(&e.scope));
        for scope in &doomed {
            self.scopes.remove(scope);
        }
        changes.extend(self.settle());
        changes
    }

    /// Register a node as focusable. Re-registering replaces the old options.
    pub fn register_focusable(&mut self, node: NodeId, options: FocusableOptions) -> Result<Vec<FocusChange>> {
        if !self.scopes.contains_key(&options.scope) {
            let error = Error::UnknownScope(options.scope.clone());
            return Err(self.fail(error));
        }

        let mut changes = self.unregister_focusable(&node);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push(Entry {
            node,
            scope: options.scope,
            level: options.level,
            order: options.order,
            seq,
            maintain_parent_focus: options.maintain_parent_focus,
        });
        Ok(changes)
    }

    /// Remove a node. A record it held moves to the next sibling at the same
    /// scope and level, or is cleared when none remain. A scope left without
    /// focus this way is exited.
    pub fn unregister_focusable(&mut self, node: &NodeId) -> Vec<FocusChange> {
        let Some(position) = self.entries.iter().position(|e| &e.node == node) else {
            return Vec::new();
        };
        let entry = self.entries.remove(position);
        let key = (entry.scope.clone(), entry.level);
        if self.records.get(&key) != Some(node) {
            return Vec::new();
        }

        let mut changes = vec![FocusChange::Lost {
            node: node.clone(),
            scope: entry.scope.clone(),
            level: entry.level,
        }];
        self.records.remove(&key);

        let siblings = self.candidates(&entry.scope, entry.level);
        let next = siblings
            .iter()
            .find(|e| e.sort_key() > entry.sort_key())
            .or_else(|| siblings.first())
            .map(|e| e.node.clone());
        if let Some(next) = next {
            changes.push(FocusChange::Gained {
                node: next.clone(),
                scope: entry.scope.clone(),
                level: entry.level,
            });
            self.records.insert(key, next);
        } else {
            changes.extend(self.settle());
        }
        changes
    }

    /// Forget everything except the error handler.
    pub fn reset(&mut self) {
        self.scopes.clear();
        self.entries.clear();
        self.records.clear();
        self.active = None;
    }

    // =========================================================================
    // Scope Navigation
    // =========================================================================

    /// Make `id` the active scope and fill its empty records from CONTAINER
    /// down to the scope's level.
    ///
    /// Fails with `NoContainer` when the scope has no CONTAINER focusable;
    /// nothing changes then.
    pub fn enter_scope(&mut self, id: &ScopeId) -> Result<Vec<FocusChange>> {
        let Some(depth) = self.scopes.get(id).map(|s| s.level) else {
            let error = Error::UnknownScope(id.clone());
            return Err(self.fail(error));
        };
        if !self.has_container(id) {
            let error = Error::NoContainer(id.clone());
            return Err(self.fail(error));
        }
        let mut changes = self.activate(id);
        for level in FocusLevel::ALL.into_iter().filter(|level| *level <= depth) {
            changes.extend(self.fill_level(id, level));
        }
        Ok(changes)
    }

    /// Leave the active scope: its records are cleared and its parent
    /// becomes active.
    pub fn exit_scope(&mut self) -> Vec<FocusChange> {
        let Some(active) = self.active.clone() else {
            return Vec::new();
        };
        let mut changes = self.drop_records(|scope, _| *scope == active);
        self.active = self.scopes.get(&active).and_then(|s| s.parent.clone());
        tracing::debug!(from = %active, "focus scope exited");
        changes.extend(self.settle());
        changes
    }

    /// Walk the active scope outward until one holds focus.
    fn settle(&mut self) -> Vec<FocusChange> {
        let mut changes = Vec::new();
        while let Some(active) = self.active.clone() {
            if self.holds_focus(&active) {
                break;
            }
            changes.extend(self.drop_records(|scope, _| *scope == active));
            self.active = self.scopes.get(&active).and_then(|s| s.parent.clone());
            tracing::debug!(from = %active, "focus scope released");
        }
        changes
    }

    /// Move the active chain to `id` without assigning any record.
    fn activate(&mut self, id: &ScopeId) -> Vec<FocusChange> {
        let chain = self.chain_of(id);
        let changes = self.drop_records(|scope, _| !chain.contains(scope));
        self.active = Some(id.clone());
        tracing::debug!(scope = %id, "focus scope entered");
        changes
    }

    /// Give an empty record the first focusable at that level.
    fn fill_level(&mut self, scope: &ScopeId, level: FocusLevel) -> Vec<FocusChange> {
        if self.records.contains_key(&(scope.clone(), level)) {
            return Vec::new();
        }
        let first = self.candidates(scope, level).first().map(|e| e.node.clone());
        match first {
            Some(node) => self.set_record(scope, level, node),
            None => Vec::new(),
        }
    }

    fn drop_records<P>(&mut self, pred: P) -> Vec<FocusChange>
    where
        P: Fn(&ScopeId, FocusLevel) -> bool,
    {
        let mut doomed: Vec<(ScopeId, FocusLevel)> = self
            .records
            .keys()
            .filter(|(scope, level)| pred(scope, *level))
            .cloned()
            .collect();
        doomed.sort();

        doomed
            .into_iter()
            .filter_map(|key| {
                let node = self.records.remove(&key)?;
                Some(FocusChange::Lost {
                    node,
                    scope: key.0,
                    level: key.1,
                })
            })
            .collect()
    }

    // =========================================================================
    // Focus Movement
    // =========================================================================

    /// Cycle the deepest populated level of the active scope.
    pub fn navigate(&mut self, direction: Direction) -> Vec<FocusChange> {
        let Some(scope) = self.active.clone() else {
            return Vec::new();
        };
        let level = FocusLevel::ALL
            .into_iter()
            .rev()
            .find(|level| self.entries.iter().any(|e| e.scope == scope && e.level == *level));
        match level {
            Some(level) => self.navigate_level(level, direction),
            None => Vec::new(),
        }
    }

    /// Cycle one level of the active scope, wrapping at either end.
    /// Other levels keep their records.
    pub fn navigate_level(&mut self, level: FocusLevel, direction: Direction) -> Vec<FocusChange> {
        let Some(scope) = self.active.clone() else {
            return Vec::new();
        };
        let candidates = self.candidates(&scope, level);
        if candidates.is_empty() {
            return Vec::new();
        }

        let count = candidates.len();
        let current = self
            .records
            .get(&(scope.clone(), level))
            .and_then(|node| candidates.iter().position(|e| &e.node == node));
        let index = match (current, direction) {
            (Some(i), Direction::Next) => (i + 1) % count,
            (Some(i), Direction::Previous) => (i + count - 1) % count,
            (None, Direction::Next) => 0,
            (None, Direction::Previous) => count - 1,
        };
        let node = candidates[index].node.clone();
        self.set_record(&scope, level, node)
    }

    /// Focus a registered node. Its scope becomes the active scope, so
    /// records of deeper scopes are dropped.
    ///
    /// Activating a scope needs a CONTAINER record: either the node itself
    /// or the scope's first CONTAINER focusable. Without one this fails with
    /// `NoContainer` and nothing changes.
    pub fn focus_node(&mut self, node: &NodeId) -> Result<Vec<FocusChange>> {
        let Some(entry) = self.entries.iter().find(|e| &e.node == node).cloned() else {
            let error = Error::UnknownNode(node.clone());
            return Err(self.fail(error));
        };

        let mut changes = Vec::new();
        if self.active.as_ref() != Some(&entry.scope) {
            if entry.level != FocusLevel::Container && !self.has_container(&entry.scope) {
                let error = Error::NoContainer(entry.scope.clone());
                return Err(self.fail(error));
            }
            changes.extend(self.activate(&entry.scope));
            if entry.level != FocusLevel::Container {
                changes.extend(self.fill_level(&entry.scope, FocusLevel::Container));
            }
        }
        changes.extend(self.set_record(&entry.scope, entry.level, entry.node));
        Ok(changes)
    }

    fn set_record(&mut self, scope: &ScopeId, level: FocusLevel, node: NodeId) -> Vec<FocusChange> {
        let key = (scope.clone(), level);
        if self.records.get(&key) == Some(&node) {
            return Vec::new();
        }

        let mut changes = Vec::new();
        if let Some(old) = self.records.insert(key, node.clone()) {
            changes.push(FocusChange::Lost {
                node: old,
                scope: scope.clone(),
                level,
            });
        }
        changes.push(FocusChange::Gained {
            node: node.clone(),
            scope: scope.clone(),
            level,
        });

        let exclusive = self.scopes.get(scope).is_some_and(|s| !s.allow_simultaneous_focus);
        let keeps_parents = self
            .entries
            .iter()
            .any(|e| e.node == node && e.maintain_parent_focus);
        if exclusive && !keeps_parents {
            changes.extend(self.drop_records(|s, l| s == scope && l < level));
        }
        changes
    }

    // =========================================================================
    // Keys
    // =========================================================================

    /// Offer a key to the navigation bindings of the active chain,
    /// innermost scope first, then the defaults.
    pub fn handle_key(&mut self, key: &KeyEvent) -> KeyRouting {
        if self.active.is_none() {
            return KeyRouting::default();
        }
        let chord = key.chord();
        let action = self
            .active_chain()
            .iter()
            .find_map(|scope| self.scopes.get(scope)?.navigation_keys.get(&chord).copied())
            .or_else(|| default_action(&chord));

        let Some(action) = action else {
            return KeyRouting::default();
        };
        tracing::trace!(%chord, ?action, "navigation key");
        let changes = match action {
            NavAction::Next => self.navigate(Direction::Next),
            NavAction::Previous => self.navigate(Direction::Previous),
            NavAction::Exit => self.exit_scope(),
        };
        KeyRouting { handled: true, changes }
    }
}

fn default_action(chord: &str) -> Option<NavAction> {
    match chord {
        "tab" => Some(NavAction::Next),
        "shift+tab" | "backtab" | "shift+backtab" => Some(NavAction::Previous),
        _ => None,
    }
}

impl fmt::Debug for FocusCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FocusCoordinator")
            .field("scopes", &self.scopes.len())
            .field("focusables", &self.entries.len())
            .field("records", &self.records)
            .field("active", &self.active)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
