//! Focus scopes and levels through the engine.

use std::cell::RefCell;
use std::rc::Rc;

use spark_compositor::{
    Direction, Engine, EngineConfig, Error, FocusLevel, FocusScope, FocusableOptions, KeyEvent, NavAction, NodeEvent,
    NodeId, NodeSpec, PointerEvent, ScopeId, TextBlock,
};

type Log = Rc<RefCell<Vec<(String, NodeEvent)>>>;

struct Fixture {
    engine: Engine<Vec<u8>>,
    log: Log,
}

impl Fixture {
    fn new() -> Self {
        let config = EngineConfig::default().with_synchronized_output(false);
        Self {
            engine: Engine::new(Vec::new(), 40, 10, config),
            log: Rc::default(),
        }
    }

    fn scope(&mut self, scope: FocusScope) {
        self.engine.register_scope(scope).unwrap();
    }

    /// Add a one-row text node at `row` and register it.
    fn node(&mut self, id: &str, row: i32, options: FocusableOptions) -> NodeId {
        let node = self
            .engine
            .add_node(&NodeId::root(), NodeSpec::new(id, TextBlock::new(id)).at(0, row, 10, 1))
            .unwrap();
        let log = Rc::clone(&self.log);
        let name = id.to_string();
        self.engine
            .tree_mut()
            .on(&node, move |event| log.borrow_mut().push((name.clone(), event.clone())));
        self.engine.register_focusable(&node, options).unwrap();
        node
    }

    fn focused(&self) -> Vec<(FocusLevel, String)> {
        self.engine
            .focus()
            .all_focused()
            .into_iter()
            .map(|(level, node)| (level, node.as_str().to_string()))
            .collect()
    }

    fn take_log(&self) -> Vec<(String, NodeEvent)> {
        std::mem::take(&mut *self.log.borrow_mut())
    }
}

fn opts(scope: &str, level: FocusLevel) -> FocusableOptions {
    FocusableOptions::new(scope, level)
}

#[test]
fn test_levels_hold_focus_independently() {
    let mut f = Fixture::new();
    f.scope(FocusScope::new("app", FocusLevel::Container));
    f.node("sidebar", 0, opts("app", FocusLevel::Container));
    f.node("editor", 1, opts("app", FocusLevel::Container).with_order(1));
    f.node("tools", 2, opts("app", FocusLevel::Group));
    let input = f.node("input", 3, opts("app", FocusLevel::Component));

    f.engine.enter_scope(&ScopeId::from("app")).unwrap();
    assert_eq!(f.focused(), vec![(FocusLevel::Container, "sidebar".to_string())]);

    f.engine.focus_node(&input).unwrap();
    f.engine.focus_node(&NodeId::from("tools")).unwrap();
    assert_eq!(
        f.focused(),
        vec![
            (FocusLevel::Container, "sidebar".to_string()),
            (FocusLevel::Group, "tools".to_string()),
            (FocusLevel::Component, "input".to_string()),
        ]
    );
    assert!(f.engine.tree().is_dirty());
}

#[test]
fn test_exclusive_scope_keeps_one_level() {
    let mut f = Fixture::new();
    f.scope(FocusScope::new("menu", FocusLevel::Container).with_simultaneous_focus(false));
    f.node("bar", 0, opts("menu", FocusLevel::Container));
    let item = f.node("item", 1, opts("menu", FocusLevel::Component));
    let pinned = f.node("pinned", 2, opts("menu", FocusLevel::Component).maintain_parent_focus());

    f.engine.enter_scope(&ScopeId::from("menu")).unwrap();
    f.engine.focus_node(&item).unwrap();
    assert_eq!(f.focused(), vec![(FocusLevel::Component, "item".to_string())]);

    f.engine.enter_scope(&ScopeId::from("menu")).unwrap();
    f.engine.focus_node(&pinned).unwrap();
    assert_eq!(
        f.focused(),
        vec![
            (FocusLevel::Container, "bar".to_string()),
            (FocusLevel::Component, "pinned".to_string()),
        ]
    );
}

#[test]
fn test_tab_cycles_and_emits_events() {
    let mut f = Fixture::new();
    f.scope(FocusScope::new("form", FocusLevel::Container));
    f.node("frame", 5, opts("form", FocusLevel::Container));
    f.node("name", 0, opts("form", FocusLevel::Component));
    f.node("email", 1, opts("form", FocusLevel::Component).with_order(1));
    f.engine.enter_scope(&ScopeId::from("form")).unwrap();
    assert_eq!(
        f.take_log(),
        vec![("frame".to_string(), NodeEvent::Focused(FocusLevel::Container))]
    );

    assert!(f.engine.handle_key(&KeyEvent::new("tab")));
    assert!(f.engine.handle_key(&KeyEvent::new("tab")));
    assert!(f.engine.handle_key(&KeyEvent::new("tab")));
    assert_eq!(
        f.take_log(),
        vec![
            ("name".to_string(), NodeEvent::Focused(FocusLevel::Component)),
            ("name".to_string(), NodeEvent::Blurred(FocusLevel::Component)),
            ("email".to_string(), NodeEvent::Focused(FocusLevel::Component)),
            ("email".to_string(), NodeEvent::Blurred(FocusLevel::Component)),
            ("name".to_string(), NodeEvent::Focused(FocusLevel::Component)),
        ]
    );

    assert!(f.engine.handle_key(&KeyEvent::new("tab").with_shift()));
    assert_eq!(
        f.focused(),
        vec![
            (FocusLevel::Container, "frame".to_string()),
            (FocusLevel::Component, "email".to_string()),
        ]
    );
}

#[test]
fn test_nested_scope_exit_binding() {
    let mut f = Fixture::new();
    f.scope(FocusScope::new("app", FocusLevel::Container));
    f.scope(
        FocusScope::new("dialog", FocusLevel::Container)
            .with_parent("app")
            .with_key("escape", NavAction::Exit),
    );
    f.node("main", 0, opts("app", FocusLevel::Container));
    f.node("box", 4, opts("dialog", FocusLevel::Container));
    f.node("ok", 1, opts("dialog", FocusLevel::Component));
    f.node("cancel", 2, opts("dialog", FocusLevel::Component).with_order(1));

    f.engine.enter_scope(&ScopeId::from("app")).unwrap();
    f.engine.enter_scope(&ScopeId::from("dialog")).unwrap();
    assert!(f.engine.focus().is_focused(ScopeId::from("app")));
    assert!(f.engine.focus().is_focused(ScopeId::from("dialog")));

    f.engine.navigate(Direction::Previous);
    assert!(f.engine.focus().is_focused(NodeId::from("cancel")));
    // The parent's container record survives entering the child.
    assert!(f.engine.focus().is_focused(NodeId::from("main")));

    assert!(f.engine.handle_key(&KeyEvent::new("escape")));
    assert_eq!(f.engine.focus().active_scope(), Some(&ScopeId::from("app")));
    assert!(!f.engine.focus().is_focused(NodeId::from("cancel")));
    assert!(!f.engine.focus().is_focused(NodeId::from("box")));
    assert!(!f.engine.focus().is_focused(ScopeId::from("dialog")));
    assert_eq!(f.focused(), vec![(FocusLevel::Container, "main".to_string())]);

    // Outside the dialog the binding no longer applies.
    assert!(!f.engine.handle_key(&KeyEvent::new("escape")));
}

#[test]
fn test_entering_sibling_scope_drops_records() {
    let mut f = Fixture::new();
    f.scope(FocusScope::new("left", FocusLevel::Container));
    f.scope(FocusScope::new("right", FocusLevel::Container));
    f.node("left-pane", 2, opts("left", FocusLevel::Container));
    f.node("right-pane", 3, opts("right", FocusLevel::Container));
    let a = f.node("a", 0, opts("left", FocusLevel::Component));
    let b = f.node("b", 1, opts("right", FocusLevel::Component));

    f.engine.focus_node(&a).unwrap();
    assert_eq!(f.engine.focus().active_scope(), Some(&ScopeId::from("left")));
    f.take_log();

    f.engine.focus_node(&b).unwrap();
    assert_eq!(f.engine.focus().active_scope(), Some(&ScopeId::from("right")));
    assert_eq!(
        f.take_log(),
        vec![
            ("left-pane".to_string(), NodeEvent::Blurred(FocusLevel::Container)),
            ("a".to_string(), NodeEvent::Blurred(FocusLevel::Component)),
            ("right-pane".to_string(), NodeEvent::Focused(FocusLevel::Container)),
            ("b".to_string(), NodeEvent::Focused(FocusLevel::Component)),
        ]
    );
}

#[test]
fn test_destroying_focused_node_hands_focus_on() {
    let mut f = Fixture::new();
    f.scope(FocusScope::new("list", FocusLevel::Container));
    f.node("frame", 5, opts("list", FocusLevel::Container));
    let first = f.node("first", 0, opts("list", FocusLevel::Component));
    f.node("second", 1, opts("list", FocusLevel::Component).with_order(1));
    f.engine.focus_node(&first).unwrap();
    f.take_log();

    f.engine.destroy(&first);
    assert!(f.engine.focus().is_focused(NodeId::from("second")));
    assert!(!f.engine.focus().is_registered(&first));
    assert_eq!(
        f.take_log(),
        vec![("second".to_string(), NodeEvent::Focused(FocusLevel::Component))]
    );
}

#[test]
fn test_click_moves_focus() {
    let mut f = Fixture::new();
    f.scope(FocusScope::new("form", FocusLevel::Container));
    f.node("frame", 5, opts("form", FocusLevel::Container));
    f.node("name", 0, opts("form", FocusLevel::Component));
    f.node("email", 1, opts("form", FocusLevel::Component));

    f.engine.handle_pointer(&PointerEvent::down(3, 1));
    assert_eq!(
        f.focused(),
        vec![
            (FocusLevel::Container, "frame".to_string()),
            (FocusLevel::Component, "email".to_string()),
        ]
    );
    f.engine.handle_pointer(&PointerEvent::down(3, 0));
    assert_eq!(
        f.focused(),
        vec![
            (FocusLevel::Container, "frame".to_string()),
            (FocusLevel::Component, "name".to_string()),
        ]
    );
}

#[test]
fn test_scope_needs_a_container_to_activate() {
    let mut f = Fixture::new();
    f.scope(FocusScope::new("main", FocusLevel::Container));
    let field = f.node("field", 0, opts("main", FocusLevel::Component));

    let err = f.engine.enter_scope(&ScopeId::from("main"));
    assert!(matches!(err, Err(Error::NoContainer(ref s)) if s.as_str() == "main"));
    assert!(!f.engine.focus().is_focused(ScopeId::from("main")));
    assert!(f.focused().is_empty());

    // A click on the field cannot activate the scope either.
    f.engine.handle_pointer(&PointerEvent::down(1, 0));
    assert!(!f.engine.focus().is_focused(field));
    assert!(!f.take_log().iter().any(|(_, event)| matches!(event, NodeEvent::Focused(_))));
}

#[test]
fn test_registration_errors() {
    let mut f = Fixture::new();
    let node = f
        .engine
        .add_node(&NodeId::root(), NodeSpec::new("loose", TextBlock::new("x")).at(0, 0, 1, 1))
        .unwrap();

    let err = f.engine.register_focusable(&node, opts("nowhere", FocusLevel::Component));
    assert!(matches!(err, Err(Error::UnknownScope(ref s)) if s.as_str() == "nowhere"));

    f.scope(FocusScope::new("app", FocusLevel::Container));
    let err = f
        .engine
        .register_focusable(&NodeId::from("ghost"), opts("app", FocusLevel::Component));
    assert!(matches!(err, Err(Error::UnknownNode(_))));

    let err = f.engine.register_scope(FocusScope::new("child", FocusLevel::Group).with_parent("missing"));
    assert!(matches!(err, Err(Error::UnknownScope(_))));
    assert!(f.engine.enter_scope(&ScopeId::from("missing")).is_err());
}
