use super::*;
use crate::scene::geometry::{GeometryArray, GeometryKind};

fn leaf() -> Subtree {
    let g = GeometryArray::builder(GeometryKind::Point, vec![0.0, 0.0, 0.0])
        .build()
        .unwrap();
    Subtree::leaf(Appearance::new(g))
}

#[test]
fn new_graph_has_fixed_roots() {
    let mut g = SceneGraph::new();
    assert_eq!(g.len(), 3);
    assert_eq!(
        g.children(g.root()).unwrap(),
        &[g.non_direct_root(), g.direct_root()]
    );
    let direct = g.direct_root();
    assert!(g.release(direct).is_err());
}

#[test]
fn insert_and_attach() {
    let mut g = SceneGraph::new();
    let id = g.insert(Subtree::group(vec![leaf(), leaf()])).unwrap();
    assert_eq!(g.len(), 6);
    assert_eq!(g.parent(id).unwrap(), None);
    g.add_child(g.non_direct_root(), id).unwrap();
    assert_eq!(g.parent(id).unwrap(), Some(g.non_direct_root()));

    // a node cannot have two parents
    assert!(g.add_child(g.direct_root(), id).is_err());
}

#[test]
fn removing_a_child_releases_its_subtree() {
    let mut g = SceneGraph::new();
    let id = g.insert(Subtree::group(vec![leaf(), leaf()])).unwrap();
    let kids = g.children(id).unwrap().to_vec();
    g.add_child(g.non_direct_root(), id).unwrap();

    g.remove_child_at(g.non_direct_root(), 0).unwrap();
    assert_eq!(g.len(), 3);
    assert!(!g.contains(id));
    for k in kids {
        assert!(matches!(g.node(k), Err(CanvasError::InvariantViolation(_))));
    }
    assert!(g.remove_child_at(g.non_direct_root(), 0).is_err());
}

#[test]
fn stale_handles_do_not_alias_reused_slots() {
    let mut g = SceneGraph::new();
    let a = g.insert(leaf()).unwrap();
    g.release(a).unwrap();
    let b = g.insert(leaf()).unwrap();
    assert_ne!(a, b);
    assert!(g.node(a).is_err());
    assert!(g.node(b).is_ok());
}

#[test]
fn replace_child_frees_old_child() {
    let mut g = SceneGraph::new();
    let sw = g
        .insert(Subtree::switch(
            vec![Subtree::empty_group(), Subtree::empty_group()],
            Some(0),
        ))
        .unwrap();
    let old = g.children(sw).unwrap()[0];
    let new = g.insert(Subtree::group(vec![leaf()])).unwrap();
    g.replace_child_at(sw, 0, new).unwrap();
    assert!(!g.contains(old));
    assert_eq!(g.children(sw).unwrap()[0], new);
    let Node::Switch(s) = g.node(sw).unwrap() else {
        panic!("expected switch");
    };
    assert_eq!(s.selected_child(), Some(new));
}

#[test]
fn cycles_are_rejected() {
    let mut g = SceneGraph::new();
    let top = g.insert(Subtree::group(vec![Subtree::empty_group()])).unwrap();
    let inner = g.children(top).unwrap()[0];
    assert!(g.add_child(inner, top).is_err());
    assert!(g.add_child(top, top).is_err());
}

#[test]
fn removing_selected_child_clears_selection() {
    let mut g = SceneGraph::new();
    let sw = g
        .insert(Subtree::switch(
            vec![Subtree::empty_group(), Subtree::empty_group(), leaf()],
            Some(2),
        ))
        .unwrap();
    g.remove_child_at(sw, 0).unwrap();
    assert_eq!(
        match g.node(sw).unwrap() {
            Node::Switch(s) => s.selected(),
            _ => unreachable!(),
        },
        Some(1)
    );
    g.remove_child_at(sw, 1).unwrap();
    assert_eq!(
        match g.node(sw).unwrap() {
            Node::Switch(s) => s.selected(),
            _ => unreachable!(),
        },
        None
    );
}

#[test]
#[should_panic(expected = "out of range")]
fn selecting_past_the_end_panics() {
    let mut g = SceneGraph::new();
    let sw = g
        .insert(Subtree::switch(vec![Subtree::empty_group()], None))
        .unwrap();
    let _ = g.set_selected(sw, Some(1));
}

#[test]
fn set_selected_on_a_group_is_an_invariant_violation() {
    let mut g = SceneGraph::new();
    let root = g.root();
    assert!(matches!(
        g.set_selected(root, None),
        Err(CanvasError::InvariantViolation(_))
    ));
}

#[test]
fn animation_switches_follow_step_or_samples() {
    let mut g = SceneGraph::new();
    let by_index = g
        .insert(Subtree::animation_switch(
            vec![leaf(), leaf(), leaf()],
            None,
        ))
        .unwrap();
    let by_value = g
        .insert(Subtree::animation_switch(
            vec![leaf(), leaf()],
            Some(vec![0.0, 10.0]),
        ))
        .unwrap();
    assert_eq!(g.animation_switches(), &[by_index, by_value]);

    g.select_animation_step(1, Some(7.0));
    let sel = |g: &SceneGraph, id| match g.node(id).unwrap() {
        Node::Switch(s) => s.selected(),
        _ => unreachable!(),
    };
    assert_eq!(sel(&g, by_index), Some(1));
    assert_eq!(sel(&g, by_value), Some(1));

    g.select_animation_step(5, Some(5.0));
    assert_eq!(sel(&g, by_index), None);
    assert_eq!(sel(&g, by_value), Some(0));

    g.release(by_index).unwrap();
    assert_eq!(g.animation_switches(), &[by_value]);
}

#[test]
fn nearest_index_prefers_earlier_sample_on_ties() {
    assert_eq!(nearest_index(&[0.0, 2.0, 4.0], 1.0), Some(0));
    assert_eq!(nearest_index(&[0.0, 2.0, 4.0], 3.5), Some(2));
    assert_eq!(nearest_index(&[], 3.5), None);
}
