use super::*;

#[test]
fn parses_nested_json() {
    let t = Subtree::from_json_str(
        r#"{
            "type": "group",
            "children": [
                { "type": "appearance",
                  "color": { "r": 255, "g": 0, "b": 0 },
                  "geometry": { "kind": "point", "coordinates": [0, 0, 0] } },
                { "type": "switch", "selected": 0, "children": [ { "type": "group" } ] }
            ]
        }"#,
    )
    .unwrap();
    assert_eq!(t.node_count(), 4);
    assert!(t.is_group());
}

#[test]
fn out_of_range_selection_is_rejected() {
    let t = Subtree::switch(vec![Subtree::empty_group()], Some(1));
    assert!(matches!(
        t.validate(),
        Err(CanvasError::InvariantViolation(_))
    ));
}

#[test]
fn animation_samples_must_cover_children() {
    let t = Subtree::animation_switch(
        vec![Subtree::empty_group(), Subtree::empty_group()],
        Some(vec![0.0]),
    );
    assert!(t.validate().is_err());

    let ok = Subtree::animation_switch(
        vec![Subtree::empty_group(), Subtree::empty_group()],
        Some(vec![0.0, 1.0]),
    );
    assert!(ok.validate().is_ok());
}

#[test]
fn unknown_node_type_fails_to_parse() {
    let err = Subtree::from_json_str(r#"{ "type": "cone" }"#).unwrap_err();
    assert!(matches!(err, CanvasError::InvalidArgument(_)));
}
