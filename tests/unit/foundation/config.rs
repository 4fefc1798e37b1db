use super::*;

#[test]
fn empty_object_yields_defaults() {
    let cfg = CanvasConfig::from_json_str("{}").unwrap();
    assert_eq!(cfg, CanvasConfig::default());
    assert_eq!(cfg.step_policy, StepPolicy::Clamp);
    assert_eq!(cfg.child_order, ChildOrder::Reverse);
}

#[test]
fn policies_parse_from_snake_case() {
    let cfg = CanvasConfig::from_json_str(
        r#"{ "step_policy": "wrap", "child_order": "forward", "width": 64, "height": 32 }"#,
    )
    .unwrap();
    assert_eq!(cfg.step_policy, StepPolicy::Wrap);
    assert_eq!(cfg.child_order, ChildOrder::Forward);
    assert_eq!(cfg.viewport().unwrap(), Viewport::new(64, 32).unwrap());
}

#[test]
fn invalid_values_are_rejected() {
    assert!(CanvasConfig::from_json_str(r#"{ "default_dwell_ms": 0 }"#).is_err());
    assert!(CanvasConfig::from_json_str(r#"{ "width": 0 }"#).is_err());
    assert!(
        CanvasConfig::from_json_str(
            r#"{ "timeout_backoff_min_ms": 500, "timeout_backoff_max_ms": 100 }"#
        )
        .is_err()
    );
    assert!(CanvasConfig::from_json_str(r#"{ "no_such_field": 1 }"#).is_err());
}

#[test]
fn background_is_opaque() {
    let cfg = CanvasConfig {
        background_rgb: [10, 20, 30],
        ..CanvasConfig::default()
    };
    assert_eq!(cfg.background(), Rgba8::opaque(10, 20, 30));
}
