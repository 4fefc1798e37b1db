use super::*;

#[test]
fn minimal_document_uses_defaults() {
    let doc = SceneDocument::from_json_str(r#"{ "content": { "type": "group" } }"#).unwrap();
    assert_eq!(doc.config, CanvasConfig::default());
    assert_eq!(doc.step_count(), 1);
    assert_eq!(doc.camera(), Affine::IDENTITY);
    assert_eq!(doc.clip(), None);
}

#[test]
fn config_errors_surface() {
    let err = SceneDocument::from_json_str(
        r#"{ "config": { "width": 0 }, "content": { "type": "group" } }"#,
    )
    .unwrap_err();
    assert!(matches!(err, CanvasError::InvalidArgument(_)));
}

#[test]
fn samples_set_step_count() {
    let doc = SceneDocument::from_json_str(
        r#"{ "samples": [0, 1, 2], "clip": [-1, -1, 1, 1], "content": { "type": "group" } }"#,
    )
    .unwrap();
    assert_eq!(doc.step_count(), 3);
    assert_eq!(doc.clip(), Some(Rect::new(-1.0, -1.0, 1.0, 1.0)));
}
