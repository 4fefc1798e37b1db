use super::*;

#[test]
fn parses_full_string() {
    let s = SavedAnimation::parse("true false 2 3 100 200 300 true").unwrap();
    assert_eq!(
        s,
        SavedAnimation {
            on: true,
            forward: false,
            current: 2,
            dwell_ms: vec![100, 200, 300],
            compute_set: Some(true),
        }
    );
    assert_eq!(s.format(), "true false 2 3 100 200 300 true");
}

#[test]
fn compute_flag_is_optional() {
    let s = SavedAnimation::parse("false true 0 1 500").unwrap();
    assert_eq!(s.compute_set, None);
}

#[test]
fn malformed_strings_are_rejected() {
    for bad in [
        "",
        "true true 0",
        "true true 0 0",
        "true true 0 -2 5 5",
        "true true 0 3 100 200",
        "true true 0 2 100 0",
        "true true 0 2 100 -5",
        "yes true 0 1 100",
        "true true x 1 100",
        "true true 0 1 100 maybe",
    ] {
        let err = SavedAnimation::parse(bad).unwrap_err();
        assert!(
            matches!(err, CanvasError::InvalidSaveString(_)),
            "{bad:?} gave {err}"
        );
    }
}
