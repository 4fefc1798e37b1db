use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        CanvasError::structural("x")
            .to_string()
            .contains("structural error:")
    );
    assert!(
        CanvasError::invariant("x")
            .to_string()
            .contains("invariant violation:")
    );
    assert!(CanvasError::timeout("x").to_string().contains("timeout:"));
    assert!(
        CanvasError::invalid_argument("x")
            .to_string()
            .contains("invalid argument:")
    );
    assert!(
        CanvasError::invalid_save_string("x")
            .to_string()
            .contains("invalid save string:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = CanvasError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn only_timeouts_are_transient() {
    assert!(CanvasError::timeout("not sized").is_transient());
    assert!(!CanvasError::structural("bad mapping").is_transient());
    assert!(!CanvasError::invalid_argument("dwell").is_transient());
}
