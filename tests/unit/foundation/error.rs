use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        VeirError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(VeirError::compile("x").to_string().contains("compile error:"));
    assert!(VeirError::stretch("x").to_string().contains("stretch error:"));
    assert!(
        VeirError::transport("x")
            .to_string()
            .contains("transport error:")
    );
    assert!(
        VeirError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn only_transport_errors_are_transport_level() {
    assert!(VeirError::transport("worker gone").is_transport());
    assert!(!VeirError::stretch("bad segment").is_transport());
    assert!(!VeirError::validation("x").is_transport());
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = VeirError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
