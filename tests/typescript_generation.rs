//! TypeScript Generation Tests
//!
//! Validates that the types a frontend observes can be exported to
//! TypeScript when the tauri feature is enabled.

#[cfg(feature = "tauri")]
#[test]
fn test_observable_types_implement_specta_type() {
    use specta::Type;

    // If this compiles, every observable type is configured for export.
    fn assert_type<T: Type>() {}

    assert_type::<camlink::DeviceId>();
    assert_type::<camlink::DeviceModel>();
    assert_type::<camlink::DeviceInfo>();
    assert_type::<camlink::StreamConfig>();
    assert_type::<camlink::Resolution>();
    assert_type::<camlink::Stabilization>();
    assert_type::<camlink::ConnectionState>();
    assert_type::<camlink::SessionSnapshot>();
    assert_type::<camlink::SessionUpdate>();
}

#[cfg(not(feature = "tauri"))]
#[test]
fn test_tauri_feature_disabled() {
    // Types still compile without specta::Type.
    let _ = camlink::ConnectionState::default();
}
