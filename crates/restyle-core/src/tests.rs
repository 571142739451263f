use crate::{OverlayKey, OverlayRecord, OverlayState};

#[test]
fn state_codes_round_trip() {
    let states = [
        OverlayState::NotEvaluated,
        OverlayState::NotApprovedComponentDisabled,
        OverlayState::NotApprovedMissingTarget,
        OverlayState::NotApprovedNoMapping,
        OverlayState::NotApprovedDangerous,
        OverlayState::ApprovedDisabled,
        OverlayState::ApprovedEnabled,
    ];

    for state in states {
        let decoded = OverlayState::from_code(state.code()).expect("must decode");
        assert_eq!(decoded, state);
    }
}

#[test]
fn state_codes_are_stable() {
    assert_eq!(OverlayState::NotEvaluated.code(), 0);
    assert_eq!(OverlayState::NotApprovedComponentDisabled.code(), 1);
    assert_eq!(OverlayState::NotApprovedMissingTarget.code(), 2);
    assert_eq!(OverlayState::NotApprovedNoMapping.code(), 3);
    assert_eq!(OverlayState::NotApprovedDangerous.code(), 4);
    assert_eq!(OverlayState::ApprovedDisabled.code(), 5);
    assert_eq!(OverlayState::ApprovedEnabled.code(), 6);
}

#[test]
fn from_code_rejects_unknown_codes() {
    let err = OverlayState::from_code(7).expect_err("must reject unknown code");
    assert!(err.to_string().contains("invalid overlay state code"));

    let err = OverlayState::from_code(-1).expect_err("must reject negative code");
    assert!(err.to_string().contains("invalid overlay state code"));
}

#[test]
fn only_approved_states_report_approved() {
    assert!(OverlayState::ApprovedDisabled.is_approved());
    assert!(OverlayState::ApprovedEnabled.is_approved());
    assert!(!OverlayState::NotEvaluated.is_approved());
    assert!(!OverlayState::NotApprovedComponentDisabled.is_approved());
    assert!(!OverlayState::NotApprovedMissingTarget.is_approved());
    assert!(!OverlayState::NotApprovedNoMapping.is_approved());
    assert!(!OverlayState::NotApprovedDangerous.is_approved());
}

#[test]
fn record_key_matches_identity_fields() {
    let record = OverlayRecord {
        package_name: "com.example.overlay".to_string(),
        user_id: 10,
        target_package_name: "com.example.target".to_string(),
        base_code_path: "/data/app/com.example.overlay/base.apk".to_string(),
        state: OverlayState::NotEvaluated,
        is_enabled: false,
        is_upgrading: false,
    };

    assert_eq!(record.key(), OverlayKey::new("com.example.overlay", 10));
    assert_ne!(record.key(), OverlayKey::new("com.example.overlay", 0));
    assert_ne!(record.key(), OverlayKey::new("com.example.other", 10));
}
