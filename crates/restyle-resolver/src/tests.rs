use restyle_core::OverlayState;

use crate::{resolve, Approval, ResolutionFacts};

fn facts(
    component_enabled: bool,
    target_installed: bool,
    mapping_valid: bool,
    trusted: bool,
    dangerous: bool,
) -> ResolutionFacts {
    ResolutionFacts {
        component_enabled,
        target_installed,
        mapping_valid,
        trusted,
        dangerous,
    }
}

#[test]
fn full_decision_table() {
    use Approval::*;

    // component enabled | target installed | mapping valid | trusted | dangerous
    let table = [
        ((false, false, false, false, false), ComponentDisabled),
        ((false, false, false, false, true), ComponentDisabled),
        ((false, false, false, true, false), ComponentDisabled),
        ((false, false, false, true, true), ComponentDisabled),
        ((false, false, true, false, false), ComponentDisabled),
        ((false, false, true, false, true), ComponentDisabled),
        ((false, false, true, true, false), ComponentDisabled),
        ((false, false, true, true, true), ComponentDisabled),
        ((false, true, false, false, false), ComponentDisabled),
        ((false, true, false, false, true), ComponentDisabled),
        ((false, true, false, true, false), ComponentDisabled),
        ((false, true, false, true, true), ComponentDisabled),
        ((false, true, true, false, false), ComponentDisabled),
        ((false, true, true, false, true), ComponentDisabled),
        ((false, true, true, true, false), ComponentDisabled),
        ((false, true, true, true, true), ComponentDisabled),
        ((true, false, false, false, false), MissingTarget),
        ((true, false, false, false, true), MissingTarget),
        ((true, false, false, true, false), MissingTarget),
        ((true, false, false, true, true), MissingTarget),
        ((true, false, true, false, false), MissingTarget),
        ((true, false, true, false, true), MissingTarget),
        ((true, false, true, true, false), MissingTarget),
        ((true, false, true, true, true), MissingTarget),
        ((true, true, false, false, false), NoMapping),
        ((true, true, false, false, true), NoMapping),
        ((true, true, false, true, false), NoMapping),
        ((true, true, false, true, true), NoMapping),
        ((true, true, true, false, false), Approved),
        ((true, true, true, false, true), Dangerous),
        ((true, true, true, true, false), Approved),
        ((true, true, true, true, true), Approved),
    ];
    assert_eq!(table.len(), 32);

    for ((component, target, mapping, trusted, dangerous), expected) in table {
        let resolved = resolve(facts(component, target, mapping, trusted, dangerous));
        assert_eq!(
            resolved, expected,
            "component={component} target={target} mapping={mapping} \
             trusted={trusted} dangerous={dangerous}"
        );
    }
}

#[test]
fn trust_bypasses_dangerous_rejection() {
    assert_eq!(resolve(facts(true, true, true, false, true)), Approval::Dangerous);
    assert_eq!(resolve(facts(true, true, true, true, true)), Approval::Approved);
}

#[test]
fn intent_only_surfaces_once_approved() {
    assert_eq!(
        Approval::Approved.into_state(true),
        OverlayState::ApprovedEnabled
    );
    assert_eq!(
        Approval::Approved.into_state(false),
        OverlayState::ApprovedDisabled
    );
    assert_eq!(
        Approval::MissingTarget.into_state(true),
        OverlayState::NotApprovedMissingTarget
    );
    assert_eq!(
        Approval::Dangerous.into_state(true),
        OverlayState::NotApprovedDangerous
    );
    assert_eq!(
        Approval::ComponentDisabled.into_state(true),
        OverlayState::NotApprovedComponentDisabled
    );
    assert_eq!(
        Approval::NoMapping.into_state(true),
        OverlayState::NotApprovedNoMapping
    );
}
