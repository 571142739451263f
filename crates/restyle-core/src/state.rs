use anyhow::{anyhow, Result};

/// Lifecycle state of an overlay record.
///
/// The integer codes are part of the persisted document schema and must stay
/// stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayState {
    NotEvaluated,
    NotApprovedComponentDisabled,
    NotApprovedMissingTarget,
    NotApprovedNoMapping,
    NotApprovedDangerous,
    ApprovedDisabled,
    ApprovedEnabled,
}

impl OverlayState {
    pub fn code(self) -> i32 {
        match self {
            Self::NotEvaluated => 0,
            Self::NotApprovedComponentDisabled => 1,
            Self::NotApprovedMissingTarget => 2,
            Self::NotApprovedNoMapping => 3,
            Self::NotApprovedDangerous => 4,
            Self::ApprovedDisabled => 5,
            Self::ApprovedEnabled => 6,
        }
    }

    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            0 => Ok(Self::NotEvaluated),
            1 => Ok(Self::NotApprovedComponentDisabled),
            2 => Ok(Self::NotApprovedMissingTarget),
            3 => Ok(Self::NotApprovedNoMapping),
            4 => Ok(Self::NotApprovedDangerous),
            5 => Ok(Self::ApprovedDisabled),
            6 => Ok(Self::ApprovedEnabled),
            _ => Err(anyhow!("invalid overlay state code: {code}")),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotEvaluated => "not-evaluated",
            Self::NotApprovedComponentDisabled => "not-approved-component-disabled",
            Self::NotApprovedMissingTarget => "not-approved-missing-target",
            Self::NotApprovedNoMapping => "not-approved-no-mapping",
            Self::NotApprovedDangerous => "not-approved-dangerous",
            Self::ApprovedDisabled => "approved-disabled",
            Self::ApprovedEnabled => "approved-enabled",
        }
    }

    pub fn is_approved(self) -> bool {
        matches!(self, Self::ApprovedDisabled | Self::ApprovedEnabled)
    }
}
