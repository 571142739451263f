use crate::OverlayState;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OverlayKey {
    pub package_name: String,
    pub user_id: i32,
}

impl OverlayKey {
    pub fn new(package_name: impl Into<String>, user_id: i32) -> Self {
        Self {
            package_name: package_name.into(),
            user_id,
        }
    }
}

/// Tracked state of one overlay package for one user.
///
/// `is_enabled` is user intent and is independent of the approval encoded in
/// `state`; `is_upgrading` hides the record from user-facing queries while the
/// package is mid-replacement, without giving up its priority slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayRecord {
    pub package_name: String,
    pub user_id: i32,
    pub target_package_name: String,
    pub base_code_path: String,
    pub state: OverlayState,
    pub is_enabled: bool,
    pub is_upgrading: bool,
}

impl OverlayRecord {
    pub fn key(&self) -> OverlayKey {
        OverlayKey {
            package_name: self.package_name.clone(),
            user_id: self.user_id,
        }
    }
}
