use anyhow::{Context, Result};
use restyle_core::{OverlayRecord, OverlayState};
use serde::{Deserialize, Serialize};

pub(crate) const DOCUMENT_VERSION: u32 = 1;

/// Persisted form of the store. Items are written grouped per (target, user)
/// in priority order so restoring in document order reproduces every
/// sequence. Attribute names are part of the schema and stay camelCase.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct OverlayDocument {
    pub version: u32,
    #[serde(default)]
    pub items: Vec<OverlayItem>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OverlayItem {
    pub package_name: String,
    pub user_id: i32,
    pub target_package_name: String,
    pub base_code_path: String,
    pub state: i32,
    #[serde(default)]
    pub is_enabled: bool,
    #[serde(default)]
    pub is_upgrading: bool,
}

impl OverlayItem {
    pub(crate) fn from_record(record: &OverlayRecord) -> Self {
        Self {
            package_name: record.package_name.clone(),
            user_id: record.user_id,
            target_package_name: record.target_package_name.clone(),
            base_code_path: record.base_code_path.clone(),
            state: record.state.code(),
            is_enabled: record.is_enabled,
            is_upgrading: record.is_upgrading,
        }
    }

    pub(crate) fn into_record(self) -> Result<OverlayRecord> {
        let state = OverlayState::from_code(self.state).with_context(|| {
            format!(
                "invalid state for overlay '{}' user {}",
                self.package_name, self.user_id
            )
        })?;
        Ok(OverlayRecord {
            package_name: self.package_name,
            user_id: self.user_id,
            target_package_name: self.target_package_name,
            base_code_path: self.base_code_path,
            state,
            is_enabled: self.is_enabled,
            is_upgrading: self.is_upgrading,
        })
    }
}
