use anyhow::Result;
use restyle_core::OverlayRecord;

/// Package metadata the coordinator needs from the package manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageMeta {
    pub package_name: String,
    /// Present when the package is an overlay.
    pub target_package_name: Option<String>,
    pub base_code_path: String,
    pub component_enabled: bool,
    pub platform_signed: bool,
}

/// Read-only view of the package manager. Calls are synchronous in-memory
/// queries; an `Err` aborts the current lifecycle operation and propagates to
/// the caller.
pub trait PackageHelper {
    fn package_info(&self, package_name: &str, user_id: i32) -> Result<Option<PackageMeta>>;

    fn signatures_matching(
        &self,
        package_a: &str,
        package_b: &str,
        user_id: i32,
    ) -> Result<bool>;

    fn overlay_packages(&self, user_id: i32) -> Result<Vec<PackageMeta>>;
}

/// Generator of the binary resource mappings that connect an overlay to its
/// target. The mapping artifact itself is opaque to this crate.
pub trait MappingManager {
    fn create_mapping(
        &self,
        target: &PackageMeta,
        overlay: &PackageMeta,
        user_id: i32,
    ) -> Result<bool>;

    fn remove_mapping(&self, overlay: &OverlayRecord, user_id: i32) -> Result<bool>;

    fn mapping_exists(&self, overlay: &PackageMeta, user_id: i32) -> Result<bool>;

    fn is_dangerous(&self, overlay: &PackageMeta, user_id: i32) -> Result<bool>;
}
