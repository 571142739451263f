use std::collections::{BTreeMap, BTreeSet, HashMap};

use anyhow::Result;
use restyle_core::{OverlayRecord, OverlayState};
use restyle_resolver::{resolve, ResolutionFacts};
use restyle_store::OverlayStore;
use tracing::debug;

mod providers;

pub use providers::{MappingManager, PackageHelper, PackageMeta};

/// Drives overlay record state through package-manager lifecycle events.
///
/// The coordinator owns the record store and consults the injected package
/// and mapping collaborators for fresh facts on every event. Operations on
/// unknown packages are no-ops; collaborator errors abort the single
/// operation and propagate. Callers serialize access (single writer, no
/// internal locking).
pub struct OverlayCoordinator<P, M> {
    packages: P,
    mappings: M,
    store: OverlayStore,
}

impl<P: PackageHelper, M: MappingManager> OverlayCoordinator<P, M> {
    pub fn new(packages: P, mappings: M, store: OverlayStore) -> Self {
        Self {
            packages,
            mappings,
            store,
        }
    }

    /// The underlying store, for persistence and derived queries. Mutations
    /// go through the coordinator.
    pub fn store(&self) -> &OverlayStore {
        &self.store
    }

    pub fn overlay_added(&mut self, package_name: &str, user_id: i32) -> Result<()> {
        let Some(overlay) = self.packages.package_info(package_name, user_id)? else {
            debug!(package = package_name, user = user_id, "added overlay is not installed");
            return Ok(());
        };
        let Some(target_package_name) = overlay.target_package_name.clone() else {
            debug!(package = package_name, user = user_id, "added package is not an overlay");
            return Ok(());
        };

        if let Some(target) = self.packages.package_info(&target_package_name, user_id)? {
            self.mappings.create_mapping(&target, &overlay, user_id)?;
        }
        if !self.store.contains(package_name, user_id) {
            self.store.init(
                package_name,
                user_id,
                &target_package_name,
                &overlay.base_code_path,
            );
        }
        self.update_state(&target_package_name, package_name, user_id)
    }

    pub fn overlay_removed(&mut self, package_name: &str, user_id: i32) -> Result<()> {
        let Some(record) = self.store.get(package_name, user_id).cloned() else {
            return Ok(());
        };
        self.store.remove(package_name, user_id);
        self.remove_mapping_if_unused(&record)
    }

    pub fn overlay_upgrading(&mut self, package_name: &str, user_id: i32) {
        self.store.set_upgrading(package_name, user_id, true);
    }

    /// Completes an upgrade. A same-target replacement resumes the stashed
    /// priority slot and enabled intent; a retargeted one starts over at the
    /// lowest priority with default-disabled intent.
    pub fn overlay_upgraded(&mut self, package_name: &str, user_id: i32) -> Result<()> {
        let Some(overlay) = self.packages.package_info(package_name, user_id)? else {
            return Ok(());
        };
        let Some(new_target) = overlay.target_package_name.clone() else {
            return Ok(());
        };

        match self.store.get(package_name, user_id).cloned() {
            Some(previous) if previous.target_package_name == new_target => {
                self.store.set_upgrading(package_name, user_id, false);
                self.store
                    .set_base_code_path(package_name, user_id, &overlay.base_code_path);
                if let Some(target) = self.packages.package_info(&new_target, user_id)? {
                    self.mappings.create_mapping(&target, &overlay, user_id)?;
                }
                self.update_state(&new_target, package_name, user_id)
            }
            Some(previous) => {
                // the stashed intent refers to the old target; discard it
                self.store.remove(package_name, user_id);
                self.remove_mapping_if_unused(&previous)?;
                self.overlay_added(package_name, user_id)
            }
            None => self.overlay_added(package_name, user_id),
        }
    }

    pub fn target_added(&mut self, target_package_name: &str, user_id: i32) -> Result<()> {
        self.refresh_target(target_package_name, user_id, true)
    }

    pub fn target_removed(&mut self, target_package_name: &str, user_id: i32) -> Result<()> {
        for record in self.store.overlays_for_target(target_package_name, user_id) {
            self.mappings.remove_mapping(&record, user_id)?;
            self.update_state(target_package_name, &record.package_name, user_id)?;
        }
        Ok(())
    }

    /// The target is gone from the package manager mid-replacement; its
    /// overlays regress to missing-target until the upgrade completes.
    pub fn target_upgrading(&mut self, target_package_name: &str, user_id: i32) -> Result<()> {
        self.refresh_target(target_package_name, user_id, false)
    }

    pub fn target_upgraded(&mut self, target_package_name: &str, user_id: i32) -> Result<()> {
        self.refresh_target(target_package_name, user_id, true)
    }

    /// Records the user's enable intent and re-evaluates. True for any known,
    /// non-upgrading overlay, whether or not the intent becomes visible in
    /// its state.
    pub fn set_enabled(&mut self, package_name: &str, enable: bool, user_id: i32) -> Result<bool> {
        let Some(record) = self.store.get(package_name, user_id) else {
            return Ok(false);
        };
        if record.is_upgrading {
            return Ok(false);
        }

        let target_package_name = record.target_package_name.clone();
        self.store.set_enabled(package_name, user_id, enable);
        self.update_state(&target_package_name, package_name, user_id)?;
        Ok(true)
    }

    pub fn set_priority(
        &mut self,
        package_name: &str,
        new_predecessor_package_name: &str,
        user_id: i32,
    ) -> bool {
        if self.is_upgrading(package_name, user_id)
            || self.is_upgrading(new_predecessor_package_name, user_id)
        {
            return false;
        }
        self.store
            .set_priority(package_name, new_predecessor_package_name, user_id)
    }

    pub fn set_highest_priority(&mut self, package_name: &str, user_id: i32) -> bool {
        !self.is_upgrading(package_name, user_id)
            && self.store.set_highest_priority(package_name, user_id)
    }

    pub fn set_lowest_priority(&mut self, package_name: &str, user_id: i32) -> bool {
        !self.is_upgrading(package_name, user_id)
            && self.store.set_lowest_priority(package_name, user_id)
    }

    /// Reconciles stored records for the user against the package manager's
    /// live overlay list; packages may have come, gone, or changed target
    /// while the user was inactive. Returns the target package names whose
    /// effective overlay list changed, so exactly those targets can be
    /// re-rendered. Quiescent switches return an empty set.
    pub fn switch_user(&mut self, user_id: i32) -> Result<BTreeSet<String>> {
        let mut changed = BTreeSet::new();

        let mut stored: HashMap<String, OverlayRecord> = HashMap::new();
        for (_, overlays) in self.store.overlays_for_user(user_id) {
            for record in overlays {
                stored.insert(record.package_name.clone(), record);
            }
        }

        for overlay in self.packages.overlay_packages(user_id)? {
            let Some(live_target) = overlay.target_package_name.clone() else {
                continue;
            };
            match stored.remove(&overlay.package_name) {
                None => {
                    changed.insert(live_target);
                    self.overlay_added(&overlay.package_name, user_id)?;
                }
                Some(previous) if previous.target_package_name != live_target => {
                    changed.insert(previous.target_package_name.clone());
                    changed.insert(live_target);
                    self.store.remove(&overlay.package_name, user_id);
                    self.remove_mapping_if_unused(&previous)?;
                    self.overlay_added(&overlay.package_name, user_id)?;
                }
                Some(previous) => {
                    self.update_state(
                        &previous.target_package_name,
                        &overlay.package_name,
                        user_id,
                    )?;
                    let refreshed = self.store.get(&overlay.package_name, user_id);
                    if refreshed.map_or(true, |record| {
                        record.state != previous.state
                            || record.base_code_path != previous.base_code_path
                    }) {
                        changed.insert(previous.target_package_name);
                    }
                }
            }
        }

        // whatever is left was uninstalled while the user was inactive
        for record in stored.values() {
            changed.insert(record.target_package_name.clone());
            self.store.remove(&record.package_name, user_id);
            self.remove_mapping_if_unused(record)?;
        }

        debug!(user = user_id, targets = changed.len(), "switched user");
        Ok(changed)
    }

    pub fn user_removed(&mut self, user_id: i32) {
        self.store.remove_user(user_id);
    }

    /// Snapshot of one overlay record; `None` while the package is upgrading.
    pub fn overlay(&self, package_name: &str, user_id: i32) -> Option<OverlayRecord> {
        self.store
            .get(package_name, user_id)
            .filter(|record| !record.is_upgrading)
            .cloned()
    }

    pub fn overlays_for_target(
        &self,
        target_package_name: &str,
        user_id: i32,
    ) -> Vec<OverlayRecord> {
        self.store.overlays_for_target(target_package_name, user_id)
    }

    pub fn overlays_for_user(&self, user_id: i32) -> BTreeMap<String, Vec<OverlayRecord>> {
        self.store.overlays_for_user(user_id)
    }

    /// Artifact paths of the target's enabled overlays, in priority order.
    /// This is what the resource loader stacks on top of the target.
    pub fn enabled_overlay_paths(&self, target_package_name: &str, user_id: i32) -> Vec<String> {
        self.store
            .overlays_for_target(target_package_name, user_id)
            .into_iter()
            .filter(|record| record.state == OverlayState::ApprovedEnabled)
            .map(|record| record.base_code_path)
            .collect()
    }

    fn refresh_target(
        &mut self,
        target_package_name: &str,
        user_id: i32,
        create_mappings: bool,
    ) -> Result<()> {
        let target = self.packages.package_info(target_package_name, user_id)?;
        for record in self.store.overlays_for_target(target_package_name, user_id) {
            if create_mappings {
                if let Some(target) = target.as_ref() {
                    if let Some(overlay) =
                        self.packages.package_info(&record.package_name, user_id)?
                    {
                        self.mappings.create_mapping(target, &overlay, user_id)?;
                    }
                }
            }
            self.update_state(target_package_name, &record.package_name, user_id)?;
        }
        Ok(())
    }

    fn update_state(
        &mut self,
        target_package_name: &str,
        package_name: &str,
        user_id: i32,
    ) -> Result<()> {
        let Some(overlay) = self.packages.package_info(package_name, user_id)? else {
            return Ok(());
        };
        let target = self.packages.package_info(target_package_name, user_id)?;

        self.store
            .set_base_code_path(package_name, user_id, &overlay.base_code_path);

        let trusted = overlay.platform_signed
            || self
                .packages
                .signatures_matching(target_package_name, package_name, user_id)?;
        let facts = ResolutionFacts {
            component_enabled: overlay.component_enabled,
            target_installed: target.is_some(),
            mapping_valid: self.mappings.mapping_exists(&overlay, user_id)?,
            trusted,
            dangerous: self.mappings.is_dangerous(&overlay, user_id)?,
        };

        let (is_enabled, old_state) = match self.store.get(package_name, user_id) {
            Some(record) => (record.is_enabled, record.state),
            None => return Ok(()),
        };
        let state = resolve(facts).into_state(is_enabled);
        if state != old_state {
            debug!(
                package = package_name,
                user = user_id,
                from = old_state.as_str(),
                to = state.as_str(),
                "overlay state changed"
            );
        }
        self.store.set_state(package_name, user_id, state);
        Ok(())
    }

    fn is_upgrading(&self, package_name: &str, user_id: i32) -> bool {
        self.store
            .get(package_name, user_id)
            .map_or(false, |record| record.is_upgrading)
    }

    fn remove_mapping_if_unused(&mut self, record: &OverlayRecord) -> Result<()> {
        let still_referenced = self
            .store
            .users()
            .iter()
            .any(|user_id| self.store.contains(&record.package_name, *user_id));
        if !still_referenced {
            self.mappings.remove_mapping(record, record.user_id)?;
        }
        Ok(())
    }
}
