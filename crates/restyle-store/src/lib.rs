use std::collections::BTreeMap;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use restyle_core::{OverlayKey, OverlayRecord, OverlayState};
use tracing::debug;

use crate::document::{OverlayDocument, OverlayItem, DOCUMENT_VERSION};

mod document;
mod events;

pub use events::{ChangeListener, ListenerId, OverlayEvent};

/// Ordered, keyed registry of overlay records with persistence and change
/// notification.
///
/// Records are kept in an insertion-ordered map plus one ordered key sequence
/// per (target package, user); both structures mutate under each operation.
/// Sequence position is priority: position 0 is the highest priority, new
/// records append at the end (lowest priority), and nothing ever re-sorts a
/// sequence besides the explicit priority operations.
///
/// Every mutator returns whether anything changed and fires listener events
/// only when it did. The store performs no locking; callers serialize access.
#[derive(Default)]
pub struct OverlayStore {
    records: IndexMap<OverlayKey, OverlayRecord>,
    sequences: BTreeMap<(String, i32), Vec<OverlayKey>>,
    listeners: Vec<(ListenerId, Box<dyn ChangeListener>)>,
    next_listener_id: u64,
}

impl OverlayStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a record in `NotEvaluated`, appended at the lowest priority of
    /// its target+user sequence. False if the key already exists.
    pub fn init(
        &mut self,
        package_name: &str,
        user_id: i32,
        target_package_name: &str,
        base_code_path: &str,
    ) -> bool {
        let key = OverlayKey::new(package_name, user_id);
        if self.records.contains_key(&key) {
            return false;
        }

        let record = OverlayRecord {
            package_name: package_name.to_string(),
            user_id,
            target_package_name: target_package_name.to_string(),
            base_code_path: base_code_path.to_string(),
            state: OverlayState::NotEvaluated,
            is_enabled: false,
            is_upgrading: false,
        };
        self.sequences
            .entry((target_package_name.to_string(), user_id))
            .or_default()
            .push(key.clone());
        self.records.insert(key, record);
        self.emit_mutation(None);
        true
    }

    pub fn remove(&mut self, package_name: &str, user_id: i32) -> bool {
        let key = OverlayKey::new(package_name, user_id);
        let Some(record) = self.records.shift_remove(&key) else {
            return false;
        };
        self.unlink(&record);
        self.emit_mutation(Some(OverlayEvent::Removed(record)));
        true
    }

    pub fn remove_user(&mut self, user_id: i32) -> bool {
        let keys: Vec<OverlayKey> = self
            .records
            .keys()
            .filter(|key| key.user_id == user_id)
            .cloned()
            .collect();
        if keys.is_empty() {
            return false;
        }

        let mut removed = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(record) = self.records.shift_remove(&key) {
                self.unlink(&record);
                removed.push(record);
            }
        }
        for record in removed {
            self.emit(&OverlayEvent::Removed(record));
        }
        self.emit(&OverlayEvent::SettingsChanged);
        true
    }

    pub fn contains(&self, package_name: &str, user_id: i32) -> bool {
        self.records
            .contains_key(&OverlayKey::new(package_name, user_id))
    }

    /// Raw keyed access; upgrading records are visible here. User-facing
    /// lookups apply the upgrade filter one layer up.
    pub fn get(&self, package_name: &str, user_id: i32) -> Option<&OverlayRecord> {
        self.records.get(&OverlayKey::new(package_name, user_id))
    }

    /// The first `set_state` out of `NotEvaluated` announces the record as
    /// added; every later state change announces it as changed.
    pub fn set_state(&mut self, package_name: &str, user_id: i32, state: OverlayState) -> bool {
        let key = OverlayKey::new(package_name, user_id);
        let Some(record) = self.records.get_mut(&key) else {
            return false;
        };
        if record.state == state {
            return false;
        }

        let old = record.clone();
        record.state = state;
        let new = record.clone();
        let external = if old.state == OverlayState::NotEvaluated {
            OverlayEvent::Added(new)
        } else {
            OverlayEvent::Changed { new, old }
        };
        self.emit_mutation(Some(external));
        true
    }

    pub fn set_enabled(&mut self, package_name: &str, user_id: i32, is_enabled: bool) -> bool {
        let key = OverlayKey::new(package_name, user_id);
        let Some(record) = self.records.get_mut(&key) else {
            return false;
        };
        if record.is_enabled == is_enabled {
            return false;
        }

        record.is_enabled = is_enabled;
        self.emit_mutation(None);
        true
    }

    pub fn set_upgrading(&mut self, package_name: &str, user_id: i32, is_upgrading: bool) -> bool {
        let key = OverlayKey::new(package_name, user_id);
        let Some(record) = self.records.get_mut(&key) else {
            return false;
        };
        if record.is_upgrading == is_upgrading {
            return false;
        }

        record.is_upgrading = is_upgrading;
        self.emit_mutation(None);
        true
    }

    pub fn set_base_code_path(
        &mut self,
        package_name: &str,
        user_id: i32,
        base_code_path: &str,
    ) -> bool {
        let key = OverlayKey::new(package_name, user_id);
        let Some(record) = self.records.get_mut(&key) else {
            return false;
        };
        if record.base_code_path == base_code_path {
            return false;
        }

        record.base_code_path = base_code_path.to_string();
        self.emit_mutation(None);
        true
    }

    /// Ordered, non-upgrading snapshots per target for one user. Unknown
    /// users yield an empty map, never an absent result.
    pub fn overlays_for_user(&self, user_id: i32) -> BTreeMap<String, Vec<OverlayRecord>> {
        let mut map = BTreeMap::new();
        for (target_package_name, user) in self.sequences.keys() {
            if *user != user_id {
                continue;
            }
            let overlays = self.overlays_for_target(target_package_name, user_id);
            if !overlays.is_empty() {
                map.insert(target_package_name.clone(), overlays);
            }
        }
        map
    }

    pub fn overlays_for_target(
        &self,
        target_package_name: &str,
        user_id: i32,
    ) -> Vec<OverlayRecord> {
        let Some(sequence) = self
            .sequences
            .get(&(target_package_name.to_string(), user_id))
        else {
            return Vec::new();
        };
        sequence
            .iter()
            .filter_map(|key| self.records.get(key))
            .filter(|record| !record.is_upgrading)
            .cloned()
            .collect()
    }

    pub fn target_package_names_for_user(&self, user_id: i32) -> Vec<String> {
        self.overlays_for_user(user_id).into_keys().collect()
    }

    pub fn users(&self) -> Vec<i32> {
        let mut users: Vec<i32> = self.records.keys().map(|key| key.user_id).collect();
        users.sort_unstable();
        users.dedup();
        users
    }

    /// Moves the record to immediately after the named predecessor within
    /// their shared target+user sequence. False without mutation when either
    /// key is absent, the targets differ, or both names are the same.
    pub fn set_priority(
        &mut self,
        package_name: &str,
        new_predecessor_package_name: &str,
        user_id: i32,
    ) -> bool {
        if package_name == new_predecessor_package_name {
            return false;
        }

        let moving_key = OverlayKey::new(package_name, user_id);
        let predecessor_key = OverlayKey::new(new_predecessor_package_name, user_id);
        let (Some(moving), Some(predecessor)) = (
            self.records.get(&moving_key),
            self.records.get(&predecessor_key),
        ) else {
            return false;
        };
        if moving.target_package_name != predecessor.target_package_name {
            return false;
        }

        let snapshot = moving.clone();
        let sequence_key = (moving.target_package_name.clone(), user_id);
        let Some(sequence) = self.sequences.get_mut(&sequence_key) else {
            return false;
        };
        let Some(from) = sequence.iter().position(|key| *key == moving_key) else {
            return false;
        };
        let key = sequence.remove(from);
        let Some(anchor) = sequence.iter().position(|key| *key == predecessor_key) else {
            sequence.insert(from, key);
            return false;
        };
        sequence.insert(anchor + 1, key);
        self.emit_mutation(Some(OverlayEvent::PriorityChanged(snapshot)));
        true
    }

    pub fn set_highest_priority(&mut self, package_name: &str, user_id: i32) -> bool {
        self.move_to_edge(package_name, user_id, true)
    }

    pub fn set_lowest_priority(&mut self, package_name: &str, user_id: i32) -> bool {
        self.move_to_edge(package_name, user_id, false)
    }

    fn move_to_edge(&mut self, package_name: &str, user_id: i32, to_front: bool) -> bool {
        let moving_key = OverlayKey::new(package_name, user_id);
        let Some(record) = self.records.get(&moving_key) else {
            return false;
        };

        let snapshot = record.clone();
        let sequence_key = (record.target_package_name.clone(), user_id);
        let Some(sequence) = self.sequences.get_mut(&sequence_key) else {
            return false;
        };
        let Some(from) = sequence.iter().position(|key| *key == moving_key) else {
            return false;
        };
        let key = sequence.remove(from);
        if to_front {
            sequence.insert(0, key);
        } else {
            sequence.push(key);
        }
        self.emit_mutation(Some(OverlayEvent::PriorityChanged(snapshot)));
        true
    }

    /// Serializes the full store as the versioned document, sequences in
    /// priority order.
    pub fn persist(&self, mut sink: impl Write) -> Result<()> {
        let items = self
            .ordered_records()
            .map(OverlayItem::from_record)
            .collect();
        let document = OverlayDocument {
            version: DOCUMENT_VERSION,
            items,
        };
        let content =
            toml::to_string(&document).context("failed serializing overlay settings")?;
        sink.write_all(content.as_bytes())
            .context("failed writing overlay settings")?;
        Ok(())
    }

    /// Atomic file variant of `persist`: the document lands under a temporary
    /// sibling name first and is renamed over the destination, so a crash
    /// mid-write never leaves a truncated document behind.
    pub fn persist_path(&self, path: &Path) -> Result<()> {
        let mut buffer = Vec::new();
        self.persist(&mut buffer)?;

        let staging = path.with_extension("tmp");
        fs::write(&staging, &buffer)
            .with_context(|| format!("failed writing overlay settings: {}", staging.display()))?;
        fs::rename(&staging, path)
            .with_context(|| format!("failed replacing overlay settings: {}", path.display()))?;
        Ok(())
    }

    /// Replaces the in-memory content with the parsed document. All or
    /// nothing: any read, parse, or validation failure leaves the previous
    /// content untouched. Fires no listener events.
    pub fn restore(&mut self, mut source: impl Read) -> Result<()> {
        let mut content = String::new();
        source
            .read_to_string(&mut content)
            .context("failed reading overlay settings")?;
        let document: OverlayDocument =
            toml::from_str(&content).context("failed parsing overlay settings")?;
        if document.version != DOCUMENT_VERSION {
            anyhow::bail!(
                "unsupported overlay settings version: {}",
                document.version
            );
        }

        let mut records = IndexMap::with_capacity(document.items.len());
        let mut sequences: BTreeMap<(String, i32), Vec<OverlayKey>> = BTreeMap::new();
        for item in document.items {
            let record = item.into_record()?;
            let key = record.key();
            if records.contains_key(&key) {
                anyhow::bail!(
                    "duplicate overlay item: '{}' user {}",
                    key.package_name,
                    key.user_id
                );
            }
            sequences
                .entry((record.target_package_name.clone(), record.user_id))
                .or_default()
                .push(key.clone());
            records.insert(key, record);
        }

        debug!(count = records.len(), "restored overlay settings");
        self.records = records;
        self.sequences = sequences;
        Ok(())
    }

    pub fn restore_path(&mut self, path: &Path) -> Result<()> {
        let file = fs::File::open(path)
            .with_context(|| format!("failed opening overlay settings: {}", path.display()))?;
        self.restore(file)
    }

    pub fn add_change_listener(&mut self, listener: Box<dyn ChangeListener>) -> ListenerId {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        self.listeners.push((id, listener));
        id
    }

    pub fn remove_change_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    fn ordered_records(&self) -> impl Iterator<Item = &OverlayRecord> {
        self.sequences
            .values()
            .flatten()
            .filter_map(|key| self.records.get(key))
    }

    fn unlink(&mut self, record: &OverlayRecord) {
        let sequence_key = (record.target_package_name.clone(), record.user_id);
        if let Some(sequence) = self.sequences.get_mut(&sequence_key) {
            sequence.retain(|key| key.package_name != record.package_name);
            if sequence.is_empty() {
                self.sequences.remove(&sequence_key);
            }
        }
    }

    fn emit_mutation(&self, external: Option<OverlayEvent>) {
        if let Some(event) = external {
            self.emit(&event);
        }
        self.emit(&OverlayEvent::SettingsChanged);
    }

    fn emit(&self, event: &OverlayEvent) {
        for (_, listener) in &self.listeners {
            listener.on_event(event);
        }
    }
}
