use restyle_core::OverlayRecord;

/// Change notification payloads. All record payloads are snapshots taken at
/// mutation time; holding one cannot observe or cause later store changes.
///
/// The first four variants are the external channel consumed by downstream
/// notification layers. `SettingsChanged` is the internal channel and fires on
/// every successful mutation, including ones the external channel considers
/// uninteresting (enabled intent, upgrade marker, artifact path).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayEvent {
    Added(OverlayRecord),
    Removed(OverlayRecord),
    Changed {
        new: OverlayRecord,
        old: OverlayRecord,
    },
    PriorityChanged(OverlayRecord),
    SettingsChanged,
}

impl OverlayEvent {
    pub fn is_external(&self) -> bool {
        !matches!(self, Self::SettingsChanged)
    }
}

/// Callbacks run synchronously, in registration order, on the call stack of
/// the triggering mutation. A listener must not call back into the store.
pub trait ChangeListener {
    fn on_event(&self, event: &OverlayEvent);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);
