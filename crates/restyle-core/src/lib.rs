mod record;
mod state;

pub use record::{OverlayKey, OverlayRecord};
pub use state::OverlayState;

#[cfg(test)]
mod tests;
