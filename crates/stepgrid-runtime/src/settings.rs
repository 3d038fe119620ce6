//! [`SettingsCell`] – the active detection settings, swapped wholesale.

use std::sync::{Arc, PoisonError, RwLock};

use stepgrid_types::DetectionSettings;

/// Holder of the active [`DetectionSettings`].
///
/// Writers replace the whole value; readers take an `Arc` to the value that
/// was current at that instant.  The lock is only held for the pointer swap
/// or clone, never while a cycle runs, so a reader can never observe a mix
/// of old and new fields.
#[derive(Debug, Default)]
pub struct SettingsCell {
    current: RwLock<Arc<DetectionSettings>>,
}

impl SettingsCell {
    pub fn new(settings: DetectionSettings) -> Self {
        Self {
            current: RwLock::new(Arc::new(settings)),
        }
    }

    /// Install `settings` as the active value and return the previous one.
    pub fn replace(&self, settings: DetectionSettings) -> Arc<DetectionSettings> {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, Arc::new(settings))
    }

    /// The settings value that is active right now.
    pub fn snapshot(&self) -> Arc<DetectionSettings> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }
}
