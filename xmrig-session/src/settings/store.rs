use std::sync::Arc;

use parking_lot::RwLock;

use super::{Settings, StoredConfiguration};
use crate::tracing::prelude::*;

/// The settings store as seen by a session.
///
/// Reads hand out owned snapshots; the session never holds a reference into
/// the store's live state. Writes go through [`update_configuration`], which
/// replaces the stored record with the same id.
///
/// [`update_configuration`]: SettingsStore::update_configuration
pub trait SettingsStore: Send + Sync {
    /// Current selection and configurations.
    fn settings(&self) -> Settings;

    /// Replace the configuration whose id matches `value.id`.
    fn update_configuration(&self, value: StoredConfiguration);
}

/// Settings kept in memory behind a lock. Cloning shares the same state.
#[derive(Debug, Clone, Default)]
pub struct MemorySettingsStore {
    inner: Arc<RwLock<Settings>>,
}

impl MemorySettingsStore {
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn settings(&self) -> Settings {
        self.inner.read().clone()
    }

    fn update_configuration(&self, value: StoredConfiguration) {
        let mut settings = self.inner.write();
        match settings
            .configurations
            .iter_mut()
            .find(|config| config.id == value.id)
        {
            Some(slot) => *slot = value,
            None => warn!(id = %value.id, "Update for unknown configuration ignored"),
        }
    }
}
