//! Reactive key-value settings interface.
//!
//! The dispatcher reads the endpoint URL through [`SettingsStore`] and
//! subscribes to changes so a cached pool is dropped as soon as the URL is
//! added, changed or removed. [`MemorySettings`] is an in-process store for
//! applications without their own and for tests.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock, Weak};

use tracing::debug;

/// Kind of change a settings store reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingChange {
    /// Key did not exist before.
    Added,
    /// Existing key got a new value.
    Changed,
    /// Key was deleted.
    Removed,
}

/// Receives change notifications for observed keys.
pub trait SettingsObserver: Send + Sync {
    /// Called after `key` changed.
    fn setting_changed(&self, key: &str, change: SettingChange);
}

/// Key-value settings source with push notifications.
pub trait SettingsStore: Send + Sync {
    /// Current value of `key`.
    fn get(&self, key: &str) -> Option<String>;

    /// Registers `observer` for changes to `key`.
    ///
    /// The store holds the observer weakly: once its owner drops it, it stops
    /// receiving notifications and may be forgotten.
    fn observe(&self, key: &str, observer: Weak<dyn SettingsObserver>);
}

type Observers = Vec<(String, Weak<dyn SettingsObserver>)>;

/// In-memory [`SettingsStore`].
#[derive(Default)]
pub struct MemorySettings {
    values: RwLock<HashMap<String, String>>,
    observers: RwLock<Observers>,
}

impl fmt::Debug for MemorySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<String> = self
            .values
            .read()
            .map(|values| values.keys().cloned().collect())
            .unwrap_or_default();
        f.debug_struct("MemorySettings")
            .field("keys", &keys)
            .finish_non_exhaustive()
    }
}

impl MemorySettings {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key`, notifying observers with [`SettingChange::Added`] or
    /// [`SettingChange::Changed`]. Writing the current value is a no-op.
    pub fn set(&self, key: &str, value: impl Into<String>) {
        let value = value.into();
        let change = {
            let Ok(mut values) = self.values.write() else {
                return;
            };
            match values.insert(key.to_string(), value.clone()) {
                None => SettingChange::Added,
                Some(previous) if previous == value => return,
                Some(_) => SettingChange::Changed,
            }
        };
        self.notify(key, change);
    }

    /// Removes `key`, notifying observers if it existed.
    pub fn remove(&self, key: &str) {
        let existed = self
            .values
            .write()
            .map(|mut values| values.remove(key).is_some())
            .unwrap_or(false);
        if existed {
            self.notify(key, SettingChange::Removed);
        }
    }

    fn notify(&self, key: &str, change: SettingChange) {
        debug!(key, ?change, "Setting changed");
        // Observers run outside the lock so they may read the store
        let targets: Vec<Arc<dyn SettingsObserver>> = self
            .observers
            .read()
            .map(|observers| {
                observers
                    .iter()
                    .filter(|(watched, _)| watched == key)
                    .filter_map(|(_, observer)| observer.upgrade())
                    .collect()
            })
            .unwrap_or_default();
        for observer in targets {
            observer.setting_changed(key, change);
        }
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Option<String> {
        self.values.read().ok()?.get(key).cloned()
    }

    fn observe(&self, key: &str, observer: Weak<dyn SettingsObserver>) {
        if let Ok(mut observers) = self.observers.write() {
            observers.retain(|(_, existing)| existing.strong_count() > 0);
            observers.push((key.to_string(), observer));
        }
    }
}
