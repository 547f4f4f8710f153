//! Shared state owned by one asset manager instance
//!
//! Lock order is registry before any entry; the tracker and event bus are
//! never held while another lock is taken.

use crate::assets::AssetEntry;
use crate::backend::{LoadHandle, ResourceBackend};
use crate::events::{AssetReleased, BatchReleased, Event, EventBus};
use crate::location::AssetLabel;
use crate::registry::AssetRegistry;
use crate::settings::ArmSettings;
use crate::tracking::HandleTracker;
use ahash::AHashSet;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub struct ArmContext {
    pub(crate) registry: Mutex<AssetRegistry>,
    pub(crate) tracker: Mutex<HandleTracker>,
    pub(crate) backend: Arc<dyn ResourceBackend>,
    pub(crate) settings: ArmSettings,
    pub(crate) events: Mutex<EventBus>,
    initialized: AtomicBool,
}

impl ArmContext {
    pub(crate) fn new(backend: Arc<dyn ResourceBackend>, settings: ArmSettings) -> Arc<Self> {
        Arc::new(Self {
            registry: Mutex::new(AssetRegistry::new()),
            tracker: Mutex::new(HandleTracker::new()),
            backend,
            settings,
            events: Mutex::new(EventBus::new()),
            initialized: AtomicBool::new(false),
        })
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub(crate) fn set_initialized(&self, value: bool) {
        self.initialized.store(value, Ordering::Release);
    }

    pub(crate) fn track(&self, key: &str, handle: LoadHandle) {
        self.tracker.lock().track(key, handle);
    }

    pub(crate) fn publish<E: Event>(&self, event: E) {
        self.events.lock().publish_event(event);
    }

    /// Clear all bookkeeping and release every tracked handle
    pub(crate) fn reset(&self) {
        self.registry.lock().clear();
        self.tracker.lock().release_all();
    }

    /// Drop `entry` once its last reference is gone.
    ///
    /// Only the entry currently registered under its key is removed, and
    /// never a batch entry.
    pub(crate) fn release_asset(&self, entry: &AssetEntry) {
        let key = entry.key();
        let removed = {
            let mut registry = self.registry.lock();
            match registry.try_get_asset(key) {
                Some(registered)
                    if std::ptr::eq(Arc::as_ptr(&registered), entry)
                        && !registered.is_batch_loaded() =>
                {
                    registry.remove_asset(key);
                    true
                }
                _ => false,
            }
        };

        if !removed {
            tracing::debug!("Asset {} is no longer registered; skipping release", key);
            return;
        }

        self.tracker.lock().release_handles(key);
        tracing::debug!("Released asset {}", key);
        self.publish(AssetReleased { key: key.to_string() });
    }

    /// Release batch entries reachable from the cached locations of `labels`.
    ///
    /// Each label's cache entry is dropped whether or not anything was
    /// released for it.
    pub(crate) fn release_batches(&self, labels: &[AssetLabel]) {
        if labels.is_empty() {
            return;
        }

        let released = {
            let mut registry = self.registry.lock();
            let mut keys = AHashSet::new();
            let mut ordered = Vec::new();
            for label in labels {
                let Some(locations) = registry.take_label(label) else {
                    continue;
                };
                for location in locations {
                    if keys.insert(location.primary_key().to_string()) {
                        ordered.push(location.primary_key().to_string());
                    }
                }
            }

            ordered.retain(|key| match registry.try_get_asset(key) {
                Some(entry) if entry.is_batch_loaded() => {
                    registry.remove_asset(key);
                    true
                }
                _ => false,
            });
            ordered
        };

        self.release_tracked(released);
    }

    /// Release every batch entry and clear the label cache
    pub(crate) fn release_all_batches(&self) {
        let released = {
            let mut registry = self.registry.lock();
            let mut keys = registry.batch_keys();
            keys.sort();
            for key in &keys {
                registry.remove_asset(key);
            }
            registry.clear_labels();
            keys
        };

        self.release_tracked(released);
    }

    fn release_tracked(&self, keys: Vec<String>) {
        if keys.is_empty() {
            return;
        }
        {
            let mut tracker = self.tracker.lock();
            for key in &keys {
                tracker.release_handles(key);
            }
        }
        tracing::debug!("Released {} batch loaded assets", keys.len());
        self.publish(BatchReleased { keys });
    }
}
