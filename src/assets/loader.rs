use crate::assets::AssetEntry;
use crate::backend::{LoadHandle, OperationStatus};
use crate::context::ArmContext;
use crate::location::{LocationQuery, ResourceLocation};
use std::sync::Arc;

/// Shared plumbing for the individual and batch loaders
#[derive(Clone)]
pub(crate) struct LoaderBase {
    pub(crate) context: Arc<ArmContext>,
}

impl LoaderBase {
    pub fn new(context: Arc<ArmContext>) -> Self {
        Self { context }
    }

    /// Resolve through the backend; failures read as "no locations"
    pub async fn resolve(&self, query: &LocationQuery) -> Vec<ResourceLocation> {
        match self.context.backend.resolve_locations(query).await {
            Ok(locations) => locations,
            Err(err) => {
                tracing::error!("Location lookup failed for {}: {}", query, err);
                Vec::new()
            }
        }
    }

    /// Poll `handle` once per frame until it settles, reporting increases
    /// of its percent complete.
    pub async fn wait_for<F>(&self, handle: &LoadHandle, mut report: F)
    where
        F: FnMut(f32) + Send,
    {
        let mut last = 0.0f32;
        while !handle.is_done() {
            let percent = handle.percent_complete();
            if percent > last {
                last = percent;
                report(percent);
            }
            self.context.backend.next_frame().await;
        }
    }

    /// Start loading `location`; a backend error is logged and yields `None`
    pub fn start_load(&self, location: &ResourceLocation) -> Option<LoadHandle> {
        match self.context.backend.load_asset(location) {
            Ok(handle) => Some(handle),
            Err(err) => {
                tracing::error!("Failed to start loading {}: {}", location, err);
                None
            }
        }
    }

    /// Record a succeeded handle under its primary key, creating the entry
    /// if none exists. A location the entry already holds is a duplicate
    /// and the redundant handle is released.
    pub fn register_location(&self, location: &ResourceLocation, handle: LoadHandle, is_batch_loaded: bool) {
        if handle.status() != OperationStatus::Succeeded {
            return;
        }

        let key = location.primary_key();
        let inserted = {
            let mut registry = self.context.registry.lock();
            let entry = match registry.try_get_asset(key) {
                Some(entry) => entry,
                None => {
                    let entry = Arc::new(AssetEntry::new(
                        key,
                        is_batch_loaded,
                        Arc::downgrade(&self.context),
                    ));
                    registry.add_asset(key, entry.clone());
                    entry
                }
            };
            entry.insert_if_absent(location.clone(), handle.clone())
        };

        if inserted {
            self.context.track(key, handle);
        } else {
            tracing::debug!("Location already exists for {}. Skipping duplicate.", key);
            release_quietly(key, &handle);
        }
    }

    /// `entry` is still the registered entry for its key
    pub fn is_registered(&self, entry: &Arc<AssetEntry>) -> bool {
        self.context
            .registry
            .lock()
            .try_get_asset(entry.key())
            .is_some_and(|registered| Arc::ptr_eq(&registered, entry))
    }
}

/// Release an untracked handle, logging instead of propagating
pub(crate) fn release_quietly(key: &str, handle: &LoadHandle) {
    if !handle.is_valid() {
        return;
    }
    if let Err(err) = handle.release() {
        tracing::error!("Error releasing handle for {}: {}", key, err);
    }
}
