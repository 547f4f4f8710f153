use crate::assets::loader::{release_quietly, LoaderBase};
use crate::assets::AssetEntry;
use crate::backend::OperationStatus;
use crate::context::ArmContext;
use crate::error::ArmError;
use crate::location::{LocationQuery, ResourceLocation};
use crate::operation::OperationHandle;
use std::sync::Arc;

/// Loads every location behind one key or reference into a single entry.
///
/// A key that is already registered only gets the locations its entry is
/// missing. Progress reserves `location_share` for resolution and splits
/// the rest evenly over the locations loaded by this call.
#[derive(Clone)]
pub(crate) struct IndividualLoader {
    base: LoaderBase,
}

impl IndividualLoader {
    pub fn new(context: Arc<ArmContext>) -> Self {
        Self {
            base: LoaderBase::new(context),
        }
    }

    pub async fn load(&self, query: LocationQuery, op: OperationHandle<Arc<AssetEntry>>) {
        op.set_progress(0.0);

        let locations = self.base.resolve(&query).await;
        if locations.is_empty() {
            tracing::error!("Failed to load locations for {}", query);
            op.fail(ArmError::NoLocations(query.to_string()));
            return;
        }

        let share = self.base.context.settings.location_share;
        op.set_progress(share);

        let key = match &query {
            LocationQuery::Key(key) => key.clone(),
            _ => locations[0].primary_key().to_string(),
        };

        let (entry, created) = {
            let mut registry = self.base.context.registry.lock();
            match registry.try_get_asset(&key) {
                Some(entry) => (entry, false),
                None => {
                    let entry = Arc::new(AssetEntry::new(
                        key.as_str(),
                        false,
                        Arc::downgrade(&self.base.context),
                    ));
                    registry.add_asset(key.as_str(), entry.clone());
                    (entry, true)
                }
            }
        };

        let pending: Vec<ResourceLocation> = if created {
            locations
        } else {
            locations
                .into_iter()
                .filter(|location| !entry.contains_location(location))
                .collect()
        };

        if pending.is_empty() {
            tracing::debug!("All locations are already loaded for {}", key);
        } else {
            tracing::debug!("Loading {} locations for {}", pending.len(), key);
            self.load_locations(&entry, &pending, &op, share).await;
        }

        op.complete(entry);
    }

    async fn load_locations(
        &self,
        entry: &Arc<AssetEntry>,
        locations: &[ResourceLocation],
        op: &OperationHandle<Arc<AssetEntry>>,
        share: f32,
    ) {
        let slice = (1.0 - share) / locations.len() as f32;
        for (index, location) in locations.iter().enumerate() {
            let start = share + index as f32 * slice;
            self.load_location(entry, location, op, start, slice).await;
            op.set_progress(start + slice);
        }
        op.set_progress(1.0);
    }

    async fn load_location(
        &self,
        entry: &Arc<AssetEntry>,
        location: &ResourceLocation,
        op: &OperationHandle<Arc<AssetEntry>>,
        start: f32,
        slice: f32,
    ) {
        if entry.contains_location(location) {
            tracing::debug!("Location already loaded for {}. Skipping {}", entry.key(), location);
            return;
        }

        let Some(handle) = self.base.start_load(location) else {
            return;
        };
        self.base
            .wait_for(&handle, |percent| op.set_progress(start + percent * slice))
            .await;

        // other requests may have run while this one was suspended
        if handle.status() != OperationStatus::Succeeded {
            tracing::warn!(
                "Failed to load asset for {}. Status: {:?} {}",
                entry.key(),
                handle.status(),
                handle.error().unwrap_or_default()
            );
            release_quietly(entry.key(), &handle);
            return;
        }

        if !self.base.is_registered(entry) {
            tracing::debug!("Asset {} was released during loading", entry.key());
            release_quietly(entry.key(), &handle);
            return;
        }

        if entry.insert_if_absent(location.clone(), handle.clone()) {
            tracing::debug!("Adding handle for {} ({})", entry.key(), location);
            self.base.context.track(entry.key(), handle);
        } else {
            tracing::debug!(
                "Location was loaded during async wait for {}. Releasing duplicate.",
                entry.key()
            );
            release_quietly(entry.key(), &handle);
        }
    }
}
