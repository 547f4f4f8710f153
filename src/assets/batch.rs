use crate::assets::loader::{release_quietly, LoaderBase};
use crate::backend::OperationStatus;
use crate::context::ArmContext;
use crate::error::ArmError;
use crate::location::{AssetLabel, LocationQuery, ResourceLocation};
use crate::operation::OperationHandle;
use std::sync::Arc;

/// Loaded / total bookkeeping for one batch call
#[derive(Clone, Copy, Debug)]
struct BatchProgress {
    total: usize,
    loaded: usize,
    to_load: usize,
}

impl BatchProgress {
    /// Completed share plus the in-flight location's share, capped at 1
    fn fraction(&self, current: f32) -> f32 {
        let total = self.total as f32;
        let completed = self.loaded as f32 / total;
        let contribution = if self.to_load == 0 || self.loaded >= self.total {
            0.0
        } else {
            current / total
        };
        (completed + contribution).min(1.0)
    }
}

/// Loads every location under a set of labels, one location at a time.
///
/// Entries created here are batch entries. A failed location counts as
/// consumed and the batch carries on.
#[derive(Clone)]
pub(crate) struct BatchLoader {
    base: LoaderBase,
}

impl BatchLoader {
    pub fn new(context: Arc<ArmContext>) -> Self {
        Self {
            base: LoaderBase::new(context),
        }
    }

    pub async fn load(&self, labels: Vec<AssetLabel>, op: OperationHandle<bool>) {
        op.set_progress(0.0);

        let locations = self.label_locations(&labels).await;
        if locations.is_empty() {
            let names: Vec<&str> = labels.iter().map(AssetLabel::as_str).collect();
            tracing::error!("No locations found for labels [{}]", names.join(", "));
            op.fail(ArmError::NoLocations(format!("labels [{}]", names.join(", "))));
            return;
        }

        let preloaded: Vec<bool> = {
            let registry = self.base.context.registry.lock();
            locations
                .iter()
                .map(|location| registry.is_location_loaded(location))
                .collect()
        };
        let already = preloaded.iter().filter(|loaded| **loaded).count();
        let mut progress = BatchProgress {
            total: locations.len(),
            loaded: already,
            to_load: locations.len() - already,
        };
        tracing::debug!(
            "Batch of {} locations, {} already loaded",
            progress.total,
            already
        );
        op.set_progress(progress.fraction(0.0));

        for (location, preloaded) in locations.iter().zip(preloaded) {
            if preloaded {
                tracing::debug!("Asset already loaded. Skipping. KEY {}", location.primary_key());
                continue;
            }

            let loaded_meanwhile = self.base.context.registry.lock().is_location_loaded(location);
            if loaded_meanwhile {
                tracing::debug!("Asset loaded during batch. Skipping. KEY {}", location.primary_key());
            } else {
                self.load_location(location, &op, progress).await;
            }

            progress.loaded += 1;
            op.set_progress(progress.fraction(0.0));
        }

        op.set_progress(1.0);
        op.complete(true);
    }

    /// Cached locations per label, resolving and caching the rest
    async fn label_locations(&self, labels: &[AssetLabel]) -> Vec<ResourceLocation> {
        let mut result = Vec::new();
        for label in labels {
            let cached = self
                .base
                .context
                .registry
                .lock()
                .label_locations(label)
                .map(<[ResourceLocation]>::to_vec);
            if let Some(cached) = cached {
                result.extend(cached);
                continue;
            }

            let resolved = self.base.resolve(&LocationQuery::Label(label.clone())).await;
            if resolved.is_empty() {
                tracing::warn!("Label {} not found or is empty", label);
                continue;
            }

            self.base
                .context
                .registry
                .lock()
                .cache_label(label.clone(), resolved.clone());
            result.extend(resolved);
        }
        result
    }

    async fn load_location(&self, location: &ResourceLocation, op: &OperationHandle<bool>, progress: BatchProgress) {
        let Some(handle) = self.base.start_load(location) else {
            return;
        };
        self.base
            .wait_for(&handle, |percent| op.set_progress(progress.fraction(percent)))
            .await;

        if handle.status() != OperationStatus::Succeeded {
            tracing::error!(
                "Batch load failed for {}: {}",
                location,
                handle.error().unwrap_or_default()
            );
            release_quietly(location.primary_key(), &handle);
            return;
        }

        self.base.register_location(location, handle, true);
    }
}
