use crate::assets::batch::BatchLoader;
use crate::assets::individual::IndividualLoader;
use crate::assets::{labels, AssetEntry};
use crate::backend::TaskSpawner;
use crate::context::ArmContext;
use crate::error::ArmError;
use crate::location::{AssetLabel, AssetReference, LocationQuery};
use crate::operation::OperationHandle;
use futures::future::{BoxFuture, FutureExt};
use std::rc::Rc;
use std::sync::Arc;

#[cfg(feature = "profiling")]
use tracing::{info_span, Instrument};

/// Asset loading and release entry points.
///
/// Every load returns its [`OperationHandle`] immediately; the work runs on
/// the spawner handed to [`crate::Arm::new`].
pub struct AssetController {
    context: Arc<ArmContext>,
    spawner: Rc<dyn TaskSpawner>,
    individual: IndividualLoader,
    batch: BatchLoader,
}

impl AssetController {
    pub(crate) fn new(context: Arc<ArmContext>, spawner: Rc<dyn TaskSpawner>) -> Self {
        Self {
            individual: IndividualLoader::new(context.clone()),
            batch: BatchLoader::new(context.clone()),
            context,
            spawner,
        }
    }

    /// Load every location behind `key` into one entry
    pub fn load(&self, key: &str) -> OperationHandle<Arc<AssetEntry>> {
        self.load_query(LocationQuery::Key(key.to_string()))
    }

    /// Load every location behind `reference` into one entry
    pub fn load_reference(&self, reference: &AssetReference) -> OperationHandle<Arc<AssetEntry>> {
        self.load_query(LocationQuery::Reference(reference.clone()))
    }

    fn load_query(&self, query: LocationQuery) -> OperationHandle<Arc<AssetEntry>> {
        let op = self.new_operation();
        if !self.ensure_initialized(&op) {
            return op;
        }

        let loader = self.individual.clone();
        let task_op = op.clone();
        #[cfg(feature = "profiling")]
        let span = info_span!("individual_load", query = %query);
        let task = async move { loader.load(query, task_op).await };
        #[cfg(feature = "profiling")]
        let task = task.instrument(span);

        self.spawn(task.boxed(), &op);
        op
    }

    /// Load every location under `labels` as batch entries
    pub fn batch_load(&self, labels: &[AssetLabel]) -> OperationHandle<bool> {
        let op = self.new_operation();
        if !self.ensure_initialized(&op) {
            return op;
        }

        let loader = self.batch.clone();
        let task_op = op.clone();
        let labels = labels.to_vec();
        #[cfg(feature = "profiling")]
        let span = info_span!("batch_load", labels = labels.len());
        let task = async move { loader.load(labels, task_op).await };
        #[cfg(feature = "profiling")]
        let task = task.instrument(span);

        self.spawn(task.boxed(), &op);
        op
    }

    /// Release batch entries loaded through `labels` and forget the labels
    pub fn release_batches(&self, labels: &[AssetLabel]) {
        self.context.release_batches(labels);
    }

    /// Release every batch entry and clear the label cache
    pub fn release_all_batches(&self) {
        self.context.release_all_batches();
    }

    /// Registered entry for `key`, or for the primary key it resolves to
    pub fn try_get_loaded_entry(&self, key: &str) -> Option<Arc<AssetEntry>> {
        if let Some(entry) = self.context.registry.lock().try_get_asset(key) {
            return Some(entry);
        }
        self.lookup_by_primary_key(&LocationQuery::Key(key.to_string()))
    }

    pub fn try_get_loaded_reference(&self, reference: &AssetReference) -> Option<Arc<AssetEntry>> {
        self.lookup_by_primary_key(&LocationQuery::Reference(reference.clone()))
    }

    fn lookup_by_primary_key(&self, query: &LocationQuery) -> Option<Arc<AssetEntry>> {
        let locations = match self.context.backend.resolve_locations_now(query) {
            Ok(locations) => locations,
            Err(err) => {
                tracing::error!("Location lookup failed for {}: {}", query, err);
                return None;
            }
        };
        let primary_key = locations.first()?.primary_key();
        self.context.registry.lock().try_get_asset(primary_key)
    }

    pub fn labels_to_load(&self, new: &[AssetLabel]) -> Vec<AssetLabel> {
        labels::labels_to_load(&self.context.registry.lock(), new)
    }

    pub fn labels_to_unload(&self, required: &[AssetLabel]) -> Vec<AssetLabel> {
        labels::labels_to_unload(&self.context.registry.lock(), required)
    }

    pub fn diff_labels_to_load(&self, current: &[AssetLabel], new: &[AssetLabel]) -> Vec<AssetLabel> {
        labels::diff_labels_to_load(&self.context.registry.lock(), current, new)
    }

    pub fn diff_labels_to_unload(&self, current: &[AssetLabel], new: &[AssetLabel]) -> Vec<AssetLabel> {
        labels::diff_labels_to_unload(current, new)
    }

    fn new_operation<T: Clone + Send + 'static>(&self) -> OperationHandle<T> {
        OperationHandle::with_threshold(self.context.settings.progress_threshold)
    }

    fn ensure_initialized<T: Clone + Send + 'static>(&self, op: &OperationHandle<T>) -> bool {
        if self.context.is_initialized() {
            return true;
        }
        tracing::warn!("Not initialized. Call Arm::activate() first.");
        op.fail(ArmError::NotInitialized);
        false
    }

    fn spawn<T: Clone + Send + 'static>(&self, task: BoxFuture<'static, ()>, op: &OperationHandle<T>) {
        if let Err(err) = self.spawner.spawn_task(task) {
            tracing::error!("Failed to spawn loader task: {}", err);
            op.fail(err);
        }
    }
}
