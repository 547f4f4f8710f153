use crate::assets::loader::{release_quietly, LoaderBase};
use crate::backend::{LoadHandle, OperationStatus, SceneMode, TaskSpawner};
use crate::context::ArmContext;
use crate::error::ArmError;
use crate::location::{AssetReference, LocationQuery};
use crate::operation::OperationHandle;
use crate::scenes::SceneEntry;
use futures::future::{BoxFuture, FutureExt};
use std::rc::Rc;
use std::sync::Arc;

const SCENE_LOCATION_SHARE: f32 = 0.1;
const ACTIVATION_STEP: f32 = 0.05;
const ACTIVATION_CAP: f32 = 0.9;

/// Scene loading, unloading and activation
pub struct SceneController {
    context: Arc<ArmContext>,
    spawner: Rc<dyn TaskSpawner>,
}

impl SceneController {
    pub(crate) fn new(context: Arc<ArmContext>, spawner: Rc<dyn TaskSpawner>) -> Self {
        Self { context, spawner }
    }

    /// Load the scene behind `key`; a scene that is already loaded
    /// completes immediately with its existing entry.
    pub fn load_scene(&self, key: &str, mode: SceneMode, activate_on_load: bool) -> OperationHandle<Arc<SceneEntry>> {
        let op = self.new_operation();
        if !self.ensure_initialized(&op) {
            return op;
        }
        if let Some(existing) = self.try_get_loaded_scene(key) {
            op.complete(existing);
            return op;
        }

        let query = LocationQuery::Key(key.to_string());
        let task = load_scene_task(self.context.clone(), query, mode, activate_on_load, op.clone());
        self.spawn(task.boxed(), &op);
        op
    }

    pub fn load_scene_reference(
        &self,
        reference: &AssetReference,
        mode: SceneMode,
        activate_on_load: bool,
    ) -> OperationHandle<Arc<SceneEntry>> {
        let op = self.new_operation();
        if !self.ensure_initialized(&op) {
            return op;
        }

        let query = LocationQuery::Reference(reference.clone());
        let task = load_scene_task(self.context.clone(), query, mode, activate_on_load, op.clone());
        self.spawn(task.boxed(), &op);
        op
    }

    /// Unload the scene registered for `key`; completes `false` if none is
    pub fn unload_scene(&self, key: &str) -> OperationHandle<bool> {
        let op = self.new_operation();
        if !self.ensure_initialized(&op) {
            return op;
        }
        match self.try_get_loaded_scene(key) {
            Some(entry) => {
                let task = unload_scene_task(self.context.clone(), entry, op.clone());
                self.spawn(task.boxed(), &op);
            }
            None => {
                tracing::warn!("Scene {} is not loaded or not found.", key);
                op.complete(false);
            }
        }
        op
    }

    pub fn unload_scene_entry(&self, entry: &Arc<SceneEntry>) -> OperationHandle<bool> {
        let op = self.new_operation();
        if !self.ensure_initialized(&op) {
            return op;
        }
        if !entry.is_valid() {
            tracing::warn!("Scene entry {} is not valid.", entry.key());
            op.complete(false);
            return op;
        }

        let task = unload_scene_task(self.context.clone(), entry.clone(), op.clone());
        self.spawn(task.boxed(), &op);
        op
    }

    /// Activate a scene that was loaded with `activate_on_load = false`
    pub fn activate_scene(&self, entry: &Arc<SceneEntry>) -> OperationHandle<bool> {
        let op = self.new_operation();
        if !self.ensure_initialized(&op) {
            return op;
        }
        if !entry.is_valid() {
            tracing::warn!("Scene entry {} is not valid.", entry.key());
            op.fail(ArmError::InvalidSceneEntry);
            return op;
        }

        let task = activate_scene_task(self.context.clone(), entry.clone(), op.clone());
        self.spawn(task.boxed(), &op);
        op
    }

    /// Unload every valid scene, keeping a lone `Single` scene in place
    pub fn unload_all_scenes(&self) -> OperationHandle<bool> {
        let op = self.new_operation();
        if !self.ensure_initialized(&op) {
            return op;
        }

        let task = unload_all_task(self.context.clone(), op.clone());
        self.spawn(task.boxed(), &op);
        op
    }

    /// Registered scene for `key`, or for the primary key it resolves to
    pub fn try_get_loaded_scene(&self, key: &str) -> Option<Arc<SceneEntry>> {
        if let Some(entry) = self.context.registry.lock().scene(key) {
            return Some(entry);
        }
        self.lookup_by_primary_key(&LocationQuery::Key(key.to_string()))
    }

    pub fn try_get_loaded_scene_reference(&self, reference: &AssetReference) -> Option<Arc<SceneEntry>> {
        self.lookup_by_primary_key(&LocationQuery::Reference(reference.clone()))
    }

    pub fn loaded_scene_count(&self) -> usize {
        self.context.registry.lock().scenes().len()
    }

    fn lookup_by_primary_key(&self, query: &LocationQuery) -> Option<Arc<SceneEntry>> {
        let locations = match self.context.backend.resolve_locations_now(query) {
            Ok(locations) => locations,
            Err(err) => {
                tracing::error!("Scene lookup failed for {}: {}", query, err);
                return None;
            }
        };
        let primary_key = locations.first()?.primary_key();
        self.context.registry.lock().scene(primary_key)
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
            tracing::error!("Failed to spawn scene task: {}", err);
            op.fail(err);
        }
    }
}

async fn load_scene_task(
    context: Arc<ArmContext>,
    query: LocationQuery,
    mode: SceneMode,
    activate_on_load: bool,
    op: OperationHandle<Arc<SceneEntry>>,
) {
    let base = LoaderBase::new(context.clone());
    op.set_progress(0.0);

    let locations = base.resolve(&query).await;
    let Some(first) = locations.first() else {
        tracing::error!("Failed to find scene location for {}", query);
        op.fail(ArmError::NoLocations(query.to_string()));
        return;
    };
    op.set_progress(SCENE_LOCATION_SHARE);

    let key = first.primary_key().to_string();
    let existing = context.registry.lock().scene(&key);
    if let Some(existing) = existing {
        op.complete(existing);
        return;
    }

    let handle = match context.backend.load_scene(&key, mode, activate_on_load) {
        Ok(handle) => handle,
        Err(err) => {
            tracing::error!("Failed to start loading scene {}: {}", key, err);
            op.fail(err);
            return;
        }
    };
    base.wait_for(&handle, |percent| {
        op.set_progress(SCENE_LOCATION_SHARE + percent * (1.0 - SCENE_LOCATION_SHARE))
    })
    .await;

    if handle.status() != OperationStatus::Succeeded {
        let reason = handle.error().unwrap_or_else(|| "scene load failed".to_string());
        tracing::error!("Scene load failed for {}: {}", key, reason);
        if handle.is_valid() {
            unload_handle(&base, &key, &handle).await;
        }
        op.fail(ArmError::LoadFailed { key, reason });
        return;
    }

    let entry = Arc::new(SceneEntry::new(key.as_str(), mode, handle.clone()));
    let winner = {
        let mut registry = context.registry.lock();
        match registry.scene(&key) {
            Some(existing) => Some(existing),
            None => {
                registry.insert_scene(entry.clone());
                None
            }
        }
    };

    if let Some(existing) = winner {
        tracing::debug!("Scene {} was loaded during async wait. Unloading duplicate.", key);
        unload_handle(&base, &key, &handle).await;
        op.complete(existing);
        return;
    }

    tracing::debug!(
        "Scene loaded: {}, Mode: {:?}, Activated: {}",
        key,
        mode,
        activate_on_load
    );
    op.complete(entry);
}

async fn unload_handle(base: &LoaderBase, key: &str, handle: &LoadHandle) {
    match base.context.backend.unload_scene(handle) {
        Ok(unload) => base.wait_for(&unload, |_| {}).await,
        Err(err) => {
            tracing::error!("Failed to unload scene {}: {}", key, err);
            release_quietly(key, handle);
        }
    }
}

async fn unload_scene_task(context: Arc<ArmContext>, entry: Arc<SceneEntry>, op: OperationHandle<bool>) {
    let base = LoaderBase::new(context.clone());
    op.set_progress(0.0);

    context.registry.lock().remove_scene(entry.key());

    let unload = match context.backend.unload_scene(entry.handle()) {
        Ok(unload) => unload,
        Err(err) => {
            tracing::error!("Failed to unload scene {}: {}", entry.key(), err);
            op.fail(err);
            return;
        }
    };
    base.wait_for(&unload, |percent| op.set_progress(percent)).await;

    if unload.status() == OperationStatus::Failed {
        let reason = unload.error().unwrap_or_else(|| "scene unload failed".to_string());
        tracing::error!("Failed to unload scene {}: {}", entry.key(), reason);
        op.fail(ArmError::Backend(reason));
        return;
    }

    tracing::debug!("Scene unloaded: {}", entry.key());
    op.complete(true);
}

async fn activate_scene_task(context: Arc<ArmContext>, entry: Arc<SceneEntry>, op: OperationHandle<bool>) {
    op.set_progress(0.0);

    let activation = match context.backend.activate_scene(entry.handle()) {
        Ok(activation) => activation,
        Err(err) => {
            tracing::error!("Failed to activate scene {}: {}", entry.key(), err);
            op.fail(err);
            return;
        }
    };

    // activation reports no usable percentage; advance a synthetic one
    let mut progress = 0.0f32;
    while !activation.is_done() {
        progress = (progress + ACTIVATION_STEP).min(ACTIVATION_CAP);
        op.set_progress(progress);
        context.backend.next_frame().await;
    }

    if activation.status() == OperationStatus::Failed {
        let reason = activation.error().unwrap_or_else(|| "scene activation failed".to_string());
        tracing::error!("Failed to activate scene {}: {}", entry.key(), reason);
        op.fail(ArmError::Backend(reason));
        return;
    }

    tracing::debug!("Scene activated: {}", entry.key());
    op.complete(true);
}

async fn unload_all_task(context: Arc<ArmContext>, op: OperationHandle<bool>) {
    let scenes = context.registry.lock().scenes();
    let count = scenes.len();

    for entry in scenes {
        if !entry.is_valid() {
            continue;
        }
        if count == 1 && entry.mode() == SceneMode::Single {
            tracing::warn!("Skipping unload of the only single scene {}", entry.key());
            continue;
        }

        let unload = OperationHandle::new();
        unload_scene_task(context.clone(), entry.clone(), unload.clone()).await;
        if let Some(err) = unload.error() {
            tracing::warn!("Unloading {} failed: {}", entry.key(), err);
        }
    }

    op.complete(true);
}
