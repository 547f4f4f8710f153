//! Frame-stepped in-memory backend.
//!
//! Nothing completes until [`MockBackend::advance_frame`] is called, which
//! makes interleavings between concurrent loads reproducible in tests.

use crate::backend::{AssetObject, AsyncOperation, LoadHandle, OperationStatus, ResourceBackend, SceneMode};
use crate::error::{ArmError, Result};
use crate::location::{AssetLabel, AssetReference, LocationQuery, ResourceLocation};
use ahash::{AHashMap, AHashSet};
use futures::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use std::any::Any;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

struct MockOpState {
    status: OperationStatus,
    total_frames: u32,
    elapsed_frames: u32,
    outcome: Option<std::result::Result<AssetObject, String>>,
    result: Option<AssetObject>,
    error: Option<String>,
    valid: bool,
    fail_release: bool,
    release_count: u32,
}

/// Operation whose progress advances one step per mock frame
pub struct MockOperation {
    state: Mutex<MockOpState>,
}

impl MockOperation {
    fn pending(outcome: std::result::Result<AssetObject, String>, frames: u32) -> Self {
        let op = Self {
            state: Mutex::new(MockOpState {
                status: OperationStatus::Pending,
                total_frames: frames,
                elapsed_frames: 0,
                outcome: Some(outcome),
                result: None,
                error: None,
                valid: true,
                fail_release: false,
                release_count: 0,
            }),
        };
        if frames == 0 {
            op.settle();
        }
        op
    }

    /// Already-succeeded operation
    pub fn succeeded(value: AssetObject) -> Self {
        Self::pending(Ok(value), 0)
    }

    /// Already-failed operation
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::pending(Err(reason.into()), 0)
    }

    fn settle(&self) {
        let mut state = self.state.lock();
        match state.outcome.take() {
            Some(Ok(value)) => {
                state.status = OperationStatus::Succeeded;
                state.result = Some(value);
            }
            Some(Err(reason)) => {
                state.status = OperationStatus::Failed;
                state.error = Some(reason);
            }
            None => {}
        }
    }

    /// Advance one frame; true once settled
    fn tick(&self) -> bool {
        let finished = {
            let mut state = self.state.lock();
            if state.status != OperationStatus::Pending {
                return true;
            }
            state.elapsed_frames += 1;
            state.elapsed_frames >= state.total_frames
        };
        if finished {
            self.settle();
        }
        finished
    }

    /// Make every future `release` call fail
    pub fn set_fail_release(&self, fail: bool) {
        self.state.lock().fail_release = fail;
    }

    /// Number of successful releases
    pub fn release_count(&self) -> u32 {
        self.state.lock().release_count
    }

    pub fn is_released(&self) -> bool {
        self.release_count() > 0
    }
}

impl AsyncOperation for MockOperation {
    fn status(&self) -> OperationStatus {
        self.state.lock().status
    }

    fn percent_complete(&self) -> f32 {
        let state = self.state.lock();
        match state.status {
            OperationStatus::Pending if state.total_frames > 0 => {
                state.elapsed_frames as f32 / state.total_frames as f32
            }
            OperationStatus::Pending => 0.0,
            _ => 1.0,
        }
    }

    fn result(&self) -> Option<AssetObject> {
        self.state.lock().result.clone()
    }

    fn error(&self) -> Option<String> {
        self.state.lock().error.clone()
    }

    fn is_valid(&self) -> bool {
        self.state.lock().valid
    }

    fn release(&self) -> Result<()> {
        let mut state = self.state.lock();
        if !state.valid {
            return Err(ArmError::Backend("handle already released".to_string()));
        }
        if state.fail_release {
            return Err(ArmError::Backend("release rejected".to_string()));
        }
        state.valid = false;
        state.release_count += 1;
        Ok(())
    }
}

/// Scene object produced by [`MockBackend::load_scene`]
#[derive(Debug)]
pub struct MockScene {
    pub key: String,
    pub mode: SceneMode,
    activated: AtomicBool,
}

impl MockScene {
    pub fn is_activated(&self) -> bool {
        self.activated.load(Ordering::Acquire)
    }
}

#[derive(Default)]
struct MockState {
    frame: u64,
    load_frames: u32,
    resolve_frames: u32,
    catalogue: AHashMap<LocationQuery, Vec<ResourceLocation>>,
    assets: AHashMap<ResourceLocation, AssetObject>,
    failing: AHashSet<ResourceLocation>,
    reject_release: AHashSet<ResourceLocation>,
    location_frames: AHashMap<ResourceLocation, u32>,
    scenes: AHashSet<String>,
    initialize_error: Option<String>,
    pending: Vec<Arc<MockOperation>>,
    loads: Vec<(ResourceLocation, Arc<MockOperation>)>,
    scene_ops: Vec<Arc<MockOperation>>,
    frame_wakers: Vec<Waker>,
}

/// In-memory [`ResourceBackend`] driven by explicit frame steps
#[derive(Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Loads settle after one frame, resolution is immediate
    pub fn new() -> Self {
        let backend = Self::default();
        backend.state.lock().load_frames = 1;
        backend
    }

    pub fn with_load_frames(self, frames: u32) -> Self {
        self.state.lock().load_frames = frames;
        self
    }

    pub fn with_resolve_frames(self, frames: u32) -> Self {
        self.state.lock().resolve_frames = frames;
        self
    }

    /// Register a loadable location; also resolvable by its primary key
    pub fn add_asset<T: Any + Send + Sync>(&self, location: ResourceLocation, value: T) {
        let mut state = self.state.lock();
        let query = LocationQuery::Key(location.primary_key().to_string());
        let list = state.catalogue.entry(query).or_default();
        if !list.contains(&location) {
            list.push(location.clone());
        }
        state.assets.insert(location, Arc::new(value));
    }

    /// Explicit resolution result for a key
    pub fn set_key_locations(&self, key: &str, locations: Vec<ResourceLocation>) {
        self.state
            .lock()
            .catalogue
            .insert(LocationQuery::Key(key.to_string()), locations);
    }

    pub fn set_reference_locations(&self, reference: AssetReference, locations: Vec<ResourceLocation>) {
        self.state
            .lock()
            .catalogue
            .insert(LocationQuery::Reference(reference), locations);
    }

    pub fn set_label_locations(&self, label: impl Into<AssetLabel>, locations: Vec<ResourceLocation>) {
        self.state
            .lock()
            .catalogue
            .insert(LocationQuery::Label(label.into()), locations);
    }

    /// Loads of this location settle as failed
    pub fn fail_location(&self, location: &ResourceLocation) {
        self.state.lock().failing.insert(location.clone());
    }

    /// Handles created for this location reject `release`
    pub fn reject_release_for(&self, location: &ResourceLocation) {
        self.state.lock().reject_release.insert(location.clone());
    }

    pub fn set_location_frames(&self, location: &ResourceLocation, frames: u32) {
        self.state.lock().location_frames.insert(location.clone(), frames);
    }

    pub fn add_scene(&self, key: &str) {
        let mut state = self.state.lock();
        state.scenes.insert(key.to_string());
        let location = ResourceLocation::new(key, Some("SceneInstance"), format!("Scenes/{key}.unity"));
        state
            .catalogue
            .insert(LocationQuery::Key(key.to_string()), vec![location]);
    }

    pub fn fail_initialize(&self, reason: impl Into<String>) {
        self.state.lock().initialize_error = Some(reason.into());
    }

    pub fn frame(&self) -> u64 {
        self.state.lock().frame
    }

    /// Step one frame: advance pending operations, then wake frame waiters
    pub fn advance_frame(&self) {
        let (pending, wakers) = {
            let mut state = self.state.lock();
            state.frame += 1;
            (state.pending.clone(), std::mem::take(&mut state.frame_wakers))
        };

        let settled: Vec<bool> = pending.iter().map(|op| op.tick()).collect();
        {
            let mut state = self.state.lock();
            let mut index = 0;
            state.pending.retain(|_| {
                let keep = !settled.get(index).copied().unwrap_or(false);
                index += 1;
                keep
            });
        }

        for waker in wakers {
            waker.wake();
        }
    }

    /// Total number of `load_asset` calls
    pub fn load_count(&self) -> usize {
        self.state.lock().loads.len()
    }

    /// Operations created for a location, in start order
    pub fn operations_for(&self, location: &ResourceLocation) -> Vec<Arc<MockOperation>> {
        self.state
            .lock()
            .loads
            .iter()
            .filter(|(loc, _)| loc == location)
            .map(|(_, op)| op.clone())
            .collect()
    }

    /// Asset load operations that are still valid (not released)
    pub fn live_handle_count(&self) -> usize {
        self.state
            .lock()
            .loads
            .iter()
            .filter(|(_, op)| op.is_valid())
            .count()
    }

    fn lookup(&self, query: &LocationQuery) -> Vec<ResourceLocation> {
        self.state
            .lock()
            .catalogue
            .get(query)
            .cloned()
            .unwrap_or_default()
    }

    fn start(&self, outcome: std::result::Result<AssetObject, String>, frames: u32) -> Arc<MockOperation> {
        let op = Arc::new(MockOperation::pending(outcome, frames));
        if op.status() == OperationStatus::Pending {
            self.state.lock().pending.push(op.clone());
        }
        op
    }
}

impl ResourceBackend for MockBackend {
    fn initialize(&self) -> BoxFuture<'_, Result<Vec<String>>> {
        let outcome = {
            let state = self.state.lock();
            match &state.initialize_error {
                Some(reason) => Err(ArmError::Backend(reason.clone())),
                None => {
                    let mut keys: Vec<String> = state
                        .catalogue
                        .keys()
                        .map(|query| match query {
                            LocationQuery::Key(key) => key.clone(),
                            LocationQuery::Label(label) => label.0.clone(),
                            LocationQuery::Reference(reference) => reference.guid.clone(),
                        })
                        .collect();
                    keys.sort();
                    Ok(keys)
                }
            }
        };
        let delay = self.next_frame();
        async move {
            delay.await;
            outcome
        }
        .boxed()
    }

    fn resolve_locations<'a>(
        &'a self,
        query: &'a LocationQuery,
    ) -> BoxFuture<'a, Result<Vec<ResourceLocation>>> {
        let delay = self.state.lock().resolve_frames;
        async move {
            for _ in 0..delay {
                self.next_frame().await;
            }
            Ok(self.lookup(query))
        }
        .boxed()
    }

    fn resolve_locations_now(&self, query: &LocationQuery) -> Result<Vec<ResourceLocation>> {
        Ok(self.lookup(query))
    }

    fn load_asset(&self, location: &ResourceLocation) -> Result<LoadHandle> {
        let (outcome, frames, reject_release) = {
            let state = self.state.lock();
            let frames = state
                .location_frames
                .get(location)
                .copied()
                .unwrap_or(state.load_frames);
            let outcome = if state.failing.contains(location) {
                Err(format!("mock load failure for {location}"))
            } else {
                match state.assets.get(location) {
                    Some(value) => Ok(value.clone()),
                    None => Err(format!("no asset registered for {location}")),
                }
            };
            (outcome, frames, state.reject_release.contains(location))
        };

        let op = self.start(outcome, frames);
        op.set_fail_release(reject_release);
        self.state.lock().loads.push((location.clone(), op.clone()));
        Ok(LoadHandle::from_arc(op))
    }

    fn next_frame(&self) -> BoxFuture<'static, ()> {
        let target = self.frame() + 1;
        NextFrame {
            state: self.state.clone(),
            target,
        }
        .boxed()
    }

    fn load_scene(&self, key: &str, mode: SceneMode, activate_on_load: bool) -> Result<LoadHandle> {
        let (known, frames) = {
            let state = self.state.lock();
            (state.scenes.contains(key), state.load_frames)
        };
        let outcome: std::result::Result<AssetObject, String> = if known {
            Ok(Arc::new(MockScene {
                key: key.to_string(),
                mode,
                activated: AtomicBool::new(activate_on_load),
            }))
        } else {
            Err(format!("unknown scene {key}"))
        };
        let op = self.start(outcome, frames);
        self.state.lock().scene_ops.push(op.clone());
        Ok(LoadHandle::from_arc(op))
    }

    fn unload_scene(&self, scene: &LoadHandle) -> Result<LoadHandle> {
        scene.release()?;
        let frames = self.state.lock().load_frames;
        let op = self.start(Ok(Arc::new(())), frames);
        Ok(LoadHandle::from_arc(op))
    }

    fn activate_scene(&self, scene: &LoadHandle) -> Result<LoadHandle> {
        let instance = scene
            .result()
            .and_then(|obj| obj.downcast::<MockScene>().ok())
            .ok_or_else(|| ArmError::Backend("handle is not a scene".to_string()))?;
        instance.activated.store(true, Ordering::Release);
        let frames = self.state.lock().load_frames;
        let op = self.start(Ok(Arc::new(())), frames);
        Ok(LoadHandle::from_arc(op))
    }
}

struct NextFrame {
    state: Arc<Mutex<MockState>>,
    target: u64,
}

impl Future for NextFrame {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let mut state = self.state.lock();
        if state.frame >= self.target {
            Poll::Ready(())
        } else {
            state.frame_wakers.push(cx.waker().clone());
            Poll::Pending
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn test_operation_settles_after_frames() {
        let backend = MockBackend::new().with_load_frames(2);
        let location = ResourceLocation::new("a", Some("Text"), "a.txt");
        backend.add_asset(location.clone(), String::from("text"));

        let handle = backend.load_asset(&location).unwrap();
        assert!(!handle.is_done());
        backend.advance_frame();
        assert!((handle.percent_complete() - 0.5).abs() < f32::EPSILON);
        backend.advance_frame();
        assert_eq!(handle.status(), OperationStatus::Succeeded);
    }

    #[test]
    fn test_unknown_location_fails() {
        let backend = MockBackend::new().with_load_frames(0);
        let location = ResourceLocation::new("ghost", None, "ghost");
        let handle = backend.load_asset(&location).unwrap();
        assert_eq!(handle.status(), OperationStatus::Failed);
        assert!(handle.error().is_some());
    }

    #[test]
    fn test_double_release_is_error() {
        let op = MockOperation::succeeded(Arc::new(1u8));
        assert!(op.release().is_ok());
        assert!(op.release().is_err());
        assert_eq!(op.release_count(), 1);
    }

    #[test]
    fn test_resolve_by_primary_key() {
        let backend = MockBackend::new();
        let location = ResourceLocation::new("hero", Some("GameObject"), "hero.prefab");
        backend.add_asset(location.clone(), 1u32);
        let found = block_on(backend.resolve_locations(&LocationQuery::from("hero"))).unwrap();
        assert_eq!(found, vec![location]);
    }
}
