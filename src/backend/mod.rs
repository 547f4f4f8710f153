// Resource Backend Module
//
// The inbound seam to the host engine:
// - Location resolution (key / reference / label -> locations)
// - Typed loading by location, scene loading
// - Per-frame yield point used to poll in-flight operations
// - Task spawning for fire-and-forget loader futures

pub mod mock;

pub use mock::{MockBackend, MockOperation, MockScene};

use crate::error::{ArmError, Result};
use crate::location::{LocationQuery, ResourceLocation};
use futures::future::BoxFuture;
use futures::task::{Spawn, SpawnExt};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Type-erased result of a load operation
pub type AssetObject = Arc<dyn Any + Send + Sync>;

/// Completion status of a backend operation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationStatus {
    Pending,
    Succeeded,
    Failed,
}

/// How a scene is added to the running game
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SceneMode {
    /// Replaces all loaded scenes
    Single,
    /// Loaded alongside existing scenes
    #[default]
    Additive,
}

/// An asynchronous operation owned by the backend
pub trait AsyncOperation: Send + Sync {
    /// Current status
    fn status(&self) -> OperationStatus;

    /// Fractional completion in [0, 1]
    fn percent_complete(&self) -> f32;

    /// Result object once succeeded
    fn result(&self) -> Option<AssetObject>;

    /// Failure description once failed
    fn error(&self) -> Option<String> {
        None
    }

    /// False once released
    fn is_valid(&self) -> bool;

    /// Free the underlying resources
    fn release(&self) -> Result<()>;
}

/// Cheap, cloneable handle to a backend operation
#[derive(Clone)]
pub struct LoadHandle {
    op: Arc<dyn AsyncOperation>,
}

impl LoadHandle {
    pub fn new<O: AsyncOperation + 'static>(op: O) -> Self {
        Self { op: Arc::new(op) }
    }

    pub fn from_arc(op: Arc<dyn AsyncOperation>) -> Self {
        Self { op }
    }

    #[inline]
    pub fn status(&self) -> OperationStatus {
        self.op.status()
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        self.op.status() != OperationStatus::Pending
    }

    #[inline]
    pub fn percent_complete(&self) -> f32 {
        self.op.percent_complete().clamp(0.0, 1.0)
    }

    #[inline]
    pub fn result(&self) -> Option<AssetObject> {
        self.op.result()
    }

    pub fn error(&self) -> Option<String> {
        self.op.error()
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.op.is_valid()
    }

    pub fn release(&self) -> Result<()> {
        self.op.release()
    }

    /// True when both handles refer to the same backend operation
    pub fn ptr_eq(&self, other: &LoadHandle) -> bool {
        Arc::ptr_eq(&self.op, &other.op)
    }
}

impl fmt::Debug for LoadHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadHandle")
            .field("status", &self.status())
            .field("percent", &self.percent_complete())
            .field("valid", &self.is_valid())
            .finish()
    }
}

/// The host engine's resource system
pub trait ResourceBackend: Send + Sync + 'static {
    /// Initialize the backend; yields every key in its catalogue
    fn initialize(&self) -> BoxFuture<'_, Result<Vec<String>>>;

    /// Resolve a query into resource locations
    fn resolve_locations<'a>(
        &'a self,
        query: &'a LocationQuery,
    ) -> BoxFuture<'a, Result<Vec<ResourceLocation>>>;

    /// Blocking resolution for synchronous lookups
    fn resolve_locations_now(&self, query: &LocationQuery) -> Result<Vec<ResourceLocation>>;

    /// Start loading a single location
    fn load_asset(&self, location: &ResourceLocation) -> Result<LoadHandle>;

    /// Resolves on the next engine frame
    fn next_frame(&self) -> BoxFuture<'static, ()>;

    fn load_scene(&self, _key: &str, _mode: SceneMode, _activate_on_load: bool) -> Result<LoadHandle> {
        Err(ArmError::Unsupported("load_scene"))
    }

    fn unload_scene(&self, _scene: &LoadHandle) -> Result<LoadHandle> {
        Err(ArmError::Unsupported("unload_scene"))
    }

    fn activate_scene(&self, _scene: &LoadHandle) -> Result<LoadHandle> {
        Err(ArmError::Unsupported("activate_scene"))
    }
}

/// Executor seam for loader tasks
pub trait TaskSpawner {
    fn spawn_task(&self, task: BoxFuture<'static, ()>) -> Result<()>;
}

impl<S: Spawn + ?Sized> TaskSpawner for S {
    fn spawn_task(&self, task: BoxFuture<'static, ()>) -> Result<()> {
        self.spawn(task)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_handle_ptr_eq() {
        let op = Arc::new(MockOperation::succeeded(Arc::new(7u32)));
        let a = LoadHandle::from_arc(op.clone());
        let b = a.clone();
        let c = LoadHandle::from_arc(Arc::new(MockOperation::succeeded(Arc::new(7u32))));
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&c));
    }

    #[test]
    fn test_load_handle_reads_result() {
        let handle = LoadHandle::new(MockOperation::succeeded(Arc::new(String::from("hello"))));
        assert!(handle.is_done());
        assert_eq!(handle.status(), OperationStatus::Succeeded);
        let value = handle.result().unwrap().downcast::<String>().unwrap();
        assert_eq!(value.as_str(), "hello");
    }
}
