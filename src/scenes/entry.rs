use crate::backend::{AssetObject, LoadHandle, OperationStatus, SceneMode};
use std::any::Any;
use std::sync::Arc;

/// A loaded scene and the handle that keeps it alive
#[derive(Debug)]
pub struct SceneEntry {
    key: String,
    mode: SceneMode,
    handle: LoadHandle,
}

impl SceneEntry {
    pub(crate) fn new(key: impl Into<String>, mode: SceneMode, handle: LoadHandle) -> Self {
        Self {
            key: key.into(),
            mode,
            handle,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn mode(&self) -> SceneMode {
        self.mode
    }

    pub fn handle(&self) -> &LoadHandle {
        &self.handle
    }

    /// Handle is still valid and the load succeeded
    pub fn is_valid(&self) -> bool {
        self.handle.is_valid() && self.handle.status() == OperationStatus::Succeeded
    }

    /// Backend scene object
    pub fn instance(&self) -> Option<AssetObject> {
        self.handle.result()
    }

    pub fn instance_as<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.instance()?.downcast::<T>().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{AsyncOperation, MockOperation};

    #[test]
    fn test_validity_follows_handle() {
        let op = Arc::new(MockOperation::succeeded(Arc::new(String::from("scene"))));
        let entry = SceneEntry::new("Main", SceneMode::Single, LoadHandle::from_arc(op.clone()));
        assert!(entry.is_valid());
        assert_eq!(entry.instance_as::<String>().unwrap().as_str(), "scene");

        op.release().unwrap();
        assert!(!entry.is_valid());
    }

    #[test]
    fn test_failed_load_is_invalid() {
        let entry = SceneEntry::new(
            "Broken",
            SceneMode::Additive,
            LoadHandle::new(MockOperation::failed("missing bundle")),
        );
        assert!(!entry.is_valid());
        assert!(entry.instance().is_none());
    }
}
