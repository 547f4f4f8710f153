use crate::backend::LoadHandle;
use crate::context::ArmContext;
use crate::location::ResourceLocation;
use ahash::AHashMap;
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

/// Location -> handle map keyed by structural location identity.
///
/// Iteration follows insertion order.
#[derive(Default)]
pub(crate) struct HandleMap {
    order: Vec<ResourceLocation>,
    handles: AHashMap<ResourceLocation, LoadHandle>,
}

impl HandleMap {
    pub fn contains(&self, location: &ResourceLocation) -> bool {
        self.handles.contains_key(location)
    }

    /// Insert unless a structurally equal location is present
    pub fn insert_if_absent(&mut self, location: ResourceLocation, handle: LoadHandle) -> bool {
        if self.handles.contains_key(&location) {
            return false;
        }
        self.order.push(location.clone());
        self.handles.insert(location, handle);
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ResourceLocation, &LoadHandle)> {
        self.order
            .iter()
            .filter_map(|location| self.handles.get(location).map(|handle| (location, handle)))
    }
}

struct EntryState {
    reference_count: u32,
    handle_map: HandleMap,
}

/// One logical asset: a reference count over the handles backing a key.
///
/// Reference counting happens at `get` granularity: every successful
/// [`AssetEntry::get`] must be balanced by one [`AssetEntry::release`].
/// Batch-loaded entries ignore `release` and only go away through the
/// batch release paths.
pub struct AssetEntry {
    key: String,
    is_batch_loaded: bool,
    state: Mutex<EntryState>,
    owner: Weak<ArmContext>,
}

impl AssetEntry {
    pub(crate) fn new(key: impl Into<String>, is_batch_loaded: bool, owner: Weak<ArmContext>) -> Self {
        Self {
            key: key.into(),
            is_batch_loaded,
            state: Mutex::new(EntryState {
                reference_count: 0,
                handle_map: HandleMap::default(),
            }),
            owner,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_batch_loaded(&self) -> bool {
        self.is_batch_loaded
    }

    pub fn reference_count(&self) -> u32 {
        self.state.lock().reference_count
    }

    pub fn handle_count(&self) -> usize {
        self.state.lock().handle_map.len()
    }

    pub fn locations(&self) -> Vec<ResourceLocation> {
        self.state
            .lock()
            .handle_map
            .iter()
            .map(|(location, _)| location.clone())
            .collect()
    }

    pub fn contains_location(&self, location: &ResourceLocation) -> bool {
        self.state.lock().handle_map.contains(location)
    }

    /// Handle stored for `location`, if any
    pub fn handle(&self, location: &ResourceLocation) -> Option<LoadHandle> {
        self.state.lock().handle_map.handles.get(location).cloned()
    }

    pub(crate) fn insert_if_absent(&self, location: ResourceLocation, handle: LoadHandle) -> bool {
        self.state.lock().handle_map.insert_if_absent(location, handle)
    }

    /// First loaded result of type `T`; counts as one reference
    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        let mut state = self.state.lock();
        let found = state
            .handle_map
            .iter()
            .filter_map(|(_, handle)| handle.result())
            .find_map(|object| object.downcast::<T>().ok());

        match found {
            Some(value) => {
                state.reference_count += 1;
                Some(value)
            }
            None => {
                tracing::warn!(
                    "Failed to get asset of type {} for key {}",
                    std::any::type_name::<T>(),
                    self.key
                );
                None
            }
        }
    }

    /// Drop one reference; the last one releases the key's handles
    pub fn release(&self) {
        {
            let mut state = self.state.lock();
            if self.is_batch_loaded {
                tracing::warn!("Batch loaded asset {} cannot be released.", self.key);
                return;
            }
            if state.reference_count == 0 {
                tracing::warn!(
                    "Attempting to release asset {} with reference count already at 0",
                    self.key
                );
                return;
            }
            state.reference_count -= 1;
            if state.reference_count > 0 {
                tracing::debug!(
                    "Reference count decreased to {} for asset {}",
                    state.reference_count,
                    self.key
                );
                return;
            }
        }

        match self.owner.upgrade() {
            Some(context) => context.release_asset(self),
            None => tracing::warn!("Asset {} outlived its manager; nothing to release", self.key),
        }
    }
}

impl fmt::Debug for AssetEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("AssetEntry")
            .field("key", &self.key)
            .field("is_batch_loaded", &self.is_batch_loaded)
            .field("reference_count", &state.reference_count)
            .field("handles", &state.handle_map.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockOperation;

    fn handle_of<T: Any + Send + Sync>(value: T) -> LoadHandle {
        LoadHandle::new(MockOperation::succeeded(Arc::new(value)))
    }

    #[test]
    fn test_handle_map_dedups_structurally() {
        let entry = AssetEntry::new("spriteA", false, Weak::new());
        let a = ResourceLocation::new("spriteA", Some("Sprite"), "a.png");
        let a_again = ResourceLocation::new("spriteA", Some("Sprite"), "a.png").with_provider("other");

        assert!(entry.insert_if_absent(a, handle_of(1u8)));
        assert!(!entry.insert_if_absent(a_again, handle_of(2u8)));
        assert_eq!(entry.handle_count(), 1);
    }

    #[test]
    fn test_get_counts_every_call() {
        let entry = AssetEntry::new("spriteA", false, Weak::new());
        entry.insert_if_absent(
            ResourceLocation::new("spriteA", Some("Texture2D"), "a.png"),
            handle_of(7u32),
        );
        entry.insert_if_absent(
            ResourceLocation::new("spriteA", Some("Sprite"), "a.png[s]"),
            handle_of(String::from("sprite")),
        );

        let sprite = entry.get::<String>().unwrap();
        assert_eq!(sprite.as_str(), "sprite");
        assert_eq!(*entry.get::<u32>().unwrap(), 7);
        assert_eq!(entry.reference_count(), 2);

        assert!(entry.get::<f64>().is_none());
        assert_eq!(entry.reference_count(), 2);
    }

    #[test]
    fn test_over_release_is_noop() {
        let entry = AssetEntry::new("k", false, Weak::new());
        entry.release();
        assert_eq!(entry.reference_count(), 0);
    }

    #[test]
    fn test_batch_entry_ignores_release() {
        let entry = AssetEntry::new("k", true, Weak::new());
        entry.insert_if_absent(ResourceLocation::new("k", None, "k"), handle_of(1u8));
        entry.get::<u8>().unwrap();
        entry.release();
        assert_eq!(entry.reference_count(), 1);
    }

    #[test]
    fn test_get_follows_insertion_order() {
        let entry = AssetEntry::new("k", false, Weak::new());
        for i in 0..8u32 {
            entry.insert_if_absent(ResourceLocation::new("k", None, format!("id{i}")), handle_of(i));
        }
        assert_eq!(*entry.get::<u32>().unwrap(), 0);
        let ids: Vec<_> = entry
            .locations()
            .iter()
            .map(|l| l.internal_id().to_string())
            .collect();
        assert_eq!(ids[0], "id0");
        assert_eq!(ids[7], "id7");
    }
}
