//! Handle tracking
//!
//! Every handle obtained for a key is recorded here, independent of the
//! asset registry, so that it is released exactly once even when entry
//! bookkeeping is bypassed.

use crate::backend::LoadHandle;
use crate::error::ArmError;
use ahash::AHashMap;
use smallvec::SmallVec;

type HandleList = SmallVec<[LoadHandle; 4]>;

/// Key -> outstanding load handles
#[derive(Default)]
pub struct HandleTracker {
    tracked: AHashMap<String, HandleList>,
}

impl HandleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `handle` under `key`; invalid handles are ignored
    pub fn track(&mut self, key: &str, handle: LoadHandle) {
        if !handle.is_valid() {
            return;
        }
        self.tracked.entry(key.to_string()).or_default().push(handle);
    }

    /// Release every valid handle under `key` and forget the key.
    ///
    /// Release failures are logged and do not stop the remaining releases.
    pub fn release_handles(&mut self, key: &str) {
        let Some(handles) = self.tracked.remove(key) else {
            return;
        };
        release_list(key, &handles);
    }

    /// Release every tracked handle and clear all state
    pub fn release_all(&mut self) {
        for (key, handles) in self.tracked.drain() {
            release_list(&key, &handles);
        }
    }

    /// Number of handles tracked under `key`
    pub fn tracked_count(&self, key: &str) -> usize {
        self.tracked.get(key).map(|list| list.len()).unwrap_or(0)
    }

    pub fn total_tracked(&self) -> usize {
        self.tracked.values().map(|list| list.len()).sum()
    }

    pub fn is_tracked(&self, key: &str) -> bool {
        self.tracked.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.tracked.keys().map(String::as_str)
    }
}

fn release_list(key: &str, handles: &[LoadHandle]) {
    for handle in handles.iter().filter(|h| h.is_valid()) {
        if let Err(err) = handle.release() {
            let err = ArmError::ReleaseFailed {
                key: key.to_string(),
                reason: err.to_string(),
            };
            tracing::error!("{}", err);
        }
    }
}
