//! Asset registry
//!
//! Key -> [`AssetEntry`], label -> resolved locations, scene key ->
//! [`SceneEntry`], plus the key catalogue recorded at activation.

use crate::assets::AssetEntry;
use crate::location::{AssetLabel, ResourceLocation};
use crate::scenes::SceneEntry;
use ahash::{AHashMap, AHashSet};
use std::sync::Arc;

#[derive(Default)]
pub struct AssetRegistry {
    assets: AHashMap<String, Arc<AssetEntry>>,
    label_locations: AHashMap<AssetLabel, Vec<ResourceLocation>>,
    scenes: AHashMap<String, Arc<SceneEntry>>,
    keys: AHashSet<String>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all assets, scenes, label caches and keys
    pub fn clear(&mut self) {
        self.assets.clear();
        self.label_locations.clear();
        self.scenes.clear();
        self.keys.clear();
    }

    pub fn add_key(&mut self, key: impl Into<String>) {
        self.keys.insert(key.into());
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    pub fn try_get_asset(&self, key: &str) -> Option<Arc<AssetEntry>> {
        self.assets.get(key).cloned()
    }

    /// Insert or replace the entry for `key`
    pub fn add_asset(&mut self, key: impl Into<String>, entry: Arc<AssetEntry>) {
        self.assets.insert(key.into(), entry);
    }

    pub fn remove_asset(&mut self, key: &str) -> Option<Arc<AssetEntry>> {
        self.assets.remove(key)
    }

    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }

    pub fn assets(&self) -> impl Iterator<Item = &Arc<AssetEntry>> {
        self.assets.values()
    }

    /// Keys of every batch-loaded entry
    pub fn batch_keys(&self) -> Vec<String> {
        self.assets
            .iter()
            .filter(|(_, entry)| entry.is_batch_loaded())
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// An entry for the location's primary key already holds the location
    pub fn is_location_loaded(&self, location: &ResourceLocation) -> bool {
        self.assets
            .get(location.primary_key())
            .is_some_and(|entry| entry.contains_location(location))
    }

    pub fn label_locations(&self, label: &AssetLabel) -> Option<&[ResourceLocation]> {
        self.label_locations.get(label).map(Vec::as_slice)
    }

    pub fn is_label_cached(&self, label: &AssetLabel) -> bool {
        self.label_locations.contains_key(label)
    }

    pub fn cache_label(&mut self, label: AssetLabel, locations: Vec<ResourceLocation>) {
        self.label_locations.insert(label, locations);
    }

    pub fn take_label(&mut self, label: &AssetLabel) -> Option<Vec<ResourceLocation>> {
        self.label_locations.remove(label)
    }

    pub fn cached_labels(&self) -> Vec<AssetLabel> {
        let mut labels: Vec<_> = self.label_locations.keys().cloned().collect();
        labels.sort();
        labels
    }

    pub fn clear_labels(&mut self) {
        self.label_locations.clear();
    }

    pub fn scene(&self, key: &str) -> Option<Arc<SceneEntry>> {
        self.scenes.get(key).cloned()
    }

    pub fn insert_scene(&mut self, entry: Arc<SceneEntry>) {
        self.scenes.insert(entry.key().to_string(), entry);
    }

    pub fn remove_scene(&mut self, key: &str) -> Option<Arc<SceneEntry>> {
        self.scenes.remove(key)
    }

    pub fn scenes(&self) -> Vec<Arc<SceneEntry>> {
        self.scenes.values().cloned().collect()
    }
}
