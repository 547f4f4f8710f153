//! Label set helpers for deciding what to batch load or release

use crate::location::AssetLabel;
use crate::registry::AssetRegistry;
use ahash::AHashSet;

/// Labels from `new` whose locations are not cached yet
pub fn labels_to_load(registry: &AssetRegistry, new: &[AssetLabel]) -> Vec<AssetLabel> {
    new.iter()
        .filter(|label| !registry.is_label_cached(label))
        .cloned()
        .collect()
}

/// Cached labels not in `required`; every cached label when `required` is empty
pub fn labels_to_unload(registry: &AssetRegistry, required: &[AssetLabel]) -> Vec<AssetLabel> {
    let required: AHashSet<&AssetLabel> = required.iter().collect();
    registry
        .cached_labels()
        .into_iter()
        .filter(|label| !required.contains(label))
        .collect()
}

/// Labels in `new` but not `current` that still need loading
pub fn diff_labels_to_load(
    registry: &AssetRegistry,
    current: &[AssetLabel],
    new: &[AssetLabel],
) -> Vec<AssetLabel> {
    let current: AHashSet<&AssetLabel> = current.iter().collect();
    let unique: Vec<AssetLabel> = new
        .iter()
        .filter(|label| !current.contains(label))
        .cloned()
        .collect();
    labels_to_load(registry, &unique)
}

/// Labels in `current` that `new` no longer needs
pub fn diff_labels_to_unload(current: &[AssetLabel], new: &[AssetLabel]) -> Vec<AssetLabel> {
    let new: AHashSet<&AssetLabel> = new.iter().collect();
    current
        .iter()
        .filter(|label| !new.contains(label))
        .cloned()
        .collect()
}
