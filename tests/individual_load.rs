mod common;

use asset_arm::{ArmError, AssetReference};
use common::{assert_monotonic, location, Harness, Sprite, Texture};
use parking_lot::Mutex;
use std::sync::Arc;

#[test]
fn test_load_creates_entry_with_all_locations() {
    let mut h = Harness::activated();
    h.backend.add_asset(location("spriteA", "Texture2D", "a.png"), Texture(64));
    h.backend.add_asset(location("spriteA", "Sprite", "a.png[a]"), Sprite("a"));

    let op = h.arm.assets().load("spriteA");
    h.drive(&op);

    let entry = op.result().unwrap();
    assert_eq!(entry.key(), "spriteA");
    assert!(!entry.is_batch_loaded());
    assert_eq!(entry.handle_count(), 2);
    assert_eq!(entry.reference_count(), 0);
    assert_eq!(op.progress(), 1.0);

    let sprite = entry.get::<Sprite>().unwrap();
    assert_eq!(*sprite, Sprite("a"));
    assert_eq!(entry.reference_count(), 1);
}

#[test]
fn test_concurrent_loads_share_one_handle() {
    let mut h = Harness::activated();
    let loc = location("spriteA", "Sprite", "a.png");
    h.backend.add_asset(loc.clone(), Sprite("a"));

    let first = h.arm.assets().load("spriteA");
    let second = h.arm.assets().load("spriteA");
    h.drive(&first);
    h.drive(&second);

    let a = first.result().unwrap();
    let b = second.result().unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(a.handle_count(), 1);

    let ops = h.backend.operations_for(&loc);
    assert_eq!(ops.len(), 2);
    assert_eq!(ops.iter().filter(|op| op.is_released()).count(), 1);
    assert_eq!(h.arm.snapshot().entry("spriteA").unwrap().tracked_handles, 1);
}

#[test]
fn test_fill_missing_locations() {
    let mut h = Harness::activated();
    h.backend.add_asset(location("hero", "GameObject", "hero.prefab"), Texture(1));

    let op = h.arm.assets().load("hero");
    h.drive(&op);
    assert_eq!(op.result().unwrap().handle_count(), 1);

    h.backend.add_asset(location("hero", "Material", "hero.mat"), Texture(2));
    let loads_before = h.backend.load_count();
    let again = h.arm.assets().load("hero");
    h.drive(&again);

    let entry = again.result().unwrap();
    assert!(Arc::ptr_eq(&entry, &op.result().unwrap()));
    assert_eq!(entry.handle_count(), 2);
    assert_eq!(h.backend.load_count(), loads_before + 1);
}

#[test]
fn test_fully_loaded_key_completes_without_loading() {
    let mut h = Harness::activated();
    h.backend.add_asset(location("hero", "GameObject", "hero.prefab"), Texture(1));
    let op = h.arm.assets().load("hero");
    h.drive(&op);

    let loads_before = h.backend.load_count();
    let again = h.arm.assets().load("hero");
    h.run();

    assert!(again.is_done());
    assert_eq!(again.progress(), 1.0);
    assert_eq!(h.backend.load_count(), loads_before);
}

#[test]
fn test_unknown_key_fails() {
    let mut h = Harness::activated();
    let op = h.arm.assets().load("missing");
    h.drive(&op);

    assert!(op.has_error());
    assert!(matches!(op.error(), Some(ArmError::NoLocations(_))));
    assert!(h.arm.assets().try_get_loaded_entry("missing").is_none());
}

#[test]
fn test_failed_location_leaves_partial_entry() {
    let mut h = Harness::activated();
    let good = location("ui", "Sprite", "ok.png");
    let bad = location("ui", "Sprite", "broken.png");
    h.backend.add_asset(good.clone(), Sprite("ok"));
    h.backend.add_asset(bad.clone(), Sprite("broken"));
    h.backend.fail_location(&bad);

    let op = h.arm.assets().load("ui");
    h.drive(&op);

    let entry = op.result().unwrap();
    assert_eq!(entry.handle_count(), 1);
    assert!(entry.contains_location(&good));
    assert!(h.backend.operations_for(&bad)[0].is_released());
}

#[test]
fn test_load_before_activation_fails() {
    let mut h = Harness::new();
    let op = h.arm.assets().load("anything");
    h.run();
    assert_eq!(op.error(), Some(ArmError::NotInitialized));
}

#[test]
fn test_load_by_reference_uses_primary_key() {
    let mut h = Harness::activated();
    let loc = location("hero", "GameObject", "hero.prefab");
    let reference = AssetReference::new("6a1f0c");
    h.backend.add_asset(loc.clone(), Texture(3));
    h.backend.set_reference_locations(reference.clone(), vec![loc]);

    let op = h.arm.assets().load_reference(&reference);
    h.drive(&op);

    assert_eq!(op.result().unwrap().key(), "hero");
    let found = h.arm.assets().try_get_loaded_reference(&reference).unwrap();
    assert!(Arc::ptr_eq(&found, &op.result().unwrap()));
}

#[test]
fn test_try_get_loaded_entry_resolves_alias() {
    let mut h = Harness::activated();
    let loc = location("hero", "GameObject", "hero.prefab");
    h.backend.add_asset(loc.clone(), Texture(3));
    h.backend.set_key_locations("player", vec![loc]);

    let op = h.arm.assets().load("hero");
    h.drive(&op);

    assert!(h.arm.assets().try_get_loaded_entry("hero").is_some());
    assert!(h.arm.assets().try_get_loaded_entry("player").is_some());
    assert!(h.arm.assets().try_get_loaded_entry("villain").is_none());
}

#[test]
fn test_progress_is_monotonic() {
    let backend = asset_arm::backend::MockBackend::new().with_load_frames(4);
    let mut h = Harness::with_backend(backend);
    h.activate();
    for i in 0..3 {
        h.backend
            .add_asset(location("level", "Mesh", &format!("mesh{i}")), Texture(i));
    }

    let op = h.arm.assets().load("level");
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    op.on_progress_changed(move |p| sink.lock().push(p));
    h.drive(&op);

    let values = seen.lock().clone();
    assert!(values.len() > 3);
    assert_monotonic(&values);
    assert_eq!(values.last().copied(), Some(1.0));
}
