mod common;

use asset_arm::backend::MockScene;
use asset_arm::{ArmError, SceneMode};
use common::Harness;
use std::sync::Arc;

fn with_scenes(keys: &[&str]) -> Harness {
    let mut h = Harness::new();
    for key in keys {
        h.backend.add_scene(key);
    }
    h.activate();
    h
}

#[test]
fn test_load_scene_twice_returns_same_entry() {
    let mut h = with_scenes(&["Level1"]);

    let first = h.arm.scenes().load_scene("Level1", SceneMode::Single, true);
    h.drive(&first);
    let entry = first.result().unwrap();
    assert_eq!(entry.key(), "Level1");
    assert_eq!(entry.mode(), SceneMode::Single);

    let second = h.arm.scenes().load_scene("Level1", SceneMode::Single, true);
    assert!(second.is_done());
    assert!(Arc::ptr_eq(&entry, &second.result().unwrap()));
    assert_eq!(h.arm.scenes().loaded_scene_count(), 1);

    let unload = h.arm.scenes().unload_scene("Level1");
    h.drive(&unload);
    assert_eq!(unload.result(), Some(true));
    assert!(h.arm.scenes().try_get_loaded_scene("Level1").is_none());
    assert!(!entry.is_valid());
}

#[test]
fn test_unload_all_keeps_lone_single_scene() {
    let mut h = with_scenes(&["Main"]);
    let load = h.arm.scenes().load_scene("Main", SceneMode::Single, true);
    h.drive(&load);

    let op = h.arm.scenes().unload_all_scenes();
    h.drive(&op);

    assert_eq!(op.result(), Some(true));
    assert_eq!(h.arm.scenes().loaded_scene_count(), 1);
    assert!(load.result().unwrap().is_valid());
}

#[test]
fn test_unload_all_unloads_every_scene() {
    let mut h = with_scenes(&["Main", "Overlay"]);
    let main = h.arm.scenes().load_scene("Main", SceneMode::Single, true);
    let overlay = h.arm.scenes().load_scene("Overlay", SceneMode::Additive, true);
    h.drive(&main);
    h.drive(&overlay);
    assert_eq!(h.arm.scenes().loaded_scene_count(), 2);

    let op = h.arm.scenes().unload_all_scenes();
    h.drive(&op);

    assert_eq!(h.arm.scenes().loaded_scene_count(), 0);
    assert!(!main.result().unwrap().is_valid());
    assert!(!overlay.result().unwrap().is_valid());
}

#[test]
fn test_activate_deferred_scene() {
    let mut h = with_scenes(&["Arena"]);
    let load = h.arm.scenes().load_scene("Arena", SceneMode::Additive, false);
    h.drive(&load);
    let entry = load.result().unwrap();
    let scene = entry.instance_as::<MockScene>().unwrap();
    assert!(!scene.is_activated());

    let op = h.arm.scenes().activate_scene(&entry);
    h.drive(&op);

    assert_eq!(op.result(), Some(true));
    assert!(scene.is_activated());
    assert_eq!(op.progress(), 1.0);
}

#[test]
fn test_activate_unloaded_scene_fails() {
    let mut h = with_scenes(&["Arena"]);
    let load = h.arm.scenes().load_scene("Arena", SceneMode::Additive, false);
    h.drive(&load);
    let entry = load.result().unwrap();

    let unload = h.arm.scenes().unload_scene_entry(&entry);
    h.drive(&unload);

    let op = h.arm.scenes().activate_scene(&entry);
    assert_eq!(op.error(), Some(ArmError::InvalidSceneEntry));

    let again = h.arm.scenes().unload_scene_entry(&entry);
    assert_eq!(again.result(), Some(false));
}

#[test]
fn test_unknown_scene_fails_to_load() {
    let mut h = with_scenes(&[]);
    let op = h.arm.scenes().load_scene("Nowhere", SceneMode::Single, true);
    h.drive(&op);
    assert!(matches!(op.error(), Some(ArmError::NoLocations(_))));
    assert_eq!(h.arm.scenes().loaded_scene_count(), 0);
}

#[test]
fn test_unload_unknown_scene_completes_false() {
    let h = with_scenes(&[]);
    let op = h.arm.scenes().unload_scene("Nowhere");
    assert_eq!(op.result(), Some(false));
    assert!(!op.has_error());
}

#[test]
fn test_scene_calls_require_activation() {
    let h = Harness::new();
    let op = h.arm.scenes().unload_all_scenes();
    assert_eq!(op.error(), Some(ArmError::NotInitialized));
    let load = h.arm.scenes().load_scene("Main", SceneMode::Single, true);
    assert_eq!(load.error(), Some(ArmError::NotInitialized));
}

#[test]
fn test_reactivation_forgets_scenes() {
    let mut h = with_scenes(&["Main"]);
    let load = h.arm.scenes().load_scene("Main", SceneMode::Single, true);
    h.drive(&load);

    h.activate();
    assert_eq!(h.arm.scenes().loaded_scene_count(), 0);
}
