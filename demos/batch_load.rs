//! Example: label batch loading
//!
//! Loads every location under two labels, then swaps one label set for
//! another and releases what is no longer needed.

use asset_arm::backend::MockBackend;
use asset_arm::{Arm, ArmSettings, AssetLabel, OperationHandle, ResourceLocation};
use futures::executor::LocalPool;

fn drive<T: Clone + Send + 'static>(pool: &mut LocalPool, backend: &MockBackend, op: &OperationHandle<T>) {
    pool.run_until_stalled();
    while !op.is_done() {
        backend.advance_frame();
        pool.run_until_stalled();
    }
}

fn labelled(backend: &MockBackend, label: &str, names: &[&str]) {
    let locations: Vec<_> = names
        .iter()
        .map(|name| ResourceLocation::new(*name, Some("Sprite"), format!("{label}/{name}.png")))
        .collect();
    for location in &locations {
        backend.add_asset(location.clone(), location.internal_id().to_string());
    }
    backend.set_label_locations(label, locations);
}

fn main() {
    let mut pool = LocalPool::new();
    let backend = MockBackend::new().with_load_frames(2);
    labelled(&backend, "menu", &["title", "button", "cursor"]);
    labelled(&backend, "hud", &["health", "ammo", "cursor"]);
    labelled(&backend, "level1", &["floor", "wall"]);

    let arm = Arm::new(backend.clone(), pool.spawner(), ArmSettings::default());
    let activation = arm.activate();
    drive(&mut pool, &backend, &activation);

    let current = [AssetLabel::from("menu"), AssetLabel::from("hud")];
    let op = arm.assets().batch_load(&arm.assets().labels_to_load(&current));
    op.on_progress_changed(|p| println!("Batch progress {:.0}%", p * 100.0));
    drive(&mut pool, &backend, &op);
    println!("Batch finished: {:?}", op.result());

    if let Some(cursor) = arm.assets().try_get_loaded_entry("cursor") {
        println!("cursor -> {:?} (batch: {})", cursor.get::<String>(), cursor.is_batch_loaded());
    }

    let next = [AssetLabel::from("hud"), AssetLabel::from("level1")];
    let unload = arm.assets().diff_labels_to_unload(&current, &next);
    let load = arm.assets().diff_labels_to_load(&current, &next);
    println!("Unloading {unload:?}, loading {load:?}");

    arm.assets().release_batches(&unload);
    let op = arm.assets().batch_load(&load);
    drive(&mut pool, &backend, &op);

    arm.snapshot().print_summary();

    arm.assets().release_all_batches();
    println!("Live handles after release: {}", backend.live_handle_count());
}
