//! Example: loading, sharing and releasing one asset
//!
//! Two requests for the same key share one entry. The entry's handles are
//! released when the last reference is returned.

use asset_arm::backend::MockBackend;
use asset_arm::events::{AssetReleased, FnSubscriber};
use asset_arm::{Arm, ArmSettings, OperationHandle, ResourceLocation};
use futures::executor::LocalPool;
use std::sync::Arc;

#[derive(Debug)]
struct Texture {
    width: u32,
    height: u32,
}

fn drive<T: Clone + Send + 'static>(pool: &mut LocalPool, backend: &MockBackend, op: &OperationHandle<T>) {
    pool.run_until_stalled();
    while !op.is_done() {
        backend.advance_frame();
        pool.run_until_stalled();
    }
}

#[cfg(feature = "profiling")]
fn init_logging(arm: &Arm) {
    if let Err(err) = arm.init_logging() {
        println!("Logging disabled: {err}");
    }
}

#[cfg(not(feature = "profiling"))]
fn init_logging(_arm: &Arm) {}

fn main() {
    let mut pool = LocalPool::new();
    let backend = MockBackend::new().with_load_frames(3);
    let hero = ResourceLocation::new("hero", Some("Texture2D"), "Characters/hero.png");
    backend.add_asset(hero.clone(), Texture { width: 256, height: 256 });

    let settings = ArmSettings::from_json_str(r#"{ "log_level": "Info", "location_share": 0.2 }"#)
        .unwrap_or_default();
    let arm = Arm::new(backend.clone(), pool.spawner(), settings);
    init_logging(&arm);
    arm.subscribe::<AssetReleased>(Box::new(FnSubscriber::new(|e: &AssetReleased| {
        println!("Released {}", e.key);
    })));

    let activation = arm.activate();
    drive(&mut pool, &backend, &activation);
    println!("Activated with {:?} keys", activation.result());

    let first = arm.assets().load("hero");
    let second = arm.assets().load("hero");
    first.on_progress_changed(|p| println!("Progress {:.0}%", p * 100.0));
    drive(&mut pool, &backend, &first);
    drive(&mut pool, &backend, &second);

    let (Some(entry), Some(other)) = (first.result(), second.result()) else {
        println!("Load failed: {:?}", first.error());
        return;
    };
    println!("Both requests share one entry: {}", Arc::ptr_eq(&entry, &other));

    if let Some(texture) = entry.get::<Texture>() {
        println!("hero is {}x{}", texture.width, texture.height);
    }
    if other.get::<Texture>().is_some() {
        println!("hero again, {} references", entry.reference_count());
    }

    arm.snapshot().print_summary();

    entry.release();
    other.release();
    if let Err(err) = arm.process_events() {
        println!("Event delivery failed: {err}");
    }

    println!("Live handles after release: {}", backend.live_handle_count());
}
