use asset_arm::backend::{MockBackend, MockOperation};
use asset_arm::events::{AssetReleased, Event, EventBus, EventSubscriber};
use asset_arm::tracking::HandleTracker;
use asset_arm::{Arm, ArmSettings, AssetLabel, LoadHandle, ResourceLocation, Result};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use futures::executor::LocalPool;
use std::sync::Arc;

struct NoOpSubscriber;
impl EventSubscriber for NoOpSubscriber {
    fn on_event(&mut self, _event: &dyn Event) -> Result<()> {
        Ok(())
    }
}

fn activated(pool: &mut LocalPool, backend: &MockBackend) -> Arm {
    let arm = Arm::new(backend.clone(), pool.spawner(), ArmSettings::default());
    let op = arm.activate();
    while !op.is_done() {
        backend.advance_frame();
        pool.run_until_stalled();
    }
    arm
}

fn bench_track_release_1000_handles(c: &mut Criterion) {
    c.bench_function("track_release_1000_handles", |b| {
        b.iter(|| {
            let mut tracker = HandleTracker::new();
            for i in 0..1000u32 {
                let key = format!("asset{}", i % 100);
                tracker.track(&key, LoadHandle::new(MockOperation::succeeded(Arc::new(i))));
            }
            black_box(tracker.total_tracked());
            tracker.release_all();
        })
    });
}

fn bench_individual_load_100_keys(c: &mut Criterion) {
    c.bench_function("individual_load_100_keys", |b| {
        b.iter(|| {
            let mut pool = LocalPool::new();
            let backend = MockBackend::new();
            for i in 0..100u32 {
                backend.add_asset(
                    ResourceLocation::new(format!("asset{i}"), Some("Texture2D"), format!("{i}.png")),
                    i,
                );
            }
            let arm = activated(&mut pool, &backend);

            let ops: Vec<_> = (0..100).map(|i| arm.assets().load(&format!("asset{i}"))).collect();
            pool.run_until_stalled();
            backend.advance_frame();
            pool.run_until_stalled();

            for op in ops {
                let entry = op.result().unwrap();
                black_box(entry.get::<u32>());
                entry.release();
            }
        })
    });
}

fn bench_batch_load_release(c: &mut Criterion) {
    c.bench_function("batch_load_release_200_locations", |b| {
        b.iter(|| {
            let mut pool = LocalPool::new();
            let backend = MockBackend::new().with_load_frames(0);
            let locations: Vec<_> = (0..200u32)
                .map(|i| ResourceLocation::new(format!("ui{i}"), Some("Sprite"), format!("ui/{i}.png")))
                .collect();
            for (i, location) in locations.iter().enumerate() {
                backend.add_asset(location.clone(), i);
            }
            backend.set_label_locations("ui", locations);
            let arm = activated(&mut pool, &backend);

            let op = arm.assets().batch_load(&[AssetLabel::from("ui")]);
            pool.run_until_stalled();
            black_box(op.result());
            arm.assets().release_all_batches();
        })
    });
}

fn bench_process_1000_release_events(c: &mut Criterion) {
    c.bench_function("process_1000_release_events_10_subs", |b| {
        b.iter(|| {
            let mut bus = EventBus::new();
            for _ in 0..10 {
                bus.subscribe::<AssetReleased>(Box::new(NoOpSubscriber));
            }
            for i in 0..1000 {
                bus.publish_event(AssetReleased {
                    key: format!("asset{i}"),
                });
            }
            bus.process_events().unwrap();
        })
    });
}

criterion_group!(
    benches,
    bench_track_release_1000_handles,
    bench_individual_load_100_keys,
    bench_batch_load_release,
    bench_process_1000_release_events
);
criterion_main!(benches);
