#![allow(dead_code)]

use asset_arm::backend::MockBackend;
use asset_arm::{Arm, ArmSettings, OperationHandle, ResourceLocation};
use futures::executor::LocalPool;

#[derive(Debug, PartialEq)]
pub struct Sprite(pub &'static str);

#[derive(Debug, PartialEq)]
pub struct Texture(pub u32);

/// Frame-stepped manager over a mock backend
pub struct Harness {
    pub pool: LocalPool,
    pub backend: MockBackend,
    pub arm: Arm,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_backend(MockBackend::new())
    }

    pub fn with_backend(backend: MockBackend) -> Self {
        let pool = LocalPool::new();
        let arm = Arm::new(backend.clone(), pool.spawner(), ArmSettings::default());
        Self { pool, backend, arm }
    }

    /// Activated harness
    pub fn activated() -> Self {
        let mut harness = Self::new();
        harness.activate();
        harness
    }

    pub fn activate(&mut self) {
        let op = self.arm.activate();
        self.drive(&op);
        assert!(!op.has_error(), "activation failed: {:?}", op.error());
    }

    /// Run spawned tasks until they block
    pub fn run(&mut self) {
        self.pool.run_until_stalled();
    }

    /// Advance one frame and run tasks
    pub fn frame(&mut self) {
        self.backend.advance_frame();
        self.pool.run_until_stalled();
    }

    /// Run frames until `op` is done
    pub fn drive<T: Clone + Send + 'static>(&mut self, op: &OperationHandle<T>) {
        self.run();
        for _ in 0..500 {
            if op.is_done() {
                return;
            }
            self.frame();
        }
        panic!("operation did not finish");
    }
}

pub fn location(key: &str, ty: &str, id: &str) -> ResourceLocation {
    ResourceLocation::new(key, Some(ty), id)
}

/// Progress values never decrease and never exceed 1
pub fn assert_monotonic(values: &[f32]) {
    for pair in values.windows(2) {
        assert!(pair[1] >= pair[0], "progress went backwards: {values:?}");
    }
    assert!(values.iter().all(|p| *p <= 1.0), "progress above 1: {values:?}");
}
