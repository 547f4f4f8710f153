// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Asset reference manager root

use crate::assets::AssetController;
use crate::backend::{ResourceBackend, TaskSpawner};
use crate::context::ArmContext;
use crate::debug::RegistrySnapshot;
use crate::error::Result;
use crate::events::{ActivateCompleted, ActivateFailed, Event, EventSubscriber};
use crate::operation::OperationHandle;
use crate::scenes::SceneController;
use crate::settings::ArmSettings;
use futures::future::FutureExt;
use std::rc::Rc;
use std::sync::Arc;

#[cfg(feature = "profiling")]
use tracing::{info_span, Instrument};

/// Owns the registry, tracker, backend and controllers of one manager.
///
/// Nothing is loaded before [`Arm::activate`] completes.
pub struct Arm {
    context: Arc<ArmContext>,
    spawner: Rc<dyn TaskSpawner>,
    assets: AssetController,
    scenes: SceneController,
}

impl Arm {
    pub fn new<B, S>(backend: B, spawner: S, settings: ArmSettings) -> Self
    where
        B: ResourceBackend,
        S: TaskSpawner + 'static,
    {
        Self::from_parts(Arc::new(backend), Rc::new(spawner), settings)
    }

    pub fn from_parts(backend: Arc<dyn ResourceBackend>, spawner: Rc<dyn TaskSpawner>, settings: ArmSettings) -> Self {
        let context = ArmContext::new(backend, settings);
        Self {
            assets: AssetController::new(context.clone(), spawner.clone()),
            scenes: SceneController::new(context.clone(), spawner.clone()),
            context,
            spawner,
        }
    }

    /// Reset all bookkeeping and initialize the backend.
    ///
    /// Registered assets, scenes and cached labels are dropped and every
    /// tracked handle is released before the backend initializes. The
    /// returned operation yields the number of catalogue keys.
    pub fn activate(&self) -> OperationHandle<usize> {
        self.context.reset();

        let op = OperationHandle::with_threshold(self.context.settings.progress_threshold);
        let context = self.context.clone();
        let task_op = op.clone();
        let task = async move { activate_task(context, task_op).await };
        #[cfg(feature = "profiling")]
        let task = task.instrument(info_span!("activate"));

        if let Err(err) = self.spawner.spawn_task(task.boxed()) {
            tracing::error!("Failed to spawn activation: {}", err);
            op.fail(err);
        }
        op
    }

    pub fn is_initialized(&self) -> bool {
        self.context.is_initialized()
    }

    pub fn assets(&self) -> &AssetController {
        &self.assets
    }

    pub fn scenes(&self) -> &SceneController {
        &self.scenes
    }

    pub fn settings(&self) -> &ArmSettings {
        &self.context.settings
    }

    /// Install a console subscriber at this manager's configured log level
    #[cfg(feature = "profiling")]
    pub fn init_logging(&self) -> Result<()> {
        crate::debug::init_logging(&self.context.settings)
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot::capture(&self.context)
    }

    pub fn subscribe<E: Event>(&self, subscriber: Box<dyn EventSubscriber>) {
        self.context.events.lock().subscribe::<E>(subscriber);
    }

    pub fn subscribe_all(&self, subscriber: Box<dyn EventSubscriber>) {
        self.context.events.lock().subscribe_all(subscriber);
    }

    /// Deliver queued lifecycle events.
    ///
    /// Subscribers run without the bus locked, so they may call back into
    /// the manager.
    pub fn process_events(&self) -> Result<()> {
        let mut taken = std::mem::take(&mut *self.context.events.lock());
        let result = taken.process_events();
        self.context.events.lock().restore(taken);
        result
    }
}

async fn activate_task(context: Arc<ArmContext>, op: OperationHandle<usize>) {
    match context.backend.initialize().await {
        Ok(keys) => {
            let key_count = keys.len();
            {
                let mut registry = context.registry.lock();
                for key in keys {
                    registry.add_key(key);
                }
            }
            context.set_initialized(true);
            tracing::debug!("Resource backend initialized with {} keys", key_count);
            context.publish(ActivateCompleted { key_count });
            op.complete(key_count);
        }
        Err(err) => {
            tracing::error!("Failed to initialize resource backend: {}", err);
            context.publish(ActivateFailed {
                reason: err.to_string(),
            });
            op.fail(err);
        }
    }
}
