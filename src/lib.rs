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

//! Asset ARM - reference-counted asset management over an async resource backend
//!
//! Deduplicated loading per resource location, reference-counted release,
//! label batch loading and leak-safe handle tracking.
//!
//! Runnable programs live under `demos/` and are registered as cargo
//! examples: `cargo run --example individual_load` or
//! `cargo run --example batch_load`.

pub mod arm;
pub mod assets;
pub mod backend;
mod context;
pub mod debug;
pub mod error;
pub mod events;
pub mod location;
pub mod operation;
pub mod prelude;
pub mod registry;
pub mod scenes;
pub mod settings;
pub mod tracking;

pub use arm::Arm;
pub use assets::{AssetController, AssetEntry};
pub use backend::{
    AssetObject, AsyncOperation, LoadHandle, OperationStatus, ResourceBackend, SceneMode,
    TaskSpawner,
};
pub use error::{ArmError, Result};
pub use location::{AssetLabel, AssetReference, LocationQuery, ResourceLocation};
pub use operation::{OperationFuture, OperationHandle};
pub use scenes::{SceneController, SceneEntry};
pub use settings::{ArmSettings, LogLevel};
