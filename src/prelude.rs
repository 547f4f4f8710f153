//! Convenient re-exports of commonly used types.
//!
//! The prelude can be imported with:
//! ```
//! use asset_arm::prelude::*;
//! ```

pub use crate::arm::Arm;
pub use crate::assets::{AssetController, AssetEntry};
pub use crate::backend::{LoadHandle, ResourceBackend, SceneMode, TaskSpawner};
pub use crate::debug::RegistrySnapshot;
pub use crate::error::{ArmError, Result};
pub use crate::events::{ActivateCompleted, ActivateFailed, AssetReleased, BatchReleased, FnSubscriber};
pub use crate::location::{AssetLabel, AssetReference, LocationQuery, ResourceLocation};
pub use crate::operation::OperationHandle;
pub use crate::scenes::{SceneController, SceneEntry};
pub use crate::settings::ArmSettings;
