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

//! Error types

use std::fmt;

/// Asset reference manager error type
#[derive(Debug, Clone, PartialEq)]
pub enum ArmError {
    /// `Arm::activate` has not completed yet
    NotInitialized,

    /// Query resolved to zero resource locations
    NoLocations(String),

    /// A resource location failed to load
    LoadFailed { key: String, reason: String },

    /// Releasing an underlying handle failed
    ReleaseFailed { key: String, reason: String },

    /// Scene entry handle is invalid or did not succeed
    InvalidSceneEntry,

    /// Error reported by the resource backend
    Backend(String),

    /// Task could not be handed to the executor
    Spawn(String),

    /// Settings could not be parsed
    Settings(String),

    /// Log subscriber could not be installed
    Logging(String),

    /// Backend does not implement the operation
    Unsupported(&'static str),
}

impl fmt::Display for ArmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArmError::NotInitialized => {
                write!(f, "Not initialized: call Arm::activate() first")
            }
            ArmError::NoLocations(query) => write!(f, "No resource locations found for {query}"),
            ArmError::LoadFailed { key, reason } => {
                write!(f, "Failed to load asset {key}: {reason}")
            }
            ArmError::ReleaseFailed { key, reason } => {
                write!(f, "Failed to release handle for {key}: {reason}")
            }
            ArmError::InvalidSceneEntry => write!(f, "Scene entry is not valid"),
            ArmError::Backend(msg) => write!(f, "Backend error: {msg}"),
            ArmError::Spawn(msg) => write!(f, "Spawn error: {msg}"),
            ArmError::Settings(msg) => write!(f, "Settings error: {msg}"),
            ArmError::Logging(msg) => write!(f, "Logging error: {msg}"),
            ArmError::Unsupported(op) => write!(f, "Operation not supported by backend: {op}"),
        }
    }
}

impl std::error::Error for ArmError {}

impl From<serde_json::Error> for ArmError {
    fn from(err: serde_json::Error) -> Self {
        ArmError::Settings(err.to_string())
    }
}

impl From<futures::task::SpawnError> for ArmError {
    fn from(err: futures::task::SpawnError) -> Self {
        ArmError::Spawn(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ArmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            ArmError::NoLocations("label:ui".to_string()).to_string(),
            "No resource locations found for label:ui"
        );
        let err = ArmError::LoadFailed {
            key: "spriteA".to_string(),
            reason: "missing bundle".to_string(),
        };
        assert_eq!(err.to_string(), "Failed to load asset spriteA: missing bundle");
    }

    #[test]
    fn test_settings_error_from_json() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: ArmError = parse.unwrap_err().into();
        assert!(matches!(err, ArmError::Settings(_)));
    }
}
