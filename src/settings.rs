//! Runtime settings

use crate::error::Result;
use crate::operation::DEFAULT_PROGRESS_THRESHOLD;
use serde::{Deserialize, Serialize};

/// Minimum severity that reaches the log.
///
/// `Info` is the most verbose level and the default.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    #[default]
    Info,
    Warning,
    Error,
    Exception,
}

impl LogLevel {
    pub fn to_tracing(self) -> tracing::Level {
        match self {
            LogLevel::Info => tracing::Level::DEBUG,
            LogLevel::Warning => tracing::Level::WARN,
            LogLevel::Error | LogLevel::Exception => tracing::Level::ERROR,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArmSettings {
    pub log_level: LogLevel,
    /// Progress notifications fire only past this delta
    pub progress_threshold: f32,
    /// Share of an individual load reserved for location resolution
    pub location_share: f32,
}

impl Default for ArmSettings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            progress_threshold: DEFAULT_PROGRESS_THRESHOLD,
            location_share: 0.1,
        }
    }
}

impl ArmSettings {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let mut settings: ArmSettings = serde_json::from_str(json)?;
        settings.location_share = settings.location_share.clamp(0.0, 1.0);
        settings.progress_threshold = settings.progress_threshold.max(0.0);
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
