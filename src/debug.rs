//! Runtime inspection and log setup

use crate::backend::SceneMode;
use crate::context::ArmContext;
use crate::error::Result;
use serde::Serialize;

#[cfg(feature = "profiling")]
use crate::error::ArmError;
#[cfg(feature = "profiling")]
use crate::settings::ArmSettings;

/// One registered asset entry
#[derive(Clone, Debug, Serialize)]
pub struct EntryInfo {
    pub key: String,
    pub is_batch_loaded: bool,
    pub reference_count: u32,
    pub handle_count: usize,
    pub tracked_handles: usize,
}

/// One cached label
#[derive(Clone, Debug, Serialize)]
pub struct LabelInfo {
    pub label: String,
    pub location_count: usize,
}

/// One loaded scene
#[derive(Clone, Debug, Serialize)]
pub struct SceneInfo {
    pub key: String,
    pub mode: SceneMode,
    pub valid: bool,
}

/// Point-in-time copy of the registry and tracker
#[derive(Clone, Debug, Serialize)]
pub struct RegistrySnapshot {
    pub initialized: bool,
    pub key_count: usize,
    pub entries: Vec<EntryInfo>,
    pub labels: Vec<LabelInfo>,
    pub scenes: Vec<SceneInfo>,
    pub total_tracked: usize,
}

impl RegistrySnapshot {
    pub(crate) fn capture(context: &ArmContext) -> Self {
        let (key_count, mut entries, labels, mut scenes) = {
            let registry = context.registry.lock();
            let entries: Vec<EntryInfo> = registry
                .assets()
                .map(|entry| EntryInfo {
                    key: entry.key().to_string(),
                    is_batch_loaded: entry.is_batch_loaded(),
                    reference_count: entry.reference_count(),
                    handle_count: entry.handle_count(),
                    tracked_handles: 0,
                })
                .collect();
            let labels: Vec<LabelInfo> = registry
                .cached_labels()
                .into_iter()
                .map(|label| LabelInfo {
                    location_count: registry.label_locations(&label).map_or(0, <[_]>::len),
                    label: label.0,
                })
                .collect();
            let scenes: Vec<SceneInfo> = registry
                .scenes()
                .iter()
                .map(|scene| SceneInfo {
                    key: scene.key().to_string(),
                    mode: scene.mode(),
                    valid: scene.is_valid(),
                })
                .collect();
            (registry.key_count(), entries, labels, scenes)
        };

        let total_tracked = {
            let tracker = context.tracker.lock();
            for entry in entries.iter_mut() {
                entry.tracked_handles = tracker.tracked_count(&entry.key);
            }
            tracker.total_tracked()
        };

        entries.sort_by(|a, b| a.key.cmp(&b.key));
        scenes.sort_by(|a, b| a.key.cmp(&b.key));

        Self {
            initialized: context.is_initialized(),
            key_count,
            entries,
            labels,
            scenes,
            total_tracked,
        }
    }

    pub fn entry(&self, key: &str) -> Option<&EntryInfo> {
        self.entries.iter().find(|entry| entry.key == key)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Print registry summary to console
    pub fn print_summary(&self) {
        println!("=== Asset Registry ===");
        println!("Initialized: {}", self.initialized);
        println!("Catalogue keys: {}", self.key_count);
        println!("Tracked handles: {}", self.total_tracked);

        println!("\n=== Assets ===");
        for entry in &self.entries {
            println!(
                "{} [{}]: refs {}, handles {}, tracked {}",
                entry.key,
                if entry.is_batch_loaded { "batch" } else { "individual" },
                entry.reference_count,
                entry.handle_count,
                entry.tracked_handles
            );
        }

        println!("\n=== Labels ===");
        for label in &self.labels {
            println!("{}: {} locations", label.label, label.location_count);
        }

        println!("\n=== Scenes ===");
        for scene in &self.scenes {
            println!("{} ({:?}) valid: {}", scene.key, scene.mode, scene.valid);
        }
    }
}

/// Install a console subscriber at `settings.log_level`
#[cfg(feature = "profiling")]
pub fn init_logging(settings: &ArmSettings) -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(settings.log_level.to_tracing())
        .with_target(false)
        .try_init()
        .map_err(|e| ArmError::Logging(e.to_string()))
}

/// Install a JSON subscriber writing to `dir/file_name` at `settings.log_level`.
///
/// Keep the returned guard alive; dropping it flushes and stops the writer.
#[cfg(feature = "profiling")]
pub fn init_file_logging(
    dir: impl AsRef<std::path::Path>,
    file_name: &str,
    settings: &ArmSettings,
) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .json()
        .with_writer(writer)
        .with_ansi(false)
        .with_max_level(settings.log_level.to_tracing())
        .try_init()
        .map_err(|e| ArmError::Logging(e.to_string()))?;
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetEntry;
    use crate::backend::{LoadHandle, MockBackend, MockOperation};
    use crate::location::{AssetLabel, ResourceLocation};
    use crate::settings::ArmSettings;
    use std::sync::{Arc, Weak};

    #[cfg(feature = "profiling")]
    #[test]
    fn test_init_logging_installs_once() {
        let settings = ArmSettings::from_json_str(r#"{ "log_level": "Error" }"#).unwrap();
        assert!(init_logging(&settings).is_ok());
        assert!(matches!(init_logging(&settings), Err(ArmError::Logging(_))));
    }

    #[test]
    fn test_snapshot_counts() {
        let context = ArmContext::new(Arc::new(MockBackend::new()), ArmSettings::default());
        let entry = Arc::new(AssetEntry::new("hero", false, Weak::new()));
        let handle = LoadHandle::new(MockOperation::succeeded(Arc::new(1u8)));
        entry.insert_if_absent(ResourceLocation::new("hero", None, "hero"), handle.clone());
        {
            let mut registry = context.registry.lock();
            registry.add_asset("hero", entry);
            registry.add_key("hero");
            registry.cache_label(AssetLabel::from("ui"), vec![ResourceLocation::new("a", None, "a")]);
        }
        context.track("hero", handle);

        let snapshot = RegistrySnapshot::capture(&context);
        let info = snapshot.entry("hero").unwrap();
        assert_eq!(info.handle_count, 1);
        assert_eq!(info.tracked_handles, 1);
        assert_eq!(snapshot.total_tracked, 1);
        assert_eq!(snapshot.key_count, 1);
        assert_eq!(snapshot.labels[0].location_count, 1);

        let json = snapshot.to_json().unwrap();
        assert!(json.contains("\"key\": \"hero\""));
    }
}
