// src/storage.rs - Durable per-session key/value storage for settings
use crate::axis::AxisCorrectionConfig;
use crate::config::{SensitivitySettings, SkeletonProfile};
use crate::error::{Result, RigError};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Key the axis table is stored under.
pub const AXIS_CONFIG_KEY: &str = "vrm-axis-config";
pub const SENSITIVITY_KEY: &str = "sensitivity-settings";

pub trait SessionStorage {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    values: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.values.remove(key);
        Ok(())
    }
}

/// One JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Platform config directory, falling back to `./rig-config`.
    pub fn default_location() -> Self {
        let dir = directories::ProjectDirs::from("com", "rigdriver", "RigDriver")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("./rig-config"));
        Self::new(dir)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        // Write beside the target then rename so a crash never leaves half a file
        let tmp = self.dir.join(format!(".{}.{}.tmp", key, uuid::Uuid::new_v4()));
        fs::write(&tmp, value)?;
        fs::rename(&tmp, self.path_for(key))?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

pub fn save_axis_config(storage: &mut dyn SessionStorage, config: &AxisCorrectionConfig) -> Result<()> {
    storage.set(AXIS_CONFIG_KEY, &config.export_json()?)
}

/// Loads the stored axis table. A missing entry or a corrupt one yields the
/// profile defaults; corruption is logged and never surfaces.
pub fn load_axis_config(storage: &dyn SessionStorage, profile: SkeletonProfile) -> AxisCorrectionConfig {
    match try_load_axis_config(storage) {
        Ok(Some(config)) => config,
        Ok(None) => {
            debug!("no stored axis config, using {:?} defaults", profile);
            AxisCorrectionConfig::for_profile(profile)
        }
        Err(e) => {
            warn!("{}; falling back to {:?} defaults", e, profile);
            AxisCorrectionConfig::for_profile(profile)
        }
    }
}

fn try_load_axis_config(storage: &dyn SessionStorage) -> Result<Option<AxisCorrectionConfig>> {
    let Some(raw) = storage.get(AXIS_CONFIG_KEY)? else {
        return Ok(None);
    };
    let mut config = AxisCorrectionConfig::new();
    config.import_json(&raw)?;
    Ok(Some(config))
}

/// Drops the stored table and returns the profile defaults.
pub fn reset_axis_config(
    storage: &mut dyn SessionStorage,
    profile: SkeletonProfile,
) -> Result<AxisCorrectionConfig> {
    storage.remove(AXIS_CONFIG_KEY)?;
    Ok(AxisCorrectionConfig::for_profile(profile))
}

pub fn save_sensitivity(storage: &mut dyn SessionStorage, settings: &SensitivitySettings) -> Result<()> {
    storage.set(SENSITIVITY_KEY, &serde_json::to_string(settings)?)
}

/// Stored values are merged over the defaults; unreadable data gives defaults.
pub fn load_sensitivity(storage: &dyn SessionStorage) -> SensitivitySettings {
    let raw = match storage.get(SENSITIVITY_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return SensitivitySettings::default(),
        Err(e) => {
            warn!("failed to read sensitivity settings: {}", e);
            return SensitivitySettings::default();
        }
    };

    serde_json::from_str(&raw)
        .map_err(|e| RigError::ConfigCorruption(e.to_string()))
        .unwrap_or_else(|e| {
            warn!("{}; using default sensitivity", e);
            SensitivitySettings::default()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::Xyz;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("rig-storage-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn memory_round_trip() {
        let mut storage = MemoryStorage::new();
        let mut config = AxisCorrectionConfig::for_profile(SkeletonProfile::Normalized);
        config.set("leftArm", Xyz::new(-1.0, 1.0, -1.0));

        save_axis_config(&mut storage, &config).unwrap();
        let loaded = load_axis_config(&storage, SkeletonProfile::Normalized);
        assert_eq!(loaded, config);
    }

    #[test]
    fn corrupt_entry_falls_back_to_defaults() {
        let mut storage = MemoryStorage::new();
        storage.set(AXIS_CONFIG_KEY, "{not json").unwrap();
        let loaded = load_axis_config(&storage, SkeletonProfile::Normalized);
        assert_eq!(loaded, AxisCorrectionConfig::for_profile(SkeletonProfile::Normalized));
    }

    #[test]
    fn reset_removes_stored_entry() {
        let mut storage = MemoryStorage::new();
        save_axis_config(&mut storage, &AxisCorrectionConfig::new()).unwrap();
        let config = reset_axis_config(&mut storage, SkeletonProfile::Legacy).unwrap();
        assert!(config.is_empty());
        assert_eq!(storage.get(AXIS_CONFIG_KEY).unwrap(), None);
    }

    #[test]
    fn file_storage_round_trip() {
        let dir = temp_dir();
        let mut storage = FileStorage::new(&dir);
        assert_eq!(storage.get(AXIS_CONFIG_KEY).unwrap(), None);

        let mut config = AxisCorrectionConfig::new();
        config.set("neck", Xyz::new(0.0, 2.0, -1.0));
        save_axis_config(&mut storage, &config).unwrap();
        assert_eq!(load_axis_config(&storage, SkeletonProfile::Legacy), config);

        storage.remove(AXIS_CONFIG_KEY).unwrap();
        storage.remove(AXIS_CONFIG_KEY).unwrap();
        assert_eq!(storage.get(AXIS_CONFIG_KEY).unwrap(), None);

        let leftovers = fs::read_dir(&dir).unwrap().count();
        assert_eq!(leftovers, 0);
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn sensitivity_defaults_when_corrupt() {
        let mut storage = MemoryStorage::new();
        storage.set(SENSITIVITY_KEY, "[]").unwrap();
        assert_eq!(load_sensitivity(&storage), SensitivitySettings::default());

        let custom = SensitivitySettings {
            finger_speed: 0.5,
            ..Default::default()
        };
        save_sensitivity(&mut storage, &custom).unwrap();
        assert_eq!(load_sensitivity(&storage), custom);
    }
}
