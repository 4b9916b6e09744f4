//! Persisted settings record
//!
//! The record is read once at startup and written once at teardown. Any
//! failure to read it is absorbed by falling back to the default record.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Entities seeded into a fresh settings record
const SEED_ENTITIES: [&str; 3] = ["lock.doorlock", "light.bedroom", "media_player.bedroom_tv"];

/// Entity reference as stored in settings and sent to the companion.
///
/// `name` holds the entity id, not the display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityName {
    pub name: String,
}

impl EntityName {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsRecord {
    pub url: String,
    pub port: String,
    pub token: String,
    pub force: bool,
    pub entities: Vec<EntityName>,
}

impl Default for SettingsRecord {
    fn default() -> Self {
        Self {
            url: "localhost".to_string(),
            port: "8123".to_string(),
            token: String::new(),
            force: true,
            entities: SEED_ENTITIES.iter().copied().map(EntityName::new).collect(),
        }
    }
}

/// File-backed settings store
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted record, or the default record if it cannot be read
    pub fn load(&self) -> SettingsRecord {
        match self.try_load() {
            Ok(record) => {
                log::debug!("Loaded settings from {}", self.path.display());
                record
            }
            Err(err) => {
                log::error!("Error loading settings: {err:#}");
                SettingsRecord::default()
            }
        }
    }

    fn try_load(&self) -> Result<SettingsRecord> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("reading settings from {}", self.path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("parsing settings from {}", self.path.display()))
    }

    /// Write the full record to disk
    pub fn save(&self, record: &SettingsRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating settings directory {}", parent.display()))?;
        }

        let content = serde_json::to_string_pretty(record)?;
        fs::write(&self.path, content)
            .with_context(|| format!("writing settings to {}", self.path.display()))?;

        log::debug!("Saved settings to {}", self.path.display());
        Ok(())
    }

    /// Overwrite the stored record with the defaults
    pub fn reset(&self) -> Result<SettingsRecord> {
        let record = SettingsRecord::default();
        self.save(&record)?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_record() {
        let record = SettingsRecord::default();
        assert_eq!(record.url, "localhost");
        assert_eq!(record.port, "8123");
        assert_eq!(record.token, "");
        assert!(record.force);
        assert_eq!(record.entities.len(), 3);
        assert_eq!(record.entities[0].name, "lock.doorlock");
    }

    #[test]
    fn test_load_missing_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("missing.json"));

        assert_eq!(store.load(), SettingsRecord::default());
    }

    #[test]
    fn test_load_corrupt_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{not json").unwrap();

        let record = SettingsStore::new(&path).load();
        assert_eq!(record, SettingsRecord::default());
    }

    #[test]
    fn test_load_wrong_schema_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"url": "example.org", "force": "yes"}"#).unwrap();

        let record = SettingsStore::new(&path).load();
        assert_eq!(record, SettingsRecord::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("nested").join("settings.json"));

        let record = SettingsRecord {
            url: "hass.local".to_string(),
            port: "443".to_string(),
            token: "secret".to_string(),
            force: false,
            entities: vec![EntityName::new("light.kitchen")],
        };
        store.save(&record).unwrap();

        assert_eq!(store.load(), record);
    }

    #[test]
    fn test_reset_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json"));
        store
            .save(&SettingsRecord {
                entities: Vec::new(),
                ..SettingsRecord::default()
            })
            .unwrap();

        store.reset().unwrap();
        assert_eq!(store.load().entities.len(), 3);
    }
}
