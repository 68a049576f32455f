//! Download settings and their hot-reloadable store

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use super::error::{SettingsError, SettingsResult};
use super::specialty::Specialty;
use super::weights::{ServerPool, WeightTable};

/// Settings document controlling redirects and mirror weights
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadSettings {
    /// Percentage of redirected traffic sent to the main pool (0..=100)
    pub main_load: u32,

    /// Help mirrors taking the share not sent to the main pool
    pub help_servers: Vec<String>,

    /// Main mirrors
    pub main_servers: Vec<String>,

    /// Specialty tag to mirror weights
    pub weights: BTreeMap<String, BTreeMap<String, u32>>,
}

impl DownloadSettings {
    /// Parse a settings document
    pub fn from_json(bytes: &[u8]) -> SettingsResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Check the settings, collecting every problem found
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut problems = Vec::new();

        if self.main_load > 100 {
            problems.push(format!("main_load must be within 0..=100, got {}", self.main_load));
        }
        for server in self.help_servers.iter().chain(&self.main_servers) {
            if server.trim().is_empty() {
                problems.push("server names must not be empty".to_string());
            }
        }
        for (tag, weights) in &self.weights {
            if tag.parse::<Specialty>().is_err() {
                problems.push(format!("unknown specialty '{tag}'"));
            }
            if weights.keys().any(|s| s.trim().is_empty()) {
                problems.push(format!("specialty '{tag}' has an empty mirror name"));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems)
        }
    }

    /// Validate and compile the weight tables
    pub fn compile(&self) -> SettingsResult<ServerPool> {
        self.validate().map_err(SettingsError::Invalid)?;

        let mut tables = HashMap::new();
        for (tag, weights) in &self.weights {
            let specialty: Specialty = tag.parse()?;
            tables.insert(specialty, WeightTable::new(weights.clone()));
        }
        Ok(ServerPool::new(tables))
    }
}

/// Settings together with their compiled pool
#[derive(Debug, Default)]
pub struct PoolSnapshot {
    pub settings: DownloadSettings,
    pub pool: ServerPool,
}

impl PoolSnapshot {
    /// Compile a snapshot from settings
    pub fn compile(settings: DownloadSettings) -> SettingsResult<Self> {
        let pool = settings.compile()?;
        Ok(Self { settings, pool })
    }
}

// ============================================================================
// Settings Store
// ============================================================================

/// Holds the last-known-good settings, optionally backed by a file
pub struct SettingsStore {
    path: Option<PathBuf>,
    current: RwLock<Arc<PoolSnapshot>>,
}

impl SettingsStore {
    /// Create an in-memory store
    pub fn new(settings: DownloadSettings) -> SettingsResult<Self> {
        Ok(Self {
            path: None,
            current: RwLock::new(Arc::new(PoolSnapshot::compile(settings)?)),
        })
    }

    /// Load settings from `path`; a missing file yields empty settings
    pub fn load(path: impl Into<PathBuf>) -> SettingsResult<Self> {
        let path = path.into();
        let settings = if path.exists() {
            read_settings(&path)?
        } else {
            tracing::warn!(path = %path.display(), "Settings file not found, serving all traffic locally");
            DownloadSettings::default()
        };

        Ok(Self {
            current: RwLock::new(Arc::new(PoolSnapshot::compile(settings)?)),
            path: Some(path),
        })
    }

    /// Backing file, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Current settings and pool
    pub fn snapshot(&self) -> Arc<PoolSnapshot> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Re-read the backing file; on failure the previous settings stay active
    pub fn reload(&self) -> SettingsResult<Arc<PoolSnapshot>> {
        let Some(path) = &self.path else {
            return Ok(self.snapshot());
        };

        let result = read_settings(path).and_then(|settings| self.apply(settings));
        crate::metrics::record_settings_reload(result.is_ok());

        match &result {
            Ok(snapshot) => tracing::info!(
                help = snapshot.settings.help_servers.len(),
                main = snapshot.settings.main_servers.len(),
                main_load = snapshot.settings.main_load,
                "Reloaded download settings"
            ),
            Err(e) => tracing::error!(error = %e, "Settings reload failed, keeping last-known-good"),
        }
        result
    }

    /// Validate and publish new settings
    pub fn apply(&self, settings: DownloadSettings) -> SettingsResult<Arc<PoolSnapshot>> {
        let snapshot = Arc::new(PoolSnapshot::compile(settings)?);
        *self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = snapshot.clone();
        Ok(snapshot)
    }
}

fn read_settings(path: &Path) -> SettingsResult<DownloadSettings> {
    let bytes = std::fs::read(path).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    DownloadSettings::from_json(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::random::SequenceRandom;

    const SETTINGS: &str = r#"{
        "main_load": 30,
        "help_servers": ["help1.example.net"],
        "main_servers": ["main1.example.net", "main2.example.net"],
        "weights": {
            "main": {"main1.example.net": 50, "self": 50},
            "wiki": {"wiki.example.net": 100}
        }
    }"#;

    #[test]
    fn test_parse_and_compile() {
        let settings = DownloadSettings::from_json(SETTINGS.as_bytes()).unwrap();
        assert_eq!(settings.main_load, 30);
        assert_eq!(settings.main_servers.len(), 2);

        let pool = settings.compile().unwrap();
        assert_eq!(pool.percent(Specialty::Main, "main1.example.net"), 50);
        assert_eq!(
            pool.sample(Specialty::Wiki, &SequenceRandom::new([12])),
            Some("wiki.example.net")
        );
    }

    #[test]
    fn test_validation_collects_problems() {
        let settings = DownloadSettings {
            main_load: 150,
            weights: BTreeMap::from([("tiles".to_string(), BTreeMap::new())]),
            ..Default::default()
        };
        let problems = settings.validate().unwrap_err();
        assert_eq!(problems.len(), 2);
        assert!(matches!(settings.compile(), Err(SettingsError::Invalid(_))));
    }

    #[test]
    fn test_missing_file_yields_empty_settings() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::load(dir.path().join("missing.json")).unwrap();
        let snapshot = store.snapshot();
        assert!(snapshot.settings.help_servers.is_empty());
        assert!(snapshot.pool.table(Specialty::Main).is_none());
    }

    #[test]
    fn test_reload_keeps_last_known_good() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, SETTINGS).unwrap();

        let store = SettingsStore::load(&path).unwrap();
        assert_eq!(store.snapshot().settings.main_load, 30);

        std::fs::write(&path, "{ not json").unwrap();
        assert!(store.reload().is_err());
        assert_eq!(store.snapshot().settings.main_load, 30);

        std::fs::write(&path, r#"{"main_load": 101}"#).unwrap();
        let err = store.reload().unwrap_err();
        assert_eq!(err.messages().len(), 1);
        assert_eq!(store.snapshot().settings.main_load, 30);

        std::fs::write(&path, r#"{"main_load": 80, "main_servers": ["m.example.net"]}"#).unwrap();
        let snapshot = store.reload().unwrap();
        assert_eq!(snapshot.settings.main_load, 80);
        assert_eq!(store.snapshot().settings.main_servers, vec!["m.example.net"]);
    }

    #[test]
    fn test_in_memory_store_reload_is_noop() {
        let store = SettingsStore::new(DownloadSettings::default()).unwrap();
        assert!(store.path().is_none());
        assert!(store.reload().is_ok());
    }
}
