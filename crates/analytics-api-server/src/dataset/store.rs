use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use parking_lot::RwLock;
use tracing::{info, warn};

use super::generator::{self, GeneratorConfig};
use super::models::Dataset;

/// Owns the live snapshot. Reads are lock-cheap `Arc` clones; `refresh`
/// builds a brand-new snapshot and swaps the reference, so in-flight
/// queries keep whatever snapshot they started with.
pub struct DatasetStore {
    path: PathBuf,
    config: GeneratorConfig,
    current: RwLock<Arc<Dataset>>,
}

impl DatasetStore {
    /// Read the persisted snapshot, falling back to regeneration when the
    /// file is absent, unreadable or fails validation. Corrupt snapshots are
    /// recovered locally and never surface as request-time errors.
    pub fn load(path: PathBuf, config: GeneratorConfig) -> Result<Self> {
        let dataset = match Self::read_persisted(&path) {
            Some(dataset) => {
                info!(
                    path = %path.display(),
                    tickets = dataset.tickets.len(),
                    "loaded persisted dataset snapshot"
                );
                dataset
            }
            None => Self::generate_and_persist(&path, &config)?,
        };
        Ok(Self {
            path,
            config,
            current: RwLock::new(Arc::new(dataset)),
        })
    }

    /// Non-blocking read of the latest snapshot.
    pub fn current(&self) -> Arc<Dataset> {
        self.current.read().clone()
    }

    /// Discard and regenerate everything, then atomically swap the live
    /// reference.
    pub fn refresh(&self) -> Result<Arc<Dataset>> {
        let dataset = Arc::new(Self::generate_and_persist(&self.path, &self.config)?);
        *self.current.write() = dataset.clone();
        info!(tickets = dataset.tickets.len(), "dataset refreshed");
        Ok(dataset)
    }

    fn read_persisted(path: &PathBuf) -> Option<Dataset> {
        if !path.exists() {
            return None;
        }
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "could not read dataset file, regenerating");
                return None;
            }
        };
        match serde_json::from_str::<Dataset>(&raw) {
            Ok(dataset) if dataset.is_valid() => Some(dataset),
            Ok(_) => {
                warn!(path = %path.display(), "persisted dataset failed validation, regenerating");
                None
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "persisted dataset unparseable, regenerating");
                None
            }
        }
    }

    fn generate_and_persist(path: &PathBuf, config: &GeneratorConfig) -> Result<Dataset> {
        let dataset = generator::generate(config, Utc::now());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating dataset dir {}", parent.display()))?;
        }
        let json = serde_json::to_string(&dataset).context("serializing dataset snapshot")?;
        fs::write(path, json).with_context(|| format!("writing dataset to {}", path.display()))?;
        Ok(dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> GeneratorConfig {
        GeneratorConfig {
            tickets: 120,
            ..Default::default()
        }
    }

    #[test]
    fn load_generates_when_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seed.json");
        let store = DatasetStore::load(path.clone(), small_config()).unwrap();
        assert!(path.exists());
        assert!(store.current().is_valid());
    }

    #[test]
    fn load_recovers_from_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seed.json");
        fs::write(&path, "not json at all {{{").unwrap();
        let store = DatasetStore::load(path, small_config()).unwrap();
        assert!(store.current().is_valid());
    }

    #[test]
    fn load_rejects_snapshot_with_empty_collections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seed.json");
        let empty = Dataset {
            generated_at: Utc::now(),
            tenants: vec![],
            agents: vec![],
            tickets: vec![],
            surveys: vec![],
            orders: vec![],
            template_stats: vec![],
            customers: vec![],
        };
        fs::write(&path, serde_json::to_string(&empty).unwrap()).unwrap();
        let store = DatasetStore::load(path, small_config()).unwrap();
        assert!(store.current().is_valid());
    }

    #[test]
    fn refresh_swaps_the_snapshot_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seed.json");
        let store = DatasetStore::load(path, small_config()).unwrap();
        let before = store.current();
        let after = store.refresh().unwrap();
        // The old Arc is still fully usable for readers that hold it.
        assert!(before.is_valid());
        assert!(!Arc::ptr_eq(&before, &after));
        assert!(Arc::ptr_eq(&after, &store.current()));
    }

    #[test]
    fn persisted_snapshot_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seed.json");
        let store = DatasetStore::load(path.clone(), small_config()).unwrap();
        let generated = store.current();
        drop(store);
        let reloaded = DatasetStore::load(path, small_config()).unwrap();
        assert_eq!(reloaded.current().tickets.len(), generated.tickets.len());
        assert_eq!(reloaded.current().tickets[0].id, generated.tickets[0].id);
    }
}
