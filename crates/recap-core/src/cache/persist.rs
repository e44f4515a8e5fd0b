//! Persist the cache to disk (JSON under XDG state dir) so it survives across runs.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::{read, CaseRecord, DocumentRecord, MetadataCache};

/// Point-in-time copy of the cache. Ordered maps so equal caches compare and
/// serialize identically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    #[serde(default = "default_version")]
    pub version: u8,
    #[serde(default)]
    pub cases: BTreeMap<String, CaseRecord>,
    #[serde(default)]
    pub documents: BTreeMap<String, DocumentRecord>,
}

fn default_version() -> u8 {
    1
}

impl MetadataCache {
    pub fn snapshot(&self) -> CacheSnapshot {
        let cases = read(&self.cases)
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let documents = read(&self.documents)
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        CacheSnapshot {
            version: 1,
            cases,
            documents,
        }
    }

    pub fn from_snapshot(snapshot: CacheSnapshot) -> Self {
        let cache = MetadataCache::new();
        for (id, record) in snapshot.cases {
            cache.set_case(id, record);
        }
        for (id, record) in snapshot.documents {
            cache.set_document(id, record);
        }
        cache
    }

    /// Default path for the cache file: `~/.local/state/recap/metadata_cache.json`.
    pub fn default_path() -> Result<std::path::PathBuf> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("recap")?;
        // `get_state_home` already includes the "recap" prefix.
        Ok(xdg_dirs.get_state_home().join("metadata_cache.json"))
    }

    /// Save the current contents to the given path (creates parent dir if needed).
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let snapshot = self.snapshot();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create dir: {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&snapshot).context("serialize metadata cache")?;
        std::fs::write(path, json)
            .with_context(|| format!("write metadata cache: {}", path.display()))?;
        Ok(())
    }

    /// Load the cache from the given path. A missing file yields None so the
    /// caller can start from an empty cache.
    pub fn load_from_path(path: &Path) -> Result<Option<MetadataCache>> {
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("read metadata cache: {}", path.display()))
            }
        };
        let snapshot: CacheSnapshot = serde_json::from_slice(&bytes)
            .with_context(|| format!("parse metadata cache: {}", path.display()))?;
        Ok(Some(MetadataCache::from_snapshot(snapshot)))
    }
}
