//! Key-value storage behind the cache tiers.
//!
//! | Implementation | Backing | Use |
//! |----------------|---------|-----|
//! | [`MemoryStore`] | `RwLock<HashMap>` | hot tier, per-process |
//! | [`JsonFileStore`] | JSON file | persistent tier, survives runs |
//!
//! Every entry carries an absolute unix-seconds expiry; expired entries are
//! never returned and are dropped lazily on access.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::Duration;

pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;
    fn delete(&self, key: &str) -> Result<()>;
    /// Remove every entry whose key starts with `prefix`; returns the count.
    fn purge_prefix(&self, prefix: &str) -> Result<usize>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry {
    value: String,
    expires_at: i64,
}

impl StoredEntry {
    fn expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}

fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

/// In-process store. Cheap, unbounded, gone on drop.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, StoredEntry>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let now = now_secs();
        {
            let entries = self
                .entries
                .read()
                .map_err(|_| anyhow!("store lock poisoned"))?;
            match entries.get(key) {
                Some(entry) if !entry.expired(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }
        // Entry exists but is expired; drop it.
        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow!("store lock poisoned"))?;
        entries.remove(key);
        Ok(None)
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow!("store lock poisoned"))?;
        entries.insert(
            key.to_string(),
            StoredEntry {
                value: value.to_string(),
                expires_at: now_secs() + ttl.as_secs() as i64,
            },
        );
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow!("store lock poisoned"))?;
        entries.remove(key);
        Ok(())
    }

    fn purge_prefix(&self, prefix: &str) -> Result<usize> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow!("store lock poisoned"))?;
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        Ok(before - entries.len())
    }
}

/// File-backed store. The whole map is held in memory and rewritten on
/// every mutation; entry counts here are small (cache tiers + learned
/// strategies), so simplicity wins over incremental writes.
pub struct JsonFileStore {
    path: PathBuf,
    entries: RwLock<HashMap<String, StoredEntry>>,
}

impl JsonFileStore {
    pub fn open(path: &Path) -> Result<JsonFileStore> {
        let entries = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read store file: {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse store file: {}", path.display()))?
        } else {
            HashMap::new()
        };
        Ok(JsonFileStore {
            path: path.to_path_buf(),
            entries: RwLock::new(entries),
        })
    }

    fn persist(&self, entries: &HashMap<String, StoredEntry>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create store directory: {}", parent.display())
                })?;
            }
        }
        let json = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write store file: {}", self.path.display()))
    }
}

impl KvStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let now = now_secs();
        {
            let entries = self
                .entries
                .read()
                .map_err(|_| anyhow!("store lock poisoned"))?;
            match entries.get(key) {
                Some(entry) if !entry.expired(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }
        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow!("store lock poisoned"))?;
        entries.remove(key);
        self.persist(&entries)?;
        Ok(None)
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow!("store lock poisoned"))?;
        entries.insert(
            key.to_string(),
            StoredEntry {
                value: value.to_string(),
                expires_at: now_secs() + ttl.as_secs() as i64,
            },
        );
        self.persist(&entries)
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow!("store lock poisoned"))?;
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }

    fn purge_prefix(&self, prefix: &str) -> Result<usize> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow!("store lock poisoned"))?;
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        let removed = before - entries.len();
        if removed > 0 {
            self.persist(&entries)?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_get_after_set() {
        let store = MemoryStore::new();
        store.set("a", "1", Duration::from_secs(60)).unwrap();
        assert_eq!(store.get("a").unwrap(), Some("1".to_string()));
        assert_eq!(store.get("missing").unwrap(), None);
    }

    #[test]
    fn test_memory_zero_ttl_expires_immediately() {
        let store = MemoryStore::new();
        store.set("a", "1", Duration::ZERO).unwrap();
        assert_eq!(store.get("a").unwrap(), None);
        // Lazy removal dropped the entry too.
        assert!(store.is_empty());
    }

    #[test]
    fn test_memory_delete_and_purge_prefix() {
        let store = MemoryStore::new();
        store.set("tier1:abc", "1", Duration::from_secs(60)).unwrap();
        store.set("tier1:def", "2", Duration::from_secs(60)).unwrap();
        store.set("tier2:abc", "3", Duration::from_secs(60)).unwrap();

        store.delete("tier1:def").unwrap();
        assert_eq!(store.get("tier1:def").unwrap(), None);

        let removed = store.purge_prefix("tier1:").unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.get("tier2:abc").unwrap(), Some("3".to_string()));
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        {
            let store = JsonFileStore::open(&path).unwrap();
            store.set("a", "persisted", Duration::from_secs(60)).unwrap();
        }

        let store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.get("a").unwrap(), Some("persisted".to_string()));
    }

    #[test]
    fn test_file_store_expiry_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        {
            let store = JsonFileStore::open(&path).unwrap();
            store.set("a", "stale", Duration::ZERO).unwrap();
        }

        let store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.get("a").unwrap(), None);
    }

    #[test]
    fn test_file_store_purge_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        {
            let store = JsonFileStore::open(&path).unwrap();
            store.set("t:1", "a", Duration::from_secs(60)).unwrap();
            store.set("t:2", "b", Duration::from_secs(60)).unwrap();
            store.set("u:1", "c", Duration::from_secs(60)).unwrap();
            assert_eq!(store.purge_prefix("t:").unwrap(), 2);
        }

        let store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.get("t:1").unwrap(), None);
        assert_eq!(store.get("u:1").unwrap(), Some("c".to_string()));
    }

    #[test]
    fn test_file_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(JsonFileStore::open(&path).is_err());
    }
}
