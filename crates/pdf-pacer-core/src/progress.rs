//! Saved reading position per (user, document).

use serde::{Deserialize, Serialize};
use sled::Db;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, warn};

use crate::config::ZoomLevel;
use crate::error::{Error, Result};

/// Where a reader left off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingProgress {
    /// 0-based page
    pub current_page: usize,
    /// Word index within `current_page`
    pub word_index: usize,
    pub wpm: u32,
    pub zoom: ZoomLevel,
}

/// Identifies one reader's progress through one document
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProgressKey {
    pub user: String,
    pub document: String,
}

impl ProgressKey {
    pub fn new(user: impl Into<String>, document: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            document: document.into(),
        }
    }

    /// Storage key; NUL cannot appear in either part
    pub fn encode(&self) -> String {
        format!("{}\0{}", self.user, self.document)
    }

    pub fn decode(raw: &str) -> Option<Self> {
        let (user, document) = raw.split_once('\0')?;
        Some(Self::new(user, document))
    }
}

impl std::fmt::Display for ProgressKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.user, self.document)
    }
}

/// Persistence for [`ReadingProgress`]
pub trait ProgressStore: Send + Sync {
    fn load(&self, key: &ProgressKey) -> Result<Option<ReadingProgress>>;
    fn save(&self, key: &ProgressKey, progress: &ReadingProgress) -> Result<()>;
    fn delete(&self, key: &ProgressKey) -> Result<()>;
    /// Every saved record, in key order
    fn list(&self) -> Result<Vec<(ProgressKey, ReadingProgress)>>;
}

/// Progress kept in a sled database on disk
pub struct SledProgressStore {
    db: Db,
}

impl SledProgressStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::StoreInit(format!(
                    "Failed to create progress directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let db = sled::open(path).map_err(|e| {
            let err_str = e.to_string();
            if err_str.contains("WouldBlock") || err_str.contains("lock") {
                Error::StoreInit(format!(
                    "Progress store locked at {}\n\n\
                    Another reader is running, or a previous one crashed.\n\
                    To fix: rm {}/db/LOCK",
                    path.display(),
                    path.display()
                ))
            } else {
                Error::StoreInit(format!(
                    "Failed to open progress store at {}: {}",
                    path.display(),
                    e
                ))
            }
        })?;

        debug!("Opened progress store at {}", path.display());
        Ok(Self { db })
    }

    pub fn len(&self) -> usize {
        self.db.len()
    }

    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }
}

impl ProgressStore for SledProgressStore {
    fn load(&self, key: &ProgressKey) -> Result<Option<ReadingProgress>> {
        let Some(raw) = self
            .db
            .get(key.encode().as_bytes())
            .map_err(|e| Error::StoreRead(e.to_string()))?
        else {
            return Ok(None);
        };
        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|e| Error::StoreRead(format!("Corrupt progress for {key}: {e}")))
    }

    fn save(&self, key: &ProgressKey, progress: &ReadingProgress) -> Result<()> {
        let value = serde_json::to_vec(progress).map_err(|e| Error::StoreWrite(e.to_string()))?;
        self.db
            .insert(key.encode().as_bytes(), value)
            .map_err(|e| Error::StoreWrite(e.to_string()))?;
        self.db
            .flush()
            .map_err(|e| Error::StoreWrite(format!("Flush failed: {e}")))?;
        Ok(())
    }

    fn delete(&self, key: &ProgressKey) -> Result<()> {
        self.db
            .remove(key.encode().as_bytes())
            .map_err(|e| Error::StoreWrite(e.to_string()))?;
        self.db
            .flush()
            .map_err(|e| Error::StoreWrite(format!("Flush failed: {e}")))?;
        Ok(())
    }

    fn list(&self) -> Result<Vec<(ProgressKey, ReadingProgress)>> {
        let mut out = Vec::new();
        for item in self.db.iter() {
            let (raw_key, raw_value) = item.map_err(|e| Error::StoreRead(e.to_string()))?;
            let Some(key) = std::str::from_utf8(&raw_key).ok().and_then(ProgressKey::decode) else {
                warn!("Skipping malformed progress key");
                continue;
            };
            match serde_json::from_slice(&raw_value) {
                Ok(progress) => out.push((key, progress)),
                Err(e) => warn!("Skipping corrupt progress for {}: {}", key, e),
            }
        }
        Ok(out)
    }
}

/// Process-local store for tests and stateless hosts
#[derive(Default)]
pub struct MemoryProgressStore {
    records: Mutex<HashMap<ProgressKey, ReadingProgress>>,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> Result<std::sync::MutexGuard<'_, HashMap<ProgressKey, ReadingProgress>>> {
        self.records
            .lock()
            .map_err(|_| Error::StoreRead("progress map poisoned".to_string()))
    }
}

impl ProgressStore for MemoryProgressStore {
    fn load(&self, key: &ProgressKey) -> Result<Option<ReadingProgress>> {
        Ok(self.records()?.get(key).copied())
    }

    fn save(&self, key: &ProgressKey, progress: &ReadingProgress) -> Result<()> {
        self.records()?.insert(key.clone(), *progress);
        Ok(())
    }

    fn delete(&self, key: &ProgressKey) -> Result<()> {
        self.records()?.remove(key);
        Ok(())
    }

    fn list(&self) -> Result<Vec<(ProgressKey, ReadingProgress)>> {
        let mut out: Vec<_> = self
            .records()?
            .iter()
            .map(|(key, progress)| (key.clone(), *progress))
            .collect();
        out.sort_by(|a, b| a.0.encode().cmp(&b.0.encode()));
        Ok(out)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> ReadingProgress {
        ReadingProgress {
            current_page: 4,
            word_index: 17,
            wpm: 250,
            zoom: ZoomLevel::Percent125,
        }
    }

    #[test]
    fn test_sled_store_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = SledProgressStore::open(dir.path().join("progress")).unwrap();
        let key = ProgressKey::new("olena", "war-and-peace");

        assert_eq!(store.load(&key).unwrap(), None);
        store.save(&key, &sample()).unwrap();
        assert_eq!(store.load(&key).unwrap(), Some(sample()));
        assert_eq!(store.list().unwrap(), vec![(key.clone(), sample())]);

        store.delete(&key).unwrap();
        assert_eq!(store.load(&key).unwrap(), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_keys_do_not_collide() {
        let store = MemoryProgressStore::new();
        let a = ProgressKey::new("ab", "c");
        let b = ProgressKey::new("a", "bc");
        store.save(&a, &sample()).unwrap();
        assert_eq!(store.load(&b).unwrap(), None);
        assert_ne!(a.encode(), b.encode());
        assert_eq!(ProgressKey::decode(&a.encode()), Some(a));
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert_eq!(
            json,
            r#"{"current_page":4,"word_index":17,"wpm":250,"zoom":"125%"}"#
        );
    }
}
