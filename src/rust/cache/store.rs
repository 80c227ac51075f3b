// SPDX-License-Identifier: PMPL-1.0-or-later

//! sled-backed persistence for proof cache entries
//!
//! Values are versioned JSON records in the `proof_cache` tree, keyed by the
//! raw 32 fingerprint bytes. Records from another schema version are skipped
//! on load.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{Result, TdfolError};
use crate::formula::Fingerprint;
use crate::prover::ProofResult;

/// Schema version written with every record
pub const STORE_VERSION: u32 = 2;

const TREE: &str = "proof_cache";

/// One persisted cache record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(serialize = "F: Serialize", deserialize = "F: DeserializeOwned"))]
pub struct StoredEntry<F> {
    pub version: u32,
    pub result: ProofResult<F>,
    /// Axiom-context fingerprint, so context invalidation survives restarts
    pub context: Fingerprint,
    pub stored_at: DateTime<Utc>,
    /// Time to live in milliseconds
    pub ttl_ms: Option<u64>,
}

impl<F> StoredEntry<F> {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.ttl_ms {
            Some(ttl) => now.signed_duration_since(self.stored_at).num_milliseconds() >= i64::try_from(ttl).unwrap_or(i64::MAX),
            None => false,
        }
    }
}

/// Write-through mirror of the in-memory cache
pub struct CacheStore {
    db: sled::Db,
    tree: sled::Tree,
}

impl CacheStore {
    /// Open or create a store at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let db = sled::open(path)
            .map_err(|e| TdfolError::storage(format!("failed to open cache store at {}: {}", path.display(), e)))?;
        let tree = db
            .open_tree(TREE)
            .map_err(|e| TdfolError::storage(format!("failed to open {} tree: {}", TREE, e)))?;
        Ok(CacheStore { db, tree })
    }

    /// In-memory store discarded on drop
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| TdfolError::storage(format!("failed to create temporary store: {}", e)))?;
        let tree = db.open_tree(TREE)?;
        Ok(CacheStore { db, tree })
    }

    pub fn put<F: Serialize>(&self, key: &Fingerprint, entry: &StoredEntry<F>) -> Result<()> {
        let bytes = serde_json::to_vec(entry)?;
        self.tree.insert(key.as_bytes(), bytes)?;
        Ok(())
    }

    pub fn get<F: DeserializeOwned>(&self, key: &Fingerprint) -> Result<Option<StoredEntry<F>>> {
        match self.tree.get(key.as_bytes())? {
            Some(bytes) => Ok(decode(&bytes)),
            None => Ok(None),
        }
    }

    pub fn remove(&self, key: &Fingerprint) -> Result<bool> {
        Ok(self.tree.remove(key.as_bytes())?.is_some())
    }

    pub fn clear(&self) -> Result<()> {
        self.tree.clear()?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Live records of the current schema version
    ///
    /// Expired, undecodable and foreign-version records are deleted.
    pub fn load<F: DeserializeOwned>(&self, now: DateTime<Utc>) -> Result<Vec<(Fingerprint, StoredEntry<F>)>> {
        let mut live = Vec::new();
        let mut stale = Vec::new();
        for item in self.tree.iter() {
            let (key, value) = item?;
            let Ok(bytes) = <[u8; 32]>::try_from(&key[..]) else {
                stale.push(key);
                continue;
            };
            match decode::<F>(&value) {
                Some(entry) if !entry.is_expired(now) => {
                    live.push((Fingerprint::from_bytes(bytes), entry));
                }
                _ => stale.push(key),
            }
        }
        if !stale.is_empty() {
            debug!(count = stale.len(), "dropping stale cache records");
        }
        for key in stale {
            self.tree.remove(key)?;
        }
        // oldest first, so replaying into an LRU keeps the newest
        live.sort_by_key(|(_, e)| e.stored_at);
        Ok(live)
    }

    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}

fn decode<F: DeserializeOwned>(bytes: &[u8]) -> Option<StoredEntry<F>> {
    let value: serde_json::Value = match serde_json::from_slice(bytes) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "undecodable cache record");
            return None;
        }
    };
    if value.get("version").and_then(|v| v.as_u64()) != Some(STORE_VERSION as u64) {
        return None;
    }
    serde_json::from_value(value).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::Formula;
    use crate::prover::ProofStatus;

    fn entry(ttl_ms: Option<u64>, stored_at: DateTime<Utc>) -> StoredEntry<Formula> {
        StoredEntry {
            version: STORE_VERSION,
            result: ProofResult::bare("native", ProofStatus::Proved, 3),
            context: Fingerprint::from_bytes([7; 32]),
            stored_at,
            ttl_ms,
        }
    }

    #[test]
    fn test_put_get_remove() {
        let store = CacheStore::temporary().unwrap();
        let key = Fingerprint::from_bytes([1; 32]);
        store.put(&key, &entry(None, Utc::now())).unwrap();
        let back: StoredEntry<Formula> = store.get(&key).unwrap().unwrap();
        assert_eq!(back.result.status, ProofStatus::Proved);
        assert!(store.remove(&key).unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_skips_expired_and_foreign_versions() {
        let store = CacheStore::temporary().unwrap();
        let now = Utc::now();
        store
            .put(&Fingerprint::from_bytes([1; 32]), &entry(Some(3_600_000), now))
            .unwrap();
        store
            .put(
                &Fingerprint::from_bytes([2; 32]),
                &entry(Some(10_000), now - chrono::Duration::seconds(60)),
            )
            .unwrap();
        let mut old = entry(None, now);
        old.version = STORE_VERSION + 1;
        store.put(&Fingerprint::from_bytes([3; 32]), &old).unwrap();

        let live = store.load::<Formula>(now).unwrap();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].0, Fingerprint::from_bytes([1; 32]));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_sub_second_ttl_is_not_rounded_away() {
        let store = CacheStore::temporary().unwrap();
        let now = Utc::now();
        let key = Fingerprint::from_bytes([4; 32]);
        store.put(&key, &entry(Some(500), now)).unwrap();
        assert_eq!(store.load::<Formula>(now + chrono::Duration::milliseconds(200)).unwrap().len(), 1);
        assert!(store.load::<Formula>(now + chrono::Duration::milliseconds(600)).unwrap().is_empty());
    }

    #[test]
    fn test_reopen_keeps_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.sled");
        let key = Fingerprint::from_bytes([9; 32]);
        {
            let store = CacheStore::open(&path).unwrap();
            store.put(&key, &entry(None, Utc::now())).unwrap();
            store.flush().unwrap();
        }
        let store = CacheStore::open(&path).unwrap();
        assert!(store.get::<Formula>(&key).unwrap().is_some());
    }
}
