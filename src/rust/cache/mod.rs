// SPDX-License-Identifier: PMPL-1.0-or-later

//! Content-addressed proof cache
//!
//! Results are keyed by the fingerprint of the goal combined with the
//! order-insensitive fingerprint of the axioms, so alpha-renamed or reordered
//! problems share one entry. The in-memory LRU is authoritative; when a path
//! is configured every write is mirrored to a sled store and reloaded at
//! open.
//!
//! Concurrent [`ProofCache::get_or_compute`] calls for the same key share a
//! single computation through a per-key [`OnceCell`].

use chrono::{DateTime, Utc};
use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, trace, warn};

use crate::error::{Result, TdfolError};
use crate::formula::{context_fingerprint, Fingerprint, Formula, ProofFormula};
use crate::prover::ProofResult;

pub mod store;

pub use store::{CacheStore, StoredEntry, STORE_VERSION};

/// Cache sizing, expiry and persistence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of in-memory entries
    pub capacity: usize,
    /// Default time-to-live; `None` keeps entries until evicted
    pub default_ttl_secs: Option<u64>,
    /// sled directory for persistence
    pub path: Option<PathBuf>,
    /// Also keep `Unknown`, `Timeout` and other inconclusive results
    pub store_inconclusive: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            capacity: 1024,
            default_ttl_secs: Some(3600),
            path: None,
            store_inconclusive: false,
        }
    }
}

impl CacheConfig {
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(TdfolError::config("cache.capacity must be at least 1"));
        }
        Ok(())
    }

    fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl_secs.map(Duration::from_secs)
    }
}

/// Counters since the cache was opened
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub evictions: u64,
    pub expirations: u64,
    /// Callers that joined a computation already in flight
    pub coalesced: u64,
    pub entries: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<F> {
    result: ProofResult<F>,
    context: Fingerprint,
    stored_at: DateTime<Utc>,
    ttl: Option<Duration>,
}

impl<F> CacheEntry<F> {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.ttl {
            Some(ttl) => {
                let age = now
                    .signed_duration_since(self.stored_at)
                    .to_std()
                    .unwrap_or(Duration::ZERO);
                age >= ttl
            }
            None => false,
        }
    }
}

struct Slots<F> {
    lru: LruCache<Fingerprint, CacheEntry<F>>,
    by_context: HashMap<Fingerprint, HashSet<Fingerprint>>,
}

impl<F> Slots<F> {
    fn unlink(&mut self, key: &Fingerprint, context: &Fingerprint) {
        if let Some(keys) = self.by_context.get_mut(context) {
            keys.remove(key);
            if keys.is_empty() {
                self.by_context.remove(context);
            }
        }
    }
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
    coalesced: AtomicU64,
}

type InFlight<F> = Mutex<HashMap<Fingerprint, Arc<OnceCell<ProofResult<F>>>>>;

/// A caller's hold on an in-flight cell, released also when the caller is cancelled
///
/// The registration is removed once the cell is initialized or when this is
/// the last caller holding it. A cancelled caller leaves the cell to waiters
/// that took over its initialization.
struct InFlightGuard<'a, F> {
    map: &'a InFlight<F>,
    key: Fingerprint,
    cell: Arc<OnceCell<ProofResult<F>>>,
}

impl<F> Drop for InFlightGuard<'_, F> {
    fn drop(&mut self) {
        let mut map = self.map.lock();
        let registered = map.get(&self.key).is_some_and(|c| Arc::ptr_eq(c, &self.cell));
        // the map and this guard hold the only references
        let last_holder = Arc::strong_count(&self.cell) == 2;
        if registered && (self.cell.initialized() || last_holder) {
            map.remove(&self.key);
        }
    }
}

/// Bounded LRU + TTL proof cache with optional sled persistence
pub struct ProofCache<F: ProofFormula = Formula> {
    config: CacheConfig,
    slots: Mutex<Slots<F>>,
    in_flight: InFlight<F>,
    store: Option<CacheStore>,
    counters: Counters,
}

impl<F: ProofFormula> ProofCache<F> {
    /// Open a cache, reloading persisted entries when a path is configured
    pub fn new(config: CacheConfig) -> Result<Self> {
        config.validate()?;
        let store = match &config.path {
            Some(path) => Some(CacheStore::open(path)?),
            None => None,
        };
        Self::with_store(config, store)
    }

    /// In-memory cache of the given capacity and no default TTL
    pub fn in_memory(capacity: usize) -> Result<Self> {
        Self::new(CacheConfig {
            capacity,
            default_ttl_secs: None,
            path: None,
            store_inconclusive: false,
        })
    }

    /// Cache mirrored to an already opened store
    pub fn with_store(config: CacheConfig, store: Option<CacheStore>) -> Result<Self> {
        config.validate()?;
        let capacity = NonZeroUsize::new(config.capacity)
            .ok_or_else(|| TdfolError::config("cache.capacity must be at least 1"))?;
        let cache = ProofCache {
            config,
            slots: Mutex::new(Slots {
                lru: LruCache::new(capacity),
                by_context: HashMap::new(),
            }),
            in_flight: Mutex::new(HashMap::new()),
            store,
            counters: Counters::default(),
        };
        cache.reload()?;
        Ok(cache)
    }

    fn reload(&self) -> Result<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let records = store.load::<F>(Utc::now())?;
        let loaded = records.len();
        let mut slots = self.slots.lock();
        for (key, record) in records {
            let entry = CacheEntry {
                result: record.result,
                context: record.context,
                stored_at: record.stored_at,
                ttl: record.ttl_ms.map(Duration::from_millis),
            };
            slots.by_context.entry(entry.context).or_default().insert(key);
            if let Some((old_key, old)) = slots.lru.push(key, entry) {
                if old_key != key {
                    slots.unlink(&old_key, &old.context);
                    store.remove(&old_key)?;
                }
            }
        }
        debug!(loaded, entries = slots.lru.len(), "proof cache reloaded");
        Ok(())
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Cache key of a problem
    pub fn key(goal: &F, axioms: &[F]) -> Fingerprint {
        Fingerprint::combine(&goal.fingerprint(), &context_fingerprint(axioms))
    }

    pub fn get(&self, goal: &F, axioms: &[F]) -> Option<ProofResult<F>> {
        self.lookup(&Self::key(goal, axioms))
    }

    fn lookup(&self, key: &Fingerprint) -> Option<ProofResult<F>> {
        let now = Utc::now();
        let mut slots = self.slots.lock();
        let expired = match slots.lru.get(key) {
            Some(entry) if !entry.is_expired(now) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                trace!(key = %key, "cache hit");
                return Some(entry.result.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            if let Some(entry) = slots.lru.pop(key) {
                slots.unlink(key, &entry.context);
            }
            drop(slots);
            self.counters.expirations.fetch_add(1, Ordering::Relaxed);
            self.forget(key);
        }
        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Store a result under the default TTL
    ///
    /// Returns `false` when the result was not kept because it is inconclusive.
    pub fn put(&self, goal: &F, axioms: &[F], result: ProofResult<F>) -> Result<bool> {
        self.put_with_ttl(goal, axioms, result, self.config.default_ttl())
    }

    /// Store a result with an explicit TTL that overrides the default
    pub fn put_with_ttl(&self, goal: &F, axioms: &[F], result: ProofResult<F>, ttl: Option<Duration>) -> Result<bool> {
        let key = Self::key(goal, axioms);
        self.insert(key, context_fingerprint(axioms), result, ttl)
    }

    fn insert(&self, key: Fingerprint, context: Fingerprint, result: ProofResult<F>, ttl: Option<Duration>) -> Result<bool> {
        if !result.is_conclusive() && !self.config.store_inconclusive {
            trace!(key = %key, status = %result.status, "not caching inconclusive result");
            return Ok(false);
        }
        let entry = CacheEntry {
            result,
            context,
            stored_at: Utc::now(),
            ttl,
        };
        if let Some(store) = &self.store {
            store.put(
                &key,
                &StoredEntry {
                    version: STORE_VERSION,
                    result: entry.result.clone(),
                    context,
                    stored_at: entry.stored_at,
                    ttl_ms: ttl.map(|t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX)),
                },
            )?;
        }

        let evicted = {
            let mut slots = self.slots.lock();
            slots.by_context.entry(context).or_default().insert(key);
            match slots.lru.push(key, entry) {
                Some((old_key, old)) if old_key != key => {
                    slots.unlink(&old_key, &old.context);
                    Some(old_key)
                }
                Some((_, old)) if old.context != context => {
                    slots.unlink(&key, &old.context);
                    None
                }
                _ => None,
            }
        };
        self.counters.inserts.fetch_add(1, Ordering::Relaxed);
        if let Some(old_key) = evicted {
            self.counters.evictions.fetch_add(1, Ordering::Relaxed);
            debug!(key = %old_key, "evicted least recently used proof");
            self.forget(&old_key);
        }
        Ok(true)
    }

    /// Cached result, or the result of `compute` shared with concurrent callers
    ///
    /// At most one computation runs per key. A computation that fails or is
    /// cancelled stores nothing; a waiting caller then runs its own.
    pub async fn get_or_compute<C, Fut>(&self, goal: &F, axioms: &[F], compute: C) -> Result<ProofResult<F>>
    where
        C: FnOnce() -> Fut,
        Fut: Future<Output = Result<ProofResult<F>>>,
    {
        let key = Self::key(goal, axioms);
        if let Some(hit) = self.lookup(&key) {
            return Ok(hit);
        }
        let context = context_fingerprint(axioms);

        // joiners clone the cell under the map lock, so the guard's count check is exact
        let guard = {
            let mut map = self.in_flight.lock();
            let cell = match map.get(&key) {
                Some(cell) => {
                    self.counters.coalesced.fetch_add(1, Ordering::Relaxed);
                    debug!(key = %key, "joining in-flight proof");
                    Arc::clone(cell)
                }
                None => {
                    let cell = Arc::new(OnceCell::new());
                    map.insert(key, Arc::clone(&cell));
                    cell
                }
            };
            InFlightGuard {
                map: &self.in_flight,
                key,
                cell,
            }
        };

        let ttl = self.config.default_ttl();
        let result = guard
            .cell
            .get_or_try_init(|| async {
                // another caller may have finished between lookup and registration
                if let Some(hit) = self.lookup(&key) {
                    return Ok(hit);
                }
                let result = compute().await?;
                if let Err(e) = self.insert(key, context, result.clone(), ttl) {
                    warn!(error = %e, "failed to persist proof result");
                }
                Ok::<_, TdfolError>(result)
            })
            .await?;
        Ok(result.clone())
    }

    /// Remove the entry of one problem
    pub fn invalidate(&self, goal: &F, axioms: &[F]) -> bool {
        let key = Self::key(goal, axioms);
        let removed = {
            let mut slots = self.slots.lock();
            match slots.lru.pop(&key) {
                Some(entry) => {
                    slots.unlink(&key, &entry.context);
                    true
                }
                None => false,
            }
        };
        self.forget(&key);
        removed
    }

    /// Remove every entry proved under this axiom set
    pub fn invalidate_context(&self, axioms: &[F]) -> usize {
        self.invalidate_context_fingerprint(&context_fingerprint(axioms))
    }

    pub fn invalidate_context_fingerprint(&self, context: &Fingerprint) -> usize {
        let keys: Vec<Fingerprint> = {
            let mut slots = self.slots.lock();
            let keys: Vec<Fingerprint> = slots
                .by_context
                .remove(context)
                .map(|k| k.into_iter().collect())
                .unwrap_or_default();
            for key in &keys {
                slots.lru.pop(key);
            }
            keys
        };
        for key in &keys {
            self.forget(key);
        }
        debug!(context = %context, removed = keys.len(), "invalidated axiom context");
        keys.len()
    }

    pub fn clear(&self) -> Result<()> {
        {
            let mut slots = self.slots.lock();
            slots.lru.clear();
            slots.by_context.clear();
        }
        if let Some(store) = &self.store {
            store.clear()?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.slots.lock().lru.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            inserts: self.counters.inserts.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            expirations: self.counters.expirations.load(Ordering::Relaxed),
            coalesced: self.counters.coalesced.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }

    /// Flush the persistent store, if any
    pub fn flush(&self) -> Result<()> {
        match &self.store {
            Some(store) => store.flush(),
            None => Ok(()),
        }
    }

    fn forget(&self, key: &Fingerprint) {
        if let Some(store) = &self.store {
            if let Err(e) = store.remove(key) {
                warn!(key = %key, error = %e, "failed to remove persisted proof");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::prover::ProofStatus;
    use pretty_assertions::assert_eq;

    fn f(s: &str) -> Formula {
        parse(s).unwrap()
    }

    fn proved() -> ProofResult {
        ProofResult::bare("native", ProofStatus::Proved, 1)
    }

    #[test]
    fn test_hit_after_put() {
        let cache = ProofCache::in_memory(8).unwrap();
        let axioms = vec![f("p"), f("p → q")];
        assert!(cache.get(&f("q"), &axioms).is_none());
        assert!(cache.put(&f("q"), &axioms, proved()).unwrap());
        assert_eq!(cache.get(&f("q"), &axioms).unwrap().status, ProofStatus::Proved);
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.inserts), (1, 1, 1));
    }

    #[test]
    fn test_alpha_equivalent_problems_share_entry() {
        let cache = ProofCache::in_memory(8).unwrap();
        let axioms = vec![f("∀x. Human(x) → Mortal(x)"), f("Human(Socrates)")];
        cache.put(&f("Mortal(Socrates)"), &axioms, proved()).unwrap();
        let reordered = vec![f("Human(Socrates)"), f("∀y. Human(y) → Mortal(y)")];
        assert!(cache.get(&f("Mortal(Socrates)"), &reordered).is_some());
    }

    #[test]
    fn test_inconclusive_results_are_not_kept() {
        let cache = ProofCache::in_memory(8).unwrap();
        let unknown = ProofResult::bare("native", ProofStatus::Unknown, 1);
        assert!(!cache.put(&f("q"), &[], unknown).unwrap());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_ttl_expires_immediately() {
        let cache = ProofCache::in_memory(8).unwrap();
        cache
            .put_with_ttl(&f("q"), &[], proved(), Some(Duration::ZERO))
            .unwrap();
        assert!(cache.get(&f("q"), &[]).is_none());
        assert_eq!(cache.stats().expirations, 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_lru_eviction() {
        let cache = ProofCache::in_memory(2).unwrap();
        cache.put(&f("a"), &[], proved()).unwrap();
        cache.put(&f("b"), &[], proved()).unwrap();
        assert!(cache.get(&f("a"), &[]).is_some());
        cache.put(&f("c"), &[], proved()).unwrap();
        assert!(cache.get(&f("b"), &[]).is_none());
        assert!(cache.get(&f("a"), &[]).is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_invalidate_context() {
        let cache = ProofCache::in_memory(8).unwrap();
        let kb = vec![f("p"), f("p → q")];
        cache.put(&f("q"), &kb, proved()).unwrap();
        cache.put(&f("p"), &kb, proved()).unwrap();
        cache.put(&f("p"), &[], proved()).unwrap();
        assert_eq!(cache.invalidate_context(&kb), 2);
        assert!(cache.get(&f("q"), &kb).is_none());
        assert!(cache.get(&f("p"), &[]).is_some());
        assert!(cache.invalidate(&f("p"), &[]));
        assert!(!cache.invalidate(&f("p"), &[]));
    }

    #[tokio::test]
    async fn test_get_or_compute_caches() {
        let cache = ProofCache::in_memory(8).unwrap();
        let first = cache
            .get_or_compute(&f("q"), &[], || async { Ok(proved()) })
            .await
            .unwrap();
        assert!(first.is_proved());
        let second = cache
            .get_or_compute(&f("q"), &[], || async {
                Err(TdfolError::Unsupported("should not run".into()))
            })
            .await
            .unwrap();
        assert_eq!(second, first);
    }

    #[tokio::test]
    async fn test_failed_compute_stores_nothing() {
        let cache: ProofCache = ProofCache::in_memory(8).unwrap();
        let err = cache
            .get_or_compute(&f("q"), &[], || async { Err(TdfolError::Unsupported("boom".into())) })
            .await;
        assert!(err.is_err());
        assert!(cache.is_empty());
        assert!(cache.in_flight.lock().is_empty());
    }

    #[test]
    fn test_persistence_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = CacheConfig {
            path: Some(dir.path().join("cache")),
            ..CacheConfig::default()
        };
        {
            let cache: ProofCache = ProofCache::new(config.clone()).unwrap();
            cache.put(&f("q"), &[f("q")], proved()).unwrap();
            cache.flush().unwrap();
        }
        let cache: ProofCache = ProofCache::new(config).unwrap();
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&f("q"), &[f("q")]).is_some());
    }
}
