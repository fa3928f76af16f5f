//! Prediction Cache - bounded LRU memoization of inference results
//!
//! Keys are feature fingerprints. On a miss the compute function runs at
//! most once per fingerprint at a time: concurrent callers for the same key
//! queue on a per-key lock and pick up the stored result. Failed
//! computations store nothing.
//!
//! The table is not tied to a model generation. Whether a model swap clears
//! it is decided by the caller (see `CACHE_INVALIDATE_ON_RELOAD`).

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use super::canonical::{CanonicalForm, Fingerprint};
use crate::models::PredictionResult;

// ============================================================================
// CONSTANTS
// ============================================================================

pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

// ============================================================================
// LRU TABLE
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    result: PredictionResult,
    last_used: u64,
}

/// Entries plus a recency index (tick -> key, oldest first)
#[derive(Default)]
struct LruTable {
    entries: HashMap<Fingerprint, CacheEntry>,
    recency: BTreeMap<u64, Fingerprint>,
    tick: u64,
}

impl LruTable {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    /// Lookup that marks the entry most recently used
    fn get(&mut self, key: &Fingerprint) -> Option<PredictionResult> {
        let tick = self.next_tick();
        let entry = self.entries.get_mut(key)?;
        self.recency.remove(&entry.last_used);
        entry.last_used = tick;
        self.recency.insert(tick, *key);
        Some(entry.result)
    }

    fn contains(&self, key: &Fingerprint) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert or refresh, then evict down to `capacity`. Returns evicted count.
    fn insert(&mut self, key: Fingerprint, result: PredictionResult, capacity: usize) -> usize {
        let tick = self.next_tick();
        if let Some(old) = self.entries.insert(key, CacheEntry { result, last_used: tick }) {
            self.recency.remove(&old.last_used);
        }
        self.recency.insert(tick, key);

        let mut evicted = 0;
        while self.entries.len() > capacity {
            let Some((_, oldest)) = self.recency.pop_first() else {
                break;
            };
            self.entries.remove(&oldest);
            evicted += 1;
        }
        evicted
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.recency.clear();
    }
}

// ============================================================================
// PREDICTION CACHE
// ============================================================================

/// Whether a lookup was served from the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

/// Counters for `/cache/stats`
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

pub struct PredictionCache {
    capacity: usize,
    table: Mutex<LruTable>,
    in_flight: Mutex<HashMap<Fingerprint, Arc<Mutex<()>>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl PredictionCache {
    /// A capacity of 0 is raised to 1
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            table: Mutex::new(LruTable::default()),
            in_flight: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Cached result for `key`, computing and storing it on a miss
    pub fn get_or_compute<F, E>(
        &self,
        key: Fingerprint,
        canonical: &CanonicalForm,
        compute: F,
    ) -> Result<PredictionResult, E>
    where
        F: FnOnce(&CanonicalForm) -> Result<PredictionResult, E>,
    {
        self.get_or_compute_with_status(key, canonical, compute)
            .map(|(result, _)| result)
    }

    /// Same as [`get_or_compute`](Self::get_or_compute), also reporting hit/miss
    pub fn get_or_compute_with_status<F, E>(
        &self,
        key: Fingerprint,
        canonical: &CanonicalForm,
        compute: F,
    ) -> Result<(PredictionResult, CacheStatus), E>
    where
        F: FnOnce(&CanonicalForm) -> Result<PredictionResult, E>,
    {
        if let Some(result) = self.lookup(&key) {
            return Ok((result, CacheStatus::Hit));
        }

        let key_lock = self
            .in_flight
            .lock()
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = key_lock.lock();

        // Another caller may have filled the entry while we waited
        if let Some(result) = self.lookup(&key) {
            drop(guard);
            self.release(&key, &key_lock);
            return Ok((result, CacheStatus::Hit));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let outcome = compute(canonical);

        if let Ok(result) = &outcome {
            let evicted = self.table.lock().insert(key, *result, self.capacity);
            if evicted > 0 {
                self.evictions.fetch_add(evicted as u64, Ordering::Relaxed);
                tracing::debug!(evicted, "Prediction cache full, evicted LRU entries");
            }
        }

        drop(guard);
        self.release(&key, &key_lock);

        outcome.map(|result| (result, CacheStatus::Miss))
    }

    fn lookup(&self, key: &Fingerprint) -> Option<PredictionResult> {
        let result = self.table.lock().get(key)?;
        self.hits.fetch_add(1, Ordering::Relaxed);
        Some(result)
    }

    /// Drop the per-key lock once no other caller holds or waits on it.
    ///
    /// Callers clone the lock out of `in_flight` while holding the map lock,
    /// so under that lock a strong count of 2 (map + us) means nobody else
    /// can still reach it. Removing it any earlier would let a fresh caller
    /// start a second computation next to a queued one.
    fn release(&self, key: &Fingerprint, key_lock: &Arc<Mutex<()>>) {
        let mut in_flight = self.in_flight.lock();
        let idle = in_flight.get(key).is_some_and(|current| {
            Arc::ptr_eq(current, key_lock) && Arc::strong_count(current) == 2
        });
        if idle {
            in_flight.remove(key);
        }
    }

    /// Presence check that does not touch recency
    pub fn contains(&self, key: &Fingerprint) -> bool {
        self.table.lock().contains(key)
    }

    pub fn len(&self) -> usize {
        self.table.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Remove every entry (counters are kept)
    pub fn clear(&self) {
        self.table.lock().clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.len(),
            capacity: self.capacity,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

impl Default for PredictionCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
