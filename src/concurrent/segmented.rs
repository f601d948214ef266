//! Concurrent Data Store Implementation
//!
//! A thread-safe store using lock striping (segmented storage) with per-key
//! coordination of `get_or_create`. This is the multi-threaded counterpart to
//! [`SimpleDataStore`](crate::SimpleDataStore) and shares its entry table.
//!
//! # How It Works
//!
//! ```text
//!  thread A: get_or_create(k, fa)          thread B: get_or_create(k, fb)
//!  ─────────────────────────────           ─────────────────────────────
//!  lock segment
//!  k absent → mark k InFlight(A)
//!  unlock segment                          lock segment
//!  run fa(k) ...                           k InFlight(A) → wait on condvar
//!  lock segment                              (segment unlocked while waiting)
//!  commit v, notify_all
//!  unlock segment                          wake: k Present(v) → return v
//! ```
//!
//! - Two callers of the **same** key: exactly one factory runs; the other
//!   observes its result (even a null-equivalent one).
//! - Two callers of **different** keys: both factories run in parallel; no
//!   lock is held while a factory runs.
//! - Readers of an in-flight key (`try_get`, `contains_key`, ...) wait for the
//!   factory and then report the final state.
//! - A failed factory removes its marker and wakes the waiters; the next
//!   caller runs a fresh factory.
//!
//! # Trade-offs
//!
//! - **Pros**: No global lock, factories for different keys never serialize
//! - **Cons**: A factory that waits on another factory for a key in a cyclic
//!   dependency deadlocks; avoiding such cycles is the caller's responsibility
//!
//! # Thread Safety
//!
//! `ConcurrentDataStore` is `Send + Sync` when its keys, values and comparer
//! are, and can be shared via `Arc`.

use crate::comparer::{DefaultComparer, KeyComparer};
use crate::config::ConcurrentDataStoreConfig;
use crate::entry::StoreEntry;
use crate::error::{StoreError, GET_OR_CREATE};
use crate::simple::{Lookup, StoreSegment};
use crate::store::{DataStore, Snapshot};
use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};
use log::trace;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::thread;

/// One lock stripe: the entry table plus the condition variable signalled
/// whenever an in-flight key settles.
struct Segment<K, V> {
    entries: Mutex<StoreSegment<K, V>>,
    settled: Condvar,
}

impl<K, V> Segment<K, V> {
    fn new() -> Self {
        Segment {
            entries: Mutex::new(StoreSegment::new()),
            settled: Condvar::new(),
        }
    }
}

/// A thread-safe key/value store with per-key `get_or_create` exclusivity.
///
/// # Type Parameters
///
/// - `K`: Key type. Must implement `Clone`.
/// - `V`: Value type. Must implement `Clone`.
/// - `C`: Key comparer. Defaults to natural equality.
///
/// # Example
///
/// ```rust
/// use datastore_rs::{ConcurrentDataStore, DataStore};
///
/// let store: ConcurrentDataStore<String, usize> = ConcurrentDataStore::new();
/// let len = store.get_or_insert_with("four".to_string(), |k| k.len()).unwrap();
/// assert_eq!(len, 4);
/// assert!(store.contains_key(&"four".to_string()).unwrap());
/// ```
pub struct ConcurrentDataStore<K, V, C = DefaultComparer> {
    segments: Box<[Segment<K, V>]>,
    comparer: C,
    next_seq: AtomicU64,
}

impl<K, V> ConcurrentDataStore<K, V> {
    /// Creates an empty store with the default segment count and natural key equality.
    pub fn new() -> Self {
        ConcurrentDataStore::init(ConcurrentDataStoreConfig::default(), DefaultComparer::new())
    }
}

impl<K, V> Default for ConcurrentDataStore<K, V> {
    fn default() -> Self {
        ConcurrentDataStore::new()
    }
}

impl<K, V, C> ConcurrentDataStore<K, V, C> {
    /// Creates an empty store with the default segment count and a custom comparer.
    pub fn with_comparer(comparer: C) -> Self {
        ConcurrentDataStore::init(ConcurrentDataStoreConfig::default(), comparer)
    }

    /// Creates an empty store from a configuration and a key comparer.
    ///
    /// This is the **recommended** way to create a concurrent store when the
    /// segment count matters.
    pub fn init(config: ConcurrentDataStoreConfig, comparer: C) -> Self {
        let segments: Vec<_> = (0..config.segments.max(1)).map(|_| Segment::new()).collect();
        ConcurrentDataStore {
            segments: segments.into_boxed_slice(),
            comparer,
            next_seq: AtomicU64::new(0),
        }
    }

    /// Returns the number of segments in the store.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Returns the key comparer.
    pub fn comparer(&self) -> &C {
        &self.comparer
    }

    /// Returns the segment for the given key hash.
    ///
    /// The low hash bits select buckets inside a segment's table, so the
    /// segment is picked from the upper half.
    #[inline]
    fn segment(&self, hash: u64) -> &Segment<K, V> {
        &self.segments[((hash >> 32) as usize) % self.segments.len()]
    }

    #[inline]
    fn take_seq(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::Relaxed)
    }
}

impl<K, V, C> ConcurrentDataStore<K, V, C>
where
    C: KeyComparer<K>,
{
    /// Locks the segment of `key` once no other thread has `key` in flight.
    ///
    /// The flag is `true` when `key` is in flight on the current thread.
    fn lock_settled<'a>(
        &self,
        segment: &'a Segment<K, V>,
        hash: u64,
        key: &K,
    ) -> (MutexGuard<'a, StoreSegment<K, V>>, bool) {
        let current = thread::current().id();
        let mut guard = segment.entries.lock();
        loop {
            let owner = match guard.lookup(&self.comparer, hash, key) {
                Lookup::InFlight(owner) => owner,
                Lookup::Absent | Lookup::Present(_) => return (guard, false),
            };
            if owner == current {
                return (guard, true);
            }
            trace!("waiting for an in-flight factory on {:?}", owner);
            segment.settled.wait(&mut guard);
        }
    }

    fn committed_value(&self, key: &K, operation: &'static str) -> Result<Option<V>, StoreError<K, V>>
    where
        K: Clone,
        V: Clone,
    {
        let hash = self.comparer.hash_key(key);
        let (guard, reentrant) = self.lock_settled(self.segment(hash), hash, key);
        if reentrant {
            return Err(StoreError::reentrant(key.clone(), operation));
        }
        let found = match guard.lookup(&self.comparer, hash, key) {
            Lookup::Present(value) => Some(value.clone()),
            Lookup::Absent | Lookup::InFlight(_) => None,
        };
        Ok(found)
    }
}

impl<K, V, C> DataStore<K, V> for ConcurrentDataStore<K, V, C>
where
    K: Clone,
    V: Clone,
    C: KeyComparer<K>,
{
    fn contains_key(&self, key: &K) -> Result<bool, StoreError<K, V>> {
        Ok(self.committed_value(key, "contains_key")?.is_some())
    }

    fn add(&self, key: K, value: V) -> Result<(), StoreError<K, V>> {
        let hash = self.comparer.hash_key(&key);
        let (mut guard, reentrant) = self.lock_settled(self.segment(hash), hash, &key);
        if reentrant {
            return Err(StoreError::reentrant(key, "add"));
        }
        if let Lookup::Present(existing) = guard.lookup(&self.comparer, hash, &key) {
            return Err(StoreError::DuplicateKey {
                existing: existing.clone(),
                key,
                new: value,
            });
        }
        guard.insert(StoreEntry::present(key, hash, self.take_seq(), value));
        Ok(())
    }

    fn remove(&self, key: &K) -> Result<bool, StoreError<K, V>> {
        let hash = self.comparer.hash_key(key);
        let (mut guard, reentrant) = self.lock_settled(self.segment(hash), hash, key);
        if reentrant {
            return Err(StoreError::reentrant(key.clone(), "remove"));
        }
        let removed = guard.remove(&self.comparer, hash, key).is_some();
        Ok(removed)
    }

    fn clear(&self) {
        for segment in self.segments.iter() {
            segment.entries.lock().clear();
        }
    }

    fn get(&self, key: &K) -> Result<V, StoreError<K, V>> {
        self.committed_value(key, "get")?
            .ok_or_else(|| StoreError::KeyNotFound { key: key.clone() })
    }

    fn set(&self, key: K, value: V) {
        let hash = self.comparer.hash_key(&key);
        let segment = self.segment(hash);
        // Replacing the current thread's own in-flight marker is allowed.
        let (mut guard, _) = self.lock_settled(segment, hash, &key);
        guard.set(&self.comparer, hash, key, value, self.take_seq());
        drop(guard);
        segment.settled.notify_all();
    }

    fn try_get(&self, key: &K) -> Result<Option<V>, StoreError<K, V>> {
        self.committed_value(key, "try_get")
    }

    fn get_or_default(&self, key: &K) -> Result<Option<V>, StoreError<K, V>> {
        self.committed_value(key, "get_or_default")
    }

    fn get_or_create<E, F>(&self, key: K, factory: F) -> Result<V, E>
    where
        F: FnOnce(&K) -> Result<V, E>,
        E: From<StoreError<K, V>>,
    {
        let hash = self.comparer.hash_key(&key);
        let segment = self.segment(hash);
        {
            let (mut guard, reentrant) = self.lock_settled(segment, hash, &key);
            if reentrant {
                return Err(StoreError::reentrant(key, GET_OR_CREATE).into());
            }
            if let Lookup::Present(value) = guard.lookup(&self.comparer, hash, &key) {
                return Ok(value.clone());
            }
            guard.insert(StoreEntry::in_flight(key.clone(), hash, self.take_seq()));
        }

        let pending = PendingEntry {
            store: self,
            segment,
            hash,
            key: &key,
            armed: true,
        };
        let value = factory(&key)?;
        Ok(pending.commit(value))
    }

    /// Returns a point-in-time snapshot of all committed entries.
    ///
    /// Every segment is locked, in index order, before any entry is copied.
    /// No other operation holds more than one segment lock.
    fn snapshot(&self) -> Snapshot<K, V> {
        let guards: Vec<_> = self.segments.iter().map(|s| s.entries.lock()).collect();
        let entries = guards
            .iter()
            .flat_map(|guard| guard.committed())
            .map(|(seq, key, value)| (seq, key.clone(), value.clone()))
            .collect();
        drop(guards);
        Snapshot::from_sequenced(entries)
    }

    /// Returns the number of committed entries.
    ///
    /// Note: This acquires a lock on each segment sequentially, so the
    /// returned value may be slightly stale in high-concurrency scenarios.
    fn len(&self) -> usize {
        self.segments.iter().map(|s| s.entries.lock().len()).sum()
    }
}

/// Settles an in-flight entry and wakes its waiters, including when the
/// factory fails or panics.
struct PendingEntry<'a, K, V, C>
where
    C: KeyComparer<K>,
{
    store: &'a ConcurrentDataStore<K, V, C>,
    segment: &'a Segment<K, V>,
    hash: u64,
    key: &'a K,
    armed: bool,
}

impl<K, V, C> PendingEntry<'_, K, V, C>
where
    C: KeyComparer<K>,
{
    fn commit(mut self, value: V) -> V
    where
        V: Clone,
    {
        self.armed = false;
        let value = self.segment.entries.lock().complete(
            &self.store.comparer,
            self.hash,
            self.key,
            value,
        );
        self.segment.settled.notify_all();
        value
    }
}

impl<K, V, C> Drop for PendingEntry<'_, K, V, C>
where
    C: KeyComparer<K>,
{
    fn drop(&mut self) {
        if self.armed {
            self.segment
                .entries
                .lock()
                .abandon(&self.store.comparer, self.hash, self.key);
            self.segment.settled.notify_all();
        }
    }
}

impl<K, V, C> fmt::Debug for ConcurrentDataStore<K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total_len: usize = self.segments.iter().map(|s| s.entries.lock().len()).sum();
        f.debug_struct("ConcurrentDataStore")
            .field("segment_count", &self.segments.len())
            .field("total_len", &total_len)
            .finish()
    }
}
