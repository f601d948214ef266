//! Simple Data Store Implementation
//!
//! [`SimpleDataStore`] is the single-threaded reference implementation of the
//! [`DataStore`] contract, backed by a hash table keyed through a pluggable
//! [`KeyComparer`].
//!
//! # Memoization
//!
//! [`get_or_create`](DataStore::get_or_create) marks the key *in flight*
//! before running the factory and commits the result afterwards:
//!
//! ```text
//!   lookup(k) ──hit──▶ return v
//!      │
//!     miss
//!      ▼
//!   mark k in flight ──▶ factory(k) ──Ok(v)──▶ commit v ──▶ return v
//!                            │
//!                           Err(e) ──▶ unmark k ──▶ return e
//! ```
//!
//! While `k` is in flight, the factory may use the store freely for other
//! keys and may call `clear`. Touching `k` itself fails with
//! [`StoreError::ReentrantAccess`], with one exception: `set(k, v)` replaces
//! the in-flight marker, and that value wins over the factory's result.
//! A `clear` issued by the factory wins as well: the factory's result is
//! returned to the caller but `k` stays absent.
//!
//! # Thread Safety
//!
//! This implementation is not thread-safe (it is `Send` but not `Sync`). For
//! concurrent access wrap it in a
//! [`LockingDataStoreDecorator`](crate::LockingDataStoreDecorator), or use
//! [`ConcurrentDataStore`](crate::ConcurrentDataStore).

use crate::comparer::{DefaultComparer, KeyComparer};
use crate::entry::{EntryState, StoreEntry};
use crate::error::{StoreError, GET_OR_CREATE};
use crate::store::{DataStore, Snapshot};
use core::cell::{Cell, RefCell};
use core::fmt;
use hashbrown::HashTable;
use std::thread::ThreadId;

/// Result of looking up a key in a [`StoreSegment`].
pub(crate) enum Lookup<'a, V> {
    Absent,
    InFlight(ThreadId),
    Present(&'a V),
}

/// Hash table of entries with in-flight bookkeeping.
///
/// This is shared between `SimpleDataStore` (single-threaded) and
/// `ConcurrentDataStore` (one segment per lock). All slot state transitions
/// are implemented here; callers supply the comparer, the key hash, and the
/// insertion sequence number.
pub(crate) struct StoreSegment<K, V> {
    table: HashTable<StoreEntry<K, V>>,
    in_flight: usize,
}

impl<K, V> StoreSegment<K, V> {
    pub(crate) fn new() -> Self {
        StoreSegment {
            table: HashTable::new(),
            in_flight: 0,
        }
    }

    /// Number of committed entries.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.table.len() - self.in_flight
    }

    pub(crate) fn lookup<C>(&self, comparer: &C, hash: u64, key: &K) -> Lookup<'_, V>
    where
        C: KeyComparer<K>,
    {
        match self
            .table
            .find(hash, |entry| comparer.keys_equal(&entry.key, key))
        {
            None => Lookup::Absent,
            Some(entry) => match &entry.state {
                EntryState::InFlight { owner, .. } => Lookup::InFlight(*owner),
                EntryState::Present(value) => Lookup::Present(value),
            },
        }
    }

    /// Inserts an entry whose key the caller has verified to be absent.
    pub(crate) fn insert(&mut self, entry: StoreEntry<K, V>) {
        if entry.is_in_flight() {
            self.in_flight += 1;
        }
        self.table.insert_unique(entry.hash, entry, |e| e.hash);
    }

    /// Inserts or overwrites `key`. Overwriting keeps the original insertion order.
    pub(crate) fn set<C>(&mut self, comparer: &C, hash: u64, key: K, value: V, seq: u64)
    where
        C: KeyComparer<K>,
    {
        match self
            .table
            .find_mut(hash, |entry| comparer.keys_equal(&entry.key, &key))
        {
            Some(entry) => {
                if entry.is_in_flight() {
                    self.in_flight -= 1;
                }
                entry.state = EntryState::Present(value);
            }
            None => self.insert(StoreEntry::present(key, hash, seq, value)),
        }
    }

    /// Removes `key`, returning its entry.
    pub(crate) fn remove<C>(&mut self, comparer: &C, hash: u64, key: &K) -> Option<StoreEntry<K, V>>
    where
        C: KeyComparer<K>,
    {
        let occupied = self
            .table
            .find_entry(hash, |entry| comparer.keys_equal(&entry.key, key))
            .ok()?;
        let (entry, _) = occupied.remove();
        if entry.is_in_flight() {
            self.in_flight -= 1;
        }
        Some(entry)
    }

    /// Drops every committed entry. In-flight entries are kept but marked
    /// discarded, so their factory results are never committed.
    pub(crate) fn clear(&mut self) {
        self.table.retain(|entry| match &mut entry.state {
            EntryState::InFlight { discarded, .. } => {
                *discarded = true;
                true
            }
            EntryState::Present(_) => false,
        });
    }

    /// Commits a factory result for an in-flight `key` and returns the value
    /// the caller should observe.
    pub(crate) fn complete<C>(&mut self, comparer: &C, hash: u64, key: &K, value: V) -> V
    where
        C: KeyComparer<K>,
        V: Clone,
    {
        let mut occupied = match self
            .table
            .find_entry(hash, |entry| comparer.keys_equal(&entry.key, key))
        {
            Ok(occupied) => occupied,
            Err(_) => return value,
        };
        let discarded = match &occupied.get().state {
            EntryState::InFlight { discarded, .. } => *discarded,
            // Replaced by a reentrant `set`; the stored value wins.
            EntryState::Present(existing) => return existing.clone(),
        };
        self.in_flight -= 1;
        if discarded {
            occupied.remove();
        } else {
            occupied.get_mut().state = EntryState::Present(value.clone());
        }
        value
    }

    /// Removes the in-flight entry for `key` after its factory failed.
    pub(crate) fn abandon<C>(&mut self, comparer: &C, hash: u64, key: &K)
    where
        C: KeyComparer<K>,
    {
        if let Ok(occupied) = self
            .table
            .find_entry(hash, |entry| comparer.keys_equal(&entry.key, key))
        {
            if occupied.get().is_in_flight() {
                occupied.remove();
                self.in_flight -= 1;
            }
        }
    }

    /// Iterates over committed entries as `(seq, key, value)`.
    pub(crate) fn committed(&self) -> impl Iterator<Item = (u64, &K, &V)> + '_ {
        self.table
            .iter()
            .filter_map(|entry| entry.value().map(|value| (entry.seq, &entry.key, value)))
    }
}

impl<K, V> fmt::Debug for StoreSegment<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreSegment")
            .field("len", &self.len())
            .field("in_flight", &self.in_flight)
            .finish()
    }
}

/// A single-threaded key/value store with memoizing `get_or_create`.
///
/// # Examples
///
/// ```
/// use datastore_rs::{DataStore, SimpleDataStore, StoreError};
///
/// let store: SimpleDataStore<&str, i32> = SimpleDataStore::new();
///
/// store.add("a", 1).unwrap();
/// store.set("a", 2);
/// assert_eq!(store.get(&"a").unwrap(), 2);
///
/// // A failing factory leaves nothing behind.
/// let failed: Result<i32, StoreError<&str, i32>> =
///     store.get_or_create("b", |key| Err(StoreError::KeyNotFound { key: *key }));
/// assert!(failed.is_err());
/// assert!(!store.contains_key(&"b").unwrap());
/// ```
pub struct SimpleDataStore<K, V, C = DefaultComparer> {
    comparer: C,
    segment: RefCell<StoreSegment<K, V>>,
    next_seq: Cell<u64>,
}

impl<K, V> SimpleDataStore<K, V> {
    /// Creates an empty store using natural key equality.
    pub fn new() -> Self {
        SimpleDataStore::with_comparer(DefaultComparer::new())
    }
}

impl<K, V> Default for SimpleDataStore<K, V> {
    fn default() -> Self {
        SimpleDataStore::new()
    }
}

impl<K, V, C> SimpleDataStore<K, V, C> {
    /// Creates an empty store that compares keys with `comparer`.
    pub fn with_comparer(comparer: C) -> Self {
        SimpleDataStore {
            comparer,
            segment: RefCell::new(StoreSegment::new()),
            next_seq: Cell::new(0),
        }
    }

    /// Returns the key comparer.
    pub fn comparer(&self) -> &C {
        &self.comparer
    }

    #[inline]
    fn take_seq(&self) -> u64 {
        let seq = self.next_seq.get();
        self.next_seq.set(seq.wrapping_add(1));
        seq
    }
}

impl<K, V, C> SimpleDataStore<K, V, C>
where
    K: Clone,
    C: KeyComparer<K>,
{
    /// Looks `key` up, failing if it is in flight.
    fn committed_value(&self, key: &K, operation: &'static str) -> Result<Option<V>, StoreError<K, V>>
    where
        V: Clone,
    {
        let hash = self.comparer.hash_key(key);
        let segment = self.segment.borrow();
        let found = match segment.lookup(&self.comparer, hash, key) {
            Lookup::Absent => Ok(None),
            Lookup::Present(value) => Ok(Some(value.clone())),
            Lookup::InFlight(_) => Err(StoreError::reentrant(key.clone(), operation)),
        };
        found
    }
}

impl<K, V, C> DataStore<K, V> for SimpleDataStore<K, V, C>
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
        let mut segment = self.segment.borrow_mut();
        match segment.lookup(&self.comparer, hash, &key) {
            Lookup::Present(existing) => {
                return Err(StoreError::DuplicateKey {
                    existing: existing.clone(),
                    key,
                    new: value,
                })
            }
            Lookup::InFlight(_) => return Err(StoreError::reentrant(key, "add")),
            Lookup::Absent => {}
        }
        let seq = self.take_seq();
        segment.insert(StoreEntry::present(key, hash, seq, value));
        Ok(())
    }

    fn remove(&self, key: &K) -> Result<bool, StoreError<K, V>> {
        let hash = self.comparer.hash_key(key);
        let mut segment = self.segment.borrow_mut();
        if let Lookup::InFlight(_) = segment.lookup(&self.comparer, hash, key) {
            return Err(StoreError::reentrant(key.clone(), "remove"));
        }
        let removed = segment.remove(&self.comparer, hash, key).is_some();
        Ok(removed)
    }

    fn clear(&self) {
        self.segment.borrow_mut().clear();
    }

    fn get(&self, key: &K) -> Result<V, StoreError<K, V>> {
        self.committed_value(key, "get")?
            .ok_or_else(|| StoreError::KeyNotFound { key: key.clone() })
    }

    fn set(&self, key: K, value: V) {
        let hash = self.comparer.hash_key(&key);
        let seq = self.take_seq();
        self.segment
            .borrow_mut()
            .set(&self.comparer, hash, key, value, seq);
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
        {
            let mut segment = self.segment.borrow_mut();
            match segment.lookup(&self.comparer, hash, &key) {
                Lookup::Present(value) => return Ok(value.clone()),
                Lookup::InFlight(_) => return Err(StoreError::reentrant(key, GET_OR_CREATE).into()),
                Lookup::Absent => {}
            }
            let seq = self.take_seq();
            segment.insert(StoreEntry::in_flight(key.clone(), hash, seq));
        }

        // No borrow of the segment is held while the factory runs.
        let pending = PendingEntry {
            store: self,
            hash,
            key: &key,
            armed: true,
        };
        let value = factory(&key)?;
        Ok(pending.commit(value))
    }

    fn snapshot(&self) -> Snapshot<K, V> {
        let segment = self.segment.borrow();
        Snapshot::from_sequenced(
            segment
                .committed()
                .map(|(seq, key, value)| (seq, key.clone(), value.clone()))
                .collect(),
        )
    }

    fn len(&self) -> usize {
        self.segment.borrow().len()
    }
}

/// Removes an in-flight entry unless it is committed, including when the
/// factory panics.
struct PendingEntry<'a, K, V, C>
where
    C: KeyComparer<K>,
{
    store: &'a SimpleDataStore<K, V, C>,
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
        self.store
            .segment
            .borrow_mut()
            .complete(&self.store.comparer, self.hash, self.key, value)
    }
}

impl<K, V, C> Drop for PendingEntry<'_, K, V, C>
where
    C: KeyComparer<K>,
{
    fn drop(&mut self) {
        if self.armed {
            if let Ok(mut segment) = self.store.segment.try_borrow_mut() {
                segment.abandon(&self.store.comparer, self.hash, self.key);
            }
        }
    }
}

impl<K, V, C> fmt::Debug for SimpleDataStore<K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleDataStore")
            .field("segment", &self.segment)
            .finish()
    }
}
