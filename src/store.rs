//! The Data Store Contract
//!
//! [`DataStore`] is the operation set shared by every store in this crate.
//! Callers interact only through this trait; decorators such as
//! [`ExpiringDataStore`](crate::ExpiringDataStore) and
//! [`LockingDataStoreDecorator`](crate::LockingDataStoreDecorator) implement it
//! by delegating to the store they wrap.
//!
//! # Interior Mutability
//!
//! Every operation takes `&self`. A factory passed to
//! [`get_or_create`](DataStore::get_or_create) may therefore capture the store
//! and call back into it while the key it is computing is still *in flight*.
//! Such reentrant calls are permitted for other keys and for `clear`, and
//! rejected with [`StoreError::ReentrantAccess`] for the in-flight key itself.
//!
//! # Null Values
//!
//! A store distinguishes "absent" from "present with a null value". Use
//! `V = Option<T>` for nullable values: `try_get` then yields `Some(None)` for
//! a key stored with `None`, and `None` for a key that is absent.
//!
//! # Example
//!
//! ```
//! use datastore_rs::{DataStore, SimpleDataStore};
//!
//! let store: SimpleDataStore<String, usize> = SimpleDataStore::new();
//!
//! let len = store
//!     .get_or_insert_with("hello".to_string(), |key| key.len())
//!     .unwrap();
//! assert_eq!(len, 5);
//!
//! // The factory is not invoked again once the value is memoized.
//! let len = store
//!     .get_or_insert_with("hello".to_string(), |_| unreachable!())
//!     .unwrap();
//! assert_eq!(len, 5);
//! ```

use crate::error::StoreError;
use std::slice;
use std::vec;

/// Common operation set of all key/value data stores.
///
/// Values are handed out by clone; a store never exposes references into
/// its internal map.
pub trait DataStore<K, V> {
    /// Returns `true` only for null-object stores that never hold entries.
    fn is_null(&self) -> bool {
        false
    }

    /// Returns `true` if `key` is present.
    fn contains_key(&self, key: &K) -> Result<bool, StoreError<K, V>>;

    /// Inserts `key`, failing with [`StoreError::DuplicateKey`] if it is already present.
    fn add(&self, key: K, value: V) -> Result<(), StoreError<K, V>>;

    /// Removes `key`, returning `true` if it was present.
    fn remove(&self, key: &K) -> Result<bool, StoreError<K, V>>;

    /// Removes all entries.
    fn clear(&self);

    /// Returns the value for `key`, failing with [`StoreError::KeyNotFound`] if absent.
    fn get(&self, key: &K) -> Result<V, StoreError<K, V>>;

    /// Inserts or overwrites the value for `key`.
    fn set(&self, key: K, value: V);

    /// Returns the value for `key`, or `None` if absent.
    fn try_get(&self, key: &K) -> Result<Option<V>, StoreError<K, V>>;

    /// Returns the value for `key`, or `None` if absent.
    ///
    /// Identical to [`try_get`](DataStore::try_get).
    fn get_or_default(&self, key: &K) -> Result<Option<V>, StoreError<K, V>> {
        self.try_get(key)
    }

    /// Returns the value for `key`, computing and storing it with `factory` if absent.
    ///
    /// The factory runs at most once per successful insertion. If it fails,
    /// its error is returned unchanged and nothing is stored, so a later call
    /// runs a fresh factory. The factory is dropped before this call returns.
    ///
    /// Errors raised by the store itself are converted into `E` through `From`.
    fn get_or_create<E, F>(&self, key: K, factory: F) -> Result<V, E>
    where
        F: FnOnce(&K) -> Result<V, E>,
        E: From<StoreError<K, V>>;

    /// [`get_or_create`](DataStore::get_or_create) for factories that cannot fail.
    fn get_or_insert_with<F>(&self, key: K, factory: F) -> Result<V, StoreError<K, V>>
    where
        F: FnOnce(&K) -> V,
    {
        self.get_or_create(key, |k| Ok(factory(k)))
    }

    /// Returns a snapshot of all committed entries in insertion order.
    ///
    /// Keys whose factory is still running are not part of the snapshot.
    fn snapshot(&self) -> Snapshot<K, V>;

    /// Returns the number of committed entries.
    fn len(&self) -> usize;

    /// Returns `true` if the store holds no committed entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An owned, point-in-time copy of a store's entries.
///
/// Taking a snapshot does not hold any lock on the store, and later mutations
/// of the store are not reflected in it. The snapshot can be iterated any
/// number of times.
///
/// # Examples
///
/// ```
/// use datastore_rs::{DataStore, SimpleDataStore};
///
/// let store = SimpleDataStore::new();
/// store.set("a", 1);
/// store.set("b", 2);
///
/// let snapshot = store.snapshot();
/// store.clear();
///
/// let pairs: Vec<_> = snapshot.iter().cloned().collect();
/// assert_eq!(pairs, vec![("a", 1), ("b", 2)]);
/// // Restartable.
/// assert_eq!(snapshot.iter().count(), 2);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot<K, V> {
    entries: Vec<(K, V)>,
}

impl<K, V> Snapshot<K, V> {
    pub(crate) fn from_entries(entries: Vec<(K, V)>) -> Self {
        Snapshot { entries }
    }

    /// Builds a snapshot from `(sequence, key, value)` triples, ordered by sequence.
    pub(crate) fn from_sequenced(mut entries: Vec<(u64, K, V)>) -> Self {
        entries.sort_unstable_by_key(|(seq, _, _)| *seq);
        Snapshot {
            entries: entries.into_iter().map(|(_, k, v)| (k, v)).collect(),
        }
    }

    /// Returns an empty snapshot.
    pub fn empty() -> Self {
        Snapshot {
            entries: Vec::new(),
        }
    }

    /// Returns the number of entries in the snapshot.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the snapshot has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the `(key, value)` pairs.
    pub fn iter(&self) -> slice::Iter<'_, (K, V)> {
        self.entries.iter()
    }

    /// Iterates over the keys.
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.entries.iter().map(|(k, _)| k)
    }

    /// Iterates over the values.
    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.entries.iter().map(|(_, v)| v)
    }

    /// Consumes the snapshot, returning its entries.
    pub fn into_vec(self) -> Vec<(K, V)> {
        self.entries
    }
}

impl<K, V> IntoIterator for Snapshot<K, V> {
    type Item = (K, V);
    type IntoIter = vec::IntoIter<(K, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a, K, V> IntoIterator for &'a Snapshot<K, V> {
    type Item = &'a (K, V);
    type IntoIter = slice::Iter<'a, (K, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
