//! Null Data Store
//!
//! [`NullDataStore`] is the null object of the [`DataStore`] family. It can be
//! passed wherever a store is expected to switch caching off entirely: it never
//! holds an entry, and [`get_or_create`](DataStore::get_or_create) runs the
//! factory on every call.

use crate::error::StoreError;
use crate::store::{DataStore, Snapshot};
use core::fmt;
use core::marker::PhantomData;

/// A store that never stores anything.
///
/// # Examples
///
/// ```
/// use datastore_rs::{DataStore, NullDataStore};
///
/// let store: NullDataStore<&str, i32> = NullDataStore::new();
/// assert!(store.is_null());
///
/// store.set("a", 1);
/// assert_eq!(store.try_get(&"a").unwrap(), None);
/// assert_eq!(store.get_or_insert_with("a", |_| 2).unwrap(), 2);
/// ```
pub struct NullDataStore<K, V> {
    _marker: PhantomData<fn(K) -> V>,
}

impl<K, V> NullDataStore<K, V> {
    /// Creates the null store.
    pub fn new() -> Self {
        NullDataStore {
            _marker: PhantomData,
        }
    }
}

impl<K, V> Default for NullDataStore<K, V> {
    fn default() -> Self {
        NullDataStore::new()
    }
}

impl<K, V> Clone for NullDataStore<K, V> {
    fn clone(&self) -> Self {
        NullDataStore::new()
    }
}

impl<K: Clone, V> DataStore<K, V> for NullDataStore<K, V> {
    fn is_null(&self) -> bool {
        true
    }

    fn contains_key(&self, _key: &K) -> Result<bool, StoreError<K, V>> {
        Ok(false)
    }

    fn add(&self, _key: K, _value: V) -> Result<(), StoreError<K, V>> {
        Ok(())
    }

    fn remove(&self, _key: &K) -> Result<bool, StoreError<K, V>> {
        Ok(false)
    }

    fn clear(&self) {}

    fn get(&self, key: &K) -> Result<V, StoreError<K, V>> {
        Err(StoreError::KeyNotFound { key: key.clone() })
    }

    fn set(&self, _key: K, _value: V) {}

    fn try_get(&self, _key: &K) -> Result<Option<V>, StoreError<K, V>> {
        Ok(None)
    }

    fn get_or_create<E, F>(&self, key: K, factory: F) -> Result<V, E>
    where
        F: FnOnce(&K) -> Result<V, E>,
        E: From<StoreError<K, V>>,
    {
        factory(&key)
    }

    fn snapshot(&self) -> Snapshot<K, V> {
        Snapshot::empty()
    }

    fn len(&self) -> usize {
        0
    }
}

impl<K, V> fmt::Debug for NullDataStore<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NullDataStore")
    }
}
