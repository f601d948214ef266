//! Coarse-Grained Locking Decorator
//!
//! [`LockingDataStoreDecorator`] makes any [`DataStore`] shareable across
//! threads by serializing every call behind one re-entrant mutex.
//!
//! ```text
//!   thread A ──┐                       ┌──────────────────────────┐
//!   thread B ──┼──▶ ReentrantMutex ──▶ │ inner store (any S)      │
//!   thread C ──┘    (held for the      │  get_or_create(k, f)     │
//!                    whole call, f      │    └─ f may call back ──┐│
//!                    included)          └─────────────────────────┼┘
//!                         ▲                                       │
//!                         └───── same thread: re-acquired ────────┘
//! ```
//!
//! The lock is held while a `get_or_create` factory runs. Nested calls made by
//! that factory on the same thread re-acquire the lock and reach the inner
//! store, whose own reentrancy rules apply. Threads calling from outside wait
//! for the whole operation, factory included. When factories are slow, prefer
//! [`LazyLockingDataStoreAdapter`](crate::LazyLockingDataStoreAdapter).

use crate::error::StoreError;
use crate::store::{DataStore, Snapshot};
use core::fmt;
use parking_lot::ReentrantMutex;

/// Serializes all access to an inner store behind a re-entrant lock.
///
/// The decorator is `Sync` whenever the inner store is `Send`, so a
/// single-threaded store such as [`SimpleDataStore`](crate::SimpleDataStore)
/// can be shared through an `Arc`.
///
/// # Example
///
/// ```rust
/// use datastore_rs::{DataStore, LockingDataStoreDecorator, SimpleDataStore};
/// use std::sync::Arc;
/// use std::thread;
///
/// let store = Arc::new(LockingDataStoreDecorator::new(SimpleDataStore::<u32, u32>::new()));
///
/// let writer = {
///     let store = Arc::clone(&store);
///     thread::spawn(move || store.set(1, 10))
/// };
/// writer.join().unwrap();
///
/// assert_eq!(store.get(&1).unwrap(), 10);
/// ```
pub struct LockingDataStoreDecorator<S> {
    inner: ReentrantMutex<S>,
}

impl<S> LockingDataStoreDecorator<S> {
    /// Wraps `inner` behind a re-entrant lock.
    pub fn new(inner: S) -> Self {
        LockingDataStoreDecorator {
            inner: ReentrantMutex::new(inner),
        }
    }

    /// Runs `f` against the inner store while holding the lock.
    ///
    /// Use this to perform several operations atomically with respect to other
    /// threads.
    pub fn with_inner<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&S) -> R,
    {
        let guard = self.inner.lock();
        f(&guard)
    }

    /// Consumes the decorator, returning the inner store.
    pub fn into_inner(self) -> S {
        self.inner.into_inner()
    }
}

impl<S: Default> Default for LockingDataStoreDecorator<S> {
    fn default() -> Self {
        LockingDataStoreDecorator::new(S::default())
    }
}

impl<K, V, S> DataStore<K, V> for LockingDataStoreDecorator<S>
where
    S: DataStore<K, V>,
{
    fn is_null(&self) -> bool {
        self.inner.lock().is_null()
    }

    fn contains_key(&self, key: &K) -> Result<bool, StoreError<K, V>> {
        self.inner.lock().contains_key(key)
    }

    fn add(&self, key: K, value: V) -> Result<(), StoreError<K, V>> {
        self.inner.lock().add(key, value)
    }

    fn remove(&self, key: &K) -> Result<bool, StoreError<K, V>> {
        self.inner.lock().remove(key)
    }

    fn clear(&self) {
        self.inner.lock().clear();
    }

    fn get(&self, key: &K) -> Result<V, StoreError<K, V>> {
        self.inner.lock().get(key)
    }

    fn set(&self, key: K, value: V) {
        self.inner.lock().set(key, value);
    }

    fn try_get(&self, key: &K) -> Result<Option<V>, StoreError<K, V>> {
        self.inner.lock().try_get(key)
    }

    fn get_or_default(&self, key: &K) -> Result<Option<V>, StoreError<K, V>> {
        self.inner.lock().get_or_default(key)
    }

    fn get_or_create<E, F>(&self, key: K, factory: F) -> Result<V, E>
    where
        F: FnOnce(&K) -> Result<V, E>,
        E: From<StoreError<K, V>>,
    {
        let guard = self.inner.lock();
        guard.get_or_create(key, factory)
    }

    fn snapshot(&self) -> Snapshot<K, V> {
        self.inner.lock().snapshot()
    }

    fn len(&self) -> usize {
        self.inner.lock().len()
    }
}

impl<S: fmt::Debug> fmt::Debug for LockingDataStoreDecorator<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockingDataStoreDecorator")
            .field("inner", &*self.inner.lock())
            .finish()
    }
}
