//! Store Error Types
//!
//! Every failure a store can report is a variant of [`StoreError`]. Variants
//! carry the data needed for diagnostics (the key, and for duplicates both the
//! existing and the rejected value) rather than a preformatted string.
//!
//! Errors raised by a caller's factory inside
//! [`get_or_create`](crate::DataStore::get_or_create) are never wrapped in a
//! `StoreError`; they reach the caller unchanged. Instead, the factory's error
//! type must be able to absorb a `StoreError` through `From`, so both kinds of
//! failure share one `Result` type at the call site.

use thiserror::Error;

/// Name used in [`StoreError::ReentrantAccess`] to identify the in-flight operation.
pub const GET_OR_CREATE: &str = "get_or_create(key, factory)";

/// Errors reported by data store operations.
///
/// # Examples
///
/// ```
/// use datastore_rs::{DataStore, SimpleDataStore, StoreError};
///
/// let store: SimpleDataStore<&str, i32> = SimpleDataStore::new();
/// store.add("a", 1).unwrap();
///
/// match store.add("a", 2) {
///     Err(StoreError::DuplicateKey { key, existing, new }) => {
///         assert_eq!((key, existing, new), ("a", 1, 2));
///     }
///     other => panic!("unexpected result: {:?}", other),
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError<K, V> {
    /// `add` was called for a key that is already present.
    #[error("an entry with key {key:?} already exists (existing value: {existing:?}, new value: {new:?})")]
    DuplicateKey {
        /// The key that was already present.
        key: K,
        /// The value currently stored under `key`.
        existing: V,
        /// The value that was rejected.
        new: V,
    },

    /// `get` was called for a key that is not present.
    #[error("key {key:?} was not found in the store")]
    KeyNotFound {
        /// The missing key.
        key: K,
    },

    /// A key was accessed from inside its own in-flight `get_or_create` factory.
    #[error(
        "key {key:?} is being computed by {in_flight}; {operation} cannot access it reentrantly",
        in_flight = GET_OR_CREATE
    )]
    ReentrantAccess {
        /// The key whose factory is still running.
        key: K,
        /// The operation that attempted the reentrant access.
        operation: &'static str,
    },
}

impl<K, V> StoreError<K, V> {
    /// Creates a [`StoreError::ReentrantAccess`] for `key` raised by `operation`.
    pub fn reentrant(key: K, operation: &'static str) -> Self {
        StoreError::ReentrantAccess { key, operation }
    }

    /// Returns the key the error refers to.
    pub fn key(&self) -> &K {
        match self {
            StoreError::DuplicateKey { key, .. }
            | StoreError::KeyNotFound { key }
            | StoreError::ReentrantAccess { key, .. } => key,
        }
    }

    /// Returns `true` for [`StoreError::ReentrantAccess`].
    pub fn is_reentrant_access(&self) -> bool {
        matches!(self, StoreError::ReentrantAccess { .. })
    }

    /// Converts the value type carried by the error.
    ///
    /// Decorators that store wrapped values use this to report errors in
    /// terms of the values their own callers deal with.
    pub fn map_value<W, F>(self, mut f: F) -> StoreError<K, W>
    where
        F: FnMut(V) -> W,
    {
        match self {
            StoreError::DuplicateKey { key, existing, new } => StoreError::DuplicateKey {
                key,
                existing: f(existing),
                new: f(new),
            },
            StoreError::KeyNotFound { key } => StoreError::KeyNotFound { key },
            StoreError::ReentrantAccess { key, operation } => {
                StoreError::ReentrantAccess { key, operation }
            }
        }
    }
}
