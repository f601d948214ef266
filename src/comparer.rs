//! Key Comparers
//!
//! A comparer decides when two keys are the same entry. Stores hash and
//! compare keys exclusively through their comparer, so a store can, for
//! example, treat `"Key"` and `"KEY"` as one entry without requiring a
//! wrapper type around every key.
//!
//! | Comparer | Keys | Equality |
//! |----------|------|----------|
//! | [`DefaultComparer`] | `K: Hash + Eq` | `K`'s own `Eq`, hashed with a `BuildHasher` |
//! | [`CaseInsensitiveComparer`] | `K: AsRef<str>` | ASCII case-insensitive |
//!
//! Comparers must be consistent: keys that compare equal must hash equally.

use core::hash::{BuildHasher, Hash, Hasher};

pub use hashbrown::DefaultHashBuilder;

/// Pluggable key equality used by every store in this crate.
pub trait KeyComparer<K: ?Sized> {
    /// Hashes `key`. Equal keys must produce equal hashes.
    fn hash_key(&self, key: &K) -> u64;

    /// Returns `true` if `a` and `b` identify the same entry.
    fn keys_equal(&self, a: &K, b: &K) -> bool;
}

/// Natural key equality: `K`'s `Hash` and `Eq` through a `BuildHasher`.
///
/// # Examples
///
/// ```
/// use datastore_rs::comparer::{DefaultComparer, KeyComparer};
///
/// let comparer = DefaultComparer::new();
/// assert!(comparer.keys_equal(&"a", &"a"));
/// assert_eq!(comparer.hash_key(&"a"), comparer.hash_key(&"a"));
/// ```
#[derive(Clone, Default, Debug)]
pub struct DefaultComparer<S = DefaultHashBuilder> {
    hash_builder: S,
}

impl DefaultComparer {
    /// Creates a comparer using hashbrown's default hasher.
    pub fn new() -> Self {
        DefaultComparer::default()
    }
}

impl<S> DefaultComparer<S> {
    /// Creates a comparer that hashes keys with `hash_builder`.
    ///
    /// Use this for deterministic hashing or DoS-resistant hashers.
    pub fn with_hasher(hash_builder: S) -> Self {
        DefaultComparer { hash_builder }
    }
}

impl<K, S> KeyComparer<K> for DefaultComparer<S>
where
    K: ?Sized + Hash + Eq,
    S: BuildHasher,
{
    #[inline]
    fn hash_key(&self, key: &K) -> u64 {
        self.hash_builder.hash_one(key)
    }

    #[inline]
    fn keys_equal(&self, a: &K, b: &K) -> bool {
        a == b
    }
}

/// ASCII case-insensitive comparison of string-like keys.
///
/// # Examples
///
/// ```
/// use datastore_rs::comparer::CaseInsensitiveComparer;
/// use datastore_rs::{DataStore, SimpleDataStore};
///
/// let store = SimpleDataStore::with_comparer(CaseInsensitiveComparer::new());
/// store.set("Content-Type".to_string(), 1);
/// assert_eq!(store.try_get(&"CONTENT-TYPE".to_string()).unwrap(), Some(1));
/// ```
#[derive(Clone, Default, Debug)]
pub struct CaseInsensitiveComparer<S = DefaultHashBuilder> {
    hash_builder: S,
}

impl CaseInsensitiveComparer {
    /// Creates a case-insensitive comparer using hashbrown's default hasher.
    pub fn new() -> Self {
        CaseInsensitiveComparer::default()
    }
}

impl<S> CaseInsensitiveComparer<S> {
    /// Creates a case-insensitive comparer that hashes with `hash_builder`.
    pub fn with_hasher(hash_builder: S) -> Self {
        CaseInsensitiveComparer { hash_builder }
    }
}

impl<K, S> KeyComparer<K> for CaseInsensitiveComparer<S>
where
    K: ?Sized + AsRef<str>,
    S: BuildHasher,
{
    fn hash_key(&self, key: &K) -> u64 {
        let mut state = self.hash_builder.build_hasher();
        let text = key.as_ref();
        for byte in text.bytes() {
            state.write_u8(byte.to_ascii_lowercase());
        }
        state.write_usize(text.len());
        state.finish()
    }

    fn keys_equal(&self, a: &K, b: &K) -> bool {
        a.as_ref().eq_ignore_ascii_case(b.as_ref())
    }
}
