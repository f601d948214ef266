//! Correctness Tests for Data Stores
//!
//! This module validates the store contract shared by every implementation,
//! using small, deterministic, single-threaded scenarios.
//!
//! ## Test Strategy
//! - Every contract property is checked against every store through one
//!   generic helper, so the stores cannot drift apart
//! - Reentrancy scenarios run a factory that calls back into its own store
//! - Expiration is driven by a scripted policy, never by wall-clock timing

use datastore_rs::comparer::CaseInsensitiveComparer;
use datastore_rs::{
    ConcurrentDataStore, DataStore, ExpirationPolicy, ExpiringDataStore,
    LazyLockingDataStoreAdapter, LockingDataStoreDecorator, NullDataStore, SimpleDataStore,
    StoreError,
};
use std::cell::{Cell, RefCell};
use std::fmt::Debug;

/// Error type of the factories used below: either the factory's own failure
/// or an error raised by the store.
#[derive(Debug, PartialEq)]
enum FactoryError<K, V> {
    Failed(&'static str),
    Store(StoreError<K, V>),
}

impl<K, V> From<StoreError<K, V>> for FactoryError<K, V> {
    fn from(err: StoreError<K, V>) -> Self {
        FactoryError::Store(err)
    }
}

// ============================================================================
// HELPER FUNCTIONS FOR STORE CREATION
// ============================================================================

/// A policy under which nothing ever expires.
struct Immortal;

impl<V> ExpirationPolicy<V> for Immortal {
    type ScanMarker = ();
    type ExpirationMarker = ();

    fn should_scan(&self, _next_scan: &()) -> bool {
        false
    }

    fn is_expired(&self, _value: &V, _marker: &()) -> bool {
        false
    }

    fn expiration_info(&self, _value: &V) {}

    fn next_scan_marker(&self) {}
}

/// Runs `check` against a fresh instance of every caching store.
fn for_each_store(check: impl Fn(&dyn erased::ErasedStore)) {
    check(&SimpleDataStore::<Key, Value>::new());
    check(&ConcurrentDataStore::<Key, Value>::new());
    check(&ExpiringDataStore::<Key, Value, Immortal>::new(Immortal));
    check(&LockingDataStoreDecorator::new(SimpleDataStore::<Key, Value>::new()));
    check(&LazyLockingDataStoreAdapter::<Key, Value>::new());
}

type Key = &'static str;
type Value = Option<i32>;
type Error = FactoryError<Key, Value>;

/// Object-safe view of the operations exercised by the contract tests.
///
/// Kept out of scope at the top level so its methods never compete with
/// `DataStore`'s on concrete stores.
mod erased {
    use super::{Error, Key, Value};
    use datastore_rs::{DataStore, StoreError};

    /// `DataStore::get_or_create` is generic and cannot be called through a trait
    /// object, so this trait fixes the factory type.
    pub trait ErasedStore {
        fn contains_key(&self, key: &Key) -> Result<bool, StoreError<Key, Value>>;
        fn add(&self, key: Key, value: Value) -> Result<(), StoreError<Key, Value>>;
        fn remove(&self, key: &Key) -> Result<bool, StoreError<Key, Value>>;
        fn clear(&self);
        fn get(&self, key: &Key) -> Result<Value, StoreError<Key, Value>>;
        fn set(&self, key: Key, value: Value);
        fn try_get(&self, key: &Key) -> Result<Option<Value>, StoreError<Key, Value>>;
        fn get_or_default(&self, key: &Key) -> Result<Option<Value>, StoreError<Key, Value>>;
        fn get_or_create(&self, key: Key, factory: &mut dyn FnMut(&Key) -> Result<Value, Error>) -> Result<Value, Error>;
        fn entries(&self) -> Vec<(Key, Value)>;
        fn len(&self) -> usize;
    }

    impl<S: DataStore<Key, Value>> ErasedStore for S {
        fn contains_key(&self, key: &Key) -> Result<bool, StoreError<Key, Value>> {
            DataStore::contains_key(self, key)
        }
        fn add(&self, key: Key, value: Value) -> Result<(), StoreError<Key, Value>> {
            DataStore::add(self, key, value)
        }
        fn remove(&self, key: &Key) -> Result<bool, StoreError<Key, Value>> {
            DataStore::remove(self, key)
        }
        fn clear(&self) {
            DataStore::clear(self)
        }
        fn get(&self, key: &Key) -> Result<Value, StoreError<Key, Value>> {
            DataStore::get(self, key)
        }
        fn set(&self, key: Key, value: Value) {
            DataStore::set(self, key, value)
        }
        fn try_get(&self, key: &Key) -> Result<Option<Value>, StoreError<Key, Value>> {
            DataStore::try_get(self, key)
        }
        fn get_or_default(&self, key: &Key) -> Result<Option<Value>, StoreError<Key, Value>> {
            DataStore::get_or_default(self, key)
        }
        fn get_or_create(&self, key: Key, factory: &mut dyn FnMut(&Key) -> Result<Value, Error>) -> Result<Value, Error> {
            DataStore::get_or_create(self, key, |k| factory(k))
        }
        fn entries(&self) -> Vec<(Key, Value)> {
            DataStore::snapshot(self).into_vec()
        }
        fn len(&self) -> usize {
            DataStore::len(self)
        }
    }
}

// ============================================================================
// STORE CONTRACT
// ============================================================================

#[test]
fn test_add_then_get() {
    for_each_store(|store| {
        store.add("a", Some(1)).unwrap();
        store.add("null", None).unwrap();
        assert_eq!(store.get(&"a").unwrap(), Some(1));
        assert_eq!(store.get(&"null").unwrap(), None);
        assert_eq!(store.len(), 2);
    });
}

#[test]
fn test_duplicate_add_is_rejected() {
    for_each_store(|store| {
        store.add("a", Some(1)).unwrap();
        assert_eq!(
            store.add("a", Some(2)),
            Err(StoreError::DuplicateKey {
                key: "a",
                existing: Some(1),
                new: Some(2)
            })
        );
        assert_eq!(store.get(&"a").unwrap(), Some(1));
    });
}

#[test]
fn test_set_overwrites() {
    for_each_store(|store| {
        store.set("a", Some(1));
        store.set("a", Some(2));
        assert_eq!(store.get(&"a").unwrap(), Some(2));
        assert_eq!(store.len(), 1);
    });
}

#[test]
fn test_absent_and_null_are_distinct() {
    for_each_store(|store| {
        store.set("null", None);
        assert!(store.contains_key(&"null").unwrap());
        assert!(!store.contains_key(&"absent").unwrap());
        assert_eq!(store.try_get(&"null").unwrap(), Some(None));
        assert_eq!(store.get_or_default(&"absent").unwrap(), None);
        assert_eq!(store.get(&"absent"), Err(StoreError::KeyNotFound { key: "absent" }));
    });
}

#[test]
fn test_remove_and_clear() {
    for_each_store(|store| {
        store.set("a", Some(1));
        store.set("b", Some(2));
        assert!(store.remove(&"a").unwrap());
        assert!(!store.remove(&"a").unwrap());
        store.clear();
        assert_eq!(store.len(), 0);
        assert!(store.entries().is_empty());
    });
}

#[test]
fn test_get_or_create_memoizes() {
    for_each_store(|store| {
        let calls = Cell::new(0);
        for _ in 0..3 {
            let value = store
                .get_or_create("k", &mut |_| {
                    calls.set(calls.get() + 1);
                    Ok(None)
                })
                .unwrap();
            assert_eq!(value, None);
        }
        assert_eq!(calls.get(), 1);
    });
}

#[test]
fn test_failures_are_not_cached() {
    for_each_store(|store| {
        assert_eq!(
            store.get_or_create("k", &mut |_| Err(FactoryError::Failed("boom"))),
            Err(FactoryError::Failed("boom"))
        );
        assert!(!store.contains_key(&"k").unwrap());
        assert_eq!(store.get_or_create("k", &mut |_| Ok(Some(2))), Ok(Some(2)));
        assert_eq!(store.get(&"k").unwrap(), Some(2));
    });
}

#[test]
fn test_snapshot_is_ordered_and_detached() {
    for_each_store(|store| {
        store.set("c", Some(3));
        store.set("a", Some(1));
        store.set("b", Some(2));
        let snapshot = store.entries();
        store.clear();
        assert_eq!(snapshot, vec![("c", Some(3)), ("a", Some(1)), ("b", Some(2))]);
    });
}

// ============================================================================
// REENTRANCY
// ============================================================================

#[test]
fn test_reentrant_same_key_access_is_rejected() {
    for_each_store(|store| {
        let value = store.get_or_create("k", &mut |key| {
            assert!(store.try_get(key).unwrap_err().is_reentrant_access());
            assert!(store.add(*key, Some(0)).unwrap_err().is_reentrant_access());
            assert!(store.remove(key).unwrap_err().is_reentrant_access());
            match store.get_or_create(*key, &mut |_| Ok(Some(0))) {
                Err(FactoryError::Store(err)) => assert!(err.is_reentrant_access()),
                other => panic!("unexpected nested result: {:?}", other),
            }
            Ok(Some(1))
        });
        assert_eq!(value, Ok(Some(1)));
        assert_eq!(store.get(&"k").unwrap(), Some(1));
    });
}

#[test]
fn test_reentrant_other_key_access_is_allowed() {
    for_each_store(|store| {
        let value = store.get_or_create("outer", &mut |_| {
            let inner = store.get_or_create("inner", &mut |_| Ok(Some(2)))?;
            Ok(inner.map(|v| v + 1))
        });
        assert_eq!(value, Ok(Some(3)));
        assert_eq!(store.get(&"inner").unwrap(), Some(2));
    });
}

#[test]
fn test_reentrant_clear_wins() {
    for_each_store(|store| {
        let value = store.get_or_create("k", &mut |_| {
            store.clear();
            Ok(Some(7))
        });
        assert_eq!(value, Ok(Some(7)));
        assert_eq!(store.try_get(&"k").unwrap(), None);
    });
}

#[test]
fn test_snapshot_inside_factory_excludes_in_flight_key() {
    for_each_store(|store| {
        store.set("a", Some(1));
        let seen = RefCell::new(Vec::new());
        store
            .get_or_create("b", &mut |_| {
                *seen.borrow_mut() = store.entries();
                Ok(Some(2))
            })
            .unwrap();
        assert_eq!(*seen.borrow(), vec![("a", Some(1))]);
    });
}

// ============================================================================
// STORE-SPECIFIC BEHAVIOR
// ============================================================================

#[test]
fn test_case_insensitive_keys() {
    let store: ConcurrentDataStore<String, &str, _> =
        ConcurrentDataStore::with_comparer(CaseInsensitiveComparer::new());
    store.set("Content-Type".to_string(), "text/plain");
    assert_eq!(
        store.get(&"content-type".to_string()).unwrap(),
        "text/plain"
    );
    store.set("CONTENT-TYPE".to_string(), "text/html");
    assert_eq!(store.len(), 1);
    // The first spelling of the key is kept.
    assert_eq!(store.snapshot().into_vec(), vec![("Content-Type".to_string(), "text/html")]);
}

#[test]
fn test_null_store_never_memoizes() {
    let store: NullDataStore<&str, i32> = NullDataStore::new();
    let calls = Cell::new(0);
    for _ in 0..3 {
        store
            .get_or_insert_with("k", |_| {
                calls.set(calls.get() + 1);
                1
            })
            .unwrap();
    }
    assert_eq!(calls.get(), 3);
    assert!(store.is_null());
    assert!(!SimpleDataStore::<&str, i32>::new().is_null());
}

/// Expires values listed in `expired`; sweeps are due while `due` is set.
#[derive(Default)]
struct Scripted {
    expired: RefCell<Vec<i32>>,
    due: Cell<bool>,
    sweeps: Cell<u64>,
}

impl ExpirationPolicy<i32> for Scripted {
    type ScanMarker = u64;
    type ExpirationMarker = ();

    fn should_scan(&self, _next_scan: &u64) -> bool {
        self.due.replace(false)
    }

    fn is_expired(&self, value: &i32, _marker: &()) -> bool {
        self.expired.borrow().contains(value)
    }

    fn expiration_info(&self, _value: &i32) {}

    fn next_scan_marker(&self) -> u64 {
        self.sweeps.set(self.sweeps.get() + 1);
        self.sweeps.get() * 100
    }
}

#[test]
fn test_expiration_sweep() {
    let store: ExpiringDataStore<&str, i32, Scripted> = ExpiringDataStore::new(Scripted::default());
    store.set("live", 1);
    store.set("dead", 2);
    store.policy().expired.borrow_mut().push(2);
    store.policy().due.set(true);

    store.set("trigger", 3);

    assert_eq!(store.next_scan_marker(), 200);
    assert_eq!(store.snapshot().into_vec(), vec![("live", 1), ("trigger", 3)]);
}

#[test]
fn test_expiration_on_read() {
    let store: ExpiringDataStore<&str, i32, Scripted> = ExpiringDataStore::new(Scripted::default());
    store.set("k", 1);
    store.policy().expired.borrow_mut().push(1);

    assert_eq!(store.try_get(&"k").unwrap(), None);
    assert!(!store.contains_key(&"k").unwrap());
    assert_eq!(store.get(&"k"), Err(StoreError::KeyNotFound { key: "k" }));
    // No sweep was due.
    assert_eq!(store.next_scan_marker(), 100);
}

#[test]
fn test_errors_are_displayable() {
    fn message<E: Debug + std::error::Error>(err: E) -> String {
        err.to_string()
    }
    let store: SimpleDataStore<&str, i32> = SimpleDataStore::new();
    store.set("a", 1);
    let duplicate = message(store.add("a", 2).unwrap_err());
    assert!(duplicate.contains("\"a\""));
    let missing = message(store.get(&"b").unwrap_err());
    assert!(missing.contains("\"b\""));
}
