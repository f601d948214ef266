#![doc = include_str!("../README.md")]
//!
//! ---
//!
//! # Code Reference
//!
//! This section provides quick code examples and API references for each store.
//!
//! ## Store Selection Guide
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────────┐
//! │                      Which Data Store Should I Use?                          │
//! ├─────────────────────────────────────────────────────────────────────────────┤
//! │                                                                              │
//! │  ┌─────────────────┐                                                         │
//! │  │ Shared across   │──No───▶ Should entries expire?                          │
//! │  │    threads?     │              │                                          │
//! │  └────────┬────────┘         Yes  │  No                                      │
//! │           │                   │   │                                          │
//! │          Yes                  ▼   ▼                                          │
//! │           │          ┌──────────────┐ ┌──────────────┐                       │
//! │           │          │   Expiring   │ │    Simple    │                       │
//! │           ▼          └──────────────┘ └──────────────┘                       │
//! │  ┌─────────────────┐                                                         │
//! │  │ Must wrap an    │──Yes──▶ Are factories slow?                             │
//! │  │ existing store? │              │                                          │
//! │  └────────┬────────┘         Yes  │  No                                      │
//! │           │                   │   │                                          │
//! │          No                   ▼   ▼                                          │
//! │           │          ┌──────────────┐ ┌──────────────┐                       │
//! │           │          │ LazyLocking  │ │   Locking    │                       │
//! │           ▼          └──────────────┘ └──────────────┘                       │
//! │  ┌──────────────┐                                                            │
//! │  │  Concurrent  │                                                            │
//! │  └──────────────┘                                                            │
//! │                                                                              │
//! └─────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Reference
//!
//! | Store | Thread-safe | Factory runs under | Best Use Case |
//! |-------|-------------|--------------------|---------------|
//! | [`SimpleDataStore`] | No | nothing | Single-threaded memoization |
//! | [`ConcurrentDataStore`] | Yes | no lock | Many threads, many keys |
//! | [`ExpiringDataStore`] | No | nothing | Time- or policy-bounded entries |
//! | [`LockingDataStoreDecorator`] | Yes | the global lock | Sharing any store, cheap factories |
//! | [`LazyLockingDataStoreAdapter`] | Yes | no lock | Sharing one store, slow factories |
//! | [`NullDataStore`] | Yes | nothing | Switching caching off |
//!
//! ## Code Examples
//!
//! ### Simple
//!
//! Memoizes factory results. A failing factory stores nothing.
//!
//! ```rust
//! use datastore_rs::{DataStore, SimpleDataStore};
//!
//! let store: SimpleDataStore<u64, u64> = SimpleDataStore::new();
//! let squared = store.get_or_insert_with(12, |k| k * k).unwrap();
//! assert_eq!(squared, 144);
//! assert_eq!(store.try_get(&12).unwrap(), Some(144));
//! ```
//!
//! ### Concurrent
//!
//! Only one factory runs per key, even when many threads ask at once.
//!
//! ```rust
//! use datastore_rs::{ConcurrentDataStore, DataStore};
//! use datastore_rs::config::ConcurrentDataStoreConfig;
//! use datastore_rs::comparer::DefaultComparer;
//!
//! let config = ConcurrentDataStoreConfig { segments: 8 };
//! let store: ConcurrentDataStore<&str, usize> =
//!     ConcurrentDataStore::init(config, DefaultComparer::new());
//! assert_eq!(store.get_or_insert_with("key", |k| k.len()).unwrap(), 3);
//! ```
//!
//! ### Expiring
//!
//! Entries die according to an [`ExpirationPolicy`].
//!
//! ```rust
//! use datastore_rs::{DataStore, ExpiringDataStore, TimeToLivePolicy};
//! use datastore_rs::config::TimeToLiveConfig;
//! use std::time::Duration;
//!
//! let policy = TimeToLivePolicy::new(TimeToLiveConfig {
//!     ttl: Duration::from_secs(60),
//!     scan_interval: Duration::from_secs(30),
//! });
//! let store = ExpiringDataStore::new(policy);
//! store.set("token", "abc");
//! assert!(store.contains_key(&"token").unwrap());
//! ```
//!
//! ### Locking and Lazy Locking
//!
//! ```rust
//! use datastore_rs::{
//!     DataStore, LazyLockingDataStoreAdapter, LockingDataStoreDecorator, SimpleDataStore,
//! };
//!
//! let locked = LockingDataStoreDecorator::new(SimpleDataStore::<&str, i32>::new());
//! locked.set("a", 1);
//!
//! let lazy: LazyLockingDataStoreAdapter<&str, i32> = LazyLockingDataStoreAdapter::new();
//! assert_eq!(lazy.get_or_insert_with("a", |_| 1).unwrap(), locked.get(&"a").unwrap());
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`store`] | The [`DataStore`] contract and [`Snapshot`] |
//! | [`comparer`] | Pluggable key equality |
//! | [`config`] | Configuration structs |
//! | [`policy`] | Expiration policies |
//! | [`concurrent`] | Thread-safe stores |

/// Per-key entry states shared by the hash-table backed stores.
pub(crate) mod entry;

/// The data store contract.
///
/// Provides the [`DataStore`] trait implemented by every store, and the
/// [`Snapshot`] type returned by iteration.
pub mod store;

/// Store error types.
pub mod error;

/// Key comparers.
///
/// Provides the [`KeyComparer`](comparer::KeyComparer) trait and the comparers
/// shipped with the crate.
pub mod comparer;

/// Store configuration structures.
pub mod config;

/// Single-threaded data store.
pub mod simple;

/// Expiration policies for [`ExpiringDataStore`].
pub mod policy;

/// Policy-driven expiring data store.
pub mod expiring;

/// Null-object data store.
pub mod null;

/// Thread-safe data stores.
///
/// Provides the lock-striped [`ConcurrentDataStore`], the coarse-grained
/// [`LockingDataStoreDecorator`], and the [`LazyLockingDataStoreAdapter`]
/// that runs factories outside its lock.
pub mod concurrent;

// Re-export the contract
pub use error::StoreError;
pub use store::{DataStore, Snapshot};

// Re-export store types
pub use concurrent::{ConcurrentDataStore, LazyLockingDataStoreAdapter, LockingDataStoreDecorator};
pub use expiring::ExpiringDataStore;
pub use null::NullDataStore;
pub use simple::SimpleDataStore;

// Re-export policy types
pub use policy::{ExpirationPolicy, TimeToLivePolicy};
