//! Store Configuration Module
//!
//! This module provides configuration structures for the stores that take
//! tunable parameters. Each store has its own dedicated configuration struct
//! with public fields.
//!
//! # Design Philosophy
//!
//! Configuration structs have all public fields for simple instantiation:
//!
//! - **Simple**: Just create the struct with all fields set
//! - **Type safety**: All parameters must be provided at construction
//! - **No boilerplate**: `Default` covers the common case
//!
//! # Configs
//!
//! | Config | Used By | Description |
//! |--------|---------|-------------|
//! | `ConcurrentDataStoreConfig` | [`ConcurrentDataStore`](crate::ConcurrentDataStore) | Lock striping |
//! | `TimeToLiveConfig` | [`TimeToLivePolicy`](crate::policy::TimeToLivePolicy) | Entry lifetime and sweep interval |
//!
//! Stores without tunables (`SimpleDataStore`, `LockingDataStoreDecorator`,
//! `LazyLockingDataStoreAdapter`) are configured only by their key comparer.
//!
//! # Examples
//!
//! ```
//! use datastore_rs::config::ConcurrentDataStoreConfig;
//! use datastore_rs::comparer::DefaultComparer;
//! use datastore_rs::ConcurrentDataStore;
//!
//! let config = ConcurrentDataStoreConfig { segments: 32 };
//! let store: ConcurrentDataStore<String, i32> =
//!     ConcurrentDataStore::init(config, DefaultComparer::new());
//! assert_eq!(store.segment_count(), 32);
//! ```

pub mod concurrent;
pub mod expiring;

pub use concurrent::ConcurrentDataStoreConfig;
pub use expiring::TimeToLiveConfig;
