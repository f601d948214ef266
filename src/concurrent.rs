//! Thread-Safe Data Stores
//!
//! This module provides the stores that may be shared across threads. They
//! differ in *where* they block and in what a running factory holds:
//!
//! | Type | Synchronization | A running factory blocks... |
//! |------|-----------------|-----------------------------|
//! | [`ConcurrentDataStore`] | One mutex + condvar per segment | only callers of the same key |
//! | [`LockingDataStoreDecorator`] | One re-entrant mutex around any store | every other thread |
//! | [`LazyLockingDataStoreAdapter`] | One re-entrant mutex + one deferred cell per key | only callers of the same key |
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │              ConcurrentDataStore (16 segments)                     │
//! │                                                                    │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐     ┌─────────┐              │
//! │  │Segment 0│ │Segment 1│ │Segment 2│ ... │Segment15│              │
//! │  │ [Mutex] │ │ [Mutex] │ │ [Mutex] │     │ [Mutex] │              │
//! │  │[Condvar]│ │[Condvar]│ │[Condvar]│     │[Condvar]│              │
//! │  └─────────┘ └─────────┘ └─────────┘     └─────────┘              │
//! │       ▲           ▲           ▲               ▲                   │
//! │  hash(k1)%16  hash(k2)%16  hash(k3)%16   hash(kN)%16              │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Factories never run while a segment lock is held. A key whose factory is
//! running is marked *in flight*; other threads touching that key wait on the
//! segment's condition variable until the factory returns.
//!
//! # Reentrancy
//!
//! A factory that calls back into the store for its own key on the same
//! thread receives [`StoreError::ReentrantAccess`](crate::StoreError) from
//! every store in this module instead of deadlocking.
//!
//! # Example
//!
//! ```rust
//! use datastore_rs::{ConcurrentDataStore, DataStore};
//! use std::sync::Arc;
//! use std::thread;
//!
//! let store: Arc<ConcurrentDataStore<u64, u64>> = Arc::new(ConcurrentDataStore::new());
//!
//! let handles: Vec<_> = (0..4)
//!     .map(|_| {
//!         let store = Arc::clone(&store);
//!         thread::spawn(move || store.get_or_insert_with(7, |k| k * 6).unwrap())
//!     })
//!     .collect();
//!
//! for handle in handles {
//!     assert_eq!(handle.join().unwrap(), 42);
//! }
//! ```

mod lazy;
mod locking;
mod segmented;

pub use self::lazy::LazyLockingDataStoreAdapter;
pub use self::locking::LockingDataStoreDecorator;
pub use self::segmented::ConcurrentDataStore;

/// Returns the default number of segments for a [`ConcurrentDataStore`].
#[inline]
pub fn default_segment_count() -> usize {
    16
}
