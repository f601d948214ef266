//! Store Entry Type
//!
//! Every key held by a store is represented by one [`StoreEntry`]. Its
//! [`EntryState`] records whether the value is committed or whether a
//! `get_or_create` factory is still computing it:
//!
//! ```text
//!            get_or_create (miss)            factory Ok
//!   absent ───────────────────────▶ InFlight ───────────▶ Present(v)
//!     ▲                               │  │
//!     │         factory Err / panic   │  │ set(k, v) from inside the factory
//!     └───────────────────────────────┘  └──────────────▶ Present(v)
//! ```
//!
//! An absent key has no entry at all. A `clear` issued while a factory runs
//! does not drop the in-flight entry; it marks it `discarded` so that the
//! factory's result is returned to its caller but never committed.
//!
//! # Memory Layout
//!
//! - `key: K` - User's key type
//! - `value: V` - User's value type (inside `Present`)
//! - `hash: u64` - 8 bytes, cached comparer hash used when the table grows
//! - `seq: u64` - 8 bytes, insertion sequence for ordered snapshots

use core::fmt;
use std::thread::{self, ThreadId};

/// State of the value held by a [`StoreEntry`].
pub(crate) enum EntryState<V> {
    /// A factory is computing the value on thread `owner`.
    InFlight {
        /// Thread running the factory.
        owner: ThreadId,
        /// Set by `clear`; the factory result must not be committed.
        discarded: bool,
    },
    /// The value is committed.
    Present(V),
}

/// One key of a store together with its state.
pub(crate) struct StoreEntry<K, V> {
    pub(crate) key: K,
    pub(crate) hash: u64,
    pub(crate) seq: u64,
    pub(crate) state: EntryState<V>,
}

impl<K, V> StoreEntry<K, V> {
    /// Creates an entry holding a committed value.
    #[inline]
    pub(crate) fn present(key: K, hash: u64, seq: u64, value: V) -> Self {
        StoreEntry {
            key,
            hash,
            seq,
            state: EntryState::Present(value),
        }
    }

    /// Creates an entry whose value is being computed by the current thread.
    #[inline]
    pub(crate) fn in_flight(key: K, hash: u64, seq: u64) -> Self {
        StoreEntry {
            key,
            hash,
            seq,
            state: EntryState::InFlight {
                owner: thread::current().id(),
                discarded: false,
            },
        }
    }

    /// Returns the committed value, if any.
    #[inline]
    pub(crate) fn value(&self) -> Option<&V> {
        match &self.state {
            EntryState::Present(value) => Some(value),
            EntryState::InFlight { .. } => None,
        }
    }

    #[inline]
    pub(crate) fn is_in_flight(&self) -> bool {
        matches!(self.state, EntryState::InFlight { .. })
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for StoreEntry<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("StoreEntry");
        debug.field("key", &self.key).field("seq", &self.seq);
        match &self.state {
            EntryState::Present(value) => debug.field("value", value),
            EntryState::InFlight { owner, discarded } => debug
                .field("in_flight_owner", owner)
                .field("discarded", discarded),
        };
        debug.finish()
    }
}
