//! Lazy Locking Adapter
//!
//! [`LazyLockingDataStoreAdapter`] combines a [`LockingDataStoreDecorator`]
//! with per-key deferred cells so that factories never run under the global
//! lock.
//!
//! # How It Works
//!
//! The adapter stores `Arc<DeferredCell<V>>` values in a locked
//! [`SimpleDataStore`]. The lock only guards the *shape* of that map; forcing
//! a cell happens outside of it:
//!
//! ```text
//!   get_or_create(k, f)
//!   ┌──────────────── lock ────────────────┐
//!   │ cell for k?  yes ──▶ take it         │
//!   │              no  ──▶ insert new cell │  (computing, owned by caller)
//!   └──────────────────────────────────────┘
//!            │
//!            ▼  outside the lock
//!   owner:  run f(k) ──Ok(v)──▶ cell = Ready(v), wake waiters
//!                    ──Err───▶ remove cell, cell = Abandoned, wake waiters
//!                    ──Ok(v), cell discarded by clear──▶ remove cell,
//!                                     cell = Abandoned, return v
//!   other:  wait on the cell ──▶ Ready(v): return v
//!                            ──▶ Abandoned: retry with a fresh cell
//! ```
//!
//! Racing callers of one key are resolved by the map: whoever inserts the cell
//! runs its factory and everybody else waits on that cell. Factories for
//! different keys run fully in parallel.
//!
//! # Reentrancy
//!
//! A cell records the thread forcing it. A factory that touches its own key
//! on the same thread receives [`StoreError::ReentrantAccess`] instead of
//! waiting on itself. `set` and `clear` stay available to the factory.
//!
//! `clear` keeps every cell that is still computing, marked as discarded, so
//! that the owning factory's key stays guarded until the factory returns. The
//! factory's result then reaches its caller but is never stored.

use crate::comparer::{DefaultComparer, KeyComparer};
use crate::concurrent::LockingDataStoreDecorator;
use crate::error::{StoreError, GET_OR_CREATE};
use crate::simple::SimpleDataStore;
use crate::store::{DataStore, Snapshot};
use core::fmt;
use log::{debug, trace};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread::{self, ThreadId};

enum CellState<V> {
    Computing { owner: ThreadId, discarded: bool },
    Ready(V),
    Abandoned,
}

/// Outcome of waiting for a [`DeferredCell`].
enum Forced<V> {
    Ready(V),
    Abandoned,
    /// The cell is being computed by the calling thread.
    Reentrant,
}

/// A value computed at most once, by the thread that created the cell.
pub(crate) struct DeferredCell<V> {
    state: Mutex<CellState<V>>,
    settled: Condvar,
}

impl<V> DeferredCell<V> {
    /// Creates a cell whose value the current thread is about to compute.
    fn computing() -> Self {
        DeferredCell {
            state: Mutex::new(CellState::Computing {
                owner: thread::current().id(),
                discarded: false,
            }),
            settled: Condvar::new(),
        }
    }

    fn ready(value: V) -> Self {
        DeferredCell {
            state: Mutex::new(CellState::Ready(value)),
            settled: Condvar::new(),
        }
    }

    fn is_ready(&self) -> bool {
        matches!(*self.state.lock(), CellState::Ready(_))
    }

    fn is_computing_on_current_thread(&self) -> bool {
        match *self.state.lock() {
            CellState::Computing { owner, .. } => owner == thread::current().id(),
            CellState::Ready(_) | CellState::Abandoned => false,
        }
    }

    /// Returns the value if the cell is ready, without waiting.
    fn peek(&self) -> Option<V>
    where
        V: Clone,
    {
        match &*self.state.lock() {
            CellState::Ready(value) => Some(value.clone()),
            CellState::Computing { .. } | CellState::Abandoned => None,
        }
    }

    /// Marks a computing cell as discarded. Returns `false` for settled cells.
    fn discard_if_computing(&self) -> bool {
        match &mut *self.state.lock() {
            CellState::Computing { discarded, .. } => {
                *discarded = true;
                true
            }
            CellState::Ready(_) | CellState::Abandoned => false,
        }
    }

    /// Blocks until the cell is settled by the thread computing it.
    fn wait(&self) -> Forced<V>
    where
        V: Clone,
    {
        let current = thread::current().id();
        let mut state = self.state.lock();
        loop {
            match &*state {
                CellState::Ready(value) => return Forced::Ready(value.clone()),
                CellState::Abandoned => return Forced::Abandoned,
                CellState::Computing { owner, .. } if *owner == current => return Forced::Reentrant,
                CellState::Computing { owner, .. } => {
                    trace!("waiting for a deferred cell forced by {:?}", owner);
                }
            }
            self.settled.wait(&mut state);
        }
    }

    /// Stores the computed value, or abandons the cell if `clear` discarded it.
    ///
    /// Returns `true` when the value was stored.
    fn fulfill(&self, value: V) -> bool {
        let mut state = self.state.lock();
        let kept = !matches!(*state, CellState::Computing { discarded: true, .. });
        *state = if kept {
            CellState::Ready(value)
        } else {
            CellState::Abandoned
        };
        drop(state);
        self.settled.notify_all();
        kept
    }

    fn abandon(&self) {
        *self.state.lock() = CellState::Abandoned;
        self.settled.notify_all();
    }
}

impl<V> fmt::Debug for DeferredCell<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match *self.state.lock() {
            CellState::Computing { discarded: false, .. } => "computing",
            CellState::Computing { discarded: true, .. } => "discarded",
            CellState::Ready(_) => "ready",
            CellState::Abandoned => "abandoned",
        };
        f.debug_struct("DeferredCell").field("state", &state).finish()
    }
}

type CellMap<K, V, C> = LockingDataStoreDecorator<Cells<K, V, C>>;
type CellError<K, V> = StoreError<K, Arc<DeferredCell<V>>>;
type Cells<K, V, C> = SimpleDataStore<K, Arc<DeferredCell<V>>, C>;

/// Removes `cell` from a locked map if it is still the cell stored for `key`.
///
/// The map's own `get_or_create` factories never call back into it, so no
/// key of the map is ever in flight here and neither lookup can fail.
fn unlink<K, V, C>(map: &Cells<K, V, C>, key: &K, cell: &Arc<DeferredCell<V>>)
where
    K: Clone,
    C: KeyComparer<K>,
{
    if let Ok(Some(current)) = map.try_get(key) {
        if Arc::ptr_eq(&current, cell) {
            let _ = map.remove(key);
        }
    }
}

/// Converts an error raised by the cell map, keeping its variant.
///
/// The adapter only asks the map to `try_get`, `get_or_create` and `remove`,
/// which fail with `ReentrantAccess` alone. A duplicate carries the values of
/// its cells; while either cell is still computing the key is in flight, and
/// that is what gets reported.
fn shape_error<K, V: Clone>(err: CellError<K, V>) -> StoreError<K, V> {
    match err {
        StoreError::ReentrantAccess { key, operation } => StoreError::ReentrantAccess { key, operation },
        StoreError::KeyNotFound { key } => StoreError::KeyNotFound { key },
        StoreError::DuplicateKey { key, existing, new } => match (existing.peek(), new.peek()) {
            (Some(existing), Some(new)) => StoreError::DuplicateKey { key, existing, new },
            _ => StoreError::reentrant(key, "add"),
        },
    }
}

/// A thread-safe store that runs factories outside its lock.
///
/// # Type Parameters
///
/// - `K`: Key type. Must implement `Clone`.
/// - `V`: Value type. Must implement `Clone`.
/// - `C`: Key comparer. Defaults to natural equality.
///
/// # Example
///
/// ```rust
/// use datastore_rs::{DataStore, LazyLockingDataStoreAdapter};
/// use std::sync::Arc;
/// use std::thread;
///
/// let store: Arc<LazyLockingDataStoreAdapter<&str, usize>> =
///     Arc::new(LazyLockingDataStoreAdapter::new());
///
/// let handles: Vec<_> = ["alpha", "beta"]
///     .into_iter()
///     .map(|key| {
///         let store = Arc::clone(&store);
///         thread::spawn(move || store.get_or_insert_with(key, |k| k.len()).unwrap())
///     })
///     .collect();
///
/// let lens: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
/// assert_eq!(lens, vec![5, 4]);
/// ```
pub struct LazyLockingDataStoreAdapter<K, V, C = DefaultComparer> {
    cells: CellMap<K, V, C>,
}

impl<K, V> LazyLockingDataStoreAdapter<K, V> {
    /// Creates an empty adapter using natural key equality.
    pub fn new() -> Self {
        LazyLockingDataStoreAdapter::with_comparer(DefaultComparer::new())
    }
}

impl<K, V> Default for LazyLockingDataStoreAdapter<K, V> {
    fn default() -> Self {
        LazyLockingDataStoreAdapter::new()
    }
}

impl<K, V, C> LazyLockingDataStoreAdapter<K, V, C> {
    /// Creates an empty adapter that compares keys with `comparer`.
    pub fn with_comparer(comparer: C) -> Self {
        LazyLockingDataStoreAdapter {
            cells: LockingDataStoreDecorator::new(SimpleDataStore::with_comparer(comparer)),
        }
    }
}

impl<K, V, C> LazyLockingDataStoreAdapter<K, V, C>
where
    K: Clone,
    C: KeyComparer<K>,
{
    fn cell(&self, key: &K) -> Result<Option<Arc<DeferredCell<V>>>, StoreError<K, V>>
    where
        V: Clone,
    {
        self.cells.try_get(key).map_err(shape_error)
    }

    /// Returns the cell for `key`, inserting one built by `make` if absent.
    ///
    /// The flag is `true` when the returned cell was inserted by this call.
    fn cell_or_insert<F>(&self, key: K, make: F) -> Result<(Arc<DeferredCell<V>>, bool), StoreError<K, V>>
    where
        V: Clone,
        F: FnOnce() -> DeferredCell<V>,
    {
        let mut inserted = false;
        let cell = self
            .cells
            .get_or_create(key, |_| -> Result<_, CellError<K, V>> {
                inserted = true;
                Ok(Arc::new(make()))
            })
            .map_err(shape_error::<K, V>)?;
        Ok((cell, inserted))
    }

    /// Removes `cell` from the map if it is still the cell stored for `key`.
    fn discard(&self, key: &K, cell: &Arc<DeferredCell<V>>) {
        self.cells.with_inner(|map| unlink(map, key, cell));
    }

    /// Waits for the cell of `key` to settle and returns its value.
    fn settled_value(&self, key: &K, operation: &'static str) -> Result<Option<V>, StoreError<K, V>>
    where
        V: Clone,
    {
        loop {
            let cell = match self.cell(key)? {
                Some(cell) => cell,
                None => return Ok(None),
            };
            match cell.wait() {
                Forced::Ready(value) => return Ok(Some(value)),
                Forced::Reentrant => return Err(StoreError::reentrant(key.clone(), operation)),
                Forced::Abandoned => self.discard(key, &cell),
            }
        }
    }
}

impl<K, V, C> DataStore<K, V> for LazyLockingDataStoreAdapter<K, V, C>
where
    K: Clone,
    V: Clone,
    C: KeyComparer<K>,
{
    fn contains_key(&self, key: &K) -> Result<bool, StoreError<K, V>> {
        Ok(self.settled_value(key, "contains_key")?.is_some())
    }

    fn add(&self, key: K, value: V) -> Result<(), StoreError<K, V>> {
        loop {
            let (cell, inserted) = self.cell_or_insert(key.clone(), || DeferredCell::ready(value.clone()))?;
            if inserted {
                return Ok(());
            }
            match cell.wait() {
                Forced::Ready(existing) => {
                    return Err(StoreError::DuplicateKey {
                        key,
                        existing,
                        new: value,
                    })
                }
                Forced::Reentrant => return Err(StoreError::reentrant(key, "add")),
                Forced::Abandoned => self.discard(&key, &cell),
            }
        }
    }

    fn remove(&self, key: &K) -> Result<bool, StoreError<K, V>> {
        let removed = self
            .cells
            .with_inner(|map| -> Result<_, StoreError<K, V>> {
                match map.try_get(key).map_err(shape_error::<K, V>)? {
                    Some(cell) if cell.is_computing_on_current_thread() => {
                        Err(StoreError::reentrant(key.clone(), "remove"))
                    }
                    Some(cell) => {
                        map.remove(key).map_err(shape_error::<K, V>)?;
                        Ok(Some(cell))
                    }
                    None => Ok(None),
                }
            })?;
        // A cell removed mid-computation counts only if its factory succeeds.
        Ok(match removed {
            Some(cell) => matches!(cell.wait(), Forced::Ready(_)),
            None => false,
        })
    }

    fn clear(&self) {
        self.cells.with_inner(|map| {
            for (key, cell) in map.snapshot() {
                if !cell.discard_if_computing() {
                    unlink(map, &key, &cell);
                }
            }
        });
    }

    fn get(&self, key: &K) -> Result<V, StoreError<K, V>> {
        self.settled_value(key, "get")?
            .ok_or_else(|| StoreError::KeyNotFound { key: key.clone() })
    }

    fn set(&self, key: K, value: V) {
        self.cells.set(key, Arc::new(DeferredCell::ready(value)));
    }

    fn try_get(&self, key: &K) -> Result<Option<V>, StoreError<K, V>> {
        self.settled_value(key, "try_get")
    }

    fn get_or_default(&self, key: &K) -> Result<Option<V>, StoreError<K, V>> {
        self.settled_value(key, "get_or_default")
    }

    fn get_or_create<E, F>(&self, key: K, factory: F) -> Result<V, E>
    where
        F: FnOnce(&K) -> Result<V, E>,
        E: From<StoreError<K, V>>,
    {
        let cell = loop {
            let (cell, inserted) = self.cell_or_insert(key.clone(), DeferredCell::computing)?;
            if inserted {
                break cell;
            }
            match cell.wait() {
                Forced::Ready(value) => return Ok(value),
                Forced::Reentrant => return Err(StoreError::reentrant(key, GET_OR_CREATE).into()),
                Forced::Abandoned => self.discard(&key, &cell),
            }
        };

        let pending = PendingCell {
            adapter: self,
            key: &key,
            cell: &cell,
            armed: true,
        };
        let value = factory(&key)?;
        Ok(pending.fulfill(value))
    }

    fn snapshot(&self) -> Snapshot<K, V> {
        let entries = self
            .cells
            .snapshot()
            .into_iter()
            .filter_map(|(key, cell)| cell.peek().map(|value| (key, value)))
            .collect();
        Snapshot::from_entries(entries)
    }

    fn len(&self) -> usize {
        self.cells
            .snapshot()
            .iter()
            .filter(|(_, cell)| cell.is_ready())
            .count()
    }
}

/// Settles a computing cell, abandoning it if the factory fails or panics.
struct PendingCell<'a, K, V, C>
where
    K: Clone,
    C: KeyComparer<K>,
{
    adapter: &'a LazyLockingDataStoreAdapter<K, V, C>,
    key: &'a K,
    cell: &'a Arc<DeferredCell<V>>,
    armed: bool,
}

impl<K, V, C> PendingCell<'_, K, V, C>
where
    K: Clone,
    C: KeyComparer<K>,
{
    fn fulfill(mut self, value: V) -> V
    where
        V: Clone,
    {
        self.armed = false;
        let (key, cell) = (self.key, self.cell);
        // Settled under the map lock so that `clear` sees either a computing
        // cell it may discard or a settled one it removes.
        self.adapter.cells.with_inner(|map| {
            let current = map.try_get(key).ok().flatten();
            if !cell.fulfill(value.clone()) {
                debug!("dropping the result of a deferred cell discarded by clear");
                unlink(map, key, cell);
            }
            // A value stored by `set` while the factory ran wins.
            match current {
                Some(current) if !Arc::ptr_eq(&current, cell) => current.peek().unwrap_or(value),
                _ => value,
            }
        })
    }
}

impl<K, V, C> Drop for PendingCell<'_, K, V, C>
where
    K: Clone,
    C: KeyComparer<K>,
{
    fn drop(&mut self) {
        if self.armed {
            debug!("abandoning deferred cell after its factory failed");
            self.adapter.discard(self.key, self.cell);
            self.cell.abandon();
        }
    }
}

impl<K, V, C> fmt::Debug for LazyLockingDataStoreAdapter<K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyLockingDataStoreAdapter")
            .field("cells", &self.cells)
            .finish()
    }
}
