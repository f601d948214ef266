//! Expiring Data Store
//!
//! [`ExpiringDataStore`] drops entries according to an [`ExpirationPolicy`].
//! Expiration is access-driven: there is no background thread or timer.
//!
//! # How It Works
//!
//! Each entry is stored as `(value, expiration_marker)` in an inner
//! [`SimpleDataStore`]. Every keyed operation first runs a *conditional
//! sweep*, then checks the key it targets:
//!
//! ```text
//!   operation(k)
//!      │
//!      ├─ policy.should_scan(next_scan)?
//!      │     yes ─▶ remove every expired entry (insertion order)
//!      │            next_scan = policy.next_scan_marker()
//!      │
//!      ├─ k present but policy.is_expired(v, marker)?
//!      │     yes ─▶ evict k, treat as absent
//!      │
//!      └─ run the operation on the inner store
//! ```
//!
//! Inserting or refreshing an entry (`add`, `set`, or a `get_or_create` that
//! runs its factory) attaches a fresh marker from
//! [`ExpirationPolicy::expiration_info`].
//!
//! # Thread Safety
//!
//! Like its inner store this type is not `Sync`. Wrap it in a
//! [`LockingDataStoreDecorator`](crate::LockingDataStoreDecorator) to share it
//! across threads.

use crate::comparer::{DefaultComparer, KeyComparer};
use crate::config::TimeToLiveConfig;
use crate::error::{StoreError, GET_OR_CREATE};
use crate::policy::{ExpirationPolicy, TimeToLivePolicy};
use crate::simple::SimpleDataStore;
use crate::store::{DataStore, Snapshot};
use core::cell::RefCell;
use core::fmt;
use log::debug;

/// Reports an inner store error in terms of the caller's value type.
fn strip_marker<K, V, M>(err: StoreError<K, (V, M)>) -> StoreError<K, V> {
    err.map_value(|(value, _)| value)
}

/// Failure of the inner `get_or_create`: the caller's factory error, or an
/// error raised by the inner store itself.
enum CreateError<E, K, V, M> {
    Factory(E),
    Store(StoreError<K, (V, M)>),
}

impl<E, K, V, M> From<StoreError<K, (V, M)>> for CreateError<E, K, V, M> {
    fn from(err: StoreError<K, (V, M)>) -> Self {
        CreateError::Store(err)
    }
}

/// A store whose entries expire according to a policy.
///
/// # Type Parameters
///
/// - `K`: Key type. Must implement `Clone`.
/// - `V`: Value type. Must implement `Clone`.
/// - `P`: Expiration policy.
/// - `C`: Key comparer. Defaults to natural equality.
///
/// # Example
///
/// ```rust
/// use datastore_rs::config::TimeToLiveConfig;
/// use datastore_rs::comparer::DefaultComparer;
/// use datastore_rs::{DataStore, ExpiringDataStore};
/// use std::time::Duration;
///
/// let config = TimeToLiveConfig {
///     ttl: Duration::from_secs(300),
///     scan_interval: Duration::from_secs(60),
/// };
/// let store = ExpiringDataStore::init(config, DefaultComparer::new());
///
/// store.set("session", 42);
/// assert_eq!(store.get(&"session").unwrap(), 42);
/// ```
pub struct ExpiringDataStore<K, V, P, C = DefaultComparer>
where
    P: ExpirationPolicy<V>,
{
    inner: SimpleDataStore<K, (V, P::ExpirationMarker), C>,
    policy: P,
    next_scan: RefCell<P::ScanMarker>,
}

impl<K, V, P> ExpiringDataStore<K, V, P>
where
    P: ExpirationPolicy<V>,
{
    /// Creates an empty store governed by `policy`, using natural key equality.
    pub fn new(policy: P) -> Self {
        ExpiringDataStore::with_comparer(policy, DefaultComparer::new())
    }
}

impl<K, V, C> ExpiringDataStore<K, V, TimeToLivePolicy, C> {
    /// Creates an empty store whose entries live for `config.ttl`.
    pub fn init(config: TimeToLiveConfig, comparer: C) -> Self {
        ExpiringDataStore::with_comparer(TimeToLivePolicy::new(config), comparer)
    }
}

impl<K, V, P, C> ExpiringDataStore<K, V, P, C>
where
    P: ExpirationPolicy<V>,
{
    /// Creates an empty store governed by `policy` that compares keys with `comparer`.
    ///
    /// The first sweep is scheduled with the policy's `next_scan_marker`.
    pub fn with_comparer(policy: P, comparer: C) -> Self {
        let next_scan = policy.next_scan_marker();
        ExpiringDataStore {
            inner: SimpleDataStore::with_comparer(comparer),
            policy,
            next_scan: RefCell::new(next_scan),
        }
    }

    /// Returns the expiration policy.
    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Returns the marker deciding when the next sweep is due.
    pub fn next_scan_marker(&self) -> P::ScanMarker
    where
        P::ScanMarker: Clone,
    {
        self.next_scan.borrow().clone()
    }
}

impl<K, V, P, C> ExpiringDataStore<K, V, P, C>
where
    K: Clone,
    V: Clone,
    P: ExpirationPolicy<V>,
    C: KeyComparer<K>,
{
    /// Removes every expired entry if the policy says a sweep is due.
    fn sweep(&self) {
        let due = self.policy.should_scan(&self.next_scan.borrow());
        if !due {
            return;
        }

        let mut removed = 0usize;
        for (key, (value, marker)) in self.inner.snapshot() {
            if self.policy.is_expired(&value, &marker) && matches!(self.inner.remove(&key), Ok(true)) {
                removed += 1;
            }
        }
        *self.next_scan.borrow_mut() = self.policy.next_scan_marker();
        debug!("expiration sweep removed {} entries", removed);
    }

    /// Returns the live value of `key`, evicting it first if it has expired.
    fn live_value(&self, key: &K, operation: &'static str) -> Result<Option<V>, StoreError<K, V>> {
        let found = self.inner.try_get(key).map_err(|err| match err {
            StoreError::ReentrantAccess { key, .. } => StoreError::reentrant(key, operation),
            other => strip_marker(other),
        })?;
        match found {
            Some((value, marker)) if self.policy.is_expired(&value, &marker) => {
                self.inner.remove(key).map_err(strip_marker)?;
                Ok(None)
            }
            Some((value, _)) => Ok(Some(value)),
            None => Ok(None),
        }
    }
}

impl<K, V, P, C> DataStore<K, V> for ExpiringDataStore<K, V, P, C>
where
    K: Clone,
    V: Clone,
    P: ExpirationPolicy<V>,
    C: KeyComparer<K>,
{
    fn contains_key(&self, key: &K) -> Result<bool, StoreError<K, V>> {
        self.sweep();
        Ok(self.live_value(key, "contains_key")?.is_some())
    }

    fn add(&self, key: K, value: V) -> Result<(), StoreError<K, V>> {
        self.sweep();
        // An expired entry must not be reported as a duplicate.
        self.live_value(&key, "add")?;
        let marker = self.policy.expiration_info(&value);
        self.inner.add(key, (value, marker)).map_err(strip_marker)
    }

    fn remove(&self, key: &K) -> Result<bool, StoreError<K, V>> {
        self.sweep();
        match self.live_value(key, "remove")? {
            Some(_) => self.inner.remove(key).map_err(strip_marker),
            None => Ok(false),
        }
    }

    fn clear(&self) {
        self.inner.clear();
    }

    fn get(&self, key: &K) -> Result<V, StoreError<K, V>> {
        self.sweep();
        self.live_value(key, "get")?
            .ok_or_else(|| StoreError::KeyNotFound { key: key.clone() })
    }

    fn set(&self, key: K, value: V) {
        self.sweep();
        let marker = self.policy.expiration_info(&value);
        self.inner.set(key, (value, marker));
    }

    fn try_get(&self, key: &K) -> Result<Option<V>, StoreError<K, V>> {
        self.sweep();
        self.live_value(key, "try_get")
    }

    fn get_or_default(&self, key: &K) -> Result<Option<V>, StoreError<K, V>> {
        self.sweep();
        self.live_value(key, "get_or_default")
    }

    fn get_or_create<E, F>(&self, key: K, factory: F) -> Result<V, E>
    where
        F: FnOnce(&K) -> Result<V, E>,
        E: From<StoreError<K, V>>,
    {
        self.sweep();
        if let Some(value) = self.live_value(&key, GET_OR_CREATE)? {
            return Ok(value);
        }

        let created: Result<_, CreateError<E, K, V, P::ExpirationMarker>> =
            self.inner.get_or_create(key, |key| match factory(key) {
                Ok(value) => {
                    let marker = self.policy.expiration_info(&value);
                    Ok((value, marker))
                }
                Err(err) => Err(CreateError::Factory(err)),
            });
        match created {
            Ok((value, _)) => Ok(value),
            Err(CreateError::Factory(err)) => Err(err),
            Err(CreateError::Store(err)) => Err(strip_marker(err).into()),
        }
    }

    /// Returns the live entries in insertion order.
    ///
    /// Expired entries are skipped but not evicted.
    fn snapshot(&self) -> Snapshot<K, V> {
        let entries = self
            .inner
            .snapshot()
            .into_iter()
            .filter(|(_, (value, marker))| !self.policy.is_expired(value, marker))
            .map(|(key, (value, _))| (key, value))
            .collect();
        Snapshot::from_entries(entries)
    }

    fn len(&self) -> usize {
        self.snapshot().len()
    }
}

impl<K, V, P, C> fmt::Debug for ExpiringDataStore<K, V, P, C>
where
    P: ExpirationPolicy<V> + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpiringDataStore")
            .field("inner", &self.inner)
            .field("policy", &self.policy)
            .finish()
    }
}
