//! Expiration Policies
//!
//! An [`ExpirationPolicy`] tells an [`ExpiringDataStore`](crate::ExpiringDataStore)
//! when entries die and when to look for dead ones. The store never interprets
//! the markers a policy hands out; it only stores them and passes them back.
//!
//! | Marker | Attached to | Asked via |
//! |--------|-------------|-----------|
//! | `ExpirationMarker` | every entry, on insert or refresh | `is_expired(value, marker)` |
//! | `ScanMarker` | the store | `should_scan(next_scan)` |
//!
//! [`TimeToLivePolicy`] is the ready-made time-based policy.

use crate::config::TimeToLiveConfig;
use core::fmt;
use std::time::Instant;

/// Decides entry liveness and sweep scheduling for an expiring store.
///
/// Implementations should be pure: the same inputs at the same moment give
/// the same answer.
pub trait ExpirationPolicy<V> {
    /// Token deciding whether a full sweep is due.
    type ScanMarker;

    /// Token attached to each entry to decide its liveness later.
    type ExpirationMarker: Clone;

    /// Returns `true` if a full sweep is due.
    fn should_scan(&self, next_scan: &Self::ScanMarker) -> bool;

    /// Returns `true` if `value`, stored with `marker`, has expired.
    fn is_expired(&self, value: &V, marker: &Self::ExpirationMarker) -> bool;

    /// Computes the marker to attach to `value` when it is stored.
    fn expiration_info(&self, value: &V) -> Self::ExpirationMarker;

    /// Computes when the next sweep is due. Called once per completed sweep.
    fn next_scan_marker(&self) -> Self::ScanMarker;
}

/// Expires entries a fixed time after they were stored.
///
/// Markers are deadlines. A deadline of `None` never passes; it is used when
/// the configured duration does not fit into an [`Instant`].
///
/// # Examples
///
/// ```
/// use datastore_rs::config::TimeToLiveConfig;
/// use datastore_rs::policy::{ExpirationPolicy, TimeToLivePolicy};
/// use std::time::Duration;
///
/// let policy = TimeToLivePolicy::new(TimeToLiveConfig {
///     ttl: Duration::from_secs(60),
///     scan_interval: Duration::from_secs(30),
/// });
///
/// let marker = ExpirationPolicy::<i32>::expiration_info(&policy, &1);
/// assert!(!policy.is_expired(&1, &marker));
/// ```
#[derive(Clone, Copy)]
pub struct TimeToLivePolicy {
    config: TimeToLiveConfig,
}

impl TimeToLivePolicy {
    /// Creates a policy from `config`.
    pub fn new(config: TimeToLiveConfig) -> Self {
        TimeToLivePolicy { config }
    }

    /// Returns the policy's configuration.
    pub fn config(&self) -> &TimeToLiveConfig {
        &self.config
    }
}

impl Default for TimeToLivePolicy {
    fn default() -> Self {
        TimeToLivePolicy::new(TimeToLiveConfig::default())
    }
}

#[inline]
fn has_passed(deadline: &Option<Instant>) -> bool {
    match deadline {
        Some(deadline) => Instant::now() >= *deadline,
        None => false,
    }
}

impl<V> ExpirationPolicy<V> for TimeToLivePolicy {
    type ScanMarker = Option<Instant>;
    type ExpirationMarker = Option<Instant>;

    fn should_scan(&self, next_scan: &Option<Instant>) -> bool {
        has_passed(next_scan)
    }

    fn is_expired(&self, _value: &V, marker: &Option<Instant>) -> bool {
        has_passed(marker)
    }

    fn expiration_info(&self, _value: &V) -> Option<Instant> {
        Instant::now().checked_add(self.config.ttl)
    }

    fn next_scan_marker(&self) -> Option<Instant> {
        Instant::now().checked_add(self.config.scan_interval)
    }
}

impl fmt::Debug for TimeToLivePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeToLivePolicy")
            .field("ttl", &self.config.ttl)
            .field("scan_interval", &self.config.scan_interval)
            .finish()
    }
}
