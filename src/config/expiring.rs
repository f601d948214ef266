//! Configuration for time-based expiration.
//!
//! # Choosing Values
//!
//! - **`ttl`**: How long an entry stays live after it was inserted or
//!   refreshed. Reads of an entry past its `ttl` treat it as absent.
//! - **`scan_interval`**: Minimum time between full sweeps. A sweep is O(n)
//!   over all entries and runs inline with whichever operation triggers it,
//!   so a shorter interval trades throughput for earlier memory release.
//!
//! ```text
//! scan_interval ≈ ttl / 2 is a reasonable starting point
//! ```
//!
//! # Examples
//!
//! ```
//! use datastore_rs::config::TimeToLiveConfig;
//! use std::time::Duration;
//!
//! let config = TimeToLiveConfig {
//!     ttl: Duration::from_secs(30),
//!     scan_interval: Duration::from_secs(15),
//! };
//! assert_eq!(config.ttl, Duration::from_secs(30));
//! ```

use core::fmt;
use std::time::Duration;

/// Configuration for a [`TimeToLivePolicy`](crate::policy::TimeToLivePolicy).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct TimeToLiveConfig {
    /// Lifetime of an entry, measured from its last insertion or refresh.
    pub ttl: Duration,
    /// Minimum delay between two full expiration sweeps.
    pub scan_interval: Duration,
}

impl Default for TimeToLiveConfig {
    fn default() -> Self {
        TimeToLiveConfig {
            ttl: Duration::from_secs(30),
            scan_interval: Duration::from_secs(15),
        }
    }
}

impl fmt::Debug for TimeToLiveConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeToLiveConfig")
            .field("ttl", &self.ttl)
            .field("scan_interval", &self.scan_interval)
            .finish()
    }
}
