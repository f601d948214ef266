//! Configuration for the concurrent data store.
//!
//! # Sizing Guidelines
//!
//! Keys are spread across `segments` independent locks. Operations on keys
//! in different segments never contend, and a factory running for one key
//! never blocks readers of keys in other segments.
//!
//! - More segments = less contention, at the cost of one mutex and one
//!   condition variable per segment.
//! - Use a power of two for an even spread of keys.
//!
//! # Examples
//!
//! ```
//! use datastore_rs::config::ConcurrentDataStoreConfig;
//!
//! let config = ConcurrentDataStoreConfig::default();
//! assert_eq!(config.segments, 16);
//!
//! let config = ConcurrentDataStoreConfig { segments: 64 };
//! assert_eq!(config.segments, 64);
//! ```

use crate::concurrent::default_segment_count;
use core::fmt;

/// Configuration for a [`ConcurrentDataStore`](crate::ConcurrentDataStore).
///
/// # Fields
///
/// - `segments`: Number of independent lock segments. A value of `0` is
///   treated as `1`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ConcurrentDataStoreConfig {
    /// Number of segments for sharding (more segments = less contention)
    pub segments: usize,
}

impl Default for ConcurrentDataStoreConfig {
    fn default() -> Self {
        ConcurrentDataStoreConfig {
            segments: default_segment_count(),
        }
    }
}

impl fmt::Debug for ConcurrentDataStoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrentDataStoreConfig")
            .field("segments", &self.segments)
            .finish()
    }
}
