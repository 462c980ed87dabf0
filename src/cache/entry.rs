//! Cache Entry Module
//!
//! Defines the payload stored per key, with an optional touch timestamp for
//! time-aware eviction.

use std::time::Duration;

use tokio::time::Instant;

// == Cache Entry ==
/// A cached value plus the instant it was last inserted or touched.
///
/// Only time-aware policies stamp their entries; for every other policy
/// `touched_at` stays `None` and the entry never expires.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Last insert/touch (monotonic clock), None = not time-aware
    pub touched_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new entry, stamped with the current instant if `stamped`.
    pub fn new(value: V, stamped: bool) -> Self {
        Self {
            value,
            touched_at: stamped.then(Instant::now),
        }
    }

    // == Touch ==
    /// Resets the timestamp of a stamped entry to now.
    pub fn touch(&mut self) {
        if let Some(touched_at) = self.touched_at.as_mut() {
            *touched_at = Instant::now();
        }
    }

    // == Is Expired ==
    /// Checks if the entry has outlived `expiration` as of `now`.
    ///
    /// Boundary condition: an entry is expired once
    /// `touched_at + expiration <= now`.
    pub fn is_expired(&self, expiration: Duration, now: Instant) -> bool {
        match self.touched_at {
            Some(touched_at) => touched_at
                .checked_add(expiration)
                .is_some_and(|deadline| deadline <= now),
            None => false,
        }
    }
}
