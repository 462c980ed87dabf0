//! Expiration Daemon
//!
//! Background task that periodically removes entries untouched for longer
//! than the expiration duration.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::EvictionPolicy;

// == Expiration Daemon ==
/// Start-once state of the time-based eviction task.
///
/// The daemon owns no lock. It is handed the cache's own lock on start so
/// its removals serialize with foreground callers.
#[derive(Debug)]
pub struct ExpirationDaemon {
    expiration: Duration,
    started: AtomicBool,
}

impl ExpirationDaemon {
    pub fn new(expiration: Duration) -> Self {
        Self {
            expiration,
            started: AtomicBool::new(false),
        }
    }

    pub fn expiration(&self) -> Duration {
        self.expiration
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    // == Start ==
    /// Spawns the expiration loop on the current tokio runtime.
    ///
    /// The loop holds only a weak handle to `lock` and ends once the cache
    /// is dropped. Returns false without spawning if the daemon already
    /// runs, if the expiration is zero or if no runtime is available.
    pub fn start<P>(&self, lock: &Arc<RwLock<P>>) -> bool
    where
        P: EvictionPolicy + Send + Sync + 'static,
        P::Key: Send + 'static,
    {
        if self.expiration.is_zero() {
            debug!("Expiration disabled, daemon not started");
            return false;
        }
        let Ok(runtime) = Handle::try_current() else {
            warn!("No tokio runtime available, expiration daemon not started");
            return false;
        };
        if self
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        runtime.spawn(run_expiration_loop(Arc::downgrade(lock), self.expiration));
        info!(
            "Started expiration daemon with interval of {} ms",
            self.expiration.as_millis()
        );
        true
    }
}

async fn run_expiration_loop<P>(lock: Weak<RwLock<P>>, expiration: Duration)
where
    P: EvictionPolicy + Send + Sync + 'static,
    P::Key: Send + 'static,
{
    loop {
        tokio::time::sleep(expiration).await;

        let Some(lock) = lock.upgrade() else {
            debug!("Cache dropped, stopping expiration daemon");
            break;
        };

        let removed = sweep_expired(&lock, expiration).await;
        if removed > 0 {
            info!("Expiration sweep: removed {} stale entries", removed);
        } else {
            debug!("Expiration sweep: no stale entries found");
        }
    }
}

// == Sweep ==
/// Collects stale keys under the read lock, then removes them under the
/// write lock.
///
/// A key collected here may be removed or refreshed by another caller
/// before the write lock is taken. Removing an absent key is a no-op, and a
/// refreshed key is still removed.
pub async fn sweep_expired<P>(lock: &RwLock<P>, expiration: Duration) -> usize
where
    P: EvictionPolicy,
{
    let expired = {
        let policy = lock.read().await;
        policy.expired_keys(expiration, Instant::now())
    };
    if expired.is_empty() {
        return 0;
    }

    let mut policy = lock.write().await;
    let mut removed = 0;
    for key in &expired {
        if policy.remove(key) {
            removed += 1;
        }
    }
    removed
}
