//! Cache Store Module
//!
//! The concurrent façade: one eviction policy behind one `RwLock`, with an
//! optional expiration daemon sharing that same lock.

use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::warn;

use crate::cache::{EvictionPolicy, OrderedPolicy, PolicyKind};
use crate::config::Config;
use crate::error::Result;
use crate::tasks::ExpirationDaemon;

// == Cache ==
/// Thread-safe bounded cache.
///
/// Mutating calls (`add`, `set`, `get`, `remove`, `clear`, `set_capacity`)
/// take the write lock. Read-only calls (`peek`, `contains`, `len`, `cap`,
/// `keys`, `values`) take the read lock. The policy is never touched without
/// the lock held.
///
/// Share a cache between tasks by wrapping it in an `Arc`.
#[derive(Debug)]
pub struct Cache<K, V, P = OrderedPolicy<K, V>> {
    /// The policy and its lock, shared with the expiration daemon
    policy: Arc<RwLock<P>>,
    /// Time-based eviction state
    daemon: ExpirationDaemon,
    _entries: PhantomData<fn() -> (K, V)>,
}

impl<K, V> Cache<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    // == Constructors ==
    /// Creates a cache of the given kind without time-based eviction.
    ///
    /// A `Tlru` cache built this way behaves as plain LRU; use
    /// [`Cache::tlru`] to enable expiration.
    pub fn new(kind: PolicyKind, capacity: usize) -> Result<Self> {
        Self::with_expiration(kind, capacity, Duration::ZERO)
    }

    pub fn lru(capacity: usize) -> Result<Self> {
        Self::new(PolicyKind::Lru, capacity)
    }

    pub fn mru(capacity: usize) -> Result<Self> {
        Self::new(PolicyKind::Mru, capacity)
    }

    pub fn fifo(capacity: usize) -> Result<Self> {
        Self::new(PolicyKind::Fifo, capacity)
    }

    /// Creates a time-aware LRU cache.
    ///
    /// Entries untouched for `expiration` are removed by a background task
    /// that starts immediately when called inside a tokio runtime. A zero
    /// duration disables expiration.
    ///
    /// Built outside a runtime, the cache is returned without a running
    /// daemon and nothing expires until [`Cache::start_expiration_daemon`]
    /// is called from inside one. Check [`Cache::daemon_started`].
    pub fn tlru(capacity: usize, expiration: Duration) -> Result<Self> {
        Self::with_expiration(PolicyKind::Tlru, capacity, expiration)
    }

    /// Creates a cache from a [`Config`]. The expiration setting only
    /// applies to the `Tlru` policy.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_expiration(config.policy, config.capacity, config.expiration())
    }

    fn with_expiration(kind: PolicyKind, capacity: usize, expiration: Duration) -> Result<Self> {
        let policy = OrderedPolicy::new(kind, capacity)?;
        Ok(Self::with_policy(policy, expiration))
    }

    // == Kind ==
    pub async fn kind(&self) -> PolicyKind {
        self.policy.read().await.kind()
    }
}

impl<K, V, P> Cache<K, V, P>
where
    P: EvictionPolicy<Key = K, Value = V> + Send + Sync + 'static,
    K: Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Wraps an existing policy. A non-zero `expiration` starts the
    /// expiration daemon if the policy is time-aware and a tokio runtime is
    /// available. Other policies ignore it.
    pub fn with_policy(policy: P, expiration: Duration) -> Self {
        let expiration = if policy.is_time_aware() {
            expiration
        } else {
            if !expiration.is_zero() {
                warn!(
                    "Expiration of {} ms ignored, policy keeps no timestamps",
                    expiration.as_millis()
                );
            }
            Duration::ZERO
        };
        let cache = Self {
            policy: Arc::new(RwLock::new(policy)),
            daemon: ExpirationDaemon::new(expiration),
            _entries: PhantomData,
        };
        if !expiration.is_zero() {
            cache.start_expiration_daemon();
        }
        cache
    }

    // == Expiration Daemon ==
    /// Starts the expiration daemon on the current tokio runtime.
    ///
    /// Returns false if it is already running, if expiration is disabled or
    /// if there is no runtime to spawn on.
    pub fn start_expiration_daemon(&self) -> bool {
        self.daemon.start(&self.policy)
    }

    pub fn daemon_started(&self) -> bool {
        self.daemon.is_started()
    }

    pub fn expiration(&self) -> Duration {
        self.daemon.expiration()
    }

    // == Add ==
    /// Inserts or updates an entry. Returns true if another entry was evicted.
    pub async fn add(&self, key: K, value: V) -> bool {
        self.policy.write().await.add(key, value)
    }

    // == Set ==
    /// Updates an existing entry. Returns false, storing nothing, if the key
    /// is absent.
    pub async fn set(&self, key: K, value: V) -> bool {
        let mut policy = self.policy.write().await;
        // Check and update under one guard
        if !policy.contains(&key) {
            return false;
        }
        policy.add(key, value);
        true
    }

    // == Get ==
    /// Returns a copy of the value and promotes the entry.
    pub async fn get(&self, key: &K) -> Option<V> {
        self.policy.write().await.get(key, true)
    }

    // == Peek ==
    /// Returns a copy of the value without changing the eviction order.
    pub async fn peek(&self, key: &K) -> Option<V> {
        self.policy.read().await.peek(key)
    }

    // == Remove ==
    pub async fn remove(&self, key: &K) -> bool {
        self.policy.write().await.remove(key)
    }

    // == Contains ==
    pub async fn contains(&self, key: &K) -> bool {
        self.policy.read().await.contains(key)
    }

    // == Length ==
    pub async fn len(&self) -> usize {
        self.policy.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.policy.read().await.is_empty()
    }

    // == Capacity ==
    pub async fn cap(&self) -> usize {
        self.policy.read().await.capacity()
    }

    /// Changes the capacity, evicting entries if the cache no longer fits.
    /// Zero is rejected and leaves the cache untouched.
    pub async fn set_capacity(&self, capacity: usize) -> Result<usize> {
        self.policy.write().await.set_capacity(capacity)
    }

    // == Clear ==
    /// Removes all entries and returns how many there were.
    pub async fn clear(&self) -> usize {
        self.policy.write().await.clear()
    }

    // == Snapshots ==
    /// Unordered snapshot of the keys.
    pub async fn keys(&self) -> Vec<K> {
        self.policy.read().await.keys()
    }

    /// Unordered snapshot of the values.
    pub async fn values(&self) -> Vec<V> {
        self.policy.read().await.values()
    }
}
