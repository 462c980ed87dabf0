//! Eviction Policy Module
//!
//! The policy capability trait and the ordered policy implementing LRU, MRU,
//! FIFO and time-aware LRU on top of a single [`OrderedIndex`].
//!
//! Policies do no locking of their own. They are always driven through the
//! lock held by [`Cache`](crate::cache::Cache).

use std::fmt;
use std::hash::Hash;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::debug;

use crate::cache::{CacheEntry, OrderedIndex};
use crate::error::{CacheError, Result};

// == Eviction Policy Trait ==
/// Uniform contract shared by every eviction policy.
pub trait EvictionPolicy {
    type Key;
    type Value;

    /// Inserts or updates `key`. Returns true if another entry was evicted
    /// to make room. Updating an existing key never evicts.
    fn add(&mut self, key: Self::Key, value: Self::Value) -> bool;

    /// Returns a copy of the value. With `promote` the policy applies its
    /// access promotion; without it this is a [`peek`](Self::peek).
    fn get(&mut self, key: &Self::Key, promote: bool) -> Option<Self::Value>;

    /// Returns a copy of the value with no ordering side effect.
    fn peek(&self, key: &Self::Key) -> Option<Self::Value>;

    /// Removes `key`. Absent keys return false and change nothing.
    fn remove(&mut self, key: &Self::Key) -> bool;

    fn contains(&self, key: &Self::Key) -> bool;

    /// Removes everything and returns the previous length.
    fn clear(&mut self) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn capacity(&self) -> usize;

    /// Changes the capacity, evicting until `len() <= capacity`.
    /// Returns the number of evicted entries.
    fn set_capacity(&mut self, capacity: usize) -> Result<usize>;

    /// Unordered snapshot of the keys.
    fn keys(&self) -> Vec<Self::Key>;

    /// Unordered snapshot of the values.
    fn values(&self) -> Vec<Self::Value>;

    /// Whether entries carry timestamps the expiration daemon can act on.
    fn is_time_aware(&self) -> bool {
        false
    }

    /// Keys whose entries are older than `expiration` as of `now`.
    /// Policies without timestamps never report anything.
    fn expired_keys(&self, _expiration: Duration, _now: Instant) -> Vec<Self::Key> {
        Vec::new()
    }
}

// == Policy Kind ==
/// The eviction orderings supported by [`OrderedPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    /// Least recently used
    #[default]
    Lru,
    /// Most recently used
    Mru,
    /// First in, first out
    Fifo,
    /// Time-aware least recently used
    Tlru,
}

/// Which end of the order an eviction takes its victim from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum End {
    Front,
    Back,
}

impl PolicyKind {
    pub const ALL: [PolicyKind; 4] = [
        PolicyKind::Lru,
        PolicyKind::Mru,
        PolicyKind::Fifo,
        PolicyKind::Tlru,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PolicyKind::Lru => "lru",
            PolicyKind::Mru => "mru",
            PolicyKind::Fifo => "fifo",
            PolicyKind::Tlru => "tlru",
        }
    }

    /// FIFO reads never change the eviction order.
    fn promotes_on_get(self) -> bool {
        !matches!(self, PolicyKind::Fifo)
    }

    fn eviction_end(self) -> End {
        match self {
            PolicyKind::Mru => End::Front,
            _ => End::Back,
        }
    }

    fn stamps_entries(self) -> bool {
        matches!(self, PolicyKind::Tlru)
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyKind {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lru" => Ok(PolicyKind::Lru),
            "mru" => Ok(PolicyKind::Mru),
            "fifo" => Ok(PolicyKind::Fifo),
            "tlru" => Ok(PolicyKind::Tlru),
            _ => Err(CacheError::UnknownPolicy(s.to_string())),
        }
    }
}

// == Ordered Policy ==
/// One [`OrderedIndex`] plus a capacity, with promotion and eviction ends
/// chosen by [`PolicyKind`].
///
/// | Kind | Update / promoting get     | Victim |
/// |------|----------------------------|--------|
/// | LRU  | move to front              | back   |
/// | MRU  | move to front              | front  |
/// | FIFO | update moves to front, get does nothing | back |
/// | TLRU | move to front, reset timestamp | back |
#[derive(Debug)]
pub struct OrderedPolicy<K, V> {
    kind: PolicyKind,
    capacity: usize,
    index: OrderedIndex<K, CacheEntry<V>>,
}

impl<K: Hash + Eq + Clone, V: Clone> OrderedPolicy<K, V> {
    // == Constructors ==
    /// Creates a policy of the given kind. Capacity must be at least 1.
    pub fn new(kind: PolicyKind, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(CacheError::InvalidCapacity(capacity));
        }
        Ok(Self {
            kind,
            capacity,
            index: OrderedIndex::with_capacity(capacity),
        })
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

    pub fn tlru(capacity: usize) -> Result<Self> {
        Self::new(PolicyKind::Tlru, capacity)
    }

    pub fn kind(&self) -> PolicyKind {
        self.kind
    }

    // == Evict ==
    /// Removes a single entry from the kind's eviction end.
    fn evict(&mut self) -> bool {
        let victim = match self.kind.eviction_end() {
            End::Back => self.index.remove_back(),
            End::Front => self.index.remove_front(),
        };
        if victim.is_some() {
            debug!(policy = %self.kind, len = self.index.len(), "Evicted one entry");
        }
        victim.is_some()
    }
}

impl<K: Hash + Eq + Clone, V: Clone> EvictionPolicy for OrderedPolicy<K, V> {
    type Key = K;
    type Value = V;

    fn add(&mut self, key: K, value: V) -> bool {
        if let Some(entry) = self.index.lookup_mut(&key) {
            entry.value = value;
            entry.touch();
            self.index.promote_to_front(&key);
            return false;
        }

        let mut evicted = false;
        while self.index.len() >= self.capacity {
            if !self.evict() {
                break;
            }
            evicted = true;
        }

        let entry = CacheEntry::new(value, self.kind.stamps_entries());
        self.index.upsert_front(key, entry);
        evicted
    }

    fn get(&mut self, key: &K, promote: bool) -> Option<V> {
        if !promote || !self.kind.promotes_on_get() {
            return self.peek(key);
        }

        let entry = self.index.lookup_mut(key)?;
        entry.touch();
        let value = entry.value.clone();
        self.index.promote_to_front(key);
        Some(value)
    }

    fn peek(&self, key: &K) -> Option<V> {
        self.index.lookup(key).map(|entry| entry.value.clone())
    }

    fn remove(&mut self, key: &K) -> bool {
        self.index.remove(key).is_some()
    }

    fn contains(&self, key: &K) -> bool {
        self.index.contains(key)
    }

    fn clear(&mut self) -> usize {
        self.index.clear()
    }

    fn len(&self) -> usize {
        self.index.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn set_capacity(&mut self, capacity: usize) -> Result<usize> {
        if capacity == 0 {
            return Err(CacheError::InvalidCapacity(capacity));
        }
        let previous = self.capacity;
        self.capacity = capacity;

        // Shrinking evicts one entry at a time from the victim end
        let mut evicted = 0;
        while self.index.len() > self.capacity && self.evict() {
            evicted += 1;
        }

        debug!(
            policy = %self.kind,
            previous,
            capacity,
            evicted,
            "Capacity changed"
        );
        Ok(evicted)
    }

    fn keys(&self) -> Vec<K> {
        self.index.keys()
    }

    fn is_time_aware(&self) -> bool {
        self.kind.stamps_entries()
    }

    fn values(&self) -> Vec<V> {
        self.index
            .values()
            .into_iter()
            .map(|entry| entry.value.clone())
            .collect()
    }

    /// Scans from the least recently used end and stops at the first entry
    /// that is still fresh. Every touch moves an entry to the front with a
    /// new timestamp, so the list is time-ordered.
    fn expired_keys(&self, expiration: Duration, now: Instant) -> Vec<K> {
        if !self.kind.stamps_entries() {
            return Vec::new();
        }
        self.index
            .iter_from_back()
            .take_while(|(_, entry)| entry.is_expired(expiration, now))
            .map(|(key, _)| key.clone())
            .collect()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn key_set(policy: &OrderedPolicy<u32, String>) -> HashSet<u32> {
        policy.keys().into_iter().collect()
    }

    fn set_of(keys: &[u32]) -> HashSet<u32> {
        keys.iter().copied().collect()
    }

    fn fill(policy: &mut OrderedPolicy<u32, String>, keys: &[u32]) {
        for &key in keys {
            policy.add(key, key.to_string());
        }
    }

    #[test]
    fn test_new_rejects_zero_capacity() {
        for kind in PolicyKind::ALL {
            let result = OrderedPolicy::<u32, String>::new(kind, 0);
            assert!(matches!(result, Err(CacheError::InvalidCapacity(0))));
            assert!(OrderedPolicy::<u32, String>::new(kind, 1).is_ok());
        }
    }

    #[test]
    fn test_lru_eviction_sequence() {
        let mut policy = OrderedPolicy::lru(3).unwrap();

        assert!(!policy.add(1, "1".to_string()));
        assert_eq!(key_set(&policy), set_of(&[1]));
        assert!(!policy.add(2, "2".to_string()));
        assert_eq!(key_set(&policy), set_of(&[1, 2]));
        assert!(!policy.add(3, "3".to_string()));
        assert_eq!(key_set(&policy), set_of(&[1, 2, 3]));
        assert!(policy.add(4, "4".to_string()));
        assert_eq!(key_set(&policy), set_of(&[2, 3, 4]));
    }

    #[test]
    fn test_lru_get_promotes() {
        let mut policy = OrderedPolicy::lru(3).unwrap();
        fill(&mut policy, &[1, 2, 3]);

        assert_eq!(policy.get(&1, true), Some("1".to_string()));
        policy.add(4, "4".to_string());

        assert_eq!(key_set(&policy), set_of(&[1, 3, 4]));
    }

    #[test]
    fn test_lru_peek_does_not_promote() {
        let mut policy = OrderedPolicy::lru(3).unwrap();
        fill(&mut policy, &[1, 2, 3]);

        assert_eq!(policy.get(&1, false), Some("1".to_string()));
        assert_eq!(policy.peek(&1), Some("1".to_string()));
        policy.add(4, "4".to_string());

        assert_eq!(key_set(&policy), set_of(&[2, 3, 4]));
    }

    #[test]
    fn test_lru_update_refreshes_without_evicting() {
        let mut policy = OrderedPolicy::lru(3).unwrap();
        fill(&mut policy, &[1, 2, 3]);

        assert!(!policy.add(1, "one".to_string()));
        assert_eq!(policy.len(), 3);
        assert_eq!(policy.peek(&1), Some("one".to_string()));

        policy.add(4, "4".to_string());
        assert_eq!(key_set(&policy), set_of(&[1, 3, 4]));
    }

    #[test]
    fn test_mru_evicts_most_recent() {
        let mut policy = OrderedPolicy::mru(3).unwrap();
        fill(&mut policy, &[1, 2, 3]);

        assert!(policy.add(4, "4".to_string()));
        assert_eq!(key_set(&policy), set_of(&[1, 2, 4]));
    }

    #[test]
    fn test_mru_get_promotes_to_victim() {
        let mut policy = OrderedPolicy::mru(3).unwrap();
        fill(&mut policy, &[1, 2, 3]);

        policy.get(&1, true);
        policy.add(4, "4".to_string());

        assert_eq!(key_set(&policy), set_of(&[2, 3, 4]));
    }

    #[test]
    fn test_fifo_update_then_insert() {
        let mut policy = OrderedPolicy::fifo(3).unwrap();
        fill(&mut policy, &[1, 2, 3, 4]);
        assert_eq!(key_set(&policy), set_of(&[2, 3, 4]));

        assert!(!policy.add(2, "two".to_string()));
        assert_eq!(key_set(&policy), set_of(&[2, 3, 4]));

        assert!(policy.add(5, "5".to_string()));
        assert_eq!(key_set(&policy), set_of(&[2, 4, 5]));
    }

    #[test]
    fn test_fifo_get_does_not_reorder() {
        let mut policy = OrderedPolicy::fifo(3).unwrap();
        fill(&mut policy, &[1, 2, 3]);

        assert_eq!(policy.get(&1, true), Some("1".to_string()));
        policy.add(4, "4".to_string());

        assert_eq!(key_set(&policy), set_of(&[2, 3, 4]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tlru_get_resets_timestamp() {
        let mut policy = OrderedPolicy::tlru(3).unwrap();
        fill(&mut policy, &[1, 2]);
        let expiration = Duration::from_secs(60);

        let before = policy.index.lookup(&1).unwrap().touched_at.unwrap();
        tokio::time::advance(Duration::from_secs(1)).await;
        policy.get(&1, true);
        let after = policy.index.lookup(&1).unwrap().touched_at.unwrap();
        assert_eq!(after - before, Duration::from_secs(1));

        // Nothing is stale yet
        assert!(policy.expired_keys(expiration, Instant::now()).is_empty());
    }

    #[test]
    fn test_tlru_expired_keys_scan_from_back() {
        let mut policy = OrderedPolicy::tlru(5).unwrap();
        fill(&mut policy, &[1, 2, 3]);
        let expiration = Duration::from_secs(1);
        let later = Instant::now() + Duration::from_secs(2);

        let mut expired = policy.expired_keys(expiration, later);
        expired.sort();
        assert_eq!(expired, vec![1, 2, 3]);

        // Scan stops at the first fresh entry from the back
        policy.index.lookup_mut(&2).unwrap().touched_at = Some(later);
        assert_eq!(policy.expired_keys(expiration, later), vec![1]);
    }

    #[test]
    fn test_untimed_policies_never_expire() {
        for kind in [PolicyKind::Lru, PolicyKind::Mru, PolicyKind::Fifo] {
            let mut policy = OrderedPolicy::new(kind, 3).unwrap();
            fill(&mut policy, &[1, 2]);
            let later = Instant::now() + Duration::from_secs(3600);
            assert!(policy.expired_keys(Duration::from_millis(1), later).is_empty());
        }
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut policy = OrderedPolicy::lru(3).unwrap();
        fill(&mut policy, &[1, 2]);

        assert!(!policy.remove(&9));
        assert_eq!(policy.len(), 2);
        assert!(policy.remove(&1));
        assert!(!policy.remove(&1));
        assert_eq!(policy.len(), 1);
    }

    #[test]
    fn test_clear_returns_previous_len() {
        let mut policy = OrderedPolicy::fifo(3).unwrap();
        fill(&mut policy, &[1, 2, 3]);

        assert_eq!(policy.clear(), 3);
        assert!(policy.is_empty());
        assert_eq!(policy.clear(), 0);
    }

    #[test]
    fn test_set_capacity_shrink_evicts_in_order() {
        let mut policy = OrderedPolicy::lru(5).unwrap();
        fill(&mut policy, &[1, 2, 3, 4, 5]);

        assert_eq!(policy.set_capacity(2).unwrap(), 3);
        assert_eq!(policy.capacity(), 2);
        assert_eq!(key_set(&policy), set_of(&[4, 5]));
    }

    #[test]
    fn test_set_capacity_shrink_mru_evicts_front() {
        let mut policy = OrderedPolicy::mru(5).unwrap();
        fill(&mut policy, &[1, 2, 3, 4, 5]);

        assert_eq!(policy.set_capacity(3).unwrap(), 2);
        assert_eq!(key_set(&policy), set_of(&[1, 2, 3]));
    }

    #[test]
    fn test_set_capacity_grow_keeps_entries() {
        let mut policy = OrderedPolicy::lru(3).unwrap();
        fill(&mut policy, &[1, 2, 3]);

        assert_eq!(policy.set_capacity(10).unwrap(), 0);
        assert_eq!(policy.len(), 3);
        fill(&mut policy, &[4, 5]);
        assert_eq!(policy.len(), 5);
    }

    #[test]
    fn test_set_capacity_rejects_zero() {
        let mut policy = OrderedPolicy::lru(3).unwrap();
        fill(&mut policy, &[1, 2, 3]);

        let result = policy.set_capacity(0);
        assert!(matches!(result, Err(CacheError::InvalidCapacity(0))));
        assert_eq!(policy.capacity(), 3);
        assert_eq!(key_set(&policy), set_of(&[1, 2, 3]));
    }

    #[test]
    fn test_values_snapshot() {
        let mut policy = OrderedPolicy::lru(3).unwrap();
        fill(&mut policy, &[1, 2, 3]);

        let mut values = policy.values();
        values.sort();
        assert_eq!(values, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_only_tlru_is_time_aware() {
        for kind in PolicyKind::ALL {
            let policy: OrderedPolicy<u32, String> = OrderedPolicy::new(kind, 2).unwrap();
            assert_eq!(policy.is_time_aware(), kind == PolicyKind::Tlru);
        }
    }

    #[test]
    fn test_policy_kind_parse_and_display() {
        for kind in PolicyKind::ALL {
            assert_eq!(kind.to_string().parse::<PolicyKind>().unwrap(), kind);
        }
        assert_eq!(" TLRU ".parse::<PolicyKind>().unwrap(), PolicyKind::Tlru);
        assert!(matches!(
            "lfu".parse::<PolicyKind>(),
            Err(CacheError::UnknownPolicy(_))
        ));
    }
}
