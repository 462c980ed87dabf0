//! Ordered Index Module
//!
//! Key lookup plus a doubly-linked eviction order, both O(1).

use std::collections::HashMap;
use std::hash::Hash;

/// Null link in the arena.
const NIL: usize = usize::MAX;

/// Arena slot. `entry` is `None` while the slot sits on the free list.
#[derive(Debug)]
struct Node<K, T> {
    entry: Option<(K, T)>,
    prev: usize,
    next: usize,
}

// == Ordered Index ==
/// Map from key to a node of an arena-backed doubly-linked list.
///
/// The list defines eviction order:
/// - Front = most recently inserted or promoted
/// - Back = least recently inserted or promoted
///
/// The map and the list are only ever mutated together, so `len()` is the
/// size of both.
#[derive(Debug)]
pub struct OrderedIndex<K, T> {
    /// Key to arena slot
    map: HashMap<K, usize>,
    /// Node storage, links are slot indices
    nodes: Vec<Node<K, T>>,
    head: usize,
    tail: usize,
    /// Head of the recycled slot list
    free: usize,
}

impl<K, T> Default for OrderedIndex<K, T> {
    fn default() -> Self {
        Self {
            map: HashMap::new(),
            nodes: Vec::new(),
            head: NIL,
            tail: NIL,
            free: NIL,
        }
    }
}

impl<K: Hash + Eq + Clone, T> OrderedIndex<K, T> {
    // == Constructor ==
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty index with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            map: HashMap::with_capacity(capacity),
            nodes: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    // == Upsert Front ==
    /// Inserts `key` at the front.
    ///
    /// If the key already exists its item is replaced, the node is moved to
    /// the front and the previous item is returned.
    pub fn upsert_front(&mut self, key: K, item: T) -> Option<T> {
        if let Some(&idx) = self.map.get(&key) {
            let previous = self.nodes[idx]
                .entry
                .as_mut()
                .map(|(_, slot)| std::mem::replace(slot, item));
            self.move_to_front(idx);
            return previous;
        }

        let idx = self.alloc(key.clone(), item);
        self.attach_front(idx);
        self.map.insert(key, idx);
        None
    }

    // == Lookup ==
    /// Returns the item stored for `key` without touching the order.
    pub fn lookup(&self, key: &K) -> Option<&T> {
        let &idx = self.map.get(key)?;
        self.nodes[idx].entry.as_ref().map(|(_, item)| item)
    }

    /// Mutable variant of [`lookup`](Self::lookup). The order is untouched.
    pub fn lookup_mut(&mut self, key: &K) -> Option<&mut T> {
        let &idx = self.map.get(key)?;
        self.nodes[idx].entry.as_mut().map(|(_, item)| item)
    }

    // == Contains ==
    pub fn contains(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    // == Promote ==
    /// Moves `key` to the front. Returns false if the key is absent.
    pub fn promote_to_front(&mut self, key: &K) -> bool {
        match self.map.get(key) {
            Some(&idx) => {
                self.move_to_front(idx);
                true
            }
            None => false,
        }
    }

    // == Remove From Either End ==
    /// Removes and returns the back entry, or None if empty.
    pub fn remove_back(&mut self) -> Option<(K, T)> {
        if self.tail == NIL {
            return None;
        }
        self.remove_at(self.tail)
    }

    /// Removes and returns the front entry, or None if empty.
    pub fn remove_front(&mut self) -> Option<(K, T)> {
        if self.head == NIL {
            return None;
        }
        self.remove_at(self.head)
    }

    /// Returns the back entry without removing it.
    pub fn peek_back(&self) -> Option<(&K, &T)> {
        if self.tail == NIL {
            return None;
        }
        self.nodes[self.tail].entry.as_ref().map(|(k, t)| (k, t))
    }

    // == Remove ==
    /// Removes `key` and returns its item. Absent keys are a no-op.
    pub fn remove(&mut self, key: &K) -> Option<T> {
        let idx = self.map.remove(key)?;
        self.release(idx).map(|(_, item)| item)
    }

    // == Clear ==
    /// Drops every entry and returns how many there were.
    pub fn clear(&mut self) -> usize {
        let count = self.map.len();
        self.map.clear();
        self.nodes.clear();
        self.head = NIL;
        self.tail = NIL;
        self.free = NIL;
        count
    }

    // == Length ==
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    // == Snapshots ==
    /// Snapshot of all keys. The order is unspecified.
    pub fn keys(&self) -> Vec<K> {
        self.map.keys().cloned().collect()
    }

    /// Snapshot of all items. The order is unspecified.
    pub fn values(&self) -> Vec<&T> {
        self.map
            .values()
            .filter_map(|&idx| self.nodes[idx].entry.as_ref().map(|(_, item)| item))
            .collect()
    }

    /// Walks the list from the back (oldest) toward the front.
    pub fn iter_from_back(&self) -> BackToFront<'_, K, T> {
        BackToFront {
            index: self,
            cursor: self.tail,
        }
    }

    // == Internal Helpers ==
    fn alloc(&mut self, key: K, item: T) -> usize {
        let node = Node {
            entry: Some((key, item)),
            prev: NIL,
            next: NIL,
        };
        if self.free == NIL {
            self.nodes.push(node);
            return self.nodes.len() - 1;
        }
        let idx = self.free;
        self.free = self.nodes[idx].next;
        self.nodes[idx] = node;
        idx
    }

    /// Unlinks `idx`, returns its entry and recycles the slot.
    /// The caller is responsible for the map.
    fn release(&mut self, idx: usize) -> Option<(K, T)> {
        self.detach(idx);
        let entry = self.nodes[idx].entry.take();
        self.nodes[idx].next = self.free;
        self.free = idx;
        entry
    }

    fn remove_at(&mut self, idx: usize) -> Option<(K, T)> {
        let (key, item) = self.release(idx)?;
        self.map.remove(&key);
        Some((key, item))
    }

    fn detach(&mut self, idx: usize) {
        let (prev, next) = (self.nodes[idx].prev, self.nodes[idx].next);
        if prev == NIL {
            self.head = next;
        } else {
            self.nodes[prev].next = next;
        }
        if next == NIL {
            self.tail = prev;
        } else {
            self.nodes[next].prev = prev;
        }
        self.nodes[idx].prev = NIL;
        self.nodes[idx].next = NIL;
    }

    fn attach_front(&mut self, idx: usize) {
        self.nodes[idx].prev = NIL;
        self.nodes[idx].next = self.head;
        if self.head == NIL {
            self.tail = idx;
        } else {
            self.nodes[self.head].prev = idx;
        }
        self.head = idx;
    }

    fn move_to_front(&mut self, idx: usize) {
        if self.head == idx {
            return;
        }
        self.detach(idx);
        self.attach_front(idx);
    }
}

// == Back To Front Iterator ==
/// Iterator returned by [`OrderedIndex::iter_from_back`].
pub struct BackToFront<'a, K, T> {
    index: &'a OrderedIndex<K, T>,
    cursor: usize,
}

impl<'a, K, T> Iterator for BackToFront<'a, K, T> {
    type Item = (&'a K, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor == NIL {
            return None;
        }
        let node = &self.index.nodes[self.cursor];
        self.cursor = node.prev;
        node.entry.as_ref().map(|(k, t)| (k, t))
    }
}
