//! A generic LRU-ordered set: `Insert`, `Touch`, `Peek`, `Remove`, all O(1)
//! average. Backs both remote caches' size-bounding policy.
//!
//! Implemented as an intrusive doubly-linked list over an arena (`Vec<Node<K>>`)
//! plus a `HashMap<K, usize>` from key to arena index, rather than pulling in
//! an external LRU crate, the same "small hand-rolled generic data
//! structure" texture as `authguard_core::bow::OwnedOrBorrowed`.

use std::collections::HashMap;
use std::hash::Hash;

const NIL: usize = usize::MAX;

struct Node<K> {
	key: K,
	prev: usize,
	next: usize,
}

/// An ordered set of keys with LRU (least-recently-used) eviction semantics.
///
/// `Insert` may only be called for keys not currently present. `Touch`,
/// `Peek`, and `Remove` may only be called on a non-empty set; callers
/// (the remote caches) guarantee both preconditions.
pub struct EvictionSet<K> {
	nodes: Vec<Node<K>>,
	index: HashMap<K, usize>,
	free: Vec<usize>,
	head: usize, // least recently used
	tail: usize, // most recently used
}

impl<K: Eq + Hash + Clone> EvictionSet<K> {
	pub fn new() -> Self {
		EvictionSet { nodes: Vec::new(), index: HashMap::new(), free: Vec::new(), head: NIL, tail: NIL }
	}

	pub fn len(&self) -> usize {
		self.index.len()
	}

	pub fn is_empty(&self) -> bool {
		self.index.is_empty()
	}

	pub fn contains(&self, key: &K) -> bool {
		self.index.contains_key(key)
	}

	/// Insert `key` as the most-recently-used entry.
	///
	/// # Panics
	/// Panics if `key` is already present.
	pub fn insert(&mut self, key: K) {
		assert!(!self.index.contains_key(&key), "EvictionSet::insert called with a present key");

		let idx = match self.free.pop() {
			Some(idx) => {
				self.nodes[idx] = Node { key: key.clone(), prev: self.tail, next: NIL };
				idx
			}
			None => {
				self.nodes.push(Node { key: key.clone(), prev: self.tail, next: NIL });
				self.nodes.len() - 1
			}
		};

		if self.tail != NIL {
			self.nodes[self.tail].next = idx;
		} else {
			self.head = idx;
		}
		self.tail = idx;
		self.index.insert(key, idx);
	}

	/// Move `key` to the most-recently-used position.
	///
	/// # Panics
	/// Panics if `key` is not present.
	pub fn touch(&mut self, key: &K) {
		let &idx = self.index.get(key).expect("EvictionSet::touch called with an absent key");
		if idx == self.tail {
			return;
		}
		self.unlink(idx);
		self.nodes[idx].prev = self.tail;
		self.nodes[idx].next = NIL;
		if self.tail != NIL {
			self.nodes[self.tail].next = idx;
		} else {
			self.head = idx;
		}
		self.tail = idx;
	}

	/// The least-recently-used key.
	///
	/// # Panics
	/// Panics if the set is empty.
	pub fn peek(&self) -> &K {
		assert!(self.head != NIL, "EvictionSet::peek called on an empty set");
		&self.nodes[self.head].key
	}

	/// Remove and return the least-recently-used key.
	///
	/// # Panics
	/// Panics if the set is empty.
	pub fn remove(&mut self) -> K {
		assert!(self.head != NIL, "EvictionSet::remove called on an empty set");
		let idx = self.head;
		self.unlink(idx);
		let key = self.nodes[idx].key.clone();
		self.index.remove(&key);
		self.free.push(idx);
		key
	}

	/// Remove an arbitrary key, wherever it sits in the order. Used when a
	/// stale cache entry is replaced before its natural LRU turn.
	///
	/// No-op if `key` is not present.
	pub fn remove_key(&mut self, key: &K) {
		let Some(idx) = self.index.remove(key) else { return };
		self.unlink(idx);
		self.free.push(idx);
	}

	fn unlink(&mut self, idx: usize) {
		let (prev, next) = (self.nodes[idx].prev, self.nodes[idx].next);
		if prev != NIL {
			self.nodes[prev].next = next;
		} else {
			self.head = next;
		}
		if next != NIL {
			self.nodes[next].prev = prev;
		} else {
			self.tail = prev;
		}
	}
}

impl<K: Eq + Hash + Clone> Default for EvictionSet<K> {
	fn default() -> Self {
		Self::new()
	}
}
