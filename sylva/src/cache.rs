//! Identity-keyed memoization cache with insertion-ordered iteration
//!
//! Every non-trivial visitor memoizes expensive per-node results (a
//! discretization, a triangulation, a bounding sphere) keyed by
//! [`NodeId`](crate::scene::NodeId).  Because the scene graph is a DAG, the
//! same node may be reached many times in one traversal; the cache makes the
//! expensive computation run at most once.
//!
//! Iteration order is insertion order, not hash order.  The serializer walks
//! its triangle-soup cache when producing output bytes, so a well-defined
//! order is what makes encoding reproducible.
use crate::scene::NodeId;
use std::collections::HashMap;

/// Maps node identity to a memoized value
///
/// There is no per-entry eviction: a cache is cleared wholesale at the start
/// of each top-level traversal.  Correctness rests on two properties of the
/// scene graph: nodes are immutable once published, and a [`NodeId`] is never
/// reused for a different node.
#[derive(Debug)]
pub struct Cache<V> {
    index: HashMap<NodeId, usize>,
    data: Vec<(NodeId, V)>,
}

impl<V> Default for Cache<V> {
    fn default() -> Self {
        Self {
            index: HashMap::new(),
            data: Vec::new(),
        }
    }
}

impl<V> Cache<V> {
    /// Builds a new empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up the value memoized for the given node, if any
    pub fn get(&self, id: NodeId) -> Option<&V> {
        self.index.get(&id).map(|&i| &self.data[i].1)
    }

    /// Mutable variant of [`Cache::get`]
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut V> {
        let i = *self.index.get(&id)?;
        Some(&mut self.data[i].1)
    }

    /// Checks whether a value is memoized for the given node
    pub fn contains(&self, id: NodeId) -> bool {
        self.index.contains_key(&id)
    }

    /// Memoizes a value for the given node
    ///
    /// Inserting under an id that is already present replaces the value but
    /// keeps the entry's position in iteration order.
    pub fn insert(&mut self, id: NodeId, value: V) {
        match self.index.get(&id) {
            Some(&i) => self.data[i].1 = value,
            None => {
                self.index.insert(id, self.data.len());
                self.data.push((id, value));
            }
        }
    }

    /// Iterates over entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &V)> {
        self.data.iter().map(|(id, v)| (*id, v))
    }

    /// Number of memoized entries
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Checks whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Drops every entry; called at the start of each traversal
    pub fn clear(&mut self) {
        self.index.clear();
        self.data.clear();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::scene::Geometry;

    #[test]
    fn insertion_order_iteration() {
        let a = Geometry::sphere(1.0);
        let b = Geometry::sphere(2.0);
        let c = Geometry::sphere(3.0);
        let mut cache = Cache::new();
        cache.insert(b.id(), 20);
        cache.insert(a.id(), 10);
        cache.insert(c.id(), 30);
        // replacement must not reorder
        cache.insert(b.id(), 21);
        let order: Vec<_> = cache.iter().map(|(id, &v)| (id, v)).collect();
        assert_eq!(order, vec![(b.id(), 21), (a.id(), 10), (c.id(), 30)]);
    }

    #[test]
    fn clear_empties() {
        let g = Geometry::sphere(1.0);
        let mut cache = Cache::new();
        cache.insert(g.id(), 1u32);
        assert!(cache.contains(g.id()));
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get(g.id()), None);
    }
}
