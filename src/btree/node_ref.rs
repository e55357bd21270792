use core::fmt;

use crate::item::Item;
use crate::raw::{Handle, RawBTree};

/// A read-only view of one node of a [`BTree`](crate::BTree).
///
/// Views borrow the tree, so the structure cannot change while one is alive.
/// A view is `Copy`, and every accessor takes it by value.
pub struct NodeRef<'a, K, V> {
    tree: &'a RawBTree<K, V>,
    handle: Handle,
}

impl<K, V> Clone for NodeRef<'_, K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V> Copy for NodeRef<'_, K, V> {}

impl<'a, K, V> NodeRef<'a, K, V> {
    pub(crate) const fn new(tree: &'a RawBTree<K, V>, handle: Handle) -> Self {
        Self { tree, handle }
    }

    /// The node's items in ascending key order.
    pub fn items(self) -> &'a [Item<K, V>] {
        self.tree.node(self.handle).items()
    }

    /// The node's keys in ascending order.
    pub fn keys(self) -> impl ExactSizeIterator<Item = &'a K> {
        self.items().iter().map(Item::key)
    }

    /// Number of keys, `n`.
    pub fn len(self) -> usize {
        self.tree.node(self.handle).key_count()
    }

    pub fn is_empty(self) -> bool {
        self.len() == 0
    }

    pub fn is_leaf(self) -> bool {
        self.tree.node(self.handle).is_leaf()
    }

    pub fn is_root(self) -> bool {
        self.handle == self.tree.root()
    }

    /// Number of children: `n + 1` for an internal node, 0 for a leaf.
    pub fn child_count(self) -> usize {
        self.tree.node(self.handle).children().len()
    }

    /// The child at `index`, if there is one.
    pub fn child(self, index: usize) -> Option<NodeRef<'a, K, V>> {
        let handle = *self.tree.node(self.handle).children().get(index)?;
        Some(NodeRef::new(self.tree, handle))
    }

    /// The node's children from left to right.
    pub fn children(self) -> impl ExactSizeIterator<Item = NodeRef<'a, K, V>> {
        let tree = self.tree;
        tree.node(self.handle)
            .children()
            .iter()
            .map(move |&handle| NodeRef::new(tree, handle))
    }
}

impl<K: fmt::Debug, V> fmt::Debug for NodeRef<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("keys", &self.keys().collect::<Vec<_>>())
            .field("leaf", &self.is_leaf())
            .finish()
    }
}
