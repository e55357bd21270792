use core::borrow::Borrow;

use smallvec::SmallVec;

use super::arena::Handle;
use crate::error::{Error, Result};
use crate::item::Item;

// Inline capacity covers the default minimum degree (t = 2) without a heap allocation.
const INLINE_KEYS: usize = 3;
const INLINE_CHILDREN: usize = 4;

pub(crate) type Items<K, V> = SmallVec<[Item<K, V>; INLINE_KEYS]>;
pub(crate) type Children = SmallVec<[Handle; INLINE_CHILDREN]>;

/// Where a key sits relative to a node.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Slot {
    /// The key is stored at this index.
    Found(usize),
    /// The key is not stored here; it belongs in the subtree of this child
    /// (or at this insertion point, for a leaf).
    Descend(usize),
}

/// A B-tree node: up to `2t - 1` items in ascending key order and, unless it
/// is a leaf, one more child handle than items.
pub(crate) struct Node<K, V> {
    leaf: bool,
    items: Items<K, V>,
    children: Children,
}

impl<K, V> Node<K, V> {
    /// Allocates a node with room for `2t - 1` items and `2t` children.
    ///
    /// Nothing is kept if either reservation fails.
    pub(crate) fn try_alloc(min_degree: usize) -> Result<Self> {
        #[cfg(test)]
        fault::charge()?;

        let mut items = Items::new();
        items
            .try_reserve_exact(2 * min_degree - 1)
            .map_err(|_| Error::AllocationFailure { what: "node items" })?;
        let mut children = Children::new();
        children
            .try_reserve_exact(2 * min_degree)
            .map_err(|_| Error::AllocationFailure { what: "node children" })?;
        Ok(Self {
            leaf: false,
            items,
            children,
        })
    }

    pub(crate) fn is_leaf(&self) -> bool {
        self.leaf
    }

    pub(crate) fn set_leaf(&mut self, leaf: bool) {
        self.leaf = leaf;
    }

    /// Number of keys, `n`.
    pub(crate) fn key_count(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn is_full(&self, min_degree: usize) -> bool {
        self.items.len() == 2 * min_degree - 1
    }

    /// True if the node can give up a key and still hold `t - 1`.
    pub(crate) fn can_lend(&self, min_degree: usize) -> bool {
        self.items.len() >= min_degree
    }

    #[inline]
    pub(crate) fn item(&self, index: usize) -> &Item<K, V> {
        &self.items[index]
    }

    #[inline]
    pub(crate) fn item_mut(&mut self, index: usize) -> &mut Item<K, V> {
        &mut self.items[index]
    }

    pub(crate) fn items(&self) -> &[Item<K, V>] {
        &self.items
    }

    #[inline]
    pub(crate) fn child(&self, index: usize) -> Handle {
        self.children[index]
    }

    pub(crate) fn children(&self) -> &[Handle] {
        &self.children
    }

    /// Locates `key` among this node's items.
    #[inline]
    pub(crate) fn search<Q>(&self, key: &Q) -> Slot
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        match self.items.binary_search_by(|item| item.key().borrow().cmp(key)) {
            Ok(idx) => Slot::Found(idx),
            Err(idx) => Slot::Descend(idx),
        }
    }

    pub(crate) fn insert_item(&mut self, index: usize, item: Item<K, V>) {
        self.items.insert(index, item);
    }

    pub(crate) fn remove_item(&mut self, index: usize) -> Item<K, V> {
        self.items.remove(index)
    }

    pub(crate) fn replace_item(&mut self, index: usize, item: Item<K, V>) -> Item<K, V> {
        core::mem::replace(&mut self.items[index], item)
    }

    pub(crate) fn push_item(&mut self, item: Item<K, V>) {
        self.items.push(item);
    }

    pub(crate) fn push_item_front(&mut self, item: Item<K, V>) {
        self.items.insert(0, item);
    }

    pub(crate) fn pop_item(&mut self) -> Option<Item<K, V>> {
        self.items.pop()
    }

    pub(crate) fn pop_item_front(&mut self) -> Option<Item<K, V>> {
        if self.items.is_empty() {
            None
        } else {
            Some(self.items.remove(0))
        }
    }

    pub(crate) fn insert_child(&mut self, index: usize, child: Handle) {
        self.children.insert(index, child);
    }

    pub(crate) fn remove_child(&mut self, index: usize) -> Handle {
        self.children.remove(index)
    }

    pub(crate) fn push_child(&mut self, child: Handle) {
        self.children.push(child);
    }

    pub(crate) fn push_child_front(&mut self, child: Handle) {
        self.children.insert(0, child);
    }

    pub(crate) fn pop_child(&mut self) -> Option<Handle> {
        self.children.pop()
    }

    pub(crate) fn pop_child_front(&mut self) -> Option<Handle> {
        if self.children.is_empty() {
            None
        } else {
            Some(self.children.remove(0))
        }
    }

    /// Moves the upper `t - 1` items (and `t` children, if internal) of this
    /// full node into the empty `sibling` and returns the median item.
    pub(crate) fn split_into(&mut self, min_degree: usize, sibling: &mut Node<K, V>) -> Item<K, V> {
        debug_assert!(self.is_full(min_degree), "only a full node can be split");
        debug_assert_eq!(sibling.key_count(), 0);

        sibling.leaf = self.leaf;
        sibling.items.extend(self.items.drain(min_degree..));
        if !self.leaf {
            sibling.children.extend(self.children.drain(min_degree..));
        }
        self.items.pop().expect("a full node has a median item")
    }

    /// Appends `separator` and then everything `right` holds.
    pub(crate) fn merge_with_right(&mut self, separator: Item<K, V>, mut right: Node<K, V>) {
        self.items.push(separator);
        self.items.append(&mut right.items);
        self.children.append(&mut right.children);
    }

    /// Removes every item, keeping the storage reserved for them.
    pub(crate) fn drain_items(&mut self) -> smallvec::Drain<'_, [Item<K, V>; INLINE_KEYS]> {
        self.items.drain(..)
    }

    /// Reserved room as `(items, children)`.
    #[cfg(test)]
    pub(crate) fn capacity(&self) -> (usize, usize) {
        (self.items.capacity(), self.children.capacity())
    }

    pub(crate) fn into_parts(self) -> (Items<K, V>, Children) {
        (self.items, self.children)
    }
}

/// Test-only allocation budget: once it runs out, [`Node::try_alloc`] fails
/// as if the allocator had.
#[cfg(test)]
pub(crate) mod fault {
    use std::cell::Cell;

    use crate::error::{Error, Result};

    thread_local! {
        static BUDGET: Cell<Option<usize>> = const { Cell::new(None) };
    }

    /// Lifts the limit when dropped.
    #[must_use]
    pub(crate) struct Limit(());

    impl Drop for Limit {
        fn drop(&mut self) {
            BUDGET.with(|budget| budget.set(None));
        }
    }

    /// Lets only the next `nodes` allocations on this thread succeed, until
    /// the returned guard is dropped.
    pub(crate) fn limit(nodes: usize) -> Limit {
        BUDGET.with(|budget| budget.set(Some(nodes)));
        Limit(())
    }

    pub(super) fn charge() -> Result<()> {
        BUDGET.with(|budget| match budget.get() {
            Some(0) => Err(Error::AllocationFailure { what: "node items" }),
            Some(left) => {
                budget.set(Some(left - 1));
                Ok(())
            }
            None => Ok(()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf_with(keys: &[u32]) -> Node<u32, ()> {
        let mut node = Node::try_alloc(keys.len().div_ceil(2).max(2)).unwrap();
        node.set_leaf(true);
        for &key in keys {
            node.push_item(Item::new(key, ()));
        }
        node
    }

    fn keys_of(node: &Node<u32, ()>) -> Vec<u32> {
        node.items().iter().map(|item| *item.key()).collect()
    }

    #[test]
    fn fresh_node_is_empty_internal() {
        let node: Node<u32, ()> = Node::try_alloc(5).unwrap();
        assert!(!node.is_leaf());
        assert_eq!(node.key_count(), 0);
        assert!(node.children().is_empty());
        assert!(node.items.capacity() >= 9);
        assert!(node.children.capacity() >= 10);
    }

    #[test]
    fn oversized_node_reports_allocation_failure() {
        let result: Result<Node<u64, u64>> = Node::try_alloc(usize::MAX / 4);
        assert!(matches!(result, Err(Error::AllocationFailure { what: "node items" })));
    }

    #[test]
    fn search_reports_found_and_descend() {
        let node = leaf_with(&[10, 20, 30]);
        assert_eq!(node.search(&5), Slot::Descend(0));
        assert_eq!(node.search(&10), Slot::Found(0));
        assert_eq!(node.search(&25), Slot::Descend(2));
        assert_eq!(node.search(&30), Slot::Found(2));
        assert_eq!(node.search(&31), Slot::Descend(3));
    }

    #[test]
    fn split_moves_upper_half() {
        let t = 3;
        let mut full = leaf_with(&[1, 2, 3, 4, 5]);
        let mut sibling = Node::try_alloc(t).unwrap();

        let median = full.split_into(t, &mut sibling);

        assert_eq!(*median.key(), 3);
        assert_eq!(keys_of(&full), vec![1, 2]);
        assert_eq!(keys_of(&sibling), vec![4, 5]);
        assert!(sibling.is_leaf());
    }

    #[test]
    fn split_internal_moves_children() {
        let t = 2;
        let mut full: Node<u32, ()> = Node::try_alloc(t).unwrap();
        for key in [10, 20, 30] {
            full.push_item(Item::new(key, ()));
        }
        let handles: Vec<Handle> = (0..4).map(Handle::from_index).collect();
        for &h in &handles {
            full.push_child(h);
        }
        let mut sibling = Node::try_alloc(t).unwrap();

        let median = full.split_into(t, &mut sibling);

        assert_eq!(*median.key(), 20);
        assert_eq!(full.children(), &handles[..2]);
        assert_eq!(sibling.children(), &handles[2..]);
        assert!(!sibling.is_leaf());
    }

    #[test]
    fn merge_appends_separator_and_right() {
        let mut left = leaf_with(&[1, 2]);
        let right = leaf_with(&[4, 5]);
        left.merge_with_right(Item::new(3, ()), right);
        assert_eq!(keys_of(&left), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn budget_fails_allocations_once_spent() {
        let limit = fault::limit(1);
        assert!(Node::<u32, ()>::try_alloc(2).is_ok());
        assert!(matches!(
            Node::<u32, ()>::try_alloc(2),
            Err(Error::AllocationFailure { what: "node items" })
        ));
        drop(limit);
        assert!(Node::<u32, ()>::try_alloc(2).is_ok());
    }

    #[test]
    fn draining_items_keeps_reserved_room() {
        let mut node = leaf_with(&[1, 2, 3, 4, 5, 6, 7]);
        let before = node.capacity();
        assert_eq!(node.drain_items().map(|item| *item.key()).collect::<Vec<_>>(), vec![1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(node.key_count(), 0);
        assert_eq!(node.capacity(), before);
    }

    #[test]
    fn front_and_back_rotation_helpers() {
        let mut node = leaf_with(&[2, 3]);
        node.push_item_front(Item::new(1, ()));
        node.push_item(Item::new(4, ()));
        assert_eq!(keys_of(&node), vec![1, 2, 3, 4]);

        assert_eq!(node.pop_item_front().map(|item| *item.key()), Some(1));
        assert_eq!(node.pop_item().map(|item| *item.key()), Some(4));
        assert_eq!(keys_of(&node), vec![2, 3]);

        let old = node.replace_item(0, Item::new(9, ()));
        assert_eq!(*old.key(), 2);
        assert_eq!(*node.remove_item(0).key(), 9);
    }
}
