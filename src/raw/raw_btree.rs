use core::borrow::Borrow;

use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use super::arena::{Arena, Handle};
use super::node::{Children, Node, Slot};
use crate::config::{Config, Ownership};
use crate::error::{Error, Result};
use crate::item::Item;

/// The CLRS-style B-tree behind [`BTree`](crate::BTree).
///
/// Nodes live in an arena and refer to their children by handle. Every
/// mutation walks down from the root exactly once and repairs each node
/// before entering it: inserts split full children, deletes grow children
/// that are down to `t - 1` keys.
pub(crate) struct RawBTree<K, V> {
    /// Arena storing all tree nodes.
    nodes: Arena<Node<K, V>>,
    /// Handle to the root node. There is always a root, possibly an empty leaf.
    root: Handle,
    /// Minimum degree `t`.
    min_degree: usize,
    ownership: Ownership,
    /// Total number of items in the tree.
    len: usize,
}

/// What a deletion descent is looking for.
enum Probe<'a, Q: ?Sized> {
    Key(&'a Q),
    /// The largest item of the subtree (in-order predecessor of a separator).
    Max,
    /// The smallest item of the subtree (in-order successor of a separator).
    Min,
}

impl<Q: ?Sized> Clone for Probe<'_, Q> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Q: ?Sized> Copy for Probe<'_, Q> {}

impl<Q: ?Sized + Ord> Probe<'_, Q> {
    fn locate<K, V>(self, node: &Node<K, V>) -> Slot
    where
        K: Borrow<Q>,
    {
        match (self, node.is_leaf()) {
            (Probe::Key(key), _) => node.search(key),
            (Probe::Max, true) => Slot::Found(node.key_count() - 1),
            (Probe::Max, false) => Slot::Descend(node.key_count()),
            (Probe::Min, true) => Slot::Found(0),
            (Probe::Min, false) => Slot::Descend(0),
        }
    }
}

/// Nodes allocated up front for the splits an insert will perform.
type Spare<K, V> = SmallVec<[Node<K, V>; 4]>;

impl<K, V> RawBTree<K, V> {
    /// Creates a tree holding a single empty leaf root.
    pub(crate) fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let min_degree = config.min_degree();

        let mut nodes = Arena::new();
        let root = nodes.try_reserve(1).and_then(|()| Node::try_alloc(min_degree));
        let mut root = match root {
            Ok(root) => root,
            Err(err) => {
                warn!(min_degree, %err, "could not allocate the root node");
                return Err(err);
            }
        };
        root.set_leaf(true);
        let root = nodes.alloc(root);

        debug!(min_degree, ownership = ?config.ownership(), "created B-tree");
        Ok(Self {
            nodes,
            root,
            min_degree,
            ownership: config.ownership(),
            len: 0,
        })
    }

    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    pub(crate) const fn min_degree(&self) -> usize {
        self.min_degree
    }

    pub(crate) const fn ownership(&self) -> Ownership {
        self.ownership
    }

    pub(crate) const fn root(&self) -> Handle {
        self.root
    }

    /// Number of nodes currently allocated.
    pub(crate) fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn node(&self, handle: Handle) -> &Node<K, V> {
        self.nodes.get(handle)
    }

    /// Number of edges between the root and any leaf.
    pub(crate) fn height(&self) -> usize {
        let mut height = 0;
        let mut current = self.nodes.get(self.root);
        while !current.is_leaf() {
            current = self.nodes.get(current.child(0));
            height += 1;
        }
        height
    }

    /// Hands a payload that is leaving the tree to whoever owns it.
    pub(crate) fn release(&self, payload: V) -> Option<V> {
        self.ownership.release(payload)
    }

    /// Removes a single node from the arena and returns its child handles
    /// without visiting them.
    ///
    /// Payloads go to `released` in caller-owned mode; in tree-owned mode
    /// they are dropped before the node storage is.
    fn dealloc_node(&mut self, handle: Handle, released: &mut Vec<V>) -> Children {
        let (items, children) = self.nodes.take(handle).into_parts();
        for item in items {
            if let Some(payload) = self.release(item.into_payload()) {
                released.push(payload);
            }
        }
        children
    }

    fn free_subtree(&mut self, handle: Handle, released: &mut Vec<V>) {
        for child in self.dealloc_node(handle, released) {
            self.free_subtree(child, released);
        }
    }

    /// Releases every node below the root and empties the root in place, so
    /// it keeps its reserved storage. Visits each node once, then compacts
    /// the arena down to the root's slot.
    pub(crate) fn clear(&mut self) -> Vec<V> {
        let ownership = self.ownership;
        let mut released = Vec::with_capacity(match ownership {
            Ownership::Caller => self.len,
            Ownership::Tree => 0,
        });

        let root = self.nodes.get_mut(self.root);
        released.extend(root.drain_items().filter_map(|item| ownership.release(item.into_payload())));
        while let Some(child) = self.nodes.get_mut(self.root).pop_child() {
            self.free_subtree(child, &mut released);
        }
        self.nodes.get_mut(self.root).set_leaf(true);
        self.root = self.nodes.retain_only(self.root);

        debug!(len = self.len, released = released.len(), "cleared B-tree");
        self.len = 0;
        released
    }

    /// Releases every node, the root included.
    pub(crate) fn destroy(mut self) -> Vec<V> {
        let mut released = self.clear();
        let root = self.root;
        let children = self.dealloc_node(root, &mut released);
        debug_assert!(children.is_empty(), "a cleared root has no children");
        debug!("destroyed B-tree");
        released
    }
}

impl<K: Ord, V> RawBTree<K, V> {
    /// Finds the node and index holding `key`.
    pub(crate) fn search<Q>(&self, key: &Q) -> Option<(Handle, usize)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let mut current = self.root;
        loop {
            let node = self.nodes.get(current);
            match node.search(key) {
                Slot::Found(idx) => return Some((current, idx)),
                Slot::Descend(_) if node.is_leaf() => return None,
                Slot::Descend(idx) => current = node.child(idx),
            }
        }
    }

    pub(crate) fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let (handle, idx) = self.search(key)?;
        Some(self.nodes.get_mut(handle).item_mut(idx).payload_mut())
    }

    /// Returns the leftmost (`first = true`) or rightmost item of the tree.
    pub(crate) fn edge_item(&self, first: bool) -> Option<&Item<K, V>> {
        if self.len == 0 {
            return None;
        }
        let mut node = self.nodes.get(self.root);
        while !node.is_leaf() {
            let idx = if first { 0 } else { node.key_count() };
            node = self.nodes.get(node.child(idx));
        }
        let idx = if first { 0 } else { node.key_count() - 1 };
        Some(node.item(idx))
    }

    /// Inserts an item. A key that is already present is not inserted; the
    /// rejected item is handed back.
    ///
    /// All nodes the insert will need are allocated before the first link is
    /// changed, so an allocation failure leaves the tree untouched.
    pub(crate) fn insert(&mut self, key: K, payload: V) -> Result<Option<Item<K, V>>> {
        let Some(splits) = self.plan_insert(&key) else {
            return Ok(Some(Item::new(key, payload)));
        };

        let mut spare = match self.reserve_nodes(splits) {
            Ok(spare) => spare,
            Err(err) => {
                warn!(splits, len = self.len, %err, "insert aborted");
                return Err(err);
            }
        };

        let t = self.min_degree;
        if self.nodes.get(self.root).is_full(t) {
            let mut new_root = spare.pop().expect("root growth node was reserved");
            new_root.push_child(self.root);
            let new_root = self.nodes.alloc(new_root);
            self.root = new_root;
            self.split_child(new_root, 0, &mut spare);
            debug!(height = self.height(), len = self.len, "root split, tree grew");
        }

        self.insert_non_full(self.root, Item::new(key, payload), &mut spare);
        self.len += 1;
        debug_assert!(spare.is_empty(), "every reserved node is linked in");
        Ok(None)
    }

    /// Walks the path `key` will take. Returns `None` if the key is already
    /// present, otherwise the number of nodes the insert will allocate: one
    /// per full node on the path, plus one for a new root.
    fn plan_insert(&self, key: &K) -> Option<usize> {
        let t = self.min_degree;
        let mut current = self.nodes.get(self.root);
        let mut splits = usize::from(current.is_full(t));
        loop {
            if current.is_full(t) {
                splits += 1;
            }
            match current.search(key) {
                Slot::Found(_) => return None,
                Slot::Descend(_) if current.is_leaf() => return Some(splits),
                Slot::Descend(idx) => current = self.nodes.get(current.child(idx)),
            }
        }
    }

    fn reserve_nodes(&mut self, count: usize) -> Result<Spare<K, V>> {
        self.nodes.try_reserve(count)?;
        let mut spare = Spare::new();
        spare
            .try_reserve_exact(count)
            .map_err(|_| Error::AllocationFailure { what: "split nodes" })?;
        for _ in 0..count {
            spare.push(Node::try_alloc(self.min_degree)?);
        }
        Ok(spare)
    }

    /// Splits the full child at `index` of `parent` around its median, which
    /// moves up into `parent`. `parent` must not be full.
    fn split_child(&mut self, parent: Handle, index: usize, spare: &mut Spare<K, V>) {
        let t = self.min_degree;
        let mut sibling = spare.pop().expect("split node was reserved");
        let full = self.nodes.get(parent).child(index);
        let median = self.nodes.get_mut(full).split_into(t, &mut sibling);
        let sibling = self.nodes.alloc(sibling);

        let parent_node = self.nodes.get_mut(parent);
        parent_node.insert_item(index, median);
        parent_node.insert_child(index + 1, sibling);
        trace!(?parent, index, ?full, ?sibling, "split child");
    }

    fn insert_non_full(&mut self, mut current: Handle, item: Item<K, V>, spare: &mut Spare<K, V>) {
        let t = self.min_degree;
        loop {
            let node = self.nodes.get(current);
            let (Slot::Found(mut idx) | Slot::Descend(mut idx)) = node.search(item.key());

            if node.is_leaf() {
                self.nodes.get_mut(current).insert_item(idx, item);
                return;
            }

            if self.nodes.get(node.child(idx)).is_full(t) {
                self.split_child(current, idx, spare);
                if item.key() > self.nodes.get(current).item(idx).key() {
                    idx += 1;
                }
            }
            current = self.nodes.get(current).child(idx);
        }
    }

    /// Removes `key`, returning its item. Returns `None`, without touching
    /// the tree, when the key is absent.
    pub(crate) fn delete<Q>(&mut self, key: &Q) -> Option<Item<K, V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.search(key)?;
        let removed = self.delete_from(self.root, Probe::Key(key))?;
        self.len -= 1;
        Some(removed)
    }

    /// Removes the smallest (`first = true`) or largest item.
    pub(crate) fn pop_edge(&mut self, first: bool) -> Option<Item<K, V>> {
        if self.len == 0 {
            return None;
        }
        let probe: Probe<'_, K> = if first { Probe::Min } else { Probe::Max };
        let removed = self.delete_from(self.root, probe)?;
        self.len -= 1;
        Some(removed)
    }

    /// Deletes the item `probe` designates from the subtree at `current`.
    ///
    /// `current` is either the root or a node holding at least `t` keys, so
    /// it can always afford to lose one.
    fn delete_from<Q>(&mut self, mut current: Handle, probe: Probe<'_, Q>) -> Option<Item<K, V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let t = self.min_degree;
        loop {
            let node = self.nodes.get(current);
            match probe.locate(node) {
                Slot::Found(idx) if node.is_leaf() => {
                    return Some(self.nodes.get_mut(current).remove_item(idx));
                }
                Slot::Found(idx) => {
                    let left = node.child(idx);
                    let right = node.child(idx + 1);
                    if self.nodes.get(left).can_lend(t) {
                        let predecessor = self.delete_from(left, Probe::<Q>::Max)?;
                        return Some(self.nodes.get_mut(current).replace_item(idx, predecessor));
                    }
                    if self.nodes.get(right).can_lend(t) {
                        let successor = self.delete_from(right, Probe::<Q>::Min)?;
                        return Some(self.nodes.get_mut(current).replace_item(idx, successor));
                    }
                    // Both neighbours are at t - 1; the key moves down to index t - 1 of the merge.
                    current = self.merge_child(current, idx);
                }
                Slot::Descend(_) if node.is_leaf() => return None,
                Slot::Descend(idx) => current = self.grow_child(current, idx),
            }
        }
    }

    /// Makes sure the child at `index` of `parent` holds at least `t` keys
    /// before the descent enters it, and returns the node to enter.
    fn grow_child(&mut self, parent: Handle, index: usize) -> Handle {
        let t = self.min_degree;
        let node = self.nodes.get(parent);
        let child = node.child(index);
        if self.nodes.get(child).can_lend(t) {
            return child;
        }

        let has_left = index > 0;
        let has_right = index < node.key_count();
        if has_left && self.nodes.get(node.child(index - 1)).can_lend(t) {
            self.borrow_from_left(parent, index);
            child
        } else if has_right && self.nodes.get(node.child(index + 1)).can_lend(t) {
            self.borrow_from_right(parent, index);
            child
        } else if has_left {
            self.merge_child(parent, index - 1)
        } else {
            self.merge_child(parent, index)
        }
    }

    /// Rotates the left sibling's last item up through the separator and the
    /// separator down into the front of the child at `index`.
    fn borrow_from_left(&mut self, parent: Handle, index: usize) {
        let parent_node = self.nodes.get(parent);
        let left = parent_node.child(index - 1);
        let child = parent_node.child(index);

        let left_node = self.nodes.get_mut(left);
        let item = left_node.pop_item().expect("left sibling can lend an item");
        let grandchild = if left_node.is_leaf() { None } else { left_node.pop_child() };

        let separator = self.nodes.get_mut(parent).replace_item(index - 1, item);

        let child_node = self.nodes.get_mut(child);
        child_node.push_item_front(separator);
        if let Some(grandchild) = grandchild {
            child_node.push_child_front(grandchild);
        }
        trace!(?parent, index, "borrowed from left sibling");
    }

    /// Mirror image of [`Self::borrow_from_left`].
    fn borrow_from_right(&mut self, parent: Handle, index: usize) {
        let parent_node = self.nodes.get(parent);
        let child = parent_node.child(index);
        let right = parent_node.child(index + 1);

        let right_node = self.nodes.get_mut(right);
        let item = right_node.pop_item_front().expect("right sibling can lend an item");
        let grandchild = if right_node.is_leaf() { None } else { right_node.pop_child_front() };

        let separator = self.nodes.get_mut(parent).replace_item(index, item);

        let child_node = self.nodes.get_mut(child);
        child_node.push_item(separator);
        if let Some(grandchild) = grandchild {
            child_node.push_child(grandchild);
        }
        trace!(?parent, index, "borrowed from right sibling");
    }

    /// Folds the separator at `index` and the child to its right into the
    /// child at `index`, freeing the absorbed sibling. An emptied root is
    /// replaced by the merged child; when that leaves a single node, the arena
    /// is compacted and the node moves to the first slot. Returns the handle
    /// of the merged child.
    fn merge_child(&mut self, parent: Handle, index: usize) -> Handle {
        let parent_node = self.nodes.get_mut(parent);
        let separator = parent_node.remove_item(index);
        let right = parent_node.remove_child(index + 1);
        let left = parent_node.child(index);
        let parent_emptied = parent_node.key_count() == 0;

        let right_node = self.nodes.take(right);
        self.nodes.get_mut(left).merge_with_right(separator, right_node);
        trace!(?parent, index, ?left, ?right, "merged children");

        if parent_emptied && parent == self.root {
            self.nodes.free(parent);
            self.root = left;
            if self.nodes.len() == 1 {
                self.root = self.nodes.retain_only(left);
            }
            debug!(height = self.height(), len = self.len, "root merged away, tree shrank");
            return self.root;
        }
        left
    }
}
