use core::borrow::Borrow;
use core::fmt;

use crate::config::{Config, Ownership};
use crate::error::Result;
use crate::item::Item;
use crate::raw::RawBTree;

mod node_ref;
mod traverse;

pub use node_ref::NodeRef;
pub use traverse::{Dump, Nodes, Traverse};

/// An ordered index built on a B-tree with a runtime minimum degree `t`.
///
/// Every node other than the root holds between `t - 1` and `2t - 1` keys,
/// internal nodes hold one more child than keys, and all leaves sit at the
/// same depth. Lookups, inserts and deletes each visit `O(log_t n)` nodes and
/// do `O(t)` work per node.
///
/// Keys are unique: inserting a key that is already present is rejected and
/// the item is handed back as [`Insertion::Duplicate`].
///
/// Payloads are opaque to the tree. Whether the tree or the caller is
/// responsible for them after they leave the tree is chosen once, at
/// creation, through [`Ownership`].
///
/// # Examples
///
/// ```
/// use btree_index::{BTree, Deletion, SearchResult};
///
/// let mut index = BTree::new(2)?;
/// for key in [50, 80, 10, 20] {
///     assert!(index.insert(key, key * 100)?.is_inserted());
/// }
///
/// assert!(index.search(&20).is_found());
/// assert!(matches!(index.search(&0), SearchResult::NotFound));
///
/// assert_eq!(index.delete(&80), Deletion::Removed(Some(8000)));
/// assert_eq!(index.delete(&80), Deletion::NotFound);
///
/// let keys: Vec<i32> = index.traverse().map(|(_, key)| *key).collect();
/// assert_eq!(keys, [10, 20, 50]);
/// # Ok::<(), btree_index::Error>(())
/// ```
pub struct BTree<K, V> {
    raw: RawBTree<K, V>,
}

/// Outcome of [`BTree::search`].
pub enum SearchResult<'a, K, V> {
    /// The key is stored in `node` at position `index`.
    Found { node: NodeRef<'a, K, V>, index: usize },
    /// The key is not in the tree.
    NotFound,
}

impl<'a, K, V> SearchResult<'a, K, V> {
    /// Returns true if the key was found.
    pub const fn is_found(&self) -> bool {
        matches!(self, SearchResult::Found { .. })
    }

    /// Returns the matching item, if any.
    pub fn item(&self) -> Option<&'a Item<K, V>> {
        match self {
            SearchResult::Found { node, index } => Some(&node.items()[*index]),
            SearchResult::NotFound => None,
        }
    }
}

impl<K: fmt::Debug, V> fmt::Debug for SearchResult<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchResult::Found { node, index } => f
                .debug_struct("Found")
                .field("node", node)
                .field("index", index)
                .finish(),
            SearchResult::NotFound => f.write_str("NotFound"),
        }
    }
}

/// Outcome of [`BTree::insert`].
#[derive(Clone, Debug, Eq, PartialEq)]
#[must_use]
pub enum Insertion<K, V> {
    /// The item was stored.
    Inserted,
    /// The key was already present; the tree is unchanged and the rejected
    /// item is returned.
    Duplicate(Item<K, V>),
}

impl<K, V> Insertion<K, V> {
    pub const fn is_inserted(&self) -> bool {
        matches!(self, Insertion::Inserted)
    }

    pub const fn is_duplicate(&self) -> bool {
        matches!(self, Insertion::Duplicate(_))
    }
}

/// Outcome of [`BTree::delete`].
#[derive(Clone, Debug, Eq, PartialEq)]
#[must_use]
pub enum Deletion<V> {
    /// The key was removed. Carries the payload when payloads are
    /// [`Ownership::Caller`]; with [`Ownership::Tree`] the tree has already
    /// dropped it.
    Removed(Option<V>),
    /// The key was not in the tree; nothing changed.
    NotFound,
}

impl<V> Deletion<V> {
    pub const fn is_removed(&self) -> bool {
        matches!(self, Deletion::Removed(_))
    }

    pub const fn is_not_found(&self) -> bool {
        matches!(self, Deletion::NotFound)
    }

    /// Returns the payload handed back by the deletion, if any.
    pub fn into_payload(self) -> Option<V> {
        match self {
            Deletion::Removed(payload) => payload,
            Deletion::NotFound => None,
        }
    }
}

impl<K, V> BTree<K, V> {
    /// Creates an empty tree with minimum degree `min_degree` and
    /// caller-owned payloads.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfig`](crate::Error::InvalidConfig) if `min_degree < 2`;
    /// [`Error::AllocationFailure`](crate::Error::AllocationFailure) if the
    /// root node cannot be allocated.
    pub fn new(min_degree: usize) -> Result<Self> {
        Self::with_config(Config::new(min_degree))
    }

    /// Creates an empty tree from a full configuration.
    pub fn with_config(config: Config) -> Result<Self> {
        Ok(Self {
            raw: RawBTree::new(config)?,
        })
    }

    /// Returns the minimum degree `t`.
    pub const fn min_degree(&self) -> usize {
        self.raw.min_degree()
    }

    /// Returns the payload ownership mode chosen at creation.
    pub const fn ownership(&self) -> Ownership {
        self.raw.ownership()
    }

    /// Returns the number of keys in the tree.
    pub const fn len(&self) -> usize {
        self.raw.len()
    }

    /// Returns true if the tree holds no keys.
    pub const fn is_empty(&self) -> bool {
        self.raw.len() == 0
    }

    /// Returns the number of edges from the root to the leaves; an empty or
    /// single-node tree has height 0.
    pub fn height(&self) -> usize {
        self.raw.height()
    }

    /// Returns the number of nodes the tree currently owns.
    pub fn node_count(&self) -> usize {
        self.raw.node_count()
    }

    /// Returns a view of the root node.
    pub fn root(&self) -> NodeRef<'_, K, V> {
        NodeRef::new(&self.raw, self.raw.root())
    }

    /// Returns a lazy in-order walk yielding `(depth, key)` pairs, depth 0
    /// being the root. Each call starts a fresh walk.
    pub fn traverse(&self) -> Traverse<'_, K, V> {
        Traverse::new(&self.raw)
    }

    /// Returns a lazy pre-order walk over the nodes, yielding
    /// `(depth, node)` pairs.
    pub fn nodes(&self) -> Nodes<'_, K, V> {
        Nodes::new(&self.raw)
    }

    /// Returns a [`Display`](fmt::Display) adapter that prints one node per
    /// line, indented one tab per level, followed by its key count.
    pub fn dump(&self) -> Dump<'_, K, V> {
        Dump::new(self)
    }

    /// Removes every key in `O(n)`, visiting each node once.
    ///
    /// Returns the payloads when they are caller-owned; with
    /// [`Ownership::Tree`] they are dropped and the vector is empty.
    pub fn clear(&mut self) -> Vec<V> {
        self.raw.clear()
    }

    /// Tears the tree down in `O(n)`, releasing every node.
    ///
    /// Returns the payloads when they are caller-owned; with
    /// [`Ownership::Tree`] they are dropped and the vector is empty.
    pub fn destroy(self) -> Vec<V> {
        self.raw.destroy()
    }
}

impl<K: Ord, V> BTree<K, V> {
    /// Looks up `key`, descending from the root.
    pub fn search<Q>(&self, key: &Q) -> SearchResult<'_, K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        match self.raw.search(key) {
            Some((handle, index)) => SearchResult::Found {
                node: NodeRef::new(&self.raw, handle),
                index,
            },
            None => SearchResult::NotFound,
        }
    }

    /// Returns the payload stored under `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.search(key).item().map(Item::payload)
    }

    /// Returns the payload stored under `key` mutably.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.get_mut(key)
    }

    /// Returns true if `key` is in the tree.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.search(key).is_some()
    }

    /// Returns the item with the smallest key.
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.raw.edge_item(true).map(|item| (item.key(), item.payload()))
    }

    /// Returns the item with the largest key.
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        self.raw.edge_item(false).map(|item| (item.key(), item.payload()))
    }

    /// Inserts `payload` under `key`.
    ///
    /// Full nodes met on the way down are split before they are entered; a
    /// full root grows the tree by one level.
    ///
    /// # Errors
    ///
    /// [`Error::AllocationFailure`](crate::Error::AllocationFailure) if the
    /// nodes the insert needs cannot be allocated. Nothing in the tree
    /// changes in that case.
    pub fn insert(&mut self, key: K, payload: V) -> Result<Insertion<K, V>> {
        Ok(match self.raw.insert(key, payload)? {
            None => Insertion::Inserted,
            Some(rejected) => Insertion::Duplicate(rejected),
        })
    }

    /// Removes `key`.
    ///
    /// Children about to be entered are topped up to `t` keys by borrowing
    /// from a sibling or merging with one; a root emptied by a merge shrinks
    /// the tree by one level.
    pub fn delete<Q>(&mut self, key: &Q) -> Deletion<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        match self.raw.delete(key) {
            Some(item) => Deletion::Removed(self.raw.release(item.into_payload())),
            None => Deletion::NotFound,
        }
    }

    /// Removes the item with the smallest key, returning the key and, when
    /// payloads are caller-owned, the payload.
    pub fn pop_first(&mut self) -> Option<(K, Option<V>)> {
        let (key, payload) = self.raw.pop_edge(true)?.into_parts();
        Some((key, self.raw.release(payload)))
    }

    /// Removes the item with the largest key, returning the key and, when
    /// payloads are caller-owned, the payload.
    pub fn pop_last(&mut self) -> Option<(K, Option<V>)> {
        let (key, payload) = self.raw.pop_edge(false)?.into_parts();
        Some((key, self.raw.release(payload)))
    }
}

impl<K, V> fmt::Debug for BTree<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BTree")
            .field("min_degree", &self.min_degree())
            .field("ownership", &self.ownership())
            .field("len", &self.len())
            .field("height", &self.height())
            .finish_non_exhaustive()
    }
}
