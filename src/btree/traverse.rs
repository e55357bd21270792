use core::fmt;
use core::iter::FusedIterator;

use smallvec::SmallVec;

use super::{BTree, NodeRef};
use crate::raw::{Handle, RawBTree};

/// Position inside one node of an in-order walk.
#[derive(Clone, Copy)]
struct Frame {
    node: Handle,
    /// Next item of `node` to yield.
    index: usize,
    depth: usize,
}

// Deep enough for any tree that fits in memory at t = 2.
type Stack<T> = SmallVec<[T; 16]>;

/// Lazy in-order walk over a [`BTree`], yielding `(depth, key)`.
///
/// Created by [`BTree::traverse`]. Keys come out in strictly increasing
/// order; a clone continues from the same position independently.
pub struct Traverse<'a, K, V> {
    tree: &'a RawBTree<K, V>,
    stack: Stack<Frame>,
    remaining: usize,
}

impl<'a, K, V> Traverse<'a, K, V> {
    pub(crate) fn new(tree: &'a RawBTree<K, V>) -> Self {
        let mut walk = Self {
            tree,
            stack: Stack::new(),
            remaining: tree.len(),
        };
        walk.descend_left(tree.root(), 0);
        walk
    }

    /// Pushes `node` and the leftmost path below it.
    fn descend_left(&mut self, mut node: Handle, mut depth: usize) {
        loop {
            self.stack.push(Frame { node, index: 0, depth });
            let current = self.tree.node(node);
            if current.is_leaf() {
                return;
            }
            node = current.child(0);
            depth += 1;
        }
    }
}

impl<K, V> Clone for Traverse<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            tree: self.tree,
            stack: self.stack.clone(),
            remaining: self.remaining,
        }
    }
}

impl<'a, K, V> Iterator for Traverse<'a, K, V> {
    type Item = (usize, &'a K);

    fn next(&mut self) -> Option<Self::Item> {
        let tree = self.tree;
        loop {
            let frame = self.stack.last_mut()?;
            let node = tree.node(frame.node);
            if frame.index == node.key_count() {
                self.stack.pop();
                continue;
            }

            let index = frame.index;
            let depth = frame.depth;
            frame.index += 1;
            if !node.is_leaf() {
                self.descend_left(node.child(index + 1), depth + 1);
            }
            self.remaining -= 1;
            return Some((depth, node.item(index).key()));
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Traverse<'_, K, V> {}

impl<K, V> FusedIterator for Traverse<'_, K, V> {}

/// Lazy pre-order walk over the nodes of a [`BTree`], yielding
/// `(depth, node)`.
///
/// Created by [`BTree::nodes`].
pub struct Nodes<'a, K, V> {
    tree: &'a RawBTree<K, V>,
    stack: Stack<(Handle, usize)>,
}

impl<'a, K, V> Nodes<'a, K, V> {
    pub(crate) fn new(tree: &'a RawBTree<K, V>) -> Self {
        let mut stack = Stack::new();
        stack.push((tree.root(), 0));
        Self { tree, stack }
    }
}

impl<K, V> Clone for Nodes<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            tree: self.tree,
            stack: self.stack.clone(),
        }
    }
}

impl<'a, K, V> Iterator for Nodes<'a, K, V> {
    type Item = (usize, NodeRef<'a, K, V>);

    fn next(&mut self) -> Option<Self::Item> {
        let tree = self.tree;
        let (handle, depth) = self.stack.pop()?;
        self.stack
            .extend(tree.node(handle).children().iter().rev().map(|&child| (child, depth + 1)));
        Some((depth, NodeRef::new(tree, handle)))
    }
}

impl<K, V> FusedIterator for Nodes<'_, K, V> {}

/// Text rendering of a [`BTree`], one node per line in pre-order.
///
/// Each line is indented with one tab per level and lists the node's keys
/// followed by the key count:
///
/// ```
/// use btree_index::BTree;
///
/// let mut index = BTree::new(2)?;
/// for key in 1..=4 {
///     let _ = index.insert(key, ())?;
/// }
/// assert_eq!(index.dump().to_string(), "2 (1)\n\t1 (1)\n\t3 4 (2)\n");
/// # Ok::<(), btree_index::Error>(())
/// ```
pub struct Dump<'a, K, V> {
    tree: &'a BTree<K, V>,
}

impl<'a, K, V> Dump<'a, K, V> {
    pub(crate) const fn new(tree: &'a BTree<K, V>) -> Self {
        Self { tree }
    }
}

impl<K: fmt::Display, V> fmt::Display for Dump<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (depth, node) in self.tree.nodes() {
            for _ in 0..depth {
                f.write_str("\t")?;
            }
            for key in node.keys() {
                write!(f, "{key} ")?;
            }
            writeln!(f, "({})", node.len())?;
        }
        Ok(())
    }
}
