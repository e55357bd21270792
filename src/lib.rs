//! An in-memory B-tree index with a minimum degree chosen at runtime.
//!
//! [`BTree`] stores unique, ordered keys, each with an opaque payload, and
//! keeps itself balanced the classic way: inserts split full nodes on the
//! way down, deletes borrow from or merge with siblings on the way down, so
//! every operation is a single root-to-leaf pass.
//!
//! # Example
//!
//! ```
//! use btree_index::{BTree, Config, Deletion, Ownership};
//!
//! let mut index = BTree::with_config(Config::new(3).with_ownership(Ownership::Caller))?;
//! for key in 1..=100 {
//!     assert!(index.insert(key, format!("row {key}"))?.is_inserted());
//! }
//!
//! assert_eq!(index.get(&42).map(String::as_str), Some("row 42"));
//! assert!(index.insert(42, "again".to_owned())?.is_duplicate());
//!
//! // Caller-owned payloads are handed back when their keys leave the tree.
//! assert_eq!(index.delete(&42), Deletion::Removed(Some("row 42".to_owned())));
//! assert!(!index.contains_key(&42));
//!
//! // Traversal is plain data: (depth, key) pairs in key order.
//! assert!(index.traverse().map(|(_, key)| key).is_sorted());
//!
//! // Teardown visits every node once.
//! assert_eq!(index.destroy().len(), 99);
//! # Ok::<(), btree_index::Error>(())
//! ```
//!
//! # Payload ownership
//!
//! With [`Ownership::Caller`] (the default) the tree never drops a payload
//! on its own initiative: [`BTree::delete`], [`BTree::clear`] and
//! [`BTree::destroy`] return them. With [`Ownership::Tree`] the tree drops
//! payloads as their items are deleted or torn down.
//!
//! # Concurrency
//!
//! The tree does no locking. Share it behind a `Mutex`, or an `RwLock` when
//! searches should run alongside serialized writers.
//!
//! # Logging
//!
//! Structural events (root growth and shrinkage, splits, merges, borrows,
//! aborted allocations) are emitted through [`tracing`]; install a
//! subscriber to see them.

#![forbid(keyword_idents)]
#![forbid(non_ascii_idents)]
#![forbid(unsafe_code)]
#![warn(unreachable_pub)]
#![warn(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

mod btree;
mod item;
mod raw;

pub mod config;
pub mod error;

pub use btree::{BTree, Deletion, Dump, Insertion, NodeRef, Nodes, SearchResult, Traverse};
pub use config::{Config, Ownership};
pub use error::{Error, Result};
pub use item::Item;
