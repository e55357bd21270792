mod arena;
mod node;
mod raw_btree;

pub(crate) use arena::Handle;
pub(crate) use raw_btree::RawBTree;
