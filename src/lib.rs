//! `cowtree`: a copy-on-write, reference-counted B-tree over fixed-layout
//! items (§1-§2).
//!
//! Every node is a single heap allocation holding a small atomic reference
//! count, an item slab, and — for branches — a child-link table (§4.1).
//! Mutating operations never touch a shared node in place: they duplicate
//! it first ([`comparator::ItemClone`] governs how), so a [`tree::BTree`]
//! handle produced by [`tree::BTree::clone`] is a fully independent tree
//! that happens to still share whatever subtrees neither side has written
//! through yet.
//!
//! The item type, ordering, item-duplication strategy, and allocator are
//! all generic parameters rather than runtime callbacks — `BTree<T, C, H,
//! A>` — so a tree over `T: Ord` items allocated from the global allocator
//! ([`tree::BTree::new`]) and a tree with a custom comparator, a fallible
//! clone hook, and an arena allocator are the same type constructor
//! monomorphized differently, not two different APIs.

mod alloc;
mod comparator;
mod delete;
mod error;
mod hint;
mod insert;
mod iter;
mod load;
mod mutate;
mod node;
mod search;
mod traverse;
mod tree;

pub use alloc::{Allocator, GlobalAllocator};
pub use comparator::{Comparator, DeriveClone, ItemClone, NaturalOrder};
pub use error::BTreeError;
pub use hint::Hint;
pub use iter::BTreeIter;
pub use mutate::Action;
pub use tree::BTree;
