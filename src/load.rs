//! Bulk-load fast path for ascending insertion (§4.5).
//!
//! Falls back to [`crate::insert::set`] whenever the fast path's two
//! preconditions (room in the rightmost leaf, and the new item sorting
//! strictly after that leaf's last item) don't hold — including the very
//! first item, where the tree is empty. The fallback uses a lean-left split
//! bias so that, should this item's insertion actually need to split
//! something, the next few sequential arrivals still land in the
//! now-small-but-not-empty right sibling without immediately splitting
//! again.

use crate::alloc::Allocator;
use crate::comparator::{Comparator, ItemClone};
use crate::error::Result;
use crate::insert::{self, SplitBias};
use crate::node::{cow_fan, Node};
use std::cmp::Ordering;

#[allow(clippy::too_many_arguments)]
pub(crate) fn load<T, C, H, A>(
    root: &mut Option<Node<T>>,
    height: &mut usize,
    count: &mut usize,
    max_items: usize,
    min_items: usize,
    cmp: &C,
    hooks: &H,
    alloc: &A,
    item: T,
) -> Result<Option<T>>
where
    C: Comparator<T>,
    H: ItemClone<T>,
    A: Allocator,
{
    let Some(r) = *root else {
        return insert::set(
            root, height, count, max_items, min_items, cmp, hooks, alloc, item, SplitBias::Even, None,
        );
    };

    let mut node = cow_fan(r, max_items, alloc, hooks)?;
    *root = Some(node);
    while !node.is_leaf() {
        let idx = node.nitems();
        let child = unsafe { node.child(max_items, idx) };
        let child = cow_fan(child, max_items, alloc, hooks)?;
        unsafe { node.set_child(max_items, idx, Some(child)) };
        node = child;
    }

    let n = node.nitems();
    let fits = n < max_items && {
        let last = unsafe { &*node.item_ptr(max_items, n - 1) };
        cmp.compare(&item, last) == Ordering::Greater
    };

    if fits {
        unsafe { node.write_item(max_items, n, item) };
        node.set_nitems(n + 1);
        *count += 1;
        return Ok(None);
    }

    insert::set(
        root,
        height,
        count,
        max_items,
        min_items,
        cmp,
        hooks,
        alloc,
        item,
        SplitBias::LeanLeft,
        None,
    )
}
