//! Insert / overwrite ("set") and root growth (§4.4).
//!
//! The input item is taken by value, so there is no counterpart to the
//! original library's scratch-slot-3 clone of the caller's buffer: Rust
//! ownership already gives the engine its own copy the moment the caller
//! passes `item: T` in. [`crate::comparator::ItemClone`] is only exercised
//! by copy-on-write fan-out, not by `set` itself.

use crate::alloc::Allocator;
use crate::comparator::{Comparator, ItemClone};
use crate::error::{BTreeError, Result};
use crate::hint::Hint;
use crate::node::{cow_fan, split_node, Kind, Node};
use crate::search::locate;

/// Outcome of a single recursive insert step.
enum Step<T> {
    Inserted,
    Replaced(T),
    /// The child this step landed in was full; `T` is the item still
    /// waiting to be placed, handed back so the caller can split the child
    /// and retry.
    MustSplit(T),
}

/// Where a split divides a full node. Bulk-load biases every split along
/// its rightmost-spine fast path toward [`SplitBias::LeanLeft`] (§4.5); every
/// other call site uses [`SplitBias::Even`].
#[derive(Clone, Copy)]
pub(crate) enum SplitBias {
    Even,
    LeanLeft,
}

impl SplitBias {
    fn left_count(self, max_items: usize, min_items: usize) -> usize {
        match self {
            SplitBias::Even => max_items / 2,
            SplitBias::LeanLeft => max_items - 1 - min_items,
        }
    }
}

/// Insert or overwrite `item` in the subtree rooted at `node`. `node` must
/// already be uniquely owned (the caller COW-fanned it before descending).
#[allow(clippy::too_many_arguments)]
fn insert_rec<T, C, H, A>(
    node: Node<T>,
    max_items: usize,
    min_items: usize,
    cmp: &C,
    hooks: &H,
    alloc: &A,
    item: T,
    bias: SplitBias,
    mut hint: Option<&mut Hint>,
    depth: usize,
) -> Result<Step<T>>
where
    C: Comparator<T>,
    H: ItemClone<T>,
    A: Allocator,
{
    let items = unsafe { node.items(max_items) };
    let found = locate(items, &item, cmp, hint.as_deref_mut(), depth);

    if found.exact {
        let old = unsafe { node.read_item(max_items, found.index) };
        unsafe { node.write_item(max_items, found.index, item) };
        return Ok(Step::Replaced(old));
    }

    if node.is_leaf() {
        if node.nitems() == max_items {
            return Ok(Step::MustSplit(item));
        }
        unsafe {
            node.shift_items_right(max_items, found.index, 1);
            node.write_item(max_items, found.index, item);
        }
        node.set_nitems(node.nitems() + 1);
        return Ok(Step::Inserted);
    }

    let child_idx = found.index;
    let child = unsafe { node.child(max_items, child_idx) };
    let child = cow_fan(child, max_items, alloc, hooks)?;
    unsafe { node.set_child(max_items, child_idx, Some(child)) };

    match insert_rec(child, max_items, min_items, cmp, hooks, alloc, item, bias, hint.as_deref_mut(), depth + 1)? {
        Step::Inserted => Ok(Step::Inserted),
        Step::Replaced(old) => Ok(Step::Replaced(old)),
        Step::MustSplit(item) => {
            if node.nitems() == max_items {
                return Ok(Step::MustSplit(item));
            }
            let left_count = bias.left_count(max_items, min_items);
            let (median, right) =
                split_node(child, max_items, left_count, alloc).ok_or(BTreeError::OutOfMemory)?;
            unsafe {
                node.shift_items_right(max_items, child_idx, 1);
                node.write_item(max_items, child_idx, median);
                node.shift_children_right(max_items, child_idx + 1, 1);
                node.set_child(max_items, child_idx + 1, Some(right));
            }
            node.set_nitems(node.nitems() + 1);
            // The item now routes into the correct (just-split) child.
            insert_rec(node, max_items, min_items, cmp, hooks, alloc, item, bias, hint, depth)
        }
    }
}

/// Insert or overwrite `item` in the whole tree. Returns the replaced item,
/// if any. `*root`/`*height`/`*count` are updated in place.
#[allow(clippy::too_many_arguments)]
pub(crate) fn set<T, C, H, A>(
    root: &mut Option<Node<T>>,
    height: &mut usize,
    count: &mut usize,
    max_items: usize,
    min_items: usize,
    cmp: &C,
    hooks: &H,
    alloc: &A,
    item: T,
    bias: SplitBias,
    mut hint: Option<&mut Hint>,
) -> Result<Option<T>>
where
    C: Comparator<T>,
    H: ItemClone<T>,
    A: Allocator,
{
    let Some(r) = *root else {
        let leaf = Node::alloc(Kind::Leaf, max_items, alloc).ok_or(BTreeError::OutOfMemory)?;
        unsafe { leaf.write_item(max_items, 0, item) };
        leaf.set_nitems(1);
        *root = Some(leaf);
        *height = 1;
        *count += 1;
        return Ok(None);
    };

    let r = cow_fan(r, max_items, alloc, hooks)?;
    *root = Some(r);

    match insert_rec(r, max_items, min_items, cmp, hooks, alloc, item, bias, hint.as_deref_mut(), 0)? {
        Step::Replaced(old) => Ok(Some(old)),
        Step::Inserted => {
            *count += 1;
            Ok(None)
        }
        Step::MustSplit(item) => {
            // Allocate the new root before splitting `r`: if this fails,
            // `r` is still the untouched, full pre-call root and nothing
            // needs unwinding. Allocating the other way around would leave
            // `r` truncated and `right`/`median` orphaned on this failure,
            // silently dropping the tree's upper half (§7).
            let new_root =
                Node::alloc(Kind::Branch, max_items, alloc).ok_or(BTreeError::OutOfMemory)?;
            let left_count = bias.left_count(max_items, min_items);
            let (median, right) = match split_node(r, max_items, left_count, alloc) {
                Some(parts) => parts,
                None => {
                    new_root.free_shell(max_items, alloc);
                    return Err(BTreeError::OutOfMemory);
                }
            };
            unsafe {
                new_root.write_item(max_items, 0, median);
                new_root.set_child(max_items, 0, Some(r));
                new_root.set_child(max_items, 1, Some(right));
            }
            new_root.set_nitems(1);
            *root = Some(new_root);
            *height += 1;

            match insert_rec(new_root, max_items, min_items, cmp, hooks, alloc, item, bias, hint, 0)? {
                Step::Inserted => {
                    *count += 1;
                    Ok(None)
                }
                Step::Replaced(old) => Ok(Some(old)),
                Step::MustSplit(_) => {
                    unreachable!("a freshly grown root has room for one more item")
                }
            }
        }
    }
}
