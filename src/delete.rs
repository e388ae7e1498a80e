//! Delete by key, pop-min, pop-max, and rebalance (§4.6).
//!
//! One engine, parameterized by [`Action`], backs all three public
//! operations plus the internal in-order-predecessor substitution used when
//! a branch's own key is the one being deleted — mirroring the original
//! library's shared DELKEY/POPFRONT/POPBACK/POPMAX routine rather than
//! writing three near-duplicate walks.

use crate::alloc::Allocator;
use crate::comparator::{Comparator, ItemClone};
use crate::error::Result;
use crate::hint::Hint;
use crate::node::{cow_fan, Kind, Node};
use crate::search::locate;

pub(crate) enum Action<'a, T> {
    /// DELKEY: remove the item comparing equal to the given key.
    Key(&'a T),
    /// POPFRONT: remove the leftmost item in the (sub)tree.
    Front,
    /// POPBACK / POPMAX: remove the rightmost item in the (sub)tree.
    Back,
}

/// Recursively apply `action` to the subtree rooted at `node`, which must
/// already be uniquely owned. Returns the removed item, or `None` if
/// `Action::Key` found no match (the only action that can miss).
#[allow(clippy::too_many_arguments)]
fn delete_rec<T, C, H, A>(
    node: Node<T>,
    max_items: usize,
    min_items: usize,
    cmp: &C,
    hooks: &H,
    alloc: &A,
    action: Action<T>,
    mut hint: Option<&mut Hint>,
    depth: usize,
) -> Result<Option<T>>
where
    C: Comparator<T>,
    H: ItemClone<T>,
    A: Allocator,
{
    if node.is_leaf() {
        let idx = match &action {
            Action::Key(key) => {
                let items = unsafe { node.items(max_items) };
                let found = locate(items, key, cmp, hint.as_deref_mut(), depth);
                if !found.exact {
                    return Ok(None);
                }
                found.index
            }
            Action::Front => 0,
            Action::Back => node.nitems() - 1,
        };
        let removed = unsafe { node.read_item(max_items, idx) };
        unsafe { node.shift_items_left(max_items, idx) };
        node.set_nitems(node.nitems() - 1);
        return Ok(Some(removed));
    }

    // Branch: DELKEY may terminate right here via in-order-predecessor
    // substitution; every other case descends into exactly one child.
    if let Action::Key(key) = &action {
        let items = unsafe { node.items(max_items) };
        let found = locate(items, key, cmp, hint.as_deref_mut(), depth);
        if found.exact {
            let i = found.index;
            let removed = unsafe { node.read_item(max_items, i) };
            let child = unsafe { node.child(max_items, i) };
            let child = cow_fan(child, max_items, alloc, hooks)?;
            unsafe { node.set_child(max_items, i, Some(child)) };
            let predecessor =
                delete_rec(child, max_items, min_items, cmp, hooks, alloc, Action::Back, None, depth + 1)?
                    .expect("a key's left child is non-empty when the key itself was found");
            unsafe { node.write_item(max_items, i, predecessor) };
            let child = unsafe { node.child(max_items, i) };
            if child.nitems() < min_items {
                rebalance(node, max_items, min_items, i, alloc, hooks)?;
            }
            return Ok(Some(removed));
        }
        return descend(node, max_items, min_items, cmp, hooks, alloc, found.index, action, hint, depth);
    }

    let child_idx = match action {
        Action::Front => 0,
        Action::Back => node.nitems(),
        Action::Key(_) => unreachable!("handled above"),
    };
    descend(node, max_items, min_items, cmp, hooks, alloc, child_idx, action, hint, depth)
}

#[allow(clippy::too_many_arguments)]
fn descend<T, C, H, A>(
    node: Node<T>,
    max_items: usize,
    min_items: usize,
    cmp: &C,
    hooks: &H,
    alloc: &A,
    child_idx: usize,
    action: Action<T>,
    hint: Option<&mut Hint>,
    depth: usize,
) -> Result<Option<T>>
where
    C: Comparator<T>,
    H: ItemClone<T>,
    A: Allocator,
{
    let child = unsafe { node.child(max_items, child_idx) };
    let child = cow_fan(child, max_items, alloc, hooks)?;
    unsafe { node.set_child(max_items, child_idx, Some(child)) };
    let removed = delete_rec(child, max_items, min_items, cmp, hooks, alloc, action, hint, depth + 1)?;
    if removed.is_some() && child.nitems() < min_items {
        rebalance(node, max_items, min_items, child_idx, alloc, hooks)?;
    }
    Ok(removed)
}

/// Restore `min_items` at child `i` (or `i - 1` if `i == nitems`) by
/// merging it with its sibling or rotating an item through the separator.
fn rebalance<T, H, A>(
    node: Node<T>,
    max_items: usize,
    min_items: usize,
    mut i: usize,
    alloc: &A,
    hooks: &H,
) -> Result<()>
where
    H: ItemClone<T>,
    A: Allocator,
{
    if i == node.nitems() {
        i -= 1;
    }
    let left = unsafe { node.child(max_items, i) };
    let right = unsafe { node.child(max_items, i + 1) };
    let left = cow_fan(left, max_items, alloc, hooks)?;
    let right = cow_fan(right, max_items, alloc, hooks)?;
    unsafe {
        node.set_child(max_items, i, Some(left));
        node.set_child(max_items, i + 1, Some(right));
    }

    if left.nitems() + right.nitems() < max_items {
        merge(node, max_items, i, left, right, alloc);
    } else if left.nitems() > right.nitems() {
        rotate_right(node, max_items, i, left, right);
    } else {
        rotate_left(node, max_items, i, left, right);
    }
    Ok(())
}

fn merge<T, A: Allocator>(node: Node<T>, max_items: usize, i: usize, left: Node<T>, right: Node<T>, alloc: &A) {
    let branch = left.kind() == Kind::Branch;
    unsafe {
        let sep = node.read_item(max_items, i);
        let ln = left.nitems();
        left.write_item(max_items, ln, sep);
        let rn = right.nitems();
        std::ptr::copy_nonoverlapping(right.item_ptr(max_items, 0), left.item_ptr(max_items, ln + 1), rn);
        if branch {
            std::ptr::copy_nonoverlapping(
                right.child_slot_ptr(max_items, 0),
                left.child_slot_ptr(max_items, ln + 1),
                rn + 1,
            );
        }
        left.set_nitems(ln + 1 + rn);

        node.shift_items_left(max_items, i);
        node.shift_children_left(max_items, i + 1);
    }
    node.set_nitems(node.nitems() - 1);
    right.free_shell(max_items, alloc);
}

fn rotate_right<T>(node: Node<T>, max_items: usize, i: usize, left: Node<T>, right: Node<T>) {
    let branch = left.kind() == Kind::Branch;
    unsafe {
        right.shift_items_right(max_items, 0, 1);
        if branch {
            right.shift_children_right(max_items, 0, 1);
        }
        let sep = node.read_item(max_items, i);
        right.write_item(max_items, 0, sep);
        right.set_nitems(right.nitems() + 1);

        if branch {
            let moved_child = left.child(max_items, left.nitems());
            right.set_child(max_items, 0, Some(moved_child));
        }
        let last = left.nitems() - 1;
        let promoted = left.read_item(max_items, last);
        node.write_item(max_items, i, promoted);
        left.set_nitems(last);
    }
}

fn rotate_left<T>(node: Node<T>, max_items: usize, i: usize, left: Node<T>, right: Node<T>) {
    let branch = left.kind() == Kind::Branch;
    unsafe {
        let sep = node.read_item(max_items, i);
        let ln = left.nitems();
        left.write_item(max_items, ln, sep);
        if branch {
            let moved_child = right.child(max_items, 0);
            left.set_child(max_items, ln + 1, Some(moved_child));
        }
        left.set_nitems(ln + 1);

        let promoted = right.read_item(max_items, 0);
        node.write_item(max_items, i, promoted);
        right.shift_items_left(max_items, 0);
        if branch {
            right.shift_children_left(max_items, 0);
        }
        right.set_nitems(right.nitems() - 1);
    }
}

/// Top-level entry point shared by `delete`, `pop_min`, and `pop_max`.
/// Handles root COW-fan, the empty-tree case, and root collapse.
#[allow(clippy::too_many_arguments)]
pub(crate) fn run<T, C, H, A>(
    root: &mut Option<Node<T>>,
    height: &mut usize,
    count: &mut usize,
    max_items: usize,
    min_items: usize,
    cmp: &C,
    hooks: &H,
    alloc: &A,
    action: Action<T>,
    hint: Option<&mut Hint>,
) -> Result<Option<T>>
where
    C: Comparator<T>,
    H: ItemClone<T>,
    A: Allocator,
{
    let Some(r) = *root else {
        return Ok(None);
    };
    let r = cow_fan(r, max_items, alloc, hooks)?;
    *root = Some(r);

    let removed = delete_rec(r, max_items, min_items, cmp, hooks, alloc, action, hint, 0)?;
    if removed.is_some() {
        *count -= 1;
        if r.nitems() == 0 {
            if r.is_leaf() {
                r.free_shell(max_items, alloc);
                *root = None;
            } else {
                let only_child = unsafe { r.child(max_items, 0) };
                r.free_shell(max_items, alloc);
                *root = Some(only_child);
            }
            *height -= 1;
        }
    }
    Ok(removed)
}
