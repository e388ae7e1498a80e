//! Mutating traversal: the per-item callback can stop, continue, rewrite, or
//! remove the item it's given (§4.9).
//!
//! A `Delete` on a leaf that can shrink in place (`nitems > min_items`) is a
//! plain shift-left and the walk carries on. Every other delete — a branch
//! item (which needs in-order-predecessor substitution) or a leaf already at
//! `min_items` (which may need to merge or rotate with a sibling) — hands
//! off to the real [`crate::delete`] engine and restarts the whole walk
//! using the just-deleted item's value as a pivot, because rebalancing can
//! restructure nodes out from under an in-progress recursive walk. This is
//! the "scratch slot 1" of the original design, rendered as a plain owned
//! local rather than a handle-level buffer.

use crate::alloc::Allocator;
use crate::comparator::{Comparator, ItemClone};
use crate::delete;
use crate::error::{BTreeError, Result};
use crate::node::{cow_fan, Node};
use crate::search::locate;
use std::cmp::Ordering;

/// How many consecutive times an `Update` callback may hand back an item
/// that sorts differently than the one it replaced, at the same slot,
/// before the walk gives up and reports [`BTreeError::UpdateDrift`]. The
/// original library retries such a slot forever (see the open question this
/// resolves in the design notes); this bounds that to a finite, diagnosable
/// failure instead.
pub(crate) const MAX_UPDATE_DRIFT_RETRIES: u32 = 3;

/// What an action-traversal callback wants done with the item it was just
/// given.
pub enum Action<T> {
    /// Halt the traversal immediately.
    Stop,
    /// Leave this item untouched and continue.
    Keep,
    /// Replace this item, provided the replacement compares equal to the
    /// original under the tree's comparator (otherwise the walk keeps
    /// calling back with the unmodified item, up to
    /// [`MAX_UPDATE_DRIFT_RETRIES`] times).
    Update(T),
    /// Remove this item and continue.
    Delete,
}

enum ItemOutcome {
    Advance,
    Stopped,
    /// The callback asked to delete the item at this index; it is still
    /// physically present (untouched) in the node. The caller decides
    /// whether to remove it itself (leaf with room to spare) or hand it to
    /// the real delete engine (everything else).
    Delete,
}

enum WalkOutcome<T> {
    Completed,
    Stopped,
    Restart(T),
}

fn apply_action<T, C>(
    node: Node<T>,
    max_items: usize,
    cmp: &C,
    index: usize,
    callback: &mut impl FnMut(&T) -> Action<T>,
) -> Result<ItemOutcome>
where
    C: Comparator<T>,
{
    let mut retries = 0u32;
    loop {
        let action = callback(unsafe { &*node.item_ptr(max_items, index) });
        match action {
            Action::Stop => return Ok(ItemOutcome::Stopped),
            Action::Keep => return Ok(ItemOutcome::Advance),
            Action::Update(new_item) => {
                let old = unsafe { &*node.item_ptr(max_items, index) };
                if cmp.compare(&new_item, old) == Ordering::Equal {
                    unsafe { node.write_item(max_items, index, new_item) };
                    return Ok(ItemOutcome::Advance);
                }
                retries += 1;
                if retries > MAX_UPDATE_DRIFT_RETRIES {
                    return Err(BTreeError::UpdateDrift);
                }
            }
            Action::Delete => return Ok(ItemOutcome::Delete),
        }
    }
}

/// Walk every item `>= pivot` (the whole subtree if `pivot` is `None`),
/// applying `callback` to each. Mirrors [`crate::traverse::ascend_from`]'s
/// skip-to-pivot shape, fused with the mutation handling above: at most one
/// "mixed" child per node is recursed into pivot-aware, every other child is
/// walked unconditionally from its own start.
#[allow(clippy::too_many_arguments)]
fn walk<T, C, H, A>(
    node: Node<T>,
    max_items: usize,
    min_items: usize,
    count: &mut usize,
    cmp: &C,
    hooks: &H,
    alloc: &A,
    pivot: Option<&T>,
    depth: usize,
    callback: &mut impl FnMut(&T) -> Action<T>,
) -> Result<WalkOutcome<T>>
where
    C: Comparator<T>,
    H: ItemClone<T>,
    A: Allocator,
{
    let items = unsafe { node.items(max_items) };
    let found = pivot.map(|p| locate(items, p, cmp, None, depth));

    if node.is_leaf() {
        let mut i = found.map_or(0, |f| f.index);
        while i < node.nitems() {
            match apply_action(node, max_items, cmp, i, callback)? {
                ItemOutcome::Advance => i += 1,
                ItemOutcome::Stopped => return Ok(WalkOutcome::Stopped),
                ItemOutcome::Delete => {
                    if node.nitems() > min_items {
                        let removed = unsafe { node.read_item(max_items, i) };
                        unsafe { node.shift_items_left(max_items, i) };
                        node.set_nitems(node.nitems() - 1);
                        *count -= 1;
                        drop(removed);
                        // The item that slid into slot `i` hasn't been
                        // visited yet; don't advance.
                    } else {
                        // The node can't shrink without rebalancing;
                        // clone a pivot and hand the actual removal to the
                        // real delete engine — the original stays put until
                        // that engine reads it out, so it is dropped
                        // exactly once.
                        let original = unsafe { &*node.item_ptr(max_items, i) };
                        let pivot = hooks.clone_item(original)?;
                        return Ok(WalkOutcome::Restart(pivot));
                    }
                }
            }
        }
        return Ok(WalkOutcome::Completed);
    }

    let mut k = found.map_or(0, |f| f.index);
    if let (Some(p), Some(f)) = (pivot, found) {
        if !f.exact {
            let child = unsafe { node.child(max_items, k) };
            let child = cow_fan(child, max_items, alloc, hooks)?;
            unsafe { node.set_child(max_items, k, Some(child)) };
            match walk(child, max_items, min_items, count, cmp, hooks, alloc, Some(p), depth + 1, callback)? {
                WalkOutcome::Completed => {}
                other => return Ok(other),
            }
        }
    }

    let n = node.nitems();
    while k < n {
        match apply_action(node, max_items, cmp, k, callback)? {
            ItemOutcome::Advance => {}
            ItemOutcome::Stopped => return Ok(WalkOutcome::Stopped),
            // A branch-held item always needs in-order-predecessor
            // substitution to remove, so it always restarts; clone it for
            // the pivot and leave the original for the real delete engine
            // to read out (and drop) exactly once.
            ItemOutcome::Delete => {
                let original = unsafe { &*node.item_ptr(max_items, k) };
                let pivot = hooks.clone_item(original)?;
                return Ok(WalkOutcome::Restart(pivot));
            }
        }

        let child = unsafe { node.child(max_items, k + 1) };
        let child = cow_fan(child, max_items, alloc, hooks)?;
        unsafe { node.set_child(max_items, k + 1, Some(child)) };
        match walk(child, max_items, min_items, count, cmp, hooks, alloc, None, depth + 1, callback)? {
            WalkOutcome::Completed => {}
            other => return Ok(other),
        }
        k += 1;
    }

    Ok(WalkOutcome::Completed)
}

/// Mirror of [`walk`] for the reverse direction: every item `<= pivot` (or
/// the whole subtree), visited back to front.
#[allow(clippy::too_many_arguments)]
fn walk_rev<T, C, H, A>(
    node: Node<T>,
    max_items: usize,
    min_items: usize,
    count: &mut usize,
    cmp: &C,
    hooks: &H,
    alloc: &A,
    pivot: Option<&T>,
    depth: usize,
    callback: &mut impl FnMut(&T) -> Action<T>,
) -> Result<WalkOutcome<T>>
where
    C: Comparator<T>,
    H: ItemClone<T>,
    A: Allocator,
{
    let items = unsafe { node.items(max_items) };
    let found = pivot.map(|p| locate(items, p, cmp, None, depth));

    if node.is_leaf() {
        let top = match found {
            Some(f) if f.exact => Some(f.index),
            Some(f) => f.index.checked_sub(1),
            None => node.nitems().checked_sub(1),
        };
        let Some(mut i) = top else { return Ok(WalkOutcome::Completed) };
        loop {
            match apply_action(node, max_items, cmp, i, callback)? {
                ItemOutcome::Advance => {
                    if i == 0 {
                        return Ok(WalkOutcome::Completed);
                    }
                    i -= 1;
                }
                ItemOutcome::Stopped => return Ok(WalkOutcome::Stopped),
                ItemOutcome::Delete => {
                    if node.nitems() > min_items {
                        let removed = unsafe { node.read_item(max_items, i) };
                        unsafe { node.shift_items_left(max_items, i) };
                        node.set_nitems(node.nitems() - 1);
                        *count -= 1;
                        drop(removed);
                        // Indices below `i` are untouched by the shift (it
                        // only moves already-visited items at `i+1..` down
                        // into `i..`), so the next item due — at `i - 1` —
                        // is exactly where it was before the delete.
                        if i == 0 {
                            return Ok(WalkOutcome::Completed);
                        }
                        i -= 1;
                    } else {
                        let original = unsafe { &*node.item_ptr(max_items, i) };
                        let pivot = hooks.clone_item(original)?;
                        return Ok(WalkOutcome::Restart(pivot));
                    }
                }
            }
        }
    }

    let mut i = found.map_or_else(|| node.nitems(), |f| f.index);
    if let (Some(p), Some(f)) = (pivot, found) {
        if !f.exact {
            let child = unsafe { node.child(max_items, i) };
            let child = cow_fan(child, max_items, alloc, hooks)?;
            unsafe { node.set_child(max_items, i, Some(child)) };
            match walk_rev(child, max_items, min_items, count, cmp, hooks, alloc, Some(p), depth + 1, callback)? {
                WalkOutcome::Completed => {}
                other => return Ok(other),
            }
            if i == 0 {
                return Ok(WalkOutcome::Completed);
            }
            i -= 1;
        }
    }

    loop {
        match apply_action(node, max_items, cmp, i, callback)? {
            ItemOutcome::Advance => {}
            ItemOutcome::Stopped => return Ok(WalkOutcome::Stopped),
            ItemOutcome::Delete => {
                let original = unsafe { &*node.item_ptr(max_items, i) };
                let pivot = hooks.clone_item(original)?;
                return Ok(WalkOutcome::Restart(pivot));
            }
        }

        let child = unsafe { node.child(max_items, i) };
        let child = cow_fan(child, max_items, alloc, hooks)?;
        unsafe { node.set_child(max_items, i, Some(child)) };
        match walk_rev(child, max_items, min_items, count, cmp, hooks, alloc, None, depth + 1, callback)? {
            WalkOutcome::Completed => {}
            other => return Ok(other),
        }

        if i == 0 {
            return Ok(WalkOutcome::Completed);
        }
        i -= 1;
    }
}

/// Run an action traversal over the whole tree, starting at `pivot` if one
/// is given. Returns `true` if the walk reached the end, `false` if the
/// callback stopped it early.
#[allow(clippy::too_many_arguments)]
pub(crate) fn action_ascend<T, C, H, A>(
    root: &mut Option<Node<T>>,
    height: &mut usize,
    count: &mut usize,
    max_items: usize,
    min_items: usize,
    cmp: &C,
    hooks: &H,
    alloc: &A,
    mut callback: impl FnMut(&T) -> Action<T>,
) -> Result<bool>
where
    C: Comparator<T>,
    H: ItemClone<T>,
    A: Allocator,
{
    let mut pivot: Option<T> = None;
    loop {
        let Some(r) = *root else { return Ok(true) };
        let r = cow_fan(r, max_items, alloc, hooks)?;
        *root = Some(r);

        match walk(r, max_items, min_items, count, cmp, hooks, alloc, pivot.as_ref(), 0, &mut callback)? {
            WalkOutcome::Completed => return Ok(true),
            WalkOutcome::Stopped => return Ok(false),
            WalkOutcome::Restart(item) => {
                delete::run(
                    root,
                    height,
                    count,
                    max_items,
                    min_items,
                    cmp,
                    hooks,
                    alloc,
                    delete::Action::Key(&item),
                    None,
                )?;
                // The real delete already removed `item`; resuming the walk
                // pivoted on its value lands on the first surviving item
                // that compared greater, without revisiting anything before
                // it.
                pivot = Some(item);
            }
        }
    }
}

/// Reverse-order counterpart of [`action_ascend`].
#[allow(clippy::too_many_arguments)]
pub(crate) fn action_descend<T, C, H, A>(
    root: &mut Option<Node<T>>,
    height: &mut usize,
    count: &mut usize,
    max_items: usize,
    min_items: usize,
    cmp: &C,
    hooks: &H,
    alloc: &A,
    mut callback: impl FnMut(&T) -> Action<T>,
) -> Result<bool>
where
    C: Comparator<T>,
    H: ItemClone<T>,
    A: Allocator,
{
    let mut pivot: Option<T> = None;
    loop {
        let Some(r) = *root else { return Ok(true) };
        let r = cow_fan(r, max_items, alloc, hooks)?;
        *root = Some(r);

        match walk_rev(r, max_items, min_items, count, cmp, hooks, alloc, pivot.as_ref(), 0, &mut callback)? {
            WalkOutcome::Completed => return Ok(true),
            WalkOutcome::Stopped => return Ok(false),
            WalkOutcome::Restart(item) => {
                delete::run(
                    root,
                    height,
                    count,
                    max_items,
                    min_items,
                    cmp,
                    hooks,
                    alloc,
                    delete::Action::Key(&item),
                    None,
                )?;
                pivot = Some(item);
            }
        }
    }
}
