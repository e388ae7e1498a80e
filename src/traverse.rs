//! Read-only traversal: full in-order/reverse-order walks and pivot-anchored
//! variants of each (§4.8).
//!
//! Every entry point returns `true` if it walked to the natural end of its
//! range, `false` if the visitor callback requested early termination —
//! matching the "traversal returns whether it reached the end" contract in
//! §6. A pivoted walk recurses into at most one "mixed" child per node (the
//! one straddling the pivot); every other child it touches is handed off to
//! the unconditional full walk, since by construction every item in it is
//! already known to be on the wanted side of the pivot.

use crate::comparator::Comparator;
use crate::hint::Hint;
use crate::node::Node;
use crate::search::locate;

/// In-order walk of every item in the subtree, visiting each until `visit`
/// returns `false`.
pub(crate) fn ascend_full<T>(node: Node<T>, max_items: usize, visit: &mut impl FnMut(&T) -> bool) -> bool {
    if node.is_leaf() {
        for item in unsafe { node.items(max_items) } {
            if !visit(item) {
                return false;
            }
        }
        return true;
    }
    let n = node.nitems();
    for k in 0..n {
        let child = unsafe { node.child(max_items, k) };
        if !ascend_full(child, max_items, visit) {
            return false;
        }
        let item = unsafe { &*node.item_ptr(max_items, k) };
        if !visit(item) {
            return false;
        }
    }
    let last = unsafe { node.child(max_items, n) };
    ascend_full(last, max_items, visit)
}

/// In-order walk of every item comparing `>= pivot`.
#[allow(clippy::too_many_arguments)]
pub(crate) fn ascend_from<T, C>(
    node: Node<T>,
    max_items: usize,
    cmp: &C,
    pivot: &T,
    mut hint: Option<&mut Hint>,
    depth: usize,
    visit: &mut impl FnMut(&T) -> bool,
) -> bool
where
    C: Comparator<T>,
{
    let items = unsafe { node.items(max_items) };
    let found = locate(items, pivot, cmp, hint.as_deref_mut(), depth);
    let i = found.index;

    if node.is_leaf() {
        for item in &items[i..] {
            if !visit(item) {
                return false;
            }
        }
        return true;
    }

    if !found.exact {
        let child = unsafe { node.child(max_items, i) };
        if !ascend_from(child, max_items, cmp, pivot, hint.as_deref_mut(), depth + 1, visit) {
            return false;
        }
    }
    let n = node.nitems();
    for k in i..n {
        let item = unsafe { &*node.item_ptr(max_items, k) };
        if !visit(item) {
            return false;
        }
        let child = unsafe { node.child(max_items, k + 1) };
        if !ascend_full(child, max_items, visit) {
            return false;
        }
    }
    true
}

/// Reverse in-order walk of every item in the subtree.
pub(crate) fn descend_full<T>(node: Node<T>, max_items: usize, visit: &mut impl FnMut(&T) -> bool) -> bool {
    if node.is_leaf() {
        for item in unsafe { node.items(max_items) }.iter().rev() {
            if !visit(item) {
                return false;
            }
        }
        return true;
    }
    let n = node.nitems();
    let last = unsafe { node.child(max_items, n) };
    if !descend_full(last, max_items, visit) {
        return false;
    }
    for k in (0..n).rev() {
        let item = unsafe { &*node.item_ptr(max_items, k) };
        if !visit(item) {
            return false;
        }
        let child = unsafe { node.child(max_items, k) };
        if !descend_full(child, max_items, visit) {
            return false;
        }
    }
    true
}

/// Reverse in-order walk of every item comparing `<= pivot`.
#[allow(clippy::too_many_arguments)]
pub(crate) fn descend_from<T, C>(
    node: Node<T>,
    max_items: usize,
    cmp: &C,
    pivot: &T,
    mut hint: Option<&mut Hint>,
    depth: usize,
    visit: &mut impl FnMut(&T) -> bool,
) -> bool
where
    C: Comparator<T>,
{
    let items = unsafe { node.items(max_items) };
    let found = locate(items, pivot, cmp, hint.as_deref_mut(), depth);
    let mut i = found.index;

    if node.is_leaf() {
        let top = if found.exact { Some(i) } else { i.checked_sub(1) };
        if let Some(top) = top {
            for item in items[..=top].iter().rev() {
                if !visit(item) {
                    return false;
                }
            }
        }
        return true;
    }

    if !found.exact {
        let child = unsafe { node.child(max_items, i) };
        if !descend_from(child, max_items, cmp, pivot, hint.as_deref_mut(), depth + 1, visit) {
            return false;
        }
        if i == 0 {
            return true;
        }
        i -= 1;
    }

    loop {
        let item = unsafe { &*node.item_ptr(max_items, i) };
        if !visit(item) {
            return false;
        }
        let child = unsafe { node.child(max_items, i) };
        if !descend_full(child, max_items, visit) {
            return false;
        }
        if i == 0 {
            break;
        }
        i -= 1;
    }
    true
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn ascend<T, C>(
    root: Option<Node<T>>,
    max_items: usize,
    cmp: &C,
    pivot: Option<&T>,
    hint: Option<&mut Hint>,
    visit: &mut impl FnMut(&T) -> bool,
) -> bool
where
    C: Comparator<T>,
{
    let Some(root) = root else { return true };
    match pivot {
        Some(pivot) => ascend_from(root, max_items, cmp, pivot, hint, 0, visit),
        None => ascend_full(root, max_items, visit),
    }
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn descend<T, C>(
    root: Option<Node<T>>,
    max_items: usize,
    cmp: &C,
    pivot: Option<&T>,
    hint: Option<&mut Hint>,
    visit: &mut impl FnMut(&T) -> bool,
) -> bool
where
    C: Comparator<T>,
{
    let Some(root) = root else { return true };
    match pivot {
        Some(pivot) => descend_from(root, max_items, cmp, pivot, hint, 0, visit),
        None => descend_full(root, max_items, visit),
    }
}
