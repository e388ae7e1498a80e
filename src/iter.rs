//! Stateful cursor over an immutable snapshot of a tree (§4.10).
//!
//! Constructing an iterator increments the root's reference count, exactly
//! like [`crate::tree::BTree::clone`] — the iterator is, structurally, a
//! second handle onto the same nodes. Any later mutation on the originating
//! tree copy-on-write-fans away from what this iterator's path stack
//! references, so the walk never observes it; this is also why, unlike the
//! original library, no scratch-slot copy of the current item is needed —
//! [`Self::item`] simply borrows straight out of the (now immutable-to-us)
//! node.
//!
//! The path stack holds `(node, index)` pairs. Every frame's `index` names
//! an item that is *pending*: this node's `child(index)` has already been
//! folded into the frames above it (or was skipped because a `seek` landed
//! here directly), and `index` itself has not yet been surfaced through
//! [`Self::item`]. `next`/`prev` either advance a leaf frame in place or, for
//! a branch frame being left behind for the first time, step its own index
//! and descend into the newly relevant child — a frame is never revisited
//! with stale state, so no backtracking loop is needed on either path.

use crate::alloc::Allocator;
use crate::comparator::Comparator;
use crate::node::Node;
use crate::search::search;

pub struct BTreeIter<T, C, A> {
    max_items: usize,
    cmp: C,
    alloc: A,
    root: Option<Node<T>>,
    stack: Vec<(Node<T>, usize)>,
    at_start: bool,
    at_end: bool,
}

impl<T, C, A> BTreeIter<T, C, A>
where
    C: Comparator<T>,
    A: Allocator,
{
    pub(crate) fn new(max_items: usize, cmp: C, alloc: A, root: Option<Node<T>>) -> Self {
        if let Some(r) = root {
            r.rc_inc();
        }
        BTreeIter {
            max_items,
            cmp,
            alloc,
            root,
            stack: Vec::new(),
            at_start: true,
            at_end: true,
        }
    }

    fn push_leftmost(&mut self, mut node: Node<T>, mut idx: usize) {
        loop {
            self.stack.push((node, idx));
            if node.is_leaf() {
                break;
            }
            let child = unsafe { node.child(self.max_items, idx) };
            node = child;
            idx = 0;
        }
    }

    fn push_rightmost(&mut self, mut node: Node<T>) {
        loop {
            let idx = node.nitems() - 1;
            self.stack.push((node, idx));
            if node.is_leaf() {
                break;
            }
            let child = unsafe { node.child(self.max_items, idx + 1) };
            node = child;
        }
    }

    /// Position at the smallest item in the tree.
    pub fn first(&mut self) {
        self.stack.clear();
        self.at_start = false;
        self.at_end = false;
        match self.root {
            Some(root) => self.push_leftmost(root, 0),
            None => {
                self.at_start = true;
                self.at_end = true;
            }
        }
    }

    /// Position at the largest item in the tree.
    pub fn last(&mut self) {
        self.stack.clear();
        self.at_start = false;
        self.at_end = false;
        match self.root {
            Some(root) => self.push_rightmost(root),
            None => {
                self.at_start = true;
                self.at_end = true;
            }
        }
    }

    /// Position at the first item comparing `>= key` (plain, unhinted
    /// search — the iterator has no per-depth memo of its own).
    ///
    /// A node only gets a stack frame when it actually holds an item `>=
    /// key` (`found.index < nitems`); a node whose items are all `< key`
    /// contributes nothing and the descent continues straight into its
    /// last child — keeping every frame on the stack a valid pending item,
    /// the same invariant [`Self::next`]/[`Self::prev`] rely on elsewhere.
    /// If every node on the path is such a node, `key` is past the largest
    /// item in the tree and the stack ends up empty.
    pub fn seek(&mut self, key: &T) {
        self.stack.clear();
        self.at_start = false;
        self.at_end = false;
        let Some(root) = self.root else {
            self.at_start = true;
            self.at_end = true;
            return;
        };
        let mut node = root;
        loop {
            let items = unsafe { node.items(self.max_items) };
            let found = search(items, key, &self.cmp);
            let has_pending = found.index < node.nitems();
            if has_pending {
                self.stack.push((node, found.index));
            }
            if node.is_leaf() {
                if !has_pending && self.stack.is_empty() {
                    self.at_end = true;
                }
                return;
            }
            node = unsafe { node.child(self.max_items, found.index) };
        }
    }

    /// Advance to the next item in ascending order. Stepping forward off an
    /// empty stack that was left `at_start` (by running `prev` past the
    /// first item, or — in principle — a `seek` with no match on the low
    /// side) recovers to the first item, symmetric with [`Self::prev`]'s
    /// recovery to the last item; a stack left empty by `at_end` (already
    /// at the end) stays there.
    pub fn next(&mut self) {
        let Some(&(node, idx)) = self.stack.last() else {
            if self.at_start && !self.at_end {
                if let Some(root) = self.root {
                    self.push_leftmost(root, 0);
                    self.at_start = false;
                    return;
                }
            }
            self.at_end = true;
            return;
        };
        if node.is_leaf() {
            if idx + 1 < node.nitems() {
                self.stack.last_mut().unwrap().1 = idx + 1;
            } else {
                self.stack.pop();
                if self.stack.is_empty() {
                    self.at_end = true;
                }
            }
        } else {
            let new_idx = idx + 1;
            if new_idx < node.nitems() {
                self.stack.last_mut().unwrap().1 = new_idx;
            } else {
                self.stack.pop();
            }
            let child = unsafe { node.child(self.max_items, new_idx) };
            self.push_leftmost(child, 0);
        }
        self.at_start = false;
    }

    /// Retreat to the previous item in ascending order. Stepping backward
    /// off an empty stack that was left `at_end` (by running `next` past
    /// the last item, or by a `seek` with no match) recovers to the last
    /// item — the cursor equivalent of [`Self::last`] — rather than
    /// staying stuck; a stack left empty by `at_start` (already before the
    /// first item, or never positioned) stays there.
    pub fn prev(&mut self) {
        let Some(&(node, idx)) = self.stack.last() else {
            if self.at_end && !self.at_start {
                if let Some(root) = self.root {
                    self.push_rightmost(root);
                    self.at_end = false;
                    return;
                }
            }
            self.at_start = true;
            return;
        };
        if node.is_leaf() {
            if idx > 0 {
                self.stack.last_mut().unwrap().1 = idx - 1;
            } else {
                self.stack.pop();
                if self.stack.is_empty() {
                    self.at_start = true;
                }
            }
        } else if idx > 0 {
            let new_idx = idx - 1;
            self.stack.last_mut().unwrap().1 = new_idx;
            let child = unsafe { node.child(self.max_items, new_idx + 1) };
            self.push_rightmost(child);
        } else {
            self.stack.pop();
            let child = unsafe { node.child(self.max_items, 0) };
            self.push_rightmost(child);
        }
        self.at_end = false;
    }

    /// Borrow the item at the cursor, or `None` if positioned before the
    /// first or after the last.
    pub fn item(&self) -> Option<&T> {
        self.stack
            .last()
            .map(|&(node, idx)| unsafe { &*node.item_ptr(self.max_items, idx) })
    }

    pub fn at_start(&self) -> bool {
        self.at_start
    }

    pub fn at_end(&self) -> bool {
        self.at_end
    }
}

impl<T, C, A> Drop for BTreeIter<T, C, A>
where
    A: Allocator,
{
    fn drop(&mut self) {
        if let Some(r) = self.root {
            r.unref(self.max_items, &self.alloc);
        }
    }
}
