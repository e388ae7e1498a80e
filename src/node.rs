//! Node layout, allocation, and reference counting (§3, §4.1).
//!
//! A node allocation holds a fixed header, then — for branches only — a
//! `max_items + 1` array of child links, then a `max_items` slab of item
//! storage. All three regions live in one allocation, computed with
//! `Layout::extend` rather than the teacher crate's hand-picked byte-offset
//! constants (`BRANCH_BASE_SIZE`, `TABLE_ENTRY_SIZE` in `patch/branch.rs`),
//! because the item type here is a generic `T` of caller-chosen size and
//! alignment rather than the teacher's fixed pointer-sized `Head`. The
//! reference-counting protocol — an `AtomicU32`, a CAS increment loop, a
//! `Release` decrement with an `Acquire` fence read on the path that
//! actually frees — is carried over unchanged from `patch/branch.rs` and
//! `patch/leaf.rs`; only the zero point differs, since this engine's `rc`
//! counts *additional* holders beyond the owning parent (0 = unique) where
//! the teacher's counts holders including the parent (1 = unique).

use crate::alloc::Allocator;
use crate::comparator::ItemClone;
use crate::error::{BTreeError, Result};
use std::alloc::Layout;
use std::mem::MaybeUninit;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU32, Ordering::Acquire, Ordering::Relaxed, Ordering::Release};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Kind {
    Leaf,
    Branch,
}

#[repr(C)]
pub(crate) struct Header {
    pub(crate) kind: Kind,
    pub(crate) nitems: u16,
    pub(crate) rc: AtomicU32,
}

/// An opaque handle to a node allocation. Copy, like a raw pointer, because
/// it is one: all actual field access goes through the `unsafe` accessor
/// methods below, each of which recomputes the node's layout from `kind` and
/// the caller-supplied `max_items` (the tree handle's `max_items`, not
/// anything stored in the node itself — matching the original library,
/// where `max_items` lives on `struct btree`, not `struct node`).
pub(crate) struct Node<T> {
    ptr: NonNull<Header>,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T> Clone for Node<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for Node<T> {}

impl<T> PartialEq for Node<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr == other.ptr
    }
}
impl<T> Eq for Node<T> {}

// A `Node<T>` is a handle to heap storage this engine owns (solely or
// jointly via `rc`), the same ownership shape as `Box<T>` or `Arc<T>` —
// `Send` when `T` is, and deliberately not `Sync`: concurrent readers need
// their own cloned handle (§5), not shared access to this one.
unsafe impl<T: Send> Send for Node<T> {}

struct NodeLayout {
    layout: Layout,
    children_offset: usize,
    items_offset: usize,
}

fn node_layout<T>(kind: Kind, max_items: usize) -> NodeLayout {
    let mut layout = Layout::new::<Header>();
    let mut children_offset = 0;
    if kind == Kind::Branch {
        let children_layout = Layout::array::<Option<Node<T>>>(max_items + 1)
            .expect("branch child-link array layout overflow");
        let (extended, offset) = layout
            .extend(children_layout)
            .expect("branch layout overflow");
        layout = extended;
        children_offset = offset;
    }
    let items_layout =
        Layout::array::<MaybeUninit<T>>(max_items).expect("item slab layout overflow");
    let (extended, items_offset) = layout.extend(items_layout).expect("node layout overflow");
    NodeLayout {
        layout: extended.pad_to_align(),
        children_offset,
        items_offset,
    }
}

impl<T> Node<T> {
    #[inline]
    unsafe fn header_ptr(self) -> *mut Header {
        self.ptr.as_ptr()
    }

    #[inline]
    pub(crate) fn kind(self) -> Kind {
        // SAFETY: `kind` never changes after allocation and is always
        // initialized before a `Node<T>` handle is handed out.
        unsafe { (*self.header_ptr()).kind }
    }

    #[inline]
    pub(crate) fn is_leaf(self) -> bool {
        self.kind() == Kind::Leaf
    }

    #[inline]
    pub(crate) fn nitems(self) -> usize {
        unsafe { (*self.header_ptr()).nitems as usize }
    }

    #[inline]
    pub(crate) fn set_nitems(self, n: usize) {
        debug_assert!(n <= u16::MAX as usize);
        unsafe { (*self.header_ptr()).nitems = n as u16 };
    }

    #[inline]
    fn rc(self) -> &'static AtomicU32 {
        // SAFETY: the header outlives every access we perform on it; the
        // 'static is a convenience for going through an `&AtomicU32` without
        // threading an explicit lifetime, matching how raw-pointer node
        // engines elsewhere in the corpus expose atomics from a `NonNull`.
        unsafe { &(*self.header_ptr()).rc }
    }

    /// `true` iff this node is shared (has holders beyond its parent) and
    /// must be copy-on-write fanned before any in-place mutation (§4.3).
    #[inline]
    pub(crate) fn is_shared(self) -> bool {
        self.rc().load(Acquire) > 0
    }

    /// Increment the reference count, as when `clone()`-ing a subtree into
    /// another tree handle, or re-sharing a child during COW fan-out.
    pub(crate) fn rc_inc(self) {
        let mut current = self.rc().load(Relaxed);
        loop {
            assert!(current != u32::MAX, "node reference count overflow");
            match self
                .rc()
                .compare_exchange(current, current + 1, Relaxed, Relaxed)
            {
                Ok(_) => return,
                Err(v) => current = v,
            }
        }
    }

    /// Allocate a fresh, uniquely owned (`rc == 0`) leaf node with zero items.
    pub(crate) fn alloc_leaf(max_items: usize, alloc: &impl Allocator) -> Option<Self> {
        Self::alloc(Kind::Leaf, max_items, alloc)
    }

    /// Allocate a fresh, uniquely owned (`rc == 0`) branch node with zero
    /// items and zero (all-`None`) children.
    pub(crate) fn alloc_branch(max_items: usize, alloc: &impl Allocator) -> Option<Self> {
        Self::alloc(Kind::Branch, max_items, alloc)
    }

    pub(crate) fn alloc(kind: Kind, max_items: usize, alloc: &impl Allocator) -> Option<Self> {
        let NodeLayout { layout, .. } = node_layout::<T>(kind, max_items);
        let raw = alloc.alloc_zeroed(layout)?;
        let header = raw.as_ptr() as *mut Header;
        // SAFETY: `raw` is a fresh, zeroed allocation sized for `Header`
        // followed by the children/items regions; writing the header fields
        // in place is the first initialization of that memory.
        unsafe {
            header.write(Header {
                kind,
                nitems: 0,
                rc: AtomicU32::new(0),
            });
        }
        Some(Node {
            ptr: NonNull::new(header).unwrap(),
            _marker: std::marker::PhantomData,
        })
    }

    /// Raw pointer to item slot `i`. Valid regardless of whether that slot
    /// currently holds an initialized `T` — callers are responsible for only
    /// reading initialized slots (`i < nitems()`) and only writing
    /// uninitialized ones without dropping what is (not) there.
    #[inline]
    pub(crate) fn item_ptr(self, max_items: usize, i: usize) -> *mut T {
        let NodeLayout { items_offset, .. } = node_layout::<T>(self.kind(), max_items);
        debug_assert!(i < max_items);
        unsafe {
            (self.ptr.as_ptr() as *mut u8)
                .add(items_offset)
                .cast::<T>()
                .add(i)
        }
    }

    /// Shared view of the initialized item slots `[0, nitems())`.
    #[inline]
    pub(crate) unsafe fn items(self, max_items: usize) -> &'static [T] {
        std::slice::from_raw_parts(self.item_ptr(max_items, 0), self.nitems())
    }

    /// Read item `i` by value without removing it from the slot (the
    /// caller must not leave two live owners of the same bytes — this is
    /// used only where the slot is about to be overwritten or the node
    /// freed without re-dropping it).
    #[inline]
    pub(crate) unsafe fn read_item(self, max_items: usize, i: usize) -> T {
        self.item_ptr(max_items, i).read()
    }

    #[inline]
    pub(crate) unsafe fn write_item(self, max_items: usize, i: usize, item: T) {
        self.item_ptr(max_items, i).write(item);
    }

    /// Raw pointer to child-link slot `i`. Only valid for branch nodes.
    #[inline]
    pub(crate) fn child_slot_ptr(self, max_items: usize, i: usize) -> *mut Option<Node<T>> {
        debug_assert_eq!(self.kind(), Kind::Branch);
        let NodeLayout { children_offset, .. } = node_layout::<T>(Kind::Branch, max_items);
        debug_assert!(i <= max_items);
        unsafe {
            (self.ptr.as_ptr() as *mut u8)
                .add(children_offset)
                .cast::<Option<Node<T>>>()
                .add(i)
        }
    }

    #[inline]
    pub(crate) unsafe fn child(self, max_items: usize, i: usize) -> Node<T> {
        (*self.child_slot_ptr(max_items, i))
            .expect("branch child slot must be populated in a settled tree")
    }

    #[inline]
    pub(crate) unsafe fn set_child(self, max_items: usize, i: usize, child: Option<Node<T>>) {
        *self.child_slot_ptr(max_items, i) = child;
    }

    /// Shift `[at, nitems())` right by one slot to open a hole for an
    /// insert at `at` (leaf insert, or branch median/right-sibling
    /// insertion during a split propagation).
    pub(crate) unsafe fn shift_items_right(self, max_items: usize, at: usize, by: usize) {
        let n = self.nitems();
        if n == at {
            return;
        }
        let base = self.item_ptr(max_items, at);
        std::ptr::copy(base, base.add(by), n - at);
    }

    /// Shift `[at+1, nitems())` left by one slot, closing the hole left by
    /// removing item `at`.
    pub(crate) unsafe fn shift_items_left(self, max_items: usize, at: usize) {
        let n = self.nitems();
        let base = self.item_ptr(max_items, at + 1);
        std::ptr::copy(base, self.item_ptr(max_items, at), n - at - 1);
    }

    pub(crate) unsafe fn shift_children_right(self, max_items: usize, at: usize, by: usize) {
        let n = self.nitems();
        let base = self.child_slot_ptr(max_items, at);
        std::ptr::copy(base, base.add(by), n + 1 - at);
    }

    pub(crate) unsafe fn shift_children_left(self, max_items: usize, at: usize) {
        let n = self.nitems();
        let base = self.child_slot_ptr(max_items, at + 1);
        std::ptr::copy(base, self.child_slot_ptr(max_items, at), n - at);
    }

    /// Deep-copy this node into a freshly allocated, uniquely owned
    /// duplicate: header, item slots (via `hooks.clone_item`, unwinding on
    /// the first failure), and — for branches — child links, each
    /// `rc_inc`-ed to reflect the new shared ownership edge. This is the
    /// allocating half of copy-on-write fan-out (§4.3); the caller is
    /// responsible for unref-ing the original afterward.
    pub(crate) fn cow_duplicate<C: ItemClone<T>>(
        self,
        max_items: usize,
        alloc: &impl Allocator,
        hooks: &C,
    ) -> Result<Self> {
        let fresh = Self::alloc(self.kind(), max_items, alloc).ok_or(BTreeError::OutOfMemory)?;
        let n = self.nitems();
        fresh.set_nitems(n);

        let mut cloned = 0usize;
        for i in 0..n {
            let src = unsafe { &*self.item_ptr(max_items, i) };
            match hooks.clone_item(src) {
                Ok(item) => unsafe { fresh.write_item(max_items, i, item) },
                Err(e) => {
                    // Unwind: drop the items we already cloned into `fresh`,
                    // then free `fresh` itself without touching `self`.
                    for j in 0..cloned {
                        unsafe { std::ptr::drop_in_place(fresh.item_ptr(max_items, j)) };
                    }
                    fresh.set_nitems(0);
                    fresh.dealloc_only(max_items, alloc);
                    return Err(e);
                }
            }
            cloned += 1;
        }

        if self.kind() == Kind::Branch {
            for i in 0..=n {
                let child = unsafe { self.child(max_items, i) };
                child.rc_inc();
                unsafe { fresh.set_child(max_items, i, Some(child)) };
            }
        }

        Ok(fresh)
    }

    /// Free this allocation's backing memory without recursing into
    /// children or dropping items, used only to unwind a `cow_duplicate`
    /// that failed partway through (the caller has already cleaned up
    /// whatever partial state it produced).
    fn dealloc_only(self, max_items: usize, alloc: &impl Allocator) {
        let NodeLayout { layout, .. } = node_layout::<T>(self.kind(), max_items);
        unsafe { alloc.dealloc(self.ptr.cast(), layout) };
    }

    /// Release this node's backing allocation without touching its items or
    /// children. Used when the caller has already moved every item and
    /// child link elsewhere by value (merge's `right` node, a collapsed
    /// root's emptied shell) and a plain free of the header is all that
    /// remains.
    pub(crate) fn free_shell(self, max_items: usize, alloc: &impl Allocator) {
        self.dealloc_only(max_items, alloc);
    }

    /// Decrement the reference count. If this was the unique owner (`rc`
    /// was `0`), actually free the node: drop every stored item, recurse
    /// into children (unref-ing each), then release the allocation.
    /// Otherwise another holder remains and nothing further happens.
    ///
    /// Mirrors `Branch::rc_dec`/`Leaf::rc_dec` in the teacher crate, with
    /// the zero-point flipped to match this engine's "0 = unique" `rc`
    /// convention (the teacher's `rc` counts the parent as a holder, so its
    /// free condition is `old == 1`; here it is `old == 0`, which, like the
    /// teacher's decrement, is an intentional unsigned wraparound on the
    /// free path — the node is being deallocated immediately afterward, so
    /// the nonsensical post-decrement value is never observed).
    pub(crate) fn unref(self, max_items: usize, alloc: &impl Allocator) {
        let was_shared = self.rc().fetch_sub(1, Release) > 0;
        if was_shared {
            return;
        }
        self.rc().load(Acquire);

        let n = self.nitems();
        if self.kind() == Kind::Branch {
            for i in 0..=n {
                if let Some(child) = unsafe { *self.child_slot_ptr(max_items, i) } {
                    child.unref(max_items, alloc);
                }
            }
        }
        for i in 0..n {
            unsafe { std::ptr::drop_in_place(self.item_ptr(max_items, i)) };
        }
        self.dealloc_only(max_items, alloc);
    }
}

/// Copy-on-write fan-out entry point (§4.3): if `node` is shared, produce a
/// uniquely owned duplicate and unref the original; otherwise pass `node`
/// through unchanged. Every mutating descent calls this on the root first,
/// then on each child immediately before it is written through.
pub(crate) fn cow_fan<T, C: ItemClone<T>, A: Allocator>(
    node: Node<T>,
    max_items: usize,
    alloc: &A,
    hooks: &C,
) -> Result<Node<T>> {
    if node.is_shared() {
        let fresh = node.cow_duplicate(max_items, alloc, hooks)?;
        node.unref(max_items, alloc);
        Ok(fresh)
    } else {
        Ok(node)
    }
}

/// Split a full node (`node.nitems() == max_items`) in place: `node` keeps
/// `left_count` items, a freshly allocated sibling of the same kind receives
/// the remainder, and the item at `left_count` is handed back by value to
/// be promoted into the parent (§4.4). `left_count == max_items / 2` is an
/// even split; a smaller `left_count` (down to `max_items - 1 - min_items`)
/// is the "lean-left" bias bulk-load uses (§4.5).
pub(crate) fn split_node<T, A: Allocator>(
    node: Node<T>,
    max_items: usize,
    left_count: usize,
    alloc: &A,
) -> Option<(T, Node<T>)> {
    let kind = node.kind();
    let n = node.nitems();
    debug_assert_eq!(n, max_items);
    debug_assert!(left_count < n);
    let right = Node::alloc(kind, max_items, alloc)?;
    let right_count = n - left_count - 1;

    unsafe {
        std::ptr::copy_nonoverlapping(
            node.item_ptr(max_items, left_count + 1),
            right.item_ptr(max_items, 0),
            right_count,
        );
    }
    if kind == Kind::Branch {
        unsafe {
            std::ptr::copy_nonoverlapping(
                node.child_slot_ptr(max_items, left_count + 1),
                right.child_slot_ptr(max_items, 0),
                right_count + 1,
            );
        }
    }
    let median = unsafe { node.read_item(max_items, left_count) };
    right.set_nitems(right_count);
    node.set_nitems(left_count);
    Some((median, right))
}
