use cowtree::{Allocator, BTree, BTreeError, DeriveClone, NaturalOrder};
use std::alloc::Layout;
use std::cell::Cell;
use std::ptr::NonNull;

/// An allocator that grants a fixed number of allocations before refusing
/// every one after — the "fault-injecting test wrapper" [`Allocator`]'s own
/// doc comment anticipates.
struct FailAfter {
    remaining: Cell<usize>,
}

unsafe impl Allocator for FailAfter {
    fn alloc_zeroed(&self, layout: Layout) -> Option<NonNull<u8>> {
        let remaining = self.remaining.get();
        if remaining == 0 {
            return None;
        }
        self.remaining.set(remaining - 1);
        if layout.size() == 0 {
            return NonNull::new(layout.align() as *mut u8);
        }
        let ptr = unsafe { std::alloc::alloc_zeroed(layout) };
        NonNull::new(ptr)
    }

    unsafe fn dealloc(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() == 0 {
            return;
        }
        unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) }
    }
}

#[test]
fn set_reports_out_of_memory_and_leaves_tree_unchanged() {
    // Degree 2 (max_items = 3): the first allocation buys the root leaf,
    // which then absorbs three inserts without splitting. The fourth
    // insert needs a split — a second node allocation — which the budget
    // of 1 has already spent.
    let alloc = FailAfter { remaining: Cell::new(1) };
    let mut tree = BTree::with_parts(2, NaturalOrder, DeriveClone::new(), alloc);

    assert_eq!(tree.set(1).unwrap(), None);
    assert_eq!(tree.set(2).unwrap(), None);
    assert_eq!(tree.set(3).unwrap(), None);
    assert_eq!(tree.count(), 3);
    assert!(!tree.is_oom());

    let err = tree.set(4).unwrap_err();
    assert_eq!(err, BTreeError::OutOfMemory);
    assert!(tree.is_oom());

    assert_eq!(tree.count(), 3);
    assert_eq!(tree.get(&1), Some(&1));
    assert_eq!(tree.get(&2), Some(&2));
    assert_eq!(tree.get(&3), Some(&3));
    assert_eq!(tree.get(&4), None);
}

#[test]
fn root_split_out_of_memory_leaves_root_untouched() {
    // Degree 2 (max_items = 3): the first allocation buys the root leaf.
    // The fourth insert needs to grow the root, which takes two more
    // allocations — a new root branch, and the split's right sibling. A
    // budget of 2 lets the first of those two succeed and the second fail,
    // exercising the ordering between them rather than just "any OOM during
    // a split".
    let alloc = FailAfter { remaining: Cell::new(2) };
    let mut tree = BTree::with_parts(2, NaturalOrder, DeriveClone::new(), alloc);

    assert_eq!(tree.set(1).unwrap(), None);
    assert_eq!(tree.set(2).unwrap(), None);
    assert_eq!(tree.set(3).unwrap(), None);
    assert_eq!(tree.count(), 3);

    let err = tree.set(4).unwrap_err();
    assert_eq!(err, BTreeError::OutOfMemory);
    assert!(tree.is_oom());

    // The pre-call content must survive intact: no lost items, no
    // corrupted height, nothing reachable that shouldn't be.
    assert_eq!(tree.count(), 3);
    assert_eq!(tree.height(), 1);
    assert_eq!(tree.get(&1), Some(&1));
    assert_eq!(tree.get(&2), Some(&2));
    assert_eq!(tree.get(&3), Some(&3));
    assert_eq!(tree.get(&4), None);

    let mut out = Vec::new();
    tree.ascend(None, |item| {
        out.push(*item);
        true
    });
    assert_eq!(out, vec![1, 2, 3]);
}
