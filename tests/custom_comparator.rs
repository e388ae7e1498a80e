use cowtree::{BTree, DeriveClone, GlobalAllocator};
use std::cmp::Ordering;

#[test]
fn closure_comparator_orders_descending() {
    let mut tree: BTree<i32, _, _, _> = BTree::with_parts(
        4,
        |a: &i32, b: &i32| b.cmp(a),
        DeriveClone::new(),
        GlobalAllocator,
    );

    for v in [3, 1, 4, 1, 5, 9, 2, 6] {
        tree.set(v).unwrap();
    }
    assert_eq!(tree.count(), 7);

    let mut out = Vec::new();
    tree.ascend(None, |item| {
        out.push(*item);
        true
    });
    assert_eq!(out, vec![9, 6, 5, 4, 3, 2, 1]);
    assert_eq!(tree.min(), Some(&9));
    assert_eq!(tree.max(), Some(&1));
}

#[test]
fn comparator_trait_impl_on_named_type() {
    struct ByAbs;
    impl cowtree::Comparator<i32> for ByAbs {
        fn compare(&self, a: &i32, b: &i32) -> Ordering {
            a.abs().cmp(&b.abs())
        }
    }

    let mut tree: BTree<i32, _, _, _> = BTree::with_parts(3, ByAbs, DeriveClone::new(), GlobalAllocator);
    tree.set(-5).unwrap();
    tree.set(3).unwrap();
    tree.set(-1).unwrap();
    assert_eq!(tree.count(), 3);
    assert_eq!(tree.min(), Some(&-1));
    assert_eq!(tree.max(), Some(&-5));
    // -5 and 5 compare equal under this order; inserting 5 replaces -5.
    assert_eq!(tree.set(5).unwrap(), Some(-5));
    assert_eq!(tree.count(), 3);
}
