use cowtree::{BTree, Hint};

#[test]
fn hint_reused_across_sequential_then_scattered_lookups() {
    let mut tree: BTree<i32> = BTree::with_degree(2);
    let mut hint = Hint::new();

    for v in 0..500 {
        assert_eq!(tree.set_hinted(v, &mut hint).unwrap(), None);
    }
    assert_eq!(tree.count(), 500);

    for v in 0..500 {
        assert_eq!(tree.get_hinted(&v, &mut hint), Some(&v));
    }

    // A zig-zag order exercises both "probe behind" and "probe ahead" of
    // the hint's memoized index without needing an external RNG.
    let mut order: Vec<i32> = Vec::with_capacity(500);
    for i in 0..250 {
        order.push(i);
        order.push(499 - i);
    }
    for v in order {
        assert_eq!(tree.get_hinted(&v, &mut hint), Some(&v));
    }
    assert_eq!(tree.get_hinted(&500, &mut hint), None);
}
