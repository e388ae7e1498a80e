use cowtree::BTree;

#[test]
fn iterator_sweeps_forward_then_seeks_and_steps_back() {
    let mut tree: BTree<i32> = BTree::with_degree(3);
    for v in 0..1000 {
        tree.load(v).unwrap();
    }

    let mut it = tree.iter();
    it.first();
    let mut collected = Vec::new();
    while !it.at_end() {
        collected.push(*it.item().unwrap());
        it.next();
    }
    assert_eq!(collected, (0..1000).collect::<Vec<_>>());
    assert!(it.at_end());
    assert_eq!(it.item(), None);

    it.seek(&500);
    assert_eq!(it.item(), Some(&500));
    it.prev();
    assert_eq!(it.item(), Some(&499));

    it.seek(&1000);
    assert!(it.at_end());
    assert_eq!(it.item(), None);
    it.prev();
    assert_eq!(it.item(), Some(&999));
}

#[test]
fn iterator_over_empty_tree_has_no_items() {
    let tree: BTree<i32> = BTree::new();
    let mut it = tree.iter();
    it.first();
    assert!(it.at_start());
    assert!(it.at_end());
    assert_eq!(it.item(), None);
}

#[test]
fn iterator_is_independent_of_later_mutation() {
    let mut tree: BTree<i32> = BTree::with_degree(2);
    for v in 0..50 {
        tree.set(v).unwrap();
    }

    let mut it = tree.iter();
    it.first();

    for v in 0..50 {
        tree.delete(&v).unwrap();
    }
    assert_eq!(tree.count(), 0);

    let mut collected = Vec::new();
    while !it.at_end() {
        collected.push(*it.item().unwrap());
        it.next();
    }
    assert_eq!(collected, (0..50).collect::<Vec<_>>());
}
