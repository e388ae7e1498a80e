//! Locating a key within one node's item slab (§4.2).
//!
//! Two entry points: [`search`], plain binary search, and [`search_hinted`],
//! which first probes the index the [`crate::hint::Hint`] recorded for this
//! depth on the last call and only falls back to full bisection if that
//! probe misses. Both return the same shape as the original library's
//! `node_bsearch`: the index of the match if found, or the insertion point
//! that keeps the slab sorted if not.

use crate::comparator::Comparator;
use crate::hint::Hint;

/// Result of locating `key` among a node's sorted items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Found {
    pub(crate) index: usize,
    pub(crate) exact: bool,
}

/// Plain binary search over `items`, already sorted by `cmp`.
pub(crate) fn search<T, C: Comparator<T>>(items: &[T], key: &T, cmp: &C) -> Found {
    let mut lo = 0usize;
    let mut hi = items.len();
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        match cmp.compare(key, &items[mid]) {
            std::cmp::Ordering::Equal => return Found { index: mid, exact: true },
            std::cmp::Ordering::Less => hi = mid,
            std::cmp::Ordering::Greater => lo = mid + 1,
        }
    }
    Found { index: lo, exact: false }
}

/// Hint-accelerated search at traversal depth `depth`. Tries the
/// previously recorded index (and its immediate neighbors, to absorb a
/// small shift since the last call) before falling back to [`search`];
/// always records wherever it lands so the next call at this depth starts
/// closer.
pub(crate) fn search_hinted<T, C: Comparator<T>>(
    items: &[T],
    key: &T,
    cmp: &C,
    hint: &mut Hint,
    depth: usize,
) -> Found {
    if let Some(probe) = hint.probe(depth) {
        let probe = probe.min(items.len().saturating_sub(1));
        if !items.is_empty() {
            match cmp.compare(key, &items[probe]) {
                std::cmp::Ordering::Equal => {
                    hint.record(depth, probe);
                    return Found { index: probe, exact: true };
                }
                std::cmp::Ordering::Less => {
                    // Key may still be just behind the hint; narrow the
                    // bisection window instead of restarting from scratch.
                    let found = search(&items[..probe], key, cmp);
                    hint.record(depth, found.index);
                    return found;
                }
                std::cmp::Ordering::Greater => {
                    let found = search(&items[probe + 1..], key, cmp);
                    let found = Found {
                        index: found.index + probe + 1,
                        exact: found.exact,
                    };
                    hint.record(depth, found.index);
                    return found;
                }
            }
        }
    }
    let found = search(items, key, cmp);
    hint.record(depth, found.index);
    found
}

/// Dispatch to [`search_hinted`] when a hint is supplied, else [`search`].
/// Every engine that accepts an optional hint buffer (set/get/delete/ascend/
/// descend) goes through this so the hinted and unhinted call paths cannot
/// drift apart.
pub(crate) fn locate<T, C: Comparator<T>>(
    items: &[T],
    key: &T,
    cmp: &C,
    hint: Option<&mut Hint>,
    depth: usize,
) -> Found {
    match hint {
        Some(h) => search_hinted(items, key, cmp, h, depth),
        None => search(items, key, cmp),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparator::NaturalOrder;

    #[test]
    fn finds_exact_matches() {
        let items = vec![1, 3, 5, 7, 9];
        let found = search(&items, &5, &NaturalOrder);
        assert_eq!(found, Found { index: 2, exact: true });
    }

    #[test]
    fn finds_insertion_points() {
        let items = vec![1, 3, 5, 7, 9];
        assert_eq!(search(&items, &0, &NaturalOrder), Found { index: 0, exact: false });
        assert_eq!(search(&items, &4, &NaturalOrder), Found { index: 2, exact: false });
        assert_eq!(search(&items, &10, &NaturalOrder), Found { index: 5, exact: false });
    }

    #[test]
    fn empty_slab_inserts_at_zero() {
        let items: Vec<i32> = vec![];
        assert_eq!(search(&items, &1, &NaturalOrder), Found { index: 0, exact: false });
    }

    #[test]
    fn hinted_matches_plain() {
        let items: Vec<i32> = (0..64).step_by(2).collect();
        let mut hint = Hint::new();
        for key in 0..130 {
            let plain = search(&items, &key, &NaturalOrder);
            let hinted = search_hinted(&items, &key, &NaturalOrder, &mut hint, 0);
            assert_eq!(plain, hinted, "mismatch at key {key}");
        }
    }

    proptest::proptest! {
        #[test]
        fn hinted_always_matches_plain(mut keys in proptest::collection::vec(0i64..200, 0..40), probes in proptest::collection::vec(0i64..200, 0..40)) {
            keys.sort();
            keys.dedup();
            let mut hint = Hint::new();
            for key in probes {
                let plain = search(&keys, &key, &NaturalOrder);
                let hinted = search_hinted(&keys, &key, &NaturalOrder, &mut hint, 0);
                proptest::prop_assert_eq!(plain, hinted);
            }
        }
    }
}
