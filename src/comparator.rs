//! Ordering and item-duplication capability objects.
//!
//! The original library threads a `compare(a, b, udata)` function pointer
//! and an optional `clone(src, dst, udata)` function pointer through every
//! operation. Per the redesign note in `SPEC_FULL.md` §9, both become small
//! traits here instead: a blanket impl lets any `Fn(&T, &T) -> Ordering`
//! closure (or any `T: Ord`) serve as a comparator, while a hand-written impl
//! remains available for a comparator whose identity is only known at
//! runtime (e.g. boxed as `Box<dyn Comparator<T>>`).

use crate::error::BTreeError;
use std::cmp::Ordering;
use std::marker::PhantomData;

/// A total order over `T`. Must be deterministic and must not observe or
/// mutate state outside of `a` and `b` in a way that would make two calls
/// with the same arguments disagree — the engine relies on a stable order
/// to keep every node's items sorted.
pub trait Comparator<T> {
    fn compare(&self, a: &T, b: &T) -> Ordering;
}

impl<T, F> Comparator<T> for F
where
    F: Fn(&T, &T) -> Ordering,
{
    fn compare(&self, a: &T, b: &T) -> Ordering {
        self(a, b)
    }
}

/// Orders items by their `Ord` impl. The common case: `BTree::<T>::new()`
/// defaults to this when `T: Ord`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NaturalOrder;

impl<T: Ord> Comparator<T> for NaturalOrder {
    fn compare(&self, a: &T, b: &T) -> Ordering {
        a.cmp(b)
    }
}

/// Governs how the engine duplicates a stored item during copy-on-write
/// fan-out (§4.3) and during the working-item clone on insert (§4.4 step 1).
///
/// This stands in for the original library's optional `item_clone`
/// callback. Unlike `std::clone::Clone`, it returns a `Result`: the source
/// library's hook can fail (its doc comment: "on failure must leave `dst`
/// untouched"), and a caller that wants that behavior in Rust — e.g. an item
/// type whose `Clone` impl itself allocates and can run out of memory — can
/// still express it by implementing this trait directly instead of relying
/// on the `DeriveClone` blanket below.
///
/// Item *destruction*, the original library's other optional hook
/// (`item_free`), is not mirrored by a trait here: Rust's `Drop` already
/// gives "run exactly once, when the owning value's storage goes away" for
/// free, which is exactly the contract `item_free` exists to approximate in
/// a language without destructors. Adding a second, parallel "free callback"
/// alongside `Drop` would only create a way for the two to disagree.
pub trait ItemClone<T> {
    fn clone_item(&self, item: &T) -> Result<T, BTreeError>;
}

/// The default duplication strategy: delegates to `T::clone`. Infallible in
/// practice, but still wrapped in `Ok` so callers that *do* need a fallible
/// clone can swap in their own `ItemClone` impl without changing any call
/// site's shape.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeriveClone<T>(PhantomData<fn() -> T>);

impl<T> DeriveClone<T> {
    pub fn new() -> Self {
        DeriveClone(PhantomData)
    }
}

impl<T: Clone> ItemClone<T> for DeriveClone<T> {
    fn clone_item(&self, item: &T) -> Result<T, BTreeError> {
        Ok(item.clone())
    }
}
