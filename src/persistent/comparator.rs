//! Three-way key comparators passed to every tree operation.
//!
//! The ordering of an [`AvlTree`](super::AvlTree) is not part of its type.
//! Each call receives a comparator, so the same tree type can be ordered
//! differently by different callers. A tree must always be queried with the
//! comparator it was built with.

use std::cmp::Ordering;

/// A total order over keys, used to position entries in the tree.
///
/// Any `Fn(&K, &K) -> Ordering` closure or function is a comparator.
///
/// # Examples
///
/// ```rust
/// use persistent_avl::persistent::{AvlTree, Comparator};
/// use std::cmp::Ordering;
///
/// let by_length = |left: &&str, right: &&str| left.len().cmp(&right.len());
/// assert_eq!(by_length.compare(&"ab", &"abc"), Ordering::Less);
///
/// let (tree, _) = AvlTree::empty().add("abc", 3, &by_length, true);
/// let (tree, _) = tree.add("a", 1, &by_length, true);
/// assert_eq!(tree.first(), Some((&"a", &1)));
/// ```
pub trait Comparator<K: ?Sized> {
    /// Compares two keys.
    fn compare(&self, left: &K, right: &K) -> Ordering;
}

impl<K, F> Comparator<K> for F
where
    K: ?Sized,
    F: Fn(&K, &K) -> Ordering + ?Sized,
{
    #[inline]
    fn compare(&self, left: &K, right: &K) -> Ordering {
        self(left, right)
    }
}

/// Orders keys by their [`Ord`] implementation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NaturalOrder;

impl<K: Ord + ?Sized> Comparator<K> for NaturalOrder {
    #[inline]
    fn compare(&self, left: &K, right: &K) -> Ordering {
        left.cmp(right)
    }
}

/// Orders keys by the reverse of their [`Ord`] implementation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ReverseOrder;

impl<K: Ord + ?Sized> Comparator<K> for ReverseOrder {
    #[inline]
    fn compare(&self, left: &K, right: &K) -> Ordering {
        right.cmp(left)
    }
}
