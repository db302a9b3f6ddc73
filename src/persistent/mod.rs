//! Persistent (immutable) ordered maps.
//!
//! This module provides an AVL tree that uses structural sharing to
//! minimize copying:
//!
//! - [`AvlTree`]: the balanced tree engine, ordered by a per-call [`Comparator`]
//! - [`AvlMap`]: an ordered map over [`AvlTree`] using the key's natural ordering
//!
//! # Structural Sharing
//!
//! Inserting or removing an entry rebuilds only the nodes on the path from
//! the root to the edit point. Every other subtree is shared by reference
//! between the old and the new version.
//!
//! # Examples
//!
//! ## `AvlTree`
//!
//! ```rust
//! use persistent_avl::persistent::{AvlTree, ReverseOrder};
//!
//! let (tree, _) = AvlTree::empty().add(1, "one", &ReverseOrder, true);
//! let (tree, _) = tree.add(2, "two", &ReverseOrder, true);
//!
//! // Ordering comes from the comparator, not from the key type
//! assert_eq!(tree.first(), Some((&2, &"two")));
//! ```
//!
//! ## `AvlMap`
//!
//! ```rust
//! use persistent_avl::persistent::AvlMap;
//!
//! let map = AvlMap::new().insert(3, "three").insert(1, "one");
//! let updated = map.insert(1, "ONE");
//!
//! assert_eq!(map.get(&1), Some(&"one"));      // Original unchanged
//! assert_eq!(updated.get(&1), Some(&"ONE"));  // New version
//! ```

// =============================================================================
// Reference Counter Type Alias
// =============================================================================

/// Reference-counted smart pointer type holding tree nodes.
///
/// When the `arc` feature is enabled, this is `std::sync::Arc`,
/// which is thread-safe but has slightly higher overhead.
///
/// When the `arc` feature is disabled (default), this is `std::rc::Rc`,
/// which is faster but not thread-safe.
#[cfg(feature = "arc")]
pub type ReferenceCounter<T> = std::sync::Arc<T>;

/// Reference-counted smart pointer type holding tree nodes.
///
/// When the `arc` feature is enabled, this is `std::sync::Arc`,
/// which is thread-safe but has slightly higher overhead.
///
/// When the `arc` feature is disabled (default), this is `std::rc::Rc`,
/// which is faster but not thread-safe.
#[cfg(not(feature = "arc"))]
pub type ReferenceCounter<T> = std::rc::Rc<T>;

mod avl_map;
mod avl_tree;
mod comparator;
mod invariant;

pub use avl_map::AvlMap;
pub use avl_map::AvlMapIntoIterator;
pub use avl_map::AvlMapIterator;
pub use avl_tree::AvlTree;
pub use avl_tree::Branch;
pub use avl_tree::Iter;
pub use avl_tree::LeafEntry;
pub use comparator::Comparator;
pub use comparator::NaturalOrder;
pub use comparator::ReverseOrder;
pub use invariant::InvariantViolation;

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod reference_counter_tests {
    use super::ReferenceCounter;
    use rstest::rstest;

    #[rstest]
    fn test_reference_counter_clone() {
        let reference_counter: ReferenceCounter<i32> = ReferenceCounter::new(42);
        let reference_counter_clone = reference_counter.clone();
        assert_eq!(*reference_counter, *reference_counter_clone);
    }

    #[rstest]
    fn test_reference_counter_strong_count() {
        let reference_counter: ReferenceCounter<i32> = ReferenceCounter::new(42);
        assert_eq!(ReferenceCounter::strong_count(&reference_counter), 1);
        let reference_counter_clone = reference_counter.clone();
        assert_eq!(ReferenceCounter::strong_count(&reference_counter), 2);
        drop(reference_counter_clone);
        assert_eq!(ReferenceCounter::strong_count(&reference_counter), 1);
    }
}
