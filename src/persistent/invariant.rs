//! Structural invariant checking for [`AvlTree`].
//!
//! The checker walks the whole tree once, so it belongs in tests and
//! debugging sessions, not on hot paths. A violation always means a defect in
//! the tree code (or a comparator that is not a total order), never a
//! condition to recover from.

use super::avl_tree::AvlTree;
use super::comparator::Comparator;
use std::cmp;
use std::fmt;

// =============================================================================
// InvariantViolation
// =============================================================================

/// The first broken invariant found by [`AvlTree::invariant`], with the key
/// of the node where it was detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation<K> {
    /// An entry does not compare strictly greater than its in-order
    /// predecessor. Also reports duplicate keys.
    Ordering {
        /// Key of the offending entry.
        key: K,
        /// Key visited just before it.
        predecessor: K,
    },
    /// The children of a node differ in height by more than one.
    Balance {
        /// Key of the unbalanced node.
        key: K,
        /// Measured height of the left subtree.
        left_height: usize,
        /// Measured height of the right subtree.
        right_height: usize,
    },
    /// The cached height of a node disagrees with its children.
    Height {
        /// Key of the node.
        key: K,
        /// Height stored in the node.
        stored: usize,
        /// One more than the taller measured child.
        expected: usize,
    },
    /// A node with two empty children was not collapsed into a leaf.
    CanonicalShape {
        /// Key of the node.
        key: K,
    },
}

impl<K> InvariantViolation<K> {
    /// Returns the key of the node where the violation was detected.
    pub const fn key(&self) -> &K {
        match self {
            Self::Ordering { key, .. }
            | Self::Balance { key, .. }
            | Self::Height { key, .. }
            | Self::CanonicalShape { key } => key,
        }
    }
}

impl<K: fmt::Debug> fmt::Display for InvariantViolation<K> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ordering { key, predecessor } => write!(
                formatter,
                "ordering violated at key {key:?}: preceded by {predecessor:?}"
            ),
            Self::Balance {
                key,
                left_height,
                right_height,
            } => write!(
                formatter,
                "balance violated at key {key:?}: left height {left_height}, right height {right_height}"
            ),
            Self::Height {
                key,
                stored,
                expected,
            } => write!(
                formatter,
                "height cache violated at key {key:?}: stored {stored}, expected {expected}"
            ),
            Self::CanonicalShape { key } => write!(
                formatter,
                "canonical shape violated at key {key:?}: node with two empty children"
            ),
        }
    }
}

impl<K: fmt::Debug> std::error::Error for InvariantViolation<K> {}

// =============================================================================
// Checker
// =============================================================================

/// What a checked subtree reports to its parent.
struct Checked<'a, K> {
    height: usize,
    /// Greatest key seen so far in the in-order walk.
    greatest: Option<&'a K>,
}

impl<K: Clone, V> AvlTree<K, V> {
    /// Verifies every structural invariant of the tree under `compare`:
    /// ordering (including key uniqueness), balance, cached heights and the
    /// canonical leaf shape.
    ///
    /// # Errors
    ///
    /// Returns the first violation found by an in-order walk.
    ///
    /// # Complexity
    ///
    /// O(N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_avl::persistent::{AvlTree, NaturalOrder, ReverseOrder};
    ///
    /// let (tree, _) = AvlTree::empty().add(1, (), &NaturalOrder, true);
    /// let (tree, _) = tree.add(2, (), &NaturalOrder, true);
    ///
    /// assert!(tree.invariant(&NaturalOrder).is_ok());
    /// assert!(tree.invariant(&ReverseOrder).is_err());
    /// ```
    pub fn invariant<C>(&self, compare: &C) -> Result<(), InvariantViolation<K>>
    where
        C: Comparator<K> + ?Sized,
    {
        check_subtree(self, None, compare).map(|_| ())
    }

    /// Panics with a description of the first violated invariant, if any.
    ///
    /// # Panics
    ///
    /// Panics if [`invariant`](Self::invariant) reports a violation.
    pub fn assert_invariant<C>(&self, compare: &C)
    where
        K: fmt::Debug,
        C: Comparator<K> + ?Sized,
    {
        if let Err(violation) = self.invariant(compare) {
            #[cfg(feature = "tracing")]
            tracing::error!(%violation, "AVL tree invariant violated");
            panic!("AVL tree invariant violated: {violation}");
        }
    }
}

fn check_subtree<'a, K, V, C>(
    tree: &'a AvlTree<K, V>,
    greatest: Option<&'a K>,
    compare: &C,
) -> Result<Checked<'a, K>, InvariantViolation<K>>
where
    K: Clone,
    C: Comparator<K> + ?Sized,
{
    match tree {
        AvlTree::Empty => Ok(Checked {
            height: 0,
            greatest,
        }),
        AvlTree::Leaf(leaf) => {
            check_order(leaf.key(), greatest, compare)?;
            Ok(Checked {
                height: 1,
                greatest: Some(leaf.key()),
            })
        }
        AvlTree::Node(branch) => {
            let key = branch.key();
            if branch.left().is_empty() && branch.right().is_empty() {
                return Err(InvariantViolation::CanonicalShape { key: key.clone() });
            }

            let left = check_subtree(branch.left(), greatest, compare)?;
            check_order(key, left.greatest, compare)?;
            let right = check_subtree(branch.right(), Some(key), compare)?;

            let expected = 1 + left.height.max(right.height);
            if branch.height() != expected {
                return Err(InvariantViolation::Height {
                    key: key.clone(),
                    stored: branch.height(),
                    expected,
                });
            }
            if left.height.abs_diff(right.height) > 1 {
                return Err(InvariantViolation::Balance {
                    key: key.clone(),
                    left_height: left.height,
                    right_height: right.height,
                });
            }

            Ok(Checked {
                height: expected,
                greatest: right.greatest,
            })
        }
    }
}

fn check_order<K, C>(
    key: &K,
    predecessor: Option<&K>,
    compare: &C,
) -> Result<(), InvariantViolation<K>>
where
    K: Clone,
    C: Comparator<K> + ?Sized,
{
    match predecessor {
        Some(predecessor) if compare.compare(predecessor, key) != cmp::Ordering::Less => {
            Err(InvariantViolation::Ordering {
                key: key.clone(),
                predecessor: predecessor.clone(),
            })
        }
        _ => Ok(()),
    }
}

// =============================================================================
// Tests
// =============================================================================
