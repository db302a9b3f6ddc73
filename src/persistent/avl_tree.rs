//! Persistent (immutable) AVL tree with per-call comparators.
//!
//! This module provides [`AvlTree`], a height-balanced binary search tree
//! that uses structural sharing for efficient operations.
//!
//! # Overview
//!
//! - O(log N) `find` / `mem` / `find_and_call`
//! - O(log N) `add` (insert-if-absent or insert-or-replace)
//! - O(log N) `remove`
//! - O(log N) `first` / `last`
//! - O(N) ordered traversal (`iter`, `for_each`, `fold`)
//!
//! The key ordering is not part of the tree type. Every operation receives a
//! [`Comparator`], and a tree must always be used with the comparator it was
//! built with.
//!
//! # Examples
//!
//! ```rust
//! use persistent_avl::persistent::{AvlTree, NaturalOrder};
//!
//! let (tree, _) = AvlTree::empty().add(3, "three", &NaturalOrder, true);
//! let (tree, _) = tree.add(1, "one", &NaturalOrder, true);
//! let (tree, added) = tree.add(2, "two", &NaturalOrder, true);
//! assert!(added);
//!
//! let keys: Vec<&i32> = tree.iter().map(|(key, _)| key).collect();
//! assert_eq!(keys, vec![&1, &2, &3]);
//!
//! let (smaller, removed) = tree.remove(&2, &NaturalOrder);
//! assert!(removed);
//! assert_eq!(tree.len(), 3);    // Original unchanged
//! assert_eq!(smaller.len(), 2); // New version
//! ```
//!
//! # Internal Structure
//!
//! A tree is `Empty`, a childless `Leaf`, or a `Node` with a cached height.
//! The following invariants hold after every operation:
//! 1. Keys in a left subtree compare less than the node key, keys in a right
//!    subtree compare greater
//! 2. The heights of two sibling subtrees differ by at most one
//! 3. A node's cached height is one more than its taller child
//! 4. An entry without children is always a `Leaf`, never a `Node`
//! 5. No key appears twice
//!
//! [`AvlTree::invariant`] verifies all of them.

use super::ReferenceCounter;
use super::comparator::Comparator;
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::fmt;
use std::iter::FusedIterator;

/// Inline capacity of the iterator's spine stack.
///
/// An AVL tree of height 32 holds millions of entries, so iteration almost
/// never spills to the heap.
const ITERATOR_STACK_CAPACITY: usize = 32;

// =============================================================================
// Node Definitions
// =============================================================================

/// An entry of an [`AvlTree`] without children. Its height is 1.
pub struct LeafEntry<K, V> {
    key: K,
    value: V,
}

impl<K, V> LeafEntry<K, V> {
    /// Returns the key of this entry.
    #[inline]
    pub const fn key(&self) -> &K {
        &self.key
    }

    /// Returns the value of this entry.
    #[inline]
    pub const fn value(&self) -> &V {
        &self.value
    }
}

/// An internal node of an [`AvlTree`] with at least one non-empty child.
pub struct Branch<K, V> {
    left: AvlTree<K, V>,
    key: K,
    value: V,
    height: usize,
    right: AvlTree<K, V>,
}

impl<K, V> Branch<K, V> {
    /// Returns the subtree holding the keys less than this node's key.
    #[inline]
    pub const fn left(&self) -> &AvlTree<K, V> {
        &self.left
    }

    /// Returns the key of this node.
    #[inline]
    pub const fn key(&self) -> &K {
        &self.key
    }

    /// Returns the value of this node.
    #[inline]
    pub const fn value(&self) -> &V {
        &self.value
    }

    /// Returns the cached height of this node.
    #[inline]
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Returns the subtree holding the keys greater than this node's key.
    #[inline]
    pub const fn right(&self) -> &AvlTree<K, V> {
        &self.right
    }
}

// =============================================================================
// AvlTree Definition
// =============================================================================

/// A persistent (immutable) AVL tree mapping keys to values.
///
/// Nodes are never modified after construction. Operations that change the
/// tree return a new root which shares every untouched subtree with the
/// original, so cloning a tree or keeping old versions is cheap.
///
/// # Time Complexity
///
/// | Operation       | Complexity |
/// |-----------------|------------|
/// | `empty`         | O(1)       |
/// | `find` / `mem`  | O(log N)   |
/// | `find_and_call` | O(log N)   |
/// | `add`           | O(log N)   |
/// | `remove`        | O(log N)   |
/// | `first`/`last`  | O(log N)   |
/// | `iter` / `fold` | O(N)       |
/// | `len`           | O(N)       |
/// | `invariant`     | O(N)       |
///
/// # Examples
///
/// ```rust
/// use persistent_avl::persistent::{AvlTree, NaturalOrder};
///
/// let (tree, _) = AvlTree::empty().add(1, "a", &NaturalOrder, true);
/// let (tree, _) = tree.add(2, "b", &NaturalOrder, true);
/// let (tree, _) = tree.add(3, "c", &NaturalOrder, true);
///
/// // Ascending insertion is rebalanced instead of forming a chain
/// assert_eq!(tree.height(), 2);
/// assert_eq!(tree.root_entry(), Some((&2, &"b")));
/// ```
pub enum AvlTree<K, V> {
    /// The empty tree. Its height is 0.
    Empty,
    /// A single entry without children.
    Leaf(ReferenceCounter<LeafEntry<K, V>>),
    /// An entry with at least one non-empty child.
    Node(ReferenceCounter<Branch<K, V>>),
}

/// Result of the recursive insertion step.
enum Insertion<K, V> {
    /// A new entry was added.
    Added(AvlTree<K, V>),
    /// An existing entry was overwritten.
    Replaced(AvlTree<K, V>),
    /// The key was present and replacement was not requested.
    Unchanged,
}

impl<K, V> Insertion<K, V> {
    fn map<F>(self, rebuild: F) -> Self
    where
        F: FnOnce(AvlTree<K, V>) -> AvlTree<K, V>,
    {
        match self {
            Self::Added(tree) => Self::Added(rebuild(tree)),
            Self::Replaced(tree) => Self::Replaced(rebuild(tree)),
            Self::Unchanged => Self::Unchanged,
        }
    }
}

impl<K, V> AvlTree<K, V> {
    /// Returns the empty tree.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_avl::persistent::AvlTree;
    ///
    /// let tree: AvlTree<i32, String> = AvlTree::empty();
    /// assert!(tree.is_empty());
    /// assert_eq!(tree.height(), 0);
    /// ```
    #[inline]
    #[must_use]
    pub const fn empty() -> Self {
        Self::Empty
    }

    /// Returns `true` if the tree contains no entries.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Returns the height of the tree: 0 for `Empty`, 1 for a `Leaf`.
    #[inline]
    #[must_use]
    pub fn height(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Leaf(_) => 1,
            Self::Node(node) => node.height,
        }
    }

    /// Returns the number of entries in the tree.
    ///
    /// # Complexity
    ///
    /// O(N). The tree does not cache its size.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fold(0, |_, _, count| count + 1)
    }

    /// Returns the entry stored at the root of the tree.
    #[must_use]
    pub fn root_entry(&self) -> Option<(&K, &V)> {
        match self {
            Self::Empty => None,
            Self::Leaf(leaf) => Some((&leaf.key, &leaf.value)),
            Self::Node(node) => Some((&node.key, &node.value)),
        }
    }

    /// Returns `true` if both trees are the very same version, i.e. their
    /// roots are the same allocation (or both are empty).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_avl::persistent::{AvlTree, NaturalOrder};
    ///
    /// let (tree, _) = AvlTree::empty().add(1, "one", &NaturalOrder, true);
    /// let (same, added) = tree.add(1, "uno", &NaturalOrder, false);
    /// assert!(!added);
    /// assert!(tree.ptr_eq(&same));
    /// ```
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Empty, Self::Empty) => true,
            (Self::Leaf(left), Self::Leaf(right)) => ReferenceCounter::ptr_eq(left, right),
            (Self::Node(left), Self::Node(right)) => ReferenceCounter::ptr_eq(left, right),
            _ => false,
        }
    }

    /// Returns `true` if the tree holds a key equal to `key` under `compare`.
    ///
    /// # Complexity
    ///
    /// O(log N)
    #[must_use]
    pub fn mem<C>(&self, key: &K, compare: &C) -> bool
    where
        C: Comparator<K> + ?Sized,
    {
        self.find(key, compare).is_some()
    }

    /// Returns the value stored under a key equal to `key` under `compare`.
    ///
    /// # Complexity
    ///
    /// O(log N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_avl::persistent::{AvlTree, NaturalOrder};
    ///
    /// let (tree, _) = AvlTree::empty().add("key", 42, &NaturalOrder, true);
    /// assert_eq!(tree.find(&"key", &NaturalOrder), Some(&42));
    /// assert_eq!(tree.find(&"other", &NaturalOrder), None);
    /// ```
    #[must_use]
    pub fn find<C>(&self, key: &K, compare: &C) -> Option<&V>
    where
        C: Comparator<K> + ?Sized,
    {
        self.search(key, compare, Some, || None)
    }

    /// Looks `key` up and passes the outcome straight to one of two
    /// continuations: `if_found` with the stored value, or `if_not_found`
    /// with the probe key.
    ///
    /// Behaves exactly like matching on [`find`](Self::find).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_avl::persistent::{AvlTree, NaturalOrder};
    ///
    /// let (tree, _) = AvlTree::empty().add(1, 10, &NaturalOrder, true);
    ///
    /// let describe = |key: i32| {
    ///     tree.find_and_call(
    ///         &key,
    ///         &NaturalOrder,
    ///         |value| format!("found {value}"),
    ///         |missing| format!("no entry for {missing}"),
    ///     )
    /// };
    /// assert_eq!(describe(1), "found 10");
    /// assert_eq!(describe(2), "no entry for 2");
    /// ```
    pub fn find_and_call<C, R, F, N>(
        &self,
        key: &K,
        compare: &C,
        if_found: F,
        if_not_found: N,
    ) -> R
    where
        C: Comparator<K> + ?Sized,
        F: FnOnce(&V) -> R,
        N: FnOnce(&K) -> R,
    {
        self.search(key, compare, if_found, || if_not_found(key))
    }

    /// Descends along the comparator path and dispatches on the outcome.
    fn search<'a, C, R, F, N>(&'a self, key: &K, compare: &C, found: F, missing: N) -> R
    where
        C: Comparator<K> + ?Sized,
        F: FnOnce(&'a V) -> R,
        N: FnOnce() -> R,
    {
        let mut current = self;
        loop {
            match current {
                Self::Empty => return missing(),
                Self::Leaf(leaf) => {
                    return if compare.compare(key, &leaf.key) == Ordering::Equal {
                        found(&leaf.value)
                    } else {
                        missing()
                    };
                }
                Self::Node(node) => match compare.compare(key, &node.key) {
                    Ordering::Less => current = &node.left,
                    Ordering::Greater => current = &node.right,
                    Ordering::Equal => return found(&node.value),
                },
            }
        }
    }

    /// Returns the entry with the minimum key.
    ///
    /// # Complexity
    ///
    /// O(log N)
    #[must_use]
    pub fn first(&self) -> Option<(&K, &V)> {
        let mut current = self;
        loop {
            match current {
                Self::Empty => return None,
                Self::Leaf(leaf) => return Some((&leaf.key, &leaf.value)),
                Self::Node(node) => {
                    if node.left.is_empty() {
                        return Some((&node.key, &node.value));
                    }
                    current = &node.left;
                }
            }
        }
    }

    /// Returns the entry with the maximum key.
    ///
    /// # Complexity
    ///
    /// O(log N)
    #[must_use]
    pub fn last(&self) -> Option<(&K, &V)> {
        let mut current = self;
        loop {
            match current {
                Self::Empty => return None,
                Self::Leaf(leaf) => return Some((&leaf.key, &leaf.value)),
                Self::Node(node) => {
                    if node.right.is_empty() {
                        return Some((&node.key, &node.value));
                    }
                    current = &node.right;
                }
            }
        }
    }

    /// Calls `action` on every entry in ascending key order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_avl::persistent::{AvlTree, NaturalOrder};
    ///
    /// let (tree, _) = AvlTree::empty().add(2, 'b', &NaturalOrder, true);
    /// let (tree, _) = tree.add(1, 'a', &NaturalOrder, true);
    ///
    /// let mut visited = String::new();
    /// tree.for_each(|_, value| visited.push(*value));
    /// assert_eq!(visited, "ab");
    /// ```
    pub fn for_each<F>(&self, mut action: F)
    where
        F: FnMut(&K, &V),
    {
        self.for_each_in_order(&mut action);
    }

    fn for_each_in_order<F>(&self, action: &mut F)
    where
        F: FnMut(&K, &V),
    {
        match self {
            Self::Empty => {}
            Self::Leaf(leaf) => action(&leaf.key, &leaf.value),
            Self::Node(node) => {
                node.left.for_each_in_order(action);
                action(&node.key, &node.value);
                node.right.for_each_in_order(action);
            }
        }
    }

    /// Threads an accumulator through the entries in ascending key order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_avl::persistent::{AvlTree, NaturalOrder};
    ///
    /// let (tree, _) = AvlTree::empty().add(1, 10, &NaturalOrder, true);
    /// let (tree, _) = tree.add(2, 20, &NaturalOrder, true);
    ///
    /// let sum = tree.fold(0, |_, value, accumulator| accumulator + value);
    /// assert_eq!(sum, 30);
    /// ```
    pub fn fold<B, F>(&self, init: B, mut function: F) -> B
    where
        F: FnMut(&K, &V, B) -> B,
    {
        self.fold_in_order(init, &mut function)
    }

    fn fold_in_order<B, F>(&self, accumulator: B, function: &mut F) -> B
    where
        F: FnMut(&K, &V, B) -> B,
    {
        match self {
            Self::Empty => accumulator,
            Self::Leaf(leaf) => function(&leaf.key, &leaf.value, accumulator),
            Self::Node(node) => {
                let accumulator = node.left.fold_in_order(accumulator, function);
                let accumulator = function(&node.key, &node.value, accumulator);
                node.right.fold_in_order(accumulator, function)
            }
        }
    }

    /// Returns a lazy iterator over the entries in ascending key order.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self)
    }

    /// Builds a leaf.
    fn leaf(key: K, value: V) -> Self {
        Self::Leaf(ReferenceCounter::new(LeafEntry { key, value }))
    }

    /// Builds a node over two subtrees, collapsing to a `Leaf` when both are
    /// empty. The height is recomputed from the children.
    fn create(left: Self, key: K, value: V, right: Self) -> Self {
        if left.is_empty() && right.is_empty() {
            return Self::leaf(key, value);
        }
        let height = 1 + left.height().max(right.height());
        Self::Node(ReferenceCounter::new(Branch {
            left,
            key,
            value,
            height,
            right,
        }))
    }

    /// Builds a node without normalizing it, for feeding broken trees to the
    /// invariant checker.
    #[cfg(test)]
    pub(crate) fn raw_node(left: Self, key: K, value: V, height: usize, right: Self) -> Self {
        Self::Node(ReferenceCounter::new(Branch {
            left,
            key,
            value,
            height,
            right,
        }))
    }

    #[cfg(test)]
    pub(crate) fn raw_leaf(key: K, value: V) -> Self {
        Self::leaf(key, value)
    }
}

impl<K: Clone, V: Clone> AvlTree<K, V> {
    /// Inserts `key -> value`.
    ///
    /// Returns the new tree and `true` if the key was absent. When the key is
    /// already present, `replace` decides the outcome: `true` overwrites the
    /// stored key and value (the shape of the tree does not change), `false`
    /// returns the original tree itself. Either way the flag is `false`.
    ///
    /// # Complexity
    ///
    /// O(log N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_avl::persistent::{AvlTree, NaturalOrder};
    ///
    /// let (tree, added) = AvlTree::empty().add(1, "one", &NaturalOrder, true);
    /// assert!(added);
    ///
    /// let (kept, added) = tree.add(1, "ONE", &NaturalOrder, false);
    /// assert!(!added);
    /// assert_eq!(kept.find(&1, &NaturalOrder), Some(&"one"));
    ///
    /// let (replaced, added) = tree.add(1, "ONE", &NaturalOrder, true);
    /// assert!(!added);
    /// assert_eq!(replaced.find(&1, &NaturalOrder), Some(&"ONE"));
    /// assert_eq!(tree.find(&1, &NaturalOrder), Some(&"one")); // Original unchanged
    /// ```
    #[must_use]
    pub fn add<C>(&self, key: K, value: V, compare: &C, replace: bool) -> (Self, bool)
    where
        C: Comparator<K> + ?Sized,
    {
        match self.insert_into_node(key, value, compare, replace) {
            Insertion::Added(tree) => (tree, true),
            Insertion::Replaced(tree) => (tree, false),
            Insertion::Unchanged => (self.clone(), false),
        }
    }

    /// Recursive helper for add.
    fn insert_into_node<C>(&self, key: K, value: V, compare: &C, replace: bool) -> Insertion<K, V>
    where
        C: Comparator<K> + ?Sized,
    {
        match self {
            Self::Empty => Insertion::Added(Self::leaf(key, value)),
            Self::Leaf(leaf) => match compare.compare(&key, &leaf.key) {
                Ordering::Less => Insertion::Added(Self::create(
                    Self::leaf(key, value),
                    leaf.key.clone(),
                    leaf.value.clone(),
                    Self::Empty,
                )),
                Ordering::Greater => Insertion::Added(Self::create(
                    Self::Empty,
                    leaf.key.clone(),
                    leaf.value.clone(),
                    Self::leaf(key, value),
                )),
                Ordering::Equal if replace => Insertion::Replaced(Self::leaf(key, value)),
                Ordering::Equal => Insertion::Unchanged,
            },
            Self::Node(node) => match compare.compare(&key, &node.key) {
                Ordering::Less => node
                    .left
                    .insert_into_node(key, value, compare, replace)
                    .map(|left| {
                        Self::balance(left, node.key.clone(), node.value.clone(), node.right.clone())
                    }),
                Ordering::Greater => node
                    .right
                    .insert_into_node(key, value, compare, replace)
                    .map(|right| {
                        Self::balance(node.left.clone(), node.key.clone(), node.value.clone(), right)
                    }),
                Ordering::Equal if replace => {
                    Insertion::Replaced(Self::Node(ReferenceCounter::new(Branch {
                        left: node.left.clone(),
                        key,
                        value,
                        height: node.height,
                        right: node.right.clone(),
                    })))
                }
                Ordering::Equal => Insertion::Unchanged,
            },
        }
    }

    /// Removes the entry whose key equals `key` under `compare`.
    ///
    /// Returns the new tree and `true` if the key was present. Removing an
    /// absent key returns the original tree itself and `false`.
    ///
    /// # Complexity
    ///
    /// O(log N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_avl::persistent::{AvlTree, NaturalOrder};
    ///
    /// let (tree, _) = AvlTree::empty().add(1, "one", &NaturalOrder, true);
    /// let (tree, _) = tree.add(2, "two", &NaturalOrder, true);
    ///
    /// let (removed, was_present) = tree.remove(&1, &NaturalOrder);
    /// assert!(was_present);
    /// assert_eq!(removed.find(&1, &NaturalOrder), None);
    ///
    /// let (same, was_present) = removed.remove(&1, &NaturalOrder);
    /// assert!(!was_present);
    /// assert!(same.ptr_eq(&removed));
    /// ```
    #[must_use]
    pub fn remove<C>(&self, key: &K, compare: &C) -> (Self, bool)
    where
        C: Comparator<K> + ?Sized,
    {
        self.remove_from_node(key, compare)
            .map_or_else(|| (self.clone(), false), |tree| (tree, true))
    }

    /// Recursive helper for remove. `None` means the key was not found.
    fn remove_from_node<C>(&self, key: &K, compare: &C) -> Option<Self>
    where
        C: Comparator<K> + ?Sized,
    {
        match self {
            Self::Empty => None,
            Self::Leaf(leaf) => {
                (compare.compare(key, &leaf.key) == Ordering::Equal).then_some(Self::Empty)
            }
            Self::Node(node) => match compare.compare(key, &node.key) {
                Ordering::Less => node.left.remove_from_node(key, compare).map(|left| {
                    Self::balance(left, node.key.clone(), node.value.clone(), node.right.clone())
                }),
                Ordering::Greater => node.right.remove_from_node(key, compare).map(|right| {
                    Self::balance(node.left.clone(), node.key.clone(), node.value.clone(), right)
                }),
                Ordering::Equal => Some(Self::join(&node.left, &node.right)),
            },
        }
    }

    /// Joins two balanced siblings whose keys are all ordered left before
    /// right, lifting the minimum of `right` (the successor) to the top.
    fn join(left: &Self, right: &Self) -> Self {
        match (left, right) {
            (Self::Empty, tree) | (tree, Self::Empty) => tree.clone(),
            _ => match right.remove_min() {
                Some((rest, key, value)) => Self::balance(left.clone(), key, value, rest),
                None => left.clone(),
            },
        }
    }

    /// Splits off the minimum entry, returning the remaining tree.
    fn remove_min(&self) -> Option<(Self, K, V)> {
        match self {
            Self::Empty => None,
            Self::Leaf(leaf) => Some((Self::Empty, leaf.key.clone(), leaf.value.clone())),
            Self::Node(node) => match node.left.remove_min() {
                None => Some((node.right.clone(), node.key.clone(), node.value.clone())),
                Some((left, key, value)) => Some((
                    Self::balance(left, node.key.clone(), node.value.clone(), node.right.clone()),
                    key,
                    value,
                )),
            },
        }
    }

    /// Returns the children and entry of a non-empty tree.
    fn parts(&self) -> Option<(Self, K, V, Self)> {
        match self {
            Self::Empty => None,
            Self::Leaf(leaf) => Some((Self::Empty, leaf.key.clone(), leaf.value.clone(), Self::Empty)),
            Self::Node(node) => Some((
                node.left.clone(),
                node.key.clone(),
                node.value.clone(),
                node.right.clone(),
            )),
        }
    }

    /// Builds a node from two subtrees whose heights differ by at most two,
    /// rotating when they differ by exactly two.
    ///
    /// The four cases:
    /// - Left-Left: single right rotation
    /// - Left-Right: left rotation on the left child, then right rotation
    /// - Right-Right: single left rotation
    /// - Right-Left: right rotation on the right child, then left rotation
    fn balance(left: Self, key: K, value: V, right: Self) -> Self {
        let left_height = left.height();
        let right_height = right.height();

        if left_height > right_height + 1 {
            if let Some((left_left, left_key, left_value, left_right)) = left.parts() {
                if left_left.height() >= left_right.height() {
                    return Self::create(
                        left_left,
                        left_key,
                        left_value,
                        Self::create(left_right, key, value, right),
                    );
                }
                if let Some((inner_left, inner_key, inner_value, inner_right)) =
                    left_right.parts()
                {
                    return Self::create(
                        Self::create(left_left, left_key, left_value, inner_left),
                        inner_key,
                        inner_value,
                        Self::create(inner_right, key, value, right),
                    );
                }
            }
        } else if right_height > left_height + 1
            && let Some((right_left, right_key, right_value, right_right)) = right.parts()
        {
            if right_right.height() >= right_left.height() {
                return Self::create(
                    Self::create(left, key, value, right_left),
                    right_key,
                    right_value,
                    right_right,
                );
            }
            if let Some((inner_left, inner_key, inner_value, inner_right)) = right_left.parts() {
                return Self::create(
                    Self::create(left, key, value, inner_left),
                    inner_key,
                    inner_value,
                    Self::create(inner_right, right_key, right_value, right_right),
                );
            }
        }

        Self::create(left, key, value, right)
    }
}

// =============================================================================
// Iterator Implementation
// =============================================================================

/// An iterator over the entries of an [`AvlTree`] in ascending key order.
///
/// Created by [`AvlTree::iter`].
pub struct Iter<'a, K, V> {
    /// Subtrees whose root entry has not been yielded yet, deepest on top.
    stack: SmallVec<[&'a AvlTree<K, V>; ITERATOR_STACK_CAPACITY]>,
}

impl<'a, K, V> Iter<'a, K, V> {
    fn new(root: &'a AvlTree<K, V>) -> Self {
        let mut iterator = Self {
            stack: SmallVec::new(),
        };
        iterator.push_left_spine(root);
        iterator
    }

    fn push_left_spine(&mut self, mut tree: &'a AvlTree<K, V>) {
        loop {
            match tree {
                AvlTree::Empty => return,
                AvlTree::Leaf(_) => {
                    self.stack.push(tree);
                    return;
                }
                AvlTree::Node(node) => {
                    self.stack.push(tree);
                    tree = &node.left;
                }
            }
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        match self.stack.pop()? {
            AvlTree::Empty => None,
            AvlTree::Leaf(leaf) => Some((&leaf.key, &leaf.value)),
            AvlTree::Node(node) => {
                self.push_left_spine(&node.right);
                Some((&node.key, &node.value))
            }
        }
    }
}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            stack: self.stack.clone(),
        }
    }
}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl<K, V> Clone for AvlTree<K, V> {
    /// Clones the root pointer; no node is copied.
    fn clone(&self) -> Self {
        match self {
            Self::Empty => Self::Empty,
            Self::Leaf(leaf) => Self::Leaf(ReferenceCounter::clone(leaf)),
            Self::Node(node) => Self::Node(ReferenceCounter::clone(node)),
        }
    }
}

impl<K, V> Default for AvlTree<K, V> {
    #[inline]
    fn default() -> Self {
        Self::Empty
    }
}

impl<'a, K, V> IntoIterator for &'a AvlTree<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Structural equality: same shape, same cached heights, equal keys and
/// values. Shared subtrees are compared by pointer first.
impl<K: PartialEq, V: PartialEq> PartialEq for AvlTree<K, V> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Empty, Self::Empty) => true,
            (Self::Leaf(left), Self::Leaf(right)) => {
                ReferenceCounter::ptr_eq(left, right)
                    || (left.key == right.key && left.value == right.value)
            }
            (Self::Node(left), Self::Node(right)) => {
                ReferenceCounter::ptr_eq(left, right)
                    || (left.height == right.height
                        && left.key == right.key
                        && left.value == right.value
                        && left.left == right.left
                        && left.right == right.right)
            }
            _ => false,
        }
    }
}

impl<K: Eq, V: Eq> Eq for AvlTree<K, V> {}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for AvlTree<K, V> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_map().entries(self.iter()).finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistent::{NaturalOrder, ReverseOrder};
    use rstest::rstest;

    fn tree_of(keys: &[i32]) -> AvlTree<i32, i32> {
        keys.iter().fold(AvlTree::empty(), |tree, &key| {
            tree.add(key, key * 10, &NaturalOrder, true).0
        })
    }

    fn keys_of(tree: &AvlTree<i32, i32>) -> Vec<i32> {
        tree.iter().map(|(key, _)| *key).collect()
    }

    fn assert_leaf(tree: &AvlTree<i32, i32>, expected_key: i32) {
        match tree {
            AvlTree::Leaf(leaf) => assert_eq!(leaf.key, expected_key),
            _ => panic!("expected a leaf holding {expected_key}"),
        }
    }

    // =========================================================================
    // Construction Tests
    // =========================================================================

    #[rstest]
    fn test_empty_has_height_zero() {
        let tree: AvlTree<i32, i32> = AvlTree::empty();
        assert!(tree.is_empty());
        assert_eq!(tree.height(), 0);
        assert_eq!(tree.len(), 0);
        assert_eq!(tree.root_entry(), None);
    }

    #[rstest]
    fn test_add_to_empty_builds_leaf() {
        let tree = tree_of(&[5]);
        assert_leaf(&tree, 5);
        assert_eq!(tree.height(), 1);
    }

    #[rstest]
    fn test_add_to_leaf_builds_node_with_one_child() {
        let tree = tree_of(&[5, 3]);
        match &tree {
            AvlTree::Node(node) => {
                assert_eq!(node.key, 5);
                assert_eq!(node.height, 2);
                assert_leaf(&node.left, 3);
                assert!(node.right.is_empty());
            }
            _ => panic!("expected a node"),
        }
    }

    // =========================================================================
    // Rotation Tests
    // =========================================================================

    #[rstest]
    #[case::right_right(&[1, 2, 3])]
    #[case::left_left(&[3, 2, 1])]
    #[case::left_right(&[3, 1, 2])]
    #[case::right_left(&[1, 3, 2])]
    fn test_three_insertions_rotate_into_balanced_shape(#[case] keys: &[i32]) {
        let tree = tree_of(keys);
        match &tree {
            AvlTree::Node(node) => {
                assert_eq!(node.key, 2);
                assert_eq!(node.height, 2);
                assert_leaf(&node.left, 1);
                assert_leaf(&node.right, 3);
            }
            _ => panic!("expected a node"),
        }
        tree.assert_invariant(&NaturalOrder);
    }

    #[rstest]
    fn test_ascending_insertions_build_perfect_tree() {
        let tree = tree_of(&[1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(tree.height(), 3);
        assert_eq!(tree.root_entry(), Some((&4, &40)));
        tree.assert_invariant(&NaturalOrder);
    }

    #[rstest]
    fn test_remove_rebalances_ancestors() {
        let tree = tree_of(&[2, 1, 3, 4]);
        assert_eq!(tree.height(), 3);

        let (tree, removed) = tree.remove(&1, &NaturalOrder);
        assert!(removed);
        assert_eq!(tree.height(), 2);
        assert_eq!(keys_of(&tree), vec![2, 3, 4]);
        tree.assert_invariant(&NaturalOrder);
    }

    #[rstest]
    fn test_remove_collapses_single_entry_node_to_leaf() {
        let tree = tree_of(&[2, 1, 3]);
        let (tree, _) = tree.remove(&1, &NaturalOrder);
        let (tree, _) = tree.remove(&3, &NaturalOrder);
        assert_leaf(&tree, 2);
    }

    #[rstest]
    fn test_remove_node_with_two_children() {
        let tree = tree_of(&[1, 2, 3, 4, 5, 6, 7]);
        let (tree, removed) = tree.remove(&4, &NaturalOrder);
        assert!(removed);
        assert_eq!(keys_of(&tree), vec![1, 2, 3, 5, 6, 7]);
        tree.assert_invariant(&NaturalOrder);
    }

    // =========================================================================
    // Structural Sharing Tests
    // =========================================================================

    #[rstest]
    fn test_add_shares_untouched_subtree() {
        let tree = tree_of(&[1, 2, 3, 4, 5, 6, 7]);
        let (updated, added) = tree.add(8, 80, &NaturalOrder, true);
        assert!(added);

        match (&tree, &updated) {
            (AvlTree::Node(before), AvlTree::Node(after)) => {
                assert!(before.left.ptr_eq(&after.left));
                assert!(!before.right.ptr_eq(&after.right));
            }
            _ => panic!("expected nodes"),
        }
    }

    #[rstest]
    fn test_remove_shares_untouched_subtree() {
        let tree = tree_of(&[1, 2, 3, 4, 5, 6, 7]);
        let (updated, _) = tree.remove(&1, &NaturalOrder);

        match (&tree, &updated) {
            (AvlTree::Node(before), AvlTree::Node(after)) => {
                assert!(before.right.ptr_eq(&after.right));
            }
            _ => panic!("expected nodes"),
        }
    }

    #[rstest]
    fn test_replace_keeps_shape_and_shares_children() {
        let tree = tree_of(&[1, 2, 3]);
        let (updated, added) = tree.add(2, 99, &NaturalOrder, true);
        assert!(!added);

        match (&tree, &updated) {
            (AvlTree::Node(before), AvlTree::Node(after)) => {
                assert_eq!(after.value, 99);
                assert_eq!(before.height, after.height);
                assert!(before.left.ptr_eq(&after.left));
                assert!(before.right.ptr_eq(&after.right));
            }
            _ => panic!("expected nodes"),
        }
    }

    #[rstest]
    fn test_add_without_replace_returns_same_root() {
        let tree = tree_of(&[1, 2, 3, 4]);
        let (updated, added) = tree.add(4, 0, &NaturalOrder, false);
        assert!(!added);
        assert!(tree.ptr_eq(&updated));
    }

    // =========================================================================
    // Lookup Tests
    // =========================================================================

    #[rstest]
    #[case(1, Some(10))]
    #[case(4, Some(40))]
    #[case(7, Some(70))]
    #[case(0, None)]
    #[case(8, None)]
    fn test_find(#[case] key: i32, #[case] expected: Option<i32>) {
        let tree = tree_of(&[1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(tree.find(&key, &NaturalOrder).copied(), expected);
        assert_eq!(tree.mem(&key, &NaturalOrder), expected.is_some());
    }

    #[rstest]
    fn test_find_and_call_agrees_with_find() {
        let tree = tree_of(&[3, 1, 4, 5, 9, 2, 6]);
        for key in 0..12 {
            let dispatched =
                tree.find_and_call(&key, &NaturalOrder, |value| Ok(*value), |missing| Err(*missing));
            let expected = tree.find(&key, &NaturalOrder).copied().ok_or(key);
            assert_eq!(dispatched, expected);
        }
    }

    #[rstest]
    fn test_first_and_last() {
        let tree = tree_of(&[5, 3, 8, 1, 4, 9]);
        assert_eq!(tree.first(), Some((&1, &10)));
        assert_eq!(tree.last(), Some((&9, &90)));

        let empty: AvlTree<i32, i32> = AvlTree::empty();
        assert_eq!(empty.first(), None);
        assert_eq!(empty.last(), None);
    }

    // =========================================================================
    // Traversal Tests
    // =========================================================================

    #[rstest]
    fn test_iter_for_each_and_fold_agree() {
        let tree = tree_of(&[8, 3, 10, 1, 6, 14, 4, 7, 13]);
        let from_iter = keys_of(&tree);

        let mut from_for_each = Vec::new();
        tree.for_each(|key, _| from_for_each.push(*key));

        let from_fold = tree.fold(Vec::new(), |key, _, mut keys| {
            keys.push(*key);
            keys
        });

        assert_eq!(from_iter, vec![1, 3, 4, 6, 7, 8, 10, 13, 14]);
        assert_eq!(from_for_each, from_iter);
        assert_eq!(from_fold, from_iter);
    }

    #[rstest]
    fn test_iter_is_fused() {
        let tree = tree_of(&[1]);
        let mut iterator = tree.iter();
        assert_eq!(iterator.next(), Some((&1, &10)));
        assert_eq!(iterator.next(), None);
        assert_eq!(iterator.next(), None);
    }

    #[rstest]
    fn test_reverse_comparator_orders_descending() {
        let tree = [1, 5, 3, 2, 4]
            .into_iter()
            .fold(AvlTree::empty(), |tree, key| {
                tree.add(key, (), &ReverseOrder, true).0
            });
        let keys: Vec<i32> = tree.iter().map(|(key, _)| *key).collect();
        assert_eq!(keys, vec![5, 4, 3, 2, 1]);
        assert_eq!(tree.first(), Some((&5, &())));
        assert!(tree.mem(&3, &ReverseOrder));
        tree.assert_invariant(&ReverseOrder);
    }

    // =========================================================================
    // Trait Tests
    // =========================================================================

    #[rstest]
    fn test_structural_equality() {
        let ascending = tree_of(&[1, 2, 3]);
        let rebuilt = tree_of(&[2, 1, 3]);
        assert_eq!(ascending, rebuilt);

        let chain = tree_of(&[2, 1]);
        let other_chain = tree_of(&[1, 2]);
        assert_ne!(chain, other_chain);
    }

    #[rstest]
    fn test_debug_lists_entries_in_order() {
        let tree = tree_of(&[2, 1]);
        assert_eq!(format!("{tree:?}"), "{1: 10, 2: 20}");
    }

    #[rstest]
    fn test_default_is_empty() {
        let tree: AvlTree<String, String> = AvlTree::default();
        assert!(tree.is_empty());
    }
}
