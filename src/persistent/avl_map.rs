//! Persistent (immutable) ordered map over [`AvlTree`].
//!
//! This module provides [`AvlMap`], an immutable ordered map that orders its
//! keys by their [`Ord`] implementation and caches its length.
//!
//! # Overview
//!
//! - O(log N) get
//! - O(log N) insert
//! - O(log N) remove
//! - O(log N) min/max
//! - O(1) len and `is_empty`
//!
//! All operations return new maps without modifying the original,
//! and structural sharing ensures memory efficiency.
//!
//! # Examples
//!
//! ```rust
//! use persistent_avl::persistent::AvlMap;
//!
//! let map = AvlMap::new()
//!     .insert(3, "three")
//!     .insert(1, "one")
//!     .insert(2, "two");
//!
//! // Entries are always in sorted order
//! let keys: Vec<&i32> = map.keys().collect();
//! assert_eq!(keys, vec![&1, &2, &3]);
//! ```

use super::avl_tree::{AvlTree, Iter};
use super::comparator::NaturalOrder;
use super::invariant::InvariantViolation;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::{FromIterator, FusedIterator};

// =============================================================================
// AvlMap Definition
// =============================================================================

/// A persistent (immutable) ordered map backed by an AVL tree.
///
/// Keys must implement `Ord`. Use [`AvlTree`] directly to order keys with a
/// custom comparator.
///
/// # Time Complexity
///
/// | Operation      | Complexity |
/// |----------------|------------|
/// | `new`          | O(1)       |
/// | `get`          | O(log N)   |
/// | `insert`       | O(log N)   |
/// | `remove`       | O(log N)   |
/// | `contains_key` | O(log N)   |
/// | `min`/`max`    | O(log N)   |
/// | `len`          | O(1)       |
/// | `is_empty`     | O(1)       |
///
/// # Examples
///
/// ```rust
/// use persistent_avl::persistent::AvlMap;
///
/// let map = AvlMap::singleton(42, "answer");
/// assert_eq!(map.get(&42), Some(&"answer"));
///
/// let map = AvlMap::new()
///     .insert(3, "three")
///     .insert(1, "one")
///     .insert(2, "two");
///
/// let keys: Vec<&i32> = map.keys().collect();
/// assert_eq!(keys, vec![&1, &2, &3]);
/// ```
pub struct AvlMap<K, V> {
    /// Root of the underlying tree
    tree: AvlTree<K, V>,
    /// Number of entries
    length: usize,
}

impl<K, V> AvlMap<K, V> {
    /// Creates a new empty map.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_avl::persistent::AvlMap;
    ///
    /// let map: AvlMap<i32, String> = AvlMap::new();
    /// assert!(map.is_empty());
    /// ```
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            tree: AvlTree::Empty,
            length: 0,
        }
    }

    /// Returns the number of entries in the map.
    ///
    /// # Complexity
    ///
    /// O(1)
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.length
    }

    /// Returns `true` if the map contains no entries.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Returns the underlying tree.
    ///
    /// The tree is ordered by [`NaturalOrder`].
    #[inline]
    #[must_use]
    pub const fn as_tree(&self) -> &AvlTree<K, V> {
        &self.tree
    }

    /// Consumes the map and returns the underlying tree.
    #[inline]
    #[must_use]
    pub fn into_tree(self) -> AvlTree<K, V> {
        self.tree
    }

    /// Returns the entry with the minimum key.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_avl::persistent::AvlMap;
    ///
    /// let map = AvlMap::new()
    ///     .insert(3, "three")
    ///     .insert(1, "one")
    ///     .insert(2, "two");
    ///
    /// assert_eq!(map.min(), Some((&1, &"one")));
    /// ```
    #[must_use]
    pub fn min(&self) -> Option<(&K, &V)> {
        self.tree.first()
    }

    /// Returns the entry with the maximum key.
    #[must_use]
    pub fn max(&self) -> Option<(&K, &V)> {
        self.tree.last()
    }

    /// Returns an iterator over entries in sorted key order.
    #[must_use]
    pub fn iter(&self) -> AvlMapIterator<'_, K, V> {
        AvlMapIterator {
            inner: self.tree.iter(),
            remaining: self.length,
        }
    }

    /// Returns an iterator over keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(key, _)| key)
    }

    /// Returns an iterator over values in key order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_avl::persistent::AvlMap;
    ///
    /// let map = AvlMap::new()
    ///     .insert(1, 10)
    ///     .insert(2, 20)
    ///     .insert(3, 30);
    ///
    /// let sum: i32 = map.values().sum();
    /// assert_eq!(sum, 60);
    /// ```
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, value)| value)
    }

    /// Threads an accumulator through the entries in ascending key order.
    pub fn fold<B, F>(&self, init: B, function: F) -> B
    where
        F: FnMut(&K, &V, B) -> B,
    {
        self.tree.fold(init, function)
    }
}

impl<K: Clone + Ord, V: Clone> AvlMap<K, V> {
    /// Creates a map containing a single key-value pair.
    #[inline]
    #[must_use]
    pub fn singleton(key: K, value: V) -> Self {
        Self::new().insert(key, value)
    }

    /// Returns a reference to the value corresponding to the key.
    ///
    /// # Complexity
    ///
    /// O(log N)
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.tree.find(key, &NaturalOrder)
    }

    /// Returns `true` if the map contains a value for the specified key.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.tree.mem(key, &NaturalOrder)
    }

    /// Inserts a key-value pair, replacing the value of an existing key.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_avl::persistent::AvlMap;
    ///
    /// let map1 = AvlMap::new().insert(1, "one");
    /// let map2 = map1.insert(1, "ONE");
    ///
    /// assert_eq!(map1.get(&1), Some(&"one")); // Original unchanged
    /// assert_eq!(map2.get(&1), Some(&"ONE")); // New version
    /// ```
    #[must_use]
    pub fn insert(&self, key: K, value: V) -> Self {
        self.insert_with(key, value, true)
    }

    /// Inserts a key-value pair only if the key is absent.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_avl::persistent::AvlMap;
    ///
    /// let map = AvlMap::new().insert(1, "one");
    /// assert_eq!(map.insert_if_absent(1, "ONE").get(&1), Some(&"one"));
    /// assert_eq!(map.insert_if_absent(2, "two").get(&2), Some(&"two"));
    /// ```
    #[must_use]
    pub fn insert_if_absent(&self, key: K, value: V) -> Self {
        self.insert_with(key, value, false)
    }

    fn insert_with(&self, key: K, value: V, replace: bool) -> Self {
        let (tree, added) = self.tree.add(key, value, &NaturalOrder, replace);
        Self {
            tree,
            length: if added { self.length + 1 } else { self.length },
        }
    }

    /// Removes a key from the map.
    ///
    /// Returns a new map without the key. If the key doesn't exist,
    /// returns a map sharing the original tree.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_avl::persistent::AvlMap;
    ///
    /// let map = AvlMap::new()
    ///     .insert(1, "one")
    ///     .insert(2, "two");
    /// let removed = map.remove(&1);
    ///
    /// assert_eq!(map.len(), 2);     // Original unchanged
    /// assert_eq!(removed.len(), 1); // New version
    /// assert_eq!(removed.get(&1), None);
    /// ```
    #[must_use]
    pub fn remove(&self, key: &K) -> Self {
        let (tree, removed) = self.tree.remove(key, &NaturalOrder);
        Self {
            tree,
            length: if removed {
                self.length - 1
            } else {
                self.length
            },
        }
    }

    /// Verifies the tree invariants and the cached length.
    ///
    /// # Errors
    ///
    /// Returns the first violated tree invariant.
    ///
    /// # Panics
    ///
    /// Panics if the cached length disagrees with the number of entries.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation<K>> {
        self.tree.invariant(&NaturalOrder)?;
        assert_eq!(
            self.tree.len(),
            self.length,
            "cached length disagrees with the tree"
        );
        Ok(())
    }
}

// =============================================================================
// Iterator Implementation
// =============================================================================

/// An iterator over the entries of an [`AvlMap`] in sorted key order.
pub struct AvlMapIterator<'a, K, V> {
    inner: Iter<'a, K, V>,
    remaining: usize,
}

impl<'a, K, V> Iterator for AvlMapIterator<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.inner.next()?;
        self.remaining = self.remaining.saturating_sub(1);
        Some(entry)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for AvlMapIterator<'_, K, V> {
    fn len(&self) -> usize {
        self.remaining
    }
}

impl<K, V> FusedIterator for AvlMapIterator<'_, K, V> {}

/// An owning iterator over the entries of an [`AvlMap`] in sorted key order.
///
/// Nodes may be shared with other versions, so entries are cloned out.
pub struct AvlMapIntoIterator<K, V> {
    entries: std::vec::IntoIter<(K, V)>,
}

impl<K, V> Iterator for AvlMapIntoIterator<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

impl<K, V> ExactSizeIterator for AvlMapIntoIterator<K, V> {
    fn len(&self) -> usize {
        self.entries.len()
    }
}

impl<K, V> FusedIterator for AvlMapIntoIterator<K, V> {}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl<K, V> Clone for AvlMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            tree: self.tree.clone(),
            length: self.length,
        }
    }
}

impl<K, V> Default for AvlMap<K, V> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone + Ord, V: Clone> FromIterator<(K, V)> for AvlMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map = map.insert(key, value);
        }
        map
    }
}

impl<K: Clone, V: Clone> IntoIterator for AvlMap<K, V> {
    type Item = (K, V);
    type IntoIter = AvlMapIntoIterator<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        let entries: Vec<(K, V)> = self
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        AvlMapIntoIterator {
            entries: entries.into_iter(),
        }
    }
}

impl<'a, K, V> IntoIterator for &'a AvlMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = AvlMapIterator<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Content equality: the same entries, regardless of tree shape.
impl<K: PartialEq, V: PartialEq> PartialEq for AvlMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.length == other.length && self.iter().eq(other.iter())
    }
}

impl<K: Eq, V: Eq> Eq for AvlMap<K, V> {}

/// Hashes the length, then each entry in key order, so equal maps hash
/// equally whatever their insertion history.
impl<K: Hash, V: Hash> Hash for AvlMap<K, V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.length.hash(state);
        for (key, value) in self {
            key.hash(state);
            value.hash(state);
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for AvlMap<K, V> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_map().entries(self.iter()).finish()
    }
}

impl<K: fmt::Display, V: fmt::Display> fmt::Display for AvlMap<K, V> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{{")?;
        let mut first = true;
        for (key, value) in self {
            if first {
                first = false;
            } else {
                write!(formatter, ", ")?;
            }
            write!(formatter, "{key}: {value}")?;
        }
        write!(formatter, "}}")
    }
}

// =============================================================================
// Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl<K, V> serde::Serialize for AvlMap<K, V>
where
    K: serde::Serialize,
    V: serde::Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[cfg(feature = "serde")]
struct AvlMapVisitor<K, V> {
    marker: std::marker::PhantomData<(K, V)>,
}

#[cfg(feature = "serde")]
impl<'de, K, V> serde::de::Visitor<'de> for AvlMapVisitor<K, V>
where
    K: serde::Deserialize<'de> + Clone + Ord,
    V: serde::Deserialize<'de> + Clone,
{
    type Value = AvlMap<K, V>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::MapAccess<'de>,
    {
        let mut map = AvlMap::new();
        while let Some((key, value)) = access.next_entry()? {
            map = map.insert(key, value);
        }
        Ok(map)
    }
}

#[cfg(feature = "serde")]
impl<'de, K, V> serde::Deserialize<'de> for AvlMap<K, V>
where
    K: serde::Deserialize<'de> + Clone + Ord,
    V: serde::Deserialize<'de> + Clone,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_map(AvlMapVisitor {
            marker: std::marker::PhantomData,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================


// =============================================================================
// Send + Sync Tests (arc feature only)
// =============================================================================


#[cfg(all(test, feature = "serde"))]
mod serde_tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_serialize_empty() {
        let map: AvlMap<String, i32> = AvlMap::new();
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, "{}");
    }

    #[rstest]
    fn test_serialize_in_key_order() {
        let map = AvlMap::new()
            .insert("b".to_string(), 2)
            .insert("a".to_string(), 1);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"a":1,"b":2}"#);
    }

    #[rstest]
    fn test_roundtrip_large() {
        let map: AvlMap<String, usize> = (0..500).map(|index| (format!("key{index}"), index)).collect();
        let json = serde_json::to_string(&map).unwrap();
        let restored: AvlMap<String, usize> = serde_json::from_str(&json).unwrap();
        assert_eq!(map, restored);
        assert_eq!(restored.check_invariants(), Ok(()));
    }

    #[rstest]
    fn test_deserialize_overwrites_duplicate_keys() {
        let restored: AvlMap<String, i32> = serde_json::from_str(r#"{"a":1,"a":2}"#).unwrap();
        assert_eq!(restored.len(), 1);
        assert_eq!(restored.get(&"a".to_string()), Some(&2));
    }
}
