//! # persistent-avl
//!
//! A persistent (immutable) AVL tree implementing an ordered key-to-value map.
//!
//! ## Overview
//!
//! Every operation borrows an existing tree and returns a new root. Subtrees
//! that an edit does not touch are shared by reference between the old and the
//! new version, so keeping old versions around is cheap.
//!
//! - [`persistent::AvlTree`]: the balanced tree engine. The key ordering is a
//!   [`persistent::Comparator`] supplied on every call.
//! - [`persistent::AvlMap`]: a map facade over the engine that uses the natural
//!   ordering of the key type and caches its length.
//!
//! ## Feature Flags
//!
//! - `arc`: share nodes through `Arc` instead of `Rc` (thread-safe trees)
//! - `serde`: `Serialize`/`Deserialize` for [`persistent::AvlMap`]
//! - `tracing`: report invariant violations through `tracing` before panicking
//!
//! ## Example
//!
//! ```rust
//! use persistent_avl::prelude::*;
//!
//! let (tree, added) = AvlTree::empty().add(1, "one", &NaturalOrder, true);
//! assert!(added);
//! assert_eq!(tree.find(&1, &NaturalOrder), Some(&"one"));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Prelude module for convenient imports.
///
/// # Usage
///
/// ```rust
/// use persistent_avl::prelude::*;
/// ```
pub mod prelude {
    pub use crate::persistent::*;
}

pub mod persistent;
