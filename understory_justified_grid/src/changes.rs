// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Structural change batches and the index remapping they imply.
//!
//! Hosts describe mutations of their collection as a [`ChangeSet`]: an ordered
//! list of [`Change::Insert`] and [`Change::Remove`] operations, optionally
//! preceded by a full reset. The grid queues them and applies them right before
//! its next layout pass.
//!
//! Every index-keyed structure in the grid (aspect cache, realized items, row
//! bounds, the cursor) is remapped through the same [`Change::map_index`] rule.

use core::hash::BuildHasher;

use hashbrown::HashMap;
use smallvec::SmallVec;

/// A single structural change to an index space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Change {
    /// `count` items were inserted so that the first new item has `index`.
    Insert {
        /// Index of the first inserted item.
        index: usize,
        /// Number of inserted items.
        count: usize,
    },
    /// `count` items starting at `index` were removed.
    Remove {
        /// Index of the first removed item (before removal).
        index: usize,
        /// Number of removed items.
        count: usize,
    },
}

impl Change {
    /// Index of the first affected item.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Insert { index, .. } | Self::Remove { index, .. } => index,
        }
    }

    /// Number of affected items.
    #[must_use]
    pub const fn count(self) -> usize {
        match self {
            Self::Insert { count, .. } | Self::Remove { count, .. } => count,
        }
    }

    /// Maps an index from before this change to after it.
    ///
    /// Returns `None` for indices that were removed.
    #[must_use]
    pub const fn map_index(self, i: usize) -> Option<usize> {
        match self {
            Self::Insert { index, count } => {
                if i >= index {
                    Some(i + count)
                } else {
                    Some(i)
                }
            }
            Self::Remove { index, count } => {
                if i < index {
                    Some(i)
                } else if i - index < count {
                    None
                } else {
                    Some(i - count)
                }
            }
        }
    }

    /// Maps an index from after this change back to before it.
    ///
    /// Returns `None` for indices of inserted items, which had no index before.
    #[must_use]
    pub const fn unmap_index(self, i: usize) -> Option<usize> {
        match self {
            Self::Insert { index, count } => {
                if i < index {
                    Some(i)
                } else if i - index < count {
                    None
                } else {
                    Some(i - count)
                }
            }
            Self::Remove { index, count } => {
                if i < index {
                    Some(i)
                } else {
                    Some(i + count)
                }
            }
        }
    }

    /// Item count after applying this change to a collection of `len` items.
    #[must_use]
    pub const fn apply_to_len(self, len: usize) -> usize {
        match self {
            Self::Insert { count, .. } => len.saturating_add(count),
            Self::Remove { count, .. } => len.saturating_sub(count),
        }
    }

    /// Item count before this change, given the count `len` after it.
    #[must_use]
    pub const fn revert_len(self, len: usize) -> usize {
        match self {
            Self::Insert { count, .. } => len.saturating_sub(count),
            Self::Remove { count, .. } => len.saturating_add(count),
        }
    }
}

/// Rekeys an index-keyed map through `change`.
///
/// Entries before the change point keep their key, removed entries are handed to
/// `on_removed`, and later entries move by the change's delta.
pub(crate) fn remap_keys<V, H>(
    map: &mut HashMap<usize, V, H>,
    change: Change,
    mut on_removed: impl FnMut(usize, V),
) where
    H: BuildHasher + Clone,
{
    if change.count() == 0 || map.is_empty() {
        return;
    }
    let old = core::mem::replace(map, HashMap::with_hasher(map.hasher().clone()));
    map.reserve(old.len());
    for (key, value) in old {
        match change.map_index(key) {
            Some(new_key) => {
                map.insert(new_key, value);
            }
            None => on_removed(key, value),
        }
    }
}

/// An ordered batch of structural changes reported by a host.
///
/// ```rust
/// use understory_justified_grid::{Change, ChangeSet};
///
/// let changes = ChangeSet::new().removed(2, 1).inserted(0, 3);
/// assert_eq!(
///     changes.changes(),
///     &[
///         Change::Remove { index: 2, count: 1 },
///         Change::Insert { index: 0, count: 3 },
///     ]
/// );
/// assert!(!changes.is_reset());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangeSet {
    reset: bool,
    changes: SmallVec<[Change; 4]>,
}

impl ChangeSet {
    /// Creates an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a batch that discards everything known about the collection.
    #[must_use]
    pub fn reset() -> Self {
        Self {
            reset: true,
            changes: SmallVec::new(),
        }
    }

    /// Appends an insertion.
    #[must_use]
    pub fn inserted(mut self, index: usize, count: usize) -> Self {
        self.push(Change::Insert { index, count });
        self
    }

    /// Appends a removal.
    #[must_use]
    pub fn removed(mut self, index: usize, count: usize) -> Self {
        self.push(Change::Remove { index, count });
        self
    }

    /// Appends a change. Empty changes are dropped.
    pub fn push(&mut self, change: Change) {
        if change.count() > 0 {
            self.changes.push(change);
        }
    }

    /// Appends all changes of `other`, which happened after the ones already here.
    ///
    /// A reset in `other` supersedes everything queued so far.
    pub fn append(&mut self, other: Self) {
        if other.reset {
            *self = other;
        } else {
            self.changes.extend(other.changes);
        }
    }

    /// Returns `true` if the batch starts with a full reset.
    #[must_use]
    pub const fn is_reset(&self) -> bool {
        self.reset
    }

    /// Returns `true` if there is nothing to apply.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.reset && self.changes.is_empty()
    }

    /// The queued operations, in the order they happened.
    #[must_use]
    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    /// Removes and returns the queued operations, leaving the batch empty.
    pub(crate) fn take(&mut self) -> SmallVec<[Change; 4]> {
        self.reset = false;
        core::mem::take(&mut self.changes)
    }

    pub(crate) fn clear(&mut self) {
        self.reset = false;
        self.changes.clear();
    }
}
