// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Everything the grid holds against its [`ItemSource`]: realized items, the
//! measured aspect ratios, the retained current item, and the highlight.

use hashbrown::HashMap;
use kurbo::Rect;

use crate::changes::remap_keys;
use crate::cursor::Cursor;
use crate::row::AspectLookup;
use crate::source::aspect_of;
use crate::{Change, ItemSource};

/// Where a realized item should be drawn.
#[derive(Clone, Debug, PartialEq)]
pub struct Placement<I> {
    /// The realized item.
    pub item: I,
    /// Position and size in content coordinates.
    pub rect: Rect,
    /// Whether the host should show the item.
    ///
    /// Items in rows that are still loading are hidden until the row settles.
    pub visible: bool,
}

impl<I> Placement<I> {
    pub(crate) const fn hidden(item: I) -> Self {
        Self {
            item,
            rect: Rect::ZERO,
            visible: false,
        }
    }
}

pub(crate) struct ItemStore<S: ItemSource> {
    pub(crate) source: S,
    /// Measured aspect ratios. Unmeasured indices have no entry.
    aspects: HashMap<usize, f64>,
    realized: HashMap<usize, Placement<S::Item>>,
    /// Set while the walk is outside the interest window: lookups may use what
    /// is already realized but must not realize anything new.
    pub(crate) cached_only: bool,
    pub(crate) cursor: Cursor<S::Item>,
    pub(crate) highlight: Option<Placement<S::Item>>,
}

impl<S: ItemSource> core::fmt::Debug for ItemStore<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ItemStore")
            .field("measured", &self.aspects.len())
            .field("realized", &self.realized.len())
            .field("cached_only", &self.cached_only)
            .field("cursor", &self.cursor)
            .field("highlight", &self.highlight)
            .finish_non_exhaustive()
    }
}

impl<S: ItemSource> ItemStore<S> {
    pub(crate) fn new(source: S) -> Self {
        Self {
            source,
            aspects: HashMap::new(),
            realized: HashMap::new(),
            cached_only: false,
            cursor: Cursor::default(),
            highlight: None,
        }
    }

    /// Returns the realized item at `index`, realizing it if allowed.
    pub(crate) fn create_item(&mut self, index: usize, asynchronous: bool) -> Option<S::Item> {
        if let Some(placement) = self.realized.get(&index) {
            return Some(placement.item.clone());
        }
        if self.cached_only {
            return self.cursor.item_at(index).cloned();
        }
        let item = self.source.realize(index, asynchronous)?;
        log::trace!("realized item {index}: {item:?}");
        self.realized.insert(index, Placement::hidden(item.clone()));
        Some(item)
    }

    pub(crate) fn is_measured(&self, index: usize) -> bool {
        self.aspects.contains_key(&index)
    }

    pub(crate) fn forget_aspect(&mut self, index: usize) {
        self.aspects.remove(&index);
    }

    pub(crate) fn placement(&self, index: usize) -> Option<&Placement<S::Item>> {
        self.realized.get(&index)
    }

    pub(crate) fn placements(&self) -> impl Iterator<Item = (usize, &Placement<S::Item>)> + '_ {
        self.realized.iter().map(|(&index, placement)| (index, placement))
    }

    pub(crate) fn realized_len(&self) -> usize {
        self.realized.len()
    }

    pub(crate) fn place(&mut self, index: usize, rect: Rect) {
        if let Some(placement) = self.realized.get_mut(&index) {
            placement.rect = rect;
            placement.visible = true;
        }
    }

    /// Hides the item at `index`, keeping it at the top of its row.
    pub(crate) fn hide(&mut self, index: usize, y: f64) {
        if let Some(placement) = self.realized.get_mut(&index) {
            placement.rect = placement.rect.with_origin((placement.rect.x0, y));
            placement.visible = false;
        }
    }

    /// Moves cached aspects and realized items across a structural change.
    pub(crate) fn remap(&mut self, change: Change) {
        remap_keys(&mut self.aspects, change, |_, _| {});
        let source = &mut self.source;
        remap_keys(&mut self.realized, change, |index, placement| {
            log::trace!("releasing removed item {index}");
            source.release(placement.item);
        });
    }

    /// Releases every realized item for which `keep` returns `false`.
    pub(crate) fn release_unless(&mut self, keep: impl Fn(usize) -> bool) {
        for (index, placement) in self.realized.extract_if(|&index, _| !keep(index)) {
            log::trace!("releasing item {index}");
            self.source.release(placement.item);
        }
    }

    /// Releases all realized items and the current item and forgets all
    /// measurements. Returns `true` if a current item was released.
    pub(crate) fn release_all(&mut self) -> bool {
        for (_, placement) in self.realized.drain() {
            self.source.release(placement.item);
        }
        self.aspects.clear();
        self.cursor.resolved = false;
        match self.cursor.item.take() {
            Some(item) => {
                self.source.release(item);
                true
            }
            None => false,
        }
    }

    pub(crate) fn destroy_highlight(&mut self) -> bool {
        match self.highlight.take() {
            Some(highlight) => {
                self.source.destroy_highlight(highlight.item);
                true
            }
            None => false,
        }
    }

    pub(crate) fn create_highlight(&mut self) {
        self.highlight = self.source.create_highlight().map(Placement::hidden);
    }
}

impl<S: ItemSource> AspectLookup for ItemStore<S> {
    fn aspect_ratio(&mut self, index: usize) -> f64 {
        if let Some(&aspect) = self.aspects.get(&index) {
            return aspect;
        }
        let Some(item) = self.create_item(index, false) else {
            return 0.0;
        };
        let aspect = aspect_of(self.source.implicit_size(&item));
        if aspect > 0.0 {
            self.aspects.insert(index, aspect);
        }
        aspect
    }
}

#[cfg(test)]
mod tests {
    use super::ItemStore;
    use crate::Change;
    use crate::row::AspectLookup;
    use crate::testing::TestSource;

    #[test]
    fn measuring_realizes_once() {
        let mut store = ItemStore::new(TestSource::with_aspects(&[1.5, 0.0, 2.0]));
        assert_eq!(store.aspect_ratio(0), 1.5);
        assert_eq!(store.aspect_ratio(0), 1.5);
        assert_eq!(store.source.realize_calls(), 1);
        assert!(store.is_measured(0));

        // Unmeasured items stay realized but are not cached.
        assert_eq!(store.aspect_ratio(1), 0.0);
        assert!(!store.is_measured(1));
        assert_eq!(store.realized_len(), 2);
    }

    #[test]
    fn cached_only_lookups_never_realize() {
        let mut store = ItemStore::new(TestSource::with_aspects(&[1.0, 1.0]));
        store.aspect_ratio(0);
        store.cached_only = true;
        assert_eq!(store.aspect_ratio(0), 1.0);
        assert_eq!(store.aspect_ratio(1), 0.0);
        assert_eq!(store.source.realize_calls(), 1);
    }

    #[test]
    fn removal_releases_removed_items_and_shifts_the_rest() {
        let mut store = ItemStore::new(TestSource::with_aspects(&[1.0, 2.0, 3.0, 4.0]));
        for i in 0..4 {
            store.aspect_ratio(i);
        }
        let removed = store.source.item_at(1);
        store.source.remove(1, 1);
        store.remap(Change::Remove { index: 1, count: 1 });

        assert_eq!(store.source.refcount(removed), 0);
        assert_eq!(store.realized_len(), 3);
        assert_eq!(store.aspect_ratio(1), 3.0);
        assert_eq!(store.aspect_ratio(2), 4.0);
        assert_eq!(store.source.realize_calls(), 4);
    }

    #[test]
    fn release_all_balances_references() {
        let mut store = ItemStore::new(TestSource::with_aspects(&[1.0, 2.0, 3.0]));
        for i in 0..3 {
            store.aspect_ratio(i);
        }
        store.release_unless(|index| index == 1);
        assert_eq!(store.realized_len(), 1);
        assert!(!store.release_all());
        assert_eq!(store.source.live_references(), 0);
        assert!(!store.is_measured(1));
    }
}
