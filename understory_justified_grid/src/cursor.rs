// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The current index, its retained item, and the highlight that follows it.

use crate::items::Placement;
use crate::{GridChanges, ItemSource, JustifiedGrid};

/// Current index plus the extra reference the grid holds on its item.
#[derive(Debug)]
pub(crate) struct Cursor<I> {
    pub(crate) index: Option<usize>,
    pub(crate) item: Option<I>,
    /// Set while an item is held for `index`. Structural changes only move a
    /// resolved cursor.
    pub(crate) resolved: bool,
}

impl<I> Default for Cursor<I> {
    fn default() -> Self {
        Self {
            index: None,
            item: None,
            resolved: false,
        }
    }
}

impl<I> Cursor<I> {
    /// The retained item, if it belongs to `index`.
    pub(crate) fn item_at(&self, index: usize) -> Option<&I> {
        if self.index == Some(index) {
            self.item.as_ref()
        } else {
            None
        }
    }
}

impl<S: ItemSource> JustifiedGrid<S> {
    /// Index of the current item.
    #[must_use]
    pub const fn current_index(&self) -> Option<usize> {
        self.items.cursor.index
    }

    /// The current item. It stays realized even when scrolled out of view.
    #[must_use]
    pub fn current_item(&self) -> Option<&S::Item> {
        self.items.cursor.item.as_ref()
    }

    /// Moves the current index.
    ///
    /// `index` refers to the source's present contents: structural changes
    /// still queued are applied first.
    pub fn set_current_index(&mut self, index: Option<usize>) {
        self.apply_pending_changes();
        if self.items.cursor.index == index {
            return;
        }
        self.items.cursor.index = index;
        self.notify(GridChanges::CURRENT_INDEX);
        self.update_current();
    }

    /// Moves to the next item. Returns `true` if the current index changed.
    pub fn increment_current_index(&mut self) -> bool {
        self.apply_pending_changes();
        let Some(index) = self.current_index() else {
            return false;
        };
        let next = index + 1;
        if next >= self.items.source.count() {
            return false;
        }
        self.set_current_index(Some(next));
        true
    }

    /// Moves to the previous item. Returns `true` if the current index changed.
    pub fn decrement_current_index(&mut self) -> bool {
        self.apply_pending_changes();
        let Some(index) = self.current_index() else {
            return false;
        };
        let Some(previous) = index.min(self.items.source.count()).checked_sub(1) else {
            return false;
        };
        self.set_current_index(Some(previous));
        true
    }

    /// Moves to the first item of the next row, or to the next item when the
    /// next row is not known yet.
    pub fn increment_current_row(&mut self) -> bool {
        self.apply_pending_changes();
        let Some(index) = self.current_index() else {
            return false;
        };
        match self.row_of(index) {
            Some(row) if row + 1 < self.rows.len() => {
                let first = self.rows[row + 1].first();
                self.set_current_index(Some(first));
                true
            }
            _ => self.increment_current_index(),
        }
    }

    /// Moves to the first item of the previous row, or to the previous item
    /// when the current row is not known.
    pub fn decrement_current_row(&mut self) -> bool {
        self.apply_pending_changes();
        let Some(index) = self.current_index() else {
            return false;
        };
        match self.row_of(index) {
            Some(row) if row > 0 => {
                let first = self.rows[row - 1].first();
                self.set_current_index(Some(first));
                true
            }
            _ => self.decrement_current_index(),
        }
    }

    /// Position in [`JustifiedGrid::rows`] of the row holding `index`.
    #[must_use]
    pub fn row_of(&self, index: usize) -> Option<usize> {
        let row = self.rows.partition_point(|row| row.last() < index);
        self.rows
            .get(row)
            .filter(|row| row.contains(index))
            .map(|_| row)
    }

    /// Re-resolves the current item from the current index.
    ///
    /// The new item is realized before the previous one is released, so an
    /// unchanged item never drops to zero references.
    pub(crate) fn update_current(&mut self) {
        let item = match self.items.cursor.index {
            Some(index) if index < self.items.source.count() => {
                self.items.source.realize(index, false)
            }
            _ => None,
        };
        // Queued changes only move a cursor that refers to an observed item.
        self.items.cursor.resolved = item.is_some();
        let previous = core::mem::replace(&mut self.items.cursor.item, item);
        if previous != self.items.cursor.item {
            log::debug!(
                "current item {:?} -> {:?}",
                previous,
                self.items.cursor.item
            );
            self.notify(GridChanges::CURRENT_ITEM);
        }
        if let Some(previous) = previous {
            self.items.source.release(previous);
        }
        self.request_layout();
    }

    /// Returns `true` if a highlight is shown behind the current item.
    #[must_use]
    pub const fn is_highlight_enabled(&self) -> bool {
        self.highlight_enabled
    }

    /// Shows or hides the highlight.
    ///
    /// Enabling instantiates [`ItemSource::create_highlight`]; disabling
    /// destroys the instance.
    pub fn set_highlight_enabled(&mut self, enabled: bool) {
        if self.highlight_enabled == enabled {
            return;
        }
        self.highlight_enabled = enabled;
        if enabled {
            self.items.create_highlight();
        } else {
            self.items.destroy_highlight();
        }
        self.notify(GridChanges::HIGHLIGHT);
        self.request_layout();
    }

    /// Recreates the highlight after the source's template changed.
    pub fn highlight_template_changed(&mut self) {
        if !self.highlight_enabled {
            return;
        }
        self.items.destroy_highlight();
        self.items.create_highlight();
        self.notify(GridChanges::HIGHLIGHT);
        self.request_layout();
    }

    /// The highlight instance and where it should be drawn.
    ///
    /// It mirrors the current item's placement and is only visible while the
    /// current item is positioned and shown.
    #[must_use]
    pub fn highlight(&self) -> Option<&Placement<S::Item>> {
        self.items.highlight.as_ref()
    }

    pub(crate) fn update_highlight(&mut self) {
        let target = match (self.items.cursor.index, &self.items.cursor.item) {
            (Some(index), Some(_)) => self
                .items
                .placement(index)
                .filter(|placement| placement.visible)
                .map(|placement| placement.rect),
            _ => None,
        };
        let Some(highlight) = self.items.highlight.as_mut() else {
            return;
        };
        let rect = target.unwrap_or(highlight.rect);
        let visible = target.is_some();
        if highlight.rect == rect && highlight.visible == visible {
            return;
        }
        highlight.rect = rect;
        highlight.visible = visible;
        self.notify(GridChanges::HIGHLIGHT);
    }
}

#[cfg(test)]
mod tests {
    use crate::GridChanges;
    use crate::testing::{TestSource, laid_out, settle};

    #[test]
    fn setting_the_index_retains_the_item() {
        let mut grid = laid_out(TestSource::squares(20), 1000.0, 600.0);
        grid.take_changes();

        grid.set_current_index(Some(6));
        let changes = grid.take_changes();
        assert!(changes.contains(GridChanges::CURRENT_INDEX | GridChanges::CURRENT_ITEM));
        let item = grid.source().item_at(6);
        assert_eq!(grid.current_item(), Some(&item));
        // One reference from the cursor, one from the visible row.
        assert_eq!(grid.source().refcount(item), 2);

        grid.set_current_index(Some(6));
        assert!(grid.take_changes().is_empty());

        grid.set_current_index(None);
        assert!(grid.current_item().is_none());
        assert_eq!(grid.source().refcount(item), 1);
    }

    #[test]
    fn out_of_range_index_stays_unresolved() {
        let mut grid = laid_out(TestSource::squares(3), 1000.0, 600.0);
        grid.set_current_index(Some(10));
        assert_eq!(grid.current_index(), Some(10));
        assert!(grid.current_item().is_none());
        settle(&mut grid);
        assert!(grid.current_item().is_none());
    }

    #[test]
    fn row_navigation_jumps_between_row_starts() {
        let mut grid = laid_out(TestSource::squares(12), 1000.0, 2000.0);
        grid.set_current_index(Some(5));
        settle(&mut grid);
        assert_eq!(grid.row_of(5), Some(1));

        assert!(grid.increment_current_row());
        assert_eq!(grid.current_index(), Some(8));
        assert!(grid.decrement_current_row());
        assert_eq!(grid.current_index(), Some(4));
        assert!(grid.decrement_current_row());
        assert_eq!(grid.current_index(), Some(0));

        // No row above the first: step by index, which cannot go lower.
        assert!(!grid.decrement_current_row());
        assert_eq!(grid.current_index(), Some(0));
    }

    #[test]
    fn row_navigation_falls_back_to_stepping() {
        let mut grid = laid_out(TestSource::squares(12), 1000.0, 2000.0);
        grid.set_current_index(Some(9));
        settle(&mut grid);

        assert!(grid.increment_current_row());
        assert_eq!(grid.current_index(), Some(10));
        assert!(grid.increment_current_index());
        assert!(!grid.increment_current_index());
        assert_eq!(grid.current_index(), Some(11));
    }

    #[test]
    fn navigation_without_an_index_does_nothing() {
        let mut grid = laid_out(TestSource::squares(12), 1000.0, 600.0);
        assert!(!grid.increment_current_index());
        assert!(!grid.decrement_current_index());
        assert!(!grid.increment_current_row());
        assert!(!grid.decrement_current_row());
        assert_eq!(grid.current_index(), None);
    }

    #[test]
    fn row_of_finds_the_containing_row() {
        let grid = laid_out(TestSource::squares(10), 1000.0, 2000.0);
        assert_eq!(grid.row_of(0), Some(0));
        assert_eq!(grid.row_of(3), Some(0));
        assert_eq!(grid.row_of(4), Some(1));
        assert_eq!(grid.row_of(9), Some(2));
        assert_eq!(grid.row_of(10), None);
    }

    #[test]
    fn highlight_follows_the_current_item() {
        let mut grid = laid_out(TestSource::squares(20).with_highlight(), 1000.0, 600.0);
        grid.set_highlight_enabled(true);
        assert_eq!(grid.source().live_highlights(), 1);
        settle(&mut grid);
        let highlight = grid.highlight().expect("highlight instance");
        assert!(!highlight.visible, "no current item yet");

        grid.set_current_index(Some(5));
        settle(&mut grid);
        let placement = grid.placement(5).expect("current item is placed").rect;
        let highlight = grid.highlight().expect("highlight instance");
        assert!(highlight.visible);
        assert_eq!(highlight.rect, placement);
        assert!(grid.take_changes().contains(GridChanges::HIGHLIGHT));

        grid.set_current_index(None);
        settle(&mut grid);
        assert!(!grid.highlight().expect("highlight instance").visible);

        grid.highlight_template_changed();
        assert_eq!(grid.source().live_highlights(), 1);
        grid.set_highlight_enabled(false);
        assert!(grid.highlight().is_none());
        assert_eq!(grid.source().live_highlights(), 0);
    }

    #[test]
    fn highlight_is_destroyed_on_drop() {
        let source = TestSource::squares(4).with_highlight();
        let counter = source.counter();
        let mut grid = laid_out(source, 1000.0, 600.0);
        grid.set_highlight_enabled(true);
        assert_eq!(counter.highlights(), 1);
        drop(grid);
        assert_eq!(counter.highlights(), 0);
    }
}
