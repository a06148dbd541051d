// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rows: contiguous index runs sized to fill a width exactly.

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

use crate::Change;

/// Per-index aspect ratio provider used while fitting rows.
///
/// Returns `0.0` for items whose aspect ratio is not known yet.
pub(crate) trait AspectLookup {
    fn aspect_ratio(&mut self, index: usize) -> f64;
}

/// Geometry inputs shared by every row in a pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct RowMetrics {
    /// Width rows are fitted against.
    pub(crate) layout_width: f64,
    /// Width rows are rendered at.
    pub(crate) display_width: f64,
    /// Gap between adjacent items and between rows.
    pub(crate) spacing: f64,
    /// Row height ceiling.
    pub(crate) maximum_height: f64,
}

impl RowMetrics {
    /// Height that makes `count` items with a summed aspect of `aspect` fill `width`.
    pub(crate) fn row_height(&self, count: usize, width: f64, aspect: f64) -> f64 {
        if aspect == 0.0 || count == 0 {
            return 0.0;
        }
        let gaps = (count - 1) as f64 * self.spacing;
        ((width - gaps) / aspect).round()
    }

    /// How many unmeasured items a row may hold before it has to settle.
    ///
    /// Estimates how many items of a typical 3:4 portrait shape would fit at the
    /// maximum height; falls back to 6 while geometry is unknown.
    pub(crate) fn maximum_loading_row_items(&self) -> usize {
        if self.layout_width > 0.0 && self.maximum_height > 0.0 {
            #[allow(
                clippy::cast_possible_truncation,
                clippy::cast_sign_loss,
                reason = "Both operands are positive and the quotient is a small item count"
            )]
            let items = (self.layout_width / (0.75 * self.maximum_height)).ceil() as usize;
            items.max(1)
        } else {
            6
        }
    }
}

bitflags::bitflags! {
    /// Cached row values that must be recomputed before use.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    struct Stale: u8 {
        const ASPECT  = 0b0001;
        const LOADING = 0b0010;
        const LAYOUT  = 0b0100;
        const DISPLAY = 0b1000;
    }
}

/// A run of consecutive items laid out side by side on one line.
///
/// Rows are produced by [`crate::JustifiedGrid`] during layout. The public
/// accessors describe the row as it was placed by the most recent pass.
#[derive(Clone, Debug)]
pub struct Row {
    first: usize,
    last: usize,

    display_y: Option<f64>,
    height: f64,
    presentable: bool,

    aspect: f64,
    layout_height: f64,
    display_height: f64,
    loading: usize,
    stale: Stale,
}

impl Row {
    pub(crate) fn starting_at(first: usize) -> Self {
        Self {
            first,
            last: first,
            display_y: None,
            height: 0.0,
            presentable: false,
            aspect: 0.0,
            layout_height: 0.0,
            display_height: 0.0,
            loading: 0,
            stale: Stale::all(),
        }
    }

    /// Index of the first item in the row.
    #[must_use]
    pub const fn first(&self) -> usize {
        self.first
    }

    /// Index of the last item in the row (inclusive).
    #[must_use]
    pub const fn last(&self) -> usize {
        self.last
    }

    /// Number of items in the row.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.last - self.first + 1
    }

    /// Rows always hold at least one item.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Returns `true` if `index` belongs to this row.
    #[must_use]
    pub const fn contains(&self, index: usize) -> bool {
        self.first <= index && index <= self.last
    }

    /// Top edge of the row in content coordinates, if it has been positioned.
    #[must_use]
    pub const fn display_y(&self) -> Option<f64> {
        self.display_y
    }

    /// Height the row occupied in the last pass.
    ///
    /// Rows that are still loading report the maximum height as a placeholder.
    #[must_use]
    pub const fn height(&self) -> f64 {
        self.height
    }

    /// Returns `true` if every item in the row was measured when it was placed.
    #[must_use]
    pub const fn is_presentable(&self) -> bool {
        self.presentable
    }

    /// Records where the walk put this row. Returns `true` if that moved it.
    pub(crate) fn place(&mut self, y: f64, height: f64, presentable: bool) -> bool {
        let moved = self.display_y != Some(y) || self.height != height;
        self.display_y = Some(y);
        self.height = height;
        self.presentable = presentable;
        moved
    }

    pub(crate) fn unplace(&mut self) {
        self.display_y = None;
    }

    pub(crate) fn data_changed(&mut self) {
        self.stale = Stale::all();
    }

    pub(crate) fn layout_changed(&mut self) {
        self.stale |= Stale::LAYOUT | Stale::DISPLAY;
    }

    pub(crate) fn display_changed(&mut self) {
        self.stale |= Stale::DISPLAY;
    }

    fn set_aspect(&mut self, aspect: f64) {
        self.aspect = aspect;
        self.stale.remove(Stale::ASPECT);
    }

    pub(crate) fn aspect(&mut self, items: &mut impl AspectLookup) -> f64 {
        if self.stale.contains(Stale::ASPECT) {
            self.aspect = (self.first..=self.last)
                .map(|i| items.aspect_ratio(i))
                .sum();
            self.stale.remove(Stale::ASPECT);
        }
        self.aspect
    }

    pub(crate) fn loading_count(&mut self, items: &mut impl AspectLookup) -> usize {
        if self.stale.contains(Stale::LOADING) {
            self.loading = (self.first..=self.last)
                .filter(|&i| items.aspect_ratio(i) == 0.0)
                .count();
            self.stale.remove(Stale::LOADING);
        }
        self.loading
    }

    pub(crate) fn layout_height(
        &mut self,
        metrics: &RowMetrics,
        items: &mut impl AspectLookup,
    ) -> f64 {
        if self.stale.contains(Stale::LAYOUT) {
            let aspect = self.aspect(items);
            self.layout_height = metrics.row_height(self.len(), metrics.layout_width, aspect);
            self.stale.remove(Stale::LAYOUT);
        }
        self.layout_height
    }

    pub(crate) fn display_height(
        &mut self,
        metrics: &RowMetrics,
        items: &mut impl AspectLookup,
    ) -> f64 {
        if self.stale.contains(Stale::DISPLAY) {
            let aspect = self.aspect(items);
            self.display_height = metrics.row_height(self.len(), metrics.display_width, aspect);
            self.stale.remove(Stale::DISPLAY);
        }
        self.display_height
    }

    /// Moves the row's bounds across an insertion.
    ///
    /// A row touching the insertion point may gain members, so its cached
    /// values are dropped.
    pub(crate) fn shift_for_insert(&mut self, index: usize, count: usize) {
        if self.first < index + count && self.last + 1 >= index {
            self.data_changed();
        }
        let change = Change::Insert { index, count };
        self.first = change.map_index(self.first).unwrap_or(self.first);
        self.last = change.map_index(self.last).unwrap_or(self.last);
    }

    /// Fits the row so it starts at `new_first` and never extends past `max_last`.
    ///
    /// Grows the row while it is taller than the maximum height, and otherwise
    /// drops trailing items as long as the row stays within it. Returns `true`
    /// if the row's range changed.
    pub(crate) fn update(
        &mut self,
        new_first: usize,
        max_last: usize,
        metrics: &RowMetrics,
        items: &mut impl AspectLookup,
    ) -> bool {
        if max_last < new_first {
            log::debug!("row update ignored: first {new_first} is past last index {max_last}");
            return false;
        }

        let mut added = false;
        let mut removed = false;

        if self.first != new_first {
            self.first = new_first;
            self.last = new_first;
            self.data_changed();
            added = true;
        } else if self.last > max_last {
            self.last = max_last;
            self.data_changed();
            removed = true;
        } else if !self.stale.contains(Stale::LAYOUT) && self.layout_height != 0.0 {
            return false;
        } else if self.loading_count(items) > 0 {
            // Refill from the first unmeasured item; trimming from the end could
            // never remove a gap in the middle of the row.
            if let Some(i) = (self.first..self.last).find(|&i| items.aspect_ratio(i) == 0.0) {
                self.last = i;
                self.data_changed();
                removed = true;
            }
        }

        let loading_limit = metrics.maximum_loading_row_items();
        while self.last < max_last
            && (self.aspect(items) == 0.0
                || self.layout_height(metrics, items) > metrics.maximum_height)
            && (self.loading_count(items) == 0 || self.len() < loading_limit)
        {
            let aspect = self.aspect(items) + items.aspect_ratio(self.last + 1);
            self.last += 1;
            self.data_changed();
            self.set_aspect(aspect);
            added = true;
        }

        while !added && self.last > self.first {
            let aspect = self.aspect(items) - items.aspect_ratio(self.last);
            let height = metrics.row_height(self.len() - 1, metrics.layout_width, aspect);
            if height > metrics.maximum_height {
                break;
            }
            self.last -= 1;
            self.data_changed();
            self.set_aspect(aspect);
            self.layout_height = height;
            self.stale.remove(Stale::LAYOUT);
            removed = true;
        }

        added || removed
    }
}
