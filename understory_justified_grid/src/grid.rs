// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The [`JustifiedGrid`] controller: configuration, scheduling, and notifications.

use alloc::vec::Vec;

use crate::items::{ItemStore, Placement};
use crate::row::{Row, RowMetrics};
use crate::{ChangeSet, GridConfig, ItemSource};

bitflags::bitflags! {
    /// Observable state that changed since the host last asked.
    ///
    /// Returned by [`JustifiedGrid::take_changes`].
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct GridChanges: u8 {
        /// [`JustifiedGrid::current_index`] changed.
        const CURRENT_INDEX  = 0b0000_0001;
        /// [`JustifiedGrid::current_item`] changed.
        const CURRENT_ITEM   = 0b0000_0010;
        /// [`JustifiedGrid::content_extent`] changed.
        const CONTENT_EXTENT = 0b0000_0100;
        /// The effective [`JustifiedGrid::layout_width`] may have changed.
        const LAYOUT_WIDTH   = 0b0000_1000;
        /// The highlight was recreated, moved, or changed visibility.
        const HIGHLIGHT      = 0b0001_0000;
        /// A layout pass ran and placements may have changed.
        const PLACEMENTS     = 0b0010_0000;
    }
}

/// A virtualized justified grid over an [`ItemSource`].
///
/// Items are laid out left to right in rows. Each row holds as many items as
/// needed to bring its height at the layout width down to
/// [`GridConfig::maximum_height`], then is scaled so its items exactly fill
/// the display width.
///
/// Only rows overlapping the viewport (plus the row holding the current
/// index) are realized. Rows above and below are fitted from cached aspect
/// ratios where possible, so long collections stay cheap to scroll.
///
/// Mutations never lay out immediately. They mark the grid dirty via
/// [`JustifiedGrid::request_layout`], and the host calls
/// [`JustifiedGrid::run_pending_layout`] once per frame, which coalesces all
/// requests into a single pass.
pub struct JustifiedGrid<S: ItemSource> {
    pub(crate) config: GridConfig,
    pub(crate) display_width: f64,
    pub(crate) scroll_offset: f64,
    pub(crate) viewport_height: f64,

    pub(crate) rows: Vec<Row>,
    pub(crate) items: ItemStore<S>,
    pub(crate) pending: ChangeSet,

    pub(crate) layout_pending: bool,
    pub(crate) highlight_enabled: bool,
    pub(crate) content_extent: f64,
    pub(crate) notified: GridChanges,
}

impl<S: ItemSource> core::fmt::Debug for JustifiedGrid<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("JustifiedGrid")
            .field("config", &self.config)
            .field("display_width", &self.display_width)
            .field("scroll_offset", &self.scroll_offset)
            .field("viewport_height", &self.viewport_height)
            .field("rows", &self.rows.len())
            .field("items", &self.items)
            .field("pending", &self.pending)
            .field("layout_pending", &self.layout_pending)
            .field("content_extent", &self.content_extent)
            .finish_non_exhaustive()
    }
}

impl<S: ItemSource> JustifiedGrid<S> {
    /// Creates a grid over `source` with the default [`GridConfig`].
    #[must_use]
    pub fn new(source: S) -> Self {
        Self::with_config(source, GridConfig::default())
    }

    /// Creates a grid over `source` with `config`.
    ///
    /// Nothing is laid out until the grid has a display width and a viewport.
    #[must_use]
    pub fn with_config(source: S, config: GridConfig) -> Self {
        Self {
            config,
            display_width: 0.0,
            scroll_offset: 0.0,
            viewport_height: 0.0,
            rows: Vec::new(),
            items: ItemStore::new(source),
            pending: ChangeSet::new(),
            layout_pending: true,
            highlight_enabled: false,
            content_extent: 0.0,
            notified: GridChanges::empty(),
        }
    }

    /// Returns a shared reference to the item source.
    #[must_use]
    pub fn source(&self) -> &S {
        &self.items.source
    }

    /// Returns a mutable reference to the item source.
    ///
    /// Structural changes made through this reference must be reported with
    /// [`JustifiedGrid::model_updated`].
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.items.source
    }

    /// Replaces the item source and returns the previous one.
    ///
    /// Everything held against the old source is released first. The current
    /// index is kept and resolved against the new source on the next pass.
    pub fn set_source(&mut self, source: S) -> S {
        self.clear();
        let had_highlight = self.items.destroy_highlight();
        let old = core::mem::replace(&mut self.items.source, source);
        if self.highlight_enabled {
            self.items.create_highlight();
        }
        if had_highlight || self.items.highlight.is_some() {
            self.notify(GridChanges::HIGHLIGHT);
        }
        old
    }

    /// Current configuration.
    #[must_use]
    pub const fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Applies every field of `config`.
    pub fn set_config(&mut self, config: GridConfig) {
        self.set_spacing(config.spacing);
        self.set_layout_width(config.layout_width);
        self.set_maximum_height(config.maximum_height);
    }

    /// Gap between items and between rows.
    #[must_use]
    pub const fn spacing(&self) -> u32 {
        self.config.spacing
    }

    /// Sets the gap between items and between rows.
    pub fn set_spacing(&mut self, spacing: u32) {
        if self.config.spacing == spacing {
            return;
        }
        self.config.spacing = spacing;
        self.layout_changed();
    }

    /// Width rows are fitted against: the explicit layout width if set,
    /// otherwise the display width.
    #[must_use]
    pub fn layout_width(&self) -> f64 {
        self.config
            .explicit_layout_width()
            .unwrap_or(self.display_width)
    }

    /// Overrides the width rows are fitted against. `None` follows the display width.
    pub fn set_layout_width(&mut self, layout_width: Option<f64>) {
        if self.config.layout_width == layout_width {
            return;
        }
        self.config.layout_width = layout_width;
        self.layout_changed();
        self.notify(GridChanges::LAYOUT_WIDTH);
    }

    /// Row height ceiling.
    #[must_use]
    pub const fn maximum_height(&self) -> f64 {
        self.config.maximum_height
    }

    /// Sets the row height ceiling.
    pub fn set_maximum_height(&mut self, maximum_height: f64) {
        if self.config.maximum_height == maximum_height {
            return;
        }
        self.config.maximum_height = maximum_height;
        self.layout_changed();
    }

    /// Width rows are rendered at.
    #[must_use]
    pub const fn display_width(&self) -> f64 {
        self.display_width
    }

    /// Sets the width rows are rendered at, typically the width of the
    /// scrolling container's content.
    pub fn set_display_width(&mut self, width: f64) {
        if self.display_width == width {
            return;
        }
        self.display_width = width;
        self.display_changed();
        if self.config.explicit_layout_width().is_none() {
            self.layout_changed();
            self.notify(GridChanges::LAYOUT_WIDTH);
        }
    }

    /// Top of the viewport in content coordinates.
    #[must_use]
    pub const fn scroll_offset(&self) -> f64 {
        self.scroll_offset
    }

    /// Height of the viewport.
    #[must_use]
    pub const fn viewport_height(&self) -> f64 {
        self.viewport_height
    }

    /// Sets the visible range to `scroll_offset..scroll_offset + height`.
    pub fn set_viewport(&mut self, scroll_offset: f64, height: f64) {
        if self.scroll_offset == scroll_offset && self.viewport_height == height {
            return;
        }
        self.scroll_offset = scroll_offset;
        self.viewport_height = height;
        self.request_layout();
    }

    /// Reports structural changes to the source's collection.
    ///
    /// A reset releases everything immediately; insertions and removals are
    /// queued and applied in order at the start of the next pass.
    pub fn model_updated(&mut self, changes: ChangeSet) {
        if changes.is_reset() {
            log::debug!("model reset");
            self.clear();
        }
        for &change in changes.changes() {
            self.pending.push(change);
        }
        if !self.pending.is_empty() {
            self.request_layout();
        }
    }

    /// Reports that a realized item's implicit size changed.
    pub fn item_implicit_size_changed(&mut self, item: &S::Item) {
        if let Some(index) = self.items.source.index_of(item) {
            self.invalidate_item(index);
        }
    }

    /// Drops the cached measurement of `index` and re-fits its row on the next pass.
    ///
    /// Also used to report that an asynchronously realized item became available.
    /// `index` refers to the source's present contents, even while structural
    /// changes are still queued.
    pub fn invalidate_item(&mut self, index: usize) {
        // Caches and rows are indexed as before the queued changes; an item
        // inserted by one of them has nothing cached yet.
        let cached = self
            .pending
            .changes()
            .iter()
            .rev()
            .try_fold(index, |index, change| change.unmap_index(index));
        if let Some(index) = cached {
            self.items.forget_aspect(index);
            if let Some(row) = self.row_of(index) {
                self.rows[row].data_changed();
            }
        }
        self.request_layout();
    }

    /// Releases all realized items and the current item and forgets every row
    /// and measurement. The current index is kept.
    pub fn clear(&mut self) {
        if self.items.release_all() {
            self.notify(GridChanges::CURRENT_ITEM);
        }
        self.rows.clear();
        self.pending.clear();
        self.request_layout();
    }

    /// Marks the grid as needing a layout pass.
    ///
    /// Requests are coalesced; a request made during a pass is served by the
    /// next one.
    pub fn request_layout(&mut self) {
        self.layout_pending = true;
    }

    /// Returns `true` if a layout pass has been requested and not yet run.
    #[must_use]
    pub const fn needs_layout(&self) -> bool {
        self.layout_pending
    }

    /// Runs one layout pass if one was requested. Returns `true` if it ran.
    pub fn run_pending_layout(&mut self) -> bool {
        if !self.layout_pending {
            return false;
        }
        self.layout();
        true
    }

    /// Rows known to the grid, in index order.
    ///
    /// Rows cover a contiguous prefix of the collection; rows past the last
    /// pass's walk may be stale and have no [`Row::display_y`].
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Placement of the realized item at `index`.
    #[must_use]
    pub fn placement(&self, index: usize) -> Option<&Placement<S::Item>> {
        self.items.placement(index)
    }

    /// All realized items with their placements, in no particular order.
    pub fn placements(&self) -> impl Iterator<Item = (usize, &Placement<S::Item>)> + '_ {
        self.items.placements()
    }

    /// Number of realized items, not counting the retained current item.
    #[must_use]
    pub fn realized_count(&self) -> usize {
        self.items.realized_len()
    }

    /// Total content height: exact once the walk has reached the last item,
    /// otherwise extrapolated from the rows seen so far.
    #[must_use]
    pub const fn content_extent(&self) -> f64 {
        self.content_extent
    }

    /// Returns and clears the set of changes since the last call.
    pub fn take_changes(&mut self) -> GridChanges {
        core::mem::take(&mut self.notified)
    }

    /// How many unmeasured items a row may hold before it must settle.
    #[must_use]
    pub fn maximum_loading_row_items(&self) -> usize {
        self.metrics().maximum_loading_row_items()
    }

    pub(crate) fn notify(&mut self, changes: GridChanges) {
        self.notified |= changes;
    }

    pub(crate) fn metrics(&self) -> RowMetrics {
        RowMetrics {
            layout_width: self.layout_width(),
            display_width: self.display_width,
            spacing: f64::from(self.config.spacing),
            maximum_height: self.config.maximum_height,
        }
    }

    fn layout_changed(&mut self) {
        for row in &mut self.rows {
            row.layout_changed();
            row.unplace();
        }
        self.request_layout();
    }

    fn display_changed(&mut self) {
        for row in &mut self.rows {
            row.display_changed();
            row.unplace();
        }
        self.request_layout();
    }
}

impl<S: ItemSource> Drop for JustifiedGrid<S> {
    fn drop(&mut self) {
        self.items.release_all();
        self.items.destroy_highlight();
    }
}

#[cfg(test)]
mod tests {
    use super::{GridChanges, JustifiedGrid};
    use crate::testing::{TestSource, laid_out};
    use crate::{ChangeSet, GridConfig};

    #[test]
    fn nothing_happens_without_geometry() {
        let mut grid = JustifiedGrid::new(TestSource::squares(10));
        assert!(grid.needs_layout());
        assert!(grid.run_pending_layout());
        assert!(grid.rows().is_empty());
        assert_eq!(grid.source().realize_calls(), 0);

        grid.set_display_width(1000.0);
        grid.run_pending_layout();
        assert!(grid.rows().is_empty(), "no viewport yet");

        grid.set_viewport(0.0, 600.0);
        grid.run_pending_layout();
        assert!(!grid.rows().is_empty());
    }

    #[test]
    fn requests_are_coalesced() {
        let mut grid = laid_out(TestSource::squares(10), 1000.0, 600.0);
        assert!(!grid.needs_layout());
        assert!(!grid.run_pending_layout());

        grid.set_viewport(10.0, 600.0);
        grid.set_spacing(4);
        grid.set_maximum_height(200.0);
        assert!(grid.run_pending_layout());
        assert!(!grid.run_pending_layout());
    }

    #[test]
    fn unchanged_settings_do_not_request_layout() {
        let mut grid = laid_out(TestSource::squares(10), 1000.0, 600.0);
        grid.set_config(*grid.config());
        grid.set_display_width(1000.0);
        grid.set_viewport(0.0, 600.0);
        assert!(!grid.needs_layout());
    }

    #[test]
    fn layout_width_follows_display_width_unless_overridden() {
        let mut grid = laid_out(TestSource::squares(10), 1000.0, 600.0);
        assert_eq!(grid.layout_width(), 1000.0);
        grid.take_changes();

        grid.set_display_width(800.0);
        assert_eq!(grid.layout_width(), 800.0);
        assert!(grid.take_changes().contains(GridChanges::LAYOUT_WIDTH));

        grid.set_layout_width(Some(1200.0));
        assert!(grid.take_changes().contains(GridChanges::LAYOUT_WIDTH));
        grid.set_display_width(900.0);
        assert_eq!(grid.layout_width(), 1200.0);
        assert!(!grid.take_changes().contains(GridChanges::LAYOUT_WIDTH));

        grid.set_layout_width(Some(0.0));
        assert_eq!(grid.layout_width(), 900.0);
    }

    #[test]
    fn config_round_trips() {
        let config = GridConfig {
            spacing: 6,
            layout_width: Some(640.0),
            maximum_height: 180.0,
        };
        let mut grid = JustifiedGrid::with_config(TestSource::squares(3), config);
        assert_eq!(*grid.config(), config);
        assert_eq!(grid.maximum_loading_row_items(), 5);

        grid.set_config(GridConfig::default());
        assert_eq!(grid.spacing(), 2);
        assert_eq!(grid.maximum_height(), 300.0);
        assert_eq!(grid.config().layout_width, None);
    }

    #[test]
    fn clear_and_replace_release_everything() {
        let mut grid = laid_out(TestSource::squares(40), 1000.0, 600.0);
        grid.set_current_index(Some(2));
        grid.run_pending_layout();
        assert!(grid.source().live_references() > 0);

        grid.clear();
        assert_eq!(grid.source().live_references(), 0);
        assert_eq!(grid.current_index(), Some(2));
        assert!(grid.current_item().is_none());

        grid.run_pending_layout();
        assert!(grid.current_item().is_some());

        let old = grid.set_source(TestSource::squares(5));
        assert_eq!(old.live_references(), 0);
        grid.run_pending_layout();
        assert_eq!(grid.current_index(), Some(2));
        assert!(grid.current_item().is_some());
    }

    #[test]
    fn dropping_the_grid_releases_everything() {
        let source = TestSource::squares(40);
        let counter = source.counter();
        let mut grid = laid_out(source, 1000.0, 600.0);
        grid.set_current_index(Some(35));
        grid.run_pending_layout();
        assert!(counter.live() > 0);
        drop(grid);
        assert_eq!(counter.live(), 0);
    }

    #[test]
    fn reset_clears_immediately() {
        let mut grid = laid_out(TestSource::squares(20), 1000.0, 600.0);
        grid.model_updated(ChangeSet::reset());
        assert!(grid.rows().is_empty());
        assert_eq!(grid.source().live_references(), 0);
        assert!(grid.needs_layout());

        grid.run_pending_layout();
        assert_eq!(grid.rows()[0].last(), 3);
    }
}
