// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The layout pass: walking rows down to the viewport, positioning realized
//! items, and releasing everything that scrolled away.

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::Rect;

use crate::row::{AspectLookup, Row};
use crate::{GridChanges, ItemSource, JustifiedGrid};

impl<S: ItemSource> JustifiedGrid<S> {
    /// Runs a layout pass now, whether or not one was requested.
    ///
    /// Does nothing while the layout width, the display width, or the viewport
    /// height is below one; queued structural changes then stay queued.
    pub fn layout(&mut self) {
        let metrics = self.metrics();
        if metrics.layout_width < 1.0 || metrics.display_width < 1.0 || self.viewport_height < 1.0
        {
            log::debug!(
                "layout skipped: layout width {}, display width {}, viewport height {}",
                metrics.layout_width,
                metrics.display_width,
                self.viewport_height
            );
            self.layout_pending = false;
            return;
        }

        self.apply_pending_changes();
        if !self.items.cursor.resolved && self.items.cursor.index.is_some() {
            self.update_current();
        }
        // Anything requested from here on is left for the next pass.
        self.layout_pending = false;

        let min_y = self.scroll_offset;
        self.layout_items(min_y, min_y + self.viewport_height);
        self.update_content_extent();
        self.update_highlight();
        self.notify(GridChanges::PLACEMENTS);
    }

    fn layout_items(&mut self, min_y: f64, max_y: f64) {
        let metrics = self.metrics();
        let count = self.items.source.count();
        let current = self.items.cursor.index.filter(|&index| index < count);

        log::debug!(
            "layout: {min_y} to {max_y} over {count} items, layout width {}, display width {}",
            metrics.layout_width,
            metrics.display_width
        );

        let mut y = 0.0;
        let mut first_row = None;
        let mut last_row = None;
        let mut current_row = None;
        let mut moved = false;
        let mut ri = 0;

        loop {
            let row_first = match ri {
                0 => 0,
                _ => self.rows[ri - 1].last() + 1,
            };
            if row_first >= count {
                self.rows.truncate(ri);
                break;
            }
            let wants_current =
                current_row.is_none() && current.is_some_and(|index| index >= row_first);
            if last_row.is_some() && !wants_current {
                break;
            }

            let before_window = first_row.is_none() && y + metrics.maximum_height < min_y;
            self.items.cached_only = before_window || last_row.is_some();

            if ri == self.rows.len() {
                self.rows.push(Row::starting_at(row_first));
            }
            let row = &mut self.rows[ri];
            row.update(row_first, count - 1, &metrics, &mut self.items);

            // A row that is still loading holds the place of a full-height row.
            let presentable = row.loading_count(&mut self.items) == 0;
            let height = if presentable {
                row.display_height(&metrics, &mut self.items)
            } else {
                metrics.maximum_height
            };
            moved |= row.place(y, height, presentable);

            log::trace!(
                "layout: row {ri} for {} to {} y {y} height {height}{}",
                row.first(),
                row.last(),
                if presentable { "" } else { " (loading)" }
            );

            if current.is_some_and(|index| row.contains(index)) {
                current_row = Some(ri);
            }
            if first_row.is_none() && y + height >= min_y {
                first_row = Some(ri);
            }
            y += height + metrics.spacing;
            if last_row.is_none() && first_row.is_some() && y > max_y {
                last_row = Some(ri);
            }
            ri += 1;
        }
        self.items.cached_only = false;

        if ri > 0 && first_row.is_some() && last_row.is_none() {
            last_row = Some(ri - 1);
        }

        // Rows past the walk keep their ranges for the next pass, unless the
        // walk left a gap before them.
        if ri > 0 && ri < self.rows.len() {
            if self.rows[ri].first() != self.rows[ri - 1].last() + 1 {
                self.rows.truncate(ri);
            } else if moved {
                for row in &mut self.rows[ri..] {
                    row.unplace();
                }
            }
        }

        let window = first_row.zip(last_row);
        if let Some((first, last)) = window {
            for ri in first..=last {
                self.apply_positions(ri, false);
            }
        }
        let outside_window =
            |ri: &usize| !window.is_some_and(|(first, last)| (first..=last).contains(ri));
        if let Some(ri) = current_row.filter(outside_window) {
            self.apply_positions(ri, true);
        }

        let visible =
            window.map(|(first, last)| (self.rows[first].first(), self.rows[last].last()));
        let retained = current_row.map(|ri| (self.rows[ri].first(), self.rows[ri].last()));
        let within = |range: Option<(usize, usize)>, index: usize| {
            range.is_some_and(|(first, last)| first <= index && index <= last)
        };
        self.items
            .release_unless(|index| within(visible, index) || within(retained, index));
    }

    /// Moves the realized items of row `ri` to where the walk put it.
    fn apply_positions(&mut self, ri: usize, asynchronous: bool) {
        let metrics = self.metrics();
        let row = &mut self.rows[ri];
        let Some(y) = row.display_y() else {
            return;
        };
        let (first, last) = (row.first(), row.last());

        if !row.is_presentable() {
            // Rows walked from the cache may see their items for the first time here.
            let mut revealed = false;
            for index in first..=last {
                let measured = self.items.is_measured(index);
                if self.items.create_item(index, asynchronous).is_none() {
                    continue;
                }
                if !measured && self.items.aspect_ratio(index) > 0.0 {
                    revealed = true;
                }
                self.items.hide(index, y);
            }
            if revealed {
                log::debug!("layout: row {first} to {last} has new measurements");
                self.rows[ri].data_changed();
                self.request_layout();
            }
            return;
        }

        let height = row.height();
        let mut available = metrics.display_width - (row.len() - 1) as f64 * metrics.spacing;
        let mut remaining = row.aspect(&mut self.items);
        let mut x = 0.0;
        for index in first..=last {
            let item = self.items.create_item(index, asynchronous);
            let aspect = self.items.aspect_ratio(index);
            let width = (available / (remaining / aspect)).round();
            if item.is_some() {
                self.items
                    .place(index, Rect::from_origin_size((x, y), (width, height)));
            }
            available -= width;
            remaining -= aspect;
            x += width + metrics.spacing;
        }
    }

    fn update_content_extent(&mut self) {
        let count = self.items.source.count();
        let exact = self
            .rows
            .last()
            .filter(|row| row.last() + 1 == count)
            .and_then(|row| Some(row.display_y()? + row.height()));
        let extent = exact.unwrap_or_else(|| {
            let average = match self.rows.last() {
                Some(row) => (row.last() + 1) as f64 / self.rows.len() as f64,
                None => 1.0,
            };
            count as f64 / average * self.config.maximum_height
        });
        if extent != self.content_extent {
            self.content_extent = extent;
            self.notify(GridChanges::CONTENT_EXTENT);
        }
    }
}
