// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Applying queued structural changes to rows, caches, and the cursor.

use crate::{Change, GridChanges, ItemSource, JustifiedGrid};

impl<S: ItemSource> JustifiedGrid<S> {
    /// Applies every queued [`Change`], in order.
    ///
    /// Rows may be left with gaps between them; the next walk closes them.
    pub(crate) fn apply_pending_changes(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let changes = self.pending.take();
        log::debug!("applying model changes: {changes:?}");

        // The source already reflects every change; walk its length back to
        // before the batch so removals can clamp the cursor as they happen.
        let mut len = changes
            .iter()
            .rev()
            .fold(self.items.source.count(), |len, change| change.revert_len(len));
        let before = self.items.cursor.index;
        let mut cursor_changed = false;

        for change in changes {
            match change {
                Change::Remove { index, .. } => {
                    // Everything from the removal point on is refitted anyway.
                    while self.rows.last().is_some_and(|row| row.last() >= index) {
                        self.rows.pop();
                    }
                }
                Change::Insert { index, count } => {
                    for row in &mut self.rows {
                        row.shift_for_insert(index, count);
                    }
                }
            }
            self.items.remap(change);
            len = change.apply_to_len(len);

            let cursor = &mut self.items.cursor;
            if !cursor.resolved {
                continue;
            }
            let Some(current) = cursor.index else {
                continue;
            };
            match change.map_index(current) {
                Some(mapped) if mapped == current => {}
                Some(mapped) => {
                    cursor.index = Some(mapped);
                    cursor_changed = true;
                }
                None => {
                    cursor.index = len.checked_sub(1).map(|max| change.index().min(max));
                    cursor_changed = true;
                }
            }
        }

        if self.items.cursor.index != before {
            self.notify(GridChanges::CURRENT_INDEX);
        }
        if cursor_changed {
            self.update_current();
        }
        self.request_layout();
    }
}
