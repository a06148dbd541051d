// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_justified_grid --heading-base-level=0

//! Understory Justified Grid: virtualized justified layout for items of varying aspect ratio.
//!
//! A *justified grid* lays items out left to right in rows that exactly fill
//! a target width. Each row holds just enough items to bring its height under
//! a configured maximum, so photos of any shape end up in rows of similar
//! height with no ragged right edge.
//!
//! This crate is the renderer-agnostic engine behind such a view. It combines
//! the row fitting with viewport virtualization: only rows overlapping the
//! viewport, plus the row holding the current item, are ever realized.
//!
//! The core concepts are:
//!
//! - [`ItemSource`]: the host's collection. The grid realizes items on demand,
//!   measures their natural size, and releases every handle it took.
//! - [`JustifiedGrid`]: the controller. It owns the source, the rows, and the
//!   realized items, and produces a [`Placement`] for each realized item.
//! - [`Row`]: a contiguous index run with its position and height.
//! - [`ChangeSet`]: a batch of [`Change`]s the host reports after mutating its
//!   collection. Rows, caches, and the current index follow the changes
//!   without re-measuring unaffected items.
//! - [`GridChanges`]: flags the host polls to learn what changed.
//!
//! The grid never lays out eagerly. Mutations and setters only request a pass;
//! hosts call [`JustifiedGrid::run_pending_layout`] once per frame.
//!
//! Items whose natural size is not known yet (an image still loading) report a
//! zero size. The row holding them keeps its place at the maximum height with
//! its items hidden until the host reports the size through
//! [`JustifiedGrid::item_implicit_size_changed`].
//!
//! ## Minimal example
//!
//! ```rust
//! use kurbo::Size;
//! use understory_justified_grid::{GridConfig, ItemSource, JustifiedGrid};
//!
//! /// Photos identified by their index, with known pixel sizes.
//! struct Photos(Vec<Size>);
//!
//! impl ItemSource for Photos {
//!     type Item = usize;
//!
//!     fn count(&self) -> usize {
//!         self.0.len()
//!     }
//!     fn realize(&mut self, index: usize, _asynchronous: bool) -> Option<usize> {
//!         (index < self.0.len()).then_some(index)
//!     }
//!     fn release(&mut self, _item: usize) {}
//!     fn index_of(&self, item: &usize) -> Option<usize> {
//!         Some(*item)
//!     }
//!     fn implicit_size(&self, item: &usize) -> Size {
//!         self.0[*item]
//!     }
//! }
//!
//! let photos = Photos(vec![Size::new(400.0, 400.0); 10]);
//! let config = GridConfig { spacing: 10, ..GridConfig::default() };
//! let mut grid = JustifiedGrid::with_config(photos, config);
//! grid.set_display_width(1000.0);
//! grid.set_viewport(0.0, 600.0);
//! grid.run_pending_layout();
//!
//! // Four squares fill 1000 wide at 243 tall; three would exceed 300.
//! let rows = grid.rows();
//! assert_eq!((rows[0].first(), rows[0].last()), (0, 3));
//! assert_eq!(rows[0].height(), 243.0);
//!
//! let second = grid.placement(1).unwrap();
//! assert_eq!(second.rect.x0, 253.0);
//! assert!(second.visible);
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod changes;
mod config;
mod cursor;
mod grid;
mod items;
mod layout;
mod row;
mod source;
mod tracker;

#[cfg(test)]
mod testing;

pub use changes::{Change, ChangeSet};
pub use config::GridConfig;
pub use grid::{GridChanges, JustifiedGrid};
pub use items::Placement;
pub use row::Row;
pub use source::ItemSource;
