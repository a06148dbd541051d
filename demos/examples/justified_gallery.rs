// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A photo gallery driven by `understory_justified_grid` with a simulated host.
//!
//! This example shows how a host:
//! - implements `ItemSource` with reference-counted photo handles whose sizes
//!   arrive a frame after they are first requested,
//! - runs one pass per frame and reports loaded sizes back to the grid,
//! - scrolls, moves the current item, and mutates the collection.
//!
//! Run:
//! - `RUST_LOG=debug cargo run -p understory_demos --example justified_gallery`

use std::collections::{HashMap, HashSet};

use kurbo::Size;
use understory_justified_grid::{ChangeSet, GridChanges, GridConfig, ItemSource, JustifiedGrid};

/// A photo handle: the photo's id, stable across insertions and removals.
type PhotoId = usize;

/// Photos whose pixel sizes are only known once "decoded".
struct Gallery {
    photos: Vec<(PhotoId, Size)>,
    next_id: PhotoId,
    refs: HashMap<PhotoId, usize>,
    /// Photos requested since the last frame; their sizes become known next frame.
    decoding: Vec<PhotoId>,
    decoded: HashSet<PhotoId>,
}

impl Gallery {
    fn new(count: usize) -> Self {
        let mut gallery = Self {
            photos: Vec::new(),
            next_id: 0,
            refs: HashMap::new(),
            decoding: Vec::new(),
            decoded: HashSet::new(),
        };
        gallery.insert(0, count);
        gallery
    }

    /// Inserts `count` photos with a repeating mix of shapes.
    fn insert(&mut self, index: usize, count: usize) {
        const SHAPES: [(f64, f64); 6] = [
            (4000.0, 3000.0),
            (3000.0, 4000.0),
            (6000.0, 2000.0),
            (2048.0, 2048.0),
            (1920.0, 1080.0),
            (2400.0, 3600.0),
        ];
        let new: Vec<_> = (0..count)
            .map(|_| {
                let id = self.next_id;
                self.next_id += 1;
                let (w, h) = SHAPES[id % SHAPES.len()];
                (id, Size::new(w, h))
            })
            .collect();
        self.photos.splice(index..index, new);
    }

    fn remove(&mut self, index: usize, count: usize) {
        self.photos.drain(index..index + count);
    }

    /// Finishes decoding everything requested last frame.
    fn finish_decoding(&mut self) -> Vec<PhotoId> {
        let done = std::mem::take(&mut self.decoding);
        self.decoded.extend(done.iter().copied());
        done
    }

    fn live(&self) -> usize {
        self.refs.values().sum()
    }
}

impl ItemSource for Gallery {
    type Item = PhotoId;

    fn count(&self) -> usize {
        self.photos.len()
    }

    fn realize(&mut self, index: usize, _asynchronous: bool) -> Option<PhotoId> {
        let &(id, _) = self.photos.get(index)?;
        *self.refs.entry(id).or_default() += 1;
        if !self.decoded.contains(&id) && !self.decoding.contains(&id) {
            self.decoding.push(id);
        }
        Some(id)
    }

    fn release(&mut self, item: PhotoId) {
        if let Some(refs) = self.refs.get_mut(&item) {
            *refs -= 1;
            if *refs == 0 {
                self.refs.remove(&item);
            }
        }
    }

    fn index_of(&self, item: &PhotoId) -> Option<usize> {
        self.photos.iter().position(|(id, _)| id == item)
    }

    fn implicit_size(&self, item: &PhotoId) -> Size {
        if !self.decoded.contains(item) {
            return Size::ZERO;
        }
        self.photos
            .iter()
            .find(|(id, _)| id == item)
            .map_or(Size::ZERO, |&(_, size)| size)
    }

    fn create_highlight(&mut self) -> Option<PhotoId> {
        Some(PhotoId::MAX)
    }
}

/// One host frame: deliver decoded sizes, then lay out.
fn frame(grid: &mut JustifiedGrid<Gallery>) {
    for id in grid.source_mut().finish_decoding() {
        grid.item_implicit_size_changed(&id);
    }
    grid.run_pending_layout();
}

fn print_state(label: &str, grid: &mut JustifiedGrid<Gallery>) {
    println!("== {label}");
    for row in grid.rows().iter().filter(|row| row.display_y().is_some()) {
        let y = row.display_y().unwrap_or_default();
        if y + row.height() < grid.scroll_offset()
            || y > grid.scroll_offset() + grid.viewport_height()
        {
            continue;
        }
        println!(
            "  row {:>3}..={:<3} y {:>7.1} height {:>5.1}{}",
            row.first(),
            row.last(),
            y,
            row.height(),
            if row.is_presentable() { "" } else { "  (loading)" }
        );
    }
    let changes = grid.take_changes();
    println!(
        "  realized {} live refs {} extent {:.1} current {:?} changes {:?}",
        grid.realized_count(),
        grid.source().live(),
        grid.content_extent(),
        grid.current_index(),
        changes
    );
    let highlight = grid
        .highlight()
        .filter(|_| changes.contains(GridChanges::HIGHLIGHT));
    if let Some(highlight) = highlight {
        println!(
            "  highlight at {:?} visible {}",
            highlight.rect, highlight.visible
        );
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = GridConfig {
        spacing: 4,
        maximum_height: 240.0,
        ..GridConfig::default()
    };
    let mut grid = JustifiedGrid::with_config(Gallery::new(500), config);
    log::info!(
        "gallery of {} photos, at most {} loading per row",
        grid.source().count(),
        grid.maximum_loading_row_items()
    );
    grid.set_display_width(1200.0);
    grid.set_viewport(0.0, 800.0);
    grid.set_highlight_enabled(true);

    // First frame realizes the top rows; their sizes arrive on the next one.
    frame(&mut grid);
    print_state("first frame", &mut grid);
    frame(&mut grid);
    frame(&mut grid);
    print_state("sizes decoded", &mut grid);

    grid.set_current_index(Some(2));
    grid.increment_current_row();
    frame(&mut grid);
    print_state("next row", &mut grid);

    // Scroll far down; the current item stays realized above the viewport.
    grid.set_viewport(12_000.0, 800.0);
    for _ in 0..4 {
        frame(&mut grid);
    }
    print_state("scrolled", &mut grid);

    // Remove a few photos above the current one and insert new ones.
    grid.source_mut().remove(0, 3);
    grid.source_mut().insert(10, 5);
    let mut changes = ChangeSet::new().removed(0, 3);
    changes.append(ChangeSet::new().inserted(10, 5));
    grid.model_updated(changes);
    for _ in 0..4 {
        frame(&mut grid);
    }
    print_state("after edits", &mut grid);

    // A narrower window reflows every row.
    grid.set_display_width(700.0);
    for _ in 0..4 {
        frame(&mut grid);
    }
    print_state("narrow", &mut grid);

    let old = grid.set_source(Gallery::new(0));
    println!("== replaced source; old source holds {} refs", old.live());
}
