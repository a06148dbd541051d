// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A reference-counting [`ItemSource`] for tests.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};

use hashbrown::{HashMap, HashSet};
use kurbo::Size;

use crate::{ItemSource, JustifiedGrid};

/// Handles are stable ids; highlights count down from `u32::MAX`.
pub(crate) type ItemId = u32;

#[derive(Debug, Default)]
struct Counts {
    refs: HashMap<ItemId, usize>,
    highlights: usize,
}

/// Shared view of a [`TestSource`]'s live references, usable after the
/// source has been moved into (and dropped with) a grid.
#[derive(Clone, Debug)]
pub(crate) struct Counter(Rc<RefCell<Counts>>);

impl Counter {
    pub(crate) fn live(&self) -> usize {
        self.0.borrow().refs.values().sum()
    }

    pub(crate) fn highlights(&self) -> usize {
        self.0.borrow().highlights
    }
}

/// Items with fixed natural sizes. Every realization takes a reference and
/// every release must match one, or the source panics.
#[derive(Debug)]
pub(crate) struct TestSource {
    items: Vec<(ItemId, Size)>,
    next_id: ItemId,
    pending: HashSet<ItemId>,
    counts: Rc<RefCell<Counts>>,
    realize_calls: usize,
    size_queries: Cell<usize>,
    highlight: bool,
    next_highlight: ItemId,
}

fn size_for(aspect: f64) -> Size {
    if aspect > 0.0 {
        Size::new(aspect, 1.0)
    } else {
        Size::ZERO
    }
}

impl TestSource {
    /// Items with the given aspect ratios; `0.0` makes an item unmeasured.
    pub(crate) fn with_aspects(aspects: &[f64]) -> Self {
        let mut source = Self {
            items: Vec::new(),
            next_id: 0,
            pending: HashSet::new(),
            counts: Rc::default(),
            realize_calls: 0,
            size_queries: Cell::new(0),
            highlight: false,
            next_highlight: ItemId::MAX,
        };
        source.insert(0, aspects);
        source
    }

    pub(crate) fn squares(count: usize) -> Self {
        Self::with_aspects(&alloc::vec![1.0; count])
    }

    /// Enables [`ItemSource::create_highlight`].
    pub(crate) fn with_highlight(mut self) -> Self {
        self.highlight = true;
        self
    }

    pub(crate) fn counter(&self) -> Counter {
        Counter(self.counts.clone())
    }

    /// Inserts new items before `index`. The grid must be told separately.
    pub(crate) fn insert(&mut self, index: usize, aspects: &[f64]) {
        let new: Vec<_> = aspects
            .iter()
            .map(|&aspect| {
                let id = self.next_id;
                self.next_id += 1;
                (id, size_for(aspect))
            })
            .collect();
        self.items.splice(index..index, new);
    }

    /// Removes `count` items starting at `index`. The grid must be told separately.
    pub(crate) fn remove(&mut self, index: usize, count: usize) {
        self.items.drain(index..index + count);
    }

    pub(crate) fn set_aspect(&mut self, index: usize, aspect: f64) {
        self.items[index].1 = size_for(aspect);
    }

    /// While pending, realizing `index` yields nothing.
    pub(crate) fn set_pending(&mut self, index: usize, pending: bool) {
        let id = self.items[index].0;
        if pending {
            self.pending.insert(id);
        } else {
            self.pending.remove(&id);
        }
    }

    pub(crate) fn item_at(&self, index: usize) -> ItemId {
        self.items[index].0
    }

    pub(crate) fn refcount(&self, id: ItemId) -> usize {
        self.counts.borrow().refs.get(&id).copied().unwrap_or(0)
    }

    pub(crate) fn live_references(&self) -> usize {
        self.counter().live()
    }

    pub(crate) fn live_highlights(&self) -> usize {
        self.counter().highlights()
    }

    pub(crate) fn realize_calls(&self) -> usize {
        self.realize_calls
    }

    pub(crate) fn size_queries(&self) -> usize {
        self.size_queries.get()
    }
}

impl ItemSource for TestSource {
    type Item = ItemId;

    fn count(&self) -> usize {
        self.items.len()
    }

    fn realize(&mut self, index: usize, _asynchronous: bool) -> Option<ItemId> {
        self.realize_calls += 1;
        let &(id, _) = self.items.get(index)?;
        if self.pending.contains(&id) {
            return None;
        }
        *self.counts.borrow_mut().refs.entry(id).or_default() += 1;
        Some(id)
    }

    fn release(&mut self, item: ItemId) {
        let mut counts = self.counts.borrow_mut();
        let Some(refs) = counts.refs.get_mut(&item) else {
            panic!("release of item {item} that was never realized");
        };
        assert!(*refs > 0, "unmatched release of item {item}");
        *refs -= 1;
        if *refs == 0 {
            counts.refs.remove(&item);
        }
    }

    fn index_of(&self, item: &ItemId) -> Option<usize> {
        self.items.iter().position(|(id, _)| id == item)
    }

    fn implicit_size(&self, item: &ItemId) -> Size {
        self.size_queries.set(self.size_queries.get() + 1);
        self.items
            .iter()
            .find(|(id, _)| id == item)
            .map_or(Size::ZERO, |&(_, size)| size)
    }

    fn create_highlight(&mut self) -> Option<ItemId> {
        if !self.highlight {
            return None;
        }
        self.counts.borrow_mut().highlights += 1;
        let id = self.next_highlight;
        self.next_highlight -= 1;
        Some(id)
    }

    fn destroy_highlight(&mut self, highlight: ItemId) {
        let mut counts = self.counts.borrow_mut();
        assert!(
            counts.highlights > 0,
            "destroyed highlight {highlight} twice"
        );
        counts.highlights -= 1;
    }
}

/// A grid over `source` at `width`, showing `0..height`, after its first pass.
pub(crate) fn laid_out(source: TestSource, width: f64, height: f64) -> JustifiedGrid<TestSource> {
    let mut grid = JustifiedGrid::new(source);
    grid.set_display_width(width);
    grid.set_viewport(0.0, height);
    settle(&mut grid);
    grid
}

/// Runs passes until no more are requested.
pub(crate) fn settle(grid: &mut JustifiedGrid<TestSource>) {
    for _ in 0..16 {
        if !grid.run_pending_layout() {
            return;
        }
    }
    panic!("layout did not settle: {grid:?}");
}

pub(crate) fn row_bounds(grid: &JustifiedGrid<TestSource>) -> Vec<(usize, usize)> {
    grid.rows().iter().map(|row| (row.first(), row.last())).collect()
}
