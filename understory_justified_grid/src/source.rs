// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The host-facing item provider contract.

use core::fmt::Debug;

use kurbo::Size;

/// A dense, index-addressed collection of items that can be materialized on demand.
///
/// The grid never owns item instances. It asks the source to *realize* an index
/// when it needs a handle (to measure or position it) and hands every handle back
/// through [`ItemSource::release`] exactly once when it no longer needs it. A source
/// that realizes the same index twice is expected to hand out the same handle and
/// keep its own reference count; the grid relies on this when it retains the
/// current item independently of the visible window.
pub trait ItemSource {
    /// Handle for a materialized item.
    ///
    /// Handles are compared to detect whether the current item changed, so two
    /// handles for the same instance must compare equal.
    type Item: Clone + PartialEq + Debug;

    /// Number of items, indexed `0..count()`.
    fn count(&self) -> usize;

    /// Materializes the item at `index`.
    ///
    /// Returns `None` when the item cannot be produced right now, for example
    /// because `asynchronous` creation is still in flight. The host should call
    /// [`crate::JustifiedGrid::invalidate_item`] once it becomes available.
    fn realize(&mut self, index: usize, asynchronous: bool) -> Option<Self::Item>;

    /// Returns one reference obtained from [`ItemSource::realize`].
    fn release(&mut self, item: Self::Item);

    /// Returns the current index of `item`, if it is still part of the collection.
    fn index_of(&self, item: &Self::Item) -> Option<usize>;

    /// Natural, unscaled size of a realized item.
    ///
    /// A zero width or height means the item has not been measured yet (for
    /// example, an image that is still loading).
    fn implicit_size(&self, item: &Self::Item) -> Size;

    /// Instantiates the highlight template, if the host provides one.
    fn create_highlight(&mut self) -> Option<Self::Item> {
        None
    }

    /// Destroys an instance produced by [`ItemSource::create_highlight`].
    fn destroy_highlight(&mut self, highlight: Self::Item) {
        let _ = highlight;
    }
}

/// Aspect ratio (`width / height`) of a natural size, or `0.0` when unmeasured.
pub(crate) fn aspect_of(size: Size) -> f64 {
    if size.width > 0.0 && size.height > 0.0 {
        size.width / size.height
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use kurbo::Size;

    use super::aspect_of;

    #[test]
    fn unmeasured_sizes_have_no_aspect() {
        assert_eq!(aspect_of(Size::ZERO), 0.0);
        assert_eq!(aspect_of(Size::new(10.0, 0.0)), 0.0);
        assert_eq!(aspect_of(Size::new(0.0, 10.0)), 0.0);
        assert_eq!(aspect_of(Size::new(30.0, 20.0)), 1.5);
    }
}
