// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layout parameters.

/// Parameters controlling how rows are fitted.
///
/// ```rust
/// use understory_justified_grid::GridConfig;
///
/// let config = GridConfig {
///     spacing: 4,
///     maximum_height: 240.0,
///     ..GridConfig::default()
/// };
/// assert_eq!(config.layout_width, None);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridConfig {
    /// Gap between adjacent items in a row and between consecutive rows.
    pub spacing: u32,
    /// Width rows are fitted against, if it should differ from the display width.
    ///
    /// Rows are always rendered at the display width; fitting against a
    /// different width keeps row membership stable while the display width
    /// animates. `None` (or a non-positive width) follows the display width.
    pub layout_width: Option<f64>,
    /// Height rows should not exceed.
    ///
    /// A row only ends up taller when a single item is taller on its own, or
    /// when the collection runs out of items to add.
    pub maximum_height: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            spacing: 2,
            layout_width: None,
            maximum_height: 300.0,
        }
    }
}

impl GridConfig {
    /// The explicit layout width, ignoring unset and non-positive values.
    #[must_use]
    pub fn explicit_layout_width(&self) -> Option<f64> {
        self.layout_width.filter(|width| *width > 0.0)
    }
}
