//! Grid geometry
//!
//! A single canonical coordinate space: integer cells, `columns` wide,
//! unbounded downwards. Breakpoint tables are a rendering concern.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Column count of the canonical grid
pub const DEFAULT_GRID_COLUMNS: u32 = 12;

/// Position and size of a widget instance in grid cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayoutGeometry {
    /// Column of the left edge
    pub x: i32,
    /// Row of the top edge
    pub y: i32,
    /// Width in columns
    pub w: i32,
    /// Height in rows
    pub h: i32,
}

impl LayoutGeometry {
    /// Create geometry
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Geometry at `position` with `size`
    #[inline]
    #[must_use]
    pub const fn at(position: GridPosition, size: GridSize) -> Self {
        Self::new(position.x, position.y, size.w, size.h)
    }

    /// Exclusive right edge (`x + w`)
    #[inline]
    #[must_use]
    pub fn right(&self) -> i64 {
        i64::from(self.x) + i64::from(self.w)
    }

    /// Exclusive bottom edge (`y + h`)
    #[inline]
    #[must_use]
    pub fn bottom(&self) -> i64 {
        i64::from(self.y) + i64::from(self.h)
    }

    /// Check grid invariants against a grid `columns` wide
    ///
    /// # Errors
    /// The first violated invariant.
    pub fn validate(&self, columns: u32) -> Result<(), GeometryViolation> {
        if self.x < 0 || self.y < 0 {
            return Err(GeometryViolation::NegativeOrigin);
        }
        if self.w <= 0 || self.h <= 0 {
            return Err(GeometryViolation::EmptySize);
        }
        if self.right() > i64::from(columns) {
            return Err(GeometryViolation::ExceedsColumns {
                right_edge: self.right(),
                columns,
            });
        }
        if self.bottom() > i64::from(i32::MAX) {
            return Err(GeometryViolation::RowOverflow {
                bottom_edge: self.bottom(),
            });
        }
        Ok(())
    }

    /// Whether two rectangles share at least one cell
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        i64::from(self.x) < other.right()
            && i64::from(other.x) < self.right()
            && i64::from(self.y) < other.bottom()
            && i64::from(other.y) < self.bottom()
    }
}

impl fmt::Display for LayoutGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{x:{}, y:{}, w:{}, h:{}}}", self.x, self.y, self.w, self.h)
    }
}

/// Grid invariant violated by a geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GeometryViolation {
    /// `x < 0` or `y < 0`
    #[error("origin must be non-negative")]
    NegativeOrigin,

    /// `w <= 0` or `h <= 0`
    #[error("width and height must be positive")]
    EmptySize,

    /// `x + w` past the last column
    #[error("right edge {right_edge} exceeds {columns} columns")]
    ExceedsColumns { right_edge: i64, columns: u32 },

    /// `y + h` past the last addressable row
    #[error("bottom edge {bottom_edge} exceeds the last grid row")]
    RowOverflow { bottom_edge: i64 },
}

/// Top-left cell for a new widget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GridPosition {
    /// Column
    pub x: i32,
    /// Row
    pub y: i32,
}

impl GridPosition {
    /// Create position
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Width and height in cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSize {
    /// Width in columns
    pub w: i32,
    /// Height in rows
    pub h: i32,
}

impl GridSize {
    /// Create size
    #[inline]
    #[must_use]
    pub const fn new(w: i32, h: i32) -> Self {
        Self { w, h }
    }
}
