//! # Coordinate Projection
//!
//! Maps geographic coordinates (WGS84 lon/lat degrees) onto a discrete cell grid
//! centered on the search point.
//!
//! ## Pipeline
//! ```text
//! Geographic (WGS84)  →  Scaled offset       →  Grid cell
//!   lon/lat degrees       (Δlon, Δlat)·scale     (column, row), row grows south
//! ```
//!
//! ## Table of Contents
//! 1. Point helpers
//! 2. GridCell — Integer cell address
//! 3. GridSpec — Grid geometry and projection

use serde::{Deserialize, Serialize};

use crate::error::{GridError, Result};

// ============================================================================
// 1. Point helpers
// ============================================================================

/// A geographic position: x = longitude, y = latitude (decimal degrees)
pub type Point = geo::Point<f64>;

/// Build a point from longitude/latitude degrees
pub fn lon_lat(lon: f64, lat: f64) -> Point {
    Point::new(lon, lat)
}

/// Whether both components are finite numbers
pub fn is_finite(point: &Point) -> bool {
    point.x().is_finite() && point.y().is_finite()
}

// ============================================================================
// 2. GridCell — Integer cell address
// ============================================================================

/// A discrete grid address. Columns grow east, rows grow south.
///
/// Nothing bounds a cell to the display window; see [`GridSpec::contains`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCell {
    pub column: i64,
    pub row: i64,
}

impl GridCell {
    pub const fn new(column: i64, row: i64) -> Self {
        Self { column, row }
    }
}

impl From<(i64, i64)> for GridCell {
    fn from((column, row): (i64, i64)) -> Self {
        Self { column, row }
    }
}

impl std::fmt::Display for GridCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.column, self.row)
    }
}

// ============================================================================
// 3. GridSpec — Grid geometry and projection
// ============================================================================

/// Default grid side length in cells
pub const DEFAULT_GRID_SIZE: u32 = 100;
/// Default cells per degree
pub const DEFAULT_SCALE: f64 = 100.0;

/// Dimensions and scale of the target grid.
///
/// The center point always lands in the origin cell `(width / 2, height / 2)`,
/// which is `(50, 50)` for the default 100×100 grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    /// Columns in the display window
    pub width: u32,
    /// Rows in the display window
    pub height: u32,
    /// Cells per degree of longitude/latitude
    pub scale: f64,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            width: DEFAULT_GRID_SIZE,
            height: DEFAULT_GRID_SIZE,
            scale: DEFAULT_SCALE,
        }
    }
}

impl GridSpec {
    /// Default-sized grid with a custom scale
    pub fn with_scale(scale: f64) -> Self {
        Self {
            scale,
            ..Self::default()
        }
    }

    /// Reject an empty window or a scale that is not a positive finite number
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(GridError::validation(format!(
                "grid must be at least 1×1, got {}×{}",
                self.width, self.height
            )));
        }
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(GridError::validation(format!(
                "grid scale must be a positive finite number, got {}",
                self.scale
            )));
        }
        Ok(())
    }

    /// Cell the center point projects to
    pub fn origin(&self) -> GridCell {
        GridCell::new(i64::from(self.width / 2), i64::from(self.height / 2))
    }

    /// Project a geographic coordinate relative to `center`.
    ///
    /// Pure and deterministic. Values are floored (toward negative infinity),
    /// never rounded, and never clamped: points outside the window yield
    /// negative or oversized addresses.
    pub fn project(&self, coord: &Point, center: &Point) -> GridCell {
        let origin = self.origin();
        let x = (coord.x() - center.x()) * self.scale;
        let y = (coord.y() - center.y()) * self.scale;

        // Row axis is inverted: latitude grows north, rows grow south
        let column = (x + origin.column as f64).floor() as i64;
        let row = (origin.row as f64 - y).floor() as i64;
        GridCell::new(column, row)
    }

    /// Whether a cell lies inside the `width × height` display window
    pub fn contains(&self, cell: GridCell) -> bool {
        (0..i64::from(self.width)).contains(&cell.column)
            && (0..i64::from(self.height)).contains(&cell.row)
    }

    /// Clamp a cell onto the nearest border cell of the window
    pub fn clamp(&self, cell: GridCell) -> GridCell {
        let max_col = i64::from(self.width.max(1)) - 1;
        let max_row = i64::from(self.height.max(1)) - 1;
        GridCell::new(cell.column.clamp(0, max_col), cell.row.clamp(0, max_row))
    }
}

/// Project `coord` onto the default 100×100 grid at the given scale
pub fn project(coord: &Point, center: &Point, scale: f64) -> GridCell {
    GridSpec::with_scale(scale).project(coord, center)
}
