//! # Grid Rasterization
//!
//! Turns selected street polylines into runs of grid cells.
//!
//! Each consecutive vertex pair is projected to grid space and walked with an
//! integer error-accumulating line walk (Bresenham), which yields an
//! 8-connected run of cells that includes both endpoints. Runs are kept per
//! segment and grouped per feature; the shared vertex of adjacent segments is
//! emitted by both.
//!
//! ## Table of Contents
//! 1. LineWalk — Discrete segment iterator
//! 2. RenderPlan — Per-feature cell runs
//! 3. Rasterizer — Projection + composition

use serde::{Deserialize, Serialize};
use std::iter::FusedIterator;

use crate::coords::{is_finite, GridCell, GridSpec, Point};
use crate::error::{GridError, Result};
use crate::vector_import::LineFeature;

// ============================================================================
// 1. LineWalk — Discrete segment iterator
// ============================================================================

/// Cells on the digital line from `start` to `end`, both included.
///
/// Single pass: once the end cell has been yielded the walk is exhausted.
/// Deltas and the error term are kept in `i128`, so any pair of `i64` cells
/// can be walked without overflow.
#[derive(Debug, Clone)]
pub struct LineWalk {
    x: i64,
    y: i64,
    end: GridCell,
    dx: i128,
    dy: i128,
    sx: i64,
    sy: i64,
    err: i128,
    done: bool,
}

impl LineWalk {
    pub fn new(start: GridCell, end: GridCell) -> Self {
        let dx = i128::from(start.column.abs_diff(end.column));
        let dy = i128::from(start.row.abs_diff(end.row));
        Self {
            x: start.column,
            y: start.row,
            end,
            dx,
            dy,
            sx: if start.column < end.column { 1 } else { -1 },
            sy: if start.row < end.row { 1 } else { -1 },
            err: dx - dy,
            done: false,
        }
    }

    /// Cells left to emit, current cell included
    pub fn remaining(&self) -> u64 {
        if self.done {
            return 0;
        }
        // Chebyshev distance to the end, plus the current cell
        self.x
            .abs_diff(self.end.column)
            .max(self.y.abs_diff(self.end.row))
            .saturating_add(1)
    }
}

impl Iterator for LineWalk {
    type Item = GridCell;

    fn next(&mut self) -> Option<GridCell> {
        if self.done {
            return None;
        }

        let current = GridCell::new(self.x, self.y);
        if current == self.end {
            self.done = true;
            return Some(current);
        }

        let e2 = 2 * self.err;
        if e2 > -self.dy {
            self.err -= self.dy;
            self.x += self.sx;
        }
        if e2 < self.dx {
            self.err += self.dx;
            self.y += self.sy;
        }
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.remaining()).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for LineWalk {}
impl FusedIterator for LineWalk {}

/// Walk the digital line between two cells
pub fn segments(start: GridCell, end: GridCell) -> LineWalk {
    LineWalk::new(start, end)
}

// ============================================================================
// 2. RenderPlan — Per-feature cell runs
// ============================================================================

/// Cell runs of one street, one run per vertex pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureStroke {
    /// Record index of the source feature
    pub feature_index: usize,
    /// Part number within the source record
    pub part: usize,
    pub name: Option<String>,
    /// One run per consecutive vertex pair, in vertex order
    pub segments: Vec<Vec<GridCell>>,
}

impl FeatureStroke {
    /// Cells of all segments concatenated (shared vertices repeat)
    pub fn cells(&self) -> impl Iterator<Item = GridCell> + '_ {
        self.segments.iter().flatten().copied()
    }

    pub fn cell_count(&self) -> usize {
        self.segments.iter().map(Vec::len).sum()
    }
}

/// Ordered cell emissions for one extraction, grouped by source feature
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderPlan {
    /// Projection used to produce the cells
    pub grid: GridSpec,
    /// Center the grid is anchored on, as `[lon, lat]`
    pub center: [f64; 2],
    pub strokes: Vec<FeatureStroke>,
}

impl RenderPlan {
    /// Every emitted cell, feature by feature
    pub fn cells(&self) -> impl Iterator<Item = GridCell> + '_ {
        self.strokes.iter().flat_map(FeatureStroke::cells)
    }

    pub fn cell_count(&self) -> usize {
        self.strokes.iter().map(FeatureStroke::cell_count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }
}

// ============================================================================
// 3. Rasterizer — Projection + composition
// ============================================================================

/// Longest run a single segment may produce before rasterization is refused
pub const DEFAULT_MAX_SEGMENT_CELLS: u64 = 65_536;

/// Projects features onto a grid and walks their segments
#[derive(Debug, Clone, Copy)]
pub struct Rasterizer {
    pub grid: GridSpec,
    /// Upper bound on the cells of one segment
    pub max_segment_cells: u64,
}

impl Default for Rasterizer {
    fn default() -> Self {
        Self::new(GridSpec::default())
    }
}

impl Rasterizer {
    pub fn new(grid: GridSpec) -> Self {
        Self {
            grid,
            max_segment_cells: DEFAULT_MAX_SEGMENT_CELLS,
        }
    }

    pub fn with_max_segment_cells(mut self, max: u64) -> Self {
        self.max_segment_cells = max.max(1);
        self
    }

    /// Cell runs for one feature.
    ///
    /// Fails with a validation error when a segment would span more than
    /// `max_segment_cells` cells; nothing is collected for it.
    pub fn stroke(&self, feature: &LineFeature, center: &Point) -> Result<FeatureStroke> {
        let cells: Vec<GridCell> = feature
            .vertices()
            .map(|v| self.grid.project(&v, center))
            .collect();

        let mut runs = Vec::with_capacity(cells.len().saturating_sub(1));
        for pair in cells.windows(2) {
            let walk = segments(pair[0], pair[1]);
            if walk.remaining() > self.max_segment_cells {
                return Err(GridError::validation(format!(
                    "segment {} → {} of '{}' spans {} cells (limit {}); lower the grid scale",
                    pair[0],
                    pair[1],
                    feature.display_name(),
                    walk.remaining(),
                    self.max_segment_cells
                )));
            }
            runs.push(walk.collect::<Vec<_>>());
        }

        tracing::debug!(
            "Rasterized '{}' ({} vertices) into {} cells",
            feature.display_name(),
            feature.vertex_count(),
            runs.iter().map(Vec::len).sum::<usize>()
        );

        Ok(FeatureStroke {
            feature_index: feature.index,
            part: feature.part,
            name: feature.name.clone(),
            segments: runs,
        })
    }

    /// Plan for a feature selection; strokes follow the selection order
    pub fn plan(&self, features: &[&LineFeature], center: &Point) -> Result<RenderPlan> {
        self.grid.validate()?;
        if !is_finite(center) {
            return Err(GridError::validation("grid center must be finite"));
        }

        Ok(RenderPlan {
            grid: self.grid,
            center: [center.x(), center.y()],
            strokes: self.strokes(features, center)?,
        })
    }

    #[cfg(not(feature = "parallel"))]
    fn strokes(&self, features: &[&LineFeature], center: &Point) -> Result<Vec<FeatureStroke>> {
        features.iter().map(|f| self.stroke(f, center)).collect()
    }

    /// Features are independent; the indexed collect keeps selection order
    #[cfg(feature = "parallel")]
    fn strokes(&self, features: &[&LineFeature], center: &Point) -> Result<Vec<FeatureStroke>> {
        use rayon::prelude::*;
        features.par_iter().map(|f| self.stroke(f, center)).collect()
    }
}
