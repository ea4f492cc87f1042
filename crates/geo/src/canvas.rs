//! # Grid Canvas
//!
//! Cell document that a [`RenderPlan`] is painted onto: one filled cell per
//! emitted [`GridCell`], under a title row.
//!
//! Cells outside the `width × height` window are handled by an explicit
//! [`OutOfBounds`] policy; nothing is written past the document edge.
//!
//! ## Table of Contents
//! 1. OutOfBounds — Policy for cells outside the window
//! 2. GridCanvas — Cell document
//! 3. Text output

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::coords::{GridCell, GridSpec};
use crate::error::{GridError, Result};
use crate::raster::RenderPlan;

// ============================================================================
// 1. OutOfBounds — Policy for cells outside the window
// ============================================================================

/// What to do with a plan cell that falls outside the display window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutOfBounds {
    /// Drop the cell and count it
    #[default]
    Skip,
    /// Paint the nearest border cell instead
    Clip,
    /// Fail the render
    Reject,
}

/// Outcome counters of [`GridCanvas::paint`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaintReport {
    /// Emissions written inside the window (repeats included)
    pub painted: usize,
    /// Emissions dropped under [`OutOfBounds::Skip`]
    pub skipped: usize,
    /// Emissions moved to the border under [`OutOfBounds::Clip`]
    pub clipped: usize,
}

// ============================================================================
// 2. GridCanvas — Cell document
// ============================================================================

/// `width × height` cell document with a title
#[derive(Debug, Clone)]
pub struct GridCanvas {
    spec: GridSpec,
    title: String,
    policy: OutOfBounds,
    cells: Vec<bool>,
}

impl GridCanvas {
    pub fn new(spec: GridSpec, title: impl Into<String>, policy: OutOfBounds) -> Self {
        let len = spec.width as usize * spec.height as usize;
        Self {
            spec,
            title: title.into(),
            policy,
            cells: vec![false; len],
        }
    }

    pub fn spec(&self) -> &GridSpec {
        &self.spec
    }

    /// Whether the cell at `cell` has been filled; `false` outside the window
    pub fn is_filled(&self, cell: GridCell) -> bool {
        self.offset(cell).map(|i| self.cells[i]).unwrap_or(false)
    }

    /// Number of distinct filled cells
    pub fn filled_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    /// Fill one cell per plan emission.
    ///
    /// Under [`OutOfBounds::Reject`] the canvas is left untouched when any
    /// cell falls outside the window.
    pub fn paint(&mut self, plan: &RenderPlan) -> Result<PaintReport> {
        let mut report = PaintReport::default();
        let mut targets = Vec::with_capacity(plan.cell_count());

        for cell in plan.cells() {
            if self.spec.contains(cell) {
                targets.push(cell);
                continue;
            }
            match self.policy {
                OutOfBounds::Skip => report.skipped += 1,
                OutOfBounds::Clip => {
                    report.clipped += 1;
                    targets.push(self.spec.clamp(cell));
                }
                OutOfBounds::Reject => {
                    return Err(GridError::render(format!(
                        "cell {} lies outside the {}×{} grid",
                        cell, self.spec.width, self.spec.height
                    )));
                }
            }
        }

        // Nothing is painted until every cell has been resolved
        for cell in targets {
            if let Some(i) = self.offset(cell) {
                self.cells[i] = true;
                report.painted += 1;
            }
        }

        if report.skipped > 0 || report.clipped > 0 {
            tracing::warn!(
                "{} cells fell outside the {}×{} grid ({} skipped, {} clipped)",
                report.skipped + report.clipped,
                self.spec.width,
                self.spec.height,
                report.skipped,
                report.clipped
            );
        }
        Ok(report)
    }

    fn offset(&self, cell: GridCell) -> Option<usize> {
        self.spec
            .contains(cell)
            .then(|| cell.row as usize * self.spec.width as usize + cell.column as usize)
    }

    // ========================================================================
    // 3. Text output
    // ========================================================================

    /// Title line followed by one line per row
    pub fn to_text(&self, fill: char) -> String {
        let width = self.spec.width as usize;
        let mut out = String::with_capacity((width + 1) * (self.spec.height as usize + 1));
        out.push_str(&self.title);
        out.push('\n');
        for row in self.cells.chunks(width.max(1)) {
            out.extend(row.iter().map(|&filled| if filled { fill } else { '.' }));
            out.push('\n');
        }
        out
    }

    /// Write [`Self::to_text`] to `path`
    pub fn write_text(&self, path: &Path, fill: char) -> Result<()> {
        std::fs::write(path, self.to_text(fill))
            .map_err(|e| GridError::render(format!("failed to write {}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::FeatureStroke;

    fn plan(cells: Vec<GridCell>, spec: GridSpec) -> RenderPlan {
        RenderPlan {
            grid: spec,
            center: [0.0, 0.0],
            strokes: vec![FeatureStroke {
                feature_index: 0,
                part: 0,
                name: None,
                segments: vec![cells],
            }],
        }
    }

    fn small() -> GridSpec {
        GridSpec {
            width: 4,
            height: 3,
            scale: 1.0,
        }
    }

    #[test]
    fn test_paint_inside_window() {
        let mut canvas = GridCanvas::new(small(), "Map", OutOfBounds::Skip);
        let report = canvas
            .paint(&plan(vec![GridCell::new(0, 0), GridCell::new(1, 1), GridCell::new(1, 1)], small()))
            .unwrap();
        assert_eq!(report, PaintReport { painted: 3, skipped: 0, clipped: 0 });
        assert_eq!(canvas.filled_count(), 2);
        assert_eq!(canvas.to_text('#'), "Map\n#...\n.#..\n....\n");
    }

    #[test]
    fn test_skip_policy_counts_outside_cells() {
        let mut canvas = GridCanvas::new(small(), "Map", OutOfBounds::Skip);
        let report = canvas
            .paint(&plan(vec![GridCell::new(-1, 0), GridCell::new(3, 2), GridCell::new(4, 2)], small()))
            .unwrap();
        assert_eq!(report.painted, 1);
        assert_eq!(report.skipped, 2);
        assert!(canvas.is_filled(GridCell::new(3, 2)));
        assert!(!canvas.is_filled(GridCell::new(4, 2)));
    }

    #[test]
    fn test_clip_policy_paints_border() {
        let mut canvas = GridCanvas::new(small(), "Map", OutOfBounds::Clip);
        let report = canvas.paint(&plan(vec![GridCell::new(10, -5)], small())).unwrap();
        assert_eq!(report.clipped, 1);
        assert!(canvas.is_filled(GridCell::new(3, 0)));
    }

    #[test]
    fn test_reject_policy_leaves_canvas_untouched() {
        let mut canvas = GridCanvas::new(small(), "Map", OutOfBounds::Reject);
        let err = canvas
            .paint(&plan(vec![GridCell::new(0, 0), GridCell::new(0, 7)], small()))
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Render);
        assert!(err.to_string().contains("(0, 7)"));
        assert_eq!(canvas.filled_count(), 0);
    }

    #[test]
    fn test_reject_policy_paints_plans_inside_window() {
        let mut canvas = GridCanvas::new(small(), "Map", OutOfBounds::Reject);
        let report = canvas
            .paint(&plan(vec![GridCell::new(0, 0), GridCell::new(3, 2)], small()))
            .unwrap();
        assert_eq!(report, PaintReport { painted: 2, skipped: 0, clipped: 0 });
        assert!(canvas.is_filled(GridCell::new(3, 2)));
    }

    #[test]
    fn test_write_text_failure_is_render_error() {
        let canvas = GridCanvas::new(small(), "Map", OutOfBounds::Skip);
        let err = canvas
            .write_text(Path::new("/nonexistent/dir/grid.txt"), '#')
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Render);
    }
}
