//! # Extraction Pipeline
//!
//! Runs one extraction end to end, strictly in sequence:
//!
//! ```text
//! radius check → geocode → load dataset → select → project + rasterize
//!                                              ↘ (nothing selected) NoResults
//! ```
//!
//! Every stage failure aborts the run with its [`GridError`]; there is no
//! partial result. An empty selection is a normal [`Outcome::NoResults`].
//!
//! ## Table of Contents
//! 1. Outcome / Extraction — Run results
//! 2. Pipeline — Stage wiring
//! 3. Rendering

use std::path::Path;

use crate::canvas::{GridCanvas, OutOfBounds, PaintReport};
use crate::config::StreetGridConfig;
use crate::coords::GridSpec;
use crate::error::{GridError, Result};
use crate::export::{self, Artifacts};
use crate::filter::{validate_radius, FlatEarth, SearchRegion, SpatialFilter};
use crate::geocode::{self, Geocoder};
use crate::raster::{Rasterizer, RenderPlan};
use crate::vector_import::{FileSource, GeometrySource, LineFeature};

// ============================================================================
// 1. Outcome / Extraction — Run results
// ============================================================================

/// Terminal state of a successful run
#[derive(Debug, Clone)]
pub enum Outcome {
    /// No street intersects the search region; nothing to render
    NoResults { region: SearchRegion },
    /// At least one street was selected
    Extracted(Extraction),
}

/// Selected streets and their rasterization
#[derive(Debug, Clone)]
pub struct Extraction {
    pub region: SearchRegion,
    /// Selected features, in dataset order
    pub features: Vec<LineFeature>,
    pub plan: RenderPlan,
}

/// Files written by [`Pipeline::render`]
#[derive(Debug, Clone)]
pub struct RenderReport {
    pub artifacts: Artifacts,
    pub paint: PaintReport,
}

/// How the grid document is drawn
#[derive(Debug, Clone)]
pub struct CanvasStyle {
    pub title: String,
    pub fill: char,
    pub out_of_bounds: OutOfBounds,
}

impl Default for CanvasStyle {
    fn default() -> Self {
        Self {
            title: "Street Map".to_string(),
            fill: '#',
            out_of_bounds: OutOfBounds::Skip,
        }
    }
}

// ============================================================================
// 2. Pipeline — Stage wiring
// ============================================================================

pub struct Pipeline {
    source: Box<dyn GeometrySource>,
    geocoder: Box<dyn Geocoder>,
    filter: SpatialFilter,
    rasterizer: Rasterizer,
    style: CanvasStyle,
}

impl Pipeline {
    /// Pipeline with the default filter, 100×100 grid and canvas style
    pub fn new(
        source: impl GeometrySource + 'static,
        geocoder: impl Geocoder + 'static,
    ) -> Self {
        Self::from_parts(Box::new(source), Box::new(geocoder))
    }

    pub fn from_parts(source: Box<dyn GeometrySource>, geocoder: Box<dyn Geocoder>) -> Self {
        Self {
            source,
            geocoder,
            filter: SpatialFilter::default(),
            rasterizer: Rasterizer::default(),
            style: CanvasStyle::default(),
        }
    }

    /// Wire every stage from configuration
    pub fn from_config(config: &StreetGridConfig) -> Result<Self> {
        let path = config.dataset.path.as_ref().ok_or_else(|| {
            GridError::validation("no dataset configured; set [dataset] path or pass --dataset")
        })?;
        let source = FileSource::from_config(path, &config.dataset);
        let geocoder = geocode::from_config(&config.geocoder)?;

        let grid = config.grid.spec();
        grid.validate()?;

        let filter = SpatialFilter::new(FlatEarth {
            meters_per_degree: config.search.meters_per_degree,
        })
        .with_segments(config.search.buffer_segments);

        Ok(Self::from_parts(Box::new(source), geocoder)
            .with_filter(filter)
            .with_rasterizer(
                Rasterizer::new(grid).with_max_segment_cells(config.grid.max_segment_cells),
            )
            .with_style(CanvasStyle {
                title: config.output.title.clone(),
                fill: config.output.fill,
                out_of_bounds: config.grid.out_of_bounds,
            }))
    }

    pub fn with_filter(mut self, filter: SpatialFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Grid used for projection; checked at the start of every run
    pub fn with_grid(mut self, grid: GridSpec) -> Self {
        self.rasterizer.grid = grid;
        self
    }

    pub fn with_rasterizer(mut self, rasterizer: Rasterizer) -> Self {
        self.rasterizer = rasterizer;
        self
    }

    pub fn with_style(mut self, style: CanvasStyle) -> Self {
        self.style = style;
        self
    }

    /// Resolve `address`, select streets within `radius_m`, rasterize them
    pub fn run(&self, address: &str, radius_m: f64) -> Result<Outcome> {
        validate_radius(radius_m)?;
        self.rasterizer.grid.validate()?;

        tracing::info!("Geocoding address '{}'", address);
        let center = self
            .geocoder
            .geocode(address)?
            .ok_or_else(|| GridError::validation(format!("Address not found: {}", address)))?;
        tracing::info!("Resolved to ({:.6}, {:.6})", center.x(), center.y());

        let region = SearchRegion::new(center, radius_m)?;

        let dataset = self.source.load()?;
        let selected = self.filter.select(dataset.features(), &region)?;

        if selected.is_empty() {
            tracing::info!("No streets found within {} m", radius_m);
            return Ok(Outcome::NoResults { region });
        }

        let plan = self.rasterizer.plan(&selected, &center)?;
        tracing::info!(
            "Planned {} cells for {} streets",
            plan.cell_count(),
            selected.len()
        );

        Ok(Outcome::Extracted(Extraction {
            region,
            features: selected.into_iter().cloned().collect(),
            plan,
        }))
    }

    // ========================================================================
    // 3. Rendering
    // ========================================================================

    /// Paint the grid document and write all artifacts under `output_dir`
    pub fn render(&self, extraction: &Extraction, output_dir: &Path) -> Result<RenderReport> {
        std::fs::create_dir_all(output_dir).map_err(|e| {
            GridError::render(format!("cannot create {}: {}", output_dir.display(), e))
        })?;
        let artifacts = Artifacts::now(output_dir);

        let mut canvas = GridCanvas::new(
            self.rasterizer.grid,
            self.style.title.clone(),
            self.style.out_of_bounds,
        );
        let paint = canvas.paint(&extraction.plan)?;
        canvas.write_text(&artifacts.grid_text, self.style.fill)?;

        export::write_plan(&artifacts.plan_json, &extraction.plan)?;

        let buffer = self.filter.buffer(&extraction.region);
        let selected: Vec<&LineFeature> = extraction.features.iter().collect();
        export::write_selection(&artifacts.geojson, &selected, &extraction.region, &buffer)?;

        tracing::info!("Wrote artifacts to {}", output_dir.display());
        Ok(RenderReport { artifacts, paint })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::{lon_lat, GridCell, Point};
    use crate::vector_import::Dataset;
    use crate::ErrorKind;
    use std::cell::Cell;
    use std::rc::Rc;

    fn streets() -> Dataset {
        Dataset::new(
            vec![
                LineFeature::from_lon_lat(
                    0,
                    Some("5 AVENUE"),
                    &[(-73.9857, 40.7484), (-73.9850, 40.7490)],
                )
                .unwrap(),
                LineFeature::from_lon_lat(1, Some("FAR RD"), &[(-74.5, 41.0), (-74.4, 41.1)]).unwrap(),
            ],
            None,
        )
    }

    fn empire(_: &str) -> Option<Point> {
        Some(lon_lat(-73.9857, 40.7484))
    }

    /// Source that records whether it was asked to load
    struct Probe(Rc<Cell<bool>>);

    impl GeometrySource for Probe {
        fn load(&self) -> Result<Dataset> {
            self.0.set(true);
            Ok(Dataset::default())
        }
    }

    #[test]
    fn test_zero_radius_halts_before_geocoding_and_loading() {
        let loaded = Rc::new(Cell::new(false));
        let geocoded = Rc::new(Cell::new(false));
        let flag = geocoded.clone();
        let pipeline = Pipeline::new(Probe(loaded.clone()), move |_: &str| {
            flag.set(true);
            Some(lon_lat(0.0, 0.0))
        });

        let err = pipeline.run("anywhere", 0.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(!geocoded.get());
        assert!(!loaded.get());
    }

    #[test]
    fn test_unknown_address_is_validation_error() {
        let loaded = Rc::new(Cell::new(false));
        let pipeline = Pipeline::new(Probe(loaded.clone()), |_: &str| None);
        let err = pipeline.run("nowhere", 100.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(!loaded.get());
    }

    #[test]
    fn test_empty_dataset_reports_no_results() {
        let loaded = Rc::new(Cell::new(false));
        let pipeline = Pipeline::new(Probe(loaded.clone()), empire);
        let outcome = pipeline.run("350 5th Ave", 200.0).unwrap();
        assert!(loaded.get());
        assert!(matches!(outcome, Outcome::NoResults { .. }));
    }

    #[test]
    fn test_extraction_selects_nearby_street_only() {
        let pipeline = Pipeline::new(streets(), empire);
        let Outcome::Extracted(extraction) = pipeline.run("350 5th Ave", 200.0).unwrap() else {
            panic!("expected an extraction");
        };
        assert_eq!(extraction.features.len(), 1);
        assert_eq!(extraction.features[0].name.as_deref(), Some("5 AVENUE"));

        let stroke = &extraction.plan.strokes[0];
        assert_eq!(stroke.segments.len(), 1);
        assert_eq!(stroke.segments[0].first(), Some(&GridCell::new(50, 50)));
        let end = *stroke.segments[0].last().unwrap();
        assert!(end.column >= 50 && end.row < 50);
    }

    #[test]
    fn test_render_writes_all_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(streets(), empire).with_grid(GridSpec::with_scale(10_000.0));
        let Outcome::Extracted(extraction) = pipeline.run("350 5th Ave", 200.0).unwrap() else {
            panic!("expected an extraction");
        };

        let report = pipeline.render(&extraction, dir.path()).unwrap();
        assert!(report.artifacts.grid_text.exists());
        assert!(report.artifacts.plan_json.exists());
        assert!(report.artifacts.geojson.exists());
        assert_eq!(report.paint.painted, extraction.plan.cell_count());

        let text = std::fs::read_to_string(&report.artifacts.grid_text).unwrap();
        assert!(text.starts_with("Street Map\n"));
        assert_eq!(text.lines().count(), 101);
    }

    #[test]
    fn test_render_reject_policy_fails_on_outside_cells() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(streets(), empire)
            .with_grid(GridSpec::with_scale(1_000_000.0))
            .with_style(CanvasStyle {
                out_of_bounds: OutOfBounds::Reject,
                ..CanvasStyle::default()
            });
        let Outcome::Extracted(extraction) = pipeline.run("350 5th Ave", 200.0).unwrap() else {
            panic!("expected an extraction");
        };
        let err = pipeline.render(&extraction, dir.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Render);
    }

    #[test]
    fn test_unusable_grid_halts_before_geocoding() {
        let loaded = Rc::new(Cell::new(false));
        let geocoded = Rc::new(Cell::new(false));
        let flag = geocoded.clone();
        let pipeline = Pipeline::new(Probe(loaded.clone()), move |_: &str| {
            flag.set(true);
            Some(lon_lat(0.0, 0.0))
        })
        .with_grid(GridSpec::with_scale(f64::NAN));

        let err = pipeline.run("anywhere", 100.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(!geocoded.get());
        assert!(!loaded.get());
    }

    #[test]
    fn test_from_config_rejects_bad_grid() {
        let mut config = StreetGridConfig::default();
        config.dataset.path = Some("streets.geojson".into());

        config.grid.scale = 0.0;
        let err = Pipeline::from_config(&config).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Validation);

        config.grid.scale = 100.0;
        config.grid.height = 0;
        let err = Pipeline::from_config(&config).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_overlong_segment_fails_run() {
        let pipeline = Pipeline::new(streets(), empire).with_rasterizer(
            Rasterizer::new(GridSpec::with_scale(100_000.0)).with_max_segment_cells(10),
        );
        let err = pipeline.run("350 5th Ave", 200.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_from_config_requires_dataset() {
        let err = Pipeline::from_config(&StreetGridConfig::default()).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
