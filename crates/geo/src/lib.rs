//! # Street Grid — Street Centerlines on a Cell Grid
//!
//! Locates a point from an address, selects the street centerlines that fall
//! within a radius of it, and rasterizes them onto a discrete cell grid that a
//! spreadsheet-style document can display one filled cell at a time.
//!
//! ## Architecture
//! - `street-grid.toml` — Declarative run config (dataset, grid, geocoder)
//! - Dataset — ESRI Shapefile set or GeoJSON of line features (WGS84)
//! - Artifacts — painted grid text, render plan JSON, selection GeoJSON
//!
//! ## Modules
//! - `config` — Parse `street-grid.toml`
//! - `coords` — Grid cells and the lon/lat → cell projection
//! - `vector_import` — Shapefile/GeoJSON → validated line features
//! - `spatial_index` — R-tree over feature envelopes
//! - `filter` — Search region and circular-buffer selection
//! - `raster` — Discrete line walk and render plans
//! - `canvas` — Cell document with an explicit out-of-window policy
//! - `geocode` — Address → point capability (Nominatim, static table)
//! - `export` — Artifact writers
//! - `pipeline` — Stage wiring for one extraction
//!
//! ## Table of Contents
//! 1. Module declarations
//! 2. Re-exports

pub mod canvas;
pub mod config;
pub mod coords;
pub mod error;
pub mod export;
pub mod filter;
pub mod geocode;
pub mod pipeline;
pub mod raster;
pub mod spatial_index;
pub mod vector_import;

pub use canvas::{GridCanvas, OutOfBounds, PaintReport};
pub use config::StreetGridConfig;
pub use coords::{lon_lat, project, GridCell, GridSpec, Point};
pub use error::{ErrorKind, GridError, Result};
pub use filter::{DistanceToAngle, FlatEarth, SearchRegion, SpatialFilter};
pub use geocode::{Geocoder, NominatimGeocoder, StaticGeocoder};
pub use pipeline::{Extraction, Outcome, Pipeline};
pub use raster::{segments, FeatureStroke, LineWalk, Rasterizer, RenderPlan};
pub use vector_import::{Dataset, FileSource, GeometrySource, LineFeature};
