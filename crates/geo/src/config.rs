//! # Extraction Configuration
//!
//! Parses `street-grid.toml` — the declarative config for a street extraction
//! run. Every section is optional; a missing section falls back to the
//! default 100×100 cell layout.
//!
//! ```toml
//! [dataset]
//! path = "Centerline/centerline.shp"
//! name_field = "STNAME"
//!
//! [grid]
//! width = 100
//! height = 100
//! scale = 100.0
//! out_of_bounds = "skip"
//! max_segment_cells = 65536
//!
//! [geocoder]
//! provider = "static"
//!
//! [geocoder.places]
//! "350 5th Ave, New York, NY" = [-73.9857, 40.7484]
//! ```
//!
//! ## Table of Contents
//! 1. StreetGridConfig — Top-level config
//! 2. DatasetConfig — Geometry source
//! 3. GridConfig / SearchConfig — Core parameters
//! 4. GeocoderConfig — Address resolution
//! 5. OutputConfig — Artifacts
//! 6. Parsing

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::canvas::OutOfBounds;
use crate::coords::{GridSpec, DEFAULT_GRID_SIZE, DEFAULT_SCALE};
use crate::filter::METERS_PER_DEGREE;
use crate::raster::DEFAULT_MAX_SEGMENT_CELLS;

// ============================================================================
// 1. StreetGridConfig — Top-level config
// ============================================================================

/// Top-level extraction configuration, parsed from `street-grid.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreetGridConfig {
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub geocoder: GeocoderConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

// ============================================================================
// 2. DatasetConfig — Geometry source
// ============================================================================

/// Where the street centerlines live
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Path to the `.shp` or `.geojson` file (relative paths resolve
    /// against the config file's directory)
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Attribute holding the street name
    #[serde(default = "default_name_field")]
    pub name_field: String,
    /// CRS assumed when the dataset declares none
    #[serde(default = "default_crs")]
    pub default_crs: String,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: None,
            name_field: default_name_field(),
            default_crs: default_crs(),
        }
    }
}

fn default_name_field() -> String {
    "STNAME".to_string()
}

fn default_crs() -> String {
    "EPSG:4326".to_string()
}

// ============================================================================
// 3. GridConfig / SearchConfig — Core parameters
// ============================================================================

/// Target grid geometry and the policy for cells outside it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    #[serde(default = "default_grid_size")]
    pub width: u32,
    #[serde(default = "default_grid_size")]
    pub height: u32,
    /// Cells per degree
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default)]
    pub out_of_bounds: OutOfBounds,
    /// Cells one segment may span before the run is refused
    #[serde(default = "default_max_segment_cells")]
    pub max_segment_cells: u64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_GRID_SIZE,
            height: DEFAULT_GRID_SIZE,
            scale: DEFAULT_SCALE,
            out_of_bounds: OutOfBounds::default(),
            max_segment_cells: DEFAULT_MAX_SEGMENT_CELLS,
        }
    }
}

impl GridConfig {
    pub fn spec(&self) -> GridSpec {
        GridSpec {
            width: self.width,
            height: self.height,
            scale: self.scale,
        }
    }
}

fn default_grid_size() -> u32 { DEFAULT_GRID_SIZE }
fn default_scale() -> f64 { DEFAULT_SCALE }
fn default_max_segment_cells() -> u64 { DEFAULT_MAX_SEGMENT_CELLS }

/// Spatial selection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Flat meters-per-degree factor for the radius conversion
    #[serde(default = "default_meters_per_degree")]
    pub meters_per_degree: f64,
    /// Vertices of the circular buffer polygon
    #[serde(default = "default_buffer_segments")]
    pub buffer_segments: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            meters_per_degree: default_meters_per_degree(),
            buffer_segments: default_buffer_segments(),
        }
    }
}

fn default_meters_per_degree() -> f64 { METERS_PER_DEGREE }
fn default_buffer_segments() -> usize { 64 }

// ============================================================================
// 4. GeocoderConfig — Address resolution
// ============================================================================

/// Which geocoding backend resolves addresses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeocoderProvider {
    /// OpenStreetMap Nominatim over HTTP
    #[default]
    Nominatim,
    /// Lookup table from `[geocoder.places]`
    Static,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocoderConfig {
    #[serde(default)]
    pub provider: GeocoderProvider,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Address → `[lon, lat]` for the static provider
    #[serde(default)]
    pub places: BTreeMap<String, [f64; 2]>,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            provider: GeocoderProvider::default(),
            endpoint: default_endpoint(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            places: BTreeMap::new(),
        }
    }
}

fn default_endpoint() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}

fn default_user_agent() -> String {
    "street_grid_extractor".to_string()
}

fn default_timeout_secs() -> u64 { 10 }

// ============================================================================
// 5. OutputConfig — Artifacts
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving the timestamped artifacts
    #[serde(default = "default_output_dir")]
    pub directory: PathBuf,
    /// Title row of the grid document
    #[serde(default = "default_title")]
    pub title: String,
    /// Glyph written into filled cells
    #[serde(default = "default_fill")]
    pub fill: char,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            title: default_title(),
            fill: default_fill(),
        }
    }
}

fn default_output_dir() -> PathBuf { PathBuf::from(".") }
fn default_title() -> String { "Street Map".to_string() }
fn default_fill() -> char { '#' }

// ============================================================================
// 6. Parsing
// ============================================================================

impl StreetGridConfig {
    /// Load a config from a `street-grid.toml` file path.
    ///
    /// A relative `dataset.path` is resolved against the file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let mut config: StreetGridConfig = toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;

        if let (Some(dir), Some(dataset)) = (path.parent(), config.dataset.path.as_ref()) {
            if dataset.is_relative() {
                config.dataset.path = Some(dir.join(dataset));
            }
        }

        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse a config from TOML text; paths are left as written
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

/// Errors from loading `street-grid.toml`
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),
    #[error("Failed to parse {}: {}", .0.display(), .1)]
    Parse(PathBuf, #[source] toml::de::Error),
}
