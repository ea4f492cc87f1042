//! # Vector Data Import
//!
//! Loads street centerlines from a dataset on disk into a read-only
//! [`Dataset`] of [`LineFeature`]s in WGS84 lon/lat.
//!
//! Supported formats (by extension):
//! - `.shp` — ESRI Shapefile set; `.shp`, `.shx`, `.dbf` and `.prj` must all be
//!   present and readable before anything is parsed
//! - `.geojson` / `.json` — GeoJSON Feature, FeatureCollection or bare Geometry
//!
//! ## Table of Contents
//! 1. LineFeature — Validated polyline with attributes
//! 2. Dataset — Loaded collection + CRS
//! 3. GeometrySource — Loading capability
//! 4. Shapefile import
//! 5. GeoJSON import
//! 6. Feature property extraction

use geo::{Coord, LineString};
use geojson::{GeoJson, Geometry, Value};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::DatasetConfig;
use crate::coords::Point;
use crate::error::{GridError, Result};

/// Companion files an ESRI Shapefile set must provide
pub const SHAPEFILE_COMPANIONS: [&str; 4] = ["shp", "shx", "dbf", "prj"];

/// CRS recorded when a dataset declares none
pub const WGS84: &str = "EPSG:4326";

// ============================================================================
// 1. LineFeature — Validated polyline with attributes
// ============================================================================

/// A street centerline: an ordered polyline of at least two finite vertices
#[derive(Debug, Clone, PartialEq)]
pub struct LineFeature {
    /// Record index within the source file
    pub index: usize,
    /// Part number within a multi-part record (0 for simple lines)
    pub part: usize,
    /// Street name, if the record carries one
    pub name: Option<String>,
    /// Vertices as lon/lat
    pub geometry: LineString<f64>,
    /// Remaining attributes
    pub properties: Map<String, JsonValue>,
}

impl LineFeature {
    /// Build a feature, rejecting fewer than two vertices or non-finite values
    pub fn new(index: usize, name: Option<String>, coords: Vec<Coord<f64>>) -> Result<Self> {
        if coords.len() < 2 {
            return Err(GridError::validation(format!(
                "feature {} has {} vertices, at least 2 required",
                index,
                coords.len()
            )));
        }
        if let Some(bad) = coords.iter().find(|c| !c.x.is_finite() || !c.y.is_finite()) {
            return Err(GridError::validation(format!(
                "feature {} has a non-finite vertex ({}, {})",
                index, bad.x, bad.y
            )));
        }
        Ok(Self {
            index,
            part: 0,
            name,
            geometry: LineString::new(coords),
            properties: Map::new(),
        })
    }

    /// Convenience constructor from `(lon, lat)` pairs
    pub fn from_lon_lat(index: usize, name: Option<&str>, coords: &[(f64, f64)]) -> Result<Self> {
        let coords = coords.iter().map(|&(x, y)| Coord { x, y }).collect();
        Self::new(index, name.map(str::to_string), coords)
    }

    pub fn with_part(mut self, part: usize) -> Self {
        self.part = part;
        self
    }

    pub fn with_properties(mut self, properties: Map<String, JsonValue>) -> Self {
        self.properties = properties;
        self
    }

    /// Vertices in order
    pub fn vertices(&self) -> impl Iterator<Item = Point> + '_ {
        self.geometry.points()
    }

    pub fn vertex_count(&self) -> usize {
        self.geometry.0.len()
    }

    /// Name for display, falling back to a placeholder
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unknown Street")
    }
}

// ============================================================================
// 2. Dataset — Loaded collection + CRS
// ============================================================================

/// Street features loaded once per run, read-only afterwards
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    features: Vec<LineFeature>,
    crs: String,
    skipped: usize,
}

impl Dataset {
    /// Wrap in-memory features; `crs` defaults to WGS84
    pub fn new(features: Vec<LineFeature>, crs: Option<String>) -> Self {
        Self {
            features,
            crs: crs.unwrap_or_else(|| WGS84.to_string()),
            skipped: 0,
        }
    }

    pub fn features(&self) -> &[LineFeature] {
        &self.features
    }

    /// Declared reference system, or WGS84 when none was declared
    pub fn crs(&self) -> &str {
        &self.crs
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Records dropped during import (non-line or malformed geometry)
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

// ============================================================================
// 3. GeometrySource — Loading capability
// ============================================================================

/// Anything that can produce the street dataset for a run
pub trait GeometrySource {
    fn load(&self) -> Result<Dataset>;
}

impl GeometrySource for Dataset {
    fn load(&self) -> Result<Dataset> {
        Ok(self.clone())
    }
}

/// Dataset file on disk, format chosen by extension
#[derive(Debug, Clone)]
pub struct FileSource {
    pub path: PathBuf,
    pub name_field: String,
    pub default_crs: String,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let defaults = DatasetConfig::default();
        Self {
            path: path.into(),
            name_field: defaults.name_field,
            default_crs: defaults.default_crs,
        }
    }

    pub fn from_config(path: impl Into<PathBuf>, config: &DatasetConfig) -> Self {
        Self {
            path: path.into(),
            name_field: config.name_field.clone(),
            default_crs: config.default_crs.clone(),
        }
    }
}

impl GeometrySource for FileSource {
    fn load(&self) -> Result<Dataset> {
        let extension = self
            .path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        let mut dataset = match extension.as_str() {
            "shp" => {
                check_shapefile_files(&self.path)?;
                import_shapefile(&self.path, &self.name_field)?
            }
            "geojson" | "json" => import_geojson(&self.path, &self.name_field)?,
            other => {
                return Err(GridError::data(
                    &self.path,
                    format!("unsupported dataset format '{}'", other),
                ));
            }
        };

        if dataset.crs.is_empty() {
            dataset.crs = self.default_crs.clone();
        }
        if !looks_geographic_wgs84(&dataset.crs) {
            tracing::warn!(
                "Dataset CRS does not look like WGS84 lon/lat; coordinates are used as-is: {}",
                dataset.crs
            );
        }

        tracing::info!(
            "Loaded {} street features from {} ({} skipped, CRS {})",
            dataset.len(),
            self.path.display(),
            dataset.skipped,
            short_crs(&dataset.crs)
        );
        Ok(dataset)
    }
}

fn looks_geographic_wgs84(crs: &str) -> bool {
    let upper = crs.to_uppercase();
    ["4326", "WGS_1984", "WGS 84", "WGS84", "CRS84"]
        .iter()
        .any(|marker| upper.contains(marker))
}

fn short_crs(crs: &str) -> &str {
    crs.get(..crs.len().min(48)).unwrap_or(crs)
}

// ============================================================================
// 4. Shapefile import
// ============================================================================

/// Verify every file of a Shapefile set exists and can be opened.
///
/// Fails on the first missing or unreadable companion, before any record is
/// parsed.
pub fn check_shapefile_files(shp_path: &Path) -> Result<()> {
    for ext in SHAPEFILE_COMPANIONS {
        let file_path = shp_path.with_extension(ext);
        tracing::debug!("Checking {}", file_path.display());
        if !file_path.exists() {
            return Err(GridError::data(&file_path, "Required file not found"));
        }
        std::fs::File::open(&file_path)
            .map_err(|e| GridError::data(&file_path, format!("Cannot read file: {}", e)))?;
    }
    Ok(())
}

/// Read polylines from a Shapefile set. Assumes [`check_shapefile_files`] passed.
pub fn import_shapefile(path: &Path, name_field: &str) -> Result<Dataset> {
    use shapefile::Shape;

    let prj_path = path.with_extension("prj");
    let crs = std::fs::read_to_string(&prj_path)
        .map_err(|e| GridError::data(&prj_path, e))?
        .trim()
        .to_string();

    let mut reader = shapefile::Reader::from_path(path).map_err(|e| GridError::data(path, e))?;

    let mut features = Vec::new();
    let mut skipped = 0;

    for (index, item) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) = item.map_err(|e| GridError::data(path, e))?;

        let parts: Vec<Vec<Coord<f64>>> = match shape {
            Shape::Polyline(line) => line
                .parts()
                .iter()
                .map(|p| p.iter().map(|pt| Coord { x: pt.x, y: pt.y }).collect())
                .collect(),
            Shape::PolylineM(line) => line
                .parts()
                .iter()
                .map(|p| p.iter().map(|pt| Coord { x: pt.x, y: pt.y }).collect())
                .collect(),
            Shape::PolylineZ(line) => line
                .parts()
                .iter()
                .map(|p| p.iter().map(|pt| Coord { x: pt.x, y: pt.y }).collect())
                .collect(),
            other => {
                tracing::warn!("Record {}: skipping non-line shape {:?}", index, other.shapetype());
                skipped += 1;
                continue;
            }
        };

        let properties = record_properties(record);
        let name = extract_name(&properties, name_field);

        skipped += push_parts(&mut features, index, name, parts, &properties);
    }

    Ok(Dataset {
        features,
        crs,
        skipped,
    })
}

// ============================================================================
// 5. GeoJSON import
// ============================================================================

/// Import line features from a GeoJSON file
pub fn import_geojson(path: &Path, name_field: &str) -> Result<Dataset> {
    let content = std::fs::read_to_string(path).map_err(|e| GridError::data(path, e))?;
    parse_geojson(&content, name_field).map_err(|e| match e {
        GridError::Data { reason, .. } => GridError::data(path, reason),
        other => other,
    })
}

/// Parse GeoJSON text into a dataset
pub fn parse_geojson(content: &str, name_field: &str) -> Result<Dataset> {
    let geojson: GeoJson = content
        .parse()
        .map_err(|e| GridError::data("<geojson>", format!("invalid GeoJSON: {}", e)))?;

    let (features, crs) = match geojson {
        GeoJson::FeatureCollection(fc) => {
            let crs = fc.foreign_members.as_ref().and_then(declared_crs);
            (fc.features, crs)
        }
        GeoJson::Feature(f) => (vec![f], None),
        GeoJson::Geometry(g) => (
            vec![geojson::Feature {
                bbox: None,
                geometry: Some(g),
                id: None,
                properties: None,
                foreign_members: None,
            }],
            None,
        ),
    };

    let mut lines = Vec::with_capacity(features.len());
    let mut skipped = 0;

    for (index, feature) in features.into_iter().enumerate() {
        let Some(geometry) = feature.geometry else {
            tracing::warn!("Feature {}: no geometry, skipping", index);
            skipped += 1;
            continue;
        };
        let properties = feature.properties.unwrap_or_default();
        let name = extract_name(&properties, name_field);

        match line_parts(&geometry) {
            Some(parts) => {
                skipped += push_parts(&mut lines, index, name, parts, &properties);
            }
            None => {
                tracing::warn!("Feature {}: skipping non-line geometry", index);
                skipped += 1;
            }
        }
    }

    Ok(Dataset {
        features: lines,
        crs: crs.unwrap_or_default(),
        skipped,
    })
}

/// Line parts of a GeoJSON geometry; `None` for points and polygons
fn line_parts(geometry: &Geometry) -> Option<Vec<Vec<Coord<f64>>>> {
    let to_coords = |line: &Vec<Vec<f64>>| -> Vec<Coord<f64>> {
        line.iter()
            .map(|c| Coord {
                x: c.first().copied().unwrap_or(f64::NAN),
                y: c.get(1).copied().unwrap_or(f64::NAN),
            })
            .collect()
    };

    match &geometry.value {
        Value::LineString(coords) => Some(vec![to_coords(coords)]),
        Value::MultiLineString(lines) => Some(lines.iter().map(to_coords).collect()),
        Value::GeometryCollection(geoms) => {
            let parts: Vec<_> = geoms.iter().filter_map(line_parts).flatten().collect();
            (!parts.is_empty()).then_some(parts)
        }
        _ => None,
    }
}

/// Push one feature per valid part; returns how many parts were dropped
fn push_parts(
    out: &mut Vec<LineFeature>,
    index: usize,
    name: Option<String>,
    parts: Vec<Vec<Coord<f64>>>,
    properties: &Map<String, JsonValue>,
) -> usize {
    let mut dropped = 0;
    for (part, coords) in parts.into_iter().enumerate() {
        match LineFeature::new(index, name.clone(), coords) {
            Ok(feature) => out.push(feature.with_part(part).with_properties(properties.clone())),
            Err(e) => {
                tracing::warn!("Record {} part {}: {}", index, part, e);
                dropped += 1;
            }
        }
    }
    dropped
}

// ============================================================================
// 6. Feature property extraction
// ============================================================================

/// Street name from the configured field, then the common `name` spellings
fn extract_name(properties: &Map<String, JsonValue>, name_field: &str) -> Option<String> {
    [name_field, "name", "Name", "NAME"]
        .iter()
        .filter_map(|key| properties.get(*key))
        .find_map(|v| v.as_str().map(|s| s.trim().to_string()))
        .filter(|s| !s.is_empty())
}

/// DBF attributes as JSON properties, matching what GeoJSON features carry
fn record_properties(record: shapefile::dbase::Record) -> Map<String, JsonValue> {
    use shapefile::dbase::FieldValue;

    let fields: HashMap<String, FieldValue> = record.into();
    fields
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                FieldValue::Character(v) => {
                    v.map_or(JsonValue::Null, |s| JsonValue::from(s.trim()))
                }
                FieldValue::Memo(s) => JsonValue::from(s),
                FieldValue::Numeric(v) => v.map_or(JsonValue::Null, JsonValue::from),
                FieldValue::Float(v) => v.map_or(JsonValue::Null, |f| JsonValue::from(f64::from(f))),
                FieldValue::Double(v) | FieldValue::Currency(v) => JsonValue::from(v),
                FieldValue::Integer(v) => JsonValue::from(v),
                FieldValue::Logical(v) => v.map_or(JsonValue::Null, JsonValue::from),
                FieldValue::Date(v) => v.map_or(JsonValue::Null, |d| {
                    JsonValue::from(format!("{:04}-{:02}-{:02}", d.year(), d.month(), d.day()))
                }),
                other => JsonValue::from(format!("{:?}", other)),
            };
            (key, value)
        })
        .collect()
}

/// Legacy GeoJSON `"crs": {"type": "name", "properties": {"name": ...}}`
fn declared_crs(members: &Map<String, JsonValue>) -> Option<String> {
    members
        .get("crs")?
        .get("properties")?
        .get("name")?
        .as_str()
        .map(str::to_string)
}
