//! # Artifact Export
//!
//! Writes the products of an extraction next to each other under one
//! timestamp:
//! - `street_grid_<ts>.txt` — painted grid document
//! - `street_plan_<ts>.json` — the render plan
//! - `streets_<ts>.geojson` — selected streets plus the search circle
//!
//! ## Table of Contents
//! 1. Artifact naming
//! 2. GeoJSON selection export
//! 3. Render plan export

use geo::Polygon;
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, Value};
use serde_json::{Map, Value as JsonValue};
use std::path::{Path, PathBuf};

use crate::error::{GridError, Result};
use crate::filter::SearchRegion;
use crate::raster::RenderPlan;
use crate::vector_import::LineFeature;

// ============================================================================
// 1. Artifact naming
// ============================================================================

/// Paths of the files written for one extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    pub grid_text: PathBuf,
    pub plan_json: PathBuf,
    pub geojson: PathBuf,
}

impl Artifacts {
    /// Paths under `dir` for the given timestamp label
    pub fn named(dir: &Path, timestamp: &str) -> Self {
        Self {
            grid_text: dir.join(format!("street_grid_{}.txt", timestamp)),
            plan_json: dir.join(format!("street_plan_{}.json", timestamp)),
            geojson: dir.join(format!("streets_{}.geojson", timestamp)),
        }
    }

    /// Paths under `dir` stamped with the local time
    pub fn now(dir: &Path) -> Self {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
        Self::named(dir, &timestamp)
    }
}

fn write(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents)
        .map_err(|e| GridError::render(format!("failed to write {}: {}", path.display(), e)))
}

// ============================================================================
// 2. GeoJSON selection export
// ============================================================================

/// FeatureCollection of the selected streets and the search buffer
pub fn selection_geojson(
    features: &[&LineFeature],
    region: &SearchRegion,
    buffer: &Polygon<f64>,
) -> GeoJson {
    let mut out: Vec<Feature> = Vec::with_capacity(features.len() + 1);

    let ring: Vec<Vec<f64>> = buffer.exterior().coords().map(|c| vec![c.x, c.y]).collect();
    let mut circle = Map::new();
    circle.insert("role".to_string(), JsonValue::from("search_radius"));
    circle.insert("radius_m".to_string(), JsonValue::from(region.radius_m()));
    out.push(feature(Value::Polygon(vec![ring]), circle));

    for street in features {
        let coords: Vec<Vec<f64>> = street.geometry.coords().map(|c| vec![c.x, c.y]).collect();
        let mut properties = street.properties.clone();
        properties.insert("role".to_string(), JsonValue::from("street"));
        properties.insert("name".to_string(), JsonValue::from(street.display_name()));
        properties.insert("source_index".to_string(), JsonValue::from(street.index));
        out.push(feature(Value::LineString(coords), properties));
    }

    GeoJson::FeatureCollection(FeatureCollection {
        bbox: None,
        features: out,
        foreign_members: None,
    })
}

fn feature(value: Value, properties: Map<String, JsonValue>) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

pub fn write_selection(
    path: &Path,
    features: &[&LineFeature],
    region: &SearchRegion,
    buffer: &Polygon<f64>,
) -> Result<()> {
    write(path, &selection_geojson(features, region, buffer).to_string())
}

// ============================================================================
// 3. Render plan export
// ============================================================================

pub fn write_plan(path: &Path, plan: &RenderPlan) -> Result<()> {
    let json = serde_json::to_string_pretty(plan)?;
    write(path, &json)
}
