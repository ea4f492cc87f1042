//! # Spatial Selection
//!
//! Selects the street features that intersect a circular search region.
//!
//! The radius is converted from meters to degrees by a pluggable
//! [`DistanceToAngle`] strategy; the default [`FlatEarth`] uses a flat
//! 111 km/degree factor. That is a planar approximation and loses accuracy at
//! high latitudes and large radii.
//!
//! ## Table of Contents
//! 1. SearchRegion — Validated center + radius
//! 2. DistanceToAngle — Meters → degrees strategies
//! 3. SpatialFilter — Buffer construction and selection

use geo::{Coord, Intersects, LineString, Polygon};
use std::f64::consts::TAU;

use crate::coords::{is_finite, Point};
use crate::error::{GridError, Result};
use crate::spatial_index::FeatureIndex;
use crate::vector_import::LineFeature;

/// Approximate meters per degree used by [`FlatEarth::default`]
pub const METERS_PER_DEGREE: f64 = 111_000.0;

// ============================================================================
// 1. SearchRegion — Validated center + radius
// ============================================================================

/// Circle around a geocoded point. The radius is always positive and finite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchRegion {
    center: Point,
    radius_m: f64,
}

impl SearchRegion {
    pub fn new(center: Point, radius_m: f64) -> Result<Self> {
        validate_radius(radius_m)?;
        if !is_finite(&center) {
            return Err(GridError::validation(format!(
                "center ({}, {}) is not a finite coordinate",
                center.x(),
                center.y()
            )));
        }
        Ok(Self { center, radius_m })
    }

    pub fn center(&self) -> Point {
        self.center
    }

    /// Radius in meters
    pub fn radius_m(&self) -> f64 {
        self.radius_m
    }
}

/// Reject zero, negative and non-finite radii
pub fn validate_radius(radius_m: f64) -> Result<()> {
    if radius_m.is_finite() && radius_m > 0.0 {
        Ok(())
    } else {
        Err(GridError::validation(format!(
            "radius must be greater than 0 meters, got {}",
            radius_m
        )))
    }
}

// ============================================================================
// 2. DistanceToAngle — Meters → degrees strategies
// ============================================================================

/// Converts a ground distance into the angular radius of the search buffer
pub trait DistanceToAngle: Send + Sync {
    fn degrees(&self, meters: f64) -> f64;
}

/// Constant meters-per-degree conversion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatEarth {
    pub meters_per_degree: f64,
}

impl Default for FlatEarth {
    fn default() -> Self {
        Self {
            meters_per_degree: METERS_PER_DEGREE,
        }
    }
}

impl DistanceToAngle for FlatEarth {
    fn degrees(&self, meters: f64) -> f64 {
        meters / self.meters_per_degree
    }
}

impl<F> DistanceToAngle for F
where
    F: Fn(f64) -> f64 + Send + Sync,
{
    fn degrees(&self, meters: f64) -> f64 {
        self(meters)
    }
}

// ============================================================================
// 3. SpatialFilter — Buffer construction and selection
// ============================================================================

/// Default vertex count of the buffer polygon
pub const DEFAULT_BUFFER_SEGMENTS: usize = 64;

/// Circular-buffer intersection filter
pub struct SpatialFilter {
    conversion: Box<dyn DistanceToAngle>,
    segments: usize,
}

impl Default for SpatialFilter {
    fn default() -> Self {
        Self::new(FlatEarth::default())
    }
}

impl SpatialFilter {
    pub fn new(conversion: impl DistanceToAngle + 'static) -> Self {
        Self {
            conversion: Box::new(conversion),
            segments: DEFAULT_BUFFER_SEGMENTS,
        }
    }

    /// Vertex count of the buffer polygon (at least 8)
    pub fn with_segments(mut self, segments: usize) -> Self {
        self.segments = segments.max(8);
        self
    }

    /// Angular radius of the region in degrees
    pub fn angular_radius(&self, region: &SearchRegion) -> f64 {
        self.conversion.degrees(region.radius_m())
    }

    /// Regular polygon inscribed in the search circle
    pub fn buffer(&self, region: &SearchRegion) -> Polygon<f64> {
        let radius = self.angular_radius(region);
        let center = region.center();
        let ring: Vec<Coord<f64>> = (0..self.segments)
            .map(|i| {
                let theta = TAU * i as f64 / self.segments as f64;
                Coord {
                    x: center.x() + radius * theta.cos(),
                    y: center.y() + radius * theta.sin(),
                }
            })
            .collect();
        // Polygon::new closes the ring
        Polygon::new(LineString::new(ring), vec![])
    }

    /// Features that touch or cross the search buffer, in input order
    pub fn select<'a>(
        &self,
        features: &'a [LineFeature],
        region: &SearchRegion,
    ) -> Result<Vec<&'a LineFeature>> {
        validate_radius(region.radius_m())?;
        let radius = self.angular_radius(region);
        if !(radius.is_finite() && radius > 0.0) {
            return Err(GridError::validation(format!(
                "radius of {} m converts to an unusable angle {}",
                region.radius_m(),
                radius
            )));
        }

        if features.is_empty() {
            return Ok(Vec::new());
        }

        let buffer = self.buffer(region);
        let center = region.center();
        let index = FeatureIndex::build(features);
        let candidates = index.query_rect(
            [center.x() - radius, center.y() - radius],
            [center.x() + radius, center.y() + radius],
        );

        let selected: Vec<&LineFeature> = candidates
            .into_iter()
            .map(|slot| &features[slot])
            .filter(|f| f.geometry.intersects(&buffer))
            .collect();

        tracing::info!(
            "Selected {} of {} features within {} m ({:.6}°) of ({:.6}, {:.6})",
            selected.len(),
            features.len(),
            region.radius_m(),
            radius,
            center.x(),
            center.y()
        );
        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::lon_lat;
    use proptest::prelude::*;

    fn line(index: usize, coords: &[(f64, f64)]) -> LineFeature {
        LineFeature::from_lon_lat(index, None, coords).unwrap()
    }

    fn segment_distance(p: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
        let (dx, dy) = (b.0 - a.0, b.1 - a.1);
        let len2 = dx * dx + dy * dy;
        let t = if len2 == 0.0 {
            0.0
        } else {
            (((p.0 - a.0) * dx + (p.1 - a.1) * dy) / len2).clamp(0.0, 1.0)
        };
        let (cx, cy) = (a.0 + t * dx, a.1 + t * dy);
        ((p.0 - cx).powi(2) + (p.1 - cy).powi(2)).sqrt()
    }

    fn feature_distance(feature: &LineFeature, p: Point) -> f64 {
        feature
            .geometry
            .lines()
            .map(|l| segment_distance((p.x(), p.y()), l.start.x_y(), l.end.x_y()))
            .fold(f64::INFINITY, f64::min)
    }

    #[test]
    fn test_radius_must_be_positive() {
        let center = lon_lat(-73.9857, 40.7484);
        for radius in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let err = SearchRegion::new(center, radius).unwrap_err();
            assert_eq!(err.kind(), crate::ErrorKind::Validation);
        }
        assert!(SearchRegion::new(center, 0.5).is_ok());
    }

    #[test]
    fn test_flat_earth_conversion() {
        let region = SearchRegion::new(lon_lat(0.0, 0.0), 111_000.0).unwrap();
        assert_eq!(SpatialFilter::default().angular_radius(&region), 1.0);
    }

    #[test]
    fn test_custom_conversion_strategy() {
        let filter = SpatialFilter::new(|meters: f64| meters / 1000.0);
        let region = SearchRegion::new(lon_lat(0.0, 0.0), 500.0).unwrap();
        assert_eq!(filter.angular_radius(&region), 0.5);
    }

    #[test]
    fn test_unusable_conversion_is_rejected() {
        let filter = SpatialFilter::new(|_: f64| 0.0);
        let region = SearchRegion::new(lon_lat(0.0, 0.0), 500.0).unwrap();
        let features = vec![line(0, &[(0.0, 0.0), (1.0, 1.0)])];
        let err = filter.select(&features, &region).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Validation);
    }

    #[test]
    fn test_empty_collection_selects_nothing() {
        let region = SearchRegion::new(lon_lat(-73.9857, 40.7484), 200.0).unwrap();
        let selected = SpatialFilter::default().select(&[], &region).unwrap();
        assert!(selected.is_empty());
    }

    #[test]
    fn test_selects_crossing_and_inside_lines_in_order() {
        // 111 m → 0.001°
        let region = SearchRegion::new(lon_lat(0.0, 0.0), 111.0).unwrap();
        let features = vec![
            line(0, &[(-0.01, 0.0), (0.01, 0.0)]),          // crosses the circle
            line(1, &[(0.01, 0.01), (0.02, 0.02)]),         // far away
            line(2, &[(0.0002, 0.0002), (0.0003, 0.0)]),    // fully inside
            line(3, &[(0.0008, 0.002), (0.002, 0.0008)]),   // bbox overlaps, misses circle
        ];
        let selected = SpatialFilter::default().select(&features, &region).unwrap();
        let indices: Vec<usize> = selected.iter().map(|f| f.index).collect();
        assert_eq!(indices, vec![0, 2]);
    }

    #[test]
    fn test_buffer_is_closed_regular_polygon() {
        let region = SearchRegion::new(lon_lat(10.0, 20.0), 111_000.0).unwrap();
        let buffer = SpatialFilter::default().with_segments(16).buffer(&region);
        let ring = &buffer.exterior().0;
        assert_eq!(ring.len(), 17);
        assert_eq!(ring.first(), ring.last());
        for c in ring {
            let d = ((c.x - 10.0).powi(2) + (c.y - 20.0).powi(2)).sqrt();
            assert!((d - 1.0).abs() < 1e-9);
        }
    }

    proptest! {
        #[test]
        fn selected_features_are_within_radius(
            lines in prop::collection::vec(
                prop::collection::vec((-0.02f64..0.02, -0.02f64..0.02), 2..5),
                0..20,
            ),
            radius in 10.0f64..2000.0,
        ) {
            let features: Vec<LineFeature> = lines
                .iter()
                .enumerate()
                .map(|(i, coords)| line(i, coords))
                .collect();
            let center = lon_lat(0.0, 0.0);
            let region = SearchRegion::new(center, radius).unwrap();
            let selected = SpatialFilter::default().select(&features, &region).unwrap();

            let limit = radius / METERS_PER_DEGREE + 1e-9;
            for feature in &selected {
                prop_assert!(feature_distance(feature, center) <= limit);
            }
            let mut indices: Vec<usize> = selected.iter().map(|f| f.index).collect();
            let sorted = { let mut s = indices.clone(); s.sort(); s };
            prop_assert_eq!(&indices, &sorted);
            indices.dedup();
            prop_assert_eq!(indices.len(), selected.len());
        }
    }
}
