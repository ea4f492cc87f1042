//! # Spatial Index
//!
//! R-tree over street bounding boxes, used to narrow the candidates handed to
//! the exact buffer intersection test.
//!
//! ## Table of Contents
//! 1. FeatureIndex — R-tree over a feature slice
//! 2. IndexedFeature — R-tree entry

use geo::BoundingRect;
use rstar::{RTree, RTreeObject, AABB};

use crate::vector_import::LineFeature;

// ============================================================================
// 1. FeatureIndex — R-tree over a feature slice
// ============================================================================

/// Bounding-box index of a feature slice. Entries refer back to the slice by
/// position, so the index is only meaningful for the slice it was built from.
#[derive(Default)]
pub struct FeatureIndex {
    tree: RTree<IndexedFeature>,
}

impl FeatureIndex {
    /// Bulk-load the envelopes of `features` (much faster than individual inserts)
    pub fn build(features: &[LineFeature]) -> Self {
        let entries: Vec<IndexedFeature> = features
            .iter()
            .enumerate()
            .filter_map(|(slot, f)| IndexedFeature::from_feature(slot, f))
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Slots of every feature whose bounding box overlaps the rectangle,
    /// in ascending slot order
    pub fn query_rect(&self, min: [f64; 2], max: [f64; 2]) -> Vec<usize> {
        let envelope = AABB::from_corners(min, max);
        let mut slots: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|entry| entry.slot)
            .collect();
        slots.sort_unstable();
        slots
    }

    /// Number of indexed features
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

// ============================================================================
// 2. IndexedFeature — R-tree entry
// ============================================================================

/// Envelope of one feature plus its position in the source slice
#[derive(Debug, Clone)]
pub struct IndexedFeature {
    pub slot: usize,
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl IndexedFeature {
    fn from_feature(slot: usize, feature: &LineFeature) -> Option<Self> {
        let rect = feature.geometry.bounding_rect()?;
        Some(Self {
            slot,
            min: [rect.min().x, rect.min().y],
            max: [rect.max().x, rect.max().y],
        })
    }
}

impl RTreeObject for IndexedFeature {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(index: usize, coords: &[(f64, f64)]) -> LineFeature {
        LineFeature::from_lon_lat(index, None, coords).unwrap()
    }

    #[test]
    fn test_query_returns_overlapping_slots_in_order() {
        let features = vec![
            line(0, &[(0.0, 0.0), (1.0, 1.0)]),
            line(1, &[(5.0, 5.0), (6.0, 6.0)]),
            line(2, &[(0.5, -1.0), (0.5, 2.0)]),
        ];
        let index = FeatureIndex::build(&features);
        assert_eq!(index.len(), 3);
        assert_eq!(index.query_rect([0.4, 0.4], [0.6, 0.6]), vec![0, 2]);
        assert_eq!(index.query_rect([10.0, 10.0], [11.0, 11.0]), Vec::<usize>::new());
    }

    #[test]
    fn test_axis_aligned_line_has_flat_envelope() {
        let features = vec![line(0, &[(0.0, 1.0), (3.0, 1.0)])];
        let index = FeatureIndex::build(&features);
        assert_eq!(index.query_rect([1.0, 0.5], [2.0, 1.5]), vec![0]);
    }

    #[test]
    fn test_empty_index() {
        let index = FeatureIndex::build(&[]);
        assert!(index.is_empty());
        assert!(index.query_rect([0.0, 0.0], [1.0, 1.0]).is_empty());
    }
}
