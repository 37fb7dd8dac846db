//! Gap healing and boolean composition.
//!
//! This is the only module that talks to the `geo` crate. Everything else
//! sees plain [`Shape`]s, so the polygon engine can be swapped without
//! touching the extractors or the rasterizer.

use geo::{Area, BooleanOps, Buffer, Coord, LineString, MultiPolygon};
use tracing::debug;

use crate::geometry::{Point, Polygon, Shape};

/// Default healing tolerance, in drawing units (mm after normalization).
pub const HEAL_TOLERANCE: f64 = 0.05;

/// Polygons smaller than this (mm²) are treated as slivers and dropped.
const MIN_AREA: f64 = 1e-9;

/// Turn a raw ring into a valid shape by expanding then shrinking it by
/// `tolerance`.
///
/// Tiny gaps and hairline self-overlaps close up on the way out and the
/// outline returns to its drawn size on the way back in. Returns `None`
/// when nothing with positive area survives.
pub fn heal_ring(ring: &[Point], tolerance: f64) -> Option<Shape> {
    let distinct = {
        let mut pts = ring.to_vec();
        pts.dedup();
        if pts.len() > 1 && pts.first() == pts.last() {
            pts.pop();
        }
        pts.len()
    };
    if distinct < 3 {
        debug!(points = ring.len(), "dropping ring with fewer than 3 distinct points");
        return None;
    }

    let mp = MultiPolygon::new(vec![to_geo_polygon(&Polygon::new(ring.to_vec()))]);
    let healed = from_geo(&buffer_pair(&mp, tolerance));
    if healed.is_empty() {
        debug!(points = ring.len(), "ring collapsed during healing");
        None
    } else {
        Some(healed)
    }
}

/// Apply the expand/shrink pair to a whole shape.
pub fn heal_shape(shape: &Shape, tolerance: f64) -> Shape {
    from_geo(&buffer_pair(&to_geo(shape), tolerance))
}

/// Geometric union of two shapes.
pub fn union(a: &Shape, b: &Shape) -> Shape {
    from_geo(&to_geo(a).union(&to_geo(b)))
}

/// `a` with `b` cut away.
pub fn difference(a: &Shape, b: &Shape) -> Shape {
    from_geo(&to_geo(a).difference(&to_geo(b)))
}

fn buffer_pair(mp: &MultiPolygon<f64>, tolerance: f64) -> MultiPolygon<f64> {
    if tolerance <= 0.0 {
        // A union with nothing still resolves overlaps and orientation
        return mp.union(&MultiPolygon::new(Vec::new()));
    }
    mp.buffer(tolerance).buffer(-tolerance)
}

// ============================================================================
// CONVERSIONS
// ============================================================================

fn to_line_string(ring: &[Point]) -> LineString<f64> {
    // geo closes the ring itself when building a Polygon
    LineString::new(ring.iter().map(|p| Coord { x: p.x, y: p.y }).collect())
}

fn to_geo_polygon(poly: &Polygon) -> geo::Polygon<f64> {
    geo::Polygon::new(
        to_line_string(&poly.outer),
        poly.holes.iter().map(|h| to_line_string(h)).collect(),
    )
}

fn to_geo(shape: &Shape) -> MultiPolygon<f64> {
    MultiPolygon::new(
        shape
            .polygons
            .iter()
            .filter(|p| p.outer.len() >= 3)
            .map(to_geo_polygon)
            .collect(),
    )
}

fn from_line_string(ls: &LineString<f64>) -> Vec<Point> {
    ls.coords().map(|c| Point::new(c.x, c.y)).collect()
}

fn from_geo(mp: &MultiPolygon<f64>) -> Shape {
    Shape::new(
        mp.iter()
            .filter(|p| p.unsigned_area() > MIN_AREA)
            .map(|p| {
                Polygon::with_holes(
                    from_line_string(p.exterior()),
                    p.interiors()
                        .iter()
                        .filter(|h| h.0.len() >= 4)
                        .map(from_line_string)
                        .collect(),
                )
            })
            .collect(),
    )
}

// ============================================================================
// TESTS
// ============================================================================
