//! Point-in-polygon tests and horizontal scan-line clipping.
//!
//! The rasterizer calls [`scanline_segments`] once per knitted row, so it
//! is the hot path of a conversion.

use crate::geometry::{Point, Polygon, Shape};

// ============================================================================
// POINT IN POLYGON (Ray Casting Algorithm)
// ============================================================================
//
// ## Rust Lesson #8: References & Slices
//
// `&[Point]` is a "slice" - a borrowed view into a contiguous sequence.
// It works with Vec<Point>, arrays, or any contiguous memory.

/// Test if a point is inside a ring using ray casting.
///
/// Casts a ray to the right and counts edge crossings.
/// Odd crossings = inside, even = outside.
#[inline]
pub fn point_in_polygon(px: f64, py: f64, polygon: &[Point]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;

    for i in 0..n {
        let (xi, yi) = (polygon[i].x, polygon[i].y);
        let (xj, yj) = (polygon[j].x, polygon[j].y);

        if ((yi > py) != (yj > py)) && (px < (xj - xi) * (py - yi) / (yj - yi) + xi) {
            inside = !inside;
        }

        j = i;
    }

    inside
}

/// Inside the filled area of any polygon of the shape.
pub fn point_in_shape(px: f64, py: f64, shape: &Shape) -> bool {
    shape
        .polygons
        .iter()
        .any(|poly| poly.point_in_body(px, py, point_in_polygon))
}

// ============================================================================
// SCAN-LINE CROSSINGS
// ============================================================================

/// X positions where the horizontal line `y` crosses a ring.
///
/// Half-open rule: an edge contributes when exactly one endpoint lies
/// strictly above the line. Horizontal edges never contribute and a vertex
/// sitting on the line is counted once.
pub fn ring_crossings(y: f64, ring: &[Point], out: &mut Vec<f64>) {
    let n = ring.len();
    if n < 2 {
        return;
    }

    for i in 0..n {
        let j = (i + 1) % n;
        let (a, b) = (ring[i], ring[j]);
        if (a.y > y) != (b.y > y) {
            let t = (y - a.y) / (b.y - a.y);
            out.push(a.x + t * (b.x - a.x));
        }
    }
}

/// Inside intervals `(x_start, x_end)` of a horizontal line through a shape.
///
/// Crossings from every ring of every polygon are gathered, sorted and
/// paired even-odd, so holes and disjoint regions split a row the same way.
pub fn scanline_segments(y: f64, shape: &Shape) -> Vec<(f64, f64)> {
    let mut xs = Vec::new();
    for poly in &shape.polygons {
        polygon_crossings(y, poly, &mut xs);
    }

    // ## Rust Lesson #12: Sorting floats
    //
    // f64 is only PartialOrd (NaN!), so `sort()` doesn't exist.
    // `total_cmp` gives a total order we can sort by.
    xs.sort_by(f64::total_cmp);

    xs.chunks_exact(2)
        .map(|pair| (pair[0], pair[1]))
        .filter(|(a, b)| b > a)
        .collect()
}

fn polygon_crossings(y: f64, poly: &Polygon, out: &mut Vec<f64>) {
    ring_crossings(y, &poly.outer, out);
    for hole in &poly.holes {
        ring_crossings(y, hole, out);
    }
}

// ============================================================================
// TESTS
// ============================================================================
