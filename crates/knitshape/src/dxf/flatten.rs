//! Curve flattening and block transforms.
//!
//! Every curved DXF primitive ends up here as a polyline: bulged polyline
//! segments, arcs, elliptical arcs and NURBS splines. Block references are
//! applied afterwards as an [`Affine`] on the flattened points, so
//! non-uniform insert scales distort arcs correctly.

use std::f64::consts::{PI, TAU};

use super::entity::{HatchEdge, SplineCurve, Vertex};
use crate::geometry::Point;

/// Uniform spline sampling count.
pub const SPLINE_SAMPLES: usize = 101;

/// Upper bound on segments for a single curve, so a tiny tolerance on a
/// huge radius can't run away.
const MAX_SEGMENTS: usize = 4096;

// ============================================================================
// AFFINE TRANSFORM
// ============================================================================

/// 2D affine map: `x' = a·x + b·y + c`, `y' = d·x + e·y + f`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for Affine {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Affine {
    pub const IDENTITY: Affine = Affine {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 0.0,
        e: 1.0,
        f: 0.0,
    };

    /// The placement of an `INSERT`: block base point to origin, scale,
    /// rotate (degrees), then move to the insertion point.
    pub fn insert(base: Point, position: Point, scale_x: f64, scale_y: f64, rotation: f64) -> Self {
        let (sin, cos) = rotation.to_radians().sin_cos();
        let a = cos * scale_x;
        let b = -sin * scale_y;
        let d = sin * scale_x;
        let e = cos * scale_y;
        Affine {
            a,
            b,
            c: position.x - (a * base.x + b * base.y),
            d,
            e,
            f: position.y - (d * base.x + e * base.y),
        }
    }

    /// `self ∘ inner`: apply `inner` first, then `self`.
    pub fn then_inner(&self, inner: &Affine) -> Affine {
        Affine {
            a: self.a * inner.a + self.b * inner.d,
            b: self.a * inner.b + self.b * inner.e,
            c: self.a * inner.c + self.b * inner.f + self.c,
            d: self.d * inner.a + self.e * inner.d,
            e: self.d * inner.b + self.e * inner.e,
            f: self.d * inner.c + self.e * inner.f + self.f,
        }
    }

    #[inline]
    pub fn apply(&self, p: Point) -> Point {
        Point::new(
            self.a * p.x + self.b * p.y + self.c,
            self.d * p.x + self.e * p.y + self.f,
        )
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

// ============================================================================
// ARCS
// ============================================================================

/// Number of chords needed so no chord strays more than `tolerance` from
/// an arc of `radius` spanning `sweep` radians.
fn arc_segments(radius: f64, sweep: f64, tolerance: f64) -> usize {
    let sweep = sweep.abs();
    if radius <= 0.0 || sweep == 0.0 {
        return 1;
    }
    let step = if tolerance >= radius {
        PI / 2.0
    } else {
        2.0 * (1.0 - tolerance / radius).acos()
    };
    if step <= 0.0 || !step.is_finite() {
        return MAX_SEGMENTS;
    }
    ((sweep / step).ceil() as usize).clamp(1, MAX_SEGMENTS)
}

/// Points along a circular arc, both ends included. `sweep` is signed
/// (positive = counter-clockwise), angles in radians.
pub fn arc_points(center: Point, radius: f64, start: f64, sweep: f64, tolerance: f64) -> Vec<Point> {
    let n = arc_segments(radius, sweep, tolerance);
    (0..=n)
        .map(|i| {
            let t = start + sweep * (i as f64) / (n as f64);
            Point::new(center.x + radius * t.cos(), center.y + radius * t.sin())
        })
        .collect()
}

/// A DXF `ARC`: counter-clockwise from `start_deg` to `end_deg`.
pub fn flatten_arc(center: Point, radius: f64, start_deg: f64, end_deg: f64, tolerance: f64) -> Vec<Point> {
    let start = start_deg.to_radians();
    let mut sweep = (end_deg - start_deg).to_radians();
    while sweep <= 0.0 {
        sweep += TAU;
    }
    while sweep > TAU {
        sweep -= TAU;
    }
    arc_points(center, radius, start, sweep, tolerance)
}

// ============================================================================
// POLYLINES WITH BULGES
// ============================================================================

/// Points of one polyline segment from `p1` to `p2` with `bulge`,
/// excluding `p1` and including `p2`.
fn bulge_segment(p1: Point, p2: Point, bulge: f64, tolerance: f64, out: &mut Vec<Point>) {
    let chord = p1.distance(p2);
    if bulge.abs() < 1e-12 || chord < 1e-12 {
        out.push(p2);
        return;
    }

    let sweep = 4.0 * bulge.atan();
    let radius = chord / (2.0 * (sweep / 2.0).sin().abs());
    // Center sits on the chord's perpendicular bisector
    let mid = Point::new((p1.x + p2.x) / 2.0, (p1.y + p2.y) / 2.0);
    let (ux, uy) = ((p2.x - p1.x) / chord, (p2.y - p1.y) / chord);
    let offset = chord * (1.0 - bulge * bulge) / (4.0 * bulge);
    let center = Point::new(mid.x - uy * offset, mid.y + ux * offset);

    let start = (p1.y - center.y).atan2(p1.x - center.x);
    let pts = arc_points(center, radius, start, sweep, tolerance);
    out.extend(pts.into_iter().skip(1));
    // Land exactly on the next vertex
    if let Some(last) = out.last_mut() {
        *last = p2;
    }
}

/// Flatten a polyline's vertices, honoring bulges. A closed polyline gets
/// its closing segment (with the last vertex's bulge) too.
pub fn flatten_polyline(vertices: &[Vertex], closed: bool, tolerance: f64) -> Vec<Point> {
    let Some(first) = vertices.first() else {
        return Vec::new();
    };
    let mut out = vec![first.point];
    for pair in vertices.windows(2) {
        bulge_segment(pair[0].point, pair[1].point, pair[0].bulge, tolerance, &mut out);
    }
    if closed && vertices.len() > 1 {
        if let Some(last) = vertices.last() {
            bulge_segment(last.point, first.point, last.bulge, tolerance, &mut out);
        }
    }
    out
}

// ============================================================================
// ELLIPSES
// ============================================================================

/// Points along an elliptical arc. Parameters in radians; `sweep` signed.
pub fn ellipse_points(
    center: Point,
    major_axis: Point,
    ratio: f64,
    start: f64,
    sweep: f64,
    tolerance: f64,
) -> Vec<Point> {
    let major = major_axis.x.hypot(major_axis.y);
    let minor = Point::new(-major_axis.y * ratio, major_axis.x * ratio);
    let n = arc_segments(major, sweep, tolerance);
    (0..=n)
        .map(|i| {
            let t = start + sweep * (i as f64) / (n as f64);
            let (sin, cos) = t.sin_cos();
            Point::new(
                center.x + major_axis.x * cos + minor.x * sin,
                center.y + major_axis.y * cos + minor.y * sin,
            )
        })
        .collect()
}

// ============================================================================
// HATCH EDGES
// ============================================================================

/// Signed sweep for a hatch arc/ellipse edge.
///
/// Clockwise edges store their angles mirrored, so the real start angle is
/// the negated stored one and the edge runs clockwise to the negated end.
fn edge_span(start_deg: f64, end_deg: f64, ccw: bool) -> (f64, f64) {
    let mut sweep = end_deg - start_deg;
    while sweep <= 0.0 {
        sweep += 360.0;
    }
    while sweep > 360.0 {
        sweep -= 360.0;
    }
    if ccw {
        (start_deg.to_radians(), sweep.to_radians())
    } else {
        ((-start_deg).to_radians(), -sweep.to_radians())
    }
}

/// Flatten one hatch boundary edge.
pub fn flatten_edge(edge: &HatchEdge, tolerance: f64, spline_samples: usize) -> Vec<Point> {
    match edge {
        HatchEdge::Line { start, end } => vec![*start, *end],
        HatchEdge::Arc {
            center,
            radius,
            start_angle,
            end_angle,
            counter_clockwise,
        } => {
            let (start, sweep) = edge_span(*start_angle, *end_angle, *counter_clockwise);
            arc_points(*center, *radius, start, sweep, tolerance)
        }
        HatchEdge::Ellipse {
            center,
            major_axis,
            ratio,
            start_angle,
            end_angle,
            counter_clockwise,
        } => {
            let (start, sweep) = edge_span(*start_angle, *end_angle, *counter_clockwise);
            ellipse_points(*center, *major_axis, *ratio, start, sweep, tolerance)
        }
        HatchEdge::Spline(curve) => sample_spline(curve, spline_samples),
    }
}

// ============================================================================
// SPLINES
// ============================================================================

/// Sample a spline at `samples` uniform parameter steps across its domain.
///
/// Falls back to the fit points as a polyline when there are no control
/// points, and to the control polygon when the knot vector is unusable.
pub fn sample_spline(curve: &SplineCurve, samples: usize) -> Vec<Point> {
    let ctrl = &curve.control_points;
    if ctrl.is_empty() {
        return curve.fit_points.clone();
    }

    let n = ctrl.len();
    if n < 2 {
        return ctrl.clone();
    }
    let degree = curve.degree.clamp(1, n - 1);

    let knots = if curve.knots.len() == n + degree + 1 {
        curve.knots.clone()
    } else {
        clamped_uniform_knots(n, degree)
    };
    let weights: Vec<f64> = if curve.weights.len() == n {
        curve.weights.clone()
    } else {
        vec![1.0; n]
    };

    let t0 = knots[degree];
    let t1 = knots[n];
    if t1 <= t0 {
        return ctrl.clone();
    }

    let samples = samples.max(2);
    (0..samples)
        .map(|i| {
            let t = t0 + (t1 - t0) * (i as f64) / ((samples - 1) as f64);
            de_boor(t, degree, &knots, ctrl, &weights)
        })
        .collect()
}

/// Open uniform knot vector with `degree + 1` repeated end knots.
fn clamped_uniform_knots(n: usize, degree: usize) -> Vec<f64> {
    let inner = n - degree;
    let mut knots = Vec::with_capacity(n + degree + 1);
    knots.extend(std::iter::repeat_n(0.0, degree + 1));
    for i in 1..inner {
        knots.push(i as f64 / inner as f64);
    }
    knots.extend(std::iter::repeat_n(1.0, degree + 1));
    knots
}

/// Rational de Boor evaluation at parameter `t`.
fn de_boor(t: f64, p: usize, knots: &[f64], ctrl: &[Point], weights: &[f64]) -> Point {
    let n = ctrl.len();
    // Knot span k with knots[k] <= t < knots[k+1], clamped to the domain
    let mut k = p;
    while k < n - 1 && knots[k + 1] <= t {
        k += 1;
    }

    // Homogeneous control points (w·x, w·y, w)
    let mut d: Vec<[f64; 3]> = (0..=p)
        .map(|j| {
            let idx = j + k - p;
            let w = weights[idx];
            [ctrl[idx].x * w, ctrl[idx].y * w, w]
        })
        .collect();

    for r in 1..=p {
        for j in (r..=p).rev() {
            let i = j + k - p;
            let denom = knots[i + p + 1 - r] - knots[i];
            let alpha = if denom.abs() < 1e-15 {
                0.0
            } else {
                (t - knots[i]) / denom
            };
            for c in 0..3 {
                d[j][c] = (1.0 - alpha) * d[j - 1][c] + alpha * d[j][c];
            }
        }
    }

    let [x, y, w] = d[p];
    if w.abs() < 1e-15 {
        Point::new(x, y)
    } else {
        Point::new(x / w, y / w)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn near(a: Point, b: Point) -> bool {
        a.is_near(b, 1e-9)
    }

    #[test]
    fn insert_transform_moves_scales_rotates() {
        let t = Affine::insert(Point::new(1.0, 0.0), Point::new(10.0, 10.0), 2.0, 2.0, 90.0);
        // Base point lands on the insertion point
        assert!(near(t.apply(Point::new(1.0, 0.0)), Point::new(10.0, 10.0)));
        // One unit along +x becomes two units along +y
        assert!(near(t.apply(Point::new(2.0, 0.0)), Point::new(10.0, 12.0)));
    }

    #[test]
    fn affine_composition_applies_inner_first() {
        let inner = Affine::insert(Point::new(0.0, 0.0), Point::new(5.0, 0.0), 1.0, 1.0, 0.0);
        let outer = Affine::insert(Point::new(0.0, 0.0), Point::new(0.0, 0.0), 2.0, 2.0, 0.0);
        let both = outer.then_inner(&inner);
        assert!(near(both.apply(Point::new(1.0, 1.0)), Point::new(12.0, 2.0)));
        assert!(Affine::default().is_identity());
    }

    #[test]
    fn arc_within_tolerance() {
        let tol = 0.5;
        let pts = flatten_arc(Point::new(0.0, 0.0), 100.0, 0.0, 90.0, tol);
        assert!(near(pts[0], Point::new(100.0, 0.0)));
        assert!(pts.last().unwrap().is_near(Point::new(0.0, 100.0), 1e-9));
        // Chord midpoints stay within tolerance of the circle
        for w in pts.windows(2) {
            let mid = Point::new((w[0].x + w[1].x) / 2.0, (w[0].y + w[1].y) / 2.0);
            let r = mid.x.hypot(mid.y);
            assert!(100.0 - r <= tol + 1e-9, "sagitta {} too large", 100.0 - r);
        }
    }

    #[test]
    fn arc_wraps_past_zero() {
        let pts = flatten_arc(Point::new(0.0, 0.0), 1.0, 270.0, 90.0, 0.01);
        // 270 -> 90 counter-clockwise passes through 0 degrees (x = 1)
        assert!(pts.iter().any(|p| p.x > 0.99));
        assert!(pts.iter().all(|p| p.x > -1e-9));
    }

    #[test]
    fn bulge_of_one_is_a_semicircle() {
        let verts = [Vertex::with_bulge(0.0, 0.0, 1.0), Vertex::new(10.0, 0.0)];
        let pts = flatten_polyline(&verts, false, 0.01);
        assert_eq!(pts.first(), Some(&Point::new(0.0, 0.0)));
        assert_eq!(pts.last(), Some(&Point::new(10.0, 0.0)));
        // Counter-clockwise from (0,0) to (10,0) bulges below the chord
        let lowest = pts.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
        assert!((lowest + 5.0).abs() < 0.02, "lowest point {lowest}");
    }

    #[test]
    fn closed_polyline_adds_closing_segment() {
        let verts = [
            Vertex::new(0.0, 0.0),
            Vertex::new(10.0, 0.0),
            Vertex::new(10.0, 10.0),
        ];
        let open = flatten_polyline(&verts, false, 0.1);
        let closed = flatten_polyline(&verts, true, 0.1);
        assert_eq!(open.len(), 3);
        assert_eq!(closed.len(), 4);
        assert_eq!(closed.last(), Some(&Point::new(0.0, 0.0)));
    }

    #[test]
    fn clockwise_hatch_arc_runs_clockwise() {
        let edge = HatchEdge::Arc {
            center: Point::new(0.0, 0.0),
            radius: 1.0,
            start_angle: 0.0,
            end_angle: 90.0,
            counter_clockwise: false,
        };
        let pts = flatten_edge(&edge, 0.01, SPLINE_SAMPLES);
        assert!(near(pts[0], Point::new(1.0, 0.0)));
        assert!(pts.last().unwrap().is_near(Point::new(0.0, -1.0), 1e-9));
    }

    #[test]
    fn full_ellipse_edge() {
        let edge = HatchEdge::Ellipse {
            center: Point::new(0.0, 0.0),
            major_axis: Point::new(10.0, 0.0),
            ratio: 0.5,
            start_angle: 0.0,
            end_angle: 360.0,
            counter_clockwise: true,
        };
        let pts = flatten_edge(&edge, 0.05, SPLINE_SAMPLES);
        let max_y = pts.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);
        assert!((max_y - 5.0).abs() < 0.05);
        assert!(pts.first().unwrap().is_near(*pts.last().unwrap(), 1e-9));
    }

    #[test]
    fn spline_hits_clamped_endpoints() {
        let curve = SplineCurve {
            degree: 2,
            knots: vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
            weights: vec![],
            control_points: vec![Point::new(0.0, 0.0), Point::new(5.0, 10.0), Point::new(10.0, 0.0)],
            fit_points: vec![],
        };
        let pts = sample_spline(&curve, SPLINE_SAMPLES);
        assert_eq!(pts.len(), SPLINE_SAMPLES);
        assert!(near(pts[0], Point::new(0.0, 0.0)));
        assert!(near(pts[100], Point::new(10.0, 0.0)));
        // Quadratic Bézier midpoint
        assert!(near(pts[50], Point::new(5.0, 5.0)));
    }

    #[test]
    fn rational_spline_draws_a_circle_quadrant() {
        let w = std::f64::consts::FRAC_1_SQRT_2;
        let curve = SplineCurve {
            degree: 2,
            knots: vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
            weights: vec![1.0, w, 1.0],
            control_points: vec![Point::new(1.0, 0.0), Point::new(1.0, 1.0), Point::new(0.0, 1.0)],
            fit_points: vec![],
        };
        for p in sample_spline(&curve, 11) {
            assert!((p.x.hypot(p.y) - 1.0).abs() < 1e-9, "{p:?} is off the unit circle");
        }
    }

    #[test]
    fn spline_without_knots_gets_uniform_ones() {
        let curve = SplineCurve {
            degree: 3,
            control_points: (0..6).map(|i| Point::new(i as f64, (i % 2) as f64)).collect(),
            ..SplineCurve::default()
        };
        let pts = sample_spline(&curve, 21);
        assert!(near(pts[0], Point::new(0.0, 0.0)));
        assert!(near(pts[20], Point::new(5.0, 1.0)));
    }

    #[test]
    fn fit_point_spline_uses_fit_points() {
        let curve = SplineCurve {
            degree: 3,
            fit_points: vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0), Point::new(2.0, 0.0)],
            ..SplineCurve::default()
        };
        assert_eq!(sample_spline(&curve, SPLINE_SAMPLES).len(), 3);
    }
}
