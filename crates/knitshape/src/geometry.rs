//! Core geometry types for knitshape.
//!
//! Everything downstream of extraction works in millimeters. A [`Polygon`]
//! is one exterior ring plus holes; a [`Shape`] is the disjoint set of
//! polygons a garment piece can become after union (a multi-polygon).
//!
//! ## Rust Lesson #3: Structs & Derives
//!
//! The `#[derive(...)]` macro auto-generates common functionality:
//! - `Debug` = printable with `{:?}`
//! - `Clone` = can duplicate the value
//! - `Copy` = can copy implicitly (small stack values only)
//! - `PartialEq` = can compare with `==`

/// A 2D point with x,y coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// A line segment defined by two endpoints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

/// A polygon with an outer boundary and optional holes.
///
/// Rings are stored closed (first point repeated at the end) once they
/// have passed through healing. Raw rings built by the extractors may be
/// open; [`close_ring`] fixes that.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Polygon {
    /// Outer boundary vertices
    pub outer: Vec<Point>,
    /// Interior holes
    pub holes: Vec<Vec<Point>>,
}

/// A set of disjoint polygons.
///
/// Most pieces are a single polygon, but a union of separated fragments
/// (or a mirrored copy that does not touch its original) stays a
/// multi-polygon all the way to the rasterizer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Shape {
    pub polygons: Vec<Polygon>,
}

impl Point {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Distance to another point.
    #[inline]
    pub fn distance(&self, other: Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// True when `other` lies within `tolerance` of this point.
    #[inline]
    pub fn is_near(&self, other: Point, tolerance: f64) -> bool {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy <= tolerance * tolerance
    }
}

impl Line {
    #[inline]
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    #[inline]
    pub fn start(&self) -> Point {
        Point::new(self.x1, self.y1)
    }

    #[inline]
    pub fn end(&self) -> Point {
        Point::new(self.x2, self.y2)
    }

    /// Length of the line segment.
    #[inline]
    pub fn length(&self) -> f64 {
        self.start().distance(self.end())
    }
}

impl Polygon {
    /// Create a simple polygon with no holes.
    pub fn new(outer: Vec<Point>) -> Self {
        Self {
            outer,
            holes: Vec::new(),
        }
    }

    /// Create a polygon with holes.
    pub fn with_holes(outer: Vec<Point>, holes: Vec<Vec<Point>>) -> Self {
        Self { outer, holes }
    }

    /// Get the bounding box as (min_x, min_y, max_x, max_y).
    ///
    /// ## Rust Lesson #6: Option<T>
    ///
    /// There is no `null`: an empty ring has no bounding box, so we return
    /// `None` and the compiler makes every caller deal with it.
    pub fn bounding_box(&self) -> Option<(f64, f64, f64, f64)> {
        bounds_of_points(&self.outer)
    }

    /// Enclosed area: outer ring minus holes.
    pub fn area(&self) -> f64 {
        let outer = signed_area_of_points(&self.outer).abs();
        let holes: f64 = self
            .holes
            .iter()
            .map(|hole| signed_area_of_points(hole).abs())
            .sum();
        outer - holes
    }

    /// Check if a point is inside the polygon body (inside outer, not in any hole).
    #[inline]
    pub fn point_in_body<F>(&self, x: f64, y: f64, point_in_polygon_fn: F) -> bool
    where
        F: Fn(f64, f64, &[Point]) -> bool,
    {
        if !point_in_polygon_fn(x, y, &self.outer) {
            return false;
        }
        !self.holes.iter().any(|hole| point_in_polygon_fn(x, y, hole))
    }

    /// Apply a point mapping to every ring.
    pub fn map_points<F>(&self, f: F) -> Polygon
    where
        F: Fn(Point) -> Point,
    {
        Polygon {
            outer: self.outer.iter().map(|&p| f(p)).collect(),
            holes: self
                .holes
                .iter()
                .map(|hole| hole.iter().map(|&p| f(p)).collect())
                .collect(),
        }
    }

    /// Calculate signed area of the outer ring using the shoelace formula.
    #[inline]
    pub fn signed_area(&self) -> f64 {
        signed_area_of_points(&self.outer)
    }
}

impl Shape {
    pub fn new(polygons: Vec<Polygon>) -> Self {
        Self { polygons }
    }

    pub fn from_polygon(polygon: Polygon) -> Self {
        Self {
            polygons: vec![polygon],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.iter().all(|p| p.outer.len() < 3)
    }

    /// More than one disjoint region.
    pub fn is_multi(&self) -> bool {
        self.polygons.len() > 1
    }

    pub fn hole_count(&self) -> usize {
        self.polygons.iter().map(|p| p.holes.len()).sum()
    }

    pub fn area(&self) -> f64 {
        self.polygons.iter().map(Polygon::area).sum()
    }

    /// Bounding box over every polygon's outer ring.
    pub fn bounding_box(&self) -> Option<(f64, f64, f64, f64)> {
        self.polygons
            .iter()
            .filter_map(Polygon::bounding_box)
            .reduce(|a, b| (a.0.min(b.0), a.1.min(b.1), a.2.max(b.2), a.3.max(b.3)))
    }

    /// Center of the bounding box.
    pub fn center(&self) -> Option<Point> {
        self.bounding_box().map(|(min_x, min_y, max_x, max_y)| {
            Point::new((min_x + max_x) / 2.0, (min_y + max_y) / 2.0)
        })
    }

    pub fn map_points<F>(&self, f: F) -> Shape
    where
        F: Fn(Point) -> Point + Copy,
    {
        Shape {
            polygons: self.polygons.iter().map(|p| p.map_points(f)).collect(),
        }
    }

    /// Uniform scale about the origin, used for drawing-unit → mm conversion.
    pub fn scaled(&self, factor: f64) -> Shape {
        self.map_points(|p| Point::new(p.x * factor, p.y * factor))
    }
}

/// Bounding box of a point sequence.
pub fn bounds_of_points(points: &[Point]) -> Option<(f64, f64, f64, f64)> {
    if points.is_empty() {
        return None;
    }

    let min_x = points.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
    let min_y = points.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
    let max_x = points.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
    let max_y = points.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);

    Some((min_x, min_y, max_x, max_y))
}

/// Calculate signed area of a point sequence using the shoelace formula.
///
/// Returns:
/// - Positive value for counter-clockwise winding
/// - Negative value for clockwise winding
///
/// Works for open and closed rings alike (the closing edge of a closed
/// ring has zero contribution).
pub fn signed_area_of_points(points: &[Point]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }

    let mut area = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        area += points[i].x * points[j].y;
        area -= points[j].x * points[i].y;
    }
    area / 2.0
}

/// Append the start point when a ring does not already end on it.
pub fn close_ring(points: &mut Vec<Point>) {
    if let (Some(&first), Some(&last)) = (points.first(), points.last()) {
        if first != last {
            points.push(first);
        }
    }
}

/// Drop consecutive points closer than `tolerance`.
pub fn dedup_points(points: &mut Vec<Point>, tolerance: f64) {
    if points.len() >= 2 {
        points.dedup_by(|a, b| a.is_near(*b, tolerance));
    }
}

// ============================================================================
// TESTS
// ============================================================================
