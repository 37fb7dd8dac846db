//! Scanline rasterization of a piece into stitch runs.
//!
//! The outline is cut by horizontal lines one machine row apart. Each
//! inside interval on a line becomes a run of stitches, measured in whole
//! stitches from the left edge of the piece.
//!
//! ## Rust Lesson #31: Lazy Iterators
//!
//! [`RowScanner`] computes one row per `next()` call and owns nothing but
//! a borrowed shape and a counter. Cloning it restarts nothing and costs
//! nothing; calling [`scan_rows`] again starts over from row zero.

use tracing::debug;

use crate::clip::scanline_segments;
use crate::error::ConvertError;
use crate::geometry::Shape;

/// Offset added to every scan line so it never runs exactly along a
/// horizontal edge at the bottom of the piece.
pub const SCAN_EPSILON: f64 = 1e-6;

/// Fraction of a row ignored when counting rows, so float noise left on a
/// piece's height by healing can't add a row.
const ROW_SNAP: f64 = 1e-6;

/// Machine tension: stitches and rows per 10 cm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gauge {
    pub sts10: f64,
    pub rows10: f64,
}

impl Gauge {
    /// Both values must be positive and finite; nothing is clamped.
    pub fn new(sts10: f64, rows10: f64) -> Result<Self, ConvertError> {
        for (name, value) in [("sts10", sts10), ("rows10", rows10)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConvertError::InvalidGauge { name, value });
            }
        }
        Ok(Self { sts10, rows10 })
    }

    /// Width of one stitch in mm.
    #[inline]
    pub fn column_pitch(&self) -> f64 {
        100.0 / self.sts10
    }

    /// Height of one row in mm.
    #[inline]
    pub fn row_pitch(&self) -> f64 {
        100.0 / self.rows10
    }
}

/// `count` stitches starting `indent` stitches from the piece's left edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StitchRun {
    pub indent: usize,
    pub count: usize,
}

impl StitchRun {
    /// One past the last stitch.
    #[inline]
    pub fn end(&self) -> usize {
        self.indent + self.count
    }
}

/// Lazily scans a shape row by row, bottom to top.
#[derive(Debug, Clone)]
pub struct RowScanner<'a> {
    shape: &'a Shape,
    min_x: f64,
    min_y: f64,
    column_pitch: f64,
    row_pitch: f64,
    next_row: usize,
    rows: usize,
}

/// Start scanning `shape` (in mm) at `gauge`.
pub fn scan_rows<'a>(shape: &'a Shape, gauge: &Gauge) -> RowScanner<'a> {
    let row_pitch = gauge.row_pitch();
    let (min_x, min_y, rows) = match shape.bounding_box() {
        Some((min_x, min_y, _, max_y)) => {
            let rows = ((max_y - min_y) / row_pitch - ROW_SNAP).ceil().max(0.0) as usize;
            (min_x, min_y, rows)
        }
        None => (0.0, 0.0, 0),
    };
    RowScanner {
        shape,
        min_x,
        min_y,
        column_pitch: gauge.column_pitch(),
        row_pitch,
        next_row: 0,
        rows,
    }
}

impl RowScanner<'_> {
    /// Total rows, scanned or not.
    pub fn row_count(&self) -> usize {
        self.rows
    }

    /// Runs for row `r`, independent of the iterator position.
    pub fn row(&self, r: usize) -> Vec<StitchRun> {
        let y = self.min_y + r as f64 * self.row_pitch + SCAN_EPSILON;
        let mut runs: Vec<StitchRun> = Vec::new();

        for (x0, x1) in scanline_segments(y, self.shape) {
            let mut indent = to_stitches((x0 - self.min_x) / self.column_pitch);
            let mut count = to_stitches((x1 - x0) / self.column_pitch);

            // Rounding can push two close intervals into each other
            if let Some(prev) = runs.last() {
                let end = prev.end();
                if indent < end {
                    count = count.saturating_sub(end - indent);
                    indent = end;
                }
            }
            if count > 0 {
                runs.push(StitchRun { indent, count });
            }
        }
        runs
    }
}

impl Iterator for RowScanner<'_> {
    type Item = Vec<StitchRun>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_row >= self.rows {
            return None;
        }
        let runs = self.row(self.next_row);
        self.next_row += 1;
        Some(runs)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.rows - self.next_row;
        (left, Some(left))
    }
}

impl ExactSizeIterator for RowScanner<'_> {}

/// Round half to even, never below zero.
#[inline]
fn to_stitches(v: f64) -> usize {
    v.round_ties_even().max(0.0) as usize
}

/// Every row of a piece, collected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StitchGrid {
    pub rows: Vec<Vec<StitchRun>>,
}

impl StitchGrid {
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = Vec<StitchRun>>,
    {
        Self {
            rows: rows.into_iter().collect(),
        }
    }

    /// Widest extent of any row, in stitches.
    pub fn width(&self) -> usize {
        self.rows
            .iter()
            .flat_map(|row| row.iter().map(StitchRun::end))
            .max()
            .unwrap_or(0)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(Vec::is_empty)
    }
}

/// Scan the whole shape into a grid.
pub fn rasterize(shape: &Shape, gauge: &Gauge) -> StitchGrid {
    let grid = StitchGrid::from_rows(scan_rows(shape, gauge));
    debug!(
        rows = grid.row_count(),
        width = grid.width(),
        sts10 = gauge.sts10,
        rows10 = gauge.rows10,
        "rasterized piece"
    );
    grid
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Point, Polygon};

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Shape {
        Shape::from_polygon(Polygon::new(vec![
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
            Point::new(x0, y0),
        ]))
    }

    fn gauge(sts10: f64, rows10: f64) -> Gauge {
        Gauge::new(sts10, rows10).unwrap()
    }

    #[test]
    fn gauge_rejects_non_positive() {
        assert!(matches!(
            Gauge::new(0.0, 30.0),
            Err(ConvertError::InvalidGauge { name: "sts10", .. })
        ));
        assert!(matches!(
            Gauge::new(30.0, -1.0),
            Err(ConvertError::InvalidGauge { name: "rows10", .. })
        ));
        assert!(Gauge::new(f64::NAN, 30.0).is_err());
        assert!((gauge(50.0, 25.0).column_pitch() - 2.0).abs() < 1e-12);
        assert!((gauge(50.0, 25.0).row_pitch() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn rectangle_at_five_millimeter_pitch() {
        let grid = rasterize(&rect(0.0, 0.0, 100.0, 50.0), &gauge(20.0, 20.0));
        assert_eq!(grid.row_count(), 10);
        assert_eq!(grid.width(), 20);
        for row in &grid.rows {
            assert_eq!(row, &vec![StitchRun { indent: 0, count: 20 }]);
        }
    }

    #[test]
    fn healing_noise_does_not_add_a_row() {
        let grid = rasterize(&rect(0.0, 0.0, 10.0, 50.0 + 1e-10), &gauge(20.0, 20.0));
        assert_eq!(grid.row_count(), 10);
    }

    #[test]
    fn exact_multiple_of_row_pitch_has_no_extra_row() {
        for rows10 in [20.0, 30.0, 70.0, 100.0 / 3.0] {
            let pitch = 100.0 / rows10;
            for rows in 1..=40 {
                let height = rows as f64 * pitch;
                let grid = rasterize(&rect(0.0, 0.0, 10.0, height), &gauge(20.0, rows10));
                assert_eq!(grid.row_count(), rows, "rows10 {rows10}, height {height}");
            }
        }
    }

    #[test]
    fn overshoot_beyond_snap_adds_a_row() {
        let grid = rasterize(&rect(0.0, 0.0, 10.0, 50.001), &gauge(20.0, 20.0));
        assert_eq!(grid.row_count(), 11);
    }

    #[test]
    fn partial_last_row_is_kept() {
        let grid = rasterize(&rect(0.0, 0.0, 10.0, 11.0), &gauge(20.0, 20.0));
        assert_eq!(grid.row_count(), 3);
    }

    #[test]
    fn offset_shape_starts_at_zero_indent() {
        let grid = rasterize(&rect(500.0, -300.0, 510.0, -290.0), &gauge(100.0, 100.0));
        assert_eq!(grid.row_count(), 10);
        assert!(grid.rows.iter().all(|r| r == &vec![StitchRun { indent: 0, count: 10 }]));
    }

    #[test]
    fn hole_splits_rows() {
        let shape = Shape::from_polygon(Polygon::with_holes(
            rect(0.0, 0.0, 30.0, 30.0).polygons[0].outer.clone(),
            vec![rect(10.0, 10.0, 20.0, 20.0).polygons[0].outer.clone()],
        ));
        let grid = rasterize(&shape, &gauge(10.0, 10.0));
        assert_eq!(grid.row_count(), 3);
        assert_eq!(grid.rows[0], vec![StitchRun { indent: 0, count: 3 }]);
        assert_eq!(
            grid.rows[1],
            vec![StitchRun { indent: 0, count: 1 }, StitchRun { indent: 2, count: 1 }]
        );
        assert_eq!(grid.rows[2], vec![StitchRun { indent: 0, count: 3 }]);
    }

    #[test]
    fn rows_without_crossings_are_empty() {
        let shape = Shape::new(vec![
            rect(0.0, 0.0, 10.0, 10.0).polygons[0].clone(),
            rect(0.0, 30.0, 10.0, 40.0).polygons[0].clone(),
        ]);
        let grid = rasterize(&shape, &gauge(10.0, 10.0));
        assert_eq!(grid.row_count(), 4);
        assert!(!grid.rows[0].is_empty());
        assert!(grid.rows[1].is_empty());
        assert!(grid.rows[2].is_empty());
        assert!(!grid.rows[3].is_empty());
    }

    #[test]
    fn rounding_is_half_to_even() {
        assert_eq!(to_stitches(0.5), 0);
        assert_eq!(to_stitches(1.5), 2);
        assert_eq!(to_stitches(2.5), 2);
        assert_eq!(to_stitches(-0.4), 0);
    }

    #[test]
    fn slivers_round_to_nothing() {
        // 2 mm wide at 10 mm per stitch
        let grid = rasterize(&rect(0.0, 0.0, 2.0, 30.0), &gauge(10.0, 10.0));
        assert_eq!(grid.row_count(), 3);
        assert!(grid.is_empty());
        assert_eq!(grid.width(), 0);
    }

    #[test]
    fn scanner_is_lazy_and_restartable() {
        let shape = rect(0.0, 0.0, 10.0, 10.0);
        let g = gauge(10.0, 50.0);
        let mut scanner = scan_rows(&shape, &g);
        assert_eq!(scanner.len(), 5);
        scanner.next();
        let rest = scanner.clone();
        assert_eq!(rest.len(), 4);
        assert_eq!(scanner.count(), 4);
        assert_eq!(scan_rows(&shape, &g).count(), 5);
    }

    #[test]
    fn empty_shape_has_no_rows() {
        let grid = rasterize(&Shape::default(), &gauge(20.0, 20.0));
        assert_eq!(grid.row_count(), 0);
        assert_eq!(grid.width(), 0);
    }
}
