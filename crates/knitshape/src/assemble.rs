//! Grouping extracted fragments into named garment pieces.

use std::collections::HashMap;

use tracing::debug;

use crate::clip::point_in_shape;
use crate::geometry::{Point, Shape};
use crate::heal;

/// A healed outline attributed to a piece, before grouping.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFragment {
    /// Piece name: block label, block name, layer or file stem
    pub name: String,
    /// Layer or block the fragment came from
    pub source: String,
    pub shape: Shape,
}

impl RawFragment {
    pub fn new(name: impl Into<String>, source: impl Into<String>, shape: Shape) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            shape,
        }
    }
}

/// A named garment piece in millimeters.
#[derive(Debug, Clone, PartialEq)]
pub struct Piece {
    pub name: String,
    pub source: String,
    pub shape: Shape,
}

/// Group fragments by name and merge each group into one shape.
///
/// Pieces come out in the order their names were first seen. A name with
/// a single fragment passes through untouched. Otherwise fragments are
/// folded in by descending area: one lying inside what has been composed
/// so far, and more than `tolerance` from its edges, is cut out as a hole.
/// Anything else is unioned in. So an outline with a nested ring becomes a
/// polygon with a hole, two disjoint outlines become a multi-polygon, and
/// an outline drawn twice (or once slightly inset) stays solid.
pub fn assemble(fragments: Vec<RawFragment>, tolerance: f64) -> Vec<Piece> {
    let mut order: Vec<(String, Vec<RawFragment>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for fragment in fragments {
        match index.get(&fragment.name) {
            Some(&i) => order[i].1.push(fragment),
            None => {
                index.insert(fragment.name.clone(), order.len());
                order.push((fragment.name.clone(), vec![fragment]));
            }
        }
    }

    order
        .into_iter()
        .filter_map(|(name, group)| {
            let count = group.len();
            let source = group.first()?.source.clone();
            let shape = compose(group, tolerance);
            debug!(piece = %name, fragments = count, polygons = shape.polygons.len(), "assembled piece");
            if shape.is_empty() {
                debug!(piece = %name, "piece vanished during composition");
                return None;
            }
            Some(Piece { name, source, shape })
        })
        .collect()
}

fn compose(mut group: Vec<RawFragment>, tolerance: f64) -> Shape {
    if group.len() == 1 {
        return group.remove(0).shape;
    }

    group.sort_by(|a, b| b.shape.area().total_cmp(&a.shape.area()));

    let mut composed = Shape::default();
    for fragment in group {
        if !composed.is_empty() && is_clearly_inside(&fragment.shape, &composed, tolerance) {
            composed = heal::difference(&composed, &fragment.shape);
        } else {
            composed = heal::union(&composed, &fragment.shape);
        }
    }
    composed
}

/// `inner` sits in the filled area of `outer` with a gap wider than
/// `tolerance` between their boundaries.
fn is_clearly_inside(inner: &Shape, outer: &Shape, tolerance: f64) -> bool {
    lies_within(inner, outer) && boundary_gap(inner, outer) > tolerance
}

/// Every outer vertex of `inner` is inside the filled area of `outer`.
fn lies_within(inner: &Shape, outer: &Shape) -> bool {
    inner
        .polygons
        .iter()
        .flat_map(|p| p.outer.iter())
        .all(|v| point_in_shape(v.x, v.y, outer))
}

/// Smallest distance between the rings of two shapes.
///
/// Exact as long as the rings don't cross: the closest approach of two
/// disjoint polylines is always at a vertex of one of them.
fn boundary_gap(a: &Shape, b: &Shape) -> f64 {
    let mut gap = f64::INFINITY;
    for ra in rings(a) {
        for rb in rings(b) {
            gap = gap.min(vertex_gap(ra, rb)).min(vertex_gap(rb, ra));
        }
    }
    gap
}

fn rings(shape: &Shape) -> impl Iterator<Item = &[Point]> {
    shape.polygons.iter().flat_map(|p| {
        std::iter::once(p.outer.as_slice()).chain(p.holes.iter().map(Vec::as_slice))
    })
}

/// Closest approach of any vertex in `points` to an edge of `ring`.
fn vertex_gap(points: &[Point], ring: &[Point]) -> f64 {
    let edges: Vec<(Point, Point)> = ring
        .iter()
        .zip(ring.iter().cycle().skip(1))
        .map(|(a, b)| (*a, *b))
        .collect();
    points
        .iter()
        .flat_map(|p| edges.iter().map(move |&(a, b)| segment_distance(*p, a, b)))
        .fold(f64::INFINITY, f64::min)
}

fn segment_distance(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len2 = dx * dx + dy * dy;
    if len2 == 0.0 {
        return p.distance(a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len2).clamp(0.0, 1.0);
    p.distance(Point::new(a.x + t * dx, a.y + t * dy))
}

// ============================================================================
// TESTS
// ============================================================================
