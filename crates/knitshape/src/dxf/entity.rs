//! Parsed DXF entities.
//!
//! Only the entities that can carry a garment outline or a piece label are
//! modelled. Coordinates are 2D drawing units; Z is dropped on read.

use crate::geometry::Point;

/// A polyline vertex with the bulge of the segment that starts at it.
///
/// Bulge is `tan(θ/4)` of the arc to the next vertex; 0 means straight and
/// positive means counter-clockwise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub point: Point,
    pub bulge: f64,
}

impl Vertex {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            point: Point::new(x, y),
            bulge: 0.0,
        }
    }

    pub fn with_bulge(x: f64, y: f64, bulge: f64) -> Self {
        Self {
            point: Point::new(x, y),
            bulge,
        }
    }
}

/// `LWPOLYLINE` or legacy `POLYLINE` with its `VERTEX` records.
#[derive(Debug, Clone, PartialEq)]
pub struct Polyline {
    pub vertices: Vec<Vertex>,
    pub closed: bool,
    pub layer: String,
}

/// NURBS curve data shared by `SPLINE` entities and hatch spline edges.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SplineCurve {
    pub degree: usize,
    pub knots: Vec<f64>,
    pub weights: Vec<f64>,
    pub control_points: Vec<Point>,
    pub fit_points: Vec<Point>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spline {
    pub curve: SplineCurve,
    pub layer: String,
}

/// One edge of a hatch boundary path. Angles are degrees as stored.
#[derive(Debug, Clone, PartialEq)]
pub enum HatchEdge {
    Line {
        start: Point,
        end: Point,
    },
    Arc {
        center: Point,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        counter_clockwise: bool,
    },
    Ellipse {
        center: Point,
        /// Major axis endpoint relative to the center
        major_axis: Point,
        ratio: f64,
        start_angle: f64,
        end_angle: f64,
        counter_clockwise: bool,
    },
    Spline(SplineCurve),
}

/// A hatch boundary path.
#[derive(Debug, Clone, PartialEq)]
pub enum HatchLoop {
    Polyline { vertices: Vec<Vertex>, closed: bool },
    Edges(Vec<HatchEdge>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Hatch {
    pub loops: Vec<HatchLoop>,
    pub layer: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub start: Point,
    pub end: Point,
    pub layer: String,
}

/// `ARC`: counter-clockwise from `start_angle` to `end_angle`, in degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct Arc {
    pub center: Point,
    pub radius: f64,
    pub start_angle: f64,
    pub end_angle: f64,
    pub layer: String,
}

/// A block reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    pub block: String,
    pub position: Point,
    pub scale_x: f64,
    pub scale_y: f64,
    /// Degrees, counter-clockwise
    pub rotation: f64,
    /// Values of the trailing `ATTRIB` records
    pub attributes: Vec<String>,
    pub layer: String,
}

/// `TEXT` or `MTEXT` content.
#[derive(Debug, Clone, PartialEq)]
pub struct Text {
    pub text: String,
    pub layer: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Polyline(Polyline),
    Hatch(Hatch),
    Spline(Spline),
    Line(Line),
    Arc(Arc),
    Insert(Insert),
    Text(Text),
    MText(Text),
}

impl Entity {
    pub fn layer(&self) -> &str {
        match self {
            Entity::Polyline(e) => &e.layer,
            Entity::Hatch(e) => &e.layer,
            Entity::Spline(e) => &e.layer,
            Entity::Line(e) => &e.layer,
            Entity::Arc(e) => &e.layer,
            Entity::Insert(e) => &e.layer,
            Entity::Text(e) | Entity::MText(e) => &e.layer,
        }
    }

    /// Text carried by a label-capable entity.
    pub fn text(&self) -> Option<&str> {
        match self {
            Entity::Text(t) | Entity::MText(t) => Some(&t.text),
            _ => None,
        }
    }
}

/// A `BLOCK` definition from the BLOCKS section.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub name: String,
    pub base_point: Point,
    pub entities: Vec<Entity>,
}

impl Block {
    /// Model/paper space layout blocks hold no reusable geometry.
    pub fn is_layout(&self) -> bool {
        let name = self.name.to_ascii_lowercase();
        name.starts_with("*model_space") || name.starts_with("*paper_space")
    }
}
