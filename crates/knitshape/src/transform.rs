//! Piece selection, rotation and mirrored duplication.
//!
//! Knitting machines work in rows, so a piece often has to be turned to
//! get the grain running the right way. Mirroring builds a full back or
//! yoke from a half-pattern drawn against a fold line.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::assemble::Piece;
use crate::error::ConvertError;
use crate::geometry::{Point, Shape};
use crate::heal::{heal_shape, union};

/// Which bounding-box edge a piece is reflected about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MirrorMode {
    #[default]
    None,
    /// Reflect about the left edge; the copy lands to the left.
    Left,
    /// Reflect about the right edge; the copy lands to the right.
    Right,
}

impl MirrorMode {
    pub fn all() -> &'static [MirrorMode] {
        &[MirrorMode::None, MirrorMode::Left, MirrorMode::Right]
    }

    pub fn name(&self) -> &'static str {
        match self {
            MirrorMode::None => "none",
            MirrorMode::Left => "left",
            MirrorMode::Right => "right",
        }
    }

    pub fn from_name(name: &str) -> Option<MirrorMode> {
        match name.trim().to_lowercase().as_str() {
            "none" | "" => Some(MirrorMode::None),
            "left" => Some(MirrorMode::Left),
            "right" => Some(MirrorMode::Right),
            _ => None,
        }
    }
}

impl fmt::Display for MirrorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MirrorMode {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MirrorMode::from_name(s).ok_or_else(|| ConvertError::InvalidTransform {
            message: format!("unknown mirror mode \"{s}\" (expected none, left or right)"),
        })
    }
}

/// Rotation and mirroring applied to a selected piece.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PieceTransform {
    /// Degrees, counter-clockwise
    pub rotation: f64,
    pub mirror: MirrorMode,
}

impl PieceTransform {
    pub fn new(rotation: f64, mirror: MirrorMode) -> Result<Self, ConvertError> {
        if !rotation.is_finite() {
            return Err(ConvertError::InvalidTransform {
                message: format!("rotation must be a finite number of degrees, got {rotation}"),
            });
        }
        Ok(Self { rotation, mirror })
    }

    /// Rotate, mirror and heal.
    ///
    /// The result is always re-healed, so even the identity transform
    /// normalizes ring orientation and welds any slivers left by assembly.
    pub fn apply(&self, shape: &Shape, heal_tolerance: f64) -> Shape {
        let rotated = rotate(shape, self.rotation);

        let combined = match self.mirror {
            MirrorMode::None => rotated,
            mode => match rotated.bounding_box() {
                Some((min_x, _, max_x, _)) => {
                    let edge = if mode == MirrorMode::Left { min_x } else { max_x };
                    let reflected = rotated.map_points(|p| Point::new(2.0 * edge - p.x, p.y));
                    union(&rotated, &reflected)
                }
                None => rotated,
            },
        };

        let healed = heal_shape(&combined, heal_tolerance);
        debug!(
            rotation = self.rotation,
            mirror = %self.mirror,
            polygons = healed.polygons.len(),
            area = healed.area(),
            "transformed piece"
        );
        healed
    }
}

/// Rotate about the bounding-box center. Zero degrees is a no-op.
pub fn rotate(shape: &Shape, degrees: f64) -> Shape {
    if degrees == 0.0 {
        return shape.clone();
    }
    let Some(center) = shape.center() else {
        return shape.clone();
    };
    let (sin_a, cos_a) = (degrees * PI / 180.0).sin_cos();
    shape.map_points(move |p| {
        let dx = p.x - center.x;
        let dy = p.y - center.y;
        Point::new(
            center.x + dx * cos_a - dy * sin_a,
            center.y + dx * sin_a + dy * cos_a,
        )
    })
}

/// Pick a piece by its 1-based position.
pub fn select_piece(pieces: &[Piece], index: usize) -> Result<&Piece, ConvertError> {
    index
        .checked_sub(1)
        .and_then(|i| pieces.get(i))
        .ok_or(ConvertError::PieceNotFound {
            index,
            available: pieces.len(),
        })
}

// ============================================================================
// TESTS
// ============================================================================
