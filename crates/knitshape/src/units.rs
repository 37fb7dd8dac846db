//! Physical unit handling: SVG length attributes and DXF `$INSUNITS`.
//!
//! Every extractor hands the assembler millimeters. SVG documents carry
//! their size in `width`/`height`/`viewBox`; DXF files carry a units code
//! in the header or get an explicit multiplier from the caller.

use std::str::FromStr;

const MM_PER_INCH: f64 = 25.4;
const POINTS_PER_INCH: f64 = 72.0;
const PIXELS_PER_INCH: f64 = 96.0;

/// A unit suffix on an SVG length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthUnit {
    /// `pt`, and also the unit assumed for bare numbers (Illustrator default)
    Point,
    Inch,
    Centimeter,
    Millimeter,
    /// `px`, and the fallback for anything unrecognized
    Pixel,
}

impl LengthUnit {
    /// Map a suffix to a unit. Never fails: unknown suffixes mean pixels.
    pub fn from_suffix(suffix: &str) -> Self {
        match suffix.to_ascii_lowercase().as_str() {
            "" | "pt" => LengthUnit::Point,
            "in" | "inch" | "inches" => LengthUnit::Inch,
            "cm" => LengthUnit::Centimeter,
            "mm" => LengthUnit::Millimeter,
            _ => LengthUnit::Pixel,
        }
    }

    pub fn mm_per_unit(self) -> f64 {
        match self {
            LengthUnit::Point => MM_PER_INCH / POINTS_PER_INCH,
            LengthUnit::Inch => MM_PER_INCH,
            LengthUnit::Centimeter => 10.0,
            LengthUnit::Millimeter => 1.0,
            LengthUnit::Pixel => MM_PER_INCH / PIXELS_PER_INCH,
        }
    }
}

/// A number with a unit, as written in an SVG `width` or `height`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Length {
    pub value: f64,
    pub unit: LengthUnit,
}

impl Length {
    pub fn to_mm(self) -> f64 {
        self.value * self.unit.mm_per_unit()
    }
}

/// Parse a length like `10in`, `210mm`, `595.3` or `100%`.
///
/// The leading run of digits and dots is the value; the letters (or `%`)
/// right after it are the unit. Anything that does not start with a number
/// is rejected.
pub fn parse_length(s: &str) -> Option<Length> {
    let s = s.trim();
    let num_end = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    if num_end == 0 {
        return None;
    }
    let value = f64::from_str(&s[..num_end]).ok()?;

    let rest = &s[num_end..];
    let unit_end = rest
        .find(|c: char| !(c.is_ascii_alphabetic() || c == '%'))
        .unwrap_or(rest.len());

    Some(Length {
        value,
        unit: LengthUnit::from_suffix(&rest[..unit_end]),
    })
}

/// Millimeters per SVG user unit on each axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SvgScale {
    pub x: f64,
    pub y: f64,
}

impl Default for SvgScale {
    fn default() -> Self {
        Self { x: 1.0, y: 1.0 }
    }
}

impl SvgScale {
    /// Work out the document scale from the root element's attributes.
    ///
    /// Priority:
    /// 1. `width`/`height` plus `viewBox`: physical size over viewBox size,
    ///    independently per axis
    /// 2. `width`/`height` alone: one user unit is one attribute unit
    /// 3. `viewBox` alone: user units are points
    ///
    /// With none of them, user units are taken as millimeters.
    pub fn from_root(
        width: Option<&str>,
        height: Option<&str>,
        view_box_size: Option<(f64, f64)>,
    ) -> Self {
        let nonzero = |l: Length| (l.value != 0.0).then_some(l);
        let size = match (
            width.and_then(parse_length).and_then(nonzero),
            height.and_then(parse_length).and_then(nonzero),
        ) {
            (Some(w), Some(h)) => Some((w, h)),
            _ => None,
        };
        let view = view_box_size.filter(|&(w, h)| w != 0.0 && h != 0.0);

        match (size, view) {
            (Some((w, h)), Some((vw, vh))) => SvgScale {
                x: w.to_mm() / vw,
                y: h.to_mm() / vh,
            },
            (Some((w, h)), None) => SvgScale {
                x: w.unit.mm_per_unit(),
                y: h.unit.mm_per_unit(),
            },
            (None, Some(_)) => {
                let pt = LengthUnit::Point.mm_per_unit();
                SvgScale { x: pt, y: pt }
            }
            (None, None) => SvgScale::default(),
        }
    }
}

/// Millimeters per drawing unit for a DXF `$INSUNITS` code.
///
/// Returns `None` for unitless (0) and for codes we don't map, in which
/// case drawings are taken to be in millimeters already.
pub fn insunits_scale(code: i32) -> Option<f64> {
    match code {
        1 => Some(MM_PER_INCH),
        2 => Some(MM_PER_INCH * 12.0),
        4 => Some(1.0),
        5 => Some(10.0),
        6 => Some(1000.0),
        _ => None,
    }
}

// ============================================================================
// TESTS
// ============================================================================
