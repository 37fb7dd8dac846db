//! SVG backend - outlines from `<path>` elements.
//!
//! The document is streamed with quick-xml rather than resolved into a
//! full tree: all we need is the root's `width`/`height`/`viewBox` and the
//! `d` attribute of every path outside `<defs>`. Path data goes through
//! svgtypes' simplifying parser, so relative commands, shorthand curves and
//! elliptical arcs all arrive as absolute lines, quadratics and cubics.
//!
//! ## Curve Flattening
//!
//! Bézier segments are flattened with lyon_geom at the configured curve
//! tolerance, measured in user units before the physical scale applies.
//!
//! Every sub-path becomes one ring (open sub-paths are closed back to their
//! start) and every ring from the file belongs to one piece, named after
//! the file.

use lyon_geom::{CubicBezierSegment, QuadraticBezierSegment, point};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use svgtypes::{SimplePathSegment, SimplifyingPathParser};
use tracing::{debug, info, warn};

use crate::assemble::RawFragment;
use crate::config::GeometrySettings;
use crate::error::ConvertError;
use crate::geometry::{Point, close_ring, dedup_points};
use crate::heal::heal_ring;
use crate::units::SvgScale;

/// What the extractor keeps from the XML.
#[derive(Debug, Default)]
struct SvgDocument {
    width: Option<String>,
    height: Option<String>,
    view_box: Option<(f64, f64)>,
    paths: Vec<String>,
}

impl SvgDocument {
    fn scale(&self) -> SvgScale {
        SvgScale::from_root(self.width.as_deref(), self.height.as_deref(), self.view_box)
    }
}

/// Extract the healed rings of an SVG file, in millimeters, all named
/// `piece_name`.
pub fn extract_svg(
    content: &str,
    piece_name: &str,
    settings: &GeometrySettings,
) -> Result<Vec<RawFragment>, ConvertError> {
    let doc = read_document(content)?;
    let scale = doc.scale();
    debug!(paths = doc.paths.len(), scale_x = scale.x, scale_y = scale.y, "parsed SVG");

    let mut fragments = Vec::new();
    for d in &doc.paths {
        for mut ring in subpath_rings(d, settings.curve_tolerance)? {
            ring.iter_mut().for_each(|p| {
                p.x *= scale.x;
                p.y *= scale.y;
            });
            match heal_ring(&ring, settings.heal_tolerance) {
                Some(shape) => fragments.push(RawFragment::new(piece_name, piece_name, shape)),
                None => debug!(piece = piece_name, "dropping sub-path that did not heal into a polygon"),
            }
        }
    }

    if fragments.is_empty() {
        warn!(piece = piece_name, "no closed outlines found in SVG");
    } else {
        info!(piece = piece_name, fragments = fragments.len(), "extracted SVG outlines");
    }
    Ok(fragments)
}

/// Stream the XML, collecting root dimensions and path data.
fn read_document(content: &str) -> Result<SvgDocument, ConvertError> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut doc = SvgDocument::default();
    let mut seen_root = false;
    let mut defs_depth = 0usize;

    loop {
        let event = reader.read_event().map_err(|e| {
            ConvertError::svg(format!(
                "XML parse error at position {}: {e}",
                reader.error_position()
            ))
        })?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_start = matches!(event, Event::Start(_));
                match e.local_name().as_ref() {
                    b"svg" if !seen_root => {
                        seen_root = true;
                        read_root(e, &mut doc)?;
                    }
                    b"defs" if is_start => defs_depth += 1,
                    b"path" if defs_depth == 0 => {
                        if let Some(d) = attribute(e, b"d")? {
                            doc.paths.push(d);
                        }
                    }
                    _ => {}
                }
            }
            Event::End(ref e) if e.local_name().as_ref() == b"defs" => {
                defs_depth = defs_depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Err(ConvertError::svg("document has no <svg> element"));
    }
    Ok(doc)
}

fn read_root(e: &BytesStart<'_>, doc: &mut SvgDocument) -> Result<(), ConvertError> {
    doc.width = attribute(e, b"width")?;
    doc.height = attribute(e, b"height")?;
    if let Some(raw) = attribute(e, b"viewBox")? {
        match raw.parse::<svgtypes::ViewBox>() {
            Ok(vb) => doc.view_box = Some((vb.w, vb.h)),
            Err(err) => warn!(view_box = %raw, %err, "ignoring unparseable viewBox"),
        }
    }
    Ok(())
}

/// Unescaped value of the attribute whose local name is `key`.
fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>, ConvertError> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| ConvertError::svg(format!("bad attribute: {err}")))?;
        if attr.key.local_name().as_ref() == key {
            let value = attr
                .unescape_value()
                .map_err(|err| ConvertError::svg(format!("bad attribute value: {err}")))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Split path data into closed point rings, one per sub-path.
///
/// ## Rust Lesson #23: Iterator Adapters
///
/// `SimplifyingPathParser` is an iterator of `Result`s. Matching on each
/// item and returning early with `?` keeps the error path in one place.
pub fn subpath_rings(d: &str, tolerance: f64) -> Result<Vec<Vec<Point>>, ConvertError> {
    let mut rings = Vec::new();
    let mut current: Vec<Point> = Vec::new();
    let mut start = Point::new(0.0, 0.0);
    let mut last = start;

    for segment in SimplifyingPathParser::from(d) {
        let segment =
            segment.map_err(|err| ConvertError::svg(format!("invalid path data \"{d}\": {err}")))?;
        match segment {
            SimplePathSegment::MoveTo { x, y } => {
                finish_ring(&mut current, &mut rings);
                start = Point::new(x, y);
                last = start;
                current.push(start);
            }
            SimplePathSegment::LineTo { x, y } => {
                if current.is_empty() {
                    current.push(last);
                }
                last = Point::new(x, y);
                current.push(last);
            }
            SimplePathSegment::Quadratic { x1, y1, x, y } => {
                if current.is_empty() {
                    current.push(last);
                }
                let curve = QuadraticBezierSegment {
                    from: point(last.x, last.y),
                    ctrl: point(x1, y1),
                    to: point(x, y),
                };
                curve.for_each_flattened(tolerance, &mut |seg| {
                    current.push(Point::new(seg.to.x, seg.to.y));
                });
                last = Point::new(x, y);
            }
            SimplePathSegment::CurveTo { x1, y1, x2, y2, x, y } => {
                if current.is_empty() {
                    current.push(last);
                }
                let curve = CubicBezierSegment {
                    from: point(last.x, last.y),
                    ctrl1: point(x1, y1),
                    ctrl2: point(x2, y2),
                    to: point(x, y),
                };
                curve.for_each_flattened(tolerance, &mut |seg| {
                    current.push(Point::new(seg.to.x, seg.to.y));
                });
                last = Point::new(x, y);
            }
            SimplePathSegment::ClosePath => {
                finish_ring(&mut current, &mut rings);
                last = start;
            }
        }
    }
    finish_ring(&mut current, &mut rings);

    Ok(rings)
}

/// Close the pending sub-path and keep it if it has an area to speak of.
fn finish_ring(current: &mut Vec<Point>, rings: &mut Vec<Vec<Point>>) {
    let mut ring = std::mem::take(current);
    dedup_points(&mut ring, 1e-9);
    close_ring(&mut ring);
    if ring.len() >= 4 {
        rings.push(ring);
    }
}

// ============================================================================
// TESTS
// ============================================================================
