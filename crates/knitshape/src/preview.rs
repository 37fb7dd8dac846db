//! SVG preview of a final outline.
//!
//! One `<path>` per polygon, holes as extra sub-paths, filled even-odd so
//! the holes show through. The document is sized in millimeters so it
//! prints at the piece's real size.

use std::fs;
use std::path::Path;

use quick_xml::escape::escape;
use tracing::debug;

use crate::error::ConvertError;
use crate::geometry::{Point, Shape};

/// Render `shape` (mm) as a standalone SVG document.
pub fn preview_svg(shape: &Shape, title: &str) -> String {
    let (min_x, min_y, max_x, max_y) = shape.bounding_box().unwrap_or((0.0, 0.0, 0.0, 0.0));
    let width = max_x - min_x;
    let height = max_y - min_y;

    let mut svg = String::new();
    svg.push_str(&format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" viewBox="{:.3} {:.3} {:.3} {:.3}" width="{:.3}mm" height="{:.3}mm">
<title>{}</title>
"#,
        min_x,
        min_y,
        width,
        height,
        width,
        height,
        escape(title)
    ));

    for polygon in &shape.polygons {
        if polygon.outer.len() < 3 {
            continue;
        }
        let mut d = ring_path(&polygon.outer);
        for hole in polygon.holes.iter().filter(|h| h.len() >= 3) {
            d.push(' ');
            d.push_str(&ring_path(hole));
        }
        svg.push_str(&format!(
            "  <path d=\"{}\" fill=\"black\" fill-rule=\"evenodd\" stroke=\"none\"/>\n",
            d
        ));
    }

    svg.push_str("</svg>\n");
    svg
}

/// Write the preview to `path`.
pub fn write_preview(shape: &Shape, title: &str, path: &Path) -> Result<(), ConvertError> {
    fs::write(path, preview_svg(shape, title)).map_err(|e| ConvertError::io(path, e))?;
    debug!(path = %path.display(), "wrote preview");
    Ok(())
}

/// `M x,y L x,y ... Z` for one ring.
fn ring_path(ring: &[Point]) -> String {
    let mut coords = ring.iter();
    let mut d = String::new();
    if let Some(first) = coords.next() {
        d.push_str(&format!("M {:.3},{:.3}", first.x, first.y));
    }
    // The closing point is implied by Z
    let body = if ring.len() > 1 && ring.first() == ring.last() {
        &ring[1..ring.len() - 1]
    } else {
        ring.get(1..).unwrap_or(&[])
    };
    for p in body {
        d.push_str(&format!(" L {:.3},{:.3}", p.x, p.y));
    }
    d.push_str(" Z");
    d
}

// ============================================================================
// TESTS
// ============================================================================
