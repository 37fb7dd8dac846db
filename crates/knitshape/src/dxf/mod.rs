//! DXF backend: group-code reader, entity model, curve flattening and
//! outline extraction.

pub mod document;
pub mod entity;
pub mod extract;
pub mod flatten;
pub(crate) mod reader;

pub use document::DxfDocument;
pub use extract::{LayerFilter, PIECE_LABEL, extract_fragments, piece_label};

use tracing::{debug, info};

use crate::assemble::RawFragment;
use crate::config::GeometrySettings;
use crate::error::ConvertError;
use crate::units::insunits_scale;

/// Caller choices for a DXF extraction.
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    pub layers: LayerFilter,
    /// Millimeters per drawing unit. `None` defers to `$INSUNITS`.
    pub unit_scale: Option<f64>,
}

impl ExtractOptions {
    /// Scale to apply to this document's fragments.
    pub fn resolve_scale(&self, doc: &DxfDocument) -> f64 {
        self.unit_scale
            .or_else(|| doc.insunits.and_then(insunits_scale))
            .unwrap_or(1.0)
    }
}

/// Parse DXF text and return its fragments in millimeters.
pub fn extract_dxf(
    source: &str,
    options: &ExtractOptions,
    settings: &GeometrySettings,
) -> Result<Vec<RawFragment>, ConvertError> {
    let doc = DxfDocument::parse(source)?;
    debug!(
        entities = doc.entities.len(),
        blocks = doc.blocks.len(),
        insunits = ?doc.insunits,
        "parsed DXF"
    );

    let scale = options.resolve_scale(&doc);
    let mut fragments = extract_fragments(&doc, &options.layers, settings);
    if scale != 1.0 {
        for fragment in &mut fragments {
            fragment.shape = fragment.shape.scaled(scale);
        }
    }

    info!(fragments = fragments.len(), scale, "extracted DXF outlines");
    Ok(fragments)
}

#[cfg(test)]
mod tests {
    use super::*;

    const INCH_SQUARE: &str = "0\nSECTION\n2\nHEADER\n9\n$INSUNITS\n70\n1\n0\nENDSEC\n\
        0\nSECTION\n2\nENTITIES\n\
        0\nLWPOLYLINE\n8\nFRONT\n90\n4\n70\n1\n\
        10\n0\n20\n0\n10\n1\n20\n0\n10\n1\n20\n1\n10\n0\n20\n1\n\
        0\nENDSEC\n0\nEOF\n";

    #[test]
    fn insunits_selects_scale() {
        let frags = extract_dxf(INCH_SQUARE, &ExtractOptions::default(), &GeometrySettings::default())
            .expect("parse");
        assert_eq!(frags.len(), 1);
        let (_, _, x1, y1) = frags[0].shape.bounding_box().expect("bounds");
        assert!((x1 - 25.4).abs() < 0.05, "got {x1}");
        assert!((y1 - 25.4).abs() < 0.05);
    }

    #[test]
    fn explicit_scale_overrides_insunits() {
        let options = ExtractOptions {
            unit_scale: Some(10.0),
            ..ExtractOptions::default()
        };
        let frags = extract_dxf(INCH_SQUARE, &options, &GeometrySettings::default()).expect("parse");
        let (_, _, x1, _) = frags[0].shape.bounding_box().expect("bounds");
        assert!((x1 - 10.0).abs() < 0.05);
    }

    #[test]
    fn unknown_insunits_means_millimeters() {
        let doc = DxfDocument::from_parts(Some(3), Vec::new(), Vec::new());
        assert_eq!(ExtractOptions::default().resolve_scale(&doc), 1.0);
    }

    #[test]
    fn malformed_input_is_an_error() {
        let err = extract_dxf("0\nSECTION\n2\n", &ExtractOptions::default(), &GeometrySettings::default())
            .unwrap_err();
        assert!(err.is_input_format());
    }
}
