//! End-to-end conversion: drawing file in, shape files out.
//!
//! ```text
//! extract (DXF | SVG) -> assemble -> [select + transform] -> rasterize -> write
//! ```
//!
//! Every request runs single-threaded against its own
//! [`ConversionContext`]. Nothing is written until all pieces of a request
//! have been rendered, and nothing outside the context's output directory
//! is touched.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::assemble::{Piece, assemble};
use crate::config::KnitConfig;
use crate::dxf::{ExtractOptions, LayerFilter, extract_dxf};
use crate::error::ConvertError;
use crate::preview::{preview_svg, write_preview};
use crate::raster::{Gauge, rasterize};
use crate::shapefile::{ShapeFile, file_stem};
use crate::svg::extract_svg;
use crate::transform::{PieceTransform, select_piece};

/// Input format, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Dxf,
    Svg,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Result<Self, ConvertError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("dxf") => Ok(SourceFormat::Dxf),
            Some("svg") => Ok(SourceFormat::Svg),
            _ => Err(ConvertError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }
}

/// Request-scoped state: where this request's files go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionContext {
    pub output_dir: PathBuf,
}

impl ConversionContext {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// A context isolated under `base/<session>`.
    pub fn for_session(base: impl AsRef<Path>, session: &str) -> Self {
        Self::new(base.as_ref().join(session))
    }

    pub fn path_for(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }

    fn ensure_dir(&self) -> Result<(), ConvertError> {
        fs::create_dir_all(&self.output_dir).map_err(|e| ConvertError::io(&self.output_dir, e))
    }
}

/// Listing entry for a piece.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieceSummary {
    /// 1-based, as accepted by single-piece conversion
    pub index: usize,
    pub name: String,
    pub source: String,
    pub polygons: usize,
    pub holes: usize,
    /// `[min_x, min_y, max_x, max_y]` in mm
    pub bounds: Option<[f64; 4]>,
    /// mm²
    pub area: f64,
}

impl PieceSummary {
    pub fn new(index: usize, piece: &Piece) -> Self {
        Self {
            index,
            name: piece.name.clone(),
            source: piece.source.clone(),
            polygons: piece.shape.polygons.len(),
            holes: piece.shape.hole_count(),
            bounds: piece.shape.bounding_box().map(|(a, b, c, d)| [a, b, c, d]),
            area: piece.shape.area(),
        }
    }
}

/// Files produced by a single-piece conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConvertedPiece {
    pub shape_file: PathBuf,
    pub preview: Option<PathBuf>,
}

/// Settings plus input options shared by every entry point.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    pub config: KnitConfig,
    pub extract: ExtractOptions,
}

impl Pipeline {
    pub fn new(config: KnitConfig) -> Self {
        Self {
            config,
            extract: ExtractOptions::default(),
        }
    }

    /// Only keep fragments whose layer or piece name is listed.
    pub fn with_layers<I, S>(mut self, layers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extract.layers = LayerFilter::new(layers);
        self
    }

    /// Millimeters per DXF drawing unit.
    pub fn with_unit_scale(mut self, unit_scale: Option<f64>) -> Self {
        self.extract.unit_scale = unit_scale;
        self
    }

    /// Extract and assemble the named pieces of a drawing, in mm.
    pub fn list_pieces(&self, path: &Path) -> Result<Vec<Piece>, ConvertError> {
        if let Some(scale) = self.extract.unit_scale {
            if !(scale.is_finite() && scale > 0.0) {
                return Err(ConvertError::InvalidUnitScale { value: scale });
            }
        }

        let format = SourceFormat::from_path(path)?;
        let bytes = fs::read(path).map_err(|e| ConvertError::io(path, e))?;
        // Older DXF exports are often Latin-1; group codes are ASCII either way
        let content = String::from_utf8_lossy(&bytes);

        let geometry = &self.config.geometry;
        let fragments = match format {
            SourceFormat::Dxf => extract_dxf(&content, &self.extract, geometry)?,
            SourceFormat::Svg => {
                let stem = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "piece".to_string());
                let fragments = extract_svg(&content, &stem, geometry)?;
                // The layer filter still applies to the one piece name
                fragments
                    .into_iter()
                    .filter(|f| self.extract.layers.matches(&f.source, &f.name))
                    .collect()
            }
        };

        let raw = fragments.len();
        let pieces = assemble(fragments, self.config.geometry.heal_tolerance);
        info!(
            file = %path.display(),
            fragments = raw,
            pieces = pieces.len(),
            "grouped outlines into pieces"
        );
        Ok(pieces)
    }

    /// Summaries for listing.
    pub fn summarize(&self, path: &Path) -> Result<Vec<PieceSummary>, ConvertError> {
        Ok(self
            .list_pieces(path)?
            .iter()
            .enumerate()
            .map(|(i, p)| PieceSummary::new(i + 1, p))
            .collect())
    }

    /// One shape file per piece, named `<index>_<name>.txt`.
    ///
    /// A drawing with no recoverable outline produces no files and no
    /// error.
    pub fn convert_all(
        &self,
        path: &Path,
        gauge: &Gauge,
        ctx: &ConversionContext,
    ) -> Result<Vec<PathBuf>, ConvertError> {
        let pieces = self.list_pieces(path)?;
        if pieces.is_empty() {
            warn!(file = %path.display(), "no shapes found");
            return Ok(Vec::new());
        }

        let rendered = pieces
            .iter()
            .enumerate()
            .map(|(i, piece)| {
                let grid = rasterize(&piece.shape, gauge);
                let text = ShapeFile::new(&piece.name, &grid, *gauge)
                    .with_yarn_symbol(self.config.output.yarn_symbol)?
                    .render();
                Ok((ctx.path_for(&format!("{}.txt", file_stem(i + 1, &piece.name))), text))
            })
            .collect::<Result<Vec<(PathBuf, String)>, ConvertError>>()?;

        ctx.ensure_dir()?;
        let mut written = Vec::with_capacity(rendered.len());
        for (target, text) in rendered {
            fs::write(&target, text).map_err(|e| ConvertError::io(&target, e))?;
            written.push(target);
        }
        info!(files = written.len(), dir = %ctx.output_dir.display(), "wrote shape files");
        Ok(written)
    }

    /// Select piece `index` (1-based) and apply the transform.
    pub fn final_outline(
        &self,
        path: &Path,
        index: usize,
        transform: &PieceTransform,
    ) -> Result<Piece, ConvertError> {
        let pieces = self.list_pieces(path)?;
        let selected = select_piece(&pieces, index)?;
        Ok(Piece {
            name: selected.name.clone(),
            source: selected.source.clone(),
            shape: transform.apply(&selected.shape, self.config.geometry.heal_tolerance),
        })
    }

    /// Convert one transformed piece, plus an SVG preview when
    /// `output.write_preview` is set.
    pub fn convert_one(
        &self,
        path: &Path,
        gauge: &Gauge,
        index: usize,
        transform: &PieceTransform,
        ctx: &ConversionContext,
    ) -> Result<ConvertedPiece, ConvertError> {
        let piece = self.final_outline(path, index, transform)?;
        let stem = file_stem(index, &piece.name);

        let grid = rasterize(&piece.shape, gauge);
        let file = ShapeFile::new(&piece.name, &grid, *gauge)
            .with_yarn_symbol(self.config.output.yarn_symbol)?;

        ctx.ensure_dir()?;
        let shape_file = ctx.path_for(&format!("{stem}.txt"));
        file.write_to(&shape_file)?;

        let preview = if self.config.output.write_preview {
            let target = ctx.path_for(&format!("{stem}.svg"));
            write_preview(&piece.shape, &piece.name, &target)?;
            Some(target)
        } else {
            None
        };

        info!(piece = %piece.name, file = %shape_file.display(), "wrote shape file");
        Ok(ConvertedPiece {
            shape_file,
            preview,
        })
    }

    /// SVG preview of the transformed piece, returned rather than written.
    pub fn preview(
        &self,
        path: &Path,
        index: usize,
        transform: &PieceTransform,
    ) -> Result<String, ConvertError> {
        let piece = self.final_outline(path, index, transform)?;
        Ok(preview_svg(&piece.shape, &piece.name))
    }
}

// ============================================================================
// TESTS
// ============================================================================
