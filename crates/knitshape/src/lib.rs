//! # knitshape
//!
//! Garment outlines from DXF and SVG drawings, rasterized into stitch
//! grids and written as DAK shape files for knitting machines.
//!
//! ## Pipeline
//!
//! 1. [`dxf`] / [`svg`] recover healed outline fragments, in mm
//! 2. [`assemble`] groups fragments into named pieces
//! 3. [`transform`] rotates and mirrors a selected piece
//! 4. [`raster`] scans a piece into rows of stitch runs
//! 5. [`shapefile`] writes the grid; [`preview`] draws the outline
//!
//! [`pipeline::Pipeline`] strings these together.

pub mod assemble;
pub mod chain;
pub mod clip;
pub mod config;
pub mod dxf;
pub mod error;
pub mod geometry;
pub mod heal;
pub mod pipeline;
pub mod preview;
pub mod raster;
pub mod shapefile;
pub mod svg;
pub mod transform;
pub mod units;

// Re-export common types at crate root for convenience.
pub use assemble::{Piece, RawFragment, assemble};
pub use config::{ConfigError, KnitConfig};
pub use dxf::{DxfDocument, ExtractOptions, LayerFilter};
pub use error::ConvertError;
pub use geometry::{Line, Point, Polygon, Shape};
pub use pipeline::{ConversionContext, ConvertedPiece, Pipeline, PieceSummary, SourceFormat};
pub use preview::{preview_svg, write_preview};
pub use raster::{Gauge, RowScanner, StitchGrid, StitchRun, rasterize, scan_rows};
pub use shapefile::ShapeFile;
pub use transform::{MirrorMode, PieceTransform};
