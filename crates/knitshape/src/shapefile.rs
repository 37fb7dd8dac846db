//! DAK shape-file writer.
//!
//! The format is plain text: a fixed header with the piece's size and
//! gauge, then the stitch grid twice. Once as yarn digits and once as
//! stitch symbols. The blank lines between blocks are part of the format.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::ConvertError;
use crate::raster::{Gauge, StitchGrid, StitchRun};

/// Yarn index written for every knitted stitch unless configured.
pub const DEFAULT_YARN_SYMBOL: u8 = 4;

const STITCH_SYMBOL: char = '-';

/// File-name root for a piece: spaces and path separators become
/// underscores, so every piece lands directly in the output directory.
pub fn filename_root(piece_name: &str) -> String {
    piece_name
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '_',
            other => other,
        })
        .collect()
}

/// `<index>_<root>` without extension.
pub fn file_stem(index: usize, piece_name: &str) -> String {
    format!("{index}_{}", filename_root(piece_name))
}

/// Everything that goes into one shape file.
#[derive(Debug, Clone)]
pub struct ShapeFile<'a> {
    pub piece_name: &'a str,
    pub grid: &'a StitchGrid,
    pub gauge: Gauge,
    yarn: char,
}

impl<'a> ShapeFile<'a> {
    pub fn new(piece_name: &'a str, grid: &'a StitchGrid, gauge: Gauge) -> Self {
        Self {
            piece_name,
            grid,
            gauge,
            yarn: char::from(b'0' + DEFAULT_YARN_SYMBOL),
        }
    }

    /// Use yarn `1`..=`9` for knitted stitches.
    pub fn with_yarn_symbol(mut self, yarn_symbol: u8) -> Result<Self, ConvertError> {
        if !(1..=9).contains(&yarn_symbol) {
            return Err(ConvertError::InvalidYarnSymbol { value: yarn_symbol });
        }
        self.yarn = char::from(b'0' + yarn_symbol);
        Ok(self)
    }

    /// Digit written in the YARNS block.
    pub fn yarn_symbol(&self) -> char {
        self.yarn
    }

    /// The full file contents.
    pub fn render(&self) -> String {
        let width = self.grid.width();
        let mut out = String::new();

        // ## Rust Lesson #40: fmt::Write
        //
        // `writeln!` works on a String as well as a file. Writing into a
        // String can't fail, so the Results are discarded with `let _`.
        let _ = write!(
            out,
            "FILE FORMAT : DAK\n\
             FILE FORMAT VERSION : 0.43\n\
             GARMENT PIECE\n\
             Shape filename : {root}\n\
             Piece : {name}\n\
             Stitches : {width}\n\
             Rows : {rows}\n\
             RIB DIMENSIONS\n\
             Stitches : 0\n\
             Rows : 0\n\
             RIB TENSIONS\n\
             Stitches per 10 cm =  0\n\
             Rows per 10 cm =  0\n\
             MAIN TENSIONS\n\
             Stitches per 10 cm =  {sts10}\n\
             Rows per 10 cm =  {rows10}\n\
             YARNS\n",
            root = filename_root(self.piece_name),
            name = self.piece_name,
            rows = self.grid.row_count(),
            sts10 = self.gauge.sts10.trunc() as i64,
            rows10 = self.gauge.rows10.trunc() as i64,
        );
        for runs in &self.grid.rows {
            let _ = writeln!(out, "{}", render_row(runs, width, self.yarn));
        }
        out.push_str("\nYARN PALETTE\nYarn L : 112,180,249 light blue\n");
        out.push_str("\nSTITCH SYMBOLS\n");
        for runs in &self.grid.rows {
            let _ = writeln!(out, "{}", render_row(runs, width, STITCH_SYMBOL));
        }
        out.push_str("\nSTITCH PATTERN NOTES\nSHAPE FILE NOTES\nEND\n");
        out
    }

    /// Render and write to `path`.
    pub fn write_to(&self, path: &Path) -> Result<(), ConvertError> {
        fs::write(path, self.render()).map_err(|e| ConvertError::io(path, e))?;
        debug!(path = %path.display(), "wrote shape file");
        Ok(())
    }
}

/// One row of `width` characters: `symbol` under each run, blanks elsewhere.
pub fn render_row(runs: &[StitchRun], width: usize, symbol: char) -> String {
    let mut line = vec![' '; width];
    for run in runs {
        for cell in line.iter_mut().take(run.end()).skip(run.indent) {
            *cell = symbol;
        }
    }
    line.into_iter().collect()
}

// ============================================================================
// TESTS
// ============================================================================
