//! List command implementation.

use anyhow::{Context, Result};
use clap::Args;

use knitshape::{KnitConfig, PieceSummary};

use super::common::{InputArgs, print_json};

#[derive(Args, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Print the listing as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn cmd_list(args: ListArgs, config: KnitConfig) -> Result<()> {
    let file = &args.input.file;
    let pieces = args
        .input
        .pipeline(config)
        .summarize(file)
        .with_context(|| format!("listing pieces in {}", file.display()))?;

    if args.json {
        return print_json(&pieces);
    }

    if pieces.is_empty() {
        eprintln!("No shapes found in {}", file.display());
    }
    for piece in &pieces {
        println!("{}", summary_line(piece));
    }
    Ok(())
}

/// `  1  Left Front  250.0 x 600.0 mm  1 polygon, 0 holes  [CUT]`
fn summary_line(piece: &PieceSummary) -> String {
    let (width, height) = piece
        .bounds
        .map(|[x0, y0, x1, y1]| (x1 - x0, y1 - y0))
        .unwrap_or((0.0, 0.0));
    format!(
        "{:>3}  {}  {:.1} x {:.1} mm  {} {}, {} {}  [{}]",
        piece.index,
        piece.name,
        width,
        height,
        piece.polygons,
        plural(piece.polygons, "polygon", "polygons"),
        piece.holes,
        plural(piece.holes, "hole", "holes"),
        piece.source,
    )
}

fn plural(n: usize, one: &'static str, many: &'static str) -> &'static str {
    if n == 1 { one } else { many }
}

// ============================================================================
// TESTS
// ============================================================================
