//! Preview command implementation.
//!
//! Writes the final outline of one piece as SVG, or rasterizes it to PNG
//! with resvg when the output file ends in `.png`. Without `-o` the SVG
//! goes to stdout.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use clap::Args;
use resvg::usvg;
use tiny_skia::Pixmap;
use tracing::info;

use knitshape::KnitConfig;

use super::common::{InputArgs, TransformArgs};

#[derive(Args, Debug)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub transform: TransformArgs,

    /// Output file (.svg or .png); stdout when omitted
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<std::path::PathBuf>,

    /// PNG pixels per SVG pixel (96 per inch)
    #[arg(long, value_name = "N", default_value_t = 2.0)]
    pub png_scale: f32,
}

pub fn cmd_preview(args: PreviewArgs, config: KnitConfig) -> Result<()> {
    let transform = args.transform.transform()?;
    let file = &args.input.file;
    let svg = args
        .input
        .pipeline(config)
        .preview(file, args.transform.index, &transform)
        .with_context(|| format!("previewing piece {} of {}", args.transform.index, file.display()))?;

    let Some(output) = &args.output else {
        print!("{svg}");
        return Ok(());
    };

    let is_png = output
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("png"));
    if is_png {
        let (width, height) = render_png(&svg, output, args.png_scale)?;
        info!(path = %output.display(), width, height, "wrote PNG preview");
    } else {
        fs::write(output, &svg).with_context(|| format!("writing {}", output.display()))?;
        info!(path = %output.display(), "wrote SVG preview");
    }
    println!("{}", output.display());
    Ok(())
}

/// Rasterize an SVG document onto a white background.
fn render_png(svg: &str, path: &Path, scale: f32) -> Result<(u32, u32)> {
    if !(scale.is_finite() && scale > 0.0) {
        return Err(anyhow!("--png-scale must be a positive number, got {scale}"));
    }

    let options = usvg::Options::default();
    let tree = usvg::Tree::from_str(svg, &options).context("parsing generated preview")?;

    let size = tree.size();
    let width = ((size.width() * scale).ceil() as u32).max(1);
    let height = ((size.height() * scale).ceil() as u32).max(1);
    let mut pixmap = Pixmap::new(width, height)
        .with_context(|| format!("cannot allocate a {width}x{height} image"))?;

    pixmap.fill(tiny_skia::Color::WHITE);
    resvg::render(&tree, tiny_skia::Transform::from_scale(scale, scale), &mut pixmap.as_mut());

    pixmap
        .save_png(path)
        .map_err(|e| anyhow!("writing {}: {e}", path.display()))?;
    Ok((width, height))
}

// ============================================================================
// TESTS
// ============================================================================
