//! Piece command implementation.

use anyhow::{Context, Result};
use clap::Args;

use knitshape::KnitConfig;

use super::common::{GaugeArgs, Globals, InputArgs, OutputArgs, TransformArgs, print_json};

#[derive(Args, Debug)]
pub struct PieceArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub gauge: GaugeArgs,

    #[command(flatten)]
    pub transform: TransformArgs,

    #[command(flatten)]
    pub output: OutputArgs,

    /// Also write an SVG preview next to the shape file
    #[arg(long)]
    pub preview: bool,

    /// Print the written paths as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn cmd_piece(args: PieceArgs, mut config: KnitConfig, globals: &Globals) -> Result<()> {
    let gauge = args.gauge.resolve(&config)?;
    let transform = args.transform.transform()?;
    if args.preview {
        config.output.write_preview = true;
    }
    let ctx = args.output.context(globals);
    let file = &args.input.file;

    let converted = args
        .input
        .pipeline(config)
        .convert_one(file, &gauge, args.transform.index, &transform, &ctx)
        .with_context(|| format!("converting piece {} of {}", args.transform.index, file.display()))?;

    if args.json {
        return print_json(&converted);
    }
    println!("{}", converted.shape_file.display());
    if let Some(preview) = &converted.preview {
        println!("{}", preview.display());
    }
    Ok(())
}
