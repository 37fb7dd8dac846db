//! Convert command implementation.

use anyhow::{Context, Result};
use clap::Args;

use knitshape::KnitConfig;

use super::common::{GaugeArgs, Globals, InputArgs, OutputArgs, print_json};

#[derive(Args, Debug)]
pub struct ConvertArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub gauge: GaugeArgs,

    #[command(flatten)]
    pub output: OutputArgs,

    /// Print the written paths as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn cmd_convert(args: ConvertArgs, config: KnitConfig, globals: &Globals) -> Result<()> {
    let gauge = args.gauge.resolve(&config)?;
    let ctx = args.output.context(globals);
    let file = &args.input.file;

    let written = args
        .input
        .pipeline(config)
        .convert_all(file, &gauge, &ctx)
        .with_context(|| format!("converting {}", file.display()))?;

    if args.json {
        return print_json(&written);
    }
    if written.is_empty() {
        eprintln!("No shapes found in {}", file.display());
    }
    for path in &written {
        println!("{}", path.display());
    }
    Ok(())
}
