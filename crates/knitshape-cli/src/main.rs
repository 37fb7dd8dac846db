//! knitshape CLI: garment outlines to DAK shape files.
//!
//! Usage:
//!   knitshape list <file> [--layer L]... [--unit-scale S] [--json]
//!   knitshape convert <file> --sts10 N --rows10 N [-o DIR]
//!   knitshape piece <file> --sts10 N --rows10 N --index I [--rotate DEG] [--mirror M] [--preview]
//!   knitshape preview <file> --index I [--rotate DEG] [--mirror M] [-o FILE]
//!
//! Logs go to stderr; stdout carries only listings, file paths and JSON.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Error;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};

use knitshape::{ConfigError, ConvertError, KnitConfig};

mod cli;

use cli::common::Globals;

/// Exit status for each failure class.
const EXIT_OTHER: u8 = 1;
const EXIT_INPUT_FORMAT: u8 = 2;
const EXIT_NOT_FOUND: u8 = 3;
const EXIT_CONFIG: u8 = 4;

#[derive(Parser)]
#[command(name = "knitshape", version, about = "Convert garment outlines to knitting shape files")]
struct Cli {
    /// Settings file (default: $KNITSHAPE_CONFIG, then ./knitshape.toml)
    #[arg(long, global = true, value_name = "TOML")]
    config: Option<PathBuf>,

    /// Write output under DIR/<ID>
    #[arg(long, global = true, value_name = "ID", conflicts_with = "isolate")]
    session: Option<String>,

    /// Write output under DIR/<fresh uuid>
    #[arg(long, global = true)]
    isolate: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the pieces found in a drawing
    List(cli::list::ListArgs),
    /// Convert every piece to a shape file
    Convert(cli::convert::ConvertArgs),
    /// Convert one piece after rotating and mirroring it
    Piece(cli::piece::PieceArgs),
    /// Draw the final outline of one piece as SVG or PNG
    Preview(cli::preview::PreviewArgs),
}

fn main() -> ExitCode {
    // ## Rust Lesson #41: Owning the Exit Status
    //
    // clap exits with status 2 on bad usage, which here already means
    // "unreadable drawing". Parsing with try_parse keeps the decision ours.
    let args = match Cli::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(EXIT_CONFIG)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let config = KnitConfig::discover(args.config.as_deref());
    init_logging(config.as_ref().ok());

    match config.map_err(Error::from).and_then(|config| run(args, config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}

fn run(args: Cli, config: KnitConfig) -> anyhow::Result<()> {
    let globals = Globals {
        session: args.session,
        isolate: args.isolate,
    };
    match args.command {
        Command::List(cmd) => cli::cmd_list(cmd, config),
        Command::Convert(cmd) => cli::cmd_convert(cmd, config, &globals),
        Command::Piece(cmd) => cli::cmd_piece(cmd, config, &globals),
        Command::Preview(cmd) => cli::cmd_preview(cmd, config),
    }
}

/// `RUST_LOG` wins, then the settings file's level, then `info`.
fn init_logging(config: Option<&KnitConfig>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        config
            .and_then(|c| EnvFilter::try_new(&c.logging.level).ok())
            .unwrap_or_else(|| EnvFilter::new("info"))
    });
    let subscriber = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    // A second init only happens under test harnesses
    let _ = subscriber.try_init();
}

/// Map the first library error in the chain to its exit status.
fn exit_code(err: &Error) -> u8 {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<ConvertError>() {
            return if e.is_input_format() {
                EXIT_INPUT_FORMAT
            } else if e.is_not_found() {
                EXIT_NOT_FOUND
            } else if e.is_invalid_parameter() {
                EXIT_CONFIG
            } else {
                EXIT_OTHER
            };
        }
        if cause.downcast_ref::<ConfigError>().is_some() {
            return EXIT_CONFIG;
        }
    }
    EXIT_OTHER
}

// ============================================================================
// TESTS
// ============================================================================
