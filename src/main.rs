//! The main entry point for the `update-modelines` command-line application.
//!
//! This file is responsible for parsing command-line arguments and handing the
//! single target file to the `update_modelines` library.

use anyhow::Context;
use std::env;
use std::process;
use update_modelines::{cli, logging, rewriter};

fn main() -> anyhow::Result<()> {
    // No file given at all: show how the tool is meant to be driven
    if env::args_os().len() == 1 {
        eprintln!("Error: Missing required argument: <PATH>\n");
        eprintln!("USAGE EXAMPLES:");
        eprintln!("  update-modelines src/common/tags.c           # Rewrite one file");
        eprintln!("  update-modelines --dry-run src/iop/dither.c  # Preview only");
        eprintln!("  find src -name '*.c' -exec update-modelines {{}} \\;");
        eprintln!("\nFor more options: update-modelines --help");
        process::exit(1);
    }

    let args = cli::parse_args();

    if let Err(e) = logging::init(args.verbose) {
        eprintln!("Warning: could not initialise logging: {e}");
    }

    let path = args.path.clone();
    rewriter::run_update(args.path, args.config, args.backup, args.dry_run)
        .with_context(|| format!("failed to update modelines in {}", path.display()))
}
