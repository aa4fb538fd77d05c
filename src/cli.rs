use clap::Parser;
use std::path::PathBuf;

/// Rewrites the editor modeline block at the end of a source file.
///
/// Any existing `clang-format off` / modelines / `clang-format on` block is
/// removed together with stray `// vim`, `// kate` and `// modelines` lines,
/// and the current block is appended.
#[derive(Parser, Debug)]
#[command(
    name = "update-modelines",
    author,
    version,
    about = "Rewrite the editor modeline block at the end of a source file",
    long_about = "update-modelines - Replace the clang-format guarded modeline block of one file.

The old block (and any stray vim/kate/modelines comment lines) is removed and a
fresh block is appended. Run it once per file; batching is left to the caller.

EXAMPLES:
  update-modelines src/common/tags.c
  update-modelines --dry-run src/iop/sigmoid.c
  update-modelines -c modelines.yaml --backup src/views/map.c
  find src -name '*.c' -exec update-modelines {} \\;"
)]
pub struct Args {
    /// The file to rewrite.
    pub path: PathBuf,

    /// Path to a YAML file overriding the markers and modeline text.
    #[arg(short, long, env = "UPDATE_MODELINES_CONFIG")]
    pub config: Option<PathBuf>,

    /// Copy the original file to `<path>.bak` before rewriting it.
    #[arg(long)]
    pub backup: bool,

    /// Report whether the file would change without writing it.
    #[arg(long)]
    pub dry_run: bool,

    /// Print debug logging to stderr.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Parses command-line arguments and returns the populated `Args` struct.
pub fn parse_args() -> Args {
    Args::parse()
}
