//! `update_modelines` rewrites the editor modeline block at the end of a source file.
//!
//! It provides the core logic for the `update-modelines` command-line tool but can
//! also be used as a library. The main components are:
//!
//! - `scanner`: A four-state line scanner that locates the existing
//!   `clang-format off` / modelines / `clang-format on` block.
//! - `Rewriter`: Drops the old block and stray modeline comments, appends the
//!   current block and writes the file back atomically.
//! - `config`: The marker and modeline text, overridable from a YAML file.
//!
//! The tool handles exactly one file per run; walking a source tree is left to
//! whatever script invokes it.

pub mod cli;
pub mod config;
pub mod errors;
pub mod logging;
pub mod rewriter;
pub mod scanner;

// Re-export main types for easier access by library users.
pub use config::ModelineConfig;
pub use errors::{Error, Result};
pub use rewriter::Rewriter;
pub use scanner::{BlockRange, BlockScanner};
