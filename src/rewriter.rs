use crate::config::{ConfigLoader, ModelineConfig};
use crate::errors::Result;
use crate::scanner::{BlockRange, find_block};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Core engine that strips old modelines from a file and appends the current block.
pub struct Rewriter {
    config: ModelineConfig,
}

/// Options for processing a file.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessOptions {
    /// If `true`, a `.bak` file will be created before modifying a file.
    pub create_backup: bool,
    /// If `true`, changes will be calculated but not written to disk.
    pub dry_run: bool,
}

/// The outcome of rewriting some content in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    /// The rewritten content, ending with the modeline block.
    pub content: String,
    /// The old block that was removed, if one was found.
    pub removed_block: Option<BlockRange>,
    /// Modeline-looking lines dropped outside the old block.
    pub stray_lines: usize,
    /// `true` if `content` differs from the input.
    pub changed: bool,
}

/// The result of processing a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessResult {
    /// The old block that was removed, if one was found.
    pub removed_block: Option<BlockRange>,
    /// Modeline-looking lines dropped outside the old block.
    pub stray_lines: usize,
    /// `true` if the file was (or, in a dry run, would be) modified.
    pub modified: bool,
}

impl Default for Rewriter {
    fn default() -> Self {
        Self::new(ModelineConfig::default())
    }
}

impl Rewriter {
    pub fn new(config: ModelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ModelineConfig {
        &self.config
    }

    /// Rewrites `content` without touching the file system.
    ///
    /// Lines inside the first modeline block are removed, as is every line anywhere
    /// in the content that starts with one of the stray prefixes. The fresh block is
    /// then appended. Fails before producing anything if the old block is incomplete.
    pub fn rewrite(&self, content: &str) -> Result<Rewrite> {
        let lines: Vec<&str> = content.split_inclusive('\n').collect();
        let removed_block = find_block(&self.config, lines.iter().copied())?;

        let mut new_content = String::with_capacity(content.len() + 256);
        let mut stray_lines = 0;

        for (index, line) in lines.iter().enumerate() {
            if removed_block.is_some_and(|block| block.contains(index)) {
                continue;
            }
            if self.is_stray(line) {
                stray_lines += 1;
                continue;
            }
            new_content.push_str(line);
        }

        let newline = line_ending(&lines);
        if !new_content.is_empty() && !new_content.ends_with('\n') {
            new_content.push_str(newline);
        }
        let block = self.config.block();
        if newline == "\n" {
            new_content.push_str(&block);
        } else {
            new_content.push_str(&block.replace('\n', newline));
        }

        let changed = new_content != content;
        Ok(Rewrite {
            content: new_content,
            removed_block,
            stray_lines,
            changed,
        })
    }

    /// Processes a single file in place.
    ///
    /// The three progress lines are printed to stdout as each phase starts. The file
    /// is only opened for writing after the whole content has been rewritten in
    /// memory, and the new content replaces it atomically.
    pub fn process_file(&self, path: &Path, options: ProcessOptions) -> Result<ProcessResult> {
        println!("parsing {}", path.display());
        let content = fs::read_to_string(path)?;
        let rewrite = self.rewrite(&content)?;

        match rewrite.removed_block {
            Some(block) => debug!(
                begin = block.begin,
                end = block.end,
                lines = block.line_count(),
                "found existing modeline block"
            ),
            None => debug!("no existing modeline block"),
        }
        if rewrite.stray_lines > 0 {
            info!(count = rewrite.stray_lines, "dropping stray modeline lines");
        }

        println!("removing old modelines");
        println!("adding new modelines");

        if rewrite.changed && !options.dry_run {
            if options.create_backup {
                let backup_path = format!("{}.bak", path.display());
                fs::copy(path, &backup_path)?;
                debug!(backup = %backup_path, "wrote backup");
            }
            write_atomically(path, &rewrite.content)?;
        } else if !rewrite.changed {
            debug!(path = %path.display(), "modelines already up to date");
        }

        Ok(ProcessResult {
            removed_block: rewrite.removed_block,
            stray_lines: rewrite.stray_lines,
            modified: rewrite.changed,
        })
    }

    fn is_stray(&self, line: &str) -> bool {
        self.config
            .stray_prefixes
            .iter()
            .any(|prefix| line.starts_with(prefix.as_str()))
    }
}

/// Terminator of the first terminated line; `\n` when there is none.
fn line_ending(lines: &[&str]) -> &'static str {
    match lines.iter().find(|line| line.ends_with('\n')) {
        Some(line) if line.ends_with("\r\n") => "\r\n",
        _ => "\n",
    }
}

/// Replaces the file behind `path` with `content` through a temporary file next to it.
///
/// Symlinks are resolved first so the link stays a link and its target is updated.
fn write_atomically(path: &Path, content: &str) -> Result<()> {
    let target = fs::canonicalize(path)?;
    let parent = target.parent().unwrap_or_else(|| Path::new("."));

    let mut temp_file = NamedTempFile::new_in(parent)?;
    temp_file.write_all(content.as_bytes())?;

    // Preserve file permissions
    let perms = fs::metadata(&target)?.permissions();
    fs::set_permissions(temp_file.path(), perms)?;

    temp_file.persist(&target)?;
    Ok(())
}

/// The main entry point for updating one file.
///
/// Loads the configuration (if any), then rewrites `path`.
pub fn run_update(
    path: PathBuf,
    config_file: Option<PathBuf>,
    backup: bool,
    dry_run: bool,
) -> Result<()> {
    let config = match config_file {
        Some(cfg_path) => {
            let target_dir = path.parent().unwrap_or_else(|| Path::new("."));
            let resolved_path = ConfigLoader::find_config(&cfg_path, target_dir)?;
            info!(config = %resolved_path.display(), "using config file");
            ConfigLoader::load_modeline_config(&resolved_path)?
        }
        None => ModelineConfig::default(),
    };

    let rewriter = Rewriter::new(config);
    let options = ProcessOptions {
        create_backup: backup,
        dry_run,
    };

    let result = rewriter.process_file(&path, options)?;

    if dry_run {
        if result.modified {
            println!("DRY {} would change", path.display());
        } else {
            println!("DRY {} unchanged", path.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;
    use tempfile::TempDir;

    fn block() -> String {
        ModelineConfig::default().block()
    }

    #[test]
    fn test_no_block_appends_block() {
        let rewrite = Rewriter::default().rewrite("a\nb\n").unwrap();
        assert_eq!(rewrite.content, format!("a\nb\n{}", block()));
        assert_eq!(rewrite.removed_block, None);
        assert!(rewrite.changed);
    }

    #[test]
    fn test_round_trip_lines() {
        let rewrite = Rewriter::default().rewrite("a\nb\n").unwrap();
        let lines: Vec<&str> = rewrite.content.split_inclusive('\n').collect();
        assert_eq!(lines.len(), 8);
        assert_eq!(lines[0], "a\n");
        assert_eq!(lines[1], "b\n");
        assert_eq!(lines[2], "// clang-format off\n");
        assert!(lines[3].starts_with("// modelines: "));
        assert!(lines[4].starts_with("// vim: "));
        assert!(lines[5].starts_with("// kate: "));
        assert_eq!(lines[6], "// clang-format on\n");
        assert_eq!(lines[7], "\n");
    }

    #[test]
    fn test_existing_block_is_replaced() {
        let input = "// clang-format off\n\
// modelines: old note\n\
x\n\
// clang-format on\n\
\n\
y\n";
        let rewrite = Rewriter::default().rewrite(input).unwrap();
        assert_eq!(rewrite.content, format!("y\n{}", block()));
        assert_eq!(rewrite.removed_block, Some(BlockRange { begin: 0, end: 4 }));
    }

    #[test]
    fn test_idempotent() {
        let rewriter = Rewriter::default();
        let first = rewriter
            .rewrite("int main() {}\n// vim: ts=8\n")
            .unwrap();
        let second = rewriter.rewrite(&first.content).unwrap();
        assert_eq!(first.content, second.content);
        assert!(!second.changed);
    }

    #[test]
    fn test_stray_lines_removed_outside_block() {
        let input = "int a;\n// vim: set ts=4:\n// kate: indent-width 4;\n// modelines stale\nint b;\n";
        let rewrite = Rewriter::default().rewrite(input).unwrap();
        assert_eq!(rewrite.content, format!("int a;\nint b;\n{}", block()));
        assert_eq!(rewrite.stray_lines, 3);
    }

    #[test]
    fn test_indented_modeline_is_kept() {
        let input = "  // vim is great\n";
        let rewrite = Rewriter::default().rewrite(input).unwrap();
        assert!(rewrite.content.starts_with("  // vim is great\n"));
    }

    #[test]
    fn test_missing_final_newline() {
        let rewrite = Rewriter::default().rewrite("int a;").unwrap();
        assert_eq!(rewrite.content, format!("int a;\n{}", block()));
    }

    #[test]
    fn test_empty_input() {
        let rewrite = Rewriter::default().rewrite("").unwrap();
        assert_eq!(rewrite.content, block());
    }

    #[test]
    fn test_second_block_only_loses_stray_lines() {
        let input = "// clang-format off\n\
// modelines: first\n\
// clang-format on\n\
code\n\
// clang-format off\n\
// modelines: second\n\
// clang-format on\n";
        let rewrite = Rewriter::default().rewrite(input).unwrap();
        assert_eq!(
            rewrite.content,
            format!("code\n// clang-format off\n// clang-format on\n{}", block())
        );
    }

    #[test]
    fn test_process_file_rewrites_in_place() {
        let temp_dir = TempDir::new().unwrap();
        let test_file = temp_dir.path().join("test.c");
        fs::write(&test_file, "a\nb\n").unwrap();

        let result = Rewriter::default()
            .process_file(&test_file, ProcessOptions::default())
            .unwrap();

        assert!(result.modified);
        assert_eq!(fs::read_to_string(&test_file).unwrap(), format!("a\nb\n{}", block()));
        assert!(!temp_dir.path().join("test.c.bak").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_process_file_writes_through_symlink() {
        let temp_dir = TempDir::new().unwrap();
        let real = temp_dir.path().join("real.c");
        let link = temp_dir.path().join("link.c");
        fs::write(&real, "a\n").unwrap();
        std::os::unix::fs::symlink(&real, &link).unwrap();

        Rewriter::default()
            .process_file(&link, ProcessOptions::default())
            .unwrap();

        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_to_string(&real).unwrap(), format!("a\n{}", block()));
    }

    #[test]
    fn test_crlf_input_gets_crlf_block() {
        let rewriter = Rewriter::default();
        let first = rewriter.rewrite("a\r\nb").unwrap();
        assert_eq!(
            first.content,
            format!("a\r\nb\r\n{}", block().replace('\n', "\r\n"))
        );
        assert!(!first.content.replace("\r\n", "").contains('\n'));

        let second = rewriter.rewrite(&first.content).unwrap();
        assert_eq!(second.content, first.content);
        assert!(!second.changed);
    }

    #[test]
    fn test_process_file_with_backup() {
        let temp_dir = TempDir::new().unwrap();
        let test_file = temp_dir.path().join("test.c");
        fs::write(&test_file, "a\n").unwrap();

        let options = ProcessOptions {
            create_backup: true,
            dry_run: false,
        };
        Rewriter::default().process_file(&test_file, options).unwrap();

        let backup = temp_dir.path().join("test.c.bak");
        assert_eq!(fs::read_to_string(backup).unwrap(), "a\n");
    }

    #[test]
    fn test_dry_run_leaves_file_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let test_file = temp_dir.path().join("test.c");
        fs::write(&test_file, "a\n").unwrap();

        let options = ProcessOptions {
            create_backup: true,
            dry_run: true,
        };
        let result = Rewriter::default().process_file(&test_file, options).unwrap();

        assert!(result.modified);
        assert_eq!(fs::read_to_string(&test_file).unwrap(), "a\n");
        assert!(!temp_dir.path().join("test.c.bak").exists());
    }

    #[test]
    fn test_parse_error_leaves_file_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let test_file = temp_dir.path().join("broken.c");
        let input = "x\n// clang-format off\n// modelines: note\n// vim: ts=2\n";
        fs::write(&test_file, input).unwrap();

        let err = Rewriter::default()
            .process_file(&test_file, ProcessOptions::default())
            .unwrap_err();

        assert!(matches!(err, Error::Parse { .. }));
        assert_eq!(fs::read_to_string(&test_file).unwrap(), input);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = Rewriter::default()
            .process_file(&temp_dir.path().join("nope.c"), ProcessOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_custom_config_block() {
        let config = ModelineConfig {
            driver_script: "scripts/modelines.sh".to_string(),
            vim: "// vim: shiftwidth=4".to_string(),
            ..ModelineConfig::default()
        };
        let rewriter = Rewriter::new(config);
        let rewrite = rewriter.rewrite("a\n").unwrap();
        assert!(rewrite.content.contains("by scripts/modelines.sh\n"));
        assert!(rewrite.content.contains("// vim: shiftwidth=4\n"));
        assert_eq!(rewriter.rewrite(&rewrite.content).unwrap().content, rewrite.content);
    }
}
