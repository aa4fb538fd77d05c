use crate::config::ModelineConfig;
use crate::errors::{Error, Result};
use tracing::debug;

/// Inclusive range of line indices covered by an existing modeline block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRange {
    /// Index of the off-marker line.
    pub begin: usize,
    /// Index of the on-marker line, or of the last blank line following it.
    pub end: usize,
}

impl BlockRange {
    /// Returns `true` if the line at `index` belongs to the block.
    pub fn contains(&self, index: usize) -> bool {
        index >= self.begin && index <= self.end
    }

    /// Number of lines in the block.
    pub fn line_count(&self) -> usize {
        self.end - self.begin + 1
    }
}

/// Where the scanner currently is relative to a modeline block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// Looking for the off-marker.
    None,
    /// Just saw the off-marker; the next line decides whether this is a modeline block.
    Start,
    /// Inside the block, looking for the on-marker.
    Inside,
    /// Past the on-marker, absorbing trailing blank lines.
    End,
}

/// Line-by-line state machine locating the first modeline block in a file.
///
/// Feed every line in order with [`BlockScanner::feed`], then call
/// [`BlockScanner::finish`] to get the block bounds.
pub struct BlockScanner<'a> {
    config: &'a ModelineConfig,
    state: ScanState,
    begin: Option<usize>,
    end: Option<usize>,
}

impl<'a> BlockScanner<'a> {
    pub fn new(config: &'a ModelineConfig) -> Self {
        Self {
            config,
            state: ScanState::None,
            begin: None,
            end: None,
        }
    }

    /// The current state, mostly useful for tests and debugging.
    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Advances the state machine by one line.
    ///
    /// `line` may still carry its terminator.
    pub fn feed(&mut self, index: usize, line: &str) {
        let text = strip_terminator(line);
        self.state = match self.state {
            // Only the first block is tracked.
            ScanState::None if self.begin.is_some() => ScanState::None,
            ScanState::None => {
                if text.starts_with(&self.config.off_marker) {
                    ScanState::Start
                } else {
                    ScanState::None
                }
            }
            ScanState::Start => {
                if text.starts_with(&self.config.notification_prefix) {
                    self.begin = Some(index.saturating_sub(1));
                    debug!(line = index, "modeline block opens");
                    ScanState::Inside
                } else {
                    ScanState::None
                }
            }
            ScanState::Inside => {
                if text.starts_with(&self.config.on_marker) {
                    self.end = Some(index);
                    debug!(line = index, "modeline block closes");
                    ScanState::End
                } else {
                    ScanState::Inside
                }
            }
            ScanState::End => {
                if text.trim().is_empty() {
                    self.end = Some(index);
                    ScanState::End
                } else {
                    ScanState::None
                }
            }
        };
    }

    /// Consumes the scanner and returns the bounds of the block, if one was found.
    ///
    /// Fails with [`Error::Parse`] when the block was opened but never closed.
    pub fn finish(self) -> Result<Option<BlockRange>> {
        match (self.begin, self.end) {
            (None, None) => Ok(None),
            (Some(begin), Some(end)) if begin <= end => Ok(Some(BlockRange { begin, end })),
            (begin, end) => Err(Error::Parse { begin, end }),
        }
    }
}

/// Runs a [`BlockScanner`] over `lines` and returns the block bounds.
pub fn find_block<'l, I>(config: &ModelineConfig, lines: I) -> Result<Option<BlockRange>>
where
    I: IntoIterator<Item = &'l str>,
{
    let mut scanner = BlockScanner::new(config);
    for (index, line) in lines.into_iter().enumerate() {
        scanner.feed(index, line);
    }
    scanner.finish()
}

fn strip_terminator(line: &str) -> &str {
    line.strip_suffix('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .unwrap_or(line)
}
