use thiserror::Error;

/// The primary error type for all operations in `update-modelines`.
#[derive(Error, Debug)]
pub enum Error {
    /// An error related to file system I/O.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The scanner found only one end of a modeline block.
    ///
    /// Raised before anything is written, so the target file is left untouched.
    #[error("Parsing error: incomplete modeline block (begin: {begin:?}, end: {end:?})")]
    Parse {
        begin: Option<usize>,
        end: Option<usize>,
    },

    /// An error that occurred while parsing a YAML configuration file.
    #[error("Config parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A general configuration-related error.
    #[error("Config error: {0}")]
    Config(String),

    /// An error related to persisting a temporary file over the target.
    #[error("Tempfile error: {0}")]
    TempFile(#[from] tempfile::PersistError),
}

/// A convenient type alias for `Result<T, update_modelines::errors::Error>`.
pub type Result<T> = std::result::Result<T, Error>;

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Config(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Config(s.to_string())
    }
}
