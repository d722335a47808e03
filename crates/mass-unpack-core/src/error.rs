use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unsafe path '{path}': {reason}")]
    PathTraversal { path: String, reason: &'static str },

    #[error("Could not decode entry name {raw:02x?}")]
    DecodeFailure { raw: Vec<u8> },

    #[error("IO error on '{}': {source}", path.display())]
    IoAt {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot read '{entry}' in '{}': {source}", archive.display())]
    EntryRead {
        archive: PathBuf,
        entry: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupted archive '{}': {source}", path.display())]
    ArchiveCorrupt {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Insufficient disk space: need {required} bytes, available {available} bytes")]
    InsufficientSpace { required: u64, available: u64 },

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub(crate) fn io_at(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::IoAt {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn entry_read(archive: &Path, entry: &str, source: std::io::Error) -> Self {
        Error::EntryRead {
            archive: archive.to_path_buf(),
            entry: entry.to_string(),
            source,
        }
    }
}
