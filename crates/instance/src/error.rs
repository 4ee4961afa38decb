//! Error types for instance discovery and config reading.

use std::path::PathBuf;

/// A specialized Result type for instance operations.
pub type Result<T> = std::result::Result<T, InstanceError>;

#[derive(Debug, thiserror::Error)]
pub enum InstanceError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no `{key}` entry in {path}")]
    PortKeyMissing { key: String, path: PathBuf },
}

impl InstanceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        InstanceError::Io {
            path: path.into(),
            source,
        }
    }
}
