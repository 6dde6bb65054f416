//! Error types for ext-content

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The provider's source is gone or unusable.
    #[error("content source is not valid: {source_path}")]
    InvalidSource { source_path: PathBuf },

    /// I/O failure while synchronising; the caller may retry.
    #[error("content synchronisation failed: {0}")]
    Sync(#[from] ext_fs::Error),

    /// No provider is available for this descriptor kind.
    #[error("no content provider for kind '{kind}'")]
    UnsupportedKind { kind: String },

    /// The background worker ended without reporting an outcome.
    #[error("background synchronisation worker terminated unexpectedly")]
    WorkerLost,
}

impl Error {
    /// Whether retrying the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Sync(_) | Self::WorkerLost)
    }
}
