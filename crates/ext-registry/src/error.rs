//! Error types for ext-registry

use ext_model::ExtensionId;

use crate::mapper::Format;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The registry stream could not be parsed; nothing was loaded.
    #[error("invalid {format} registry: {source}")]
    InvalidRegistry {
        format: Format,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("failed to serialize {format} registry: {message}")]
    Serialize { format: Format, message: String },

    #[error("unsupported registry format: {extension}")]
    UnsupportedFormat { extension: String },

    #[error("extension {0} is already registered")]
    DuplicateExtension(ExtensionId),

    #[error("unknown extension: {0}")]
    UnknownExtension(ExtensionId),

    #[error(transparent)]
    Fs(#[from] ext_fs::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn invalid(
        format: Format,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::InvalidRegistry {
            format,
            source: source.into(),
        }
    }
}
