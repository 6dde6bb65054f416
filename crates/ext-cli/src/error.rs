//! Error types for ext-cli

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that can occur in CLI operations
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Registry(#[from] ext_registry::Error),

    #[error(transparent)]
    Manifest(#[from] ext_model::Error),

    #[error(transparent)]
    Graph(#[from] ext_model::GraphError),

    #[error(transparent)]
    Layer(#[from] ext_runtime::LayerError),

    #[error(transparent)]
    Config(#[from] ext_runtime::ConfigError),

    #[error(transparent)]
    Content(#[from] ext_content::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// User-facing error with a message
    #[error("{message}")]
    User { message: String },
}

impl CliError {
    /// Create a new user error with the given message
    pub fn user(message: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
        }
    }
}
