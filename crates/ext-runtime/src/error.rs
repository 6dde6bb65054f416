//! Error types for ext-runtime

use std::path::PathBuf;

use ext_model::{ClassName, ExtensionId, GraphError, ValidationError};
use ext_registry::Mismatch;

use crate::scope::ScopeHandle;

/// Opaque failure raised by module code (hooks, constructors).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A class declared by an extension clashes with one already visible to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collision {
    pub extension: ExtensionId,
    pub class: ClassName,
    /// The ancestor that already shares the class.
    pub owner: ExtensionId,
}

impl std::fmt::Display for Collision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} declares {} which is already shared by {}",
            self.extension, self.class, self.owner
        )
    }
}

/// Visibility collisions found while building isolation layers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{} class visibility collision(s): {}", collisions.len(), list(collisions))]
pub struct LayerError {
    pub collisions: Vec<Collision>,
}

fn list(collisions: &[Collision]) -> String {
    collisions
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors resolving a component from a container.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The class is not visible from the requesting extension.
    #[error("class {class} is not visible from extension {extension}")]
    NotVisible {
        class: ClassName,
        extension: ExtensionId,
    },

    /// Visible, but no container in the parent chain registers it.
    #[error("no component registered for {class} (owner {owner})")]
    Unregistered { class: ClassName, owner: ExtensionId },

    #[error("circular dependency: {}", path.iter().map(ClassName::as_str).collect::<Vec<_>>().join(" -> "))]
    CircularDependency { path: Vec<ClassName> },

    #[error("{class} is session scoped but no scope is active")]
    NoActiveScope { class: ClassName },

    #[error("{class} requested under {scope}, which is closed")]
    ScopeClosed { class: ClassName, scope: ScopeHandle },

    /// A singleton would outlive the scope its session dependency belongs to.
    #[error("session-scoped {class} cannot be injected into singleton {singleton}")]
    SessionInSingleton { class: ClassName, singleton: ClassName },

    /// The extension exists but did not finish loading.
    #[error("extension {extension} is not active")]
    Inactive { extension: ExtensionId },

    #[error("{class} is not of type {expected}")]
    TypeMismatch {
        class: ClassName,
        expected: &'static str,
    },

    #[error("failed to construct {class}")]
    Construction {
        class: ClassName,
        #[source]
        source: BoxError,
    },

    #[error(transparent)]
    Scope(#[from] ScopeError),
}

impl ResolveError {
    /// Wrap a constructor failure for `class`.
    pub fn construction(class: impl Into<ClassName>, source: impl Into<BoxError>) -> Self {
        Self::Construction {
            class: class.into(),
            source: source.into(),
        }
    }
}

/// Errors creating an extension's container.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error("extension {extension} expects parent container {expected:?}, got {actual:?}")]
    ParentMismatch {
        extension: ExtensionId,
        expected: Option<ExtensionId>,
        actual: Option<ExtensionId>,
    },

    #[error("extension {extension} registers undeclared class {class}")]
    Undeclared {
        extension: ExtensionId,
        class: ClassName,
    },

    #[error("extension {extension} registers {class} more than once")]
    DuplicateComponent {
        extension: ExtensionId,
        class: ClassName,
    },

    #[error("extension {extension} declares classes without components: {classes:?}")]
    MissingComponents {
        extension: ExtensionId,
        classes: Vec<ClassName>,
    },

    #[error("failed to instantiate singleton {class}")]
    Instantiation {
        class: ClassName,
        #[source]
        source: ResolveError,
    },
}

/// Why one extension did not load.
#[derive(Debug, thiserror::Error)]
pub enum FailureCause {
    #[error("layer hook failed")]
    Hook(#[source] BoxError),

    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error("ancestor {0} failed to load")]
    AncestorFailed(ExtensionId),
}

/// A per-extension boot failure with its originating cause.
#[derive(Debug, thiserror::Error)]
#[error("extension {extension} failed to load")]
pub struct BootFailure {
    pub extension: ExtensionId,
    #[source]
    pub cause: FailureCause,
}

/// Errors aborting the boot sequence.
#[derive(Debug, thiserror::Error)]
pub enum BootError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Layer(#[from] LayerError),

    #[error("registry disagrees with extension declarations: {}", mismatches.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    Inconsistent { mismatches: Vec<Mismatch> },

    #[error("boot aborted")]
    Aborted(#[source] BootFailure),
}

/// Scope discipline violations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScopeError {
    #[error("no session scope is active")]
    NoActiveScope,

    #[error("{0} is closed")]
    ScopeClosed(ScopeHandle),

    #[error("{0} cannot be closed while scoped work is running")]
    ScopeInUse(ScopeHandle),

    #[error("{0} was not opened by this scope manager")]
    UnknownScope(ScopeHandle),

    #[error("session scopes are bound to the thread that created them")]
    WrongThread,

    /// The scope was closed and evicted, but some teardown hooks panicked.
    #[error("{scope} closed, but teardown panicked for {}", classes.iter().map(ClassName::as_str).collect::<Vec<_>>().join(", "))]
    TeardownPanicked {
        scope: ScopeHandle,
        classes: Vec<ClassName>,
    },
}

/// Errors loading runtime configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse {format} config {}: {message}", path.display())]
    Parse {
        path: PathBuf,
        format: &'static str,
        message: String,
    },

    #[error("unsupported config format: {extension}")]
    UnsupportedFormat { extension: String },

    #[error(transparent)]
    Fs(#[from] ext_fs::Error),
}

pub type Result<T, E = BootError> = std::result::Result<T, E>;

/// Render `error` followed by each of its sources, separated by `: `.
pub fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
