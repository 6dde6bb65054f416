//! Component definitions: how a declared class is instantiated.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use ext_model::ClassName;
use serde::{Deserialize, Serialize};

use crate::container::Resolver;
use crate::error::ResolveError;

/// A resolved component instance.
pub type Instance = Arc<dyn Any + Send + Sync>;

type Constructor = Arc<dyn Fn(&Resolver<'_>) -> Result<Instance, ResolveError> + Send + Sync>;
pub(crate) type Teardown = Arc<dyn Fn(&Instance) + Send + Sync>;

/// How long a resolved instance lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifetime {
    /// One instance per container.
    Singleton,
    /// A new instance on every request.
    Prototype,
    /// One instance per session scope per container, evicted when the scope
    /// closes.
    Session,
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Singleton => "singleton",
            Self::Prototype => "prototype",
            Self::Session => "session",
        })
    }
}

/// Registration of one class: its lifetime and constructor.
///
/// Constructors receive a [`Resolver`] bound to the extension that owns the
/// class, so they can depend on anything that extension sees.
///
/// ```
/// use ext_runtime::ComponentDef;
///
/// struct Logger;
/// struct Service {
///     _logger: std::sync::Arc<Logger>,
/// }
///
/// let logger = ComponentDef::singleton("app.Logger", |_| Ok(Logger));
/// let service = ComponentDef::prototype("app.Service", |r| {
///     Ok(Service {
///         _logger: r.get::<Logger>("app.Logger")?,
///     })
/// });
/// assert_eq!(service.class().as_str(), "app.Service");
/// # let _ = logger;
/// ```
#[derive(Clone)]
pub struct ComponentDef {
    class: ClassName,
    lifetime: Lifetime,
    type_name: &'static str,
    constructor: Constructor,
    teardown: Option<Teardown>,
}

impl ComponentDef {
    pub fn new<T, F>(class: impl Into<ClassName>, lifetime: Lifetime, constructor: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Resolver<'_>) -> Result<T, ResolveError> + Send + Sync + 'static,
    {
        Self {
            class: class.into(),
            lifetime,
            type_name: std::any::type_name::<T>(),
            constructor: Arc::new(move |resolver| {
                constructor(resolver).map(|value| Arc::new(value) as Instance)
            }),
            teardown: None,
        }
    }

    pub fn singleton<T, F>(class: impl Into<ClassName>, constructor: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Resolver<'_>) -> Result<T, ResolveError> + Send + Sync + 'static,
    {
        Self::new(class, Lifetime::Singleton, constructor)
    }

    pub fn prototype<T, F>(class: impl Into<ClassName>, constructor: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Resolver<'_>) -> Result<T, ResolveError> + Send + Sync + 'static,
    {
        Self::new(class, Lifetime::Prototype, constructor)
    }

    pub fn session<T, F>(class: impl Into<ClassName>, constructor: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Resolver<'_>) -> Result<T, ResolveError> + Send + Sync + 'static,
    {
        Self::new(class, Lifetime::Session, constructor)
    }

    /// Run `hook` on each session-scoped instance when its scope closes.
    ///
    /// Hooks whose type does not match the constructed instance are skipped.
    pub fn with_teardown<T, F>(mut self, hook: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.teardown = Some(Arc::new(move |instance: &Instance| {
            if let Some(value) = instance.downcast_ref::<T>() {
                hook(value);
            }
        }));
        self
    }

    pub fn class(&self) -> &ClassName {
        &self.class
    }

    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    /// Rust type produced by the constructor.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn construct(&self, resolver: &Resolver<'_>) -> Result<Instance, ResolveError> {
        (self.constructor)(resolver)
    }

    pub(crate) fn teardown(&self) -> Option<&Teardown> {
        self.teardown.as_ref()
    }
}

impl fmt::Debug for ComponentDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDef")
            .field("class", &self.class)
            .field("lifetime", &self.lifetime)
            .field("type_name", &self.type_name)
            .field("teardown", &self.teardown.is_some())
            .finish()
    }
}
