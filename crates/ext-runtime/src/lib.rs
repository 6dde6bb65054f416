//! Extension runtime: isolation layers, containers and session scopes.
//!
//! Booting turns a set of [`ExtensionModule`]s into a [`Runtime`]:
//!
//! 1. descriptors are validated and ordered into an
//!    [`ExtensionGraph`](ext_model::ExtensionGraph) load plan;
//! 2. [`LayerBuilder`] gives every extension a visibility table;
//! 3. [`ContextFactory`] builds one [`Container`] per extension, parent
//!    containers first;
//! 4. [`SessionScopes`] serves session-scoped components per open document.
//!
//! ```
//! use ext_model::{ExtensionDescriptor, ExtensionId};
//! use ext_runtime::{Bootstrapper, ComponentDef, DeclaredModule, RuntimeConfig};
//!
//! struct Logger;
//!
//! let runtime = Bootstrapper::new(RuntimeConfig::default())
//!     .with_module(
//!         DeclaredModule::new(ExtensionDescriptor::root(ExtensionId::ROOT, ["app.Logger"]))
//!             .component(ComponentDef::singleton("app.Logger", |_| Ok(Logger))),
//!     )
//!     .boot()
//!     .unwrap();
//! assert!(runtime.get::<Logger>(ExtensionId::ROOT, "app.Logger").is_ok());
//! ```

pub mod boot;
pub mod component;
pub mod config;
pub mod container;
pub mod error;
pub mod factory;
pub mod layer;
pub mod module;
pub mod scope;

pub use boot::{BootReport, Bootstrapper, ReportEntry, Runtime};
pub use component::{ComponentDef, Instance, Lifetime};
pub use config::{FailurePolicy, RuntimeConfig};
pub use container::{Container, Resolver};
pub use error::{
    BootError, BootFailure, BoxError, Collision, ConfigError, ContainerError, FailureCause,
    LayerError, ResolveError, Result, ScopeError, error_chain,
};
pub use factory::ContextFactory;
pub use layer::{Layer, LayerBuilder, LayerSet, Visibility};
pub use module::{DeclaredModule, ExtensionModule};
pub use scope::{ScopeHandle, ScopeState, SessionScopes};
