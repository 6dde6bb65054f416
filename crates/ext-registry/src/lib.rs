//! Installed-extension registry.
//!
//! An [`Application`] records which extensions are installed, as a tree of
//! [`ExtensionEntry`] values with their content descriptors. Records are read
//! and written through a pluggable [`Mapper`]; [`RegistryStore`] persists
//! them to a file whose extension selects the format.

pub mod application;
pub mod error;
pub mod mapper;
pub mod reconcile;
pub mod store;

pub use application::{Application, ExtensionEntry};
pub use error::{Error, Result};
pub use mapper::{Format, JsonMapper, Mapper, TomlMapper, YamlMapper};
pub use reconcile::{Mismatch, reconcile};
pub use store::RegistryStore;
