//! Core container implementation for Khazina.

pub mod binder;
pub mod catalog;
pub mod container;
pub mod error;
pub mod factory;
pub mod graph;
pub mod introspect;
pub mod key;
pub mod provider;
pub mod registry;
pub mod settings;
pub mod tier;

pub use catalog::TypeCatalog;
pub use container::{Container, ContainerBuilder, ContainerRef, prelude};
pub use error::{BoxError, KhazinaError, Result};
pub use factory::{Arguments, Factory, FactoryType, InvokableType, Service, into_service};
pub use introspect::{DEFAULT_ENTRY_POINT, EntryPoint, ParameterDescriptor};
pub use key::ServiceId;
pub use settings::ContainerSettings;
pub use tier::Tier;

#[doc(hidden)]
pub mod __private {
    pub use inventory;
}
