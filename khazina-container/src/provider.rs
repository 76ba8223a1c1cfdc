//! Provider trait: a module of related registrations, written in code.
//!
//! A provider is the programmatic counterpart of a configuration fragment:
//! it groups the factories, invokables and ready-made services of one part
//! of an application.
//!
//! # Examples
//! ```rust,ignore
//! struct MailProvider;
//!
//! impl Provider for MailProvider {
//!     fn register(&self, registry: &mut dyn ProviderRegistry) -> Result<()> {
//!         registry.set_factory("mailer".into(), FactoryType::of::<MailerFactory>(), true)?;
//!         registry.set_invokable("clock".into(), InvokableType::of::<Clock>(), true)
//!     }
//! }
//! ```

use crate::error::Result;
use crate::factory::{FactoryType, InvokableType, Service};
use crate::key::ServiceId;
use crate::registry::Registry;

/// A module that registers related services into a container.
///
/// Providers run once, while the container is being built, after the
/// configuration bindings have been registered.
pub trait Provider: Send + Sync {
    /// Register services into the container's registry.
    fn register(&self, registry: &mut dyn ProviderRegistry) -> Result<()>;

    /// Human-readable name for logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Registration surface handed to providers.
///
/// Each call follows the per-tier overwrite contract of the container's
/// own `set_*` methods.
pub trait ProviderRegistry {
    fn set_instance(&mut self, id: ServiceId, value: Service, overwrite: bool) -> Result<()>;

    fn set_factory(&mut self, id: ServiceId, factory: FactoryType, overwrite: bool) -> Result<()>;

    fn set_invokable(
        &mut self,
        id: ServiceId,
        invokable: InvokableType,
        overwrite: bool,
    ) -> Result<()>;
}

impl ProviderRegistry for Registry {
    fn set_instance(&mut self, id: ServiceId, value: Service, overwrite: bool) -> Result<()> {
        Registry::set_instance(self, id, value, overwrite)
    }

    fn set_factory(&mut self, id: ServiceId, factory: FactoryType, overwrite: bool) -> Result<()> {
        Registry::set_factory(self, id, factory, overwrite)
    }

    fn set_invokable(
        &mut self,
        id: ServiceId,
        invokable: InvokableType,
        overwrite: bool,
    ) -> Result<()> {
        Registry::set_invokable(self, id, invokable, overwrite)
    }
}
