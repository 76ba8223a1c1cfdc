//! # The Container
//!
//! A service registry that resolves identifiers lazily and caches what it
//! produces.
//!
//! # Resolution
//! ```text
//!   get(id) ──> instance tier ──hit──> cached value
//!                  │ miss
//!                  ▼
//!              factory tier ──> new factory, resolve each parameter
//!                  │             with get(), call entry point
//!                  ▼
//!             invokable tier ──> T::default()
//!                  │
//!                  ▼
//!          store as instance, drop bindings for id
//! ```
//!
//! # Examples
//! ```rust
//! use khazina_container::prelude::*;
//! use khazina_container::introspect::{EntryPoint, ParameterDescriptor};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[derive(Default)]
//! struct Clock;
//!
//! struct Greeter {
//!     greeting: String,
//! }
//!
//! #[derive(Default)]
//! struct GreeterFactory;
//!
//! impl Factory for GreeterFactory {
//!     fn entry_points() -> Vec<EntryPoint> {
//!         vec![EntryPoint::new("invoke", vec![ParameterDescriptor::named("config")])]
//!     }
//!
//!     fn call(&self, _: &str, args: Arguments) -> std::result::Result<Service, BoxError> {
//!         let config: Arc<serde_json::Value> = args.get(0)?;
//!         let greeting = config["greeting"].as_str().unwrap_or("hello").to_string();
//!         Ok(into_service(Greeter { greeting }))
//!     }
//! }
//!
//! let catalog = TypeCatalog::new()
//!     .with_factory::<GreeterFactory>("app.GreeterFactory")
//!     .with_invokable::<Clock>("app.Clock");
//!
//! let container = Container::builder()
//!     .config(json!({
//!         "greeting": "salaam",
//!         "dependencies": {
//!             "factories": { "greeter": "app.GreeterFactory" },
//!             "invokables": { "clock": "app.Clock" }
//!         }
//!     }))
//!     .catalog(catalog)
//!     .build()
//!     .expect("Failed to build container");
//!
//! let greeter: Arc<Greeter> = container.get_as("greeter").expect("Failed to resolve");
//! assert_eq!(greeter.greeting, "salaam");
//! assert!(container.has("clock"));
//! ```

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Weak};

use khazina_support::rendering::suggest_similar;
use parking_lot::{ReentrantMutex, RwLock};
use serde_json::Value;
use tracing::{debug, info, instrument, trace, warn};

use crate::binder::Binder;
use crate::catalog::TypeCatalog;
use crate::error::{CircularDependencyError, KhazinaError, Result, ServiceNotFoundError};
use crate::factory::{Arguments, FactoryType, InvokableType, Service, downcast, into_service};
use crate::graph::GraphValidator;
use crate::introspect::Introspector;
use crate::key::ServiceId;
use crate::provider::Provider;
use crate::registry::{Binding, Registry};
use crate::settings::ContainerSettings;
use crate::tier::Tier;

// ============================================================
// ContainerBuilder
// ============================================================

/// Builds a [`Container`] from configuration, a type catalog and providers.
///
/// # Examples
/// ```rust,ignore
/// let container = Container::builder()
///     .config(config)
///     .catalog(TypeCatalog::collected())
///     .add_provider(MailProvider)
///     .build()?;
/// ```
pub struct ContainerBuilder {
    config: Value,
    catalog: Option<TypeCatalog>,
    settings: ContainerSettings,
    providers: Vec<Box<dyn Provider>>,
}

impl ContainerBuilder {
    fn new() -> Self {
        Self {
            config: Value::Object(Default::default()),
            catalog: None,
            settings: ContainerSettings::default(),
            providers: Vec::new(),
        }
    }

    /// Configuration value, seeded as `"config"` and scanned for bindings.
    pub fn config(mut self, config: Value) -> Self {
        self.config = config;
        self
    }

    /// Catalog used to resolve type references in the configuration.
    ///
    /// Defaults to [`TypeCatalog::collected`].
    pub fn catalog(mut self, catalog: TypeCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn settings(mut self, settings: ContainerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Add a [`Provider`] module. Providers run after configuration binding,
    /// in the order they were added.
    pub fn add_provider(mut self, provider: impl Provider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    /// Build the container.
    ///
    /// Seeds the configuration and the self-reference, binds the
    /// configuration, then runs the providers.
    #[instrument(skip(self), name = "container_build")]
    pub fn build(self) -> Result<Container> {
        let ContainerBuilder {
            config,
            catalog,
            settings,
            providers,
        } = self;

        let config = Arc::new(config);
        let container = Container::seeded(config.clone(), settings);

        {
            let settings = &container.inner.settings;
            let mut registry = container.inner.registry.write();

            let catalog = catalog.unwrap_or_else(TypeCatalog::collected);
            let bound = Binder::new(&catalog, settings.allow_override).bind(
                &mut registry,
                &config,
                settings.bind_modules,
            )?;
            debug!(bound, "Configuration bound");

            for provider in &providers {
                debug!(provider = provider.name(), "Registering provider");
                provider.register(&mut *registry)?;
            }
        }

        info!(
            instances = container.len(Tier::Instance),
            factories = container.len(Tier::Factory),
            invokables = container.len(Tier::Invokable),
            "Container built"
        );
        Ok(container)
    }
}

// ═══════════════════════════════════════════
// Container
// ═══════════════════════════════════════════

/// Lazily resolving, memoizing service container.
///
/// Cloning is cheap and yields another handle to the same container.
#[derive(Clone)]
pub struct Container {
    inner: Arc<Inner>,
}

struct Inner {
    registry: RwLock<Registry>,
    introspector: Introspector,
    resolution: ReentrantMutex<RefCell<Resolution>>,
    settings: ContainerSettings,
    config: Arc<Value>,
}

/// Identifiers currently being resolved, in request order.
#[derive(Default)]
struct Resolution {
    resolving: HashSet<ServiceId>,
    path: Vec<ServiceId>,
}

impl Container {
    /// Create a new builder.
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    /// Build a container from configuration with the collected type catalog
    /// and default settings.
    pub fn new(config: Value) -> Result<Self> {
        Self::builder().config(config).build()
    }

    fn seeded(config: Arc<Value>, settings: ContainerSettings) -> Self {
        let inner = Arc::new_cyclic(|weak: &Weak<Inner>| {
            let mut registry = Registry::new();
            let this: Service = into_service(ContainerRef(weak.clone()));
            registry.seed(ServiceId::CONFIG, config.clone());
            registry.seed(ServiceId::CONTAINER, this.clone());
            registry.seed(ServiceId::of::<ContainerRef>(), this);

            Inner {
                registry: RwLock::new(registry),
                introspector: Introspector::new(),
                resolution: ReentrantMutex::new(RefCell::new(Resolution::default())),
                settings,
                config,
            }
        });
        Self { inner }
    }

    /// Returns `true` if `id` is present in any tier.
    pub fn has(&self, id: &str) -> bool {
        self.inner.registry.read().has(id)
    }

    /// The tier currently holding `id`, in lookup order.
    pub fn tier(&self, id: &str) -> Option<Tier> {
        self.inner.registry.read().tier(id)
    }

    /// Resolve a service by identifier.
    ///
    /// The first call for a bound identifier runs its factory or
    /// instantiates its invokable; every later call returns the same value.
    ///
    /// # Errors
    /// - [`KhazinaError::NotRegistered`]: `id`, or a parameter it needs, is absent
    /// - [`KhazinaError::CircularDependency`]: `id` is needed while it is being produced
    /// - [`KhazinaError::NoSuchEntryPoint`]: the factory lacks the configured entry point
    /// - [`KhazinaError::ConstructionFailed`]: the factory returned an error
    pub fn get(&self, id: &str) -> Result<Service> {
        if let Some(service) = self.inner.registry.read().instance(id) {
            trace!(id, "Resolved from cache");
            return Ok(service.clone());
        }
        self.resolve_binding(id)
    }

    /// Resolve a service and downcast it to `T`.
    ///
    /// ```rust,ignore
    /// let mailer: Arc<Mailer> = container.get_as("mailer")?;
    /// ```
    pub fn get_as<T: Any + Send + Sync>(&self, id: &str) -> Result<Arc<T>> {
        let service = self.get(id)?;
        downcast(ServiceId::new(id.to_string()), service)
    }

    /// Resolve the service registered under `T`'s own type name.
    pub fn resolve<T: Any + Send + Sync>(&self) -> Result<Arc<T>> {
        let id = ServiceId::of::<T>();
        downcast(id.clone(), self.get(id.as_str())?)
    }

    /// Store a resolved value.
    ///
    /// # Errors
    /// [`KhazinaError::AlreadyRegistered`] if `overwrite` is false and `id`
    /// already has an instance.
    pub fn set_instance(&self, id: impl Into<ServiceId>, value: Service, overwrite: bool) -> Result<()> {
        self.inner.registry.write().set_instance(id.into(), value, overwrite)
    }

    /// Store `value` as a service. It is wrapped in an `Arc`, so pass the
    /// value itself rather than an `Arc` of it.
    pub fn set_service<T: Any + Send + Sync>(
        &self,
        id: impl Into<ServiceId>,
        value: T,
        overwrite: bool,
    ) -> Result<()> {
        self.set_instance(id, into_service(value), overwrite)
    }

    /// Bind `id` to a factory type.
    pub fn set_factory(&self, id: impl Into<ServiceId>, factory: FactoryType, overwrite: bool) -> Result<()> {
        self.inner.registry.write().set_factory(id.into(), factory, overwrite)
    }

    /// Bind `id` to an invokable type.
    pub fn set_invokable(
        &self,
        id: impl Into<ServiceId>,
        invokable: InvokableType,
        overwrite: bool,
    ) -> Result<()> {
        self.inner.registry.write().set_invokable(id.into(), invokable, overwrite)
    }

    /// The configuration this container was built from.
    pub fn config(&self) -> Arc<Value> {
        self.inner.config.clone()
    }

    pub fn settings(&self) -> &ContainerSettings {
        &self.inner.settings
    }

    /// Check the declared dependency graph of all pending factory bindings
    /// without producing anything.
    #[instrument(skip(self))]
    pub fn validate(&self) -> Result<()> {
        let registry = self.inner.registry.read();
        GraphValidator::from_registry(
            &registry,
            &self.inner.introspector,
            &self.inner.settings.entry_point,
        )?
        .validate()
    }

    /// A weak handle to this container.
    pub fn downgrade(&self) -> ContainerRef {
        ContainerRef(Arc::downgrade(&self.inner))
    }

    fn len(&self, tier: Tier) -> usize {
        self.inner.registry.read().len(tier)
    }

    /// Slow path: turn a binding into an instance.
    ///
    /// Holds the re-entrant resolution lock for the whole call, so nested
    /// resolutions on this thread proceed while other threads wait and then
    /// find the cached instance.
    #[instrument(skip(self), level = "debug")]
    fn resolve_binding(&self, id: &str) -> Result<Service> {
        let guard = self.inner.resolution.lock();
        let state: &RefCell<Resolution> = &guard;

        let binding = {
            let registry = self.inner.registry.read();
            if let Some(service) = registry.instance(id) {
                trace!(id, "Resolved by a concurrent caller");
                return Ok(service.clone());
            }
            registry.binding(id)
        };

        let id = ServiceId::new(id.to_string());
        let Some(binding) = binding else {
            return Err(self.not_found(id, state));
        };

        let _in_progress = InProgress::enter(state, id.clone())?;

        let service = match binding {
            Binding::Factory(factory) => self.invoke_factory(&id, &factory)?,
            Binding::Invokable(invokable) => invokable.instantiate(),
        };

        debug!(id = %id, tier = %binding.tier(), "Resolved service");
        self.inner.registry.write().complete(id, service.clone());
        Ok(service)
    }

    fn invoke_factory(&self, id: &ServiceId, factory: &FactoryType) -> Result<Service> {
        let entry_point = self.inner.settings.entry_point.as_str();
        let instance = factory.instantiate();
        let parameters = self.inner.introspector.parameters(factory, entry_point)?;

        let mut args = Arguments::with_capacity(parameters.len());
        for parameter in parameters.iter() {
            let dependency = parameter.service_id();
            trace!(id = %id, parameter = parameter.name(), dependency = %dependency, "Injecting");
            let value = self.get(dependency.as_str())?;
            args.push(parameter.clone(), value);
        }

        instance
            .call(entry_point, args)
            .map_err(|source| match source.downcast::<KhazinaError>() {
                Ok(inner) => *inner,
                Err(source) => KhazinaError::ConstructionFailed {
                    id: id.clone(),
                    source,
                },
            })
    }

    fn not_found(&self, id: ServiceId, state: &RefCell<Resolution>) -> KhazinaError {
        let registry = self.inner.registry.read();
        let known: Vec<&str> = registry.ids().into_iter().map(ServiceId::as_str).collect();
        let suggestions = suggest_similar(id.as_str(), &known, 3);

        KhazinaError::NotRegistered(ServiceNotFoundError {
            requested: id,
            required_by: state.borrow().path.last().cloned(),
            suggestions,
        })
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.inner.registry.read();
        f.debug_struct("Container")
            .field("instances", &registry.len(Tier::Instance))
            .field("factories", &registry.len(Tier::Factory))
            .field("invokables", &registry.len(Tier::Invokable))
            .finish()
    }
}

/// Marks `id` as resolving for as long as it lives.
struct InProgress<'a> {
    state: &'a RefCell<Resolution>,
    id: ServiceId,
}

impl<'a> InProgress<'a> {
    fn enter(state: &'a RefCell<Resolution>, id: ServiceId) -> Result<Self> {
        let mut resolution = state.borrow_mut();

        if resolution.resolving.contains(&id) {
            let start = resolution.path.iter().position(|k| *k == id).unwrap_or(0);
            let mut chain = resolution.path[start..].to_vec();
            chain.push(id);

            warn!(cycle = ?chain, "Circular dependency detected");
            return Err(KhazinaError::CircularDependency(CircularDependencyError { chain }));
        }

        resolution.resolving.insert(id.clone());
        resolution.path.push(id.clone());
        drop(resolution);

        Ok(Self { state, id })
    }
}

impl Drop for InProgress<'_> {
    fn drop(&mut self) {
        let mut resolution = self.state.borrow_mut();
        resolution.resolving.remove(&self.id);
        resolution.path.pop();
    }
}

// ═══════════════════════════════════════════
// ContainerRef
// ═══════════════════════════════════════════

/// The container's reference to itself, as seeded into its registry.
///
/// Holds a weak handle so the container does not keep itself alive.
/// Declare a parameter of this type to receive it.
#[derive(Clone)]
pub struct ContainerRef(Weak<Inner>);

impl ContainerRef {
    /// The container, if it is still alive.
    pub fn upgrade(&self) -> Option<Container> {
        self.0.upgrade().map(|inner| Container { inner })
    }
}

impl fmt::Debug for ContainerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerRef")
            .field("alive", &(self.0.strong_count() > 0))
            .finish()
    }
}

// ═══════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════

pub mod prelude {
    pub use super::{Container, ContainerBuilder, ContainerRef};
    pub use crate::catalog::TypeCatalog;
    pub use crate::error::{BoxError, KhazinaError};
    pub use crate::factory::{Arguments, Factory, FactoryType, InvokableType, Service, into_service};
    pub use crate::key::ServiceId;
    pub use crate::provider::{Provider, ProviderRegistry};
    pub use crate::settings::ContainerSettings;
    pub use crate::tier::Tier;
}

// ═══════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════
