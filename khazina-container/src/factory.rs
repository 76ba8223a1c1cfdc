//! Factory and invokable types, and the values they produce.
//!
//! A [`FactoryType`] or [`InvokableType`] is what configuration refers to
//! by name: a reference to a Rust type plus the function pointers needed to
//! build it. Both are `const`-constructible so they can be submitted to the
//! compile-time [`inventory`] and picked up by the
//! [`TypeCatalog`](crate::catalog::TypeCatalog).

use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::sync::Arc;

use crate::error::{BoxError, KhazinaError, Result};
use crate::introspect::{EntryPoint, ParameterDescriptor};
use crate::key::ServiceId;

/// A resolved service: type-erased, shared, thread-safe.
pub type Service = Arc<dyn Any + Send + Sync>;

/// Wraps a value as a [`Service`].
#[inline]
pub fn into_service<T: Any + Send + Sync>(value: T) -> Service {
    Arc::new(value)
}

/// A type whose entry point produces a service.
///
/// Usually implemented by the `#[factory]` attribute, which builds the
/// [`entry_points`](Factory::entry_points) table from the method signatures.
/// A manual implementation looks like this:
///
/// ```
/// use khazina_container::prelude::*;
/// use khazina_container::introspect::{EntryPoint, ParameterDescriptor};
/// use std::sync::Arc;
///
/// #[derive(Default)]
/// struct GreetingFactory;
///
/// impl Factory for GreetingFactory {
///     fn entry_points() -> Vec<EntryPoint> {
///         vec![EntryPoint::new("invoke", vec![ParameterDescriptor::named("name")])]
///     }
///
///     fn call(&self, entry_point: &str, args: Arguments) -> std::result::Result<Service, BoxError> {
///         debug_assert_eq!(entry_point, "invoke");
///         let name: Arc<String> = args.get(0)?;
///         Ok(into_service(format!("hello, {name}")))
///     }
/// }
/// ```
pub trait Factory: Send + Sync + 'static {
    /// Declared entry points of this type and their parameters.
    fn entry_points() -> Vec<EntryPoint>
    where
        Self: Sized;

    /// Invokes `entry_point` with arguments resolved from its declared
    /// parameters, in declaration order.
    fn call(&self, entry_point: &str, args: Arguments) -> std::result::Result<Service, BoxError>;
}

fn construct_factory<F: Factory + Default>() -> Box<dyn Factory> {
    Box::new(F::default())
}

fn construct_invokable<T: Default + Send + Sync + 'static>() -> Service {
    Arc::new(T::default())
}

/// Reference to a [`Factory`] type.
#[derive(Clone, Copy)]
pub struct FactoryType {
    name: &'static str,
    type_id: fn() -> TypeId,
    construct: fn() -> Box<dyn Factory>,
    entry_points: fn() -> Vec<EntryPoint>,
}

impl FactoryType {
    /// Reference to `F`, named by its Rust type name.
    pub fn of<F: Factory + Default>() -> Self {
        Self::named::<F>(type_name::<F>())
    }

    /// Reference to `F` under an explicit name.
    pub const fn named<F: Factory + Default>(name: &'static str) -> Self {
        Self {
            name,
            type_id: TypeId::of::<F>,
            construct: construct_factory::<F>,
            entry_points: F::entry_points,
        }
    }

    /// Name used by configuration to refer to this type.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Identity of the referenced type. Names are not unique, this is.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        (self.type_id)()
    }

    /// Builds a fresh factory instance. Nothing is injected.
    pub(crate) fn instantiate(&self) -> Box<dyn Factory> {
        (self.construct)()
    }

    /// Reads the declared entry-point table. Callers cache the result.
    pub(crate) fn declared_entry_points(&self) -> Vec<EntryPoint> {
        (self.entry_points)()
    }
}

impl PartialEq for FactoryType {
    fn eq(&self, other: &Self) -> bool {
        self.type_id() == other.type_id()
    }
}

impl Eq for FactoryType {}

impl fmt::Debug for FactoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FactoryType({})", self.name)
    }
}

/// Reference to a type instantiated directly as its own service.
#[derive(Clone, Copy)]
pub struct InvokableType {
    name: &'static str,
    type_id: fn() -> TypeId,
    construct: fn() -> Service,
}

impl InvokableType {
    /// Reference to `T`, named by its Rust type name.
    pub fn of<T: Default + Send + Sync + 'static>() -> Self {
        Self::named::<T>(type_name::<T>())
    }

    /// Reference to `T` under an explicit name.
    pub const fn named<T: Default + Send + Sync + 'static>(name: &'static str) -> Self {
        Self {
            name,
            type_id: TypeId::of::<T>,
            construct: construct_invokable::<T>,
        }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        (self.type_id)()
    }

    pub(crate) fn instantiate(&self) -> Service {
        (self.construct)()
    }
}

impl PartialEq for InvokableType {
    fn eq(&self, other: &Self) -> bool {
        self.type_id() == other.type_id()
    }
}

impl Eq for InvokableType {}

impl fmt::Debug for InvokableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InvokableType({})", self.name)
    }
}

inventory::collect!(FactoryType);
inventory::collect!(InvokableType);

/// Resolved arguments for one entry-point call.
///
/// Ordered like the declared parameters, and addressable by parameter name.
pub struct Arguments {
    values: Vec<(ParameterDescriptor, Service)>,
}

impl Arguments {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, parameter: ParameterDescriptor, value: Service) {
        self.values.push((parameter, value));
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw value of the parameter at `index`.
    pub fn raw(&self, index: usize) -> Result<Service> {
        self.values
            .get(index)
            .map(|(_, value)| value.clone())
            .ok_or_else(|| KhazinaError::InvalidConfiguration {
                path: format!("arguments[{index}]"),
                reason: format!("only {} arguments were resolved", self.values.len()),
            })
    }

    /// Value of the parameter at `index`, downcast to `T`.
    pub fn get<T: Any + Send + Sync>(&self, index: usize) -> Result<Arc<T>> {
        let (parameter, value) =
            self.values
                .get(index)
                .ok_or_else(|| KhazinaError::InvalidConfiguration {
                    path: format!("arguments[{index}]"),
                    reason: format!("only {} arguments were resolved", self.values.len()),
                })?;
        downcast(parameter.service_id(), value.clone())
    }

    /// Value of the parameter called `name`, downcast to `T`.
    pub fn by_name<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>> {
        let (parameter, value) = self
            .values
            .iter()
            .find(|(parameter, _)| parameter.name() == name)
            .ok_or_else(|| KhazinaError::InvalidConfiguration {
                path: format!("arguments.{name}"),
                reason: "no parameter with that name".into(),
            })?;
        downcast(parameter.service_id(), value.clone())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ParameterDescriptor, &Service)> {
        self.values.iter().map(|(parameter, value)| (parameter, value))
    }
}

impl fmt::Debug for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.values.iter().map(|(parameter, _)| parameter))
            .finish()
    }
}

/// Downcasts a service to `T`, reporting `id` on mismatch.
pub(crate) fn downcast<T: Any + Send + Sync>(id: ServiceId, value: Service) -> Result<Arc<T>> {
    value.downcast::<T>().map_err(|_| KhazinaError::TypeMismatch {
        id,
        expected: type_name::<T>(),
    })
}
