//! Parameter introspection.
//!
//! A factory's entry points are declared once, as a table of
//! [`EntryPoint`]s, and the [`Introspector`] caches that table per factory
//! type. Each parameter maps to the service it asks for: its declared type
//! if it has one, otherwise its bare name.

use std::any::TypeId;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::trace;

use crate::error::{KhazinaError, NoSuchEntryPointError, Result};
use crate::factory::FactoryType;
use crate::key::ServiceId;

/// Entry point used when none is configured.
pub const DEFAULT_ENTRY_POINT: &str = "invoke";

/// One declared parameter of an entry point.
///
/// # Examples
/// ```
/// use khazina_container::introspect::ParameterDescriptor;
/// use khazina_container::key::ServiceId;
///
/// let untyped = ParameterDescriptor::named("config");
/// assert_eq!(untyped.service_id(), ServiceId::new("config"));
///
/// struct Mailer;
/// let typed = ParameterDescriptor::typed("mailer", ServiceId::of::<Mailer>());
/// assert_eq!(typed.service_id(), ServiceId::of::<Mailer>());
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct ParameterDescriptor {
    name: Cow<'static, str>,
    declared_type: Option<ServiceId>,
}

impl ParameterDescriptor {
    /// A parameter with no declared type; resolved by its name.
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            declared_type: None,
        }
    }

    /// A parameter whose declared type names the service to inject.
    pub fn typed(name: impl Into<Cow<'static, str>>, declared_type: ServiceId) -> Self {
        Self {
            name: name.into(),
            declared_type: Some(declared_type),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn declared_type(&self) -> Option<&ServiceId> {
        self.declared_type.as_ref()
    }

    /// The service this parameter resolves to: declared type, else name.
    pub fn service_id(&self) -> ServiceId {
        match &self.declared_type {
            Some(ty) => ty.clone(),
            None => ServiceId::new(self.name.clone()),
        }
    }
}

impl fmt::Debug for ParameterDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.declared_type {
            Some(ty) => write!(f, "{}: {}", self.name, ty),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A named entry point and its ordered parameter list.
#[derive(Debug, Clone)]
pub struct EntryPoint {
    name: Cow<'static, str>,
    parameters: Arc<[ParameterDescriptor]>,
}

impl EntryPoint {
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        parameters: impl Into<Arc<[ParameterDescriptor]>>,
    ) -> Self {
        Self {
            name: name.into(),
            parameters: parameters.into(),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn parameters(&self) -> &Arc<[ParameterDescriptor]> {
        &self.parameters
    }
}

/// Caches entry-point tables per factory type.
#[derive(Debug, Default)]
pub struct Introspector {
    signatures: DashMap<TypeId, Arc<[EntryPoint]>>,
}

impl Introspector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the ordered parameters of `entry_point` on `factory`.
    ///
    /// # Errors
    /// [`KhazinaError::NoSuchEntryPoint`] if the type does not declare it.
    pub fn parameters(
        &self,
        factory: &FactoryType,
        entry_point: &str,
    ) -> Result<Arc<[ParameterDescriptor]>> {
        let signature = self.signature(factory);

        signature
            .iter()
            .find(|ep| ep.name() == entry_point)
            .map(|ep| ep.parameters().clone())
            .ok_or_else(|| {
                KhazinaError::NoSuchEntryPoint(NoSuchEntryPointError {
                    type_name: factory.name().to_string(),
                    entry_point: entry_point.to_string(),
                    available: signature.iter().map(|ep| ep.name().to_string()).collect(),
                })
            })
    }

    /// Returns the full entry-point table of `factory`, reading it once.
    pub fn signature(&self, factory: &FactoryType) -> Arc<[EntryPoint]> {
        let type_id = factory.type_id();
        if let Some(cached) = self.signatures.get(&type_id) {
            return cached.value().clone();
        }

        trace!(factory = factory.name(), "Reading entry-point table");
        self.signatures
            .entry(type_id)
            .or_insert_with(|| factory.declared_entry_points().into())
            .value()
            .clone()
    }

    /// Number of factory types with a cached table.
    pub fn cached(&self) -> usize {
        self.signatures.len()
    }
}
