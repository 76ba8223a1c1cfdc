//! Type catalog: resolves type references found in configuration.
//!
//! Configuration names factory and invokable types by string. The catalog
//! maps those strings to [`FactoryType`] / [`InvokableType`] values. It is
//! filled explicitly, from the registrations `#[factory]` and
//! `#[derive(Invokable)]` submit at compile time, or both.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use tracing::debug;

use crate::error::{KhazinaError, Result};
use crate::factory::{Factory, FactoryType, InvokableType};
use crate::tier::Tier;

static COLLECTED: Lazy<TypeCatalog> = Lazy::new(|| {
    let mut catalog = TypeCatalog::new();
    for factory in inventory::iter::<FactoryType> {
        catalog.insert_factory(*factory);
    }
    for invokable in inventory::iter::<InvokableType> {
        catalog.insert_invokable(*invokable);
    }
    debug!(
        factories = catalog.factories.len(),
        invokables = catalog.invokables.len(),
        "Collected compile-time type registrations"
    );
    catalog
});

/// Name → type lookup used by the configuration binder.
///
/// # Examples
/// ```
/// use khazina_container::catalog::TypeCatalog;
///
/// #[derive(Default)]
/// struct Clock;
///
/// let catalog = TypeCatalog::new().with_invokable::<Clock>("app.clock");
/// assert!(catalog.invokable("app.clock").is_ok());
/// assert!(catalog.invokable("app.calendar").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct TypeCatalog {
    factories: HashMap<&'static str, FactoryType>,
    invokables: HashMap<&'static str, InvokableType>,
}

impl TypeCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every type registered at compile time across the linked crates.
    pub fn collected() -> Self {
        COLLECTED.clone()
    }

    /// Adds a factory type under `name`.
    pub fn with_factory<F: Factory + Default>(mut self, name: &'static str) -> Self {
        self.insert_factory(FactoryType::named::<F>(name));
        self
    }

    /// Adds an invokable type under `name`.
    pub fn with_invokable<T: Default + Send + Sync + 'static>(mut self, name: &'static str) -> Self {
        self.insert_invokable(InvokableType::named::<T>(name));
        self
    }

    pub fn insert_factory(&mut self, factory: FactoryType) {
        self.factories.insert(factory.name(), factory);
    }

    pub fn insert_invokable(&mut self, invokable: InvokableType) {
        self.invokables.insert(invokable.name(), invokable);
    }

    /// Adds everything from `other`, replacing same-named entries.
    pub fn merge(mut self, other: TypeCatalog) -> Self {
        self.factories.extend(other.factories);
        self.invokables.extend(other.invokables);
        self
    }

    /// Looks up a factory type by reference.
    ///
    /// # Errors
    /// [`KhazinaError::UnknownType`] if nothing is registered under `reference`.
    pub fn factory(&self, reference: &str) -> Result<FactoryType> {
        self.factories
            .get(reference)
            .copied()
            .ok_or_else(|| unknown(reference, Tier::Factory))
    }

    /// Looks up an invokable type by reference.
    pub fn invokable(&self, reference: &str) -> Result<InvokableType> {
        self.invokables
            .get(reference)
            .copied()
            .ok_or_else(|| unknown(reference, Tier::Invokable))
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty() && self.invokables.is_empty()
    }
}

fn unknown(reference: &str, tier: Tier) -> KhazinaError {
    KhazinaError::UnknownType {
        reference: reference.to_string(),
        tier,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;
    use crate::factory::{Arguments, Service, into_service};
    use crate::introspect::EntryPoint;

    #[derive(Default)]
    struct Clock;

    #[derive(Default)]
    struct ClockFactory;

    impl Factory for ClockFactory {
        fn entry_points() -> Vec<EntryPoint> {
            vec![EntryPoint::new("invoke", vec![])]
        }

        fn call(&self, _: &str, _: Arguments) -> std::result::Result<Service, BoxError> {
            Ok(into_service(Clock))
        }
    }

    inventory::submit! {
        FactoryType::named::<ClockFactory>("catalog_tests::ClockFactory")
    }

    #[test]
    fn explicit_entries() {
        let catalog = TypeCatalog::new()
            .with_factory::<ClockFactory>("clock.factory")
            .with_invokable::<Clock>("clock");

        assert_eq!(catalog.factory("clock.factory").unwrap().name(), "clock.factory");
        assert_eq!(catalog.invokable("clock").unwrap().name(), "clock");
    }

    #[test]
    fn tiers_do_not_share_names() {
        let catalog = TypeCatalog::new().with_invokable::<Clock>("clock");

        match catalog.factory("clock").unwrap_err() {
            KhazinaError::UnknownType { reference, tier } => {
                assert_eq!(reference, "clock");
                assert_eq!(tier, Tier::Factory);
            }
            other => panic!("Expected UnknownType, got: {other:?}"),
        }
    }

    #[test]
    fn collected_includes_submitted_types() {
        let catalog = TypeCatalog::collected();
        assert!(catalog.factory("catalog_tests::ClockFactory").is_ok());
    }

    #[test]
    fn merge_prefers_other() {
        let base = TypeCatalog::new().with_factory::<ClockFactory>("clock");
        let merged = base.merge(TypeCatalog::new().with_invokable::<Clock>("clock"));

        assert!(merged.factory("clock").is_ok());
        assert!(merged.invokable("clock").is_ok());
        assert!(!merged.is_empty());
    }
}
