//! Service registry: the three tiers a service identifier can live in.
//!
//! The registry maps [`ServiceId`] to resolved instances, factory bindings
//! and invokable bindings. Bindings are consumed when their identifier is
//! resolved: the produced value moves into the instance tier for good.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{AlreadyRegisteredError, KhazinaError};
use crate::factory::{FactoryType, InvokableType, Service};
use crate::key::ServiceId;
use crate::tier::Tier;

/// A pending binding, cloned out of the registry for resolution.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Binding {
    Factory(FactoryType),
    Invokable(InvokableType),
}

impl Binding {
    pub fn tier(&self) -> Tier {
        match self {
            Binding::Factory(_) => Tier::Factory,
            Binding::Invokable(_) => Tier::Invokable,
        }
    }
}

/// Stores instances and bindings.
#[derive(Default)]
pub(crate) struct Registry {
    instances: HashMap<ServiceId, Service>,
    factories: HashMap<ServiceId, FactoryType>,
    invokables: HashMap<ServiceId, InvokableType>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a resolved instance.
    ///
    /// # Errors
    /// Returns [`KhazinaError::AlreadyRegistered`] if `id` already has an
    /// instance and `overwrite` is false.
    pub fn set_instance(
        &mut self,
        id: ServiceId,
        value: Service,
        overwrite: bool,
    ) -> Result<(), KhazinaError> {
        check_vacant(&self.instances, &id, Tier::Instance, overwrite)?;
        debug!(id = %id, tier = %Tier::Instance, "Registered service");
        self.instances.insert(id, value);
        Ok(())
    }

    /// Registers a factory binding. The check ignores the other tiers.
    pub fn set_factory(
        &mut self,
        id: ServiceId,
        factory: FactoryType,
        overwrite: bool,
    ) -> Result<(), KhazinaError> {
        check_vacant(&self.factories, &id, Tier::Factory, overwrite)?;
        debug!(id = %id, factory = factory.name(), "Registered factory");
        self.factories.insert(id, factory);
        Ok(())
    }

    /// Registers an invokable binding. The check ignores the other tiers.
    pub fn set_invokable(
        &mut self,
        id: ServiceId,
        invokable: InvokableType,
        overwrite: bool,
    ) -> Result<(), KhazinaError> {
        check_vacant(&self.invokables, &id, Tier::Invokable, overwrite)?;
        debug!(id = %id, invokable = invokable.name(), "Registered invokable");
        self.invokables.insert(id, invokable);
        Ok(())
    }

    /// Installs a pre-seeded instance, unconditionally.
    pub fn seed(&mut self, id: ServiceId, value: Service) {
        debug!(id = %id, "Seeded service");
        self.instances.insert(id, value);
    }

    /// Stores the product of a binding and drops every binding for `id`.
    pub fn complete(&mut self, id: ServiceId, value: Service) {
        self.factories.remove(&id);
        self.invokables.remove(&id);
        self.instances.insert(id, value);
    }

    pub fn instance(&self, id: &str) -> Option<&Service> {
        self.instances.get(id)
    }

    /// Pending binding for `id`, factory first.
    pub fn binding(&self, id: &str) -> Option<Binding> {
        Tier::LOOKUP_ORDER
            .into_iter()
            .filter(|tier| tier.is_binding())
            .find_map(|tier| match tier {
                Tier::Factory => self.factories.get(id).copied().map(Binding::Factory),
                Tier::Invokable => self.invokables.get(id).copied().map(Binding::Invokable),
                Tier::Instance => None,
            })
    }

    /// True iff `id` is present in any tier.
    pub fn has(&self, id: &str) -> bool {
        self.tier(id).is_some()
    }

    /// First tier, in lookup order, that holds `id`.
    pub fn tier(&self, id: &str) -> Option<Tier> {
        Tier::LOOKUP_ORDER
            .into_iter()
            .find(|tier| self.contains(*tier, id))
    }

    pub fn contains(&self, tier: Tier, id: &str) -> bool {
        match tier {
            Tier::Instance => self.instances.contains_key(id),
            Tier::Factory => self.factories.contains_key(id),
            Tier::Invokable => self.invokables.contains_key(id),
        }
    }

    pub fn len(&self, tier: Tier) -> usize {
        match tier {
            Tier::Instance => self.instances.len(),
            Tier::Factory => self.factories.len(),
            Tier::Invokable => self.invokables.len(),
        }
    }

    /// Every identifier present in any tier, sorted and deduplicated.
    pub fn ids(&self) -> Vec<&ServiceId> {
        let mut ids: Vec<&ServiceId> = self
            .instances
            .keys()
            .chain(self.factories.keys())
            .chain(self.invokables.keys())
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }
}

fn check_vacant<V>(
    tier_map: &HashMap<ServiceId, V>,
    id: &ServiceId,
    tier: Tier,
    overwrite: bool,
) -> Result<(), KhazinaError> {
    if !overwrite && tier_map.contains_key(id) {
        return Err(KhazinaError::AlreadyRegistered(AlreadyRegisteredError {
            id: id.clone(),
            tier,
        }));
    }
    Ok(())
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("instances", &self.instances.len())
            .field("factories", &self.factories)
            .field("invokables", &self.invokables)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;
    use crate::factory::{Arguments, Factory, into_service};
    use crate::introspect::EntryPoint;

    #[derive(Default)]
    struct Database;

    #[derive(Default)]
    struct DatabaseFactory;

    impl Factory for DatabaseFactory {
        fn entry_points() -> Vec<EntryPoint> {
            vec![EntryPoint::new("invoke", vec![])]
        }

        fn call(&self, _: &str, _: Arguments) -> Result<Service, BoxError> {
            Ok(into_service(Database))
        }
    }

    fn db() -> ServiceId {
        ServiceId::new("db")
    }

    #[test]
    fn set_instance_and_get() {
        let mut reg = Registry::new();
        reg.set_instance(db(), into_service(1u8), true).unwrap();
        assert!(reg.instance("db").is_some());
        assert!(reg.has("db"));
    }

    #[test]
    fn duplicate_without_overwrite_fails_and_keeps_original() {
        let mut reg = Registry::new();
        reg.set_instance(db(), into_service(1u8), false).unwrap();

        let err = reg.set_instance(db(), into_service(2u8), false).unwrap_err();
        match err {
            KhazinaError::AlreadyRegistered(e) => assert_eq!(e.tier, Tier::Instance),
            other => panic!("Expected AlreadyRegistered, got: {other:?}"),
        }

        let kept = reg.instance("db").unwrap().clone().downcast::<u8>().unwrap();
        assert_eq!(*kept, 1);
    }

    #[test]
    fn duplicate_with_overwrite_replaces() {
        let mut reg = Registry::new();
        reg.set_factory(db(), FactoryType::of::<DatabaseFactory>(), false).unwrap();
        let other = FactoryType::named::<DatabaseFactory>("other");
        reg.set_factory(db(), other, true).unwrap();

        match reg.binding("db") {
            Some(Binding::Factory(ty)) => assert_eq!(ty.name(), "other"),
            other => panic!("Expected factory binding, got: {other:?}"),
        }
    }

    #[test]
    fn tiers_are_checked_independently() {
        let mut reg = Registry::new();
        reg.set_factory(db(), FactoryType::of::<DatabaseFactory>(), false).unwrap();
        reg.set_invokable(db(), InvokableType::of::<Database>(), false).unwrap();
        reg.set_instance(db(), into_service(Database), false).unwrap();

        assert!(Tier::LOOKUP_ORDER.iter().all(|t| reg.contains(*t, "db")));
        assert_eq!(reg.ids().len(), 1);
    }

    #[test]
    fn factory_binding_precedes_invokable() {
        let mut reg = Registry::new();
        reg.set_invokable(db(), InvokableType::of::<Database>(), true).unwrap();
        reg.set_factory(db(), FactoryType::of::<DatabaseFactory>(), true).unwrap();

        assert_eq!(reg.binding("db").map(|b| b.tier()), Some(Tier::Factory));
        assert_eq!(reg.tier("db"), Some(Tier::Factory));
    }

    #[test]
    fn binding_ignores_instance_tier() {
        let mut reg = Registry::new();
        reg.set_instance(db(), into_service(Database), true).unwrap();
        assert!(reg.binding("db").is_none());

        reg.set_invokable(db(), InvokableType::of::<Database>(), true).unwrap();
        assert_eq!(reg.binding("db").map(|b| b.tier()), Some(Tier::Invokable));
        assert_eq!(reg.tier("db"), Some(Tier::Instance));
    }

    #[test]
    fn complete_moves_binding_to_instance_tier() {
        let mut reg = Registry::new();
        reg.set_factory(db(), FactoryType::of::<DatabaseFactory>(), true).unwrap();
        reg.set_invokable(db(), InvokableType::of::<Database>(), true).unwrap();

        reg.complete(db(), into_service(Database));

        assert_eq!(reg.tier("db"), Some(Tier::Instance));
        assert!(reg.binding("db").is_none());
        assert_eq!(reg.len(Tier::Factory), 0);
        assert_eq!(reg.len(Tier::Invokable), 0);
    }

    #[test]
    fn absent_id_is_not_present() {
        let reg = Registry::new();
        assert!(!reg.has("db"));
        assert_eq!(reg.tier("db"), None);
    }
}
