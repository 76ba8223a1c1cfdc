//! Dependency graph validation.
//!
//! Walks the declared signatures of pending factory bindings without
//! instantiating anything:
//! - Detects circular dependencies
//! - Checks that every parameter names a registered service
//! - Checks that every factory exposes the configured entry point
//!
//! Resolution performs its own cycle tracking; this is the up-front check
//! behind [`Container::validate`](crate::container::Container::validate).

use std::collections::{HashMap, HashSet};

use khazina_support::rendering::suggest_similar;
use tracing::{debug, instrument, warn};

use crate::error::{CircularDependencyError, KhazinaError, ServiceNotFoundError};
use crate::introspect::Introspector;
use crate::key::ServiceId;
use crate::registry::{Binding, Registry};

/// What a registered identifier needs before it can be produced.
#[derive(Debug, Clone)]
pub(crate) struct DependencyInfo {
    pub dependencies: Vec<ServiceId>,
}

/// Validates the dependency graph for correctness.
///
/// # Algorithm
/// Depth-first search with a "visiting" set; meeting a node that is still
/// being visited closes a cycle, which is cut out of the current path.
pub(crate) struct GraphValidator {
    nodes: HashMap<ServiceId, DependencyInfo>,
    visiting: HashSet<ServiceId>,
    validated: HashSet<ServiceId>,
    path: Vec<ServiceId>,
}

impl GraphValidator {
    /// Builds the graph from a registry snapshot.
    ///
    /// Instances are leaves. Invokables are leaves. Factories depend on the
    /// services named by their entry point's parameters.
    pub fn from_registry(
        registry: &Registry,
        introspector: &Introspector,
        entry_point: &str,
    ) -> Result<Self, KhazinaError> {
        let mut nodes = HashMap::new();

        for id in registry.ids() {
            let dependencies = match registry.instance(id.as_str()) {
                Some(_) => Vec::new(),
                None => match registry.binding(id.as_str()) {
                    Some(Binding::Factory(factory)) => introspector
                        .parameters(&factory, entry_point)?
                        .iter()
                        .map(|p| p.service_id())
                        .collect(),
                    Some(Binding::Invokable(_)) | None => Vec::new(),
                },
            };
            nodes.insert(id.clone(), DependencyInfo { dependencies });
        }

        Ok(Self::new(nodes))
    }

    pub fn new(nodes: HashMap<ServiceId, DependencyInfo>) -> Self {
        Self {
            nodes,
            visiting: HashSet::new(),
            validated: HashSet::new(),
            path: Vec::new(),
        }
    }

    /// Validates the entire graph.
    ///
    /// # Errors
    /// - [`KhazinaError::CircularDependency`]: cycle detected
    /// - [`KhazinaError::NotRegistered`]: a parameter names nothing
    #[instrument(skip(self), name = "graph_validation")]
    pub fn validate(&mut self) -> Result<(), KhazinaError> {
        let mut ids: Vec<ServiceId> = self.nodes.keys().cloned().collect();
        ids.sort();

        debug!(nodes = ids.len(), "Starting dependency graph validation");

        for id in ids {
            self.visit(&id)?;
        }

        debug!("Dependency graph validation passed");
        Ok(())
    }

    fn visit(&mut self, id: &ServiceId) -> Result<(), KhazinaError> {
        if self.validated.contains(id) {
            return Ok(());
        }

        if self.visiting.contains(id) {
            let start = self.path.iter().position(|k| k == id).unwrap_or(0);
            let mut chain = self.path[start..].to_vec();
            chain.push(id.clone());

            warn!(cycle = ?chain, "Circular dependency detected");
            return Err(KhazinaError::CircularDependency(CircularDependencyError { chain }));
        }

        let info = self.nodes.get(id).cloned().ok_or_else(|| {
            KhazinaError::NotRegistered(ServiceNotFoundError {
                requested: id.clone(),
                required_by: self.path.last().cloned(),
                suggestions: self.similar(id),
            })
        })?;

        self.visiting.insert(id.clone());
        self.path.push(id.clone());

        for dependency in &info.dependencies {
            self.visit(dependency)?;
        }

        self.path.pop();
        self.visiting.remove(id);
        self.validated.insert(id.clone());

        Ok(())
    }

    fn similar(&self, id: &ServiceId) -> Vec<String> {
        let known: Vec<&str> = self.nodes.keys().map(ServiceId::as_str).collect();
        suggest_similar(id.as_str(), &known, 3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;
    use crate::factory::{Arguments, Factory, FactoryType, InvokableType, Service, into_service};
    use crate::introspect::{EntryPoint, ParameterDescriptor};

    fn node(deps: &[&'static str]) -> DependencyInfo {
        DependencyInfo {
            dependencies: deps.iter().map(|d| ServiceId::from(*d)).collect(),
        }
    }

    fn graph(entries: &[(&'static str, &[&'static str])]) -> HashMap<ServiceId, DependencyInfo> {
        entries
            .iter()
            .map(|(id, deps)| (ServiceId::from(*id), node(deps)))
            .collect()
    }

    #[test]
    fn valid_chain() {
        let mut validator = GraphValidator::new(graph(&[
            ("config", &[]),
            ("db", &["config"]),
            ("users", &["db", "config"]),
        ]));
        assert!(validator.validate().is_ok());
    }

    #[test]
    fn detect_two_node_cycle() {
        let mut validator = GraphValidator::new(graph(&[("X", &["Y"]), ("Y", &["X"])]));

        match validator.validate().unwrap_err() {
            KhazinaError::CircularDependency(err) => {
                assert_eq!(err.chain.len(), 3);
                assert_eq!(err.chain.first(), err.chain.last());
            }
            other => panic!("Expected CircularDependency, got: {other:?}"),
        }
    }

    #[test]
    fn detect_self_dependency() {
        let mut validator = GraphValidator::new(graph(&[("A", &["A"])]));
        assert!(matches!(
            validator.validate(),
            Err(KhazinaError::CircularDependency(_))
        ));
    }

    #[test]
    fn cycle_excludes_the_entry_path() {
        // entry → A → B → C → A
        let mut validator = GraphValidator::new(graph(&[
            ("0-entry", &["A"]),
            ("A", &["B"]),
            ("B", &["C"]),
            ("C", &["A"]),
        ]));

        match validator.validate().unwrap_err() {
            KhazinaError::CircularDependency(err) => {
                let chain: Vec<&str> = err.chain.iter().map(ServiceId::as_str).collect();
                assert_eq!(chain, vec!["A", "B", "C", "A"]);
            }
            other => panic!("Expected CircularDependency, got: {other:?}"),
        }
    }

    #[test]
    fn detect_missing_dependency() {
        let mut validator = GraphValidator::new(graph(&[("mailer", &["transprt"]), ("transport", &[])]));

        match validator.validate().unwrap_err() {
            KhazinaError::NotRegistered(err) => {
                assert_eq!(err.requested.as_str(), "transprt");
                assert_eq!(err.required_by, Some(ServiceId::new("mailer")));
                assert_eq!(err.suggestions, vec!["transport".to_string()]);
            }
            other => panic!("Expected NotRegistered, got: {other:?}"),
        }
    }

    #[test]
    fn diamond_is_not_a_cycle() {
        let mut validator = GraphValidator::new(graph(&[
            ("A", &["B", "C"]),
            ("B", &["D"]),
            ("C", &["D"]),
            ("D", &[]),
        ]));
        assert!(validator.validate().is_ok());
    }

    #[derive(Default)]
    struct Clock;

    #[derive(Default)]
    struct DatabaseFactory;

    impl Factory for DatabaseFactory {
        fn entry_points() -> Vec<EntryPoint> {
            vec![EntryPoint::new(
                "invoke",
                vec![ParameterDescriptor::named("config"), ParameterDescriptor::named("clock")],
            )]
        }

        fn call(&self, _: &str, _: Arguments) -> std::result::Result<Service, BoxError> {
            Ok(into_service(()))
        }
    }

    #[test]
    fn builds_nodes_from_registry_tiers() {
        let mut registry = Registry::new();
        registry.seed(ServiceId::CONFIG, into_service(()));
        registry.set_invokable("clock".into(), InvokableType::of::<Clock>(), true).unwrap();
        registry.set_factory("db".into(), FactoryType::of::<DatabaseFactory>(), true).unwrap();

        let introspector = Introspector::new();
        let mut validator = GraphValidator::from_registry(&registry, &introspector, "invoke").unwrap();

        let db = &validator.nodes[&ServiceId::new("db")];
        assert_eq!(db.dependencies, vec![ServiceId::CONFIG, ServiceId::new("clock")]);
        assert!(validator.nodes[&ServiceId::new("clock")].dependencies.is_empty());
        assert!(validator.nodes[&ServiceId::CONFIG].dependencies.is_empty());
        assert!(validator.validate().is_ok());
    }

    #[test]
    fn registry_snapshot_needs_the_entry_point() {
        let mut registry = Registry::new();
        registry.set_factory("db".into(), FactoryType::of::<DatabaseFactory>(), true).unwrap();

        let result = GraphValidator::from_registry(&registry, &Introspector::new(), "build");
        assert!(matches!(result, Err(KhazinaError::NoSuchEntryPoint(_))));
    }
}
