//! Configuration binder.
//!
//! Walks a configuration value and registers the bindings found under
//! `dependencies.factories` and `dependencies.invokables`, first on the root
//! and then on every direct child that carries its own `dependencies` key.
//!
//! ```text
//! {
//!   "dependencies": {
//!     "factories":  { "mailer": "app::MailerFactory" },
//!     "invokables": { "clock":  "app::Clock" }
//!   },
//!   "billing": {
//!     "dependencies": { "factories": { "invoices": "billing::InvoiceFactory" } }
//!   }
//! }
//! ```

use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::catalog::TypeCatalog;
use crate::error::{KhazinaError, Result};
use crate::key::ServiceId;
use crate::registry::Registry;
use crate::tier::Tier;

const DEPENDENCIES: &str = "dependencies";
const FACTORIES: &str = "factories";
const INVOKABLES: &str = "invokables";

/// Registers configuration bindings into a registry.
pub(crate) struct Binder<'a> {
    catalog: &'a TypeCatalog,
    overwrite: bool,
}

impl<'a> Binder<'a> {
    pub fn new(catalog: &'a TypeCatalog, overwrite: bool) -> Self {
        Self { catalog, overwrite }
    }

    /// Binds the root section, then each module section if `modules` is set.
    ///
    /// Returns the number of bindings registered.
    pub fn bind(&self, registry: &mut Registry, config: &Value, modules: bool) -> Result<usize> {
        let mut bound = self.bind_section(registry, config, "")?;

        if modules && let Value::Object(root) = config {
            for (name, child) in root {
                if has_dependencies(child) {
                    trace!(module = %name, "Binding configuration module");
                    bound += self.bind_section(registry, child, name)?;
                }
            }
        }

        Ok(bound)
    }

    fn bind_section(&self, registry: &mut Registry, section: &Value, path: &str) -> Result<usize> {
        let Some(dependencies) = section.get(DEPENDENCIES) else {
            return Ok(0);
        };
        let path = join(path, DEPENDENCIES);
        let dependencies = as_mapping(dependencies, &path)?;

        let mut bound = 0;

        if let Some(factories) = dependencies.get(FACTORIES) {
            let path = join(&path, FACTORIES);
            for (id, reference) in as_mapping(factories, &path)? {
                let reference = as_reference(reference, &join(&path, id))?;
                let factory = self.catalog.factory(reference)?;
                registry.set_factory(ServiceId::new(id.clone()), factory, self.overwrite)?;
                bound += 1;
            }
        }

        if let Some(invokables) = dependencies.get(INVOKABLES) {
            let path = join(&path, INVOKABLES);
            for (id, reference) in as_mapping(invokables, &path)? {
                let reference = as_reference(reference, &join(&path, id))?;
                let invokable = self.catalog.invokable(reference)?;
                registry.set_invokable(ServiceId::new(id.clone()), invokable, self.overwrite)?;
                bound += 1;
            }
        }

        debug!(
            section = %path,
            bound,
            factories = registry.len(Tier::Factory),
            invokables = registry.len(Tier::Invokable),
            "Bound configuration section"
        );
        Ok(bound)
    }
}

fn has_dependencies(value: &Value) -> bool {
    value.as_object().is_some_and(|m| m.contains_key(DEPENDENCIES))
}

fn as_mapping<'v>(value: &'v Value, path: &str) -> Result<&'v Map<String, Value>> {
    value.as_object().ok_or_else(|| KhazinaError::InvalidConfiguration {
        path: path.to_string(),
        reason: format!("expected a mapping, found {}", kind(value)),
    })
}

fn as_reference<'v>(value: &'v Value, path: &str) -> Result<&'v str> {
    value.as_str().ok_or_else(|| KhazinaError::InvalidConfiguration {
        path: path.to_string(),
        reason: format!("expected a type name, found {}", kind(value)),
    })
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

fn join(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}
