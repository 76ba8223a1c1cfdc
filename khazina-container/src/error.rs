//! Error types for Khazina container operations.
//!
//! Every failure names the service it is about, and where possible what
//! asked for it and what the caller probably meant.

use std::fmt;

use khazina_support::rendering::{render_chain, shorten_identifier};

use crate::key::ServiceId;
use crate::tier::Tier;

/// Boxed error returned by factory code.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for all Khazina operations.
#[derive(Debug, thiserror::Error)]
pub enum KhazinaError {
    /// Requested service is absent from every tier.
    #[error("{}", .0)]
    NotRegistered(ServiceNotFoundError),

    /// Registration with overwrite disabled hit an existing entry.
    #[error("{}", .0)]
    AlreadyRegistered(AlreadyRegisteredError),

    /// A factory type does not expose the entry point being invoked.
    #[error("{}", .0)]
    NoSuchEntryPoint(NoSuchEntryPointError),

    /// Circular dependency detected during resolve.
    #[error("{}", .0)]
    CircularDependency(CircularDependencyError),

    /// Factory returned an error while producing the service.
    #[error("Failed to construct {id}: {source}")]
    ConstructionFailed {
        id: ServiceId,
        #[source]
        source: BoxError,
    },

    /// A resolved value is not of the type the caller asked for.
    #[error("Type mismatch for {id}: expected {expected}")]
    TypeMismatch {
        id: ServiceId,
        expected: &'static str,
    },

    /// Configuration names a type the catalog does not know.
    #[error("Unknown {tier} type {reference:?}\n  Hint: Is it annotated with #[factory] / #[derive(Invokable)], or added to the TypeCatalog?")]
    UnknownType { reference: String, tier: Tier },

    /// Configuration has the wrong shape at `path`.
    #[error("Invalid configuration at {path}: {reason}")]
    InvalidConfiguration { path: String, reason: String },
}

impl KhazinaError {
    /// Returns the service identifier this error is about, if any.
    pub fn service_id(&self) -> Option<&ServiceId> {
        match self {
            Self::NotRegistered(e) => Some(&e.requested),
            Self::AlreadyRegistered(e) => Some(&e.id),
            Self::CircularDependency(e) => e.chain.first(),
            Self::ConstructionFailed { id, .. } | Self::TypeMismatch { id, .. } => Some(id),
            Self::NoSuchEntryPoint(_) | Self::UnknownType { .. } | Self::InvalidConfiguration { .. } => None,
        }
    }
}

/// Error when a service is not present in any tier.
#[derive(Debug)]
pub struct ServiceNotFoundError {
    /// The identifier that was requested
    pub requested: ServiceId,
    /// The service whose factory asked for it (if any)
    pub required_by: Option<ServiceId>,
    /// Similar identifiers that ARE registered
    pub suggestions: Vec<String>,
}

impl fmt::Display for ServiceNotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Container does not have service with name {}", self.requested)?;

        if let Some(ref parent) = self.required_by {
            write!(f, "\n  Required by: {parent}")?;
        }

        if !self.suggestions.is_empty() {
            write!(f, "\n  Did you mean one of:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n    - {suggestion}")?;
            }
        }

        Ok(())
    }
}

/// Error when registering over an existing entry with overwrite disabled.
#[derive(Debug)]
pub struct AlreadyRegisteredError {
    pub id: ServiceId,
    pub tier: Tier,
}

impl fmt::Display for AlreadyRegisteredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} already declared", capitalize(self.tier), self.id)?;
        write!(f, "\n  Hint: Pass overwrite = true to replace it")
    }
}

fn capitalize(tier: Tier) -> &'static str {
    match tier {
        Tier::Instance => "Service",
        Tier::Factory => "Factory",
        Tier::Invokable => "Invokable",
    }
}

/// Error when a factory type lacks the requested entry point.
#[derive(Debug)]
pub struct NoSuchEntryPointError {
    /// Name of the factory type
    pub type_name: String,
    /// Entry point that was looked up
    pub entry_point: String,
    /// Entry points the type does expose
    pub available: Vec<String>,
}

impl fmt::Display for NoSuchEntryPointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Factory {} has no entry point `{}`",
            shorten_identifier(&self.type_name),
            self.entry_point,
        )?;
        if self.available.is_empty() {
            write!(f, "\n  It declares no entry points at all")
        } else {
            write!(f, "\n  Available: {}", self.available.join(", "))
        }
    }
}

/// Error when a circular dependency is detected.
///
/// The chain starts and ends with the same identifier.
#[derive(Debug)]
pub struct CircularDependencyError {
    /// Example: ["X", "Y", "X"]
    pub chain: Vec<ServiceId>,
}

impl fmt::Display for CircularDependencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Circular dependency detected:\n  {}", render_chain(&self.chain))?;
        write!(
            f,
            "\n  Hint: Inject the container and resolve one side lazily, or restructure the factories"
        )
    }
}

/// Convenient Result type for Khazina operations.
pub type Result<T> = std::result::Result<T, KhazinaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let err = KhazinaError::NotRegistered(ServiceNotFoundError {
            requested: ServiceId::new("mailr"),
            required_by: Some(ServiceId::new("newsletter")),
            suggestions: vec!["mailer".into()],
        });

        let msg = err.to_string();
        assert!(msg.contains("does not have service with name mailr"));
        assert!(msg.contains("Required by: newsletter"));
        assert!(msg.contains("- mailer"));
    }

    #[test]
    fn already_registered_names_tier() {
        let err = KhazinaError::AlreadyRegistered(AlreadyRegisteredError {
            id: ServiceId::new("db"),
            tier: Tier::Factory,
        });
        assert!(err.to_string().starts_with("Factory db already declared"));
    }

    #[test]
    fn circular_dependency_display() {
        let err = KhazinaError::CircularDependency(CircularDependencyError {
            chain: vec![ServiceId::new("X"), ServiceId::new("Y"), ServiceId::new("X")],
        });

        let msg = err.to_string();
        assert!(msg.contains("Circular"));
        assert!(msg.contains("X → Y → X"));
        assert_eq!(err.service_id(), Some(&ServiceId::new("X")));
    }

    #[test]
    fn missing_entry_point_lists_alternatives() {
        let err = KhazinaError::NoSuchEntryPoint(NoSuchEntryPointError {
            type_name: "app::factories::MailerFactory".into(),
            entry_point: "invoke".into(),
            available: vec!["build".into()],
        });

        let msg = err.to_string();
        assert!(msg.contains("MailerFactory has no entry point `invoke`"));
        assert!(msg.contains("Available: build"));
    }

    #[test]
    fn construction_failed_keeps_source() {
        use std::error::Error as _;

        let err = KhazinaError::ConstructionFailed {
            id: ServiceId::new("db"),
            source: "connection refused".into(),
        };
        assert!(err.to_string().contains("Failed to construct db"));
        assert!(err.source().is_some());
    }
}
