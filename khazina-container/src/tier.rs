//! Registry tiers.
//!
//! A service identifier lives in one or more tiers:
//! - [`Tier::Instance`]: a resolved, cached value
//! - [`Tier::Factory`]: a factory type whose entry point produces the value
//! - [`Tier::Invokable`]: a type instantiated directly as the value
//!
//! # Precedence
//! Lookup order is `Instance`, then `Factory`, then `Invokable`. A cached
//! instance always wins; when both bindings exist, the factory is used.
use std::fmt;

/// One of the three mappings held by the registry.
///
/// # Examples
/// ```
/// use khazina_container::tier::Tier;
///
/// assert_eq!(Tier::LOOKUP_ORDER[0], Tier::Instance);
/// assert!(Tier::Factory < Tier::Invokable);
/// assert!(Tier::Invokable.is_binding());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tier {
    /// Fully resolved values. Terminal: never re-resolved.
    Instance,

    /// Factory bindings. The factory is built fresh, its entry point's
    /// parameters are resolved as services, and its output is cached.
    Factory,

    /// Invokable bindings. The type is instantiated with no injection.
    Invokable,
}

impl Tier {
    /// All tiers in lookup order.
    pub const LOOKUP_ORDER: [Tier; 3] = [Tier::Instance, Tier::Factory, Tier::Invokable];

    /// Returns `true` for the binding tiers, which are consumed on resolve.
    #[inline]
    pub fn is_binding(self) -> bool {
        matches!(self, Tier::Factory | Tier::Invokable)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Instance => write!(f, "instance"),
            Tier::Factory => write!(f, "factory"),
            Tier::Invokable => write!(f, "invokable"),
        }
    }
}
