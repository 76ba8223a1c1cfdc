//! Service identification keys.
//!
//! [`ServiceId`] names a service within a container. It is an opaque
//! string: either chosen freely (`"config"`, `"mailer"`) or derived from a
//! Rust type with [`ServiceId::of`], which is how a declared parameter type
//! doubles as the identifier of the service it asks for.

use std::any::type_name;
use std::borrow::{Borrow, Cow};
use std::fmt;

/// Uniquely identifies a service in the container.
///
/// # Examples
/// ```
/// use khazina_container::key::ServiceId;
///
/// let by_name = ServiceId::new("mailer");
/// assert_eq!(by_name.as_str(), "mailer");
///
/// let by_type = ServiceId::of::<String>();
/// assert_eq!(by_type.as_str(), "alloc::string::String");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceId(Cow<'static, str>);

impl ServiceId {
    /// Identifier under which the raw configuration is pre-seeded.
    pub const CONFIG: ServiceId = ServiceId::from_static("config");

    /// Identifier under which the container's self-reference is pre-seeded.
    pub const CONTAINER: ServiceId = ServiceId::from_static("container");

    /// Creates an identifier from any string.
    #[inline]
    pub fn new(id: impl Into<Cow<'static, str>>) -> Self {
        Self(id.into())
    }

    /// Creates an identifier from a static string, usable in `const` items.
    #[inline]
    pub const fn from_static(id: &'static str) -> Self {
        Self(Cow::Borrowed(id))
    }

    /// Creates the identifier for type `T`: its fully qualified type name.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self(Cow::Borrowed(type_name::<T>()))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ServiceId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ServiceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for ServiceId {
    fn from(id: &'static str) -> Self {
        Self::from_static(id)
    }
}

impl From<String> for ServiceId {
    fn from(id: String) -> Self {
        Self(Cow::Owned(id))
    }
}

impl From<&ServiceId> for ServiceId {
    fn from(id: &ServiceId) -> Self {
        id.clone()
    }
}

impl fmt::Debug for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceId({:?})", self.0)
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
