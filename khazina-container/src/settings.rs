//! Container settings.
//!
//! All fields default, so settings can be deserialized from a partial
//! mapping (for instance a `container` section of the application config).

use serde::Deserialize;

use crate::introspect::DEFAULT_ENTRY_POINT;

/// Knobs that shape how a container binds and resolves.
///
/// # Examples
/// ```
/// use khazina_container::settings::ContainerSettings;
///
/// let settings: ContainerSettings =
///     serde_json::from_value(serde_json::json!({ "entry_point": "build" })).unwrap();
/// assert_eq!(settings.entry_point, "build");
/// assert!(settings.allow_override);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContainerSettings {
    /// Entry point introspected and invoked on factory types.
    pub entry_point: String,
    /// Overwrite flag the configuration binder registers with.
    pub allow_override: bool,
    /// Whether direct children of the root configuration are scanned
    /// for their own `dependencies` section.
    pub bind_modules: bool,
}

impl Default for ContainerSettings {
    fn default() -> Self {
        Self {
            entry_point: DEFAULT_ENTRY_POINT.to_string(),
            allow_override: true,
            bind_modules: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults() {
        let settings = ContainerSettings::default();
        assert_eq!(settings.entry_point, "invoke");
        assert!(settings.allow_override);
        assert!(settings.bind_modules);
    }

    #[test]
    fn empty_mapping_gives_defaults() {
        let settings: ContainerSettings = serde_json::from_value(json!({})).unwrap();
        assert_eq!(settings, ContainerSettings::default());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result = serde_json::from_value::<ContainerSettings>(json!({ "entrypoint": "x" }));
        assert!(result.is_err());
    }
}
