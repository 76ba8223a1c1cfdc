//! # Khazina: configuration-driven service registry for Rust
//!
//! Map identifiers to factory or invokable types in configuration, and
//! let the container build each service on first request, injecting the
//! services its factory's entry point declares.
//!
//! ```rust
//! use khazina::prelude::*;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[derive(Default)]
//! struct Clock;
//!
//! let catalog = TypeCatalog::new().with_invokable::<Clock>("app.Clock");
//! let container = Container::builder()
//!     .config(json!({ "dependencies": { "invokables": { "clock": "app.Clock" } } }))
//!     .catalog(catalog)
//!     .build()?;
//!
//! let first: Arc<Clock> = container.get_as("clock")?;
//! let second: Arc<Clock> = container.get_as("clock")?;
//! assert!(Arc::ptr_eq(&first, &second));
//! # Ok::<(), KhazinaError>(())
//! ```

pub use khazina_container::*;
pub use khazina_derive::*;
pub use khazina_support::*;

pub mod prelude {
    pub use khazina_container::prelude::*;
    pub use khazina_derive::{Invokable, factory};
}
