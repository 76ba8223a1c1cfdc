//! Re-exports of the Khazina procedural macros.

pub use khazina_macros::{Invokable, factory};
