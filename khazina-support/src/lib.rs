//! # Khazina Support
//!
//! Shared utilities for the Khazina service registry.
//!
//! This crate provides:
//! - Text rendering for error messages (dependency chains, suggestions)
//! - Edit-distance helpers used for "did you mean?" hints

pub mod rendering;
