//! Sift kernel library.
//!
//! Builds SQL filter conditions from query-string style `(key, value)` pairs
//! against a declared field set, and dispatches entity hydration to
//! per-class hydrators. The `sift` binary renders a schema's SELECT for a
//! query string.

pub mod attribute;
pub mod condition;
pub mod config;
pub mod container;
pub mod error;
pub mod field;
pub mod hydrator;
