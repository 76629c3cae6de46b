//! Shared types and pure-logic primitives for the `same` vault engine.
//!
//! This crate holds the pieces every other `same-*` crate depends on:
//! the data model, the [`path_guard`] module that
//! is the single entry point for any externally-supplied path, the
//! [`sanitize`] module that neutralizes prompt-injection-shaped text before
//! it leaves the core, and the shared [`error`] classification every
//! crate's local error type hooks into.

pub mod error;
pub mod model;
pub mod path_guard;
pub mod sanitize;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use error::{Classify, ErrorKind};
pub use path_guard::PathGuard;
