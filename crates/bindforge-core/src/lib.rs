//! Intermediate representation and emission protocol for generating
//! strongly-typed operator wrappers around a native API.
//!
//! A [`ir::Package`] owns methods, a method owns options, and an option owns
//! an ordered list of argument nodes. Backends implement [`visit::Visitor`]
//! and drive it over the tree with [`visit::walk_package`].

pub mod emit;
pub mod error;
pub mod ir;
pub mod pipeline;
pub mod project;
pub mod visit;

pub use error::CoreError;
