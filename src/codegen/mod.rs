//! Java source generation.
//!
//! # Modules
//!
//! - `source` - Rust value → Java literal
//! - `builder` - class and compilation-unit builders

mod builder;
mod source;

// Source generation
pub use source::ToJava;

// Builders
pub use builder::{format_array, ClassBuilder, CompilationUnit};
