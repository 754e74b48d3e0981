//! Type manifolds shipped with the crate.
//!
//! - [`PropertiesManifold`] - `.properties`, dotted keys as nested classes
//! - [`JsonManifold`] - `.json`, inferred object shapes
//! - [`CsvManifold`] - `.csv`/`.tsv`, header row as a `Row` class
//! - [`ImageManifold`] - image headers, types named `<base>_<ext>`

mod csv;
mod image;
mod json;
mod properties;

pub use csv::{CsvManifold, Table, ROW_CLASS};
pub use image::{ImageInfo, ImageManifold};
pub use json::{Field, JsonDocument, JsonManifold, ObjectShape, Shape};
pub use properties::{PropertiesManifold, PropertySet};

use crate::codegen::{ClassBuilder, CompilationUnit};
use crate::fqn::{namespace_of, simple_name};
use crate::model::SingleFileModel;

/// Constant holding the path of the resource a class was generated from.
pub const RESOURCE_FIELD: &str = "__RESOURCE";

/// Top-level class for `fqn`, tagged with its primary file.
fn resource_class<A>(fqn: &str, model: &SingleFileModel<A>) -> ClassBuilder {
    let class = ClassBuilder::new(simple_name(fqn));
    match model.primary() {
        Some(file) => class
            .doc(format!("Generated from {}", file.name()))
            .constant("String", RESOURCE_FIELD, &file.path().to_string()),
        None => class,
    }
}

fn unit(fqn: &str) -> CompilationUnit {
    CompilationUnit::new(namespace_of(fqn))
}
