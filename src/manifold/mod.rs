//! Type manifolds: per-resource-kind source generation.
//!
//! ```text
//! TypeManifold (format knowledge: parse, declarations, contribute)
//!      │
//!      ▼
//! ResourceDriver<M> ── registry: FQN → files (from the module's path index)
//!      │             ├─ ModelStore<SingleFileModel<M::Artifact>>
//!      │             └─ SourceCache (FQN → text @ model revision)
//!      ▼
//! dyn Driver (object-safe surface used by the host)
//! ```

mod driver;
mod error;
mod source_cache;

pub use driver::ResourceDriver;
pub use error::{GenError, GenResult};
pub use source_cache::SourceCache;

use std::sync::Arc;

use crate::diagnostic::DiagnosticSink;
use crate::fqn::FqnCache;
use crate::model::SingleFileModel;
use crate::vfs::{File, FileRef};

/// Format-specific half of a driver.
///
/// Implementations hold no per-type state: everything derived from a file
/// lives in the artifact returned by [`parse`](Self::parse), which the model
/// caches until the file's content changes.
pub trait TypeManifold: Send + Sync + 'static {
    /// Parsed form of one backing file.
    type Artifact: Send + Sync + 'static;

    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Claimed file extensions, lowercase, without the dot.
    fn extensions(&self) -> &'static [&'static str];

    /// Whether files with extension `ext` belong to this manifold.
    fn handles_extension(&self, ext: &str) -> bool {
        self.extensions().iter().any(|e| e.eq_ignore_ascii_case(ext))
    }

    /// Type name for `file`, given the FQN derived from its location.
    ///
    /// Override to alias names; every FQN lookup of the driver goes through
    /// this mapping.
    fn type_name_for_file(&self, default_fqn: &str, _file: &File) -> Option<String> {
        Some(default_fqn.to_string())
    }

    /// Parse the backing file of `fqn`.
    fn parse(&self, fqn: &str, file: &File) -> GenResult<Self::Artifact>;

    /// Nested declarations of the artifact, relative to the top-level type.
    fn declarations<'a>(&self, artifact: &'a Self::Artifact) -> &'a FqnCache<()>;

    /// Generate the source of `fqn`.
    ///
    /// Must be a pure function of the artifact: two calls on unchanged
    /// content return identical text.
    fn contribute(
        &self,
        fqn: &str,
        existing: Option<&str>,
        model: &SingleFileModel<Self::Artifact>,
        artifact: &Self::Artifact,
        sink: &mut dyn DiagnosticSink,
    ) -> GenResult<String>;
}

/// Object-safe driver surface used by the host.
pub trait Driver: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Whether files with extension `ext` belong to this driver.
    fn handles_extension(&self, ext: &str) -> bool;

    /// Whether `file` belongs to this driver.
    fn handles_file(&self, file: &File) -> bool {
        self.handles_extension(file.extension())
    }

    /// Whether `fqn` names a top-level type or one of its nested types.
    fn is_type(&self, fqn: &str) -> bool;

    /// Whether `fqn` names a top-level type.
    fn is_top_level_type(&self, fqn: &str) -> bool;

    /// Longest top-level type name that is a prefix of `fqn`.
    fn find_top_level_fqn(&self, fqn: &str) -> Option<String>;

    /// Whether `relative_inner` is nested inside `top_level`.
    fn is_inner_type(&self, top_level: &str, relative_inner: &str) -> bool;

    /// Generated source of the top-level type containing `fqn`.
    fn produce_source(&self, fqn: &str, sink: &mut dyn DiagnosticSink) -> GenResult<Arc<str>>;

    /// Types `file` contributes to.
    fn types_for_file(&self, file: &File) -> Vec<String>;

    /// Every top-level type, sorted.
    fn all_type_names(&self) -> Vec<String>;

    /// Top-level types declared directly in `namespace`, sorted.
    fn type_names_in(&self, namespace: &str) -> Vec<String>;

    /// Backing files of the top-level type containing `fqn`.
    fn find_files_for_type(&self, fqn: &str) -> Vec<FileRef>;

    /// Package of the top-level type containing `fqn`.
    fn package_of(&self, fqn: &str) -> Option<String>;

    /// A file was created and indexed.
    fn on_file_added(&self, file: &FileRef);

    /// A file's content changed.
    fn on_file_updated(&self, file: &FileRef);

    /// A file is about to be dropped from the index.
    fn on_file_removed(&self, file: &FileRef);

    /// Forget every model, cached source and registry entry.
    fn clear(&self);
}
