//! # typeforge
//!
//! On-demand type generation from resource files.
//!
//! A host compiler asks for a fully-qualified type name; `typeforge` finds
//! the resource file that backs it (a `.properties`, `.json`, `.csv` or image
//! file under a module root), parses it once, and hands back generated
//! source. Everything is lazy and incremental:
//!
//! - **Virtual file system**: physical directories, zip/jar archives and
//!   URLs behind one API, with configurable directory listing caches
//! - **Path index**: FQN → backing files, updated on file events
//! - **Models**: one per type, memoizing the parse artifact until the
//!   backing file changes
//! - **Source cache**: generated text reused while the model is unchanged
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use typeforge::{CachingMode, Diagnostics, Module, TypeHost, Vfs};
//!
//! let vfs = Vfs::with_mode(CachingMode::CheckTimestamps);
//! let module = Module::from_paths("main", vfs, &["resources"])?;
//! let host = TypeHost::with_standard_drivers(Arc::new(module));
//!
//! // resources/com/acme/Messages.properties
//! let mut diagnostics = Diagnostics::new();
//! let source = host.produce_source("com.acme.Messages", &mut diagnostics)?;
//! println!("{source}");
//!
//! // After the editor saves the file:
//! let file = host.module().roots()[0].file("com/acme/Messages.properties")?;
//! host.on_file_updated(&file);
//! ```
//!
//! ## High-Level API
//!
//! - [`TypeHost`]: driver registry, lookups and file lifecycle callbacks
//! - [`TypeManifold`]: implement this to support a new resource format
//! - [`ResourceDriver`]: binds a manifold to a module
//!
//! ## Low-Level API
//!
//! - [`config`]: Runtime configuration (caching mode, ambiguity policy)
//! - [`vfs`]: Files, directories, archives and listing caches
//! - [`fqn`]: Dotted-name trie and identifier rules
//! - [`module`]: Source roots and the path index
//! - [`model`]: Per-type models and their store
//! - [`codegen`]: Java-like source builders
//! - [`diagnostic`]: Errors and warnings attributed to types

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod codegen;
pub mod config;
pub mod diagnostic;
pub mod drivers;
pub mod fqn;
pub mod host;
pub mod lazy;
pub mod manifold;
pub mod model;
pub mod module;
pub mod vfs;

// =============================================================================
// Prelude - import commonly used items with a single `use`
// =============================================================================

/// Prelude module for convenient imports.
///
/// ```ignore
/// use typeforge::prelude::*;
/// ```
pub mod prelude {
    // Host
    pub use crate::{Driver, GenError, GenResult, ResourceDriver, TypeHost, TypeManifold};

    // Diagnostics
    pub use crate::{Diagnostic, DiagnosticSink, Diagnostics, Severity};

    // Files and modules
    pub use crate::{CachingMode, File, FileRef, Module, ModuleRef, Vfs};

    // Drivers
    pub use crate::{CsvManifold, ImageManifold, JsonManifold, PropertiesManifold};
}

// =============================================================================
// High-Level API
// =============================================================================

pub use host::{Generated, TypeHost};
pub use manifold::{Driver, GenError, GenResult, ResourceDriver, SourceCache, TypeManifold};

// =============================================================================
// Drivers
// =============================================================================

pub use drivers::{CsvManifold, ImageManifold, JsonManifold, PropertiesManifold, RESOURCE_FIELD};

// =============================================================================
// Diagnostics
// =============================================================================

pub use diagnostic::{
    // Data
    Diagnostic, Position, Severity,
    // Collection
    DiagnosticSink, DiagnosticSummary, Diagnostics, IgnoreDiagnostics,
    // Rendering
    DiagnosticOptions, DisplayStyle,
};

// =============================================================================
// Infrastructure
// =============================================================================

pub use config::{AmbiguityPolicy, Config, ConfigBuilder};
pub use fqn::FqnCache;
pub use lazy::LazyCell;
pub use model::{Model, ModelStore, SingleFileModel};
pub use module::{Module, ModuleRef, PathIndex};
pub use vfs::{CachingMode, DirRef, Directory, File, FileRef, ResourcePath, Vfs, VfsError, VfsResult};
