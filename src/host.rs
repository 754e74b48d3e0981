//! The registry of drivers serving one module.
//!
//! ```text
//! host compiler
//!   │ produce_source / is_inner_type / on_file_*
//!   ▼
//! TypeHost ── module (VFS + path index)
//!   └── drivers: [properties, json, csv, image, …]
//! ```
//!
//! File callbacks keep the layers in order: the parent directory listing is
//! dropped first, then the path index and every interested driver are told.
//! On removal drivers run before the file leaves the index, so they can
//! still map it to its types.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::diagnostic::{DiagnosticSink, Diagnostics};
use crate::drivers::{CsvManifold, ImageManifold, JsonManifold, PropertiesManifold};
use crate::manifold::{Driver, GenError, GenResult, ResourceDriver, TypeManifold};
use crate::module::ModuleRef;
use crate::vfs::{File, FileRef, VfsResult};

/// Outcome of generating one type in [`TypeHost::produce_all`].
pub struct Generated {
    /// Top-level type name.
    pub fqn: String,
    /// Generated source or the failure for this type.
    pub result: GenResult<Arc<str>>,
}

/// Explicit registry of drivers bound to one module.
pub struct TypeHost {
    module: ModuleRef,
    drivers: RwLock<Vec<Arc<dyn Driver>>>,
}

impl TypeHost {
    /// A host with no drivers.
    pub fn new(module: ModuleRef) -> Self {
        debug!(module = module.name(), "type host created");
        Self {
            module,
            drivers: RwLock::new(Vec::new()),
        }
    }

    /// A host with the bundled properties, JSON, CSV and image drivers.
    pub fn with_standard_drivers(module: ModuleRef) -> Self {
        let host = Self::new(module);
        host.register(PropertiesManifold);
        host.register(JsonManifold);
        host.register(CsvManifold);
        host.register(ImageManifold);
        host
    }

    /// The module this host serves.
    pub fn module(&self) -> &ModuleRef {
        &self.module
    }

    /// Bind `manifold` to the module and register the resulting driver.
    pub fn register<M: TypeManifold>(&self, manifold: M) -> Arc<dyn Driver> {
        self.register_driver(Arc::new(ResourceDriver::init(Arc::clone(&self.module), manifold)))
    }

    /// Register an already-built driver. Earlier registrations win lookups.
    pub fn register_driver(&self, driver: Arc<dyn Driver>) -> Arc<dyn Driver> {
        debug!(driver = driver.name(), "driver registered");
        self.drivers.write().push(Arc::clone(&driver));
        driver
    }

    /// Registered drivers in registration order.
    pub fn drivers(&self) -> Vec<Arc<dyn Driver>> {
        self.drivers.read().clone()
    }

    /// Re-index the module and drop every driver's state.
    pub fn reset(&self) -> VfsResult<()> {
        self.module.refresh()?;
        for driver in self.drivers() {
            driver.clear();
        }
        debug!(module = self.module.name(), "type host reset");
        Ok(())
    }

    /// Unregister every driver.
    pub fn clear_drivers(&self) {
        self.drivers.write().clear();
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Whether any driver claims extension `ext`.
    pub fn handles_extension(&self, ext: &str) -> bool {
        self.drivers.read().iter().any(|d| d.handles_extension(ext))
    }

    /// The first driver that knows `fqn`.
    pub fn driver_for(&self, fqn: &str) -> Option<Arc<dyn Driver>> {
        let drivers = self.drivers.read();
        let mut claims = drivers.iter().filter(|d| d.find_top_level_fqn(fqn).is_some());
        let first = claims.next()?;
        if let Some(other) = claims.next() {
            trace!(fqn, first = first.name(), other = other.name(), "type claimed by several drivers");
        }
        Some(Arc::clone(first))
    }

    /// Generated source of the top-level type containing `fqn`.
    pub fn produce_source(&self, fqn: &str, sink: &mut dyn DiagnosticSink) -> GenResult<Arc<str>> {
        match self.driver_for(fqn) {
            Some(driver) => driver.produce_source(fqn, sink),
            None => Err(GenError::NotFound { fqn: fqn.to_string() }),
        }
    }

    /// Whether `relative_inner` is nested inside `top_level`.
    pub fn is_inner_type(&self, top_level: &str, relative_inner: &str) -> bool {
        self.drivers
            .read()
            .iter()
            .any(|d| d.is_inner_type(top_level, relative_inner))
    }

    /// Whether any driver knows `fqn`, top-level or nested.
    pub fn is_type(&self, fqn: &str) -> bool {
        self.drivers.read().iter().any(|d| d.is_type(fqn))
    }

    /// Every top-level type of every driver, sorted and deduplicated.
    pub fn all_type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .drivers
            .read()
            .iter()
            .flat_map(|d| d.all_type_names())
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    /// Generate every known type. Diagnostics are collected per type and
    /// merged in type order.
    pub fn produce_all(&self) -> (Vec<Generated>, Diagnostics) {
        let names = self.all_type_names();
        let produce = |fqn: &String| {
            let mut sink = Diagnostics::new();
            let result = self.produce_source(fqn, &mut sink);
            (
                Generated {
                    fqn: fqn.clone(),
                    result,
                },
                sink,
            )
        };

        #[cfg(feature = "batch")]
        let outcomes: Vec<(Generated, Diagnostics)> = {
            use rayon::prelude::*;
            names.par_iter().map(produce).collect()
        };
        #[cfg(not(feature = "batch"))]
        let outcomes: Vec<(Generated, Diagnostics)> = names.iter().map(produce).collect();

        let mut diagnostics = Diagnostics::new();
        let mut generated = Vec::with_capacity(outcomes.len());
        for (outcome, sink) in outcomes {
            diagnostics.extend(sink);
            generated.push(outcome);
        }
        debug!(
            types = generated.len(),
            summary = %diagnostics.summary(),
            "generated all types"
        );
        (generated, diagnostics)
    }

    // =========================================================================
    // File lifecycle
    // =========================================================================

    fn drop_listing(&self, file: &File) {
        if let Some(parent) = file.path().parent() {
            self.module.vfs().clear_directory_cache(&parent);
        }
    }

    fn interested(&self, file: &File) -> Vec<Arc<dyn Driver>> {
        self.drivers
            .read()
            .iter()
            .filter(|d| d.handles_file(file))
            .cloned()
            .collect()
    }

    /// A file was created on the medium.
    pub fn on_file_added(&self, file: &FileRef) {
        self.drop_listing(file);
        let Some(fqn) = self.module.index_file(file) else {
            trace!(file = %file, "added file has no type name");
            return;
        };
        debug!(fqn = %fqn, file = %file, "file added");
        for driver in self.interested(file) {
            driver.on_file_added(file);
        }
    }

    /// A file's content changed.
    pub fn on_file_updated(&self, file: &FileRef) {
        self.drop_listing(file);
        debug!(file = %file, "file updated");
        for driver in self.interested(file) {
            driver.on_file_updated(file);
        }
    }

    /// A file was deleted from the medium.
    pub fn on_file_removed(&self, file: &FileRef) {
        self.drop_listing(file);
        for driver in self.interested(file) {
            driver.on_file_removed(file);
        }
        let fqns = self.module.unindex_file(file);
        debug!(file = %file, types = ?fqns, "file removed");
    }
}

impl std::fmt::Debug for TypeHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self.drivers.read().iter().map(|d| d.name().to_string()).collect();
        f.debug_struct("TypeHost")
            .field("module", &self.module.name())
            .field("drivers", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::Module;
    use crate::vfs::{CachingMode, Vfs};
    use std::fs;
    use tempfile::TempDir;

    fn host(files: &[(&str, &str)], mode: CachingMode) -> (TempDir, TypeHost) {
        let tmp = TempDir::new().unwrap();
        for (path, body) in files {
            let full = tmp.path().join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, body).unwrap();
        }
        let module = Module::from_paths("main", Vfs::with_mode(mode), &[tmp.path()]).unwrap();
        (tmp, TypeHost::with_standard_drivers(Arc::new(module)))
    }

    fn file(host: &TypeHost, relative: &str) -> FileRef {
        host.module().roots()[0].file(relative).unwrap()
    }

    #[test]
    fn test_scenario_generate_twice_is_identical() {
        let (_tmp, host) = host(&[("ns/Foo.csv", "id,name\n1,Ann\n")], CachingMode::NoCaching);
        let mut sink = Diagnostics::new();

        let first = host.produce_source("ns.Foo", &mut sink).unwrap();
        assert!(!first.is_empty());
        assert!(first.contains("package ns;"));
        assert!(first.contains("public static class Row {"));

        let second = host.produce_source("ns.Foo", &mut sink).unwrap();
        assert_eq!(first, second);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_scenario_update_invalidates() {
        let (tmp, host) = host(&[("ns/Foo.csv", "id,name\n1,Ann\n")], CachingMode::FullCaching);
        let before = host.produce_source("ns.Foo", &mut Diagnostics::new()).unwrap();

        fs::write(tmp.path().join("ns/Foo.csv"), "id,name,age\n1,Ann,30\n").unwrap();
        host.on_file_updated(&file(&host, "ns/Foo.csv"));

        let after = host.produce_source("ns.Foo", &mut Diagnostics::new()).unwrap();
        assert_ne!(before, after);
        assert!(after.contains("public final String age;"));
    }

    #[test]
    fn test_scenario_drivers_do_not_collide() {
        let (_tmp, host) = host(
            &[("ns/Foo.csv", "a,b\n1,2\n"), ("ns/Foo.json", r#"{"x": 1}"#)],
            CachingMode::CheckTimestamps,
        );

        let outputs: Vec<Arc<str>> = host
            .drivers()
            .iter()
            .filter(|d| d.is_top_level_type("ns.Foo"))
            .map(|d| d.produce_source("ns.Foo", &mut Diagnostics::new()).unwrap())
            .collect();
        assert_eq!(outputs.len(), 2);
        assert!(outputs.iter().any(|s| s.contains("public final long x;")));
        assert!(outputs.iter().any(|s| s.contains("HEADER = {\"a\", \"b\"}")));
        assert_eq!(host.all_type_names(), ["ns.Foo"]);
    }

    #[test]
    fn test_inner_types_across_drivers() {
        let (_tmp, host) = host(
            &[
                ("a/B.properties", "C=1\nD.x=2\n"),
                ("a/Data.json", r#"{"inner": {"deep": {"v": 1}}}"#),
            ],
            CachingMode::NoCaching,
        );
        assert!(host.is_inner_type("a.B", "D"));
        assert!(!host.is_inner_type("a.B", "C"));
        assert!(host.is_inner_type("a.B", "0"));
        assert!(host.is_inner_type("a.Data", "Inner.Deep"));
        assert!(!host.is_inner_type("a.Data", "Deep"));
        assert!(host.is_type("a.Data.Inner"));
    }

    #[test]
    fn test_image_names_are_aliased() {
        let mut png = b"\x89PNG\r\n\x1a\n\0\0\0\x0dIHDR".to_vec();
        png.extend(4u32.to_be_bytes());
        png.extend(4u32.to_be_bytes());
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("img")).unwrap();
        fs::write(tmp.path().join("img/logo.png"), &png).unwrap();
        fs::write(tmp.path().join("img/logo.json"), "{}").unwrap();
        let module = Module::from_paths("main", Vfs::with_mode(CachingMode::NoCaching), &[tmp.path()]).unwrap();
        let host = TypeHost::with_standard_drivers(Arc::new(module));

        assert_eq!(host.all_type_names(), ["img.logo", "img.logo_png"]);
        let source = host.produce_source("img.logo_png", &mut Diagnostics::new()).unwrap();
        assert!(source.contains("public class logo_png {"));
        assert!(source.contains("WIDTH = 4;"));

        let image = file(&host, "img/logo.png");
        let driver = host.driver_for("img.logo_png").unwrap();
        assert_eq!(driver.types_for_file(&image), ["img.logo_png"]);
    }

    #[test]
    fn test_add_and_remove_files() {
        let (tmp, host) = host(&[("ns/Foo.csv", "a\n1\n")], CachingMode::FullCaching);
        assert_eq!(host.all_type_names(), ["ns.Foo"]);

        fs::write(tmp.path().join("ns/Bar.json"), r#"{"k": "v"}"#).unwrap();
        let bar = file(&host, "ns/Bar.json");
        host.on_file_added(&bar);
        assert_eq!(host.all_type_names(), ["ns.Bar", "ns.Foo"]);
        assert!(host.produce_source("ns.Bar", &mut Diagnostics::new()).is_ok());

        let foo = file(&host, "ns/Foo.csv");
        fs::remove_file(tmp.path().join("ns/Foo.csv")).unwrap();
        host.on_file_removed(&foo);
        assert_eq!(host.all_type_names(), ["ns.Bar"]);
        let err = host.produce_source("ns.Foo", &mut Diagnostics::new()).unwrap_err();
        assert_eq!(err, GenError::NotFound { fqn: "ns.Foo".into() });
        assert!(host.module().path_index().find_files("ns.Foo").is_empty());
        assert!(!host.module().roots()[0].has_child_file("ns/Foo.csv").unwrap());
    }

    #[test]
    fn test_failure_is_scoped_to_one_type() {
        let (_tmp, host) = host(
            &[("ns/Bad.json", "{ nope"), ("ns/Good.json", r#"{"a": true}"#)],
            CachingMode::NoCaching,
        );
        let (generated, diagnostics) = host.produce_all();

        assert_eq!(generated.len(), 2);
        assert_eq!(generated[0].fqn, "ns.Bad");
        assert!(matches!(generated[0].result, Err(GenError::Malformed { .. })));
        assert!(generated[1].result.is_ok());
        assert_eq!(diagnostics.errors().count(), 1);
        assert_eq!(diagnostics.iter().next().unwrap().fqn, "ns.Bad");
    }

    #[test]
    fn test_reset_and_registry() {
        let (tmp, host) = host(&[("Top.properties", "k=v\n")], CachingMode::FullCaching);
        assert!(host.handles_extension("PROPERTIES"));
        assert!(host.handles_extension("tsv"));
        assert!(!host.handles_extension("xml"));
        assert_eq!(host.drivers().len(), 4);

        fs::write(tmp.path().join("Late.properties"), "k=v\n").unwrap();
        assert_eq!(host.all_type_names(), ["Top"]);
        host.reset().unwrap();
        assert_eq!(host.all_type_names(), ["Late", "Top"]);

        host.clear_drivers();
        assert!(host.all_type_names().is_empty());
        assert!(!host.handles_extension("json"));
    }
}
