//! Generic driver binding a [`TypeManifold`] to a module.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace, warn};

use super::{Driver, GenError, GenResult, SourceCache, TypeManifold};
use crate::config::{self, AmbiguityPolicy};
use crate::diagnostic::{line_text, Diagnostic, DiagnosticSink};
use crate::fqn::{self, namespace_of, FqnCache};
use crate::lazy::LazyCell;
use crate::model::{Model, ModelStore, SingleFileModel};
use crate::module::ModuleRef;
use crate::vfs::{File, FileRef};

type Registry = RwLock<FqnCache<Vec<FileRef>>>;

/// Driver for one resource kind inside one module.
///
/// The registry of top-level types is built from the module's path index on
/// first use and then kept current by the file callbacks.
pub struct ResourceDriver<M: TypeManifold> {
    module: ModuleRef,
    manifold: M,
    policy: AmbiguityPolicy,
    types: LazyCell<Registry>,
    models: ModelStore<SingleFileModel<M::Artifact>>,
    sources: SourceCache,
}

impl<M: TypeManifold> ResourceDriver<M> {
    /// Bind `manifold` to `module`, using the global ambiguity policy.
    pub fn init(module: ModuleRef, manifold: M) -> Self {
        Self::with_policy(module, manifold, config::get().ambiguity)
    }

    /// Bind `manifold` to `module` with an explicit ambiguity policy.
    pub fn with_policy(module: ModuleRef, manifold: M, policy: AmbiguityPolicy) -> Self {
        debug!(driver = manifold.name(), module = module.name(), "driver bound");
        Self {
            module,
            manifold,
            policy,
            types: LazyCell::new(),
            models: ModelStore::new(),
            sources: SourceCache::new(),
        }
    }

    /// The format half of this driver.
    pub fn manifold(&self) -> &M {
        &self.manifold
    }

    /// The model store.
    pub fn models(&self) -> &ModelStore<SingleFileModel<M::Artifact>> {
        &self.models
    }

    /// The generated-source cache.
    pub fn sources(&self) -> &SourceCache {
        &self.sources
    }

    // =========================================================================
    // Registry
    // =========================================================================

    fn registry(&self) -> Arc<Registry> {
        self.types
            .get_or_init(|| Some(RwLock::new(self.scan())))
            .unwrap_or_default()
    }

    fn scan(&self) -> FqnCache<Vec<FileRef>> {
        let index = self.module.path_index();
        let mut registry: FqnCache<Vec<FileRef>> = FqnCache::new();
        for ext in index.extensions() {
            if !self.manifold.handles_extension(ext) {
                continue;
            }
            let Some(cache) = index.extension_cache(ext) else {
                continue;
            };
            for (default_fqn, file) in cache.entries() {
                if let Some(fqn) = self.manifold.type_name_for_file(&default_fqn, file) {
                    register(&mut registry, &fqn, file);
                }
            }
        }
        debug!(driver = self.manifold.name(), types = registry.entries().len(), "type registry built");
        registry
    }

    // =========================================================================
    // Models
    // =========================================================================

    /// The model for a top-level type, if one exists.
    pub fn model(&self, fqn: &str) -> Option<Arc<SingleFileModel<M::Artifact>>> {
        self.models.get(fqn)
    }

    /// The model for a top-level type, created from the registry if absent.
    ///
    /// Creating a model does not parse anything.
    ///
    /// A model published after its last file was removed is dropped again,
    /// and one published into a slot that removal already evicted is rebuilt.
    pub fn get_or_create_model(&self, fqn: &str) -> GenResult<Arc<SingleFileModel<M::Artifact>>> {
        loop {
            let model = self.models.get_or_create(fqn, || {
                let files = self
                    .registry()
                    .read()
                    .get(fqn)
                    .cloned()
                    .ok_or_else(|| GenError::NotFound { fqn: fqn.to_string() })?;
                SingleFileModel::new(fqn, files)
            })?;

            let registry = self.registry();
            let registry = registry.read();
            if registry.get(fqn).is_none() {
                self.models.remove_if_current(fqn, &model);
                return Err(GenError::NotFound { fqn: fqn.to_string() });
            }
            if self.models.is_current(fqn, &model) {
                return Ok(model);
            }
            trace!(fqn, "model published into an evicted slot, recreating");
        }
    }

    /// Drop the model and cached source of `fqn`.
    pub fn remove_model(&self, fqn: &str) -> bool {
        self.sources.invalidate(fqn);
        self.models.remove(fqn).is_some()
    }

    /// Generate `fqn` with `existing` passed through to the manifold,
    /// bypassing the source cache.
    pub fn contribute(
        &self,
        fqn: &str,
        existing: Option<&str>,
        sink: &mut dyn DiagnosticSink,
    ) -> GenResult<String> {
        let model = self.get_or_create_model(fqn)?;
        self.generate(fqn, existing, &model, sink)
    }

    fn generate(
        &self,
        fqn: &str,
        existing: Option<&str>,
        model: &SingleFileModel<M::Artifact>,
        sink: &mut dyn DiagnosticSink,
    ) -> GenResult<String> {
        let files = model.files();
        if files.len() > 1 {
            self.report_ambiguity(fqn, &files, sink)?;
        }

        let artifact = model
            .artifact(|file| self.manifold.parse(fqn, file))
            .map_err(|err| {
                sink.report(self.describe_failure(&err, fqn, model.primary().as_deref()));
                err
            })?;
        self.manifold.contribute(fqn, existing, model, &artifact, sink)
    }

    fn report_ambiguity(&self, fqn: &str, files: &[FileRef], sink: &mut dyn DiagnosticSink) -> GenResult<()> {
        let paths: Vec<String> = files.iter().map(|f| f.path().to_string()).collect();
        match self.policy {
            AmbiguityPolicy::Warn => {
                let mut diagnostic =
                    Diagnostic::warning(fqn, format!("ambiguous backing file set, using {}", paths[0]))
                        .with_path(paths[0].clone());
                for other in &paths[1..] {
                    diagnostic = diagnostic.with_hint(format!("also claimed by {other}"));
                }
                sink.report(diagnostic);
                Ok(())
            }
            AmbiguityPolicy::Reject => {
                let err = GenError::AmbiguousBackingSet {
                    fqn: fqn.to_string(),
                    count: files.len(),
                };
                let mut diagnostic = err.to_diagnostic(fqn, None);
                for path in paths {
                    diagnostic = diagnostic.with_hint(format!("claimed by {path}"));
                }
                sink.report(diagnostic);
                Err(err)
            }
        }
    }

    fn describe_failure(&self, err: &GenError, fqn: &str, file: Option<&File>) -> Diagnostic {
        let path = file.map(|f| f.path().to_string());
        let diagnostic = err.to_diagnostic(fqn, path.as_deref());
        let snippet = match (err, file) {
            (GenError::Malformed { position: Some(pos), .. }, Some(file)) => file
                .read_to_string()
                .ok()
                .and_then(|text| line_text(&text, pos.line).map(str::to_string)),
            _ => None,
        };
        match snippet {
            Some(line) => diagnostic.with_source_line(line),
            None => diagnostic,
        }
    }
}

fn register(registry: &mut FqnCache<Vec<FileRef>>, fqn: &str, file: &FileRef) {
    match registry.get_mut(fqn) {
        Some(files) if files.contains(file) => {}
        Some(files) => files.push(FileRef::clone(file)),
        None => {
            registry.add(fqn, vec![FileRef::clone(file)]);
        }
    }
}

fn unregister(registry: &mut FqnCache<Vec<FileRef>>, fqn: &str, file: &File) {
    let Some(files) = registry.get_mut(fqn) else {
        return;
    };
    files.retain(|f| f.as_ref() != file);
    if files.is_empty() {
        registry.take(fqn);
        registry.prune(fqn);
    }
}

impl<M: TypeManifold> Driver for ResourceDriver<M> {
    fn name(&self) -> &str {
        self.manifold.name()
    }

    fn handles_extension(&self, ext: &str) -> bool {
        self.manifold.handles_extension(ext)
    }

    fn is_type(&self, fqn: &str) -> bool {
        match self.find_top_level_fqn(fqn) {
            Some(top) if top == fqn => true,
            Some(top) => self.is_inner_type(&top, &fqn[top.len() + 1..]),
            None => false,
        }
    }

    fn is_top_level_type(&self, fqn: &str) -> bool {
        self.registry().read().get(fqn).is_some()
    }

    fn find_top_level_fqn(&self, fqn: &str) -> Option<String> {
        let registry = self.registry();
        let registry = registry.read();
        let mut node = registry.root();
        let mut found = None;
        let mut end = 0;
        for segment in fqn.split('.') {
            let Some(child) = node.child(segment) else {
                break;
            };
            node = child;
            end += segment.len();
            if node.payload().is_some() {
                found = Some(end);
            }
            end += 1;
        }
        found.map(|end| fqn[..end].to_string())
    }

    fn is_inner_type(&self, top_level: &str, relative_inner: &str) -> bool {
        if fqn::is_anonymous(relative_inner) {
            return true;
        }
        if fqn::has_empty_segment(relative_inner) || !self.is_top_level_type(top_level) {
            return false;
        }
        let Ok(model) = self.get_or_create_model(top_level) else {
            return false;
        };
        match model.artifact(|file| self.manifold.parse(top_level, file)) {
            Ok(artifact) => fqn::is_inner_type(self.manifold.declarations(&artifact), "", relative_inner),
            Err(err) => {
                trace!(fqn = top_level, error = %err, "inner type lookup on unparsable model");
                false
            }
        }
    }

    fn produce_source(&self, fqn: &str, sink: &mut dyn DiagnosticSink) -> GenResult<Arc<str>> {
        let top = self
            .find_top_level_fqn(fqn)
            .ok_or_else(|| GenError::NotFound { fqn: fqn.to_string() })?;
        let model = self.get_or_create_model(&top)?;

        let revision = model.revision();
        if let Some(text) = self.sources.get(&top, revision) {
            return Ok(text);
        }

        trace!(fqn = %top, revision, "generating source");
        let text: Arc<str> = self.generate(&top, None, &model, sink)?.into();
        if model.revision() == revision {
            self.sources.store(&top, revision, Arc::clone(&text));
        }
        Ok(text)
    }

    fn types_for_file(&self, file: &File) -> Vec<String> {
        if !self.handles_file(file) {
            return Vec::new();
        }
        self.module
            .path_index()
            .fqns_for_file(file)
            .iter()
            .filter_map(|fqn| self.manifold.type_name_for_file(fqn, file))
            .collect()
    }

    fn all_type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .registry()
            .read()
            .entries()
            .into_iter()
            .map(|(fqn, _)| fqn)
            .collect();
        names.sort_unstable();
        names
    }

    fn type_names_in(&self, namespace: &str) -> Vec<String> {
        let mut names = self.all_type_names();
        names.retain(|fqn| namespace_of(fqn) == namespace);
        names
    }

    fn find_files_for_type(&self, fqn: &str) -> Vec<FileRef> {
        let Some(top) = self.find_top_level_fqn(fqn) else {
            return Vec::new();
        };
        self.registry().read().get(&top).cloned().unwrap_or_default()
    }

    fn package_of(&self, fqn: &str) -> Option<String> {
        self.find_top_level_fqn(fqn)
            .map(|top| namespace_of(&top).to_string())
    }

    fn on_file_added(&self, file: &FileRef) {
        let fqns = self.types_for_file(file);
        if fqns.is_empty() {
            return;
        }
        let registry = self.registry();
        let mut registry = registry.write();
        for fqn in &fqns {
            register(&mut registry, fqn, file);
            if let Some(model) = self.models.get(fqn) {
                model.add_file(FileRef::clone(file));
                if model.is_ambiguous() {
                    warn!(fqn = %fqn, file = %file, "file joins an existing type");
                }
            }
            self.sources.invalidate(fqn);
        }
    }

    fn on_file_updated(&self, file: &FileRef) {
        for fqn in self.types_for_file(file) {
            if let Some(model) = self.models.get(&fqn) {
                model.update_file(FileRef::clone(file));
            }
            self.sources.invalidate(&fqn);
        }
    }

    fn on_file_removed(&self, file: &FileRef) {
        let fqns = self.types_for_file(file);
        if fqns.is_empty() {
            return;
        }
        let registry = self.registry();
        let mut registry = registry.write();
        for fqn in &fqns {
            unregister(&mut registry, fqn, file);
            if registry.get(fqn).is_none() {
                // Evicts the slot even while a creator is still filling it.
                self.models.remove(fqn);
            } else if let Some(model) = self.models.get(fqn) {
                model.remove_file(file);
                self.models.remove_if_empty(fqn);
            }
            self.sources.invalidate(fqn);
        }
    }

    fn clear(&self) {
        self.types.clear();
        self.models.clear();
        self.sources.clear();
        debug!(driver = self.manifold.name(), "driver cleared");
    }
}

impl<M: TypeManifold> fmt::Debug for ResourceDriver<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceDriver")
            .field("manifold", &self.manifold.name())
            .field("module", &self.module.name())
            .field("policy", &self.policy)
            .field("models", &self.models.len())
            .finish()
    }
}
