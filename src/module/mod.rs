//! A module: source roots, their file system and the path index over them.

mod path_index;

use std::path::Path;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard};
use tracing::debug;

pub use path_index::{qualify_name, PathIndex};

use crate::vfs::{DirRef, File, FileRef, Vfs, VfsResult};

/// A set of source roots whose files become types.
///
/// Roots are searched in order; the first root claiming an FQN wins.
pub struct Module {
    name: String,
    vfs: Vfs,
    roots: Vec<DirRef>,
    index: RwLock<PathIndex>,
}

impl Module {
    /// Create a module over `roots` and index it.
    pub fn new(name: impl Into<String>, vfs: Vfs, roots: Vec<DirRef>) -> VfsResult<Self> {
        let index = PathIndex::build(&roots)?;
        let name = name.into();
        debug!(module = %name, roots = roots.len(), files = index.len(), "module indexed");
        Ok(Self {
            name,
            vfs,
            roots,
            index: RwLock::new(index),
        })
    }

    /// Create a module from platform paths. `.jar`/`.zip` roots are archives.
    pub fn from_paths<P: AsRef<Path>>(name: impl Into<String>, vfs: Vfs, roots: &[P]) -> VfsResult<Self> {
        let dirs = roots
            .iter()
            .map(|root| vfs.directory_at(root.as_ref()))
            .collect::<VfsResult<Vec<_>>>()?;
        Self::new(name, vfs, dirs)
    }

    /// Module name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The file system the module reads through.
    pub fn vfs(&self) -> &Vfs {
        &self.vfs
    }

    /// Source roots in search order.
    pub fn roots(&self) -> &[DirRef] {
        &self.roots
    }

    /// Read access to the path index.
    pub fn path_index(&self) -> RwLockReadGuard<'_, PathIndex> {
        self.index.read()
    }

    /// The root containing `file`, if any.
    pub fn root_of(&self, file: &File) -> Option<&DirRef> {
        self.roots
            .iter()
            .find(|root| file.is_descendant_of(root).unwrap_or(false))
    }

    /// The FQN `file` maps to, derived from its location under a root.
    ///
    /// Files inside directories that are not valid namespace segments have
    /// no FQN.
    pub fn fqn_for_file(&self, file: &File) -> Option<String> {
        let root = self.root_of(file)?;
        let relative = root.relative_path(file.path())?;
        let (dirs, name) = match relative.rsplit_once('/') {
            Some((dirs, name)) => (dirs, name),
            None => ("", relative.as_str()),
        };
        if !dirs.is_empty() && !dirs.split('/').all(path_index::is_package_name) {
            return None;
        }
        Some(qualify_name(&dirs.replace('/', "."), name))
    }

    /// Record a new file in the index. Returns the FQN it was indexed under.
    pub fn index_file(&self, file: &FileRef) -> Option<String> {
        let fqn = self.fqn_for_file(file)?;
        self.index.write().add_file(&fqn, file).then_some(fqn)
    }

    /// Drop a file from the index. Returns the FQNs it was indexed under.
    pub fn unindex_file(&self, file: &File) -> Vec<String> {
        let mut index = self.index.write();
        let fqns = index.fqns_for_file(file).to_vec();
        for fqn in &fqns {
            index.remove_file(fqn, file);
        }
        fqns
    }

    /// Rebuild the index from the medium, dropping every cached listing.
    pub fn refresh(&self) -> VfsResult<()> {
        self.vfs.clear_all_caches();
        let index = PathIndex::build(&self.roots)?;
        debug!(module = %self.name, files = index.len(), "module re-indexed");
        *self.index.write() = index;
        Ok(())
    }
}

impl std::fmt::Debug for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("roots", &self.roots)
            .finish()
    }
}

/// Shared module handle.
pub type ModuleRef = Arc<Module>;
