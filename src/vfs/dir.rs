//! Directory handles with memoized child wrappers.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use super::archive::Archive;
use super::error::{VfsError, VfsResult};
use super::file::{File, FileRef};
use super::path::ResourcePath;
use super::system::Vfs;

/// Shared directory handle.
pub type DirRef = Arc<Directory>;

/// A directory on the local file system or inside an archive.
///
/// A directory owns the child wrappers it hands out: asking twice for the
/// same relative name returns the same `Arc`.
pub struct Directory {
    path: ResourcePath,
    source: DirSource,
    files: Mutex<FxHashMap<String, FileRef>>,
    dirs: Mutex<FxHashMap<String, DirRef>>,
}

enum DirSource {
    Physical { vfs: Vfs },
    Archive { archive: Arc<Archive>, prefix: String },
}

impl Directory {
    pub(crate) fn physical(path: ResourcePath, vfs: Vfs) -> Self {
        Self::with_source(path, DirSource::Physical { vfs })
    }

    pub(crate) fn archive_root(archive: Arc<Archive>) -> Self {
        Self::archive(archive, String::new())
    }

    pub(crate) fn archive(archive: Arc<Archive>, prefix: String) -> Self {
        let path = if prefix.is_empty() {
            archive.path().clone()
        } else {
            archive.entry_path(&prefix)
        };
        Self::with_source(path, DirSource::Archive { archive, prefix })
    }

    fn with_source(path: ResourcePath, source: DirSource) -> Self {
        Self {
            path,
            source,
            files: Mutex::new(FxHashMap::default()),
            dirs: Mutex::new(FxHashMap::default()),
        }
    }

    /// Normalized path of the directory.
    pub fn path(&self) -> &ResourcePath {
        &self.path
    }

    /// Directory name.
    pub fn name(&self) -> &str {
        self.path.name()
    }

    /// Whether the directory is served from an archive.
    pub fn is_archive(&self) -> bool {
        matches!(self.source, DirSource::Archive { .. })
    }

    // =========================================================================
    // Children
    // =========================================================================

    /// The file at `relative` below this directory.
    ///
    /// Multi-segment names are resolved through the intermediate directories
    /// so each wrapper is owned by its immediate parent.
    pub fn file(&self, relative: &str) -> VfsResult<FileRef> {
        let relative = normalize_relative(relative)?;
        if let Some((head, tail)) = relative.split_once('/') {
            return self.dir(head)?.file(tail);
        }

        let mut files = self.files.lock();
        if let Some(file) = files.get(&relative) {
            return Ok(Arc::clone(file));
        }
        let file = Arc::new(self.make_file(&relative)?);
        files.insert(relative, Arc::clone(&file));
        Ok(file)
    }

    /// The directory at `relative` below this directory.
    pub fn dir(&self, relative: &str) -> VfsResult<DirRef> {
        let relative = normalize_relative(relative)?;
        if relative.is_empty() {
            return Err(VfsError::InvalidPath(format!("empty child name under {}", self.path)));
        }
        if let Some((head, tail)) = relative.split_once('/') {
            return self.dir(head)?.dir(tail);
        }

        let mut dirs = self.dirs.lock();
        if let Some(dir) = dirs.get(&relative) {
            return Ok(Arc::clone(dir));
        }
        let dir = Arc::new(self.make_dir(&relative)?);
        dirs.insert(relative, Arc::clone(&dir));
        Ok(dir)
    }

    fn make_file(&self, name: &str) -> VfsResult<File> {
        match &self.source {
            DirSource::Physical { vfs } => Ok(File::physical(self.path.join(name)?, vfs.clone())),
            DirSource::Archive { archive, prefix } => {
                Ok(File::archive_entry(Arc::clone(archive), child_entry(prefix, name)))
            }
        }
    }

    fn make_dir(&self, name: &str) -> VfsResult<Directory> {
        match &self.source {
            DirSource::Physical { vfs } => Ok(Directory::physical(self.path.join(name)?, vfs.clone())),
            DirSource::Archive { archive, prefix } => {
                Ok(Directory::archive(Arc::clone(archive), child_entry(prefix, name)))
            }
        }
    }

    /// Files directly inside this directory, sorted by name.
    pub fn list_files(&self) -> VfsResult<Vec<FileRef>> {
        self.child_names(true)?.iter().map(|name| self.file(name)).collect()
    }

    /// Subdirectories directly inside this directory, sorted by name.
    pub fn list_dirs(&self) -> VfsResult<Vec<DirRef>> {
        self.child_names(false)?.iter().map(|name| self.dir(name)).collect()
    }

    fn child_names(&self, want_files: bool) -> VfsResult<Vec<String>> {
        match &self.source {
            DirSource::Physical { vfs } => Ok(vfs
                .list_files(&self.path)?
                .iter()
                .filter(|meta| meta.is_file() == want_files)
                .map(|meta| meta.name().to_string())
                .collect()),
            DirSource::Archive { archive, prefix } => {
                let (files, dirs) = archive.children(prefix);
                Ok(if want_files { files } else { dirs })
            }
        }
    }

    /// Whether a file named `relative` exists below this directory.
    ///
    /// Answered from the listing cache, so under `FullCaching` this does not
    /// touch the medium.
    pub fn has_child_file(&self, relative: &str) -> VfsResult<bool> {
        let relative = normalize_relative(relative)?;
        if let Some((head, tail)) = relative.split_once('/') {
            if !self.child_names(false)?.iter().any(|d| d == head) {
                return Ok(false);
            }
            return self.dir(head)?.has_child_file(tail);
        }
        Ok(self.child_names(true)?.iter().any(|f| *f == relative))
    }

    // =========================================================================
    // Medium
    // =========================================================================

    /// Whether the directory exists.
    pub fn exists(&self) -> bool {
        match &self.source {
            DirSource::Physical { vfs } => vfs.metadata(&self.path).is_dir(),
            DirSource::Archive { archive, prefix } => archive.contains_dir(prefix),
        }
    }

    /// Create this directory. Archives are read-only.
    pub fn mkdir(&self) -> VfsResult<bool> {
        match &self.source {
            DirSource::Physical { vfs } => {
                let created = vfs.mkdir(&self.path);
                if created && let Some(parent) = self.path.parent() {
                    vfs.clear_directory_cache(&parent);
                }
                Ok(created)
            }
            DirSource::Archive { .. } => Err(VfsError::unsupported("mkdir", self.path.as_str())),
        }
    }

    /// Drop the cached listing of this directory.
    pub fn clear_caches(&self) {
        if let DirSource::Physical { vfs } = &self.source {
            vfs.clear_directory_cache(&self.path);
        }
    }

    /// Slash-delimited path of `path` relative to this directory.
    pub fn relative_path(&self, path: &ResourcePath) -> Option<String> {
        path.relative_to(&self.path).map(str::to_owned)
    }

    /// Whether this directory sits strictly below `ancestor`.
    pub fn is_descendant_of(&self, ancestor: &Directory) -> bool {
        self.path.is_descendant_of(&ancestor.path)
    }
}

impl PartialEq for Directory {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path && self.is_archive() == other.is_archive()
    }
}

impl Eq for Directory {}

impl fmt::Debug for Directory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Directory")
            .field("path", &self.path.as_str())
            .field("archive", &self.is_archive())
            .finish()
    }
}

fn child_entry(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}

/// Normalize a child name; `..` is not allowed to leave the directory.
fn normalize_relative(relative: &str) -> VfsResult<String> {
    let parsed = ResourcePath::parse(relative.trim_start_matches(['/', '\\']))?;
    Ok(parsed.as_str().to_string())
}
