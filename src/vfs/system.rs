//! The virtual file system handle.

use std::fs;
use std::io::Read as _;
use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use super::archive::Archive;
use super::caching::{revalidate, CachingMode, DirListing, Freshness};
use super::dir::{DirRef, Directory};
use super::error::{VfsError, VfsResult};
use super::file::{File, FileRef};
use super::metadata::{classify, EntryKind, FileMetadata};
use super::path::ResourcePath;
use crate::config::{self, Config};

/// Shared virtual file system.
///
/// Cloning is cheap; clones share the caching mode and listing cache.
/// `delete`/`mkdir` only invalidate this layer: callers that keep derived
/// indexes (path index, model store) must refresh them on their own.
#[derive(Clone)]
pub struct Vfs {
    inner: Arc<VfsInner>,
}

struct VfsInner {
    mode: AtomicU8,
    quantum: Duration,
    user_agent: String,
    network_timeout: Duration,
    listings: RwLock<FxHashMap<ResourcePath, DirListing>>,
    agent: OnceLock<ureq::Agent>,
}

impl Default for Vfs {
    fn default() -> Self {
        Self::new()
    }
}

impl Vfs {
    /// Create a file system configured from the global [`Config`].
    pub fn new() -> Self {
        Self::with_config(config::get())
    }

    /// Create a file system from an explicit configuration.
    pub fn with_config(config: &Config) -> Self {
        Self {
            inner: Arc::new(VfsInner {
                mode: AtomicU8::new(config.caching_mode.to_u8()),
                quantum: config.fuzzy_quantum,
                user_agent: config.user_agent.clone(),
                network_timeout: config.network_timeout,
                listings: RwLock::new(FxHashMap::default()),
                agent: OnceLock::new(),
            }),
        }
    }

    /// Create a file system with the global configuration but a specific mode.
    pub fn with_mode(mode: CachingMode) -> Self {
        let vfs = Self::new();
        vfs.set_caching_mode(mode);
        vfs
    }

    /// The active caching mode.
    pub fn caching_mode(&self) -> CachingMode {
        CachingMode::from_u8(self.inner.mode.load(Ordering::Acquire))
    }

    /// Switch the caching mode.
    ///
    /// Cached listings are dropped so the new policy starts from the medium.
    /// Open file handles are unaffected.
    pub fn set_caching_mode(&self, mode: CachingMode) {
        let previous = self.inner.mode.swap(mode.to_u8(), Ordering::AcqRel);
        if previous != mode.to_u8() {
            debug!(?mode, "vfs caching mode changed");
            self.clear_all_caches();
        }
    }

    // =========================================================================
    // Listing
    // =========================================================================

    /// List the entries of `dir`, honoring the caching mode.
    ///
    /// A missing directory lists as empty.
    pub fn list_files(&self, dir: &ResourcePath) -> VfsResult<Arc<Vec<FileMetadata>>> {
        let mode = self.caching_mode();
        if !mode.is_caching() {
            return Ok(Arc::new(read_listing(dir)?));
        }

        let cached = self.inner.listings.read().get(dir).cloned();
        let now = Utc::now();
        if let Some(listing) = cached {
            let verdict = revalidate(mode, &listing, now, self.inner.quantum, || {
                dir_mtime(&dir.to_path_buf())
            });
            match verdict {
                Freshness::Fresh => {
                    trace!(dir = %dir, "listing cache hit");
                    return Ok(listing.entries);
                }
                Freshness::Confirmed => {
                    if let Some(entry) = self.inner.listings.write().get_mut(dir) {
                        entry.checked_at = now;
                    }
                    return Ok(listing.entries);
                }
                Freshness::Vanished => {
                    self.inner.listings.write().remove(dir);
                    return Ok(Arc::new(Vec::new()));
                }
                Freshness::Stale => {}
            }
        }

        // Refresh outside the lock: two racing refreshes read the same
        // directory and publish equivalent listings.
        let dir_modified = dir_mtime(&dir.to_path_buf());
        let entries = Arc::new(read_listing(dir)?);
        debug!(dir = %dir, entries = entries.len(), "listing refreshed");
        if dir_modified.is_some() {
            self.inner.listings.write().insert(
                dir.clone(),
                DirListing {
                    entries: Arc::clone(&entries),
                    dir_modified,
                    refreshed_at: now,
                    checked_at: now,
                },
            );
        }
        Ok(entries)
    }

    /// Drop the cached listing of one directory.
    pub fn clear_directory_cache(&self, dir: &ResourcePath) {
        if self.inner.listings.write().remove(dir).is_some() {
            trace!(dir = %dir, "listing cache cleared");
        }
    }

    /// Drop every cached listing.
    pub fn clear_all_caches(&self) {
        self.inner.listings.write().clear();
    }

    // =========================================================================
    // Entries
    // =========================================================================

    /// Metadata for a single path.
    pub fn metadata(&self, path: &ResourcePath) -> FileMetadata {
        FileMetadata::from_fs(path.clone(), &path.to_path_buf())
    }

    /// Whether `path` exists on the medium.
    pub fn exists(&self, path: &ResourcePath) -> bool {
        path.to_path_buf().exists()
    }

    /// Delete a file or an empty directory.
    pub fn delete(&self, path: &ResourcePath) -> bool {
        let fs_path = path.to_path_buf();
        let result = match classify(&fs_path) {
            EntryKind::Directory => fs::remove_dir(&fs_path),
            EntryKind::File => fs::remove_file(&fs_path),
        };
        match result {
            Ok(()) => true,
            Err(err) => {
                debug!(path = %path, %err, "delete failed");
                false
            }
        }
    }

    /// Create a single directory. Returns `false` if it could not be created.
    pub fn mkdir(&self, path: &ResourcePath) -> bool {
        match fs::create_dir(path.to_path_buf()) {
            Ok(()) => true,
            Err(err) => {
                debug!(path = %path, %err, "mkdir failed");
                false
            }
        }
    }

    // =========================================================================
    // Handles
    // =========================================================================

    /// A physical file handle.
    pub fn file(&self, path: &ResourcePath) -> FileRef {
        Arc::new(File::physical(path.clone(), self.clone()))
    }

    /// A physical file handle from a platform path.
    pub fn file_at(&self, path: &Path) -> VfsResult<FileRef> {
        Ok(self.file(&ResourcePath::from_path(path)?))
    }

    /// A read-only URL-backed file handle.
    pub fn url_file(&self, url: &str) -> VfsResult<FileRef> {
        Ok(Arc::new(File::url(url, self.clone())?))
    }

    /// A directory handle.
    ///
    /// `.jar`/`.zip` files are opened as archive directories.
    pub fn directory(&self, path: &ResourcePath) -> VfsResult<DirRef> {
        let fs_path = path.to_path_buf();
        let ext = path.extension();
        if (ext.eq_ignore_ascii_case("jar") || ext.eq_ignore_ascii_case("zip")) && fs_path.is_file() {
            let archive = Arc::new(Archive::open(path.clone())?);
            return Ok(Arc::new(Directory::archive_root(archive)));
        }
        Ok(Arc::new(Directory::physical(path.clone(), self.clone())))
    }

    /// A directory handle from a platform path.
    pub fn directory_at(&self, path: &Path) -> VfsResult<DirRef> {
        self.directory(&ResourcePath::from_path(path)?)
    }

    // =========================================================================
    // Network
    // =========================================================================

    /// Fetch a URL body. Blocks on the socket; no cancellation is offered.
    pub(crate) fn fetch(&self, url: &str) -> VfsResult<Vec<u8>> {
        let agent = self.inner.agent.get_or_init(|| {
            ureq::Agent::config_builder()
                .timeout_global(Some(self.inner.network_timeout))
                .build()
                .new_agent()
        });

        let response = agent
            .get(url)
            .header("User-Agent", self.inner.user_agent.as_str())
            .call()
            .map_err(|e| VfsError::Network {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let mut body = Vec::new();
        response
            .into_body()
            .into_reader()
            .read_to_end(&mut body)
            .map_err(|e| VfsError::Network {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(body)
    }
}

impl std::fmt::Debug for Vfs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vfs")
            .field("mode", &self.caching_mode())
            .field("cached_dirs", &self.inner.listings.read().len())
            .finish()
    }
}

fn dir_mtime(path: &Path) -> Option<DateTime<Utc>> {
    fs::metadata(path)
        .ok()
        .filter(|m| m.is_dir())
        .and_then(|m| m.modified().ok())
        .map(DateTime::<Utc>::from)
}

/// Read a directory from the medium, sorted by name.
fn read_listing(dir: &ResourcePath) -> VfsResult<Vec<FileMetadata>> {
    let fs_dir = dir.to_path_buf();
    let reader = match fs::read_dir(&fs_dir) {
        Ok(reader) => reader,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(VfsError::io(dir.as_str(), &err)),
    };

    let mut entries = Vec::new();
    for entry in reader {
        let entry = entry.map_err(|e| VfsError::io(dir.as_str(), &e))?;
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        let path = dir.join(&name)?;
        let kind = classify(&entry.path());
        let (len, modified) = match entry.metadata() {
            Ok(meta) => (
                if kind == EntryKind::File { meta.len() } else { 0 },
                meta.modified().ok().map(DateTime::<Utc>::from),
            ),
            Err(_) => (0, None),
        };
        entries.push(FileMetadata::new(path, kind, len, modified));
    }
    entries.sort_by(|a, b| a.name().cmp(b.name()));
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn names(listing: &[FileMetadata]) -> Vec<String> {
        listing.iter().map(|m| m.name().to_string()).collect()
    }

    fn setup() -> (TempDir, ResourcePath) {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Foo.csv"), "a,b\n").unwrap();
        let path = ResourcePath::from_path(dir.path()).unwrap();
        (dir, path)
    }

    #[test]
    fn test_no_caching_reflects_changes() {
        let (dir, path) = setup();
        let vfs = Vfs::with_mode(CachingMode::NoCaching);

        assert_eq!(names(&vfs.list_files(&path).unwrap()), ["Foo.csv"]);
        fs::write(dir.path().join("Bar.csv"), "x\n").unwrap();
        assert_eq!(names(&vfs.list_files(&path).unwrap()), ["Bar.csv", "Foo.csv"]);
    }

    #[test]
    fn test_full_caching_needs_explicit_invalidation() {
        let (dir, path) = setup();
        let vfs = Vfs::with_mode(CachingMode::FullCaching);

        assert_eq!(names(&vfs.list_files(&path).unwrap()), ["Foo.csv"]);
        fs::write(dir.path().join("Bar.csv"), "x\n").unwrap();
        assert_eq!(names(&vfs.list_files(&path).unwrap()), ["Foo.csv"]);

        vfs.clear_directory_cache(&path);
        assert_eq!(names(&vfs.list_files(&path).unwrap()), ["Bar.csv", "Foo.csv"]);
    }

    #[test]
    fn test_mode_switch_drops_listings() {
        let (dir, path) = setup();
        let vfs = Vfs::with_mode(CachingMode::FullCaching);
        vfs.list_files(&path).unwrap();
        fs::write(dir.path().join("Bar.csv"), "x\n").unwrap();

        vfs.set_caching_mode(CachingMode::CheckTimestamps);
        assert_eq!(vfs.caching_mode(), CachingMode::CheckTimestamps);
        assert_eq!(vfs.list_files(&path).unwrap().len(), 2);
    }

    #[test]
    fn test_missing_directory_lists_empty() {
        let (_dir, path) = setup();
        let vfs = Vfs::with_mode(CachingMode::CheckTimestamps);
        let missing = path.join("nope").unwrap();
        assert!(vfs.list_files(&missing).unwrap().is_empty());
    }

    #[test]
    fn test_mkdir_exists_delete() {
        let (_dir, path) = setup();
        let vfs = Vfs::with_mode(CachingMode::NoCaching);
        let sub = path.join("ns").unwrap();

        assert!(!vfs.exists(&sub));
        assert!(vfs.mkdir(&sub));
        assert!(!vfs.mkdir(&sub));
        assert!(vfs.exists(&sub));
        assert!(vfs.metadata(&sub).is_dir());

        let file = path.join("Foo.csv").unwrap();
        assert!(vfs.delete(&file));
        assert!(!vfs.delete(&file));
        assert!(vfs.delete(&sub));
    }
}
