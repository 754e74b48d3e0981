//! Read-only archive (jar/zip) index.

use std::fs;
use std::io::Read as _;

use chrono::{DateTime, Utc};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use super::error::{VfsError, VfsResult};
use super::metadata::{EntryKind, FileMetadata};
use super::path::ResourcePath;

/// Central-directory index of an archive file.
///
/// The index is read once when the archive is opened; entry bytes are read
/// on demand by reopening the archive.
#[derive(Debug)]
pub struct Archive {
    path: ResourcePath,
    modified: Option<DateTime<Utc>>,
    files: FxHashMap<String, u64>,
    dirs: FxHashSet<String>,
}

impl Archive {
    /// Open `path` and index its entries.
    pub fn open(path: ResourcePath) -> VfsResult<Self> {
        let fs_path = path.to_path_buf();
        let file = fs::File::open(&fs_path).map_err(|e| VfsError::io(path.as_str(), &e))?;
        let modified = file
            .metadata()
            .ok()
            .and_then(|m| m.modified().ok())
            .map(DateTime::<Utc>::from);
        let mut zip = zip::ZipArchive::new(file).map_err(|e| archive_error(&path, e))?;

        let mut files = FxHashMap::default();
        let mut dirs = FxHashSet::default();
        for index in 0..zip.len() {
            let entry = zip.by_index(index).map_err(|e| archive_error(&path, e))?;
            let name = entry.name().trim_start_matches('/').to_string();
            if entry.is_dir() {
                add_dir_with_parents(&mut dirs, name.trim_end_matches('/'));
            } else {
                if let Some((parent, _)) = name.rsplit_once('/') {
                    add_dir_with_parents(&mut dirs, parent);
                }
                files.insert(name, entry.size());
            }
        }
        debug!(archive = %path, files = files.len(), dirs = dirs.len(), "archive indexed");

        Ok(Self {
            path,
            modified,
            files,
            dirs,
        })
    }

    /// Path of the archive file itself.
    pub fn path(&self) -> &ResourcePath {
        &self.path
    }

    /// Whether `entry` names a file in the archive.
    pub fn contains_file(&self, entry: &str) -> bool {
        self.files.contains_key(entry)
    }

    /// Whether `prefix` names a directory in the archive (`""` is the root).
    pub fn contains_dir(&self, prefix: &str) -> bool {
        prefix.is_empty() || self.dirs.contains(prefix)
    }

    /// Immediate children of `prefix` as `(files, dirs)`, sorted by name.
    pub fn children(&self, prefix: &str) -> (Vec<String>, Vec<String>) {
        let mut files: Vec<String> = self
            .files
            .keys()
            .filter_map(|name| immediate_child(prefix, name))
            .map(str::to_owned)
            .collect();
        let mut dirs: Vec<String> = self
            .dirs
            .iter()
            .filter_map(|name| immediate_child(prefix, name))
            .map(str::to_owned)
            .collect();
        files.sort();
        dirs.sort();
        (files, dirs)
    }

    /// Metadata for an entry, using the archive's own timestamp.
    pub fn metadata(&self, entry: &str) -> FileMetadata {
        let display = self.entry_path(entry);
        if let Some(len) = self.files.get(entry) {
            FileMetadata::new(display, EntryKind::File, *len, self.modified)
        } else if self.contains_dir(entry) {
            FileMetadata::new(display, EntryKind::Directory, 0, self.modified)
        } else {
            FileMetadata::missing(display)
        }
    }

    /// Read an entry's bytes.
    pub fn read(&self, entry: &str) -> VfsResult<Vec<u8>> {
        if !self.contains_file(entry) {
            return Err(VfsError::NotFound(self.entry_path(entry).to_string()));
        }
        let file = fs::File::open(self.path.to_path_buf())
            .map_err(|e| VfsError::io(self.path.as_str(), &e))?;
        let mut zip = zip::ZipArchive::new(file).map_err(|e| archive_error(&self.path, e))?;
        let mut reader = zip.by_name(entry).map_err(|e| archive_error(&self.path, e))?;
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| VfsError::io(self.entry_path(entry).as_str(), &e))?;
        Ok(bytes)
    }

    /// Display path of an entry: the archive path followed by the entry name.
    pub fn entry_path(&self, entry: &str) -> ResourcePath {
        self.path.join(entry).unwrap_or_else(|_| self.path.clone())
    }
}

fn archive_error(path: &ResourcePath, err: zip::result::ZipError) -> VfsError {
    VfsError::Archive {
        path: path.to_string(),
        message: err.to_string(),
    }
}

fn add_dir_with_parents(dirs: &mut FxHashSet<String>, dir: &str) {
    let mut current = dir;
    while !current.is_empty() && dirs.insert(current.to_string()) {
        current = match current.rsplit_once('/') {
            Some((parent, _)) => parent,
            None => "",
        };
    }
}

/// `name` relative to `prefix` if it sits directly inside it.
fn immediate_child<'a>(prefix: &str, name: &'a str) -> Option<&'a str> {
    let rest = if prefix.is_empty() {
        name
    } else {
        name.strip_prefix(prefix)?.strip_prefix('/')?
    };
    (!rest.is_empty() && !rest.contains('/')).then_some(rest)
}
