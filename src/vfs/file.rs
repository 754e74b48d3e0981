//! File handles over physical, archive and URL-backed resources.
//!
//! ```text
//! File
//! ├── Physical      read / write / append / delete / navigate
//! ├── ArchiveEntry  read / navigate
//! └── Url           read only, everything else is Unsupported
//! ```

use std::fmt;
use std::fs;
use std::hash::{Hash, Hasher};
use std::io::{Cursor, Read, Write};
use std::sync::Arc;

use super::archive::Archive;
use super::dir::{DirRef, Directory};
use super::error::{VfsError, VfsResult};
use super::metadata::FileMetadata;
use super::path::ResourcePath;
use super::system::Vfs;

/// Shared file handle.
pub type FileRef = Arc<File>;

/// Which medium backs a [`File`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// A file on the local file system.
    Physical,
    /// An entry inside a jar/zip archive.
    ArchiveEntry,
    /// A read-only network resource.
    Url,
}

/// A file handle.
///
/// Handles compare equal when they name the same resource on the same
/// medium.
pub struct File {
    path: ResourcePath,
    source: FileSource,
}

enum FileSource {
    Physical { vfs: Vfs },
    ArchiveEntry { archive: Arc<Archive>, entry: String },
    Url { url: String, vfs: Vfs },
}

impl File {
    pub(crate) fn physical(path: ResourcePath, vfs: Vfs) -> Self {
        Self {
            path,
            source: FileSource::Physical { vfs },
        }
    }

    pub(crate) fn archive_entry(archive: Arc<Archive>, entry: String) -> Self {
        Self {
            path: archive.entry_path(&entry),
            source: FileSource::ArchiveEntry { archive, entry },
        }
    }

    /// A URL-backed file. The path is derived from the part after the scheme.
    pub(crate) fn url(url: &str, vfs: Vfs) -> VfsResult<Self> {
        let (_, rest) = url
            .split_once("://")
            .ok_or_else(|| VfsError::InvalidPath(format!("{url} is not a URL")))?;
        let rest = rest.split(['?', '#']).next().unwrap_or(rest);
        let path = ResourcePath::parse(&format!("/{rest}"))?;
        Ok(Self {
            path,
            source: FileSource::Url {
                url: url.to_string(),
                vfs,
            },
        })
    }

    // =========================================================================
    // Identity
    // =========================================================================

    /// Normalized path of the file.
    pub fn path(&self) -> &ResourcePath {
        &self.path
    }

    /// File name including extension.
    pub fn name(&self) -> &str {
        self.path.name()
    }

    /// Extension without the dot, or `""`.
    pub fn extension(&self) -> &str {
        self.path.extension()
    }

    /// Name without extension.
    pub fn base_name(&self) -> &str {
        self.path.base_name()
    }

    /// The backing medium.
    pub fn kind(&self) -> FileKind {
        match self.source {
            FileSource::Physical { .. } => FileKind::Physical,
            FileSource::ArchiveEntry { .. } => FileKind::ArchiveEntry,
            FileSource::Url { .. } => FileKind::Url,
        }
    }

    /// The URL of a URL-backed file.
    pub fn url_str(&self) -> Option<&str> {
        match &self.source {
            FileSource::Url { url, .. } => Some(url),
            _ => None,
        }
    }

    /// The containing directory.
    pub fn parent(&self) -> VfsResult<DirRef> {
        match &self.source {
            FileSource::Physical { vfs } => {
                let parent = self.path.parent().ok_or_else(|| VfsError::NotFound(self.path.to_string()))?;
                vfs.directory(&parent)
            }
            FileSource::ArchiveEntry { archive, entry } => {
                let prefix = entry.rsplit_once('/').map_or("", |(dir, _)| dir);
                Ok(Arc::new(Directory::archive(Arc::clone(archive), prefix.to_string())))
            }
            FileSource::Url { url, .. } => Err(VfsError::unsupported("parent", url.as_str())),
        }
    }

    /// Whether this file lives (transitively) inside `dir`.
    pub fn is_descendant_of(&self, dir: &Directory) -> VfsResult<bool> {
        if let FileSource::Url { url, .. } = &self.source {
            return Err(VfsError::unsupported("is_descendant_of", url.as_str()));
        }
        Ok(self.path.is_descendant_of(dir.path()))
    }

    // =========================================================================
    // Content
    // =========================================================================

    /// Open the file for reading.
    ///
    /// For URL-backed files this blocks on the network.
    pub fn open_read(&self) -> VfsResult<Box<dyn Read + Send>> {
        match &self.source {
            FileSource::Physical { .. } => {
                let file = fs::File::open(self.path.to_path_buf())
                    .map_err(|e| VfsError::io(self.path.as_str(), &e))?;
                Ok(Box::new(file))
            }
            FileSource::ArchiveEntry { archive, entry } => {
                Ok(Box::new(Cursor::new(archive.read(entry)?)))
            }
            FileSource::Url { url, vfs } => Ok(Box::new(Cursor::new(vfs.fetch(url)?))),
        }
    }

    /// Open the file for writing, truncating existing content.
    pub fn open_write(&self) -> VfsResult<Box<dyn Write + Send>> {
        self.open_writable("open_write", false)
    }

    /// Open the file for appending.
    pub fn open_append(&self) -> VfsResult<Box<dyn Write + Send>> {
        self.open_writable("open_append", true)
    }

    fn open_writable(&self, operation: &'static str, append: bool) -> VfsResult<Box<dyn Write + Send>> {
        match &self.source {
            FileSource::Physical { .. } => {
                let file = fs::OpenOptions::new()
                    .create(true)
                    .write(true)
                    .append(append)
                    .truncate(!append)
                    .open(self.path.to_path_buf())
                    .map_err(|e| VfsError::io(self.path.as_str(), &e))?;
                Ok(Box::new(file))
            }
            _ => Err(self.unsupported(operation)),
        }
    }

    /// Read the whole file.
    pub fn read_bytes(&self) -> VfsResult<Vec<u8>> {
        match &self.source {
            FileSource::Physical { .. } => {
                fs::read(self.path.to_path_buf()).map_err(|e| VfsError::io(self.path.as_str(), &e))
            }
            FileSource::ArchiveEntry { archive, entry } => archive.read(entry),
            FileSource::Url { url, vfs } => vfs.fetch(url),
        }
    }

    /// Read the whole file as UTF-8 (lossy for invalid sequences).
    pub fn read_to_string(&self) -> VfsResult<String> {
        let bytes = self.read_bytes()?;
        Ok(match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
        })
    }

    // =========================================================================
    // Medium
    // =========================================================================

    /// Metadata snapshot.
    pub fn metadata(&self) -> VfsResult<FileMetadata> {
        match &self.source {
            FileSource::Physical { vfs } => Ok(vfs.metadata(&self.path)),
            FileSource::ArchiveEntry { archive, entry } => Ok(archive.metadata(entry)),
            FileSource::Url { .. } => Err(self.unsupported("metadata")),
        }
    }

    /// Whether the file exists.
    pub fn exists(&self) -> VfsResult<bool> {
        match &self.source {
            FileSource::Physical { vfs } => Ok(vfs.exists(&self.path)),
            FileSource::ArchiveEntry { archive, entry } => Ok(archive.contains_file(entry)),
            FileSource::Url { .. } => Err(self.unsupported("exists")),
        }
    }

    /// Delete the file. Returns `false` if the medium refused.
    pub fn delete(&self) -> VfsResult<bool> {
        match &self.source {
            FileSource::Physical { vfs } => Ok(vfs.delete(&self.path)),
            _ => Err(self.unsupported("delete")),
        }
    }

    fn unsupported(&self, operation: &'static str) -> VfsError {
        let path = self.url_str().map_or_else(|| self.path.to_string(), str::to_owned);
        VfsError::unsupported(operation, path)
    }

    fn identity(&self) -> (FileKind, &str) {
        let key = self.url_str().unwrap_or(self.path.as_str());
        (self.kind(), key)
    }
}

impl PartialEq for File {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for File {}

impl Hash for File {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl fmt::Debug for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("File")
            .field("kind", &self.kind())
            .field("path", &self.path.as_str())
            .finish()
    }
}

impl fmt::Display for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.url_str() {
            Some(url) => f.write_str(url),
            None => f.write_str(self.path.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::CachingMode;
    use tempfile::TempDir;

    #[test]
    fn test_physical_read_write_append() {
        let dir = TempDir::new().unwrap();
        let vfs = Vfs::with_mode(CachingMode::NoCaching);
        let file = vfs.file_at(&dir.path().join("notes.txt")).unwrap();

        assert!(!file.exists().unwrap());
        file.open_write().unwrap().write_all(b"one\n").unwrap();
        file.open_append().unwrap().write_all(b"two\n").unwrap();
        assert_eq!(file.read_to_string().unwrap(), "one\ntwo\n");
        assert_eq!(file.metadata().unwrap().len, 8);

        let mut text = String::new();
        file.open_read().unwrap().read_to_string(&mut text).unwrap();
        assert_eq!(text, "one\ntwo\n");

        assert!(file.delete().unwrap());
        assert!(!file.exists().unwrap());
        assert!(matches!(file.read_bytes(), Err(VfsError::NotFound(_))));
    }

    #[test]
    fn test_url_file_only_reads() {
        let vfs = Vfs::with_mode(CachingMode::NoCaching);
        let file = vfs.url_file("https://example.com/data/Foo.json?v=2").unwrap();

        assert_eq!(file.kind(), FileKind::Url);
        assert_eq!(file.name(), "Foo.json");
        assert_eq!(file.base_name(), "Foo");
        assert!(matches!(file.open_write(), Err(err) if err.is_unsupported()));
        assert!(matches!(file.open_append(), Err(err) if err.is_unsupported()));
        assert!(file.delete().unwrap_err().is_unsupported());
        assert!(file.metadata().unwrap_err().is_unsupported());
        assert!(file.exists().unwrap_err().is_unsupported());
        assert!(file.parent().unwrap_err().is_unsupported());

        let dir = vfs.directory(&ResourcePath::parse("/example.com").unwrap()).unwrap();
        assert!(file.is_descendant_of(&dir).unwrap_err().is_unsupported());
    }

    #[test]
    fn test_url_without_scheme_is_rejected() {
        let vfs = Vfs::with_mode(CachingMode::NoCaching);
        assert!(matches!(vfs.url_file("example.com/Foo.json"), Err(VfsError::InvalidPath(_))));
    }

    #[test]
    fn test_identity_equality() {
        let dir = TempDir::new().unwrap();
        let vfs = Vfs::with_mode(CachingMode::NoCaching);
        let a = vfs.file_at(&dir.path().join("Foo.csv")).unwrap();
        let b = vfs.file_at(&dir.path().join("./Foo.csv")).unwrap();
        let c = vfs.file_at(&dir.path().join("Bar.csv")).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_parent_and_containment() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("ns")).unwrap();
        fs::write(dir.path().join("ns/Foo.csv"), "a\n").unwrap();
        let vfs = Vfs::with_mode(CachingMode::NoCaching);

        let root = vfs.directory_at(dir.path()).unwrap();
        let file = root.file("ns/Foo.csv").unwrap();
        assert_eq!(file.parent().unwrap().name(), "ns");
        assert!(file.is_descendant_of(&root).unwrap());

        let other = TempDir::new().unwrap();
        let elsewhere = vfs.directory_at(other.path()).unwrap();
        assert!(!file.is_descendant_of(&elsewhere).unwrap());
    }
}
