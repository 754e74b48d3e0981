//! File metadata and file-vs-directory classification.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};

use super::path::ResourcePath;

/// Suffixes that are assumed to name files without issuing a stat call.
const ASSUMED_FILE_SUFFIXES: &[&str] = &[
    "bmp", "class", "csv", "gif", "jar", "java", "jpeg", "jpg", "json", "png", "properties",
    "txt", "wbmp", "wsdl", "xml", "xsd", "yaml", "yml",
];

/// Whether `suffix` is on the assumed-file allow-list.
pub fn is_assumed_file_suffix(suffix: &str) -> bool {
    ASSUMED_FILE_SUFFIXES
        .iter()
        .any(|s| s.eq_ignore_ascii_case(suffix))
}

/// Classification of a file system entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Regular file (or anything that is not a directory).
    File,
    /// Directory.
    Directory,
}

/// Classify `path`, consulting the suffix allow-list before stat-ing.
pub fn classify(path: &Path) -> EntryKind {
    let assumed = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(is_assumed_file_suffix);
    if !assumed && path.is_dir() {
        EntryKind::Directory
    } else {
        EntryKind::File
    }
}

/// Snapshot of a single entry's metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    /// Normalized path of the entry.
    pub path: ResourcePath,
    /// Size in bytes (0 for directories and missing entries).
    pub len: u64,
    /// Last modification time, when the medium reports one.
    pub modified: Option<DateTime<Utc>>,
    /// Whether the entry existed when the snapshot was taken.
    pub exists: bool,
    kind: EntryKind,
}

impl FileMetadata {
    /// Create metadata for an existing entry.
    pub fn new(
        path: ResourcePath,
        kind: EntryKind,
        len: u64,
        modified: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            path,
            len,
            modified,
            exists: true,
            kind,
        }
    }

    /// Metadata for an entry that does not exist.
    pub fn missing(path: ResourcePath) -> Self {
        Self {
            path,
            len: 0,
            modified: None,
            exists: false,
            kind: EntryKind::File,
        }
    }

    /// Stat a physical path.
    pub fn from_fs(path: ResourcePath, fs_path: &Path) -> Self {
        let kind = classify(fs_path);
        match fs::metadata(fs_path) {
            Ok(meta) => {
                let modified = meta.modified().ok().map(DateTime::<Utc>::from);
                let len = if kind == EntryKind::File { meta.len() } else { 0 };
                Self::new(path, kind, len, modified)
            }
            Err(_) => Self::missing(path),
        }
    }

    /// Entry name (last path segment).
    pub fn name(&self) -> &str {
        self.path.name()
    }

    /// The entry classification.
    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    /// Whether this is a file. Always `!is_dir()`.
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    /// Whether this is a directory. Always `!is_file()`.
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_assumed_suffix_short_circuits_stat() {
        let dir = TempDir::new().unwrap();
        // A directory whose name carries an assumed-file suffix is still a "file".
        let odd = dir.path().join("weird.properties");
        fs::create_dir(&odd).unwrap();
        assert_eq!(classify(&odd), EntryKind::File);

        let plain = dir.path().join("nested");
        fs::create_dir(&plain).unwrap();
        assert_eq!(classify(&plain), EntryKind::Directory);
    }

    #[test]
    fn test_file_dir_are_exclusive() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("Foo.csv");
        fs::write(&file, "a,b\n").unwrap();

        let path = ResourcePath::from_path(&file).unwrap();
        let meta = FileMetadata::from_fs(path, &file);
        assert!(meta.exists);
        assert_eq!(meta.len, 4);
        assert_eq!(meta.is_file(), !meta.is_dir());
        assert_eq!(meta.name(), "Foo.csv");
    }

    #[test]
    fn test_missing_entry() {
        let dir = TempDir::new().unwrap();
        let gone = dir.path().join("gone.txt");
        let meta = FileMetadata::from_fs(ResourcePath::from_path(&gone).unwrap(), &gone);
        assert!(!meta.exists);
        assert!(meta.is_file());
    }
}
