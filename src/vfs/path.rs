//! Normalized resource paths.

use std::fmt;
use std::path::{Path, PathBuf};

use super::error::{VfsError, VfsResult};

/// An immutable, normalized, slash-delimited path.
///
/// Both `/` and `\` are accepted as separators; `.` segments are dropped and
/// `..` segments pop their parent. The root is one of `/`, an upper-cased
/// drive (`C:/`), or empty for relative paths. Equality is by the normalized
/// string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourcePath {
    text: String,
    root_len: usize,
}

impl ResourcePath {
    /// Parse and normalize a path string.
    pub fn parse(path: &str) -> VfsResult<Self> {
        let (root, rest) = split_root(path);
        let mut segments: Vec<&str> = Vec::new();
        for segment in rest.split(['/', '\\']) {
            match segment {
                "" | "." => {}
                ".." => {
                    if segments.pop().is_none() {
                        return Err(VfsError::InvalidPath(format!(
                            "{path} escapes its root"
                        )));
                    }
                }
                s => segments.push(s),
            }
        }
        Ok(Self::from_parts(&root, &segments))
    }

    /// Normalize a file system path.
    pub fn from_path(path: &Path) -> VfsResult<Self> {
        let text = path
            .to_str()
            .ok_or_else(|| VfsError::InvalidPath(path.to_string_lossy().into_owned()))?;
        Self::parse(text)
    }

    fn from_parts(root: &str, segments: &[&str]) -> Self {
        let mut text = String::with_capacity(root.len() + segments.iter().map(|s| s.len() + 1).sum::<usize>());
        text.push_str(root);
        text.push_str(&segments.join("/"));
        Self {
            text,
            root_len: root.len(),
        }
    }

    /// The normalized path string.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Whether the path has a root (`/` or a drive).
    pub fn is_absolute(&self) -> bool {
        self.root_len > 0
    }

    /// Whether this is a bare root (or the empty relative path).
    pub fn is_root(&self) -> bool {
        self.text.len() == self.root_len
    }

    /// Path segments below the root.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.text[self.root_len..].split('/').filter(|s| !s.is_empty())
    }

    /// Last segment, or the empty string for a root.
    pub fn name(&self) -> &str {
        let tail = &self.text[self.root_len..];
        tail.rsplit('/').next().unwrap_or("")
    }

    /// Text after the last `.` of the name, or `""`.
    pub fn extension(&self) -> &str {
        let name = self.name();
        match name.rfind('.') {
            Some(dot) => &name[dot + 1..],
            None => "",
        }
    }

    /// Name without its extension.
    pub fn base_name(&self) -> &str {
        let name = self.name();
        match name.rfind('.') {
            Some(dot) => &name[..dot],
            None => name,
        }
    }

    /// Parent path, or `None` at the root.
    pub fn parent(&self) -> Option<ResourcePath> {
        if self.is_root() {
            return None;
        }
        let cut = match self.text[self.root_len..].rfind('/') {
            Some(pos) => self.root_len + pos,
            None => self.root_len,
        };
        Some(Self {
            text: self.text[..cut].to_string(),
            root_len: self.root_len,
        })
    }

    /// Join a relative fragment and normalize the result.
    ///
    /// Fails if `..` segments would climb past the root.
    pub fn join(&self, fragment: &str) -> VfsResult<ResourcePath> {
        let mut segments: Vec<&str> = self.segments().collect();
        for segment in fragment.split(['/', '\\']) {
            match segment {
                "" | "." => {}
                ".." => {
                    if segments.pop().is_none() {
                        return Err(VfsError::InvalidPath(format!(
                            "joining {fragment} to {self} escapes the root"
                        )));
                    }
                }
                s => segments.push(s),
            }
        }
        Ok(Self::from_parts(&self.text[..self.root_len], &segments))
    }

    /// Whether `self` is strictly below `ancestor`.
    pub fn is_descendant_of(&self, ancestor: &ResourcePath) -> bool {
        self.relative_to(ancestor).is_some_and(|rel| !rel.is_empty())
    }

    /// Slash-delimited path of `self` relative to `ancestor`.
    ///
    /// Returns `Some("")` when the paths are equal.
    pub fn relative_to(&self, ancestor: &ResourcePath) -> Option<&str> {
        if self.text == ancestor.text {
            return Some("");
        }
        let rest = self.text.strip_prefix(ancestor.text.as_str())?;
        if ancestor.is_root() {
            return Some(rest);
        }
        rest.strip_prefix('/')
    }

    /// Convert to a platform path.
    pub fn to_path_buf(&self) -> PathBuf {
        PathBuf::from(&self.text)
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl TryFrom<&str> for ResourcePath {
    type Error = VfsError;

    fn try_from(value: &str) -> VfsResult<Self> {
        Self::parse(value)
    }
}

impl TryFrom<&Path> for ResourcePath {
    type Error = VfsError;

    fn try_from(value: &Path) -> VfsResult<Self> {
        Self::from_path(value)
    }
}

/// Split off the root element: `/`, `\\` (network), `X:` drive, or nothing.
fn split_root(path: &str) -> (String, &str) {
    if let Some(rest) = path.strip_prefix("\\\\") {
        return ("//".to_string(), rest);
    }
    if let Some(rest) = path.strip_prefix(['/', '\\']) {
        return ("/".to_string(), rest);
    }
    let bytes = path.as_bytes();
    if bytes.len() >= 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic() {
        let drive = (bytes[0] as char).to_ascii_uppercase();
        return (format!("{drive}:/"), &path[2..]);
    }
    (String::new(), path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizes_dots_and_separators() {
        let path = ResourcePath::parse("/usr/./local\\lib/../bin/").unwrap();
        assert_eq!(path.as_str(), "/usr/local/bin");
        assert_eq!(path.name(), "bin");
    }

    #[test]
    fn test_equality_by_normalized_text() {
        let a = ResourcePath::parse("/a/b/c.csv").unwrap();
        let b = ResourcePath::parse("/a//b/./x/../c.csv").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_drive_root() {
        let path = ResourcePath::parse("c:\\temp\\Foo.csv").unwrap();
        assert_eq!(path.as_str(), "C:/temp/Foo.csv");
        assert!(path.is_absolute());
    }

    #[test]
    fn test_escape_past_root_is_rejected() {
        assert!(ResourcePath::parse("/a/../..").is_err());
        let base = ResourcePath::parse("/usr").unwrap();
        assert!(base.join("../..").is_err());
        assert_eq!(base.join("/..").unwrap().as_str(), "/");
    }

    #[test]
    fn test_name_parts() {
        let path = ResourcePath::parse("/res/logo.final.png").unwrap();
        assert_eq!(path.extension(), "png");
        assert_eq!(path.base_name(), "logo.final");
        let bare = ResourcePath::parse("/res/Makefile").unwrap();
        assert_eq!(bare.extension(), "");
        assert_eq!(bare.base_name(), "Makefile");
    }

    #[test]
    fn test_parent_and_relative() {
        let root = ResourcePath::parse("/src").unwrap();
        let file = ResourcePath::parse("/src/ns/Foo.csv").unwrap();
        assert_eq!(file.parent().unwrap().as_str(), "/src/ns");
        assert_eq!(file.relative_to(&root), Some("ns/Foo.csv"));
        assert!(file.is_descendant_of(&root));
        assert!(!root.is_descendant_of(&root));

        let sibling = ResourcePath::parse("/srcx/Foo.csv").unwrap();
        assert!(!sibling.is_descendant_of(&root));

        let top = ResourcePath::parse("/").unwrap();
        assert!(top.parent().is_none());
        assert_eq!(file.relative_to(&top), Some("src/ns/Foo.csv"));
    }
}
