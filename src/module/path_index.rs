//! Files under a module's source roots, grouped by extension and FQN.
//!
//! ```text
//! PathIndex
//! ├── by_extension: "csv"  → FqnCache { ns.Foo → File }
//! │                 "json" → FqnCache { ns.Foo → File, ns.deep.Bar → File }
//! └── reverse:      File   → ["ns.Foo"]
//! ```

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::fqn::{make_identifier, FqnCache};
use crate::vfs::{DirRef, File, FileRef, VfsResult};

/// Extension-partitioned namespace index of a module's files.
#[derive(Debug, Default)]
pub struct PathIndex {
    by_extension: FxHashMap<String, FqnCache<FileRef>>,
    reverse: FxHashMap<FileRef, Vec<String>>,
}

impl PathIndex {
    /// Scan `roots` in order. On duplicate FQNs the earlier root wins.
    pub fn build(roots: &[DirRef]) -> VfsResult<Self> {
        let mut index = Self::default();
        for root in roots {
            if root.exists() {
                index.scan(root, "")?;
            }
        }
        debug!(
            extensions = index.by_extension.len(),
            files = index.reverse.len(),
            "path index built"
        );
        Ok(index)
    }

    fn scan(&mut self, dir: &DirRef, namespace: &str) -> VfsResult<()> {
        for file in dir.list_files()? {
            let fqn = qualify_name(namespace, file.name());
            self.add_file(&fqn, &file);
        }
        for sub in dir.list_dirs()? {
            if is_package_name(sub.name()) {
                let child = qualify_package(namespace, sub.name());
                self.scan(&sub, &child)?;
            }
        }
        Ok(())
    }

    /// Index `file` under `fqn`. Returns `false` if another file of the
    /// same extension already claims the name.
    pub fn add_file(&mut self, fqn: &str, file: &FileRef) -> bool {
        let ext = file.extension().to_ascii_lowercase();
        let cache = self.by_extension.entry(ext).or_default();
        if cache.get(fqn).is_some() {
            trace!(fqn, file = %file, "fqn already claimed, keeping first");
            return false;
        }
        cache.add(fqn, FileRef::clone(file));
        let fqns = self.reverse.entry(FileRef::clone(file)).or_default();
        if !fqns.iter().any(|f| f == fqn) {
            fqns.push(fqn.to_string());
        }
        true
    }

    /// Drop `file` from `fqn`. Returns `false` if it was not indexed there.
    pub fn remove_file(&mut self, fqn: &str, file: &File) -> bool {
        let ext = file.extension().to_ascii_lowercase();
        let Some(cache) = self.by_extension.get_mut(&ext) else {
            return false;
        };
        if cache.get(fqn).is_none_or(|indexed| indexed.as_ref() != file) {
            return false;
        }
        cache.take(fqn);
        cache.prune(fqn);

        if let Some(fqns) = self.reverse.get_mut(file) {
            fqns.retain(|f| f != fqn);
            if fqns.is_empty() {
                self.reverse.remove(file);
            }
        }
        true
    }

    /// Every indexed file for `fqn`, ordered by extension.
    pub fn find_files(&self, fqn: &str) -> Vec<FileRef> {
        let mut found: Vec<(&str, FileRef)> = self
            .by_extension
            .iter()
            .filter_map(|(ext, cache)| cache.get(fqn).map(|f| (ext.as_str(), FileRef::clone(f))))
            .collect();
        found.sort_by(|a, b| a.0.cmp(b.0));
        found.into_iter().map(|(_, file)| file).collect()
    }

    /// The namespace index for one extension (case-insensitive).
    pub fn extension_cache(&self, ext: &str) -> Option<&FqnCache<FileRef>> {
        self.by_extension.get(&ext.to_ascii_lowercase())
    }

    /// Indexed extensions, sorted.
    pub fn extensions(&self) -> Vec<&str> {
        let mut exts: Vec<&str> = self.by_extension.keys().map(String::as_str).collect();
        exts.sort_unstable();
        exts
    }

    /// FQNs `file` is indexed under.
    pub fn fqns_for_file(&self, file: &File) -> &[String] {
        self.reverse.get(file).map(Vec::as_slice).unwrap_or_default()
    }

    /// Number of indexed files.
    pub fn len(&self) -> usize {
        self.reverse.len()
    }

    /// Whether nothing is indexed.
    pub fn is_empty(&self) -> bool {
        self.reverse.is_empty()
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.by_extension.clear();
        self.reverse.clear();
    }
}

/// FQN of a resource named `file_name` inside `namespace`.
///
/// The last extension is dropped and the base name is sanitized.
pub fn qualify_name(namespace: &str, file_name: &str) -> String {
    let base = match file_name.rfind('.') {
        Some(dot) if dot > 0 => &file_name[..dot],
        _ => file_name,
    };
    qualify_package(namespace, &make_identifier(base))
}

fn qualify_package(namespace: &str, segment: &str) -> String {
    if namespace.is_empty() {
        segment.to_string()
    } else {
        format!("{namespace}.{segment}")
    }
}

/// Directories such as `META-INF` are not namespaces.
pub(crate) fn is_package_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c == '_' || c == '$' || c.is_alphabetic())
        && chars.all(|c| c == '_' || c == '$' || c.is_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::{CachingMode, Vfs};
    use std::fs;
    use tempfile::TempDir;

    fn layout() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("ns/deep")).unwrap();
        fs::create_dir_all(dir.path().join("META-INF")).unwrap();
        fs::write(dir.path().join("ns/Foo.csv"), "a\n").unwrap();
        fs::write(dir.path().join("ns/Foo.json"), "{}").unwrap();
        fs::write(dir.path().join("ns/deep/my-data.properties"), "k=v\n").unwrap();
        fs::write(dir.path().join("META-INF/Skip.json"), "{}").unwrap();
        dir
    }

    #[test]
    fn test_build_groups_by_extension() {
        let tmp = layout();
        let vfs = Vfs::with_mode(CachingMode::NoCaching);
        let index = PathIndex::build(&[vfs.directory_at(tmp.path()).unwrap()]).unwrap();

        assert_eq!(index.extensions(), ["csv", "json", "properties"]);
        assert_eq!(index.extension_cache("CSV").unwrap().fqns(), ["ns.Foo"]);
        assert_eq!(index.extension_cache("json").unwrap().fqns(), ["ns.Foo"]);
        assert_eq!(index.extension_cache("properties").unwrap().fqns(), ["ns.deep.my_data"]);

        let files = index.find_files("ns.Foo");
        assert_eq!(files.iter().map(|f| f.name()).collect::<Vec<_>>(), ["Foo.csv", "Foo.json"]);
        assert_eq!(index.fqns_for_file(&files[0]), ["ns.Foo"]);
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_first_root_wins() {
        let first = layout();
        let second = layout();
        fs::write(second.path().join("ns/Only.csv"), "x\n").unwrap();
        let vfs = Vfs::with_mode(CachingMode::NoCaching);
        let roots = [
            vfs.directory_at(first.path()).unwrap(),
            vfs.directory_at(second.path()).unwrap(),
        ];
        let index = PathIndex::build(&roots).unwrap();

        let foo = &index.find_files("ns.Foo")[0];
        assert!(foo.is_descendant_of(&roots[0]).unwrap());
        assert!(index.find_files("ns.Only")[0].is_descendant_of(&roots[1]).unwrap());
    }

    #[test]
    fn test_incremental_add_remove() {
        let tmp = layout();
        let vfs = Vfs::with_mode(CachingMode::NoCaching);
        let root = vfs.directory_at(tmp.path()).unwrap();
        let mut index = PathIndex::build(&[root.dir("ns").unwrap()]).unwrap();
        assert_eq!(index.extension_cache("csv").unwrap().fqns(), ["Foo"]);

        let extra = root.file("ns/deep/Extra.csv").unwrap();
        assert!(index.add_file("deep.Extra", &extra));
        assert!(!index.add_file("deep.Extra", &extra));
        assert_eq!(index.extension_cache("csv").unwrap().fqns(), ["Foo", "deep.Extra"]);

        assert!(index.remove_file("deep.Extra", &extra));
        assert!(!index.remove_file("deep.Extra", &extra));
        assert_eq!(index.extension_cache("csv").unwrap().fqns(), ["Foo"]);
        assert!(index.fqns_for_file(&extra).is_empty());
    }

    #[test]
    fn test_qualify_name() {
        assert_eq!(qualify_name("ns", "Foo.csv"), "ns.Foo");
        assert_eq!(qualify_name("", "logo.final.png"), "logo_final");
        assert_eq!(qualify_name("a.b", "1st-file.json"), "a.b._1st_file");
        assert!(is_package_name("deep"));
        assert!(!is_package_name("META-INF"));
        assert!(!is_package_name("1x"));
    }
}
