//! Model expecting exactly one backing file per FQN.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use super::Model;
use crate::lazy::LazyCell;
use crate::manifold::{GenError, GenResult};
use crate::vfs::{File, FileRef};

/// Parse result tagged with the content revision it was derived from.
struct Parsed<A> {
    content: u64,
    result: GenResult<Arc<A>>,
}

/// A model whose FQN is expected to map to one file.
///
/// Extra files are tolerated: the first file stays primary and
/// [`is_ambiguous`](Self::is_ambiguous) reports the condition.
///
/// Two counters drive invalidation:
/// - `revision` moves on every `add_file`/`remove_file`/`update_file` and
///   keys the generated-source cache.
/// - `content` moves when the primary file's bytes may have changed and
///   keys the parsed artifact.
pub struct SingleFileModel<A> {
    fqn: String,
    files: RwLock<Vec<FileRef>>,
    revision: AtomicU64,
    content: AtomicU64,
    artifact: LazyCell<Parsed<A>>,
}

impl<A> SingleFileModel<A> {
    /// Create a model. Fails when `files` is empty.
    pub fn new(fqn: impl Into<String>, files: Vec<FileRef>) -> GenResult<Self> {
        let fqn = fqn.into();
        if files.is_empty() {
            return Err(GenError::EmptyBackingSet { fqn });
        }
        if files.len() > 1 {
            warn!(fqn = %fqn, count = files.len(), "ambiguous backing file set");
        }
        Ok(Self {
            fqn,
            files: RwLock::new(files),
            revision: AtomicU64::new(0),
            content: AtomicU64::new(0),
            artifact: LazyCell::new(),
        })
    }

    /// The file generation reads from.
    pub fn primary(&self) -> Option<FileRef> {
        self.files.read().first().cloned()
    }

    /// Whether more than one file claims this model.
    pub fn is_ambiguous(&self) -> bool {
        self.files.read().len() > 1
    }

    /// The parsed artifact, computing it from the primary file if needed.
    ///
    /// A result computed against content that changed in the meantime is
    /// discarded and recomputed.
    pub fn artifact(&self, parse: impl Fn(&File) -> GenResult<A>) -> GenResult<Arc<A>> {
        loop {
            let parsed = self.artifact.get_or_init(|| {
                let content = self.content.load(Ordering::Acquire);
                let result = match self.primary() {
                    Some(file) => parse(&file).map(Arc::new),
                    None => Err(GenError::EmptyBackingSet {
                        fqn: self.fqn.clone(),
                    }),
                };
                Some(Parsed { content, result })
            });
            match parsed {
                Some(parsed) if parsed.content == self.content.load(Ordering::Acquire) => {
                    return parsed.result.clone();
                }
                _ => self.artifact.clear(),
            }
        }
    }

    /// Whether a parsed artifact is currently cached.
    pub fn has_artifact(&self) -> bool {
        self.artifact.is_initialized()
    }

    fn invalidate_content(&self) {
        self.content.fetch_add(1, Ordering::AcqRel);
        self.artifact.clear();
    }

    fn bump(&self) {
        self.revision.fetch_add(1, Ordering::AcqRel);
    }
}

impl<A: Send + Sync> Model for SingleFileModel<A> {
    fn fqn(&self) -> &str {
        &self.fqn
    }

    fn files(&self) -> Vec<FileRef> {
        self.files.read().clone()
    }

    fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    fn add_file(&self, file: FileRef) {
        let mut files = self.files.write();
        if let Some(index) = files.iter().position(|f| *f == file) {
            // Re-created at the same path: the bytes are new.
            files[index] = file;
            if index == 0 {
                self.invalidate_content();
            }
            self.bump();
            return;
        }
        files.push(file);
        if files.len() > 1 {
            warn!(fqn = %self.fqn, count = files.len(), "ambiguous backing file set");
        }
        self.bump();
    }

    fn remove_file(&self, file: &File) -> bool {
        let mut files = self.files.write();
        let Some(index) = files.iter().position(|f| f.as_ref() == file) else {
            return false;
        };
        files.remove(index);
        if index == 0 {
            // A different file (or none) is primary now.
            self.invalidate_content();
        }
        self.bump();
        true
    }

    fn update_file(&self, file: FileRef) {
        let mut files = self.files.write();
        match files.iter().position(|f| *f == file) {
            Some(index) => {
                files.remove(index);
                files.insert(index, file);
            }
            None => files.push(file),
        }
        self.invalidate_content();
        self.bump();
        debug!(fqn = %self.fqn, revision = self.revision(), "model content updated");
    }
}

impl<A> fmt::Debug for SingleFileModel<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingleFileModel")
            .field("fqn", &self.fqn)
            .field("files", &*self.files.read())
            .field("revision", &self.revision.load(Ordering::Acquire))
            .finish()
    }
}
