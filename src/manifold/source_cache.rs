//! Generated-source memo per top-level FQN.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::trace;

struct Entry {
    revision: u64,
    text: Arc<str>,
}

/// Last generated source per FQN, tagged with the model revision it was
/// derived from.
///
/// An entry is only served for the exact revision it was stored with, so a
/// model change makes it unreachable even before [`invalidate`](Self::invalidate)
/// drops it.
#[derive(Default)]
pub struct SourceCache {
    entries: RwLock<FxHashMap<String, Entry>>,
}

impl SourceCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached text for `fqn` if it was generated at `revision`.
    pub fn get(&self, fqn: &str, revision: u64) -> Option<Arc<str>> {
        let entries = self.entries.read();
        let entry = entries.get(fqn)?;
        if entry.revision == revision {
            trace!(fqn, revision, "source cache hit");
            Some(Arc::clone(&entry.text))
        } else {
            None
        }
    }

    /// Remember `text` for `fqn` at `revision`. An entry for a newer
    /// revision is never replaced by an older one.
    pub fn store(&self, fqn: &str, revision: u64, text: Arc<str>) {
        let mut entries = self.entries.write();
        match entries.get_mut(fqn) {
            Some(entry) if entry.revision > revision => {}
            Some(entry) => {
                entry.revision = revision;
                entry.text = text;
            }
            None => {
                entries.insert(fqn.to_string(), Entry { revision, text });
            }
        }
    }

    /// Drop the entry for `fqn`.
    pub fn invalidate(&self, fqn: &str) -> bool {
        let removed = self.entries.write().remove(fqn).is_some();
        if removed {
            trace!(fqn, "source cache invalidated");
        }
        removed
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
