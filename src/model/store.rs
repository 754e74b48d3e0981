//! Per-driver map from top-level FQN to its model.
//!
//! ```text
//! ModelStore
//! └── RwLock<FqnCache<Arc<LazyCell<M>>>>
//!         lookup: read lock, then the cell decides
//!         create: write lock only to insert the empty cell;
//!                 the model itself is built outside the lock
//! ```

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::Model;
use crate::fqn::FqnCache;
use crate::lazy::LazyCell;
use crate::manifold::{GenError, GenResult};

type Slot<M> = Arc<LazyCell<M>>;

/// Owns one model per top-level FQN.
pub struct ModelStore<M> {
    models: RwLock<FqnCache<Slot<M>>>,
}

impl<M> Default for ModelStore<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> ModelStore<M> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            models: RwLock::new(FqnCache::new()),
        }
    }

    fn slot(&self, fqn: &str) -> Option<Slot<M>> {
        self.models.read().get(fqn).cloned()
    }
}

impl<M: Model> ModelStore<M> {
    /// The model for `fqn`, if one has been created.
    pub fn get(&self, fqn: &str) -> Option<Arc<M>> {
        self.slot(fqn)?.peek().flatten()
    }

    /// The model for `fqn`, creating it with `create` if absent.
    ///
    /// At most one model is ever published per FQN: racing creators may both
    /// run `create`, but all of them return the first published model. When
    /// `create` fails the empty slot is dropped again.
    pub fn get_or_create(&self, fqn: &str, create: impl FnOnce() -> GenResult<M>) -> GenResult<Arc<M>> {
        let slot = match self.slot(fqn) {
            Some(slot) => slot,
            None => {
                let mut models = self.models.write();
                match models.get(fqn) {
                    Some(slot) => Arc::clone(slot),
                    None => {
                        let slot = Arc::new(LazyCell::new());
                        models.add(fqn, Arc::clone(&slot));
                        slot
                    }
                }
            }
        };

        let mut failure = None;
        let model = slot.get_or_init(|| match create() {
            Ok(model) => {
                debug!(fqn, "model created");
                Some(model)
            }
            Err(err) => {
                failure = Some(err);
                None
            }
        });

        match model {
            Some(model) => Ok(model),
            None => {
                self.evict_slot(fqn, &slot);
                Err(failure.unwrap_or_else(|| GenError::EmptyBackingSet {
                    fqn: fqn.to_string(),
                }))
            }
        }
    }

    fn evict_slot(&self, fqn: &str, slot: &Slot<M>) {
        let mut models = self.models.write();
        if models.get(fqn).is_some_and(|current| Arc::ptr_eq(current, slot)) {
            models.take(fqn);
            models.prune(fqn);
        }
    }

    /// Remove the model for `fqn`.
    pub fn remove(&self, fqn: &str) -> Option<Arc<M>> {
        let mut models = self.models.write();
        let slot = models.take(fqn)?;
        models.prune(fqn);
        debug!(fqn, "model removed");
        slot.peek().flatten()
    }

    /// Whether `model` is the one currently published for `fqn`.
    pub fn is_current(&self, fqn: &str, model: &Arc<M>) -> bool {
        self.get(fqn).is_some_and(|current| Arc::ptr_eq(&current, model))
    }

    /// Remove the model for `fqn` only if it is still `model`.
    pub fn remove_if_current(&self, fqn: &str, model: &Arc<M>) -> bool {
        let mut models = self.models.write();
        let current = models
            .get(fqn)
            .and_then(|slot| slot.peek().flatten())
            .is_some_and(|published| Arc::ptr_eq(&published, model));
        if current {
            models.take(fqn);
            models.prune(fqn);
            debug!(fqn, "stale model dropped");
        }
        current
    }

    /// Remove the model for `fqn` if it has no backing files left.
    pub fn remove_if_empty(&self, fqn: &str) -> bool {
        let mut models = self.models.write();
        let empty = models
            .get(fqn)
            .and_then(|slot| slot.peek().flatten())
            .is_some_and(|model| model.is_empty());
        if empty {
            models.take(fqn);
            models.prune(fqn);
            debug!(fqn, "model evicted, last file removed");
        }
        empty
    }

    /// Whether a model exists for `fqn`.
    pub fn contains(&self, fqn: &str) -> bool {
        self.get(fqn).is_some()
    }

    /// FQNs with a created model, depth first in creation order.
    pub fn fqns(&self) -> Vec<String> {
        self.models
            .read()
            .entries()
            .into_iter()
            .filter(|(_, slot)| matches!(slot.peek(), Some(Some(_))))
            .map(|(fqn, _)| fqn)
            .collect()
    }

    /// Number of created models.
    pub fn len(&self) -> usize {
        self.fqns().len()
    }

    /// Whether no model exists.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every model.
    pub fn clear(&self) {
        self.models.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SingleFileModel;
    use crate::vfs::{CachingMode, FileRef, Vfs};
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    type TestModel = SingleFileModel<()>;

    fn file(tmp: &TempDir, name: &str) -> FileRef {
        fs::write(tmp.path().join(name), "a\n").unwrap();
        Vfs::with_mode(CachingMode::NoCaching)
            .file_at(&tmp.path().join(name))
            .unwrap()
    }

    #[test]
    fn test_get_or_create_is_at_most_once() {
        let tmp = TempDir::new().unwrap();
        let foo = file(&tmp, "Foo.csv");
        let store = ModelStore::<TestModel>::new();
        let calls = AtomicUsize::new(0);

        let make = || {
            calls.fetch_add(1, Ordering::Relaxed);
            SingleFileModel::new("ns.Foo", vec![FileRef::clone(&foo)])
        };
        let a = store.get_or_create("ns.Foo", make).unwrap();
        let b = store.get_or_create("ns.Foo", make).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(calls.load(Ordering::Relaxed), 1);
        assert_eq!(store.fqns(), ["ns.Foo"]);
    }

    #[test]
    fn test_empty_backing_set_creates_nothing() {
        let store = ModelStore::<TestModel>::new();
        let err = store
            .get_or_create("ns.Foo", || SingleFileModel::new("ns.Foo", Vec::new()))
            .unwrap_err();
        assert!(matches!(err, GenError::EmptyBackingSet { .. }));
        assert!(store.get("ns.Foo").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_last_file_removal_evicts() {
        let tmp = TempDir::new().unwrap();
        let foo = file(&tmp, "Foo.csv");
        let store = ModelStore::<TestModel>::new();
        let model = store
            .get_or_create("ns.Foo", || SingleFileModel::new("ns.Foo", vec![FileRef::clone(&foo)]))
            .unwrap();

        assert!(!store.remove_if_empty("ns.Foo"));
        model.remove_file(&foo);
        assert!(store.remove_if_empty("ns.Foo"));
        assert!(store.get("ns.Foo").is_none());
        assert!(store.fqns().is_empty());
    }

    #[test]
    fn test_concurrent_creation_publishes_one_model() {
        let tmp = TempDir::new().unwrap();
        let foo = file(&tmp, "Foo.csv");
        let store = Arc::new(ModelStore::<TestModel>::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let foo = FileRef::clone(&foo);
                std::thread::spawn(move || {
                    store
                        .get_or_create("ns.Foo", || SingleFileModel::new("ns.Foo", vec![foo]))
                        .unwrap()
                })
            })
            .collect();
        let models: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(models.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn test_removal_during_creation_orphans_the_model() {
        let tmp = TempDir::new().unwrap();
        let foo = file(&tmp, "Foo.csv");
        let store = ModelStore::<TestModel>::new();

        let model = store
            .get_or_create("ns.Foo", || {
                assert!(store.remove("ns.Foo").is_none());
                SingleFileModel::new("ns.Foo", vec![FileRef::clone(&foo)])
            })
            .unwrap();
        assert!(store.get("ns.Foo").is_none());
        assert!(!store.is_current("ns.Foo", &model));

        let fresh = store
            .get_or_create("ns.Foo", || SingleFileModel::new("ns.Foo", vec![foo]))
            .unwrap();
        assert!(!Arc::ptr_eq(&model, &fresh));
        assert!(store.is_current("ns.Foo", &fresh));
        assert!(!store.remove_if_current("ns.Foo", &model));
        assert!(store.remove_if_current("ns.Foo", &fresh));
        assert!(store.is_empty());
    }

    #[test]
    fn test_remove_returns_model() {
        let tmp = TempDir::new().unwrap();
        let foo = file(&tmp, "Foo.csv");
        let store = ModelStore::<TestModel>::new();
        store
            .get_or_create("a.b.Foo", || SingleFileModel::new("a.b.Foo", vec![foo]))
            .unwrap();
        assert!(store.remove("a.b.Foo").is_some());
        assert!(store.remove("a.b.Foo").is_none());
        store.clear();
        assert!(store.is_empty());
    }
}
