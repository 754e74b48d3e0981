//! Per-type models and the store that owns them.
//!
//! A model is the unit of generation: one per top-level FQN, owning the
//! files that back it and whatever parse state a driver caches on it.
//!
//! - [`Model`] - backing-set lifecycle shared by every model kind
//! - [`SingleFileModel`] - one expected file, memoized parse artifact
//! - [`ModelStore`] - FQN → model, at-most-once creation

mod single_file;
mod store;

pub use single_file::SingleFileModel;
pub use store::ModelStore;

use crate::vfs::{File, FileRef};

/// Backing-set lifecycle of a model.
///
/// `add_file` and `remove_file` change which files back the model without
/// touching content-derived state. `update_file` means the bytes of a file
/// changed and discards that state.
pub trait Model: Send + Sync {
    /// Top-level FQN this model generates.
    fn fqn(&self) -> &str;

    /// Backing files in discovery order.
    fn files(&self) -> Vec<FileRef>;

    /// Counter that moves on every backing-set or content change.
    fn revision(&self) -> u64;

    /// Add a backing file. Adding a file twice is a no-op.
    fn add_file(&self, file: FileRef);

    /// Remove a backing file. Returns `false` if it was not part of the set.
    fn remove_file(&self, file: &File) -> bool;

    /// The content of `file` changed.
    fn update_file(&self, file: FileRef);

    /// Whether no file backs the model any more.
    fn is_empty(&self) -> bool {
        self.files().is_empty()
    }
}
