//! Virtual file system.
//!
//! ```text
//! Vfs ──list_files──▶ listing cache (per directory, per CachingMode)
//!  │
//!  ├── file()/url_file() ──▶ File { Physical | ArchiveEntry | Url }
//!  └── directory()       ──▶ Directory { Physical | Archive }
//!                              └── memoized child File/Directory wrappers
//! ```
//!
//! `delete`/`mkdir` mutate the medium and invalidate nothing beyond this
//! layer.

mod archive;
mod caching;
mod dir;
mod error;
mod file;
mod metadata;
mod path;
mod system;

pub use archive::Archive;
pub use caching::{CachingMode, DirListing};
pub use dir::{DirRef, Directory};
pub use error::{VfsError, VfsResult};
pub use file::{File, FileKind, FileRef};
pub use metadata::{classify, is_assumed_file_suffix, EntryKind, FileMetadata};
pub use path::ResourcePath;
pub use system::Vfs;
