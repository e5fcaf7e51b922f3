//! The virtual filesystem core: path handling, placeholder stream, on-disk
//! cache, catalog tree and the read/attribute/listing logic on top of them.

pub mod cache;
pub mod path;
pub mod placeholder;
pub mod tree;
pub mod vfs;

/// Error type returned by the on-disk track cache.
pub use cache::CacheError;
/// The composed read-only filesystem over the catalog tree.
pub use vfs::{CatalogFs, EntryKind, FileAttributes};
