//! Core library for presenting a remote, paginated music catalog
//! (artists → albums → tracks) as a read-only virtual filesystem. The crate
//! provides a catalog client for paginated track enumeration and audio
//! downloads, an on-disk cache that defers each download until a track is
//! really being played, a synthetic placeholder stream that satisfies the
//! playback daemon's probe reads in the meantime, and glue for mounting the
//! whole thing through FUSE.

/// Clients for talking to the remote music catalog.
pub mod catalog;
/// Environment-driven configuration and tuning constants.
pub mod config;
/// The virtual filesystem built from the catalog tree.
pub mod fs;
/// Adapter between the path-based filesystem core and the kernel.
pub mod mount;
