//! Client for the remote music catalog: paginated track enumeration and
//! blocking audio downloads.

pub mod client;
pub mod model;
pub mod progress;

/// Re-export of the high level catalog client.
pub use client::{BlockingFetcher, CatalogClient, CatalogError};
