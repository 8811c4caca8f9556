//! Consumers of the UFS walker.
//!
//! [`ufs_walk::Walker`] never performs I/O. This crate supplies the pieces
//! that do:
//!
//! - [`BlockFetcher`] -- async capability that resolves an address to bytes,
//!   with [`StoreFetcher`] adapting any [`BlockStore`](ufs_store::BlockStore)
//! - [`Driver`] -- async walk that prefetches hinted blocks concurrently
//! - [`BlockWalk`] -- synchronous iterator over a local store
//! - [`FileContents`] -- stream the bytes of a single file
//! - [`materialize`] / [`materialize_to_dir`] -- rebuild a whole tree
//!
//! Fetch failures are reported, never retried.

pub mod archive;
pub mod blocking;
pub mod config;
pub mod contents;
pub mod driver;
pub mod error;
pub mod fetcher;

pub use archive::{materialize, materialize_to_dir, Archive, ArchiveEntry, EntryKind};
pub use blocking::BlockWalk;
pub use config::FetchConfig;
pub use contents::FileContents;
pub use driver::Driver;
pub use error::{FetchError, FetchResult};
pub use fetcher::{BlockFetcher, StoreFetcher};
