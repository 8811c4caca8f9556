//! Content-addressed block storage for UFS.
//!
//! Blocks are immutable byte strings keyed by the BLAKE3 hash of their
//! contents (domain-separated with [`ContentHasher::BLOCK`]). The store never
//! interprets block contents -- it is a pure key-value store that the walker's
//! consumers read from and the [`DagBuilder`] writes into.
//!
//! # Storage Backends
//!
//! All backends implement the [`BlockStore`] trait:
//!
//! - [`InMemoryBlockStore`] -- `HashMap`-based store for tests and embedding
//! - [`FsBlockStore`] -- one loose file per block under a root directory
//!
//! [`import_path`] encodes a file, symlink, or directory tree from the local
//! filesystem into any backend.
//!
//! [`ContentHasher::BLOCK`]: ufs_crypto::ContentHasher::BLOCK
//! [`DagBuilder`]: ufs_codec::DagBuilder

pub mod error;
pub mod fs;
pub mod import;
pub mod memory;
pub mod sink;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use fs::FsBlockStore;
pub use import::{import_path, ImportSummary};
pub use memory::InMemoryBlockStore;
pub use sink::StoreSink;
pub use traits::BlockStore;
