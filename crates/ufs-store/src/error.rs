use std::path::PathBuf;

use ufs_codec::CodecError;
use ufs_types::ContentAddress;

/// Errors from block store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested block was not found.
    #[error("block not found: {0}")]
    NotFound(ContentAddress),

    /// Stored bytes no longer hash to their address (data corruption).
    #[error("hash mismatch for {address}: stored bytes hash to {computed}")]
    HashMismatch {
        address: ContentAddress,
        computed: ContentAddress,
    },

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding failure while importing.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Failure while walking a local directory tree.
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// A local file name cannot be stored as a directory entry.
    #[error("unsupported file name: {}", .0.display())]
    UnsupportedName(PathBuf),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
