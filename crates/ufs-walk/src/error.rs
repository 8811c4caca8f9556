//! Error types for traversal steps.

use ufs_codec::{CodecError, NodeKind};
use ufs_types::ContentAddress;

use crate::frontier::LinkRole;

/// Fatal conditions raised by [`Walker::continue_walk`](crate::Walker::continue_walk).
///
/// No walker is returned alongside an error; the traversal stops.
#[derive(Debug, thiserror::Error)]
pub enum WalkError {
    /// The block bytes could not be decoded into a node.
    #[error("failed to decode block {address}: {source}")]
    Decode {
        address: ContentAddress,
        #[source]
        source: CodecError,
    },

    /// The decoded node kind cannot fill the role its parent link implies.
    #[error("block {address} decoded as {found}, which cannot be a {role}")]
    StructuralMismatch {
        address: ContentAddress,
        role: LinkRole,
        found: NodeKind,
    },

    /// A directory entry name is not a single path component.
    #[error("directory {address} has an invalid entry name {name:?}")]
    InvalidEntryName {
        /// The directory block carrying the entry.
        address: ContentAddress,
        name: String,
    },

    /// Two entries of one directory share a name, possibly across buckets.
    #[error("directory {address} repeats the entry name {name:?}")]
    DuplicateEntryName {
        /// The directory block carrying the second occurrence.
        address: ContentAddress,
        name: String,
    },

    /// File content does not add up to the size declared by its root.
    #[error("file {path:?} declares {expected} bytes but its blocks reach {actual}")]
    FileSizeMismatch {
        path: String,
        expected: u64,
        actual: u64,
    },
}

/// Convenience alias for traversal results.
pub type WalkResult<T> = Result<T, WalkError>;
