//! Error types for block encoding and decoding.

/// Errors produced while encoding, decoding or building blocks.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The block is shorter than the fixed header.
    #[error("block truncated: {len} bytes")]
    Truncated { len: usize },

    /// The block does not start with the UFS magic.
    #[error("invalid block magic: {found:02x?}")]
    BadMagic { found: [u8; 4] },

    /// The block was written by an unknown format version.
    #[error("unsupported block format version: {0}")]
    UnsupportedVersion(u32),

    /// The node body could not be (de)serialized.
    #[error("malformed node body: {0}")]
    Malformed(String),

    /// The node decoded but its fields contradict each other.
    #[error("inconsistent node: {0}")]
    Inconsistent(String),

    /// A directory entry name cannot be used as a single path component.
    #[error("invalid entry name: {0:?}")]
    InvalidName(String),

    /// Two directory entries share a name.
    #[error("duplicate entry name: {0:?}")]
    DuplicateName(String),

    /// Builder configuration is out of range.
    #[error("invalid builder config: {0}")]
    InvalidConfig(String),

    /// Reading builder input failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The block sink rejected a block.
    #[error("block sink error: {0}")]
    Sink(String),
}

/// Result alias for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;
