//! Decoded node types.
//!
//! A [`Node`] is the typed form of one block. Its child edges are [`Link`]s,
//! kept in the order the encoder wrote them; traversal order depends on it.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use ufs_types::ContentAddress;

/// An edge from a parent node to a child block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Address of the child block.
    pub address: ContentAddress,
    /// Entry name. Present for directory entries, absent for file chunks
    /// and directory buckets.
    pub name: Option<String>,
    /// Number of file content bytes reachable through this link, if known.
    pub size_hint: Option<u64>,
}

impl Link {
    /// An unnamed link with no size hint.
    pub fn new(address: ContentAddress) -> Self {
        Self {
            address,
            name: None,
            size_hint: None,
        }
    }

    /// A named directory entry.
    pub fn named(name: impl Into<String>, address: ContentAddress, size_hint: Option<u64>) -> Self {
        Self {
            address,
            name: Some(name.into()),
            size_hint,
        }
    }

    /// A file chunk covering `size` bytes of content.
    pub fn chunk(address: ContentAddress, size: u64) -> Self {
        Self {
            address,
            name: None,
            size_hint: Some(size),
        }
    }
}

/// The decoded form of a block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Node {
    /// Bare file bytes with no further structure.
    Raw(Bytes),
    /// A file (or a subtree of one). Inline `data` comes first, followed by
    /// the content of each link in order. `file_size` is the total.
    File {
        file_size: u64,
        data: Bytes,
        links: Vec<Link>,
    },
    /// A directory listing. Named links are entries; an unnamed link is a
    /// bucket holding further entries of the same directory.
    Directory { links: Vec<Link> },
    /// A symbolic link. The target is kept as bytes; it need not be UTF-8.
    Symlink { target: Bytes },
}

impl Node {
    /// The kind tag of this node.
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Raw(_) => NodeKind::Raw,
            Self::File { .. } => NodeKind::File,
            Self::Directory { .. } => NodeKind::Directory,
            Self::Symlink { .. } => NodeKind::Symlink,
        }
    }

    /// Child links in encoded order. Empty for leaves.
    pub fn links(&self) -> &[Link] {
        match self {
            Self::File { links, .. } | Self::Directory { links } => links,
            Self::Raw(_) | Self::Symlink { .. } => &[],
        }
    }

    /// Total file bytes this node stands for (zero for directories and
    /// symlinks).
    pub fn content_size(&self) -> u64 {
        match self {
            Self::Raw(data) => data.len() as u64,
            Self::File { file_size, .. } => *file_size,
            Self::Directory { .. } | Self::Symlink { .. } => 0,
        }
    }
}

/// The kind of a decoded node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Raw,
    File,
    Directory,
    Symlink,
}

impl NodeKind {
    /// Raw and File nodes both carry file content.
    pub fn is_file_content(&self) -> bool {
        matches!(self, Self::Raw | Self::File)
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Raw => write!(f, "raw"),
            Self::File => write!(f, "file"),
            Self::Directory => write!(f, "directory"),
            Self::Symlink => write!(f, "symlink"),
        }
    }
}

/// Returns `true` if `name` can stand as a single path component: non-empty,
/// not `.` or `..`, and free of `/` and NUL.
pub fn is_valid_entry_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\0'])
}
