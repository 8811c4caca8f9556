//! The set of links discovered but not yet fetched.
//!
//! The frontier is a depth-first stack: when a block is consumed, its child
//! links are pushed in list order ahead of everything already pending, so a
//! subtree is drained completely before any sibling of its root resumes.
//! A [`Frontier`] value is never empty; a drained stack becomes `None`.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use ufs_types::ContentAddress;

/// What a pending link is expected to resolve to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LinkRole {
    /// The root of the walk; any node kind.
    Root,
    /// A named directory entry; any node kind.
    Entry,
    /// An unnamed continuation of a directory listing; directories only.
    Bucket,
    /// A piece of file content; raw or file nodes only.
    Chunk,
}

impl std::fmt::Display for LinkRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Root => write!(f, "root"),
            Self::Entry => write!(f, "directory entry"),
            Self::Bucket => write!(f, "directory bucket"),
            Self::Chunk => write!(f, "file chunk"),
        }
    }
}

/// The file whose chunks are being emitted.
#[derive(Debug)]
pub(crate) struct OpenFile {
    pub(crate) path: String,
    /// Size declared by the file's root block.
    pub(crate) size: u64,
}

/// Entry names seen so far in one directory, shared by all of its blocks.
pub(crate) type Listing = Arc<Mutex<HashSet<String>>>;

/// Role plus the path context needed to emit the link's event.
#[derive(Debug)]
pub(crate) enum Role {
    Root {
        name: String,
    },
    Entry {
        path: String,
    },
    Bucket {
        /// Path reported on the bucket's directory event.
        path: String,
        /// Prefix for the bucket's entries.
        base: String,
        names: Listing,
    },
    Chunk {
        file: Arc<OpenFile>,
    },
}

/// A link waiting to be fetched.
#[derive(Debug)]
pub struct PendingLink {
    pub(crate) address: ContentAddress,
    pub(crate) role: Role,
}

impl PendingLink {
    pub(crate) fn new(address: ContentAddress, role: Role) -> Self {
        Self { address, role }
    }

    pub fn address(&self) -> &ContentAddress {
        &self.address
    }

    pub fn role(&self) -> LinkRole {
        match self.role {
            Role::Root { .. } => LinkRole::Root,
            Role::Entry { .. } => LinkRole::Entry,
            Role::Bucket { .. } => LinkRole::Bucket,
            Role::Chunk { .. } => LinkRole::Chunk,
        }
    }
}

/// Non-empty depth-first stack of pending links.
#[derive(Debug)]
pub struct Frontier {
    /// The link that must be fetched next.
    next: PendingLink,
    /// Everything else; the last element is consumed after `next`.
    rest: Vec<PendingLink>,
}

impl Frontier {
    /// A frontier holding a single link.
    pub(crate) fn new(next: PendingLink) -> Self {
        Self {
            next,
            rest: Vec::new(),
        }
    }

    /// Rebuild a frontier from a stack whose top is the last element.
    /// Returns `None` when the stack is drained.
    pub(crate) fn from_stack(mut stack: Vec<PendingLink>) -> Option<Self> {
        let next = stack.pop()?;
        Some(Self { next, rest: stack })
    }

    /// Take the next link, leaving the remainder as a stack.
    pub(crate) fn pop(self) -> (PendingLink, Vec<PendingLink>) {
        (self.next, self.rest)
    }

    /// The link that must be consumed next.
    pub fn next(&self) -> &PendingLink {
        &self.next
    }

    /// Number of pending links, always at least one.
    pub fn pending_count(&self) -> usize {
        self.rest.len() + 1
    }

    /// Addresses pending after [`next`](Self::next), nearest first.
    pub fn others(&self) -> PrefetchHints<'_> {
        PrefetchHints {
            inner: self.rest.iter().rev(),
        }
    }
}

/// Known but unfetched addresses other than the mandatory next one.
///
/// Yielded in the order they would be consumed if no further links were
/// discovered: remaining chunks of the current file first, then pending
/// siblings of enclosing directories from innermost to outermost. Blocks
/// decoded later may push new links ahead of any of these.
#[derive(Clone, Debug)]
pub struct PrefetchHints<'a> {
    inner: std::iter::Rev<std::slice::Iter<'a, PendingLink>>,
}

impl<'a> Iterator for PrefetchHints<'a> {
    type Item = &'a ContentAddress;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|link| &link.address)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for PrefetchHints<'_> {}
