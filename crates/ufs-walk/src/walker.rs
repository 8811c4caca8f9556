//! The traversal state machine.
//!
//! [`Walker`] is Active by construction: it always owns a non-empty
//! [`Frontier`]. [`Walker::continue_walk`] consumes it and yields a
//! [`ContinuedWalk`] whose [`Continuation`] holds the next Active walker, or
//! `None` once the frontier drains (Done). An error ends the traversal
//! without returning a walker.
//!
//! # Paths
//!
//! The root name is the base context of the walk. The root's own event
//! carries the root name (empty for an anonymous root); every descendant
//! carries its path relative to the root. With root name `"root"`, entry
//! `"a"` and file `"b.txt"` the events are `"root"`, `"a"`, `"a/b.txt"`.

use std::sync::{Arc, PoisonError};

use bytes::Bytes;
use tracing::trace;

use ufs_codec::{is_valid_entry_name, BlockCodec, Link, Node, NodeDecoder};
use ufs_types::ContentAddress;

use crate::error::{WalkError, WalkResult};
use crate::frontier::{Frontier, LinkRole, Listing, OpenFile, PendingLink, PrefetchHints, Role};
use crate::segment::FileSegment;

/// Cursor over a filesystem DAG.
#[derive(Debug)]
pub struct Walker {
    frontier: Frontier,
    /// Bytes of the current file emitted so far.
    offset: u64,
}

impl Walker {
    /// Start a walk at `root`. `root_name` may be empty.
    pub fn new(root: ContentAddress, root_name: impl Into<String>) -> Self {
        let root = PendingLink::new(
            root,
            Role::Root {
                name: root_name.into(),
            },
        );
        Self {
            frontier: Frontier::new(root),
            offset: 0,
        }
    }

    /// The address that must be fed to the next [`continue_walk`], plus
    /// every other known address the caller may prefetch.
    ///
    /// [`continue_walk`]: Walker::continue_walk
    pub fn pending_links(&self) -> (&ContentAddress, PrefetchHints<'_>) {
        (self.frontier.next().address(), self.frontier.others())
    }

    /// Number of links known but not yet consumed.
    pub fn pending_count(&self) -> usize {
        self.frontier.pending_count()
    }

    /// Role expected of the next block.
    pub fn next_role(&self) -> LinkRole {
        self.frontier.next().role()
    }

    /// Consume the block for the mandatory next address, decoding it with
    /// the default [`BlockCodec`].
    pub fn continue_walk(self, block: &[u8]) -> WalkResult<ContinuedWalk> {
        self.continue_walk_with(block, &BlockCodec)
    }

    /// Consume the block for the mandatory next address using `decoder`.
    pub fn continue_walk_with<D>(self, block: &[u8], decoder: &D) -> WalkResult<ContinuedWalk>
    where
        D: NodeDecoder + ?Sized,
    {
        let Walker { frontier, offset } = self;
        let (link, mut stack) = frontier.pop();
        let PendingLink { address, role } = link;

        let node = decoder
            .decode(block)
            .map_err(|source| WalkError::Decode { address, source })?;
        let kind = node.kind();

        let (item, offset) = match role {
            Role::Root { name } => open_entry(address, name, String::new(), node, &mut stack)?,
            Role::Entry { path } => {
                let base = path.clone();
                open_entry(address, path, base, node, &mut stack)?
            }
            Role::Bucket { path, base, names } => match node {
                Node::Directory { links } => {
                    push_entries(address, &path, &base, &names, links, &mut stack)?;
                    (Item::Directory { is_new: false, path }, 0)
                }
                other => return Err(mismatch(address, LinkRole::Bucket, &other)),
            },
            Role::Chunk { file } => match node {
                Node::Raw(data) => emit_segment(&file, offset, data, false, &stack)?,
                Node::File { data, links, .. } => {
                    push_chunks(&file, links, &mut stack);
                    emit_segment(&file, offset, data, false, &stack)?
                }
                other => return Err(mismatch(address, LinkRole::Chunk, &other)),
            },
        };

        trace!(
            address = %address.short_hex(),
            %kind,
            path = item.path(),
            pending = stack.len(),
            "walked block"
        );

        let next = Frontier::from_stack(stack).map(|frontier| Walker { frontier, offset });
        Ok(ContinuedWalk::assemble(item, Continuation { next }))
    }
}

/// Emit the event for a root or directory entry and queue its children.
fn open_entry(
    address: ContentAddress,
    path: String,
    base: String,
    node: Node,
    stack: &mut Vec<PendingLink>,
) -> WalkResult<(Item, u64)> {
    match node {
        Node::Raw(data) => {
            let file = Arc::new(OpenFile {
                path,
                size: data.len() as u64,
            });
            emit_segment(&file, 0, data, true, stack)
        }
        Node::File {
            file_size,
            data,
            links,
        } => {
            let file = Arc::new(OpenFile {
                path,
                size: file_size,
            });
            push_chunks(&file, links, stack);
            emit_segment(&file, 0, data, true, stack)
        }
        Node::Directory { links } => {
            push_entries(address, &path, &base, &Listing::default(), links, stack)?;
            Ok((Item::Directory { is_new: true, path }, 0))
        }
        Node::Symlink { target } => Ok((Item::Symlink { path, target }, 0)),
    }
}

/// Queue directory links ahead of older siblings, in list order. Names
/// must be unique across every block of the directory.
fn push_entries(
    address: ContentAddress,
    path: &str,
    base: &str,
    names: &Listing,
    links: Vec<Link>,
    stack: &mut Vec<PendingLink>,
) -> WalkResult<()> {
    let mut seen = names.lock().unwrap_or_else(PoisonError::into_inner);
    let mut children = Vec::with_capacity(links.len());
    for link in links {
        let role = match link.name {
            Some(name) if !is_valid_entry_name(&name) => {
                return Err(WalkError::InvalidEntryName { address, name });
            }
            Some(name) if seen.contains(&name) => {
                return Err(WalkError::DuplicateEntryName { address, name });
            }
            Some(name) => {
                let path = join(base, &name);
                seen.insert(name);
                Role::Entry { path }
            }
            None => Role::Bucket {
                path: path.to_owned(),
                base: base.to_owned(),
                names: Arc::clone(names),
            },
        };
        children.push(PendingLink::new(link.address, role));
    }
    stack.extend(children.into_iter().rev());
    Ok(())
}

/// Queue file chunk links ahead of everything else, in list order.
fn push_chunks(file: &Arc<OpenFile>, links: Vec<Link>, stack: &mut Vec<PendingLink>) {
    stack.extend(links.into_iter().rev().map(|link| {
        PendingLink::new(
            link.address,
            Role::Chunk {
                file: Arc::clone(file),
            },
        )
    }));
}

/// Build the segment for `data` at `offset`; it is final when no chunk of
/// the same file remains on top of the stack.
fn emit_segment(
    file: &Arc<OpenFile>,
    offset: u64,
    data: Bytes,
    is_new: bool,
    stack: &[PendingLink],
) -> WalkResult<(Item, u64)> {
    let is_final = !matches!(
        stack.last(),
        Some(PendingLink { role: Role::Chunk { file: pending }, .. }) if Arc::ptr_eq(pending, file)
    );
    let end = offset.saturating_add(data.len() as u64);
    if end > file.size || (is_final && end != file.size) {
        return Err(WalkError::FileSizeMismatch {
            path: file.path.clone(),
            expected: file.size,
            actual: end,
        });
    }

    let item = Item::File {
        is_new,
        path: file.path.clone(),
        segment: FileSegment::new(data, offset, is_final),
    };
    Ok((item, if is_final { 0 } else { end }))
}

fn mismatch(address: ContentAddress, role: LinkRole, node: &Node) -> WalkError {
    WalkError::StructuralMismatch {
        address,
        role,
        found: node.kind(),
    }
}

fn join(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_owned()
    } else {
        format!("{base}/{name}")
    }
}

/// An event produced by one block, detached from the walk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Item {
    /// A piece of a file. `is_new` marks the first segment of the file.
    File {
        is_new: bool,
        path: String,
        segment: FileSegment,
    },
    /// A directory. `is_new` is `false` for buckets continuing a listing
    /// already announced under the same path.
    Directory { is_new: bool, path: String },
    /// A symbolic link; always a single complete event.
    Symlink { path: String, target: Bytes },
}

impl Item {
    pub fn path(&self) -> &str {
        match self {
            Self::File { path, .. } | Self::Directory { path, .. } | Self::Symlink { path, .. } => {
                path
            }
        }
    }
}

/// Handle to the rest of the walk.
#[derive(Debug)]
pub struct Continuation {
    next: Option<Walker>,
}

impl Continuation {
    /// The next walker, or `None` when every link has been consumed.
    pub fn into_next(self) -> Option<Walker> {
        self.next
    }

    pub fn is_done(&self) -> bool {
        self.next.is_none()
    }
}

/// Result of one successful step: the event plus its continuation.
#[derive(Debug)]
pub enum ContinuedWalk {
    File {
        is_new: bool,
        path: String,
        segment: FileSegment,
        next: Continuation,
    },
    Directory {
        is_new: bool,
        path: String,
        next: Continuation,
    },
    Symlink {
        path: String,
        target: Bytes,
        next: Continuation,
    },
}

impl ContinuedWalk {
    fn assemble(item: Item, next: Continuation) -> Self {
        match item {
            Item::File {
                is_new,
                path,
                segment,
            } => Self::File {
                is_new,
                path,
                segment,
                next,
            },
            Item::Directory { is_new, path } => Self::Directory { is_new, path, next },
            Item::Symlink { path, target } => Self::Symlink { path, target, next },
        }
    }

    /// Split into the event and the continuation.
    pub fn into_parts(self) -> (Item, Continuation) {
        match self {
            Self::File {
                is_new,
                path,
                segment,
                next,
            } => (
                Item::File {
                    is_new,
                    path,
                    segment,
                },
                next,
            ),
            Self::Directory { is_new, path, next } => (Item::Directory { is_new, path }, next),
            Self::Symlink { path, target, next } => (Item::Symlink { path, target }, next),
        }
    }

    /// Drop the event and keep walking.
    pub fn into_next(self) -> Option<Walker> {
        self.into_parts().1.into_next()
    }

    pub fn path(&self) -> &str {
        match self {
            Self::File { path, .. } | Self::Directory { path, .. } | Self::Symlink { path, .. } => {
                path
            }
        }
    }

    pub fn continuation(&self) -> &Continuation {
        match self {
            Self::File { next, .. } | Self::Directory { next, .. } | Self::Symlink { next, .. } => {
                next
            }
        }
    }
}
