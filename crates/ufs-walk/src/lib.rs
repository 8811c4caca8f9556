//! Lazy, I/O-free traversal of UFS filesystem DAGs.
//!
//! A [`Walker`] is a cursor over a content-addressed graph of file,
//! directory and symlink blocks. It never fetches anything: the caller asks
//! it which block is needed next ([`Walker::pending_links`]), obtains the
//! bytes however it likes, and feeds them back with
//! [`Walker::continue_walk`]. Each step consumes the walker and returns the
//! event produced by that block together with a [`Continuation`] holding the
//! next walker, or nothing once the graph is exhausted.
//!
//! ```text
//! let mut walker = Walker::new(root, "name");
//! loop {
//!     let (next, _prefetch) = walker.pending_links();
//!     let block = fetch(next)?;
//!     let (item, continuation) = walker.continue_walk(&block)?.into_parts();
//!     handle(item);
//!     match continuation.into_next() {
//!         Some(w) => walker = w,
//!         None => break,
//!     }
//! }
//! ```
//!
//! # Guarantees
//!
//! - Events come out in depth-first preorder; siblings in encoded order.
//! - Per file, segment offsets are contiguous, lengths sum to the declared
//!   size, and exactly one segment is final.
//! - A `Walker` always has a pending link. Exhaustion is a `None`
//!   continuation, never an empty walker.

pub mod error;
pub mod frontier;
pub mod segment;
pub mod walker;

pub use error::{WalkError, WalkResult};
pub use frontier::{Frontier, LinkRole, PendingLink, PrefetchHints};
pub use segment::FileSegment;
pub use walker::{Continuation, ContinuedWalk, Item, Walker};
