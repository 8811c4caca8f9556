//! Block encoding for UFS filesystem graphs.
//!
//! A filesystem is stored as a DAG of immutable blocks. Each block decodes to
//! one [`Node`]: a raw file leaf, a file node with ordered chunk links, a
//! directory with named entry links, or a symlink. Parent blocks embed the
//! [`ContentAddress`](ufs_types::ContentAddress) of their children, so the
//! address of a root commits to the whole tree.
//!
//! # Modules
//!
//! - [`node`]: the closed [`Node`] / [`Link`] model
//! - [`codec`]: the block wire format and the [`NodeDecoder`] capability
//! - [`builder`]: deterministic encoder from bytes and listings into blocks

pub mod builder;
pub mod codec;
pub mod error;
pub mod node;

pub use builder::{BlockSink, BuilderConfig, Built, DagBuilder, DirEntry};
pub use codec::{decode_node, encode_node, BlockCodec, NodeDecoder, FORMAT_VERSION, MAGIC};
pub use error::{CodecError, CodecResult};
pub use node::{is_valid_entry_name, Link, Node, NodeKind};
