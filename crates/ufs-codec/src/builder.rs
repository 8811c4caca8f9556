//! Deterministic encoder from file bytes and directory listings into blocks.
//!
//! Files are cut into fixed-size chunks and assembled into a balanced tree of
//! at most `max_links` children per node. Directory listings longer than
//! `max_directory_links` are split into a chain of buckets: each block holds
//! up to `max_directory_links` entries followed by an unnamed link to the
//! next bucket, so entry order is preserved by a depth-first walk.
//!
//! The same input and [`BuilderConfig`] always produce the same root address.

use std::collections::{HashMap, HashSet};
use std::io::{ErrorKind, Read};

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::trace;

use ufs_crypto::ContentHasher;
use ufs_types::ContentAddress;

use crate::codec::encode_node;
use crate::error::{CodecError, CodecResult};
use crate::node::{is_valid_entry_name, Link, Node};

/// Largest chunk the builder will cut.
pub const MAX_CHUNK_SIZE: usize = 1024 * 1024;

/// Layout parameters for [`DagBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Bytes of file content per leaf block.
    pub chunk_size: usize,
    /// Maximum children of an interior file node.
    pub max_links: usize,
    /// Store leaves as [`Node::Raw`] instead of single-chunk [`Node::File`]s.
    pub raw_leaves: bool,
    /// Maximum named entries per directory block.
    pub max_directory_links: usize,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            chunk_size: 256 * 1024,
            max_links: 174,
            raw_leaves: true,
            max_directory_links: 1024,
        }
    }
}

impl BuilderConfig {
    /// Check that every parameter is in range.
    pub fn validate(&self) -> CodecResult<()> {
        if self.chunk_size == 0 || self.chunk_size > MAX_CHUNK_SIZE {
            return Err(CodecError::InvalidConfig(format!(
                "chunk_size must be in 1..={MAX_CHUNK_SIZE}, got {}",
                self.chunk_size
            )));
        }
        if self.max_links < 2 {
            return Err(CodecError::InvalidConfig(format!(
                "max_links must be at least 2, got {}",
                self.max_links
            )));
        }
        if self.max_directory_links == 0 {
            return Err(CodecError::InvalidConfig(
                "max_directory_links must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Destination for encoded blocks.
pub trait BlockSink {
    fn put_block(&mut self, address: ContentAddress, block: Vec<u8>) -> CodecResult<()>;
}

impl BlockSink for Vec<(ContentAddress, Vec<u8>)> {
    fn put_block(&mut self, address: ContentAddress, block: Vec<u8>) -> CodecResult<()> {
        self.push((address, block));
        Ok(())
    }
}

impl BlockSink for HashMap<ContentAddress, Vec<u8>> {
    fn put_block(&mut self, address: ContentAddress, block: Vec<u8>) -> CodecResult<()> {
        self.entry(address).or_insert(block);
        Ok(())
    }
}

/// Root of a built subtree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Built {
    pub address: ContentAddress,
    /// File content bytes reachable from this root.
    pub size: u64,
}

/// A named child for [`DagBuilder::add_directory`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub built: Built,
}

impl DirEntry {
    pub fn new(name: impl Into<String>, built: Built) -> Self {
        Self {
            name: name.into(),
            built,
        }
    }
}

/// Encodes nodes and writes them to a [`BlockSink`].
pub struct DagBuilder<'s, S: BlockSink + ?Sized> {
    sink: &'s mut S,
    config: BuilderConfig,
    blocks_written: u64,
}

impl<'s, S: BlockSink + ?Sized> DagBuilder<'s, S> {
    /// Create a builder. Fails if the config is out of range.
    pub fn new(sink: &'s mut S, config: BuilderConfig) -> CodecResult<Self> {
        config.validate()?;
        Ok(Self {
            sink,
            config,
            blocks_written: 0,
        })
    }

    /// Number of blocks handed to the sink so far (duplicates included).
    pub fn blocks_written(&self) -> u64 {
        self.blocks_written
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Encode one node, hash it, and hand it to the sink.
    pub fn put_node(&mut self, node: &Node) -> CodecResult<ContentAddress> {
        let block = encode_node(node)?;
        let address = ContentHasher::BLOCK.hash(&block);
        trace!(address = %address.short_hex(), kind = %node.kind(), len = block.len(), "encoded block");
        self.sink.put_block(address, block)?;
        self.blocks_written += 1;
        Ok(address)
    }

    /// Build a file from an in-memory buffer.
    pub fn add_bytes(&mut self, data: &[u8]) -> CodecResult<Built> {
        self.add_file(data)
    }

    /// Build a file by reading `reader` to the end.
    pub fn add_file<R: Read>(&mut self, mut reader: R) -> CodecResult<Built> {
        let chunk_size = self.config.chunk_size;
        let mut buf = vec![0u8; chunk_size];
        let mut level = Vec::new();

        loop {
            let n = read_chunk(&mut reader, &mut buf)?;
            if n == 0 {
                break;
            }
            level.push(self.put_leaf(&buf[..n])?);
            if n < chunk_size {
                break;
            }
        }

        if level.is_empty() {
            let address = self.put_node(&Node::File {
                file_size: 0,
                data: Bytes::new(),
                links: Vec::new(),
            })?;
            return Ok(Built { address, size: 0 });
        }

        while level.len() > 1 {
            let mut parents = Vec::with_capacity(level.len().div_ceil(self.config.max_links));
            for group in level.chunks(self.config.max_links) {
                let size = group.iter().map(|b| b.size).sum();
                let node = Node::File {
                    file_size: size,
                    data: Bytes::new(),
                    links: group.iter().map(|b| Link::chunk(b.address, b.size)).collect(),
                };
                parents.push(Built {
                    address: self.put_node(&node)?,
                    size,
                });
            }
            level = parents;
        }

        Ok(level[0])
    }

    /// Build a symlink pointing at `target`.
    pub fn add_symlink(&mut self, target: &[u8]) -> CodecResult<Built> {
        let address = self.put_node(&Node::Symlink {
            target: Bytes::copy_from_slice(target),
        })?;
        Ok(Built { address, size: 0 })
    }

    /// Build a directory from entries, keeping their order.
    pub fn add_directory(&mut self, entries: Vec<DirEntry>) -> CodecResult<Built> {
        if let Some(bad) = entries.iter().find(|e| !is_valid_entry_name(&e.name)) {
            return Err(CodecError::InvalidName(bad.name.clone()));
        }
        let mut names = HashSet::with_capacity(entries.len());
        if let Some(dup) = entries.iter().find(|e| !names.insert(e.name.as_str())) {
            return Err(CodecError::DuplicateName(dup.name.clone()));
        }

        let total: u64 = entries.iter().map(|e| e.built.size).sum();
        let groups: Vec<&[DirEntry]> = if entries.is_empty() {
            vec![&entries[..]]
        } else {
            entries.chunks(self.config.max_directory_links).collect()
        };

        // Built back to front so each bucket can point at its successor.
        let mut tail: Option<ContentAddress> = None;
        for group in groups.into_iter().rev() {
            let mut links: Vec<Link> = group
                .iter()
                .map(|e| Link::named(e.name.clone(), e.built.address, Some(e.built.size)))
                .collect();
            if let Some(next) = tail {
                links.push(Link::new(next));
            }
            tail = Some(self.put_node(&Node::Directory { links })?);
        }

        let address = tail.ok_or_else(|| CodecError::Inconsistent("empty bucket chain".into()))?;
        Ok(Built {
            address,
            size: total,
        })
    }

    fn put_leaf(&mut self, chunk: &[u8]) -> CodecResult<Built> {
        let data = Bytes::copy_from_slice(chunk);
        let size = data.len() as u64;
        let node = if self.config.raw_leaves {
            Node::Raw(data)
        } else {
            Node::File {
                file_size: size,
                data,
                links: Vec::new(),
            }
        };
        Ok(Built {
            address: self.put_node(&node)?,
            size,
        })
    }
}

/// Fill `buf` from `reader`, stopping early only at end of input.
fn read_chunk<R: Read>(reader: &mut R, buf: &mut [u8]) -> CodecResult<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
