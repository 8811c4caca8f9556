//! Block wire format.
//!
//! On-disk / on-wire layout of one block:
//! ```text
//! [4 bytes: magic "UFSB"]
//! [4 bytes: format version (big-endian u32)]
//! [N bytes: bincode-serialized Node (fixed-width ints, no trailing bytes)]
//! ```

use bincode::Options;

use crate::error::{CodecError, CodecResult};
use crate::node::Node;

/// Magic bytes at the start of every block.
pub const MAGIC: [u8; 4] = *b"UFSB";

/// Current block format version.
pub const FORMAT_VERSION: u32 = 1;

/// Header size: 4 bytes magic + 4 bytes version.
pub const HEADER_LEN: usize = 8;

/// Largest block body the decoder will allocate for.
pub const MAX_BLOCK_SIZE: u64 = 4 * 1024 * 1024;

fn body_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .reject_trailing_bytes()
        .with_limit(MAX_BLOCK_SIZE)
}

/// Turns raw block bytes into a typed [`Node`].
///
/// The traversal engine only depends on this capability, never on a
/// particular encoding.
pub trait NodeDecoder {
    fn decode(&self, block: &[u8]) -> CodecResult<Node>;
}

/// The default UFS block codec.
#[derive(Clone, Copy, Debug, Default)]
pub struct BlockCodec;

impl NodeDecoder for BlockCodec {
    fn decode(&self, block: &[u8]) -> CodecResult<Node> {
        decode_node(block)
    }
}

/// Encode a node into block bytes.
pub fn encode_node(node: &Node) -> CodecResult<Vec<u8>> {
    let body = body_options()
        .serialize(node)
        .map_err(|e| CodecError::Malformed(e.to_string()))?;
    let mut block = Vec::with_capacity(HEADER_LEN + body.len());
    block.extend_from_slice(&MAGIC);
    block.extend_from_slice(&FORMAT_VERSION.to_be_bytes());
    block.extend_from_slice(&body);
    Ok(block)
}

/// Decode and validate block bytes.
pub fn decode_node(block: &[u8]) -> CodecResult<Node> {
    if block.len() < HEADER_LEN {
        return Err(CodecError::Truncated { len: block.len() });
    }
    let mut magic = [0u8; 4];
    magic.copy_from_slice(&block[0..4]);
    if magic != MAGIC {
        return Err(CodecError::BadMagic { found: magic });
    }
    let mut version = [0u8; 4];
    version.copy_from_slice(&block[4..8]);
    let version = u32::from_be_bytes(version);
    if version != FORMAT_VERSION {
        return Err(CodecError::UnsupportedVersion(version));
    }

    let node: Node = body_options()
        .deserialize(&block[HEADER_LEN..])
        .map_err(|e| CodecError::Malformed(e.to_string()))?;
    validate(&node)?;
    Ok(node)
}

fn validate(node: &Node) -> CodecResult<()> {
    let Node::File {
        file_size,
        data,
        links,
    } = node
    else {
        return Ok(());
    };

    let inline = data.len() as u64;
    let expected = if links.is_empty() {
        Some(inline)
    } else {
        links
            .iter()
            .try_fold(inline, |acc, link| acc.checked_add(link.size_hint?))
    };

    match expected {
        Some(total) if total != *file_size => Err(CodecError::Inconsistent(format!(
            "file declares {file_size} bytes but its parts hold {total}"
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Link;
    use bytes::Bytes;
    use ufs_types::ContentAddress;

    fn sample_directory() -> Node {
        Node::Directory {
            links: vec![
                Link::named("lib.rs", ContentAddress::from_hash([1; 32]), Some(10)),
                Link::named("repo", ContentAddress::from_hash([2; 32]), None),
                Link::new(ContentAddress::from_hash([3; 32])),
            ],
        }
    }

    #[test]
    fn directory_survives_encoding() {
        let node = sample_directory();
        let block = encode_node(&node).unwrap();
        assert_eq!(&block[..4], b"UFSB");
        assert_eq!(decode_node(&block).unwrap(), node);
    }

    #[test]
    fn encoding_is_deterministic() {
        let a = encode_node(&sample_directory()).unwrap();
        let b = encode_node(&sample_directory()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn short_block_is_truncated() {
        let err = decode_node(b"UFS").unwrap_err();
        assert!(matches!(err, CodecError::Truncated { len: 3 }));
    }

    #[test]
    fn bad_magic_rejected() {
        let mut block = encode_node(&Node::Raw(Bytes::from_static(b"x"))).unwrap();
        block[0..4].copy_from_slice(b"NOPE");
        let err = decode_node(&block).unwrap_err();
        assert!(matches!(err, CodecError::BadMagic { found } if &found == b"NOPE"));
    }

    #[test]
    fn unknown_version_rejected() {
        let mut block = encode_node(&Node::Raw(Bytes::from_static(b"x"))).unwrap();
        block[4..8].copy_from_slice(&99u32.to_be_bytes());
        let err = decode_node(&block).unwrap_err();
        assert!(matches!(err, CodecError::UnsupportedVersion(99)));
    }

    #[test]
    fn trailing_bytes_rejected() {
        let mut block = encode_node(&Node::Raw(Bytes::from_static(b"x"))).unwrap();
        block.push(0);
        assert!(matches!(
            decode_node(&block).unwrap_err(),
            CodecError::Malformed(_)
        ));
    }

    #[test]
    fn garbage_body_is_malformed() {
        let mut block = Vec::from(MAGIC);
        block.extend_from_slice(&FORMAT_VERSION.to_be_bytes());
        block.extend_from_slice(&[0xff; 16]);
        assert!(matches!(
            decode_node(&block).unwrap_err(),
            CodecError::Malformed(_)
        ));
    }

    #[test]
    fn leaf_file_size_must_match_data() {
        let node = Node::File {
            file_size: 5,
            data: Bytes::from_static(b"abc"),
            links: vec![],
        };
        let block = encode_node(&node).unwrap();
        assert!(matches!(
            decode_node(&block).unwrap_err(),
            CodecError::Inconsistent(_)
        ));
    }

    #[test]
    fn hinted_children_must_sum_to_file_size() {
        let good = Node::File {
            file_size: 7,
            data: Bytes::from_static(b"ab"),
            links: vec![
                Link::chunk(ContentAddress::from_hash([1; 32]), 2),
                Link::chunk(ContentAddress::from_hash([2; 32]), 3),
            ],
        };
        assert!(decode_node(&encode_node(&good).unwrap()).is_ok());

        let bad = Node::File {
            file_size: 8,
            data: Bytes::from_static(b"ab"),
            links: vec![Link::chunk(ContentAddress::from_hash([1; 32]), 2)],
        };
        assert!(matches!(
            decode_node(&encode_node(&bad).unwrap()).unwrap_err(),
            CodecError::Inconsistent(_)
        ));
    }

    #[test]
    fn unhinted_children_skip_size_check() {
        let node = Node::File {
            file_size: 100,
            data: Bytes::new(),
            links: vec![Link::new(ContentAddress::from_hash([1; 32]))],
        };
        assert!(decode_node(&encode_node(&node).unwrap()).is_ok());
    }

    #[test]
    fn block_codec_delegates() {
        let node = Node::Symlink {
            target: Bytes::from_static(b"../target"),
        };
        let block = encode_node(&node).unwrap();
        assert_eq!(BlockCodec.decode(&block).unwrap(), node);
    }
}
