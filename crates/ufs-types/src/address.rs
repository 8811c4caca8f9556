use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Content-addressed identifier for a block.
///
/// A `ContentAddress` is the BLAKE3 hash of a block's bytes. Because a
/// directory or file node embeds the addresses of its children, the address
/// of a root block commits to the whole graph below it. Addresses are opaque
/// to the traversal engine: they are compared, hashed and handed to a fetcher,
/// never interpreted.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentAddress([u8; 32]);

impl ContentAddress {
    /// Length of an address in bytes.
    pub const LEN: usize = 32;

    /// Compute an address from raw bytes with plain BLAKE3.
    pub fn digest(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Create an address from a pre-computed hash.
    pub const fn from_hash(hash: [u8; 32]) -> Self {
        Self(hash)
    }

    /// The raw 32-byte hash.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex-encoded string representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Parse from a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != Self::LEN {
            return Err(TypeError::InvalidLength {
                expected: Self::LEN,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for ContentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentAddress({})", self.short_hex())
    }
}

impl fmt::Display for ContentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for ContentAddress {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s.trim())
    }
}

impl From<[u8; 32]> for ContentAddress {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl From<ContentAddress> for [u8; 32] {
    fn from(address: ContentAddress) -> Self {
        address.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn digest_is_deterministic() {
        let a = ContentAddress::digest(b"hello world");
        let b = ContentAddress::digest(b"hello world");
        assert_eq!(a, b);
    }

    #[test]
    fn different_data_produces_different_addresses() {
        assert_ne!(
            ContentAddress::digest(b"hello"),
            ContentAddress::digest(b"world")
        );
    }

    #[test]
    fn short_hex_is_prefix_of_display() {
        let address = ContentAddress::digest(b"test");
        let full = format!("{address}");
        assert_eq!(full.len(), 64);
        assert!(full.starts_with(&address.short_hex()));
        assert_eq!(address.short_hex().len(), 8);
    }

    #[test]
    fn parse_rejects_wrong_length() {
        let err = ContentAddress::from_hex("abcd").unwrap_err();
        assert_eq!(
            err,
            TypeError::InvalidLength {
                expected: 32,
                actual: 2
            }
        );
    }

    #[test]
    fn parse_rejects_non_hex() {
        let err = "zz".repeat(32).parse::<ContentAddress>().unwrap_err();
        assert!(matches!(err, TypeError::InvalidHex(_)));
    }

    #[test]
    fn from_str_trims_whitespace() {
        let address = ContentAddress::digest(b"padded");
        let parsed: ContentAddress = format!("  {address}\n").parse().unwrap();
        assert_eq!(parsed, address);
    }

    #[test]
    fn debug_uses_short_form() {
        let address = ContentAddress::from_hash([0xab; 32]);
        assert_eq!(format!("{address:?}"), "ContentAddress(abababab)");
    }

    #[test]
    fn serde_json_roundtrip() {
        let address = ContentAddress::digest(b"serde test");
        let json = serde_json::to_string(&address).unwrap();
        let parsed: ContentAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(address, parsed);
    }

    #[test]
    fn ordering_follows_bytes() {
        assert!(ContentAddress::from_hash([0; 32]) < ContentAddress::from_hash([1; 32]));
    }

    proptest! {
        #[test]
        fn hex_parse_inverts_display(bytes in any::<[u8; 32]>()) {
            let address = ContentAddress::from_hash(bytes);
            prop_assert_eq!(address.to_hex().parse::<ContentAddress>().unwrap(), address);
        }
    }
}
