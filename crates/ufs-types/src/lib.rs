//! Foundation types for UFS.
//!
//! Every other UFS crate depends on `ufs-types`. It deliberately knows
//! nothing about blocks, nodes or traversal; it only names things.
//!
//! # Key Types
//!
//! - [`ContentAddress`]: BLAKE3 digest naming an immutable block
//! - [`TypeError`]: parse failures for addresses

pub mod address;
pub mod error;

pub use address::ContentAddress;
pub use error::TypeError;
