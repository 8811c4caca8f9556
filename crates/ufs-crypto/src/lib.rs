//! Hashing primitives for UFS.
//!
//! Block addresses are domain-separated BLAKE3 digests. All crypto operations
//! wrap established libraries; there is no custom cryptography here.

pub mod hasher;

pub use hasher::ContentHasher;
