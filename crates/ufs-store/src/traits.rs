use bytes::Bytes;
use ufs_types::ContentAddress;

use crate::error::{StoreError, StoreResult};

/// Content-addressed block store.
///
/// All implementations must satisfy these invariants:
/// - Blocks are immutable once written. The same bytes always produce the
///   same address, so writes are idempotent.
/// - Concurrent reads are always safe.
/// - All I/O errors are propagated, never silently ignored.
pub trait BlockStore: Send + Sync {
    /// Read a block by address.
    ///
    /// Returns `Ok(None)` if the block does not exist.
    /// Returns `Err` on I/O failure or data corruption.
    fn get(&self, address: &ContentAddress) -> StoreResult<Option<Bytes>>;

    /// Write a block and return its content address.
    fn put(&self, block: &[u8]) -> StoreResult<ContentAddress>;

    /// Check whether a block exists in the store.
    fn contains(&self, address: &ContentAddress) -> StoreResult<bool>;

    /// Delete a block. Returns `true` if the block existed.
    ///
    /// Deleting a block that is still linked from elsewhere breaks every
    /// walk that reaches it.
    fn remove(&self, address: &ContentAddress) -> StoreResult<bool>;

    /// Read multiple blocks in a batch.
    ///
    /// Default implementation calls `get()` for each address.
    fn get_batch(&self, addresses: &[ContentAddress]) -> StoreResult<Vec<Option<Bytes>>> {
        addresses.iter().map(|address| self.get(address)).collect()
    }

    /// Read a block that must exist.
    fn require(&self, address: &ContentAddress) -> StoreResult<Bytes> {
        self.get(address)?.ok_or(StoreError::NotFound(*address))
    }
}

impl<S: BlockStore + ?Sized> BlockStore for std::sync::Arc<S> {
    fn get(&self, address: &ContentAddress) -> StoreResult<Option<Bytes>> {
        (**self).get(address)
    }

    fn put(&self, block: &[u8]) -> StoreResult<ContentAddress> {
        (**self).put(block)
    }

    fn contains(&self, address: &ContentAddress) -> StoreResult<bool> {
        (**self).contains(address)
    }

    fn remove(&self, address: &ContentAddress) -> StoreResult<bool> {
        (**self).remove(address)
    }

    fn get_batch(&self, addresses: &[ContentAddress]) -> StoreResult<Vec<Option<Bytes>>> {
        (**self).get_batch(addresses)
    }
}
