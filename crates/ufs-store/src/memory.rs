use std::collections::HashMap;
use std::sync::RwLock;

use bytes::Bytes;
use tracing::debug;
use ufs_crypto::ContentHasher;
use ufs_types::ContentAddress;

use crate::error::StoreResult;
use crate::traits::BlockStore;

/// Block store held in a `HashMap`, keyed by the hash of each block.
///
/// Used by tests and by embedders that build a DAG and walk it in the same
/// process. Reads hand out `Bytes` clones of the stored block.
pub struct InMemoryBlockStore {
    blocks: RwLock<HashMap<ContentAddress, Bytes>>,
}

impl InMemoryBlockStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            blocks: RwLock::new(HashMap::new()),
        }
    }

    /// Number of blocks currently stored.
    pub fn len(&self) -> usize {
        self.blocks.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.blocks.read().expect("lock poisoned").is_empty()
    }

    /// Every stored address, in ascending order.
    pub fn all_addresses(&self) -> Vec<ContentAddress> {
        let map = self.blocks.read().expect("lock poisoned");
        let mut addresses: Vec<ContentAddress> = map.keys().copied().collect();
        addresses.sort();
        addresses
    }
}

impl Default for InMemoryBlockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockStore for InMemoryBlockStore {
    fn get(&self, address: &ContentAddress) -> StoreResult<Option<Bytes>> {
        let map = self.blocks.read().expect("lock poisoned");
        Ok(map.get(address).cloned())
    }

    fn put(&self, block: &[u8]) -> StoreResult<ContentAddress> {
        let address = ContentHasher::BLOCK.hash(block);
        let mut map = self.blocks.write().expect("lock poisoned");
        map.entry(address).or_insert_with(|| {
            debug!(address = %address.short_hex(), len = block.len(), "stored block");
            Bytes::copy_from_slice(block)
        });
        Ok(address)
    }

    fn contains(&self, address: &ContentAddress) -> StoreResult<bool> {
        let map = self.blocks.read().expect("lock poisoned");
        Ok(map.contains_key(address))
    }

    fn remove(&self, address: &ContentAddress) -> StoreResult<bool> {
        let mut map = self.blocks.write().expect("lock poisoned");
        let removed = map.remove(address).is_some();
        if removed {
            debug!(address = %address.short_hex(), "removed block");
        }
        Ok(removed)
    }
}

impl std::fmt::Debug for InMemoryBlockStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBlockStore")
            .field("block_count", &self.len())
            .finish()
    }
}
