use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use ufs_store::BlockStore;
use ufs_types::ContentAddress;

use crate::error::FetchResult;

/// Resolves a content address to block bytes.
///
/// Implementations must fail with [`FetchError::NotFound`] when the block is
/// unavailable; callers treat every error as final.
///
/// [`FetchError::NotFound`]: crate::FetchError::NotFound
#[async_trait]
pub trait BlockFetcher: Send + Sync + 'static {
    async fn fetch(&self, address: &ContentAddress) -> FetchResult<Bytes>;
}

/// Fetches from a local [`BlockStore`] on the blocking thread pool.
#[derive(Debug)]
pub struct StoreFetcher<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> StoreFetcher<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }
}

impl<S: ?Sized> Clone for StoreFetcher<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

#[async_trait]
impl<S: BlockStore + ?Sized + 'static> BlockFetcher for StoreFetcher<S> {
    async fn fetch(&self, address: &ContentAddress) -> FetchResult<Bytes> {
        let store = Arc::clone(&self.store);
        let address = *address;
        let block = tokio::task::spawn_blocking(move || store.require(&address)).await??;
        Ok(block)
    }
}
