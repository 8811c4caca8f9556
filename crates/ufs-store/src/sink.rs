use ufs_codec::{BlockSink, CodecError, CodecResult};
use ufs_types::ContentAddress;

use crate::traits::BlockStore;

/// Adapts a [`BlockStore`] into the [`BlockSink`] a `DagBuilder` writes to.
pub struct StoreSink<'a, S: BlockStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: BlockStore + ?Sized> StoreSink<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }
}

impl<S: BlockStore + ?Sized> BlockSink for StoreSink<'_, S> {
    fn put_block(&mut self, address: ContentAddress, block: Vec<u8>) -> CodecResult<()> {
        let stored = self
            .store
            .put(&block)
            .map_err(|e| CodecError::Sink(e.to_string()))?;
        if stored != address {
            return Err(CodecError::Sink(format!(
                "store addressed block {address} as {stored}"
            )));
        }
        Ok(())
    }
}
