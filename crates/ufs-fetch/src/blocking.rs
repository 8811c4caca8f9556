use ufs_store::BlockStore;
use ufs_types::ContentAddress;
use ufs_walk::{Item, Walker};

use crate::error::FetchResult;

/// Synchronous walk over a local [`BlockStore`], one block per `next()`.
///
/// Yields `Err` at most once; the iterator is exhausted afterwards.
#[derive(Debug)]
pub struct BlockWalk<'a, S: BlockStore + ?Sized> {
    store: &'a S,
    walker: Option<Walker>,
}

impl<'a, S: BlockStore + ?Sized> BlockWalk<'a, S> {
    pub fn new(store: &'a S, root: ContentAddress, root_name: impl Into<String>) -> Self {
        Self {
            store,
            walker: Some(Walker::new(root, root_name)),
        }
    }

    fn step(&self, walker: Walker) -> FetchResult<(Item, Option<Walker>)> {
        let block = self.store.require(walker.pending_links().0)?;
        let (item, continuation) = walker.continue_walk(&block)?.into_parts();
        Ok((item, continuation.into_next()))
    }
}

impl<S: BlockStore + ?Sized> Iterator for BlockWalk<'_, S> {
    type Item = FetchResult<Item>;

    fn next(&mut self) -> Option<Self::Item> {
        let walker = self.walker.take()?;
        Some(self.step(walker).map(|(item, next)| {
            self.walker = next;
            item
        }))
    }
}
