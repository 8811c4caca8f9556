use std::sync::Arc;

use bytes::Bytes;
use ufs_types::ContentAddress;
use ufs_walk::Item;

use crate::config::FetchConfig;
use crate::driver::Driver;
use crate::error::{FetchError, FetchResult};
use crate::fetcher::BlockFetcher;

/// Streams the bytes of one file in order.
///
/// Opening fetches the root block, so a root that is not a file is rejected
/// up front. The stream cannot be restarted; open it again instead.
pub struct FileContents<F: BlockFetcher + ?Sized> {
    driver: Driver<F>,
    buffered: Option<Bytes>,
    finished: bool,
}

impl<F: BlockFetcher + ?Sized> FileContents<F> {
    pub async fn open(
        fetcher: Arc<F>,
        root: ContentAddress,
        config: FetchConfig,
    ) -> FetchResult<Self> {
        let mut driver = Driver::new(fetcher, root, "", config);
        match driver.next_item().await? {
            Some(Item::File { segment, .. }) => Ok(Self {
                driver,
                finished: segment.is_final(),
                buffered: (!segment.is_empty()).then(|| segment.into_bytes()),
            }),
            _ => Err(FetchError::NotAFile(root)),
        }
    }

    /// Next non-empty piece of the file, or `None` at the end.
    pub async fn next_chunk(&mut self) -> FetchResult<Option<Bytes>> {
        if let Some(bytes) = self.buffered.take() {
            return Ok(Some(bytes));
        }
        while !self.finished {
            match self.driver.next_item().await? {
                Some(Item::File { segment, .. }) => {
                    self.finished = segment.is_final();
                    if !segment.is_empty() {
                        return Ok(Some(segment.into_bytes()));
                    }
                }
                _ => self.finished = true,
            }
        }
        Ok(None)
    }

    /// Collect the remaining bytes.
    pub async fn read_to_end(mut self) -> FetchResult<Vec<u8>> {
        let mut out = Vec::new();
        while let Some(chunk) = self.next_chunk().await? {
            out.extend_from_slice(&chunk);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::StoreFetcher;
    use ufs_codec::{BuilderConfig, DagBuilder, DirEntry};
    use ufs_store::{InMemoryBlockStore, StoreSink};

    fn chunked() -> BuilderConfig {
        BuilderConfig {
            chunk_size: 3,
            max_links: 2,
            raw_leaves: false,
            max_directory_links: 16,
        }
    }

    fn fetcher_with(store: InMemoryBlockStore) -> Arc<StoreFetcher<InMemoryBlockStore>> {
        Arc::new(StoreFetcher::new(Arc::new(store)))
    }

    #[tokio::test]
    async fn streams_file_in_order() {
        let store = InMemoryBlockStore::new();
        let data: Vec<u8> = (0..50u8).collect();
        let root = DagBuilder::new(&mut StoreSink::new(&store), chunked())
            .unwrap()
            .add_bytes(&data)
            .unwrap();

        let mut contents = FileContents::open(fetcher_with(store), root.address, FetchConfig::default())
            .await
            .unwrap();
        let mut out = Vec::new();
        while let Some(chunk) = contents.next_chunk().await.unwrap() {
            assert!(!chunk.is_empty());
            out.extend_from_slice(&chunk);
        }
        assert_eq!(out, data);
        assert!(contents.next_chunk().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_file_has_no_chunks() {
        let store = InMemoryBlockStore::new();
        let root = DagBuilder::new(&mut StoreSink::new(&store), chunked())
            .unwrap()
            .add_bytes(b"")
            .unwrap();

        let bytes = FileContents::open(fetcher_with(store), root.address, FetchConfig::default())
            .await
            .unwrap()
            .read_to_end()
            .await
            .unwrap();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn directory_root_is_rejected() {
        let store = InMemoryBlockStore::new();
        let mut sink = StoreSink::new(&store);
        let mut builder = DagBuilder::new(&mut sink, chunked()).unwrap();
        let file = builder.add_bytes(b"inside").unwrap();
        let root = builder.add_directory(vec![DirEntry::new("f", file)]).unwrap();

        let err = FileContents::open(fetcher_with(store), root.address, FetchConfig::default())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, FetchError::NotAFile(a) if a == root.address));
    }
}
