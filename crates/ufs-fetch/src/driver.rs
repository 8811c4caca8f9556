//! Async traversal with bounded prefetching.
//!
//! Before each step the driver claims the mandatory block (a task already
//! started for it, or a new one) and starts tasks for prefetch hints in
//! walker order, keeping at most `max_prefetch` speculative tasks
//! outstanding. It then awaits the mandatory task only and feeds the block
//! to the walker. Tasks still outstanding when the walk ends, fails, or the
//! driver is dropped are aborted.
//!
//! [`Driver::next_item`] is cancel-safe. The walker only advances after the
//! mandatory block has arrived, and the mandatory task stays parked in the
//! driver, so a dropped call is resumed by the next one.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use tokio::task::JoinHandle;
use tracing::{debug, trace};
use ufs_types::ContentAddress;
use ufs_walk::{Item, Walker};

use crate::config::FetchConfig;
use crate::error::{FetchError, FetchResult};
use crate::fetcher::BlockFetcher;

type FetchTask = JoinHandle<FetchResult<Bytes>>;

/// Drives a [`Walker`] to completion against a [`BlockFetcher`].
pub struct Driver<F: BlockFetcher + ?Sized> {
    fetcher: Arc<F>,
    walker: Option<Walker>,
    /// Task for the walker's next address, once claimed.
    mandatory: Option<FetchTask>,
    in_flight: HashMap<ContentAddress, FetchTask>,
    config: FetchConfig,
}

impl<F: BlockFetcher + ?Sized> Driver<F> {
    pub fn new(
        fetcher: Arc<F>,
        root: ContentAddress,
        root_name: impl Into<String>,
        config: FetchConfig,
    ) -> Self {
        Self::from_walker(fetcher, Walker::new(root, root_name), config)
    }

    /// Resume a walk that was started elsewhere.
    pub fn from_walker(fetcher: Arc<F>, walker: Walker, config: FetchConfig) -> Self {
        Self {
            fetcher,
            walker: Some(walker),
            mandatory: None,
            in_flight: HashMap::new(),
            config,
        }
    }

    /// `true` once every block has been consumed or a step failed.
    pub fn is_done(&self) -> bool {
        self.walker.is_none()
    }

    /// Number of speculative fetch tasks currently outstanding.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Fetch the next block and return its event, or `None` when the walk is
    /// complete. After an error the driver is done.
    pub async fn next_item(&mut self) -> FetchResult<Option<Item>> {
        let Some(walker) = self.walker.as_ref() else {
            return Ok(None);
        };

        let task = self
            .mandatory
            .get_or_insert_with(|| claim(&self.fetcher, &mut self.in_flight, &self.config, walker));
        let fetched = task.await;
        self.mandatory = None;
        let block = match fetched.map_err(FetchError::from).and_then(|block| block) {
            Ok(block) => block,
            Err(e) => {
                self.finish();
                return Err(e);
            }
        };

        let Some(walker) = self.walker.take() else {
            return Ok(None);
        };
        let step = match walker.continue_walk(&block) {
            Ok(step) => step,
            Err(e) => {
                self.finish();
                return Err(e.into());
            }
        };

        let (item, continuation) = step.into_parts();
        self.walker = continuation.into_next();
        if self.walker.is_none() {
            self.finish();
        }
        Ok(Some(item))
    }

    /// Run the walk to the end, collecting every event.
    pub async fn collect(mut self) -> FetchResult<Vec<Item>> {
        let mut items = Vec::new();
        while let Some(item) = self.next_item().await? {
            items.push(item);
        }
        Ok(items)
    }

    /// Drop the walker and abort every outstanding task.
    fn finish(&mut self) {
        self.walker = None;
        if let Some(task) = self.mandatory.take() {
            task.abort();
        }
        if self.in_flight.is_empty() {
            return;
        }
        debug!(count = self.in_flight.len(), "aborting outstanding fetches");
        for (_, task) in self.in_flight.drain() {
            task.abort();
        }
    }
}

/// Take or start the task for the walker's next address, then start tasks
/// for its hints up to the prefetch limit.
fn claim<F: BlockFetcher + ?Sized>(
    fetcher: &Arc<F>,
    in_flight: &mut HashMap<ContentAddress, FetchTask>,
    config: &FetchConfig,
    walker: &Walker,
) -> FetchTask {
    let (next, hints) = walker.pending_links();
    let task = in_flight
        .remove(next)
        .unwrap_or_else(|| spawn_fetch(fetcher, *next));
    if config.max_prefetch > 0 {
        for hint in hints {
            if in_flight.len() >= config.max_prefetch {
                break;
            }
            if !in_flight.contains_key(hint) {
                in_flight.insert(*hint, spawn_fetch(fetcher, *hint));
            }
        }
    }
    task
}

fn spawn_fetch<F: BlockFetcher + ?Sized>(fetcher: &Arc<F>, address: ContentAddress) -> FetchTask {
    let fetcher = Arc::clone(fetcher);
    trace!(address = %address.short_hex(), "started fetch");
    tokio::spawn(async move { fetcher.fetch(&address).await })
}

impl<F: BlockFetcher + ?Sized> Drop for Driver<F> {
    fn drop(&mut self) {
        self.finish();
    }
}

impl<F: BlockFetcher + ?Sized> std::fmt::Debug for Driver<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver")
            .field("walker", &self.walker)
            .field("pending_step", &self.mandatory.is_some())
            .field("in_flight", &self.in_flight.len())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use ufs_codec::{BuilderConfig, DagBuilder, DirEntry};
    use ufs_store::{BlockStore, InMemoryBlockStore, StoreSink};

    use super::*;
    use crate::error::FetchError;
    use crate::fetcher::StoreFetcher;

    /// Records every fetch and tracks peak concurrency.
    struct CountingFetcher {
        store: InMemoryBlockStore,
        fetched: Mutex<Vec<ContentAddress>>,
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    impl CountingFetcher {
        fn new(store: InMemoryBlockStore) -> Self {
            Self {
                store,
                fetched: Mutex::new(Vec::new()),
                active: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl BlockFetcher for CountingFetcher {
        async fn fetch(&self, address: &ContentAddress) -> FetchResult<Bytes> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.fetched.lock().unwrap().push(*address);
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(self.store.require(address)?)
        }
    }

    /// Answers every fetch after a fixed delay.
    struct SlowFetcher {
        store: InMemoryBlockStore,
        delay: Duration,
        fetched: Mutex<Vec<ContentAddress>>,
    }

    #[async_trait]
    impl BlockFetcher for SlowFetcher {
        async fn fetch(&self, address: &ContentAddress) -> FetchResult<Bytes> {
            tokio::time::sleep(self.delay).await;
            self.fetched.lock().unwrap().push(*address);
            Ok(self.store.require(address)?)
        }
    }

    fn sample_store() -> (InMemoryBlockStore, ContentAddress) {
        let store = InMemoryBlockStore::new();
        let mut sink = StoreSink::new(&store);
        let config = BuilderConfig {
            chunk_size: 4,
            max_links: 2,
            raw_leaves: true,
            max_directory_links: 2,
        };
        let mut builder = DagBuilder::new(&mut sink, config).unwrap();
        let big = builder.add_bytes(b"0123456789abcdef").unwrap();
        let small = builder.add_bytes(b"tiny").unwrap();
        let link = builder.add_symlink(b"big").unwrap();
        let root = builder
            .add_directory(vec![
                DirEntry::new("big", big),
                DirEntry::new("link", link),
                DirEntry::new("small", small),
            ])
            .unwrap();
        (store, root.address)
    }

    fn paths(items: &[Item]) -> Vec<&str> {
        items.iter().map(Item::path).collect()
    }

    #[tokio::test]
    async fn sequential_and_prefetching_agree() {
        let (store, root) = sample_store();
        let store = Arc::new(store);
        let fetcher = Arc::new(StoreFetcher::new(store));

        let sequential = Driver::new(Arc::clone(&fetcher), root, "r", FetchConfig::sequential())
            .collect()
            .await
            .unwrap();
        let prefetched = Driver::new(fetcher, root, "r", FetchConfig { max_prefetch: 8 })
            .collect()
            .await
            .unwrap();

        assert_eq!(sequential, prefetched);
        assert_eq!(paths(&sequential)[..3], ["r", "big", "big"]);
        assert_eq!(*paths(&sequential).last().unwrap(), "small");
    }

    #[tokio::test]
    async fn sequential_fetches_one_at_a_time() {
        let (store, root) = sample_store();
        let block_count = store.len();
        let fetcher = Arc::new(CountingFetcher::new(store));

        let items = Driver::new(Arc::clone(&fetcher), root, "", FetchConfig::sequential())
            .collect()
            .await
            .unwrap();

        assert_eq!(fetcher.peak.load(Ordering::SeqCst), 1);
        assert_eq!(fetcher.fetched.lock().unwrap().len(), items.len());
        assert_eq!(items.len(), block_count);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn prefetch_respects_limit() {
        let (store, root) = sample_store();
        let fetcher = Arc::new(CountingFetcher::new(store));
        let mut driver = Driver::new(Arc::clone(&fetcher), root, "", FetchConfig { max_prefetch: 3 });

        while driver.next_item().await.unwrap().is_some() {
            assert!(driver.in_flight() <= 3);
        }
        assert!(driver.is_done());
        assert_eq!(driver.in_flight(), 0);
        // Three speculative tasks plus the mandatory fetch.
        assert!(fetcher.peak.load(Ordering::SeqCst) <= 4);
    }

    #[tokio::test]
    async fn missing_block_stops_the_walk() {
        let (store, root) = sample_store();
        let tiny = raw_leaf_address(&store, b"tiny");
        store.remove(&tiny).unwrap();

        let fetcher = Arc::new(StoreFetcher::new(Arc::new(store)));
        let mut driver = Driver::new(fetcher, root, "", FetchConfig::default());
        let err = loop {
            match driver.next_item().await {
                Ok(Some(_)) => continue,
                Ok(None) => panic!("walk should fail"),
                Err(e) => break e,
            }
        };
        assert!(matches!(err, FetchError::NotFound(a) if a == tiny));
        assert!(driver.is_done());
        assert_eq!(driver.in_flight(), 0);
        assert!(driver.next_item().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_block_surfaces_walk_error() {
        let store = InMemoryBlockStore::new();
        let garbage = store.put(b"definitely not a block").unwrap();
        let fetcher = Arc::new(StoreFetcher::new(Arc::new(store)));

        let err = Driver::new(fetcher, garbage, "", FetchConfig::default())
            .collect()
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Walk(_)));
    }

    #[tokio::test]
    async fn cancelled_step_resumes_where_it_left_off() {
        let (store, root) = sample_store();
        let expected = Driver::new(
            Arc::new(StoreFetcher::new(Arc::new(store))),
            root,
            "r",
            FetchConfig::sequential(),
        )
        .collect()
        .await
        .unwrap();

        let (store, _) = sample_store();
        let fetcher = Arc::new(SlowFetcher {
            store,
            delay: Duration::from_millis(50),
            fetched: Mutex::new(Vec::new()),
        });
        let mut driver = Driver::new(Arc::clone(&fetcher), root, "r", FetchConfig::sequential());

        let cancelled = tokio::time::timeout(Duration::from_millis(5), driver.next_item()).await;
        assert!(cancelled.is_err());
        assert!(!driver.is_done());

        let mut items = Vec::new();
        while let Some(item) = driver.next_item().await.unwrap() {
            items.push(item);
        }
        assert_eq!(items, expected);

        // The interrupted fetch was reused, not repeated.
        let fetched = fetcher.fetched.lock().unwrap();
        assert_eq!(fetched.iter().filter(|address| **address == root).count(), 1);
        assert_eq!(fetched.len(), items.len());
    }

    #[tokio::test]
    async fn cancelled_prefetching_step_keeps_every_event() {
        let (store, root) = sample_store();
        let expected = Driver::new(
            Arc::new(StoreFetcher::new(Arc::new(store))),
            root,
            "",
            FetchConfig::default(),
        )
        .collect()
        .await
        .unwrap();

        let (store, _) = sample_store();
        let fetcher = Arc::new(SlowFetcher {
            store,
            delay: Duration::from_millis(20),
            fetched: Mutex::new(Vec::new()),
        });
        let mut driver = Driver::new(fetcher, root, "", FetchConfig::default());

        let mut items = Vec::new();
        loop {
            // Interrupt each step once, then let it finish.
            let step = match tokio::time::timeout(Duration::from_millis(1), driver.next_item()).await {
                Ok(step) => step,
                Err(_) => driver.next_item().await,
            };
            match step.unwrap() {
                Some(item) => items.push(item),
                None => break,
            }
        }
        assert_eq!(items, expected);
    }

    /// Address of the raw leaf holding `data`, found by scanning the store.
    fn raw_leaf_address(store: &InMemoryBlockStore, data: &[u8]) -> ContentAddress {
        store
            .all_addresses()
            .into_iter()
            .find(|address| {
                let block = store.get(address).unwrap().unwrap();
                matches!(
                    ufs_codec::decode_node(&block).unwrap(),
                    ufs_codec::Node::Raw(ref raw) if raw == data
                )
            })
            .unwrap()
    }
}
