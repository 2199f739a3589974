//! Cooperative refresh loop.
//!
//! One tokio task polls the head at the configured interval and refreshes the
//! cache when the height changes (or the cache was invalidated). The height of
//! every fresh snapshot is published on a `watch` channel.

use std::sync::Arc;
use std::time::Duration;

use craft_core::error::GatewayError;
use craft_core::types::BlockHeight;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::cache::ContractStateCache;

/// Drives [`ContractStateCache::sync`] on an interval.
pub struct BlockWatcher {
    cache: Arc<ContractStateCache>,
    interval: Duration,
    fresh: watch::Sender<Option<BlockHeight>>,
}

impl BlockWatcher {
    /// Watcher polling at the cache's configured interval.
    pub fn new(cache: Arc<ContractStateCache>) -> Self {
        let interval = cache.config().poll_interval();
        Self::with_interval(cache, interval)
    }

    pub fn with_interval(cache: Arc<ContractStateCache>, interval: Duration) -> Self {
        let (fresh, _) = watch::channel(None);
        Self { cache, interval, fresh }
    }

    /// Heights of fresh snapshots, as they land.
    pub fn subscribe(&self) -> watch::Receiver<Option<BlockHeight>> {
        self.fresh.subscribe()
    }

    pub fn cache(&self) -> &Arc<ContractStateCache> {
        &self.cache
    }

    /// One poll: observe the head, refetch if needed, publish the fresh height.
    pub async fn tick(&self) -> Result<BlockHeight, GatewayError> {
        let height = self.cache.sync().await?;
        self.fresh.send_if_modified(|current| {
            if *current == Some(height) {
                return false;
            }
            *current = Some(height);
            true
        });
        Ok(height)
    }

    /// Poll until `shutdown` flips to `true` or its sender is dropped.
    ///
    /// Gateway errors are logged by the cache and retried on the next tick.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_ms = self.interval.as_millis() as u64, "block watcher started");
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Ok(height) = self.tick().await {
                        debug!(block = %height, "cache synced");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("block watcher stopped");
    }

    /// Run on a background task. Send `true` (or drop the sender) to stop it.
    pub fn spawn(self) -> (JoinHandle<()>, watch::Sender<bool>) {
        let (stop, shutdown) = watch::channel(false);
        let handle = tokio::spawn(self.run(shutdown));
        (handle, stop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, U256};
    use craft_core::abi::AbiValue;
    use craft_core::config::SyncConfig;
    use craft_core::contracts;
    use craft_core::testing::MockChain;
    use craft_core::types::ReadDescriptor;

    use crate::views::ReadBatch;

    fn setup() -> (Arc<MockChain>, Arc<ContractStateCache>, ReadBatch) {
        let chain = Arc::new(MockChain::at_height(7));
        let read = ReadDescriptor::new(
            Address::repeat_byte(1),
            contracts::BALANCE_OF,
            vec![AbiValue::Address(Address::repeat_byte(2))],
        );
        chain.set_value(read.clone(), U256::from(5u64));
        let cache = Arc::new(ContractStateCache::new(chain.clone(), SyncConfig::default()));
        let batch = ReadBatch::new("balance").with(read);
        cache.register(batch.clone());
        (chain, cache, batch)
    }

    #[tokio::test]
    async fn tick_publishes_fresh_height_once() {
        let (chain, cache, _) = setup();
        let watcher = BlockWatcher::new(cache);
        let mut rx = watcher.subscribe();

        assert_eq!(watcher.tick().await.unwrap(), BlockHeight(7));
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), Some(BlockHeight(7)));

        watcher.tick().await.unwrap();
        assert!(!rx.has_changed().unwrap());

        chain.advance(1);
        watcher.tick().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), Some(BlockHeight(8)));
    }

    #[tokio::test]
    async fn spawned_watcher_follows_chain_and_stops() {
        let (chain, cache, batch) = setup();
        let watcher = BlockWatcher::with_interval(cache.clone(), Duration::from_millis(10));
        let mut rx = watcher.subscribe();
        let (handle, stop) = watcher.spawn();

        rx.changed().await.unwrap();
        assert!(cache.observe(&batch).is_fresh());

        chain.advance(3);
        tokio::time::timeout(Duration::from_secs(2), async {
            while *rx.borrow_and_update() != Some(BlockHeight(10)) {
                rx.changed().await.unwrap();
            }
        })
        .await
        .unwrap();

        stop.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn failing_tick_keeps_loop_alive() {
        let (chain, cache, _) = setup();
        chain.set_offline(true);
        let watcher = BlockWatcher::with_interval(cache.clone(), Duration::from_millis(10));
        let mut rx = watcher.subscribe();
        let (handle, stop) = watcher.spawn();

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(cache.is_degraded());
        chain.set_offline(false);
        tokio::time::timeout(Duration::from_secs(2), rx.changed()).await.unwrap().unwrap();
        assert!(!cache.is_degraded());

        drop(stop);
        handle.await.unwrap();
    }
}
