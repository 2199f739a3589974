//! Block-height-keyed contract read cache.
//!
//! The cache holds at most one snapshot: the values of every registered read
//! as of one block. A refresh builds a complete new snapshot off-lock and
//! swaps it in, so readers see either the old block or the new one, never a
//! mix. Freshness is judged against the last observed head and an
//! invalidation generation bumped by [`ContractStateCache::invalidate`].

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, U256};
use craft_core::abi::AbiValue;
use craft_core::config::SyncConfig;
use craft_core::error::{AbiError, CacheError, CallError, GatewayError};
use craft_core::traits::ContractGateway;
use craft_core::types::{BlockHeight, ReadDescriptor, ReadResult};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::views::ReadBatch;

/// The reads of one view, all as of one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewReads {
    block: BlockHeight,
    results: Vec<ReadResult>,
}

impl ViewReads {
    pub fn block(&self) -> BlockHeight {
        self.block
    }

    pub fn results(&self) -> &[ReadResult] {
        &self.results
    }

    /// Decoded value of `read`. A reverted or undecodable read is unknown, never zero.
    pub fn value(&self, read: &ReadDescriptor) -> Result<&AbiValue, CacheError> {
        let result = self
            .results
            .iter()
            .find(|r| &r.descriptor == read)
            .ok_or(CacheError::NotLoaded)?;
        result.value.as_ref().map_err(|e| CacheError::Unreadable(e.clone()))
    }

    pub fn uint(&self, read: &ReadDescriptor) -> Result<U256, CacheError> {
        self.value(read)?.as_uint().ok_or_else(|| wrong_kind("uint256"))
    }

    pub fn address(&self, read: &ReadDescriptor) -> Result<Address, CacheError> {
        self.value(read)?.as_address().ok_or_else(|| wrong_kind("address"))
    }

    pub fn uint_pair(&self, read: &ReadDescriptor) -> Result<(U256, U256), CacheError> {
        match self.value(read)?.as_tuple() {
            Some([AbiValue::Uint(a), AbiValue::Uint(b)]) => Ok((*a, *b)),
            _ => Err(wrong_kind("(uint256,uint256)")),
        }
    }
}

fn wrong_kind(kind: &'static str) -> CacheError {
    CacheError::Unreadable(CallError::Abi(AbiError::InvalidWord { index: 0, kind }))
}

/// What a view sees right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// Nothing fetched for this view yet.
    Loading,
    /// Every read is as of the current head.
    Fresh(ViewReads),
    /// The chain moved (or a write landed) and the refetch is pending. Display only.
    Stale { last: ViewReads },
    /// The gateway is failing. `last` is the last good snapshot, if any.
    Degraded { last: Option<ViewReads>, error: GatewayError },
}

impl Observation {
    /// The reads to display, fresh or not.
    pub fn reads(&self) -> Option<&ViewReads> {
        match self {
            Observation::Loading => None,
            Observation::Fresh(reads) | Observation::Stale { last: reads } => Some(reads),
            Observation::Degraded { last, .. } => last.as_ref(),
        }
    }

    pub fn is_fresh(&self) -> bool {
        matches!(self, Observation::Fresh(_))
    }
}

#[derive(Debug)]
struct Snapshot {
    block: BlockHeight,
    generation: u64,
    values: HashMap<ReadDescriptor, Result<AbiValue, CallError>>,
}

impl Snapshot {
    fn covers(&self, batch: &ReadBatch) -> bool {
        batch.reads().iter().all(|r| self.values.contains_key(r))
    }

    fn view(&self, batch: &ReadBatch) -> ViewReads {
        let results = batch
            .reads()
            .iter()
            .filter_map(|r| {
                self.values.get(r).map(|value| ReadResult {
                    descriptor: r.clone(),
                    value: value.clone(),
                    as_of_block: self.block,
                })
            })
            .collect();
        ViewReads { block: self.block, results }
    }
}

#[derive(Default)]
struct CacheState {
    views: HashMap<String, ReadBatch>,
    head: Option<BlockHeight>,
    generation: u64,
    snapshot: Option<Arc<Snapshot>>,
    last_error: Option<GatewayError>,
}

impl CacheState {
    fn is_current(&self, snapshot: &Snapshot) -> bool {
        self.head == Some(snapshot.block) && self.generation == snapshot.generation
    }

    fn needs_refresh(&self) -> bool {
        match &self.snapshot {
            None => true,
            Some(s) => !self.is_current(s) || self.views.values().any(|b| !s.covers(b)),
        }
    }

    /// Every registered read, each once.
    fn union_reads(&self) -> Vec<ReadDescriptor> {
        let mut seen = HashSet::new();
        let mut reads = Vec::new();
        for batch in self.views.values() {
            for read in batch.reads() {
                if seen.insert(read) {
                    reads.push(read.clone());
                }
            }
        }
        reads
    }
}

/// Shared cache of contract reads, refreshed once per block.
pub struct ContractStateCache {
    gateway: Arc<dyn ContractGateway>,
    config: SyncConfig,
    state: RwLock<CacheState>,
    refresh_lock: tokio::sync::Mutex<()>,
}

impl ContractStateCache {
    pub fn new(gateway: Arc<dyn ContractGateway>, config: SyncConfig) -> Self {
        Self {
            gateway,
            config,
            state: RwLock::new(CacheState::default()),
            refresh_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Add a view's reads, replacing any batch registered under the same name.
    pub fn register(&self, batch: ReadBatch) {
        debug!(view = batch.name(), reads = batch.len(), "registering view");
        self.state.write().views.insert(batch.name().to_string(), batch);
    }

    pub fn unregister(&self, name: &str) {
        self.state.write().views.remove(name);
    }

    /// Last observed chain height.
    pub fn current_block(&self) -> Option<BlockHeight> {
        self.state.read().head
    }

    /// Block of the held snapshot, current or not.
    pub fn snapshot_block(&self) -> Option<BlockHeight> {
        self.state.read().snapshot.as_ref().map(|s| s.block)
    }

    pub fn is_degraded(&self) -> bool {
        self.state.read().last_error.is_some()
    }

    /// Record the chain head. A height different from the last one makes every
    /// held result stale. Returns whether the head changed.
    pub fn on_new_block(&self, height: BlockHeight) -> bool {
        let mut state = self.state.write();
        if state.head == Some(height) {
            return false;
        }
        debug!(old = ?state.head, new = %height, "new block; snapshot stale");
        state.head = Some(height);
        true
    }

    /// Force a refetch even at the same height (a write became final).
    pub fn invalidate(&self) {
        let mut state = self.state.write();
        state.generation += 1;
        debug!(generation = state.generation, "cache invalidated");
    }

    pub fn needs_refresh(&self) -> bool {
        self.state.read().needs_refresh()
    }

    /// Observe the head, then refetch if anything is stale.
    pub async fn sync(&self) -> Result<BlockHeight, GatewayError> {
        let height = self.call(self.gateway.block_height()).await?;
        self.on_new_block(height);
        if self.needs_refresh() {
            self.refresh().await
        } else {
            self.clear_failure(height);
            Ok(height)
        }
    }

    /// Fetch every registered read in one batch pinned at the head and swap
    /// the snapshot in. Returns the snapshot's block.
    pub async fn refresh(&self) -> Result<BlockHeight, GatewayError> {
        let _refreshing = self.refresh_lock.lock().await;

        let head = match self.current_block() {
            Some(head) => head,
            None => {
                let height = self.call(self.gateway.block_height()).await?;
                self.on_new_block(height);
                height
            }
        };
        let (reads, generation) = {
            let state = self.state.read();
            (state.union_reads(), state.generation)
        };

        let values = if reads.is_empty() {
            Vec::new()
        } else {
            debug!(block = %head, reads = reads.len(), "refreshing contract reads");
            self.call(self.gateway.read_batch(head, &reads)).await?
        };
        if values.len() != reads.len() {
            let err = GatewayError::MalformedResponse(format!(
                "{} results for {} reads",
                values.len(),
                reads.len()
            ));
            self.record_failure(&err);
            return Err(err);
        }

        let snapshot = Snapshot {
            block: head,
            generation,
            values: reads.into_iter().zip(values).collect(),
        };
        self.state.write().snapshot = Some(Arc::new(snapshot));
        self.clear_failure(head);
        Ok(head)
    }

    /// Current state of one view.
    pub fn observe(&self, batch: &ReadBatch) -> Observation {
        let state = self.state.read();
        let last = state.snapshot.as_ref().filter(|s| s.covers(batch));
        if let Some(error) = &state.last_error {
            return Observation::Degraded {
                last: last.map(|s| s.view(batch)),
                error: error.clone(),
            };
        }
        match last {
            None => Observation::Loading,
            Some(s) if state.is_current(s) => Observation::Fresh(s.view(batch)),
            Some(s) => Observation::Stale { last: s.view(batch) },
        }
    }

    /// Reads a decision may be based on: fresh at the current head, every value known.
    pub fn decision(&self, batch: &ReadBatch) -> Result<ViewReads, CacheError> {
        let reads = match self.observe(batch) {
            Observation::Fresh(reads) => reads,
            Observation::Loading => return Err(CacheError::NotLoaded),
            Observation::Degraded { error, .. } => return Err(CacheError::Degraded(error)),
            Observation::Stale { last } => {
                let head = self.current_block().unwrap_or(last.block);
                return Err(CacheError::Stale { snapshot: last.block, head });
            }
        };
        if let Some(err) = reads.results.iter().find_map(|r| r.value.as_ref().err()) {
            return Err(CacheError::Unreadable(err.clone()));
        }
        Ok(reads)
    }

    /// Run a gateway call under the request timeout, recording failures.
    async fn call<T>(
        &self,
        fut: impl Future<Output = Result<T, GatewayError>>,
    ) -> Result<T, GatewayError> {
        let outcome = match tokio::time::timeout(self.request_timeout(), fut).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout),
        };
        if let Err(err) = &outcome {
            self.record_failure(err);
        }
        outcome
    }

    fn request_timeout(&self) -> Duration {
        self.config.request_timeout()
    }

    fn clear_failure(&self, head: BlockHeight) {
        if self.state.write().last_error.take().is_some() {
            info!(block = %head, "gateway recovered");
        }
    }

    fn record_failure(&self, err: &GatewayError) {
        warn!(error = %err, "gateway call failed; keeping last snapshot");
        self.state.write().last_error = Some(err.clone());
    }
}
