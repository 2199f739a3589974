//! The orchestration state machine and its driver task.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use craft_core::config::OrchestratorConfig;
use craft_core::error::{FailureReason, GatewayError, OrchestrationError, PreconditionFailure};
use craft_core::traits::ContractGateway;
use craft_core::types::{
    ActionKey, BlockHeight, Finality, OrchestrationSteps, TransactionHandle, TxId,
};
use craft_sync::{ContractStateCache, ReadBatch, ViewReads};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::status::{OrchestrationStatus, RunReport};

/// A logical user action: the reads it decides on and the writes it plans.
pub trait Action: Send + Sync {
    /// At most one run per key is active.
    fn key(&self) -> ActionKey;

    /// Reads [`plan`](Action::plan) needs, fresh at one height.
    fn reads(&self) -> &ReadBatch;

    /// Steps to submit, or the precondition that blocks the action.
    fn plan(&self, reads: &ViewReads) -> Result<OrchestrationSteps, PreconditionFailure>;
}

type ActiveSet = Arc<Mutex<HashSet<ActionKey>>>;

/// Releases an action key when the run ends, however it ends.
struct ActiveGuard {
    active: ActiveSet,
    key: ActionKey,
}

impl ActiveGuard {
    fn claim(active: &ActiveSet, key: ActionKey) -> Result<Self, OrchestrationError> {
        if !active.lock().insert(key.clone()) {
            return Err(OrchestrationError::AlreadyRunning(key.to_string()));
        }
        Ok(Self { active: active.clone(), key })
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.active.lock().remove(&self.key);
    }
}

/// A run in progress.
#[derive(Debug)]
pub struct RunHandle {
    key: ActionKey,
    status: watch::Receiver<OrchestrationStatus>,
    task: JoinHandle<RunReport>,
}

impl RunHandle {
    pub fn key(&self) -> &ActionKey {
        &self.key
    }

    /// Current combined status.
    pub fn status(&self) -> OrchestrationStatus {
        self.status.borrow().clone()
    }

    /// Status updates as they happen.
    pub fn subscribe(&self) -> watch::Receiver<OrchestrationStatus> {
        self.status.clone()
    }

    /// Wait for the run to finish. The action key is free again once this returns.
    pub async fn wait(self) -> Result<RunReport, OrchestrationError> {
        self.task.await.map_err(|e| OrchestrationError::TaskAborted(e.to_string()))
    }
}

/// Starts orchestration runs against one gateway and cache.
#[derive(Clone)]
pub struct Orchestrator {
    gateway: Arc<dyn ContractGateway>,
    cache: Arc<ContractStateCache>,
    config: OrchestratorConfig,
    active: ActiveSet,
}

impl Orchestrator {
    pub fn new(
        gateway: Arc<dyn ContractGateway>,
        cache: Arc<ContractStateCache>,
        config: OrchestratorConfig,
    ) -> Self {
        Self { gateway, cache, config, active: Arc::default() }
    }

    pub fn is_running(&self, key: &ActionKey) -> bool {
        self.active.lock().contains(key)
    }

    /// Register the action's reads and bring the cache up to the head.
    pub async fn prepare(&self, action: &dyn Action) -> Result<BlockHeight, GatewayError> {
        self.cache.register(action.reads().clone());
        self.cache.sync().await
    }

    /// Check preconditions on the current snapshot and start the run.
    ///
    /// Nothing is submitted when this returns an error. Must be called from
    /// within a tokio runtime.
    pub fn run(&self, action: &dyn Action) -> Result<RunHandle, OrchestrationError> {
        let key = action.key();
        let guard = ActiveGuard::claim(&self.active, key.clone())?;
        let reads = self.cache.decision(action.reads()).map_err(PreconditionFailure::DataNotReady)?;
        let steps = action.plan(&reads)?;
        info!(action = %key, block = %reads.block(), steps = steps.len(), "orchestration planned");
        self.start(guard, steps)
    }

    /// Run fixed steps under `key`, without a precondition check.
    pub fn run_steps(
        &self,
        key: ActionKey,
        steps: OrchestrationSteps,
    ) -> Result<RunHandle, OrchestrationError> {
        let guard = ActiveGuard::claim(&self.active, key)?;
        self.start(guard, steps)
    }

    fn start(&self, guard: ActiveGuard, steps: OrchestrationSteps) -> Result<RunHandle, OrchestrationError> {
        if steps.is_empty() {
            return Err(OrchestrationError::EmptySteps);
        }
        let key = guard.key.clone();
        let (status_tx, status_rx) = watch::channel(OrchestrationStatus::Idle);
        let driver = Driver {
            gateway: self.gateway.clone(),
            cache: self.cache.clone(),
            config: self.config.clone(),
            status: status_tx,
        };
        let task = tokio::spawn(async move {
            let report = driver.drive(guard.key.clone(), steps).await;
            drop(guard);
            report
        });
        Ok(RunHandle { key, status: status_rx, task })
    }
}

struct Driver {
    gateway: Arc<dyn ContractGateway>,
    cache: Arc<ContractStateCache>,
    config: OrchestratorConfig,
    status: watch::Sender<OrchestrationStatus>,
}

impl Driver {
    fn set(&self, status: OrchestrationStatus) {
        self.status.send_replace(status);
    }

    async fn drive(&self, key: ActionKey, steps: OrchestrationSteps) -> RunReport {
        let mut handles = Vec::with_capacity(steps.len());
        for (i, intent) in steps.iter().enumerate() {
            self.set(OrchestrationStatus::AwaitingStep(i));
            debug!(action = %key, step = i, intent = %intent, "submitting");
            let id = match self.gateway.submit(intent).await {
                Ok(id) => id,
                Err(e) => {
                    warn!(action = %key, step = i, error = %e, "submission rejected");
                    return self.finish(key, handles, FailureReason::Rejected(e.to_string()));
                }
            };
            let submitted_at = self.submission_height().await;
            let mut handle = TransactionHandle::pending(id, submitted_at);
            self.set(OrchestrationStatus::Confirming(i));
            info!(action = %key, step = i, tx = %id, "transaction submitted");

            let outcome =
                tokio::time::timeout(self.config.confirmation_timeout(), self.await_final(&id)).await;
            let failure = match outcome {
                Ok(Finality::Confirmed { block }) => {
                    transition(&id, handle.confirm(block));
                    info!(action = %key, step = i, tx = %id, block = %block, "transaction confirmed");
                    None
                }
                Ok(Finality::Failed { block, reason }) => {
                    transition(&id, handle.fail(Some(block)));
                    warn!(action = %key, step = i, tx = %id, block = %block, reason = %reason, "transaction reverted");
                    Some(FailureReason::Reverted { tx: id, block, reason })
                }
                Ok(Finality::Pending) | Err(_) => {
                    transition(&id, handle.fail(None));
                    warn!(action = %key, step = i, tx = %id, "transaction not final before timeout");
                    Some(FailureReason::Indeterminate { tx: id })
                }
            };
            handles.push(handle);
            // The write changed chain state either way; refetch before the next decision.
            self.cache.invalidate();
            if let Some(reason) = failure {
                return self.finish(key, handles, reason);
            }
        }
        self.set(OrchestrationStatus::Succeeded);
        info!(action = %key, "orchestration succeeded");
        RunReport { key, status: OrchestrationStatus::Succeeded, handles }
    }

    /// Head at submission time. Falls back to the cache's head if the node
    /// cannot be asked; the transaction is out either way.
    async fn submission_height(&self) -> BlockHeight {
        match self.gateway.block_height().await {
            Ok(height) => height,
            Err(e) => {
                debug!(error = %e, "block height unavailable after submit");
                self.cache.current_block().unwrap_or_default()
            }
        }
    }

    /// Poll finality until the transaction is confirmed or failed.
    /// Gateway errors are transient here: the transaction is already out.
    async fn await_final(&self, id: &TxId) -> Finality {
        let poll = self.config.confirmation_poll().max(Duration::from_millis(1));
        loop {
            match self.gateway.finality(id).await {
                Ok(Finality::Pending) => {}
                Ok(done) => return done,
                Err(e) => debug!(tx = %id, error = %e, "finality query failed; retrying"),
            }
            tokio::time::sleep(poll).await;
        }
    }

    fn finish(
        &self,
        key: ActionKey,
        handles: Vec<TransactionHandle>,
        reason: FailureReason,
    ) -> RunReport {
        let status = OrchestrationStatus::Failed(reason);
        self.set(status.clone());
        RunReport { key, status, handles }
    }
}

fn transition(id: &TxId, result: Result<(), craft_core::error::HandleError>) {
    if let Err(e) = result {
        warn!(tx = %id, error = %e, "ignored transition out of a final state");
    }
}
