//! Executor proxy.
//!
//! Thin request/response adaptor over the remote executor contract. The
//! executor owns all task state; this side only triggers discovery and
//! execution cycles and forwards operator commands.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, info};

use crate::transport::{CallError, ContractClient, TransientKind, TransportError};
use crate::types::{AccountId, ChainName, ContractId, Location, TaskId, WorkerId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutorError {
    #[error("executor rejected {method}: {code}")]
    Rejected { method: String, code: String },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ExecutorError {
    fn from_call(method: &str, err: CallError<Value>) -> Self {
        match err {
            CallError::Contract(code) => Self::Rejected {
                method: method.to_string(),
                code: code.to_string(),
            },
            CallError::Transport(e) => Self::Transport(e),
        }
    }

    pub fn transient_kind(&self) -> Option<TransientKind> {
        match self {
            Self::Transport(e) => e.transient_kind(),
            Self::Rejected { .. } => None,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.transient_kind().is_some()
    }
}

pub type ExecutorResult<T> = Result<T, ExecutorError>;

/// What the executor reported for one cycle. An `Err` here is the
/// contract's own verdict, such as `FailedToFetchTask`, not a failure to
/// reach it.
pub type RunOutcome = Result<Value, Value>;

/// What one `run` call asks the executor to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunningMode {
    /// Scan `source` for new tasks claimed by `worker`.
    Fetch(ChainName, WorkerId),
    /// Advance previously discovered tasks.
    Execute,
}

/// A worker account in both chain representations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub account32: AccountId,
    pub account20: AccountId,
}

impl AccountInfo {
    pub fn matches(&self, worker: &WorkerId) -> bool {
        self.account32.to_hex().eq_ignore_ascii_case(worker.as_str())
    }
}

#[async_trait]
pub trait ExecutorApi: Send + Sync {
    /// Point the executor at its storage backend and key store. With
    /// `resume` the executor also starts running.
    async fn configure(
        &self,
        storage_url: &str,
        storage_key: &str,
        keystore: &ContractId,
        resume: bool,
    ) -> ExecutorResult<()>;

    async fn resume(&self) -> ExecutorResult<()>;

    async fn is_running(&self) -> ExecutorResult<bool>;

    /// Trigger one cycle. The payload is opaque beyond success/failure.
    async fn run(&self, mode: RunningMode) -> ExecutorResult<RunOutcome>;

    async fn get_worker_accounts(&self) -> ExecutorResult<Vec<AccountInfo>>;

    async fn worker_approve(
        &self,
        worker: &WorkerId,
        chain: &ChainName,
        token: &Location,
        spender: &Location,
        amount: u128,
    ) -> ExecutorResult<Value>;

    async fn worker_drop_task(
        &self,
        worker: &WorkerId,
        chain: &ChainName,
        task: &TaskId,
    ) -> ExecutorResult<Value>;
}

#[derive(Debug, Clone)]
pub struct ExecutorProxy {
    contract: ContractClient,
}

impl ExecutorProxy {
    pub fn new(contract: ContractClient) -> Self {
        Self { contract }
    }

    async fn query<T: serde::de::DeserializeOwned>(&self, method: &str, args: Value) -> ExecutorResult<T> {
        self.contract
            .query::<T, Value>(method, args)
            .await
            .map_err(|e| ExecutorError::from_call(method, e))
    }

    async fn transaction(&self, method: &str, args: Value) -> ExecutorResult<()> {
        let receipt = self
            .contract
            .transaction::<Value>(method, args)
            .await
            .map_err(|e| ExecutorError::from_call(method, e))?;
        info!(method, tx = %receipt.tx_hash, block = ?receipt.block, "Executor transaction included");
        Ok(())
    }
}

/// Executor task queues are keyed by the capitalized chain name
/// ("Moonbeam"), unlike allowances which use the lowercase form.
fn task_chain_key(chain: &ChainName) -> String {
    let lower = chain.normalized();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[async_trait]
impl ExecutorApi for ExecutorProxy {
    async fn configure(
        &self,
        storage_url: &str,
        storage_key: &str,
        keystore: &ContractId,
        resume: bool,
    ) -> ExecutorResult<()> {
        debug!(storage_url, %keystore, resume, "Configuring executor engine");
        self.transaction(
            "config_engine",
            json!([storage_url, storage_key, keystore, resume]),
        )
        .await
    }

    async fn resume(&self) -> ExecutorResult<()> {
        self.transaction("resume_executor", json!([])).await
    }

    async fn is_running(&self) -> ExecutorResult<bool> {
        self.query("is_running", json!([])).await
    }

    async fn run(&self, mode: RunningMode) -> ExecutorResult<RunOutcome> {
        match self.contract.query::<Value, Value>("run", json!([mode])).await {
            Ok(output) => Ok(Ok(output)),
            Err(CallError::Contract(reason)) => Ok(Err(reason)),
            Err(CallError::Transport(e)) => Err(e.into()),
        }
    }

    async fn get_worker_accounts(&self) -> ExecutorResult<Vec<AccountInfo>> {
        self.query("get_worker_accounts", json!([])).await
    }

    async fn worker_approve(
        &self,
        worker: &WorkerId,
        chain: &ChainName,
        token: &Location,
        spender: &Location,
        amount: u128,
    ) -> ExecutorResult<Value> {
        self.query(
            "worker_approve",
            json!([worker, chain.normalized(), token, spender, amount.to_string()]),
        )
        .await
    }

    async fn worker_drop_task(
        &self,
        worker: &WorkerId,
        chain: &ChainName,
        task: &TaskId,
    ) -> ExecutorResult<Value> {
        self.query(
            "worker_drop_task",
            json!([worker, task_chain_key(chain), task]),
        )
        .await
    }
}
