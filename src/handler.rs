//! Administrative calls against the per-chain handler contracts.
//!
//! Only EVM handlers are reachable; Substrate chains host the handler as a
//! pallet and are rejected with [`HandlerError::UnsupportedChain`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::info;

use crate::graph::ChainType;
use crate::transport::{CallError, ContractClient, TransportError, TxReceipt};
use crate::types::{ChainName, Location, TaskId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    #[error("handler calls are not implemented for {0} (not an EVM chain)")]
    UnsupportedChain(ChainName),

    #[error("handler rejected {method}: {code}")]
    Rejected { method: String, code: String },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

pub type HandlerResult<T> = Result<T, HandlerError>;

/// A task deposit as the handler contract takes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposit {
    pub asset: Location,
    pub amount: u128,
    pub recipient: Location,
    pub worker: Location,
    pub task_id: TaskId,
    /// Encoded solution of the task.
    pub data: Location,
}

#[async_trait]
pub trait HandlerApi: Send + Sync {
    /// Whitelist a worker address on the handler.
    async fn set_worker(&self, worker: &Location) -> HandlerResult<TxReceipt>;

    async fn deposit(&self, deposit: Deposit) -> HandlerResult<TxReceipt>;
}

#[derive(Debug, Clone)]
pub struct HandlerClient {
    chain: ChainName,
    contract: ContractClient,
}

impl HandlerClient {
    /// `contract` must target the handler address of `chain`.
    pub fn new(
        chain: ChainName,
        chain_type: ChainType,
        contract: ContractClient,
    ) -> HandlerResult<Self> {
        if chain_type != ChainType::Evm {
            return Err(HandlerError::UnsupportedChain(chain));
        }
        Ok(Self { chain, contract })
    }

    async fn submit(&self, method: &str, args: Value) -> HandlerResult<TxReceipt> {
        self.contract
            .transaction::<Value>(method, args)
            .await
            .map_err(|e| match e {
                CallError::Contract(code) => HandlerError::Rejected {
                    method: method.to_string(),
                    code: code.to_string(),
                },
                CallError::Transport(e) => HandlerError::Transport(e),
            })
    }
}

#[async_trait]
impl HandlerApi for HandlerClient {
    async fn set_worker(&self, worker: &Location) -> HandlerResult<TxReceipt> {
        let receipt = self.submit("set_worker", json!([worker])).await?;
        info!("Whitelisted worker {} on {}: {}", worker, self.chain, receipt.tx_hash);
        Ok(receipt)
    }

    async fn deposit(&self, deposit: Deposit) -> HandlerResult<TxReceipt> {
        let receipt = self
            .submit(
                "deposit",
                json!([
                    deposit.asset,
                    deposit.amount.to_string(),
                    deposit.recipient,
                    deposit.worker,
                    deposit.task_id,
                    deposit.data,
                ]),
            )
            .await?;
        info!("Deposited task {} on {}: {}", deposit.task_id, self.chain, receipt.tx_hash);
        Ok(receipt)
    }
}
