//! Key store contract. Holds the worker keys and only releases them to the
//! executor contract it has been told about.

use serde_json::{Value, json};
use thiserror::Error;
use tracing::info;

use crate::transport::{CallError, ContractClient, TransportError, TxReceipt};
use crate::types::ContractId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeystoreError {
    #[error("key store rejected {method}: {code}")]
    Rejected { method: String, code: String },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Debug, Clone)]
pub struct KeystoreClient {
    contract: ContractClient,
}

impl KeystoreClient {
    pub fn new(contract: ContractClient) -> Self {
        Self { contract }
    }

    /// Authorize `executor` to import worker keys.
    pub async fn set_executor(&self, executor: &ContractId) -> Result<TxReceipt, KeystoreError> {
        let receipt = self
            .contract
            .transaction::<Value>("set_executor", json!([executor]))
            .await
            .map_err(|e| match e {
                CallError::Contract(code) => KeystoreError::Rejected {
                    method: "set_executor".to_string(),
                    code: code.to_string(),
                },
                CallError::Transport(e) => KeystoreError::Transport(e),
            })?;
        info!("Key store {} now serves executor {}", self.contract.contract(), executor);
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeNode, NodeReply};

    #[tokio::test]
    async fn test_set_executor() {
        let node = FakeNode::start().await;
        node.reply("set_executor", NodeReply::ok(json!(null)));

        let keystore = KeystoreClient::new(
            ContractClient::new(&node.url(), ContractId::new("0xkeystore"), "//Alice").unwrap(),
        );
        keystore.set_executor(&ContractId::new("0xexecutor")).await.unwrap();

        let tx = node.calls_to("tx");
        assert_eq!(tx.len(), 1);
        assert_eq!(tx[0].contract, "0xkeystore");
        assert_eq!(tx[0].body["args"], json!(["0xexecutor"]));
    }

    #[tokio::test]
    async fn test_set_executor_rejected() {
        let node = FakeNode::start().await;
        node.reply("set_executor", NodeReply::err(json!("BadOrigin")));

        let keystore = KeystoreClient::new(
            ContractClient::new(&node.url(), ContractId::new("0xkeystore"), "//Bob").unwrap(),
        );
        let err = keystore.set_executor(&ContractId::new("0xexecutor")).await.unwrap_err();
        assert_eq!(
            err,
            KeystoreError::Rejected {
                method: "set_executor".to_string(),
                code: "\"BadOrigin\"".to_string(),
            }
        );
        assert!(err.to_string().starts_with("key store rejected"));
        assert_eq!(node.calls_to("tx").len(), 0);
    }
}
