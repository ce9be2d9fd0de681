//! Request/response transport to deployed contracts.
//!
//! Every remote contract (registry, executor, handler relays) is reached the
//! same way: read-only calls go through `query`, state-mutating calls through
//! `transaction`, which first dry-runs the call to estimate its cost and then
//! submits it with that budget. Contract-level failures come back as the
//! `Err` arm of the remote result and are surfaced as [`CallError::Contract`];
//! everything else is a [`TransportError`], tagged here as transient or not so
//! callers never inspect error text.

use std::fmt;
use std::io;
use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::types::ContractId;

/// Remote error text that is known to come from response-decoding hiccups
/// of the node rather than from a real failure.
const DECODE_QUIRK_MARKERS: &[&str] = &["InkResponse", "inkMessageReturn"];

const RESET_MARKERS: &[&str] = &["ECONNRESET", "connection reset", "Connection reset"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransientKind {
    /// The underlying connection was reset by the peer.
    ConnectionReset,
    /// A remote response could not be decoded (partial or quirky payload).
    DecodeQuirk,
}

impl fmt::Display for TransientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionReset => write!(f, "connection reset"),
            Self::DecodeQuirk => write!(f, "decode quirk"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("transient {kind}: {message}")]
    Transient { kind: TransientKind, message: String },

    #[error("HTTP {status} from {endpoint}: {body}")]
    Http {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("request to {endpoint} failed: {message}")]
    Request { endpoint: String, message: String },

    #[error("invalid endpoint {0}")]
    InvalidEndpoint(String),
}

impl TransportError {
    pub fn transient(kind: TransientKind, message: impl Into<String>) -> Self {
        Self::Transient {
            kind,
            message: message.into(),
        }
    }

    pub fn transient_kind(&self) -> Option<TransientKind> {
        match self {
            Self::Transient { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.transient_kind().is_some()
    }

    /// Classify free-form remote error text. Known markers become tagged
    /// transient faults; anything else is a plain request failure.
    pub fn from_remote_message(endpoint: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        if let Some(kind) = classify_text(&message) {
            return Self::transient(kind, message);
        }
        Self::Request {
            endpoint: endpoint.to_string(),
            message,
        }
    }

    fn from_reqwest(endpoint: &str, err: reqwest::Error) -> Self {
        if err.is_decode() || err.is_body() {
            return Self::transient(TransientKind::DecodeQuirk, err.to_string());
        }
        if matches!(
            io_error_kind(&err),
            Some(io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted)
        ) {
            return Self::transient(TransientKind::ConnectionReset, err.to_string());
        }
        Self::from_remote_message(endpoint, err.to_string())
    }
}

fn classify_text(message: &str) -> Option<TransientKind> {
    if DECODE_QUIRK_MARKERS.iter().any(|m| message.contains(m)) {
        Some(TransientKind::DecodeQuirk)
    } else if RESET_MARKERS.iter().any(|m| message.contains(m)) {
        Some(TransientKind::ConnectionReset)
    } else {
        None
    }
}

fn io_error_kind(err: &(dyn std::error::Error + 'static)) -> Option<io::ErrorKind> {
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            return Some(io_err.kind());
        }
        source = cause.source();
    }
    None
}

/// Failure of a single contract call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError<E> {
    /// The contract executed and rejected the call.
    #[error("contract rejected the call: {0:?}")]
    Contract(E),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Dry-run result of a transaction: budget plus the outcome the contract
/// would produce.
#[derive(Debug, Clone, Deserialize)]
pub struct CostEstimate<E> {
    pub gas_required: u64,
    #[serde(default)]
    pub storage_deposit: Option<u128>,
    pub result: Result<Value, E>,
}

/// Inclusion receipt of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: String,
    #[serde(default)]
    pub block: Option<u64>,
}

#[derive(Debug, Serialize)]
struct CallRequest<'a> {
    id: Uuid,
    origin: &'a str,
    method: &'a str,
    args: &'a Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    gas_limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    storage_deposit_limit: Option<u128>,
}

/// Handle to one deployed contract. Cheap to clone; holds no call state.
#[derive(Debug, Clone)]
pub struct ContractClient {
    http: Client,
    base: Url,
    contract: ContractId,
    origin: String,
}

impl ContractClient {
    /// `endpoint` is the node gateway base URL; `origin` identifies the
    /// signing account the gateway should use.
    pub fn new(
        endpoint: &str,
        contract: ContractId,
        origin: impl Into<String>,
    ) -> Result<Self, TransportError> {
        let mut base =
            Url::parse(endpoint).map_err(|_| TransportError::InvalidEndpoint(endpoint.to_string()))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .user_agent("index-orchestrator/0.1.0")
            .build()
            .map_err(|e| TransportError::Request {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            http,
            base,
            contract,
            origin: origin.into(),
        })
    }

    pub fn contract(&self) -> &ContractId {
        &self.contract
    }

    /// Read-only call.
    pub async fn query<T, E>(&self, method: &str, args: Value) -> Result<T, CallError<E>>
    where
        T: DeserializeOwned,
        E: DeserializeOwned,
    {
        let request = self.request(method, &args, None, None);
        let outcome: Result<T, E> = self.post("query", &request).await?;
        outcome.map_err(CallError::Contract)
    }

    /// State-mutating call: estimate, then submit with the estimated budget.
    /// A dry run that the contract already rejects is not submitted.
    pub async fn transaction<E>(&self, method: &str, args: Value) -> Result<TxReceipt, CallError<E>>
    where
        E: DeserializeOwned,
    {
        let request = self.request(method, &args, None, None);
        let estimate: CostEstimate<E> = self.post("estimate", &request).await?;
        if let Err(e) = estimate.result {
            return Err(CallError::Contract(e));
        }
        debug!(
            contract = %self.contract,
            method,
            gas = estimate.gas_required,
            storage_deposit = ?estimate.storage_deposit,
            "Estimated transaction cost"
        );

        let request = self.request(
            method,
            &args,
            Some(estimate.gas_required),
            estimate.storage_deposit,
        );
        let outcome: Result<TxReceipt, E> = self.post("tx", &request).await?;
        outcome.map_err(CallError::Contract)
    }

    fn request<'a>(
        &'a self,
        method: &'a str,
        args: &'a Value,
        gas_limit: Option<u64>,
        storage_deposit_limit: Option<u128>,
    ) -> CallRequest<'a> {
        CallRequest {
            id: Uuid::new_v4(),
            origin: &self.origin,
            method,
            args,
            gas_limit,
            storage_deposit_limit,
        }
    }

    async fn post<R: DeserializeOwned>(
        &self,
        action: &str,
        request: &CallRequest<'_>,
    ) -> Result<R, TransportError> {
        let url = self
            .base
            .join(&format!("contracts/{}/{}", self.contract, action))
            .map_err(|_| TransportError::InvalidEndpoint(self.base.to_string()))?;
        let endpoint = url.to_string();

        let response = self
            .http
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(&endpoint, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::from_reqwest(&endpoint, e))?;

        if !status.is_success() {
            if let Some(kind) = classify_text(&body) {
                return Err(TransportError::transient(kind, body));
            }
            return Err(TransportError::Http {
                endpoint,
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            TransportError::transient(
                TransientKind::DecodeQuirk,
                format!("undecodable response from {}: {}", endpoint, e),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeNode, NodeReply};
    use serde_json::json;

    #[test]
    fn test_remote_message_classification() {
        let err = TransportError::from_remote_message("n", "Error: read ECONNRESET");
        assert_eq!(err.transient_kind(), Some(TransientKind::ConnectionReset));

        let err = TransportError::from_remote_message("n", "createType(InkResponse):: decode failed");
        assert_eq!(err.transient_kind(), Some(TransientKind::DecodeQuirk));

        let err = TransportError::from_remote_message("n", "inkMessageReturn: unexpected tag");
        assert_eq!(err.transient_kind(), Some(TransientKind::DecodeQuirk));

        let err = TransportError::from_remote_message("n", "bad origin");
        assert!(!err.is_transient());
    }

    #[test]
    fn test_invalid_endpoint() {
        let err = ContractClient::new("not a url", ContractId::new("0x01"), "//Alice").unwrap_err();
        assert!(matches!(err, TransportError::InvalidEndpoint(_)));
    }

    #[tokio::test]
    async fn test_query_ok_and_contract_error() {
        let node = FakeNode::start().await;
        node.reply("get_value", NodeReply::ok(json!(42)));
        node.reply("broken", NodeReply::err(json!("BadOrigin")));

        let client = ContractClient::new(&node.url(), ContractId::new("0xexec"), "//Alice").unwrap();

        let value: u32 = client.query::<u32, String>("get_value", json!([])).await.unwrap();
        assert_eq!(value, 42);

        let err = client.query::<u32, String>("broken", json!([])).await.unwrap_err();
        assert_eq!(err, CallError::Contract("BadOrigin".to_string()));
    }

    #[tokio::test]
    async fn test_transaction_estimates_then_submits() {
        let node = FakeNode::start().await;
        node.reply("config_engine", NodeReply::ok(json!(null)));

        let client = ContractClient::new(&node.url(), ContractId::new("0xexec"), "//Alice").unwrap();
        let receipt = client
            .transaction::<String>("config_engine", json!(["https://storage", "key", "0xks", false]))
            .await
            .unwrap();
        assert!(receipt.tx_hash.starts_with("0x"));

        let calls = node.calls();
        let actions: Vec<&str> = calls.iter().map(|c| c.action.as_str()).collect();
        assert_eq!(actions, vec!["estimate", "tx"]);
        assert!(calls.iter().all(|c| c.method == "config_engine" && c.contract == "0xexec"));
        assert_eq!(calls[1].body["gas_limit"], json!(FakeNode::GAS));
        assert_eq!(calls[1].body["origin"], json!("//Alice"));
    }

    #[tokio::test]
    async fn test_rejected_dry_run_is_not_submitted() {
        let node = FakeNode::start().await;
        node.reply("resume_executor", NodeReply::err(json!("BadOrigin")));

        let client = ContractClient::new(&node.url(), ContractId::new("0xexec"), "//Alice").unwrap();
        let err = client
            .transaction::<String>("resume_executor", json!([]))
            .await
            .unwrap_err();
        assert_eq!(err, CallError::Contract("BadOrigin".to_string()));
        assert_eq!(node.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_garbled_response_is_transient() {
        let node = FakeNode::start().await;
        node.reply("run", NodeReply::Raw(200, "{\"Ok\": ".to_string()));

        let client = ContractClient::new(&node.url(), ContractId::new("0xexec"), "//Alice").unwrap();
        let err = client.query::<Value, Value>("run", json!([])).await.unwrap_err();
        match err {
            CallError::Transport(t) => assert_eq!(t.transient_kind(), Some(TransientKind::DecodeQuirk)),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_server_error_is_fatal_unless_marked() {
        let node = FakeNode::start().await;
        node.reply("run", NodeReply::Raw(500, "internal error".to_string()));
        node.reply("flaky", NodeReply::Raw(502, "upstream: ECONNRESET".to_string()));

        let client = ContractClient::new(&node.url(), ContractId::new("0xexec"), "//Alice").unwrap();

        let err = client.query::<Value, Value>("run", json!([])).await.unwrap_err();
        assert!(matches!(
            err,
            CallError::Transport(TransportError::Http { status: 500, .. })
        ));

        let err = client.query::<Value, Value>("flaky", json!([])).await.unwrap_err();
        match err {
            CallError::Transport(t) => assert_eq!(t.transient_kind(), Some(TransientKind::ConnectionReset)),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
