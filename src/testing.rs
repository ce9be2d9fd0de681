//! In-process fake node gateway for transport-level tests.

#![cfg(test)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use serde_json::{Value, json};

/// Scripted answer for one contract method.
#[derive(Debug, Clone)]
pub enum NodeReply {
    /// Contract outcome, served as `{"Ok": ..}` / `{"Err": ..}`.
    Outcome(Result<Value, Value>),
    /// Status and body returned verbatim for every action.
    Raw(u16, String),
}

impl NodeReply {
    pub fn ok(value: Value) -> Self {
        Self::Outcome(Ok(value))
    }

    pub fn err(value: Value) -> Self {
        Self::Outcome(Err(value))
    }
}

/// A request the fake node received.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub contract: String,
    pub action: String,
    pub method: String,
    pub body: Value,
}

#[derive(Default)]
struct NodeState {
    replies: Mutex<HashMap<String, NodeReply>>,
    calls: Mutex<Vec<RecordedCall>>,
}

pub struct FakeNode {
    addr: SocketAddr,
    state: Arc<NodeState>,
}

impl FakeNode {
    pub const GAS: u64 = 1_000_000;

    pub async fn start() -> Self {
        let state = Arc::new(NodeState::default());
        let app = Router::new()
            .route("/contracts/{contract}/{action}", post(handle))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn reply(&self, method: &str, reply: NodeReply) {
        self.state
            .replies
            .lock()
            .unwrap()
            .insert(method.to_string(), reply);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.calls.lock().unwrap().clone()
    }

    /// Calls that reached the given action ("query", "estimate", "tx").
    pub fn calls_to(&self, action: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.action == action)
            .collect()
    }
}

async fn handle(
    State(state): State<Arc<NodeState>>,
    Path((contract, action)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> (StatusCode, String) {
    let method = body["method"].as_str().unwrap_or_default().to_string();
    state.calls.lock().unwrap().push(RecordedCall {
        contract,
        action: action.clone(),
        method: method.clone(),
        body,
    });

    let reply = state.replies.lock().unwrap().get(&method).cloned();
    let outcome = match reply {
        None => return (StatusCode::NOT_FOUND, format!("no such method {}", method)),
        Some(NodeReply::Raw(status, body)) => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            return (status, body);
        }
        Some(NodeReply::Outcome(outcome)) => outcome,
    };

    let payload = match action.as_str() {
        "query" => serde_json::to_value(&outcome).unwrap(),
        "estimate" => json!({
            "gas_required": FakeNode::GAS,
            "storage_deposit": null,
            "result": outcome,
        }),
        "tx" => match outcome {
            Ok(_) => json!({ "Ok": { "tx_hash": "0xfeed", "block": 7 } }),
            Err(e) => json!({ "Err": e }),
        },
        _ => return (StatusCode::NOT_FOUND, format!("no such action {}", action)),
    };
    (StatusCode::OK, payload.to_string())
}
