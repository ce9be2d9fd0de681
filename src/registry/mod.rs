//! Registry contract surface.
//!
//! [`RegistryApi`] is the request/response contract of the remote registry.
//! [`RegistryClient`] talks to the deployed contract; [`InMemoryRegistry`]
//! applies the same rules to a local [`Topology`](crate::graph::Topology) and
//! stands in for the contract in dry runs and tests. A [`RegistryManifest`]
//! replays a whole topology against either.

mod client;
mod manifest;
mod memory;

pub use client::RegistryClient;
pub use manifest::{BridgeEntry, ChainAsset, DexEntry, RegistryManifest};
pub use memory::InMemoryRegistry;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::graph::{AssetInfo, AssetPair, ChainInfo, DexPair, Graph, GraphError};
use crate::transport::{CallError, TransportError};
use crate::types::{BridgeName, ChainName, DexName, PoolId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("caller is not the registry admin")]
    BadOrigin,
    #[error("chain already registered")]
    ChainAlreadyRegistered,
    #[error("chain not found")]
    ChainNotFound,
    #[error("asset already registered")]
    AssetAlreadyRegistered,
    #[error("asset not found")]
    AssetNotFound,
    #[error("bridge already registered")]
    BridgeAlreadyRegistered,
    #[error("bridge not found")]
    BridgeNotFound,
    #[error("dex already registered")]
    DexAlreadyRegistered,
    #[error("dex not found")]
    DexNotFound,
    /// Any other error code the contract returned.
    #[error("registry rejected the call: {0}")]
    Rejected(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl RegistryError {
    /// Map a contract error code (`"ChainNotFound"` or `{"ChainNotFound": null}`).
    pub fn from_code(code: &Value) -> Self {
        let name = match code {
            Value::String(s) => s.as_str(),
            Value::Object(map) if map.len() == 1 => map.keys().next().map(String::as_str).unwrap_or(""),
            _ => "",
        };
        match name {
            "BadOrigin" => Self::BadOrigin,
            "ChainAlreadyRegistered" => Self::ChainAlreadyRegistered,
            "ChainNotFound" => Self::ChainNotFound,
            "AssetAlreadyRegistered" => Self::AssetAlreadyRegistered,
            "AssetNotFound" => Self::AssetNotFound,
            "BridgeAlreadyRegistered" => Self::BridgeAlreadyRegistered,
            "BridgeNotFound" => Self::BridgeNotFound,
            "DexAlreadyRegistered" => Self::DexAlreadyRegistered,
            "DexNotFound" => Self::DexNotFound,
            _ => Self::Rejected(code.to_string()),
        }
    }
}

impl From<CallError<Value>> for RegistryError {
    fn from(err: CallError<Value>) -> Self {
        match err {
            CallError::Contract(code) => Self::from_code(&code),
            CallError::Transport(e) => Self::Transport(e),
        }
    }
}

impl From<GraphError> for RegistryError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::DuplicateChain(_) => Self::ChainAlreadyRegistered,
            GraphError::UnknownChain(_) => Self::ChainNotFound,
            GraphError::DuplicateAsset { .. } | GraphError::DuplicatePair(_) => {
                Self::AssetAlreadyRegistered
            }
            GraphError::UnknownAsset { .. } | GraphError::UnknownPair(_) => Self::AssetNotFound,
            GraphError::DuplicateBridge(_) => Self::BridgeAlreadyRegistered,
            GraphError::UnknownBridge(_) => Self::BridgeNotFound,
            GraphError::DuplicateDex(_) => Self::DexAlreadyRegistered,
            GraphError::UnknownDex(_) => Self::DexNotFound,
        }
    }
}

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Registration calls are writes; `get_graph` is the only read and is
/// side-effect free.
#[async_trait]
pub trait RegistryApi: Send + Sync {
    async fn register_chain(&self, info: ChainInfo) -> RegistryResult<()>;
    async fn unregister_chain(&self, name: &ChainName) -> RegistryResult<()>;

    async fn register_asset(&self, chain: &ChainName, asset: AssetInfo) -> RegistryResult<()>;
    async fn unregister_asset(&self, chain: &ChainName, asset: AssetInfo) -> RegistryResult<()>;

    async fn set_chain_native(&self, chain: &ChainName, asset: AssetInfo) -> RegistryResult<()>;
    async fn set_chain_stable(&self, chain: &ChainName, asset: AssetInfo) -> RegistryResult<()>;
    async fn set_chain_endpoint(&self, chain: &ChainName, endpoint: String) -> RegistryResult<()>;

    async fn register_bridge(
        &self,
        name: BridgeName,
        chain0: ChainName,
        chain1: ChainName,
    ) -> RegistryResult<()>;
    async fn unregister_bridge(&self, name: &BridgeName) -> RegistryResult<()>;
    async fn add_bridge_asset(&self, bridge: &BridgeName, pair: AssetPair) -> RegistryResult<()>;
    async fn remove_bridge_asset(&self, bridge: &BridgeName, pair: AssetPair) -> RegistryResult<()>;

    async fn register_dex(&self, name: DexName, id: PoolId, chain: ChainName) -> RegistryResult<()>;
    async fn unregister_dex(&self, name: &DexName) -> RegistryResult<()>;
    async fn add_dex_pair(&self, dex: &DexName, pair: DexPair) -> RegistryResult<()>;
    async fn remove_dex_pair(&self, dex: &DexName, pair: DexPair) -> RegistryResult<()>;

    async fn get_graph(&self) -> RegistryResult<Graph>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_codes_in_both_shapes() {
        assert_eq!(
            RegistryError::from_code(&json!("ChainNotFound")),
            RegistryError::ChainNotFound
        );
        assert_eq!(
            RegistryError::from_code(&json!({"AssetAlreadyRegistered": null})),
            RegistryError::AssetAlreadyRegistered
        );
        assert!(matches!(
            RegistryError::from_code(&json!("ExtractLocationFailed")),
            RegistryError::Rejected(_)
        ));
    }

    #[test]
    fn test_graph_errors_map_to_registry_codes() {
        let err: RegistryError = GraphError::UnknownBridge("Khala<>Ethereum".into()).into();
        assert_eq!(err, RegistryError::BridgeNotFound);

        let err: RegistryError = GraphError::DuplicatePair("UniswapV2".into()).into();
        assert_eq!(err, RegistryError::AssetAlreadyRegistered);
    }
}
