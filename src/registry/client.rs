use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, info};

use super::{RegistryApi, RegistryError, RegistryResult};
use crate::graph::{AssetInfo, AssetPair, ChainInfo, DexPair, Graph};
use crate::transport::ContractClient;
use crate::types::{BridgeName, ChainName, DexName, PoolId};

/// Remote registry contract. Holds no graph state of its own.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    contract: ContractClient,
}

impl RegistryClient {
    pub fn new(contract: ContractClient) -> Self {
        Self { contract }
    }

    async fn write(&self, method: &str, args: Value) -> RegistryResult<()> {
        let receipt = self
            .contract
            .transaction::<Value>(method, args)
            .await
            .map_err(RegistryError::from)?;
        debug!(method, tx = %receipt.tx_hash, block = ?receipt.block, "Registry transaction included");
        Ok(())
    }
}

#[async_trait]
impl RegistryApi for RegistryClient {
    async fn register_chain(&self, info: ChainInfo) -> RegistryResult<()> {
        info!("Registering chain {}", info.name);
        self.write("register_chain", json!([info])).await
    }

    async fn unregister_chain(&self, name: &ChainName) -> RegistryResult<()> {
        info!("Unregistering chain {}", name);
        self.write("unregister_chain", json!([name])).await
    }

    async fn register_asset(&self, chain: &ChainName, asset: AssetInfo) -> RegistryResult<()> {
        info!("Registering asset {} ({}) on {}", asset.symbol, asset.location, chain);
        self.write("register_asset", json!([chain, asset])).await
    }

    async fn unregister_asset(&self, chain: &ChainName, asset: AssetInfo) -> RegistryResult<()> {
        info!("Unregistering asset {} ({}) on {}", asset.symbol, asset.location, chain);
        self.write("unregister_asset", json!([chain, asset])).await
    }

    async fn set_chain_native(&self, chain: &ChainName, asset: AssetInfo) -> RegistryResult<()> {
        self.write("set_chain_native", json!([chain, asset])).await
    }

    async fn set_chain_stable(&self, chain: &ChainName, asset: AssetInfo) -> RegistryResult<()> {
        self.write("set_chain_stable", json!([chain, asset])).await
    }

    async fn set_chain_endpoint(&self, chain: &ChainName, endpoint: String) -> RegistryResult<()> {
        self.write("set_chain_endpoint", json!([chain, endpoint])).await
    }

    async fn register_bridge(
        &self,
        name: BridgeName,
        chain0: ChainName,
        chain1: ChainName,
    ) -> RegistryResult<()> {
        info!("Registering bridge {} between {} and {}", name, chain0, chain1);
        self.write("register_bridge", json!([name, chain0, chain1])).await
    }

    async fn unregister_bridge(&self, name: &BridgeName) -> RegistryResult<()> {
        self.write("unregister_bridge", json!([name])).await
    }

    async fn add_bridge_asset(&self, bridge: &BridgeName, pair: AssetPair) -> RegistryResult<()> {
        info!(
            "Adding {}/{} to bridge {}",
            pair.asset0.symbol, pair.asset1.symbol, bridge
        );
        self.write("add_bridge_asset", json!([bridge, pair])).await
    }

    async fn remove_bridge_asset(&self, bridge: &BridgeName, pair: AssetPair) -> RegistryResult<()> {
        self.write("remove_bridge_asset", json!([bridge, pair])).await
    }

    async fn register_dex(&self, name: DexName, id: PoolId, chain: ChainName) -> RegistryResult<()> {
        info!("Registering dex {} on {}", name, chain);
        self.write("register_dex", json!([name, id, chain])).await
    }

    async fn unregister_dex(&self, name: &DexName) -> RegistryResult<()> {
        self.write("unregister_dex", json!([name])).await
    }

    async fn add_dex_pair(&self, dex: &DexName, pair: DexPair) -> RegistryResult<()> {
        info!("Adding pair {} to dex {}", pair.id, dex);
        self.write("add_dex_pair", json!([dex, pair])).await
    }

    async fn remove_dex_pair(&self, dex: &DexName, pair: DexPair) -> RegistryResult<()> {
        self.write("remove_dex_pair", json!([dex, pair])).await
    }

    async fn get_graph(&self) -> RegistryResult<Graph> {
        self.contract
            .query::<Graph, Value>("get_graph", json!([]))
            .await
            .map_err(RegistryError::from)
    }
}
