use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

use super::{RegistryApi, RegistryResult};
use crate::graph::{AssetInfo, AssetPair, ChainInfo, DexPair, Graph, Topology};
use crate::types::{BridgeName, ChainName, DexName, PoolId};

/// Registry that keeps the topology in process, enforcing the same
/// invariants the contract does.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    topology: RwLock<Topology>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_topology(topology: Topology) -> Self {
        Self {
            topology: RwLock::new(topology),
        }
    }
}

#[async_trait]
impl RegistryApi for InMemoryRegistry {
    async fn register_chain(&self, info: ChainInfo) -> RegistryResult<()> {
        info!("Registering chain {} (in memory)", info.name);
        Ok(self.topology.write().await.add_chain(info)?)
    }

    async fn unregister_chain(&self, name: &ChainName) -> RegistryResult<()> {
        self.topology.write().await.remove_chain(name)?;
        Ok(())
    }

    async fn register_asset(&self, chain: &ChainName, asset: AssetInfo) -> RegistryResult<()> {
        Ok(self.topology.write().await.add_asset(chain, asset)?)
    }

    async fn unregister_asset(&self, chain: &ChainName, asset: AssetInfo) -> RegistryResult<()> {
        self.topology
            .write()
            .await
            .remove_asset(chain, &asset.location)?;
        Ok(())
    }

    async fn set_chain_native(&self, chain: &ChainName, asset: AssetInfo) -> RegistryResult<()> {
        Ok(self.topology.write().await.set_chain_native(chain, asset)?)
    }

    async fn set_chain_stable(&self, chain: &ChainName, asset: AssetInfo) -> RegistryResult<()> {
        Ok(self.topology.write().await.set_chain_stable(chain, asset)?)
    }

    async fn set_chain_endpoint(&self, chain: &ChainName, endpoint: String) -> RegistryResult<()> {
        Ok(self
            .topology
            .write()
            .await
            .set_chain_endpoint(chain, endpoint)?)
    }

    async fn register_bridge(
        &self,
        name: BridgeName,
        chain0: ChainName,
        chain1: ChainName,
    ) -> RegistryResult<()> {
        Ok(self.topology.write().await.add_bridge(name, chain0, chain1)?)
    }

    async fn unregister_bridge(&self, name: &BridgeName) -> RegistryResult<()> {
        self.topology.write().await.remove_bridge(name)?;
        Ok(())
    }

    async fn add_bridge_asset(&self, bridge: &BridgeName, pair: AssetPair) -> RegistryResult<()> {
        Ok(self.topology.write().await.add_bridge_pair(bridge, pair)?)
    }

    async fn remove_bridge_asset(&self, bridge: &BridgeName, pair: AssetPair) -> RegistryResult<()> {
        self.topology
            .write()
            .await
            .remove_bridge_pair(bridge, &pair)?;
        Ok(())
    }

    async fn register_dex(&self, name: DexName, id: PoolId, chain: ChainName) -> RegistryResult<()> {
        Ok(self.topology.write().await.add_dex(name, id, chain)?)
    }

    async fn unregister_dex(&self, name: &DexName) -> RegistryResult<()> {
        self.topology.write().await.remove_dex(name)?;
        Ok(())
    }

    async fn add_dex_pair(&self, dex: &DexName, pair: DexPair) -> RegistryResult<()> {
        Ok(self.topology.write().await.add_dex_pair(dex, pair)?)
    }

    async fn remove_dex_pair(&self, dex: &DexName, pair: DexPair) -> RegistryResult<()> {
        self.topology
            .write()
            .await
            .remove_dex_pair(dex, &pair.id)?;
        Ok(())
    }

    async fn get_graph(&self) -> RegistryResult<Graph> {
        Ok(self.topology.read().await.graph())
    }
}
