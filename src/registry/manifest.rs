use serde::Deserialize;
use tracing::info;

use super::{RegistryApi, RegistryResult};
use crate::graph::{AssetInfo, AssetPair, ChainInfo, DexPair};
use crate::types::{BridgeName, ChainName, DexName, PoolId};

/// A batch of registrations, applied in dependency order: chains, assets,
/// bridges with their pairs, then dexes with their pairs.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegistryManifest {
    pub chains: Vec<ChainInfo>,
    pub assets: Vec<ChainAsset>,
    pub bridges: Vec<BridgeEntry>,
    pub dexes: Vec<DexEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainAsset {
    pub chain: ChainName,
    #[serde(flatten)]
    pub asset: AssetInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BridgeEntry {
    pub name: BridgeName,
    pub chain0: ChainName,
    pub chain1: ChainName,
    #[serde(default)]
    pub pairs: Vec<AssetPair>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DexEntry {
    pub name: DexName,
    pub id: PoolId,
    pub chain: ChainName,
    #[serde(default)]
    pub pairs: Vec<DexPair>,
}

impl RegistryManifest {
    /// Stops at the first rejected call; earlier registrations stay.
    pub async fn apply(&self, registry: &dyn RegistryApi) -> RegistryResult<usize> {
        let mut calls = 0;

        for chain in &self.chains {
            registry.register_chain(chain.clone()).await?;
            calls += 1;
        }
        for entry in &self.assets {
            registry
                .register_asset(&entry.chain, entry.asset.clone())
                .await?;
            calls += 1;
        }
        for bridge in &self.bridges {
            registry
                .register_bridge(bridge.name.clone(), bridge.chain0.clone(), bridge.chain1.clone())
                .await?;
            calls += 1;
            for pair in &bridge.pairs {
                registry.add_bridge_asset(&bridge.name, pair.clone()).await?;
                calls += 1;
            }
        }
        for dex in &self.dexes {
            registry
                .register_dex(dex.name.clone(), dex.id.clone(), dex.chain.clone())
                .await?;
            calls += 1;
            for pair in &dex.pairs {
                registry.add_dex_pair(&dex.name, pair.clone()).await?;
                calls += 1;
            }
        }

        info!("Applied {} registry calls", calls);
        Ok(calls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{InMemoryRegistry, RegistryError};
    use serde_json::json;

    fn manifest() -> RegistryManifest {
        serde_json::from_value(json!({
            "chains": [
                {"name": "Ethereum", "chain_type": "Evm", "endpoint": "https://eth.example"},
                {"name": "Khala", "chain_type": "Sub", "endpoint": "wss://khala.example"}
            ],
            "assets": [
                {"chain": "Ethereum", "name": "Phala Token", "symbol": "PHA", "decimals": 18,
                 "location": "0x6c5ba91642f10282b576d91922ae6448c9d52f4e"},
                {"chain": "Khala", "name": "Phala Token", "symbol": "PHA", "decimals": 12,
                 "location": "0x010100511f"}
            ],
            "bridges": [
                {"name": "Khala<>Ethereum", "chain0": "Khala", "chain1": "Ethereum", "pairs": [
                    {"asset0": {"name": "Phala Token", "symbol": "PHA", "decimals": 12, "location": "0x010100511f"},
                     "asset1": {"name": "Phala Token", "symbol": "PHA", "decimals": 18,
                                "location": "0x6c5ba91642f10282b576d91922ae6448c9d52f4e"}}
                ]}
            ]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_apply_manifest() {
        let registry = InMemoryRegistry::new();
        let calls = manifest().apply(&registry).await.unwrap();
        assert_eq!(calls, 6);

        let graph = registry.get_graph().await.unwrap();
        assert_eq!(graph.assets.len(), 2);
        assert_eq!(graph.bridges.len(), 1);
        assert!(graph.pairs.is_empty());
    }

    #[tokio::test]
    async fn test_apply_stops_at_first_rejection() {
        let registry = InMemoryRegistry::new();
        manifest().apply(&registry).await.unwrap();

        let err = manifest().apply(&registry).await.unwrap_err();
        assert_eq!(err, RegistryError::ChainAlreadyRegistered);
    }
}
