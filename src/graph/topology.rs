use serde::{Deserialize, Serialize};

use super::asset::AssetInfo;
use super::bridge::{AssetPair, Bridge};
use super::chain::{ChainInfo, ChainStore};
use super::dex::{Dex, DexPair};
use super::GraphError;
use crate::types::{BridgeName, ChainName, DexName, Location, PoolId};

/// Asset entry of the flattened graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetGraph {
    /// Chain the asset belongs to
    pub chain: ChainName,
    pub location: Location,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Trading pair entry of the flattened graph. Assets are referenced by
/// location on `chain`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingPairGraph {
    pub id: PoolId,
    pub asset0: Location,
    pub asset1: Location,
    pub dex: DexName,
    pub chain: ChainName,
}

/// Bridge entry of the flattened graph. Each asset tuple is
/// (location on `chain0`, location on `chain1`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeGraph {
    pub chain0: ChainName,
    pub chain1: ChainName,
    pub assets: Vec<(Location, Location)>,
}

/// Read-only projection of everything registered. Rebuilt on every fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graph {
    #[serde(default)]
    pub assets: Vec<AssetGraph>,
    #[serde(default)]
    pub pairs: Vec<TradingPairGraph>,
    #[serde(default)]
    pub bridges: Vec<BridgeGraph>,
}

impl Graph {
    pub fn asset(&self, chain: &ChainName, location: &Location) -> Option<&AssetGraph> {
        self.assets
            .iter()
            .find(|a| &a.chain == chain && &a.location == location)
    }

    pub fn assets_on<'a>(&'a self, chain: &'a ChainName) -> impl Iterator<Item = &'a AssetGraph> + 'a {
        self.assets.iter().filter(move |a| &a.chain == chain)
    }

    /// Bridges joining `a` and `b`, whichever way they were declared.
    pub fn bridges_between(&self, a: &ChainName, b: &ChainName) -> Vec<&BridgeGraph> {
        self.bridges
            .iter()
            .filter(|br| (&br.chain0 == a && &br.chain1 == b) || (&br.chain0 == b && &br.chain1 == a))
            .collect()
    }
}

/// Client-side mirror of the registry with checked constructors.
///
/// Entities keep registration order so that [`Topology::graph`] is
/// deterministic.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    chains: Vec<ChainStore>,
    bridges: Vec<Bridge>,
    dexes: Vec<Dex>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chain(&self, name: &ChainName) -> Option<&ChainInfo> {
        self.store(name).map(|s| &s.info)
    }

    pub fn chains(&self) -> impl Iterator<Item = &ChainInfo> {
        self.chains.iter().map(|s| &s.info)
    }

    pub fn assets_on(&self, chain: &ChainName) -> Option<&[AssetInfo]> {
        self.store(chain).map(|s| s.assets.as_slice())
    }

    pub fn bridge(&self, name: &BridgeName) -> Option<&Bridge> {
        self.bridges.iter().find(|b| &b.name == name)
    }

    pub fn dex(&self, name: &DexName) -> Option<&Dex> {
        self.dexes.iter().find(|d| &d.name == name)
    }

    // ----- chains -----

    pub fn add_chain(&mut self, info: ChainInfo) -> Result<(), GraphError> {
        if self.store(&info.name).is_some() {
            return Err(GraphError::DuplicateChain(info.name));
        }
        self.chains.push(ChainStore::new(info));
        Ok(())
    }

    /// Remove a chain along with every bridge and dex that references it.
    pub fn remove_chain(&mut self, name: &ChainName) -> Result<ChainInfo, GraphError> {
        let index = self
            .chains
            .iter()
            .position(|s| &s.info.name == name)
            .ok_or_else(|| GraphError::UnknownChain(name.clone()))?;
        let store = self.chains.remove(index);
        self.bridges
            .retain(|b| &b.chain0 != name && &b.chain1 != name);
        self.dexes.retain(|d| &d.chain != name);
        Ok(store.info)
    }

    pub fn set_chain_native(&mut self, chain: &ChainName, asset: AssetInfo) -> Result<(), GraphError> {
        self.store_mut(chain)?.set_native(asset);
        Ok(())
    }

    pub fn set_chain_stable(&mut self, chain: &ChainName, asset: AssetInfo) -> Result<(), GraphError> {
        self.store_mut(chain)?.set_stable(asset);
        Ok(())
    }

    pub fn set_chain_endpoint(&mut self, chain: &ChainName, endpoint: String) -> Result<(), GraphError> {
        self.store_mut(chain)?.set_endpoint(endpoint);
        Ok(())
    }

    // ----- assets -----

    /// Fails if `chain` is unknown or (chain, location) is already taken.
    pub fn validate_asset(&self, chain: &ChainName, asset: &AssetInfo) -> Result<(), GraphError> {
        let store = self
            .store(chain)
            .ok_or_else(|| GraphError::UnknownChain(chain.clone()))?;
        if store.contains(&asset.location) {
            return Err(GraphError::DuplicateAsset {
                chain: chain.clone(),
                location: asset.location.clone(),
            });
        }
        Ok(())
    }

    pub fn add_asset(&mut self, chain: &ChainName, asset: AssetInfo) -> Result<(), GraphError> {
        self.validate_asset(chain, &asset)?;
        self.store_mut(chain)?.register(asset)
    }

    /// Remove an asset and every bridge or dex pair that referenced it.
    pub fn remove_asset(&mut self, chain: &ChainName, location: &Location) -> Result<AssetInfo, GraphError> {
        let removed = self.store_mut(chain)?.unregister(location)?;

        for bridge in self.bridges.iter_mut() {
            if &bridge.chain0 == chain {
                bridge.assets.retain(|p| &p.asset0.location != location);
            }
            if &bridge.chain1 == chain {
                bridge.assets.retain(|p| &p.asset1.location != location);
            }
        }
        for dex in self.dexes.iter_mut().filter(|d| &d.chain == chain) {
            dex.pairs
                .retain(|p| &p.asset0.location != location && &p.asset1.location != location);
        }
        Ok(removed)
    }

    // ----- bridges -----

    pub fn add_bridge(
        &mut self,
        name: BridgeName,
        chain0: ChainName,
        chain1: ChainName,
    ) -> Result<(), GraphError> {
        if self.bridge(&name).is_some() {
            return Err(GraphError::DuplicateBridge(name));
        }
        for chain in [&chain0, &chain1] {
            if self.store(chain).is_none() {
                return Err(GraphError::UnknownChain(chain.clone()));
            }
        }
        self.bridges.push(Bridge::new(name, chain0, chain1));
        Ok(())
    }

    pub fn remove_bridge(&mut self, name: &BridgeName) -> Result<Bridge, GraphError> {
        let index = self
            .bridges
            .iter()
            .position(|b| &b.name == name)
            .ok_or_else(|| GraphError::UnknownBridge(name.clone()))?;
        Ok(self.bridges.remove(index))
    }

    /// Both sides of `pair` must already be registered: `asset0` on the
    /// bridge's `chain0`, `asset1` on its `chain1`.
    pub fn validate_bridge(&self, bridge: &BridgeName, pair: &AssetPair) -> Result<(), GraphError> {
        let bridge = self
            .bridge(bridge)
            .ok_or_else(|| GraphError::UnknownBridge(bridge.clone()))?;
        self.ensure_registered(&bridge.chain0, &pair.asset0)?;
        self.ensure_registered(&bridge.chain1, &pair.asset1)
    }

    pub fn add_bridge_pair(&mut self, bridge: &BridgeName, pair: AssetPair) -> Result<(), GraphError> {
        self.validate_bridge(bridge, &pair)?;
        self.bridge_mut(bridge)?.register(pair)
    }

    pub fn remove_bridge_pair(&mut self, bridge: &BridgeName, pair: &AssetPair) -> Result<AssetPair, GraphError> {
        self.bridge_mut(bridge)?.unregister(pair)
    }

    // ----- dexes -----

    pub fn add_dex(&mut self, name: DexName, id: PoolId, chain: ChainName) -> Result<(), GraphError> {
        if self.dex(&name).is_some() {
            return Err(GraphError::DuplicateDex(name));
        }
        if self.store(&chain).is_none() {
            return Err(GraphError::UnknownChain(chain));
        }
        self.dexes.push(Dex::new(name, id, chain));
        Ok(())
    }

    pub fn remove_dex(&mut self, name: &DexName) -> Result<Dex, GraphError> {
        let index = self
            .dexes
            .iter()
            .position(|d| &d.name == name)
            .ok_or_else(|| GraphError::UnknownDex(name.clone()))?;
        Ok(self.dexes.remove(index))
    }

    /// Both assets of `pair` must be registered on the dex's chain.
    pub fn validate_dex_pair(&self, dex: &DexName, pair: &DexPair) -> Result<(), GraphError> {
        let dex = self
            .dex(dex)
            .ok_or_else(|| GraphError::UnknownDex(dex.clone()))?;
        self.ensure_registered(&dex.chain, &pair.asset0)?;
        self.ensure_registered(&dex.chain, &pair.asset1)
    }

    pub fn add_dex_pair(&mut self, dex: &DexName, pair: DexPair) -> Result<(), GraphError> {
        self.validate_dex_pair(dex, &pair)?;
        self.dex_mut(dex)?.register(pair)
    }

    pub fn remove_dex_pair(&mut self, dex: &DexName, id: &PoolId) -> Result<DexPair, GraphError> {
        self.dex_mut(dex)?.unregister(id)
    }

    /// Flatten into the projection the registry serves.
    pub fn graph(&self) -> Graph {
        let assets = self
            .chains
            .iter()
            .flat_map(|store| {
                store.assets.iter().map(move |a| AssetGraph {
                    chain: store.info.name.clone(),
                    location: a.location.clone(),
                    name: a.name.clone(),
                    symbol: a.symbol.clone(),
                    decimals: a.decimals,
                })
            })
            .collect();

        let pairs = self
            .dexes
            .iter()
            .flat_map(|dex| {
                dex.pairs.iter().map(move |p| TradingPairGraph {
                    id: p.id.clone(),
                    asset0: p.asset0.location.clone(),
                    asset1: p.asset1.location.clone(),
                    dex: dex.name.clone(),
                    chain: dex.chain.clone(),
                })
            })
            .collect();

        let bridges = self
            .bridges
            .iter()
            .map(|b| BridgeGraph {
                chain0: b.chain0.clone(),
                chain1: b.chain1.clone(),
                assets: b
                    .assets
                    .iter()
                    .map(|p| (p.asset0.location.clone(), p.asset1.location.clone()))
                    .collect(),
            })
            .collect();

        Graph {
            assets,
            pairs,
            bridges,
        }
    }

    fn ensure_registered(&self, chain: &ChainName, asset: &AssetInfo) -> Result<(), GraphError> {
        match self.store(chain) {
            Some(store) if store.contains(&asset.location) => Ok(()),
            _ => Err(GraphError::UnknownAsset {
                chain: chain.clone(),
                location: asset.location.clone(),
            }),
        }
    }

    fn store(&self, name: &ChainName) -> Option<&ChainStore> {
        self.chains.iter().find(|s| &s.info.name == name)
    }

    fn store_mut(&mut self, name: &ChainName) -> Result<&mut ChainStore, GraphError> {
        self.chains
            .iter_mut()
            .find(|s| &s.info.name == name)
            .ok_or_else(|| GraphError::UnknownChain(name.clone()))
    }

    fn bridge_mut(&mut self, name: &BridgeName) -> Result<&mut Bridge, GraphError> {
        self.bridges
            .iter_mut()
            .find(|b| &b.name == name)
            .ok_or_else(|| GraphError::UnknownBridge(name.clone()))
    }

    fn dex_mut(&mut self, name: &DexName) -> Result<&mut Dex, GraphError> {
        self.dexes
            .iter_mut()
            .find(|d| &d.name == name)
            .ok_or_else(|| GraphError::UnknownDex(name.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ChainType;

    fn loc(hex: &str) -> Location {
        Location::from_hex(hex).unwrap()
    }

    fn pha_ethereum() -> AssetInfo {
        AssetInfo::new("Phala Token", "PHA", 18, loc("0x6c5ba91642f10282b576d91922ae6448c9d52f4e"))
    }

    fn weth_ethereum() -> AssetInfo {
        AssetInfo::new("Wrapped Ether", "WETH", 18, loc("0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2"))
    }

    fn pha_khala() -> AssetInfo {
        AssetInfo::new("Phala Token", "PHA", 12, loc("0x010100511f"))
    }

    fn two_chains() -> Topology {
        let mut topology = Topology::new();
        topology
            .add_chain(ChainInfo::new("Ethereum", ChainType::Evm, "https://eth.example"))
            .unwrap();
        topology
            .add_chain(ChainInfo::new("Khala", ChainType::Sub, "wss://khala.example"))
            .unwrap();
        topology
    }

    #[test]
    fn test_duplicate_chain_rejected_case_insensitively() {
        let mut topology = two_chains();
        let err = topology
            .add_chain(ChainInfo::new("ETHEREUM", ChainType::Evm, "https://other"))
            .unwrap_err();
        assert!(matches!(err, GraphError::DuplicateChain(_)));
        assert_eq!(topology.chains().count(), 2);
    }

    #[test]
    fn test_duplicate_asset_leaves_one_record() {
        let mut topology = two_chains();
        let ethereum = ChainName::new("Ethereum");
        topology.add_asset(&ethereum, pha_ethereum()).unwrap();

        let err = topology.add_asset(&ethereum, pha_ethereum()).unwrap_err();
        assert!(matches!(err, GraphError::DuplicateAsset { .. }));

        let graph = topology.graph();
        let matching = graph
            .assets
            .iter()
            .filter(|a| a.chain == ethereum && a.location == pha_ethereum().location)
            .count();
        assert_eq!(matching, 1);
    }

    #[test]
    fn test_same_location_on_different_chains_is_allowed() {
        let mut topology = two_chains();
        topology
            .add_chain(ChainInfo::new("Karura", ChainType::Sub, "wss://karura.example"))
            .unwrap();
        topology.add_asset(&"Khala".into(), pha_khala()).unwrap();
        topology.add_asset(&"Karura".into(), pha_khala()).unwrap();
        assert_eq!(topology.graph().assets.len(), 2);
    }

    #[test]
    fn test_asset_on_unknown_chain() {
        let topology = two_chains();
        let err = topology
            .validate_asset(&"Acala".into(), &pha_khala())
            .unwrap_err();
        assert_eq!(err, GraphError::UnknownChain("Acala".into()));
    }

    #[test]
    fn test_bridge_pair_requires_both_assets() {
        let bridge = BridgeName::new("Khala<>Ethereum");
        let pair = AssetPair::new(pha_khala(), pha_ethereum());

        // neither side registered
        let mut topology = two_chains();
        topology
            .add_bridge(bridge.clone(), "Khala".into(), "Ethereum".into())
            .unwrap();
        assert!(matches!(
            topology.add_bridge_pair(&bridge, pair.clone()),
            Err(GraphError::UnknownAsset { .. })
        ));

        // only one side registered
        topology.add_asset(&"Khala".into(), pha_khala()).unwrap();
        let err = topology.add_bridge_pair(&bridge, pair.clone()).unwrap_err();
        assert_eq!(
            err,
            GraphError::UnknownAsset {
                chain: "Ethereum".into(),
                location: pha_ethereum().location,
            }
        );

        // both registered
        topology.add_asset(&"Ethereum".into(), pha_ethereum()).unwrap();
        topology.add_bridge_pair(&bridge, pair).unwrap();
        assert_eq!(topology.bridge(&bridge).unwrap().assets.len(), 1);
    }

    #[test]
    fn test_bridge_pair_sides_follow_declared_chains() {
        let mut topology = two_chains();
        topology.add_asset(&"Khala".into(), pha_khala()).unwrap();
        topology.add_asset(&"Ethereum".into(), pha_ethereum()).unwrap();
        let bridge = BridgeName::new("Khala<>Ethereum");
        topology
            .add_bridge(bridge.clone(), "Khala".into(), "Ethereum".into())
            .unwrap();

        // asset0 must live on chain0 (Khala), so the swapped pair is rejected
        let swapped = AssetPair::new(pha_ethereum(), pha_khala());
        assert!(matches!(
            topology.validate_bridge(&bridge, &swapped),
            Err(GraphError::UnknownAsset { .. })
        ));
    }

    #[test]
    fn test_dex_pair_scoped_to_dex_chain() {
        let mut topology = two_chains();
        topology.add_asset(&"Ethereum".into(), pha_ethereum()).unwrap();
        topology.add_asset(&"Khala".into(), pha_khala()).unwrap();
        let dex = DexName::new("UniswapV2");
        topology
            .add_dex(dex.clone(), PoolId::new(vec![0x01]), "Ethereum".into())
            .unwrap();

        let pool = PoolId::from_hex("0x8867f20c1c63baccec7617626254a060eeb0e61e").unwrap();

        // WETH not registered yet
        let pair = DexPair::new(pool.clone(), pha_ethereum(), weth_ethereum());
        assert!(matches!(
            topology.validate_dex_pair(&dex, &pair),
            Err(GraphError::UnknownAsset { .. })
        ));

        // Khala PHA is registered, but not on Ethereum
        let cross = DexPair::new(pool.clone(), pha_ethereum(), pha_khala());
        assert!(matches!(
            topology.add_dex_pair(&dex, cross),
            Err(GraphError::UnknownAsset { .. })
        ));

        topology.add_asset(&"Ethereum".into(), weth_ethereum()).unwrap();
        topology.add_dex_pair(&dex, pair).unwrap();

        let graph = topology.graph();
        assert_eq!(graph.pairs.len(), 1);
        assert_eq!(graph.pairs[0].chain, ChainName::new("Ethereum"));
        assert_eq!(graph.pairs[0].asset1, weth_ethereum().location);
    }

    #[test]
    fn test_remove_asset_drops_referencing_pairs() {
        let mut topology = two_chains();
        topology.add_asset(&"Khala".into(), pha_khala()).unwrap();
        topology.add_asset(&"Ethereum".into(), pha_ethereum()).unwrap();
        let bridge = BridgeName::new("Khala<>Ethereum");
        topology
            .add_bridge(bridge.clone(), "Khala".into(), "Ethereum".into())
            .unwrap();
        topology
            .add_bridge_pair(&bridge, AssetPair::new(pha_khala(), pha_ethereum()))
            .unwrap();

        topology
            .remove_asset(&"Ethereum".into(), &pha_ethereum().location)
            .unwrap();
        assert!(topology.bridge(&bridge).unwrap().assets.is_empty());
    }

    #[test]
    fn test_remove_chain_cascades() {
        let mut topology = two_chains();
        topology
            .add_bridge("Khala<>Ethereum".into(), "Khala".into(), "Ethereum".into())
            .unwrap();
        topology
            .add_dex("UniswapV2".into(), PoolId::new(vec![1]), "Ethereum".into())
            .unwrap();

        topology.remove_chain(&"ethereum".into()).unwrap();
        assert!(topology.bridge(&"Khala<>Ethereum".into()).is_none());
        assert!(topology.dex(&"UniswapV2".into()).is_none());
        assert!(matches!(
            topology.remove_chain(&"Ethereum".into()),
            Err(GraphError::UnknownChain(_))
        ));
    }

    #[test]
    fn test_graph_is_deterministic() {
        let mut topology = two_chains();
        topology.add_asset(&"Khala".into(), pha_khala()).unwrap();
        topology.add_asset(&"Ethereum".into(), pha_ethereum()).unwrap();
        assert_eq!(topology.graph(), topology.graph());
    }

    #[test]
    fn test_graph_bridges_between_is_symmetric() {
        let mut topology = two_chains();
        topology
            .add_bridge("Khala<>Ethereum".into(), "Khala".into(), "Ethereum".into())
            .unwrap();
        let graph = topology.graph();
        assert_eq!(graph.bridges_between(&"Ethereum".into(), &"Khala".into()).len(), 1);
        assert_eq!(graph.bridges_between(&"Khala".into(), &"Ethereum".into()).len(), 1);
    }
}
