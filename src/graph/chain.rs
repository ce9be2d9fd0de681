use serde::{Deserialize, Serialize};

use super::GraphError;
use super::asset::AssetInfo;
use crate::types::{ChainName, Location};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChainType {
    Evm,
    Sub,
}

impl ChainType {
    /// Fallback classification by well-known chain name, used when the
    /// configuration does not say.
    pub fn infer(chain: &ChainName) -> Option<Self> {
        match chain.normalized().as_str() {
            "ethereum" | "goerli" | "moonbeam" | "astarevm" => Some(ChainType::Evm),
            "astar" | "poc3" | "poc5" | "khala" | "phala" | "acala" | "karura" => {
                Some(ChainType::Sub)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainInfo {
    pub name: ChainName,
    pub chain_type: ChainType,
    #[serde(default)]
    pub native: Option<AssetInfo>,
    #[serde(default)]
    pub stable: Option<AssetInfo>,
    pub endpoint: String,
    #[serde(default)]
    pub network: Option<u8>,
}

impl ChainInfo {
    pub fn new(name: impl Into<ChainName>, chain_type: ChainType, endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            chain_type,
            native: None,
            stable: None,
            endpoint: endpoint.into(),
            network: None,
        }
    }
}

/// A registered chain together with the assets registered on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ChainStore {
    pub info: ChainInfo,
    pub assets: Vec<AssetInfo>,
}

impl ChainStore {
    /// Native and stable assets given at registration count as registered.
    pub fn new(info: ChainInfo) -> Self {
        let mut assets: Vec<AssetInfo> = Vec::new();
        if let Some(ref stable) = info.stable {
            assets.push(stable.clone());
        }
        if let Some(ref native) = info.native {
            if !assets.iter().any(|a| a.same_location(native)) {
                assets.push(native.clone());
            }
        }
        ChainStore { info, assets }
    }

    pub fn set_native(&mut self, native: AssetInfo) {
        self.adopt(&native);
        self.info.native = Some(native);
    }

    pub fn set_stable(&mut self, stable: AssetInfo) {
        self.adopt(&stable);
        self.info.stable = Some(stable);
    }

    pub fn set_endpoint(&mut self, endpoint: String) {
        self.info.endpoint = endpoint;
    }

    pub fn contains(&self, location: &Location) -> bool {
        self.assets.iter().any(|a| &a.location == location)
    }

    pub fn register(&mut self, asset: AssetInfo) -> Result<(), GraphError> {
        if self.contains(&asset.location) {
            return Err(GraphError::DuplicateAsset {
                chain: self.info.name.clone(),
                location: asset.location,
            });
        }
        self.assets.push(asset);
        Ok(())
    }

    pub fn unregister(&mut self, location: &Location) -> Result<AssetInfo, GraphError> {
        let index = self
            .assets
            .iter()
            .position(|a| &a.location == location)
            .ok_or_else(|| GraphError::UnknownAsset {
                chain: self.info.name.clone(),
                location: location.clone(),
            })?;
        Ok(self.assets.remove(index))
    }

    fn adopt(&mut self, asset: &AssetInfo) {
        if !self.contains(&asset.location) {
            self.assets.push(asset.clone());
        }
    }
}
