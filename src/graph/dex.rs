use serde::{Deserialize, Serialize};

use super::GraphError;
use super::asset::AssetInfo;
use crate::types::{ChainName, DexName, PoolId};

/// A liquidity pool on a dex. Fees are in basis points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DexPair {
    pub id: PoolId,
    pub asset0: AssetInfo,
    pub asset1: AssetInfo,
    #[serde(default)]
    pub swap_fee: u32,
    #[serde(default)]
    pub dev_fee: u32,
}

impl DexPair {
    pub fn new(id: PoolId, asset0: AssetInfo, asset1: AssetInfo) -> Self {
        Self {
            id,
            asset0,
            asset1,
            swap_fee: 0,
            dev_fee: 0,
        }
    }

    pub fn with_fees(mut self, swap_fee: u32, dev_fee: u32) -> Self {
        self.swap_fee = swap_fee;
        self.dev_fee = dev_fee;
        self
    }
}

/// A named collection of pairs, all on one chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dex {
    pub name: DexName,
    pub id: PoolId,
    pub chain: ChainName,
    pub pairs: Vec<DexPair>,
}

impl Dex {
    pub fn new(name: DexName, id: PoolId, chain: ChainName) -> Self {
        Self {
            name,
            id,
            chain,
            pairs: Vec::new(),
        }
    }

    pub fn register(&mut self, pair: DexPair) -> Result<(), GraphError> {
        if self.pairs.iter().any(|p| p.id == pair.id) {
            return Err(GraphError::DuplicatePair(self.name.to_string()));
        }
        self.pairs.push(pair);
        Ok(())
    }

    pub fn unregister(&mut self, id: &PoolId) -> Result<DexPair, GraphError> {
        let index = self
            .pairs
            .iter()
            .position(|p| &p.id == id)
            .ok_or_else(|| GraphError::UnknownPair(self.name.to_string()))?;
        Ok(self.pairs.remove(index))
    }
}
