use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::GraphError;
use super::asset::AssetInfo;
use crate::types::{BridgeName, ChainName, Location};

/// One asset movable over a bridge: `asset0` lives on the bridge's `chain0`,
/// `asset1` on `chain1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetPair {
    pub asset0: AssetInfo,
    pub asset1: AssetInfo,
}

impl AssetPair {
    pub fn new(asset0: AssetInfo, asset1: AssetInfo) -> Self {
        Self { asset0, asset1 }
    }

    /// Identity of the pair, independent of the declared direction.
    pub fn id(&self) -> [u8; 32] {
        let (a, b) = (self.asset0.location.as_bytes(), self.asset1.location.as_bytes());
        let (first, second) = if a <= b { (a, b) } else { (b, a) };

        let mut hasher = Sha256::new();
        hasher.update((first.len() as u32).to_le_bytes());
        hasher.update(first);
        hasher.update(second);
        hasher.finalize().into()
    }

    /// Return the other side of the pair if `location` is one of its sides.
    pub fn counterpart(&self, location: &Location) -> Option<&AssetInfo> {
        if &self.asset0.location == location {
            Some(&self.asset1)
        } else if &self.asset1.location == location {
            Some(&self.asset0)
        } else {
            None
        }
    }
}

/// A named cross-chain edge. Pairs are stored as declared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bridge {
    pub name: BridgeName,
    pub chain0: ChainName,
    pub chain1: ChainName,
    pub assets: Vec<AssetPair>,
}

impl Bridge {
    pub fn new(name: BridgeName, chain0: ChainName, chain1: ChainName) -> Self {
        Bridge {
            name,
            chain0,
            chain1,
            assets: Vec::new(),
        }
    }

    /// True if this bridge joins `a` and `b`, in either direction.
    pub fn connects(&self, a: &ChainName, b: &ChainName) -> bool {
        (&self.chain0 == a && &self.chain1 == b) || (&self.chain0 == b && &self.chain1 == a)
    }

    pub fn register(&mut self, pair: AssetPair) -> Result<(), GraphError> {
        let id = pair.id();
        if self.assets.iter().any(|p| p.id() == id) {
            return Err(GraphError::DuplicatePair(self.name.to_string()));
        }
        self.assets.push(pair);
        Ok(())
    }

    pub fn unregister(&mut self, pair: &AssetPair) -> Result<AssetPair, GraphError> {
        let id = pair.id();
        let index = self
            .assets
            .iter()
            .position(|p| p.id() == id)
            .ok_or_else(|| GraphError::UnknownPair(self.name.to_string()))?;
        Ok(self.assets.remove(index))
    }

    /// Find the pair that carries the asset at `location`, whichever side it is on.
    pub fn pair_for(&self, location: &Location) -> Option<&AssetPair> {
        self.assets
            .iter()
            .find(|p| p.counterpart(location).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pha(loc: &str, decimals: u8) -> AssetInfo {
        AssetInfo::new("Phala Token", "PHA", decimals, Location::from_hex(loc).unwrap())
    }

    fn khala_ethereum() -> Bridge {
        Bridge::new("Khala<>Ethereum".into(), "Khala".into(), "Ethereum".into())
    }

    #[test]
    fn test_pair_id_is_direction_independent() {
        let forward = AssetPair::new(pha("0x010100511f", 12), pha("0x6c5b", 18));
        let backward = AssetPair::new(pha("0x6c5b", 18), pha("0x010100511f", 12));
        assert_eq!(forward.id(), backward.id());
    }

    #[test]
    fn test_reverse_pair_is_a_duplicate() {
        let mut bridge = khala_ethereum();
        bridge
            .register(AssetPair::new(pha("0x010100511f", 12), pha("0x6c5b", 18)))
            .unwrap();
        let err = bridge
            .register(AssetPair::new(pha("0x6c5b", 18), pha("0x010100511f", 12)))
            .unwrap_err();
        assert_eq!(err, GraphError::DuplicatePair("Khala<>Ethereum".to_string()));
        assert_eq!(bridge.assets.len(), 1);
    }

    #[test]
    fn test_lookup_is_symmetric() {
        let mut bridge = khala_ethereum();
        let pair = AssetPair::new(pha("0x010100511f", 12), pha("0x6c5b", 18));
        bridge.register(pair.clone()).unwrap();

        assert!(bridge.connects(&"ethereum".into(), &"khala".into()));
        assert!(bridge.connects(&"Khala".into(), &"Ethereum".into()));
        assert!(!bridge.connects(&"Khala".into(), &"Karura".into()));

        let from_eth = Location::from_hex("0x6c5b").unwrap();
        let found = bridge.pair_for(&from_eth).unwrap();
        assert_eq!(found, &pair);
        assert_eq!(found.counterpart(&from_eth).unwrap().decimals, 12);
    }

    #[test]
    fn test_unregister_missing_pair() {
        let mut bridge = khala_ethereum();
        let pair = AssetPair::new(pha("0x01", 12), pha("0x02", 18));
        assert!(matches!(bridge.unregister(&pair), Err(GraphError::UnknownPair(_))));
    }
}
