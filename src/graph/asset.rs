use serde::{Deserialize, Serialize};

use crate::types::Location;

/// Beyond general properties like `name`, `symbol` and `decimals`, a
/// `location` is needed to identify the asset across chains.
///
/// The location is opaque here: an ERC20 contract address on EVM chains,
/// an encoded multi-location on Substrate chains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetInfo {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub location: Location,
}

impl AssetInfo {
    pub fn new(
        name: impl Into<String>,
        symbol: impl Into<String>,
        decimals: u8,
        location: Location,
    ) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            decimals,
            location,
        }
    }

    /// Two records describe the same on-chain asset when their locations match.
    pub fn same_location(&self, other: &AssetInfo) -> bool {
        self.location == other.location
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_wire_format() {
        let json = r#"{
            "name": "Phala Token",
            "symbol": "PHA",
            "decimals": 12,
            "location": "0x010100511f"
        }"#;

        let asset: AssetInfo = serde_json::from_str(json).unwrap();
        assert_eq!(asset.symbol, "PHA");
        assert_eq!(asset.decimals, 12);
        assert_eq!(asset.location.as_bytes(), &[0x01, 0x01, 0x00, 0x51, 0x1f]);
    }

    #[test]
    fn test_same_location_ignores_metadata() {
        let loc = Location::from_hex("0x010100511f").unwrap();
        let a = AssetInfo::new("Phala Token", "PHA", 12, loc.clone());
        let b = AssetInfo::new("PHA (renamed)", "PHA", 18, loc);
        assert!(a.same_location(&b));
        assert_ne!(a, b);
    }
}
