//! NewType wrappers for strong typing throughout the control plane.
//!
//! These types prevent accidental mixing of semantically different strings
//! and byte blobs (e.g., passing a dex name where a bridge name is expected,
//! or a task id where an asset location is expected).

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Macro to generate a NewType wrapper with standard trait implementations.
macro_rules! newtype_string {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new instance.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Get the inner value as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner String.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

/// Macro to generate a byte-blob NewType that travels as `0x`-prefixed hex.
macro_rules! newtype_bytes {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
        pub struct $name(Vec<u8>);

        impl $name {
            /// Create a new instance from raw bytes.
            pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
                Self(bytes.into())
            }

            /// Parse from hex, with or without a `0x` prefix.
            pub fn from_hex(value: &str) -> Result<Self, hex::FromHexError> {
                let trimmed = value.strip_prefix("0x").unwrap_or(value);
                hex::decode(trimmed).map(Self)
            }

            /// Render as `0x`-prefixed lowercase hex.
            pub fn to_hex(&self) -> String {
                format!("0x{}", hex::encode(&self.0))
            }

            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl From<Vec<u8>> for $name {
            fn from(bytes: Vec<u8>) -> Self {
                Self(bytes)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                Self::from_hex(&raw).map_err(serde::de::Error::custom)
            }
        }

        impl std::str::FromStr for $name {
            type Err = hex::FromHexError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_hex(s)
            }
        }
    };
}

/// Name of a registered chain (e.g., "Ethereum", "Khala").
///
/// Chain names are the registry's primary key and are compared without
/// regard to ASCII case, so "moonbeam" and "Moonbeam" address the same
/// chain. The spelling given at construction is kept for display and for
/// the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainName(String);

impl ChainName {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercased form used for map keys and configuration lookups.
    pub fn normalized(&self) -> String {
        self.0.to_ascii_lowercase()
    }
}

impl PartialEq for ChainName {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for ChainName {}

impl Hash for ChainName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for byte in self.0.bytes() {
            state.write_u8(byte.to_ascii_lowercase());
        }
    }
}

impl From<&str> for ChainName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ChainName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for ChainName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

newtype_string!(
    /// On-chain identifier of a deployed contract (registry, executor,
    /// key store), as given in the configuration document.
    ContractId
);

newtype_string!(
    /// Worker account key as the executor knows it (sr25519 public key,
    /// `0x`-prefixed hex).
    WorkerId
);

newtype_string!(
    /// Registered bridge name (e.g., "Khala<>Ethereum").
    BridgeName
);

newtype_string!(
    /// Registered dex name (e.g., "UniswapV2").
    DexName
);

newtype_bytes!(
    /// Chain-specific asset location: a contract address on EVM chains, an
    /// encoded multi-location on Substrate chains. Opaque to this crate.
    Location
);

newtype_bytes!(
    /// Chain-scoped task identifier.
    TaskId
);

newtype_bytes!(
    /// Raw account key in one chain representation (32-byte Substrate
    /// public key or 20-byte EVM address).
    AccountId
);

newtype_bytes!(
    /// Dex or liquidity-pool identifier (pool address, or an encoded
    /// `lp://` path on Substrate dexes).
    PoolId
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_chain_name_ignores_case() {
        assert_eq!(ChainName::new("Moonbeam"), ChainName::new("moonbeam"));
        assert_ne!(ChainName::new("Moonbeam"), ChainName::new("Khala"));

        let mut set = HashSet::new();
        set.insert(ChainName::new("AstarEvm"));
        assert!(set.contains(&ChainName::new("astarevm")));
    }

    #[test]
    fn test_chain_name_keeps_spelling() {
        let name = ChainName::new("AstarEvm");
        assert_eq!(name.to_string(), "AstarEvm");
        assert_eq!(name.normalized(), "astarevm");
    }

    #[test]
    fn test_location_hex_prefix_optional() {
        let a = Location::from_hex("0x6c5ba91642f10282b576d91922ae6448c9d52f4e").unwrap();
        let b = Location::from_hex("6c5ba91642f10282b576d91922ae6448c9d52f4e").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_bytes().len(), 20);
        assert_eq!(a.to_hex(), "0x6c5ba91642f10282b576d91922ae6448c9d52f4e");
    }

    #[test]
    fn test_location_serde() {
        let loc = Location::new(vec![0x01, 0x01, 0x00, 0x51, 0x1f]);
        let json = serde_json::to_string(&loc).unwrap();
        assert_eq!(json, "\"0x010100511f\"");

        let parsed: Location = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, loc);
    }

    #[test]
    fn test_location_rejects_bad_hex() {
        assert!(Location::from_hex("0xzz").is_err());
        assert!(serde_json::from_str::<TaskId>("\"0x123\"").is_err());
    }

    #[test]
    fn test_worker_id_creation() {
        let id: WorkerId = "0x04dba0677fc274ff".into();
        assert_eq!(id.as_str(), "0x04dba0677fc274ff");
        assert_eq!(id.clone().into_inner(), "0x04dba0677fc274ff");
    }
}
