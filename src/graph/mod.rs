//! Cross-chain venue topology: chains, assets, bridges and dexes.
//!
//! The authoritative copy of this graph lives in the remote registry. The
//! types here are the client-side mirror: value records, the flattened
//! [`Graph`] projection the registry returns, and a [`Topology`] that checks
//! referential invariants before anything is inserted.

mod asset;
mod bridge;
mod chain;
mod dex;
mod topology;

pub use asset::AssetInfo;
pub use bridge::{AssetPair, Bridge};
pub use chain::{ChainInfo, ChainType};
pub use dex::{Dex, DexPair};
pub use topology::{AssetGraph, BridgeGraph, Graph, Topology, TradingPairGraph};

use crate::types::{BridgeName, ChainName, DexName, Location};
use thiserror::Error;

/// Referential invariant violations, reported synchronously and never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("chain {0} is already registered")]
    DuplicateChain(ChainName),

    #[error("chain {0} is not registered")]
    UnknownChain(ChainName),

    #[error("asset {location} is already registered on {chain}")]
    DuplicateAsset { chain: ChainName, location: Location },

    #[error("asset {location} is not registered on {chain}")]
    UnknownAsset { chain: ChainName, location: Location },

    #[error("bridge {0} is already registered")]
    DuplicateBridge(BridgeName),

    #[error("bridge {0} is not registered")]
    UnknownBridge(BridgeName),

    #[error("dex {0} is already registered")]
    DuplicateDex(DexName),

    #[error("dex {0} is not registered")]
    UnknownDex(DexName),

    #[error("pair already present on {0}")]
    DuplicatePair(String),

    #[error("pair not present on {0}")]
    UnknownPair(String),
}
