// Core modules
pub mod config;
pub mod credentials;
pub mod executor;
pub mod graph;
pub mod handler;
pub mod keystore;
pub mod registry;
pub mod scheduler;
pub mod transport;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export key types
pub use config::{Config, SchedulerSettings};
pub use credentials::{CommandTokenProvider, CredentialError, CredentialProvider, StaticTokenProvider};
pub use executor::{AccountInfo, ExecutorApi, ExecutorError, ExecutorProxy, RunOutcome, RunningMode};
pub use graph::{AssetInfo, AssetPair, ChainInfo, ChainType, DexPair, Graph, GraphError, Topology};
pub use handler::{Deposit, HandlerApi, HandlerClient, HandlerError};
pub use keystore::{KeystoreClient, KeystoreError};
pub use registry::{InMemoryRegistry, RegistryApi, RegistryClient, RegistryError, RegistryManifest};
pub use scheduler::{EngineSettings, Scheduler, SchedulerError, SchedulerState, TickKind};
pub use transport::{ContractClient, TransientKind, TransportError};
