use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use index_orchestrator::{
    AssetInfo, AssetPair, ChainInfo, CommandTokenProvider, Config, ContractClient, Deposit,
    DexPair, EngineSettings, ExecutorApi, ExecutorProxy, HandlerApi, HandlerClient,
    InMemoryRegistry, KeystoreClient, RegistryApi, RegistryClient, RegistryManifest, Scheduler,
    types::{BridgeName, ChainName, ContractId, DexName, Location, PoolId, TaskId, WorkerId},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::ChronoUtc;

#[derive(Parser)]
#[command(name = "index-orchestrator")]
#[command(about = "Control plane for the cross-chain index executor")]
struct Cli {
    /// Configuration document with contract ids and chain endpoints
    #[arg(long, global = true, env = "INDEX_CONFIG")]
    config: Option<PathBuf>,
    /// Signing account the node gateway uses for calls
    #[arg(long, global = true, env = "INDEX_SIGNER")]
    signer: Option<String>,
    /// Base URL of the executor's storage backend
    #[arg(long, global = true, env = "STORAGE_URL")]
    storage_url: Option<String>,
    /// Access token of the storage backend
    #[arg(long, global = true, env = "STORAGE_KEY", hide_env_values = true)]
    storage_key: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the periodic fetch/execute/token-refresh loop (never returns on success)
    #[command(subcommand)]
    Scheduler(SchedulerCommand),
    /// Configure and inspect the executor contract
    #[command(subcommand)]
    Executor(ExecutorCommand),
    /// Key store administration
    #[command(subcommand)]
    Keystore(KeystoreCommand),
    /// Worker account management
    #[command(subcommand)]
    Worker(WorkerCommand),
    /// Chain, asset, bridge and dex registration
    #[command(subcommand)]
    Registry(RegistryCommand),
    /// Handler contracts on EVM chains
    #[command(subcommand)]
    Handler(HandlerCommand),
}

#[derive(Subcommand)]
enum SchedulerCommand {
    Run {
        /// Fetch interval in milliseconds
        #[arg(long)]
        fetch_interval: Option<u64>,
        /// Execute interval in milliseconds
        #[arg(long)]
        execute_interval: Option<u64>,
        /// Storage token refresh interval in milliseconds
        #[arg(long)]
        token_update_interval: Option<u64>,
    },
}

#[derive(Subcommand)]
enum ExecutorCommand {
    /// Point the executor at storage and the key store
    Setup {
        /// Also resume the executor
        #[arg(long, default_value_t = false)]
        resume: bool,
    },
    Resume,
    Status,
}

#[derive(Subcommand)]
enum KeystoreCommand {
    /// Allow the configured executor to import worker keys
    SetExecutor,
}

#[derive(Subcommand)]
enum WorkerCommand {
    List {
        /// Only show this worker (sr25519 public key)
        #[arg(long)]
        worker: Option<WorkerId>,
    },
    /// Approve an ERC20 allowance from a worker account
    Approve {
        #[arg(long)]
        worker: WorkerId,
        #[arg(long)]
        chain: ChainName,
        #[arg(long)]
        token: Location,
        #[arg(long)]
        spender: Location,
        #[arg(long)]
        amount: u128,
    },
    /// Drop a task that has not been claimed from the handler
    DropTask {
        #[arg(long)]
        worker: WorkerId,
        #[arg(long)]
        chain: ChainName,
        #[arg(long)]
        id: TaskId,
    },
}

#[derive(Subcommand)]
enum RegistryCommand {
    /// Print the registered graph as JSON
    Graph,
    /// Register everything in a manifest file
    Apply {
        manifest: PathBuf,
        /// Apply against an empty in-process registry and print the result
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// ChainInfo as JSON
    RegisterChain { info: String },
    UnregisterChain { name: ChainName },
    /// AssetInfo as JSON
    RegisterAsset {
        #[arg(long)]
        chain: ChainName,
        asset: String,
    },
    UnregisterAsset {
        #[arg(long)]
        chain: ChainName,
        asset: String,
    },
    SetNative {
        #[arg(long)]
        chain: ChainName,
        asset: String,
    },
    SetStable {
        #[arg(long)]
        chain: ChainName,
        asset: String,
    },
    SetEndpoint {
        #[arg(long)]
        chain: ChainName,
        endpoint: String,
    },
    RegisterBridge {
        #[arg(long)]
        name: BridgeName,
        #[arg(long)]
        chain0: ChainName,
        #[arg(long)]
        chain1: ChainName,
    },
    UnregisterBridge { name: BridgeName },
    /// AssetPair as JSON
    AddBridgeAsset {
        #[arg(long)]
        bridge: BridgeName,
        pair: String,
    },
    RemoveBridgeAsset {
        #[arg(long)]
        bridge: BridgeName,
        pair: String,
    },
    RegisterDex {
        #[arg(long)]
        name: DexName,
        #[arg(long)]
        id: PoolId,
        #[arg(long)]
        chain: ChainName,
    },
    UnregisterDex { name: DexName },
    /// DexPair as JSON
    AddDexPair {
        #[arg(long)]
        dex: DexName,
        pair: String,
    },
    RemoveDexPair {
        #[arg(long)]
        dex: DexName,
        pair: String,
    },
}

#[derive(Subcommand)]
enum HandlerCommand {
    /// Whitelist a worker on the chain's handler
    SetWorker {
        #[arg(long)]
        chain: ChainName,
        #[arg(long)]
        worker: Location,
    },
    /// Deposit a task on the chain's handler
    Deposit {
        #[arg(long)]
        chain: ChainName,
        #[arg(long)]
        asset: Location,
        #[arg(long)]
        amount: u128,
        #[arg(long)]
        recipient: Location,
        #[arg(long)]
        worker: Location,
        #[arg(long)]
        id: TaskId,
        #[arg(long)]
        data: Location,
    },
}

/// Loaded configuration plus the account calls are made as.
struct Env {
    config: Config,
    signer: String,
}

impl Env {
    fn load(path: Option<&Path>, signer: Option<String>) -> Result<Self> {
        let config = Config::load(path)?;
        let signer = signer
            .or_else(|| config.signer.clone())
            .unwrap_or_else(|| "//Alice".to_string());
        Ok(Self { config, signer })
    }

    fn contract(&self, id: &ContractId) -> Result<ContractClient> {
        Ok(ContractClient::new(
            &self.config.node_endpoint,
            id.clone(),
            self.signer.clone(),
        )?)
    }

    fn executor(&self) -> Result<ExecutorProxy> {
        Ok(ExecutorProxy::new(self.contract(&self.config.executor_contract_id)?))
    }

    fn registry(&self) -> Result<RegistryClient> {
        Ok(RegistryClient::new(self.contract(&self.config.registry_contract_id)?))
    }

    fn handler(&self, chain: &ChainName) -> Result<HandlerClient> {
        let chain_type = self
            .config
            .chain_type(chain)
            .with_context(|| format!("Unrecognized chain type: {}", chain))?;
        let endpoint = self
            .config
            .chain_endpoint(chain)
            .with_context(|| format!("No endpoint configured for {}", chain))?;
        let address = self
            .config
            .handler_address(chain)
            .with_context(|| format!("No handler configured for {}", chain))?;
        let contract = ContractClient::new(endpoint, ContractId::new(address), self.signer.clone())?;
        Ok(HandlerClient::new(chain.clone(), chain_type, contract)?)
    }
}

fn parse_json<T: serde::de::DeserializeOwned>(what: &str, raw: &str) -> Result<T> {
    serde_json::from_str(raw).with_context(|| format!("Invalid {} JSON", what))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

const DEFAULT_LOG_DIRECTIVES: &str = "info,index_orchestrator=info,reqwest=warn";

/// `RUST_LOG` wins when it parses; otherwise fall back to the defaults.
fn log_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_DIRECTIVES))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref()))
        .with_timer(ChronoUtc::rfc_3339())
        .init();

    let cli = Cli::parse();
    let env = Env::load(cli.config.as_deref(), cli.signer)?;

    match cli.command {
        Commands::Scheduler(SchedulerCommand::Run {
            fetch_interval,
            execute_interval,
            token_update_interval,
        }) => {
            let mut config = env.config.clone();
            config.scheduler = config.scheduler.with_intervals(
                fetch_interval,
                execute_interval,
                token_update_interval,
            );
            config.validate()?;

            let storage_url = cli
                .storage_url
                .or_else(|| config.storage_url.clone())
                .context("Storage URL must be provided (--storage-url or storage_url)")?;
            let credentials =
                CommandTokenProvider::from_command_line(&config.scheduler.token_command)?;

            let shutdown = CancellationToken::new();
            {
                let shutdown = shutdown.clone();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        warn!("Interrupt received, stopping scheduler");
                        shutdown.cancel();
                    }
                });
            }

            let scheduler = Scheduler::new(
                Arc::new(env.executor()?),
                Arc::new(credentials),
                config.scheduler.clone(),
                EngineSettings {
                    storage_url,
                    keystore: config.key_store_contract_id.clone(),
                },
                shutdown,
            );
            scheduler.run().await?;
        }
        Commands::Executor(cmd) => {
            let executor = env.executor()?;
            match cmd {
                ExecutorCommand::Setup { resume } => {
                    let (Some(storage_url), Some(storage_key)) = (
                        cli.storage_url.or_else(|| env.config.storage_url.clone()),
                        cli.storage_key,
                    ) else {
                        anyhow::bail!("Storage URL and Key must be provided");
                    };
                    executor
                        .configure(
                            &storage_url,
                            &storage_key,
                            &env.config.key_store_contract_id,
                            resume,
                        )
                        .await?;
                    info!("Configured executor");
                    if resume {
                        executor.resume().await?;
                        info!("Resumed executor");
                    }
                }
                ExecutorCommand::Resume => {
                    executor.resume().await?;
                    info!("Resumed executor");
                }
                ExecutorCommand::Status => {
                    let running = executor.is_running().await?;
                    println!("{}", if running { "running" } else { "paused" });
                }
            }
        }
        Commands::Keystore(KeystoreCommand::SetExecutor) => {
            let keystore = KeystoreClient::new(env.contract(&env.config.key_store_contract_id)?);
            let receipt = keystore.set_executor(&env.config.executor_contract_id).await?;
            println!("{}", receipt.tx_hash);
        }
        Commands::Worker(cmd) => {
            let executor = env.executor()?;
            match cmd {
                WorkerCommand::List { worker } => {
                    let accounts = executor.get_worker_accounts().await?;
                    match worker {
                        Some(w) => match accounts.iter().find(|a| a.matches(&w)) {
                            Some(account) => print_json(account)?,
                            None => anyhow::bail!("Worker {} not found", w),
                        },
                        None => print_json(&accounts)?,
                    }
                }
                WorkerCommand::Approve {
                    worker,
                    chain,
                    token,
                    spender,
                    amount,
                } => {
                    let out = executor
                        .worker_approve(&worker, &chain, &token, &spender, amount)
                        .await?;
                    print_json(&out)?;
                }
                WorkerCommand::DropTask { worker, chain, id } => {
                    let out = executor.worker_drop_task(&worker, &chain, &id).await?;
                    print_json(&out)?;
                }
            }
        }
        Commands::Registry(cmd) => run_registry(&env, cmd).await?,
        Commands::Handler(cmd) => match cmd {
            HandlerCommand::SetWorker { chain, worker } => {
                let receipt = env.handler(&chain)?.set_worker(&worker).await?;
                println!("Whitelist worker on {}: {}", chain, receipt.tx_hash);
            }
            HandlerCommand::Deposit {
                chain,
                asset,
                amount,
                recipient,
                worker,
                id,
                data,
            } => {
                let receipt = env
                    .handler(&chain)?
                    .deposit(Deposit {
                        asset,
                        amount,
                        recipient,
                        worker,
                        task_id: id,
                        data,
                    })
                    .await?;
                println!("Deposited task on {}: {}", chain, receipt.tx_hash);
            }
        },
    }

    Ok(())
}

async fn run_registry(env: &Env, cmd: RegistryCommand) -> Result<()> {
    let remote = env.registry()?;
    let registry: &dyn RegistryApi = &remote;
    match cmd {
        RegistryCommand::Graph => print_json(&registry.get_graph().await?)?,
        RegistryCommand::Apply { manifest, dry_run } => {
            let raw = std::fs::read_to_string(&manifest)
                .with_context(|| format!("Failed to read {}", manifest.display()))?;
            let manifest: RegistryManifest = parse_json("manifest", &raw)?;
            if dry_run {
                let local = InMemoryRegistry::new();
                manifest.apply(&local).await?;
                print_json(&local.get_graph().await?)?;
            } else {
                manifest.apply(registry).await?;
            }
        }
        RegistryCommand::RegisterChain { info } => {
            registry
                .register_chain(parse_json::<ChainInfo>("chain", &info)?)
                .await?
        }
        RegistryCommand::UnregisterChain { name } => registry.unregister_chain(&name).await?,
        RegistryCommand::RegisterAsset { chain, asset } => {
            registry
                .register_asset(&chain, parse_json::<AssetInfo>("asset", &asset)?)
                .await?
        }
        RegistryCommand::UnregisterAsset { chain, asset } => {
            registry
                .unregister_asset(&chain, parse_json::<AssetInfo>("asset", &asset)?)
                .await?
        }
        RegistryCommand::SetNative { chain, asset } => {
            registry
                .set_chain_native(&chain, parse_json::<AssetInfo>("asset", &asset)?)
                .await?
        }
        RegistryCommand::SetStable { chain, asset } => {
            registry
                .set_chain_stable(&chain, parse_json::<AssetInfo>("asset", &asset)?)
                .await?
        }
        RegistryCommand::SetEndpoint { chain, endpoint } => {
            registry.set_chain_endpoint(&chain, endpoint).await?
        }
        RegistryCommand::RegisterBridge {
            name,
            chain0,
            chain1,
        } => registry.register_bridge(name, chain0, chain1).await?,
        RegistryCommand::UnregisterBridge { name } => registry.unregister_bridge(&name).await?,
        RegistryCommand::AddBridgeAsset { bridge, pair } => {
            registry
                .add_bridge_asset(&bridge, parse_json::<AssetPair>("pair", &pair)?)
                .await?
        }
        RegistryCommand::RemoveBridgeAsset { bridge, pair } => {
            registry
                .remove_bridge_asset(&bridge, parse_json::<AssetPair>("pair", &pair)?)
                .await?
        }
        RegistryCommand::RegisterDex { name, id, chain } => {
            registry.register_dex(name, id, chain).await?
        }
        RegistryCommand::UnregisterDex { name } => registry.unregister_dex(&name).await?,
        RegistryCommand::AddDexPair { dex, pair } => {
            registry
                .add_dex_pair(&dex, parse_json::<DexPair>("pair", &pair)?)
                .await?
        }
        RegistryCommand::RemoveDexPair { dex, pair } => {
            registry
                .remove_dex_pair(&dex, parse_json::<DexPair>("pair", &pair)?)
                .await?
        }
    }
    Ok(())
}
