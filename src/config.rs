use serde::{Deserialize, Deserializer};
use std::{
    collections::BTreeMap,
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::graph::ChainType;
use crate::types::{ChainName, ContractId, WorkerId};

/// The configuration document (`config.json`).
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Base URL of the node gateway that fronts the contracts.
    pub node_endpoint: String,
    pub executor_contract_id: ContractId,
    pub registry_contract_id: ContractId,
    pub key_store_contract_id: ContractId,

    /// Signing account passed to the gateway; `--signer` overrides it.
    #[serde(default)]
    pub signer: Option<String>,
    /// Storage backend the executor persists tasks to.
    #[serde(default)]
    pub storage_url: Option<String>,

    /// chain name -> chain RPC endpoint
    #[serde(default, deserialize_with = "chain_map")]
    pub chains: BTreeMap<String, String>,
    /// chain name -> handler contract address
    #[serde(default, deserialize_with = "chain_map")]
    pub handlers: BTreeMap<String, String>,
    /// Overrides for the built-in chain type table.
    #[serde(default)]
    pub chain_types: BTreeMap<String, ChainType>,

    #[serde(default)]
    pub scheduler: SchedulerSettings,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct SchedulerSettings {
    /// Chains scanned for new tasks on every Fetch tick, in this order.
    pub source_chains: Vec<ChainName>,
    pub workers: Vec<WorkerId>,
    pub fetch_interval_ms: u64,
    pub execute_interval_ms: u64,
    pub token_update_interval_ms: u64,
    pub token_command: String,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            source_chains: vec![ChainName::new("Moonbeam"), ChainName::new("AstarEvm")],
            workers: Vec::new(),
            fetch_interval_ms: 30_000,
            execute_interval_ms: 10_000,
            token_update_interval_ms: 60_000,
            token_command: "gcloud auth print-access-token".to_string(),
        }
    }
}

impl SchedulerSettings {
    pub fn fetch_interval(&self) -> Duration {
        Duration::from_millis(self.fetch_interval_ms)
    }

    pub fn execute_interval(&self) -> Duration {
        Duration::from_millis(self.execute_interval_ms)
    }

    pub fn token_update_interval(&self) -> Duration {
        Duration::from_millis(self.token_update_interval_ms)
    }

    /// Apply CLI interval overrides.
    pub fn with_intervals(
        mut self,
        fetch: Option<u64>,
        execute: Option<u64>,
        token_update: Option<u64>,
    ) -> Self {
        if let Some(ms) = fetch {
            self.fetch_interval_ms = ms;
        }
        if let Some(ms) = execute {
            self.execute_interval_ms = ms;
        }
        if let Some(ms) = token_update {
            self.token_update_interval_ms = ms;
        }
        self
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, ms) in [
            ("fetch_interval_ms", self.fetch_interval_ms),
            ("execute_interval_ms", self.execute_interval_ms),
            ("token_update_interval_ms", self.token_update_interval_ms),
        ] {
            if ms == 0 {
                anyhow::bail!("scheduler.{} must be greater than zero", name);
            }
        }
        if self.source_chains.is_empty() {
            anyhow::bail!("scheduler.source_chains must name at least one chain");
        }
        if self.workers.is_empty() {
            anyhow::bail!("scheduler.workers must name at least one worker");
        }
        if self.token_command.trim().is_empty() {
            anyhow::bail!("scheduler.token_command is empty");
        }
        Ok(())
    }
}

impl Config {
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let cfg: Config = serde_json::from_str(raw)?;
        Ok(cfg.expanded())
    }

    /// Load from an explicit path, or the resolved default location.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => resolve_config_path()?,
        };
        let raw = fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
        let cfg = Self::from_json(&raw)
            .map_err(|e| anyhow::anyhow!("Invalid config {}: {}", path.display(), e))?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.node_endpoint.trim().is_empty() {
            anyhow::bail!("node_endpoint is empty");
        }
        self.scheduler.validate()
    }

    pub fn chain_endpoint(&self, chain: &ChainName) -> Option<&str> {
        lookup(&self.chains, chain)
    }

    pub fn handler_address(&self, chain: &ChainName) -> Option<&str> {
        lookup(&self.handlers, chain)
    }

    pub fn chain_type(&self, chain: &ChainName) -> Option<ChainType> {
        self.chain_types
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(chain.as_str()))
            .map(|(_, ty)| *ty)
            .or_else(|| ChainType::infer(chain))
    }

    fn expanded(mut self) -> Self {
        self.node_endpoint = expand_env_vars(&self.node_endpoint);
        if let Some(signer) = self.signer.as_mut() {
            *signer = expand_env_vars(signer);
        }
        if let Some(url) = self.storage_url.as_mut() {
            *url = expand_env_vars(url);
        }
        for val in self.chains.values_mut() {
            *val = expand_env_vars(val);
        }
        for val in self.handlers.values_mut() {
            *val = expand_env_vars(val);
        }
        self.scheduler.token_command = expand_env_vars(&self.scheduler.token_command);
        self
    }
}

/// Accepts `{"moonbeam": ".."}` as well as the older
/// `[{"moonbeam": ".."}, ..]` layout.
fn chain_map<'de, D: Deserializer<'de>>(d: D) -> Result<BTreeMap<String, String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Shape {
        Map(BTreeMap<String, String>),
        List(Vec<BTreeMap<String, String>>),
    }

    Ok(match Shape::deserialize(d)? {
        Shape::Map(map) => map,
        Shape::List(list) => list.into_iter().flatten().collect(),
    })
}

fn lookup<'a>(map: &'a BTreeMap<String, String>, chain: &ChainName) -> Option<&'a str> {
    map.iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(chain.as_str()))
        .map(|(_, v)| v.as_str())
}

pub fn resolve_config_path() -> anyhow::Result<PathBuf> {
    if let Ok(p) = env::var("INDEX_CONFIG") {
        return Ok(PathBuf::from(p));
    }

    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        let candidate = PathBuf::from(xdg).join("index").join("config.json");
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    let candidate = PathBuf::from("config.json");
    if candidate.exists() {
        return Ok(candidate);
    }

    Err(anyhow::anyhow!(
        "Could not find config.json (pass --config, set INDEX_CONFIG or create ./config.json)"
    ))
}

fn expand_env_vars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next(); // consume '{'
            let mut name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                name.push(c);
            }
            if let Ok(val) = env::var(&name) {
                out.push_str(&val);
            } else {
                out.push_str("${");
                out.push_str(&name);
                out.push('}');
            }
        } else {
            out.push(ch);
        }
    }

    out
}
