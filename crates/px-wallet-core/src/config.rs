use anyhow::{Context, Result, anyhow};
use px_contract_http::{DEFAULT_IPFS_GATEWAY, DEFAULT_NODE_URL};
use px_contract_sim::UnknownFunctionPolicy;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_STORAGE_KEY: &str = "wallet";
pub const DEFAULT_CONTRACT_ADDRESS: &str = "ST1VZ3YGJKKC8JSSWMS4EZDXXJM7QWRBEZ0ZWM64E";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    #[default]
    Simulated,
    Network,
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "simulated" | "sim" => Ok(Self::Simulated),
            "network" | "http" => Ok(Self::Network),
            other => Err(anyhow!("unknown contract backend: {other}")),
        }
    }
}

/// Where the wallet session is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Memory,
    JsonFile,
    /// Needs the `rocksdb` feature.
    RocksDb,
}

impl FromStr for StorageKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" | "json" => Ok(Self::JsonFile),
            "rocksdb" => Ok(Self::RocksDb),
            other => Err(anyhow!("unknown storage backend: {other}")),
        }
    }
}

/// Deployed contract names, all under one deployer address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractsConfig {
    pub deployer: String,
    pub token_contract: String,
    pub nft_contract: String,
    pub marketplace_contract: String,
}

impl Default for ContractsConfig {
    fn default() -> Self {
        Self {
            deployer: DEFAULT_CONTRACT_ADDRESS.to_owned(),
            token_contract: "rws".to_owned(),
            nft_contract: "nft".to_owned(),
            marketplace_contract: "nft-marketplace".to_owned(),
        }
    }
}

/// Read-only function that reports one token balance for a principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceSource {
    pub token: String,
    pub contract_name: String,
    pub function_name: String,
}

#[derive(Debug, Clone)]
pub struct WalletConfig {
    pub backend: BackendKind,
    pub node_url: String,
    pub request_timeout: Duration,
    pub storage_key: String,
    /// `None` picks the file store when `storage_dir` is set, memory otherwise.
    pub storage_backend: Option<StorageKind>,
    pub storage_dir: Option<PathBuf>,
    pub wallet_address: Option<String>,
    pub unknown_function: UnknownFunctionPolicy,
    pub ipfs_gateway: String,
    pub contracts: ContractsConfig,
    pub balance_sources: Vec<BalanceSource>,
}

impl Default for WalletConfig {
    fn default() -> Self {
        let contracts = ContractsConfig::default();
        let balance_sources = vec![BalanceSource {
            token: "PXT".to_owned(),
            contract_name: contracts.token_contract.clone(),
            function_name: "get-balance".to_owned(),
        }];

        Self {
            backend: BackendKind::default(),
            node_url: DEFAULT_NODE_URL.to_owned(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            storage_key: DEFAULT_STORAGE_KEY.to_owned(),
            storage_backend: None,
            storage_dir: None,
            wallet_address: None,
            unknown_function: UnknownFunctionPolicy::default(),
            ipfs_gateway: DEFAULT_IPFS_GATEWAY.to_owned(),
            contracts,
            balance_sources,
        }
    }
}

impl WalletConfig {
    pub fn storage_kind(&self) -> StorageKind {
        match (self.storage_backend, &self.storage_dir) {
            (Some(kind), _) => kind,
            (None, Some(_)) => StorageKind::JsonFile,
            (None, None) => StorageKind::Memory,
        }
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable lookup; blank values
    /// count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };
        let mut config = Self::default();

        if let Some(value) = get("PX_CONTRACT_BACKEND") {
            config.backend = value.parse::<BackendKind>()?;
        }
        if let Some(value) = get("PX_NODE_URL") {
            config.node_url = value;
        }
        if let Some(value) = get("PX_REQUEST_TIMEOUT_SECS") {
            let secs: u64 = value
                .parse()
                .with_context(|| format!("invalid PX_REQUEST_TIMEOUT_SECS: {value}"))?;
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(value) = get("PX_STORAGE_KEY") {
            config.storage_key = value;
        }
        if let Some(value) = get("PX_STORAGE_BACKEND") {
            config.storage_backend = Some(value.parse::<StorageKind>()?);
        }
        config.storage_dir = get("PX_STORAGE_DIR").map(PathBuf::from);
        config.wallet_address = get("PX_WALLET_ADDRESS");
        if let Some(value) = get("PX_CONTRACT_ADDRESS") {
            config.contracts.deployer = value;
        }
        if let Some(value) = get("PX_IPFS_GATEWAY") {
            config.ipfs_gateway = value;
        }
        if let Some(value) = get("PX_UNKNOWN_FUNCTION") {
            config.unknown_function = value
                .parse::<UnknownFunctionPolicy>()
                .map_err(|err: String| anyhow!("invalid PX_UNKNOWN_FUNCTION: {err}"))?;
        }

        Ok(config)
    }
}
