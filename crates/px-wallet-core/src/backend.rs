use anyhow::{Context, Result};
use px_auth_adapter::{StaticAuthenticator, WalletAuthenticator};
use px_contract_client::ContractCaller;
use px_contract_http::{HttpContractCaller, IpfsClient};
use px_contract_sim::SimulatedContractCaller;
use px_storage::{InMemorySessionStore, JsonFileSessionStore, SessionStore};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::config::{BackendKind, StorageKind, WalletConfig};

pub fn build_caller(config: &WalletConfig) -> Result<Arc<dyn ContractCaller>> {
    let caller: Arc<dyn ContractCaller> = match config.backend {
        BackendKind::Simulated => Arc::new(
            SimulatedContractCaller::new().with_unknown_function_policy(config.unknown_function),
        ),
        BackendKind::Network => Arc::new(HttpContractCaller::new(
            config.node_url.clone(),
            config.request_timeout,
        )?),
    };
    info!("contract backend: {}", caller.backend());
    Ok(caller)
}

pub fn build_store(config: &WalletConfig) -> Result<Arc<dyn SessionStore>> {
    let kind = config.storage_kind();
    let store: Arc<dyn SessionStore> = match kind {
        StorageKind::Memory => Arc::new(InMemorySessionStore::default()),
        StorageKind::JsonFile => Arc::new(JsonFileSessionStore::open(storage_dir(config)?)?),
        StorageKind::RocksDb => open_rocksdb(storage_dir(config)?)?,
    };
    info!("session store: {:?}", kind);
    Ok(store)
}

pub fn build_authenticator(config: &WalletConfig) -> Result<Arc<dyn WalletAuthenticator>> {
    match &config.wallet_address {
        Some(address) => Ok(Arc::new(StaticAuthenticator::new(address)?)),
        None => Ok(Arc::new(StaticAuthenticator::dismissing())),
    }
}

pub fn build_ipfs(config: &WalletConfig) -> Result<IpfsClient> {
    IpfsClient::new(config.ipfs_gateway.clone(), config.request_timeout)
}

fn storage_dir(config: &WalletConfig) -> Result<&Path> {
    config
        .storage_dir
        .as_deref()
        .context("PX_STORAGE_DIR is required for persistent session storage")
}

#[cfg(feature = "rocksdb")]
fn open_rocksdb(dir: &Path) -> Result<Arc<dyn SessionStore>> {
    let path = dir
        .to_str()
        .with_context(|| format!("non UTF-8 storage path: {}", dir.display()))?;
    Ok(Arc::new(px_storage::RocksDbSessionStore::open_default(path)?))
}

#[cfg(not(feature = "rocksdb"))]
fn open_rocksdb(_dir: &Path) -> Result<Arc<dyn SessionStore>> {
    anyhow::bail!("rocksdb session store requires the `rocksdb` feature")
}
