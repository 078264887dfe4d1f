//! Wallet session for the PropertyX marketplace.
//!
//! [`WalletSession`] is the single owner of connection state: whether a
//! wallet is connected, its address and the cached token balances. Every
//! mutation goes through `connect`, `disconnect` and `fetch_balance`; the
//! contract backend, session store and authenticator are injected.

use anyhow::Result;
use px_api_types::{
    Balances, ContractCallRequest, ContractCallResult, PersistedWallet, PlainContractCall,
    TypedValue, WalletAddress,
};
use px_auth_adapter::{AuthOutcome, WalletAuthenticator};
use px_contract_client::{ContractCaller, ContractError, marshal_args};
use px_contract_http::IpfsClient;
use px_storage::SessionStore;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod backend;
pub mod config;
mod reads;

pub use config::{BackendKind, BalanceSource, ContractsConfig, StorageKind, WalletConfig};

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("wallet not connected")]
    Unauthenticated,
    #[error("wallet authentication failed: {0}")]
    Authentication(String),
    #[error(transparent)]
    Contract(#[from] ContractError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    Connected(WalletAddress),
    AlreadyConnected(WalletAddress),
    /// The user dismissed the wallet prompt; the session is unchanged.
    Cancelled,
}

pub struct WalletSession {
    caller: Arc<dyn ContractCaller>,
    store: Arc<dyn SessionStore>,
    authenticator: Arc<dyn WalletAuthenticator>,
    contracts: ContractsConfig,
    balance_sources: Vec<BalanceSource>,
    storage_key: String,
    ipfs: Option<IpfsClient>,
    address: Option<WalletAddress>,
    balances: Balances,
}

impl WalletSession {
    pub fn new(
        caller: Arc<dyn ContractCaller>,
        store: Arc<dyn SessionStore>,
        authenticator: Arc<dyn WalletAuthenticator>,
        config: &WalletConfig,
    ) -> Self {
        Self {
            caller,
            store,
            authenticator,
            contracts: config.contracts.clone(),
            balance_sources: config.balance_sources.clone(),
            storage_key: config.storage_key.clone(),
            ipfs: None,
            address: None,
            balances: zero_balances(&config.balance_sources),
        }
    }

    /// Wires backend, store and authenticator as the config selects them.
    pub fn from_config(config: &WalletConfig) -> Result<Self> {
        let session = Self::new(
            backend::build_caller(config)?,
            backend::build_store(config)?,
            backend::build_authenticator(config)?,
            config,
        );
        Ok(session.with_ipfs(backend::build_ipfs(config)?))
    }

    pub fn with_ipfs(mut self, ipfs: IpfsClient) -> Self {
        self.ipfs = Some(ipfs);
        self
    }

    pub fn is_connected(&self) -> bool {
        self.address.is_some()
    }

    pub fn address(&self) -> Option<&WalletAddress> {
        self.address.as_ref()
    }

    pub fn balances(&self) -> &Balances {
        &self.balances
    }

    pub fn balance(&self, token: &str) -> u64 {
        self.balances.get(token).copied().unwrap_or(0)
    }

    pub fn contracts(&self) -> &ContractsConfig {
        &self.contracts
    }

    /// Restores a previously persisted connection. Returns whether the
    /// session is connected afterwards.
    pub async fn resume(&mut self) -> bool {
        if self.is_connected() {
            return true;
        }

        let record = match self.store.load(&self.storage_key).await {
            Ok(Some(record)) => record,
            Ok(None) => return false,
            Err(err) => {
                warn!("failed to load persisted wallet session: {:#}", err);
                return false;
            }
        };

        let mut balances = zero_balances(&self.balance_sources);
        balances.extend(record.balance);
        self.balances = balances;
        info!("resumed wallet session for {}", record.address);
        self.address = Some(WalletAddress(record.address));
        true
    }

    pub async fn connect(&mut self) -> Result<ConnectOutcome, WalletError> {
        if let Some(address) = &self.address {
            debug!("connect requested while already connected as {}", address);
            return Ok(ConnectOutcome::AlreadyConnected(address.clone()));
        }

        let outcome = self
            .authenticator
            .authenticate()
            .await
            .map_err(|err| WalletError::Authentication(format!("{err:#}")))?;

        let address = match outcome {
            AuthOutcome::Approved(address) => address,
            AuthOutcome::Cancelled => {
                info!("wallet connection cancelled by user");
                return Ok(ConnectOutcome::Cancelled);
            }
        };

        info!("wallet connected: {}", address);
        self.address = Some(address.clone());
        self.persist().await;
        self.fetch_balance(&address).await;

        Ok(ConnectOutcome::Connected(address))
    }

    pub async fn disconnect(&mut self) {
        if let Err(err) = self.authenticator.sign_out().await {
            warn!("wallet sign-out failed: {:#}", err);
        }

        if let Some(address) = self.address.take() {
            info!("wallet disconnected: {}", address);
        }
        self.balances = zero_balances(&self.balance_sources);

        if let Err(err) = self.store.remove(&self.storage_key).await {
            warn!("failed to clear persisted wallet session: {:#}", err);
        }
    }

    /// Queries every tracked token balance for `address`.
    ///
    /// Failures never reach the caller: a token whose query fails or returns
    /// something other than a `uint` keeps its last known amount (zero for
    /// an address other than the connected one). Only the connected
    /// address updates and persists the session balances.
    pub async fn fetch_balance(&mut self, address: &WalletAddress) -> Balances {
        let own = self.address.as_ref() == Some(address);
        let mut balances = if own {
            self.balances.clone()
        } else {
            zero_balances(&self.balance_sources)
        };

        for source in &self.balance_sources {
            let req = ContractCallRequest::new(
                self.contracts.deployer.clone(),
                source.contract_name.clone(),
                source.function_name.clone(),
                vec![TypedValue::principal(address.as_str())],
            )
            .with_sender(address.as_str());
            let qualified = req.qualified_name();

            match self.caller.call_read_only(req).await {
                Ok(result) => match result.value.unwrap_ok().as_uint() {
                    Some(amount) => {
                        balances.insert(source.token.clone(), amount);
                    }
                    None => warn!(
                        "malformed {} balance from {}: expected uint, got {}",
                        source.token,
                        qualified,
                        result.value.type_name()
                    ),
                },
                Err(err) => warn!(
                    "failed to fetch {} balance for {}: {}",
                    source.token, address, err
                ),
            }
        }

        if own {
            self.balances = balances.clone();
            self.persist().await;
        }
        balances
    }

    /// Refreshes the balance of the connected address, if any.
    pub async fn refresh_balance(&mut self) -> Option<Balances> {
        let address = self.address.clone()?;
        Some(self.fetch_balance(&address).await)
    }

    /// Submits a state-changing call on behalf of the connected wallet.
    pub async fn call_contract(
        &self,
        call: PlainContractCall,
    ) -> Result<ContractCallResult, WalletError> {
        let address = self.address.as_ref().ok_or(WalletError::Unauthenticated)?;
        let req = marshal_call(call).with_sender(address.as_str());
        let qualified = req.qualified_name();

        match self.caller.call_write(req).await {
            Ok(result) => {
                info!(
                    "submitted {} (tx {})",
                    qualified,
                    result.tx_id.as_deref().unwrap_or("-")
                );
                Ok(result)
            }
            Err(err) => {
                warn!("contract call {} failed: {}", qualified, err);
                Err(err.into())
            }
        }
    }

    /// Read-only call; works without a connected wallet.
    pub async fn read_contract(
        &self,
        call: PlainContractCall,
    ) -> Result<ContractCallResult, WalletError> {
        let mut req = marshal_call(call);
        req.sender_address = self.address.as_ref().map(|address| address.0.clone());
        Ok(self.caller.call_read_only(req).await?)
    }

    /// Listing metadata document for `cid`; `None` when no gateway is
    /// configured or the fetch fails.
    pub async fn fetch_ipfs_metadata(&self, cid: &str) -> Option<serde_json::Value> {
        match &self.ipfs {
            Some(ipfs) => ipfs.fetch_metadata(cid).await,
            None => {
                debug!("no IPFS gateway configured, skipping {}", cid);
                None
            }
        }
    }

    async fn persist(&self) {
        let Some(address) = &self.address else {
            return;
        };

        let record = PersistedWallet {
            address: address.0.clone(),
            balance: self.balances.clone(),
        };
        if let Err(err) = self.store.save(&self.storage_key, &record).await {
            warn!("failed to persist wallet session: {:#}", err);
        }
    }

    fn request(
        &self,
        contract_name: &str,
        function_name: &str,
        args: Vec<TypedValue>,
    ) -> ContractCallRequest {
        let req = ContractCallRequest::new(
            self.contracts.deployer.clone(),
            contract_name,
            function_name,
            args,
        );
        match &self.address {
            Some(address) => req.with_sender(address.as_str()),
            None => req,
        }
    }
}

fn marshal_call(call: PlainContractCall) -> ContractCallRequest {
    ContractCallRequest::new(
        call.contract_address,
        call.contract_name,
        call.function_name,
        marshal_args(&call.function_args),
    )
}

fn zero_balances(sources: &[BalanceSource]) -> Balances {
    sources
        .iter()
        .map(|source| (source.token.clone(), 0))
        .collect()
}
