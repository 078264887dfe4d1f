use anyhow::{Result, anyhow};
use async_trait::async_trait;
use px_api_types::WalletAddress;
use px_contract_client::is_stacks_address;
use tracing::debug;

/// Result of the external wallet-authentication flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Approved(WalletAddress),
    /// The user dismissed the wallet prompt.
    Cancelled,
}

#[async_trait]
pub trait WalletAuthenticator: Send + Sync {
    async fn authenticate(&self) -> Result<AuthOutcome>;

    async fn sign_out(&self) -> Result<()> {
        Ok(())
    }
}

/// Authenticator that approves a fixed, preconfigured address.
///
/// Built without an address it behaves like a user who always dismisses the
/// prompt.
#[derive(Debug, Clone, Default)]
pub struct StaticAuthenticator {
    address: Option<WalletAddress>,
}

impl StaticAuthenticator {
    pub fn new(address: &str) -> Result<Self> {
        let address = address.trim();
        if address.is_empty() {
            return Err(anyhow!("wallet address is required"));
        }
        if !is_stacks_address(address) {
            return Err(anyhow!("not a Stacks address: {address}"));
        }
        Ok(Self {
            address: Some(WalletAddress(address.to_owned())),
        })
    }

    pub fn dismissing() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WalletAuthenticator for StaticAuthenticator {
    async fn authenticate(&self) -> Result<AuthOutcome> {
        match &self.address {
            Some(address) => {
                debug!("static authenticator approved {}", address);
                Ok(AuthOutcome::Approved(address.clone()))
            }
            None => Ok(AuthOutcome::Cancelled),
        }
    }
}
