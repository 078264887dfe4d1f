use anyhow::{Context, Result};
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_IPFS_GATEWAY: &str = "https://ipfs.io/ipfs/";

/// Fetches listing metadata documents through an IPFS HTTP gateway.
pub struct IpfsClient {
    gateway: String,
    http: reqwest::Client,
}

impl IpfsClient {
    pub fn new(gateway: impl Into<String>, timeout: Duration) -> Result<Self> {
        let mut gateway = gateway.into();
        if !gateway.ends_with('/') {
            gateway.push('/');
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("build IPFS gateway HTTP client")?;
        Ok(Self { gateway, http })
    }

    pub fn url_for(&self, cid: &str) -> String {
        format!("{}{}", self.gateway, cid)
    }

    /// Returns `None` when the CID is empty or the document cannot be fetched
    /// or decoded.
    pub async fn fetch_metadata(&self, cid: &str) -> Option<serde_json::Value> {
        let cid = cid.trim();
        if cid.is_empty() {
            return None;
        }

        match self.try_fetch(cid).await {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("failed to fetch IPFS metadata for {}: {:#}", cid, err);
                None
            }
        }
    }

    async fn try_fetch(&self, cid: &str) -> Result<serde_json::Value> {
        let response = self
            .http
            .get(self.url_for(cid))
            .send()
            .await
            .context("ipfs transport")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("ipfs gateway HTTP {status}");
        }

        response.json().await.context("ipfs metadata parse")
    }
}
