use px_api_types::{AssetRecord, MarketplaceListing, NftOwnership, TypedValue};
use tracing::warn;

use crate::{WalletError, WalletSession};

const LISTING_IDS: std::ops::RangeInclusive<u64> = 1..=5;
const DEFAULT_LOCATION: &str = "Downtown Financial District";
const LISTING_CURRENCY: &str = "STX";

impl WalletSession {
    pub async fn nft_owner(&self, token_id: u64) -> Result<NftOwnership, WalletError> {
        if !self.is_connected() {
            return Err(WalletError::Unauthenticated);
        }

        let req = self.request(
            &self.contracts.nft_contract,
            "get-owner",
            vec![TypedValue::uint(token_id)],
        );
        let result = self.caller.call_read_only(req).await?;
        let owner = result
            .value
            .as_some()
            .and_then(TypedValue::as_principal)
            .map(ToOwned::to_owned);

        Ok(NftOwnership { token_id, owner })
    }

    /// Asset registered under `owner`. `None` when the contract reports no
    /// such asset.
    pub async fn asset(&self, owner: &str, asset_id: u64) -> Result<Option<AssetRecord>, WalletError> {
        let req = self.request(
            &self.contracts.token_contract,
            "get-asset",
            vec![TypedValue::principal(owner), TypedValue::uint(asset_id)],
        );
        let result = self.caller.call_read_only(req).await?;

        let value = result.value.unwrap_ok();
        let value = value.as_some().unwrap_or(value);
        if matches!(value, TypedValue::None | TypedValue::Err { .. }) {
            return Ok(None);
        }

        Ok(Some(AssetRecord {
            id: asset_id,
            owner: value
                .field("owner")
                .and_then(TypedValue::as_principal)
                .unwrap_or(owner)
                .to_owned(),
            name: value
                .field("name")
                .and_then(TypedValue::as_string)
                .map(ToOwned::to_owned)
                .unwrap_or_else(|| format!("Property Asset {asset_id}")),
            description: format!(
                "Real-world asset tokenized on PropertyX Protocol (ID: {asset_id})"
            ),
            asset_type: "property".to_owned(),
            value: value
                .field("value")
                .and_then(TypedValue::as_uint)
                .unwrap_or_else(|| 50_000_u64.saturating_add(asset_id.saturating_mul(10_000))),
            location: DEFAULT_LOCATION.to_owned(),
        }))
    }

    /// Whether the connected wallet is the token contract's admin. Any
    /// failure reads as `false`.
    pub async fn is_admin(&self) -> bool {
        let Some(address) = self.address() else {
            return false;
        };

        let req = self.request(&self.contracts.token_contract, "get-admin", vec![]);
        match self.caller.call_read_only(req).await {
            Ok(result) => match &result.value {
                TypedValue::Ok { value } => value.as_principal() == Some(address.as_str()),
                _ => false,
            },
            Err(err) => {
                warn!("failed to check admin status: {}", err);
                false
            }
        }
    }

    /// Open marketplace listings with their NFT owner and asset resolved.
    /// Empty when disconnected or when any lookup fails.
    pub async fn marketplace_listings(&self) -> Vec<MarketplaceListing> {
        if !self.is_connected() {
            return Vec::new();
        }

        match self.try_marketplace_listings().await {
            Ok(listings) => listings,
            Err(err) => {
                warn!("failed to fetch marketplace listings: {}", err);
                Vec::new()
            }
        }
    }

    async fn try_marketplace_listings(&self) -> Result<Vec<MarketplaceListing>, WalletError> {
        let mut listings = Vec::new();

        for listing_id in LISTING_IDS {
            let req = self.request(
                &self.contracts.marketplace_contract,
                "get-listing",
                vec![TypedValue::uint(listing_id)],
            );
            let result = self.caller.call_read_only(req).await?;
            let data = &result.value;
            if !matches!(data, TypedValue::Tuple { .. }) {
                continue;
            }

            let uint = |name: &str| data.field(name).and_then(TypedValue::as_uint);
            let Some(token_id) = uint("tokenId") else {
                continue;
            };

            let ownership = self.nft_owner(token_id).await?;
            let Some(owner) = ownership.owner else {
                continue;
            };
            let Some(asset) = self.asset(&owner, token_id).await? else {
                continue;
            };

            listings.push(MarketplaceListing {
                id: uint("id").unwrap_or(listing_id),
                token_id,
                name: asset.name,
                description: asset.description,
                asset_type: asset.asset_type,
                owner: data
                    .field("maker")
                    .and_then(TypedValue::as_principal)
                    .unwrap_or(owner.as_str())
                    .to_owned(),
                price: uint("price").unwrap_or(0),
                currency: LISTING_CURRENCY.to_owned(),
                metadata_cid: format!("QmNR2n4zywCV61MeMLB6JwPueAPqhbtqMfCMKDRQftUSa{listing_id}"),
                expiry: uint("expiry").unwrap_or(0),
                is_cancelled: data
                    .field("isCancelled")
                    .and_then(TypedValue::as_bool)
                    .unwrap_or(false),
            });
        }

        Ok(listings)
    }
}
