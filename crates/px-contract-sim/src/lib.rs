use async_trait::async_trait;
use px_api_types::{ContractCallRequest, ContractCallResult, TypedValue};
use px_contract_client::{ContractCaller, ContractError};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use std::str::FromStr;
use std::sync::Mutex;
use tracing::debug;

pub const SIMULATED: &str = "simulated";

/// Owner reported for odd NFT ids.
pub const FOREIGN_OWNER: &str = "ST1VZ3YGJKKC8JSSWMS4EZDXXJM7QWRBEZ0ZWM64E";

const LISTING_IDS: std::ops::RangeInclusive<u64> = 1..=5;

/// What to answer for functions the simulator does not model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownFunctionPolicy {
    /// Answer `bool true` so demo flows keep working.
    #[default]
    Truthy,
    /// Fail with `ContractError::NotFound`, as a real node would.
    NotFound,
}

impl FromStr for UnknownFunctionPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "truthy" => Ok(Self::Truthy),
            "not-found" | "strict" => Ok(Self::NotFound),
            other => Err(format!("unknown function policy: {other}")),
        }
    }
}

/// In-process stand-in for a contract node.
///
/// Balances and transaction ids are random; seed with [`Self::with_seed`]
/// for reproducible answers.
pub struct SimulatedContractCaller {
    rng: Mutex<StdRng>,
    unknown_function: UnknownFunctionPolicy,
}

impl Default for SimulatedContractCaller {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedContractCaller {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            rng: Mutex::new(rng),
            unknown_function: UnknownFunctionPolicy::default(),
        }
    }

    pub fn with_unknown_function_policy(mut self, policy: UnknownFunctionPolicy) -> Self {
        self.unknown_function = policy;
        self
    }

    fn with_rng<R>(&self, f: impl FnOnce(&mut StdRng) -> R) -> R {
        let mut guard = self
            .rng
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }

    fn answer(&self, req: &ContractCallRequest) -> Result<TypedValue, ContractError> {
        match (req.contract_name.as_str(), req.function_name.as_str()) {
            ("rws", "get-balance") => {
                let balance = self.with_rng(|rng| rng.gen_range(100..1000));
                Ok(TypedValue::uint(balance))
            }
            ("rws", "get-asset") => Ok(asset_tuple(req)),
            ("rws", "get-admin") => Ok(TypedValue::ok(TypedValue::principal(
                req.contract_address.clone(),
            ))),
            ("nft", "get-owner") => Ok(nft_owner(req)),
            ("nft-marketplace", "get-listing") => Ok(listing(req)),
            _ => match self.unknown_function {
                UnknownFunctionPolicy::Truthy => Ok(TypedValue::bool(true)),
                UnknownFunctionPolicy::NotFound => {
                    Err(ContractError::NotFound(req.qualified_name()))
                }
            },
        }
    }

    fn next_tx_id(&self) -> String {
        let mut bytes = [0_u8; 32];
        self.with_rng(|rng| rng.fill_bytes(&mut bytes));
        format!("0x{}", hex_lower(&bytes))
    }
}

#[async_trait]
impl ContractCaller for SimulatedContractCaller {
    fn backend(&self) -> &str {
        SIMULATED
    }

    async fn call_read_only(
        &self,
        req: ContractCallRequest,
    ) -> Result<ContractCallResult, ContractError> {
        debug!("simulating read of {}", req.qualified_name());
        self.answer(&req).map(ContractCallResult::read)
    }

    async fn call_write(
        &self,
        req: ContractCallRequest,
    ) -> Result<ContractCallResult, ContractError> {
        debug!("simulating write to {}", req.qualified_name());
        let tx_id = self.next_tx_id();
        Ok(ContractCallResult::write(TypedValue::bool(true), tx_id))
    }
}

fn uint_arg(req: &ContractCallRequest, index: usize) -> u64 {
    req.arg(index).and_then(TypedValue::as_uint).unwrap_or(0)
}

fn nft_owner(req: &ContractCallRequest) -> TypedValue {
    let token_id = uint_arg(req, 0);
    let owner = if token_id % 2 == 0 {
        req.sender_address.clone()
    } else {
        Some(FOREIGN_OWNER.to_owned())
    };

    match owner {
        Some(address) => TypedValue::some(TypedValue::principal(address)),
        None => TypedValue::none(),
    }
}

fn asset_tuple(req: &ContractCallRequest) -> TypedValue {
    let owner = req
        .arg(0)
        .and_then(TypedValue::as_principal)
        .unwrap_or("unknown")
        .to_owned();
    let asset_id = uint_arg(req, 1);

    TypedValue::tuple([
        ("id", TypedValue::uint(asset_id)),
        ("owner", TypedValue::principal(owner)),
        (
            "name",
            TypedValue::string_utf8(format!("Property Asset {asset_id}")),
        ),
        (
            "value",
            TypedValue::uint(50_000_u64.saturating_add(asset_id.saturating_mul(10_000))),
        ),
    ])
}

fn listing(req: &ContractCallRequest) -> TypedValue {
    let listing_id = uint_arg(req, 0);
    if !LISTING_IDS.contains(&listing_id) {
        return TypedValue::none();
    }

    TypedValue::tuple([
        ("id", TypedValue::uint(listing_id)),
        ("tokenId", TypedValue::uint(listing_id * 2)),
        ("maker", TypedValue::principal(req.contract_address.clone())),
        ("price", TypedValue::uint(listing_id * 1_000)),
        ("expiry", TypedValue::uint(10_000 + listing_id * 144)),
        ("isCancelled", TypedValue::bool(false)),
    ])
}

fn hex_lower(bytes: &[u8]) -> String {
    let mut output = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        output.push_str(&format!("{byte:02x}"));
    }
    output
}
