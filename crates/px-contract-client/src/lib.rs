use async_trait::async_trait;
use px_api_types::{ContractCallRequest, ContractCallResult};
use thiserror::Error;

pub mod marshal;

pub use marshal::{is_stacks_address, marshal_arg, marshal_args};

/// HTTP routes of the JSON contract-call boundary.
pub const CALL_READ_PATH: &str = "/v1/contracts/call-read";
pub const CALL_WRITE_PATH: &str = "/v1/contracts/call";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    #[error("contract function not found: {0}")]
    NotFound(String),
    #[error("contract call rejected (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("contract call transport failed: {0}")]
    Transport(String),
    #[error("malformed contract response: {0}")]
    Malformed(String),
}

/// Boundary between the wallet session and whatever answers contract calls.
///
/// Implementations must not touch session state; the session interprets the
/// returned value itself.
#[async_trait]
pub trait ContractCaller: Send + Sync {
    /// Short name of the backend, used in logs.
    fn backend(&self) -> &str;

    async fn call_read_only(
        &self,
        req: ContractCallRequest,
    ) -> Result<ContractCallResult, ContractError>;

    /// Submits a state-changing call. Results carry a transaction id.
    async fn call_write(
        &self,
        req: ContractCallRequest,
    ) -> Result<ContractCallResult, ContractError>;
}
