use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use px_api_types::{ContractCallRequest, ContractCallResult};
use px_contract_client::{ContractCaller, ContractError};
use tracing::{info, warn};

use crate::{ApiError, ApiResult, AppState, bad_request, error_response};

pub(crate) async fn call_read(
    State(state): State<AppState>,
    payload: Result<Json<ContractCallRequest>, JsonRejection>,
) -> ApiResult<ContractCallResult> {
    let request = validate(payload)?;
    let qualified = request.qualified_name();

    let result = state
        .caller
        .call_read_only(request)
        .await
        .map_err(|err| contract_error(&qualified, err))?;
    Ok(Json(result))
}

pub(crate) async fn call_write(
    State(state): State<AppState>,
    payload: Result<Json<ContractCallRequest>, JsonRejection>,
) -> ApiResult<ContractCallResult> {
    let request = validate(payload)?;
    if request.sender_address.is_none() {
        return Err(bad_request("senderAddress is required for state-changing calls"));
    }
    let qualified = request.qualified_name();

    let result = state
        .caller
        .call_write(request)
        .await
        .map_err(|err| contract_error(&qualified, err))?;
    info!(
        "accepted {} (tx {})",
        qualified,
        result.tx_id.as_deref().unwrap_or("-")
    );
    Ok(Json(result))
}

fn validate(
    payload: Result<Json<ContractCallRequest>, JsonRejection>,
) -> Result<ContractCallRequest, ApiError> {
    let Json(request) = payload.map_err(|rejection| bad_request(rejection.body_text()))?;

    for (field, value) in [
        ("contractAddress", &request.contract_address),
        ("contractName", &request.contract_name),
        ("functionName", &request.function_name),
    ] {
        if value.trim().is_empty() {
            return Err(bad_request(format!("{field} must not be empty")));
        }
    }

    Ok(request)
}

fn contract_error(qualified: &str, err: ContractError) -> ApiError {
    warn!("contract call {} failed: {}", qualified, err);
    match err {
        ContractError::NotFound(_) => error_response(StatusCode::NOT_FOUND, err),
        ContractError::Rejected { status, message } => error_response(
            StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
            message,
        ),
        ContractError::Transport(_) | ContractError::Malformed(_) => {
            error_response(StatusCode::BAD_GATEWAY, err)
        }
    }
}
