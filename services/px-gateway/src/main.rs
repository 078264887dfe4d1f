use anyhow::{Context, anyhow};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use px_api_types::ErrorResponse;
use px_contract_client::{CALL_READ_PATH, CALL_WRITE_PATH, ContractCaller};
use px_contract_sim::{SimulatedContractCaller, UnknownFunctionPolicy};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

mod contracts;

const SERVICE: &str = "px-gateway";
const DEFAULT_GATEWAY_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Serialize)]
struct HealthResponse {
    service: &'static str,
    status: &'static str,
    backend: String,
}

#[derive(Debug, Serialize)]
struct VersionResponse {
    service: &'static str,
    version: &'static str,
}

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Clone)]
struct AppState {
    caller: Arc<dyn ContractCaller>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let state = AppState {
        caller: Arc::new(simulator_from_env()?),
    };

    let addr: SocketAddr = env_or("PX_GATEWAY_ADDR", DEFAULT_GATEWAY_ADDR)
        .parse()
        .context("invalid PX_GATEWAY_ADDR")?;
    info!(
        "{} listening on {} (backend: {})",
        SERVICE,
        addr,
        state.caller.backend()
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/version", get(version))
        .route(CALL_READ_PATH, post(contracts::call_read))
        .route(CALL_WRITE_PATH, post(contracts::call_write))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn simulator_from_env() -> anyhow::Result<SimulatedContractCaller> {
    simulator_from_lookup(env_var)
}

fn simulator_from_lookup<F>(lookup: F) -> anyhow::Result<SimulatedContractCaller>
where
    F: Fn(&str) -> Option<String>,
{
    let caller = match lookup("PX_SIM_SEED") {
        Some(seed) => {
            let seed: u64 = seed.parse().context("invalid PX_SIM_SEED")?;
            SimulatedContractCaller::with_seed(seed)
        }
        None => SimulatedContractCaller::new(),
    };

    let policy = match lookup("PX_UNKNOWN_FUNCTION") {
        Some(value) => value
            .parse::<UnknownFunctionPolicy>()
            .map_err(|err: String| anyhow!("invalid PX_UNKNOWN_FUNCTION: {err}"))?,
        None => UnknownFunctionPolicy::default(),
    };

    Ok(caller.with_unknown_function_policy(policy))
}

/// Trimmed variable value; blank counts as unset.
fn env_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    env_var(key).unwrap_or_else(|| default.to_owned())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    info!("{} shutting down", SERVICE);
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        service: SERVICE,
        status: "ok",
        backend: state.caller.backend().to_owned(),
    })
}

async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        service: SERVICE,
        version: env!("CARGO_PKG_VERSION"),
    })
}

fn error_response(status: StatusCode, message: impl std::fmt::Display) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

fn bad_request(message: impl std::fmt::Display) -> ApiError {
    error_response(StatusCode::BAD_REQUEST, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use px_api_types::{ContractCallRequest, TypedValue};

    fn lookup(vars: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key: &str| {
            vars.iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        }
    }

    #[tokio::test]
    async fn blank_settings_fall_back_to_defaults() -> anyhow::Result<()> {
        let caller = simulator_from_lookup(lookup(&[
            ("PX_UNKNOWN_FUNCTION", "  "),
            ("PX_SIM_SEED", ""),
        ]))?;

        let req = ContractCallRequest::new("ST1", "rws", "get-everything", vec![]);
        let result = caller.call_read_only(req).await?;
        assert_eq!(result.value, TypedValue::bool(true));
        Ok(())
    }

    #[tokio::test]
    async fn strict_policy_and_seed_are_applied() -> anyhow::Result<()> {
        let vars = &[("PX_UNKNOWN_FUNCTION", "not-found"), ("PX_SIM_SEED", "42")];
        let first = simulator_from_lookup(lookup(vars))?;
        let second = simulator_from_lookup(lookup(vars))?;

        let unknown = ContractCallRequest::new("ST1", "rws", "get-everything", vec![]);
        assert!(first.call_read_only(unknown).await.is_err());

        let balance = ContractCallRequest::new("ST1", "rws", "get-balance", vec![]);
        assert_eq!(
            first.call_read_only(balance.clone()).await?,
            second.call_read_only(balance).await?
        );
        Ok(())
    }

    #[test]
    fn bad_settings_are_rejected() {
        assert!(simulator_from_lookup(lookup(&[("PX_SIM_SEED", "soon")])).is_err());
        assert!(simulator_from_lookup(lookup(&[("PX_UNKNOWN_FUNCTION", "maybe")])).is_err());
    }
}
