use anyhow::{Context, Result};
use async_trait::async_trait;
use px_api_types::{ContractCallRequest, ContractCallResult, ErrorResponse};
use px_contract_client::{CALL_READ_PATH, CALL_WRITE_PATH, ContractCaller, ContractError};
use std::time::Duration;
use tracing::warn;

mod ipfs;

pub use ipfs::{DEFAULT_IPFS_GATEWAY, IpfsClient};

pub const NETWORK: &str = "network";
pub const DEFAULT_NODE_URL: &str = "http://localhost:8080";

/// Contract caller that talks to a node (or `px-gateway`) over HTTP.
pub struct HttpContractCaller {
    endpoint: String,
    http: reqwest::Client,
}

impl HttpContractCaller {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let endpoint = endpoint.into();
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("build contract node HTTP client")?;

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post(
        &self,
        path: &str,
        req: &ContractCallRequest,
    ) -> Result<ContractCallResult, ContractError> {
        let url = format!("{}{}", self.endpoint, path);
        let response = self
            .http
            .post(&url)
            .json(req)
            .send()
            .await
            .map_err(|err| ContractError::Transport(err.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ContractError::NotFound(req.qualified_name()));
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ErrorResponse>(&text) {
                Ok(body) => body.error,
                Err(_) => text,
            };
            return Err(ContractError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<ContractCallResult>()
            .await
            .map_err(|err| ContractError::Malformed(err.to_string()))
    }
}

#[async_trait]
impl ContractCaller for HttpContractCaller {
    fn backend(&self) -> &str {
        NETWORK
    }

    async fn call_read_only(
        &self,
        req: ContractCallRequest,
    ) -> Result<ContractCallResult, ContractError> {
        self.post(CALL_READ_PATH, &req).await
    }

    async fn call_write(
        &self,
        req: ContractCallRequest,
    ) -> Result<ContractCallResult, ContractError> {
        let result = self.post(CALL_WRITE_PATH, &req).await?;
        if result.tx_id.is_none() {
            warn!("node accepted {} without a txId", req.qualified_name());
            return Err(ContractError::Malformed(
                "write result is missing txId".to_owned(),
            ));
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::StatusCode, response::IntoResponse, routing::post};
    use px_api_types::TypedValue;

    async fn fake_read(Json(req): Json<ContractCallRequest>) -> axum::response::Response {
        match req.function_name.as_str() {
            "get-balance" => {
                Json(ContractCallResult::read(TypedValue::uint(500))).into_response()
            }
            "echo-args" => Json(ContractCallResult::read(TypedValue::tuple([(
                "count",
                TypedValue::uint(req.function_args.len() as u64),
            )])))
            .into_response(),
            "broken" => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "node exploded".to_owned(),
                }),
            )
                .into_response(),
            "garbage" => (StatusCode::OK, "definitely not json").into_response(),
            _ => StatusCode::NOT_FOUND.into_response(),
        }
    }

    async fn fake_write(Json(req): Json<ContractCallRequest>) -> axum::response::Response {
        if req.function_name == "no-tx" {
            return Json(ContractCallResult::read(TypedValue::bool(true))).into_response();
        }
        Json(ContractCallResult::write(TypedValue::bool(true), "0xfeed")).into_response()
    }

    async fn spawn_node() -> String {
        let app = Router::new()
            .route(CALL_READ_PATH, post(fake_read))
            .route(CALL_WRITE_PATH, post(fake_write));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve test node");
        });
        format!("http://{addr}/")
    }

    async fn caller() -> HttpContractCaller {
        let endpoint = spawn_node().await;
        HttpContractCaller::new(endpoint, Duration::from_secs(5)).expect("client")
    }

    fn request(function: &str) -> ContractCallRequest {
        ContractCallRequest::new("ST1", "rws", function, vec![TypedValue::uint(1)])
    }

    #[tokio::test]
    async fn read_only_call_decodes_value() {
        let caller = caller().await;
        assert!(!caller.endpoint().ends_with('/'));

        let result = caller
            .call_read_only(request("get-balance"))
            .await
            .expect("balance");
        assert_eq!(result.value, TypedValue::uint(500));
        assert_eq!(result.tx_id, None);
    }

    #[tokio::test]
    async fn arguments_reach_the_node() {
        let caller = caller().await;
        let mut req = request("echo-args");
        req.function_args.push(TypedValue::none());

        let result = caller.call_read_only(req).await.expect("echo");
        assert_eq!(result.value.field("count"), Some(&TypedValue::uint(2)));
    }

    #[tokio::test]
    async fn missing_function_maps_to_not_found() {
        let caller = caller().await;
        let err = caller
            .call_read_only(request("no-such-fn"))
            .await
            .expect_err("not found");
        assert_eq!(err, ContractError::NotFound("ST1.rws::no-such-fn".to_owned()));
    }

    #[tokio::test]
    async fn node_errors_carry_message() {
        let caller = caller().await;
        let err = caller
            .call_read_only(request("broken"))
            .await
            .expect_err("rejected");
        assert_eq!(
            err,
            ContractError::Rejected {
                status: 500,
                message: "node exploded".to_owned(),
            }
        );
    }

    #[tokio::test]
    async fn undecodable_body_is_malformed() {
        let caller = caller().await;
        let err = caller
            .call_read_only(request("garbage"))
            .await
            .expect_err("malformed");
        assert!(matches!(err, ContractError::Malformed(_)));
    }

    #[tokio::test]
    async fn writes_require_tx_id() {
        let caller = caller().await;
        let ok = caller.call_write(request("list-asset")).await.expect("write");
        assert_eq!(ok.tx_id.as_deref(), Some("0xfeed"));

        let err = caller
            .call_write(request("no-tx"))
            .await
            .expect_err("missing tx id");
        assert!(matches!(err, ContractError::Malformed(_)));
    }

    #[tokio::test]
    async fn unreachable_node_is_transport_error() {
        let caller =
            HttpContractCaller::new("http://127.0.0.1:1", Duration::from_secs(2))
                .expect("client");
        let err = caller
            .call_read_only(request("get-balance"))
            .await
            .expect_err("transport");
        assert!(matches!(err, ContractError::Transport(_)));
    }
}
