use crate::models::{
    HealthStatus, LogEntry, Operation, OperationRequest, OperationResponse, PageWindow,
};
use async_trait::async_trait;
use derive_more::derive::{Display, Error};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Everything that can go wrong between issuing a request and holding a parsed body.
#[derive(Debug, Display, Error)]
pub enum ApiError {
    /// The service answered with a status outside the 2xx range.
    #[display("HTTP {status}")]
    Transport { status: u16 },
    /// The request never completed.
    #[display("network error: {source}")]
    Network { source: reqwest::Error },
    /// The body was not JSON, or lacked the expected fields.
    #[display("invalid response body: {message}")]
    Parse { message: String },
}

impl ApiError {
    fn parse(err: serde_json::Error) -> Self {
        ApiError::Parse {
            message: err.to_string(),
        }
    }
}

/// The single choke point for talking to the service. `ApiClient` is the
/// real implementation; tests substitute a scripted double.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `payload` as JSON to `/api/v1/{endpoint}`.
    async fn call(&self, endpoint: &str, payload: Value) -> Result<Value, ApiError>;

    /// GET `/api/v1/{endpoint}` with `params` in the query string.
    async fn query(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Value, ApiError>;
}

pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/api/v1/{}", self.base_url, endpoint)
    }

    async fn read_json(response: Response) -> Result<Value, ApiError> {
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Transport {
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| ApiError::Network { source })?;
        serde_json::from_slice(&body).map_err(ApiError::parse)
    }
}

#[async_trait]
impl Transport for ApiClient {
    async fn call(&self, endpoint: &str, payload: Value) -> Result<Value, ApiError> {
        let url = self.endpoint_url(endpoint);
        log::debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|source| ApiError::Network { source })?;
        Self::read_json(response).await
    }

    async fn query(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Value, ApiError> {
        let mut url = self.endpoint_url(endpoint);
        let params: Vec<String> = params
            .iter()
            .map(|(name, value)| format!("{}={}", name, urlencoding::encode(value)))
            .collect();

        if !params.is_empty() {
            url.push('?');
            url.push_str(&params.join("&"));
        }
        log::debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| ApiError::Network { source })?;
        Self::read_json(response).await
    }
}

fn decode<T: DeserializeOwned>(body: Value) -> Result<T, ApiError> {
    serde_json::from_value(body).map_err(ApiError::parse)
}

/// Runs one encrypt or decrypt round trip.
pub async fn perform(
    transport: &dyn Transport,
    operation: Operation,
    request: &OperationRequest,
) -> Result<OperationResponse, ApiError> {
    let payload = serde_json::to_value(request).map_err(ApiError::parse)?;
    let body = transport.call(operation.endpoint(), payload).await?;
    decode(body)
}

/// Fetches the slice of the audit log described by `window`.
pub async fn fetch_logs(
    transport: &dyn Transport,
    window: PageWindow,
) -> Result<Vec<LogEntry>, ApiError> {
    let body = transport.query("logs", &window.query_params()).await?;
    decode(body)
}

pub async fn check_health(transport: &dyn Transport) -> Result<HealthStatus, ApiError> {
    let body = transport.query("health", &[]).await?;
    decode(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Json, Router,
        extract::Query,
        http::StatusCode,
        response::IntoResponse,
        routing::{get, post},
    };
    use serde_json::json;
    use std::collections::HashMap;

    const STORED_LOGS: u64 = 3;

    async fn encrypt(Json(request): Json<OperationRequest>) -> Json<Value> {
        Json(json!({ "data": format!("ENC({}|{})", request.key, request.data) }))
    }

    async fn decrypt(Json(request): Json<OperationRequest>) -> axum::response::Response {
        if request.key == "boom" {
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
        let prefix = format!("ENC({}|", request.key);
        match request
            .data
            .strip_prefix(&prefix)
            .and_then(|rest| rest.strip_suffix(')'))
        {
            Some(plain) => Json(json!({ "data": plain })).into_response(),
            None => StatusCode::BAD_REQUEST.into_response(),
        }
    }

    async fn logs(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
        let size: u64 = params.get("size").and_then(|v| v.parse().ok()).unwrap_or(0);
        let offset: u64 = params.get("offset").and_then(|v| v.parse().ok()).unwrap_or(0);
        let entries: Vec<Value> = (offset..STORED_LOGS.min(offset.saturating_add(size)))
            .map(|i| {
                json!({
                    "id": i.to_string(),
                    "timestamp": 1_700_000_000 + i,
                    "ip": "127.0.0.1",
                    "data": "POST /api/v1/encrypt",
                })
            })
            .collect();
        Json(Value::Array(entries))
    }

    async fn spawn_service() -> String {
        let app = Router::new()
            .route("/api/v1/encrypt", post(encrypt))
            .route("/api/v1/decrypt", post(decrypt))
            .route("/api/v1/logs", get(logs))
            .route("/api/v1/health", get(|| async { Json(json!({ "status": "ok" })) }))
            .route("/api/v1/garbage", post(|| async { "definitely not json" }))
            .route("/api/v1/echo", get(|Query(params): Query<HashMap<String, String>>| async move {
                Json(json!(params))
            }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn request(key: &str, data: &str) -> OperationRequest {
        OperationRequest {
            key: key.to_string(),
            data: data.to_string(),
        }
    }

    #[tokio::test]
    async fn encrypt_then_decrypt_round_trips() {
        let client = ApiClient::new(spawn_service().await);

        let cipher = perform(&client, Operation::Encrypt, &request("k", "hello"))
            .await
            .unwrap();
        assert_eq!(cipher.data, "ENC(k|hello)");

        let plain = perform(&client, Operation::Decrypt, &request("k", &cipher.data))
            .await
            .unwrap();
        assert_eq!(plain.data, "hello");
    }

    #[tokio::test]
    async fn non_success_status_is_a_transport_error() {
        let client = ApiClient::new(spawn_service().await);

        let err = perform(&client, Operation::Decrypt, &request("boom", "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Transport { status: 500 }));
        assert_eq!(err.to_string(), "HTTP 500");
    }

    #[tokio::test]
    async fn unknown_endpoint_reports_status() {
        let client = ApiClient::new(spawn_service().await);

        let err = client.call("missing", json!({})).await.unwrap_err();
        assert!(matches!(err, ApiError::Transport { status: 404 }));
    }

    #[tokio::test]
    async fn non_json_body_is_a_parse_error() {
        let client = ApiClient::new(spawn_service().await);

        let err = client.call("garbage", json!({})).await.unwrap_err();
        assert!(matches!(err, ApiError::Parse { .. }));
    }

    #[tokio::test]
    async fn missing_fields_are_a_parse_error() {
        let client = ApiClient::new(spawn_service().await);

        // health answers with `status`, not `data`
        let body = client.query("health", &[]).await.unwrap();
        let err = decode::<OperationResponse>(body).unwrap_err();
        assert!(matches!(err, ApiError::Parse { .. }));
    }

    #[tokio::test]
    async fn unreachable_service_is_a_network_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = ApiClient::new(format!("http://{}", addr));
        let err = check_health(&client).await.unwrap_err();
        assert!(matches!(err, ApiError::Network { .. }));
    }

    #[tokio::test]
    async fn fetch_logs_sends_window_in_query_string() {
        let client = ApiClient::new(spawn_service().await);

        let page = fetch_logs(&client, PageWindow { size: 2, offset: 1 }).await.unwrap();
        let ids: Vec<&str> = page.iter().map(|entry| entry.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);

        let past_end = fetch_logs(&client, PageWindow { size: 20, offset: 40 }).await.unwrap();
        assert!(past_end.is_empty());
    }

    #[tokio::test]
    async fn query_values_are_url_encoded() {
        let client = ApiClient::new(spawn_service().await);

        let body = client
            .query("echo", &[("q", "a b&c=d".to_string())])
            .await
            .unwrap();
        assert_eq!(body, json!({ "q": "a b&c=d" }));
    }

    #[tokio::test]
    async fn health_probe_reads_status() {
        let client = ApiClient::new(spawn_service().await);
        assert_eq!(check_health(&client).await.unwrap().status, "ok");
    }
}
