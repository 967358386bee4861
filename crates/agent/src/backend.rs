use std::time::Duration;

use async_trait::async_trait;
use lotbridge_core::config::BackendConfig;
use lotbridge_core::errors::{BackendError, ToolError};
use reqwest::header::{HeaderMap, HeaderValue, HOST};
use serde_json::{json, Value};
use tracing::debug;

use crate::tools::LotTool;

/// Performs exactly one backend call per invocation and returns the
/// registry's JSON body untouched.
#[async_trait]
pub trait BackendInvoker: Send + Sync {
    async fn invoke(&self, tool: LotTool, arguments: &Value) -> Result<Value, ToolError>;
}

/// Request body for a tool call, validated against the tool's argument shape.
pub fn request_body(tool: LotTool, arguments: &Value) -> Result<Value, ToolError> {
    match tool {
        LotTool::GetAllLots => Ok(json!({})),
        LotTool::GetLot => {
            let lot_id = lot_id_argument(tool, arguments)?;
            Ok(json!({ "lot_id": lot_id }))
        }
    }
}

fn lot_id_argument(tool: LotTool, arguments: &Value) -> Result<u64, ToolError> {
    let Some(raw) = arguments.get("lot_id") else {
        return Err(ToolError::invalid_arguments(tool.name(), "missing required field `lot_id`"));
    };

    if let Some(lot_id) = raw.as_u64() {
        return Ok(lot_id);
    }

    // The schema advertises `number`, so models sometimes send `7.0`.
    match raw.as_f64() {
        Some(value) if value >= 0.0 && value.fract() == 0.0 && value < u64::MAX as f64 => {
            Ok(value as u64)
        }
        _ => Err(ToolError::invalid_arguments(
            tool.name(),
            format!("`lot_id` must be a non-negative integer, got {raw}"),
        )),
    }
}

/// HTTP client for the coffee-lot registry.
pub struct LotRegistryClient {
    client: reqwest::Client,
    base_url: String,
}

impl LotRegistryClient {
    pub fn from_config(config: &BackendConfig) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        if let Some(canister_id) = &config.canister_id {
            if let Ok(host) = HeaderValue::from_str(&format!("{canister_id}.localhost")) {
                headers.insert(HOST, host);
            }
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, base_url: config.base_url.trim_end_matches('/').to_owned() })
    }

    pub fn operation_url(&self, tool: LotTool) -> String {
        format!("{}/{}", self.base_url, tool.name())
    }
}

#[async_trait]
impl BackendInvoker for LotRegistryClient {
    async fn invoke(&self, tool: LotTool, arguments: &Value) -> Result<Value, ToolError> {
        let body = request_body(tool, arguments)?;
        let url = self.operation_url(tool);
        debug!(event_name = "agent.backend.request", tool = tool.name(), url = %url, "calling lot registry");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|error| BackendError::Transport(error.to_string()))?;

        let status = response.status();
        let text =
            response.text().await.map_err(|error| BackendError::Transport(error.to_string()))?;

        if !status.is_success() {
            return Err(BackendError::Status { status: status.as_u16(), body: text }.into());
        }

        serde_json::from_str(&text)
            .map_err(|error| BackendError::MalformedBody(error.to_string()).into())
    }
}

#[cfg(test)]
mod tests {
    use lotbridge_core::config::BackendConfig;
    use lotbridge_core::errors::{BackendError, ToolError};
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::{request_body, BackendInvoker, LotRegistryClient};
    use crate::tools::LotTool;

    fn client_for(base_url: String, canister_id: Option<&str>) -> LotRegistryClient {
        LotRegistryClient::from_config(&BackendConfig {
            base_url,
            canister_id: canister_id.map(str::to_owned),
            timeout_secs: 5,
        })
        .expect("client builds")
    }

    #[test]
    fn get_lot_accepts_integral_numbers_only() {
        assert_eq!(
            request_body(LotTool::GetLot, &json!({"lot_id": 42})).expect("integer"),
            json!({"lot_id": 42})
        );
        assert_eq!(
            request_body(LotTool::GetLot, &json!({"lot_id": 7.0})).expect("integral float"),
            json!({"lot_id": 7})
        );

        for bad in [
            json!({}),
            json!({"lot_id": "7"}),
            json!({"lot_id": -1}),
            json!({"lot_id": 1.5}),
            json!({"lot_id": 18_446_744_073_709_551_616.0_f64}),
        ]
        {
            let error = request_body(LotTool::GetLot, &bad).expect_err("rejected");
            assert_eq!(error.error_class(), "tool_argument", "{bad} should be rejected");
        }
    }

    #[test]
    fn get_all_lots_ignores_arguments() {
        assert_eq!(
            request_body(LotTool::GetAllLots, &json!({"unused": true})).expect("body"),
            json!({})
        );
    }

    #[tokio::test]
    async fn get_lot_round_trips_record_unchanged() {
        let server = MockServer::start().await;
        let record = json!({
            "id": 42,
            "farmer": "Ana Morales",
            "harvest_date": "2025-11-02",
            "location": "Huila, Colombia",
            "status": "roasted",
            "updates": [{"status": "harvested", "details": "picked", "timestamp": 1, "updated_by": "aaaaa-aa"}],
            "timestamp": 1730000000
        });
        Mock::given(method("POST"))
            .and(path("/get_lot"))
            .and(header("host", "uxrrr-q7777-77774-qaaaq-cai.localhost"))
            .and(body_json(json!({"lot_id": 42})))
            .respond_with(ResponseTemplate::new(200).set_body_json(record.clone()))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(server.uri(), Some("uxrrr-q7777-77774-qaaaq-cai"));
        let result = client.invoke(LotTool::GetLot, &json!({"lot_id": 42})).await.expect("lot");

        assert_eq!(result, record);
    }

    #[tokio::test]
    async fn get_all_lots_posts_empty_object() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/get_all_lots"))
            .and(body_json(json!({})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}, {"id": 2}])))
            .expect(1)
            .mount(&server)
            .await;

        let result = client_for(format!("{}/", server.uri()), None)
            .invoke(LotTool::GetAllLots, &json!({}))
            .await
            .expect("lots");

        assert_eq!(result.as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn non_success_status_is_backend_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/get_lot"))
            .respond_with(ResponseTemplate::new(404).set_body_string("lot not found"))
            .mount(&server)
            .await;

        let error = client_for(server.uri(), None)
            .invoke(LotTool::GetLot, &json!({"lot_id": 99}))
            .await
            .expect_err("404");

        assert_eq!(
            error,
            ToolError::Backend(BackendError::Status { status: 404, body: "lot not found".to_owned() })
        );
    }

    #[tokio::test]
    async fn unreachable_backend_is_transport_error() {
        let error = client_for("http://127.0.0.1:9".to_owned(), None)
            .invoke(LotTool::GetAllLots, &json!({}))
            .await
            .expect_err("connection refused");

        assert!(matches!(error, ToolError::Backend(BackendError::Transport(_))));
    }

    #[tokio::test]
    async fn invalid_arguments_never_reach_the_backend() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let error = client_for(server.uri(), None)
            .invoke(LotTool::GetLot, &json!({"lot": 1}))
            .await
            .expect_err("missing lot_id");

        assert_eq!(error.error_class(), "tool_argument");
    }
}
