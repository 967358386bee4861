use std::time::Duration;

use async_trait::async_trait;
use lotbridge_core::config::LlmConfig;
use lotbridge_core::errors::LlmServiceError;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::conversation::{AssistantTurn, Turn};
use crate::tools::ToolSpec;

/// Fixed generation parameters applied to every completion call.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl From<&LlmConfig> for GenerationSettings {
    fn from(config: &LlmConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Turn>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolSpec>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(settings: &GenerationSettings, messages: &[Turn], tools: Vec<ToolSpec>) -> Self {
        Self {
            model: settings.model.clone(),
            messages: messages.to_vec(),
            tools,
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<AssistantTurn, LlmServiceError>;
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: AssistantTurn,
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct ChatCompletionsClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: SecretString,
}

impl ChatCompletionsClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, reqwest::Error> {
        let client =
            reqwest::Client::builder().timeout(Duration::from_secs(config.timeout_secs)).build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl LlmClient for ChatCompletionsClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<AssistantTurn, LlmServiceError> {
        debug!(
            event_name = "agent.llm.request",
            model = %request.model,
            message_count = request.messages.len(),
            tool_count = request.tools.len(),
            "sending chat completion request"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(request)
            .send()
            .await
            .map_err(|error| LlmServiceError::Transport(error.to_string()))?;

        let status = response.status();
        let body =
            response.text().await.map_err(|error| LlmServiceError::Transport(error.to_string()))?;

        if !status.is_success() {
            return Err(LlmServiceError::Status { status: status.as_u16(), body });
        }

        let decoded: CompletionResponse = serde_json::from_str(&body)
            .map_err(|error| LlmServiceError::MalformedResponse(error.to_string()))?;

        let choice = decoded.choices.into_iter().next().ok_or(LlmServiceError::EmptyChoices)?;
        debug!(
            event_name = "agent.llm.response",
            tool_call_count = choice.message.tool_calls.len(),
            has_content = choice.message.answer_text().is_some(),
            "received chat completion response"
        );

        Ok(choice.message)
    }
}

#[cfg(test)]
mod tests {
    use lotbridge_core::config::AppConfig;
    use lotbridge_core::errors::LlmServiceError;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::{ChatCompletionsClient, CompletionRequest, GenerationSettings, LlmClient};
    use crate::conversation::Transcript;
    use crate::tools::ToolRegistry;

    fn client_for(server: &MockServer) -> ChatCompletionsClient {
        let mut config = AppConfig::default().llm;
        config.api_key = "sk-test".to_owned().into();
        config.base_url = format!("{}/v1/", server.uri());
        ChatCompletionsClient::from_config(&config).expect("client builds")
    }

    fn request(with_tools: bool) -> CompletionRequest {
        let settings = GenerationSettings {
            model: "asi1-mini".to_owned(),
            temperature: 0.7,
            max_tokens: 1024,
        };
        let transcript = Transcript::from_user_query("list all lots");
        let tools = if with_tools { ToolRegistry::default().catalogue() } else { Vec::new() };
        CompletionRequest::new(&settings, transcript.turns(), tools)
    }

    #[test]
    fn request_omits_tools_when_catalogue_is_empty() {
        let without = serde_json::to_value(request(false)).expect("serialize");
        let with = serde_json::to_value(request(true)).expect("serialize");

        assert!(without.get("tools").is_none());
        assert_eq!(with["tools"].as_array().map(Vec::len), Some(2));
        assert_eq!(with["model"], "asi1-mini");
        assert_eq!(with["max_tokens"], 1024);
    }

    #[tokio::test]
    async fn decodes_tool_calls_from_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({"model": "asi1-mini"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl-1",
                "choices": [{
                    "index": 0,
                    "message": {
                        "role": "assistant",
                        "content": null,
                        "refusal": null,
                        "tool_calls": [{
                            "index": 0,
                            "id": "call_1",
                            "type": "function",
                            "function": {"name": "get_all_lots", "arguments": "{}"}
                        }]
                    },
                    "finish_reason": "tool_calls"
                }]
            })))
            .mount(&server)
            .await;

        let turn = client_for(&server).complete(&request(true)).await.expect("completion");

        assert_eq!(turn.tool_calls.len(), 1);
        assert_eq!(turn.tool_calls[0].id, "call_1");
        assert_eq!(turn.tool_calls[0].function.name, "get_all_lots");
        assert_eq!(turn.content, None);
        assert!(turn.extra.contains_key("refusal"));
        assert!(!turn.extra.contains_key("role"));
        assert_eq!(turn.tool_calls[0].extra.get("index"), Some(&json!(0)));
    }

    #[tokio::test]
    async fn non_success_status_is_reported_with_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let error = client_for(&server).complete(&request(false)).await.expect_err("401");

        assert_eq!(
            error,
            LlmServiceError::Status { status: 401, body: "invalid api key".to_owned() }
        );
    }

    #[tokio::test]
    async fn empty_choices_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let error = client_for(&server).complete(&request(false)).await.expect_err("no choices");

        assert_eq!(error, LlmServiceError::EmptyChoices);
    }

    #[tokio::test]
    async fn undecodable_body_is_malformed_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
            .mount(&server)
            .await;

        let error = client_for(&server).complete(&request(false)).await.expect_err("html body");

        assert!(matches!(error, LlmServiceError::MalformedResponse(_)));
    }
}
