use std::sync::Arc;

use async_trait::async_trait;
use lotbridge_core::config::AppConfig;
use lotbridge_core::errors::{LlmServiceError, ToolError};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::backend::{BackendInvoker, LotRegistryClient};
use crate::conversation::{ToolCallRequest, ToolResult, Transcript};
use crate::llm::{ChatCompletionsClient, CompletionRequest, GenerationSettings, LlmClient};
use crate::tools::ToolRegistry;

pub const NO_INTENT_FALLBACK: &str = "I couldn't determine what coffee lot information you're looking for. Please try rephrasing your question.";

/// Turns a free-text question into a final answer. Implementations never
/// fail outward; errors come back as explanatory text.
#[async_trait]
pub trait QueryAnswerer: Send + Sync {
    async fn answer(&self, query: &str) -> String;
}

/// Drives the two completion calls for one query: a tool-selection turn with
/// the catalogue, sequential execution of the selected tools, and a final
/// narration turn without the catalogue.
pub struct ConversationOrchestrator {
    llm: Arc<dyn LlmClient>,
    backend: Arc<dyn BackendInvoker>,
    registry: ToolRegistry,
    settings: GenerationSettings,
}

impl ConversationOrchestrator {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        backend: Arc<dyn BackendInvoker>,
        registry: ToolRegistry,
        settings: GenerationSettings,
    ) -> Self {
        Self { llm, backend, registry, settings }
    }

    /// Wires the HTTP LLM and lot-registry clients with the full tool registry.
    pub fn from_config(config: &AppConfig) -> Result<Self, reqwest::Error> {
        let llm = ChatCompletionsClient::from_config(&config.llm)?;
        let backend = LotRegistryClient::from_config(&config.backend)?;
        Ok(Self::new(
            Arc::new(llm),
            Arc::new(backend),
            ToolRegistry::default(),
            GenerationSettings::from(&config.llm),
        ))
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    async fn run(&self, query: &str) -> Result<String, LlmServiceError> {
        let mut transcript = Transcript::from_user_query(query);

        let proposal = self
            .llm
            .complete(&CompletionRequest::new(
                &self.settings,
                transcript.turns(),
                self.registry.catalogue(),
            ))
            .await?;

        if proposal.tool_calls.is_empty() {
            info!(event_name = "agent.query.no_tool_calls", "model answered without tools");
            return Ok(proposal.answer_text().unwrap_or(NO_INTENT_FALLBACK).to_owned());
        }

        let tool_calls = proposal.tool_calls.clone();
        transcript.push_assistant(proposal);

        for call in &tool_calls {
            let result = self.execute(call).await;
            transcript.push_tool_result(result);
        }
        debug_assert_eq!(transcript.tool_turn_count(), tool_calls.len());

        let resolution = self
            .llm
            .complete(&CompletionRequest::new(&self.settings, transcript.turns(), Vec::new()))
            .await?;

        resolution.answer_text().map(str::to_owned).ok_or_else(|| {
            LlmServiceError::MalformedResponse("final answer carried no text content".to_owned())
        })
    }

    /// Always yields exactly one result for `call`, success or not.
    async fn execute(&self, call: &ToolCallRequest) -> ToolResult {
        match self.invoke(call).await {
            Ok(data) => ToolResult::success(&call.id, &data),
            Err(tool_error) => {
                warn!(
                    event_name = "agent.tool.failed",
                    tool_call_id = %call.id,
                    tool = %call.function.name,
                    error_class = tool_error.error_class(),
                    error = %tool_error,
                    "tool call failed; reporting failure to the model"
                );
                ToolResult::failure(&call.id, &tool_error)
            }
        }
    }

    async fn invoke(&self, call: &ToolCallRequest) -> Result<Value, ToolError> {
        let tool = self
            .registry
            .resolve(&call.function.name)
            .ok_or_else(|| ToolError::UnsupportedTool { name: call.function.name.clone() })?;
        let arguments = call.parsed_arguments()?;

        info!(
            event_name = "agent.tool.invoke",
            tool_call_id = %call.id,
            tool = tool.name(),
            arguments = %arguments,
            "executing tool call"
        );

        self.backend.invoke(tool, &arguments).await
    }
}

#[async_trait]
impl QueryAnswerer for ConversationOrchestrator {
    async fn answer(&self, query: &str) -> String {
        match self.run(query).await {
            Ok(answer) => answer,
            Err(llm_error) => {
                error!(
                    event_name = "agent.query.failed",
                    error = %llm_error,
                    "error processing query"
                );
                format!("An error occurred while processing your request: {llm_error}")
            }
        }
    }
}
