use thiserror::Error;

/// Failure reported by the remote lot registry or the path to it.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Transport(String),
    #[error("backend returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("backend returned a malformed body: {0}")]
    MalformedBody(String),
}

/// Failure of a single tool invocation. These never abort a query; the
/// orchestrator folds them into the transcript as failed tool results.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ToolError {
    #[error("Unsupported function call: {name}")]
    UnsupportedTool { name: String },
    #[error("invalid arguments for `{tool}`: {message}")]
    InvalidArguments { tool: String, message: String },
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl ToolError {
    pub fn invalid_arguments(tool: &str, message: impl Into<String>) -> Self {
        Self::InvalidArguments { tool: tool.to_owned(), message: message.into() }
    }

    pub fn error_class(&self) -> &'static str {
        match self {
            Self::UnsupportedTool { .. } => "unsupported_tool",
            Self::InvalidArguments { .. } => "tool_argument",
            Self::Backend(_) => "backend",
        }
    }
}

/// Failure of a chat-completions round-trip. Aborts the whole query.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LlmServiceError {
    #[error("llm request failed: {0}")]
    Transport(String),
    #[error("llm service returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("llm service returned a malformed response: {0}")]
    MalformedResponse(String),
    #[error("llm service returned no choices")]
    EmptyChoices,
}

#[cfg(test)]
mod tests {
    use crate::errors::{BackendError, LlmServiceError, ToolError};

    #[test]
    fn unsupported_tool_message_names_the_tool() {
        let error = ToolError::UnsupportedTool { name: "delete_lot".to_owned() };

        assert_eq!(error.to_string(), "Unsupported function call: delete_lot");
        assert_eq!(error.error_class(), "unsupported_tool");
    }

    #[test]
    fn backend_errors_surface_through_tool_errors_unchanged() {
        let error = ToolError::from(BackendError::Status {
            status: 404,
            body: "lot not found".to_owned(),
        });

        assert_eq!(error.to_string(), "backend returned status 404: lot not found");
        assert_eq!(error.error_class(), "backend");
    }

    #[test]
    fn invalid_arguments_carry_tool_and_reason() {
        let error = ToolError::invalid_arguments("get_lot", "missing required field `lot_id`");

        assert!(matches!(
            error,
            ToolError::InvalidArguments { ref tool, ref message }
                if tool == "get_lot" && message.contains("lot_id")
        ));
    }

    #[test]
    fn llm_status_error_includes_body() {
        let error = LlmServiceError::Status { status: 401, body: "invalid api key".to_owned() };

        assert_eq!(error.to_string(), "llm service returned status 401: invalid api key");
    }
}
