use lotbridge_core::errors::ToolError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};

/// One entry of the message history threaded through both completion calls.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Turn {
    User { content: String },
    Assistant(AssistantTurn),
    Tool { tool_call_id: String, content: String },
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AssistantTurn {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub tool_calls: Vec<ToolCallRequest>,
    /// Fields the model sent that this crate does not interpret (`refusal`,
    /// provider extensions). Resubmitted unchanged on the next call.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    /// Absorbs `role` when the turn is decoded straight from a response
    /// message; `Turn`'s tag writes it back out.
    #[serde(default, skip_serializing, rename = "role")]
    decoded_role: Option<String>,
}

impl AssistantTurn {
    pub fn text(content: impl Into<String>) -> Self {
        Self { content: Some(content.into()), ..Self::default() }
    }

    pub fn with_tool_calls(tool_calls: Vec<ToolCallRequest>) -> Self {
        Self { tool_calls, ..Self::default() }
    }

    /// Text content exactly as the model wrote it, unless it is missing or blank.
    pub fn answer_text(&self) -> Option<&str> {
        self.content.as_deref().filter(|text| !text.trim().is_empty())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    pub function: FunctionCall,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ToolCallRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: function_kind(),
            function: FunctionCall { name: name.into(), arguments: arguments.into() },
            extra: Map::new(),
        }
    }

    /// Decodes the JSON-encoded argument string. An empty string means no
    /// arguments.
    pub fn parsed_arguments(&self) -> Result<Value, ToolError> {
        let raw = self.function.arguments.trim();
        if raw.is_empty() {
            return Ok(json!({}));
        }

        serde_json::from_str(raw).map_err(|error| {
            ToolError::invalid_arguments(
                &self.function.name,
                format!("arguments are not valid JSON: {error}"),
            )
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

fn function_kind() -> String {
    "function".to_owned()
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<ToolCallRequest>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<ToolCallRequest>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Outcome of one tool call, already rendered as the text the model sees.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolResult {
    pub tool_call_id: String,
    pub payload: String,
}

impl ToolResult {
    pub fn success(tool_call_id: &str, data: &Value) -> Self {
        Self { tool_call_id: tool_call_id.to_owned(), payload: data.to_string() }
    }

    pub fn failure(tool_call_id: &str, error: &ToolError) -> Self {
        let payload = json!({
            "error": format!("Tool execution failed: {error}"),
            "status": "failed",
        });
        Self { tool_call_id: tool_call_id.to_owned(), payload: payload.to_string() }
    }
}

impl From<ToolResult> for Turn {
    fn from(result: ToolResult) -> Self {
        Self::Tool { tool_call_id: result.tool_call_id, content: result.payload }
    }
}

/// Ordered history for a single query. Created per query and dropped once the
/// final answer is produced.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn from_user_query(query: &str) -> Self {
        Self { turns: vec![Turn::User { content: query.to_owned() }] }
    }

    pub fn push_assistant(&mut self, turn: AssistantTurn) {
        self.turns.push(Turn::Assistant(turn));
    }

    pub fn push_tool_result(&mut self, result: ToolResult) {
        self.turns.push(result.into());
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn tool_turn_count(&self) -> usize {
        self.turns.iter().filter(|turn| matches!(turn, Turn::Tool { .. })).count()
    }
}
