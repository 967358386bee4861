use serde::Serialize;
use serde_json::{json, Value};

/// Backend operations the model may call. The set is closed; anything the
/// model names outside it is rejected as an unsupported tool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LotTool {
    GetAllLots,
    GetLot,
}

impl LotTool {
    pub const ALL: [LotTool; 2] = [LotTool::GetAllLots, LotTool::GetLot];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::GetAllLots => "get_all_lots",
            Self::GetLot => "get_lot",
        }
    }

    pub fn definition(&self) -> ToolDefinition {
        match self {
            Self::GetAllLots => ToolDefinition {
                name: self.name(),
                description: "Gets all coffee lots",
                parameters: json!({
                    "type": "object",
                    "properties": {},
                    "additionalProperties": false,
                }),
            },
            Self::GetLot => ToolDefinition {
                name: self.name(),
                description: "Gets coffee lot by id",
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "lot_id": {
                            "type": "number",
                            "description": "Coffee lot id to query",
                        },
                    },
                    "required": ["lot_id"],
                    "additionalProperties": false,
                }),
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

/// Wire shape of one catalogue entry in a chat-completions request.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolSpec {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: FunctionSpec,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FunctionSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
    pub strict: bool,
}

impl From<&ToolDefinition> for ToolSpec {
    fn from(definition: &ToolDefinition) -> Self {
        Self {
            kind: "function",
            function: FunctionSpec {
                name: definition.name,
                description: definition.description,
                parameters: definition.parameters.clone(),
                strict: true,
            },
        }
    }
}

/// Read-only catalogue built once at startup and shared by every query.
#[derive(Clone, Debug)]
pub struct ToolRegistry {
    definitions: Vec<ToolDefinition>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self { definitions: LotTool::ALL.iter().map(LotTool::definition).collect() }
    }
}

impl ToolRegistry {
    pub fn resolve(&self, name: &str) -> Option<LotTool> {
        LotTool::from_name(name)
            .filter(|tool| self.definitions.iter().any(|definition| definition.name == tool.name()))
    }

    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    pub fn catalogue(&self) -> Vec<ToolSpec> {
        self.definitions.iter().map(ToolSpec::from).collect()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
