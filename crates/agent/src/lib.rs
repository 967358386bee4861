//! Agent runtime - tool-dispatching conversation orchestration
//!
//! This crate is the "brain" of lotbridge. For each user question it:
//! - Advertises the lot registry operations to the LLM (`tools`)
//! - Lets the model pick which operations to call (`llm`)
//! - Executes the selected calls against the registry (`backend`)
//! - Threads results back through the transcript (`conversation`) and asks
//!   the model for a final natural-language answer (`runtime`)
//!
//! # Failure model
//!
//! Tool failures are data: each becomes a `{error, status: "failed"}` tool
//! result so the second completion call stays well-formed. LLM failures abort
//! the query and are returned as an explanatory answer string.

pub mod backend;
pub mod conversation;
pub mod llm;
pub mod runtime;
pub mod tools;

pub use backend::{BackendInvoker, LotRegistryClient};
pub use llm::{ChatCompletionsClient, GenerationSettings, LlmClient};
pub use runtime::{ConversationOrchestrator, QueryAnswerer};
pub use tools::{LotTool, ToolRegistry};
