use lotbridge_agent::{ConversationOrchestrator, QueryAnswerer};
use lotbridge_core::config::{AppConfig, LoadOptions};

use super::CommandResult;

pub fn run(query: &str) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("ask", "config_validation", error.to_string(), 2)
        }
    };

    let orchestrator = match ConversationOrchestrator::from_config(&config) {
        Ok(orchestrator) => orchestrator,
        Err(error) => return CommandResult::failure("ask", "http_client", error.to_string(), 3),
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => return CommandResult::failure("ask", "runtime", error.to_string(), 4),
    };

    // Failures inside the query come back as answer text, so this always succeeds.
    let answer = runtime.block_on(orchestrator.answer(query));
    CommandResult::success("ask", answer)
}
