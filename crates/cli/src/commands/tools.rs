use lotbridge_agent::ToolRegistry;

use super::CommandResult;

/// Prints the catalogue exactly as it is sent on the first completion call.
pub fn run() -> CommandResult {
    let catalogue = ToolRegistry::default().catalogue();
    match serde_json::to_string_pretty(&catalogue) {
        Ok(output) => CommandResult { exit_code: 0, output },
        Err(error) => CommandResult::failure("tools", "serialization", error.to_string(), 1),
    }
}
