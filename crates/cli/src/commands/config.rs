use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use lotbridge_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

use super::CommandResult;

struct FieldLine {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("config", "config_validation", error.to_string(), 2)
        }
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in fields(&config) {
        let source = field_source(
            field.key,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key, &field.value, source));
    }

    CommandResult { exit_code: 0, output: lines.join("\n") }
}

fn fields(config: &AppConfig) -> Vec<FieldLine> {
    let optional = |value: &Option<String>| value.clone().unwrap_or_else(|| "<unset>".to_string());

    vec![
        FieldLine {
            key: "llm.api_key",
            value: redact_secret(config.llm.api_key.expose_secret()),
            env_keys: &["LOTBRIDGE_LLM_API_KEY", "ASI1_API_KEY"],
        },
        FieldLine {
            key: "llm.base_url",
            value: config.llm.base_url.clone(),
            env_keys: &["LOTBRIDGE_LLM_BASE_URL", "ASI1_BASE_URL"],
        },
        FieldLine {
            key: "llm.model",
            value: config.llm.model.clone(),
            env_keys: &["LOTBRIDGE_LLM_MODEL"],
        },
        FieldLine {
            key: "llm.temperature",
            value: config.llm.temperature.to_string(),
            env_keys: &["LOTBRIDGE_LLM_TEMPERATURE"],
        },
        FieldLine {
            key: "llm.max_tokens",
            value: config.llm.max_tokens.to_string(),
            env_keys: &["LOTBRIDGE_LLM_MAX_TOKENS"],
        },
        FieldLine {
            key: "llm.timeout_secs",
            value: config.llm.timeout_secs.to_string(),
            env_keys: &["LOTBRIDGE_LLM_TIMEOUT_SECS"],
        },
        FieldLine {
            key: "backend.base_url",
            value: config.backend.base_url.clone(),
            env_keys: &["LOTBRIDGE_BACKEND_BASE_URL"],
        },
        FieldLine {
            key: "backend.canister_id",
            value: optional(&config.backend.canister_id),
            env_keys: &["LOTBRIDGE_BACKEND_CANISTER_ID", "CANISTER_ID"],
        },
        FieldLine {
            key: "backend.timeout_secs",
            value: config.backend.timeout_secs.to_string(),
            env_keys: &["LOTBRIDGE_BACKEND_TIMEOUT_SECS"],
        },
        FieldLine {
            key: "agent.name",
            value: config.agent.name.clone(),
            env_keys: &["LOTBRIDGE_AGENT_NAME"],
        },
        FieldLine {
            key: "agent.address",
            value: config.agent.address.clone(),
            env_keys: &["LOTBRIDGE_AGENT_ADDRESS"],
        },
        FieldLine {
            key: "agent.bind_address",
            value: config.agent.bind_address.clone(),
            env_keys: &["LOTBRIDGE_AGENT_BIND_ADDRESS"],
        },
        FieldLine {
            key: "agent.port",
            value: config.agent.port.to_string(),
            env_keys: &["LOTBRIDGE_AGENT_PORT"],
        },
        FieldLine {
            key: "agent.transport_mode",
            value: format!("{:?}", config.agent.transport_mode),
            env_keys: &["LOTBRIDGE_AGENT_TRANSPORT_MODE"],
        },
        FieldLine {
            key: "agent.mailbox_url",
            value: optional(&config.agent.mailbox_url),
            env_keys: &["LOTBRIDGE_AGENT_MAILBOX_URL"],
        },
        FieldLine {
            key: "logging.level",
            value: config.logging.level.clone(),
            env_keys: &["LOTBRIDGE_LOGGING_LEVEL", "LOTBRIDGE_LOG_LEVEL"],
        },
        FieldLine {
            key: "logging.format",
            value: format!("{:?}", config.logging.format),
            env_keys: &["LOTBRIDGE_LOGGING_FORMAT", "LOTBRIDGE_LOG_FORMAT"],
        },
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    ["lotbridge.toml", "config/lotbridge.toml"].into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_secret(secret: &str) -> String {
    let trimmed = secret.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}
