use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub backend: BackendConfig,
    pub agent: AgentConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub api_key: SecretString,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct BackendConfig {
    pub base_url: String,
    /// Routing identifier of the lot registry; sent as `Host: <id>.localhost`.
    pub canister_id: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct AgentConfig {
    pub name: String,
    pub address: String,
    pub bind_address: String,
    pub port: u16,
    pub transport_mode: TransportMode,
    pub mailbox_url: Option<String>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    Direct,
    Mailbox,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_base_url: Option<String>,
    pub llm_model: Option<String>,
    pub backend_base_url: Option<String>,
    pub backend_canister_id: Option<String>,
    pub agent_port: Option<u16>,
    pub agent_transport_mode: Option<TransportMode>,
    pub agent_mailbox_url: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                api_key: String::new().into(),
                base_url: "https://api.asi1.ai/v1".to_string(),
                model: "asi1-mini".to_string(),
                temperature: 0.7,
                max_tokens: 1024,
                timeout_secs: 60,
            },
            backend: BackendConfig { base_url: String::new(), canister_id: None, timeout_secs: 30 },
            agent: AgentConfig {
                name: "coffee-lot-agent".to_string(),
                address: "http://127.0.0.1:8001".to_string(),
                bind_address: "127.0.0.1".to_string(),
                port: 8001,
                transport_mode: TransportMode::Direct,
                mailbox_url: None,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for TransportMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "direct" => Ok(Self::Direct),
            "mailbox" => Ok(Self::Mailbox),
            other => Err(ConfigError::Validation(format!(
                "unsupported transport mode `{other}` (expected direct|mailbox)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("lotbridge.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    /// Address the outbound transport posts envelopes to for `recipient`.
    pub fn delivery_endpoint(&self, recipient: &str) -> String {
        match (self.agent.transport_mode, self.agent.mailbox_url.as_deref()) {
            (TransportMode::Mailbox, Some(mailbox_url)) => mailbox_url.to_string(),
            _ => recipient.to_string(),
        }
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(llm) = patch.llm {
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = secret_value(llm_api_key_value);
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = base_url;
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(temperature) = llm.temperature {
                self.llm.temperature = temperature;
            }
            if let Some(max_tokens) = llm.max_tokens {
                self.llm.max_tokens = max_tokens;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
        }

        if let Some(backend) = patch.backend {
            if let Some(base_url) = backend.base_url {
                self.backend.base_url = base_url;
            }
            if let Some(canister_id) = backend.canister_id {
                self.backend.canister_id = Some(canister_id);
            }
            if let Some(timeout_secs) = backend.timeout_secs {
                self.backend.timeout_secs = timeout_secs;
            }
        }

        if let Some(agent) = patch.agent {
            if let Some(name) = agent.name {
                self.agent.name = name;
            }
            if let Some(address) = agent.address {
                self.agent.address = address;
            }
            if let Some(bind_address) = agent.bind_address {
                self.agent.bind_address = bind_address;
            }
            if let Some(port) = agent.port {
                self.agent.port = port;
            }
            if let Some(transport_mode) = agent.transport_mode {
                self.agent.transport_mode = transport_mode;
            }
            if let Some(mailbox_url) = agent.mailbox_url {
                self.agent.mailbox_url = Some(mailbox_url);
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        let api_key = read_env("LOTBRIDGE_LLM_API_KEY").or_else(|| read_env("ASI1_API_KEY"));
        if let Some(value) = api_key {
            self.llm.api_key = secret_value(value);
        }
        let llm_base_url =
            read_env("LOTBRIDGE_LLM_BASE_URL").or_else(|| read_env("ASI1_BASE_URL"));
        if let Some(value) = llm_base_url {
            self.llm.base_url = value;
        }
        if let Some(value) = read_env("LOTBRIDGE_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("LOTBRIDGE_LLM_TEMPERATURE") {
            self.llm.temperature = parse_f32("LOTBRIDGE_LLM_TEMPERATURE", &value)?;
        }
        if let Some(value) = read_env("LOTBRIDGE_LLM_MAX_TOKENS") {
            self.llm.max_tokens = parse_u32("LOTBRIDGE_LLM_MAX_TOKENS", &value)?;
        }
        if let Some(value) = read_env("LOTBRIDGE_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("LOTBRIDGE_LLM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("LOTBRIDGE_BACKEND_BASE_URL") {
            self.backend.base_url = value;
        }
        let canister_id =
            read_env("LOTBRIDGE_BACKEND_CANISTER_ID").or_else(|| read_env("CANISTER_ID"));
        if let Some(value) = canister_id {
            self.backend.canister_id = Some(value);
        }
        if let Some(value) = read_env("LOTBRIDGE_BACKEND_TIMEOUT_SECS") {
            self.backend.timeout_secs = parse_u64("LOTBRIDGE_BACKEND_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("LOTBRIDGE_AGENT_NAME") {
            self.agent.name = value;
        }
        if let Some(value) = read_env("LOTBRIDGE_AGENT_ADDRESS") {
            self.agent.address = value;
        }
        if let Some(value) = read_env("LOTBRIDGE_AGENT_BIND_ADDRESS") {
            self.agent.bind_address = value;
        }
        if let Some(value) = read_env("LOTBRIDGE_AGENT_PORT") {
            self.agent.port = parse_u16("LOTBRIDGE_AGENT_PORT", &value)?;
        }
        if let Some(value) = read_env("LOTBRIDGE_AGENT_TRANSPORT_MODE") {
            self.agent.transport_mode = value.parse()?;
        }
        if let Some(value) = read_env("LOTBRIDGE_AGENT_MAILBOX_URL") {
            self.agent.mailbox_url = Some(value);
        }

        let log_level =
            read_env("LOTBRIDGE_LOGGING_LEVEL").or_else(|| read_env("LOTBRIDGE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("LOTBRIDGE_LOGGING_FORMAT").or_else(|| read_env("LOTBRIDGE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_api_key) = overrides.llm_api_key {
            self.llm.api_key = secret_value(llm_api_key);
        }
        if let Some(llm_base_url) = overrides.llm_base_url {
            self.llm.base_url = llm_base_url;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(backend_base_url) = overrides.backend_base_url {
            self.backend.base_url = backend_base_url;
        }
        if let Some(canister_id) = overrides.backend_canister_id {
            self.backend.canister_id = Some(canister_id);
        }
        if let Some(port) = overrides.agent_port {
            self.agent.port = port;
        }
        if let Some(transport_mode) = overrides.agent_transport_mode {
            self.agent.transport_mode = transport_mode;
        }
        if let Some(mailbox_url) = overrides.agent_mailbox_url {
            self.agent.mailbox_url = Some(mailbox_url);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_llm(&self.llm)?;
        validate_backend(&self.backend)?;
        validate_agent(&self.agent)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("lotbridge.toml"), PathBuf::from("config/lotbridge.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.api_key.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "llm.api_key is required (set LOTBRIDGE_LLM_API_KEY or ASI1_API_KEY)".to_string(),
        ));
    }

    if !is_http_url(llm.base_url.trim()) {
        return Err(ConfigError::Validation(
            "llm.base_url must start with http:// or https://".to_string(),
        ));
    }

    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }

    if !(0.0..=2.0).contains(&llm.temperature) {
        return Err(ConfigError::Validation(
            "llm.temperature must be in range 0.0..=2.0".to_string(),
        ));
    }

    if llm.max_tokens == 0 {
        return Err(ConfigError::Validation(
            "llm.max_tokens must be greater than zero".to_string(),
        ));
    }

    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_backend(backend: &BackendConfig) -> Result<(), ConfigError> {
    let base_url = backend.base_url.trim();
    if base_url.is_empty() {
        return Err(ConfigError::Validation(
            "backend.base_url is required (set LOTBRIDGE_BACKEND_BASE_URL)".to_string(),
        ));
    }
    if !is_http_url(base_url) {
        return Err(ConfigError::Validation(
            "backend.base_url must start with http:// or https://".to_string(),
        ));
    }

    if let Some(canister_id) = &backend.canister_id {
        let valid = !canister_id.trim().is_empty()
            && canister_id.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-');
        if !valid {
            return Err(ConfigError::Validation(
                "backend.canister_id may only contain ASCII letters, digits, and `-`".to_string(),
            ));
        }
    }

    if backend.timeout_secs == 0 || backend.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "backend.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_agent(agent: &AgentConfig) -> Result<(), ConfigError> {
    if agent.name.trim().is_empty() {
        return Err(ConfigError::Validation("agent.name must not be empty".to_string()));
    }

    if agent.address.trim().is_empty() {
        return Err(ConfigError::Validation("agent.address must not be empty".to_string()));
    }

    if agent.port == 0 {
        return Err(ConfigError::Validation("agent.port must be greater than zero".to_string()));
    }

    if agent.transport_mode == TransportMode::Mailbox {
        let Some(mailbox_url) = agent.mailbox_url.as_deref() else {
            return Err(ConfigError::Validation(
                "agent.mailbox_url is required when agent.transport_mode is `mailbox`".to_string(),
            ));
        };
        if !is_http_url(mailbox_url.trim()) {
            return Err(ConfigError::Validation(
                "agent.mailbox_url must start with http:// or https://".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f32(key: &str, value: &str) -> Result<f32, ConfigError> {
    value.parse::<f32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    llm: Option<LlmPatch>,
    backend: Option<BackendPatch>,
    agent: Option<AgentPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct BackendPatch {
    base_url: Option<String>,
    canister_id: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct AgentPatch {
    name: Option<String>,
    address: Option<String>,
    bind_address: Option<String>,
    port: Option<u16>,
    transport_mode: Option<TransportMode>,
    mailbox_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
