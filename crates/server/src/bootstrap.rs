use std::sync::Arc;

use lotbridge_agent::ConversationOrchestrator;
use lotbridge_chat::{ChatProtocolHandler, ChatRunner, HttpChatTransport};
use lotbridge_core::config::{AppConfig, ConfigError};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub orchestrator: Arc<ConversationOrchestrator>,
    pub runner: ChatRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("http client construction failed: {0}")]
    HttpClient(#[source] reqwest::Error),
    #[error("could not bind listener on `{address}`: {source}")]
    Bind { address: String, source: std::io::Error },
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        agent = %config.agent.name,
        "starting application bootstrap"
    );

    let orchestrator = Arc::new(
        ConversationOrchestrator::from_config(&config).map_err(BootstrapError::HttpClient)?,
    );
    let transport =
        Arc::new(HttpChatTransport::from_config(&config).map_err(BootstrapError::HttpClient)?);
    let handler = Arc::new(ChatProtocolHandler::new(transport, orchestrator.clone()));

    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        transport_mode = ?config.agent.transport_mode,
        tool_count = orchestrator.registry().len(),
        backend_url = %config.backend.base_url,
        "application bootstrap complete"
    );

    Ok(Application { config, orchestrator, runner: ChatRunner::new(handler) })
}

#[cfg(test)]
mod tests {
    use lotbridge_core::config::{AppConfig, ConfigOverrides, LoadOptions, TransportMode};

    use super::{bootstrap_with_config, Application, BootstrapError};

    fn options(overrides: ConfigOverrides) -> LoadOptions {
        LoadOptions { overrides, ..LoadOptions::default() }
    }

    fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
        bootstrap_with_config(AppConfig::load(options)?)
    }

    #[test]
    fn bootstrap_fails_fast_without_backend_url() {
        let result = bootstrap(options(ConfigOverrides {
            llm_api_key: Some("sk-test".to_owned()),
            backend_base_url: Some(String::new()),
            ..ConfigOverrides::default()
        }));

        let Err(error) = result else {
            panic!("bootstrap should reject missing backend url");
        };
        assert!(matches!(error, BootstrapError::Config(_)));
        assert!(error.to_string().contains("backend.base_url"), "{error}");
    }

    #[test]
    fn bootstrap_wires_orchestrator_with_full_registry() {
        let app = bootstrap(options(ConfigOverrides {
            llm_api_key: Some("sk-test".to_owned()),
            backend_base_url: Some("http://127.0.0.1:4943".to_owned()),
            agent_transport_mode: Some(TransportMode::Direct),
            ..ConfigOverrides::default()
        }))
        .expect("bootstrap should succeed with valid overrides");

        assert_eq!(app.orchestrator.registry().len(), 2);
        assert_eq!(app.config.backend.base_url, "http://127.0.0.1:4943");
    }
}
