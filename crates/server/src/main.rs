mod bootstrap;
mod health;
mod ingress;

use anyhow::Result;
use lotbridge_core::config::{AppConfig, LoadOptions};
use tokio::sync::mpsc;

use crate::bootstrap::{Application, BootstrapError};

const INBOUND_QUEUE_DEPTH: usize = 256;

fn init_logging(config: &AppConfig) {
    use lotbridge_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Logging depends on config, so config is loaded before anything can log.
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let Application { config, orchestrator, runner } = bootstrap::bootstrap_with_config(config)?;

    let (inbound, receiver) = mpsc::channel(INBOUND_QUEUE_DEPTH);
    let runner_task = tokio::spawn(async move { runner.run(receiver).await });

    let address = format!("{}:{}", config.agent.bind_address, config.agent.port);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .map_err(|source| BootstrapError::Bind { address: address.clone(), source })?;
    let app = ingress::router(inbound.clone()).merge(health::router(config.agent.name.clone(), inbound));

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        agent_address = %config.agent.address,
        tool_count = orchestrator.registry().len(),
        "lotbridge-server started"
    );

    // Dropping the router on shutdown closes the inbound channel, which lets
    // the runner drain in-flight envelopes and return.
    axum::serve(listener, app).with_graceful_shutdown(wait_for_shutdown()).await?;
    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "lotbridge-server stopping"
    );

    let handled = runner_task.await?;
    tracing::info!(
        event_name = "system.server.stopped",
        correlation_id = "shutdown",
        handled,
        "lotbridge-server stopped"
    );

    Ok(())
}

async fn wait_for_shutdown() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(
            event_name = "system.server.signal_error",
            error = %error,
            "failed to listen for shutdown signal"
        );
    }
}
